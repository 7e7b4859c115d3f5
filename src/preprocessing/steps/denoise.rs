use crate::error::OcrError;
use image::{DynamicImage, GrayImage};
use rayon::prelude::*;
use serde::Serialize;

/// Non-local-means tuning for grayscale photographic noise
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DenoiseParams {
    /// Filter strength `h`; larger removes more noise and more detail
    pub strength: f32,
    /// Side of the square patch compared between pixels (odd)
    pub template_window: u32,
    /// Side of the square area searched for similar patches (odd)
    pub search_window: u32,
}

impl Default for DenoiseParams {
    fn default() -> Self {
        Self {
            strength: 10.0,
            template_window: 7,
            search_window: 21,
        }
    }
}

/// Apply non-local-means denoising
///
/// Every pixel becomes a weighted mean of the pixels in its search window,
/// weighted by how closely their surrounding patches match its own. Unlike a
/// median or Gaussian filter this keeps pen strokes sharp because a stroke
/// pixel only borrows from other stroke-like patches.
pub fn apply(image: DynamicImage, params: &DenoiseParams) -> Result<DynamicImage, OcrError> {
    if params.template_window % 2 == 0 || params.search_window % 2 == 0 {
        return Err(OcrError::PreprocessingError(format!(
            "denoise windows must be odd, got template={} search={}",
            params.template_window, params.search_window
        )));
    }
    let gray = image.to_luma8();
    Ok(DynamicImage::ImageLuma8(non_local_means(&gray, params)))
}

/// Rows handled together; bounds scratch memory independently of image height
const BAND_ROWS: usize = 64;

/// Weight table entries per unit of `distance / h^2`
const WEIGHT_STEPS: f32 = 256.0;

/// Patches farther than this many `h^2` apart contribute nothing
const MAX_EXPONENT: f32 = 12.0;

fn non_local_means(img: &GrayImage, params: &DenoiseParams) -> GrayImage {
    non_local_means_banded(img, params, BAND_ROWS)
}

fn non_local_means_banded(
    img: &GrayImage,
    params: &DenoiseParams,
    band_rows: usize,
) -> GrayImage {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return img.clone();
    }
    let w = width as usize;
    let band_rows = band_rows.max(1);
    let window = Window {
        width: w,
        height: height as usize,
        template_radius: (params.template_window / 2) as usize,
        search_radius: (params.search_window / 2) as isize,
    };
    let weights = WeightTable::new(params.strength);
    let src = img.as_raw();

    let mut out = vec![0u8; src.len()];
    out.par_chunks_mut(w * band_rows)
        .enumerate()
        .for_each(|(band, chunk)| denoise_band(src, &window, &weights, band * band_rows, chunk));

    GrayImage::from_raw(width, height, out).unwrap_or_else(|| img.clone())
}

struct Window {
    width: usize,
    height: usize,
    template_radius: usize,
    search_radius: isize,
}

/// `exp(-distance / h^2)` sampled in steps of `h^2 / WEIGHT_STEPS`
struct WeightTable {
    scale: f32,
    table: Vec<f32>,
}

impl WeightTable {
    fn new(strength: f32) -> Self {
        let h2 = (strength * strength).max(f32::EPSILON);
        let len = (WEIGHT_STEPS * MAX_EXPONENT) as usize;
        let table = (0..len)
            .map(|i| (-(i as f32) / WEIGHT_STEPS).exp())
            .collect();
        Self {
            scale: WEIGHT_STEPS / h2,
            table,
        }
    }

    fn weight(&self, patch_sum: u64, count: usize) -> f32 {
        let index = (patch_sum as f32 / count as f32 * self.scale) as usize;
        self.table.get(index).copied().unwrap_or(0.0)
    }
}

/// Denoise output rows `y_start..` into `out`, reading patch rows around them
fn denoise_band(
    src: &[u8],
    win: &Window,
    weights: &WeightTable,
    y_start: usize,
    out: &mut [u8],
) {
    let w = win.width;
    let tr = win.template_radius;
    let rows = out.len() / w;
    let halo_start = y_start.saturating_sub(tr);
    let halo_end = (y_start + rows + tr).min(win.height);
    let halo = halo_end - halo_start;

    // Neighbour pixels at the current offset, and per-row horizontal patch
    // sums of squared differences against them
    let mut shifted = vec![0u8; halo * w];
    let mut row_sums = vec![0u32; halo * w];
    let mut prefix = vec![0u64; w + 1];
    let mut patch = vec![0u64; w];
    let mut weight_sum = vec![0f32; rows * w];
    let mut value_sum = vec![0f32; rows * w];

    let last_row = win.height as isize - 1;
    for dy in -win.search_radius..=win.search_radius {
        for dx in -win.search_radius..=win.search_radius {
            for r in 0..halo {
                let y = halo_start + r;
                let sy = (y as isize + dy).clamp(0, last_row) as usize;
                let neighbour = &mut shifted[r * w..(r + 1) * w];
                shift_row(&src[sy * w..(sy + 1) * w], dx, neighbour);

                let own = &src[y * w..(y + 1) * w];
                for x in 0..w {
                    let d = own[x] as i32 - neighbour[x] as i32;
                    prefix[x + 1] = prefix[x] + (d * d) as u64;
                }
                let sums = &mut row_sums[r * w..(r + 1) * w];
                for (x, sum) in sums.iter_mut().enumerate() {
                    let x0 = x.saturating_sub(tr);
                    let x1 = (x + tr + 1).min(w);
                    *sum = (prefix[x1] - prefix[x0]) as u32;
                }
            }

            for r in 0..rows {
                let y = y_start + r;
                let y0 = y.saturating_sub(tr);
                let y1 = (y + tr + 1).min(win.height);

                patch.fill(0);
                for yy in y0..y1 {
                    let sums = &row_sums[(yy - halo_start) * w..(yy - halo_start + 1) * w];
                    for (acc, s) in patch.iter_mut().zip(sums) {
                        *acc += *s as u64;
                    }
                }

                let neighbour = &shifted[(y - halo_start) * w..(y - halo_start + 1) * w];
                let base = r * w;
                for x in 0..w {
                    let x_span = (x + tr + 1).min(w) - x.saturating_sub(tr);
                    let weight = weights.weight(patch[x], x_span * (y1 - y0));
                    weight_sum[base + x] += weight;
                    value_sum[base + x] += weight * neighbour[x] as f32;
                }
            }
        }
    }

    for ((px, value), weight) in out.iter_mut().zip(&value_sum).zip(&weight_sum) {
        *px = (value / weight).round().clamp(0.0, 255.0) as u8;
    }
}

/// `dst[x] = row[clamp(x + dx)]`, repeating the edge pixels
fn shift_row(row: &[u8], dx: isize, dst: &mut [u8]) {
    let w = row.len() as isize;
    let lo = (-dx).clamp(0, w) as usize;
    let hi = (w - dx).clamp(0, w) as usize;
    dst[..lo].fill(row[0]);
    dst[hi..].fill(row[row.len() - 1]);
    if lo < hi {
        let from = (lo as isize + dx) as usize;
        dst[lo..hi].copy_from_slice(&row[from..from + (hi - lo)]);
    }
}
