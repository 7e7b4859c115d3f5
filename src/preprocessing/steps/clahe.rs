use crate::error::OcrError;
use image::{DynamicImage, GrayImage, Luma};

/// Apply contrast-limited adaptive histogram equalization
///
/// Each tile of a `tiles` x `tiles` grid gets its own clipped equalization
/// curve, and pixels blend the curves of the four nearest tiles so tile seams
/// do not show. Faint strokes in a shadowed corner gain contrast without
/// saturating an already bright part of the page.
pub fn apply(image: DynamicImage, clip_limit: f32, tiles: u32) -> Result<DynamicImage, OcrError> {
    let gray = image.to_luma8();
    if gray.width() == 0 || gray.height() == 0 {
        return Ok(DynamicImage::ImageLuma8(gray));
    }
    Ok(DynamicImage::ImageLuma8(equalize_adaptive(
        &gray, clip_limit, tiles,
    )))
}

fn equalize_adaptive(img: &GrayImage, clip_limit: f32, tiles: u32) -> GrayImage {
    let (width, height) = img.dimensions();
    let tiles_x = tiles.clamp(1, width);
    let tiles_y = tiles.clamp(1, height);

    let mut luts = Vec::with_capacity((tiles_x * tiles_y) as usize);
    for ty in 0..tiles_y {
        let (y0, y1) = tile_span(ty, tiles_y, height);
        for tx in 0..tiles_x {
            let (x0, x1) = tile_span(tx, tiles_x, width);
            luts.push(tile_lut(img, x0, x1, y0, y1, clip_limit));
        }
    }

    let tile_w = width as f32 / tiles_x as f32;
    let tile_h = height as f32 / tiles_y as f32;

    GrayImage::from_fn(width, height, |x, y| {
        let (tx0, tx1, ax) = neighbours(x, tile_w, tiles_x);
        let (ty0, ty1, ay) = neighbours(y, tile_h, tiles_y);
        let v = img.get_pixel(x, y).0[0] as usize;

        let lookup = |tx: u32, ty: u32| luts[(ty * tiles_x + tx) as usize][v] as f32;
        let top = lookup(tx0, ty0) * (1.0 - ax) + lookup(tx1, ty0) * ax;
        let bottom = lookup(tx0, ty1) * (1.0 - ax) + lookup(tx1, ty1) * ax;
        let blended = top * (1.0 - ay) + bottom * ay;

        Luma([blended.round().clamp(0.0, 255.0) as u8])
    })
}

/// Half-open pixel span `[start, end)` covered by tile `index`
fn tile_span(index: u32, count: u32, extent: u32) -> (u32, u32) {
    let start = (index as u64 * extent as u64 / count as u64) as u32;
    let end = ((index as u64 + 1) * extent as u64 / count as u64) as u32;
    (start, end)
}

/// The two tiles whose centres bracket `pos`, and the blend weight of the second
fn neighbours(pos: u32, tile_size: f32, count: u32) -> (u32, u32, f32) {
    let f = (pos as f32 + 0.5) / tile_size - 0.5;
    if f <= 0.0 {
        return (0, 0, 0.0);
    }
    let lo = (f.floor() as u32).min(count - 1);
    let hi = (lo + 1).min(count - 1);
    let weight = if hi == lo { 0.0 } else { f - lo as f32 };
    (lo, hi, weight)
}

/// Clipped cumulative histogram of one tile, scaled to [0, 255]
fn tile_lut(img: &GrayImage, x0: u32, x1: u32, y0: u32, y1: u32, clip_limit: f32) -> [u8; 256] {
    let mut hist = [0u32; 256];
    for y in y0..y1 {
        for x in x0..x1 {
            hist[img.get_pixel(x, y).0[0] as usize] += 1;
        }
    }

    let area = (x1 - x0) * (y1 - y0);
    let clip = ((clip_limit * area as f32 / 256.0) as u32).max(1);

    let mut excess = 0u32;
    for bin in hist.iter_mut() {
        if *bin > clip {
            excess += *bin - clip;
            *bin = clip;
        }
    }

    // Spread the clipped mass evenly, then the remainder at a fixed stride
    let bonus = excess / 256;
    let residual = excess % 256;
    for bin in hist.iter_mut() {
        *bin += bonus;
    }
    if residual > 0 {
        let stride = (256 / residual).max(1) as usize;
        for bin in hist.iter_mut().step_by(stride).take(residual as usize) {
            *bin += 1;
        }
    }

    let scale = 255.0 / area as f32;
    let mut lut = [0u8; 256];
    let mut cumulative = 0u32;
    for (value, bin) in hist.iter().enumerate() {
        cumulative += bin;
        lut[value] = (cumulative as f32 * scale).round().min(255.0) as u8;
    }
    lut
}
