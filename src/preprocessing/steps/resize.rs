use crate::error::OcrError;
use image::{imageops::FilterType, DynamicImage, GenericImageView, GrayImage, Luma};

/// Keep the larger image dimension inside the detector's working range
///
/// Oversized photos shrink so their larger side equals `max_dimension`,
/// using area averaging to avoid aliasing on text edges. Small images grow
/// toward `min_dimension` with cubic resampling, but never by more than
/// `max_upscale`. Anything already in range is returned untouched.
pub fn apply(
    image: DynamicImage,
    max_dimension: u32,
    min_dimension: u32,
    max_upscale: f32,
) -> Result<DynamicImage, OcrError> {
    let (width, height) = image.dimensions();

    match target_dimensions(width, height, max_dimension, min_dimension, max_upscale) {
        Resize::Down(w, h) => {
            let gray = image.into_luma8();
            Ok(DynamicImage::ImageLuma8(resize_area(&gray, w, h)))
        }
        Resize::Up(w, h) => Ok(image.resize_exact(w, h, FilterType::CatmullRom)),
        Resize::Keep => Ok(image),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resize {
    Down(u32, u32),
    Up(u32, u32),
    Keep,
}

/// Decide the output size; scaled sides are truncated toward zero
pub fn target_dimensions(
    width: u32,
    height: u32,
    max_dimension: u32,
    min_dimension: u32,
    max_upscale: f32,
) -> Resize {
    let longest = width.max(height);
    if longest == 0 {
        return Resize::Keep;
    }

    if longest > max_dimension {
        let (w, h) = scale_exact(width, height, max_dimension, longest);
        return Resize::Down(w, h);
    }

    if longest < min_dimension {
        let scale = min_dimension as f64 / longest as f64;
        let (w, h) = if scale <= max_upscale as f64 {
            scale_exact(width, height, min_dimension, longest)
        } else {
            let factor = max_upscale as f64;
            (
                ((width as f64 * factor) as u32).max(1),
                ((height as f64 * factor) as u32).max(1),
            )
        };
        if (w, h) == (width, height) {
            return Resize::Keep;
        }
        return Resize::Up(w, h);
    }

    Resize::Keep
}

/// Scale both sides by `num / den` in integer arithmetic
fn scale_exact(width: u32, height: u32, num: u32, den: u32) -> (u32, u32) {
    let scale = |side: u32| ((side as u64 * num as u64 / den as u64) as u32).max(1);
    (scale(width), scale(height))
}

/// Downscale by averaging the exact source area each output pixel covers
fn resize_area(img: &GrayImage, new_width: u32, new_height: u32) -> GrayImage {
    let (width, height) = img.dimensions();
    let sx = width as f64 / new_width as f64;
    let sy = height as f64 / new_height as f64;

    GrayImage::from_fn(new_width, new_height, |dx, dy| {
        let x0 = dx as f64 * sx;
        let x1 = x0 + sx;
        let y0 = dy as f64 * sy;
        let y1 = y0 + sy;

        let mut acc = 0.0;
        let mut area = 0.0;
        for y in (y0.floor() as u32)..(y1.ceil() as u32).min(height) {
            let wy = y1.min(y as f64 + 1.0) - y0.max(y as f64);
            if wy <= 0.0 {
                continue;
            }
            for x in (x0.floor() as u32)..(x1.ceil() as u32).min(width) {
                let wx = x1.min(x as f64 + 1.0) - x0.max(x as f64);
                if wx <= 0.0 {
                    continue;
                }
                acc += img.get_pixel(x, y).0[0] as f64 * wx * wy;
                area += wx * wy;
            }
        }

        let value = if area > 0.0 { acc / area } else { 0.0 };
        Luma([value.round().clamp(0.0, 255.0) as u8])
    })
}
