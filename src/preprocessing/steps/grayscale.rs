use crate::error::OcrError;
use image::{DynamicImage, GrayImage, Luma};

/// Convert image to single-channel luminance
///
/// Uses BT.601 weights, the convention photographic detectors are trained on.
/// Images that are already single-channel pass through untouched.
pub fn apply(image: DynamicImage) -> Result<DynamicImage, OcrError> {
    if let DynamicImage::ImageLuma8(gray) = image {
        return Ok(DynamicImage::ImageLuma8(gray));
    }

    let rgb = image.to_rgb8();
    let gray = GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        let luma = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
        Luma([luma.round().clamp(0.0, 255.0) as u8])
    });

    Ok(DynamicImage::ImageLuma8(gray))
}
