use crate::error::OcrError;
use image::{imageops, DynamicImage, GrayImage};

/// Flip a binarized page to dark-text-on-light-background
///
/// If the mean intensity is below `midpoint` the page is assumed to be light
/// ink on a dark background and is inverted in place. This can misfire on a
/// dark photographed background whose light handwriting Otsu already
/// separated correctly; the heuristic is kept as is.
pub fn apply(image: DynamicImage, midpoint: f32) -> Result<DynamicImage, OcrError> {
    let mut gray = image.into_luma8();
    let mean = mean_intensity(&gray);
    if mean < midpoint as f64 {
        tracing::debug!("Mean intensity {:.1} below {}, inverting", mean, midpoint);
        imageops::invert(&mut gray);
    }
    Ok(DynamicImage::ImageLuma8(gray))
}

pub fn mean_intensity(img: &GrayImage) -> f64 {
    let count = img.width() as u64 * img.height() as u64;
    if count == 0 {
        return 0.0;
    }
    let total: u64 = img.pixels().map(|p| p.0[0] as u64).sum();
    total as f64 / count as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_polarity_inverts_dark_page() {
        let mut img = GrayImage::from_pixel(10, 10, Luma([0]));
        img.put_pixel(5, 5, Luma([255])); // light ink

        let result = apply(DynamicImage::ImageLuma8(img), 127.0).unwrap();
        let gray = result.to_luma8();

        assert_eq!(gray.get_pixel(0, 0).0[0], 255);
        assert_eq!(gray.get_pixel(5, 5).0[0], 0);
    }

    #[test]
    fn test_polarity_keeps_light_page() {
        let mut img = GrayImage::from_pixel(10, 10, Luma([255]));
        img.put_pixel(5, 5, Luma([0]));

        let result = apply(DynamicImage::ImageLuma8(img.clone()), 127.0).unwrap();
        assert_eq!(result.to_luma8(), img);
    }

    #[test]
    fn test_mean_intensity() {
        let img = GrayImage::from_fn(2, 1, |x, _| Luma([if x == 0 { 0 } else { 255 }]));
        assert_eq!(mean_intensity(&img), 127.5);
    }
}
