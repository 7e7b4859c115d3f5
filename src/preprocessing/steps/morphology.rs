use crate::error::OcrError;
use image::{DynamicImage, GrayImage, Luma};
use imageproc::morphology::{grayscale_dilate, grayscale_erode, Mask};

/// Largest element side a `Mask` anchor can address
const MAX_KERNEL: u32 = 255;

/// Morphological cleanup: closing, then opening, with a square element
///
/// Closing first bridges hairline gaps inside strokes so the opening that
/// follows strips isolated speckles without eating thin pen lines.
pub fn apply(image: DynamicImage, kernel: u32) -> Result<DynamicImage, OcrError> {
    if kernel > MAX_KERNEL {
        return Err(OcrError::PreprocessingError(format!(
            "morphology kernel must be at most {}, got {}",
            MAX_KERNEL, kernel
        )));
    }
    let gray = image.into_luma8();
    if kernel <= 1 {
        return Ok(DynamicImage::ImageLuma8(gray));
    }
    let closed = close(&gray, kernel);
    Ok(DynamicImage::ImageLuma8(open(&closed, kernel)))
}

pub fn close(img: &GrayImage, kernel: u32) -> GrayImage {
    erode(&dilate(img, kernel), kernel)
}

pub fn open(img: &GrayImage, kernel: u32) -> GrayImage {
    dilate(&erode(img, kernel), kernel)
}

/// Maximum over the element anchored at its centre cell `kernel / 2`
pub fn dilate(img: &GrayImage, kernel: u32) -> GrayImage {
    let anchor = kernel / 2;
    grayscale_dilate(img, &square(kernel, anchor))
}

/// Minimum over the reflected element, so close/open do not shift strokes
pub fn erode(img: &GrayImage, kernel: u32) -> GrayImage {
    let anchor = kernel / 2;
    grayscale_erode(img, &square(kernel, kernel.saturating_sub(1 + anchor)))
}

/// Solid `kernel`-square mask whose origin sits at `(center, center)`
fn square(kernel: u32, center: u32) -> Mask {
    let side = kernel.clamp(1, MAX_KERNEL);
    let center = center.min(side - 1) as u8;
    Mask::from_image(&GrayImage::from_pixel(side, side, Luma([255])), center, center)
}
