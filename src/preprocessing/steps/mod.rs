//! Individual preprocessing steps, in pipeline order

pub mod grayscale;
pub mod clahe;
pub mod denoise;
pub mod threshold;
pub mod polarity;
pub mod morphology;
pub mod resize;
