//! Image conditioning for handwritten invoice photos
//!
//! Turns an unevenly lit color photo into a binarized, size-normalized page
//! the text detector reads reliably.

pub mod debug;
pub mod pipeline;
pub mod steps;

pub use debug::{DebugArtifactWriter, PreprocessObserver};
pub use pipeline::{open_image, Pipeline, PreprocessConfig, PreprocessingResult, StepTiming};
pub use steps::denoise::DenoiseParams;
