//! Text extraction from photographed handwritten invoices
//!
//! The [`preprocessing`] pipeline conditions an unevenly lit photo into a
//! clean binarized page, a pluggable [`detector::TextDetector`] finds and
//! reads the text regions, and the [`extractor::Extractor`] assembles them
//! into a transcript that [`report`] renders for humans.

pub mod config;
pub mod detector;
pub mod detectors;
pub mod error;
pub mod extractor;
pub mod preprocessing;
pub mod report;
pub mod server;

pub use detector::{DetectorConfig, Point, Region, TextDetector};
pub use error::{ErrorKind, OcrError};
pub use extractor::{DetectorHandle, ExtractionResult, Extractor, Transcript};
pub use preprocessing::{Pipeline, PreprocessConfig};
pub use report::{ConfidenceBand, Statistics};

use std::sync::Arc;

/// Build an extractor wired to the compiled-in detector and debug artifacts
pub fn build_extractor(config: &config::Config) -> Extractor {
    let detector_config = config.detector.clone();
    let factory_config = detector_config.clone();
    let handle = DetectorHandle::lazy(move || detectors::create_detector(&factory_config));

    let mut pipeline = Pipeline::new(config.preprocess.clone());
    if let Some(dir) = &config.debug_dir {
        pipeline = pipeline.with_observer(Arc::new(preprocessing::DebugArtifactWriter::new(
            dir.clone(),
        )));
    }

    Extractor::new(handle, pipeline).with_detector_config(detector_config)
}
