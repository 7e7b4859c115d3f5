use crate::error::OcrError;
use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// A 2D point in image pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// One detected text unit as returned by a detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// Ordered polygon corners, usually four and not necessarily axis-aligned
    #[serde(rename = "bbox")]
    pub bounding_polygon: Vec<Point>,
    pub text: String,
    /// Detection confidence in [0, 1]
    pub confidence: f32,
}

impl Region {
    pub fn new(bounding_polygon: Vec<Point>, text: impl Into<String>, confidence: f32) -> Self {
        Self {
            bounding_polygon,
            text: text.into(),
            confidence,
        }
    }
}

/// Tuning passed to every `detect` call.
///
/// The defaults favour accuracy over throughput for small handwritten
/// batches: one image per batch, no worker threads, no paragraph merging.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectorConfig {
    pub text_threshold: f32,
    pub low_text_threshold: f32,
    pub batch_size: usize,
    pub workers: usize,
    pub group_into_paragraphs: bool,
    pub languages: Vec<String>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            text_threshold: 0.6,
            low_text_threshold: 0.4,
            batch_size: 1,
            workers: 0,
            group_into_paragraphs: false,
            languages: vec!["en".to_string()],
        }
    }
}

/// Trait that all text detectors must implement
pub trait TextDetector: Send + Sync {
    /// Returns the detector identifier (e.g., "ocrs")
    fn name(&self) -> &'static str;

    /// Returns a human-readable description of the detector
    fn description(&self) -> &'static str;

    /// Locate and recognize text, returning regions in reading order
    fn detect(&self, image: &DynamicImage, config: &DetectorConfig)
        -> Result<Vec<Region>, OcrError>;

    /// Get supported languages
    fn supported_languages(&self) -> Vec<String>;
}
