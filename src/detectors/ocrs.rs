//! OCRS detector implementation
//!
//! Pure Rust text detection and recognition using the ocrs library. No system
//! dependencies required. Downloads neural network models on first use.

use crate::detector::{DetectorConfig, Point, Region, TextDetector};
use crate::detectors::quality::line_confidence;
use crate::error::OcrError;
use image::DynamicImage;
use ocrs::{DecodeMethod, ImageSource, OcrEngine, OcrEngineParams, TextItem};
use rten::Model;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Default model URLs from the ocrs project
const DETECTION_MODEL_URL: &str =
    "https://ocrs-models.s3-accelerate.amazonaws.com/text-detection.rten";
const RECOGNITION_MODEL_URL: &str =
    "https://ocrs-models.s3-accelerate.amazonaws.com/text-recognition.rten";

/// Text detector wrapping the ocrs engine
pub struct OcrsDetector {
    engine: OcrEngine,
}

impl OcrsDetector {
    /// Load the detection and recognition models, downloading them if needed
    pub fn new(config: &DetectorConfig) -> Result<Self, OcrError> {
        if config.languages.iter().any(|l| l != "en" && l != "eng") {
            tracing::warn!(
                "ocrs recognizes Latin script only; requested languages {:?}",
                config.languages
            );
        }

        let detection_model_path =
            ensure_model_downloaded(DETECTION_MODEL_URL, "text-detection.rten")?;
        let recognition_model_path =
            ensure_model_downloaded(RECOGNITION_MODEL_URL, "text-recognition.rten")?;

        let detection_model = Model::load_file(&detection_model_path).map_err(|e| {
            OcrError::InitializationError(format!("Failed to load detection model: {}", e))
        })?;
        let recognition_model = Model::load_file(&recognition_model_path).map_err(|e| {
            OcrError::InitializationError(format!("Failed to load recognition model: {}", e))
        })?;

        let engine = OcrEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            decode_method: DecodeMethod::Greedy,
            ..Default::default()
        })
        .map_err(|e| {
            OcrError::InitializationError(format!("Failed to create OCR engine: {}", e))
        })?;

        tracing::info!("ocrs detector initialized successfully");

        Ok(Self { engine })
    }
}

impl TextDetector for OcrsDetector {
    fn name(&self) -> &'static str {
        "ocrs"
    }

    fn description(&self) -> &'static str {
        "Pure Rust text detector - no system dependencies required"
    }

    fn detect(
        &self,
        image: &DynamicImage,
        config: &DetectorConfig,
    ) -> Result<Vec<Region>, OcrError> {
        // ocrs exposes no score thresholds or batching knobs; the single
        // synchronous call already matches batch_size=1 with no workers
        tracing::debug!(
            "ocrs detect: text_threshold={} low_text={} batch_size={} workers={}",
            config.text_threshold,
            config.low_text_threshold,
            config.batch_size,
            config.workers
        );

        let rgb_img = image.to_rgb8();
        let dimensions = rgb_img.dimensions();

        let img_source = ImageSource::from_bytes(rgb_img.as_raw(), dimensions).map_err(|e| {
            OcrError::DetectionFailure(format!("Failed to create image source: {}", e))
        })?;

        let ocr_input = self
            .engine
            .prepare_input(img_source)
            .map_err(|e| OcrError::DetectionFailure(format!("Failed to prepare input: {}", e)))?;

        let word_rects = self
            .engine
            .detect_words(&ocr_input)
            .map_err(|e| OcrError::DetectionFailure(format!("Failed to detect words: {}", e)))?;

        let line_rects = self.engine.find_text_lines(&ocr_input, &word_rects);

        let line_texts = self
            .engine
            .recognize_text(&ocr_input, &line_rects)
            .map_err(|e| OcrError::DetectionFailure(format!("Failed to recognize text: {}", e)))?;

        let regions: Vec<Region> = line_texts
            .iter()
            .filter_map(|line| line.as_ref())
            .map(|line| {
                let text = line
                    .words()
                    .map(|word| word.to_string())
                    .collect::<Vec<_>>()
                    .join(" ");
                let corners = line
                    .rotated_rect()
                    .corners()
                    .iter()
                    .map(|c| Point::new(c.x, c.y))
                    .collect();
                let confidence = line_confidence(&text);
                Region::new(corners, text, confidence)
            })
            .collect();

        tracing::debug!("ocrs found {} text lines", regions.len());

        if config.group_into_paragraphs {
            return Ok(merge_into_paragraph(regions));
        }
        Ok(regions)
    }

    fn supported_languages(&self) -> Vec<String> {
        // ocrs currently only supports English/Latin alphabet
        vec!["en".to_string()]
    }
}

/// Collapse all lines into one region spanning their union bounding box
pub(crate) fn merge_into_paragraph(regions: Vec<Region>) -> Vec<Region> {
    if regions.is_empty() {
        return regions;
    }

    let points = regions.iter().flat_map(|r| r.bounding_polygon.iter());
    let (mut min_x, mut min_y) = (f32::INFINITY, f32::INFINITY);
    let (mut max_x, mut max_y) = (f32::NEG_INFINITY, f32::NEG_INFINITY);
    for p in points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    let polygon = if min_x.is_finite() {
        vec![
            Point::new(min_x, min_y),
            Point::new(max_x, min_y),
            Point::new(max_x, max_y),
            Point::new(min_x, max_y),
        ]
    } else {
        Vec::new()
    };

    let confidence =
        regions.iter().map(|r| r.confidence).sum::<f32>() / regions.len() as f32;
    let text = regions
        .iter()
        .map(|r| r.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    vec![Region::new(polygon, text, confidence)]
}

/// Ensure model is downloaded and return its path
fn ensure_model_downloaded(url: &str, filename: &str) -> Result<PathBuf, OcrError> {
    let cache_dir = dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("invoice-ocr");

    std::fs::create_dir_all(&cache_dir).map_err(|e| {
        OcrError::InitializationError(format!("Failed to create cache directory: {}", e))
    })?;

    let model_path = cache_dir.join(filename);

    if !model_path.exists() {
        tracing::info!("Downloading {} (this may take a moment)...", filename);
        download_file(url, &model_path)?;
        tracing::info!("Downloaded {} to {:?}", filename, model_path);
    } else {
        tracing::info!("Using cached model from {:?}", model_path);
    }

    Ok(model_path)
}

/// Download a file from URL to path using ureq
fn download_file(url: &str, path: &Path) -> Result<(), OcrError> {
    let response = ureq::get(url)
        .call()
        .map_err(|e| OcrError::InitializationError(format!("Failed to download model: {}", e)))?;

    let buffer = response.into_body().read_to_vec().map_err(|e| {
        OcrError::InitializationError(format!("Failed to read response body: {}", e))
    })?;

    // A truncated model must never land under the final name
    let partial = path.with_extension("partial");
    let mut file = File::create(&partial).map_err(|e| {
        OcrError::InitializationError(format!("Failed to create model file: {}", e))
    })?;
    file.write_all(&buffer)
        .map_err(|e| OcrError::InitializationError(format!("Failed to write model file: {}", e)))?;
    std::fs::rename(&partial, path)
        .map_err(|e| OcrError::InitializationError(format!("Failed to store model file: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(text: &str, x: f32, y: f32, confidence: f32) -> Region {
        Region::new(
            vec![
                Point::new(x, y),
                Point::new(x + 50.0, y),
                Point::new(x + 50.0, y + 10.0),
                Point::new(x, y + 10.0),
            ],
            text,
            confidence,
        )
    }

    #[test]
    fn test_merge_into_paragraph_spans_all_lines() {
        let merged = merge_into_paragraph(vec![
            line("Invoice", 10.0, 10.0, 0.9),
            line("Total", 20.0, 40.0, 0.5),
        ]);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].text, "Invoice Total");
        assert!((merged[0].confidence - 0.7).abs() < 1e-6);
        assert_eq!(merged[0].bounding_polygon[0], Point::new(10.0, 10.0));
        assert_eq!(merged[0].bounding_polygon[2], Point::new(70.0, 50.0));
    }

    #[test]
    fn test_merge_into_paragraph_empty() {
        assert!(merge_into_paragraph(vec![]).is_empty());
    }
}
