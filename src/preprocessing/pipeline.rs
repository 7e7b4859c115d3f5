use crate::error::OcrError;
use image::{DynamicImage, GenericImageView};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use super::debug::PreprocessObserver;
use super::steps;
use super::steps::denoise::DenoiseParams;

/// Tuning for every conditioning stage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreprocessConfig {
    pub clahe_clip_limit: f32,
    /// Tiles per side of the CLAHE grid
    pub clahe_tiles: u32,
    /// `None` skips denoising entirely
    pub denoise: Option<DenoiseParams>,
    /// Side of the square morphology element
    pub morph_kernel: u32,
    pub max_dimension: u32,
    pub min_dimension: u32,
    pub max_upscale: f32,
    /// Binarized pages with a mean below this are inverted
    pub invert_threshold: f32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            clahe_clip_limit: 2.0,
            clahe_tiles: 8,
            denoise: Some(DenoiseParams::default()),
            morph_kernel: 2,
            max_dimension: 1920,
            min_dimension: 800,
            max_upscale: 1.5,
            invert_threshold: 127.0,
        }
    }
}

/// Timing information for a single preprocessing step
#[derive(Debug, Clone, Serialize)]
pub struct StepTiming {
    pub name: String,
    pub time_ms: u64,
}

/// Result of preprocessing including timing stats
#[derive(Debug, Clone, Serialize)]
pub struct PreprocessingResult {
    /// Conditioned image (not serialized)
    #[serde(skip)]
    pub image: DynamicImage,
    /// Total preprocessing time in milliseconds
    pub total_time_ms: u64,
    /// Individual step timings
    pub steps: Vec<StepTiming>,
}

/// Fixed-order conditioning pipeline for photographed invoices
///
/// grayscale -> CLAHE -> denoise -> Otsu -> polarity -> close/open -> resize
#[derive(Clone, Default)]
pub struct Pipeline {
    config: PreprocessConfig,
    observer: Option<Arc<dyn PreprocessObserver>>,
}

impl Pipeline {
    pub fn new(config: PreprocessConfig) -> Self {
        Self {
            config,
            observer: None,
        }
    }

    /// Notify `observer` with every image conditioned from a file
    pub fn with_observer(mut self, observer: Arc<dyn PreprocessObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn config(&self) -> &PreprocessConfig {
        &self.config
    }

    /// Process an image through every stage
    pub fn process(&self, image: DynamicImage) -> Result<PreprocessingResult, OcrError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(OcrError::ImageRead(format!(
                "image has zero dimension ({}x{})",
                width, height
            )));
        }

        let start = Instant::now();
        let mut steps_timing = Vec::new();
        let cfg = &self.config;

        let mut img = image;
        img = self.run_step("grayscale", img, &mut steps_timing, steps::grayscale::apply)?;
        img = self.run_step("clahe", img, &mut steps_timing, |i| {
            steps::clahe::apply(i, cfg.clahe_clip_limit, cfg.clahe_tiles)
        })?;
        if let Some(params) = &cfg.denoise {
            img = self.run_step("denoise", img, &mut steps_timing, |i| {
                steps::denoise::apply(i, params)
            })?;
        }
        img = self.run_step("threshold", img, &mut steps_timing, steps::threshold::apply)?;
        img = self.run_step("polarity", img, &mut steps_timing, |i| {
            steps::polarity::apply(i, cfg.invert_threshold)
        })?;
        img = self.run_step("morphology", img, &mut steps_timing, |i| {
            steps::morphology::apply(i, cfg.morph_kernel)
        })?;
        img = self.run_step("resize", img, &mut steps_timing, |i| {
            steps::resize::apply(i, cfg.max_dimension, cfg.min_dimension, cfg.max_upscale)
        })?;

        let total_time_ms = start.elapsed().as_millis() as u64;
        tracing::debug!(
            "Preprocessed {}x{} -> {}x{} in {}ms",
            width,
            height,
            img.width(),
            img.height(),
            total_time_ms
        );

        Ok(PreprocessingResult {
            image: img,
            total_time_ms,
            steps: steps_timing,
        })
    }

    /// Decode `path`, condition it, and hand the result to the observer
    pub fn process_file(&self, path: &Path) -> Result<PreprocessingResult, OcrError> {
        let image = open_image(path)?;
        let result = self.process(image)?;
        if let Some(observer) = &self.observer {
            observer.on_conditioned(path, &result.image);
        }
        Ok(result)
    }

    fn run_step<F>(
        &self,
        name: &str,
        img: DynamicImage,
        timings: &mut Vec<StepTiming>,
        step_fn: F,
    ) -> Result<DynamicImage, OcrError>
    where
        F: FnOnce(DynamicImage) -> Result<DynamicImage, OcrError>,
    {
        let step_start = Instant::now();
        let result = step_fn(img)?;
        let time_ms = step_start.elapsed().as_millis() as u64;
        tracing::debug!("step {} took {}ms", name, time_ms);
        timings.push(StepTiming {
            name: name.to_string(),
            time_ms,
        });
        Ok(result)
    }
}

/// Decode an image file, mapping every failure to `ImageRead`
pub fn open_image(path: &Path) -> Result<DynamicImage, OcrError> {
    let image = image::open(path)
        .map_err(|e| OcrError::ImageRead(format!("{}: {}", path.display(), e)))?;
    if image.width() == 0 || image.height() == 0 {
        return Err(OcrError::ImageRead(format!(
            "{}: image has zero dimension",
            path.display()
        )));
    }
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::debug::PreprocessObserver;
    use image::{GrayImage, Luma, Rgb, RgbImage};
    use std::path::PathBuf;
    use std::sync::Mutex;

    fn fast_config() -> PreprocessConfig {
        PreprocessConfig {
            denoise: Some(DenoiseParams {
                strength: 10.0,
                template_window: 3,
                search_window: 3,
            }),
            ..PreprocessConfig::default()
        }
    }

    /// Unevenly lit page: bright left, shadowed right, with dark strokes
    fn invoice_photo(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            let light = 230 - (x * 120 / width.max(1)) as u8;
            if y % 20 < 3 && x % 40 < 30 {
                Rgb([light / 4, light / 4, light / 3])
            } else {
                Rgb([light, light, light.saturating_sub(5)])
            }
        })
    }

    #[test]
    fn test_pipeline_runs_every_stage_in_order() {
        let pipeline = Pipeline::new(fast_config());
        let result = pipeline
            .process(DynamicImage::ImageRgb8(invoice_photo(200, 120)))
            .unwrap();

        let names: Vec<&str> = result.steps.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "grayscale",
                "clahe",
                "denoise",
                "threshold",
                "polarity",
                "morphology",
                "resize"
            ]
        );
    }

    #[test]
    fn test_pipeline_skips_denoise_when_disabled() {
        let pipeline = Pipeline::new(PreprocessConfig {
            denoise: None,
            ..PreprocessConfig::default()
        });
        let result = pipeline
            .process(DynamicImage::ImageRgb8(invoice_photo(100, 60)))
            .unwrap();
        assert!(result.steps.iter().all(|s| s.name != "denoise"));
    }

    #[test]
    fn test_pipeline_output_is_light_page_within_range() {
        let pipeline = Pipeline::new(fast_config());
        let result = pipeline
            .process(DynamicImage::ImageRgb8(invoice_photo(1000, 700)))
            .unwrap();

        assert_eq!(result.image.dimensions(), (1000, 700));
        let gray = result.image.to_luma8();
        assert!(gray.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
        assert!(steps::polarity::mean_intensity(&gray) >= 127.0);
    }

    #[test]
    fn test_pipeline_downscales_large_photo() {
        // Skip denoise to keep the full-resolution run quick
        let pipeline = Pipeline::new(PreprocessConfig {
            denoise: None,
            ..PreprocessConfig::default()
        });
        let result = pipeline
            .process(DynamicImage::ImageRgb8(invoice_photo(3000, 2000)))
            .unwrap();
        assert_eq!(result.image.dimensions(), (1920, 1280));
    }

    #[test]
    fn test_pipeline_rejects_zero_dimension() {
        let pipeline = Pipeline::default();
        let err = pipeline
            .process(DynamicImage::ImageLuma8(GrayImage::new(0, 10)))
            .unwrap_err();
        assert!(matches!(err, OcrError::ImageRead(_)));
    }

    #[test]
    fn test_process_file_reports_unreadable_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"not a png").unwrap();

        let err = Pipeline::default().process_file(&path).unwrap_err();
        assert!(matches!(err, OcrError::ImageRead(_)));
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<(PathBuf, (u32, u32))>>);

    impl PreprocessObserver for Recorder {
        fn on_conditioned(&self, source: &Path, image: &DynamicImage) {
            self.0
                .lock()
                .unwrap()
                .push((source.to_path_buf(), image.dimensions()));
        }
    }

    #[test]
    fn test_process_file_notifies_observer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.png");
        GrayImage::from_pixel(40, 30, Luma([210]))
            .save(&path)
            .unwrap();

        let recorder = Arc::new(Recorder::default());
        let pipeline = Pipeline::new(fast_config()).with_observer(recorder.clone());
        let result = pipeline.process_file(&path).unwrap();

        let seen = recorder.0.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, path);
        assert_eq!(seen[0].1, result.image.dimensions());
    }
}
