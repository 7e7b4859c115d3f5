//! Drives conditioning and detection and assembles the transcript

use crate::detector::{DetectorConfig, Region, TextDetector};
use crate::error::{ErrorKind, OcrError};
use crate::preprocessing::{open_image, Pipeline};
use serde::Serialize;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

type DetectorFactory = Box<dyn Fn() -> Result<Arc<dyn TextDetector>, OcrError> + Send + Sync>;

/// Lazily constructed, reusable detector instance
///
/// Model loading is expensive, so the detector is built on first use and
/// then shared by every later call. Construction happens under a lock, so
/// concurrent first callers build it only once.
pub struct DetectorHandle {
    factory: DetectorFactory,
    cached: Mutex<Option<Arc<dyn TextDetector>>>,
    loaded: AtomicBool,
}

impl DetectorHandle {
    /// Build the detector with `factory` the first time it is needed
    pub fn lazy<F>(factory: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn TextDetector>, OcrError> + Send + Sync + 'static,
    {
        Self {
            factory: Box::new(factory),
            cached: Mutex::new(None),
            loaded: AtomicBool::new(false),
        }
    }

    /// Wrap an already constructed detector; `reset` rebuilds the same one
    pub fn from_detector(detector: Arc<dyn TextDetector>) -> Self {
        let seed = detector.clone();
        Self {
            factory: Box::new(move || Ok(seed.clone())),
            cached: Mutex::new(Some(detector)),
            loaded: AtomicBool::new(true),
        }
    }

    /// Return the cached detector, constructing it on first use
    ///
    /// A factory that panics is reported as an initialization failure and
    /// leaves the handle empty, so a later call or `reset` can retry.
    pub fn get(&self) -> Result<Arc<dyn TextDetector>, OcrError> {
        let mut cached = self.lock();

        if let Some(detector) = cached.as_ref() {
            return Ok(detector.clone());
        }

        tracing::info!("Loading text detector (first use)...");
        let start = Instant::now();
        let detector = panic::catch_unwind(AssertUnwindSafe(|| (self.factory)()))
            .map_err(|payload| {
                OcrError::InitializationError(panic_message(payload.as_ref()))
            })??;
        tracing::info!(
            "Text detector {} ready in {}ms",
            detector.name(),
            start.elapsed().as_millis()
        );
        *cached = Some(detector.clone());
        self.loaded.store(true, Ordering::Release);
        Ok(detector)
    }

    /// Drop the cached instance; the next `get` constructs a fresh one
    pub fn reset(&self) {
        let mut cached = self.lock();
        *cached = None;
        self.loaded.store(false, Ordering::Release);
    }

    /// Whether a detector is cached; never waits on a construction in flight
    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    fn lock(&self) -> MutexGuard<'_, Option<Arc<dyn TextDetector>>> {
        self.cached.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Transcript of a successful extraction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transcript {
    /// Region texts joined by single spaces, in detector order
    pub full_text: String,
    pub regions: Vec<Region>,
}

impl Transcript {
    pub fn from_regions(regions: Vec<Region>) -> Self {
        let full_text = regions
            .iter()
            .map(|r| r.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        Self { full_text, regions }
    }
}

/// Outcome of one extraction call; never a raised fault
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExtractionResult {
    Success(Transcript),
    Failure { kind: ErrorKind, message: String },
}

impl ExtractionResult {
    pub fn failure(err: &OcrError) -> Self {
        Self::Failure {
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn full_text(&self) -> &str {
        match self {
            Self::Success(t) => &t.full_text,
            Self::Failure { .. } => "",
        }
    }

    pub fn regions(&self) -> &[Region] {
        match self {
            Self::Success(t) => &t.regions,
            Self::Failure { .. } => &[],
        }
    }

    pub fn word_count(&self) -> usize {
        self.regions().len()
    }
}

/// Runs conditioning and detection for one image at a time
pub struct Extractor {
    detector: DetectorHandle,
    pipeline: Pipeline,
    config: DetectorConfig,
}

impl Extractor {
    pub fn new(detector: DetectorHandle, pipeline: Pipeline) -> Self {
        Self {
            detector,
            pipeline,
            config: DetectorConfig::default(),
        }
    }

    pub fn with_detector_config(mut self, config: DetectorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn detector(&self) -> &DetectorHandle {
        &self.detector
    }

    pub fn detector_config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Extract text from the image at `path`
    ///
    /// Always returns a well-formed result: a missing file, an undecodable
    /// image, a detector error and any panic along the way all become
    /// `Failure`.
    /// Zero detected regions is a successful, empty transcript.
    pub fn extract_text(&self, path: &Path, use_preprocessing: bool) -> ExtractionResult {
        tracing::info!("Processing image: {}", path.display());
        let start = Instant::now();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.try_extract(path, use_preprocessing)
        }))
        .unwrap_or_else(|payload| Err(OcrError::Internal(panic_message(payload.as_ref()))));

        match outcome {
            Ok(transcript) => {
                if transcript.regions.is_empty() {
                    tracing::info!("No text detected in {}", path.display());
                } else {
                    tracing::info!(
                        "Extracted {} regions ({} chars) in {}ms",
                        transcript.regions.len(),
                        transcript.full_text.chars().count(),
                        start.elapsed().as_millis()
                    );
                }
                ExtractionResult::Success(transcript)
            }
            Err(e) => {
                tracing::error!("Error processing {}: {}", path.display(), e);
                ExtractionResult::failure(&e)
            }
        }
    }

    fn try_extract(&self, path: &Path, use_preprocessing: bool) -> Result<Transcript, OcrError> {
        if !path.is_file() {
            return Err(OcrError::FileNotFound(path.to_path_buf()));
        }

        let image = if use_preprocessing {
            self.pipeline.process_file(path)?.image
        } else {
            open_image(path)?
        };

        let detector = self.detector.get()?;
        let config = &self.config;
        let regions = panic::catch_unwind(AssertUnwindSafe(|| detector.detect(&image, config)))
            .map_err(|payload| OcrError::DetectionFailure(panic_message(payload.as_ref())))?
            .map_err(|e| match e {
                OcrError::DetectionFailure(_) => e,
                other => OcrError::DetectionFailure(other.to_string()),
            })?;

        Ok(Transcript::from_regions(regions))
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::Point;
    use image::DynamicImage;
    use std::sync::atomic::AtomicUsize;
    use std::sync::mpsc;
    use std::thread;

    struct Fixed(Vec<Region>);

    impl TextDetector for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }
        fn description(&self) -> &'static str {
            "returns canned regions"
        }
        fn detect(&self, _: &DynamicImage, _: &DetectorConfig) -> Result<Vec<Region>, OcrError> {
            Ok(self.0.clone())
        }
        fn supported_languages(&self) -> Vec<String> {
            vec!["en".to_string()]
        }
    }

    fn square() -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 5.0),
            Point::new(0.0, 5.0),
        ]
    }

    #[test]
    fn test_transcript_joins_in_order_and_counts_empty_tokens() {
        let transcript = Transcript::from_regions(vec![
            Region::new(square(), "Total", 0.9),
            Region::new(square(), "", 0.3),
            Region::new(square(), "12.00", 0.7),
        ]);
        assert_eq!(transcript.full_text, "Total  12.00");
        assert_eq!(transcript.full_text.split(' ').count(), 3);
    }

    #[test]
    fn test_lazy_handle_builds_once() {
        let builds = Arc::new(AtomicUsize::new(0));
        let counter = builds.clone();
        let handle = DetectorHandle::lazy(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(Fixed(vec![])) as Arc<dyn TextDetector>)
        });

        assert!(!handle.is_loaded());
        handle.get().unwrap();
        handle.get().unwrap();
        assert!(handle.is_loaded());
        assert_eq!(builds.load(Ordering::SeqCst), 1);

        handle.reset();
        assert!(!handle.is_loaded());
        handle.get().unwrap();
        assert_eq!(builds.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_lazy_handle_propagates_construction_error() {
        let handle =
            DetectorHandle::lazy(|| Err(OcrError::InitializationError("no models".to_string())));
        let err = handle.get().err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Initialization);
        assert!(!handle.is_loaded());
    }

    #[test]
    fn test_lazy_handle_survives_panicking_factory() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();
        let handle = DetectorHandle::lazy(move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("corrupt model file");
            }
            Ok(Arc::new(Fixed(vec![])) as Arc<dyn TextDetector>)
        });

        let err = handle.get().err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Initialization);
        assert!(err.to_string().contains("corrupt model file"));
        assert!(!handle.is_loaded());

        handle.get().unwrap();
        assert!(handle.is_loaded());
        handle.reset();
        assert!(!handle.is_loaded());
    }

    #[test]
    fn test_is_loaded_does_not_wait_for_construction() {
        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let started_tx = Mutex::new(started_tx);
        let release_rx = Mutex::new(release_rx);
        let handle = Arc::new(DetectorHandle::lazy(move || {
            started_tx.lock().unwrap().send(()).unwrap();
            release_rx.lock().unwrap().recv().unwrap();
            Ok(Arc::new(Fixed(vec![])) as Arc<dyn TextDetector>)
        }));

        let loader = {
            let handle = handle.clone();
            thread::spawn(move || handle.get().is_ok())
        };
        started_rx.recv().unwrap();
        assert!(!handle.is_loaded());

        release_tx.send(()).unwrap();
        assert!(loader.join().unwrap());
        assert!(handle.is_loaded());
    }

    #[test]
    fn test_missing_file_is_structured_failure() {
        let extractor = Extractor::new(
            DetectorHandle::from_detector(Arc::new(Fixed(vec![]))),
            Pipeline::default(),
        );
        let result = extractor.extract_text(Path::new("does/not/exist.jpg"), true);
        match result {
            ExtractionResult::Failure { kind, .. } => assert_eq!(kind, ErrorKind::FileNotFound),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_failure_accessors_are_empty() {
        let result = ExtractionResult::failure(&OcrError::DetectionFailure("x".into()));
        assert!(!result.is_success());
        assert_eq!(result.full_text(), "");
        assert_eq!(result.word_count(), 0);
    }
}
