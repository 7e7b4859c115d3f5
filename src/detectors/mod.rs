//! Text detector backends
//!
//! Each backend implements the `TextDetector` trait and is compiled in
//! behind its own feature flag.

#[cfg(feature = "engine-ocrs")]
pub mod ocrs;

pub mod quality;

use crate::detector::{DetectorConfig, TextDetector};
use crate::error::OcrError;
use std::sync::Arc;

/// Construct the compiled-in detector backend
pub fn create_detector(config: &DetectorConfig) -> Result<Arc<dyn TextDetector>, OcrError> {
    #[cfg(feature = "engine-ocrs")]
    {
        tracing::info!("Initializing ocrs detector...");
        Ok(Arc::new(ocrs::OcrsDetector::new(config)?))
    }

    #[cfg(not(feature = "engine-ocrs"))]
    {
        let _ = config;
        Err(OcrError::InitializationError(
            "No text detector available. Build with --features engine-ocrs".to_string(),
        ))
    }
}
