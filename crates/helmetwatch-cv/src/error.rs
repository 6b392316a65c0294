//! Pipeline error kinds

use thiserror::Error;

/// Every way a request can fail. Any of these aborts the whole request.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Models not loaded: {0}")]
    ModelUnavailable(String),

    #[error("Failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    #[error("{detector} detector failed: {source}")]
    DetectorInvocation {
        detector: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl PipelineError {
    pub fn detector(detector: impl Into<String>, source: anyhow::Error) -> Self {
        Self::DetectorInvocation {
            detector: detector.into(),
            source,
        }
    }
}
