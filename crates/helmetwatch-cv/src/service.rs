//! Service boundary
//!
//! Owns the pipeline (or the reason it could not be built) and is the one
//! place where internal errors become an external failure reply.

use crate::detection::config::PipelineConfig;
use crate::detection::detector::DetectorSet;
use crate::error::PipelineError;
use crate::pipeline::HelmetPipeline;
use crate::response::AnalysisResponse;
use crate::utils::ImageUtils;
use serde::Serialize;
use std::time::Instant;
use tracing::{error, warn};

/// Uniform failure body, whatever went wrong
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureReply {
    pub detail: String,
}

impl From<PipelineError> for FailureReply {
    fn from(err: PipelineError) -> Self {
        Self {
            detail: err.to_string(),
        }
    }
}

/// Either the full response or a failure, never a partial result
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ServiceReply {
    Success(AnalysisResponse),
    Failure(FailureReply),
}

impl ServiceReply {
    pub fn is_success(&self) -> bool {
        matches!(self, ServiceReply::Success(_))
    }
}

/// Image analysis service sharing one detector set across requests
#[derive(Debug, Clone)]
pub struct HelmetService {
    pipeline: Result<HelmetPipeline, String>,
}

impl HelmetService {
    pub fn new(detectors: DetectorSet, config: PipelineConfig) -> Result<Self, PipelineError> {
        Ok(Self {
            pipeline: Ok(HelmetPipeline::new(detectors, config)?),
        })
    }

    /// A service whose models failed to load; every request fails fast
    pub fn unavailable(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        warn!("Helmet service unavailable: {}", reason);
        Self {
            pipeline: Err(reason),
        }
    }

    /// Build from the outcome of model loading
    pub fn from_init(detectors: crate::Result<DetectorSet>, config: PipelineConfig) -> Self {
        match detectors {
            Ok(detectors) => Self::new(detectors, config).unwrap_or_else(|e| Self::unavailable(e.to_string())),
            Err(e) => Self::unavailable(format!("{e:#}")),
        }
    }

    pub fn readiness(&self) -> Result<&HelmetPipeline, PipelineError> {
        self.pipeline
            .as_ref()
            .map_err(|reason| PipelineError::ModelUnavailable(reason.clone()))
    }

    pub fn is_ready(&self) -> bool {
        self.pipeline.is_ok()
    }

    /// Decode and analyze one encoded image
    pub fn analyze(&self, bytes: &[u8]) -> Result<AnalysisResponse, PipelineError> {
        let pipeline = self.readiness()?;
        let started = Instant::now();

        let image = ImageUtils::decode(bytes)?;
        let analysis = pipeline.analyze(&image)?;

        Ok(AnalysisResponse::from_analysis(
            &analysis,
            started.elapsed().as_millis() as u64,
        ))
    }

    pub fn handle(&self, bytes: &[u8]) -> ServiceReply {
        match self.analyze(bytes) {
            Ok(response) => ServiceReply::Success(response),
            Err(err) => {
                error!("Request failed: {}", err);
                ServiceReply::Failure(err.into())
            }
        }
    }
}
