//! Helmetwatch computer vision pipeline
//!
//! Turns raw detections for one traffic image into riders, helmet status and
//! safety violations: multi-scale head fusion, safety-biased NMS, greedy
//! head/person/motorcycle association and violation assembly.

pub mod association;
pub mod backends;
pub mod bbox;
pub mod detection;
pub mod error;
pub mod pipeline;
pub mod response;
pub mod service;
pub mod utils;
pub mod violations;

// Re-export commonly used types
pub use association::{AssociationGraph, associate};
pub use bbox::{DetectionSource, HeadCollection, HeadDetection, RawDetection};
pub use detection::{DetectorSet, LocalDetection, ObjectDetector, PipelineConfig};
pub use error::PipelineError;
pub use pipeline::{HelmetPipeline, ImageAnalysis, PipelineStats};
pub use response::AnalysisResponse;
pub use service::{FailureReply, HelmetService, ServiceReply};
pub use violations::assemble_violations;

// Error handling
pub type Result<T> = anyhow::Result<T>;
