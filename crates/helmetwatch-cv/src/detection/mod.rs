//! Detection stages: detector contract, configuration and multi-scale fusion

pub mod config;
pub mod detector;
pub mod fusion;

pub use config::PipelineConfig;
pub use detector::{DetectorSet, LocalDetection, ObjectDetector};
pub use fusion::{HeadFusion, detect_candidates};
