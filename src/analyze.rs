//! Command-line driver around the helmet service

use crate::Args;
use anyhow::{Context, Result};
use helmetwatch_cv::detection::DetectorSet;
use helmetwatch_cv::utils::ImageUtils;
use helmetwatch_cv::{FailureReply, HelmetService, PipelineConfig, ServiceReply};
use serde::Serialize;
use tracing::info;

#[derive(Serialize)]
struct ImageReport {
    image: String,
    result: ServiceReply,
}

/// Analyze every image and print the replies as JSON. Returns whether all
/// images succeeded.
pub fn run(args: &Args) -> Result<bool> {
    let config = match &args.config {
        Some(path) => PipelineConfig::from_toml_file(path)?,
        None => PipelineConfig::default(),
    };

    let service = HelmetService::from_init(load_detectors(args), config);
    if service.is_ready() {
        info!("Models loaded, analyzing {} image(s)", args.images.len());
    }

    let mut reports = Vec::with_capacity(args.images.len());
    for path in &args.images {
        let result = match ImageUtils::read_bytes(path) {
            Ok(bytes) => service.handle(&bytes),
            Err(e) => ServiceReply::Failure(FailureReply {
                detail: format!("{e:#}"),
            }),
        };
        reports.push(ImageReport {
            image: path.display().to_string(),
            result,
        });
    }

    let all_ok = reports.iter().all(|r| r.result.is_success());
    let json = if args.pretty {
        serde_json::to_string_pretty(&reports)
    } else {
        serde_json::to_string(&reports)
    };
    println!("{}", json.context("Failed to serialize results")?);

    Ok(all_ok)
}

#[cfg(feature = "backend-ort")]
fn load_detectors(args: &Args) -> Result<DetectorSet> {
    use helmetwatch_cv::backends::OnnxYoloDetector;
    use std::sync::Arc;

    const OBJECT_LABELS: [&str; 4] = ["person", "bicycle", "car", "motorcycle"];

    let object_model = args
        .object_model
        .as_ref()
        .context("No object model given (--object-model)")?;
    let head_model = args
        .head_model
        .as_ref()
        .context("No head model given (--head-model)")?;

    let objects = OnnxYoloDetector::load(
        object_model,
        OBJECT_LABELS.iter().map(|s| s.to_string()).collect(),
    )?;
    let heads = OnnxYoloDetector::load(head_model, args.head_labels.clone())?;

    Ok(DetectorSet::new(Arc::new(objects), Arc::new(heads)))
}

#[cfg(not(feature = "backend-ort"))]
fn load_detectors(_args: &Args) -> Result<DetectorSet> {
    anyhow::bail!("built without a detector backend (enable the backend-ort feature)")
}
