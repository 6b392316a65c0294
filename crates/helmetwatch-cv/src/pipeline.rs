//! Per-image pipeline entry point

use crate::association::{AssociationGraph, associate};
use crate::bbox::{HeadCollection, HeadStats, RawDetection};
use crate::detection::config::{HeadFilterConfig, HeadFusionConfig, PipelineConfig};
use crate::detection::detector::DetectorSet;
use crate::detection::fusion::{HeadFusion, detect_candidates};
use crate::error::PipelineError;
use crate::violations::assemble_violations;
use helmetwatch_core::{Candidates, Violation};
use image::RgbImage;
use serde::Serialize;
use tracing::{debug, info};

/// Head counts through the filter and NMS stages
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PipelineStats {
    pub raw_heads: HeadStats,
    pub after_filter: usize,
    pub after_nms: usize,
}

/// Everything the pipeline derived from one image
#[derive(Debug, Clone)]
pub struct ImageAnalysis {
    pub width: u32,
    pub height: u32,
    pub candidates: Candidates,
    pub heads: HeadCollection,
    pub graph: AssociationGraph,
    pub violations: Vec<Violation>,
    pub stats: PipelineStats,
}

/// Classify, apply the per-class floors, then deduplicate with safety NMS
pub fn filter_and_deduplicate(
    raw: Vec<RawDetection>,
    rules: &HeadFusionConfig,
    config: &HeadFilterConfig,
) -> (HeadCollection, PipelineStats) {
    let classified = HeadCollection::classify(raw, rules);
    let raw_heads = classified.stats();

    let filtered = classified.filter_by_class_floor(config);
    let after_filter = filtered.len();

    let kept = filtered.apply_safety_nms(config.nms_iou_threshold);
    let stats = PipelineStats {
        raw_heads,
        after_filter,
        after_nms: kept.len(),
    };

    debug!(
        "Heads: {} raw, {} after class floors, {} after NMS",
        stats.raw_heads.total, stats.after_filter, stats.after_nms
    );
    (kept, stats)
}

/// Sequential per-request pipeline over an injected, shared detector set
#[derive(Debug, Clone)]
pub struct HelmetPipeline {
    detectors: DetectorSet,
    config: PipelineConfig,
}

impl HelmetPipeline {
    pub fn new(detectors: DetectorSet, config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self { detectors, config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn analyze(&self, image: &RgbImage) -> Result<ImageAnalysis, PipelineError> {
        let (width, height) = image.dimensions();

        let candidates = detect_candidates(image, self.detectors.objects.as_ref(), &self.config.objects)?;

        let fusion = HeadFusion::new(self.detectors.heads.as_ref(), &self.config.heads);
        let raw = fusion.run(image, &candidates)?;

        let (heads, stats) = filter_and_deduplicate(raw, &self.config.heads, &self.config.filter);
        let graph = associate(&heads, &candidates, &self.config.association);
        let violations = assemble_violations(&heads, &candidates, &graph, &self.config.violations);

        info!(
            "Analyzed {}x{} image: {} persons, {} motorcycles, {} heads, {} violations",
            width,
            height,
            candidates.persons.len(),
            candidates.motorcycles.len(),
            heads.len(),
            violations.len()
        );

        Ok(ImageAnalysis {
            width,
            height,
            candidates,
            heads,
            graph,
            violations,
            stats,
        })
    }
}
