//! Detector adapter contract
//!
//! The detection model is an external collaborator. The pipeline only sees it
//! through [`ObjectDetector`], which maps the pixels of one region to boxes in
//! that region's local frame.

use crate::Result;
use helmetwatch_core::BoundingBox;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// One model output in the local frame of the region it was run on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalDetection {
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
    pub confidence: f32,
    pub class_id: u32,
    pub label: String,
}

impl LocalDetection {
    pub fn new(bbox: BoundingBox, confidence: f32, class_id: u32, label: impl Into<String>) -> Self {
        Self {
            bbox,
            confidence,
            class_id,
            label: label.into(),
        }
    }
}

/// Stateless detection model. Implementations must tolerate concurrent calls
/// on independent regions.
pub trait ObjectDetector: Send + Sync {
    /// Human readable name used in logs and errors
    fn name(&self) -> &str;

    /// Detect objects in `region`, returning boxes relative to its top-left
    /// corner. `confidence_floor` drops weaker outputs; `input_size` is the
    /// square resolution the region is resized to before inference.
    fn detect(
        &self,
        region: &RgbImage,
        confidence_floor: f32,
        input_size: u32,
    ) -> Result<Vec<LocalDetection>>;
}

/// The two logical detectors a request needs
#[derive(Clone)]
pub struct DetectorSet {
    /// General-object model producing person and motorcycle boxes
    pub objects: Arc<dyn ObjectDetector>,
    /// Head model producing helmet and no-helmet boxes
    pub heads: Arc<dyn ObjectDetector>,
}

impl DetectorSet {
    pub fn new(objects: Arc<dyn ObjectDetector>, heads: Arc<dyn ObjectDetector>) -> Self {
        Self { objects, heads }
    }
}

impl fmt::Debug for DetectorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DetectorSet")
            .field("objects", &self.objects.name())
            .field("heads", &self.heads.name())
            .finish()
    }
}
