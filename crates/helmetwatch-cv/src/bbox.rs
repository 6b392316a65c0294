//! Head detection records, per-class filtering and safety-biased NMS

use crate::detection::config::{HeadFilterConfig, HeadFusionConfig};
use crate::detection::detector::LocalDetection;
use crate::utils::nms::greedy_nms;
use helmetwatch_core::{BoundingBox, MotorcycleId, PersonId};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Which detector pass produced a detection. Diagnostics only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DetectionSource {
    FullImage,
    MotorcycleRoi(MotorcycleId),
    PersonRoi(PersonId),
}

impl fmt::Display for DetectionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectionSource::FullImage => write!(f, "full_image"),
            DetectionSource::MotorcycleRoi(id) => write!(f, "roi_moto_{id}"),
            DetectionSource::PersonRoi(id) => write!(f, "roi_person_{id}"),
        }
    }
}

impl Serialize for DetectionSource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Detector output remapped into the original image frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawDetection {
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
    pub confidence: f32,
    pub class_id: u32,
    pub label: String,
    pub source: DetectionSource,
}

impl RawDetection {
    /// Shift a region-local detection by the region offset. Degenerate boxes
    /// are dropped.
    pub fn from_local(
        local: LocalDetection,
        offset_x: f32,
        offset_y: f32,
        source: DetectionSource,
    ) -> Option<Self> {
        let bbox = local.bbox.translate(offset_x, offset_y);
        bbox.is_valid().then(|| Self {
            bbox,
            confidence: local.confidence,
            class_id: local.class_id,
            label: local.label,
            source,
        })
    }
}

/// A head detection classified as helmet or no helmet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeadDetection {
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
    pub confidence: f32,
    pub class_id: u32,
    pub label: String,
    pub source: DetectionSource,
    #[serde(skip)]
    pub is_no_helmet: bool,
}

impl HeadDetection {
    pub fn classify(raw: RawDetection, rules: &HeadFusionConfig) -> Self {
        let is_no_helmet = rules.is_no_helmet(raw.class_id, &raw.label);
        Self {
            bbox: raw.bbox,
            confidence: raw.confidence,
            class_id: raw.class_id,
            label: raw.label,
            source: raw.source,
            is_no_helmet,
        }
    }
}

/// Collection of head detections with batch operations
#[derive(Debug, Clone, Default)]
pub struct HeadCollection {
    heads: Vec<HeadDetection>,
}

impl HeadCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_vec(heads: Vec<HeadDetection>) -> Self {
        Self { heads }
    }

    /// Classify raw head-model output
    pub fn classify(raw: Vec<RawDetection>, rules: &HeadFusionConfig) -> Self {
        raw.into_iter()
            .map(|detection| HeadDetection::classify(detection, rules))
            .collect()
    }

    pub fn push(&mut self, head: HeadDetection) {
        self.heads.push(head);
    }

    pub fn as_slice(&self) -> &[HeadDetection] {
        &self.heads
    }

    pub fn len(&self) -> usize {
        self.heads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heads.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, HeadDetection> {
        self.heads.iter()
    }

    /// Asymmetric per-class floors: no-helmet heads pass a low floor, helmet
    /// heads need the higher one.
    pub fn filter_by_class_floor(mut self, config: &HeadFilterConfig) -> Self {
        self.heads.retain(|head| {
            let floor = if head.is_no_helmet {
                config.no_helmet_floor
            } else {
                config.helmet_floor
            };
            head.confidence >= floor
        });
        self
    }

    /// Order by priority: no-helmet first, then confidence descending.
    /// The sort is stable so equal heads keep detection order.
    pub fn sort_by_priority(&mut self) {
        self.heads.sort_by(|a, b| {
            b.is_no_helmet
                .cmp(&a.is_no_helmet)
                .then(b.confidence.total_cmp(&a.confidence))
        });
    }

    /// NMS where a no-helmet head always wins over an overlapping helmet
    /// head, whatever their confidences.
    pub fn apply_safety_nms(mut self, iou_threshold: f32) -> Self {
        if self.heads.is_empty() {
            return self;
        }

        self.sort_by_priority();
        Self::from_vec(greedy_nms(self.heads, |head| head.bbox, iou_threshold))
    }

    pub fn stats(&self) -> HeadStats {
        let mut by_source: BTreeMap<String, usize> = BTreeMap::new();
        let mut no_helmet = 0;
        let mut total_confidence = 0.0;

        for head in &self.heads {
            *by_source.entry(head.source.to_string()).or_insert(0) += 1;
            if head.is_no_helmet {
                no_helmet += 1;
            }
            total_confidence += head.confidence;
        }

        HeadStats {
            total: self.heads.len(),
            no_helmet,
            helmet: self.heads.len() - no_helmet,
            by_source,
            avg_confidence: if self.heads.is_empty() {
                0.0
            } else {
                total_confidence / self.heads.len() as f32
            },
        }
    }
}

impl IntoIterator for HeadCollection {
    type Item = HeadDetection;
    type IntoIter = std::vec::IntoIter<HeadDetection>;

    fn into_iter(self) -> Self::IntoIter {
        self.heads.into_iter()
    }
}

impl FromIterator<HeadDetection> for HeadCollection {
    fn from_iter<T: IntoIterator<Item = HeadDetection>>(iter: T) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

/// Counts over a head collection
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HeadStats {
    pub total: usize,
    pub no_helmet: usize,
    pub helmet: usize,
    pub by_source: BTreeMap<String, usize>,
    pub avg_confidence: f32,
}
