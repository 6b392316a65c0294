//! Pipeline configuration

use crate::error::PipelineError;
use crate::Result;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main pipeline configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub objects: ObjectPassConfig,
    pub heads: HeadFusionConfig,
    pub filter: HeadFilterConfig,
    pub association: AssociationConfig,
    pub violations: ViolationConfig,
}

/// Stage 1: person and motorcycle candidates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectPassConfig {
    pub input_size: u32,
    pub confidence_floor: f32,
    pub person_class_id: u32,
    pub motorcycle_class_id: u32,
}

/// Stage 2: multi-scale head passes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadFusionConfig {
    pub full_image_input_size: u32,
    pub roi_input_size: u32,
    /// Only bounds output volume; the per-class floors do the real filtering
    pub raw_confidence_floor: f32,
    pub motorcycle_side_ratio: f32,
    pub motorcycle_top_ratio: f32,
    /// Fraction of the person box, from the top, cropped for the head pass
    pub person_head_fraction: f32,
    pub person_padding: f32,
    pub full_image_pass: bool,
    pub motorcycle_rois: bool,
    pub person_rois: bool,
    /// Class ids meaning "no helmet". Empty means decide from the label.
    pub no_helmet_class_ids: Vec<u32>,
}

/// Stage 3: per-class confidence floors and NMS
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadFilterConfig {
    pub no_helmet_floor: f32,
    pub helmet_floor: f32,
    pub nms_iou_threshold: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssociationConfig {
    pub head_person: HeadPersonConfig,
    pub head_motorcycle: HeadMotorcycleConfig,
    pub fallback: FallbackConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadPersonConfig {
    /// Upper share of the person box a head center must fall in
    pub upper_fraction: f32,
    /// Margin as a share of max(person width, person height)
    pub margin_ratio: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadMotorcycleConfig {
    /// Horizontal tolerance beyond the motorcycle span, share of its width
    pub span_ratio: f32,
    /// How far the head bottom may sit below the motorcycle bottom, share of its height
    pub below_ratio: f32,
    /// How far the head top may sit above the motorcycle top, share of its height
    pub above_ratio: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    pub max_height_ratio: f32,
    pub span_ratio: f32,
    pub bottom_ratio: f32,
    pub min_overlap_ratio: f32,
    pub min_score: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViolationConfig {
    /// A motorcycle carrying more riders than this is triple riding
    pub triple_riding_threshold: usize,
}

impl Default for ObjectPassConfig {
    fn default() -> Self {
        Self {
            input_size: 640,
            confidence_floor: 0.25,
            person_class_id: 0,
            motorcycle_class_id: 3,
        }
    }
}

impl Default for HeadFusionConfig {
    fn default() -> Self {
        Self {
            full_image_input_size: 640,
            roi_input_size: 320,
            raw_confidence_floor: 0.05,
            motorcycle_side_ratio: 0.60,
            motorcycle_top_ratio: 1.00,
            person_head_fraction: 0.45,
            person_padding: 0.10,
            full_image_pass: true,
            motorcycle_rois: true,
            person_rois: true,
            no_helmet_class_ids: Vec::new(),
        }
    }
}

impl Default for HeadFilterConfig {
    fn default() -> Self {
        Self {
            no_helmet_floor: 0.10,
            helmet_floor: 0.35,
            nms_iou_threshold: 0.40,
        }
    }
}

impl Default for HeadPersonConfig {
    fn default() -> Self {
        Self {
            upper_fraction: 0.60,
            margin_ratio: 0.20,
        }
    }
}

impl Default for HeadMotorcycleConfig {
    fn default() -> Self {
        Self {
            span_ratio: 0.30,
            below_ratio: 0.15,
            above_ratio: 2.0,
        }
    }
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            max_height_ratio: 1.5,
            span_ratio: 0.30,
            bottom_ratio: 0.50,
            min_overlap_ratio: 0.30,
            min_score: 0.1,
        }
    }
}

impl Default for ViolationConfig {
    fn default() -> Self {
        Self {
            triple_riding_threshold: 2,
        }
    }
}

impl HeadFusionConfig {
    /// Whether a head detection's class means the rider wears no helmet
    pub fn is_no_helmet(&self, class_id: u32, label: &str) -> bool {
        if !self.no_helmet_class_ids.is_empty() {
            return self.no_helmet_class_ids.contains(&class_id);
        }

        let normalized: String = label
            .chars()
            .filter(|c| c.is_alphanumeric())
            .flat_map(char::to_lowercase)
            .collect();

        normalized.starts_with("no") || normalized.contains("without")
    }
}

impl PipelineConfig {
    /// Single full-image head pass, no zoomed crops
    pub fn full_image_only() -> Self {
        let mut config = Self::default();
        config.heads.motorcycle_rois = false;
        config.heads.person_rois = false;
        config
    }

    /// Person crops only, the behavior before motorcycle ROIs existed
    pub fn rider_crops_only() -> Self {
        let mut config = Self::default();
        config.heads.full_image_pass = false;
        config.heads.motorcycle_rois = false;
        config
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: PipelineConfig =
            toml::from_str(contents).context("Failed to parse pipeline configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config: {:?}", path.as_ref()))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("Invalid config file: {:?}", path.as_ref()))
    }

    pub fn validate(&self) -> std::result::Result<(), PipelineError> {
        let unit = [
            ("objects.confidence_floor", self.objects.confidence_floor),
            ("heads.raw_confidence_floor", self.heads.raw_confidence_floor),
            ("heads.person_head_fraction", self.heads.person_head_fraction),
            ("filter.no_helmet_floor", self.filter.no_helmet_floor),
            ("filter.helmet_floor", self.filter.helmet_floor),
            ("filter.nms_iou_threshold", self.filter.nms_iou_threshold),
            ("association.head_person.upper_fraction", self.association.head_person.upper_fraction),
        ];
        for (name, value) in unit {
            if !(0.0..=1.0).contains(&value) {
                return Err(PipelineError::Config(format!("{name} must be within [0, 1], got {value}")));
            }
        }

        let non_negative = [
            ("heads.motorcycle_side_ratio", self.heads.motorcycle_side_ratio),
            ("heads.motorcycle_top_ratio", self.heads.motorcycle_top_ratio),
            ("heads.person_padding", self.heads.person_padding),
            ("association.head_person.margin_ratio", self.association.head_person.margin_ratio),
            ("association.head_motorcycle.span_ratio", self.association.head_motorcycle.span_ratio),
            ("association.head_motorcycle.below_ratio", self.association.head_motorcycle.below_ratio),
            ("association.head_motorcycle.above_ratio", self.association.head_motorcycle.above_ratio),
            ("association.fallback.max_height_ratio", self.association.fallback.max_height_ratio),
            ("association.fallback.span_ratio", self.association.fallback.span_ratio),
            ("association.fallback.bottom_ratio", self.association.fallback.bottom_ratio),
            ("association.fallback.min_overlap_ratio", self.association.fallback.min_overlap_ratio),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(PipelineError::Config(format!("{name} must be non-negative, got {value}")));
            }
        }

        if self.objects.input_size == 0
            || self.heads.full_image_input_size == 0
            || self.heads.roi_input_size == 0
        {
            return Err(PipelineError::Config("input sizes must be positive".into()));
        }

        Ok(())
    }
}
