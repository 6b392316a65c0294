//! JSON response model

use crate::bbox::DetectionSource;
use crate::pipeline::ImageAnalysis;
use helmetwatch_core::entities::{EntityId, HeadId};
use helmetwatch_core::{
    BoundingBox, HelmetStatus, MotorcycleId, PersonId, Severity, Violation, ViolationKind,
};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionRecord {
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
    pub confidence: f32,
    pub label: String,
    pub class_id: u32,
    pub person_id: Option<PersonId>,
    pub source: DetectionSource,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersonRecord {
    pub id: PersonId,
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
    pub confidence: f32,
    pub helmet_status: HelmetStatus,
    pub on_motorcycle: bool,
    pub motorcycle_id: Option<MotorcycleId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MotorcycleRecord {
    pub id: MotorcycleId,
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
    pub confidence: f32,
    pub rider_count: usize,
    pub rider_ids: Vec<PersonId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViolationRecord {
    #[serde(rename = "type")]
    pub kind: ViolationKind,
    pub severity: Severity,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub person_id: Option<PersonId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub person_box: Option<BoundingBox>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head_box: Option<BoundingBox>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub motorcycle_id: Option<MotorcycleId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub motorcycle_box: Option<BoundingBox>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rider_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub person_ids: Option<Vec<PersonId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub person_boxes: Option<Vec<BoundingBox>>,
}

impl From<&Violation> for ViolationRecord {
    fn from(v: &Violation) -> Self {
        let mut record = Self {
            kind: v.kind,
            severity: v.severity,
            description: v.description.clone(),
            person_id: None,
            person_box: None,
            head_box: v.boxes.head,
            motorcycle_id: v.motorcycle_id,
            motorcycle_box: v.boxes.motorcycle,
            rider_count: None,
            person_ids: None,
            person_boxes: None,
        };

        match v.kind {
            ViolationKind::NoHelmet => {
                record.person_id = v.person_ids.first().copied();
                record.person_box = v.boxes.persons.first().copied();
            }
            ViolationKind::TripleRiding => {
                record.rider_count = Some(v.person_ids.len());
                record.person_ids = Some(v.person_ids.clone());
                record.person_boxes = Some(v.boxes.persons.clone());
            }
        }
        record
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

/// Successful response for one image
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResponse {
    pub detections: Vec<DetectionRecord>,
    pub persons: Vec<PersonRecord>,
    pub motorcycles: Vec<MotorcycleRecord>,
    pub violations: Vec<ViolationRecord>,
    pub image_size: ImageSize,
    pub processing_time_ms: u64,
}

impl AnalysisResponse {
    pub fn from_analysis(analysis: &ImageAnalysis, processing_time_ms: u64) -> Self {
        let graph = &analysis.graph;
        let candidates = &analysis.candidates;

        let detections = analysis
            .heads
            .iter()
            .enumerate()
            .map(|(index, head)| DetectionRecord {
                bbox: head.bbox,
                confidence: head.confidence,
                label: head.label.clone(),
                class_id: head.class_id,
                person_id: graph.person_of(HeadId::from_index(index)),
                source: head.source,
            })
            .collect();

        let persons = candidates
            .persons
            .values()
            .map(|person| {
                let assignment = graph.assignments.get(person.id);
                PersonRecord {
                    id: person.id,
                    bbox: person.bbox,
                    confidence: person.confidence,
                    helmet_status: graph.helmet_status(person.id),
                    on_motorcycle: assignment.is_some(),
                    motorcycle_id: assignment.map(|a| a.motorcycle),
                }
            })
            .collect();

        let motorcycles = candidates
            .motorcycles
            .values()
            .map(|moto| {
                let riders = graph.riders_of(moto.id);
                MotorcycleRecord {
                    id: moto.id,
                    bbox: moto.bbox,
                    confidence: moto.confidence,
                    rider_count: riders.len(),
                    rider_ids: riders.to_vec(),
                }
            })
            .collect();

        Self {
            detections,
            persons,
            motorcycles,
            violations: analysis.violations.iter().map(ViolationRecord::from).collect(),
            image_size: ImageSize {
                width: analysis.width,
                height: analysis.height,
            },
            processing_time_ms,
        }
    }

    pub fn count(&self, kind: ViolationKind, severity: Severity) -> usize {
        self.violations
            .iter()
            .filter(|v| v.kind == kind && v.severity == severity)
            .count()
    }
}
