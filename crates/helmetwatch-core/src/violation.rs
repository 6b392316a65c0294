//! Safety rule violations

use crate::entities::{MotorcycleId, PersonId};
use crate::geometry::BoundingBox;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    NoHelmet,
    TripleRiding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Medium,
    High,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViolationKind::NoHelmet => write!(f, "no_helmet"),
            ViolationKind::TripleRiding => write!(f, "triple_riding"),
        }
    }
}

/// Boxes a violation points at
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViolationBoxes {
    pub persons: Vec<BoundingBox>,
    pub head: Option<BoundingBox>,
    pub motorcycle: Option<BoundingBox>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub kind: ViolationKind,
    pub severity: Severity,
    pub description: String,
    pub person_ids: Vec<PersonId>,
    pub motorcycle_id: Option<MotorcycleId>,
    pub boxes: ViolationBoxes,
}

impl Violation {
    pub fn new(kind: ViolationKind, severity: Severity, description: impl Into<String>) -> Self {
        Self {
            kind,
            severity,
            description: description.into(),
            person_ids: Vec::new(),
            motorcycle_id: None,
            boxes: ViolationBoxes::default(),
        }
    }

    pub fn with_person(mut self, id: PersonId, bbox: BoundingBox) -> Self {
        self.person_ids.push(id);
        self.boxes.persons.push(bbox);
        self
    }

    pub fn with_head(mut self, bbox: BoundingBox) -> Self {
        self.boxes.head = Some(bbox);
        self
    }

    pub fn with_motorcycle(mut self, id: MotorcycleId, bbox: BoundingBox) -> Self {
        self.motorcycle_id = Some(id);
        self.boxes.motorcycle = Some(bbox);
        self
    }

    pub fn is(&self, kind: ViolationKind, severity: Severity) -> bool {
        self.kind == kind && self.severity == severity
    }
}
