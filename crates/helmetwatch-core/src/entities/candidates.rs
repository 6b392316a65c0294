use super::ids::{Arena, MotorcycleId, PersonId};
use crate::geometry::BoundingBox;
use serde::{Deserialize, Serialize};

/// A person box from the general object pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonCandidate {
    pub id: PersonId,
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
    pub confidence: f32,
}

/// A motorcycle box from the general object pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotorcycleCandidate {
    pub id: MotorcycleId,
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
    pub confidence: f32,
}

pub type Persons = Arena<PersonId, PersonCandidate>;
pub type Motorcycles = Arena<MotorcycleId, MotorcycleCandidate>;

/// Stage 1 output: persons and motorcycles with 0-based ids in detection order
#[derive(Debug, Clone, Default)]
pub struct Candidates {
    pub persons: Persons,
    pub motorcycles: Motorcycles,
}

impl Candidates {
    pub fn add_person(&mut self, bbox: BoundingBox, confidence: f32) -> PersonId {
        self.persons.alloc_with(|id| PersonCandidate {
            id,
            bbox,
            confidence,
        })
    }

    pub fn add_motorcycle(&mut self, bbox: BoundingBox, confidence: f32) -> MotorcycleId {
        self.motorcycles.alloc_with(|id| MotorcycleCandidate {
            id,
            bbox,
            confidence,
        })
    }
}
