//! Helmetwatch core data model
//!
//! Geometry kernel and the request-scoped entities shared by the detection,
//! association and reporting stages.

pub mod entities;
pub mod geometry;
pub mod violation;

pub use entities::{
    AssignmentSource, Candidates, HelmetLedger, HelmetStatus, MotorcycleCandidate, MotorcycleId,
    PersonCandidate, PersonId, RiderAssignment, RiderAssignments,
};
pub use geometry::{BoundingBox, Point};
pub use violation::{Severity, Violation, ViolationBoxes, ViolationKind};
