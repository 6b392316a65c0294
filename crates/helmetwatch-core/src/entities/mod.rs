//! Request-scoped entities produced by the pipeline stages

pub mod candidates;
pub mod ids;
pub mod status;

pub use candidates::{Candidates, MotorcycleCandidate, Motorcycles, PersonCandidate, Persons};
pub use ids::{Arena, EntityId, HeadId, IdMap, MotorcycleId, PersonId};
pub use status::{AssignmentSource, HelmetLedger, HelmetStatus, RiderAssignment, RiderAssignments};
