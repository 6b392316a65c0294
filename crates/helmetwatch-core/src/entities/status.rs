//! Per-person helmet status and rider assignment

use super::ids::{IdMap, MotorcycleId, PersonId};
use serde::{Deserialize, Serialize};

/// Helmet evidence gathered for one person
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HelmetStatus {
    #[default]
    Unknown,
    Helmet,
    NoHelmet,
}

impl HelmetStatus {
    /// Fold one head observation into the status. `NoHelmet` is absorbing;
    /// `Helmet` only replaces `Unknown`.
    pub fn observe(self, no_helmet: bool) -> Self {
        match (self, no_helmet) {
            (_, true) => HelmetStatus::NoHelmet,
            (HelmetStatus::Unknown, false) => HelmetStatus::Helmet,
            (current, false) => current,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HelmetStatus::Unknown => "unknown",
            HelmetStatus::Helmet => "helmet",
            HelmetStatus::NoHelmet => "no_helmet",
        }
    }
}

/// How a person came to be seated on a motorcycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentSource {
    /// Through a head matched to both the person and the motorcycle
    Head,
    /// Through person/motorcycle box geometry alone
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiderAssignment {
    pub motorcycle: MotorcycleId,
    pub source: AssignmentSource,
}

/// Status for every person of a request, only moving toward `NoHelmet`
#[derive(Debug, Clone, PartialEq)]
pub struct HelmetLedger {
    statuses: IdMap<PersonId, HelmetStatus>,
}

impl HelmetLedger {
    pub fn new(person_count: usize) -> Self {
        Self {
            statuses: IdMap::filled(person_count, HelmetStatus::Unknown),
        }
    }

    /// Record a head observation; unknown ids are ignored
    pub fn observe(&mut self, person: PersonId, no_helmet: bool) -> HelmetStatus {
        match self.statuses.get_mut(person) {
            Some(status) => {
                *status = status.observe(no_helmet);
                *status
            }
            None => HelmetStatus::Unknown,
        }
    }

    pub fn status(&self, person: PersonId) -> HelmetStatus {
        self.statuses.get(person).copied().unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PersonId, HelmetStatus)> + '_ {
        self.statuses.iter().map(|(id, status)| (id, *status))
    }
}

/// Person to motorcycle mapping, each person written at most once
#[derive(Debug, Clone, PartialEq)]
pub struct RiderAssignments {
    slots: IdMap<PersonId, Option<RiderAssignment>>,
}

impl RiderAssignments {
    pub fn new(person_count: usize) -> Self {
        Self {
            slots: IdMap::filled(person_count, None),
        }
    }

    /// Assign a person to a motorcycle. Returns false if the person already
    /// has an assignment or is out of range.
    pub fn assign(
        &mut self,
        person: PersonId,
        motorcycle: MotorcycleId,
        source: AssignmentSource,
    ) -> bool {
        match self.slots.get_mut(person) {
            Some(slot) if slot.is_none() => {
                *slot = Some(RiderAssignment { motorcycle, source });
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, person: PersonId) -> Option<RiderAssignment> {
        self.slots.get(person).copied().flatten()
    }

    pub fn is_assigned(&self, person: PersonId) -> bool {
        self.get(person).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PersonId, RiderAssignment)> + '_ {
        self.slots
            .iter()
            .filter_map(|(id, slot)| slot.map(|assignment| (id, assignment)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_helmet_is_absorbing() {
        let helmet_first = HelmetStatus::Unknown.observe(false).observe(true);
        let no_helmet_first = HelmetStatus::Unknown.observe(true).observe(false);

        assert_eq!(helmet_first, HelmetStatus::NoHelmet);
        assert_eq!(no_helmet_first, HelmetStatus::NoHelmet);
        assert_eq!(HelmetStatus::Helmet.observe(false), HelmetStatus::Helmet);
    }

    #[test]
    fn test_ledger_ignores_unknown_person() {
        let mut ledger = HelmetLedger::new(1);
        assert_eq!(ledger.observe(PersonId(3), true), HelmetStatus::Unknown);
        assert_eq!(ledger.observe(PersonId(0), false), HelmetStatus::Helmet);
        assert_eq!(ledger.status(PersonId(0)), HelmetStatus::Helmet);
    }

    #[test]
    fn test_assignment_written_once() {
        let mut riders = RiderAssignments::new(2);
        assert!(riders.assign(PersonId(0), MotorcycleId(1), AssignmentSource::Head));
        assert!(!riders.assign(PersonId(0), MotorcycleId(0), AssignmentSource::Fallback));
        assert_eq!(riders.get(PersonId(0)).map(|a| a.motorcycle), Some(MotorcycleId(1)));
        assert!(!riders.is_assigned(PersonId(1)));
        assert!(!riders.assign(PersonId(9), MotorcycleId(0), AssignmentSource::Head));
    }
}
