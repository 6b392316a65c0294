//! Association engine
//!
//! Three greedy passes in fixed order: heads to persons (helmet status),
//! heads to motorcycles, then persons without a head-derived seat to
//! motorcycles by box geometry. The order matters on ambiguous scenes and is
//! not interchangeable.

pub mod fallback;
pub mod head_motorcycle;
pub mod head_person;

pub use fallback::match_person_to_motorcycle;
pub use head_motorcycle::match_head_to_motorcycle;
pub use head_person::match_head_to_person;

use crate::bbox::HeadCollection;
use crate::detection::config::AssociationConfig;
use helmetwatch_core::entities::{EntityId, HeadId, IdMap};
use helmetwatch_core::{
    AssignmentSource, Candidates, HelmetLedger, HelmetStatus, MotorcycleId, PersonId,
    RiderAssignments,
};
use std::collections::BTreeSet;
use tracing::debug;

/// Rider/vehicle graph for one request
#[derive(Debug, Clone)]
pub struct AssociationGraph {
    pub head_person: IdMap<HeadId, Option<PersonId>>,
    pub head_motorcycle: IdMap<HeadId, Option<MotorcycleId>>,
    pub heads_per_motorcycle: IdMap<MotorcycleId, Vec<HeadId>>,
    pub helmet: HelmetLedger,
    pub assignments: RiderAssignments,
    /// Union of head-derived and fallback riders, ascending person id
    pub riders: IdMap<MotorcycleId, Vec<PersonId>>,
}

impl AssociationGraph {
    pub fn person_of(&self, head: HeadId) -> Option<PersonId> {
        self.head_person.get(head).copied().flatten()
    }

    pub fn motorcycle_of(&self, head: HeadId) -> Option<MotorcycleId> {
        self.head_motorcycle.get(head).copied().flatten()
    }

    pub fn riders_of(&self, moto: MotorcycleId) -> &[PersonId] {
        self.riders.get(moto).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn helmet_status(&self, person: PersonId) -> HelmetStatus {
        self.helmet.status(person)
    }

    pub fn is_fallback_rider(&self, person: PersonId) -> bool {
        self.assignments
            .get(person)
            .is_some_and(|a| a.source == AssignmentSource::Fallback)
    }
}

/// Build the association graph. `heads` must already be filtered and
/// deduplicated; head ids are indices into it.
pub fn associate(
    heads: &HeadCollection,
    candidates: &Candidates,
    config: &AssociationConfig,
) -> AssociationGraph {
    let persons = &candidates.persons;
    let motorcycles = &candidates.motorcycles;

    let mut helmet = HelmetLedger::new(persons.len());
    let mut head_person = IdMap::filled(heads.len(), None);
    for (index, head) in heads.iter().enumerate() {
        let head_id = HeadId::from_index(index);
        let matched = match_head_to_person(head, persons, &config.head_person);
        if let Some(person) = matched {
            helmet.observe(person, head.is_no_helmet);
        }
        if let Some(slot) = head_person.get_mut(head_id) {
            *slot = matched;
        }
    }

    let mut head_motorcycle = IdMap::filled(heads.len(), None);
    let mut heads_per_motorcycle: IdMap<MotorcycleId, Vec<HeadId>> =
        IdMap::filled(motorcycles.len(), Vec::new());
    for (index, head) in heads.iter().enumerate() {
        let head_id = HeadId::from_index(index);
        let Some(moto) = match_head_to_motorcycle(head, motorcycles, &config.head_motorcycle) else {
            continue;
        };
        if let Some(slot) = head_motorcycle.get_mut(head_id) {
            *slot = Some(moto);
        }
        if let Some(list) = heads_per_motorcycle.get_mut(moto) {
            list.push(head_id);
        }
    }

    let mut assignments = RiderAssignments::new(persons.len());
    let mut riders: IdMap<MotorcycleId, BTreeSet<PersonId>> =
        IdMap::filled(motorcycles.len(), BTreeSet::new());

    for (head_id, moto) in head_motorcycle.iter() {
        let (Some(moto), Some(person)) = (*moto, head_person.get(head_id).copied().flatten()) else {
            continue;
        };
        assignments.assign(person, moto, AssignmentSource::Head);
        // a person rides only the motorcycle their first matched head chose
        if assignments.get(person).map(|a| a.motorcycle) != Some(moto) {
            continue;
        }
        if let Some(set) = riders.get_mut(moto) {
            set.insert(person);
        }
    }

    for person in persons.values() {
        if assignments.is_assigned(person.id) {
            continue;
        }
        if let Some(moto) = match_person_to_motorcycle(person, motorcycles, &config.fallback) {
            if !assignments.assign(person.id, moto, AssignmentSource::Fallback) {
                continue;
            }
            if let Some(set) = riders.get_mut(moto) {
                set.insert(person.id);
            }
        }
    }

    let mut rider_lists = IdMap::filled(motorcycles.len(), Vec::new());
    for (moto, set) in riders.iter() {
        if let Some(list) = rider_lists.get_mut(moto) {
            *list = set.iter().copied().collect();
        }
    }

    debug!(
        "Association: {} heads on persons, {} heads on motorcycles, {} seated persons",
        head_person.iter().filter(|(_, p)| p.is_some()).count(),
        head_motorcycle.iter().filter(|(_, m)| m.is_some()).count(),
        assignments.iter().count()
    );

    AssociationGraph {
        head_person,
        head_motorcycle,
        heads_per_motorcycle,
        helmet,
        assignments,
        riders: rider_lists,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bbox::{DetectionSource, HeadDetection};
    use helmetwatch_core::BoundingBox;

    fn head(bbox: [f32; 4], no_helmet: bool) -> HeadDetection {
        HeadDetection {
            bbox: BoundingBox::from(bbox),
            confidence: 0.8,
            class_id: u32::from(no_helmet),
            label: (if no_helmet { "no_helmet" } else { "helmet" }).into(),
            source: DetectionSource::FullImage,
            is_no_helmet: no_helmet,
        }
    }

    fn scene() -> Candidates {
        let mut c = Candidates::default();
        c.add_motorcycle(BoundingBox::new(100.0, 100.0, 300.0, 400.0), 0.9);
        c.add_person(BoundingBox::new(120.0, 50.0, 200.0, 380.0), 0.9);
        c
    }

    #[test]
    fn test_no_helmet_sticks_in_either_order() {
        let c = scene();
        let helmet = head([140.0, 55.0, 180.0, 95.0], false);
        let bare = head([142.0, 57.0, 182.0, 97.0], true);

        for heads in [vec![helmet.clone(), bare.clone()], vec![bare, helmet]] {
            let graph = associate(&HeadCollection::from_vec(heads), &c, &AssociationConfig::default());
            assert_eq!(graph.helmet_status(PersonId(0)), HelmetStatus::NoHelmet);
        }
    }

    #[test]
    fn test_head_seats_person_and_blocks_fallback() {
        let c = scene();
        let heads = HeadCollection::from_vec(vec![head([140.0, 55.0, 180.0, 95.0], false)]);
        let graph = associate(&heads, &c, &AssociationConfig::default());

        assert_eq!(graph.person_of(HeadId(0)), Some(PersonId(0)));
        assert_eq!(graph.motorcycle_of(HeadId(0)), Some(MotorcycleId(0)));
        assert_eq!(graph.heads_per_motorcycle.get(MotorcycleId(0)), Some(&vec![HeadId(0)]));
        assert_eq!(graph.riders_of(MotorcycleId(0)), &[PersonId(0)]);
        assert!(!graph.is_fallback_rider(PersonId(0)));
    }

    #[test]
    fn test_headless_rider_found_by_fallback() {
        let c = scene();
        let graph = associate(&HeadCollection::new(), &c, &AssociationConfig::default());

        assert_eq!(graph.riders_of(MotorcycleId(0)), &[PersonId(0)]);
        assert!(graph.is_fallback_rider(PersonId(0)));
        assert_eq!(graph.helmet_status(PersonId(0)), HelmetStatus::Unknown);
    }

    #[test]
    fn test_two_heads_one_person_counted_once() {
        let c = scene();
        let heads = HeadCollection::from_vec(vec![
            head([140.0, 55.0, 180.0, 95.0], false),
            head([150.0, 60.0, 185.0, 95.0], false),
        ]);
        let graph = associate(&heads, &c, &AssociationConfig::default());
        assert_eq!(graph.riders_of(MotorcycleId(0)).len(), 1);
    }

    #[test]
    fn test_head_without_person_is_not_a_rider() {
        let mut c = Candidates::default();
        c.add_motorcycle(BoundingBox::new(100.0, 100.0, 300.0, 400.0), 0.9);
        let heads = HeadCollection::from_vec(vec![head([180.0, 60.0, 220.0, 100.0], true)]);
        let graph = associate(&heads, &c, &AssociationConfig::default());

        assert_eq!(graph.motorcycle_of(HeadId(0)), Some(MotorcycleId(0)));
        assert_eq!(graph.person_of(HeadId(0)), None);
        assert!(graph.riders_of(MotorcycleId(0)).is_empty());
    }

    #[test]
    fn test_person_rides_one_motorcycle_only() {
        let mut c = Candidates::default();
        c.add_motorcycle(BoundingBox::new(100.0, 300.0, 240.0, 600.0), 0.9);
        c.add_motorcycle(BoundingBox::new(260.0, 300.0, 400.0, 600.0), 0.9);
        c.add_person(BoundingBox::new(100.0, 0.0, 400.0, 600.0), 0.9);

        // one bare head above each motorcycle, both inside the same person
        let heads = HeadCollection::from_vec(vec![
            head([150.0, 100.0, 190.0, 140.0], true),
            head([310.0, 100.0, 350.0, 140.0], true),
        ]);
        let graph = associate(&heads, &c, &AssociationConfig::default());

        assert_eq!(graph.motorcycle_of(HeadId(0)), Some(MotorcycleId(0)));
        assert_eq!(graph.motorcycle_of(HeadId(1)), Some(MotorcycleId(1)));
        assert_eq!(
            graph.assignments.get(PersonId(0)).map(|a| a.motorcycle),
            Some(MotorcycleId(0))
        );
        assert_eq!(graph.riders_of(MotorcycleId(0)), &[PersonId(0)]);
        assert!(graph.riders_of(MotorcycleId(1)).is_empty());
    }
}
