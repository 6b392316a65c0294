//! Violation assembly over the final association graph

use crate::association::AssociationGraph;
use crate::bbox::HeadCollection;
use crate::detection::config::ViolationConfig;
use helmetwatch_core::entities::{EntityId, HeadId};
use helmetwatch_core::{Candidates, HelmetStatus, Severity, Violation, ViolationKind};

/// Derive violations: high severity no-helmet per bare head on a motorcycle,
/// medium severity no-helmet per fallback rider with no head evidence, and
/// one triple-riding violation per overloaded motorcycle.
pub fn assemble_violations(
    heads: &HeadCollection,
    candidates: &Candidates,
    graph: &AssociationGraph,
    config: &ViolationConfig,
) -> Vec<Violation> {
    let mut violations = Vec::new();

    for (index, head) in heads.iter().enumerate() {
        let head_id = HeadId::from_index(index);
        if !head.is_no_helmet {
            continue;
        }
        let Some(moto) = graph
            .motorcycle_of(head_id)
            .and_then(|id| candidates.motorcycles.get(id))
        else {
            continue;
        };

        let person = graph
            .person_of(head_id)
            .and_then(|id| candidates.persons.get(id));
        let description = match person {
            Some(p) => format!("Rider {} on motorcycle {} without helmet", p.id, moto.id),
            None => format!("Rider without helmet on motorcycle {}", moto.id),
        };

        let mut violation = Violation::new(ViolationKind::NoHelmet, Severity::High, description)
            .with_head(head.bbox)
            .with_motorcycle(moto.id, moto.bbox);
        if let Some(p) = person {
            violation = violation.with_person(p.id, p.bbox);
        }
        violations.push(violation);
    }

    for person in candidates.persons.values() {
        if !graph.is_fallback_rider(person.id)
            || graph.helmet_status(person.id) != HelmetStatus::Unknown
        {
            continue;
        }
        let Some(moto) = graph
            .assignments
            .get(person.id)
            .and_then(|a| candidates.motorcycles.get(a.motorcycle))
        else {
            continue;
        };

        violations.push(
            Violation::new(
                ViolationKind::NoHelmet,
                Severity::Medium,
                format!(
                    "Rider {} on motorcycle {}: head not visible, helmet could not be confirmed",
                    person.id, moto.id
                ),
            )
            .with_person(person.id, person.bbox)
            .with_motorcycle(moto.id, moto.bbox),
        );
    }

    for moto in candidates.motorcycles.values() {
        let riders = graph.riders_of(moto.id);
        if riders.len() <= config.triple_riding_threshold {
            continue;
        }

        let mut violation = Violation::new(
            ViolationKind::TripleRiding,
            Severity::High,
            format!("{} riders on motorcycle {}", riders.len(), moto.id),
        )
        .with_motorcycle(moto.id, moto.bbox);
        for person in riders.iter().filter_map(|&id| candidates.persons.get(id)) {
            violation = violation.with_person(person.id, person.bbox);
        }
        violations.push(violation);
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::association::associate;
    use crate::detection::config::AssociationConfig;
    use helmetwatch_core::{BoundingBox, PersonId};

    fn seated(count: usize) -> Candidates {
        let mut c = Candidates::default();
        c.add_motorcycle(BoundingBox::new(100.0, 100.0, 300.0, 400.0), 0.9);
        for i in 0..count {
            let x = 110.0 + 60.0 * i as f32;
            c.add_person(BoundingBox::new(x, 150.0, x + 70.0, 390.0), 0.8);
        }
        c
    }

    fn triple_riding(candidates: &Candidates) -> Vec<Violation> {
        let heads = HeadCollection::new();
        let graph = associate(&heads, candidates, &AssociationConfig::default());
        assemble_violations(&heads, candidates, &graph, &ViolationConfig::default())
            .into_iter()
            .filter(|v| v.kind == ViolationKind::TripleRiding)
            .collect()
    }

    #[test]
    fn test_two_riders_is_not_triple_riding() {
        assert!(triple_riding(&seated(2)).is_empty());
    }

    #[test]
    fn test_three_riders_is_triple_riding() {
        let violations = triple_riding(&seated(3));
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].severity, Severity::High);
        assert_eq!(violations[0].person_ids, vec![PersonId(0), PersonId(1), PersonId(2)]);
        assert_eq!(violations[0].boxes.persons.len(), 3);
    }

    #[test]
    fn test_headless_riders_get_medium_no_helmet() {
        let candidates = seated(2);
        let heads = HeadCollection::new();
        let graph = associate(&heads, &candidates, &AssociationConfig::default());
        let violations =
            assemble_violations(&heads, &candidates, &graph, &ViolationConfig::default());

        assert_eq!(violations.len(), 2);
        assert!(violations.iter().all(|v| v.is(ViolationKind::NoHelmet, Severity::Medium)));
    }
}
