//! Head to person matching

use crate::bbox::HeadDetection;
use crate::detection::config::HeadPersonConfig;
use helmetwatch_core::entities::Persons;
use helmetwatch_core::geometry::point_in_box;
use helmetwatch_core::{BoundingBox, PersonId};

/// The person whose upper body holds the head center, nearest by Manhattan
/// distance between centers. First person wins ties.
pub fn match_head_to_person(
    head: &HeadDetection,
    persons: &Persons,
    config: &HeadPersonConfig,
) -> Option<PersonId> {
    let head_center = head.bbox.center();
    let mut best: Option<(PersonId, f32)> = None;

    for person in persons.values() {
        let b = &person.bbox;
        let upper = BoundingBox::new(b.x1, b.y1, b.x2, b.y1 + b.height() * config.upper_fraction);
        let margin = b.width().max(b.height()) * config.margin_ratio;

        if !point_in_box(&head_center, &upper, margin) {
            continue;
        }

        let distance = head_center.manhattan(&b.center());
        if best.is_none_or(|(_, d)| distance < d) {
            best = Some((person.id, distance));
        }
    }

    best.map(|(id, _)| id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bbox::DetectionSource;
    use helmetwatch_core::Candidates;

    fn head_at(x1: f32, y1: f32, x2: f32, y2: f32) -> HeadDetection {
        HeadDetection {
            bbox: BoundingBox::new(x1, y1, x2, y2),
            confidence: 0.9,
            class_id: 0,
            label: "helmet".into(),
            source: DetectionSource::FullImage,
            is_no_helmet: false,
        }
    }

    #[test]
    fn test_head_in_upper_body_matches() {
        let mut c = Candidates::default();
        let p = c.add_person(BoundingBox::new(100.0, 100.0, 200.0, 400.0), 0.9);

        let head = head_at(130.0, 100.0, 170.0, 140.0);
        assert_eq!(match_head_to_person(&head, &c.persons, &HeadPersonConfig::default()), Some(p));
    }

    #[test]
    fn test_head_near_feet_does_not_match() {
        let mut c = Candidates::default();
        c.add_person(BoundingBox::new(100.0, 100.0, 200.0, 400.0), 0.9);

        // upper 60% ends at y=280, margin is 60 -> 340
        let head = head_at(130.0, 350.0, 170.0, 390.0);
        assert_eq!(match_head_to_person(&head, &c.persons, &HeadPersonConfig::default()), None);
    }

    #[test]
    fn test_margin_admits_head_just_above_box() {
        let mut c = Candidates::default();
        let p = c.add_person(BoundingBox::new(100.0, 100.0, 200.0, 400.0), 0.9);

        let head = head_at(130.0, 30.0, 170.0, 70.0);
        assert_eq!(match_head_to_person(&head, &c.persons, &HeadPersonConfig::default()), Some(p));
    }

    #[test]
    fn test_nearest_person_wins() {
        let mut c = Candidates::default();
        c.add_person(BoundingBox::new(100.0, 100.0, 200.0, 400.0), 0.9);
        let near = c.add_person(BoundingBox::new(150.0, 100.0, 250.0, 400.0), 0.9);

        let head = head_at(190.0, 110.0, 230.0, 150.0);
        assert_eq!(match_head_to_person(&head, &c.persons, &HeadPersonConfig::default()), Some(near));
    }
}
