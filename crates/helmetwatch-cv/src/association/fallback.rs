//! Person to motorcycle matching for riders without a matched head

use crate::detection::config::FallbackConfig;
use helmetwatch_core::entities::Motorcycles;
use helmetwatch_core::{BoundingBox, MotorcycleId, PersonCandidate};

/// Score a person box against a motorcycle box, `None` when any gate fails:
/// the person is not much taller than the vehicle, stands over its span,
/// ends near its bottom and overlaps it vertically.
pub fn fallback_score(person: &BoundingBox, moto: &BoundingBox, config: &FallbackConfig) -> Option<f32> {
    let (mw, mh) = (moto.width(), moto.height());
    let ph = person.height();

    if ph > mh * config.max_height_ratio {
        return None;
    }

    let person_cx = person.center().x;
    let tolerance = mw * config.span_ratio;
    if person_cx < moto.x1 - tolerance || person_cx > moto.x2 + tolerance {
        return None;
    }

    let bottom_gap = (person.y2 - moto.y2).abs();
    if bottom_gap > mh * config.bottom_ratio {
        return None;
    }

    let overlap_ratio = person.vertical_overlap(moto) / ph;
    if overlap_ratio < config.min_overlap_ratio {
        return None;
    }

    let dx = (person_cx - moto.center().x).abs() / mw;
    let dy = bottom_gap / mh;
    Some(overlap_ratio / (1.0 + dx + dy))
}

/// Best motorcycle for a person, accepted only above `min_score`
pub fn match_person_to_motorcycle(
    person: &PersonCandidate,
    motorcycles: &Motorcycles,
    config: &FallbackConfig,
) -> Option<MotorcycleId> {
    let mut best: Option<(MotorcycleId, f32)> = None;

    for moto in motorcycles.values() {
        let Some(score) = fallback_score(&person.bbox, &moto.bbox, config) else {
            continue;
        };
        if best.is_none_or(|(_, s)| score > s) {
            best = Some((moto.id, score));
        }
    }

    best.filter(|(_, score)| *score > config.min_score)
        .map(|(id, _)| id)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MOTO: BoundingBox = BoundingBox {
        x1: 100.0,
        y1: 100.0,
        x2: 300.0,
        y2: 400.0,
    };

    fn score(person: [f32; 4]) -> Option<f32> {
        fallback_score(&BoundingBox::from(person), &MOTO, &FallbackConfig::default())
    }

    #[test]
    fn test_seated_rider_passes() {
        let s = score([220.0, 150.0, 290.0, 390.0]).unwrap();
        assert!(s > 0.7 && s < 0.8);
    }

    #[test]
    fn test_tall_bystander_rejected() {
        // 460 > 1.5 * 300
        assert!(score([150.0, -60.0, 250.0, 400.0]).is_none());
    }

    #[test]
    fn test_person_beside_vehicle_rejected() {
        assert!(score([380.0, 150.0, 450.0, 400.0]).is_none());
    }

    #[test]
    fn test_bottom_far_from_vehicle_rejected() {
        // bottom gap 160 > 150
        assert!(score([150.0, 0.0, 250.0, 240.0]).is_none());
    }

    #[test]
    fn test_small_vertical_overlap_rejected() {
        // bottom within tolerance but only 10 of 60 pixels overlap
        let low_moto = BoundingBox::new(100.0, 300.0, 300.0, 400.0);
        let person = BoundingBox::new(150.0, 390.0, 250.0, 450.0);
        let config = FallbackConfig::default();
        assert!(fallback_score(&person, &low_moto, &config).is_none());
    }

    #[test]
    fn test_min_score_applied() {
        let mut candidates = helmetwatch_core::Candidates::default();
        candidates.add_motorcycle(MOTO, 0.9);
        let person = candidates.add_person(BoundingBox::new(220.0, 150.0, 290.0, 390.0), 0.9);
        let person = candidates.persons.get(person).unwrap().clone();

        let config = FallbackConfig::default();
        assert!(match_person_to_motorcycle(&person, &candidates.motorcycles, &config).is_some());

        let strict = FallbackConfig {
            min_score: 0.9,
            ..FallbackConfig::default()
        };
        assert!(match_person_to_motorcycle(&person, &candidates.motorcycles, &strict).is_none());
    }
}
