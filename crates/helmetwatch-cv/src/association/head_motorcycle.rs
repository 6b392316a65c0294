//! Head to motorcycle matching

use crate::bbox::HeadDetection;
use crate::detection::config::HeadMotorcycleConfig;
use helmetwatch_core::entities::Motorcycles;
use helmetwatch_core::{BoundingBox, MotorcycleId};

/// Geometric plausibility of a head riding `moto`, `None` when a gate fails.
/// Score is `1 / (1 + dx + dy)` with `dx` the center offset over the
/// motorcycle width and `dy` the head center's distance outside the
/// motorcycle's vertical extent over its height.
pub fn head_motorcycle_score(
    head: &BoundingBox,
    moto: &BoundingBox,
    config: &HeadMotorcycleConfig,
) -> Option<f32> {
    let (mw, mh) = (moto.width(), moto.height());
    let head_center = head.center();
    let moto_center = moto.center();

    let tolerance = mw * config.span_ratio;
    if head_center.x < moto.x1 - tolerance || head_center.x > moto.x2 + tolerance {
        return None;
    }
    if head.y2 > moto.y2 + mh * config.below_ratio {
        return None;
    }
    if head.y1 < moto.y1 - mh * config.above_ratio {
        return None;
    }

    let dx = (head_center.x - moto_center.x).abs() / mw;
    let dy = (moto.y1 - head_center.y).max(head_center.y - moto.y2).max(0.0) / mh;

    Some(1.0 / (1.0 + dx + dy))
}

/// Highest-scoring motorcycle for a head. First motorcycle wins ties.
pub fn match_head_to_motorcycle(
    head: &HeadDetection,
    motorcycles: &Motorcycles,
    config: &HeadMotorcycleConfig,
) -> Option<MotorcycleId> {
    let mut best: Option<(MotorcycleId, f32)> = None;

    for moto in motorcycles.values() {
        let Some(score) = head_motorcycle_score(&head.bbox, &moto.bbox, config) else {
            continue;
        };
        if best.is_none_or(|(_, s)| score > s) {
            best = Some((moto.id, score));
        }
    }

    best.map(|(id, _)| id)
}
