//! Greedy non-maximum suppression

use helmetwatch_core::BoundingBox;

/// Keep items in priority order, dropping every later item whose IoU with an
/// already kept one is at least `iou_threshold`. `items` must be sorted by
/// descending priority.
pub fn greedy_nms<T, F>(items: Vec<T>, bbox: F, iou_threshold: f32) -> Vec<T>
where
    F: Fn(&T) -> BoundingBox,
{
    let boxes: Vec<BoundingBox> = items.iter().map(&bbox).collect();
    let mut suppressed = vec![false; items.len()];

    for i in 0..boxes.len() {
        if suppressed[i] {
            continue;
        }
        for j in (i + 1)..boxes.len() {
            if !suppressed[j] && boxes[i].iou(&boxes[j]) >= iou_threshold {
                suppressed[j] = true;
            }
        }
    }

    items
        .into_iter()
        .zip(suppressed)
        .filter_map(|(item, gone)| (!gone).then_some(item))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suppresses_at_threshold() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        // IoU with `a` is exactly 0.5
        let b = BoundingBox::new(0.0, 0.0, 10.0, 5.0);
        let far = BoundingBox::new(50.0, 50.0, 60.0, 60.0);

        let kept = greedy_nms(vec![a, b, far], |b| *b, 0.5);
        assert_eq!(kept, vec![a, far]);

        let kept = greedy_nms(vec![a, b, far], |b| *b, 0.51);
        assert_eq!(kept.len(), 3);
    }

    #[test]
    fn test_suppressed_items_do_not_suppress() {
        // b overlaps a and c, a and c are disjoint: c must survive
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(3.0, 0.0, 13.0, 10.0);
        let c = BoundingBox::new(8.0, 0.0, 18.0, 10.0);

        let kept = greedy_nms(vec![a, b, c], |b| *b, 0.3);
        assert_eq!(kept, vec![a, c]);
    }
}
