//! Bounding box geometry
//!
//! Pure functions over axis-aligned boxes in original-image pixel coordinates.

use serde::{Deserialize, Serialize};

/// A point in image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Manhattan distance to another point
    pub fn manhattan(&self, other: &Point) -> f32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }
}

/// Axis-aligned box `(x1, y1, x2, y2)`, serialized as `[x1, y1, x2, y2]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl From<[f32; 4]> for BoundingBox {
    fn from([x1, y1, x2, y2]: [f32; 4]) -> Self {
        Self { x1, y1, x2, y2 }
    }
}

impl From<BoundingBox> for [f32; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.x1, b.y1, b.x2, b.y2]
    }
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Build a box only if it has positive width and height
    pub fn checked(x1: f32, y1: f32, x2: f32, y2: f32) -> Option<Self> {
        let bbox = Self::new(x1, y1, x2, y2);
        bbox.is_valid().then_some(bbox)
    }

    /// `x2 > x1 && y2 > y1`, with finite coordinates
    pub fn is_valid(&self) -> bool {
        [self.x1, self.y1, self.x2, self.y2]
            .iter()
            .all(|v| v.is_finite())
            && self.x2 > self.x1
            && self.y2 > self.y1
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    /// Area, zero for degenerate boxes
    pub fn area(&self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    pub fn center(&self) -> Point {
        center(self)
    }

    /// Shift the box by a region offset (local frame to original frame)
    pub fn translate(&self, dx: f32, dy: f32) -> Self {
        Self::new(self.x1 + dx, self.y1 + dy, self.x2 + dx, self.y2 + dy)
    }

    pub fn iou(&self, other: &BoundingBox) -> f32 {
        iou(self, other)
    }

    /// Length of the overlap between the vertical extents of two boxes
    pub fn vertical_overlap(&self, other: &BoundingBox) -> f32 {
        (self.y2.min(other.y2) - self.y1.max(other.y1)).max(0.0)
    }

    pub fn to_array(&self) -> [f32; 4] {
        (*self).into()
    }
}

/// Intersection over union. Zero when the union is empty.
pub fn iou(a: &BoundingBox, b: &BoundingBox) -> f32 {
    let x1 = a.x1.max(b.x1);
    let y1 = a.y1.max(b.y1);
    let x2 = a.x2.min(b.x2);
    let y2 = a.y2.min(b.y2);

    let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let union = a.area() + b.area() - intersection;

    if union <= 0.0 {
        return 0.0;
    }

    (intersection / union).clamp(0.0, 1.0)
}

/// Grow a box by `ratio` of its size on the left, right and bottom, and by
/// `ratio_above` (defaulting to `ratio`) on top. The result is clipped to the
/// image and truncated to whole pixels.
pub fn expand(
    bbox: &BoundingBox,
    image_width: u32,
    image_height: u32,
    ratio: f32,
    ratio_above: Option<f32>,
) -> BoundingBox {
    let (x1, y1, x2, y2) = (bbox.x1 as f64, bbox.y1 as f64, bbox.x2 as f64, bbox.y2 as f64);
    let (w, h) = (x2 - x1, y2 - y1);
    let ratio = ratio as f64;
    let above = ratio_above.map_or(ratio, f64::from);

    clip_coords(
        [x1 - w * ratio, y1 - h * above, x2 + w * ratio, y2 + h * ratio],
        image_width,
        image_height,
    )
}

/// Clip to `[0, width] x [0, height]` and truncate to integer bounds
pub fn clip_to_pixels(bbox: &BoundingBox, image_width: u32, image_height: u32) -> BoundingBox {
    clip_coords(
        [bbox.x1, bbox.y1, bbox.x2, bbox.y2].map(f64::from),
        image_width,
        image_height,
    )
}

/// Values within this distance of a whole pixel are float noise from the
/// ratio arithmetic, not a fractional coordinate.
const PIXEL_SNAP: f64 = 1e-3;

fn clip_coords([x1, y1, x2, y2]: [f64; 4], image_width: u32, image_height: u32) -> BoundingBox {
    let w = f64::from(image_width);
    let h = f64::from(image_height);

    BoundingBox::new(
        to_pixel(x1, w),
        to_pixel(y1, h),
        to_pixel(x2, w),
        to_pixel(y2, h),
    )
}

fn to_pixel(value: f64, limit: f64) -> f32 {
    let clamped = value.clamp(0.0, limit);
    let nearest = clamped.round();
    if (clamped - nearest).abs() < PIXEL_SNAP {
        nearest as f32
    } else {
        clamped.trunc() as f32
    }
}

pub fn center(bbox: &BoundingBox) -> Point {
    Point::new((bbox.x1 + bbox.x2) / 2.0, (bbox.y1 + bbox.y2) / 2.0)
}

/// Containment test with the box grown by `margin` on every side. Inclusive.
pub fn point_in_box(point: &Point, bbox: &BoundingBox, margin: f32) -> bool {
    point.x >= bbox.x1 - margin
        && point.x <= bbox.x2 + margin
        && point.y >= bbox.y1 - margin
        && point.y <= bbox.y2 + margin
}
