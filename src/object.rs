use geo::{coord, prelude::*, Rect};
use nalgebra::Vector4;
use serde::{Deserialize, Serialize};

/// A box as `[center_x, center_y, aspect_ratio, height]`, where the
/// aspect ratio is `width / height`.
pub type Xyah = Vector4<f32>;

/// An axis-aligned box stored as top-left corner plus size.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// One detector output for one frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub bbox: BBox,
    pub score: f32,
}

/// A track reported by [Tracker::update](crate::Tracker::update).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackedObject {
    pub track_id: usize,
    pub bbox: BBox,
    /// Score of the detection that last updated the track.
    pub score: f32,
    pub frame_id: usize,
    pub start_frame: usize,
}

impl BBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_xyah(xyah: &Xyah) -> Self {
        let height = xyah[3];
        let width = xyah[2] * height;
        Self {
            x: xyah[0] - width / 2.0,
            y: xyah[1] - height / 2.0,
            width,
            height,
        }
    }

    pub fn to_xyah(&self) -> Xyah {
        Xyah::new(
            self.x + self.width / 2.0,
            self.y + self.height / 2.0,
            self.width / self.height,
            self.height,
        )
    }

    /// Returns `[x1, y1, x2, y2]`.
    pub fn tlbr(&self) -> [f32; 4] {
        [self.x, self.y, self.x + self.width, self.y + self.height]
    }

    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    pub fn is_valid(&self) -> bool {
        let Self {
            x,
            y,
            width,
            height,
        } = *self;
        let is_finite = x.is_finite() && y.is_finite() && width.is_finite() && height.is_finite();
        is_finite && width > 0.0 && height > 0.0
    }

    fn to_geo_rect(&self) -> Rect<f32> {
        let [x1, y1, x2, y2] = self.tlbr();
        Rect::new(coord! { x: x1, y: y1 }, coord! { x: x2, y: y2 })
    }

    /// Area of the overlapping region, zero when the boxes are disjoint.
    pub fn intersection(&self, other: &BBox) -> f32 {
        let lhs = self.to_geo_rect();
        let rhs = other.to_geo_rect();

        let min_x = lhs.min().x.max(rhs.min().x);
        let min_y = lhs.min().y.max(rhs.min().y);
        let max_x = lhs.max().x.min(rhs.max().x);
        let max_y = lhs.max().y.min(rhs.max().y);
        if !(max_x > min_x && max_y > min_y) {
            return 0.0;
        }

        Rect::new(coord! { x: min_x, y: min_y }, coord! { x: max_x, y: max_y }).unsigned_area()
    }

    /// Intersection over union. Degenerate boxes have no overlap with anything.
    pub fn iou_with(&self, other: &BBox) -> f32 {
        if !self.is_valid() || !other.is_valid() {
            return 0.0;
        }
        let intersec = self.intersection(other);
        let union = self.area() + other.area() - intersec;
        if union <= 0.0 {
            return 0.0;
        }
        (intersec / union).clamp(0.0, 1.0)
    }
}

impl Detection {
    pub fn new(bbox: BBox, score: f32) -> Self {
        Self { bbox, score }
    }

    /// Whether the detection may take part in association at all.
    pub fn is_valid(&self) -> bool {
        self.bbox.is_valid() && self.score.is_finite() && self.score >= 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn xyah_round_trip() {
        let bbox = BBox::new(10., 10., 20., 40.);
        let xyah = bbox.to_xyah();
        assert_relative_eq!(xyah[0], 20.);
        assert_relative_eq!(xyah[1], 30.);
        assert_relative_eq!(xyah[2], 0.5);
        assert_relative_eq!(xyah[3], 40.);

        let back = BBox::from_xyah(&xyah);
        assert_relative_eq!(back.x, bbox.x);
        assert_relative_eq!(back.y, bbox.y);
        assert_relative_eq!(back.width, bbox.width);
        assert_relative_eq!(back.height, bbox.height);
    }

    #[test]
    fn iou_of_identical_boxes_is_one() {
        let bbox = BBox::new(3., 4., 17., 9.);
        assert_relative_eq!(bbox.iou_with(&bbox), 1.0);
    }

    #[test]
    fn iou_of_disjoint_boxes_is_zero() {
        let lhs = BBox::new(0., 0., 10., 10.);
        let rhs = BBox::new(20., 0., 10., 10.);
        assert_eq!(lhs.iou_with(&rhs), 0.0);

        // Touching edges share no area.
        let touching = BBox::new(10., 0., 10., 10.);
        assert_eq!(lhs.iou_with(&touching), 0.0);
    }

    #[test]
    fn iou_of_partial_overlap() {
        let lhs = BBox::new(0., 0., 10., 10.);
        let rhs = BBox::new(5., 0., 10., 10.);
        // 50 / (100 + 100 - 50)
        assert_relative_eq!(lhs.iou_with(&rhs), 1. / 3., epsilon = 1e-6);
        assert_relative_eq!(rhs.iou_with(&lhs), lhs.iou_with(&rhs));

        let inner = BBox::new(2., 2., 5., 5.);
        assert_relative_eq!(lhs.iou_with(&inner), 0.25, epsilon = 1e-6);
    }

    #[test]
    fn iou_stays_in_unit_interval() {
        let boxes = [
            BBox::new(0., 0., 1., 1.),
            BBox::new(0.5, 0.5, 3., 0.2),
            BBox::new(-4., -4., 100., 100.),
            BBox::new(2., 7., 8., 1.),
        ];
        for lhs in &boxes {
            for rhs in &boxes {
                let iou = lhs.iou_with(rhs);
                assert!((0.0..=1.0).contains(&iou));
                assert_relative_eq!(iou, rhs.iou_with(lhs));
            }
        }
    }

    #[test]
    fn degenerate_boxes_never_overlap() {
        let bbox = BBox::new(0., 0., 10., 10.);
        assert_eq!(bbox.iou_with(&BBox::new(0., 0., 0., 10.)), 0.0);
        assert_eq!(bbox.iou_with(&BBox::new(0., 0., 10., -5.)), 0.0);
    }

    #[test]
    fn malformed_detections_are_invalid() {
        let bbox = BBox::new(0., 0., 10., 10.);
        assert!(Detection::new(bbox, 0.7).is_valid());
        assert!(Detection::new(bbox, 0.0).is_valid());
        assert!(!Detection::new(bbox, -0.1).is_valid());
        assert!(!Detection::new(bbox, f32::NAN).is_valid());
        assert!(!Detection::new(BBox::new(0., 0., 0., 10.), 0.9).is_valid());
        assert!(!Detection::new(BBox::new(0., 0., 10., -1.), 0.9).is_valid());
        assert!(!Detection::new(BBox::new(f32::NAN, 0., 10., 10.), 0.9).is_valid());
    }
}
