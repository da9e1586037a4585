use nalgebra as na;
use serde_derive::{Deserialize, Serialize};

use crate::error::Error;

/// Axis-aligned box in pixel coordinates, stored as [x1, y1, x2, y2] with
/// (x1, y1) the top-left and (x2, y2) the bottom-right corner.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct BBox([f32; 4]);

impl From<BBox> for [f32; 4] {
    fn from(bbox: BBox) -> Self {
        bbox.0
    }
}

impl BBox {
    // Use carefully when you REALLY sure that corners are ordered
    #[inline]
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        BBox([x1, y1, x2, y2])
    }

    /// Boundary constructor: rejects non-finite coordinates and
    /// non-positive-area boxes.
    pub fn try_new(x1: f32, y1: f32, x2: f32, y2: f32) -> Result<Self, Error> {
        let finite = x1.is_finite() && y1.is_finite() && x2.is_finite() && y2.is_finite();

        if !finite || x1 >= x2 || y1 >= y2 {
            return Err(Error::InvalidBBox(x1, y1, x2, y2));
        }

        Ok(BBox([x1, y1, x2, y2]))
    }

    #[inline]
    pub fn as_slice(&self) -> &[f32; 4] {
        &self.0
    }

    #[inline(always)]
    pub fn x1(&self) -> f32 {
        self.0[0]
    }

    #[inline(always)]
    pub fn y1(&self) -> f32 {
        self.0[1]
    }

    #[inline(always)]
    pub fn x2(&self) -> f32 {
        self.0[2]
    }

    #[inline(always)]
    pub fn y2(&self) -> f32 {
        self.0[3]
    }

    #[inline(always)]
    pub fn width(&self) -> f32 {
        self.0[2] - self.0[0]
    }

    #[inline(always)]
    pub fn height(&self) -> f32 {
        self.0[3] - self.0[1]
    }

    #[inline]
    pub fn area(&self) -> f32 {
        self.width().max(0.) * self.height().max(0.)
    }

    #[inline]
    pub fn center(&self) -> na::Point2<f32> {
        na::Point2::new(
            (self.0[0] + self.0[2]) / 2.0,
            (self.0[1] + self.0[3]) / 2.0,
        )
    }

    #[inline]
    pub fn diagonal(&self) -> f32 {
        self.width().hypot(self.height())
    }

    #[inline]
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.0[0] && x <= self.0[2] && y >= self.0[1] && y <= self.0[3]
    }

    pub fn iou(&self, other: &BBox) -> f32 {
        let i_xmin = self.x1().max(other.x1());
        let i_ymin = self.y1().max(other.y1());
        let i_xmax = self.x2().min(other.x2());
        let i_ymax = self.y2().min(other.y2());

        let i_area = (i_xmax - i_xmin).max(0.) * (i_ymax - i_ymin).max(0.);
        let union = self.area() + other.area() - i_area;

        i_area / (union + 1e-6)
    }

    #[inline]
    pub fn center_distance(&self, other: &BBox) -> f32 {
        na::distance(&self.center(), &other.center())
    }
}
