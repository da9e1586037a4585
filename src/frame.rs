use crate::detection::Detection;
use crate::error::Error;

/// One detector output cycle: frame geometry, capture timestamp and the
/// already filtered detection list. Pixel data travels separately.
pub struct Frame {
    pub dims: (u32, u32),
    pub detections: Vec<Detection>,
    pub timestamp: f64, // in seconds
}

impl Frame {
    #[inline]
    pub fn new(dims: (u32, u32), timestamp: f64, detections: Vec<Detection>) -> Self {
        Self {
            dims,
            detections,
            timestamp,
        }
    }

    /// Boundary constructor: rejects zero-sized frame geometry.
    pub fn try_new(
        dims: (u32, u32),
        timestamp: f64,
        detections: Vec<Detection>,
    ) -> Result<Self, Error> {
        if dims.0 == 0 || dims.1 == 0 {
            return Err(Error::InvalidDims(dims.0, dims.1));
        }

        Ok(Self::new(dims, timestamp, detections))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.detections.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Detection> {
        self.detections.iter()
    }
}
