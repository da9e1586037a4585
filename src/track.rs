use serde_derive::{Deserialize, Serialize};

use crate::bbox::BBox;
use crate::detection::Detection;

/// A live track: the latest detection state under a stable identity.
#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
pub struct Track {
    pub id: u32,
    pub bbox: BBox,
    #[serde(rename = "cls")]
    pub class: i32,
    #[serde(rename = "conf")]
    pub confidence: f32,

    // consecutive cycles without a matching detection; not part of the wire format
    #[serde(skip)]
    pub lost: u32,
}

impl Track {
    pub(crate) fn new(id: u32, det: &Detection) -> Self {
        Self {
            id,
            bbox: det.bbox,
            class: det.class,
            confidence: det.confidence,
            lost: 0,
        }
    }

    /// Refreshes the track from a matched detection.
    #[inline]
    pub(crate) fn hit(&mut self, det: &Detection) {
        self.bbox = det.bbox;
        self.class = det.class;
        self.confidence = det.confidence;
        self.lost = 0;
    }
}
