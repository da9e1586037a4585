use serde_derive::{Deserialize, Serialize};

use crate::bbox::BBox;
use crate::error::Error;

/// One detector output: a bounding box with class id and confidence.
/// Carries no identity; continuity between frames is the associator's job.
#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
pub struct Detection {
    pub bbox: BBox,
    #[serde(rename = "cls")]
    pub class: i32,
    #[serde(rename = "conf")]
    pub confidence: f32,
}

impl Detection {
    #[inline]
    pub fn new(bbox: BBox, class: i32, confidence: f32) -> Self {
        Self {
            bbox,
            class,
            confidence,
        }
    }

    /// Detector-adapter constructor: validates box geometry before the
    /// record enters the engine.
    pub fn try_new(bbox: [f32; 4], class: i32, confidence: f32) -> Result<Self, Error> {
        let bbox = BBox::try_new(bbox[0], bbox[1], bbox[2], bbox[3])?;

        Ok(Self {
            bbox,
            class,
            confidence,
        })
    }
}
