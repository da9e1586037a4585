/// Tuning knobs for association and slot recall. Defaults are the values
/// the system was tuned with; treat them as starting points, not contracts.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// Minimum IoU for a track/detection pairing to be eligible (default: 0.3)
    pub match_iou: f32,
    /// Center-distance fallback gate: eligible when center-to-center distance
    /// is below this fraction of the larger box's diagonal (default: 0.5)
    pub center_dist_frac: f32,
    /// Consecutive missed cycles after which a track is destroyed (default: 15)
    pub max_lost: u32,
    /// Number of user-facing target slots (default: 4)
    pub max_slots: u8,
    /// Maximum descriptor distance for appearance-based recall (default: 0.6)
    pub appearance_threshold: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            match_iou: 0.3,
            center_dist_frac: 0.5,
            max_lost: 15,
            max_slots: 4,
            appearance_threshold: 0.6,
        }
    }
}
