pub mod associator;
pub mod bbox;
pub mod config;
pub mod descriptor;
pub mod detection;
pub mod error;
pub mod frame;
pub mod registry;
pub mod track;

pub use associator::{Association, Associator};
pub use bbox::BBox;
pub use config::Config;
pub use descriptor::Descriptor;
pub use detection::Detection;
pub use error::Error;
pub use frame::Frame;
pub use registry::{SlotRegistry, SlotSnapshot, ToggleOutcome};
pub use track::Track;

use ndarray::ArrayView3;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// One tracking pipeline: the associator, the slot registry and the
/// per-track appearance cache, advanced one detector cycle at a time.
pub struct Engine {
    associator: Associator,
    registry: SlotRegistry,
    descriptors: HashMap<u32, Descriptor>,
    tracks: Vec<Track>,
    last_ts: f64,
}

impl Engine {
    pub fn new(cfg: Config) -> Self {
        Self {
            associator: Associator::new(cfg),
            registry: SlotRegistry::new(cfg),
            descriptors: HashMap::new(),
            tracks: Vec::new(),
            last_ts: 0.0,
        }
    }

    /// Runs one full cycle against pre-extracted appearance samples.
    /// `samples[i]` belongs to `frame.detections[i]`; pixel work happens
    /// before this call, so the engine never touches image memory.
    pub fn process_frame(&mut self, frame: &Frame, samples: &[Option<Descriptor>]) {
        let association = self.associator.update(&frame.detections);

        // carry samples over to the identities that consumed them, keep the
        // previous sample for tracks missed this cycle, drop dead ids
        let mut next = HashMap::with_capacity(association.tracks.len());

        for &(id, det_idx) in &association.matched {
            if let Some(d) = samples.get(det_idx).and_then(|s| s.clone()) {
                next.insert(id, d);
            }
        }

        for track in &association.tracks {
            if !next.contains_key(&track.id) {
                if let Some(d) = self.descriptors.remove(&track.id) {
                    next.insert(track.id, d);
                }
            }
        }

        self.descriptors = next;
        self.last_ts = frame.timestamp;

        self.registry.note_frame_dims(frame.dims);
        self.registry.reconcile(&association.tracks);
        self.registry
            .auto_reassign(&association.tracks, &self.descriptors, frame.timestamp);

        for track in &association.tracks {
            if let Some(slot) = self.registry.slot_of(track.id) {
                self.registry.bind_update(
                    slot,
                    track.id,
                    track.bbox,
                    self.descriptors.get(&track.id),
                    frame.timestamp,
                );
            }
        }

        self.tracks = association.tracks;
    }

    /// Live tracks after the most recent cycle.
    #[inline]
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Ordered slot table after the most recent cycle.
    #[inline]
    pub fn slots(&self) -> Vec<SlotSnapshot> {
        self.registry.snapshot()
    }

    pub fn toggle_track(&mut self, track_id: u32) -> ToggleOutcome {
        let descriptor = self.descriptors.get(&track_id);

        self.registry
            .toggle_by_track(track_id, &self.tracks, descriptor, self.last_ts)
    }

    /// Point selection: resolves the tap and toggles the hit track in one
    /// step. `None` when no live track sits under the point.
    pub fn toggle_at_point(&mut self, nx: f32, ny: f32) -> Option<ToggleOutcome> {
        let id = self.registry.find_track_at_point(nx, ny, &self.tracks)?;

        Some(self.toggle_track(id))
    }

    pub fn find_track_at_point(&self, nx: f32, ny: f32) -> Option<u32> {
        self.registry.find_track_at_point(nx, ny, &self.tracks)
    }

    pub fn delete_slot(&mut self, slot: u8) -> bool {
        self.registry.delete_slot(slot)
    }
}

/// Clone-able engine handle shared between the capture worker and the API
/// layer. One lock guards the whole cycle, so concurrent readers observe
/// either the pre-cycle or the post-cycle state, never a partial one.
#[derive(Clone)]
pub struct SharedEngine {
    inner: Arc<Mutex<Engine>>,
}

impl SharedEngine {
    pub fn new(cfg: Config) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Engine::new(cfg))),
        }
    }

    /// Extracts appearance samples from `pixels` (height x width x RGB),
    /// then runs the cycle under the lock. Pixel work stays outside the
    /// critical section.
    pub fn process_frame(&self, frame: &Frame, pixels: Option<&ArrayView3<'_, u8>>) {
        let samples: Vec<Option<Descriptor>> = match pixels {
            Some(view) => frame
                .detections
                .iter()
                .map(|det| Descriptor::sample(view, &det.bbox))
                .collect(),
            None => vec![None; frame.detections.len()],
        };

        self.inner.lock().process_frame(frame, &samples);
    }

    /// Resolves a tap and toggles the hit track atomically with respect to
    /// running cycles.
    pub fn toggle_at_point(&self, nx: f32, ny: f32) -> Option<ToggleOutcome> {
        self.inner.lock().toggle_at_point(nx, ny)
    }

    pub fn toggle_track(&self, track_id: u32) -> ToggleOutcome {
        self.inner.lock().toggle_track(track_id)
    }

    pub fn delete_slot(&self, slot: u8) -> bool {
        self.inner.lock().delete_slot(slot)
    }

    pub fn tracks(&self) -> Vec<Track> {
        self.inner.lock().tracks().to_vec()
    }

    pub fn slots(&self) -> Vec<SlotSnapshot> {
        self.inner.lock().slots()
    }
}
