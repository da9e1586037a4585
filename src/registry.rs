use std::collections::HashMap;

use log::{debug, info, warn};
use serde_derive::{Deserialize, Serialize};

use crate::associator::geometry_score;
use crate::bbox::BBox;
use crate::config::Config;
use crate::descriptor::Descriptor;
use crate::track::Track;

/// Result of a toggle request against the slot table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// Track bound to this slot.
    Added(u8),
    /// Track was bound; its slot was freed.
    Removed(u8),
    /// Every slot is taken by another track.
    Full,
    /// No live track carries this identity.
    NotFound,
}

/// Recall memory held for one slot.
#[derive(Debug, Clone)]
struct SlotMemory {
    track: Option<u32>,
    bbox: BBox,
    descriptor: Option<Descriptor>,
    last_seen: f64,
}

/// Row of the public slot table snapshot.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct SlotSnapshot {
    pub slot: u8,
    pub track: Option<u32>,
    pub bound: bool,
    pub last_seen: Option<f64>,
}

/// Bounded table of user target slots. A slot is either empty, bound to a
/// live track, or unbound with memory retained for recall. The `bindings`
/// map mirrors the bound slots exactly: every bound slot has one entry and
/// vice versa.
pub struct SlotRegistry {
    cfg: Config,
    slots: Vec<Option<SlotMemory>>,
    bindings: HashMap<u32, u8>,
    last_dims: Option<(u32, u32)>,
}

impl SlotRegistry {
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            slots: vec![None; cfg.max_slots as usize],
            bindings: HashMap::new(),
            last_dims: None,
        }
    }

    /// Slot currently bound to `track_id`, if any.
    #[inline]
    pub fn slot_of(&self, track_id: u32) -> Option<u8> {
        self.bindings.get(&track_id).copied()
    }

    /// Number of slots currently bound to a live track.
    #[inline]
    pub fn bound_count(&self) -> usize {
        self.bindings.len()
    }

    /// Remembers the latest frame geometry for point selection mapping.
    #[inline]
    pub fn note_frame_dims(&mut self, dims: (u32, u32)) {
        self.last_dims = Some(dims);
    }

    /// Binds `track_id` to the lowest-numbered unbound slot, or releases it
    /// if it already holds one. Binding seeds the slot's recall memory from
    /// the track's current state; releasing purges it.
    pub fn toggle_by_track(
        &mut self,
        track_id: u32,
        tracks: &[Track],
        descriptor: Option<&Descriptor>,
        now: f64,
    ) -> ToggleOutcome {
        if let Some(slot) = self.bindings.remove(&track_id) {
            self.slots[slot as usize - 1] = None;
            info!("slot {} released from track {}", slot, track_id);

            return ToggleOutcome::Removed(slot);
        }

        let track = match tracks.iter().find(|t| t.id == track_id) {
            Some(track) => track,
            None => return ToggleOutcome::NotFound,
        };

        let free = self
            .slots
            .iter()
            .position(|s| s.as_ref().map_or(true, |m| m.track.is_none()));

        let idx = match free {
            Some(idx) => idx,
            None => return ToggleOutcome::Full,
        };

        self.slots[idx] = Some(SlotMemory {
            track: Some(track_id),
            bbox: track.bbox,
            descriptor: descriptor.cloned(),
            last_seen: now,
        });
        self.bindings.insert(track_id, idx as u8 + 1);

        info!("slot {} bound to track {}", idx + 1, track_id);

        ToggleOutcome::Added(idx as u8 + 1)
    }

    /// Resolves a normalized (0..1) UI coordinate to the highest-confidence
    /// live track whose box contains it. `None` before the first observed
    /// frame or when no box contains the point.
    pub fn find_track_at_point(&self, nx: f32, ny: f32, tracks: &[Track]) -> Option<u32> {
        let (width, height) = self.last_dims?;
        let px = nx * width as f32;
        let py = ny * height as f32;

        tracks
            .iter()
            .filter(|t| t.bbox.contains(px, py))
            .max_by(|a, b| {
                a.confidence
                    .partial_cmp(&b.confidence)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|t| t.id)
    }

    /// Clears a slot's binding and memory. `false` when the ordinal is out
    /// of range or the slot holds nothing.
    pub fn delete_slot(&mut self, slot: u8) -> bool {
        if slot == 0 || slot > self.cfg.max_slots {
            return false;
        }

        match self.slots[slot as usize - 1].take() {
            Some(mem) => {
                if let Some(id) = mem.track {
                    self.bindings.remove(&id);
                }

                info!("slot {} deleted", slot);
                true
            }
            None => false,
        }
    }

    /// Unbinds every slot whose track vanished from the live set, keeping
    /// its memory for recall. Stale bindings the slot table disagrees with
    /// are dropped; that cannot happen while callers hold the cycle lock.
    pub fn reconcile(&mut self, tracks: &[Track]) {
        for (idx, slot) in self.slots.iter_mut().enumerate() {
            let mem = match slot {
                Some(mem) => mem,
                None => continue,
            };

            let id = match mem.track {
                Some(id) => id,
                None => continue,
            };

            if tracks.iter().any(|t| t.id == id) {
                continue;
            }

            mem.track = None;
            self.bindings.remove(&id);
            debug!("slot {} lost track {}, memory retained", idx + 1, id);
        }

        let slots = &self.slots;
        self.bindings.retain(|&id, &mut slot| {
            let ok = slots
                .get(slot as usize - 1)
                .and_then(|s| s.as_ref())
                .map_or(false, |m| m.track == Some(id));

            debug_assert!(ok, "binding map out of sync: track {} -> slot {}", id, slot);

            if !ok {
                warn!("dropping stale binding: track {} -> slot {}", id, slot);
            }

            ok
        });
    }

    /// Attempts to rebind remembered slots to live tracks that hold no slot.
    /// Appearance candidates always outrank geometric ones; within a band
    /// the better score wins. Each track claims at most one slot per cycle
    /// and a claimed slot leaves the pool.
    pub fn auto_reassign(
        &mut self,
        tracks: &[Track],
        descriptors: &HashMap<u32, Descriptor>,
        now: f64,
    ) {
        for track in tracks {
            if self.bindings.contains_key(&track.id) {
                continue;
            }

            let mut best = 0.0f32;
            let mut best_idx = None;

            for (idx, slot) in self.slots.iter().enumerate() {
                let mem = match slot {
                    Some(mem) if mem.track.is_none() => mem,
                    _ => continue,
                };

                let score = self.recall_score(track, mem, descriptors);

                if score > best {
                    best = score;
                    best_idx = Some(idx);
                }
            }

            let idx = match best_idx {
                Some(idx) => idx,
                None => continue,
            };

            if let Some(mem) = self.slots[idx].as_mut() {
                mem.track = Some(track.id);
                mem.bbox = track.bbox;
                mem.last_seen = now;

                if let Some(d) = descriptors.get(&track.id) {
                    mem.descriptor = Some(d.clone());
                }
            }

            self.bindings.insert(track.id, idx as u8 + 1);
            info!("slot {} recalled to track {}", idx + 1, track.id);
        }
    }

    /// Recall score for a track against one remembered slot. Appearance
    /// matches land in (2, 3], geometry falls back to the association bands.
    fn recall_score(
        &self,
        track: &Track,
        mem: &SlotMemory,
        descriptors: &HashMap<u32, Descriptor>,
    ) -> f32 {
        if let (Some(sample), Some(remembered)) =
            (descriptors.get(&track.id), mem.descriptor.as_ref())
        {
            let dist = sample.distance(remembered);

            if dist < self.cfg.appearance_threshold {
                return 2.0 + (1.0 - dist);
            }
        }

        geometry_score(&track.bbox, &mem.bbox, &self.cfg)
    }

    /// Refreshes a bound slot's memory from the current frame. A missing
    /// descriptor sample keeps the stored one.
    pub fn bind_update(
        &mut self,
        slot: u8,
        track_id: u32,
        bbox: BBox,
        descriptor: Option<&Descriptor>,
        now: f64,
    ) {
        if slot == 0 || slot > self.cfg.max_slots {
            warn!("bind_update on slot {} out of range", slot);
            return;
        }

        let mem = match self.slots[slot as usize - 1].as_mut() {
            Some(mem) => mem,
            None => {
                warn!("bind_update on empty slot {}", slot);
                return;
            }
        };

        debug_assert!(
            mem.track == Some(track_id),
            "slot {} bound to {:?}, not track {}",
            slot,
            mem.track,
            track_id
        );

        if mem.track != Some(track_id) {
            warn!("bind_update dropped: slot {} not bound to track {}", slot, track_id);
            return;
        }

        mem.bbox = bbox;
        mem.last_seen = now;

        if let Some(d) = descriptor {
            mem.descriptor = Some(d.clone());
        }
    }

    /// Ordered slot table for the API layer.
    pub fn snapshot(&self) -> Vec<SlotSnapshot> {
        self.slots
            .iter()
            .enumerate()
            .map(|(idx, slot)| match slot {
                Some(mem) => SlotSnapshot {
                    slot: idx as u8 + 1,
                    track: mem.track,
                    bound: mem.track.is_some(),
                    last_seen: Some(mem.last_seen),
                },
                None => SlotSnapshot {
                    slot: idx as u8 + 1,
                    track: None,
                    bound: false,
                    last_seen: None,
                },
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::Detection;
    use ndarray::Array3;

    fn track(id: u32, x1: f32, y1: f32, x2: f32, y2: f32) -> Track {
        Track::new(id, &Detection::new(BBox::new(x1, y1, x2, y2), 0, 0.9))
    }

    fn track_conf(id: u32, bbox: BBox, confidence: f32) -> Track {
        Track::new(id, &Detection::new(bbox, 0, confidence))
    }

    fn registry() -> SlotRegistry {
        SlotRegistry::new(Config::default())
    }

    fn descriptor(rgb: [u8; 3]) -> Descriptor {
        let img = Array3::from_shape_fn((16, 16, 3), |(_, _, c)| rgb[c]);

        Descriptor::sample(&img.view(), &BBox::new(0.0, 0.0, 16.0, 16.0)).unwrap()
    }

    #[test]
    fn toggle_binds_then_releases() {
        let mut r = registry();
        let tracks = [track(7, 10.0, 10.0, 50.0, 50.0)];

        assert_eq!(
            r.toggle_by_track(7, &tracks, None, 1.0),
            ToggleOutcome::Added(1)
        );
        assert_eq!(r.slot_of(7), Some(1));

        assert_eq!(
            r.toggle_by_track(7, &tracks, None, 1.0),
            ToggleOutcome::Removed(1)
        );
        assert_eq!(r.slot_of(7), None);
        assert!(r.snapshot()[0].last_seen.is_none());
    }

    #[test]
    fn toggle_unknown_track_is_not_found() {
        let mut r = registry();
        let tracks = [track(1, 10.0, 10.0, 50.0, 50.0)];

        assert_eq!(
            r.toggle_by_track(99, &tracks, None, 1.0),
            ToggleOutcome::NotFound
        );
        assert_eq!(r.bound_count(), 0);
    }

    #[test]
    fn capacity_is_bounded() {
        let mut r = registry();
        let tracks: Vec<Track> = (1..=5)
            .map(|id| track(id, id as f32 * 100.0, 0.0, id as f32 * 100.0 + 50.0, 50.0))
            .collect();

        for id in 1..=4u32 {
            assert_eq!(
                r.toggle_by_track(id, &tracks, None, 1.0),
                ToggleOutcome::Added(id as u8)
            );
        }

        let before: Vec<_> = r.snapshot().iter().map(|s| s.track).collect();
        assert_eq!(r.toggle_by_track(5, &tracks, None, 1.0), ToggleOutcome::Full);

        let after: Vec<_> = r.snapshot().iter().map(|s| s.track).collect();
        assert_eq!(before, after);
        assert_eq!(r.bound_count(), 4);
    }

    #[test]
    fn lowest_free_slot_wins() {
        let mut r = registry();
        let tracks: Vec<Track> = (1..=4)
            .map(|id| track(id, id as f32 * 100.0, 0.0, id as f32 * 100.0 + 50.0, 50.0))
            .collect();

        r.toggle_by_track(1, &tracks, None, 1.0);
        r.toggle_by_track(2, &tracks, None, 1.0);
        r.toggle_by_track(3, &tracks, None, 1.0);

        assert!(r.delete_slot(2));
        assert_eq!(
            r.toggle_by_track(4, &tracks, None, 2.0),
            ToggleOutcome::Added(2)
        );
    }

    #[test]
    fn delete_slot_results() {
        let mut r = registry();
        let tracks = [track(1, 10.0, 10.0, 50.0, 50.0)];
        r.toggle_by_track(1, &tracks, None, 1.0);

        assert!(r.delete_slot(1));
        assert!(!r.delete_slot(1));
        assert!(!r.delete_slot(0));
        assert!(!r.delete_slot(5));
        assert_eq!(r.slot_of(1), None);
    }

    #[test]
    fn reconcile_keeps_memory() {
        let mut r = registry();
        let tracks = [track(3, 10.0, 10.0, 50.0, 50.0)];
        r.toggle_by_track(3, &tracks, None, 5.0);

        r.reconcile(&[]);

        let snap = &r.snapshot()[0];
        assert_eq!(snap.track, None);
        assert!(!snap.bound);
        assert_eq!(snap.last_seen, Some(5.0));
        assert_eq!(r.bound_count(), 0);
    }

    #[test]
    fn reconcile_leaves_live_bindings() {
        let mut r = registry();
        let tracks = [track(3, 10.0, 10.0, 50.0, 50.0)];
        r.toggle_by_track(3, &tracks, None, 5.0);

        r.reconcile(&tracks);

        assert_eq!(r.slot_of(3), Some(1));
    }

    #[test]
    fn geometric_recall_rebinds() {
        let mut r = registry();
        let old = [track(3, 10.0, 10.0, 50.0, 50.0)];
        r.toggle_by_track(3, &old, None, 1.0);
        r.reconcile(&[]);

        // new identity reappears on top of the remembered box
        let fresh = [track(9, 12.0, 11.0, 52.0, 51.0)];
        r.auto_reassign(&fresh, &HashMap::new(), 2.0);

        assert_eq!(r.slot_of(9), Some(1));
        let snap = &r.snapshot()[0];
        assert!(snap.bound);
        assert_eq!(snap.track, Some(9));
        assert_eq!(snap.last_seen, Some(2.0));
    }

    #[test]
    fn recall_ignores_far_strangers() {
        let mut r = registry();
        let old = [track(3, 10.0, 10.0, 50.0, 50.0)];
        r.toggle_by_track(3, &old, None, 1.0);
        r.reconcile(&[]);

        let stranger = [track(9, 500.0, 500.0, 540.0, 540.0)];
        r.auto_reassign(&stranger, &HashMap::new(), 2.0);

        assert_eq!(r.slot_of(9), None);
        assert!(!r.snapshot()[0].bound);
    }

    #[test]
    fn recall_skips_already_bound_tracks() {
        let mut r = registry();
        let tracks = [
            track(1, 10.0, 10.0, 50.0, 50.0),
            track(2, 100.0, 10.0, 150.0, 50.0),
        ];
        r.toggle_by_track(1, &tracks, None, 1.0);
        r.toggle_by_track(2, &tracks, None, 1.0);

        // slot 1 loses its track; track 2 stays bound to slot 2 and must not
        // also claim slot 1 even though it overlaps the memory
        r.reconcile(&[track(2, 12.0, 11.0, 52.0, 51.0)]);
        r.auto_reassign(&[track(2, 12.0, 11.0, 52.0, 51.0)], &HashMap::new(), 2.0);

        assert_eq!(r.slot_of(2), Some(2));
        assert!(!r.snapshot()[0].bound);
    }

    #[test]
    fn appearance_recall_outranks_geometry() {
        let mut r = registry();
        let red = descriptor([250, 10, 10]);
        let cyan = descriptor([10, 240, 250]);

        let old = [
            track(1, 10.0, 10.0, 60.0, 60.0),
            track(2, 200.0, 200.0, 250.0, 250.0),
        ];
        r.toggle_by_track(1, &old, Some(&red), 1.0);
        r.toggle_by_track(2, &old, Some(&cyan), 1.0);
        r.reconcile(&[]);

        // the returning target sits exactly on slot 2's remembered box but
        // looks like slot 1's target
        let fresh = [track(9, 200.0, 200.0, 250.0, 250.0)];
        let mut descriptors = HashMap::new();
        descriptors.insert(9, red.clone());

        r.auto_reassign(&fresh, &descriptors, 2.0);

        assert_eq!(r.slot_of(9), Some(1));
        assert!(!r.snapshot()[1].bound);
    }

    #[test]
    fn distant_appearance_falls_back_to_geometry() {
        let mut r = registry();
        let red = descriptor([250, 10, 10]);
        let cyan = descriptor([10, 240, 250]);

        let old = [track(1, 10.0, 10.0, 60.0, 60.0)];
        r.toggle_by_track(1, &old, Some(&red), 1.0);
        r.reconcile(&[]);

        // appearance mismatch, but the box overlaps the memory
        let fresh = [track(9, 12.0, 12.0, 62.0, 62.0)];
        let mut descriptors = HashMap::new();
        descriptors.insert(9, cyan);

        r.auto_reassign(&fresh, &descriptors, 2.0);

        assert_eq!(r.slot_of(9), Some(1));
    }

    #[test]
    fn bind_update_refreshes_memory() {
        let mut r = registry();
        let tracks = [track(3, 10.0, 10.0, 50.0, 50.0)];
        r.toggle_by_track(3, &tracks, None, 1.0);

        let moved = BBox::new(300.0, 300.0, 340.0, 340.0);
        r.bind_update(1, 3, moved, None, 7.0);
        r.reconcile(&[]);

        // recall now matches the refreshed position, not the seed position
        let fresh = [track(9, 302.0, 301.0, 342.0, 341.0)];
        r.auto_reassign(&fresh, &HashMap::new(), 8.0);

        assert_eq!(r.slot_of(9), Some(1));
        assert_eq!(r.snapshot()[0].last_seen, Some(8.0));
    }

    #[test]
    fn find_track_at_point_scenario() {
        let mut r = registry();
        let tracks = [track(1, 12.0, 11.0, 52.0, 51.0)];

        assert_eq!(r.find_track_at_point(0.3, 0.3, &tracks), None);

        r.note_frame_dims((100, 100));
        assert_eq!(r.find_track_at_point(0.3, 0.3, &tracks), Some(1));
        assert_eq!(r.find_track_at_point(0.9, 0.9, &tracks), None);
    }

    #[test]
    fn find_track_at_point_prefers_confidence() {
        let mut r = registry();
        r.note_frame_dims((100, 100));

        let tracks = [
            track_conf(1, BBox::new(10.0, 10.0, 60.0, 60.0), 0.5),
            track_conf(2, BBox::new(20.0, 20.0, 70.0, 70.0), 0.8),
        ];

        assert_eq!(r.find_track_at_point(0.3, 0.3, &tracks), Some(2));
    }
}
