use log::debug;
use ndarray::Array2;

use crate::bbox::BBox;
use crate::config::Config;
use crate::detection::Detection;
use crate::track::Track;

/// Outcome of one association pass: the live tracks after the pass, plus the
/// (track id, detection index) pairs that consumed a detection this cycle.
/// `matched` covers refreshed tracks and freshly registered ones, so callers
/// can carry per-detection appearance samples over to track identities.
pub struct Association {
    pub tracks: Vec<Track>,
    pub matched: Vec<(u32, usize)>,
}

/// Two-band geometric score for a candidate pairing. IoU matches land in
/// (1, 2], center-distance fallbacks in (0, 1], so a single greedy max
/// consumes every IoU pairing before any fallback pairing. 0 = ineligible.
pub(crate) fn geometry_score(a: &BBox, b: &BBox, cfg: &Config) -> f32 {
    let iou = a.iou(b);

    if iou >= cfg.match_iou {
        return 1.0 + iou;
    }

    let diag = a.diagonal().max(b.diagonal());

    if diag <= 0.0 {
        return 0.0;
    }

    let norm_dist = a.center_distance(b) / diag;

    if norm_dist < cfg.center_dist_frac {
        (1.0 - norm_dist).max(0.0)
    } else {
        0.0
    }
}

/// Frame-to-frame tracker: greedy geometric matching of detections onto the
/// live set, with track lifecycle (creation, miss counting, expiry) and a
/// per-epoch identity counter.
pub struct Associator {
    cfg: Config,
    tracks: Vec<Track>,
    next_id: u32,
}

impl Associator {
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            tracks: Vec::with_capacity(32),
            next_id: 1,
        }
    }

    #[inline]
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    fn register(&mut self, det: &Detection) -> u32 {
        let id = self.next_id;
        self.next_id += 1;

        debug!("track {} registered, class {}", id, det.class);
        self.tracks.push(Track::new(id, det));

        id
    }

    /// Runs one association pass. Deterministic given prior internal state
    /// and the same detection list.
    pub fn update(&mut self, detections: &[Detection]) -> Association {
        let mut matched = Vec::with_capacity(detections.len());

        if self.tracks.is_empty() {
            for (j, det) in detections.iter().enumerate() {
                matched.push((self.register(det), j));
            }

            return Association {
                tracks: self.tracks.clone(),
                matched,
            };
        }

        let rows = self.tracks.len();
        let cols = detections.len();

        let mut scores = Array2::from_shape_fn((rows, cols), |(i, j)| {
            geometry_score(&self.tracks[i].bbox, &detections[j].bbox, &self.cfg)
        });

        let mut row_hit = vec![false; rows];
        let mut col_hit = vec![false; cols];

        // take the best remaining pair, zero its row and column, repeat
        loop {
            let mut best = 0.0f32;
            let mut best_pair = None;

            for ((i, j), &score) in scores.indexed_iter() {
                if score > best {
                    best = score;
                    best_pair = Some((i, j));
                }
            }

            let (i, j) = match best_pair {
                Some(pair) => pair,
                None => break,
            };

            self.tracks[i].hit(&detections[j]);
            matched.push((self.tracks[i].id, j));

            row_hit[i] = true;
            col_hit[j] = true;

            scores.row_mut(i).fill(0.0);
            scores.column_mut(j).fill(0.0);
        }

        for (j, det) in detections.iter().enumerate() {
            if !col_hit[j] {
                matched.push((self.register(det), j));
            }
        }

        for i in 0..rows {
            if !row_hit[i] {
                self.tracks[i].lost += 1;
            }
        }

        let max_lost = self.cfg.max_lost;
        self.tracks.retain(|t| {
            if t.lost > max_lost {
                debug!("track {} expired after {} missed cycles", t.id, t.lost);
                false
            } else {
                true
            }
        });

        if self.tracks.is_empty() && self.next_id != 1 {
            debug!("live set empty, identity counter reset");
            self.next_id = 1;
        }

        Association {
            tracks: self.tracks.clone(),
            matched,
        }
    }
}
