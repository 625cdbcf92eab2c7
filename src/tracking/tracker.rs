//! Centroid tracker over a fixed pool of track slots.
//!
//! Association is greedy: active tracks are visited in slot order and each
//! claims the nearest unclaimed region within `max_distance`. This is not a
//! globally optimal assignment, but object counts are small and the frame
//! budget is tight.

use super::history::{TrackHistory, TrackSample};
use crate::config::TrackerConfig;
use crate::constants::motion::MAX_REGIONS;
use crate::detection::MotionRegion;
use tracing::{debug, warn};

/// A persistent identity for one moving object.
#[derive(Debug, Clone)]
pub struct Track {
    id: u32,
    centroid: (u16, u16),
    region: MotionRegion,
    history: TrackHistory,
    disappeared: u32,
    first_seen_ms: u64,
    last_seen_ms: u64,
}

impl Track {
    fn vacant(history_length: usize) -> Self {
        Self {
            id: 0,
            centroid: (0, 0),
            region: MotionRegion {
                x: 0,
                y: 0,
                w: 0,
                h: 0,
                area: 0,
                centroid_x: 0,
                centroid_y: 0,
            },
            history: TrackHistory::with_capacity(history_length),
            disappeared: 0,
            first_seen_ms: 0,
            last_seen_ms: 0,
        }
    }

    fn start(&mut self, id: u32, region: MotionRegion, timestamp_ms: u64) {
        self.id = id;
        self.disappeared = 0;
        self.first_seen_ms = timestamp_ms;
        self.history.clear();
        self.observe(region, timestamp_ms);
    }

    fn observe(&mut self, region: MotionRegion, timestamp_ms: u64) {
        self.centroid = (region.centroid_x, region.centroid_y);
        self.region = region;
        self.disappeared = 0;
        self.last_seen_ms = timestamp_ms;
        self.history.push(TrackSample {
            x: region.centroid_x,
            y: region.centroid_y,
            timestamp_ms,
        });
    }

    /// Track ID; never 0.
    #[must_use]
    pub const fn id(&self) -> u32 {
        self.id
    }

    /// Latest centroid.
    #[must_use]
    pub const fn centroid(&self) -> (u16, u16) {
        self.centroid
    }

    /// Last associated region.
    #[must_use]
    pub const fn region(&self) -> &MotionRegion {
        &self.region
    }

    /// Position history.
    #[must_use]
    pub const fn history(&self) -> &TrackHistory {
        &self.history
    }

    /// Consecutive frames without a match.
    #[must_use]
    pub const fn disappeared(&self) -> u32 {
        self.disappeared
    }

    /// Timestamp of the first observation.
    #[must_use]
    pub const fn first_seen_ms(&self) -> u64 {
        self.first_seen_ms
    }

    /// Timestamp of the latest observation.
    #[must_use]
    pub const fn last_seen_ms(&self) -> u64 {
        self.last_seen_ms
    }

    /// Time from the first to the latest observation. Keeps growing after
    /// the history ring has wrapped.
    #[must_use]
    pub const fn age_ms(&self) -> u64 {
        self.last_seen_ms.saturating_sub(self.first_seen_ms)
    }

    fn distance_sq(&self, region: &MotionRegion) -> u64 {
        let dx = i64::from(self.centroid.0) - i64::from(region.centroid_x);
        let dy = i64::from(self.centroid.1) - i64::from(region.centroid_y);
        (dx * dx + dy * dy).unsigned_abs()
    }
}

/// A region associated with a track in the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackedDetection {
    /// Owning track.
    pub track_id: u32,
    /// Region observed this frame.
    pub region: MotionRegion,
    /// The track was created this frame.
    pub is_new: bool,
}

#[derive(Debug, Clone)]
struct Slot {
    active: bool,
    track: Track,
}

/// Assigns stable IDs to motion regions across frames.
#[derive(Debug)]
pub struct ObjectTracker {
    config: TrackerConfig,
    slots: Vec<Slot>,
    next_id: u32,
    dropped_regions: u64,
}

impl ObjectTracker {
    /// Create a tracker with a pool of `config.max_tracks` slots.
    #[must_use]
    pub fn new(config: &TrackerConfig) -> Self {
        let slots = (0..config.max_tracks)
            .map(|_| Slot {
                active: false,
                track: Track::vacant(config.history_length),
            })
            .collect();

        Self {
            config: *config,
            slots,
            next_id: 1,
            dropped_regions: 0,
        }
    }

    /// Associate this frame's regions with tracks.
    ///
    /// Frames must arrive in timestamp order. The output holds one entry per
    /// track seen this frame, matched tracks first in slot order, then new
    /// tracks.
    pub fn update(&mut self, regions: &[MotionRegion], timestamp_ms: u64) -> Vec<TrackedDetection> {
        let regions = if regions.len() > MAX_REGIONS {
            warn!(
                "Tracker received {} regions; only the first {MAX_REGIONS} are used",
                regions.len()
            );
            &regions[..MAX_REGIONS]
        } else {
            regions
        };

        let mut claimed = [false; MAX_REGIONS];
        let mut output = Vec::with_capacity(self.slots.len());
        let max_sq = u64::from(self.config.max_distance).pow(2);
        let max_disappeared = self.config.max_disappeared;

        for slot in self.slots.iter_mut().filter(|s| s.active) {
            let nearest = regions
                .iter()
                .enumerate()
                .filter(|(i, _)| !claimed[*i])
                .map(|(i, r)| (i, slot.track.distance_sq(r)))
                .min_by_key(|&(_, d)| d);

            match nearest {
                Some((i, dist_sq)) if dist_sq <= max_sq => {
                    claimed[i] = true;
                    slot.track.observe(regions[i], timestamp_ms);
                    output.push(TrackedDetection {
                        track_id: slot.track.id,
                        region: regions[i],
                        is_new: false,
                    });
                }
                _ => {
                    slot.track.disappeared += 1;
                    if slot.track.disappeared > max_disappeared {
                        debug!(
                            "Track {} deregistered after {} missed frames",
                            slot.track.id, slot.track.disappeared
                        );
                        slot.active = false;
                    }
                }
            }
        }

        for (i, region) in regions.iter().enumerate() {
            if claimed[i] {
                continue;
            }
            match self.register(*region, timestamp_ms) {
                Some(track_id) => output.push(TrackedDetection {
                    track_id,
                    region: *region,
                    is_new: true,
                }),
                None => {
                    self.dropped_regions += 1;
                    warn!(
                        "Track pool full ({} slots); region at ({}, {}) dropped",
                        self.slots.len(),
                        region.centroid_x,
                        region.centroid_y
                    );
                }
            }
        }

        output
    }

    fn register(&mut self, region: MotionRegion, timestamp_ms: u64) -> Option<u32> {
        let slot = self.slots.iter_mut().find(|s| !s.active)?;
        let id = self.next_id;
        self.next_id = match self.next_id.wrapping_add(1) {
            0 => 1,
            next => next,
        };

        slot.active = true;
        slot.track.start(id, region, timestamp_ms);
        debug!(
            "Track {id} registered at ({}, {})",
            region.centroid_x, region.centroid_y
        );
        Some(id)
    }

    /// Look up an active track.
    #[must_use]
    pub fn track(&self, track_id: u32) -> Option<&Track> {
        self.slots
            .iter()
            .find(|s| s.active && s.track.id == track_id)
            .map(|s| &s.track)
    }

    /// History of a track, oldest to newest.
    #[must_use]
    pub fn get_history(&self, track_id: u32) -> Option<Vec<TrackSample>> {
        self.track(track_id).map(|t| t.history.to_vec())
    }

    /// Active tracks in slot order.
    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.slots.iter().filter(|s| s.active).map(|s| &s.track)
    }

    /// Number of active tracks.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|s| s.active).count()
    }

    /// Regions dropped because the pool was full.
    #[must_use]
    pub const fn dropped_regions(&self) -> u64 {
        self.dropped_regions
    }

    /// Free every slot. IDs keep increasing.
    pub fn reset(&mut self) {
        for slot in &mut self.slots {
            slot.active = false;
            slot.track.history.clear();
        }
        debug!("Tracker reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(cx: u16, cy: u16) -> MotionRegion {
        MotionRegion {
            x: cx.saturating_sub(15),
            y: cy.saturating_sub(12),
            w: 30,
            h: 25,
            area: 746,
            centroid_x: cx,
            centroid_y: cy,
        }
    }

    fn tracker() -> ObjectTracker {
        ObjectTracker::new(&TrackerConfig::default())
    }

    #[test]
    fn test_first_region_becomes_track_one() {
        let mut tracker = tracker();
        let out = tracker.update(&[region(100, 100)], 0);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].track_id, 1);
        assert!(out[0].is_new);
    }

    #[test]
    fn test_nearest_region_keeps_id() {
        let mut tracker = tracker();
        tracker.update(&[region(100, 100)], 0);
        let out = tracker.update(&[region(300, 300), region(110, 104)], 100);

        let old = out.iter().find(|d| !d.is_new);
        assert_eq!(old.map(|d| (d.track_id, d.region.centroid_x)), Some((1, 110)));
        assert_eq!(out.iter().filter(|d| d.is_new).count(), 1);
    }

    #[test]
    fn test_distance_exactly_at_limit_matches() {
        let mut tracker = tracker();
        tracker.update(&[region(100, 100)], 0);
        let out = tracker.update(&[region(200, 100)], 100);
        assert_eq!(out.len(), 1);
        assert!(!out[0].is_new);
    }

    #[test]
    fn test_far_region_spawns_new_track() {
        let mut tracker = tracker();
        tracker.update(&[region(100, 100)], 0);
        let out = tracker.update(&[region(201, 100)], 100);
        assert!(out[0].is_new);
        assert_eq!(out[0].track_id, 2);
        assert_eq!(tracker.active_count(), 2);
    }

    #[test]
    fn test_pool_exhaustion_drops_regions() {
        let config = TrackerConfig {
            max_tracks: 2,
            ..TrackerConfig::default()
        };
        let mut tracker = ObjectTracker::new(&config);
        let out = tracker.update(&[region(10, 10), region(300, 10), region(10, 300)], 0);
        assert_eq!(out.len(), 2);
        assert_eq!(tracker.active_count(), 2);
        assert_eq!(tracker.dropped_regions(), 1);
    }

    #[test]
    fn test_history_is_oldest_first() {
        let mut tracker = tracker();
        for (i, t) in (0..5u64).enumerate() {
            tracker.update(&[region(100 + i as u16, 100)], t * 100);
        }
        let history = tracker.get_history(1).unwrap_or_default();
        let times: Vec<_> = history.iter().map(|s| s.timestamp_ms).collect();
        assert_eq!(times, [0, 100, 200, 300, 400]);
    }

    #[test]
    fn test_reset_frees_slots() {
        let mut tracker = tracker();
        tracker.update(&[region(100, 100)], 0);
        tracker.reset();
        assert_eq!(tracker.active_count(), 0);
        let out = tracker.update(&[region(100, 100)], 100);
        assert_eq!(out[0].track_id, 2);
    }

    #[test]
    fn test_id_skips_zero_on_wrap() {
        let mut tracker = tracker();
        tracker.next_id = u32::MAX;
        tracker.update(&[region(10, 10), region(300, 300)], 0);
        let ids: Vec<_> = tracker.tracks().map(Track::id).collect();
        assert_eq!(ids, [u32::MAX, 1]);
    }
}
