use crate::{
    assignment::{linear_assignment, Assignment},
    config::Config,
    error::Result,
    iou_matrix::iou_distance,
    kalman::KalmanFilter,
    object::{BBox, Detection, TrackedObject},
    track::{RemovalCause, Track, TrackState},
};
use itertools::{Either, Itertools};
use log::trace;
use std::{collections::BTreeMap, ops::RangeFrom};

/// A track that left the tracker during the latest update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Removal {
    pub track_id: usize,
    pub cause: RemovalCause,
    pub frame_id: usize,
}

/// This is the main struct to perform object tracking.
///
/// Tracks live in one arena keyed by id. The tracked pool (`New` and
/// `Tracked` tracks) and the lost pool are views over that arena, so a track
/// is always in exactly one of them until it is removed.
pub struct Tracker {
    config: Config,
    max_time_lost: usize,
    frame_id: usize,
    tracks: BTreeMap<usize, Track>,
    last_removals: Vec<Removal>,
    unique_id_iter: RangeFrom<usize>,
    kalman_filter: KalmanFilter,
}

/// Outcome of one association stage, in terms of track ids and detection
/// positions.
struct StageOutcome {
    unmatched_tracks: Vec<usize>,
    unmatched_detections: Vec<usize>,
}

impl Tracker {
    /// This is the function to build a Tracker.
    ///
    /// Example:
    ///
    /// ```rust
    /// use bbox_tracking::config::Config;
    /// use bbox_tracking::Tracker;
    ///
    /// let config = Config {
    ///     frame_rate: 25.0,
    ///     track_buffer: 60,
    ///     ..Config::default()
    /// };
    /// let tracker = Tracker::new(config).unwrap();
    /// assert_eq!(tracker.max_time_lost(), 50);
    ///
    /// let bad_config = Config::with_frame_rate(0.0, 30);
    /// assert!(Tracker::new(bad_config).is_err());
    /// ```
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let kalman_filter =
            KalmanFilter::new(config.std_weight_position, config.std_weight_velocity);

        Ok(Self {
            max_time_lost: config.max_time_lost(),
            config,
            frame_id: 0,
            tracks: BTreeMap::new(),
            last_removals: vec![],
            unique_id_iter: 1..,
            kalman_filter,
        })
    }

    /// Build a tracker from a frame rate and a track buffer, keeping every
    /// other setting at its default.
    pub fn with_frame_rate(frame_rate: f64, track_buffer: usize) -> Result<Self> {
        Self::new(Config::with_frame_rate(frame_rate, track_buffer))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Index of the last processed frame, starting at 1.
    pub fn frame_id(&self) -> usize {
        self.frame_id
    }

    pub fn max_time_lost(&self) -> usize {
        self.max_time_lost
    }

    pub fn track(&self, track_id: usize) -> Option<&Track> {
        self.tracks.get(&track_id)
    }

    /// All live tracks, tracked and lost, in id order.
    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.values()
    }

    /// Tracks removed by the latest call to [update](Self::update).
    pub fn last_removals(&self) -> &[Removal] {
        &self.last_removals
    }

    /// This is the function to track objects in the next frame.
    ///
    /// Example:
    ///
    /// ```rust
    /// use bbox_tracking::object::{BBox, Detection};
    /// use bbox_tracking::Tracker;
    ///
    /// let mut tracker = Tracker::with_frame_rate(30.0, 30).unwrap();
    ///
    /// let first = tracker.update(&[Detection::new(BBox::new(10., 10., 20., 40.), 0.9)]);
    /// assert_eq!(first.len(), 1);
    ///
    /// let second = tracker.update(&[Detection::new(BBox::new(12., 10., 20., 40.), 0.9)]);
    /// assert_eq!(second.len(), 1);
    /// assert_eq!(second[0].track_id, first[0].track_id);
    ///
    /// // The track is lost, not reported.
    /// assert!(tracker.update(&[]).is_empty());
    /// ```
    pub fn update(&mut self, detections: &[Detection]) -> Vec<TrackedObject> {
        self.frame_id += 1;
        self.last_removals.clear();
        let frame_id = self.frame_id;

        // Predict every live track
        for track in self.tracks.values_mut() {
            track.predict(&self.kalman_filter);
        }

        // Split detections into high and low confidence, dropping malformed
        // entries and anything under the floor.
        let (valid, malformed): (Vec<&Detection>, Vec<&Detection>) =
            detections.iter().partition(|det| det.is_valid());
        let Config {
            track_thresh,
            low_thresh,
            ..
        } = self.config;
        let (high_dets, low_dets): (Vec<&Detection>, Vec<&Detection>) = valid
            .into_iter()
            .filter(|det| det.score >= low_thresh)
            .partition_map(|det| {
                if det.score >= track_thresh {
                    Either::Left(det)
                } else {
                    Either::Right(det)
                }
            });
        trace!(
            "frame {frame_id}: {} high, {} low, {} malformed detections",
            high_dets.len(),
            low_dets.len(),
            malformed.len()
        );

        // Split live tracks into the association pool and unconfirmed tracks
        let (pool, unconfirmed): (Vec<usize>, Vec<usize>) =
            self.tracks.values().partition_map(|track| match track.state() {
                TrackState::New => Either::Right(track.id()),
                _ => Either::Left(track.id()),
            });

        // Stage A: confirmed and lost tracks against high-confidence detections
        let stage_a = self.associate(&pool, &high_dets, self.config.match_thresh);

        // Stage B: tracks that were tracked on the previous frame against
        // low-confidence detections. Lost tracks are not considered.
        let recent: Vec<usize> = stage_a
            .unmatched_tracks
            .iter()
            .copied()
            .filter(|id| self.tracks[id].state() == TrackState::Tracked)
            .collect();
        let stage_b = self.associate(&recent, &low_dets, self.config.low_match_thresh);
        for id in &stage_b.unmatched_tracks {
            if let Some(track) = self.tracks.get_mut(id) {
                track.mark_lost(frame_id);
            }
        }

        // Stage C: unconfirmed tracks against the leftover high-confidence
        // detections. A miss here is final.
        let remaining: Vec<&Detection> = stage_a
            .unmatched_detections
            .iter()
            .map(|&idx| high_dets[idx])
            .collect();
        let stage_c = self.associate(
            &unconfirmed,
            &remaining,
            self.config.unconfirmed_match_thresh,
        );
        for id in stage_c.unmatched_tracks {
            self.remove(id, RemovalCause::Unconfirmed);
        }

        // Start new tracks from detections nobody claimed
        let new_track_thresh = self.config.new_track_thresh();
        for idx in stage_c.unmatched_detections {
            let detection = remaining[idx];
            if detection.score < new_track_thresh {
                continue;
            }
            let Some(id) = self.unique_id_iter.next() else {
                break;
            };
            let track = Track::new(id, detection, &self.kalman_filter, frame_id);
            self.tracks.insert(id, track);
        }

        // Evict lost tracks past the horizon
        let expired: Vec<usize> = self
            .tracks
            .values()
            .filter(|track| {
                track.state() == TrackState::Lost
                    && track.frames_since_update(frame_id) > self.max_time_lost
            })
            .map(|track| track.id())
            .collect();
        for id in expired {
            self.remove(id, RemovalCause::Expired);
        }

        self.tracks
            .values()
            .filter(|track| track.is_emittable())
            .map(|track| track.to_tracked_object(frame_id))
            .collect()
    }

    /// Match `track_ids` against `detections` on `1 - IoU` and update every
    /// matched track.
    fn associate(
        &mut self,
        track_ids: &[usize],
        detections: &[&Detection],
        max_cost: f64,
    ) -> StageOutcome {
        let track_boxes: Vec<BBox> = track_ids.iter().map(|id| self.tracks[id].bbox()).collect();
        let det_boxes: Vec<BBox> = detections.iter().map(|det| det.bbox).collect();
        let dists = iou_distance(&track_boxes, &det_boxes);

        let Assignment {
            matches,
            unmatched_rows,
            unmatched_cols,
        } = linear_assignment(&dists, max_cost);

        for (row, col) in matches {
            if let Some(track) = self.tracks.get_mut(&track_ids[row]) {
                track.update(detections[col], &self.kalman_filter, self.frame_id);
            }
        }

        StageOutcome {
            unmatched_tracks: unmatched_rows.into_iter().map(|row| track_ids[row]).collect(),
            unmatched_detections: unmatched_cols,
        }
    }

    fn remove(&mut self, track_id: usize, cause: RemovalCause) {
        let Some(mut track) = self.tracks.remove(&track_id) else {
            return;
        };
        track.mark_removed(cause, self.frame_id);
        self.last_removals.push(Removal {
            track_id,
            cause,
            frame_id: self.frame_id,
        });
    }
}
