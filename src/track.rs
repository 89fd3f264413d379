use crate::{
    kalman::{KalmanFilter, StateCovariance, StateMean},
    object::{BBox, Detection, TrackedObject},
};
use log::{debug, warn};

/// Lifecycle state of a [Track].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackState {
    /// Created on the current or previous frame, waiting for its first match.
    New,
    /// Matched on its most recent frame.
    Tracked,
    /// Missed by every association stage, still within the lost-time horizon.
    Lost,
    /// Terminal. The track has left the tracker.
    Removed(RemovalCause),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemovalCause {
    /// A new track found no match on the frame after its creation.
    Unconfirmed,
    /// A lost track stayed unmatched longer than the lost-time horizon.
    Expired,
}

/// One tracked identity with its motion filter state.
#[derive(Clone, Debug)]
pub struct Track {
    id: usize,
    state: TrackState,
    mean: StateMean,
    covariance: StateCovariance,
    score: f32,
    tracklet_len: usize,
    start_frame: usize,
    last_update_frame: usize,
    is_activated: bool,
}

impl Track {
    /// Start a track from an unmatched detection.
    pub fn new(id: usize, detection: &Detection, kalman_filter: &KalmanFilter, frame_id: usize) -> Self {
        let (mean, covariance) = kalman_filter.initiate(&detection.bbox.to_xyah());
        debug!("frame {frame_id}: track {id} created");

        Self {
            id,
            state: TrackState::New,
            mean,
            covariance,
            score: detection.score,
            tracklet_len: 1,
            start_frame: frame_id,
            last_update_frame: frame_id,
            is_activated: true,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn state(&self) -> TrackState {
        self.state
    }

    pub fn score(&self) -> f32 {
        self.score
    }

    pub fn tracklet_len(&self) -> usize {
        self.tracklet_len
    }

    pub fn start_frame(&self) -> usize {
        self.start_frame
    }

    pub fn last_update_frame(&self) -> usize {
        self.last_update_frame
    }

    pub fn is_activated(&self) -> bool {
        self.is_activated
    }

    pub fn mean(&self) -> &StateMean {
        &self.mean
    }

    pub fn covariance(&self) -> &StateCovariance {
        &self.covariance
    }

    /// Current box, derived from the filter mean.
    pub fn bbox(&self) -> BBox {
        BBox::from_xyah(&self.mean.fixed_rows::<4>(0).into_owned())
    }

    /// Whether the track belongs to the tracked pool.
    pub fn is_tracked(&self) -> bool {
        matches!(self.state, TrackState::New | TrackState::Tracked)
    }

    /// Whether the track should be reported for the current frame.
    pub fn is_emittable(&self) -> bool {
        self.is_activated && self.is_tracked()
    }

    /// Frames elapsed since the last matched detection.
    pub fn frames_since_update(&self, frame_id: usize) -> usize {
        frame_id.saturating_sub(self.last_update_frame)
    }

    pub fn predict(&mut self, kalman_filter: &KalmanFilter) {
        match self.state {
            // A single observation carries no velocity information.
            TrackState::New => self.mean.fixed_rows_mut::<4>(4).fill(0.0),
            // Keep an occluded box from growing or shrinking without evidence.
            TrackState::Lost => self.mean[7] = 0.0,
            TrackState::Tracked | TrackState::Removed(_) => {}
        }
        kalman_filter.predict(&mut self.mean, &mut self.covariance);
    }

    /// Apply a matched detection and move the track to `Tracked`.
    pub fn update(&mut self, detection: &Detection, kalman_filter: &KalmanFilter, frame_id: usize) {
        let measurement = detection.bbox.to_xyah();
        if let Err(err) = kalman_filter.update(&mut self.mean, &mut self.covariance, &measurement) {
            warn!("frame {frame_id}: track {} keeps its predicted state: {err}", self.id);
        }

        self.tracklet_len = match self.state {
            TrackState::Lost => {
                debug!(
                    "frame {frame_id}: track {} re-acquired after {} frames",
                    self.id,
                    self.frames_since_update(frame_id)
                );
                1
            }
            _ => self.tracklet_len + 1,
        };
        self.state = TrackState::Tracked;
        self.score = detection.score;
        self.last_update_frame = frame_id;
        self.is_activated = true;
    }

    pub fn mark_lost(&mut self, frame_id: usize) {
        if self.state == TrackState::Tracked {
            debug!("frame {frame_id}: track {} lost", self.id);
            self.state = TrackState::Lost;
        }
    }

    pub fn mark_removed(&mut self, cause: RemovalCause, frame_id: usize) {
        debug!("frame {frame_id}: track {} removed ({cause:?})", self.id);
        self.state = TrackState::Removed(cause);
    }

    pub fn to_tracked_object(&self, frame_id: usize) -> TrackedObject {
        TrackedObject {
            track_id: self.id,
            bbox: self.bbox(),
            score: self.score,
            frame_id,
            start_frame: self.start_frame,
        }
    }
}
