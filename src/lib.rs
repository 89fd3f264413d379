//! Multi-object tracking of 2D bounding boxes.
//!
//! Detections are associated with tracks on IoU in three stages: confident
//! detections first, then low-confidence detections to keep recently tracked
//! objects alive, then the leftover confident detections to confirm tracks
//! created on the previous frame. Box motion is modelled with a
//! constant-velocity Kalman filter.

pub mod assignment;
pub mod config;
pub mod error;
pub mod iou_matrix;
pub mod kalman;
pub mod object;
pub mod track;
pub mod tracker;

pub use error::{Error, Result};
pub use object::{BBox, Detection, TrackedObject};
pub use track::{RemovalCause, Track, TrackState};
pub use tracker::*;
