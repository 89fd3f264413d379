use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
/// Defines what the config file should contain.
pub struct Config {
    /// Frame rate of the input stream.
    pub frame_rate: f64,
    /// The number of frames a lost track is kept, expressed at `reference_frame_rate`.
    pub track_buffer: usize,
    /// The frame rate `track_buffer` refers to.
    pub reference_frame_rate: f64,
    /// Detections scoring at least this are high-confidence.
    pub track_thresh: f32,
    /// Detections scoring below this are discarded.
    pub low_thresh: f32,
    /// Minimum score for an unmatched detection to start a new track.
    /// Falls back to `track_thresh` when unset.
    pub new_track_thresh: Option<f32>,
    /// Maximum `1 - IoU` cost accepted when matching high-confidence detections.
    pub match_thresh: f64,
    /// Maximum `1 - IoU` cost accepted when matching low-confidence detections.
    pub low_match_thresh: f64,
    /// Maximum `1 - IoU` cost accepted when confirming new tracks.
    pub unconfirmed_match_thresh: f64,
    /// Motion filter noise weight on position, aspect ratio and height.
    pub std_weight_position: f32,
    /// Motion filter noise weight on velocities.
    pub std_weight_velocity: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            frame_rate: 30.0,
            track_buffer: 30,
            reference_frame_rate: 30.0,
            track_thresh: 0.5,
            low_thresh: 0.1,
            new_track_thresh: None,
            match_thresh: 0.8,
            low_match_thresh: 0.5,
            unconfirmed_match_thresh: 0.7,
            std_weight_position: 1. / 20.,
            std_weight_velocity: 1. / 160.,
        }
    }
}

impl Config {
    /// Build the default config for a given frame rate and track buffer.
    pub fn with_frame_rate(frame_rate: f64, track_buffer: usize) -> Self {
        Self {
            frame_rate,
            track_buffer,
            ..Self::default()
        }
    }

    /// The number of frames a lost track survives before it is removed.
    pub fn max_time_lost(&self) -> usize {
        (self.frame_rate / self.reference_frame_rate * self.track_buffer as f64) as usize
    }

    pub fn new_track_thresh(&self) -> f32 {
        self.new_track_thresh.unwrap_or(self.track_thresh)
    }

    pub fn validate(&self) -> Result<()> {
        let Self {
            frame_rate,
            reference_frame_rate,
            track_thresh,
            low_thresh,
            match_thresh,
            low_match_thresh,
            unconfirmed_match_thresh,
            std_weight_position,
            std_weight_velocity,
            ..
        } = *self;

        ensure_positive("frame_rate", frame_rate)?;
        ensure_positive("reference_frame_rate", reference_frame_rate)?;
        ensure_positive("std_weight_position", std_weight_position as f64)?;
        ensure_positive("std_weight_velocity", std_weight_velocity as f64)?;

        ensure_unit_interval("track_thresh", track_thresh)?;
        ensure_unit_interval("low_thresh", low_thresh)?;
        if low_thresh > track_thresh {
            return Err(Error::InvalidConfig(format!(
                "low_thresh ({low_thresh}) must not exceed track_thresh ({track_thresh})"
            )));
        }
        if let Some(new_track_thresh) = self.new_track_thresh {
            ensure_unit_interval("new_track_thresh", new_track_thresh)?;
            if new_track_thresh < track_thresh {
                return Err(Error::InvalidConfig(format!(
                    "new_track_thresh ({new_track_thresh}) must not be below track_thresh ({track_thresh})"
                )));
            }
        }

        for (name, ceiling) in [
            ("match_thresh", match_thresh),
            ("low_match_thresh", low_match_thresh),
            ("unconfirmed_match_thresh", unconfirmed_match_thresh),
        ] {
            if !(ceiling > 0.0 && ceiling <= 1.0) {
                return Err(Error::InvalidConfig(format!(
                    "{name} must lie in (0, 1], got {ceiling}"
                )));
            }
        }

        Ok(())
    }
}

fn ensure_positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidConfig(format!(
            "{name} must be finite and positive, got {value}"
        )))
    }
}

fn ensure_unit_interval(name: &str, value: f32) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(Error::InvalidConfig(format!(
            "{name} must lie in [0, 1], got {value}"
        )))
    }
}
