//! Replays a recorded detection log through the tracker.

use bbox_tracking::{BBox, Detection, RemovalCause, TrackedObject, Tracker};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};

const DETECTION_RESULTS: &str = include_str!("data/detection_results.json");

#[derive(Debug, Deserialize)]
struct DetectionResults {
    name: String,
    fps: f64,
    track_buffer: usize,
    results: Vec<DetectionRecord>,
}

#[derive(Debug, Deserialize)]
struct DetectionRecord {
    frame_id: usize,
    prob: f32,
    x: f32,
    y: f32,
    width: f32,
    height: f32,
}

fn load() -> (DetectionResults, BTreeMap<usize, Vec<Detection>>) {
    let results: DetectionResults = serde_json::from_str(DETECTION_RESULTS).unwrap();
    let mut frames: BTreeMap<usize, Vec<Detection>> = BTreeMap::new();
    for record in &results.results {
        let bbox = BBox::new(record.x, record.y, record.width, record.height);
        frames
            .entry(record.frame_id)
            .or_default()
            .push(Detection::new(bbox, record.prob));
    }
    (results, frames)
}

fn run(results: &DetectionResults, frames: &BTreeMap<usize, Vec<Detection>>) -> Vec<Vec<TrackedObject>> {
    let mut tracker = Tracker::with_frame_rate(results.fps, results.track_buffer).unwrap();
    frames
        .iter()
        .map(|(&frame_id, detections)| {
            let outputs = tracker.update(detections);
            assert_eq!(tracker.frame_id(), frame_id);
            outputs
        })
        .collect()
}

fn ids(outputs: &[TrackedObject]) -> Vec<usize> {
    outputs.iter().map(|obj| obj.track_id).collect()
}

#[test]
fn replay_is_deterministic() {
    let (results, frames) = load();
    assert_eq!(results.name, "synthetic_walker_car");
    assert_eq!(frames.len(), 40);

    let first = run(&results, &frames);
    let second = run(&results, &frames);
    assert_eq!(first, second);
}

#[test]
fn replay_follows_the_expected_identities() {
    let (results, frames) = load();
    let outputs = run(&results, &frames);

    // Walker and car from the first frame.
    assert_eq!(ids(&outputs[0]), vec![1, 2]);
    // The one-frame spurious box is reported once, then never again.
    assert_eq!(ids(&outputs[6]), vec![1, 2, 3]);
    assert!(outputs[7..].iter().all(|frame| !ids(frame).contains(&3)));
    // Weak car detections keep the car alive.
    for frame in &outputs[9..12] {
        assert_eq!(ids(frame), vec![1, 2]);
    }
    // The car is occluded, then re-acquired under its old id.
    for frame in &outputs[14..22] {
        assert_eq!(ids(frame), vec![1]);
    }
    assert_eq!(ids(&outputs[22]), vec![1, 2]);
    // The late static object gets the next free id.
    assert_eq!(ids(&outputs[24]), vec![1, 2, 4]);
    assert_eq!(ids(&outputs[39]), vec![1, 2, 4]);

    let car = outputs[39].iter().find(|obj| obj.track_id == 2).unwrap();
    assert!((car.bbox.x - 400.0).abs() < 2.0);
    assert_eq!(car.start_frame, 1);
}

#[test]
fn replay_never_spawns_from_weak_detections() {
    let (results, frames) = load();
    let mut tracker = Tracker::with_frame_rate(results.fps, results.track_buffer).unwrap();
    let track_thresh = tracker.config().track_thresh;

    let mut seen = BTreeSet::new();
    let mut removed = BTreeSet::new();
    for detections in frames.values() {
        let outputs = tracker.update(detections);

        for obj in &outputs {
            assert!(!removed.contains(&obj.track_id));
            if seen.insert(obj.track_id) {
                assert_eq!(obj.start_frame, obj.frame_id);
                assert!(obj.score >= track_thresh);
                assert!(seen.iter().all(|&id| id <= obj.track_id));
            }
            // The ghost at (900, 600) only ever scores 0.3.
            assert!(obj.bbox.x < 850.0);
        }

        for removal in tracker.last_removals() {
            assert_eq!(removal.cause, RemovalCause::Unconfirmed);
            removed.insert(removal.track_id);
        }
    }
    assert_eq!(removed, BTreeSet::from([3]));
}
