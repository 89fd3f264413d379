use crate::object::BBox;
use nalgebra::DMatrix;

/// Pairwise IoU between `rows` and `cols`.
pub fn iou_matrix(rows: &[BBox], cols: &[BBox]) -> DMatrix<f64> {
    DMatrix::from_fn(rows.len(), cols.len(), |row, col| {
        rows[row].iou_with(&cols[col]) as f64
    })
}

/// Association cost `1 - IoU` between track boxes (rows) and detection
/// boxes (columns).
pub fn iou_distance(tracks: &[BBox], detections: &[BBox]) -> DMatrix<f64> {
    iou_matrix(tracks, detections).map(|iou| 1.0 - iou)
}
