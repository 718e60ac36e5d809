//! Face detection adapter.
//!
//! Runs an opaque cascade detector over a grayscale copy of the frame with a
//! fixed scan configuration, merges overlapping hits and ranks the survivors
//! by descending confidence.

use crate::types::Detection;
use image::{GrayImage, RgbaImage};
use thiserror::Error;

// --- Scan constants ---
pub const MIN_FACE_SIZE: u32 = 20;
pub const MAX_FACE_SIZE: u32 = 1000;
pub const SHIFT_FACTOR: f32 = 0.1;
pub const SCALE_FACTOR: f32 = 1.1;
pub const CLUSTER_OVERLAP_THRESHOLD: f32 = 0.2;

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("model file not found: {0}")]
    ModelNotFound(String),
    #[error("failed to load model: {0}")]
    ModelLoad(String),
    #[error("detection failed: {0}")]
    DetectionFailed(String),
}

/// Sliding-window scan configuration handed to the detector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanParams {
    pub min_size: u32,
    pub max_size: u32,
    /// Window step as a fraction of the window size.
    pub shift_factor: f32,
    /// Growth factor between pyramid levels.
    pub scale_factor: f32,
}

impl Default for ScanParams {
    fn default() -> Self {
        Self {
            min_size: MIN_FACE_SIZE,
            max_size: MAX_FACE_SIZE,
            shift_factor: SHIFT_FACTOR,
            scale_factor: SCALE_FACTOR,
        }
    }
}

/// Pluggable face detection backend.
///
/// Implementations must be safe to call from several threads and should be
/// deterministic for identical input.
pub trait FaceDetector: Send + Sync {
    /// Scan a grayscale frame and return raw, possibly overlapping, candidates.
    fn detect(
        &self,
        gray: &GrayImage,
        params: &ScanParams,
    ) -> Result<Vec<Detection>, DetectorError>;

    /// Merge candidates that overlap by more than `overlap_threshold` IoU.
    fn cluster(&self, detections: Vec<Detection>, overlap_threshold: f32) -> Vec<Detection> {
        cluster_detections(detections, overlap_threshold)
    }
}

/// Convert a color frame to 8-bit luma.
pub fn to_grayscale(image: &RgbaImage) -> GrayImage {
    image::imageops::grayscale(image)
}

/// Detect, cluster and rank faces in `image`.
///
/// The result is sorted by descending confidence; index 0 is the most
/// confident face. An empty result means no faces were found.
pub fn detect_faces(
    detector: &dyn FaceDetector,
    image: &RgbaImage,
) -> Result<Vec<Detection>, DetectorError> {
    let gray = to_grayscale(image);
    let mut candidates = detector.detect(&gray, &ScanParams::default())?;
    let candidate_count = candidates.len();

    candidates.retain(|d| d.confidence.is_finite());
    if candidates.len() < candidate_count {
        tracing::warn!(
            dropped = candidate_count - candidates.len(),
            "ignoring detections with non-finite confidence"
        );
    }

    let mut detections = detector.cluster(candidates, CLUSTER_OVERLAP_THRESHOLD);
    rank(&mut detections);

    tracing::debug!(
        width = image.width(),
        height = image.height(),
        candidates = candidate_count,
        faces = detections.len(),
        "face detection finished"
    );

    Ok(detections)
}

/// Sort detections by descending confidence. Ties keep detector order.
///
/// Uses the IEEE total order, so a NaN score cannot break the sort.
pub fn rank(detections: &mut [Detection]) {
    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
}

/// Greedy overlap clustering.
///
/// Each unassigned detection seeds a cluster that absorbs every later
/// detection overlapping it by more than `iou_threshold`. A cluster's
/// geometry is the integer mean of its members and its confidence is the sum.
pub fn cluster_detections(detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    let mut assigned = vec![false; detections.len()];
    let mut clusters = Vec::new();

    for i in 0..detections.len() {
        if assigned[i] {
            continue;
        }

        let (mut sum_x, mut sum_y, mut sum_scale) = (0i64, 0i64, 0i64);
        let mut confidence = 0.0f32;
        let mut members = 0i64;

        for j in i..detections.len() {
            if assigned[j] {
                continue;
            }
            if detections[i].overlap(&detections[j]) > iou_threshold {
                assigned[j] = true;
                sum_x += detections[j].center_x as i64;
                sum_y += detections[j].center_y as i64;
                sum_scale += detections[j].scale as i64;
                confidence += detections[j].confidence;
                members += 1;
            }
        }

        // A zero-scale seed never overlaps itself; keep it as-is.
        if members == 0 {
            assigned[i] = true;
            clusters.push(detections[i]);
            continue;
        }

        clusters.push(Detection {
            center_x: (sum_x / members) as i32,
            center_y: (sum_y / members) as i32,
            scale: (sum_scale / members) as i32,
            confidence,
        });
    }

    clusters
}
