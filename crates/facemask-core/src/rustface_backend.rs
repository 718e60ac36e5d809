//! SeetaFace cascade detector via the `rustface` crate.

use crate::detector::{DetectorError, FaceDetector, ScanParams};
use crate::types::Detection;
use image::GrayImage;
use std::path::Path;

/// Side of the SeetaFace scan window, in pixels.
const SEETA_WINDOW_SIZE: f32 = 40.0;
/// The cascade refuses minimum face sizes below this.
const SEETA_MIN_FACE_SIZE: u32 = 20;
const SEETA_SCORE_THRESHOLD: f64 = 2.0;

/// Face detector backed by a SeetaFace frontal model.
///
/// The model is parsed once and shared read-only; each `detect` call works
/// on its own detector instance, so one `RustfaceDetector` can serve many
/// threads.
pub struct RustfaceDetector {
    model: rustface::Model,
}

impl RustfaceDetector {
    /// Load a SeetaFace model file (e.g. `seeta_fd_frontal_v1.0.bin`).
    pub fn from_file(model_path: &Path) -> Result<Self, DetectorError> {
        if !model_path.exists() {
            return Err(DetectorError::ModelNotFound(model_path.display().to_string()));
        }
        let file = std::fs::File::open(model_path)
            .map_err(|e| DetectorError::ModelLoad(format!("{}: {e}", model_path.display())))?;
        let model = rustface::read_model(std::io::BufReader::new(file))
            .map_err(|e| DetectorError::ModelLoad(format!("{}: {e}", model_path.display())))?;

        tracing::info!(path = %model_path.display(), "loaded SeetaFace model");
        Ok(Self { model })
    }

    /// Parse a SeetaFace model from memory.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DetectorError> {
        let model = rustface::read_model(std::io::Cursor::new(bytes))
            .map_err(|e| DetectorError::ModelLoad(e.to_string()))?;
        Ok(Self { model })
    }
}

impl FaceDetector for RustfaceDetector {
    fn detect(
        &self,
        gray: &GrayImage,
        params: &ScanParams,
    ) -> Result<Vec<Detection>, DetectorError> {
        let (width, height) = gray.dimensions();
        if width == 0 || height == 0 {
            return Ok(Vec::new());
        }

        let mut detector = rustface::create_detector_with_model(self.model.clone());
        detector.set_min_face_size(params.min_size.max(SEETA_MIN_FACE_SIZE));
        detector.set_max_face_size(params.max_size);
        // Pyramid levels shrink the image rather than grow the window.
        detector.set_pyramid_scale_factor((1.0 / params.scale_factor).clamp(0.01, 0.99));
        let step = ((SEETA_WINDOW_SIZE * params.shift_factor).round() as u32).max(1);
        detector.set_slide_window_step(step, step);
        detector.set_score_thresh(SEETA_SCORE_THRESHOLD);

        let faces = detector.detect(&rustface::ImageData::new(gray.as_raw(), width, height));

        Ok(faces
            .iter()
            .map(|face| {
                let bbox = face.bbox();
                let (w, h) = (bbox.width() as i32, bbox.height() as i32);
                Detection {
                    center_x: bbox.x() + w / 2,
                    center_y: bbox.y() + h / 2,
                    scale: w.max(h),
                    confidence: face.score() as f32,
                }
            })
            .collect())
    }
}
