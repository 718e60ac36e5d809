//! Per-face fan-out.
//!
//! Every detection becomes an independent task on the current rayon pool.
//! Tasks share two accumulation buffers, each behind its own lock: the union
//! of face ellipses and the template holding every rendered face. A lock is
//! held only for the draw itself, never across triangulation, and no task
//! ever holds both.

use crate::ellipse::Ellipse;
use crate::error::FaceMaskError;
use crate::triangulate::{TriangulationError, Triangulator};
use crate::types::{Detection, FaceBox, FaceContext, Style, StylePolicy};
use image::{GrayImage, RgbaImage};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

/// Accumulated output of all face tasks.
pub struct FaceLayers {
    /// Alpha stencil: the union of every rendered face's ellipse.
    pub union_mask: GrayImage,
    /// Rendered faces pasted at their face boxes, transparent elsewhere.
    pub template: RgbaImage,
    pub rendered: usize,
    pub skipped: usize,
}

enum FaceOutcome {
    Rendered,
    Skipped,
}

/// Process all `detections` (already ranked) concurrently and wait for them.
///
/// A failing task does not stop its siblings; they run to completion and
/// their writes stay in the buffers. Only the first failure to be recorded
/// is returned.
pub fn dispatch_faces(
    base: &RgbaImage,
    detections: &[Detection],
    policy: &dyn StylePolicy,
    triangulator: &dyn Triangulator,
) -> Result<FaceLayers, FaceMaskError> {
    let (width, height) = base.dimensions();
    let union_mask = Mutex::new(GrayImage::new(width, height));
    let template = Mutex::new(RgbaImage::new(width, height));
    let first_error: OnceLock<FaceMaskError> = OnceLock::new();
    let rendered = AtomicUsize::new(0);
    let skipped = AtomicUsize::new(0);

    rayon::scope(|s| {
        for (rank, detection) in detections.iter().enumerate() {
            let (union_mask, template) = (&union_mask, &template);
            let (first_error, rendered, skipped) = (&first_error, &rendered, &skipped);

            s.spawn(move |_| {
                let outcome = process_face(
                    rank,
                    detection,
                    base,
                    policy,
                    triangulator,
                    union_mask,
                    template,
                );
                match outcome {
                    Ok(FaceOutcome::Rendered) => {
                        rendered.fetch_add(1, Ordering::Relaxed);
                    }
                    Ok(FaceOutcome::Skipped) => {
                        skipped.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(source) => {
                        tracing::warn!(rank, error = %source, "face task failed");
                        let _ = first_error.set(FaceMaskError::Triangulation { rank, source });
                    }
                }
            });
        }
    });

    if let Some(err) = first_error.into_inner() {
        return Err(err);
    }

    let layers = FaceLayers {
        union_mask: union_mask.into_inner().unwrap_or_else(PoisonError::into_inner),
        template: template.into_inner().unwrap_or_else(PoisonError::into_inner),
        rendered: rendered.into_inner(),
        skipped: skipped.into_inner(),
    };
    tracing::info!(
        faces = detections.len(),
        rendered = layers.rendered,
        skipped = layers.skipped,
        "face tasks joined"
    );
    Ok(layers)
}

fn process_face(
    rank: usize,
    detection: &Detection,
    base: &RgbaImage,
    policy: &dyn StylePolicy,
    triangulator: &dyn Triangulator,
    union_mask: &Mutex<GrayImage>,
    template: &Mutex<RgbaImage>,
) -> Result<FaceOutcome, TriangulationError> {
    let face_box = detection.face_box();
    let context = FaceContext {
        rank,
        area: face_box.area(),
        confidence: detection.confidence,
        frame_height: base.height(),
        frame_width: base.width(),
    };

    let style = match policy.resolve(&context) {
        Style::Apply(style) => style,
        Style::Skip => {
            tracing::debug!(rank, confidence = detection.confidence, "face skipped by policy");
            return Ok(FaceOutcome::Skipped);
        }
    };

    Ellipse::for_detection(detection).draw_over(&mut lock(union_mask));

    let face = crop_face(base, &face_box);
    let rendered = triangulator.render(&face, &style)?;

    image::imageops::overlay(
        &mut *lock(template),
        &rendered,
        face_box.min_x as i64,
        face_box.min_y as i64,
    );

    tracing::debug!(
        rank,
        confidence = detection.confidence,
        x = face_box.min_x,
        y = face_box.min_y,
        size = face_box.width(),
        "face rendered"
    );
    Ok(FaceOutcome::Rendered)
}

/// Writers never leave a buffer half-drawn, so a poisoned lock is still usable.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Copy the face box out of `base`; parts outside the frame stay transparent.
pub fn crop_face(base: &RgbaImage, face_box: &FaceBox) -> RgbaImage {
    let mut face = RgbaImage::new(face_box.width(), face_box.height());
    image::imageops::replace(&mut face, base, -(face_box.min_x as i64), -(face_box.min_y as i64));
    face
}
