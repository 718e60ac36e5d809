//! Pipeline orchestrator.
//!
//! ```text
//! Decoded → [PreResized] → Detected ─┬─ no faces ───────────────────────┬→ [PostResized] → Done
//!                                    └─ Dispatched → Joined → Composited ┘
//! ```
//!
//! Any stage error ends the run; nothing is retried here.

use crate::composite::composite_masked;
use crate::detector::{detect_faces, FaceDetector};
use crate::dispatch::dispatch_faces;
use crate::error::FaceMaskError;
use crate::resize::{
    self, ContentAwareResizer, Dimension, ResizeAlgorithm, ResizePlan, ResizeStage,
};
use crate::seam::SeamCarver;
use crate::triangulate::Triangulator;
use crate::types::{StylePolicy, UniformStyle};
use image::{DynamicImage, ImageFormat, ImageReader, RgbaImage};
use std::fmt;
use std::io::{BufRead, Seek};
use std::sync::Arc;

/// Per-run settings.
#[derive(Clone, Default)]
pub struct Options {
    /// Output height. `None` keeps the original height.
    pub target_height: Option<Dimension>,
    /// Output width. `None` keeps the original width.
    pub target_width: Option<Dimension>,
    pub resize_algorithm: ResizeAlgorithm,
    /// Decides per face whether and how to triangulate. When `None`, every
    /// face is rendered with [`StyleConfig::default`](crate::StyleConfig::default).
    pub policy: Option<Arc<dyn StylePolicy>>,
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("target_height", &self.target_height)
            .field("target_width", &self.target_width)
            .field("resize_algorithm", &self.resize_algorithm)
            .field("policy", &self.policy.as_ref().map(|_| "custom"))
            .finish()
    }
}

/// Pipeline progress, used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Decoded,
    PreResized,
    Detected,
    NoFaces,
    Joined,
    Composited,
    PostResized,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Decoded => "decoded",
            Stage::PreResized => "pre-resized",
            Stage::Detected => "detected",
            Stage::NoFaces => "no-faces",
            Stage::Joined => "joined",
            Stage::Composited => "composited",
            Stage::PostResized => "post-resized",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// The face mask filter with its external collaborators.
///
/// ```no_run
/// use std::sync::Arc;
/// use facemask_core::{FaceMask, LowPolyRenderer, Options, RustfaceDetector};
///
/// let detector = RustfaceDetector::from_file("seeta_fd_frontal_v1.0.bin".as_ref()).unwrap();
/// let filter = FaceMask::new(Arc::new(detector), Arc::new(LowPolyRenderer));
/// let file = std::io::BufReader::new(std::fs::File::open("face.jpg").unwrap());
/// let (masked, format) = filter.apply_reader(file, &Options::default()).unwrap();
/// ```
pub struct FaceMask {
    detector: Arc<dyn FaceDetector>,
    triangulator: Arc<dyn Triangulator>,
    resizer: Option<Arc<dyn ContentAwareResizer>>,
    pool: Option<rayon::ThreadPool>,
}

impl FaceMask {
    /// Content-aware resizing uses [`SeamCarver`] until another resizer is set.
    pub fn new(detector: Arc<dyn FaceDetector>, triangulator: Arc<dyn Triangulator>) -> Self {
        Self {
            detector,
            triangulator,
            resizer: Some(Arc::new(SeamCarver::default())),
            pool: None,
        }
    }

    /// Resizer used when [`ResizeAlgorithm::ContentAware`] is selected.
    pub fn content_aware_resizer(mut self, resizer: Arc<dyn ContentAwareResizer>) -> Self {
        self.resizer = Some(resizer);
        self
    }

    /// Run face tasks on a dedicated pool of `threads` workers instead of
    /// the global rayon pool. Zero keeps the global pool.
    pub fn workers(mut self, threads: usize) -> Result<Self, FaceMaskError> {
        if threads == 0 {
            self.pool = None;
            return Ok(self);
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("facemask-worker-{i}"))
            .build()?;
        tracing::debug!(threads, "face worker pool created");
        self.pool = Some(pool);
        Ok(self)
    }

    /// Decode an image from `reader` and apply the filter.
    ///
    /// Returns the composited image together with the detected input format.
    pub fn apply_reader<R: BufRead + Seek>(
        &self,
        reader: R,
        options: &Options,
    ) -> Result<(RgbaImage, ImageFormat), FaceMaskError> {
        let reader = ImageReader::new(reader)
            .with_guessed_format()
            .map_err(image::ImageError::from)?;
        let format = reader.format().ok_or(FaceMaskError::UnsupportedFormat)?;
        let image = reader.decode()?;
        tracing::debug!(?format, width = image.width(), height = image.height(), "decoded input");

        let masked = self.apply(image, options)?;
        Ok((masked, format))
    }

    /// Apply the filter to a decoded image.
    pub fn apply(
        &self,
        image: DynamicImage,
        options: &Options,
    ) -> Result<RgbaImage, FaceMaskError> {
        let mut frame = image.into_rgba8();
        let original = frame.dimensions();
        let target = resize::resolve_target(original, options.target_width, options.target_height)?;
        let plan = ResizePlan::new(original, target, options.resize_algorithm);
        tracing::debug!(
            stage = %Stage::Decoded,
            width = original.0,
            height = original.1,
            target_width = plan.width,
            target_height = plan.height,
            algorithm = %plan.algorithm,
            resize = ?plan.stage,
            "pipeline started"
        );

        if plan.stage == ResizeStage::BeforeDetection {
            frame = self.resize(&frame, &plan)?;
            tracing::debug!(stage = %Stage::PreResized, "content-aware resize done");
        }

        let detections = detect_faces(self.detector.as_ref(), &frame)?;
        tracing::debug!(stage = %Stage::Detected, faces = detections.len());

        if detections.is_empty() {
            tracing::info!(stage = %Stage::NoFaces, "no faces detected; image left unmasked");
            return self.finish(frame, &plan);
        }

        let default_policy = UniformStyle::default();
        let policy: &dyn StylePolicy = options.policy.as_deref().unwrap_or(&default_policy);
        let triangulator = self.triangulator.as_ref();

        let layers = self.on_pool(|| dispatch_faces(&frame, &detections, policy, triangulator))?;
        tracing::debug!(
            stage = %Stage::Joined,
            rendered = layers.rendered,
            skipped = layers.skipped
        );

        composite_masked(&mut frame, &layers.template, &layers.union_mask);
        tracing::debug!(stage = %Stage::Composited);

        self.finish(frame, &plan)
    }

    fn finish(&self, frame: RgbaImage, plan: &ResizePlan) -> Result<RgbaImage, FaceMaskError> {
        let frame = if plan.stage == ResizeStage::AfterComposite {
            let resized = self.resize(&frame, plan)?;
            tracing::debug!(stage = %Stage::PostResized, "fixed-kernel resize done");
            resized
        } else {
            frame
        };
        tracing::debug!(stage = %Stage::Done, width = frame.width(), height = frame.height());
        Ok(frame)
    }

    fn resize(&self, frame: &RgbaImage, plan: &ResizePlan) -> Result<RgbaImage, FaceMaskError> {
        let resized = resize::resize(
            frame,
            plan.width,
            plan.height,
            plan.algorithm,
            self.resizer.as_deref(),
        )?;
        Ok(resized)
    }

    fn on_pool<R: Send>(&self, op: impl FnOnce() -> R + Send) -> R {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }
}
