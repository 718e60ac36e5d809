use crate::detector::DetectorError;
use crate::resize::{DimensionError, ResizeError};
use crate::triangulate::TriangulationError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FaceMaskError {
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("unrecognized image format")]
    UnsupportedFormat,
    #[error("invalid configuration: {0}")]
    Configuration(#[from] DimensionError),
    #[error("failed to build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
    #[error("detector error: {0}")]
    Detection(#[from] DetectorError),
    #[error("resize error: {0}")]
    Resize(#[from] ResizeError),
    #[error("face #{rank}: {source}")]
    Triangulation {
        rank: usize,
        #[source]
        source: TriangulationError,
    },
}
