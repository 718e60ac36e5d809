//! Resize policy: target resolution and whether resizing runs before
//! detection (content-aware) or after compositing (fixed kernels).

use image::imageops::FilterType;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResizeError {
    #[error("content-aware resize requested but no content-aware resizer is configured")]
    ResizerUnavailable,
    #[error("cannot resize to {width}x{height}")]
    ZeroTarget { width: u32, height: u32 },
    #[error("resize failed: {0}")]
    Failed(String),
}

/// Malformed resize dimension.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DimensionError {
    #[error("percentage must be a finite, non-negative number, got {0}")]
    InvalidPercentage(f64),
    #[error("{pct}% of {original}px rounds down to zero")]
    VanishingPercentage { pct: f64, original: u32 },
    #[error("expected a pixel count (e.g. \"120\") or a percentage (e.g. \"50%\"), got {0:?}")]
    Unparseable(String),
}

/// Resize algorithm name that matches none of the known algorithms.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "unknown resize algorithm {0:?} \
     (expected content-aware, nearest, approx-bilinear, bilinear or catmull-rom)"
)]
pub struct UnknownAlgorithm(pub String);

/// Target size along one axis. Zero means "unchanged" in both forms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Absolute(u32),
    /// Percentage of the original size, rounded down.
    Percentage(f64),
}

impl Dimension {
    /// Resolve against the original size of the same axis.
    pub fn resolve(self, original: u32) -> Result<u32, DimensionError> {
        match self {
            Dimension::Absolute(0) => Ok(original),
            Dimension::Absolute(px) => Ok(px),
            Dimension::Percentage(pct) if !pct.is_finite() || pct < 0.0 => {
                Err(DimensionError::InvalidPercentage(pct))
            }
            Dimension::Percentage(pct) if pct == 0.0 => Ok(original),
            Dimension::Percentage(pct) => {
                let px = (original as f64 * pct / 100.0).floor() as u32;
                if px == 0 {
                    return Err(DimensionError::VanishingPercentage { pct, original });
                }
                Ok(px)
            }
        }
    }
}

impl FromStr for Dimension {
    type Err = DimensionError;

    /// `"120"` is an absolute size, `"50%"` or `"12.5%"` a percentage.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let unparseable = || DimensionError::Unparseable(s.to_string());
        match s.strip_suffix('%') {
            Some(pct) => pct
                .trim()
                .parse()
                .map(Dimension::Percentage)
                .map_err(|_| unparseable()),
            None => s.parse().map(Dimension::Absolute).map_err(|_| unparseable()),
        }
    }
}

/// Resolve the output `(width, height)` for a frame of size `original`.
pub fn resolve_target(
    original: (u32, u32),
    width: Option<Dimension>,
    height: Option<Dimension>,
) -> Result<(u32, u32), DimensionError> {
    let (ow, oh) = original;
    let nw = width.map_or(Ok(ow), |d| d.resolve(ow))?;
    let nh = height.map_or(Ok(oh), |d| d.resolve(oh))?;
    Ok((nw, nh))
}

/// Resizing algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResizeAlgorithm {
    /// Seam-carving style resize that preserves faces. Slowest, best results.
    #[default]
    ContentAware,
    /// Very fast, very low quality.
    NearestNeighbor,
    /// Fast, medium quality.
    ApproxBilinear,
    /// Slow, high quality.
    Bilinear,
    /// Slower, very high quality.
    CatmullRom,
}

impl ResizeAlgorithm {
    pub fn is_content_aware(self) -> bool {
        matches!(self, ResizeAlgorithm::ContentAware)
    }

    /// Interpolation kernel for the fixed algorithms.
    pub fn filter(self) -> Option<FilterType> {
        match self {
            ResizeAlgorithm::ContentAware => None,
            ResizeAlgorithm::NearestNeighbor => Some(FilterType::Nearest),
            ResizeAlgorithm::ApproxBilinear | ResizeAlgorithm::Bilinear => {
                Some(FilterType::Triangle)
            }
            ResizeAlgorithm::CatmullRom => Some(FilterType::CatmullRom),
        }
    }

    fn name(self) -> &'static str {
        match self {
            ResizeAlgorithm::ContentAware => "content-aware",
            ResizeAlgorithm::NearestNeighbor => "nearest",
            ResizeAlgorithm::ApproxBilinear => "approx-bilinear",
            ResizeAlgorithm::Bilinear => "bilinear",
            ResizeAlgorithm::CatmullRom => "catmull-rom",
        }
    }
}

impl fmt::Display for ResizeAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ResizeAlgorithm {
    type Err = UnknownAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "content-aware" | "caire" => Ok(ResizeAlgorithm::ContentAware),
            "nearest" | "nearest-neighbor" => Ok(ResizeAlgorithm::NearestNeighbor),
            "approx-bilinear" => Ok(ResizeAlgorithm::ApproxBilinear),
            "bilinear" => Ok(ResizeAlgorithm::Bilinear),
            "catmull-rom" => Ok(ResizeAlgorithm::CatmullRom),
            other => Err(UnknownAlgorithm(other.to_string())),
        }
    }
}

/// When, if ever, the resize step runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeStage {
    /// Target equals original.
    Skip,
    /// Before detection, so faces are found at their final positions.
    BeforeDetection,
    /// After compositing, as a uniform rescale of the finished image.
    AfterComposite,
}

/// Resolved resize decision for one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizePlan {
    pub width: u32,
    pub height: u32,
    pub algorithm: ResizeAlgorithm,
    pub stage: ResizeStage,
}

impl ResizePlan {
    pub fn new(original: (u32, u32), target: (u32, u32), algorithm: ResizeAlgorithm) -> Self {
        let stage = if target == original {
            ResizeStage::Skip
        } else if algorithm.is_content_aware() {
            ResizeStage::BeforeDetection
        } else {
            ResizeStage::AfterComposite
        };
        Self {
            width: target.0,
            height: target.1,
            algorithm,
            stage,
        }
    }
}

/// Resizer that preferentially preserves salient content.
pub trait ContentAwareResizer: Send + Sync {
    fn resize(&self, image: &RgbaImage, width: u32, height: u32) -> Result<RgbaImage, ResizeError>;
}

/// Resize `image` to `width` × `height` with `algorithm`.
///
/// Content-aware resizing is delegated to `resizer`; every other algorithm
/// uses the matching `image` interpolation kernel.
pub fn resize(
    image: &RgbaImage,
    width: u32,
    height: u32,
    algorithm: ResizeAlgorithm,
    resizer: Option<&dyn ContentAwareResizer>,
) -> Result<RgbaImage, ResizeError> {
    if width == 0 || height == 0 {
        return Err(ResizeError::ZeroTarget { width, height });
    }

    let resized = match algorithm.filter() {
        Some(filter) => image::imageops::resize(image, width, height, filter),
        None => resizer
            .ok_or(ResizeError::ResizerUnavailable)?
            .resize(image, width, height)?,
    };

    tracing::debug!(
        from_width = image.width(),
        from_height = image.height(),
        width,
        height,
        %algorithm,
        "resized frame"
    );

    Ok(resized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_hundred_is_noop() {
        assert_eq!(Dimension::Percentage(100.0).resolve(300), Ok(300));
    }

    #[test]
    fn test_percentage_half() {
        assert_eq!(Dimension::Percentage(50.0).resolve(200), Ok(100));
    }

    #[test]
    fn test_percentage_rounds_down() {
        // 33.3% of 100 = 33.3 → 33
        assert_eq!(Dimension::Percentage(33.3).resolve(100), Ok(33));
    }

    #[test]
    fn test_zero_means_unchanged() {
        assert_eq!(Dimension::Absolute(0).resolve(240), Ok(240));
        assert_eq!(Dimension::Percentage(0.0).resolve(240), Ok(240));
    }

    #[test]
    fn test_absolute_overrides() {
        assert_eq!(Dimension::Absolute(64).resolve(240), Ok(64));
    }

    #[test]
    fn test_invalid_percentages() {
        assert!(matches!(
            Dimension::Percentage(-5.0).resolve(100),
            Err(DimensionError::InvalidPercentage(_))
        ));
        assert!(matches!(
            Dimension::Percentage(f64::NAN).resolve(100),
            Err(DimensionError::InvalidPercentage(_))
        ));
        assert!(matches!(
            Dimension::Percentage(0.1).resolve(100),
            Err(DimensionError::VanishingPercentage { .. })
        ));
    }

    #[test]
    fn test_parse_dimension() {
        assert_eq!("120".parse::<Dimension>(), Ok(Dimension::Absolute(120)));
        assert_eq!("50%".parse::<Dimension>(), Ok(Dimension::Percentage(50.0)));
        assert_eq!(" 12.5 % ".parse::<Dimension>(), Ok(Dimension::Percentage(12.5)));
        assert!(matches!(
            "wide".parse::<Dimension>(),
            Err(DimensionError::Unparseable(_))
        ));
        assert!(matches!(
            "-3".parse::<Dimension>(),
            Err(DimensionError::Unparseable(_))
        ));
    }

    #[test]
    fn test_resolve_target_mixed() {
        let target = resolve_target(
            (400, 200),
            Some(Dimension::Absolute(100)),
            Some(Dimension::Percentage(50.0)),
        );
        assert_eq!(target, Ok((100, 100)));
        assert_eq!(resolve_target((400, 200), None, None), Ok((400, 200)));
    }

    #[test]
    fn test_plan_stages() {
        let plan = ResizePlan::new((200, 200), (200, 200), ResizeAlgorithm::ContentAware);
        assert_eq!(plan.stage, ResizeStage::Skip);

        let plan = ResizePlan::new((200, 200), (100, 100), ResizeAlgorithm::ContentAware);
        assert_eq!(plan.stage, ResizeStage::BeforeDetection);

        let plan = ResizePlan::new((200, 200), (100, 200), ResizeAlgorithm::CatmullRom);
        assert_eq!(plan.stage, ResizeStage::AfterComposite);
        assert_eq!((plan.width, plan.height), (100, 200));
    }

    #[test]
    fn test_algorithm_parse_roundtrip_names() {
        for alg in [
            ResizeAlgorithm::ContentAware,
            ResizeAlgorithm::NearestNeighbor,
            ResizeAlgorithm::ApproxBilinear,
            ResizeAlgorithm::Bilinear,
            ResizeAlgorithm::CatmullRom,
        ] {
            assert_eq!(alg.to_string().parse::<ResizeAlgorithm>(), Ok(alg));
        }
        assert_eq!(
            "Lanczos".parse::<ResizeAlgorithm>(),
            Err(UnknownAlgorithm("lanczos".to_string()))
        );
    }

    #[test]
    fn test_fixed_kernel_resize() {
        let image = RgbaImage::from_pixel(20, 10, image::Rgba([10, 20, 30, 255]));
        let out = resize(&image, 10, 5, ResizeAlgorithm::NearestNeighbor, None).unwrap();
        assert_eq!(out.dimensions(), (10, 5));
        assert!(out.pixels().all(|p| p.0 == [10, 20, 30, 255]));
    }

    #[test]
    fn test_content_aware_requires_resizer() {
        let image = RgbaImage::new(4, 4);
        let err = resize(&image, 2, 2, ResizeAlgorithm::ContentAware, None).unwrap_err();
        assert!(matches!(err, ResizeError::ResizerUnavailable));
    }

    #[test]
    fn test_zero_target_rejected() {
        let image = RgbaImage::new(4, 4);
        let err = resize(&image, 0, 2, ResizeAlgorithm::Bilinear, None).unwrap_err();
        assert!(matches!(
            err,
            ResizeError::ZeroTarget {
                width: 0,
                height: 2
            }
        ));
    }
}
