//! TOML style profiles.
//!
//! ```toml
//! max_faces = 3
//! min_confidence = 5.0
//! reference_area = 40000
//!
//! [style]
//! max_points = 4000
//! blur_radius = 4
//! ```

use anyhow::{Context, Result};
use facemask_core::{FaceContext, Style, StyleConfig, StylePolicy};
use serde::Deserialize;
use std::path::Path;

/// Per-face style rules read from a profile file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StyleProfile {
    /// Faces ranked at or past this index are left alone. 0 means no limit.
    pub max_faces: usize,
    pub min_confidence: f32,
    /// Faces whose box covers fewer pixels are left alone.
    pub min_area: u64,
    /// Face area at which `style` applies unscaled. Larger faces get more
    /// points and a wider blur, smaller faces fewer.
    pub reference_area: Option<u64>,
    pub style: StyleConfig,
}

impl Default for StyleProfile {
    fn default() -> Self {
        Self {
            max_faces: 1,
            min_confidence: 0.0,
            min_area: 0,
            reference_area: None,
            style: StyleConfig {
                max_points: 4000,
                blur_radius: 4,
                blur_factor: 1,
                edge_factor: 6,
                point_rate: 0.075,
            },
        }
    }
}

impl StyleProfile {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading style profile {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing style profile {}", path.display()))
    }

    fn scaled(&self, area: u64) -> StyleConfig {
        let Some(reference) = self.reference_area.filter(|&r| r > 0) else {
            return self.style.clone();
        };
        let ratio = area as f64 / reference as f64;
        StyleConfig {
            max_points: ((self.style.max_points as f64 * ratio).round() as usize).max(1),
            blur_radius: (self.style.blur_radius as f64 * ratio.sqrt()).round() as u32,
            ..self.style.clone()
        }
    }
}

impl StylePolicy for StyleProfile {
    fn resolve(&self, face: &FaceContext) -> Style {
        if self.max_faces > 0 && face.rank >= self.max_faces {
            return Style::Skip;
        }
        if face.confidence < self.min_confidence || face.area < self.min_area {
            return Style::Skip;
        }
        Style::Apply(self.scaled(face.area))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face(rank: usize, area: u64, confidence: f32) -> FaceContext {
        FaceContext {
            rank,
            area,
            confidence,
            frame_height: 480,
            frame_width: 640,
        }
    }

    #[test]
    fn test_default_masks_only_best_face() {
        let profile = StyleProfile::default();
        assert!(matches!(profile.resolve(&face(0, 900, 1.0)), Style::Apply(_)));
        assert_eq!(profile.resolve(&face(1, 900, 1.0)), Style::Skip);
    }

    #[test]
    fn test_thresholds_skip() {
        let profile = StyleProfile {
            max_faces: 0,
            min_confidence: 3.0,
            min_area: 400,
            ..Default::default()
        };
        assert_eq!(profile.resolve(&face(5, 900, 2.0)), Style::Skip);
        assert_eq!(profile.resolve(&face(5, 100, 9.0)), Style::Skip);
        assert!(matches!(profile.resolve(&face(5, 900, 9.0)), Style::Apply(_)));
    }

    #[test]
    fn test_area_scaling() {
        let profile = StyleProfile {
            reference_area: Some(10_000),
            ..Default::default()
        };
        let Style::Apply(style) = profile.resolve(&face(0, 40_000, 1.0)) else {
            panic!("face should be styled");
        };
        assert_eq!(style.max_points, 16_000);
        assert_eq!(style.blur_radius, 8);
        assert_eq!(style.edge_factor, 6);
    }

    #[test]
    fn test_parse_partial_profile() {
        let profile: StyleProfile = toml::from_str(
            r#"
            max_faces = 3
            [style]
            blur_radius = 7
            "#,
        )
        .unwrap();
        assert_eq!(profile.max_faces, 3);
        assert_eq!(profile.style.blur_radius, 7);
        assert_eq!(profile.style.max_points, StyleConfig::default().max_points);
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(toml::from_str::<StyleProfile>("max_face = 3").is_err());
    }
}
