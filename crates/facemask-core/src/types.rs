use serde::{Deserialize, Serialize};

/// A face found by the detector, in image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub center_x: i32,
    pub center_y: i32,
    /// Side length of the square detection window.
    pub scale: i32,
    pub confidence: f32,
}

impl Detection {
    /// Axis-aligned region `[center - scale/2, center + scale/2)` on both axes.
    pub fn face_box(&self) -> FaceBox {
        let half = self.scale as f64 / 2.0;
        let (cx, cy) = (self.center_x as f64, self.center_y as f64);
        FaceBox {
            min_x: (cx - half) as i32,
            min_y: (cy - half) as i32,
            max_x: (cx + half) as i32,
            max_y: (cy + half) as i32,
        }
    }

    /// Intersection-over-union of the two square detection windows.
    pub fn overlap(&self, other: &Detection) -> f32 {
        let (r1, c1, s1) = (self.center_y as f32, self.center_x as f32, self.scale as f32);
        let (r2, c2, s2) = (other.center_y as f32, other.center_x as f32, other.scale as f32);

        let over_rows = span_overlap(r1, s1, r2, s2);
        let over_cols = span_overlap(c1, s1, c2, s2);
        let inter_area = over_rows * over_cols;

        let union_area = s1 * s1 + s2 * s2 - inter_area;
        if union_area > 0.0 {
            inter_area / union_area
        } else {
            0.0
        }
    }
}

/// Length shared by two centered spans.
fn span_overlap(a: f32, size_a: f32, b: f32, size_b: f32) -> f32 {
    let hi = (a + size_a / 2.0).min(b + size_b / 2.0);
    let lo = (a - size_a / 2.0).max(b - size_b / 2.0);
    (hi - lo).max(0.0)
}

/// Half-open pixel rectangle covering one detected face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceBox {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl FaceBox {
    pub fn width(&self) -> u32 {
        (self.max_x - self.min_x).max(0) as u32
    }

    pub fn height(&self) -> u32 {
        (self.max_y - self.min_y).max(0) as u32
    }

    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }
}

/// Knobs for the low-poly rendering of one face.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    /// Upper bound on the number of triangulation points.
    pub max_points: usize,
    pub blur_radius: u32,
    pub blur_factor: u32,
    /// Higher values subdivide more aggressively around edges.
    pub edge_factor: u32,
    /// Points per pixel of face area, capped by `max_points`.
    pub point_rate: f32,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            max_points: 2500,
            blur_radius: 2,
            blur_factor: 1,
            edge_factor: 6,
            point_rate: 0.075,
        }
    }
}

/// Outcome of style resolution for one detection.
#[derive(Debug, Clone, PartialEq)]
pub enum Style {
    /// Triangulate the face with these settings.
    Apply(StyleConfig),
    /// Leave the face untouched: no mask, no rendering.
    Skip,
}

/// Everything a [`StylePolicy`] gets to see about a detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceContext {
    /// Zero-based position after sorting by descending confidence.
    pub rank: usize,
    /// Face box width × height, in pixels.
    pub area: u64,
    pub confidence: f32,
    pub frame_height: u32,
    pub frame_width: u32,
}

/// Caller-supplied decision of which faces to render and how.
///
/// Called once per detection, possibly from several worker threads at once.
pub trait StylePolicy: Send + Sync {
    fn resolve(&self, face: &FaceContext) -> Style;
}

impl<F> StylePolicy for F
where
    F: Fn(&FaceContext) -> Style + Send + Sync,
{
    fn resolve(&self, face: &FaceContext) -> Style {
        self(face)
    }
}

/// Renders every detected face with the same settings.
#[derive(Debug, Clone, Default)]
pub struct UniformStyle(pub StyleConfig);

impl StylePolicy for UniformStyle {
    fn resolve(&self, _face: &FaceContext) -> Style {
        Style::Apply(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(cx: i32, cy: i32, scale: i32, confidence: f32) -> Detection {
        Detection {
            center_x: cx,
            center_y: cy,
            scale,
            confidence,
        }
    }

    #[test]
    fn test_face_box_centered() {
        let b = det(100, 100, 60, 0.9).face_box();
        assert_eq!(
            b,
            FaceBox {
                min_x: 70,
                min_y: 70,
                max_x: 130,
                max_y: 130
            }
        );
        assert_eq!(b.width(), 60);
        assert_eq!(b.area(), 3600);
    }

    #[test]
    fn test_face_box_odd_scale_truncates() {
        let b = det(10, 10, 5, 0.5).face_box();
        // 10 - 2.5 = 7.5 → 7, 10 + 2.5 = 12.5 → 12
        assert_eq!(
            b,
            FaceBox {
                min_x: 7,
                min_y: 7,
                max_x: 12,
                max_y: 12
            }
        );
    }

    #[test]
    fn test_face_box_degenerate() {
        let b = det(10, 10, 0, 0.5).face_box();
        assert_eq!(b.area(), 0);
    }

    #[test]
    fn test_overlap_identical() {
        let a = det(50, 50, 20, 1.0);
        assert!((a.overlap(&a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_overlap_disjoint() {
        let a = det(10, 10, 10, 1.0);
        let b = det(100, 100, 10, 1.0);
        assert!(a.overlap(&b).abs() < 1e-6);
    }

    #[test]
    fn test_overlap_partial() {
        // Windows [0,10)x[0,10) and [5,15)x[0,10): 50 / 150
        let a = det(5, 5, 10, 1.0);
        let b = det(10, 5, 10, 1.0);
        assert!((a.overlap(&b) - 50.0 / 150.0).abs() < 1e-6);
    }

    #[test]
    fn test_uniform_style_applies_to_every_rank() {
        let policy = UniformStyle::default();
        for rank in 0..3 {
            let face = FaceContext {
                rank,
                area: 100,
                confidence: 0.1,
                frame_height: 10,
                frame_width: 10,
            };
            assert_eq!(policy.resolve(&face), Style::Apply(StyleConfig::default()));
        }
    }

    #[test]
    fn test_closure_policy() {
        let policy = |face: &FaceContext| {
            if face.rank < 1 {
                Style::Apply(StyleConfig::default())
            } else {
                Style::Skip
            }
        };
        let first = FaceContext {
            rank: 0,
            area: 1,
            confidence: 0.9,
            frame_height: 1,
            frame_width: 1,
        };
        let second = FaceContext { rank: 1, ..first };
        assert!(matches!(policy.resolve(&first), Style::Apply(_)));
        assert_eq!(policy.resolve(&second), Style::Skip);
    }

    #[test]
    fn test_style_config_fills_missing_fields() {
        let style: StyleConfig = serde_json::from_str(r#"{"blur_radius": 5}"#).unwrap();
        assert_eq!(style.blur_radius, 5);
        assert_eq!(style.max_points, 2500);
        assert_eq!(style.edge_factor, 6);
    }

    #[test]
    fn test_detection_json_shape() {
        let json = serde_json::to_value(det(3, 4, 20, 0.5)).unwrap();
        assert_eq!(json["center_x"], 3);
        assert_eq!(json["scale"], 20);
    }
}
