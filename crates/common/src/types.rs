use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the progressive drawing lessons.
///
/// Lessons are ordered: each one adds a single concept on top of the previous.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum ExampleKind {
    /// Bare triangle, positions generated in the vertex shader.
    #[default]
    Triangle,
    /// Triangle transformed by a rotating camera uniform.
    Camera,
    /// Camera triangle sampling a texture.
    Texture,
    /// Textured triangle fed from a vertex buffer.
    VertexBuffer,
    /// Textured rotating cube with a depth buffer.
    Cube,
}

impl ExampleKind {
    pub const ALL: [ExampleKind; 5] = [
        ExampleKind::Triangle,
        ExampleKind::Camera,
        ExampleKind::Texture,
        ExampleKind::VertexBuffer,
        ExampleKind::Cube,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ExampleKind::Triangle => "triangle",
            ExampleKind::Camera => "camera",
            ExampleKind::Texture => "texture",
            ExampleKind::VertexBuffer => "vertex-buffer",
            ExampleKind::Cube => "cube",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ExampleKind::Triangle => "bare triangle generated in the shader",
            ExampleKind::Camera => "triangle with a rotating camera transform",
            ExampleKind::Texture => "textured triangle",
            ExampleKind::VertexBuffer => "textured triangle driven by a vertex buffer",
            ExampleKind::Cube => "textured rotating cube",
        }
    }
}

impl fmt::Display for ExampleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when a lesson name does not match any [`ExampleKind`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown example {0:?} (expected one of: triangle, camera, texture, vertex-buffer, cube)")]
pub struct UnknownExample(pub String);

impl FromStr for ExampleKind {
    type Err = UnknownExample;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ExampleKind::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| UnknownExample(s.to_string()))
    }
}

/// Drawable size in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width over height. A zero height is treated as one pixel.
    pub fn aspect_ratio(self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }

    /// Same size with both dimensions clamped to at least one pixel.
    pub fn non_zero(self) -> Self {
        Self {
            width: self.width.max(1),
            height: self.height.max(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn example_names_round_trip() {
        for kind in ExampleKind::ALL {
            assert_eq!(kind.name().parse::<ExampleKind>().unwrap(), kind);
        }
    }

    #[test]
    fn unknown_example_is_rejected() {
        let err = "teapot".parse::<ExampleKind>().unwrap_err();
        assert_eq!(err, UnknownExample("teapot".into()));
        assert!(err.to_string().contains("vertex-buffer"));
    }

    #[test]
    fn aspect_ratio_guards_zero_height() {
        assert_eq!(SurfaceSize::new(800, 400).aspect_ratio(), 2.0);
        assert_eq!(SurfaceSize::new(10, 0).aspect_ratio(), 10.0);
        assert_eq!(SurfaceSize::new(0, 0).non_zero(), SurfaceSize::new(1, 1));
    }
}
