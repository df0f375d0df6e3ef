use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use std::f32::consts::PI;

/// Vertical field of view in radians.
pub const FOV_Y: f32 = 2.0 * PI / 5.0;
pub const Z_NEAR: f32 = 1.0;
pub const Z_FAR: f32 = 100.0;
/// Translation applied to the view before the time-driven rotation.
pub const VIEW_OFFSET: Vec3 = Vec3::new(0.0, 0.0, -4.0);

/// Time-driven camera: a fixed perspective projection times a view that spins
/// about the Z axis by `t` radians.
///
/// The projection is computed once from the aspect ratio; nothing else is kept
/// between calls, so the same `t` always yields the same matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraTransform {
    aspect: f32,
    projection: Mat4,
}

impl CameraTransform {
    pub fn new(aspect: f32) -> Self {
        Self {
            aspect,
            projection: Mat4::perspective_rh(FOV_Y, aspect, Z_NEAR, Z_FAR),
        }
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    /// Identity, translated by [`VIEW_OFFSET`], then rotated about Z by `t`.
    pub fn view(t: f32) -> Mat4 {
        Mat4::IDENTITY * Mat4::from_translation(VIEW_OFFSET) * Mat4::from_rotation_z(t)
    }

    pub fn view_projection(&self, t: f32) -> Mat4 {
        self.projection * Self::view(t)
    }

    pub fn uniform(&self, t: f32) -> CameraUniform {
        CameraUniform::from_matrix(self.view_projection(t))
    }
}

/// GPU layout of the camera uniform: one column-major `mat4x4<f32>`, 64 bytes.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn from_matrix(m: Mat4) -> Self {
        Self {
            view_proj: m.to_cols_array_2d(),
        }
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.view_proj)
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::from_matrix(Mat4::IDENTITY)
    }
}
