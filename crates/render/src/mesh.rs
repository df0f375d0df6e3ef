use crate::layout::{AttributeFormat, VertexAttribute, VertexLayout};
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};

/// Homogeneous position plus texture coordinate. 24 bytes, no padding.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct TexturedVertex {
    pub position: [f32; 4],
    pub uv: [f32; 2],
}

impl TexturedVertex {
    pub const fn new(position: [f32; 4], uv: [f32; 2]) -> Self {
        Self { position, uv }
    }

    /// Location 0: position (`vec4<f32>`), location 1: uv (`vec2<f32>`).
    pub fn layout() -> VertexLayout {
        VertexLayout::new(
            std::mem::size_of::<Self>() as u64,
            [
                VertexAttribute::new(0, 0, AttributeFormat::Float32x4),
                VertexAttribute::new(1, 16, AttributeFormat::Float32x2),
            ],
        )
    }
}

#[rustfmt::skip]
pub const TRIANGLE_VERTICES: [TexturedVertex; 3] = [
    TexturedVertex::new([ 0.0,  0.6, 0.0, 1.0], [0.5, 0.0]),
    TexturedVertex::new([-0.5, -0.6, 0.0, 1.0], [0.0, 1.0]),
    TexturedVertex::new([ 0.5, -0.6, 0.0, 1.0], [1.0, 1.0]),
];

/// Unit cube (half extent 1) as 36 non-indexed vertices, pre-tilted so three
/// faces are visible while the camera spins about Z.
pub fn cube_vertices() -> Vec<TexturedVertex> {
    let tilt = Mat4::from_rotation_x(-0.6) * Mat4::from_rotation_y(0.7);

    // (normal, u axis, v axis) per face; corners are normal ± u ± v.
    let faces = [
        (Vec3::Z, Vec3::X, Vec3::NEG_Y),
        (Vec3::NEG_Z, Vec3::NEG_X, Vec3::NEG_Y),
        (Vec3::X, Vec3::NEG_Z, Vec3::NEG_Y),
        (Vec3::NEG_X, Vec3::Z, Vec3::NEG_Y),
        (Vec3::Y, Vec3::X, Vec3::Z),
        (Vec3::NEG_Y, Vec3::X, Vec3::NEG_Z),
    ];

    let mut verts = Vec::with_capacity(36);
    for (normal, u_axis, v_axis) in faces {
        let corner = |u: f32, v: f32| {
            let p = normal + u_axis * (u * 2.0 - 1.0) + v_axis * (v * 2.0 - 1.0);
            let p = tilt * Vec4::new(p.x, p.y, p.z, 1.0);
            TexturedVertex::new(p.to_array(), [u, v])
        };
        // Two counter-clockwise triangles when viewed from outside.
        verts.extend([
            corner(0.0, 1.0),
            corner(1.0, 1.0),
            corner(1.0, 0.0),
            corner(1.0, 0.0),
            corner(0.0, 0.0),
            corner(0.0, 1.0),
        ]);
    }
    verts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_record_is_six_floats() {
        assert_eq!(std::mem::size_of::<TexturedVertex>(), 24);
        assert_eq!(TexturedVertex::layout().stride, 24);
        assert_eq!(TexturedVertex::layout().validate(), Ok(()));
    }

    #[test]
    fn cube_has_twelve_triangles() {
        let verts = cube_vertices();
        assert_eq!(verts.len(), 36);
        for v in &verts {
            assert_eq!(v.position[3], 1.0);
            assert!(v.uv.iter().all(|c| (0.0..=1.0).contains(c)));
            let p = Vec3::new(v.position[0], v.position[1], v.position[2]);
            // Every corner of a half-extent-1 cube sits at distance sqrt(3).
            assert!((p.length() - 3.0_f32.sqrt()).abs() < 1e-5);
        }
    }

    #[test]
    fn cube_faces_wind_outward() {
        let verts = cube_vertices();
        for tri in verts.chunks_exact(3) {
            let corner = |i: usize| Vec3::from_slice(&tri[i].position[..3]);
            let [a, b, c] = [corner(0), corner(1), corner(2)];
            let normal = (b - a).cross(c - a);
            let center = (a + b + c) / 3.0;
            assert!(normal.dot(center) > 0.0);
        }
    }
}
