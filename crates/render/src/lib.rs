//! GPU-free lesson logic.
//!
//! Everything here can be exercised without an adapter: the camera transform,
//! vertex layout validation and decoding, binding tables, the per-frame draw
//! plan and the frame loop state machine. The wgpu backend consumes these types.
//!
//! # Invariants
//! - Camera output depends only on elapsed time and the aspect ratio fixed at start-up.
//! - A vertex layout whose attributes overflow the stride is rejected, never clamped.
//! - A lesson records exactly one non-indexed draw per frame.

pub mod bindings;
pub mod camera;
pub mod frame_loop;
pub mod layout;
pub mod lesson;
pub mod mesh;
pub mod plan;

pub use bindings::{BindingError, BindingKind, BindingSlot, check_bindings};
pub use camera::{CameraTransform, CameraUniform};
pub use frame_loop::{FrameLoop, FrameOutcome, FrameScheduler, FrameTick, LoopState, StopSignal};
pub use layout::{AttributeFormat, LayoutError, VertexAttribute, VertexInput, VertexLayout};
pub use lesson::LessonSpec;
pub use mesh::{TRIANGLE_VERTICES, TexturedVertex, cube_vertices};
pub use plan::{DebugPassEncoder, DrawCommand, DrawPlan, PassEncoder};

pub fn crate_info() -> &'static str {
    concat!("primer-render v", env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("render"));
    }
}
