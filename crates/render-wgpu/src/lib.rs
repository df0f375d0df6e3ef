//! wgpu backend for the primer lessons.
//!
//! Turns a [`primer_render::LessonSpec`] into GPU objects and draws it: device
//! and surface setup, pipeline creation with validated vertex layouts, buffers
//! and textures behind a checked bind group, and per-frame submission.
//!
//! # Invariants
//! - Lesson resources are created once and never mutated; only the camera
//!   uniform is rewritten each frame.
//! - Mapped-at-creation buffers are unmapped before the GPU can see them.
//! - Device validation failures during set-up come back as errors, not panics.

mod gpu;
mod offscreen;
mod pipeline;
mod renderer;
mod resources;
mod shaders;

pub use gpu::{
    ContextError, Gpu, InitializationError, SurfaceContext, SurfaceFrame, SurfaceSettings,
    choose_alpha_mode, create_instance, initialize, power_preference,
};
pub use offscreen::{OffscreenTarget, padded_bytes_per_row, render_to_image, save_png};
pub use pipeline::{
    DEPTH_FORMAT, DepthTarget, PipelineDesc, PipelineError, build_pipeline, vertex_format,
};
pub use renderer::{BuildError, CameraBinding, FrameResources, LessonRenderer, RendererOptions};
pub use resources::{
    BoundResource, LessonTexture, MappedBuffer, ResourceError, TextureSource, UniformBuffer,
    VertexBuffer, create_bind_group, read_buffer,
};
pub use shaders::{FRAGMENT_ENTRY, VERTEX_ENTRY, shader_source};

#[cfg(test)]
pub(crate) mod test_support {
    use crate::Gpu;

    /// A headless device, or `None` (with a note on stderr) on machines without an adapter.
    pub fn gpu() -> Option<Gpu> {
        match pollster::block_on(Gpu::headless(wgpu::PowerPreference::LowPower)) {
            Ok(gpu) => Some(gpu),
            Err(e) => {
                eprintln!("skipping GPU test: {e}");
                None
            }
        }
    }
}
