use std::path::PathBuf;

use primer_common::{ExampleKind, SurfaceSize};
use primer_render::bindings::BIND_GROUP_INDEX;
use primer_render::{
    BindingKind, CameraTransform, CameraUniform, DrawCommand, DrawPlan, LessonSpec, PassEncoder,
};

use crate::gpu::Gpu;
use crate::pipeline::{DepthTarget, PipelineDesc, PipelineError, build_pipeline};
use crate::resources::{
    BoundResource, LessonTexture, ResourceError, TextureSource, UniformBuffer, VertexBuffer,
    create_bind_group,
};
use crate::shaders::shader_source;

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Resource(#[from] ResourceError),
}

/// How a lesson's resources are created.
#[derive(Debug, Clone)]
pub struct RendererOptions {
    /// Format of the target the pipeline writes to.
    pub color_format: wgpu::TextureFormat,
    /// Target size at start-up. The camera's aspect ratio is taken from it once.
    pub size: SurfaceSize,
    /// Image for textured lessons; a checkerboard when unset.
    pub texture: Option<PathBuf>,
    /// Allow reading the camera uniform back to the CPU.
    pub readback: bool,
}

impl RendererOptions {
    pub fn new(color_format: wgpu::TextureFormat, size: SurfaceSize) -> Self {
        Self {
            color_format,
            size,
            texture: None,
            readback: false,
        }
    }

    pub fn with_texture(mut self, texture: Option<PathBuf>) -> Self {
        self.texture = texture;
        self
    }
}

/// The camera transform paired with the uniform it is written to.
pub struct CameraBinding {
    pub transform: CameraTransform,
    pub uniform: UniformBuffer<CameraUniform>,
}

/// Everything a lesson needs per frame, built once and never mutated.
pub struct FrameResources {
    pub spec: LessonSpec,
    pub pipeline: wgpu::RenderPipeline,
    pub bind_group: Option<wgpu::BindGroup>,
    pub vertex_buffer: Option<VertexBuffer>,
    pub camera: Option<CameraBinding>,
    pub texture: Option<LessonTexture>,
    pub plan: DrawPlan,
}

impl FrameResources {
    pub fn build(
        gpu: &Gpu,
        kind: ExampleKind,
        options: &RendererOptions,
    ) -> Result<Self, BuildError> {
        let spec = LessonSpec::for_example(kind);
        let span = tracing::info_span!("build_lesson", lesson = kind.name());
        let _entered = span.entered();

        let desc = PipelineDesc::for_lesson(&spec, shader_source(kind), options.color_format);
        let pipeline = build_pipeline(&gpu.device, &desc)?;

        let vertex_buffer = match (spec.vertex_input.layout(), spec.vertex_data()) {
            (Some(layout), Some(data)) => Some(VertexBuffer::new(
                &gpu.device,
                kind.name(),
                layout,
                bytemuck::cast_slice(&data),
            )?),
            _ => None,
        };

        let camera = if spec.has_camera() {
            let transform = CameraTransform::new(options.size.aspect_ratio());
            let uniform = UniformBuffer::new(
                &gpu.device,
                "camera_uniform",
                &transform.uniform(0.0),
                options.readback,
            )?;
            Some(CameraBinding { transform, uniform })
        } else {
            None
        };

        let texture = if spec.has_texture() {
            let source = TextureSource::from_path_or_checkerboard(options.texture.as_deref())?;
            Some(LessonTexture::new(&gpu.device, &gpu.queue, &source)?)
        } else {
            None
        };

        let bind_group = if spec.bindings.is_empty() {
            None
        } else {
            let mut bound = Vec::with_capacity(spec.bindings.len());
            for slot in &spec.bindings {
                let resource = match slot.kind {
                    BindingKind::UniformBuffer => camera
                        .as_ref()
                        .map(|c| BoundResource::Uniform(c.uniform.buffer())),
                    BindingKind::Sampler => texture
                        .as_ref()
                        .map(|t| BoundResource::Sampler(&t.sampler)),
                    BindingKind::Texture => texture
                        .as_ref()
                        .map(|t| BoundResource::Texture(&t.view)),
                };
                if let Some(resource) = resource {
                    bound.push((slot.binding, resource));
                }
            }
            let layout = pipeline.get_bind_group_layout(BIND_GROUP_INDEX);
            let group = create_bind_group(&gpu.device, &layout, &spec.bindings, &bound)?;
            Some(group)
        };

        let plan = spec.draw_plan();
        tracing::debug!(
            "lesson {} ready: {} vertices, bind group: {}, vertex buffer: {}",
            kind,
            plan.vertex_count,
            bind_group.is_some(),
            vertex_buffer.is_some()
        );

        Ok(Self {
            spec,
            pipeline,
            bind_group,
            vertex_buffer,
            camera,
            texture,
            plan,
        })
    }
}

/// Replays [`DrawCommand`]s into a wgpu render pass.
struct WgpuPassEncoder<'a, 'pass> {
    pass: &'a mut wgpu::RenderPass<'pass>,
    resources: &'a FrameResources,
}

impl PassEncoder for WgpuPassEncoder<'_, '_> {
    fn encode(&mut self, command: &DrawCommand) {
        match command {
            DrawCommand::SetPipeline => self.pass.set_pipeline(&self.resources.pipeline),
            DrawCommand::SetBindGroup { index } => {
                if let Some(bind_group) = &self.resources.bind_group {
                    self.pass.set_bind_group(*index, bind_group, &[]);
                }
            }
            DrawCommand::SetVertexBuffer { slot } => {
                if let Some(vb) = &self.resources.vertex_buffer {
                    self.pass.set_vertex_buffer(*slot, vb.buffer.slice(..));
                }
            }
            DrawCommand::Draw {
                vertices,
                instances,
            } => self.pass.draw(vertices.clone(), instances.clone()),
        }
    }
}

/// Draws one lesson into any color view of the configured format.
pub struct LessonRenderer {
    resources: FrameResources,
    depth: Option<DepthTarget>,
}

impl LessonRenderer {
    pub fn new(
        gpu: &Gpu,
        kind: ExampleKind,
        options: &RendererOptions,
    ) -> Result<Self, BuildError> {
        let resources = FrameResources::build(gpu, kind, options)?;
        let size = options.size.non_zero();
        let depth = if resources.spec.depth {
            Some(DepthTarget::new(&gpu.device, size.width, size.height)?)
        } else {
            None
        };
        tracing::info!("lesson {kind}: {}", kind.description());
        Ok(Self { resources, depth })
    }

    pub fn resources(&self) -> &FrameResources {
        &self.resources
    }

    /// Recreate the depth attachment to match a new target size. The old
    /// attachment is kept when the new one cannot be created.
    pub fn resize(
        &mut self,
        device: &wgpu::Device,
        size: SurfaceSize,
    ) -> Result<(), PipelineError> {
        if size.width == 0 || size.height == 0 {
            return Ok(());
        }
        if self.depth.is_some() {
            self.depth = Some(DepthTarget::new(device, size.width, size.height)?);
        }
        Ok(())
    }

    /// Update the camera for `elapsed` seconds, record the lesson's draw and submit.
    pub fn render(
        &self,
        gpu: &Gpu,
        view: &wgpu::TextureView,
        elapsed: f32,
    ) -> wgpu::SubmissionIndex {
        if let Some(camera) = &self.resources.camera {
            camera
                .uniform
                .write(&gpu.queue, &camera.transform.uniform(elapsed));
        }

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("lesson_encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("lesson_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: self.depth.as_ref().map(|depth| {
                    wgpu::RenderPassDepthStencilAttachment {
                        view: &depth.view,
                        depth_ops: Some(wgpu::Operations {
                            load: wgpu::LoadOp::Clear(1.0),
                            store: wgpu::StoreOp::Store,
                        }),
                        stencil_ops: None,
                    }
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            let mut replay = WgpuPassEncoder {
                pass: &mut pass,
                resources: &self.resources,
            };
            self.resources.plan.encode(&mut replay);
        }

        gpu.queue.submit(std::iter::once(encoder.finish()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offscreen::OffscreenTarget;
    use crate::test_support;

    fn options() -> RendererOptions {
        let size = SurfaceSize::new(64, 64);
        RendererOptions {
            readback: true,
            ..RendererOptions::new(wgpu::TextureFormat::Rgba8UnormSrgb, size)
        }
    }

    #[test]
    fn options_default_to_checkerboard() {
        let size = SurfaceSize::new(8, 4);
        let opts = RendererOptions::new(wgpu::TextureFormat::Bgra8UnormSrgb, size);
        assert!(opts.texture.is_none());
        assert!(!opts.readback);
        let opts = opts.with_texture(Some(PathBuf::from("a.png")));
        assert_eq!(opts.texture.as_deref(), Some(std::path::Path::new("a.png")));
    }

    #[test]
    fn resources_follow_the_lesson_table() {
        let Some(gpu) = test_support::gpu() else {
            return;
        };
        for kind in ExampleKind::ALL {
            let res = FrameResources::build(&gpu, kind, &options()).unwrap();
            let bound = !res.spec.bindings.is_empty();
            assert_eq!(res.bind_group.is_some(), bound, "{kind}");
            assert_eq!(res.camera.is_some(), res.spec.has_camera(), "{kind}");
            assert_eq!(res.texture.is_some(), res.spec.has_texture(), "{kind}");
            let buffered = res.spec.vertex_input.layout().is_some();
            let expected = buffered.then_some(res.spec.vertex_count);
            assert_eq!(
                res.vertex_buffer.as_ref().map(|vb| vb.vertex_count),
                expected,
                "{kind}"
            );
        }
    }

    #[test]
    fn render_writes_the_camera_for_the_given_time() {
        let Some(gpu) = test_support::gpu() else {
            return;
        };
        let renderer = LessonRenderer::new(&gpu, ExampleKind::Camera, &options()).unwrap();
        let size = SurfaceSize::new(64, 64);
        let target = OffscreenTarget::new(&gpu.device, size).unwrap();
        renderer.render(&gpu, target.view(), 1.25);

        let camera = renderer.resources().camera.as_ref().unwrap();
        let read = camera.uniform.read_back(&gpu.device, &gpu.queue).unwrap();
        let expected = CameraTransform::new(1.0).uniform(1.25);
        let pairs = read.view_proj.iter().zip(expected.view_proj.iter());
        for (a, b) in pairs.flat_map(|(a, b)| a.iter().zip(b)) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn resize_rebuilds_depth_or_keeps_the_old_one() {
        let Some(gpu) = test_support::gpu() else {
            return;
        };
        let mut cube = LessonRenderer::new(&gpu, ExampleKind::Cube, &options()).unwrap();
        cube.resize(&gpu.device, SurfaceSize::new(32, 16)).unwrap();
        assert!(cube.depth.is_some());

        let max = gpu.device.limits().max_texture_dimension_2d;
        let err = cube.resize(&gpu.device, SurfaceSize::new(max + 1, 4));
        assert!(matches!(err, Err(PipelineError::Validation(_))));
        assert!(cube.depth.is_some());

        let mut triangle = LessonRenderer::new(&gpu, ExampleKind::Triangle, &options()).unwrap();
        let huge = SurfaceSize::new(max + 1, 4);
        triangle.resize(&gpu.device, huge).unwrap();
        assert!(triangle.depth.is_none());
    }

    #[test]
    fn missing_texture_file_fails_the_build() {
        let Some(gpu) = test_support::gpu() else {
            return;
        };
        let dir = tempfile::tempdir().unwrap();
        let opts = options().with_texture(Some(dir.path().join("nope.png")));
        let result = FrameResources::build(&gpu, ExampleKind::Texture, &opts);
        assert!(matches!(
            result,
            Err(BuildError::Resource(ResourceError::Image(_)))
        ));
        // Lessons without a texture never touch the path.
        let untextured = FrameResources::build(&gpu, ExampleKind::Camera, &opts);
        assert!(untextured.is_ok());
    }
}
