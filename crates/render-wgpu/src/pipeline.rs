use crate::gpu::with_validation;
use crate::shaders::{FRAGMENT_ENTRY, VERTEX_ENTRY};
use primer_render::{AttributeFormat, LayoutError, LessonSpec, VertexInput, VertexLayout};

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24Plus;

/// Errors from building a render pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("invalid vertex layout: {0}")]
    Layout(#[from] LayoutError),
    #[error("pipeline validation failed: {0}")]
    Validation(String),
}

pub fn vertex_format(format: AttributeFormat) -> wgpu::VertexFormat {
    match format {
        AttributeFormat::Float32 => wgpu::VertexFormat::Float32,
        AttributeFormat::Float32x2 => wgpu::VertexFormat::Float32x2,
        AttributeFormat::Float32x3 => wgpu::VertexFormat::Float32x3,
        AttributeFormat::Float32x4 => wgpu::VertexFormat::Float32x4,
    }
}

/// wgpu attributes for a layout that has already been validated.
fn wgpu_attributes(layout: &VertexLayout) -> Vec<wgpu::VertexAttribute> {
    layout
        .attributes
        .iter()
        .map(|a| wgpu::VertexAttribute {
            format: vertex_format(a.format),
            offset: a.offset,
            shader_location: a.location,
        })
        .collect()
}

/// Everything the builder needs besides the device.
#[derive(Debug, Clone, Copy)]
pub struct PipelineDesc<'a> {
    pub label: &'a str,
    pub shader_source: &'a str,
    pub vertex_input: &'a VertexInput,
    pub color_format: wgpu::TextureFormat,
    /// Depth test against [`DEPTH_FORMAT`] with back-face culling.
    pub depth: bool,
}

impl<'a> PipelineDesc<'a> {
    pub fn for_lesson(
        spec: &'a LessonSpec,
        shader_source: &'a str,
        color_format: wgpu::TextureFormat,
    ) -> Self {
        Self {
            label: spec.kind.name(),
            shader_source,
            vertex_input: &spec.vertex_input,
            color_format,
            depth: spec.depth,
        }
    }
}

/// Compile the shader and build the pipeline with an automatically derived
/// bind group layout.
///
/// The vertex layout is validated first; an attribute overflowing the stride
/// fails here without touching the device.
pub fn build_pipeline(
    device: &wgpu::Device,
    desc: &PipelineDesc<'_>,
) -> Result<wgpu::RenderPipeline, PipelineError> {
    desc.vertex_input.validate()?;

    let layout = desc.vertex_input.layout();
    let attributes = layout.map(wgpu_attributes);
    let buffers = match (layout, &attributes) {
        (Some(layout), Some(attributes)) => vec![wgpu::VertexBufferLayout {
            array_stride: layout.stride,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes,
        }],
        _ => Vec::new(),
    };

    let pipeline = with_validation(device, || {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(desc.label),
            source: wgpu::ShaderSource::Wgsl(desc.shader_source.into()),
        });

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(desc.label),
            layout: None,
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some(VERTEX_ENTRY),
                compilation_options: Default::default(),
                buffers: &buffers,
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some(FRAGMENT_ENTRY),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: desc.color_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: desc.depth.then_some(wgpu::Face::Back),
                ..Default::default()
            },
            depth_stencil: desc.depth.then(|| wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: Default::default(),
                bias: Default::default(),
            }),
            multisample: Default::default(),
            multiview: None,
            cache: None,
        })
    })
    .map_err(PipelineError::Validation)?;

    tracing::debug!(
        "built pipeline {} ({} vertex buffers)",
        desc.label,
        buffers.len()
    );
    Ok(pipeline)
}

/// Depth attachment sized to the render target.
pub struct DepthTarget {
    pub view: wgpu::TextureView,
}

impl DepthTarget {
    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> Result<Self, PipelineError> {
        let texture = with_validation(device, || {
            device.create_texture(&wgpu::TextureDescriptor {
                label: Some("depth_texture"),
                size: wgpu::Extent3d {
                    width: width.max(1),
                    height: height.max(1),
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: DEPTH_FORMAT,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            })
        })
        .map_err(PipelineError::Validation)?;
        Ok(Self {
            view: texture.create_view(&Default::default()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shaders::{TRIANGLE_SHADER, VERTEX_BUFFER_SHADER, shader_source};
    use crate::test_support;
    use primer_common::ExampleKind;
    use primer_render::VertexAttribute;

    const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

    #[test]
    fn attributes_convert_in_order() {
        let layout = primer_render::TexturedVertex::layout();
        let attrs = wgpu_attributes(&layout);
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs[0].format, wgpu::VertexFormat::Float32x4);
        assert_eq!(attrs[0].offset, 0);
        assert_eq!(attrs[1].format, wgpu::VertexFormat::Float32x2);
        assert_eq!(attrs[1].offset, 16);
        assert_eq!(attrs[1].shader_location, 1);
        for a in &attrs {
            let ours = layout.attribute(a.shader_location).unwrap();
            assert_eq!(a.format.size(), ours.format.size());
        }
    }

    #[test]
    fn overflowing_attribute_fails_before_the_device() {
        // Invalid layouts are rejected without a GPU, so this runs everywhere.
        let input = VertexInput::Buffered(VertexLayout::new(
            16,
            [
                VertexAttribute::new(0, 0, AttributeFormat::Float32x4),
                VertexAttribute::new(1, 16, AttributeFormat::Float32x2),
            ],
        ));
        let desc = PipelineDesc {
            label: "overflow",
            shader_source: VERTEX_BUFFER_SHADER,
            vertex_input: &input,
            color_format: FORMAT,
            depth: false,
        };
        let Some(gpu) = test_support::gpu() else {
            assert!(matches!(
                desc.vertex_input.validate(),
                Err(LayoutError::AttributeOutOfBounds { .. })
            ));
            return;
        };
        let err = build_pipeline(&gpu.device, &desc).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Layout(LayoutError::AttributeOutOfBounds { location: 1, .. })
        ));
    }

    #[test]
    fn every_lesson_pipeline_builds() {
        let Some(gpu) = test_support::gpu() else {
            return;
        };
        for kind in ExampleKind::ALL {
            let spec = LessonSpec::for_example(kind);
            let desc = PipelineDesc::for_lesson(&spec, shader_source(kind), FORMAT);
            if let Err(e) = build_pipeline(&gpu.device, &desc) {
                panic!("{kind}: {e}");
            }
        }
    }

    #[test]
    fn bad_shader_is_a_validation_error() {
        let Some(gpu) = test_support::gpu() else {
            return;
        };
        let desc = PipelineDesc {
            label: "broken",
            shader_source: "@vertex fn vs_main() -> @builtin(position) vec4<f32> { return 1; }",
            vertex_input: &VertexInput::Generated,
            color_format: FORMAT,
            depth: false,
        };
        assert!(matches!(
            build_pipeline(&gpu.device, &desc),
            Err(PipelineError::Validation(_))
        ));
    }

    #[test]
    fn buffer_layout_must_match_shader_inputs() {
        let Some(gpu) = test_support::gpu() else {
            return;
        };
        // The buffer-fed shader reads locations 0 and 1; a generated layout provides neither.
        let desc = PipelineDesc {
            label: "missing_inputs",
            shader_source: VERTEX_BUFFER_SHADER,
            vertex_input: &VertexInput::Generated,
            color_format: FORMAT,
            depth: false,
        };
        assert!(matches!(
            build_pipeline(&gpu.device, &desc),
            Err(PipelineError::Validation(_))
        ));
        let ok = PipelineDesc {
            shader_source: TRIANGLE_SHADER,
            ..desc
        };
        assert!(build_pipeline(&gpu.device, &ok).is_ok());
    }

    #[test]
    fn oversized_depth_target_is_a_validation_error() {
        let Some(gpu) = test_support::gpu() else {
            return;
        };
        let max = gpu.device.limits().max_texture_dimension_2d;
        assert!(DepthTarget::new(&gpu.device, max, 4).is_ok());
        assert!(matches!(
            DepthTarget::new(&gpu.device, max + 1, 4),
            Err(PipelineError::Validation(_))
        ));
    }
}
