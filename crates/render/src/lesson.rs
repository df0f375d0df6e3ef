use crate::bindings::{
    BIND_GROUP_INDEX, BindingKind, BindingSlot, CAMERA_BINDING, SAMPLER_BINDING, TEXTURE_BINDING,
};
use crate::layout::VertexInput;
use crate::mesh::{TRIANGLE_VERTICES, TexturedVertex, cube_vertices};
use crate::plan::DrawPlan;
use primer_common::ExampleKind;

/// Vertex buffer slot used by the buffer-fed lessons.
pub const VERTEX_BUFFER_SLOT: u32 = 0;

const CAMERA_ONLY: [BindingSlot; 1] =
    [BindingSlot::new(CAMERA_BINDING, BindingKind::UniformBuffer)];
const TEXTURED: [BindingSlot; 3] = [
    BindingSlot::new(CAMERA_BINDING, BindingKind::UniformBuffer),
    BindingSlot::new(SAMPLER_BINDING, BindingKind::Sampler),
    BindingSlot::new(TEXTURE_BINDING, BindingKind::Texture),
];

/// Everything about a lesson that does not need a GPU: how vertices arrive,
/// which bindings its shader declares, and what it draws.
#[derive(Debug, Clone, PartialEq)]
pub struct LessonSpec {
    pub kind: ExampleKind,
    pub vertex_input: VertexInput,
    /// Bindings of group 0, as declared by the lesson's shader.
    pub bindings: Vec<BindingSlot>,
    pub vertex_count: u32,
    /// Attach a depth buffer and cull back faces.
    pub depth: bool,
}

impl LessonSpec {
    pub fn for_example(kind: ExampleKind) -> Self {
        match kind {
            ExampleKind::Triangle => Self {
                kind,
                vertex_input: VertexInput::Generated,
                bindings: Vec::new(),
                vertex_count: 3,
                depth: false,
            },
            ExampleKind::Camera => Self {
                kind,
                vertex_input: VertexInput::Generated,
                bindings: CAMERA_ONLY.to_vec(),
                vertex_count: 3,
                depth: false,
            },
            ExampleKind::Texture => Self {
                kind,
                vertex_input: VertexInput::Generated,
                bindings: TEXTURED.to_vec(),
                vertex_count: 3,
                depth: false,
            },
            ExampleKind::VertexBuffer => Self {
                kind,
                vertex_input: VertexInput::Buffered(TexturedVertex::layout()),
                bindings: TEXTURED.to_vec(),
                vertex_count: TRIANGLE_VERTICES.len() as u32,
                depth: false,
            },
            ExampleKind::Cube => Self {
                kind,
                vertex_input: VertexInput::Buffered(TexturedVertex::layout()),
                bindings: TEXTURED.to_vec(),
                vertex_count: 36,
                depth: true,
            },
        }
    }

    pub fn has_camera(&self) -> bool {
        self.binding(CAMERA_BINDING) == Some(BindingKind::UniformBuffer)
    }

    pub fn has_texture(&self) -> bool {
        self.binding(TEXTURE_BINDING) == Some(BindingKind::Texture)
    }

    fn binding(&self, index: u32) -> Option<BindingKind> {
        self.bindings
            .iter()
            .find(|s| s.binding == index)
            .map(|s| s.kind)
    }

    /// Vertex records uploaded once at start-up, for buffer-fed lessons.
    pub fn vertex_data(&self) -> Option<Vec<TexturedVertex>> {
        match (&self.vertex_input, self.kind) {
            (VertexInput::Generated, _) => None,
            (VertexInput::Buffered(_), ExampleKind::Cube) => Some(cube_vertices()),
            (VertexInput::Buffered(_), _) => Some(TRIANGLE_VERTICES.to_vec()),
        }
    }

    pub fn draw_plan(&self) -> DrawPlan {
        let mut plan = DrawPlan::new(self.vertex_count);
        if !self.bindings.is_empty() {
            plan = plan.with_bind_group(BIND_GROUP_INDEX);
        }
        if self.vertex_input.layout().is_some() {
            plan = plan.with_vertex_buffer(VERTEX_BUFFER_SLOT);
        }
        plan
    }
}
