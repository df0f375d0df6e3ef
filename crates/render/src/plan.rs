use std::fmt::Write as _;
use std::ops::Range;

/// One command recorded into the render pass.
///
/// Resources are referred to by slot; the encoder that replays the commands
/// owns the actual pipeline, bind group and buffers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawCommand {
    SetPipeline,
    SetBindGroup { index: u32 },
    SetVertexBuffer { slot: u32 },
    Draw {
        vertices: Range<u32>,
        instances: Range<u32>,
    },
}

/// Sink for [`DrawCommand`]s. The wgpu backend replays them into a render
/// pass; [`DebugPassEncoder`] renders them as text.
pub trait PassEncoder {
    fn encode(&mut self, command: &DrawCommand);
}

/// What a lesson draws each frame: a single non-indexed draw call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawPlan {
    pub bind_group: Option<u32>,
    pub vertex_buffer: Option<u32>,
    pub vertex_count: u32,
    pub instance_count: u32,
    pub first_vertex: u32,
    pub first_instance: u32,
}

impl DrawPlan {
    /// One instance, zero base offsets, nothing bound.
    pub fn new(vertex_count: u32) -> Self {
        Self {
            bind_group: None,
            vertex_buffer: None,
            vertex_count,
            instance_count: 1,
            first_vertex: 0,
            first_instance: 0,
        }
    }

    pub fn with_bind_group(mut self, index: u32) -> Self {
        self.bind_group = Some(index);
        self
    }

    pub fn with_vertex_buffer(mut self, slot: u32) -> Self {
        self.vertex_buffer = Some(slot);
        self
    }

    /// Pipeline, then bind group, then vertex buffer, then the draw.
    pub fn commands(&self) -> Vec<DrawCommand> {
        let mut out = vec![DrawCommand::SetPipeline];
        if let Some(index) = self.bind_group {
            out.push(DrawCommand::SetBindGroup { index });
        }
        if let Some(slot) = self.vertex_buffer {
            out.push(DrawCommand::SetVertexBuffer { slot });
        }
        out.push(DrawCommand::Draw {
            vertices: self.first_vertex..self.first_vertex + self.vertex_count,
            instances: self.first_instance..self.first_instance + self.instance_count,
        });
        out
    }

    pub fn encode(&self, encoder: &mut impl PassEncoder) {
        for command in self.commands() {
            encoder.encode(&command);
        }
    }

    /// Triangles produced under a triangle-list topology.
    pub fn triangle_count(&self) -> u32 {
        (self.vertex_count / 3) * self.instance_count
    }
}

/// Text encoder for logs and the CLI.
#[derive(Debug, Default)]
pub struct DebugPassEncoder {
    out: String,
}

impl DebugPassEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finish(self) -> String {
        self.out
    }
}

impl PassEncoder for DebugPassEncoder {
    fn encode(&mut self, command: &DrawCommand) {
        let _ = match command {
            DrawCommand::SetPipeline => writeln!(self.out, "set_pipeline"),
            DrawCommand::SetBindGroup { index } => writeln!(self.out, "set_bind_group({index})"),
            DrawCommand::SetVertexBuffer { slot } => {
                writeln!(self.out, "set_vertex_buffer({slot})")
            }
            DrawCommand::Draw {
                vertices,
                instances,
            } => writeln!(self.out, "draw({vertices:?}, {instances:?})"),
        };
    }
}

/// Collects commands as-is, for tests and inspection.
impl PassEncoder for Vec<DrawCommand> {
    fn encode(&mut self, command: &DrawCommand) {
        self.push(command.clone());
    }
}
