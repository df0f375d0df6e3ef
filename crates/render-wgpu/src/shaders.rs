use primer_common::ExampleKind;

/// Bare triangle: positions come from the vertex index.
pub const TRIANGLE_SHADER: &str = r#"
@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> @builtin(position) vec4<f32> {
    var positions = array<vec2<f32>, 3>(
        vec2<f32>(0.0, 0.5),
        vec2<f32>(-0.5, -0.5),
        vec2<f32>(0.5, -0.5),
    );
    return vec4<f32>(positions[index], 0.0, 1.0);
}

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(1.0, 0.4, 0.1, 1.0);
}
"#;

/// Generated triangle transformed by the camera uniform.
pub const CAMERA_SHADER: &str = r#"
struct Camera {
    view_proj: mat4x4<f32>,
};

@group(0) @binding(0)
var<uniform> camera: Camera;

@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> @builtin(position) vec4<f32> {
    var positions = array<vec2<f32>, 3>(
        vec2<f32>(0.0, 0.5),
        vec2<f32>(-0.5, -0.5),
        vec2<f32>(0.5, -0.5),
    );
    return camera.view_proj * vec4<f32>(positions[index], 0.0, 1.0);
}

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(0.2, 0.7, 1.0, 1.0);
}
"#;

/// Generated triangle with per-vertex texture coordinates.
pub const TEXTURE_SHADER: &str = r#"
struct Camera {
    view_proj: mat4x4<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@group(0) @binding(0)
var<uniform> camera: Camera;
@group(0) @binding(1)
var tex_sampler: sampler;
@group(0) @binding(2)
var tex: texture_2d<f32>;

@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> VertexOutput {
    var positions = array<vec2<f32>, 3>(
        vec2<f32>(0.0, 0.5),
        vec2<f32>(-0.5, -0.5),
        vec2<f32>(0.5, -0.5),
    );
    var uvs = array<vec2<f32>, 3>(
        vec2<f32>(0.5, 0.0),
        vec2<f32>(0.0, 1.0),
        vec2<f32>(1.0, 1.0),
    );

    var out: VertexOutput;
    out.clip_position = camera.view_proj * vec4<f32>(positions[index], 0.0, 1.0);
    out.uv = uvs[index];
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return textureSample(tex, tex_sampler, in.uv);
}
"#;

/// Textured geometry read from a vertex buffer (position at 0, uv at 1).
pub const VERTEX_BUFFER_SHADER: &str = r#"
struct Camera {
    view_proj: mat4x4<f32>,
};

struct VertexInput {
    @location(0) position: vec4<f32>,
    @location(1) uv: vec2<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@group(0) @binding(0)
var<uniform> camera: Camera;
@group(0) @binding(1)
var tex_sampler: sampler;
@group(0) @binding(2)
var tex: texture_2d<f32>;

@vertex
fn vs_main(vertex: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = camera.view_proj * vertex.position;
    out.uv = vertex.uv;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return textureSample(tex, tex_sampler, in.uv);
}
"#;

pub const VERTEX_ENTRY: &str = "vs_main";
pub const FRAGMENT_ENTRY: &str = "fs_main";

/// WGSL source for a lesson. The cube reuses the vertex-buffer shader.
pub fn shader_source(kind: ExampleKind) -> &'static str {
    match kind {
        ExampleKind::Triangle => TRIANGLE_SHADER,
        ExampleKind::Camera => CAMERA_SHADER,
        ExampleKind::Texture => TEXTURE_SHADER,
        ExampleKind::VertexBuffer | ExampleKind::Cube => VERTEX_BUFFER_SHADER,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use primer_render::LessonSpec;

    #[test]
    fn every_shader_has_both_entry_points() {
        for kind in ExampleKind::ALL {
            let src = shader_source(kind);
            assert!(src.contains(&format!("fn {VERTEX_ENTRY}(")), "{kind}");
            assert!(src.contains(&format!("fn {FRAGMENT_ENTRY}(")), "{kind}");
        }
    }

    #[test]
    fn declared_bindings_match_lesson_tables() {
        for kind in ExampleKind::ALL {
            let src = shader_source(kind);
            let spec = LessonSpec::for_example(kind);
            let declared = src.matches("@binding(").count();
            assert_eq!(declared, spec.bindings.len(), "{kind}");
            for slot in &spec.bindings {
                let attr = format!("@binding({})", slot.binding);
                assert!(src.contains(&attr), "{kind}");
            }
        }
    }

    #[test]
    fn buffer_fed_shaders_read_locations() {
        let src = VERTEX_BUFFER_SHADER;
        assert!(src.contains("@location(0) position: vec4<f32>"));
        assert!(src.contains("@location(1) uv: vec2<f32>"));
        assert!(!TRIANGLE_SHADER.contains("@location(0) position"));
    }
}
