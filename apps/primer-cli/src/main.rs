use anyhow::Context;
use clap::{Parser, Subcommand};
use primer_common::{ExampleKind, SurfaceSize};
use primer_render::{CameraTransform, DebugPassEncoder, LessonSpec, VertexInput};
use primer_render_wgpu::Gpu;
use std::fmt::Write as _;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "primer-cli", about = "Inspect and render the primer lessons")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and the available lessons
    Info,
    /// Print the camera's view-projection matrix
    Camera {
        /// Elapsed time in seconds
        #[arg(short, long, default_value = "0")]
        time: f32,
        /// Viewport width over height
        #[arg(short, long, default_value = "1")]
        aspect: f32,
    },
    /// Print a lesson's vertex layout, bindings and recorded pass commands
    Plan {
        #[arg(short, long, default_value = "triangle")]
        example: ExampleKind,
    },
    /// Render one frame of a lesson offscreen and write it as PNG
    Render {
        #[arg(short, long, default_value = "triangle")]
        example: ExampleKind,
        /// Elapsed time in seconds
        #[arg(short, long, default_value = "0")]
        time: f32,
        #[arg(long, default_value = "512")]
        width: u32,
        #[arg(long, default_value = "512")]
        height: u32,
        /// Image for the textured lessons
        #[arg(long)]
        texture: Option<PathBuf>,
        /// Output file
        #[arg(short, long, default_value = "frame.png")]
        out: PathBuf,
    },
}

fn describe_plan(kind: ExampleKind) -> String {
    let spec = LessonSpec::for_example(kind);
    let mut out = String::new();
    let _ = writeln!(out, "lesson: {kind} ({})", kind.description());

    match &spec.vertex_input {
        VertexInput::Generated => {
            let _ = writeln!(out, "vertices: generated in shader ({})", spec.vertex_count);
        }
        VertexInput::Buffered(layout) => {
            let _ = writeln!(out, "vertices: buffer, stride {}", layout.stride);
            for a in &layout.attributes {
                let _ = writeln!(
                    out,
                    "  @location({}) offset {} {:?}",
                    a.location, a.offset, a.format
                );
            }
        }
    }

    if spec.bindings.is_empty() {
        let _ = writeln!(out, "bindings: none");
    } else {
        let _ = writeln!(out, "bindings:");
        for slot in &spec.bindings {
            let _ = writeln!(out, "  @binding({}) {}", slot.binding, slot.kind);
        }
    }
    let _ = writeln!(out, "depth: {}", spec.depth);

    let plan = spec.draw_plan();
    let mut encoder = DebugPassEncoder::new();
    plan.encode(&mut encoder);
    let _ = writeln!(out, "pass ({} triangles):", plan.triangle_count());
    out.push_str(&encoder.finish());
    out
}

fn format_matrix(m: glam::Mat4) -> String {
    let mut out = String::new();
    // Row-major for reading; the uniform itself is column-major.
    for row in 0..4 {
        let r = m.row(row);
        let _ = writeln!(
            out,
            "[{:>10.5} {:>10.5} {:>10.5} {:>10.5}]",
            r.x, r.y, r.z, r.w
        );
    }
    out
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            println!("primer-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("render: {}", primer_render::crate_info());
            println!("lessons:");
            for kind in ExampleKind::ALL {
                println!("  {:<14} {}", kind.name(), kind.description());
            }
        }
        Commands::Camera { time, aspect } => {
            anyhow::ensure!(aspect > 0.0, "aspect must be positive, got {aspect}");
            let camera = CameraTransform::new(aspect);
            println!("view_proj at t={time}s, aspect={aspect}:");
            print!("{}", format_matrix(camera.view_projection(time)));
        }
        Commands::Plan { example } => {
            print!("{}", describe_plan(example));
        }
        Commands::Render {
            example,
            time,
            width,
            height,
            texture,
            out,
        } => {
            let gpu = pollster::block_on(Gpu::headless(wgpu::PowerPreference::default()))?;
            let image = primer_render_wgpu::render_to_image(
                &gpu,
                example,
                time,
                SurfaceSize::new(width, height),
                texture,
            )
            .with_context(|| format!("failed to render {example}"))?;
            primer_render_wgpu::save_png(&image, &out)?;
            println!("{example} at t={time}s -> {}", out.display());
        }
    }

    Ok(())
}
