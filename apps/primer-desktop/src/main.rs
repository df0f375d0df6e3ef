use anyhow::{Context, Result};
use clap::Parser;
use primer_common::{AppConfig, ConfigOverrides, ExampleKind, SurfaceSize};
use primer_render::{FrameLoop, FrameOutcome, FrameScheduler};
use primer_render_wgpu::{Gpu, LessonRenderer, RendererOptions, SurfaceContext, SurfaceSettings};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

#[derive(Parser)]
#[command(name = "primer-desktop", about = "Run a primer drawing lesson in a window")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Lesson to run: triangle, camera, texture, vertex-buffer or cube
    #[arg(short, long)]
    example: Option<ExampleKind>,

    /// Image for the textured lessons
    #[arg(short, long)]
    texture: Option<PathBuf>,

    /// Exit after this many frames
    #[arg(long)]
    frames: Option<u64>,

    /// Window width in pixels
    #[arg(long)]
    width: Option<u32>,

    /// Window height in pixels
    #[arg(long)]
    height: Option<u32>,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            example: self.example,
            texture: self.texture.clone(),
            frame_limit: self.frames,
            width: self.width,
            height: self.height,
        }
    }
}

/// Schedules the next frame by asking the window for a redraw.
struct RedrawScheduler(Arc<Window>);

impl FrameScheduler for RedrawScheduler {
    fn schedule(&mut self) {
        self.0.request_redraw();
    }
}

/// Everything that exists once the window and device are up.
struct Lesson {
    window: Arc<Window>,
    gpu: Gpu,
    surface: SurfaceContext,
    renderer: LessonRenderer,
    scheduler: RedrawScheduler,
}

impl Lesson {
    /// Render and present one frame. Returns false when the frame was skipped.
    fn draw(gpu: &Gpu, surface: &SurfaceContext, renderer: &LessonRenderer, elapsed: f32) -> bool {
        match surface.acquire(&gpu.device) {
            Ok(Some(frame)) => {
                renderer.render(gpu, &frame.view, elapsed);
                frame.present();
                true
            }
            Ok(None) => {
                tracing::debug!("surface reconfigured, frame skipped");
                false
            }
            Err(e) => {
                tracing::error!("surface error: {e}");
                false
            }
        }
    }
}

struct PrimerApp {
    config: AppConfig,
    frame_loop: FrameLoop,
    lesson: Option<Lesson>,
    error: Option<anyhow::Error>,
}

impl PrimerApp {
    fn new(config: AppConfig) -> Self {
        let frame_loop = FrameLoop::new().with_frame_limit(config.frame_limit);
        Self {
            config,
            frame_loop,
            lesson: None,
            error: None,
        }
    }

    fn start(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let title = format!("{} - {}", self.config.window.title, self.config.example);
        let attrs = Window::default_attributes()
            .with_title(title)
            .with_inner_size(PhysicalSize::new(
                self.config.window.width,
                self.config.window.height,
            ));
        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .context("failed to create window")?,
        );

        let inner = window.inner_size();
        let size = SurfaceSize::new(inner.width, inner.height);
        let settings = SurfaceSettings::from_config(&self.config);
        let init = primer_render_wgpu::initialize(window.clone(), size, &settings);
        let (gpu, surface) = pollster::block_on(init)?;

        let options = RendererOptions::new(surface.format(), surface.size())
            .with_texture(self.config.texture.clone());
        let renderer = LessonRenderer::new(&gpu, self.config.example, &options)?;

        let mut scheduler = RedrawScheduler(window.clone());
        self.frame_loop.start(&mut scheduler);
        self.lesson = Some(Lesson {
            window,
            gpu,
            surface,
            renderer,
            scheduler,
        });
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        tracing::error!("{err:#}");
        self.error = Some(err);
        self.frame_loop.stop_signal().stop();
        event_loop.exit();
    }
}

impl ApplicationHandler for PrimerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.lesson.is_some() {
            return;
        }
        if let Err(e) = self.start(event_loop) {
            self.fail(event_loop, e);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(lesson) = &mut self.lesson else {
            return;
        };
        if lesson.window.id() != window_id {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                self.frame_loop.stop_signal().stop();
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                let size = SurfaceSize::new(new_size.width, new_size.height);
                lesson.surface.resize(&lesson.gpu.device, size);
                let resized = lesson.renderer.resize(&lesson.gpu.device, size);
                if let Err(e) = resized {
                    let err = anyhow::anyhow!("failed to resize depth target: {e}");
                    self.fail(event_loop, err);
                }
            }
            WindowEvent::RedrawRequested => {
                let Lesson {
                    gpu,
                    surface,
                    renderer,
                    scheduler,
                    ..
                } = lesson;
                let outcome = self.frame_loop.run_frame(scheduler, |tick| {
                    Lesson::draw(gpu, surface, renderer, tick.elapsed)
                });
                if outcome == FrameOutcome::Stopped {
                    tracing::info!(frames = self.frame_loop.frames(), "exiting");
                    event_loop.exit();
                }
            }
            _ => {}
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let config = AppConfig::load_or_default(cli.config.as_deref())
        .context("failed to load configuration")?
        .with_overrides(cli.overrides())?;
    tracing::info!("primer-desktop starting: {}", config.example);

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = PrimerApp::new(config);
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_the_config_file() {
        let cli = Cli::parse_from([
            "primer-desktop",
            "--example",
            "cube",
            "--frames",
            "10",
            "--width",
            "320",
        ]);
        let overrides = cli.overrides();
        let config = AppConfig::default().with_overrides(overrides).unwrap();
        assert_eq!(config.example, ExampleKind::Cube);
        assert_eq!(config.frame_limit, Some(10));
        assert_eq!(config.window.width, 320);
        assert_eq!(config.window.height, 800);
    }

    #[test]
    fn unknown_example_is_rejected() {
        let parsed = Cli::try_parse_from(["primer-desktop", "--example", "teapot"]);
        assert!(parsed.is_err());
    }
}
