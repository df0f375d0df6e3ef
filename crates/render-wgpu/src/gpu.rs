//! Adapter, device and presentation surface.

use primer_common::{AppConfig, PowerPreference, SurfaceSize};

/// No usable adapter, device or surface format.
#[derive(Debug, thiserror::Error)]
pub enum InitializationError {
    #[error("no compatible GPU adapter found")]
    NoAdapter,
    #[error("failed to create GPU device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("surface reports no supported formats for this adapter")]
    NoSurfaceFormat,
    #[error(transparent)]
    Context(#[from] ContextError),
}

/// The drawable could not produce a presentable surface.
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("failed to create a presentable surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),
}

/// Presentation settings derived from the application configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceSettings {
    pub present_mode: wgpu::PresentMode,
    pub power: wgpu::PowerPreference,
}

impl Default for SurfaceSettings {
    fn default() -> Self {
        Self {
            present_mode: wgpu::PresentMode::Fifo,
            power: wgpu::PowerPreference::HighPerformance,
        }
    }
}

impl SurfaceSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            present_mode: if config.vsync {
                wgpu::PresentMode::Fifo
            } else {
                wgpu::PresentMode::AutoNoVsync
            },
            power: power_preference(config.power),
        }
    }
}

pub fn power_preference(power: PowerPreference) -> wgpu::PowerPreference {
    match power {
        PowerPreference::HighPerformance => wgpu::PowerPreference::HighPerformance,
        PowerPreference::LowPower => wgpu::PowerPreference::LowPower,
    }
}

pub fn create_instance() -> wgpu::Instance {
    wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    })
}

/// Adapter plus logical device and its queue. Created once, lives for the process.
pub struct Gpu {
    // Kept so the instance outlives every object created from it.
    _instance: wgpu::Instance,
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl Gpu {
    /// Request an adapter (compatible with `surface` when given) and a device.
    pub async fn new(
        instance: wgpu::Instance,
        surface: Option<&wgpu::Surface<'_>>,
        power: wgpu::PowerPreference,
    ) -> Result<Self, InitializationError> {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: power,
                compatible_surface: surface,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(InitializationError::NoAdapter)?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("primer_device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::downlevel_defaults()
                        .using_resolution(adapter.limits()),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        let info = adapter.get_info();
        tracing::info!(
            "GPU initialized: {} ({} backend)",
            info.name,
            info.backend.to_str()
        );

        Ok(Self {
            _instance: instance,
            adapter,
            device,
            queue,
        })
    }

    /// Device without a presentation surface, for offscreen rendering.
    pub async fn headless(power: wgpu::PowerPreference) -> Result<Self, InitializationError> {
        Self::new(create_instance(), None, power).await
    }
}

/// Run `f` inside a validation error scope and surface the first error.
pub(crate) fn with_validation<T>(
    device: &wgpu::Device,
    f: impl FnOnce() -> T,
) -> Result<T, String> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = f();
    match pollster::block_on(device.pop_error_scope()) {
        Some(err) => Err(err.to_string()),
        None => Ok(value),
    }
}

/// Premultiplied when the surface supports it, otherwise the first supported mode.
pub fn choose_alpha_mode(supported: &[wgpu::CompositeAlphaMode]) -> wgpu::CompositeAlphaMode {
    if supported.contains(&wgpu::CompositeAlphaMode::PreMultiplied) {
        return wgpu::CompositeAlphaMode::PreMultiplied;
    }
    let fallback = supported
        .first()
        .copied()
        .unwrap_or(wgpu::CompositeAlphaMode::Auto);
    tracing::warn!("premultiplied alpha unsupported by surface, using {fallback:?}");
    fallback
}

/// A surface bound to the device and configured for presentation.
pub struct SurfaceContext {
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
}

/// The texture acquired for one frame, with a view ready to render into.
pub struct SurfaceFrame {
    pub texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
}

impl SurfaceFrame {
    pub fn present(self) {
        self.texture.present();
    }
}

impl SurfaceContext {
    /// Pick the surface's preferred format and configure it.
    pub fn new(
        surface: wgpu::Surface<'static>,
        gpu: &Gpu,
        size: SurfaceSize,
        settings: &SurfaceSettings,
    ) -> Result<Self, InitializationError> {
        let caps = surface.get_capabilities(&gpu.adapter);
        let format = caps
            .formats
            .first()
            .copied()
            .ok_or(InitializationError::NoSurfaceFormat)?;
        let size = size.non_zero();

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width,
            height: size.height,
            present_mode: settings.present_mode,
            alpha_mode: choose_alpha_mode(&caps.alpha_modes),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&gpu.device, &config);
        tracing::info!(
            "surface configured: {format:?} {}x{} {:?}",
            size.width,
            size.height,
            config.alpha_mode
        );

        Ok(Self { surface, config })
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    pub fn size(&self) -> SurfaceSize {
        SurfaceSize::new(self.config.width, self.config.height)
    }

    /// Apply the current configuration again. Safe to call any number of times.
    pub fn configure(&self, device: &wgpu::Device) {
        self.surface.configure(device, &self.config);
    }

    /// Reconfigure for a new size. Zero-sized requests are ignored.
    pub fn resize(&mut self, device: &wgpu::Device, size: SurfaceSize) {
        if size.width == 0 || size.height == 0 {
            return;
        }
        self.config.width = size.width;
        self.config.height = size.height;
        self.configure(device);
    }

    /// Acquire the current texture. `Ok(None)` means the surface was stale and
    /// has been reconfigured; skip this frame.
    pub fn acquire(
        &self,
        device: &wgpu::Device,
    ) -> Result<Option<SurfaceFrame>, wgpu::SurfaceError> {
        let texture = match self.surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.configure(device);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        let view = texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        Ok(Some(SurfaceFrame { texture, view }))
    }
}

/// Create the surface for `target`, then the device, then configure the surface.
pub async fn initialize(
    target: impl Into<wgpu::SurfaceTarget<'static>>,
    size: SurfaceSize,
    settings: &SurfaceSettings,
) -> Result<(Gpu, SurfaceContext), InitializationError> {
    let instance = create_instance();
    let surface = instance
        .create_surface(target)
        .map_err(ContextError::from)?;
    let gpu = Gpu::new(instance, Some(&surface), settings.power).await?;
    let context = SurfaceContext::new(surface, &gpu, size, settings)?;
    Ok((gpu, context))
}
