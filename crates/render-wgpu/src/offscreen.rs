//! Rendering into a texture and reading the pixels back, for the CLI and tests.

use std::path::{Path, PathBuf};

use primer_common::{ExampleKind, SurfaceSize};

use crate::gpu::{Gpu, with_validation};
use crate::renderer::{BuildError, LessonRenderer, RendererOptions};
use crate::resources::{ResourceError, map_and_copy};

/// Row pitch of a texture-to-buffer copy for `width` RGBA8 pixels, or `None`
/// when it does not fit in a `u32`.
pub fn padded_bytes_per_row(width: u32) -> Option<u32> {
    width
        .checked_mul(4)?
        .checked_next_multiple_of(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
}

pub struct OffscreenTarget {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    size: SurfaceSize,
}

impl OffscreenTarget {
    pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

    /// Fails with [`ResourceError::Validation`] when `size` exceeds the
    /// device's texture limits.
    pub fn new(device: &wgpu::Device, size: SurfaceSize) -> Result<Self, ResourceError> {
        let size = size.non_zero();
        let texture = with_validation(device, || {
            device.create_texture(&wgpu::TextureDescriptor {
                label: Some("offscreen_target"),
                size: wgpu::Extent3d {
                    width: size.width,
                    height: size.height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: Self::FORMAT,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
                view_formats: &[],
            })
        })
        .map_err(ResourceError::Validation)?;
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Ok(Self { texture, view, size })
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn size(&self) -> SurfaceSize {
        self.size
    }

    /// Copy the target into a staging buffer and strip the row padding.
    pub fn read_pixels(&self, gpu: &Gpu) -> Result<image::RgbaImage, ResourceError> {
        let SurfaceSize { width, height } = self.size;
        let padded_row = padded_bytes_per_row(width).ok_or_else(|| {
            ResourceError::Readback(format!("row pitch of {width} pixels overflows"))
        })?;
        let staging_size = padded_row as u64 * height as u64;
        let staging = with_validation(&gpu.device, || {
            gpu.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("offscreen_readback"),
                size: staging_size,
                usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        })
        .map_err(ResourceError::Validation)?;

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("offscreen_copy"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        gpu.queue.submit(Some(encoder.finish()));

        let padded = map_and_copy(&gpu.device, &staging, staging_size as usize)?;
        let row = (width * 4) as usize;
        let pixels: Vec<u8> = padded
            .chunks_exact(padded_row as usize)
            .flat_map(|r| &r[..row])
            .copied()
            .collect();

        image::RgbaImage::from_raw(width, height, pixels).ok_or_else(|| {
            ResourceError::Readback("pixel buffer shorter than image".into())
        })
    }
}

/// One frame of `kind` at `time` seconds, rendered headless.
pub fn render_to_image(
    gpu: &Gpu,
    kind: ExampleKind,
    time: f32,
    size: SurfaceSize,
    texture: Option<PathBuf>,
) -> Result<image::RgbaImage, BuildError> {
    let target = OffscreenTarget::new(&gpu.device, size)?;
    let options = RendererOptions::new(OffscreenTarget::FORMAT, target.size())
        .with_texture(texture);
    let renderer = LessonRenderer::new(gpu, kind, &options)?;
    renderer.render(gpu, target.view(), time);
    Ok(target.read_pixels(gpu)?)
}

pub fn save_png(image: &image::RgbaImage, path: impl AsRef<Path>) -> Result<(), ResourceError> {
    image.save_with_format(path.as_ref(), image::ImageFormat::Png)?;
    tracing::info!("wrote {}", path.as_ref().display());
    Ok(())
}
