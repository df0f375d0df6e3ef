//! Buffers, textures, samplers and bind groups for a lesson.

use std::marker::PhantomData;
use std::path::Path;

use bytemuck::Pod;
use primer_render::{
    BindingError, BindingKind, BindingSlot, LayoutError, VertexLayout, check_bindings,
};

use crate::gpu::with_validation;

#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error("write of {actual} bytes into a buffer of {expected} bytes")]
    SizeMismatch { expected: u64, actual: u64 },
    #[error("buffer {label} lacks usage {usage:?}")]
    MissingUsage {
        label: &'static str,
        usage: wgpu::BufferUsages,
    },
    #[error(transparent)]
    Binding(#[from] BindingError),
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error("resource validation failed: {0}")]
    Validation(String),
    #[error("failed to load texture image: {0}")]
    Image(#[from] image::ImageError),
    #[error("buffer readback failed: {0}")]
    Readback(String),
}

fn padded_size(size: u64) -> u64 {
    size.div_ceil(wgpu::COPY_BUFFER_ALIGNMENT) * wgpu::COPY_BUFFER_ALIGNMENT
}

/// A buffer still mapped from creation. Must be filled and then
/// [`unmap`](Self::unmap)ped before the GPU may use it.
pub struct MappedBuffer {
    buffer: wgpu::Buffer,
    size: u64,
}

impl MappedBuffer {
    pub fn new(device: &wgpu::Device, label: &str, size: u64, usage: wgpu::BufferUsages) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: padded_size(size),
            usage,
            mapped_at_creation: true,
        });
        Self { buffer, size }
    }

    /// Copy `bytes` into the mapping. The length must equal the declared size.
    pub fn write(&mut self, bytes: &[u8]) -> Result<(), ResourceError> {
        if bytes.len() as u64 != self.size {
            return Err(ResourceError::SizeMismatch {
                expected: self.size,
                actual: bytes.len() as u64,
            });
        }
        let mut view = self.buffer.slice(..).get_mapped_range_mut();
        view[..bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    pub fn unmap(self) -> wgpu::Buffer {
        self.buffer.unmap();
        self.buffer
    }
}

/// Vertex records uploaded once through a mapped-at-creation buffer.
pub struct VertexBuffer {
    pub buffer: wgpu::Buffer,
    pub vertex_count: u32,
}

impl VertexBuffer {
    /// Upload `bytes`, which must hold whole records of `layout`.
    pub fn new(
        device: &wgpu::Device,
        label: &str,
        layout: &VertexLayout,
        bytes: &[u8],
    ) -> Result<Self, ResourceError> {
        layout.validate()?;
        let vertex_count = layout.vertex_count(bytes)? as u32;

        let size = bytes.len() as u64;
        let mut mapped = MappedBuffer::new(device, label, size, wgpu::BufferUsages::VERTEX);
        mapped.write(bytes)?;
        tracing::debug!("vertex buffer {label}: {vertex_count} vertices, {size} bytes");
        Ok(Self {
            buffer: mapped.unmap(),
            vertex_count,
        })
    }
}

/// A uniform buffer holding exactly one `T`, rewritten through the queue.
pub struct UniformBuffer<T> {
    buffer: wgpu::Buffer,
    label: &'static str,
    _marker: PhantomData<T>,
}

impl<T: Pod> UniformBuffer<T> {
    pub const SIZE: u64 = std::mem::size_of::<T>() as u64;

    /// `readback` adds `COPY_SRC` so the contents can be read back for inspection.
    pub fn new(
        device: &wgpu::Device,
        label: &'static str,
        initial: &T,
        readback: bool,
    ) -> Result<Self, ResourceError> {
        let mut usage = wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST;
        if readback {
            usage |= wgpu::BufferUsages::COPY_SRC;
        }
        let mut mapped = MappedBuffer::new(device, label, Self::SIZE, usage);
        mapped.write(bytemuck::bytes_of(initial))?;
        Ok(Self {
            buffer: mapped.unmap(),
            label,
            _marker: PhantomData,
        })
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    pub fn write(&self, queue: &wgpu::Queue, value: &T) {
        queue.write_buffer(&self.buffer, 0, bytemuck::bytes_of(value));
    }

    pub fn write_bytes(&self, queue: &wgpu::Queue, bytes: &[u8]) -> Result<(), ResourceError> {
        if bytes.len() as u64 != Self::SIZE {
            return Err(ResourceError::SizeMismatch {
                expected: Self::SIZE,
                actual: bytes.len() as u64,
            });
        }
        queue.write_buffer(&self.buffer, 0, bytes);
        Ok(())
    }

    /// Blocking copy of the current contents back to the CPU.
    pub fn read_back(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) -> Result<T, ResourceError> {
        if !self.buffer.usage().contains(wgpu::BufferUsages::COPY_SRC) {
            return Err(ResourceError::MissingUsage {
                label: self.label,
                usage: wgpu::BufferUsages::COPY_SRC,
            });
        }
        let bytes = read_buffer(device, queue, &self.buffer, Self::SIZE)?;
        Ok(bytemuck::pod_read_unaligned(&bytes))
    }
}

/// Copy the first `size` bytes of `buffer` into a staging buffer, wait for the
/// copy and return them.
pub fn read_buffer(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    buffer: &wgpu::Buffer,
    size: u64,
) -> Result<Vec<u8>, ResourceError> {
    let padded = padded_size(size);
    let staging = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("readback_staging"),
        size: padded,
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("readback_encoder"),
    });
    encoder.copy_buffer_to_buffer(buffer, 0, &staging, 0, padded);
    queue.submit(Some(encoder.finish()));

    map_and_copy(device, &staging, size as usize)
}

/// Map a `MAP_READ` buffer, wait for the device, and copy out `len` bytes.
pub(crate) fn map_and_copy(
    device: &wgpu::Device,
    staging: &wgpu::Buffer,
    len: usize,
) -> Result<Vec<u8>, ResourceError> {
    let slice = staging.slice(..);
    let (tx, rx) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    let _ = device.poll(wgpu::Maintain::Wait);

    rx.recv()
        .map_err(|e| ResourceError::Readback(e.to_string()))?
        .map_err(|e| ResourceError::Readback(e.to_string()))?;

    let bytes = slice.get_mapped_range()[..len].to_vec();
    staging.unmap();
    Ok(bytes)
}

/// Decoded RGBA8 pixels ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureSource {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl TextureSource {
    /// Decode any format the `image` crate understands.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ResourceError> {
        let path = path.as_ref();
        let rgba = image::open(path)?.to_rgba8();
        let (width, height) = rgba.dimensions();
        tracing::info!("loaded texture {} ({width}x{height})", path.display());
        Ok(Self {
            width,
            height,
            rgba: rgba.into_raw(),
        })
    }

    /// Square checkerboard of `size` pixels with `cell`-pixel squares.
    pub fn checkerboard(size: u32, cell: u32) -> Self {
        let cell = cell.max(1);
        let mut rgba = Vec::with_capacity((size * size * 4) as usize);
        for y in 0..size {
            for x in 0..size {
                let light = ((x / cell) + (y / cell)).is_multiple_of(2);
                let texel = if light {
                    [0xf0, 0xf0, 0xf0, 0xff]
                } else {
                    [0x30, 0x60, 0xc0, 0xff]
                };
                rgba.extend_from_slice(&texel);
            }
        }
        Self {
            width: size,
            height: size,
            rgba,
        }
    }

    /// The image at `path`, or a checkerboard when none is configured.
    pub fn from_path_or_checkerboard(path: Option<&Path>) -> Result<Self, ResourceError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::checkerboard(256, 32)),
        }
    }
}

/// A sampled 2D texture with its view and sampler.
pub struct LessonTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

impl LessonTexture {
    pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        source: &TextureSource,
    ) -> Result<Self, ResourceError> {
        let expected = source.width as u64 * source.height as u64 * 4;
        if source.rgba.len() as u64 != expected {
            return Err(ResourceError::SizeMismatch {
                expected,
                actual: source.rgba.len() as u64,
            });
        }

        let size = wgpu::Extent3d {
            width: source.width,
            height: source.height,
            depth_or_array_layers: 1,
        };
        let texture = with_validation(device, || {
            device.create_texture(&wgpu::TextureDescriptor {
                label: Some("lesson_texture"),
                size,
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: Self::FORMAT,
                // RENDER_ATTACHMENT is required by some platforms for queue copies.
                usage: wgpu::TextureUsages::COPY_DST
                    | wgpu::TextureUsages::TEXTURE_BINDING
                    | wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            })
        })
        .map_err(ResourceError::Validation)?;

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &source.rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(source.width * 4),
                rows_per_image: Some(source.height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("lesson_sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        tracing::debug!("texture uploaded: {}x{}", source.width, source.height);

        Ok(Self {
            texture,
            view,
            sampler,
        })
    }
}

/// A resource offered for one binding of a bind group.
#[derive(Clone, Copy)]
pub enum BoundResource<'a> {
    Uniform(&'a wgpu::Buffer),
    Sampler(&'a wgpu::Sampler),
    Texture(&'a wgpu::TextureView),
}

impl BoundResource<'_> {
    pub fn kind(&self) -> BindingKind {
        match self {
            BoundResource::Uniform(_) => BindingKind::UniformBuffer,
            BoundResource::Sampler(_) => BindingKind::Sampler,
            BoundResource::Texture(_) => BindingKind::Texture,
        }
    }

    fn binding_resource(&self) -> wgpu::BindingResource<'_> {
        match *self {
            BoundResource::Uniform(buffer) => buffer.as_entire_binding(),
            BoundResource::Sampler(sampler) => wgpu::BindingResource::Sampler(sampler),
            BoundResource::Texture(view) => wgpu::BindingResource::TextureView(view),
        }
    }
}

/// Build a bind group after checking `resources` against the declared slots.
pub fn create_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    declared: &[BindingSlot],
    resources: &[(u32, BoundResource<'_>)],
) -> Result<wgpu::BindGroup, ResourceError> {
    let provided: Vec<BindingSlot> = resources
        .iter()
        .map(|(binding, res)| BindingSlot::new(*binding, res.kind()))
        .collect();
    check_bindings(declared, &provided)?;

    let entries: Vec<wgpu::BindGroupEntry<'_>> = resources
        .iter()
        .map(|(binding, resource)| wgpu::BindGroupEntry {
            binding: *binding,
            resource: resource.binding_resource(),
        })
        .collect();

    with_validation(device, || {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("lesson_bind_group"),
            layout,
            entries: &entries,
        })
    })
    .map_err(ResourceError::Validation)
}
