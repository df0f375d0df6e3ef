//! Vertex input declarations.
//!
//! A pipeline either generates its vertices inside the shader (no buffer
//! layout at all) or reads them from a buffer described by a [`VertexLayout`].
//! Layouts are validated before any GPU object is created, so a bad layout
//! never reaches the driver and is never patched up with defaults.

use std::collections::BTreeSet;

/// Byte alignment required for strides and attribute offsets.
pub const VERTEX_ALIGNMENT: u64 = 4;

/// Component format of one vertex attribute. All formats are 32-bit floats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeFormat {
    Float32,
    Float32x2,
    Float32x3,
    Float32x4,
}

impl AttributeFormat {
    pub const fn components(self) -> usize {
        match self {
            AttributeFormat::Float32 => 1,
            AttributeFormat::Float32x2 => 2,
            AttributeFormat::Float32x3 => 3,
            AttributeFormat::Float32x4 => 4,
        }
    }

    /// Size in bytes.
    pub const fn size(self) -> u64 {
        self.components() as u64 * 4
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    /// Shader-visible `@location`.
    pub location: u32,
    /// Byte offset inside one vertex record.
    pub offset: u64,
    pub format: AttributeFormat,
}

impl VertexAttribute {
    pub const fn new(location: u32, offset: u64, format: AttributeFormat) -> Self {
        Self {
            location,
            offset,
            format,
        }
    }

    /// First byte past the attribute, or `None` when that overflows.
    pub const fn end(&self) -> Option<u64> {
        self.offset.checked_add(self.format.size())
    }
}

/// Errors from vertex layout validation and decoding.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    #[error("vertex stride must be non-zero")]
    ZeroStride,
    #[error("vertex layout declares no attributes")]
    NoAttributes,
    #[error("{what} {value} is not a multiple of 4")]
    Unaligned { what: &'static str, value: u64 },
    #[error(
        "attribute at location {location} spans bytes {offset}..{end}, past the stride of {stride}"
    )]
    AttributeOutOfBounds {
        location: u32,
        offset: u64,
        end: u64,
        stride: u64,
    },
    #[error("shader location {0} declared more than once")]
    DuplicateLocation(u32),
    #[error("no attribute at shader location {0}")]
    UnknownLocation(u32),
    #[error("vertex data of {len} bytes is not a whole number of {stride}-byte records")]
    PartialRecord { len: usize, stride: u64 },
    #[error("vertex {index} is out of range ({count} vertices)")]
    VertexOutOfRange { index: usize, count: usize },
}

/// Per-vertex buffer layout: stride plus ordered attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexLayout {
    pub stride: u64,
    pub attributes: Vec<VertexAttribute>,
}

impl VertexLayout {
    pub fn new(stride: u64, attributes: impl Into<Vec<VertexAttribute>>) -> Self {
        Self {
            stride,
            attributes: attributes.into(),
        }
    }

    /// Check every attribute fits inside the stride, offsets are aligned, and
    /// each shader location is used once.
    pub fn validate(&self) -> Result<(), LayoutError> {
        if self.stride == 0 {
            return Err(LayoutError::ZeroStride);
        }
        if !self.stride.is_multiple_of(VERTEX_ALIGNMENT) {
            return Err(LayoutError::Unaligned {
                what: "stride",
                value: self.stride,
            });
        }
        if self.attributes.is_empty() {
            return Err(LayoutError::NoAttributes);
        }

        let mut seen = BTreeSet::new();
        for attr in &self.attributes {
            if !attr.offset.is_multiple_of(VERTEX_ALIGNMENT) {
                return Err(LayoutError::Unaligned {
                    what: "attribute offset",
                    value: attr.offset,
                });
            }
            match attr.end() {
                Some(end) if end <= self.stride => {}
                end => {
                    return Err(LayoutError::AttributeOutOfBounds {
                        location: attr.location,
                        offset: attr.offset,
                        end: end.unwrap_or(u64::MAX),
                        stride: self.stride,
                    });
                }
            }
            if !seen.insert(attr.location) {
                return Err(LayoutError::DuplicateLocation(attr.location));
            }
        }
        Ok(())
    }

    pub fn attribute(&self, location: u32) -> Option<&VertexAttribute> {
        self.attributes.iter().find(|a| a.location == location)
    }

    /// Number of whole records in `bytes`.
    pub fn vertex_count(&self, bytes: &[u8]) -> Result<usize, LayoutError> {
        self.validate()?;
        let stride = self.stride as usize;
        if !bytes.len().is_multiple_of(stride) {
            return Err(LayoutError::PartialRecord {
                len: bytes.len(),
                stride: self.stride,
            });
        }
        Ok(bytes.len() / stride)
    }

    /// Read the attribute at `location` of vertex `index` the way the vertex
    /// fetch stage would.
    pub fn decode(
        &self,
        bytes: &[u8],
        index: usize,
        location: u32,
    ) -> Result<Vec<f32>, LayoutError> {
        let count = self.vertex_count(bytes)?;
        if index >= count {
            return Err(LayoutError::VertexOutOfRange { index, count });
        }
        let attr = self
            .attribute(location)
            .ok_or(LayoutError::UnknownLocation(location))?;

        let start = index * self.stride as usize + attr.offset as usize;
        let end = start + attr.format.size() as usize;
        Ok(bytes[start..end]
            .chunks_exact(4)
            .map(bytemuck::pod_read_unaligned::<f32>)
            .collect())
    }
}

/// How a pipeline obtains its vertices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VertexInput {
    /// Positions are synthesized in the shader from the vertex index.
    Generated,
    /// Vertices are fetched from a buffer bound at slot 0.
    Buffered(VertexLayout),
}

impl VertexInput {
    pub fn layout(&self) -> Option<&VertexLayout> {
        match self {
            VertexInput::Generated => None,
            VertexInput::Buffered(layout) => Some(layout),
        }
    }

    pub fn validate(&self) -> Result<(), LayoutError> {
        match self {
            VertexInput::Generated => Ok(()),
            VertexInput::Buffered(layout) => layout.validate(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{TRIANGLE_VERTICES, TexturedVertex};

    fn textured_layout() -> VertexLayout {
        VertexLayout::new(
            24,
            [
                VertexAttribute::new(0, 0, AttributeFormat::Float32x4),
                VertexAttribute::new(1, 16, AttributeFormat::Float32x2),
            ],
        )
    }

    #[test]
    fn textured_layout_is_valid() {
        assert_eq!(textured_layout().validate(), Ok(()));
        assert_eq!(textured_layout(), TexturedVertex::layout());
    }

    #[test]
    fn attribute_past_stride_is_rejected() {
        let layout = VertexLayout::new(
            20,
            [
                VertexAttribute::new(0, 0, AttributeFormat::Float32x4),
                VertexAttribute::new(1, 16, AttributeFormat::Float32x2),
            ],
        );
        assert_eq!(
            layout.validate(),
            Err(LayoutError::AttributeOutOfBounds {
                location: 1,
                offset: 16,
                end: 24,
                stride: 20,
            })
        );
    }

    #[test]
    fn offset_near_u64_max_is_out_of_bounds() {
        let attr = VertexAttribute::new(0, u64::MAX - 3, AttributeFormat::Float32);
        assert_eq!(attr.end(), None);
        let layout = VertexLayout::new(16, [attr]);
        assert_eq!(
            layout.validate(),
            Err(LayoutError::AttributeOutOfBounds {
                location: 0,
                offset: u64::MAX - 3,
                end: u64::MAX,
                stride: 16,
            })
        );
    }

    #[test]
    fn degenerate_layouts_are_rejected() {
        let empty = VertexLayout::new(0, Vec::new());
        assert_eq!(empty.validate(), Err(LayoutError::ZeroStride));
        let empty = VertexLayout::new(16, Vec::new());
        assert_eq!(empty.validate(), Err(LayoutError::NoAttributes));

        let float = |offset| VertexAttribute::new(0, offset, AttributeFormat::Float32);
        assert!(matches!(
            VertexLayout::new(18, [float(0)]).validate(),
            Err(LayoutError::Unaligned { what: "stride", .. })
        ));
        assert!(matches!(
            VertexLayout::new(16, [float(2)]).validate(),
            Err(LayoutError::Unaligned {
                what: "attribute offset",
                ..
            })
        ));
        assert_eq!(
            VertexLayout::new(
                16,
                [
                    VertexAttribute::new(3, 0, AttributeFormat::Float32x2),
                    VertexAttribute::new(3, 8, AttributeFormat::Float32x2),
                ]
            )
            .validate(),
            Err(LayoutError::DuplicateLocation(3))
        );
    }

    #[test]
    fn decode_recovers_triangle_attributes() {
        let bytes: &[u8] = bytemuck::cast_slice(&TRIANGLE_VERTICES);
        assert_eq!(bytes.len(), 3 * 24);

        let layout = textured_layout();
        assert_eq!(layout.vertex_count(bytes), Ok(3));
        for (i, v) in TRIANGLE_VERTICES.iter().enumerate() {
            assert_eq!(layout.decode(bytes, i, 0).unwrap(), v.position.to_vec());
            assert_eq!(layout.decode(bytes, i, 1).unwrap(), v.uv.to_vec());
        }
    }

    #[test]
    fn decode_from_raw_floats() {
        #[rustfmt::skip]
        let floats: [f32; 18] = [
            1.0, 2.0, 3.0, 4.0,     5.0, 6.0,
            7.0, 8.0, 9.0, 10.0,    11.0, 12.0,
            13.0, 14.0, 15.0, 16.0, 17.0, 18.0,
        ];
        let bytes: &[u8] = bytemuck::cast_slice(&floats);
        let layout = textured_layout();
        assert_eq!(
            layout.decode(bytes, 1, 0).unwrap(),
            vec![7.0, 8.0, 9.0, 10.0]
        );
        assert_eq!(layout.decode(bytes, 2, 1).unwrap(), vec![17.0, 18.0]);
    }

    #[test]
    fn decode_errors() {
        let bytes = [0u8; 48];
        let layout = textured_layout();
        assert_eq!(
            layout.decode(&bytes, 2, 0),
            Err(LayoutError::VertexOutOfRange { index: 2, count: 2 })
        );
        assert_eq!(
            layout.decode(&bytes, 0, 7),
            Err(LayoutError::UnknownLocation(7))
        );
        assert_eq!(
            layout.decode(&bytes[..30], 0, 0),
            Err(LayoutError::PartialRecord { len: 30, stride: 24 })
        );
    }

    #[test]
    fn generated_input_has_no_layout() {
        assert!(VertexInput::Generated.layout().is_none());
        assert_eq!(VertexInput::Generated.validate(), Ok(()));
        assert!(VertexInput::Buffered(textured_layout()).layout().is_some());
    }
}
