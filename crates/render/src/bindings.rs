use std::collections::BTreeMap;
use std::fmt;

/// Shader binding index of the camera uniform.
pub const CAMERA_BINDING: u32 = 0;
/// Shader binding index of the texture sampler.
pub const SAMPLER_BINDING: u32 = 1;
/// Shader binding index of the sampled texture.
pub const TEXTURE_BINDING: u32 = 2;
/// Bind group index every lesson uses.
pub const BIND_GROUP_INDEX: u32 = 0;

/// Kind of resource a shader binding expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BindingKind {
    UniformBuffer,
    Sampler,
    Texture,
}

impl fmt::Display for BindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BindingKind::UniformBuffer => "uniform buffer",
            BindingKind::Sampler => "sampler",
            BindingKind::Texture => "texture",
        };
        f.write_str(name)
    }
}

/// One `@binding(n)` slot in group 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingSlot {
    pub binding: u32,
    pub kind: BindingKind,
}

impl BindingSlot {
    pub const fn new(binding: u32, kind: BindingKind) -> Self {
        Self { binding, kind }
    }
}

/// A resource set that does not line up with the shader's bindings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindingError {
    #[error("binding {binding} ({kind}) is declared by the shader but no resource was provided")]
    Missing { binding: u32, kind: BindingKind },
    #[error("binding {binding} ({kind}) was provided but the shader does not declare it")]
    Unexpected { binding: u32, kind: BindingKind },
    #[error("binding {binding} expects a {expected}, got a {found}")]
    KindMismatch {
        binding: u32,
        expected: BindingKind,
        found: BindingKind,
    },
    #[error("binding {0} provided more than once")]
    Duplicate(u32),
}

/// Require `provided` to cover exactly the slots in `declared`, with matching kinds.
pub fn check_bindings(
    declared: &[BindingSlot],
    provided: &[BindingSlot],
) -> Result<(), BindingError> {
    let mut by_index = BTreeMap::new();
    for slot in provided {
        if by_index.insert(slot.binding, slot.kind).is_some() {
            return Err(BindingError::Duplicate(slot.binding));
        }
    }

    for slot in declared {
        match by_index.remove(&slot.binding) {
            None => {
                return Err(BindingError::Missing {
                    binding: slot.binding,
                    kind: slot.kind,
                });
            }
            Some(found) if found != slot.kind => {
                return Err(BindingError::KindMismatch {
                    binding: slot.binding,
                    expected: slot.kind,
                    found,
                });
            }
            Some(_) => {}
        }
    }

    match by_index.into_iter().next() {
        Some((binding, kind)) => Err(BindingError::Unexpected { binding, kind }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEXTURED: [BindingSlot; 3] = [
        BindingSlot::new(CAMERA_BINDING, BindingKind::UniformBuffer),
        BindingSlot::new(SAMPLER_BINDING, BindingKind::Sampler),
        BindingSlot::new(TEXTURE_BINDING, BindingKind::Texture),
    ];

    #[test]
    fn exact_match_in_any_order() {
        let mut provided = TEXTURED;
        provided.reverse();
        assert_eq!(check_bindings(&TEXTURED, &provided), Ok(()));
        assert_eq!(check_bindings(&[], &[]), Ok(()));
    }

    #[test]
    fn missing_slot() {
        assert_eq!(
            check_bindings(&TEXTURED, &TEXTURED[..2]),
            Err(BindingError::Missing {
                binding: TEXTURE_BINDING,
                kind: BindingKind::Texture,
            })
        );
    }

    #[test]
    fn extra_slot() {
        assert_eq!(
            check_bindings(&TEXTURED[..1], &TEXTURED),
            Err(BindingError::Unexpected {
                binding: SAMPLER_BINDING,
                kind: BindingKind::Sampler,
            })
        );
    }

    #[test]
    fn swapped_kinds() {
        let provided = [
            BindingSlot::new(0, BindingKind::UniformBuffer),
            BindingSlot::new(1, BindingKind::Texture),
            BindingSlot::new(2, BindingKind::Sampler),
        ];
        assert_eq!(
            check_bindings(&TEXTURED, &provided),
            Err(BindingError::KindMismatch {
                binding: 1,
                expected: BindingKind::Sampler,
                found: BindingKind::Texture,
            })
        );
    }

    #[test]
    fn duplicate_slot() {
        let provided = [
            BindingSlot::new(0, BindingKind::UniformBuffer),
            BindingSlot::new(0, BindingKind::UniformBuffer),
        ];
        assert_eq!(
            check_bindings(&TEXTURED[..1], &provided),
            Err(BindingError::Duplicate(0))
        );
    }
}
