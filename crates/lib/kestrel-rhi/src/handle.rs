use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Kind of resource a [`ResourceId`] refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceTag {
    Buffer = 1,
    Texture = 2,
    Shader = 3,
}

/// Opaque 64-bit resource identifier.
///
/// The zero id is the invalid id. The top byte tags the resource kind, the
/// remaining bits carry the identity payload.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceId(u64);

impl ResourceId {
    const TAG_SHIFT: u32 = 56;
    const PAYLOAD_MASK: u64 = (1 << Self::TAG_SHIFT) - 1;

    #[inline]
    pub const fn invalid() -> Self {
        Self(0)
    }

    pub fn new(tag: ResourceTag, payload: u64) -> Self {
        let payload = payload & Self::PAYLOAD_MASK;
        assert_ne!(payload, 0, "Resource id payload must be non-zero!");

        Self(((tag as u64) << Self::TAG_SHIFT) | payload)
    }

    /// Derive a shader resource id from its artifact path.
    pub fn from_shader_path(path: &Path) -> Self {
        let mut hasher = DefaultHasher::new();
        path.hash(&mut hasher);
        // payload of zero would collapse into the invalid id
        let payload = hasher.finish() | 1;

        Self::new(ResourceTag::Shader, payload)
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.0 != 0
    }

    pub fn tag(&self) -> Option<ResourceTag> {
        match self.0 >> Self::TAG_SHIFT {
            1 => Some(ResourceTag::Buffer),
            2 => Some(ResourceTag::Texture),
            3 => Some(ResourceTag::Shader),
            _ => None,
        }
    }

    #[inline]
    pub fn payload(&self) -> u64 {
        self.0 & Self::PAYLOAD_MASK
    }
}

impl Default for ResourceId {
    fn default() -> Self {
        Self::invalid()
    }
}

impl std::fmt::Debug for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.is_valid() {
            return write!(f, "ResourceId(invalid)");
        }

        write!(f, "ResourceId({:?}, {:#x})", self.tag(), self.payload())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_id_is_zero() {
        assert!(!ResourceId::invalid().is_valid());
        assert_eq!(ResourceId::invalid().tag(), None);
    }

    #[test]
    fn tag_round_trip() {
        let id = ResourceId::new(ResourceTag::Texture, 42);
        assert!(id.is_valid());
        assert_eq!(id.tag(), Some(ResourceTag::Texture));
        assert_eq!(id.payload(), 42);
    }

    #[test]
    fn shader_path_ids_are_stable() {
        let a = ResourceId::from_shader_path(Path::new("shaders/world.vert.spv"));
        let b = ResourceId::from_shader_path(Path::new("shaders/world.vert.spv"));
        let c = ResourceId::from_shader_path(Path::new("shaders/world.frag.spv"));

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.tag(), Some(ResourceTag::Shader));
    }
}
