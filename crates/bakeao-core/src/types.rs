use serde::{Deserialize, Serialize};

/// UV set of a mesh. Indexes `MeshData::uvs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum UvChannel {
    #[default]
    Uv0 = 0,
    Uv1 = 1,
    Uv2 = 2,
    Uv3 = 3,
    Uv4 = 4,
    Uv5 = 5,
    Uv6 = 6,
    Uv7 = 7,
}

impl UvChannel {
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Uv0),
            1 => Some(Self::Uv1),
            2 => Some(Self::Uv2),
            3 => Some(Self::Uv3),
            4 => Some(Self::Uv4),
            5 => Some(Self::Uv5),
            6 => Some(Self::Uv6),
            7 => Some(Self::Uv7),
            _ => None,
        }
    }
}

impl std::fmt::Display for UvChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "UV{}", self.index())
    }
}

/// Newtype for LOD group identifiers. Meshes sharing an id are alternate
/// representations of the same object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LodGroupId(pub u32);

/// Usage flags attached to a `MeshContext`.
///
/// Bit layout:
///   [0] NOT_USED_IN_ANY_ASSET
///   [1] DONT_COMBINE       target is not added to its own occluder scene
///   [2] TEMPORARY          mesh has no stable identity, provenance is always stale
///   [3] APPLY_NORMAL_BIAS  occluder geometry is pulled inward by normal_bias
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MeshContextFlags(pub u8);

impl MeshContextFlags {
    pub const DEFAULT: Self = Self(0);
    pub const NOT_USED_IN_ANY_ASSET: Self = Self(1 << 0);
    pub const DONT_COMBINE: Self = Self(1 << 1);
    pub const TEMPORARY: Self = Self(1 << 2);
    pub const APPLY_NORMAL_BIAS: Self = Self(1 << 3);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }
}

impl std::ops::BitOr for MeshContextFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}
