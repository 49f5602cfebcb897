// Per-leaf flag register: mutation and deletion gates plus private bookkeeping bits.
use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign, Not};

#[derive(Clone, Copy, Default, Eq, PartialEq, Hash)]
pub struct LeafFlags(u32);

impl LeafFlags {
    pub const NONE: LeafFlags = LeafFlags(0);
    /// Blocks the single-leaf delete entry point only.
    pub const UNDELETABLE: LeafFlags = LeafFlags(1 << 0);
    /// Blocks value mutation only; flags stay writable.
    pub const IMMUTABLE: LeafFlags = LeafFlags(1 << 1);
    /// Bits 2..=15 belong to the library and carry no meaning yet.
    pub const RESERVED_MASK: u32 = 0x0000_fffc;
    /// First bit free for private host/plugin bookkeeping.
    pub const FIRST_CUSTOM: LeafFlags = LeafFlags(1 << 16);
    pub const CUSTOM_MASK: u32 = 0xffff_0000;

    pub const fn from_bits(bits: u32) -> Self {
        LeafFlags(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: LeafFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn is_immutable(self) -> bool {
        self.contains(LeafFlags::IMMUTABLE)
    }

    pub fn is_undeletable(self) -> bool {
        self.contains(LeafFlags::UNDELETABLE)
    }

    pub fn custom_bits(self) -> u32 {
        self.0 & Self::CUSTOM_MASK
    }

    pub fn insert(&mut self, other: LeafFlags) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: LeafFlags) {
        self.0 &= !other.0;
    }
}

impl BitOr for LeafFlags {
    type Output = LeafFlags;

    fn bitor(self, rhs: LeafFlags) -> LeafFlags {
        LeafFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for LeafFlags {
    fn bitor_assign(&mut self, rhs: LeafFlags) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for LeafFlags {
    type Output = LeafFlags;

    fn bitand(self, rhs: LeafFlags) -> LeafFlags {
        LeafFlags(self.0 & rhs.0)
    }
}

impl Not for LeafFlags {
    type Output = LeafFlags;

    fn not(self) -> LeafFlags {
        LeafFlags(!self.0)
    }
}

impl From<u32> for LeafFlags {
    fn from(bits: u32) -> Self {
        LeafFlags(bits)
    }
}

impl fmt::Debug for LeafFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        if self.is_undeletable() {
            names.push("UNDELETABLE".to_string());
        }
        if self.is_immutable() {
            names.push("IMMUTABLE".to_string());
        }
        let rest = self.0 & !(Self::UNDELETABLE.0 | Self::IMMUTABLE.0);
        if rest != 0 {
            names.push(format!("{rest:#x}"));
        }
        if names.is_empty() {
            write!(f, "LeafFlags(NONE)")
        } else {
            write!(f, "LeafFlags({})", names.join(" | "))
        }
    }
}
