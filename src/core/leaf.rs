// Leaf records and the insertion-ordered leaf table owned by each plant.
use bstr::{BStr, BString, ByteSlice};
use indexmap::IndexMap;

use crate::core::alloc::LEAF_OVERHEAD;
use crate::core::flags::LeafFlags;
use crate::core::seed::SeedType;
use crate::core::value::Values;

#[derive(Clone, Debug, PartialEq)]
pub struct Leaf {
    values: Values,
    flags: LeafFlags,
}

impl Leaf {
    pub fn new(values: Values) -> Self {
        Self {
            values,
            flags: LeafFlags::NONE,
        }
    }

    pub fn values(&self) -> &Values {
        &self.values
    }

    pub fn seed_type(&self) -> SeedType {
        self.values.seed_type()
    }

    pub fn num_elements(&self) -> usize {
        self.values.len()
    }

    pub fn flags(&self) -> LeafFlags {
        self.flags
    }

    pub(crate) fn set_flags(&mut self, flags: LeafFlags) {
        self.flags = flags;
    }

    /// Swaps in a new cell, returning the old one. Seed type is checked by the caller.
    pub(crate) fn replace_values(&mut self, values: Values) -> Values {
        std::mem::replace(&mut self.values, values)
    }
}

/// Bytes charged for a leaf under `key` holding `values`.
pub fn leaf_footprint(key: &[u8], values: &Values) -> usize {
    LEAF_OVERHEAD + key.len() + values.byte_size()
}

/// Keys are arbitrary NUL-free byte strings compared byte-for-byte; iteration
/// follows creation order and survives removals.
#[derive(Clone, Debug, Default)]
pub struct LeafTable {
    leaves: IndexMap<BString, Leaf>,
}

impl LeafTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    pub fn get(&self, key: &[u8]) -> Option<&Leaf> {
        self.leaves.get(key)
    }

    pub(crate) fn get_mut(&mut self, key: &[u8]) -> Option<&mut Leaf> {
        self.leaves.get_mut(key)
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        self.leaves.contains_key(key)
    }

    pub(crate) fn insert(&mut self, key: &[u8], leaf: Leaf) {
        self.leaves.insert(BString::from(key), leaf);
    }

    pub(crate) fn remove(&mut self, key: &[u8]) -> Option<Leaf> {
        self.leaves.shift_remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &BStr> {
        self.leaves.keys().map(|key| key.as_bstr())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&BStr, &Leaf)> {
        self.leaves.iter().map(|(key, leaf)| (key.as_bstr(), leaf))
    }

    /// Sum of every leaf footprint in the table.
    pub fn footprint(&self) -> usize {
        self.iter()
            .map(|(key, leaf)| leaf_footprint(key, leaf.values()))
            .sum()
    }
}
