// Plant arena and the leaf accessors: lifecycle, typed set/get, probes, flags, deletion.
//
// Plants live in generation-checked slots. A freed id stays stale forever, so a
// plugin holding an old handle gets NOSUCH_PLANT instead of touching reused memory.
// Plant-to-plant references are ids and are never followed or freed here.
use std::sync::Arc;

use bstr::{BString, ByteSlice};
use tracing::{debug, trace};

use crate::core::alloc::{Allocator, SystemAllocator};
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::flags::LeafFlags;
use crate::core::leaf::{Leaf, leaf_footprint};
use crate::core::plant::{Plant, TYPE_KEY};
use crate::core::seed::SeedType;
use crate::core::value::{PlantId, Seed, Value, Values};

struct Slot {
    generation: u32,
    plant: Option<Plant>,
}

pub struct Store {
    slots: Vec<Slot>,
    free_slots: Vec<u32>,
    live: usize,
    allocator: Arc<dyn Allocator>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        Self::with_allocator(Arc::new(SystemAllocator::new()))
    }

    pub fn with_allocator(allocator: Arc<dyn Allocator>) -> Self {
        Self {
            slots: Vec::new(),
            free_slots: Vec::new(),
            live: 0,
            allocator,
        }
    }

    pub fn allocator(&self) -> &Arc<dyn Allocator> {
        &self.allocator
    }

    pub fn plant_count(&self) -> usize {
        self.live
    }

    /// Live plant ids in slot order.
    pub fn plants(&self) -> Vec<PlantId> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.plant.is_some())
            .map(|(index, slot)| PlantId::new(index as u32, slot.generation))
            .collect()
    }

    // ─── Plant lifecycle ─────────────────────────────────────────────

    pub fn plant_new(&mut self, plant_type: i32) -> Result<PlantId> {
        self.charge(Plant::initial_footprint())?;
        let plant = Plant::new(plant_type);
        let id = match self.free_slots.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.plant = Some(plant);
                PlantId::new(index, slot.generation)
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 1,
                    plant: Some(plant),
                });
                PlantId::new(index, 1)
            }
        };
        self.live += 1;
        debug!(plant = id.raw(), plant_type, "plant created");
        Ok(id)
    }

    /// Frees every leaf regardless of IMMUTABLE/UNDELETABLE, then invalidates the id.
    pub fn plant_free(&mut self, plant: PlantId) -> Result<()> {
        let slot = self
            .slot_mut(plant)
            .ok_or_else(|| no_such_plant(plant))?;
        let freed = slot.plant.take().map(|plant| plant.footprint()).unwrap_or(0);
        slot.generation = match slot.generation.wrapping_add(1) {
            0 => 1,
            next => next,
        };
        self.free_slots.push(plant.index() as u32);
        self.live -= 1;
        self.allocator.release(freed);
        debug!(plant = plant.raw(), bytes = freed, "plant freed");
        Ok(())
    }

    pub fn plant(&self, plant: PlantId) -> Option<&Plant> {
        if plant.is_null() {
            return None;
        }
        self.slots
            .get(plant.index())
            .filter(|slot| slot.generation == plant.generation())
            .and_then(|slot| slot.plant.as_ref())
    }

    pub fn is_live(&self, plant: PlantId) -> bool {
        self.plant(plant).is_some()
    }

    pub fn plant_type(&self, plant: PlantId) -> Result<i32> {
        self.get_value::<i32>(plant, TYPE_KEY)
    }

    /// Accounted bytes of a plant and its leaves; `0` for an invalid id.
    pub fn plant_weigh(&self, plant: PlantId) -> usize {
        self.plant(plant).map(Plant::footprint).unwrap_or(0)
    }

    // ─── Probes (never fail) ─────────────────────────────────────────

    pub fn plant_has_leaf(&self, plant: PlantId, key: impl AsRef<[u8]>) -> bool {
        self.probe(plant, key.as_ref()).is_some()
    }

    /// Keys in creation order. Empty for an invalid plant, otherwise starts with "type".
    pub fn plant_list_leaves(&self, plant: PlantId) -> Vec<BString> {
        self.plant(plant)
            .map(|plant| plant.leaves().keys().map(BString::from).collect())
            .unwrap_or_default()
    }

    pub fn leaf_num_elements(&self, plant: PlantId, key: impl AsRef<[u8]>) -> usize {
        self.probe(plant, key.as_ref())
            .map(Leaf::num_elements)
            .unwrap_or(0)
    }

    pub fn leaf_element_size(&self, plant: PlantId, key: impl AsRef<[u8]>, idx: usize) -> usize {
        self.probe(plant, key.as_ref())
            .map(|leaf| leaf.values().element_size(idx))
            .unwrap_or(0)
    }

    /// `None` is the invalid-seed sentinel for absent leaves and bad input.
    pub fn leaf_seed_type(&self, plant: PlantId, key: impl AsRef<[u8]>) -> Option<SeedType> {
        self.probe(plant, key.as_ref()).map(Leaf::seed_type)
    }

    pub fn leaf_get_flags(&self, plant: PlantId, key: impl AsRef<[u8]>) -> LeafFlags {
        self.probe(plant, key.as_ref())
            .map(Leaf::flags)
            .unwrap_or(LeafFlags::NONE)
    }

    // ─── Values ──────────────────────────────────────────────────────

    /// Creates or replaces a leaf's value cell.
    ///
    /// An existing leaf must keep its seed type and must not be IMMUTABLE.
    /// The new footprint is charged before the old one is released, so a
    /// refused allocation leaves the previous value in place.
    pub fn set_values(&mut self, plant: PlantId, key: impl AsRef<[u8]>, values: Values) -> Result<()> {
        let key = key.as_ref();
        let allocator = Arc::clone(&self.allocator);
        let target = self.plant_mut(plant)?;
        check_key(plant, key)?;
        let seed = values.seed_type();
        match target.leaves_mut().get_mut(key) {
            Some(leaf) => {
                if leaf.seed_type() != seed {
                    return Err(Error::new(ErrorKind::WrongSeedType)
                        .with_message(format!(
                            "leaf holds {}, not {}",
                            leaf.seed_type().short_name(),
                            seed.short_name()
                        ))
                        .with_key(key)
                        .with_plant(plant.raw()));
                }
                if leaf.flags().is_immutable() {
                    debug!(plant = plant.raw(), key = %key.as_bstr(), "set blocked by IMMUTABLE");
                    return Err(Error::new(ErrorKind::Immutable)
                        .with_key(key)
                        .with_plant(plant.raw()));
                }
                allocator
                    .allocate(values.byte_size())
                    .map_err(|err| alloc_failure(plant, key, err))?;
                let old = leaf.replace_values(values);
                allocator.release(old.byte_size());
            }
            None => {
                allocator
                    .allocate(leaf_footprint(key, &values))
                    .map_err(|err| alloc_failure(plant, key, err))?;
                trace!(plant = plant.raw(), key = %key.as_bstr(), seed = seed.short_name(), "leaf created");
                target.leaves_mut().insert(key, Leaf::new(values));
            }
        }
        Ok(())
    }

    pub fn set<T: Seed>(&mut self, plant: PlantId, key: impl AsRef<[u8]>, items: &[T]) -> Result<()> {
        self.set_values(plant, key, T::into_values(items.to_vec()))
    }

    /// Fresh copy of the whole cell.
    pub fn get_values(&self, plant: PlantId, key: impl AsRef<[u8]>) -> Result<Values> {
        self.leaf(plant, key.as_ref())
            .map(|leaf| leaf.values().clone())
    }

    pub fn get_array<T: Seed>(&self, plant: PlantId, key: impl AsRef<[u8]>) -> Result<Vec<T>> {
        let key = key.as_ref();
        let leaf = self.leaf(plant, key)?;
        typed_slice::<T>(plant, key, leaf).map(<[T]>::to_vec)
    }

    /// Element 0 of the leaf. Extra elements are ignored.
    pub fn get_value<T: Seed>(&self, plant: PlantId, key: impl AsRef<[u8]>) -> Result<T> {
        let key = key.as_ref();
        let leaf = self.leaf(plant, key)?;
        let items = typed_slice::<T>(plant, key, leaf)?;
        match items.first() {
            Some(first) => Ok(first.clone()),
            None => T::read_empty().ok_or_else(|| no_such_element(plant, key, 0)),
        }
    }

    pub fn get_element<T: Seed>(&self, plant: PlantId, key: impl AsRef<[u8]>, idx: usize) -> Result<T> {
        let key = key.as_ref();
        let leaf = self.leaf(plant, key)?;
        typed_slice::<T>(plant, key, leaf)?
            .get(idx)
            .cloned()
            .ok_or_else(|| no_such_element(plant, key, idx))
    }

    /// Untyped indexed read, used by dumps and the C bridge.
    pub fn get_element_value(&self, plant: PlantId, key: impl AsRef<[u8]>, idx: usize) -> Result<Value> {
        let key = key.as_ref();
        self.leaf(plant, key)?
            .values()
            .element(idx)
            .ok_or_else(|| no_such_element(plant, key, idx))
    }

    // ─── Flags and deletion ──────────────────────────────────────────

    /// Overwrites the flag register. Not gated by the leaf's own IMMUTABLE bit.
    pub fn leaf_set_flags(&mut self, plant: PlantId, key: impl AsRef<[u8]>, flags: LeafFlags) -> Result<()> {
        let leaf = self.leaf_mut(plant, key.as_ref())?;
        leaf.set_flags(flags);
        Ok(())
    }

    /// ORs `bits` into the register and returns the previous flags.
    pub fn leaf_set_flagbits(&mut self, plant: PlantId, key: impl AsRef<[u8]>, bits: LeafFlags) -> Result<LeafFlags> {
        let leaf = self.leaf_mut(plant, key.as_ref())?;
        let previous = leaf.flags();
        leaf.set_flags(previous | bits);
        Ok(previous)
    }

    /// Clears `bits` from the register and returns the previous flags.
    pub fn leaf_clear_flagbits(&mut self, plant: PlantId, key: impl AsRef<[u8]>, bits: LeafFlags) -> Result<LeafFlags> {
        let leaf = self.leaf_mut(plant, key.as_ref())?;
        let previous = leaf.flags();
        leaf.set_flags(previous & !bits);
        Ok(previous)
    }

    /// Removes one leaf. UNDELETABLE leaves and the reserved "type" leaf are refused.
    pub fn leaf_delete(&mut self, plant: PlantId, key: impl AsRef<[u8]>) -> Result<()> {
        let key = key.as_ref();
        let allocator = Arc::clone(&self.allocator);
        let target = self.plant_mut(plant)?;
        check_key(plant, key)?;
        let leaf = target
            .leaves()
            .get(key)
            .ok_or_else(|| no_such_leaf(plant, key))?;
        if leaf.flags().is_undeletable() || key == TYPE_KEY.as_bytes() {
            debug!(plant = plant.raw(), key = %key.as_bstr(), "delete blocked");
            return Err(Error::new(ErrorKind::Undeletable)
                .with_key(key)
                .with_plant(plant.raw()));
        }
        if let Some(removed) = target.leaves_mut().remove(key) {
            allocator.release(leaf_footprint(key, removed.values()));
            trace!(plant = plant.raw(), key = %key.as_bstr(), "leaf deleted");
        }
        Ok(())
    }

    // ─── Internal lookup ─────────────────────────────────────────────

    fn slot_mut(&mut self, plant: PlantId) -> Option<&mut Slot> {
        if plant.is_null() {
            return None;
        }
        self.slots
            .get_mut(plant.index())
            .filter(|slot| slot.generation == plant.generation() && slot.plant.is_some())
    }

    fn plant_mut(&mut self, plant: PlantId) -> Result<&mut Plant> {
        self.slot_mut(plant)
            .and_then(|slot| slot.plant.as_mut())
            .ok_or_else(|| no_such_plant(plant))
    }

    fn probe(&self, plant: PlantId, key: &[u8]) -> Option<&Leaf> {
        if key.is_empty() {
            return None;
        }
        self.plant(plant)?.leaves().get(key)
    }

    fn leaf(&self, plant: PlantId, key: &[u8]) -> Result<&Leaf> {
        let target = self.plant(plant).ok_or_else(|| no_such_plant(plant))?;
        check_key(plant, key)?;
        target
            .leaves()
            .get(key)
            .ok_or_else(|| no_such_leaf(plant, key))
    }

    fn leaf_mut(&mut self, plant: PlantId, key: &[u8]) -> Result<&mut Leaf> {
        let target = self.plant_mut(plant)?;
        check_key(plant, key)?;
        target
            .leaves_mut()
            .get_mut(key)
            .ok_or_else(|| no_such_leaf(plant, key))
    }

    fn charge(&self, bytes: usize) -> Result<()> {
        self.allocator.allocate(bytes).map_err(|err| {
            debug!(bytes, "plant allocation refused");
            Error::new(ErrorKind::MemoryAllocation).with_message(err.to_string())
        })
    }
}

// Keys must be expressible as C strings: non-empty and NUL-free.
fn check_key(plant: PlantId, key: &[u8]) -> Result<()> {
    if key.is_empty() {
        return Err(Error::new(ErrorKind::NoSuchLeaf)
            .with_message("empty key")
            .with_plant(plant.raw()));
    }
    if key.contains(&0) {
        return Err(Error::new(ErrorKind::NoSuchLeaf)
            .with_message("key contains NUL")
            .with_key(key)
            .with_plant(plant.raw()));
    }
    Ok(())
}

fn typed_slice<'a, T: Seed>(plant: PlantId, key: &[u8], leaf: &'a Leaf) -> Result<&'a [T]> {
    T::slice(leaf.values()).ok_or_else(|| {
        Error::new(ErrorKind::WrongSeedType)
            .with_message(format!(
                "leaf holds {}, not {}",
                leaf.seed_type().short_name(),
                T::SEED.short_name()
            ))
            .with_key(key)
            .with_plant(plant.raw())
    })
}

fn no_such_plant(plant: PlantId) -> Error {
    Error::new(ErrorKind::NoSuchPlant).with_plant(plant.raw())
}

fn no_such_leaf(plant: PlantId, key: &[u8]) -> Error {
    Error::new(ErrorKind::NoSuchLeaf)
        .with_key(key)
        .with_plant(plant.raw())
}

fn no_such_element(plant: PlantId, key: &[u8], idx: usize) -> Error {
    Error::new(ErrorKind::NoSuchElement)
        .with_message(format!("index {idx} out of range"))
        .with_key(key)
        .with_plant(plant.raw())
}

fn alloc_failure(plant: PlantId, key: &[u8], err: crate::core::alloc::AllocError) -> Error {
    debug!(plant = plant.raw(), key = %key.as_bstr(), requested = err.requested, "leaf allocation refused");
    Error::new(ErrorKind::MemoryAllocation)
        .with_message(err.to_string())
        .with_key(key)
        .with_plant(plant.raw())
}
