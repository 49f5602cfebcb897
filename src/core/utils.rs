// Plant-level helpers built only on the public accessors: copying, duplication, bulk flags.
use bstr::BString;
use tracing::debug;

use crate::core::error::{Error, ErrorKind, Result};
use crate::core::flags::LeafFlags;
use crate::core::plant::TYPE_KEY;
use crate::core::store::Store;
use crate::core::value::PlantId;

impl Store {
    /// Copies the cell of `src_key` on `src` into `dst_key` on `dst`.
    ///
    /// Plant references are copied as ids; the referenced plants are not cloned.
    /// The destination leaf keeps its own flags.
    pub fn leaf_copy(
        &mut self,
        dst: PlantId,
        dst_key: impl AsRef<[u8]>,
        src: PlantId,
        src_key: impl AsRef<[u8]>,
    ) -> Result<()> {
        let values = self.get_values(src, src_key)?;
        self.set_values(dst, dst_key, values)
    }

    /// New plant with the same type and the same leaf values, in the same order.
    /// Flags are not copied.
    pub fn plant_copy(&mut self, src: PlantId) -> Result<PlantId> {
        let plant_type = self.plant_type(src)?;
        let copy = self.plant_new(plant_type)?;
        for key in self.plant_list_leaves(src) {
            if key == TYPE_KEY {
                continue;
            }
            if let Err(err) = self.leaf_copy(copy, &key, src, &key) {
                self.plant_free(copy)?;
                return Err(err);
            }
        }
        Ok(copy)
    }

    /// Makes `dst` mirror `src`. Both plants must share a type.
    ///
    /// Unless `add` is set, deletable leaves of `dst` are removed first. Source
    /// leaves that collide with IMMUTABLE or differently-typed destination leaves
    /// are skipped.
    pub fn plant_duplicate(&mut self, dst: PlantId, src: PlantId, add: bool) -> Result<()> {
        let dst_type = self.plant_type(dst)?;
        let src_type = self.plant_type(src)?;
        if dst_type != src_type {
            return Err(Error::new(ErrorKind::WrongPlantType)
                .with_message(format!("destination is type {dst_type}, source is {src_type}"))
                .with_plant(dst.raw()));
        }

        if !add {
            for key in self.plant_list_leaves(dst) {
                if key == TYPE_KEY {
                    continue;
                }
                match self.leaf_delete(dst, &key) {
                    Err(err) if err.kind() == ErrorKind::Undeletable => {}
                    other => other?,
                }
            }
        }

        for key in self.plant_list_leaves(src) {
            if key == TYPE_KEY {
                continue;
            }
            match self.leaf_copy(dst, &key, src, &key) {
                Err(err) if matches!(err.kind(), ErrorKind::Immutable | ErrorKind::WrongSeedType) => {
                    debug!(plant = dst.raw(), key = %key, "duplicate skipped leaf");
                }
                other => other?,
            }
        }
        Ok(())
    }

    /// Sets `flags` on every leaf whose key does not start with `ignore_prefix`.
    pub fn add_plant_flags(&mut self, plant: PlantId, flags: LeafFlags, ignore_prefix: Option<&str>) -> Result<()> {
        for key in self.selected_keys(plant, ignore_prefix)? {
            self.leaf_set_flagbits(plant, &key, flags)?;
        }
        Ok(())
    }

    /// Clears `flags` on every leaf whose key does not start with `ignore_prefix`.
    pub fn clear_plant_flags(&mut self, plant: PlantId, flags: LeafFlags, ignore_prefix: Option<&str>) -> Result<()> {
        for key in self.selected_keys(plant, ignore_prefix)? {
            self.leaf_clear_flagbits(plant, &key, flags)?;
        }
        Ok(())
    }

    /// Rewrites the "type" leaf. Afterwards its flags are exactly IMMUTABLE,
    /// whatever they were before, and stay so even when the write fails.
    pub fn plant_mutate_type(&mut self, plant: PlantId, new_type: i32) -> Result<()> {
        self.leaf_set_flags(plant, TYPE_KEY, LeafFlags::NONE)?;
        let written = self.set_int(plant, TYPE_KEY, new_type);
        let relocked = self.leaf_set_flags(plant, TYPE_KEY, LeafFlags::IMMUTABLE);
        written.and(relocked)
    }

    fn selected_keys(&self, plant: PlantId, ignore_prefix: Option<&str>) -> Result<Vec<BString>> {
        if !self.is_live(plant) {
            return Err(Error::new(ErrorKind::NoSuchPlant).with_plant(plant.raw()));
        }
        Ok(self
            .plant_list_leaves(plant)
            .into_iter()
            .filter(|key| ignore_prefix.is_none_or(|prefix| !key.starts_with(prefix.as_bytes())))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::plant::types;

    #[test]
    fn plant_copy_keeps_order_and_drops_flags() {
        let mut store = Store::new();
        let src = store.plant_new(types::PARAMETER).expect("plant");
        store.set_string(src, "name", Some("gain")).expect("set");
        store.set_double_array(src, "range", &[0.0, 1.0]).expect("set");
        store.set_int_array(src, "empty", &[]).expect("set");
        store
            .leaf_set_flags(src, "name", LeafFlags::IMMUTABLE)
            .expect("flags");

        let copy = store.plant_copy(src).expect("copy");
        assert_ne!(copy, src);
        assert_eq!(store.plant_list_leaves(copy), store.plant_list_leaves(src));
        assert_eq!(store.plant_type(copy).expect("type"), types::PARAMETER);
        assert_eq!(store.get_double_array(copy, "range").expect("get"), [0.0, 1.0]);
        assert_eq!(store.leaf_num_elements(copy, "empty"), 0);
        assert!(store.leaf_get_flags(copy, "name").is_empty());
    }

    #[test]
    fn duplicate_requires_same_type() {
        let mut store = Store::new();
        let a = store.plant_new(types::CHANNEL).expect("plant");
        let b = store.plant_new(types::PARAMETER).expect("plant");
        let err = store.plant_duplicate(a, b, false).expect_err("types differ");
        assert_eq!(err.kind(), ErrorKind::WrongPlantType);
    }

    #[test]
    fn duplicate_replaces_deletable_and_skips_protected_leaves() {
        let mut store = Store::new();
        let dst = store.plant_new(types::CHANNEL).expect("plant");
        let src = store.plant_new(types::CHANNEL).expect("plant");

        store.set_int(dst, "stale", 1).expect("set");
        store.set_int(dst, "pinned", 2).expect("set");
        store
            .leaf_set_flags(dst, "pinned", LeafFlags::UNDELETABLE)
            .expect("flags");
        store.set_int(dst, "frozen", 3).expect("set");
        store
            .leaf_set_flags(dst, "frozen", LeafFlags::IMMUTABLE | LeafFlags::UNDELETABLE)
            .expect("flags");
        store.set_string(dst, "width", Some("wide")).expect("set");
        store
            .leaf_set_flags(dst, "width", LeafFlags::UNDELETABLE)
            .expect("flags");

        store.set_int(src, "frozen", 30).expect("set");
        store.set_int(src, "width", 640).expect("set");
        store.set_int(src, "height", 480).expect("set");

        store.plant_duplicate(dst, src, false).expect("duplicate");

        assert!(!store.plant_has_leaf(dst, "stale"));
        assert_eq!(store.get_int(dst, "pinned").expect("pinned"), 2);
        assert_eq!(store.get_int(dst, "frozen").expect("frozen"), 3);
        assert_eq!(store.get_string(dst, "width").expect("width"), "wide");
        assert_eq!(store.get_int(dst, "height").expect("height"), 480);
    }

    #[test]
    fn duplicate_with_add_keeps_existing_leaves() {
        let mut store = Store::new();
        let dst = store.plant_new(types::GUI).expect("plant");
        let src = store.plant_new(types::GUI).expect("plant");
        store.set_int(dst, "keep", 1).expect("set");
        store.set_int(src, "new", 2).expect("set");

        store.plant_duplicate(dst, src, true).expect("duplicate");
        assert_eq!(store.plant_list_leaves(dst), [TYPE_KEY, "keep", "new"]);
    }

    #[test]
    fn bulk_flags_honour_ignore_prefix() {
        let mut store = Store::new();
        let plant = store.plant_new(types::FILTER_CLASS).expect("plant");
        store.set_int(plant, "flags", 0).expect("set");
        store.set_voidptr(plant, "plugin_state", Default::default()).expect("set");

        let locked = LeafFlags::IMMUTABLE | LeafFlags::UNDELETABLE;
        store
            .add_plant_flags(plant, locked, Some("plugin_"))
            .expect("add flags");
        assert_eq!(store.leaf_get_flags(plant, TYPE_KEY), locked);
        assert_eq!(store.leaf_get_flags(plant, "flags"), locked);
        assert!(store.leaf_get_flags(plant, "plugin_state").is_empty());

        store
            .clear_plant_flags(plant, LeafFlags::IMMUTABLE, None)
            .expect("clear flags");
        assert_eq!(store.leaf_get_flags(plant, "flags"), LeafFlags::UNDELETABLE);

        let err = store
            .add_plant_flags(PlantId::NULL, locked, None)
            .expect_err("null plant");
        assert_eq!(err.kind(), ErrorKind::NoSuchPlant);
    }

    #[test]
    fn mutate_type_relocks_type_leaf() {
        let mut store = Store::new();
        let plant = store.plant_new(types::FILTER_CLASS).expect("plant");
        store
            .leaf_set_flags(
                plant,
                TYPE_KEY,
                LeafFlags::IMMUTABLE | LeafFlags::UNDELETABLE | LeafFlags::FIRST_CUSTOM,
            )
            .expect("lock");
        store
            .plant_mutate_type(plant, types::FILTER_INSTANCE)
            .expect("mutate");
        assert_eq!(store.plant_type(plant).expect("type"), types::FILTER_INSTANCE);
        assert_eq!(store.leaf_get_flags(plant, TYPE_KEY), LeafFlags::IMMUTABLE);
        let err = store.set_int(plant, TYPE_KEY, 1).expect_err("locked");
        assert_eq!(err.kind(), ErrorKind::Immutable);

        let err = store
            .plant_mutate_type(PlantId::NULL, types::GUI)
            .expect_err("null plant");
        assert_eq!(err.kind(), ErrorKind::NoSuchPlant);
    }
}
