// Typed convenience accessors; each is a one-line specialisation of the generic set/get.
use bstr::BString;

use crate::core::error::Result;
use crate::core::store::Store;
use crate::core::value::{FuncPtr, PlantId, VoidPtr};

macro_rules! scalar_accessors {
    ($($set:ident, $get:ident, $ty:ty;)*) => {
        $(
            pub fn $set(&mut self, plant: PlantId, key: impl AsRef<[u8]>, value: $ty) -> Result<()> {
                self.set::<$ty>(plant, key, &[value])
            }

            pub fn $get(&self, plant: PlantId, key: impl AsRef<[u8]>) -> Result<$ty> {
                self.get_value::<$ty>(plant, key)
            }
        )*
    };
}

macro_rules! array_accessors {
    ($($set:ident, $get:ident, $ty:ty;)*) => {
        $(
            pub fn $set(&mut self, plant: PlantId, key: impl AsRef<[u8]>, values: &[$ty]) -> Result<()> {
                self.set::<$ty>(plant, key, values)
            }

            pub fn $get(&self, plant: PlantId, key: impl AsRef<[u8]>) -> Result<Vec<$ty>> {
                self.get_array::<$ty>(plant, key)
            }
        )*
    };
}

impl Store {
    scalar_accessors! {
        set_int, get_int, i32;
        set_double, get_double, f64;
        set_boolean, get_boolean, bool;
        set_int64, get_int64, i64;
        set_uint, get_uint, u32;
        set_uint64, get_uint64, u64;
        set_voidptr, get_voidptr, VoidPtr;
        set_funcptr, get_funcptr, FuncPtr;
        set_plantptr, get_plantptr, PlantId;
    }

    array_accessors! {
        set_int_array, get_int_array, i32;
        set_double_array, get_double_array, f64;
        set_boolean_array, get_boolean_array, bool;
        set_int64_array, get_int64_array, i64;
        set_uint_array, get_uint_array, u32;
        set_uint64_array, get_uint64_array, u64;
        set_voidptr_array, get_voidptr_array, VoidPtr;
        set_funcptr_array, get_funcptr_array, FuncPtr;
        set_plantptr_array, get_plantptr_array, PlantId;
    }

    /// `None` stores a zero-element string leaf, which reads back as `""`.
    pub fn set_string(&mut self, plant: PlantId, key: impl AsRef<[u8]>, value: Option<&str>) -> Result<()> {
        let items: Vec<BString> = value.map(BString::from).into_iter().collect();
        self.set::<BString>(plant, key, &items)
    }

    /// String elements are stored as raw bytes; decode with `to_str` or `to_str_lossy`.
    pub fn get_string(&self, plant: PlantId, key: impl AsRef<[u8]>) -> Result<BString> {
        self.get_value::<BString>(plant, key)
    }

    pub fn set_string_array(&mut self, plant: PlantId, key: impl AsRef<[u8]>, values: &[&str]) -> Result<()> {
        let items: Vec<BString> = values.iter().copied().map(BString::from).collect();
        self.set::<BString>(plant, key, &items)
    }

    pub fn get_string_array(&self, plant: PlantId, key: impl AsRef<[u8]>) -> Result<Vec<BString>> {
        self.get_array::<BString>(plant, key)
    }
}
