// Value cells: homogeneous element arrays tagged by seed type, with owned/borrowed split.
use std::ffi::c_void;
use std::fmt;

use bstr::BString;

use crate::core::seed::SeedType;

/// Arena handle for a plant. Raw value `0` is never issued and reads as "no plant".
#[derive(Clone, Copy, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct PlantId(u64);

impl PlantId {
    pub const NULL: PlantId = PlantId(0);

    pub(crate) fn new(index: u32, generation: u32) -> Self {
        PlantId(((generation as u64) << 32) | index as u64)
    }

    pub const fn from_raw(raw: u64) -> Self {
        PlantId(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }

    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    pub(crate) fn index(self) -> usize {
        (self.0 & 0xffff_ffff) as usize
    }

    pub(crate) fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }
}

impl fmt::Debug for PlantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "PlantId(NULL)")
        } else {
            write!(f, "PlantId({}v{})", self.index(), self.generation())
        }
    }
}

/// Opaque data address. Copied by value, never dereferenced or freed by the store.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct VoidPtr(usize);

impl VoidPtr {
    pub const NULL: VoidPtr = VoidPtr(0);

    pub fn from_ptr<T>(ptr: *const T) -> Self {
        VoidPtr(ptr as usize)
    }

    pub const fn from_addr(addr: usize) -> Self {
        VoidPtr(addr)
    }

    pub const fn addr(self) -> usize {
        self.0
    }

    pub fn as_ptr(self) -> *mut c_void {
        self.0 as *mut c_void
    }

    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

/// Opaque function address. Same ownership rules as [`VoidPtr`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct FuncPtr(usize);

impl FuncPtr {
    pub const NULL: FuncPtr = FuncPtr(0);

    pub const fn from_addr(addr: usize) -> Self {
        FuncPtr(addr)
    }

    pub const fn addr(self) -> usize {
        self.0
    }

    pub fn as_ptr(self) -> *const c_void {
        self.0 as *const c_void
    }

    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

/// One element of any seed type.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Int(i32),
    Double(f64),
    Boolean(bool),
    Str(BString),
    Int64(i64),
    UInt(u32),
    UInt64(u64),
    FuncPtr(FuncPtr),
    VoidPtr(VoidPtr),
    PlantPtr(PlantId),
}

impl Value {
    pub fn seed_type(&self) -> SeedType {
        match self {
            Value::Int(_) => SeedType::Int,
            Value::Double(_) => SeedType::Double,
            Value::Boolean(_) => SeedType::Boolean,
            Value::Str(_) => SeedType::String,
            Value::Int64(_) => SeedType::Int64,
            Value::UInt(_) => SeedType::UInt,
            Value::UInt64(_) => SeedType::UInt64,
            Value::FuncPtr(_) => SeedType::FuncPtr,
            Value::VoidPtr(_) => SeedType::VoidPtr,
            Value::PlantPtr(_) => SeedType::PlantPtr,
        }
    }
}

/// The value cell of a leaf: `0..N` elements of a single seed type.
///
/// `Str` is the only owning variant; its strings are byte strings, deep-copied
/// in and out without any encoding check.
/// `FuncPtr`, `VoidPtr` and `PlantPtr` hold addresses or ids that the store
/// never frees or follows.
#[derive(Clone, Debug, PartialEq)]
pub enum Values {
    Int(Vec<i32>),
    Double(Vec<f64>),
    Boolean(Vec<bool>),
    Str(Vec<BString>),
    Int64(Vec<i64>),
    UInt(Vec<u32>),
    UInt64(Vec<u64>),
    FuncPtr(Vec<FuncPtr>),
    VoidPtr(Vec<VoidPtr>),
    PlantPtr(Vec<PlantId>),
}

macro_rules! each_variant {
    ($values:expr, $items:ident => $body:expr) => {
        match $values {
            Values::Int($items) => $body,
            Values::Double($items) => $body,
            Values::Boolean($items) => $body,
            Values::Str($items) => $body,
            Values::Int64($items) => $body,
            Values::UInt($items) => $body,
            Values::UInt64($items) => $body,
            Values::FuncPtr($items) => $body,
            Values::VoidPtr($items) => $body,
            Values::PlantPtr($items) => $body,
        }
    };
}

impl Values {
    /// A zero-element cell of the given seed type.
    pub fn empty(seed: SeedType) -> Self {
        match seed {
            SeedType::Int => Values::Int(Vec::new()),
            SeedType::Double => Values::Double(Vec::new()),
            SeedType::Boolean => Values::Boolean(Vec::new()),
            SeedType::String => Values::Str(Vec::new()),
            SeedType::Int64 => Values::Int64(Vec::new()),
            SeedType::UInt => Values::UInt(Vec::new()),
            SeedType::UInt64 => Values::UInt64(Vec::new()),
            SeedType::FuncPtr => Values::FuncPtr(Vec::new()),
            SeedType::VoidPtr => Values::VoidPtr(Vec::new()),
            SeedType::PlantPtr => Values::PlantPtr(Vec::new()),
        }
    }

    pub fn seed_type(&self) -> SeedType {
        match self {
            Values::Int(_) => SeedType::Int,
            Values::Double(_) => SeedType::Double,
            Values::Boolean(_) => SeedType::Boolean,
            Values::Str(_) => SeedType::String,
            Values::Int64(_) => SeedType::Int64,
            Values::UInt(_) => SeedType::UInt,
            Values::UInt64(_) => SeedType::UInt64,
            Values::FuncPtr(_) => SeedType::FuncPtr,
            Values::VoidPtr(_) => SeedType::VoidPtr,
            Values::PlantPtr(_) => SeedType::PlantPtr,
        }
    }

    pub fn len(&self) -> usize {
        each_variant!(self, items => items.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn element(&self, idx: usize) -> Option<Value> {
        match self {
            Values::Int(items) => items.get(idx).copied().map(Value::Int),
            Values::Double(items) => items.get(idx).copied().map(Value::Double),
            Values::Boolean(items) => items.get(idx).copied().map(Value::Boolean),
            Values::Str(items) => items.get(idx).cloned().map(Value::Str),
            Values::Int64(items) => items.get(idx).copied().map(Value::Int64),
            Values::UInt(items) => items.get(idx).copied().map(Value::UInt),
            Values::UInt64(items) => items.get(idx).copied().map(Value::UInt64),
            Values::FuncPtr(items) => items.get(idx).copied().map(Value::FuncPtr),
            Values::VoidPtr(items) => items.get(idx).copied().map(Value::VoidPtr),
            Values::PlantPtr(items) => items.get(idx).copied().map(Value::PlantPtr),
        }
    }

    pub fn elements(&self) -> Vec<Value> {
        (0..self.len()).filter_map(|idx| self.element(idx)).collect()
    }

    /// Byte width of one element; strings report their byte length. `0` past the end.
    pub fn element_size(&self, idx: usize) -> usize {
        if idx >= self.len() {
            return 0;
        }
        match self {
            Values::Str(items) => items[idx].len(),
            other => other.seed_type().element_size().unwrap_or(0),
        }
    }

    /// Total payload bytes held by the cell.
    pub fn byte_size(&self) -> usize {
        match self {
            Values::Str(items) => items.iter().map(|item| item.len()).sum(),
            other => other.len() * other.seed_type().element_size().unwrap_or(0),
        }
    }

    /// Plant ids referenced by this cell (empty unless it is a `PlantPtr` cell).
    pub fn plant_refs(&self) -> &[PlantId] {
        match self {
            Values::PlantPtr(items) => items,
            _ => &[],
        }
    }

    /// Builds a cell from loose elements; every element must match `seed`.
    pub fn from_elements(seed: SeedType, elements: Vec<Value>) -> Option<Self> {
        let mut values = Values::empty(seed);
        for element in elements {
            match (&mut values, element) {
                (Values::Int(items), Value::Int(v)) => items.push(v),
                (Values::Double(items), Value::Double(v)) => items.push(v),
                (Values::Boolean(items), Value::Boolean(v)) => items.push(v),
                (Values::Str(items), Value::Str(v)) => items.push(v),
                (Values::Int64(items), Value::Int64(v)) => items.push(v),
                (Values::UInt(items), Value::UInt(v)) => items.push(v),
                (Values::UInt64(items), Value::UInt64(v)) => items.push(v),
                (Values::FuncPtr(items), Value::FuncPtr(v)) => items.push(v),
                (Values::VoidPtr(items), Value::VoidPtr(v)) => items.push(v),
                (Values::PlantPtr(items), Value::PlantPtr(v)) => items.push(v),
                _ => return None,
            }
        }
        Some(values)
    }
}

/// Rust element types that can live in a leaf.
pub trait Seed: Clone + Sized {
    const SEED: SeedType;

    fn into_values(items: Vec<Self>) -> Values;

    fn slice(values: &Values) -> Option<&[Self]>;

    /// What a scalar read of a zero-element leaf yields; `None` reports NOSUCH_ELEMENT.
    fn read_empty() -> Option<Self> {
        None
    }
}

macro_rules! impl_seed {
    ($ty:ty, $seed:ident, $variant:ident) => {
        impl Seed for $ty {
            const SEED: SeedType = SeedType::$seed;

            fn into_values(items: Vec<Self>) -> Values {
                Values::$variant(items)
            }

            fn slice(values: &Values) -> Option<&[Self]> {
                match values {
                    Values::$variant(items) => Some(items),
                    _ => None,
                }
            }
        }
    };
}

impl_seed!(i32, Int, Int);
impl_seed!(f64, Double, Double);
impl_seed!(bool, Boolean, Boolean);
impl_seed!(i64, Int64, Int64);
impl_seed!(u32, UInt, UInt);
impl_seed!(u64, UInt64, UInt64);
impl_seed!(FuncPtr, FuncPtr, FuncPtr);
impl_seed!(VoidPtr, VoidPtr, VoidPtr);
impl_seed!(PlantId, PlantPtr, PlantPtr);

// An emptied string leaf reads back as the empty string.
impl Seed for BString {
    const SEED: SeedType = SeedType::String;

    fn into_values(items: Vec<Self>) -> Values {
        Values::Str(items)
    }

    fn slice(values: &Values) -> Option<&[Self]> {
        match values {
            Values::Str(items) => Some(items),
            _ => None,
        }
    }

    fn read_empty() -> Option<Self> {
        Some(BString::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plant_id_packs_index_and_generation() {
        let id = PlantId::new(7, 3);
        assert_eq!(id.index(), 7);
        assert_eq!(id.generation(), 3);
        assert!(!id.is_null());
        assert_eq!(PlantId::from_raw(id.raw()), id);
        assert!(PlantId::NULL.is_null());
    }

    #[test]
    fn element_sizes_follow_seed_widths() {
        let ints = Values::Int(vec![1, 2, 3]);
        assert_eq!(ints.len(), 3);
        assert_eq!(ints.element_size(0), 4);
        assert_eq!(ints.element_size(3), 0);
        assert_eq!(ints.byte_size(), 12);

        let strings = Values::Str(vec!["abc".into(), BString::default(), BString::from(&b"caf\xe9"[..])]);
        assert_eq!(strings.element_size(0), 3);
        assert_eq!(strings.element_size(1), 0);
        assert_eq!(strings.element_size(2), 4);
        assert_eq!(strings.byte_size(), 7);
    }

    #[test]
    fn seed_slice_rejects_other_variants() {
        let values = i64::into_values(vec![5, 6]);
        assert_eq!(values.seed_type(), SeedType::Int64);
        assert_eq!(i64::slice(&values), Some(&[5i64, 6][..]));
        assert!(i32::slice(&values).is_none());
    }

    #[test]
    fn from_elements_requires_homogeneous_input() {
        let ok = Values::from_elements(SeedType::Int, vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(ok, Some(Values::Int(vec![1, 2])));

        let mixed = Values::from_elements(SeedType::Int, vec![Value::Int(1), Value::Double(2.0)]);
        assert!(mixed.is_none());

        let empty = Values::from_elements(SeedType::String, Vec::new());
        assert_eq!(empty, Some(Values::Str(Vec::new())));
    }

    #[test]
    fn pointer_cells_copy_addresses_verbatim() {
        let target = 42u32;
        let ptr = VoidPtr::from_ptr(&target as *const u32);
        let values = Values::VoidPtr(vec![ptr, VoidPtr::NULL]);
        assert_eq!(values.element(0), Some(Value::VoidPtr(ptr)));
        assert_eq!(values.element(1), Some(Value::VoidPtr(VoidPtr::NULL)));
        assert_eq!(ptr.as_ptr() as usize, &target as *const u32 as usize);
    }
}
