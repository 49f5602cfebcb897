// Seed type tags: the closed set of element kinds a leaf can hold.
use std::mem::size_of;

/// Code returned by seed-type probes for an absent leaf or invalid input.
pub const SEED_INVALID: i32 = 0;
/// Codes at or above this value denote pointer-like, non-owning seeds.
pub const FIRST_PTR_TYPE: i32 = 64;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[repr(i32)]
pub enum SeedType {
    Int = 1,
    Double = 2,
    Boolean = 3,
    String = 4,
    Int64 = 5,
    UInt = 6,
    UInt64 = 7,
    FuncPtr = 64,
    VoidPtr = 65,
    PlantPtr = 66,
}

impl SeedType {
    pub const ALL: [SeedType; 10] = [
        SeedType::Int,
        SeedType::Double,
        SeedType::Boolean,
        SeedType::String,
        SeedType::Int64,
        SeedType::UInt,
        SeedType::UInt64,
        SeedType::FuncPtr,
        SeedType::VoidPtr,
        SeedType::PlantPtr,
    ];

    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|seed| seed.code() == code)
    }

    pub fn is_pointer(self) -> bool {
        self.code() >= FIRST_PTR_TYPE
    }

    /// Owned seeds are deep-copied on every set and every get.
    pub fn is_owned(self) -> bool {
        self == SeedType::String
    }

    /// Fixed element width in bytes, `None` for strings (width is the text length).
    pub fn element_size(self) -> Option<usize> {
        match self {
            SeedType::Int | SeedType::Boolean | SeedType::UInt => Some(4),
            SeedType::Double | SeedType::Int64 | SeedType::UInt64 => Some(8),
            SeedType::PlantPtr => Some(size_of::<u64>()),
            SeedType::FuncPtr | SeedType::VoidPtr => Some(size_of::<usize>()),
            SeedType::String => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SeedType::Int => "integer",
            SeedType::Double => "double",
            SeedType::Boolean => "boolean",
            SeedType::String => "string",
            SeedType::Int64 => "int64",
            SeedType::UInt => "unsigned integer",
            SeedType::UInt64 => "uint64",
            SeedType::FuncPtr => "function pointer",
            SeedType::VoidPtr => "void *",
            SeedType::PlantPtr => "plant pointer",
        }
    }

    pub fn short_name(self) -> &'static str {
        match self {
            SeedType::Int => "int",
            SeedType::Double => "double",
            SeedType::Boolean => "boolean",
            SeedType::String => "string",
            SeedType::Int64 => "int64",
            SeedType::UInt => "uint",
            SeedType::UInt64 => "uint64",
            SeedType::FuncPtr => "funcptr",
            SeedType::VoidPtr => "voidptr",
            SeedType::PlantPtr => "plantptr",
        }
    }

    pub fn from_short_name(name: &str) -> Option<Self> {
        match name {
            "bool" => Some(SeedType::Boolean),
            "uint32" => Some(SeedType::UInt),
            "int32" => Some(SeedType::Int),
            _ => Self::ALL.into_iter().find(|seed| seed.short_name() == name),
        }
    }

    /// C declaration type used when emitting struct headers.
    pub fn ctype(self) -> &'static str {
        match self {
            SeedType::Int => "int32_t",
            SeedType::Double => "double",
            SeedType::Boolean => "int32_t",
            SeedType::String => "char *",
            SeedType::Int64 => "int64_t",
            SeedType::UInt => "uint32_t",
            SeedType::UInt64 => "uint64_t",
            SeedType::FuncPtr => "pst_funcptr_t",
            SeedType::VoidPtr => "void *",
            SeedType::PlantPtr => "pst_plant_t",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{FIRST_PTR_TYPE, SeedType};

    #[test]
    fn codes_are_stable() {
        let cases = [
            (SeedType::Int, 1),
            (SeedType::Double, 2),
            (SeedType::Boolean, 3),
            (SeedType::String, 4),
            (SeedType::Int64, 5),
            (SeedType::UInt, 6),
            (SeedType::UInt64, 7),
            (SeedType::FuncPtr, 64),
            (SeedType::VoidPtr, 65),
            (SeedType::PlantPtr, 66),
        ];
        for (seed, code) in cases {
            assert_eq!(seed.code(), code);
            assert_eq!(SeedType::from_code(code), Some(seed));
        }
        assert_eq!(SeedType::from_code(0), None);
        assert_eq!(SeedType::from_code(67), None);
    }

    #[test]
    fn pointer_range_matches_first_ptr_type() {
        for seed in SeedType::ALL {
            assert_eq!(seed.is_pointer(), seed.code() >= FIRST_PTR_TYPE);
        }
        assert!(!SeedType::String.is_pointer());
        assert!(SeedType::String.is_owned());
        assert!(!SeedType::PlantPtr.is_owned());
    }

    #[test]
    fn short_names_round_trip() {
        for seed in SeedType::ALL {
            assert_eq!(SeedType::from_short_name(seed.short_name()), Some(seed));
        }
        assert_eq!(SeedType::from_short_name("bool"), Some(SeedType::Boolean));
        assert_eq!(SeedType::from_short_name("float"), None);
    }
}
