//! Purpose: Define the stable public Rust API boundary for plantstore.
//! Exports: Store, handles, value cells, seed/flag/error codes, allocators, snapshot helpers.
//! Exports: `BStr`/`BString`, the byte-string types used for keys and string elements.
//! Role: Public, additive-only surface used by the C bridge, the CLI, and embedding hosts.
//! Invariants: Integer codes re-exported here never change meaning between releases.
//! Invariants: Leaf tables and arena slots stay private to `core`.

#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use bstr::{BStr, BString};
pub use crate::core::alloc::{AllocError, Allocator, BoundedAllocator, SystemAllocator};
pub use crate::core::error::{Error, ErrorKind, Result, SUCCESS_CODE};
pub use crate::core::flags::LeafFlags;
pub use crate::core::plant::{TYPE_KEY, types};
pub use crate::core::seed::{FIRST_PTR_TYPE, SEED_INVALID, SeedType};
pub use crate::core::snapshot::{self, Description};
pub use crate::core::store::Store;
pub use crate::core::value::{FuncPtr, PlantId, Seed, Value, Values, VoidPtr};
