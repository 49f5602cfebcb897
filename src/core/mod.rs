// Core modules implementing the plant arena, leaf cells, flags, and error modeling.
pub mod alloc;
pub mod error;
pub mod flags;
pub mod leaf;
pub mod plant;
pub mod seed;
pub mod snapshot;
pub mod store;
mod typed;
mod utils;
pub mod value;
