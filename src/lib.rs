//! Purpose: Typed, self-describing plant/leaf attribute store shared by hosts and effect plugins.
//! Exports: `api` (stable Rust surface), `abi` (C bridge), `core` (arena, cells, errors).
//! Role: Library backing the `plantstore` binary and the cdylib/staticlib plugin ABI.
//! Invariants: Seed, flag, and error codes are frozen; separately built plugins depend on them.
//! Invariants: No global mutable state; allocation accounting is passed in through `Store`.
pub mod abi;
pub mod api;
pub mod core;
