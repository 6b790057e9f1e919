//! Development backend for Dockyard
//!
//! The real backend owns persistence and process orchestration. This crate
//! provides a small in-memory stand-in so the front doors can be run and
//! tested end to end.

pub mod memory;

pub use memory::{validate_app_name, MemoryBackend, DEFAULT_SIZE, MAX_QUANTITY};
