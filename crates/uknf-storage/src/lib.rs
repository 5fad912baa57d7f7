//! UKNF Storage Library
//!
//! Storage abstraction for submitted report files, with a local filesystem
//! backend and an in-memory backend.
//!
//! # Storage key format
//!
//! Keys are scoped by the submitting entity: `reports/{entity_id}/{uuid}.{ext}`.
//! The client file name never appears in the key. Keys must not contain `..`
//! or a leading `/`. Key generation lives in the `keys` module so all
//! backends stay consistent.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
pub mod memory;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use memory::MemoryStorage;
pub use traits::{Storage, StorageError, StorageResult};
pub use uknf_core::StorageBackend;
