//! Common library for the points storefront
//!
//! This crate provides shared functionality used by the identity and
//! storefront services, including formatting utilities, the session storage
//! scopes and the shared error taxonomy.

pub mod error;
pub mod format;
pub mod storage;

pub use error::{StorageError, StorageResult, StorefrontError, StorefrontResult};
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage};
