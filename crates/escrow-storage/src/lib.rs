//! Durable client storage and the process-wide token store.
//!
//! This crate provides:
//! - [`DurableStorage`]: key/value backend trait
//! - [`FileStorage`]: JSON file backend (`~/.escrow/session.json`)
//! - [`MemoryStorage`]: in-process backend for tests and ephemeral sessions
//! - [`TokenStore`]: access token in memory, refresh token in durable storage

mod file;
mod keys;
mod memory;
mod tokens;
mod traits;

pub use file::FileStorage;
pub use keys::StorageKeys;
pub use memory::MemoryStorage;
pub use tokens::TokenStore;
pub use traits::DurableStorage;

use thiserror::Error;

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Stored data could not be decoded
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
