// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Decryption Signature Storage
//!
//! String key/value stores for serialized decryption signatures, matching
//! the relayer SDK's generic string storage contract (get/set/remove).
//!
//! - [`MemorySignatureStore`]: bounded in-process LRU, lost on exit
//! - [`SignatureDatabase`]: embedded redb file, survives restarts
//!
//! Values are opaque JSON strings; expiry is judged by the reader from the
//! signature's own validity window, never by the store.

use std::path::PathBuf;

pub mod database;
pub mod memory;

pub use database::SignatureDatabase;
pub use memory::MemorySignatureStore;

/// Error type for signature store operations.
#[derive(Debug, thiserror::Error)]
pub enum SignatureStoreError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("cannot create {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("store lock poisoned")]
    Poisoned,
}

pub type SignatureStoreResult<T> = Result<T, SignatureStoreError>;

/// Generic string storage for decryption signatures.
pub trait SignatureStore: Send + Sync {
    fn get(&self, key: &str) -> SignatureStoreResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> SignatureStoreResult<()>;

    fn remove(&self, key: &str) -> SignatureStoreResult<()>;
}
