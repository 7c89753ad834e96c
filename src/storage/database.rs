// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded signature database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `decryption_signatures`: cache key → serialized DecryptionSignature (JSON)

use std::path::Path;

use redb::{Database, ReadableDatabase, TableDefinition};

use super::{SignatureStore, SignatureStoreError, SignatureStoreResult};

/// cache key → serialized DecryptionSignature.
const SIGNATURES: TableDefinition<&str, &str> = TableDefinition::new("decryption_signatures");

/// Persistent signature store.
pub struct SignatureDatabase {
    db: Database,
}

impl SignatureDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> SignatureStoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| SignatureStoreError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let db = Database::create(path)?;

        // Pre-create the table so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(SIGNATURES)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }
}

impl SignatureStore for SignatureDatabase {
    fn get(&self, key: &str) -> SignatureStoreResult<Option<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SIGNATURES)?;
        Ok(table.get(key)?.map(|value| value.value().to_string()))
    }

    fn set(&self, key: &str, value: &str) -> SignatureStoreResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(SIGNATURES)?;
            table.insert(key, value)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn remove(&self, key: &str) -> SignatureStoreResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(SIGNATURES)?;
            table.remove(key)?;
        }
        write_txn.commit()?;
        Ok(())
    }
}
