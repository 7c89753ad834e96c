// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-process LRU store for decryption signatures.

use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;

use super::{SignatureStore, SignatureStoreError, SignatureStoreResult};

/// Default number of (user, contract set) entries kept in memory.
pub const DEFAULT_CAPACITY: usize = 64;

/// Bounded in-memory signature store.
pub struct MemorySignatureStore {
    cache: Mutex<LruCache<String, String>>,
}

impl MemorySignatureStore {
    /// Create a store holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn len(&self) -> usize {
        self.cache.lock().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemorySignatureStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl SignatureStore for MemorySignatureStore {
    fn get(&self, key: &str) -> SignatureStoreResult<Option<String>> {
        let mut cache = self.cache.lock().map_err(|_| SignatureStoreError::Poisoned)?;
        Ok(cache.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> SignatureStoreResult<()> {
        let mut cache = self.cache.lock().map_err(|_| SignatureStoreError::Poisoned)?;
        cache.put(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> SignatureStoreResult<()> {
        let mut cache = self.cache.lock().map_err(|_| SignatureStoreError::Poisoned)?;
        cache.pop(key);
        Ok(())
    }
}
