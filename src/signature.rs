// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Reusable user-decryption authorizations.
//!
//! A [`DecryptionSignature`] is created by one wallet prompt and then reused
//! for every decryption of handles on the same contract set until its
//! validity window elapses. [`SignatureCache::load_or_sign`] is the only
//! producer; entries are never mutated, only superseded.

use std::fmt;
use std::sync::Arc;

use alloy::primitives::{keccak256, Address, Bytes};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::blockchain::{Eip712Request, WalletError, WalletSigner};
use crate::fhevm::FhevmInstance;
use crate::storage::SignatureStore;

/// Validity window requested for new authorizations.
pub const DEFAULT_DURATION_DAYS: u64 = 365;

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Time-bounded authorization to decrypt handles of `contract_addresses`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecryptionSignature {
    pub public_key: Bytes,
    pub private_key: Bytes,
    pub signature: Bytes,
    pub user_address: Address,
    /// Sorted, without duplicates
    pub contract_addresses: Vec<Address>,
    pub eip712: Eip712Request,
    /// Unix seconds
    pub start_timestamp: u64,
    pub duration_days: u64,
}

impl DecryptionSignature {
    /// Unix second at which the authorization stops being accepted.
    pub fn expires_at(&self) -> u64 {
        self.start_timestamp
            .saturating_add(self.duration_days.saturating_mul(SECONDS_PER_DAY))
    }

    pub fn is_valid_at(&self, now: u64) -> bool {
        now < self.expires_at()
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(unix_now())
    }

    /// Whether this authorization was issued for exactly this user and contract set.
    pub fn covers(&self, user: Address, contracts: &[Address]) -> bool {
        self.user_address == user && self.contract_addresses == normalize_contracts(contracts)
    }
}

// Keeps the ephemeral private key out of logs.
impl fmt::Debug for DecryptionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecryptionSignature")
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .field("signature", &self.signature)
            .field("user_address", &self.user_address)
            .field("contract_addresses", &self.contract_addresses)
            .field("start_timestamp", &self.start_timestamp)
            .field("duration_days", &self.duration_days)
            .finish()
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum SignatureError {
    /// The wallet declined to sign.
    #[error("signature request rejected: {0}")]
    Rejected(String),

    /// Keypair generation or the wallet could not be reached.
    #[error("signature unavailable: {0}")]
    Unavailable(String),
}

impl From<WalletError> for SignatureError {
    fn from(e: WalletError) -> Self {
        match e {
            WalletError::Rejected(msg) => SignatureError::Rejected(msg),
            WalletError::Unavailable(msg) => SignatureError::Unavailable(msg),
        }
    }
}

/// Sorted, deduplicated copy of a contract set.
pub fn normalize_contracts(contracts: &[Address]) -> Vec<Address> {
    let mut sorted = contracts.to_vec();
    sorted.sort();
    sorted.dedup();
    sorted
}

/// Storage key of the authorization for (user, contract set).
pub fn cache_key(user: Address, contracts: &[Address]) -> String {
    let contracts = normalize_contracts(contracts);
    let mut preimage = Vec::with_capacity(20 * (contracts.len() + 1));
    preimage.extend_from_slice(user.as_slice());
    for contract in &contracts {
        preimage.extend_from_slice(contract.as_slice());
    }
    format!("decryption-signature:{}", alloy::hex::encode(keccak256(&preimage)))
}

fn unix_now() -> u64 {
    u64::try_from(Utc::now().timestamp()).unwrap_or(0)
}

/// Load-or-sign policy over a [`SignatureStore`].
#[derive(Clone)]
pub struct SignatureCache {
    store: Arc<dyn SignatureStore>,
    duration_days: u64,
}

impl SignatureCache {
    pub fn new(store: Arc<dyn SignatureStore>) -> Self {
        Self {
            store,
            duration_days: DEFAULT_DURATION_DAYS,
        }
    }

    pub fn with_duration_days(mut self, duration_days: u64) -> Self {
        self.duration_days = duration_days.max(1);
        self
    }

    /// Stored, unexpired authorization for (user, contract set), if any.
    ///
    /// Unreadable entries are removed so the next call re-signs.
    pub fn load(&self, user: Address, contracts: &[Address]) -> Option<DecryptionSignature> {
        let key = cache_key(user, contracts);
        let raw = match self.store.get(&key) {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(error = %e, "Signature store read failed");
                return None;
            }
        };

        let signature: DecryptionSignature = match serde_json::from_str(&raw) {
            Ok(sig) => sig,
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unreadable cached signature");
                if let Err(e) = self.store.remove(&key) {
                    tracing::warn!(error = %e, "Failed to remove cached signature");
                }
                return None;
            }
        };

        if !signature.covers(user, contracts) || !signature.is_valid() {
            tracing::debug!(%user, "Cached decryption signature expired or mismatched");
            return None;
        }
        Some(signature)
    }

    /// Return a reusable authorization, prompting the wallet only when none
    /// is stored or the stored one expired.
    pub async fn load_or_sign(
        &self,
        instance: &dyn FhevmInstance,
        contract_addresses: &[Address],
        signer: &dyn WalletSigner,
    ) -> Result<DecryptionSignature, SignatureError> {
        let user = signer.address();

        if let Some(existing) = self.load(user, contract_addresses) {
            tracing::debug!(%user, expires_at = existing.expires_at(), "Reusing decryption signature");
            return Ok(existing);
        }

        let contracts = normalize_contracts(contract_addresses);
        let keypair = instance
            .generate_keypair()
            .map_err(|e| SignatureError::Unavailable(e.to_string()))?;
        let start_timestamp = unix_now();

        let eip712 = Eip712Request::new(
            instance.decryption_domain(),
            keypair.public_key.clone(),
            contracts.clone(),
            start_timestamp,
            self.duration_days,
        );

        tracing::info!(%user, contracts = contracts.len(), "Requesting decryption signature");
        let signature = signer.sign_typed_data(&eip712).await?;

        let created = DecryptionSignature {
            public_key: keypair.public_key,
            private_key: keypair.private_key,
            signature,
            user_address: user,
            contract_addresses: contracts,
            eip712,
            start_timestamp,
            duration_days: self.duration_days,
        };

        self.persist(&created);
        Ok(created)
    }

    fn persist(&self, signature: &DecryptionSignature) {
        let key = cache_key(signature.user_address, &signature.contract_addresses);
        let stored = serde_json::to_string(signature)
            .map_err(|e| e.to_string())
            .and_then(|json| self.store.set(&key, &json).map_err(|e| e.to_string()));
        if let Err(e) = stored {
            tracing::warn!(error = %e, "Failed to persist decryption signature");
        }
    }
}
