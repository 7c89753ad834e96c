// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Reveal-count flow: reuse or obtain a decryption authorization, decrypt the
//! caller's count handle, keep the clear value alongside its handle.

use std::sync::{Arc, RwLock};

use alloy::primitives::U256;
use tokio::sync::watch;

use super::{FlowGate, FlowState};
use crate::blockchain::{Handle, EMPTY_HANDLE};
use crate::environment::Environment;
use crate::error::FlowError;
use crate::fhevm::{FhevmInstance, HandleContractPair};
use crate::signature::{SignatureCache, SignatureError};
use crate::status::{StatusChannel, StatusMessage};
use crate::store::LinkStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecryptionState {
    Idle,
    /// Loading or requesting the decryption authorization
    Signing,
    Decrypting,
}

impl FlowState for DecryptionState {
    const IDLE: Self = DecryptionState::Idle;
}

/// A decrypted value and the handle it was decrypted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClearValue {
    pub handle: Handle,
    pub clear: U256,
}

pub struct DecryptionCoordinator {
    env: Arc<Environment>,
    fhevm: Option<Arc<dyn FhevmInstance>>,
    store: Arc<LinkStore>,
    signatures: SignatureCache,
    status: StatusChannel,
    clear: RwLock<Option<ClearValue>>,
    gate: FlowGate<DecryptionState>,
}

impl DecryptionCoordinator {
    pub fn new(
        env: Arc<Environment>,
        fhevm: Option<Arc<dyn FhevmInstance>>,
        store: Arc<LinkStore>,
        signatures: SignatureCache,
        status: StatusChannel,
    ) -> Self {
        Self {
            env,
            fhevm,
            store,
            signatures,
            status,
            clear: RwLock::new(None),
            gate: FlowGate::new(),
        }
    }

    pub fn state(&self) -> DecryptionState {
        self.gate.current()
    }

    pub fn is_decrypting(&self) -> bool {
        self.gate.is_busy()
    }

    pub fn subscribe(&self) -> watch::Receiver<DecryptionState> {
        self.gate.subscribe()
    }

    /// Last decrypted value, whether or not it is still current.
    pub fn clear_value(&self) -> Option<ClearValue> {
        *self.clear.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Whether the last decrypted value belongs to the latest known handle.
    pub fn is_decrypted(&self) -> bool {
        match (self.store.count_handle(), self.clear_value()) {
            (Some(handle), Some(clear)) => clear.handle == handle,
            _ => false,
        }
    }

    fn set_clear(&self, value: Option<ClearValue>) {
        *self.clear.write().unwrap_or_else(|e| e.into_inner()) = value;
    }

    /// Decrypt the caller's current count handle.
    ///
    /// A handle that was already decrypted is answered from memory; the
    /// empty handle is zero without a wallet prompt or relayer call.
    pub async fn decrypt_count_handle(&self) -> Result<U256, FlowError> {
        if self.gate.is_busy() || self.store.is_refreshing() {
            return Err(FlowError::Busy);
        }
        let contract = self
            .env
            .contract_address()
            .ok_or(FlowError::Unavailable("contract not deployed on this network"))?;
        let fhevm = self
            .fhevm
            .clone()
            .ok_or(FlowError::Unavailable("FHEVM instance not initialized"))?;
        let signer = self
            .env
            .signer()
            .ok_or(FlowError::Unavailable("wallet not connected"))?;

        let Some(handle) = self.store.count_handle() else {
            self.set_clear(None);
            return Err(FlowError::Unavailable("count handle not loaded"));
        };
        if let Some(cached) = self.clear_value().filter(|c| c.handle == handle) {
            return Ok(cached.clear);
        }
        if handle == EMPTY_HANDLE {
            self.set_clear(Some(ClearValue {
                handle,
                clear: U256::ZERO,
            }));
            return Ok(U256::ZERO);
        }

        let guard = self
            .gate
            .try_begin(DecryptionState::Signing)
            .ok_or(FlowError::Busy)?;
        self.status
            .publish(StatusMessage::progress("Preparing to decrypt your data..."));
        let snapshot = self.env.snapshot();

        let signature = match self
            .signatures
            .load_or_sign(fhevm.as_ref(), &[contract], signer.as_ref())
            .await
        {
            Ok(signature) => signature,
            Err(e) => {
                tracing::warn!(error = %e, "No decryption signature");
                let message = "Unable to create decryption signature. Please try again.";
                return Err(match e {
                    SignatureError::Rejected(_) => {
                        self.status.publish(StatusMessage::cancelled(message));
                        FlowError::UserRejected
                    }
                    SignatureError::Unavailable(detail) => {
                        self.status.publish(StatusMessage::failure(message));
                        FlowError::Subsystem(detail)
                    }
                });
            }
        };
        if self.env.is_stale(&snapshot) {
            return Err(self.cancelled());
        }

        guard.advance(DecryptionState::Decrypting);
        self.status
            .publish(StatusMessage::progress("Decrypting your encrypted data..."));
        let pair = HandleContractPair {
            handle,
            contract_address: contract,
        };
        let clear = fhevm
            .user_decrypt(&[pair], &signature)
            .await
            .map_err(FlowError::from)
            .and_then(|values| {
                values.get(&handle).copied().ok_or_else(|| {
                    FlowError::Subsystem(format!("no value returned for handle {handle}"))
                })
            });
        let clear = match clear {
            Ok(clear) => clear,
            Err(e) => {
                self.status
                    .publish(StatusMessage::failure(format!("Decryption failed: {e}")));
                return Err(e);
            }
        };
        if self.env.is_stale(&snapshot) {
            return Err(self.cancelled());
        }

        self.set_clear(Some(ClearValue { handle, clear }));
        tracing::info!(%handle, "Count handle decrypted");
        self.status.publish(StatusMessage::success(format!(
            "Your encrypted link count: {clear}"
        )));
        Ok(clear)
    }

    fn cancelled(&self) -> FlowError {
        self.status.publish(StatusMessage::cancelled(
            "Network or wallet changed, decryption cancelled",
        ));
        FlowError::Cancelled
    }
}
