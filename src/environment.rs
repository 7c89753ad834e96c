// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Live wallet environment and staleness detection.
//!
//! The wallet side pushes chain and account switches into [`Environment`];
//! every asynchronous flow captures an [`OperationSnapshot`] when it starts
//! and calls [`Environment::is_stale`] after each suspension point. A stale
//! result is dropped, never applied.

use std::fmt;
use std::sync::Arc;

use alloy::primitives::Address;
use tokio::sync::watch;

use crate::blockchain::{AddressBook, Deployment, WalletSigner};

/// What the wallet currently exposes.
#[derive(Clone, Default)]
pub struct WalletState {
    pub chain_id: Option<u64>,
    pub signer: Option<Arc<dyn WalletSigner>>,
}

impl WalletState {
    pub fn signer_address(&self) -> Option<Address> {
        self.signer.as_ref().map(|s| s.address())
    }
}

impl fmt::Debug for WalletState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletState")
            .field("chain_id", &self.chain_id)
            .field("signer", &self.signer_address())
            .finish()
    }
}

/// Environment captured at the start of an asynchronous operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationSnapshot {
    pub chain_id: Option<u64>,
    pub signer_address: Option<Address>,
    pub contract_address: Option<Address>,
}

/// Chain/signer staleness oracle.
pub struct Environment {
    state: watch::Sender<WalletState>,
    addresses: AddressBook,
}

impl Environment {
    pub fn new(addresses: AddressBook) -> Self {
        let (state, _rx) = watch::channel(WalletState::default());
        Self { state, addresses }
    }

    /// Record a network switch. No-op if the chain did not change.
    pub fn set_chain_id(&self, chain_id: Option<u64>) {
        self.state.send_if_modified(|state| {
            if state.chain_id == chain_id {
                return false;
            }
            tracing::info!(from = ?state.chain_id, to = ?chain_id, "Chain changed");
            state.chain_id = chain_id;
            true
        });
    }

    /// Record an account switch (or disconnect with `None`).
    pub fn set_signer(&self, signer: Option<Arc<dyn WalletSigner>>) {
        self.state.send_modify(|state| {
            tracing::info!(
                from = ?state.signer_address(),
                to = ?signer.as_ref().map(|s| s.address()),
                "Signer changed"
            );
            state.signer = signer;
        });
    }

    pub fn chain_id(&self) -> Option<u64> {
        self.state.borrow().chain_id
    }

    pub fn signer(&self) -> Option<Arc<dyn WalletSigner>> {
        self.state.borrow().signer.clone()
    }

    pub fn signer_address(&self) -> Option<Address> {
        self.state.borrow().signer_address()
    }

    /// Contract address for the live chain, `None` if not deployed there.
    pub fn contract_address(&self) -> Option<Address> {
        self.addresses.resolve(self.chain_id())
    }

    pub fn deployment(&self) -> Option<Deployment> {
        self.addresses.deployment(self.chain_id()).cloned()
    }

    pub fn addresses(&self) -> &AddressBook {
        &self.addresses
    }

    pub fn snapshot(&self) -> OperationSnapshot {
        let state = self.state.borrow();
        OperationSnapshot {
            chain_id: state.chain_id,
            signer_address: state.signer_address(),
            contract_address: self.addresses.resolve(state.chain_id),
        }
    }

    /// Whether the live environment diverged from `snapshot`.
    pub fn is_stale(&self, snapshot: &OperationSnapshot) -> bool {
        self.snapshot() != *snapshot
    }

    /// Change notifications for background watchers.
    pub fn subscribe(&self) -> watch::Receiver<WalletState> {
        self.state.subscribe()
    }
}
