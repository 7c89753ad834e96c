// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Save-link flow: encrypt the counter increment, hash URL and tags, submit
//! `saveLink`, wait for inclusion, refresh the store.

use std::sync::Arc;

use alloy::primitives::Address;
use tokio::sync::watch;

use super::{FlowGate, FlowGuard, FlowState};
use crate::blockchain::{text_hash, LinkLedger, SaveLinkCall, TxReceipt};
use crate::environment::{Environment, OperationSnapshot};
use crate::error::FlowError;
use crate::fhevm::FhevmInstance;
use crate::status::{StatusChannel, StatusMessage};
use crate::store::LinkStore;

/// Plaintext encrypted into every save. The URL itself is only hashed.
pub const ENCRYPTED_INCREMENT: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    Encrypting,
    /// Wallet prompt open, waiting for the network to accept the transaction
    AwaitingSubmitConfirmation,
    Submitting,
    Confirming,
    Refreshing,
}

impl FlowState for SubmissionState {
    const IDLE: Self = SubmissionState::Idle;
}

pub struct SubmissionCoordinator {
    env: Arc<Environment>,
    ledger: Arc<dyn LinkLedger>,
    fhevm: Option<Arc<dyn FhevmInstance>>,
    store: Arc<LinkStore>,
    status: StatusChannel,
    gate: FlowGate<SubmissionState>,
}

impl SubmissionCoordinator {
    pub fn new(
        env: Arc<Environment>,
        ledger: Arc<dyn LinkLedger>,
        fhevm: Option<Arc<dyn FhevmInstance>>,
        store: Arc<LinkStore>,
        status: StatusChannel,
    ) -> Self {
        Self {
            env,
            ledger,
            fhevm,
            store,
            status,
            gate: FlowGate::new(),
        }
    }

    pub fn state(&self) -> SubmissionState {
        self.gate.current()
    }

    pub fn is_submitting(&self) -> bool {
        self.gate.is_busy()
    }

    pub fn subscribe(&self) -> watch::Receiver<SubmissionState> {
        self.gate.subscribe()
    }

    pub fn has_instance(&self) -> bool {
        self.fhevm.is_some()
    }

    /// Save `url` with `tags` for the connected account.
    ///
    /// Returns the confirmed receipt. A transaction already broadcast is
    /// never rolled back: if the environment changes before confirmation
    /// the result is `Cancelled` and the store is left untouched.
    pub async fn save_link<S: AsRef<str>>(
        &self,
        url: &str,
        tags: &[S],
    ) -> Result<TxReceipt, FlowError> {
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
            .signer_address()
            .ok_or(FlowError::Unavailable("wallet not connected"))?;
        let guard = self
            .gate
            .try_begin(SubmissionState::Encrypting)
            .ok_or(FlowError::Busy)?;

        let result = self
            .run(&guard, fhevm.as_ref(), contract, signer, url, tags)
            .await;

        match &result {
            Ok(receipt) => {
                tracing::info!(tx_hash = %receipt.tx_hash, block = receipt.block_number, "Link saved")
            }
            Err(FlowError::UserRejected) => self
                .status
                .publish(StatusMessage::cancelled("Transaction cancelled by user")),
            Err(FlowError::Subsystem(message)) => self
                .status
                .publish(StatusMessage::failure(format!("Failed to save link: {message}"))),
            Err(_) => {}
        }
        result
    }

    async fn run<S: AsRef<str>>(
        &self,
        guard: &FlowGuard<'_, SubmissionState>,
        fhevm: &dyn FhevmInstance,
        contract: Address,
        signer: Address,
        url: &str,
        tags: &[S],
    ) -> Result<TxReceipt, FlowError> {
        let snapshot = self.env.snapshot();

        self.status
            .publish(StatusMessage::progress("Encrypting your link..."));
        let mut input = fhevm.create_encrypted_input(contract, signer);
        input.add32(ENCRYPTED_INCREMENT);
        let encrypted = fhevm.encrypt(input).await?;
        self.cancel_if_stale(&snapshot)?;

        let encrypted_one = encrypted
            .handles
            .first()
            .copied()
            .ok_or_else(|| FlowError::Subsystem("encryption returned no handle".into()))?;
        let call = SaveLinkCall {
            url_hash: text_hash(url),
            tag_hashes: tags.iter().map(|t| text_hash(t.as_ref())).collect(),
            encrypted_one,
            input_proof: encrypted.input_proof,
        };

        guard.advance(SubmissionState::AwaitingSubmitConfirmation);
        self.status
            .publish(StatusMessage::progress("Saving link to blockchain..."));
        let tx_hash = self.ledger.send_save_link(contract, signer, &call).await?;

        guard.advance(SubmissionState::Submitting);
        tracing::info!(%tx_hash, url_hash = %call.url_hash, tags = call.tag_hashes.len(), "saveLink submitted");
        self.status.publish(StatusMessage::progress(
            "Transaction submitted, waiting for confirmation...",
        ));

        guard.advance(SubmissionState::Confirming);
        let receipt = self.ledger.wait_for_confirmation(tx_hash).await?;
        if !receipt.success {
            return Err(FlowError::Subsystem(format!(
                "transaction {tx_hash} reverted"
            )));
        }
        self.cancel_if_stale(&snapshot)?;

        guard.advance(SubmissionState::Refreshing);
        self.refresh_after_save(signer).await;
        self.status
            .publish(StatusMessage::success("Link saved successfully!"));
        Ok(receipt)
    }

    fn cancel_if_stale(&self, snapshot: &OperationSnapshot) -> Result<(), FlowError> {
        if self.env.is_stale(snapshot) {
            self.status.publish(StatusMessage::cancelled(
                "Network or wallet changed, save cancelled",
            ));
            return Err(FlowError::Cancelled);
        }
        Ok(())
    }

    // The transaction is confirmed at this point; a failed read is reported
    // by the store and does not fail the save.
    async fn refresh_after_save(&self, owner: Address) {
        if let Err(e) = self.store.refresh_count_handle().await {
            tracing::debug!(error = %e, "Count handle refresh after save skipped");
        }
        if let Err(e) = self.store.refresh_my_links(owner).await {
            tracing::debug!(error = %e, "Own links refresh after save skipped");
        }
        if let Err(e) = self.store.refresh_all_links().await {
            tracing::debug!(error = %e, "Trending refresh after save skipped");
        }
    }
}
