// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session state: one environment, one status channel, one link store and
//! the two coordinators, wired together.

use std::sync::Arc;

use alloy::primitives::U256;
use tokio_util::sync::CancellationToken;

use crate::blockchain::{LinkLedger, TxReceipt};
use crate::coordinator::{ClearValue, DecryptionCoordinator, SubmissionCoordinator};
use crate::environment::Environment;
use crate::error::FlowError;
use crate::fhevm::FhevmInstance;
use crate::signature::SignatureCache;
use crate::status::{StatusChannel, StatusMessage};
use crate::store::LinkStore;

pub struct SecureLinksState {
    env: Arc<Environment>,
    status: StatusChannel,
    store: Arc<LinkStore>,
    submission: SubmissionCoordinator,
    decryption: DecryptionCoordinator,
}

impl SecureLinksState {
    pub fn new(
        env: Arc<Environment>,
        ledger: Arc<dyn LinkLedger>,
        fhevm: Option<Arc<dyn FhevmInstance>>,
        signatures: SignatureCache,
    ) -> Self {
        let status = StatusChannel::new();
        let store = Arc::new(LinkStore::new(ledger.clone(), env.clone(), status.clone()));
        let submission = SubmissionCoordinator::new(
            env.clone(),
            ledger,
            fhevm.clone(),
            store.clone(),
            status.clone(),
        );
        let decryption =
            DecryptionCoordinator::new(env.clone(), fhevm, store.clone(), signatures, status.clone());
        Self {
            env,
            status,
            store,
            submission,
            decryption,
        }
    }

    pub fn environment(&self) -> &Arc<Environment> {
        &self.env
    }

    pub fn status(&self) -> &StatusChannel {
        &self.status
    }

    pub fn store(&self) -> &Arc<LinkStore> {
        &self.store
    }

    pub fn submission(&self) -> &SubmissionCoordinator {
        &self.submission
    }

    pub fn decryption(&self) -> &DecryptionCoordinator {
        &self.decryption
    }

    pub fn is_deployed(&self) -> bool {
        self.env.contract_address().is_some()
    }

    pub fn can_get_count(&self) -> bool {
        self.is_deployed() && !self.store.is_refreshing()
    }

    pub fn can_submit(&self) -> bool {
        self.is_deployed()
            && self.submission.has_instance()
            && self.env.signer_address().is_some()
            && !self.submission.is_submitting()
            && !self.store.is_refreshing()
    }

    pub fn can_decrypt(&self) -> bool {
        self.is_deployed()
            && self.submission.has_instance()
            && self.env.signer_address().is_some()
            && self.store.count_handle().is_some()
            && !self.store.is_refreshing()
            && !self.decryption.is_decrypting()
            && !self.is_decrypted()
    }

    pub fn is_decrypted(&self) -> bool {
        self.decryption.is_decrypted()
    }

    pub fn clear_value(&self) -> Option<ClearValue> {
        self.decryption.clear_value()
    }

    pub async fn save_link<S: AsRef<str>>(
        &self,
        url: &str,
        tags: &[S],
    ) -> Result<TxReceipt, FlowError> {
        self.submission.save_link(url, tags).await
    }

    pub async fn decrypt_count_handle(&self) -> Result<U256, FlowError> {
        self.decryption.decrypt_count_handle().await
    }

    /// Re-read everything for the live chain and account.
    ///
    /// On a chain without a deployment the store is emptied and an
    /// informational status is published instead.
    pub async fn refresh(&self) {
        if !self.is_deployed() {
            self.store.reset();
            let chain = self
                .env
                .chain_id()
                .map_or_else(|| "unknown".to_string(), |id| id.to_string());
            self.status.publish(StatusMessage::info(format!(
                "Contract not deployed on this network (Chain {chain})"
            )));
            return;
        }

        if let Err(e) = self.store.refresh_count_handle().await {
            tracing::debug!(error = %e, "Count handle refresh skipped");
        }
        if let Some(owner) = self.env.signer_address() {
            if let Err(e) = self.store.refresh_my_links(owner).await {
                tracing::debug!(error = %e, "Own links refresh skipped");
            }
        }
        if let Err(e) = self.store.refresh_all_links().await {
            tracing::debug!(error = %e, "Trending refresh skipped");
        }
    }

    /// Refresh after every chain or account switch until `shutdown` fires.
    ///
    /// This should be spawned as a background task:
    /// ```rust,ignore
    /// tokio::spawn(async move { state.watch_environment(shutdown).await });
    /// ```
    pub async fn watch_environment(&self, shutdown: CancellationToken) {
        let mut changes = self.env.subscribe();
        tracing::info!(chain_id = ?self.env.chain_id(), "Environment watcher starting");

        loop {
            if shutdown.is_cancelled() {
                tracing::info!("Environment watcher shutting down");
                return;
            }

            changes.borrow_and_update();
            self.refresh().await;

            tokio::select! {
                changed = changes.changed() => {
                    if changed.is_err() {
                        tracing::info!("Environment closed, watcher stopping");
                        return;
                    }
                    tracing::debug!(chain_id = ?self.env.chain_id(), "Environment changed");
                },
                _ = shutdown.cancelled() => {
                    tracing::info!("Environment watcher shutting down");
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::{text_hash, WalletSigner};
    use crate::status::StatusKind;
    use crate::storage::MemorySignatureStore;
    use crate::test_support::{
        connected_environment, MockFhevm, MockLedger, MockSigner, CHAIN_ID, OTHER_CHAIN_ID,
    };

    struct Fixture {
        ledger: Arc<MockLedger>,
        signer: Arc<MockSigner>,
        state: Arc<SecureLinksState>,
    }

    fn fixture_with(fhevm: Option<Arc<dyn FhevmInstance>>) -> Fixture {
        let signer = Arc::new(MockSigner::new(0xaa));
        let env = connected_environment(signer.clone());
        let ledger = Arc::new(MockLedger::new());
        let signatures = SignatureCache::new(Arc::new(MemorySignatureStore::default()));
        let state = Arc::new(SecureLinksState::new(env, ledger.clone(), fhevm, signatures));
        Fixture {
            ledger,
            signer,
            state,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(Some(Arc::new(MockFhevm::new())))
    }

    #[tokio::test]
    async fn predicates_follow_the_session() {
        let f = fixture();
        assert!(f.state.is_deployed());
        assert!(f.state.can_submit());
        assert!(f.state.can_get_count());
        // no handle loaded yet
        assert!(!f.state.can_decrypt());

        f.state.refresh().await;
        assert!(f.state.can_decrypt());

        f.state.decrypt_count_handle().await.unwrap();
        assert!(f.state.is_decrypted());
        assert!(!f.state.can_decrypt());

        f.state.environment().set_signer(None);
        assert!(!f.state.can_submit());
    }

    #[tokio::test]
    async fn nothing_is_possible_without_instance() {
        let f = fixture_with(None);
        f.state.refresh().await;
        assert!(f.state.can_get_count());
        assert!(!f.state.can_submit());
        assert!(!f.state.can_decrypt());
    }

    #[tokio::test]
    async fn save_then_decrypt_round() {
        let f = fixture();
        f.state.refresh().await;
        f.state
            .save_link("https://example.com", &["a"])
            .await
            .unwrap();

        assert!(!f.state.is_decrypted());
        assert_eq!(f.state.decrypt_count_handle().await.unwrap(), U256::from(1));
        assert_eq!(
            f.state.store().my_links()[0].url_hash,
            text_hash("https://example.com")
        );
    }

    #[tokio::test]
    async fn undeployed_chain_reports_and_clears() {
        let f = fixture();
        f.ledger.seed(f.signer.address(), "https://example.com");
        f.state.refresh().await;
        assert_eq!(f.state.store().my_links().len(), 1);

        f.state.environment().set_chain_id(Some(OTHER_CHAIN_ID));
        f.state.refresh().await;

        let status = f.state.status().latest().unwrap();
        assert_eq!(status.kind, StatusKind::Info);
        assert_eq!(
            status.detail,
            format!("Contract not deployed on this network (Chain {OTHER_CHAIN_ID})")
        );
        assert!(f.state.store().my_links().is_empty());
        assert!(!f.state.is_deployed());
    }

    #[tokio::test]
    async fn watcher_refreshes_on_switch_and_stops_on_shutdown() {
        let f = fixture();
        let shutdown = CancellationToken::new();
        let watcher = tokio::spawn({
            let state = f.state.clone();
            let shutdown = shutdown.clone();
            async move { state.watch_environment(shutdown).await }
        });

        // initial pass
        while f.ledger.count_reads() == 0 {
            tokio::task::yield_now().await;
        }

        f.state.environment().set_chain_id(Some(OTHER_CHAIN_ID));
        let mut status = f.state.status().subscribe();
        while !status
            .borrow_and_update()
            .as_ref()
            .is_some_and(|m| m.kind == StatusKind::Info)
        {
            status.changed().await.unwrap();
        }

        f.ledger.seed(f.signer.address(), "https://example.com");
        f.state.environment().set_chain_id(Some(CHAIN_ID));
        while f.state.store().my_links().is_empty() {
            tokio::task::yield_now().await;
        }

        shutdown.cancel();
        watcher.await.unwrap();
    }
}
