// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Last fetched view of the ledger: own links, trending links and the
//! caller's encrypted count handle.
//!
//! Every refresh is a read-only contract call. A failed refresh publishes
//! its error on the status channel and leaves the previous snapshot in
//! place; a refresh whose deployment changed while it was in flight is
//! discarded.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use alloy::primitives::{Address, B256, U256};
use tokio::sync::watch;

use crate::blockchain::{Handle, LinkLedger, OwnedLink, TrendingLink};
use crate::coordinator::{FlowGate, FlowState};
use crate::environment::{Environment, OperationSnapshot};
use crate::error::FlowError;
use crate::status::{StatusChannel, StatusMessage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Idle,
    Refreshing,
}

impl FlowState for RefreshState {
    const IDLE: Self = RefreshState::Idle;
}

/// Everything the store currently knows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkSnapshot {
    /// Links of the last owner queried, in ledger order
    pub my_links: Vec<OwnedLink>,
    /// Every URL hash ever saved, in first-seen order
    pub all_links: Vec<B256>,
    pub link_counts: HashMap<B256, U256>,
    /// `None` until loaded or when no contract is deployed
    pub count_handle: Option<Handle>,
}

impl LinkSnapshot {
    /// Trending view: descending count, ties keep first-seen order.
    pub fn trending(&self) -> Vec<TrendingLink> {
        let mut links: Vec<TrendingLink> = self
            .all_links
            .iter()
            .map(|url_hash| TrendingLink {
                url_hash: *url_hash,
                count: self.link_counts.get(url_hash).copied().unwrap_or_default(),
            })
            .collect();
        // sort_by is stable
        links.sort_by(|a, b| b.count.cmp(&a.count));
        links
    }
}

pub struct LinkStore {
    ledger: Arc<dyn LinkLedger>,
    env: Arc<Environment>,
    status: StatusChannel,
    snapshot: RwLock<LinkSnapshot>,
    refresh: FlowGate<RefreshState>,
}

impl LinkStore {
    pub fn new(ledger: Arc<dyn LinkLedger>, env: Arc<Environment>, status: StatusChannel) -> Self {
        Self {
            ledger,
            env,
            status,
            snapshot: RwLock::new(LinkSnapshot::default()),
            refresh: FlowGate::new(),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, LinkSnapshot> {
        self.snapshot.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, LinkSnapshot> {
        self.snapshot.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn snapshot(&self) -> LinkSnapshot {
        self.read().clone()
    }

    pub fn my_links(&self) -> Vec<OwnedLink> {
        self.read().my_links.clone()
    }

    pub fn all_links(&self) -> Vec<B256> {
        self.read().all_links.clone()
    }

    pub fn trending(&self) -> Vec<TrendingLink> {
        self.read().trending()
    }

    pub fn count_handle(&self) -> Option<Handle> {
        self.read().count_handle
    }

    pub fn is_refreshing(&self) -> bool {
        self.refresh.is_busy()
    }

    pub fn refresh_state(&self) -> watch::Receiver<RefreshState> {
        self.refresh.subscribe()
    }

    /// Forget everything, e.g. after switching to a network without a deployment.
    pub fn reset(&self) {
        *self.write() = LinkSnapshot::default();
    }

    /// Results apply only if chain and contract are unchanged.
    fn same_deployment(&self, snapshot: &OperationSnapshot) -> bool {
        let live = self.env.snapshot();
        live.chain_id == snapshot.chain_id && live.contract_address == snapshot.contract_address
    }

    /// Load the caller's encrypted link counter.
    ///
    /// With no contract on the live chain the handle is cleared. A result
    /// that arrives after a chain or contract switch is dropped.
    pub async fn refresh_count_handle(&self) -> Result<Option<Handle>, FlowError> {
        let snapshot = self.env.snapshot();
        let Some(contract) = snapshot.contract_address else {
            self.write().count_handle = None;
            return Ok(None);
        };
        let Some(_guard) = self.refresh.try_begin(RefreshState::Refreshing) else {
            return Err(FlowError::Busy);
        };

        let caller = snapshot.signer_address.unwrap_or(Address::ZERO);
        match self.ledger.get_my_link_count(contract, caller).await {
            Ok(handle) => {
                if !self.same_deployment(&snapshot) {
                    tracing::debug!("Discarding count handle fetched before network switch");
                    return Err(FlowError::Cancelled);
                }
                tracing::debug!(%caller, %handle, "Count handle refreshed");
                self.write().count_handle = Some(handle);
                Ok(Some(handle))
            }
            Err(e) => {
                self.status
                    .publish(StatusMessage::failure(format!("Failed to retrieve link count: {e}")));
                Err(FlowError::Subsystem(e.to_string()))
            }
        }
    }

    /// Load the links saved by `owner`.
    pub async fn refresh_my_links(&self, owner: Address) -> Result<Vec<OwnedLink>, FlowError> {
        let snapshot = self.env.snapshot();
        let contract = snapshot
            .contract_address
            .ok_or(FlowError::Unavailable("contract not deployed on this network"))?;

        match self.ledger.get_owner_links(contract, owner).await {
            Ok(links) => {
                if !self.same_deployment(&snapshot) {
                    return Err(FlowError::Cancelled);
                }
                tracing::debug!(%owner, count = links.len(), "Own links refreshed");
                self.write().my_links = links.clone();
                Ok(links)
            }
            Err(e) => {
                self.status
                    .publish(StatusMessage::failure(format!("Failed to load your links: {e}")));
                Err(FlowError::Subsystem(e.to_string()))
            }
        }
    }

    /// Load every saved URL hash and its count, then return the trending view.
    pub async fn refresh_all_links(&self) -> Result<Vec<TrendingLink>, FlowError> {
        let snapshot = self.env.snapshot();
        let contract = snapshot
            .contract_address
            .ok_or(FlowError::Unavailable("contract not deployed on this network"))?;

        let fetched = async {
            let urls = self.ledger.get_all_links(contract).await?;
            let mut counts = HashMap::with_capacity(urls.len());
            for url_hash in &urls {
                let count = self.ledger.get_link_count(contract, *url_hash).await?;
                counts.insert(*url_hash, count);
            }
            Ok::<_, crate::blockchain::LedgerClientError>((urls, counts))
        }
        .await;

        match fetched {
            Ok((urls, counts)) => {
                if !self.same_deployment(&snapshot) {
                    return Err(FlowError::Cancelled);
                }
                tracing::debug!(links = urls.len(), "Trending links refreshed");
                let mut current = self.write();
                current.all_links = urls;
                current.link_counts = counts;
                Ok(current.trending())
            }
            Err(e) => {
                self.status
                    .publish(StatusMessage::failure(format!("Failed to load trending links: {e}")));
                Err(FlowError::Subsystem(e.to_string()))
            }
        }
    }
}
