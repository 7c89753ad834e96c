// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! SecureLinks contract bindings and the [`LinkLedger`] seam.

use std::time::Duration;

use alloy::{
    primitives::{Address, Bytes, TxHash, B256, U256},
    providers::Provider,
    sol,
};
use async_trait::async_trait;

use super::client::LedgerClientError;
use super::types::{Handle, OwnedLink};

sol! {
    #[sol(rpc)]
    interface ISecureLinks {
        function saveLink(bytes32 urlHash, bytes32[] calldata tagHashes, bytes32 encryptedOne, bytes calldata inputProof) external;
        function getMyLinkCount() external view returns (bytes32);
        function getOwnerLinks(address owner) external view returns (bytes32[] memory urls, uint256[] memory timestamps);
        function getAllLinks() external view returns (bytes32[] memory);
        function getLinkCount(bytes32 url) external view returns (uint256);
    }
}

/// Arguments of `saveLink`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveLinkCall {
    pub url_hash: B256,
    pub tag_hashes: Vec<B256>,
    /// Handle of the encrypted counter increment
    pub encrypted_one: Handle,
    pub input_proof: Bytes,
}

/// Transaction receipt after confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: TxHash,
    /// Block number where transaction was included
    pub block_number: u64,
    /// Gas actually used
    pub gas_used: u64,
    /// Whether the transaction was successful
    pub success: bool,
}

/// Ledger contract operations the coordinators depend on.
///
/// Every call names the contract explicitly: the address is resolved per
/// chain by the caller and may change between calls.
#[async_trait]
pub trait LinkLedger: Send + Sync {
    /// Broadcast `saveLink` from `from`. Resolves once the network accepted it.
    async fn send_save_link(
        &self,
        contract: Address,
        from: Address,
        call: &SaveLinkCall,
    ) -> Result<TxHash, LedgerClientError>;

    /// Wait until the transaction is included in a block. No timeout.
    async fn wait_for_confirmation(&self, tx_hash: TxHash) -> Result<TxReceipt, LedgerClientError>;

    /// Encrypted link counter of `caller`.
    async fn get_my_link_count(
        &self,
        contract: Address,
        caller: Address,
    ) -> Result<Handle, LedgerClientError>;

    /// Links saved by `owner`, in insertion order.
    async fn get_owner_links(
        &self,
        contract: Address,
        owner: Address,
    ) -> Result<Vec<OwnedLink>, LedgerClientError>;

    /// Every distinct URL hash ever saved, in first-seen order.
    async fn get_all_links(&self, contract: Address) -> Result<Vec<B256>, LedgerClientError>;

    /// Number of distinct accounts that saved `url_hash`.
    async fn get_link_count(
        &self,
        contract: Address,
        url_hash: B256,
    ) -> Result<U256, LedgerClientError>;
}

/// Default receipt polling interval.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// [`LinkLedger`] backed by an alloy provider.
#[derive(Clone)]
pub struct SecureLinksLedger<P> {
    provider: P,
    poll_interval: Duration,
}

impl<P: Provider + Clone> SecureLinksLedger<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    fn contract(&self, address: Address) -> ISecureLinks::ISecureLinksInstance<P> {
        ISecureLinks::new(address, self.provider.clone())
    }

    /// Get the transaction status by checking for a receipt.
    pub async fn get_transaction_status(
        &self,
        tx_hash: TxHash,
    ) -> Result<Option<TxReceipt>, LedgerClientError> {
        let receipt = self
            .provider
            .get_transaction_receipt(tx_hash)
            .await
            .map_err(|e| LedgerClientError::RpcError(format!("Failed to get receipt: {}", e)))?;

        Ok(receipt.map(|r| TxReceipt {
            tx_hash,
            block_number: r.block_number.unwrap_or(0),
            gas_used: r.gas_used as u64,
            success: r.status(),
        }))
    }
}

#[async_trait]
impl<P: Provider + Clone + 'static> LinkLedger for SecureLinksLedger<P> {
    async fn send_save_link(
        &self,
        contract: Address,
        from: Address,
        call: &SaveLinkCall,
    ) -> Result<TxHash, LedgerClientError> {
        let pending = self
            .contract(contract)
            .saveLink(
                call.url_hash,
                call.tag_hashes.clone(),
                call.encrypted_one,
                call.input_proof.clone(),
            )
            .from(from)
            .send()
            .await
            .map_err(|e| LedgerClientError::TransactionFailed(e.to_string()))?;

        let tx_hash = *pending.tx_hash();
        tracing::debug!(%tx_hash, %contract, "saveLink broadcast");
        Ok(tx_hash)
    }

    async fn wait_for_confirmation(&self, tx_hash: TxHash) -> Result<TxReceipt, LedgerClientError> {
        loop {
            if let Some(receipt) = self.get_transaction_status(tx_hash).await? {
                return Ok(receipt);
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn get_my_link_count(
        &self,
        contract: Address,
        caller: Address,
    ) -> Result<Handle, LedgerClientError> {
        let handle: B256 = self
            .contract(contract)
            .getMyLinkCount()
            .from(caller)
            .call()
            .await
            .map_err(|e| LedgerClientError::ContractError(e.to_string()))?;
        Ok(handle)
    }

    async fn get_owner_links(
        &self,
        contract: Address,
        owner: Address,
    ) -> Result<Vec<OwnedLink>, LedgerClientError> {
        let result = self
            .contract(contract)
            .getOwnerLinks(owner)
            .call()
            .await
            .map_err(|e| LedgerClientError::ContractError(e.to_string()))?;

        if result.urls.len() != result.timestamps.len() {
            return Err(LedgerClientError::ContractError(format!(
                "getOwnerLinks returned {} urls but {} timestamps",
                result.urls.len(),
                result.timestamps.len()
            )));
        }

        Ok(result
            .urls
            .into_iter()
            .zip(result.timestamps)
            .map(|(url_hash, timestamp)| OwnedLink {
                url_hash,
                timestamp,
            })
            .collect())
    }

    async fn get_all_links(&self, contract: Address) -> Result<Vec<B256>, LedgerClientError> {
        let urls: Vec<B256> = self
            .contract(contract)
            .getAllLinks()
            .call()
            .await
            .map_err(|e| LedgerClientError::ContractError(e.to_string()))?;
        Ok(urls)
    }

    async fn get_link_count(
        &self,
        contract: Address,
        url_hash: B256,
    ) -> Result<U256, LedgerClientError> {
        let count: U256 = self
            .contract(contract)
            .getLinkCount(url_hash)
            .call()
            .await
            .map_err(|e| LedgerClientError::ContractError(e.to_string()))?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::sol_types::SolCall;

    #[test]
    fn save_link_calldata_layout() {
        let call = ISecureLinks::saveLinkCall {
            urlHash: B256::repeat_byte(0x11),
            tagHashes: vec![B256::repeat_byte(0x22)],
            encryptedOne: B256::repeat_byte(0x33),
            inputProof: Bytes::from_static(&[0xaa, 0xbb]),
        };
        let data = call.abi_encode();

        assert_eq!(&data[..4], ISecureLinks::saveLinkCall::SELECTOR.as_slice());
        // url hash is the first static word after the selector
        assert_eq!(&data[4..36], B256::repeat_byte(0x11).as_slice());

        let decoded = ISecureLinks::saveLinkCall::abi_decode(&data).unwrap();
        assert_eq!(decoded.tagHashes, vec![B256::repeat_byte(0x22)]);
        assert_eq!(decoded.inputProof, Bytes::from_static(&[0xaa, 0xbb]));
    }

    #[test]
    fn view_selectors_match_signatures() {
        assert_eq!(
            ISecureLinks::getOwnerLinksCall::SIGNATURE,
            "getOwnerLinks(address)"
        );
        assert_eq!(ISecureLinks::getLinkCountCall::SIGNATURE, "getLinkCount(bytes32)");
    }
}
