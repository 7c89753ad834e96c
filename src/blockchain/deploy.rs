// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Contract deployment.

use alloy::{
    network::TransactionBuilder,
    primitives::{Address, Bytes, TxHash},
    providers::Provider,
    rpc::types::TransactionRequest,
};

use super::client::LedgerClientError;
use super::types::{AddressBook, Deployment, NetworkConfig};

/// Result of a confirmed deployment.
#[derive(Debug, Clone)]
pub struct DeployResult {
    pub address: Address,
    pub tx_hash: TxHash,
    pub block_number: u64,
}

/// Deploy `bytecode` with the provider's wallet and wait for the receipt.
pub async fn deploy_contract<P: Provider>(
    provider: &P,
    bytecode: Bytes,
) -> Result<DeployResult, LedgerClientError> {
    let tx = TransactionRequest::default().with_deploy_code(bytecode);

    let pending = provider.send_transaction(tx).await.map_err(|e| {
        LedgerClientError::TransactionFailed(format!("Failed to send: {}", e))
    })?;
    let tx_hash = *pending.tx_hash();
    tracing::info!(%tx_hash, "Deployment transaction submitted");

    let receipt = pending
        .get_receipt()
        .await
        .map_err(|e| LedgerClientError::RpcError(format!("Failed to get receipt: {}", e)))?;

    if !receipt.status() {
        return Err(LedgerClientError::TransactionFailed(format!(
            "deployment {tx_hash} reverted"
        )));
    }

    let address = receipt.contract_address.ok_or_else(|| {
        LedgerClientError::TransactionFailed("receipt has no contract address".to_string())
    })?;

    Ok(DeployResult {
        address,
        tx_hash,
        block_number: receipt.block_number.unwrap_or(0),
    })
}

/// Record a deployment in the address table under `chain_id`.
pub fn record_deployment(
    book: &mut AddressBook,
    chain_id: u64,
    network: Option<&NetworkConfig>,
    address: Address,
) -> Deployment {
    let deployment = Deployment {
        address,
        chain_id,
        chain_name: network
            .map(|n| n.name.to_string())
            .unwrap_or_else(|| format!("chain-{chain_id}")),
    };
    book.insert(deployment.clone());
    deployment
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::types::HARDHAT;
    use alloy::primitives::address;

    #[test]
    fn record_deployment_uses_network_name() {
        let mut book = AddressBook::new();
        let addr = address!("3333333333333333333333333333333333333333");

        let d = record_deployment(&mut book, 31337, Some(&HARDHAT), addr);
        assert_eq!(d.chain_name, "hardhat");
        assert_eq!(book.resolve(Some(31337)), Some(addr));

        let d = record_deployment(&mut book, 9000, None, addr);
        assert_eq!(d.chain_name, "chain-9000");
    }
}
