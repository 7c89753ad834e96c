// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! RPC provider construction for FHEVM networks.

use alloy::{
    network::EthereumWallet,
    providers::{Provider, ProviderBuilder},
    signers::local::PrivateKeySigner,
};

/// Parse an RPC endpoint URL.
fn parse_rpc_url(rpc_url: &str) -> Result<url::Url, LedgerClientError> {
    rpc_url
        .parse()
        .map_err(|e: url::ParseError| LedgerClientError::InvalidRpcUrl(e.to_string()))
}

/// Read-only HTTP provider (view calls only).
pub fn connect_readonly(rpc_url: &str) -> Result<impl Provider + Clone, LedgerClientError> {
    let url = parse_rpc_url(rpc_url)?;
    Ok(ProviderBuilder::new().connect_http(url))
}

/// HTTP provider that signs and sends transactions with `wallet`.
pub fn connect_with_wallet(
    rpc_url: &str,
    wallet: EthereumWallet,
) -> Result<impl Provider + Clone, LedgerClientError> {
    let url = parse_rpc_url(rpc_url)?;
    Ok(ProviderBuilder::new().wallet(wallet).connect_http(url))
}

/// Create a signer from a private key (hex string, `0x` prefix optional).
pub fn create_signer(private_key_hex: &str) -> Result<PrivateKeySigner, LedgerClientError> {
    let key_bytes = alloy::hex::decode(private_key_hex.trim())
        .map_err(|e| LedgerClientError::InvalidPrivateKey(e.to_string()))?;

    PrivateKeySigner::from_slice(&key_bytes)
        .map_err(|e| LedgerClientError::InvalidPrivateKey(e.to_string()))
}

/// Create an Ethereum wallet from a signer.
pub fn create_wallet(signer: PrivateKeySigner) -> EthereumWallet {
    EthereumWallet::from(signer)
}

/// Errors that can occur during blockchain operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerClientError {
    #[error("Invalid RPC URL: {0}")]
    InvalidRpcUrl(String),

    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("RPC error: {0}")]
    RpcError(String),

    #[error("Contract error: {0}")]
    ContractError(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Address book error: {0}")]
    AddressBook(String),
}
