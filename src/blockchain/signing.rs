// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet signing for FHEVM decryption authorizations.
//!
//! A user decryption is authorized by an EIP-712 `UserDecryptRequestVerification`
//! signature over the ephemeral public key, the contract set and a validity
//! window. This module defines the typed-data payload, the [`WalletSigner`]
//! seam the coordinators sign through, and a local-key implementation.

use std::borrow::Cow;

use alloy::{
    primitives::{Address, Bytes, B256, U256},
    signers::{local::PrivateKeySigner, Signer},
    sol,
    sol_types::{Eip712Domain, SolStruct},
};
use async_trait::async_trait;
use k256::SecretKey;
use serde::{Deserialize, Serialize};

use super::client::{create_signer, LedgerClientError};

sol! {
    /// Typed data the KMS verifies before re-encrypting a handle for a user.
    #[derive(Debug)]
    struct UserDecryptRequestVerification {
        bytes publicKey;
        address[] contractAddresses;
        uint256 startTimestamp;
        uint256 durationDays;
        bytes extraData;
    }
}

/// Primary type name of the decryption authorization.
pub const DECRYPT_PRIMARY_TYPE: &str = "UserDecryptRequestVerification";

/// EIP-712 domain of the decryption verifier contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecryptionDomain {
    pub name: String,
    pub version: String,
    /// Gateway chain id (not necessarily the host chain)
    pub chain_id: u64,
    pub verifying_contract: Address,
}

impl DecryptionDomain {
    pub fn to_eip712_domain(&self) -> Eip712Domain {
        Eip712Domain::new(
            Some(Cow::Owned(self.name.clone())),
            Some(Cow::Owned(self.version.clone())),
            Some(U256::from(self.chain_id)),
            Some(self.verifying_contract),
            None,
        )
    }
}

/// Message body of [`UserDecryptRequestVerification`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecryptRequestMessage {
    pub public_key: Bytes,
    pub contract_addresses: Vec<Address>,
    pub start_timestamp: u64,
    pub duration_days: u64,
    pub extra_data: Bytes,
}

/// Full typed-data request presented to the wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Eip712Request {
    pub domain: DecryptionDomain,
    pub primary_type: String,
    pub message: DecryptRequestMessage,
}

impl Eip712Request {
    pub fn new(
        domain: DecryptionDomain,
        public_key: Bytes,
        contract_addresses: Vec<Address>,
        start_timestamp: u64,
        duration_days: u64,
    ) -> Self {
        Self {
            domain,
            primary_type: DECRYPT_PRIMARY_TYPE.to_string(),
            message: DecryptRequestMessage {
                public_key,
                contract_addresses,
                start_timestamp,
                duration_days,
                extra_data: Bytes::from_static(&[0x00]),
            },
        }
    }

    pub fn typed_message(&self) -> UserDecryptRequestVerification {
        UserDecryptRequestVerification {
            publicKey: self.message.public_key.clone(),
            contractAddresses: self.message.contract_addresses.clone(),
            startTimestamp: U256::from(self.message.start_timestamp),
            durationDays: U256::from(self.message.duration_days),
            extraData: self.message.extra_data.clone(),
        }
    }

    /// The digest the wallet actually signs.
    pub fn signing_hash(&self) -> B256 {
        self.typed_message()
            .eip712_signing_hash(&self.domain.to_eip712_domain())
    }
}

/// Wallet failure while signing.
#[derive(Debug, Clone, thiserror::Error)]
pub enum WalletError {
    /// The user declined the signature prompt.
    #[error("user rejected the signature request: {0}")]
    Rejected(String),

    /// The signing backend could not be reached.
    #[error("wallet unavailable: {0}")]
    Unavailable(String),
}

/// Typed-data signing capability of the connected account.
#[async_trait]
pub trait WalletSigner: Send + Sync {
    /// Address of the account that signs.
    fn address(&self) -> Address;

    /// Sign a decryption authorization, returning the 65-byte signature.
    ///
    /// May suspend indefinitely while a human approves the prompt.
    async fn sign_typed_data(&self, request: &Eip712Request) -> Result<Bytes, WalletError>;
}

/// Signer backed by a local secp256k1 key.
#[derive(Debug, Clone)]
pub struct LocalWalletSigner {
    inner: PrivateKeySigner,
}

impl LocalWalletSigner {
    pub fn new(inner: PrivateKeySigner) -> Self {
        Self { inner }
    }

    pub fn from_hex(private_key_hex: &str) -> Result<Self, LedgerClientError> {
        create_signer(private_key_hex).map(Self::new)
    }

    pub fn inner(&self) -> &PrivateKeySigner {
        &self.inner
    }
}

#[async_trait]
impl WalletSigner for LocalWalletSigner {
    fn address(&self) -> Address {
        self.inner.address()
    }

    async fn sign_typed_data(&self, request: &Eip712Request) -> Result<Bytes, WalletError> {
        let signature = self
            .inner
            .sign_typed_data(&request.typed_message(), &request.domain.to_eip712_domain())
            .await
            .map_err(|e| WalletError::Unavailable(e.to_string()))?;
        Ok(Bytes::from(signature.as_bytes().to_vec()))
    }
}

/// Parse a PEM private key (SEC1 or PKCS#8) to a hex string.
pub fn pem_to_hex(pem_bytes: &[u8]) -> Result<String, LedgerClientError> {
    let pem_str = std::str::from_utf8(pem_bytes)
        .map_err(|e| LedgerClientError::InvalidPrivateKey(format!("Invalid UTF-8: {}", e)))?;

    let pem = pem::parse(pem_str)
        .map_err(|e| LedgerClientError::InvalidPrivateKey(format!("Invalid PEM: {}", e)))?;

    let secret_key = SecretKey::from_sec1_der(pem.contents())
        .or_else(|_| parse_pkcs8_to_secret_key(pem.contents()))
        .map_err(|e| LedgerClientError::InvalidPrivateKey(format!("Invalid key format: {}", e)))?;

    Ok(alloy::hex::encode(secret_key.to_bytes()))
}

fn parse_pkcs8_to_secret_key(der: &[u8]) -> Result<SecretKey, String> {
    use k256::pkcs8::DecodePrivateKey;
    SecretKey::from_pkcs8_der(der).map_err(|e| e.to_string())
}

/// Create a wallet signer from a PEM-encoded private key.
pub fn signer_from_pem(pem_bytes: &[u8]) -> Result<LocalWalletSigner, LedgerClientError> {
    let hex_key = pem_to_hex(pem_bytes)?;
    LocalWalletSigner::from_hex(&hex_key)
}
