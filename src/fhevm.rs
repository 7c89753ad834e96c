// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! FHEVM relayer seam.
//!
//! The relayer SDK encrypts inputs client-side (producing handles plus a
//! zero-knowledge input proof), generates the ephemeral keypair used for
//! user decryption, and performs the KMS re-encryption round trip. This
//! crate only drives it; implementations live with the embedding
//! application.

use std::collections::HashMap;

use alloy::primitives::{Address, Bytes, U256};
use async_trait::async_trait;

use crate::blockchain::{DecryptionDomain, Handle};
use crate::signature::DecryptionSignature;

/// One plaintext queued for encryption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlainValue {
    U32(u32),
}

/// Encrypted input under construction, bound to (contract, user).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedInputBuilder {
    pub contract: Address,
    pub user: Address,
    pub values: Vec<PlainValue>,
}

impl EncryptedInputBuilder {
    pub fn new(contract: Address, user: Address) -> Self {
        Self {
            contract,
            user,
            values: Vec::new(),
        }
    }

    pub fn add32(&mut self, value: u32) -> &mut Self {
        self.values.push(PlainValue::U32(value));
        self
    }
}

/// Output of [`FhevmInstance::encrypt`]: one handle per queued value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedInput {
    pub handles: Vec<Handle>,
    pub input_proof: Bytes,
}

/// Ephemeral keypair the KMS re-encrypts results for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FhevmKeypair {
    pub public_key: Bytes,
    pub private_key: Bytes,
}

/// A handle and the contract that is allowed to expose it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandleContractPair {
    pub handle: Handle,
    pub contract_address: Address,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum FhevmError {
    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("keypair generation failed: {0}")]
    Keypair(String),

    #[error("decryption failed: {0}")]
    Decryption(String),

    #[error("relayer unreachable: {0}")]
    Relayer(String),
}

/// Client-side FHEVM instance.
#[async_trait]
pub trait FhevmInstance: Send + Sync {
    /// Start an encrypted input for `contract`, to be submitted by `user`.
    fn create_encrypted_input(&self, contract: Address, user: Address) -> EncryptedInputBuilder {
        EncryptedInputBuilder::new(contract, user)
    }

    /// Encrypt the queued values and produce the input proof.
    async fn encrypt(&self, input: EncryptedInputBuilder) -> Result<EncryptedInput, FhevmError>;

    /// Fresh keypair for a user decryption authorization.
    fn generate_keypair(&self) -> Result<FhevmKeypair, FhevmError>;

    /// EIP-712 domain of the decryption verifier.
    fn decryption_domain(&self) -> DecryptionDomain;

    /// Re-encrypt and decrypt `pairs` under an authorization signature.
    async fn user_decrypt(
        &self,
        pairs: &[HandleContractPair],
        signature: &DecryptionSignature,
    ) -> Result<HashMap<Handle, U256>, FhevmError>;
}
