// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Blockchain integration for the SecureLinks contract.
//!
//! This module provides:
//! - Provider construction and local key signers
//! - The `ISecureLinks` binding behind the [`LinkLedger`] trait
//! - EIP-712 decryption-authorization signing
//! - Deployment and the per-network address table

pub mod client;
pub mod contract;
pub mod deploy;
pub mod signing;
pub mod types;

pub use client::{connect_readonly, connect_with_wallet, LedgerClientError};
pub use contract::{LinkLedger, SaveLinkCall, SecureLinksLedger, TxReceipt};
pub use signing::{
    DecryptionDomain, Eip712Request, LocalWalletSigner, WalletError, WalletSigner,
};
pub use types::*;
