// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Secure Links - Encrypted Link Registry Client
//!
//! Client-side coordinator for the SecureLinks FHEVM contract. Links are
//! stored on-chain only as keccak-256 hashes; each save also submits an
//! FHE-encrypted counter increment, and the caller's private count can be
//! decrypted after a one-time EIP-712 authorization.
//!
//! ## Modules
//!
//! - `blockchain` - Contract binding, providers, signers, deployment
//! - `fhevm` - Relayer seam (encrypted inputs, user decryption)
//! - `signature` / `storage` - Reusable decryption authorizations
//! - `environment` - Live chain/account and staleness checks
//! - `store` - Own links, trending links, count handle
//! - `coordinator` - Save and decrypt flows
//! - `state` - Session wiring and the environment watcher
//! - `abi` - Hardhat artifact loading and ABI export

pub mod abi;
pub mod blockchain;
pub mod config;
pub mod coordinator;
pub mod environment;
pub mod error;
pub mod fhevm;
pub mod signature;
pub mod state;
pub mod status;
pub mod storage;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;
