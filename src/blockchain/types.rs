// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Blockchain types, network constants and the deployment address table.

use std::collections::BTreeMap;
use std::path::Path;

use alloy::primitives::{keccak256, Address, B256, U256};
use serde::{Deserialize, Serialize};

use super::client::LedgerClientError;

/// Opaque reference to a ciphertext held by the FHEVM coprocessor.
pub type Handle = B256;

/// The handle the contract returns before any value was ever written.
pub const EMPTY_HANDLE: Handle = B256::ZERO;

/// FHEVM network configuration.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Network name for display
    pub name: &'static str,
    /// Chain ID
    pub chain_id: u64,
    /// Block explorer base URL, if the network has one
    pub explorer_url: Option<&'static str>,
}

impl NetworkConfig {
    /// Explorer page of a transaction.
    pub fn explorer_tx_url(&self, tx_hash: B256) -> Option<String> {
        self.explorer_url.map(|base| format!("{base}/tx/{tx_hash}"))
    }
}

/// Ethereum Sepolia (Zama FHEVM coprocessor) configuration.
pub const SEPOLIA: NetworkConfig = NetworkConfig {
    name: "sepolia",
    chain_id: 11155111,
    explorer_url: Some("https://sepolia.etherscan.io"),
};

/// Local hardhat node running the FHEVM mock coprocessor.
pub const HARDHAT: NetworkConfig = NetworkConfig {
    name: "hardhat",
    chain_id: 31337,
    explorer_url: None,
};

/// Look up a known network by chain id.
pub fn network_by_chain_id(chain_id: u64) -> Option<NetworkConfig> {
    [SEPOLIA, HARDHAT]
        .into_iter()
        .find(|n| n.chain_id == chain_id)
}

/// Content address of a URL or tag: keccak-256 over its UTF-8 bytes.
pub fn text_hash(text: &str) -> B256 {
    keccak256(text.as_bytes())
}

/// A link owned by the current account, as returned by `getOwnerLinks`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnedLink {
    pub url_hash: B256,
    /// Block timestamp (seconds) at which the link was saved
    pub timestamp: U256,
}

/// One row of the trending view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendingLink {
    pub url_hash: B256,
    /// Number of distinct accounts that saved this URL
    pub count: U256,
}

/// Deployment entry of the SecureLinks contract on one network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub address: Address,
    pub chain_id: u64,
    pub chain_name: String,
}

/// Static chain id → deployment table.
///
/// Serialized the same way the front-end's `SecureLinksAddresses` table is:
/// `{ "11155111": { "address": "0x…", "chainId": 11155111, "chainName": "sepolia" } }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AddressBook {
    entries: BTreeMap<String, Deployment>,
}

impl AddressBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the table from a JSON file.
    pub fn load(path: &Path) -> Result<Self, LedgerClientError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            LedgerClientError::AddressBook(format!("{}: {e}", path.display()))
        })?;
        serde_json::from_str(&raw)
            .map_err(|e| LedgerClientError::AddressBook(format!("{}: {e}", path.display())))
    }

    /// Write the table as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), LedgerClientError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| LedgerClientError::AddressBook(e.to_string()))?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| LedgerClientError::AddressBook(e.to_string()))?;
        std::fs::write(path, json).map_err(|e| LedgerClientError::AddressBook(e.to_string()))
    }

    pub fn insert(&mut self, deployment: Deployment) {
        self.entries
            .insert(deployment.chain_id.to_string(), deployment);
    }

    /// Resolve the contract address for a chain.
    ///
    /// Returns `None` when the chain is unknown or the recorded address is
    /// the zero address ("not deployed here").
    pub fn resolve(&self, chain_id: Option<u64>) -> Option<Address> {
        self.deployment(chain_id).map(|d| d.address)
    }

    /// Deployment entry for a chain, skipping zero-address placeholders.
    pub fn deployment(&self, chain_id: Option<u64>) -> Option<&Deployment> {
        let chain_id = chain_id?;
        self.entries
            .get(&chain_id.to_string())
            .filter(|d| d.address != Address::ZERO)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Deployment> {
        self.entries.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    #[test]
    fn text_hash_matches_keccak_of_utf8() {
        // keccak256("") is a well-known constant
        assert_eq!(
            text_hash(""),
            "0xc5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
                .parse::<B256>()
                .unwrap()
        );
        assert_eq!(text_hash("https://a.com"), text_hash("https://a.com"));
        assert_ne!(text_hash("https://a.com"), text_hash("https://b.com"));
    }

    #[test]
    fn explorer_link_only_on_public_networks() {
        let tx = B256::repeat_byte(0xab);
        let url = network_by_chain_id(11155111)
            .and_then(|n| n.explorer_tx_url(tx))
            .unwrap();
        assert_eq!(url, format!("https://sepolia.etherscan.io/tx/{tx}"));
        assert_eq!(HARDHAT.explorer_tx_url(tx), None);
    }

    #[test]
    fn address_book_parses_frontend_table() {
        let json = r#"{
            "11155111": { "address": "0x1111111111111111111111111111111111111111", "chainId": 11155111, "chainName": "sepolia" },
            "31337": { "address": "0x0000000000000000000000000000000000000000", "chainId": 31337, "chainName": "hardhat" }
        }"#;
        let book: AddressBook = serde_json::from_str(json).unwrap();

        assert_eq!(
            book.resolve(Some(11155111)),
            Some(address!("1111111111111111111111111111111111111111"))
        );
        // zero address means "not deployed here"
        assert_eq!(book.resolve(Some(31337)), None);
        assert_eq!(book.resolve(Some(1)), None);
        assert_eq!(book.resolve(None), None);
    }

    #[test]
    fn address_book_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("abi").join("SecureLinksAddresses.json");

        let mut book = AddressBook::new();
        book.insert(Deployment {
            address: address!("2222222222222222222222222222222222222222"),
            chain_id: 31337,
            chain_name: "hardhat".to_string(),
        });
        book.save(&path).unwrap();

        let loaded = AddressBook::load(&path).unwrap();
        assert_eq!(loaded, book);
    }

    #[test]
    fn known_networks() {
        assert_eq!(network_by_chain_id(31337).unwrap().name, "hardhat");
        assert_eq!(network_by_chain_id(11155111).unwrap().name, "sepolia");
        assert!(network_by_chain_id(1).is_none());
    }
}
