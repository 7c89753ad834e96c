// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration Constants
//!
//! This module defines environment variable names and default values used
//! by the `secure-links` binary. Command-line flags override them.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `RPC_URL` | JSON-RPC endpoint of the target chain | `http://127.0.0.1:8545` |
//! | `PRIVATE_KEY` | Hex private key of the account (deploy, own views) | Optional |
//! | `PRIVATE_KEY_PEM` | Path to a PKCS#8 PEM key, used when `PRIVATE_KEY` is unset | Optional |
//! | `ADDRESS_BOOK` | JSON table of deployments per chain id | `shared/abi/SecureLinksAddresses.json` |
//! | `SIGNATURE_DB` | redb file holding decryption signatures | `secure-links.redb` |
//! | `DECRYPTION_DURATION_DAYS` | Validity of new decryption signatures | `365` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info` |

use std::path::PathBuf;

use crate::signature::DEFAULT_DURATION_DAYS;

/// Environment variable name for the JSON-RPC endpoint.
pub const RPC_URL_ENV: &str = "RPC_URL";

/// Local hardhat node.
pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";

/// Environment variable name for the hex-encoded account key.
///
/// Never logged. Required by `deploy`; read-only views fall back to the
/// zero address as caller when no key is configured.
pub const PRIVATE_KEY_ENV: &str = "PRIVATE_KEY";

/// Environment variable name for a PEM-encoded account key file.
pub const PRIVATE_KEY_PEM_ENV: &str = "PRIVATE_KEY_PEM";

/// Environment variable name for the deployment address table.
pub const ADDRESS_BOOK_ENV: &str = "ADDRESS_BOOK";

/// Written by `deploy`, read by everything else.
pub const DEFAULT_ADDRESS_BOOK: &str = "shared/abi/SecureLinksAddresses.json";

/// Environment variable name for the signature database path.
pub const SIGNATURE_DB_ENV: &str = "SIGNATURE_DB";

pub const DEFAULT_SIGNATURE_DB: &str = "secure-links.redb";

/// Environment variable name for the decryption authorization lifetime.
pub const DECRYPTION_DURATION_DAYS_ENV: &str = "DECRYPTION_DURATION_DAYS";

/// Environment variable name for the log output format.
///
/// # Values
/// - `json` - one JSON object per line
/// - `pretty` (default) - human-readable, with file and line
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} is not valid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Settings resolved from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub rpc_url: String,
    pub private_key: Option<String>,
    pub private_key_pem: Option<PathBuf>,
    pub address_book: PathBuf,
    pub signature_db: PathBuf,
    pub decryption_duration_days: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolve settings through `lookup`; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let decryption_duration_days = match get(DECRYPTION_DURATION_DAYS_ENV) {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(days) if days > 0 => days,
                Ok(_) => {
                    return Err(ConfigError::Invalid {
                        name: DECRYPTION_DURATION_DAYS_ENV,
                        reason: "must be at least 1".into(),
                    })
                }
                Err(e) => {
                    return Err(ConfigError::Invalid {
                        name: DECRYPTION_DURATION_DAYS_ENV,
                        reason: e.to_string(),
                    })
                }
            },
            None => DEFAULT_DURATION_DAYS,
        };

        Ok(Self {
            rpc_url: get(RPC_URL_ENV).unwrap_or_else(|| DEFAULT_RPC_URL.to_string()),
            private_key: get(PRIVATE_KEY_ENV),
            private_key_pem: get(PRIVATE_KEY_PEM_ENV).map(PathBuf::from),
            address_book: get(ADDRESS_BOOK_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_ADDRESS_BOOK)),
            signature_db: get(SIGNATURE_DB_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SIGNATURE_DB)),
            decryption_duration_days,
        })
    }
}
