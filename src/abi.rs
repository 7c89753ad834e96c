// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Hardhat artifact handling: ABI export and deploy bytecode.
//!
//! The compiled artifact lives at
//! `artifacts/contracts/SecureLinks.sol/SecureLinks.json`; the front-end
//! consumes only its `abi` array, written to `shared/abi/SecureLinks.json`.

use std::path::{Path, PathBuf};

use alloy::{json_abi::JsonAbi, primitives::Bytes};
use serde::Deserialize;

/// Default artifact location relative to the contracts package.
pub const DEFAULT_ARTIFACT_PATH: &str = "artifacts/contracts/SecureLinks.sol/SecureLinks.json";

/// Default ABI output location.
pub const DEFAULT_ABI_OUT: &str = "shared/abi/SecureLinks.json";

/// The subset of a hardhat artifact this crate reads.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HardhatArtifact {
    pub contract_name: String,
    pub abi: JsonAbi,
    #[serde(default)]
    pub bytecode: Bytes,
}

impl HardhatArtifact {
    pub fn load(path: &Path) -> Result<Self, AbiError> {
        let raw = std::fs::read_to_string(path).map_err(|e| AbiError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&raw).map_err(|e| AbiError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Creation bytecode, refusing abstract contracts and interfaces.
    pub fn deploy_code(&self) -> Result<Bytes, AbiError> {
        if self.bytecode.is_empty() {
            return Err(AbiError::NoBytecode(self.contract_name.clone()));
        }
        Ok(self.bytecode.clone())
    }
}

/// Write the artifact's ABI as pretty JSON, creating parent directories.
///
/// Returns the number of ABI items written.
pub fn export_abi(artifact_path: &Path, out_path: &Path) -> Result<usize, AbiError> {
    let artifact = HardhatArtifact::load(artifact_path)?;

    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| AbiError::Io {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let json = serde_json::to_string_pretty(&artifact.abi).map_err(|e| AbiError::Parse {
        path: out_path.to_path_buf(),
        source: e,
    })?;
    std::fs::write(out_path, json).map_err(|e| AbiError::Io {
        path: out_path.to_path_buf(),
        source: e,
    })?;

    let items = artifact.abi.len();
    tracing::info!(
        contract = %artifact.contract_name,
        items,
        out = %out_path.display(),
        "ABI exported"
    );
    Ok(items)
}

#[derive(Debug, thiserror::Error)]
pub enum AbiError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid artifact JSON at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("artifact {0} has no creation bytecode")]
    NoBytecode(String),
}
