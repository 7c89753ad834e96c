// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Outcome taxonomy of the save, decrypt and refresh flows.

use crate::blockchain::LedgerClientError;
use crate::fhevm::FhevmError;

/// Why a flow did not complete.
///
/// `Busy` and `Unavailable` are silent no-ops: the flow never started.
/// `Cancelled` and `UserRejected` are informational. `Subsystem` carries the
/// underlying RPC, encryption or decryption message verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlowError {
    /// Another run of the same flow is in flight.
    #[error("another operation is already in progress")]
    Busy,

    /// A dependency (contract address, FHEVM instance, signer, handle) is missing.
    #[error("unavailable: {0}")]
    Unavailable(&'static str),

    /// The chain, account or contract changed while the flow was suspended.
    #[error("network or wallet changed, operation cancelled")]
    Cancelled,

    /// The user declined the wallet prompt.
    #[error("cancelled by user")]
    UserRejected,

    #[error("{0}")]
    Subsystem(String),
}

/// Substring wallets put in the message of a declined prompt.
/// Matched case-sensitively; any other spelling is a subsystem failure.
const USER_REJECTED_PATTERN: &str = "user rejected";

/// Classify a wallet/RPC error message.
pub fn classify_message(message: String) -> FlowError {
    if message.contains(USER_REJECTED_PATTERN) {
        FlowError::UserRejected
    } else {
        FlowError::Subsystem(message)
    }
}

impl From<LedgerClientError> for FlowError {
    fn from(e: LedgerClientError) -> Self {
        classify_message(e.to_string())
    }
}

impl From<FhevmError> for FlowError {
    fn from(e: FhevmError) -> Self {
        FlowError::Subsystem(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_rejection_is_recognized() {
        assert_eq!(
            classify_message("ethers-user-denied: user rejected action".into()),
            FlowError::UserRejected
        );
        assert_eq!(
            FlowError::from(LedgerClientError::TransactionFailed(
                "user rejected action (action=\"sendTransaction\")".into()
            )),
            FlowError::UserRejected
        );
    }

    #[test]
    fn other_messages_are_kept_verbatim() {
        let err = FlowError::from(LedgerClientError::RpcError("connection refused".into()));
        assert_eq!(err, FlowError::Subsystem("RPC error: connection refused".into()));
    }

    #[test]
    fn rejection_match_is_case_sensitive() {
        let message = "MetaMask Tx Signature: User rejected the transaction.";
        assert_eq!(
            classify_message(message.into()),
            FlowError::Subsystem(message.into())
        );
    }
}
