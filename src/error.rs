// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

use crate::transfer::TransferStatus;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Malformed message: {reason}")]
    MalformedMessage { reason: String },

    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: u64, available: u64 },

    #[error("Token account missing: {account}")]
    TokenAccountMissing { account: String },

    #[error("Transfer execution failed: {reason}")]
    TransferExecutionFailed { reason: String },

    #[error("Timeout waiting for attestation")]
    AttestationTimeout,

    #[error("Burn {tx_hash} for transfer {transfer_id} was submitted but not recorded: {reason}")]
    BurnNotRecorded {
        transfer_id: String,
        tx_hash: String,
        reason: String,
    },

    #[error("Chain not supported: {chain}")]
    UnsupportedChain { chain: String },

    #[error("Invalid status transition from {from} to {to}")]
    InvalidStatusTransition {
        from: TransferStatus,
        to: TransferStatus,
    },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Transfer not found: {0}")]
    TransferNotFound(String),

    #[error("Attestation not ready for transfer {transfer_id}")]
    AttestationNotReady { transfer_id: String },

    #[error("Attestation failed: {reason}")]
    AttestationFailed { reason: String },

    #[error("Rate limit exceeded, retry after {retry_after_seconds} seconds")]
    RateLimitExceeded { retry_after_seconds: u64 },

    #[error("Concurrent modification of transfer {transfer_id} (expected version {expected})")]
    ConcurrentModification { transfer_id: String, expected: u64 },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Transaction build error: {0}")]
    TransactionBuild(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("RPC error: {0}")]
    Rpc(#[from] alloy_json_rpc::RpcError<alloy_transport::TransportErrorKind>),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Hex conversion error: {0}")]
    Hex(#[from] alloy_primitives::hex::FromHexError),
}

impl BridgeError {
    /// Stable machine-readable code used in API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedMessage { .. } => "MALFORMED_MESSAGE",
            Self::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            Self::TokenAccountMissing { .. } => "TOKEN_ACCOUNT_MISSING",
            Self::TransferExecutionFailed { .. } => "TRANSFER_EXECUTION_FAILED",
            Self::AttestationTimeout => "ATTESTATION_TIMEOUT",
            Self::BurnNotRecorded { .. } => "BURN_NOT_RECORDED",
            Self::UnsupportedChain { .. } => "UNSUPPORTED_CHAIN",
            Self::InvalidStatusTransition { .. } => "INVALID_STATUS_TRANSITION",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::InvalidAddress { .. } => "INVALID_ADDRESS",
            Self::TransferNotFound(_) => "TRANSFER_NOT_FOUND",
            Self::AttestationNotReady { .. } => "ATTESTATION_NOT_READY",
            Self::AttestationFailed { .. } => "ATTESTATION_FAILED",
            Self::RateLimitExceeded { .. } => "RATE_LIMIT_EXCEEDED",
            Self::ConcurrentModification { .. } => "CONCURRENT_MODIFICATION",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Provider(_) | Self::Network(_) | Self::Rpc(_) => "UPSTREAM_ERROR",
            Self::TransactionBuild(_) | Self::Json(_) | Self::Hex(_) => {
                "ENCODING_ERROR"
            }
        }
    }

    /// True for failures detected before anything was submitted on-chain.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InsufficientBalance { .. }
                | Self::TokenAccountMissing { .. }
                | Self::InvalidRequest(_)
                | Self::InvalidAddress { .. }
                | Self::UnsupportedChain { .. }
        )
    }

    /// Message suitable for returning to an API caller.
    ///
    /// Upstream failures are collapsed to a generic message; the detail is
    /// only logged.
    pub fn public_message(&self) -> String {
        match self {
            Self::Provider(_) | Self::Network(_) | Self::Rpc(_) => {
                "upstream service unavailable".to_string()
            }
            Self::TransactionBuild(_) | Self::Json(_) | Self::Hex(_) => {
                "failed to encode or decode data".to_string()
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
