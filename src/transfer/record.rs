// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! The persisted state of one transfer.

use std::collections::BTreeMap;

use alloy_primitives::{Bytes, FixedBytes};
use bon::Builder;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::status::TransferStatus;
use crate::error::{BridgeError, Result};
use crate::protocol::{message_hash, FinalityThreshold};

/// Engine step a failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStep {
    Burn,
    Attestation,
    Mint,
}

/// Failure detail owned by the engine, kept apart from caller metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferFailure {
    pub step: TransferStep,
    pub code: String,
    pub message: String,
    pub failed_at: DateTime<Utc>,
}

/// A cross-chain transfer and everything learned about it so far.
#[derive(Builder, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRecord {
    #[builder(default = new_transfer_id())]
    pub id: String,
    #[builder(into)]
    pub source_chain: String,
    #[builder(into)]
    pub destination_chain: String,
    /// Smallest USDC unit (6 decimals)
    pub amount: u64,
    #[builder(into)]
    pub source_address: String,
    #[builder(into)]
    pub destination_address: String,
    #[builder(default = TransferStatus::Created)]
    pub status: TransferStatus,
    pub burn_tx_hash: Option<String>,
    pub mint_tx_hash: Option<String>,
    pub message_bytes: Option<Bytes>,
    pub message_hash: Option<FixedBytes<32>>,
    pub attestation_bytes: Option<Bytes>,
    #[builder(default)]
    pub finality_threshold: FinalityThreshold,
    #[builder(default)]
    pub max_fee: u64,
    /// Caller-supplied data only
    #[builder(default)]
    pub metadata: BTreeMap<String, String>,
    pub error: Option<TransferFailure>,
    /// Bumped by the store on every successful update
    #[builder(default)]
    pub version: u64,
    #[builder(default = Utc::now())]
    pub created_at: DateTime<Utc>,
    #[builder(default = Utc::now())]
    pub updated_at: DateTime<Utc>,
}

/// Random 128-bit identifier, hex encoded.
pub fn new_transfer_id() -> String {
    format!("{:032x}", rand::random::<u128>())
}

impl TransferRecord {
    pub fn transition_to(&mut self, next: TransferStatus) -> Result<()> {
        self.status = self.status.transition(next)?;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Moves forward to `next` if that is a legal transition; otherwise a no-op.
    ///
    /// Returns whether the status changed.
    pub fn upgrade_to(&mut self, next: TransferStatus) -> bool {
        if next != TransferStatus::Failed && self.status.can_transition_to(next) {
            self.status = next;
            self.updated_at = Utc::now();
            true
        } else {
            false
        }
    }

    /// Stores the burn hash after a successful submission.
    pub fn record_burn(&mut self, tx_hash: impl Into<String>, confirmed: bool) -> Result<()> {
        if self.burn_tx_hash.is_some() {
            return Err(BridgeError::InvalidRequest(format!(
                "transfer {} already has a burn transaction",
                self.id
            )));
        }
        self.burn_tx_hash = Some(tx_hash.into());
        if confirmed {
            self.transition_to(TransferStatus::Confirmed)?;
        } else {
            self.updated_at = Utc::now();
        }
        Ok(())
    }

    /// Caches a complete attestation and moves to `Bridging` when legal.
    ///
    /// Terminal records are left untouched; returns whether anything was cached.
    pub fn record_attestation(&mut self, message: Bytes, attestation: Bytes) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.message_hash = Some(message_hash(&message));
        self.message_bytes = Some(message);
        self.attestation_bytes = Some(attestation);
        self.upgrade_to(TransferStatus::Bridging);
        self.updated_at = Utc::now();
        true
    }

    /// Stores the mint hash; `Completed` once confirmed.
    pub fn record_mint(&mut self, tx_hash: impl Into<String>, confirmed: bool) -> Result<()> {
        self.mint_tx_hash = Some(tx_hash.into());
        if confirmed {
            self.transition_to(TransferStatus::Completed)?;
        } else {
            self.updated_at = Utc::now();
        }
        Ok(())
    }

    /// Marks the transfer failed with the error that caused it.
    pub fn record_failure(&mut self, step: TransferStep, error: &BridgeError) -> Result<()> {
        self.transition_to(TransferStatus::Failed)?;
        self.error = Some(TransferFailure {
            step,
            code: error.code().to_string(),
            message: error.to_string(),
            failed_at: Utc::now(),
        });
        Ok(())
    }

    pub fn has_complete_attestation(&self) -> bool {
        self.message_bytes.is_some() && self.attestation_bytes.is_some()
    }

    /// Message and attestation, if both are cached.
    pub fn attested_message(&self) -> Option<(&Bytes, &Bytes)> {
        self.message_bytes.as_ref().zip(self.attestation_bytes.as_ref())
    }

    /// True if `hash` names this transfer's burn, mint, or message.
    pub fn matches_hash(&self, hash: &str) -> bool {
        let same = |stored: &str| {
            if stored.starts_with("0x") && hash.starts_with("0x") {
                stored.eq_ignore_ascii_case(hash)
            } else {
                stored == hash
            }
        };

        self.burn_tx_hash.as_deref().is_some_and(same)
            || self.mint_tx_hash.as_deref().is_some_and(same)
            || self
                .message_hash
                .is_some_and(|h| h.to_string().eq_ignore_ascii_case(hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> TransferRecord {
        TransferRecord::builder()
            .source_chain("ethereum")
            .destination_chain("solana")
            .amount(10_500_000)
            .source_address("0x742d35Cc6634C0532925a3b844Bc9e7595f8fA0d")
            .destination_address("TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA")
            .build()
    }

    #[test]
    fn test_new_record_defaults() {
        let record = record();
        assert_eq!(record.status, TransferStatus::Created);
        assert_eq!(record.id.len(), 32);
        assert_eq!(record.version, 0);
        assert!(record.burn_tx_hash.is_none());
        assert_ne!(record.id, self::record().id);
    }

    #[test]
    fn test_burn_then_attestation_then_mint() {
        let mut record = record();
        record.transition_to(TransferStatus::Pending).unwrap();
        record.record_burn("0xabc", true).unwrap();
        assert_eq!(record.status, TransferStatus::Confirmed);

        assert!(record.record_attestation(Bytes::from(vec![1u8; 232]), Bytes::from(vec![2u8; 65])));
        assert_eq!(record.status, TransferStatus::Bridging);
        assert!(record.has_complete_attestation());
        assert!(record.message_hash.is_some());

        record.record_mint("0xdef", true).unwrap();
        assert_eq!(record.status, TransferStatus::Completed);
    }

    #[test]
    fn test_unconfirmed_burn_stays_pending() {
        let mut record = record();
        record.transition_to(TransferStatus::Pending).unwrap();
        record.record_burn("0xabc", false).unwrap();
        assert_eq!(record.status, TransferStatus::Pending);
        assert!(record.record_burn("0xabc", true).is_err());
    }

    #[test]
    fn test_failure_is_recorded_and_final() {
        let mut record = record();
        record.transition_to(TransferStatus::Pending).unwrap();
        let err = BridgeError::TransferExecutionFailed {
            reason: "execution reverted".into(),
        };
        record.record_failure(TransferStep::Burn, &err).unwrap();

        assert_eq!(record.status, TransferStatus::Failed);
        let failure = record.error.as_ref().unwrap();
        assert_eq!(failure.code, "TRANSFER_EXECUTION_FAILED");
        assert_eq!(failure.step, TransferStep::Burn);
        assert!(record.metadata.is_empty());
        assert!(record.transition_to(TransferStatus::Pending).is_err());
    }

    #[test]
    fn test_attestation_not_cached_on_failed_record() {
        let mut record = record();
        record.transition_to(TransferStatus::Failed).unwrap();
        let updated_at = record.updated_at;

        assert!(!record.record_attestation(Bytes::from(vec![1u8]), Bytes::from(vec![2u8])));
        assert_eq!(record.status, TransferStatus::Failed);
        assert!(!record.has_complete_attestation());
        assert!(record.message_hash.is_none());
        assert_eq!(record.updated_at, updated_at);
    }

    #[test]
    fn test_matches_hash() {
        let mut record = record();
        record.burn_tx_hash = Some("0xABCDEF".into());
        record.mint_tx_hash = Some("5VERv8NMvzbJMEkV8xnrLkEaWRtSz9CosKDYjCJjBRnbJLgp8uirBgmQpjKhoR4tjF3ZpRzrFmBV6UjKdiSZkQUW".into());

        assert!(record.matches_hash("0xabcdef"));
        assert!(record.matches_hash(
            "5VERv8NMvzbJMEkV8xnrLkEaWRtSz9CosKDYjCJjBRnbJLgp8uirBgmQpjKhoR4tjF3ZpRzrFmBV6UjKdiSZkQUW"
        ));
        assert!(!record.matches_hash("0x1234"));
    }
}
