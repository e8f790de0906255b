// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Merges a stored record with what the chain and the attestation service
//! currently report.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn, Instrument};

use super::record::{TransferRecord, TransferStep};
use super::status::{can_complete, TransferStatus};
use crate::attestation::AttestationClient;
use crate::chain::ChainRegistry;
use crate::error::{BridgeError, Result};
use crate::executor::{Executors, TxConfirmation};
use crate::spans;
use crate::traits::TransferStore;

/// Merged view of one transfer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferStatusReport {
    pub source_chain: String,
    pub tx_hash: String,
    /// Reconciled status; `Created` when no record exists and the burn is unknown
    pub status: TransferStatus,
    pub burn_found: bool,
    pub burn_confirmed: bool,
    pub confirmations: u64,
    pub attestation_complete: bool,
    pub can_complete: bool,
    pub record: Option<TransferRecord>,
}

/// Status implied by chain and attestation observations alone.
pub fn observed_status(burn: &TxConfirmation, attestation_complete: bool) -> TransferStatus {
    if burn.failed {
        TransferStatus::Failed
    } else if burn.confirmed && attestation_complete {
        TransferStatus::Bridging
    } else if burn.confirmed {
        TransferStatus::Confirmed
    } else if burn.found {
        TransferStatus::Pending
    } else {
        TransferStatus::Created
    }
}

/// Moves `current` towards `observed` only when that is a forward step.
///
/// Terminal states never change and an observation never moves a record
/// backwards.
pub fn reconcile_status(current: TransferStatus, observed: TransferStatus) -> TransferStatus {
    if current.can_transition_to(observed) {
        observed
    } else {
        current
    }
}

/// Answers status queries and writes forward-only corrections back.
#[derive(Clone)]
pub struct StateMachine {
    store: Arc<dyn TransferStore>,
    chains: Arc<ChainRegistry>,
    executors: Executors,
    attestation: AttestationClient,
}

impl std::fmt::Debug for StateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateMachine")
            .field("executors", &self.executors)
            .finish_non_exhaustive()
    }
}

impl StateMachine {
    pub fn new(
        store: Arc<dyn TransferStore>,
        chains: Arc<ChainRegistry>,
        executors: Executors,
        attestation: AttestationClient,
    ) -> Self {
        Self {
            store,
            chains,
            executors,
            attestation,
        }
    }

    pub async fn get_transfer_status(
        &self,
        source_chain: &str,
        tx_hash: &str,
    ) -> Result<TransferStatusReport> {
        async {
            let result = self.reconcile(source_chain, tx_hash).await;
            if let Err(e) = &result {
                spans::record_error(e);
            }
            result
        }
        .instrument(spans::get_transfer_status(source_chain, tx_hash))
        .await
    }

    async fn reconcile(&self, source_chain: &str, tx_hash: &str) -> Result<TransferStatusReport> {
        let chain = self.chains.get(source_chain)?;
        let burn = self
            .executors
            .for_chain(chain)?
            .transaction_status(chain, tx_hash)
            .await?;

        let attestation_complete = if burn.confirmed {
            match self.attestation.get_attestation(source_chain, tx_hash).await {
                Ok(result) => result.is_complete(),
                Err(e) => {
                    warn!(error = %e, event = "attestation_lookup_failed");
                    false
                }
            }
        } else {
            false
        };

        // Re-read after the attestation lookup, which may have cached onto it.
        let record = self
            .store
            .find_by_hash(tx_hash)
            .await?
            .filter(|r| r.source_chain == source_chain);
        let attestation_complete =
            attestation_complete || record.as_ref().is_some_and(|r| r.has_complete_attestation());

        let observed = observed_status(&burn, attestation_complete);
        let record = match record {
            Some(record) => Some(self.write_back(record, observed).await?),
            None => None,
        };
        let status = record.as_ref().map_or(observed, |r| r.status);

        debug!(
            status = %status,
            confirmations = burn.confirmations,
            attestation_complete,
            event = "transfer_status_reconciled"
        );

        Ok(TransferStatusReport {
            source_chain: source_chain.to_string(),
            tx_hash: tx_hash.to_string(),
            status,
            burn_found: burn.found,
            burn_confirmed: burn.confirmed,
            confirmations: burn.confirmations,
            attestation_complete,
            can_complete: can_complete(burn.confirmed, attestation_complete),
            record,
        })
    }

    /// Persists `observed` if it moves `record` forward.
    ///
    /// A concurrent update wins; the record is then returned as read.
    async fn write_back(
        &self,
        mut record: TransferRecord,
        observed: TransferStatus,
    ) -> Result<TransferRecord> {
        let next = reconcile_status(record.status, observed);
        if next == record.status {
            return Ok(record);
        }

        let previous = record.status;
        if next == TransferStatus::Failed {
            record.record_failure(
                TransferStep::Burn,
                &BridgeError::TransferExecutionFailed {
                    reason: "burn transaction reverted".to_string(),
                },
            )?;
        } else {
            record.transition_to(next)?;
        }

        match self.store.update(record.clone()).await {
            Ok(stored) => {
                info!(
                    transfer_id = %stored.id,
                    from = %previous,
                    to = %stored.status,
                    event = "transfer_status_upgraded"
                );
                Ok(stored)
            }
            Err(BridgeError::ConcurrentModification { .. }) => {
                debug!(transfer_id = %record.id, event = "status_write_back_skipped");
                let current = self.store.find(&record.id).await?;
                Ok(current.unwrap_or(record))
            }
            Err(e) => Err(e),
        }
    }
}
