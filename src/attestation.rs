// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Cache-through access to the attestation service.
//!
//! A complete attestation is fetched at most once per transfer: once it is
//! written into the [`TransferRecord`], later calls are answered from the
//! store without touching the service.

use std::sync::Arc;

use alloy_primitives::{Bytes, FixedBytes};
use serde::Serialize;
use tracing::{debug, info, warn, Instrument};

use crate::chain::ChainRegistry;
use crate::error::{BridgeError, Result};
use crate::protocol::{message_hash, AttestationStatus};
use crate::spans;
use crate::traits::{AttestationProvider, TransferStore};
use crate::transfer::TransferRecord;

/// Attempts at writing a fresh attestation back before giving up on the cache.
const WRITE_BACK_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttestationState {
    Pending,
    Complete,
}

/// What is known about the attestation for one burn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationResult {
    pub status: AttestationState,
    pub message: Option<Bytes>,
    pub attestation: Option<Bytes>,
    pub message_hash: Option<FixedBytes<32>>,
    /// Record the result was cached on, if the burn belongs to a known transfer
    pub transfer_id: Option<String>,
}

impl AttestationResult {
    pub fn pending(transfer_id: Option<String>) -> Self {
        Self {
            status: AttestationState::Pending,
            message: None,
            attestation: None,
            message_hash: None,
            transfer_id,
        }
    }

    pub fn complete(message: Bytes, attestation: Bytes, transfer_id: Option<String>) -> Self {
        Self {
            status: AttestationState::Complete,
            message_hash: Some(message_hash(&message)),
            message: Some(message),
            attestation: Some(attestation),
            transfer_id,
        }
    }

    /// The cached attestation of `record`, if it holds one.
    fn cached(record: &TransferRecord) -> Option<Self> {
        record.attested_message().map(|(message, attestation)| Self {
            status: AttestationState::Complete,
            message: Some(message.clone()),
            attestation: Some(attestation.clone()),
            message_hash: record.message_hash.or_else(|| Some(message_hash(message))),
            transfer_id: Some(record.id.clone()),
        })
    }

    pub fn is_complete(&self) -> bool {
        self.status == AttestationState::Complete
    }
}

/// Fetches attestations and caches complete ones on their transfer record.
#[derive(Clone)]
pub struct AttestationClient {
    provider: Arc<dyn AttestationProvider>,
    store: Arc<dyn TransferStore>,
    chains: Arc<ChainRegistry>,
}

impl std::fmt::Debug for AttestationClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttestationClient")
            .field("chains", &self.chains)
            .finish_non_exhaustive()
    }
}

impl AttestationClient {
    pub fn new(
        provider: Arc<dyn AttestationProvider>,
        store: Arc<dyn TransferStore>,
        chains: Arc<ChainRegistry>,
    ) -> Self {
        Self {
            provider,
            store,
            chains,
        }
    }

    /// Attestation for the burn `tx_ref` on `source_chain`.
    ///
    /// A transaction the service has not indexed yet, or a request that timed
    /// out, is `Pending` rather than an error.
    pub async fn get_attestation(&self, source_chain: &str, tx_ref: &str) -> Result<AttestationResult> {
        let chain = self.chains.get(source_chain)?;
        let source_domain = u32::from(chain.domain());

        async {
            let result = self.fetch(source_chain, source_domain, tx_ref).await;
            if let Err(e) = &result {
                spans::record_error(e);
            }
            result
        }
        .instrument(spans::get_attestation(source_domain, tx_ref))
        .await
    }

    async fn fetch(
        &self,
        source_chain: &str,
        source_domain: u32,
        tx_ref: &str,
    ) -> Result<AttestationResult> {
        let record = self
            .store
            .find_by_hash(tx_ref)
            .await?
            .filter(|r| r.source_chain == source_chain);

        if let Some(cached) = record.as_ref().and_then(AttestationResult::cached) {
            tracing::Span::current().record("cache_hit", true);
            debug!(transfer_id = ?cached.transfer_id, event = "attestation_cache_hit");
            return Ok(cached);
        }
        tracing::Span::current().record("cache_hit", false);

        let transfer_id = record.as_ref().map(|r| r.id.clone());
        let Some(response) = self.provider.get_messages(source_domain, tx_ref).await? else {
            debug!(event = "attestation_not_found");
            return Ok(AttestationResult::pending(transfer_id));
        };

        let Some(complete) = response.first_complete() else {
            if response
                .messages
                .iter()
                .any(|m| m.status == AttestationStatus::Failed)
            {
                warn!(event = "attestation_failed");
                return Err(BridgeError::AttestationFailed {
                    reason: format!("attestation service reported failure for {tx_ref}"),
                });
            }
            let statuses: Vec<AttestationStatus> = response.messages.iter().map(|m| m.status).collect();
            debug!(statuses = ?statuses, event = "attestation_pending");
            return Ok(AttestationResult::pending(transfer_id));
        };

        // first_complete guarantees both are present
        let (Some(message), Some(attestation)) =
            (complete.message.clone(), complete.attestation.clone())
        else {
            return Ok(AttestationResult::pending(transfer_id));
        };

        info!(
            message_length = message.len(),
            attestation_length = attestation.len(),
            event = "attestation_complete"
        );

        match record {
            Some(record) => self.write_back(record, message, attestation).await,
            None => {
                debug!(event = "attestation_without_transfer_record");
                Ok(AttestationResult::complete(message, attestation, None))
            }
        }
    }

    /// Caches a complete attestation on `record`.
    ///
    /// Losing a version race to another writer is fine as long as the winner
    /// cached an attestation; its copy is returned.
    async fn write_back(
        &self,
        mut record: TransferRecord,
        message: Bytes,
        attestation: Bytes,
    ) -> Result<AttestationResult> {
        for _ in 0..WRITE_BACK_ATTEMPTS {
            if !record.record_attestation(message.clone(), attestation.clone()) {
                debug!(
                    transfer_id = %record.id,
                    status = %record.status,
                    event = "attestation_not_cached_on_terminal_record"
                );
                return Ok(AttestationResult::complete(message, attestation, Some(record.id)));
            }
            match self.store.update(record.clone()).await {
                Ok(stored) => {
                    info!(
                        transfer_id = %stored.id,
                        status = %stored.status,
                        event = "attestation_cached"
                    );
                    return Ok(AttestationResult::complete(
                        message,
                        attestation,
                        Some(stored.id),
                    ));
                }
                Err(BridgeError::ConcurrentModification { .. }) => {
                    let fresh = self
                        .store
                        .find(&record.id)
                        .await?
                        .ok_or_else(|| BridgeError::TransferNotFound(record.id.clone()))?;
                    if let Some(cached) = AttestationResult::cached(&fresh) {
                        debug!(transfer_id = %fresh.id, event = "attestation_cached_concurrently");
                        return Ok(cached);
                    }
                    record = fresh;
                }
                Err(e) => return Err(e),
            }
        }

        warn!(transfer_id = %record.id, event = "attestation_write_back_abandoned");
        Ok(AttestationResult::complete(
            message,
            attestation,
            Some(record.id),
        ))
    }
}
