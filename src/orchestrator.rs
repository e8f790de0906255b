// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! The four transfer use cases
//!
//! [`TransferOrchestrator`] validates requests, owns the [`TransferRecord`]
//! lifecycle and hands chain work to the [`TransferExecutor`] selected by
//! each chain's family:
//!
//! 1. [`initiate_transfer`](TransferOrchestrator::initiate_transfer) burns on
//!    the source chain.
//! 2. [`get_attestation`](TransferOrchestrator::get_attestation) polls the
//!    attestation service once and caches a complete answer.
//! 3. [`complete_transfer`](TransferOrchestrator::complete_transfer) mints on
//!    the destination chain.
//! 4. [`get_transfer_status`](TransferOrchestrator::get_transfer_status)
//!    reconciles a record with the chains.
//!
//! Each call performs at most one step; callers drive the sequence.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::Bytes;
use bon::Builder;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, trace, warn, Instrument};

use crate::attestation::{AttestationClient, AttestationResult};
use crate::chain::{ChainConfig, ChainFamily, ChainRegistry};
use crate::config::{EngineConfig, FeePolicy};
use crate::error::{BridgeError, Result};
use crate::executor::{BurnRequest, Executors, TransferExecutor, TransferSubmission};
use crate::hooks::{HookContext, HookRegistry};
use crate::protocol::{message_hash, mint_recipient_bytes, validate_address, FinalityThreshold};
use crate::response::ApiResponse;
use crate::spans;
use crate::traits::{AttestationProvider, HookDataGenerator, TransferStore};
use crate::transfer::{
    new_transfer_id, StateMachine, TransferRecord, TransferStatus, TransferStatusReport,
    TransferStep,
};

/// USDC has six decimals on every supported chain.
pub const USDC_DECIMALS: u32 = 6;

/// Default number of lookups made by [`TransferOrchestrator::wait_for_attestation`].
pub const DEFAULT_ATTESTATION_ATTEMPTS: u32 = 30;

/// Default pause between those lookups.
pub const DEFAULT_ATTESTATION_POLL_INTERVAL: Duration = Duration::from_secs(60);

const BURN_WRITE_ATTEMPTS: u32 = 3;

/// A caller's request to move USDC between two chains.
#[derive(Builder, Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    #[builder(into)]
    pub source_chain: String,
    #[builder(into)]
    pub destination_chain: String,
    /// Decimal USDC, e.g. `"10.5"`
    #[builder(into)]
    pub amount: String,
    /// Must be the engine's signer on the source chain
    #[builder(into)]
    pub source_address: String,
    #[builder(into)]
    pub destination_address: String,
    /// Defaults to the engine's configured tier
    #[serde(default)]
    pub finality: Option<FinalityThreshold>,
    /// Forwarded to the destination hook contract as is
    #[serde(default)]
    pub hook_data: Option<Bytes>,
    #[serde(default)]
    #[builder(default)]
    pub metadata: BTreeMap<String, String>,
}

/// Outcome of a submitted burn or mint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferReceipt {
    pub transfer_id: String,
    pub tx_hash: String,
    pub status: TransferStatus,
    /// False if the confirmation wait timed out
    pub confirmed: bool,
}

impl TransferReceipt {
    fn new(record: &TransferRecord, submission: TransferSubmission) -> Self {
        Self {
            transfer_id: record.id.clone(),
            tx_hash: submission.tx_hash,
            status: record.status,
            confirmed: submission.confirmed,
        }
    }
}

/// Parses a decimal USDC amount into its smallest unit.
///
/// At most six fractional digits; the result must be positive and fit a `u64`.
pub fn parse_usdc_amount(amount: &str) -> Result<u64> {
    let invalid = |reason: &str| BridgeError::InvalidRequest(format!("amount {amount:?} {reason}"));

    let (whole, fraction) = amount.split_once('.').unwrap_or((amount, ""));
    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid("is not a decimal number"));
    }
    if !whole.bytes().chain(fraction.bytes()).all(|b| b.is_ascii_digit()) {
        return Err(invalid("is not a decimal number"));
    }
    if fraction.len() > USDC_DECIMALS as usize {
        return Err(invalid("has more than 6 decimal places"));
    }

    let whole: u64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| invalid("is too large"))?
    };
    let fraction: u64 = if fraction.is_empty() {
        0
    } else {
        let digits: u64 = fraction.parse().map_err(|_| invalid("is not a decimal number"))?;
        digits * 10u64.pow(USDC_DECIMALS - fraction.len() as u32)
    };

    let units = whole
        .checked_mul(10u64.pow(USDC_DECIMALS))
        .and_then(|w| w.checked_add(fraction))
        .ok_or_else(|| invalid("is too large"))?;
    if units == 0 {
        return Err(invalid("must be greater than zero"));
    }
    Ok(units)
}

/// A request that passed validation, with everything resolved.
struct ValidatedTransfer<'a> {
    source: &'a ChainConfig,
    destination: &'a ChainConfig,
    amount: u64,
    finality: FinalityThreshold,
    max_fee: u64,
}

/// Drives transfers through burn, attestation and mint.
pub struct TransferOrchestrator {
    chains: Arc<ChainRegistry>,
    store: Arc<dyn TransferStore>,
    executors: Executors,
    attestation: AttestationClient,
    state_machine: StateMachine,
    hooks: Arc<HookRegistry>,
    hook_generator: Option<Arc<dyn HookDataGenerator>>,
    fee_policy: FeePolicy,
    default_finality: FinalityThreshold,
}

impl std::fmt::Debug for TransferOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferOrchestrator")
            .field("chains", &self.chains)
            .field("executors", &self.executors)
            .field("fee_policy", &self.fee_policy)
            .field("default_finality", &self.default_finality)
            .field("hook_generator", &self.hook_generator.is_some())
            .finish_non_exhaustive()
    }
}

#[bon::bon]
impl TransferOrchestrator {
    #[builder]
    pub fn new(
        chains: ChainRegistry,
        store: Arc<dyn TransferStore>,
        executors: Executors,
        attestation_provider: Arc<dyn AttestationProvider>,
        #[builder(default)] hooks: Arc<HookRegistry>,
        hook_generator: Option<Arc<dyn HookDataGenerator>>,
        #[builder(default)] fee_policy: FeePolicy,
        #[builder(default)] default_finality: FinalityThreshold,
    ) -> Self {
        let chains = Arc::new(chains);
        let attestation =
            AttestationClient::new(attestation_provider, store.clone(), chains.clone());
        let state_machine = StateMachine::new(
            store.clone(),
            chains.clone(),
            executors.clone(),
            attestation.clone(),
        );

        Self {
            chains,
            store,
            executors,
            attestation,
            state_machine,
            hooks,
            hook_generator,
            fee_policy,
            default_finality,
        }
    }
}

impl TransferOrchestrator {
    /// Applies the fee policy and default finality of `config`.
    pub fn with_engine_config(mut self, config: &EngineConfig) -> Self {
        self.fee_policy = config.fee_policy;
        self.default_finality = config.default_finality;
        self
    }

    pub fn chains(&self) -> &ChainRegistry {
        &self.chains
    }

    pub fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    pub async fn get_transfer(&self, transfer_id: &str) -> Result<TransferRecord> {
        self.store
            .find(transfer_id)
            .await?
            .ok_or_else(|| BridgeError::TransferNotFound(transfer_id.to_string()))
    }

    /// Validates `request`, records it and burns on the source chain.
    ///
    /// A burn whose confirmation wait timed out still returns its hash; the
    /// record stays `Pending` until [`get_transfer_status`](Self::get_transfer_status)
    /// observes it. Execution errors are recorded on the transfer and
    /// returned.
    pub async fn initiate_transfer(&self, request: TransferRequest) -> Result<TransferReceipt> {
        let transfer_id = new_transfer_id();
        let span = spans::initiate_transfer(
            &transfer_id,
            &request.source_chain,
            &request.destination_chain,
            parse_usdc_amount(&request.amount).unwrap_or_default(),
        );

        async {
            let result = self.initiate(transfer_id, request).await;
            if let Err(e) = &result {
                spans::record_error(e);
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn initiate(&self, transfer_id: String, request: TransferRequest) -> Result<TransferReceipt> {
        let validated = self.validate(&request).await?;

        let hook_data = match &request.hook_data {
            Some(data) => Some(data.clone()),
            None => self.resolve_hook_data(&request, &validated).await?,
        };

        let record = TransferRecord::builder()
            .id(transfer_id)
            .source_chain(request.source_chain.as_str())
            .destination_chain(request.destination_chain.as_str())
            .amount(validated.amount)
            .source_address(request.source_address.as_str())
            .destination_address(request.destination_address.as_str())
            .finality_threshold(validated.finality)
            .max_fee(validated.max_fee)
            .metadata(request.metadata.clone())
            .build();
        let mut record = self.store.create(record).await?;
        record.transition_to(TransferStatus::Pending)?;
        let mut record = self.store.update(record).await?;

        info!(
            transfer_id = %record.id,
            amount = validated.amount,
            max_fee = validated.max_fee,
            finality = %validated.finality,
            has_hook_data = hook_data.is_some(),
            event = "transfer_initiated"
        );

        let burn = BurnRequest {
            source: validated.source,
            destination: validated.destination,
            amount: validated.amount,
            destination_address: &request.destination_address,
            finality_threshold: validated.finality,
            max_fee: validated.max_fee,
            hook_data: hook_data.as_ref(),
        };

        let executor = self.executors.for_chain(validated.source)?;
        match executor.execute_transfer(&burn).await {
            Ok(submission) => {
                let record = self.persist_burn(record, &submission).await?;
                info!(
                    transfer_id = %record.id,
                    burn_tx_hash = %submission.tx_hash,
                    status = %record.status,
                    event = "burn_recorded"
                );
                Ok(TransferReceipt::new(&record, submission))
            }
            Err(e) => {
                self.fail(record, TransferStep::Burn, &e).await;
                Err(e)
            }
        }
    }

    /// Stores the burn hash, re-reading the record after losing a version race.
    ///
    /// A hash that still cannot be stored is returned inside the error.
    async fn persist_burn(
        &self,
        record: TransferRecord,
        submission: &TransferSubmission,
    ) -> Result<TransferRecord> {
        let transfer_id = record.id.clone();
        self.try_persist_burn(record, submission)
            .await
            .map_err(|e| {
                error!(
                    transfer_id = %transfer_id,
                    burn_tx_hash = %submission.tx_hash,
                    error = %e,
                    event = "burn_not_persisted"
                );
                BridgeError::BurnNotRecorded {
                    transfer_id,
                    tx_hash: submission.tx_hash.clone(),
                    reason: e.to_string(),
                }
            })
    }

    async fn try_persist_burn(
        &self,
        mut record: TransferRecord,
        submission: &TransferSubmission,
    ) -> Result<TransferRecord> {
        let mut attempt = 1;
        loop {
            if record.burn_tx_hash.as_deref() == Some(submission.tx_hash.as_str()) {
                return Ok(record);
            }
            record.record_burn(submission.tx_hash.as_str(), submission.confirmed)?;
            match self.store.update(record.clone()).await {
                Ok(stored) => return Ok(stored),
                Err(BridgeError::ConcurrentModification { .. }) if attempt < BURN_WRITE_ATTEMPTS => {
                    debug!(transfer_id = %record.id, attempt, event = "burn_write_retried");
                    record = self.get_transfer(&record.id).await?;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn validate<'a>(&'a self, request: &TransferRequest) -> Result<ValidatedTransfer<'a>> {
        if request.source_chain == request.destination_chain {
            return Err(BridgeError::InvalidRequest(
                "source and destination chains must differ".to_string(),
            ));
        }
        let source = self.chains.get(&request.source_chain)?;
        let destination = self.chains.get(&request.destination_chain)?;
        let amount = parse_usdc_amount(&request.amount)?;

        if request.source_address.trim().is_empty() {
            return Err(BridgeError::InvalidRequest(
                "source address is required".to_string(),
            ));
        }
        if request.destination_address.trim().is_empty() {
            return Err(BridgeError::InvalidRequest(
                "destination address is required".to_string(),
            ));
        }
        validate_address(source.family(), &request.source_address)?;
        validate_address(destination.family(), &request.destination_address)?;

        let executor = self.executors.for_chain(source)?;
        self.executors.for_chain(destination)?;
        let signer = executor.signer_address(source)?;
        if mint_recipient_bytes(source.family(), &signer)?
            != mint_recipient_bytes(source.family(), &request.source_address)?
        {
            return Err(BridgeError::InvalidRequest(format!(
                "source address {} is not the engine's signer on {}",
                request.source_address, request.source_chain
            )));
        }

        if request.hook_data.is_some() && source.family() == ChainFamily::AccountChain {
            return Err(BridgeError::InvalidRequest(format!(
                "hook data is not supported for burns on {}",
                request.source_chain
            )));
        }

        let finality = request.finality.unwrap_or(self.default_finality);
        let max_fee = self.fee_policy.max_fee(amount, finality)?;

        Ok(ValidatedTransfer {
            source,
            destination,
            amount,
            finality,
            max_fee,
        })
    }

    /// Hook payload for a destination with a registered hook contract.
    async fn resolve_hook_data(
        &self,
        request: &TransferRequest,
        validated: &ValidatedTransfer<'_>,
    ) -> Result<Option<Bytes>> {
        if validated.source.family() != ChainFamily::Evm {
            return Ok(None);
        }
        let Some(hook_contract) = self.hooks.get(&request.destination_chain).await else {
            return Ok(None);
        };
        let Some(generator) = &self.hook_generator else {
            warn!(
                destination_chain = %request.destination_chain,
                event = "hook_generator_missing"
            );
            return Ok(None);
        };

        let context = HookContext {
            source_chain: request.source_chain.clone(),
            destination_chain: request.destination_chain.clone(),
            destination_address: request.destination_address.clone(),
            amount: validated.amount,
            hook_contract,
        };
        let data = generator.generate(&context).await?;
        debug!(hook_data_length = data.len(), event = "hook_data_generated");
        Ok(Some(data))
    }

    /// Polls the attestation for a transfer's burn.
    pub async fn get_attestation(&self, transfer_id: &str) -> Result<AttestationResult> {
        let record = self.get_transfer(transfer_id).await?;
        let Some(burn_tx_hash) = record.burn_tx_hash.as_deref() else {
            return Err(BridgeError::AttestationNotReady {
                transfer_id: record.id.clone(),
            });
        };
        self.attestation
            .get_attestation(&record.source_chain, burn_tx_hash)
            .await
    }

    /// Repeats [`get_attestation`](Self::get_attestation) until the
    /// attestation is complete.
    ///
    /// Pending answers wait `poll_interval`; rate limits wait the advertised
    /// interval. Other errors end the wait. After `max_attempts` lookups the
    /// result is [`BridgeError::AttestationTimeout`]; the transfer itself is
    /// left as it was.
    pub async fn wait_for_attestation(
        &self,
        transfer_id: &str,
        max_attempts: Option<u32>,
        poll_interval: Option<Duration>,
    ) -> Result<AttestationResult> {
        let max_attempts = max_attempts.unwrap_or(DEFAULT_ATTESTATION_ATTEMPTS);
        let poll_interval = poll_interval.unwrap_or(DEFAULT_ATTESTATION_POLL_INTERVAL);
        let span = spans::wait_for_attestation(transfer_id, max_attempts, poll_interval.as_secs());

        async {
            for attempt in 1..=max_attempts {
                trace!(attempt, max_attempts, event = "attestation_attempt");

                match self.get_attestation(transfer_id).await {
                    Ok(result) if result.is_complete() => {
                        info!(transfer_id, attempt, event = "attestation_ready");
                        return Ok(result);
                    }
                    Ok(_) => {
                        debug!(
                            attempt,
                            max_attempts,
                            poll_interval_secs = poll_interval.as_secs(),
                            event = "attestation_pending"
                        );
                        tokio::time::sleep(poll_interval).await;
                    }
                    Err(BridgeError::RateLimitExceeded {
                        retry_after_seconds,
                    }) => {
                        debug!(retry_after_seconds, event = "rate_limit_exceeded");
                        tokio::time::sleep(Duration::from_secs(retry_after_seconds)).await;
                    }
                    Err(e) => {
                        spans::record_error(&e);
                        return Err(e);
                    }
                }
            }

            error!(
                transfer_id,
                max_attempts,
                total_duration_secs = u64::from(max_attempts) * poll_interval.as_secs(),
                event = "attestation_timeout"
            );
            let e = BridgeError::AttestationTimeout;
            spans::record_error(&e);
            Err(e)
        }
        .instrument(span)
        .await
    }

    /// Polls the attestation for any burn on `source_chain`.
    pub async fn get_attestation_for_tx(
        &self,
        source_chain: &str,
        tx_hash: &str,
    ) -> Result<AttestationResult> {
        self.attestation.get_attestation(source_chain, tx_hash).await
    }

    /// Mints on the destination chain with the cached attestation.
    pub async fn complete_transfer(&self, transfer_id: &str) -> Result<TransferReceipt> {
        let mut record = self.get_transfer(transfer_id).await?;

        if record.status.is_terminal() {
            return Err(BridgeError::InvalidStatusTransition {
                from: record.status,
                to: TransferStatus::Completed,
            });
        }
        let Some((message, attestation)) = record
            .attested_message()
            .map(|(m, a)| (m.clone(), a.clone()))
        else {
            return Err(BridgeError::AttestationNotReady {
                transfer_id: record.id.clone(),
            });
        };

        let destination = self.chains.get(&record.destination_chain)?;
        let executor = self.executors.for_chain(destination)?;

        if let Some(mint_tx_hash) = record.mint_tx_hash.clone() {
            return self
                .settle_pending_mint(record, executor.as_ref(), destination, mint_tx_hash)
                .await;
        }

        if record.upgrade_to(TransferStatus::Bridging) {
            record = self.store.update(record).await?;
        }

        let hash = record.message_hash.unwrap_or_else(|| message_hash(&message));
        let span = spans::complete_transfer(
            &record.id,
            destination.chain_id(),
            &hash,
            attestation.len(),
        );

        async {
            let result = self
                .mint(record, executor.as_ref(), destination, &message, &attestation)
                .await;
            if let Err(e) = &result {
                spans::record_error(e);
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn mint(
        &self,
        mut record: TransferRecord,
        executor: &dyn TransferExecutor,
        destination: &ChainConfig,
        message: &Bytes,
        attestation: &Bytes,
    ) -> Result<TransferReceipt> {
        match executor
            .complete_transfer(message, attestation, destination)
            .await
        {
            Ok(submission) => {
                record.record_mint(submission.tx_hash.as_str(), submission.confirmed)?;
                let record = self.store.update(record).await?;
                info!(
                    transfer_id = %record.id,
                    mint_tx_hash = %submission.tx_hash,
                    status = %record.status,
                    event = "mint_recorded"
                );
                Ok(TransferReceipt::new(&record, submission))
            }
            Err(e) => {
                self.fail(record, TransferStep::Mint, &e).await;
                Err(e)
            }
        }
    }

    /// Re-checks a mint whose confirmation wait timed out instead of minting twice.
    async fn settle_pending_mint(
        &self,
        mut record: TransferRecord,
        executor: &dyn TransferExecutor,
        destination: &ChainConfig,
        mint_tx_hash: String,
    ) -> Result<TransferReceipt> {
        let status = executor
            .transaction_status(destination, &mint_tx_hash)
            .await?;

        if status.failed {
            let e = BridgeError::TransferExecutionFailed {
                reason: format!("mint transaction {mint_tx_hash} reverted"),
            };
            self.fail(record, TransferStep::Mint, &e).await;
            return Err(e);
        }
        if !status.confirmed {
            return Err(BridgeError::InvalidRequest(format!(
                "mint {mint_tx_hash} for transfer {} is not confirmed yet",
                record.id
            )));
        }

        record.transition_to(TransferStatus::Completed)?;
        let record = self.store.update(record).await?;
        info!(transfer_id = %record.id, mint_tx_hash = %mint_tx_hash, event = "mint_confirmed");
        Ok(TransferReceipt::new(
            &record,
            TransferSubmission {
                tx_hash: mint_tx_hash,
                confirmed: true,
            },
        ))
    }

    pub async fn get_transfer_status(
        &self,
        source_chain: &str,
        tx_hash: &str,
    ) -> Result<TransferStatusReport> {
        self.state_machine
            .get_transfer_status(source_chain, tx_hash)
            .await
    }

    /// [`initiate_transfer`](Self::initiate_transfer) in envelope form.
    pub async fn initiate_transfer_response(
        &self,
        request: TransferRequest,
    ) -> ApiResponse<TransferReceipt> {
        ApiResponse::from_result(self.initiate_transfer(request).await)
    }

    /// [`get_attestation`](Self::get_attestation) in envelope form.
    pub async fn get_attestation_response(&self, transfer_id: &str) -> ApiResponse<AttestationResult> {
        ApiResponse::from_result(self.get_attestation(transfer_id).await)
    }

    /// [`complete_transfer`](Self::complete_transfer) in envelope form.
    pub async fn complete_transfer_response(&self, transfer_id: &str) -> ApiResponse<TransferReceipt> {
        ApiResponse::from_result(self.complete_transfer(transfer_id).await)
    }

    /// [`get_transfer_status`](Self::get_transfer_status) in envelope form.
    pub async fn get_transfer_status_response(
        &self,
        source_chain: &str,
        tx_hash: &str,
    ) -> ApiResponse<TransferStatusReport> {
        ApiResponse::from_result(self.get_transfer_status(source_chain, tx_hash).await)
    }

    /// Records `error` on the transfer; the original error is what the caller sees.
    async fn fail(&self, mut record: TransferRecord, step: TransferStep, err: &BridgeError) {
        if let Err(e) = record.record_failure(step, err) {
            error!(transfer_id = %record.id, error = %e, event = "failure_not_recordable");
            return;
        }
        let transfer_id = record.id.clone();
        match self.store.update(record).await {
            Ok(record) => warn!(
                transfer_id = %record.id,
                step = ?step,
                code = err.code(),
                error = %err,
                event = "transfer_failed"
            ),
            Err(e) => {
                spans::record_error_with_context(
                    err.code(),
                    &err.to_string(),
                    Some(&format!("failure of transfer {transfer_id} not persisted: {e}")),
                );
                error!(transfer_id = %transfer_id, error = %e, event = "failure_not_persisted");
            }
        }
    }
}
