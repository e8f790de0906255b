// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Chain-family transfer executors
//!
//! One [`TransferExecutor`] per family burns on a source chain and mints on a
//! destination chain. The orchestrator picks the implementation once, from
//! [`ChainConfig::family`], through [`Executors::for_family`].
//!
//! Nothing here retries a submission. Validation failures are raised before
//! any transaction is sent; on-chain failures surface as
//! [`BridgeError::TransferExecutionFailed`].

mod account_chain;
mod evm;

use std::sync::Arc;

use alloy_primitives::Bytes;
use async_trait::async_trait;

use crate::chain::{ChainConfig, ChainFamily};
use crate::error::{BridgeError, Result};
use crate::protocol::{decode_message, FinalityThreshold, ParsedMessage};

pub use account_chain::AccountChainTransferExecutor;
pub use evm::EvmTransferExecutor;

/// Confirmation count reported for a finalized account-chain transaction.
pub const FINALIZED_CONFIRMATIONS: u64 = 32;

/// A submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferSubmission {
    /// `0x` hash on EVM chains, base58 signature on the account chain
    pub tx_hash: String,
    /// False if the confirmation wait timed out; safe to re-query
    pub confirmed: bool,
}

/// What a chain currently says about a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TxConfirmation {
    pub found: bool,
    pub confirmed: bool,
    pub confirmations: u64,
    /// Executed and reverted
    pub failed: bool,
}

impl TxConfirmation {
    pub fn not_found() -> Self {
        Self::default()
    }
}

/// Inputs for one burn.
#[derive(Debug, Clone, Copy)]
pub struct BurnRequest<'a> {
    pub source: &'a ChainConfig,
    pub destination: &'a ChainConfig,
    /// Smallest USDC unit
    pub amount: u64,
    pub destination_address: &'a str,
    pub finality_threshold: FinalityThreshold,
    pub max_fee: u64,
    pub hook_data: Option<&'a Bytes>,
}

#[async_trait]
pub trait TransferExecutor: Send + Sync {
    fn family(&self) -> ChainFamily;

    /// Address that signs burns on `chain`, in the family's text form.
    fn signer_address(&self, chain: &ChainConfig) -> Result<String>;

    /// Burns `request.amount` on the source chain.
    async fn execute_transfer(&self, request: &BurnRequest<'_>) -> Result<TransferSubmission>;

    /// Mints on `destination` by relaying an attested message.
    async fn complete_transfer(
        &self,
        message: &Bytes,
        attestation: &Bytes,
        destination: &ChainConfig,
    ) -> Result<TransferSubmission>;

    async fn transaction_status(&self, chain: &ChainConfig, tx_ref: &str) -> Result<TxConfirmation>;
}

/// The executor for each configured family.
#[derive(Clone, Default)]
pub struct Executors {
    pub evm: Option<Arc<dyn TransferExecutor>>,
    pub account_chain: Option<Arc<dyn TransferExecutor>>,
}

impl Executors {
    pub fn for_family(&self, family: ChainFamily) -> Result<&Arc<dyn TransferExecutor>> {
        let executor = match family {
            ChainFamily::Evm => self.evm.as_ref(),
            ChainFamily::AccountChain => self.account_chain.as_ref(),
        };
        executor.ok_or_else(|| BridgeError::UnsupportedChain {
            chain: format!("no executor configured for {family} chains"),
        })
    }

    pub fn for_chain(&self, chain: &ChainConfig) -> Result<&Arc<dyn TransferExecutor>> {
        self.for_family(chain.family())
    }
}

impl std::fmt::Debug for Executors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executors")
            .field("evm", &self.evm.is_some())
            .field("account_chain", &self.account_chain.is_some())
            .finish()
    }
}

/// Decodes an attested message and checks it is addressed to `destination`.
pub(crate) fn decode_inbound(message: &[u8], destination: &ChainConfig) -> Result<ParsedMessage> {
    let parsed = decode_message(message)?;
    let expected = destination.domain().as_u32();
    if parsed.destination_domain != expected {
        return Err(BridgeError::InvalidRequest(format!(
            "message is addressed to domain {}, but {} is domain {expected}",
            parsed.destination_domain,
            destination.chain_id()
        )));
    }
    Ok(parsed)
}

/// Confirmations for a transaction mined in `receipt_block` with the chain at `head`.
pub(crate) fn confirmations_at(head: u64, receipt_block: u64) -> u64 {
    if head < receipt_block {
        0
    } else {
        head - receipt_block + 1
    }
}
