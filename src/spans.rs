// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! OpenTelemetry span helpers for transfer operations
//!
//! Span names are static (`cctp_engine.*`) and carry structured attributes.
//! Error fields start empty and are filled by [`record_error`] or
//! [`record_error_with_context`] on the current span.
//!
//! # Example
//!
//! ```rust,no_run
//! use cctp_engine::spans;
//!
//! let span = spans::get_attestation(0, "0xabc");
//! let _guard = span.enter();
//! // attestation lookup here
//! ```

use alloy_primitives::{hex, Address, FixedBytes, U256};
use tracing::Span;
use url::Url;

use crate::chain::ChainFamily;
use crate::error::BridgeError;

/// Top-level span for starting a transfer.
///
/// Children: cctp_engine.execute_transfer
#[inline]
pub fn initiate_transfer(
    transfer_id: &str,
    source_chain: &str,
    destination_chain: &str,
    amount: u64,
) -> Span {
    tracing::info_span!(
        "cctp_engine.initiate_transfer",
        transfer_id = transfer_id,
        source_chain = source_chain,
        destination_chain = destination_chain,
        amount = amount,
        error.type = tracing::field::Empty,
        error.message = tracing::field::Empty,
        error.context = tracing::field::Empty,
        otel.status_code = "OK",
    )
}

/// Burn on the source chain, for either family.
///
/// Parent: cctp_engine.initiate_transfer
#[inline]
pub fn execute_transfer(
    family: ChainFamily,
    source_chain: &str,
    destination_domain: u32,
    amount: u64,
) -> Span {
    tracing::info_span!(
        "cctp_engine.execute_transfer",
        family = %family,
        source_chain = source_chain,
        destination_domain = destination_domain,
        amount = amount,
        error.type = tracing::field::Empty,
        error.message = tracing::field::Empty,
        error.context = tracing::field::Empty,
        otel.status_code = "OK",
    )
}

/// Building an EVM burn call.
#[inline]
pub fn deposit_for_burn(
    from_address: &Address,
    destination_domain: u32,
    token_address: &Address,
    amount: &U256,
) -> Span {
    tracing::debug_span!(
        "cctp_engine.deposit_for_burn",
        from_address = %from_address,
        destination_domain = destination_domain,
        token_address = %token_address,
        amount = %amount,
    )
}

/// Mint on the destination chain.
#[inline]
pub fn complete_transfer(
    transfer_id: &str,
    destination_chain: &str,
    message_hash: &FixedBytes<32>,
    attestation_length: usize,
) -> Span {
    tracing::info_span!(
        "cctp_engine.complete_transfer",
        transfer_id = transfer_id,
        destination_chain = destination_chain,
        message_hash = %hex::encode(message_hash),
        attestation_length_bytes = attestation_length,
        error.type = tracing::field::Empty,
        error.message = tracing::field::Empty,
        error.context = tracing::field::Empty,
        otel.status_code = "OK",
    )
}

/// Attestation lookup, cached or remote.
///
/// Children: cctp_engine.attestation_request
#[inline]
pub fn get_attestation(source_domain: u32, tx_ref: &str) -> Span {
    tracing::info_span!(
        "cctp_engine.get_attestation",
        source_domain = source_domain,
        tx_ref = tx_ref,
        cache_hit = tracing::field::Empty,
        error.type = tracing::field::Empty,
        error.message = tracing::field::Empty,
        error.context = tracing::field::Empty,
        otel.status_code = "OK",
    )
}

/// Repeated attestation lookups for one transfer.
///
/// Children: cctp_engine.get_attestation (one per attempt)
#[inline]
pub fn wait_for_attestation(transfer_id: &str, max_attempts: u32, poll_interval_secs: u64) -> Span {
    tracing::info_span!(
        "cctp_engine.wait_for_attestation",
        transfer_id = transfer_id,
        max_attempts = max_attempts,
        poll_interval_secs = poll_interval_secs,
        error.type = tracing::field::Empty,
        error.message = tracing::field::Empty,
        error.context = tracing::field::Empty,
        otel.status_code = "OK",
    )
}

/// Single HTTP request to the attestation service.
#[inline]
pub fn attestation_request(url: &Url) -> Span {
    tracing::debug_span!("cctp_engine.attestation_request", url = %url)
}

/// Waiting for a submitted transaction to confirm.
#[inline]
pub fn wait_for_confirmation(tx_ref: &str, chain: &str, required_confirmations: u64) -> Span {
    tracing::debug_span!(
        "cctp_engine.wait_for_confirmation",
        tx_ref = tx_ref,
        chain = chain,
        required_confirmations = required_confirmations,
    )
}

/// Assembling and signing an account-chain transaction.
#[inline]
pub fn build_account_chain_transaction(kind: &'static str, chain: &str) -> Span {
    tracing::debug_span!(
        "cctp_engine.build_account_chain_transaction",
        kind = kind,
        chain = chain,
        instruction_count = tracing::field::Empty,
        size_bytes = tracing::field::Empty,
    )
}

/// JSON-RPC call to an account-chain node.
#[inline]
pub fn rpc_call(method: &str, url: &Url) -> Span {
    tracing::trace_span!("cctp_engine.rpc_call", rpc.method = method, rpc.url = %url)
}

/// Reconciling a record with chain and attestation state.
#[inline]
pub fn get_transfer_status(source_chain: &str, tx_hash: &str) -> Span {
    tracing::info_span!(
        "cctp_engine.get_transfer_status",
        source_chain = source_chain,
        tx_hash = tx_hash,
        error.type = tracing::field::Empty,
        error.message = tracing::field::Empty,
        error.context = tracing::field::Empty,
        otel.status_code = "OK",
    )
}

/// Record error attributes on the current span.
///
/// `error.type` is the stable error code.
pub fn record_error(error: &BridgeError) {
    let current_span = tracing::Span::current();
    current_span.record("error.type", error.code());
    current_span.record("error.message", error.to_string());
    current_span.record("otel.status_code", "ERROR");
}

/// Record error attributes with custom context on the current span.
pub fn record_error_with_context(
    error_type: &str,
    error_message: &str,
    additional_context: Option<&str>,
) {
    let current_span = tracing::Span::current();
    current_span.record("error.type", error_type);
    current_span.record("error.message", error_message);
    current_span.record("otel.status_code", "ERROR");

    if let Some(context) = additional_context {
        current_span.record("error.context", context);
    }
}
