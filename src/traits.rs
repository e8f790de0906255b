// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Collaborator traits the engine is written against.
//!
//! Persistence, chain RPC, the attestation service and hook-payload
//! generation all sit behind these traits so they can be swapped for fakes
//! (see [`testing`](crate::testing)) that simulate failures, slow
//! confirmations and service outages.

use std::time::Duration;

use alloy_primitives::{Address, Bytes, TxHash, U256};
use alloy_rpc_types::TransactionRequest;
use async_trait::async_trait;

use crate::account_chain::{Pubkey, SignedTransaction};
use crate::error::Result;
use crate::hooks::HookContext;
use crate::protocol::V2AttestationResponse;
use crate::transfer::TransferRecord;

/// Persistence for [`TransferRecord`]s.
///
/// `update` is version-checked: it fails with
/// [`BridgeError::ConcurrentModification`](crate::BridgeError::ConcurrentModification)
/// unless the stored version equals `record.version`, and returns the record
/// with its version bumped.
#[async_trait]
pub trait TransferStore: Send + Sync {
    async fn create(&self, record: TransferRecord) -> Result<TransferRecord>;

    async fn find(&self, id: &str) -> Result<Option<TransferRecord>>;

    /// Looks a record up by burn hash, mint hash, or message hash.
    async fn find_by_hash(&self, hash: &str) -> Result<Option<TransferRecord>>;

    async fn update(&self, record: TransferRecord) -> Result<TransferRecord>;
}

/// Outcome of a mined EVM transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvmReceipt {
    pub transaction_hash: TxHash,
    pub block_number: Option<u64>,
    /// False if the transaction reverted
    pub success: bool,
}

/// RPC access to one EVM chain, signing as [`sender`](Self::sender).
#[async_trait]
pub trait EvmChainClient: Send + Sync {
    /// Account that signs submitted transactions.
    fn sender(&self) -> Address;

    async fn balance_of(&self, token: Address, owner: Address) -> Result<U256>;

    async fn allowance(&self, token: Address, owner: Address, spender: Address) -> Result<U256>;

    /// Signs and broadcasts, returning the hash without waiting.
    async fn send_transaction(&self, tx: TransactionRequest) -> Result<TxHash>;

    /// Waits for the receipt; `None` if `timeout` elapses first.
    async fn wait_for_receipt(&self, tx_hash: TxHash, timeout: Duration)
        -> Result<Option<EvmReceipt>>;

    /// `None` if the transaction is unknown or not yet mined.
    async fn get_transaction_receipt(&self, tx_hash: TxHash) -> Result<Option<EvmReceipt>>;

    async fn get_block_number(&self) -> Result<u64>;
}

/// Account state as returned by `getAccountInfo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    pub lamports: u64,
    pub owner: Pubkey,
    pub data: Vec<u8>,
}

/// Entry of `getSignatureStatuses`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureStatus {
    pub slot: u64,
    /// `None` once the block is finalized
    pub confirmations: Option<u64>,
    /// Execution error, if the transaction failed
    pub err: Option<String>,
    /// `processed`, `confirmed` or `finalized`
    pub confirmation_status: Option<String>,
}

impl SignatureStatus {
    /// Succeeded and reached `finalized` commitment.
    pub fn is_confirmed(&self) -> bool {
        self.err.is_none() && self.confirmation_status.as_deref() == Some("finalized")
    }
}

/// JSON-RPC access to the account chain.
#[async_trait]
pub trait AccountChainRpc: Send + Sync {
    async fn get_latest_blockhash(&self) -> Result<[u8; 32]>;

    async fn get_minimum_balance_for_rent_exemption(&self, space: u64) -> Result<u64>;

    /// `None` if the account does not exist.
    async fn get_account_info(&self, account: &Pubkey) -> Result<Option<AccountInfo>>;

    /// Submits and waits up to `timeout` for confirmation.
    ///
    /// Returns `false` if the wait timed out. A transaction that executes and
    /// fails is an error.
    async fn send_and_confirm_transaction(
        &self,
        tx: &SignedTransaction,
        timeout: Duration,
    ) -> Result<bool>;

    async fn get_signature_status(&self, signature: &str) -> Result<Option<SignatureStatus>>;
}

/// The attestation service's messages endpoint.
#[async_trait]
pub trait AttestationProvider: Send + Sync {
    /// Messages emitted by `tx_ref` on `source_domain`.
    ///
    /// `None` when the service has not indexed the transaction yet.
    async fn get_messages(
        &self,
        source_domain: u32,
        tx_ref: &str,
    ) -> Result<Option<V2AttestationResponse>>;
}

/// Produces the opaque payload forwarded to a destination hook contract.
#[async_trait]
pub trait HookDataGenerator: Send + Sync {
    async fn generate(&self, context: &HookContext) -> Result<Bytes>;
}
