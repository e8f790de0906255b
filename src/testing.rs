// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Fake collaborators for exercising the engine without chains or services.
//!
//! Each fake is cheap to clone and shares its state through `Arc`, so a test
//! can hand one copy to the engine and keep another to script responses and
//! inspect what was submitted. They cover the adversarial cases too:
//! reverted transactions, confirmations that never arrive, attestation
//! outages and rate limiting.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use alloy_primitives::{keccak256, Address, Bytes, FixedBytes, TxHash, U256};
use alloy_rpc_types::TransactionRequest;
use async_trait::async_trait;

use crate::account_chain::{Pubkey, SignedTransaction, TOKEN_ACCOUNT_LEN};
use crate::error::{BridgeError, Result};
use crate::hooks::HookContext;
use crate::protocol::{
    AttestationStatus, ParsedBurnBody, ParsedMessage, V2AttestationResponse, V2Message,
};
use crate::traits::{
    AccountChainRpc, AccountInfo, AttestationProvider, EvmChainClient, EvmReceipt,
    HookDataGenerator, SignatureStatus,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// Fake EVM chain
// ============================================================================

/// Block height a fresh [`FakeEvmChainClient`] starts at.
pub const FAKE_GENESIS_HEAD: u64 = 100;

#[derive(Debug)]
struct EvmChainState {
    head: u64,
    balance: U256,
    allowance: U256,
    receipts: HashMap<TxHash, EvmReceipt>,
    submissions: Vec<TransactionRequest>,
}

impl Default for EvmChainState {
    fn default() -> Self {
        Self {
            head: FAKE_GENESIS_HEAD,
            balance: U256::ZERO,
            allowance: U256::ZERO,
            receipts: HashMap::new(),
            submissions: Vec::new(),
        }
    }
}

/// A fake EVM chain that mines every submission instantly.
///
/// Each transaction lands in the current head block and the head then moves
/// forward two blocks, so a fresh receipt already has three confirmations.
#[derive(Clone, Debug)]
pub struct FakeEvmChainClient {
    sender: Address,
    state: Arc<Mutex<EvmChainState>>,
    reverting: bool,
    never_mined: bool,
}

impl Default for FakeEvmChainClient {
    fn default() -> Self {
        Self {
            sender: Address::repeat_byte(0x5e),
            state: Arc::default(),
            reverting: false,
            never_mined: false,
        }
    }
}

impl FakeEvmChainClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sender(mut self, sender: Address) -> Self {
        self.sender = sender;
        self
    }

    /// USDC balance reported for every owner
    pub fn with_balance(self, balance: u64) -> Self {
        lock(&self.state).balance = U256::from(balance);
        self
    }

    /// Allowance reported for every owner and spender
    pub fn with_allowance(self, allowance: u64) -> Self {
        lock(&self.state).allowance = U256::from(allowance);
        self
    }

    /// Every mined transaction reverts
    pub fn reverting(mut self) -> Self {
        self.reverting = true;
        self
    }

    /// Submissions are accepted but never produce a receipt
    pub fn never_mined(mut self) -> Self {
        self.never_mined = true;
        self
    }

    pub fn advance_blocks(&self, blocks: u64) {
        lock(&self.state).head += blocks;
    }

    pub fn submissions(&self) -> Vec<TransactionRequest> {
        lock(&self.state).submissions.clone()
    }

    pub fn submission_count(&self) -> usize {
        lock(&self.state).submissions.len()
    }
}

#[async_trait]
impl EvmChainClient for FakeEvmChainClient {
    fn sender(&self) -> Address {
        self.sender
    }

    async fn balance_of(&self, _token: Address, _owner: Address) -> Result<U256> {
        Ok(lock(&self.state).balance)
    }

    async fn allowance(&self, _token: Address, _owner: Address, _spender: Address) -> Result<U256> {
        Ok(lock(&self.state).allowance)
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> Result<TxHash> {
        let mut state = lock(&self.state);
        state.submissions.push(tx);
        let tx_hash = keccak256((state.submissions.len() as u64).to_be_bytes());

        if !self.never_mined {
            let block_number = state.head;
            state.receipts.insert(
                tx_hash,
                EvmReceipt {
                    transaction_hash: tx_hash,
                    block_number: Some(block_number),
                    success: !self.reverting,
                },
            );
            state.head += 2;
        }
        Ok(tx_hash)
    }

    async fn wait_for_receipt(
        &self,
        tx_hash: TxHash,
        _timeout: Duration,
    ) -> Result<Option<EvmReceipt>> {
        Ok(lock(&self.state).receipts.get(&tx_hash).copied())
    }

    async fn get_transaction_receipt(&self, tx_hash: TxHash) -> Result<Option<EvmReceipt>> {
        Ok(lock(&self.state).receipts.get(&tx_hash).copied())
    }

    async fn get_block_number(&self) -> Result<u64> {
        Ok(lock(&self.state).head)
    }
}

// ============================================================================
// Fake account-chain RPC
// ============================================================================

#[derive(Debug, Default)]
struct AccountChainState {
    accounts: HashMap<Pubkey, AccountInfo>,
    statuses: HashMap<String, SignatureStatus>,
    submitted: Vec<SignedTransaction>,
}

/// A fake account-chain node that finalizes every accepted transaction.
#[derive(Clone, Debug, Default)]
pub struct FakeAccountChainRpc {
    state: Arc<Mutex<AccountChainState>>,
    failure: Option<String>,
    unconfirmed: bool,
}

impl FakeAccountChainRpc {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every submission fails on-chain with `reason`
    pub fn failing(mut self, reason: &str) -> Self {
        self.failure = Some(reason.to_string());
        self
    }

    /// Submissions are accepted but the confirmation wait times out
    pub fn unconfirmed(mut self) -> Self {
        self.unconfirmed = true;
        self
    }

    pub fn set_account(&self, address: Pubkey, account: AccountInfo) {
        lock(&self.state).accounts.insert(address, account);
    }

    pub fn set_signature_status(&self, signature: &str, status: SignatureStatus) {
        lock(&self.state)
            .statuses
            .insert(signature.to_string(), status);
    }

    pub fn submitted(&self) -> Vec<SignedTransaction> {
        lock(&self.state).submitted.clone()
    }
}

#[async_trait]
impl AccountChainRpc for FakeAccountChainRpc {
    async fn get_latest_blockhash(&self) -> Result<[u8; 32]> {
        Ok([7u8; 32])
    }

    async fn get_minimum_balance_for_rent_exemption(&self, space: u64) -> Result<u64> {
        // 128 bytes of account overhead at 3480 lamports per byte-year, two years
        Ok((128 + space) * 6_960)
    }

    async fn get_account_info(&self, account: &Pubkey) -> Result<Option<AccountInfo>> {
        Ok(lock(&self.state).accounts.get(account).cloned())
    }

    async fn send_and_confirm_transaction(
        &self,
        tx: &SignedTransaction,
        _timeout: Duration,
    ) -> Result<bool> {
        if let Some(reason) = &self.failure {
            return Err(BridgeError::TransferExecutionFailed {
                reason: reason.clone(),
            });
        }

        let mut state = lock(&self.state);
        let slot = 1_000 + state.submitted.len() as u64;
        let status = if self.unconfirmed {
            SignatureStatus {
                slot,
                confirmations: Some(0),
                err: None,
                confirmation_status: Some("processed".to_string()),
            }
        } else {
            SignatureStatus {
                slot,
                confirmations: None,
                err: None,
                confirmation_status: Some("finalized".to_string()),
            }
        };
        state.statuses.insert(tx.signature(), status);
        state.submitted.push(tx.clone());
        Ok(!self.unconfirmed)
    }

    async fn get_signature_status(&self, signature: &str) -> Result<Option<SignatureStatus>> {
        Ok(lock(&self.state).statuses.get(signature).cloned())
    }
}

/// Token-program account bytes holding `amount` of `mint` for `owner`.
pub fn token_account_data(mint: &Pubkey, owner: &Pubkey, amount: u64) -> Vec<u8> {
    let mut data = vec![0u8; TOKEN_ACCOUNT_LEN];
    data[0..32].copy_from_slice(mint.as_bytes());
    data[32..64].copy_from_slice(owner.as_bytes());
    data[64..72].copy_from_slice(&amount.to_le_bytes());
    // initialized
    data[108] = 1;
    data
}

// ============================================================================
// Fake attestation service
// ============================================================================

/// One scripted answer of [`FakeAttestationProvider`].
#[derive(Debug, Clone)]
pub enum FakeAttestation {
    /// The service has not indexed the transaction
    NotFound,
    Pending,
    Complete { message: Bytes, attestation: Bytes },
    Failed,
    RateLimited { retry_after_seconds: u64 },
    Unavailable,
}

impl FakeAttestation {
    fn into_response(self) -> Result<Option<V2AttestationResponse>> {
        let single = |status, message, attestation| {
            Ok(Some(V2AttestationResponse {
                messages: vec![V2Message {
                    status,
                    message,
                    attestation,
                }],
            }))
        };

        match self {
            Self::NotFound => Ok(None),
            Self::Pending => single(AttestationStatus::PendingConfirmations, None, None),
            Self::Complete {
                message,
                attestation,
            } => single(AttestationStatus::Complete, Some(message), Some(attestation)),
            Self::Failed => single(AttestationStatus::Failed, None, None),
            Self::RateLimited {
                retry_after_seconds,
            } => Err(BridgeError::RateLimitExceeded {
                retry_after_seconds,
            }),
            Self::Unavailable => Err(BridgeError::Provider(
                "attestation service returned 503".to_string(),
            )),
        }
    }
}

/// A fake attestation service answering from per-transaction scripts.
///
/// Queued answers are consumed in order and the last one repeats, which
/// models progressions like pending → pending → complete. Transactions with
/// no script are not found.
#[derive(Clone, Debug, Default)]
pub struct FakeAttestationProvider {
    scripts: Arc<Mutex<HashMap<String, VecDeque<FakeAttestation>>>>,
    calls: Arc<Mutex<Vec<(u32, String)>>>,
}

impl FakeAttestationProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an answer for `tx_ref`.
    pub fn enqueue(&self, tx_ref: &str, answer: FakeAttestation) {
        lock(&self.scripts)
            .entry(tx_ref.to_string())
            .or_default()
            .push_back(answer);
    }

    pub fn complete(&self, tx_ref: &str, message: Bytes, attestation: Bytes) {
        self.enqueue(
            tx_ref,
            FakeAttestation::Complete {
                message,
                attestation,
            },
        );
    }

    pub fn pending(&self, tx_ref: &str) {
        self.enqueue(tx_ref, FakeAttestation::Pending);
    }

    pub fn failed(&self, tx_ref: &str) {
        self.enqueue(tx_ref, FakeAttestation::Failed);
    }

    pub fn rate_limited(&self, tx_ref: &str, retry_after_seconds: u64) {
        self.enqueue(
            tx_ref,
            FakeAttestation::RateLimited {
                retry_after_seconds,
            },
        );
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// `(source_domain, tx_ref)` of every request, oldest first
    pub fn calls(&self) -> Vec<(u32, String)> {
        lock(&self.calls).clone()
    }
}

#[async_trait]
impl AttestationProvider for FakeAttestationProvider {
    async fn get_messages(
        &self,
        source_domain: u32,
        tx_ref: &str,
    ) -> Result<Option<V2AttestationResponse>> {
        lock(&self.calls).push((source_domain, tx_ref.to_string()));

        let answer = {
            let mut scripts = lock(&self.scripts);
            match scripts.get_mut(tx_ref) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };
        answer.unwrap_or(FakeAttestation::NotFound).into_response()
    }
}

// ============================================================================
// Fake hook data generator
// ============================================================================

/// Returns a fixed payload and records every context it was asked about.
#[derive(Clone, Debug)]
pub struct FakeHookDataGenerator {
    payload: Bytes,
    failing: bool,
    contexts: Arc<Mutex<Vec<HookContext>>>,
}

impl FakeHookDataGenerator {
    pub fn new(payload: Bytes) -> Self {
        Self {
            payload,
            failing: false,
            contexts: Arc::default(),
        }
    }

    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    pub fn contexts(&self) -> Vec<HookContext> {
        lock(&self.contexts).clone()
    }
}

#[async_trait]
impl HookDataGenerator for FakeHookDataGenerator {
    async fn generate(&self, context: &HookContext) -> Result<Bytes> {
        lock(&self.contexts).push(context.clone());
        if self.failing {
            return Err(BridgeError::Provider("hook generator unavailable".to_string()));
        }
        Ok(self.payload.clone())
    }
}

// ============================================================================
// Message fixtures
// ============================================================================

/// An encoded burn message as the attestation service would return it.
pub fn burn_message(
    source_domain: u32,
    destination_domain: u32,
    mint_recipient: FixedBytes<32>,
    amount: u64,
) -> Bytes {
    let body = ParsedBurnBody {
        body_version: 1,
        burn_token: FixedBytes::left_padding_from(&[0xa0; 20]),
        mint_recipient,
        amount,
        message_sender: FixedBytes::left_padding_from(&[0x5e; 20]),
    };
    ParsedMessage {
        version: 1,
        source_domain,
        destination_domain,
        nonce: 42,
        sender: FixedBytes::repeat_byte(1),
        recipient: FixedBytes::repeat_byte(2),
        destination_caller: FixedBytes::ZERO,
        message_body: body.encode(),
    }
    .encode()
}

/// A 65-byte signature-shaped attestation.
pub fn fake_attestation() -> Bytes {
    Bytes::from(vec![0xab; 65])
}
