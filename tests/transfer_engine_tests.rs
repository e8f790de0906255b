// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! End-to-end transfer flows against fake chains and a fake attestation
//! service.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy_chains::NamedChain;
use alloy_primitives::{Bytes, FixedBytes};
use async_trait::async_trait;
use cctp_engine::account_chain::Keypair;
use cctp_engine::testing::{
    burn_message, fake_attestation, FakeAccountChainRpc, FakeAttestationProvider,
    FakeEvmChainClient, FakeHookDataGenerator,
};
use cctp_engine::{
    decode_message, solana_mainnet, AccountChainTransferExecutor, AttestationState, BridgeError,
    ChainRegistry, ComputeBudgetConfig, ConfirmationConfig, EvmChainClient, EvmChainPreset,
    EvmTransferExecutor, Executors, FeePolicy, FinalityThreshold, HookRegistry,
    InMemoryTransferStore, Result, TransferOrchestrator, TransferRecord, TransferRequest,
    TransferStatus, TransferStore,
};
use tracing_subscriber::EnvFilter;
use url::Url;

/// Wraps the in-memory store and remembers every status it persisted.
///
/// Writes that add a burn hash can be made to lose a version race or to fail
/// outright.
#[derive(Default)]
struct RecordingStore {
    inner: InMemoryTransferStore,
    history: Mutex<Vec<(String, TransferStatus)>>,
    burn_write_conflicts: AtomicUsize,
    reject_burn_writes: AtomicBool,
}

impl RecordingStore {
    fn conflict_on_burn_writes(&self, times: usize) {
        self.burn_write_conflicts.store(times, Ordering::SeqCst);
    }

    fn reject_burn_writes(&self) {
        self.reject_burn_writes.store(true, Ordering::SeqCst);
    }

    fn statuses(&self, transfer_id: &str) -> Vec<TransferStatus> {
        self.history
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| id == transfer_id)
            .map(|(_, status)| *status)
            .collect()
    }

    fn transfer_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .history
            .lock()
            .unwrap()
            .iter()
            .map(|(id, _)| id.clone())
            .collect();
        ids.dedup();
        ids
    }
}

#[async_trait]
impl TransferStore for RecordingStore {
    async fn create(&self, record: TransferRecord) -> Result<TransferRecord> {
        let record = self.inner.create(record).await?;
        self.history
            .lock()
            .unwrap()
            .push((record.id.clone(), record.status));
        Ok(record)
    }

    async fn find(&self, id: &str) -> Result<Option<TransferRecord>> {
        self.inner.find(id).await
    }

    async fn find_by_hash(&self, hash: &str) -> Result<Option<TransferRecord>> {
        self.inner.find_by_hash(hash).await
    }

    async fn update(&self, record: TransferRecord) -> Result<TransferRecord> {
        let stored = self.inner.find(&record.id).await?;
        let adds_burn = record.burn_tx_hash.is_some()
            && stored.as_ref().is_some_and(|r| r.burn_tx_hash.is_none());
        if adds_burn {
            if self.reject_burn_writes.load(Ordering::SeqCst) {
                return Err(BridgeError::Provider("store unavailable".into()));
            }
            let conflicts = self.burn_write_conflicts.load(Ordering::SeqCst);
            if conflicts > 0 {
                self.burn_write_conflicts.store(conflicts - 1, Ordering::SeqCst);
                if let Some(mut current) = stored {
                    current.metadata.insert("touched".into(), conflicts.to_string());
                    self.inner.update(current).await?;
                }
            }
        }

        let record = self.inner.update(record).await?;
        self.history
            .lock()
            .unwrap()
            .push((record.id.clone(), record.status));
        Ok(record)
    }
}

struct Harness {
    orchestrator: TransferOrchestrator,
    store: Arc<RecordingStore>,
    ethereum: FakeEvmChainClient,
    solana: Arc<FakeAccountChainRpc>,
    attestations: FakeAttestationProvider,
    hooks: Arc<HookRegistry>,
    hook_generator: FakeHookDataGenerator,
}

fn chains() -> ChainRegistry {
    let url = Url::parse("http://localhost:8545").unwrap();
    ChainRegistry::new()
        .with_chain(NamedChain::Mainnet.chain_config("ethereum", url.clone()).unwrap())
        .with_chain(NamedChain::Base.chain_config("base", url).unwrap())
        .with_chain(solana_mainnet(Url::parse("http://localhost:8899").unwrap()))
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn harness(ethereum: FakeEvmChainClient, fee_policy: FeePolicy) -> Harness {
    init_tracing();
    let store = Arc::new(RecordingStore::default());
    let solana = Arc::new(FakeAccountChainRpc::new());
    let attestations = FakeAttestationProvider::new();
    let hooks = Arc::new(HookRegistry::new());
    let hook_generator = FakeHookDataGenerator::new(Bytes::from(vec![0xfe, 0xed]));

    let evm = EvmTransferExecutor::new(ConfirmationConfig::default())
        .with_client("ethereum", Arc::new(ethereum.clone()))
        .with_client("base", Arc::new(FakeEvmChainClient::new()));
    let account_chain = AccountChainTransferExecutor::new(
        Keypair::from_seed(&[1u8; 32]),
        ComputeBudgetConfig::default(),
        ConfirmationConfig::default(),
    )
    .with_rpc("solana", solana.clone());

    let orchestrator = TransferOrchestrator::builder()
        .chains(chains())
        .store(store.clone())
        .executors(Executors {
            evm: Some(Arc::new(evm)),
            account_chain: Some(Arc::new(account_chain)),
        })
        .attestation_provider(Arc::new(attestations.clone()))
        .hooks(hooks.clone())
        .hook_generator(Arc::new(hook_generator.clone()))
        .fee_policy(fee_policy)
        .build();

    Harness {
        orchestrator,
        store,
        ethereum,
        solana,
        attestations,
        hooks,
        hook_generator,
    }
}

fn funded_ethereum() -> FakeEvmChainClient {
    FakeEvmChainClient::new()
        .with_balance(100_000_000)
        .with_allowance(100_000_000)
}

fn solana_wallet() -> String {
    Keypair::from_seed(&[2u8; 32]).pubkey().to_string()
}

fn ethereum_to_solana(ethereum: &FakeEvmChainClient, amount: &str) -> TransferRequest {
    TransferRequest::builder()
        .source_chain("ethereum")
        .destination_chain("solana")
        .amount(amount)
        .source_address(ethereum.sender().to_string())
        .destination_address(solana_wallet())
        .build()
}

#[tokio::test]
async fn test_initiate_burns_and_confirms() {
    let h = harness(funded_ethereum(), FeePolicy::Zero);

    let receipt = h
        .orchestrator
        .initiate_transfer(ethereum_to_solana(&h.ethereum, "10.5"))
        .await
        .unwrap();

    assert!(receipt.tx_hash.starts_with("0x"));
    assert!(receipt.confirmed);
    assert_eq!(receipt.status, TransferStatus::Confirmed);
    assert_eq!(
        h.store.statuses(&receipt.transfer_id),
        vec![
            TransferStatus::Created,
            TransferStatus::Pending,
            TransferStatus::Confirmed
        ]
    );

    let record = h.orchestrator.get_transfer(&receipt.transfer_id).await.unwrap();
    assert_eq!(record.amount, 10_500_000);
    assert_eq!(record.burn_tx_hash.as_deref(), Some(receipt.tx_hash.as_str()));
    assert!(record.mint_tx_hash.is_none());
    assert_eq!(h.ethereum.submission_count(), 1);
}

#[test]
fn test_truncated_message_is_malformed() {
    assert!(matches!(
        decode_message(&[0u8; 50]),
        Err(BridgeError::MalformedMessage { .. })
    ));
}

#[tokio::test]
async fn test_unindexed_burn_is_pending() {
    let h = harness(funded_ethereum(), FeePolicy::Zero);
    let receipt = h
        .orchestrator
        .initiate_transfer(ethereum_to_solana(&h.ethereum, "10.5"))
        .await
        .unwrap();

    let attestation = h
        .orchestrator
        .get_attestation(&receipt.transfer_id)
        .await
        .unwrap();

    assert_eq!(attestation.status, AttestationState::Pending);
    assert!(attestation.attestation.is_none());
    assert_eq!(
        h.orchestrator.get_transfer(&receipt.transfer_id).await.unwrap().status,
        TransferStatus::Confirmed
    );
}

#[tokio::test]
async fn test_insufficient_balance_submits_nothing() {
    let ethereum = FakeEvmChainClient::new()
        .with_balance(5_000_000)
        .with_allowance(100_000_000);
    let h = harness(ethereum, FeePolicy::Zero);

    let err = h
        .orchestrator
        .initiate_transfer(ethereum_to_solana(&h.ethereum, "10.5"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        BridgeError::InsufficientBalance {
            required: 10_500_000,
            available: 5_000_000
        }
    ));
    assert_eq!(h.ethereum.submission_count(), 0);

    let ids = h.store.transfer_ids();
    assert_eq!(ids.len(), 1);
    let record = h.orchestrator.get_transfer(&ids[0]).await.unwrap();
    assert_eq!(record.status, TransferStatus::Failed);
    assert!(record.burn_tx_hash.is_none());
    assert_eq!(record.error.unwrap().code, "INSUFFICIENT_BALANCE");
}

#[tokio::test]
async fn test_cached_attestation_makes_no_further_calls() {
    let h = harness(funded_ethereum(), FeePolicy::Zero);
    let receipt = h
        .orchestrator
        .initiate_transfer(ethereum_to_solana(&h.ethereum, "10.5"))
        .await
        .unwrap();
    let recipient = FixedBytes::from(Keypair::from_seed(&[2u8; 32]).pubkey().to_bytes());
    h.attestations.complete(
        &receipt.tx_hash,
        burn_message(0, 5, recipient, 10_500_000),
        fake_attestation(),
    );

    let first = h
        .orchestrator
        .get_attestation(&receipt.transfer_id)
        .await
        .unwrap();
    let calls = h.attestations.call_count();
    let second = h
        .orchestrator
        .get_attestation_for_tx("ethereum", &receipt.tx_hash)
        .await
        .unwrap();

    assert_eq!(first.status, AttestationState::Complete);
    assert_eq!(second, first);
    assert_eq!(h.attestations.call_count(), calls);
    assert_eq!(calls, 1);
}

#[tokio::test]
async fn test_full_transfer_to_solana() {
    let h = harness(funded_ethereum(), FeePolicy::Zero);
    let receipt = h
        .orchestrator
        .initiate_transfer(ethereum_to_solana(&h.ethereum, "10.5"))
        .await
        .unwrap();

    assert!(matches!(
        h.orchestrator.complete_transfer(&receipt.transfer_id).await,
        Err(BridgeError::AttestationNotReady { .. })
    ));

    let recipient = FixedBytes::from(Keypair::from_seed(&[2u8; 32]).pubkey().to_bytes());
    h.attestations.pending(&receipt.tx_hash);
    h.attestations.complete(
        &receipt.tx_hash,
        burn_message(0, 5, recipient, 10_500_000),
        fake_attestation(),
    );

    let pending = h
        .orchestrator
        .get_attestation(&receipt.transfer_id)
        .await
        .unwrap();
    assert_eq!(pending.status, AttestationState::Pending);

    let complete = h
        .orchestrator
        .get_attestation(&receipt.transfer_id)
        .await
        .unwrap();
    assert!(complete.is_complete());
    assert_eq!(
        h.orchestrator.get_transfer(&receipt.transfer_id).await.unwrap().status,
        TransferStatus::Bridging
    );

    let mint = h
        .orchestrator
        .complete_transfer(&receipt.transfer_id)
        .await
        .unwrap();
    assert!(mint.confirmed);
    assert_eq!(mint.status, TransferStatus::Completed);
    assert_eq!(h.solana.submitted().len(), 1);

    let record = h.orchestrator.get_transfer(&receipt.transfer_id).await.unwrap();
    assert_eq!(record.mint_tx_hash.as_deref(), Some(mint.tx_hash.as_str()));
    assert!(matches!(
        h.orchestrator.complete_transfer(&receipt.transfer_id).await,
        Err(BridgeError::InvalidStatusTransition {
            from: TransferStatus::Completed,
            ..
        })
    ));
}

#[tokio::test]
async fn test_status_reconciles_forward() {
    let ethereum = funded_ethereum();
    let h = harness(ethereum, FeePolicy::Zero);
    let receipt = h
        .orchestrator
        .initiate_transfer(ethereum_to_solana(&h.ethereum, "1"))
        .await
        .unwrap();

    let report = h
        .orchestrator
        .get_transfer_status("ethereum", &receipt.tx_hash)
        .await
        .unwrap();
    assert!(report.burn_confirmed);
    assert_eq!(report.confirmations, 3);
    assert!(!report.attestation_complete);
    assert!(!report.can_complete);
    assert_eq!(report.status, TransferStatus::Confirmed);

    let recipient = FixedBytes::from(Keypair::from_seed(&[2u8; 32]).pubkey().to_bytes());
    h.attestations.complete(
        &receipt.tx_hash,
        burn_message(0, 5, recipient, 1_000_000),
        fake_attestation(),
    );
    let report = h
        .orchestrator
        .get_transfer_status("ethereum", &receipt.tx_hash)
        .await
        .unwrap();
    assert!(report.can_complete);
    assert_eq!(report.status, TransferStatus::Bridging);
    assert_eq!(report.record.unwrap().status, TransferStatus::Bridging);
}

#[tokio::test]
async fn test_status_of_unknown_burn() {
    let h = harness(funded_ethereum(), FeePolicy::Zero);

    let report = h
        .orchestrator
        .get_transfer_status(
            "ethereum",
            "0x9999999999999999999999999999999999999999999999999999999999999999",
        )
        .await
        .unwrap();

    assert!(!report.burn_found);
    assert!(report.record.is_none());
    assert_eq!(report.status, TransferStatus::Created);
    assert_eq!(h.attestations.call_count(), 0);
}

#[tokio::test]
async fn test_registered_hook_generates_payload() {
    let h = harness(funded_ethereum(), FeePolicy::Zero);
    h.hooks.register("base", "0x00000000000000000000000000000000000000aa").await;

    let request = TransferRequest::builder()
        .source_chain("ethereum")
        .destination_chain("base")
        .amount("2.5")
        .source_address(h.ethereum.sender().to_string())
        .destination_address("0x742d35Cc6634C0532925a3b844Bc9e7595f8fA0d")
        .build();
    h.orchestrator.initiate_transfer(request).await.unwrap();

    let contexts = h.hook_generator.contexts();
    assert_eq!(contexts.len(), 1);
    assert_eq!(contexts[0].amount, 2_500_000);
    assert_eq!(contexts[0].hook_contract, "0x00000000000000000000000000000000000000aa");

    // No hook on solana, so nothing is generated for it.
    h.orchestrator
        .initiate_transfer(ethereum_to_solana(&h.ethereum, "1"))
        .await
        .unwrap();
    assert_eq!(h.hook_generator.contexts().len(), 1);
}

#[tokio::test]
async fn test_fast_transfer_records_fee() {
    let h = harness(funded_ethereum(), FeePolicy::BasisPoints(10));
    let mut request = ethereum_to_solana(&h.ethereum, "10.5");
    request.finality = Some(FinalityThreshold::Fast);

    let receipt = h.orchestrator.initiate_transfer(request).await.unwrap();
    let record = h.orchestrator.get_transfer(&receipt.transfer_id).await.unwrap();

    assert_eq!(record.max_fee, 10_500);
    assert_eq!(record.finality_threshold, FinalityThreshold::Fast);
}

#[tokio::test]
async fn test_rejected_requests_create_no_record() {
    let h = harness(funded_ethereum(), FeePolicy::Zero);
    let sender = h.ethereum.sender().to_string();
    let base = |amount: &str| ethereum_to_solana(&h.ethereum, amount);

    let mut same_chain = base("1");
    same_chain.destination_chain = "ethereum".into();

    let mut unknown_chain = base("1");
    unknown_chain.destination_chain = "fantom".into();

    let mut bad_destination = base("1");
    bad_destination.destination_address = sender.clone();

    let mut not_signer = base("1");
    not_signer.source_address = "0x742d35Cc6634C0532925a3b844Bc9e7595f8fA0d".into();

    let mut empty_destination = base("1");
    empty_destination.destination_address = String::new();

    for (request, code) in [
        (same_chain, "INVALID_REQUEST"),
        (unknown_chain, "UNSUPPORTED_CHAIN"),
        (base("1.0000001"), "INVALID_REQUEST"),
        (base("0"), "INVALID_REQUEST"),
        (bad_destination, "INVALID_ADDRESS"),
        (not_signer, "INVALID_REQUEST"),
        (empty_destination, "INVALID_REQUEST"),
    ] {
        let err = h.orchestrator.initiate_transfer(request).await.unwrap_err();
        assert_eq!(err.code(), code, "{err}");
        assert!(err.is_validation());
    }

    assert!(h.store.transfer_ids().is_empty());
    assert_eq!(h.ethereum.submission_count(), 0);
}

#[tokio::test]
async fn test_burn_hash_survives_concurrent_record_update() {
    let h = harness(funded_ethereum(), FeePolicy::Zero);
    h.store.conflict_on_burn_writes(1);

    let receipt = h
        .orchestrator
        .initiate_transfer(ethereum_to_solana(&h.ethereum, "10.5"))
        .await
        .unwrap();

    let record = h.orchestrator.get_transfer(&receipt.transfer_id).await.unwrap();
    assert_eq!(record.burn_tx_hash.as_deref(), Some(receipt.tx_hash.as_str()));
    assert_eq!(record.status, TransferStatus::Confirmed);
    assert_eq!(record.metadata.get("touched").map(String::as_str), Some("1"));
    assert_eq!(h.ethereum.submission_count(), 1);
}

#[tokio::test]
async fn test_unrecorded_burn_returns_its_hash() {
    let h = harness(funded_ethereum(), FeePolicy::Zero);
    h.store.reject_burn_writes();

    let err = h
        .orchestrator
        .initiate_transfer(ethereum_to_solana(&h.ethereum, "10.5"))
        .await
        .unwrap_err();

    let BridgeError::BurnNotRecorded {
        transfer_id,
        tx_hash,
        ..
    } = &err
    else {
        panic!("unexpected error: {err}");
    };
    assert!(tx_hash.starts_with("0x"));
    assert_eq!(h.ethereum.submission_count(), 1);

    let record = h.orchestrator.get_transfer(transfer_id).await.unwrap();
    assert_eq!(record.status, TransferStatus::Pending);
    assert!(record.burn_tx_hash.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_wait_for_attestation_until_complete() {
    let h = harness(funded_ethereum(), FeePolicy::Zero);
    let receipt = h
        .orchestrator
        .initiate_transfer(ethereum_to_solana(&h.ethereum, "10.5"))
        .await
        .unwrap();
    let recipient = FixedBytes::from(Keypair::from_seed(&[2u8; 32]).pubkey().to_bytes());
    h.attestations.pending(&receipt.tx_hash);
    h.attestations.rate_limited(&receipt.tx_hash, 5);
    h.attestations.complete(
        &receipt.tx_hash,
        burn_message(0, 5, recipient, 10_500_000),
        fake_attestation(),
    );

    let result = h
        .orchestrator
        .wait_for_attestation(&receipt.transfer_id, Some(5), Some(Duration::from_secs(10)))
        .await
        .unwrap();

    assert!(result.is_complete());
    assert_eq!(h.attestations.call_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_wait_for_attestation_times_out() {
    let h = harness(funded_ethereum(), FeePolicy::Zero);
    let receipt = h
        .orchestrator
        .initiate_transfer(ethereum_to_solana(&h.ethereum, "10.5"))
        .await
        .unwrap();
    h.attestations.pending(&receipt.tx_hash);

    let err = h
        .orchestrator
        .wait_for_attestation(&receipt.transfer_id, Some(4), Some(Duration::from_secs(10)))
        .await
        .unwrap_err();

    assert!(matches!(err, BridgeError::AttestationTimeout));
    assert_eq!(h.attestations.call_count(), 4);
    assert_eq!(
        h.orchestrator.get_transfer(&receipt.transfer_id).await.unwrap().status,
        TransferStatus::Confirmed
    );
}

#[tokio::test]
async fn test_use_cases_in_envelope_form() {
    let h = harness(funded_ethereum(), FeePolicy::Zero);

    let mut rejected = ethereum_to_solana(&h.ethereum, "1");
    rejected.amount = "1.0000001".into();
    let response = h.orchestrator.initiate_transfer_response(rejected).await;
    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["success"], false);
    assert!(json.get("data").is_none());
    assert_eq!(json["error"]["code"], "INVALID_REQUEST");
    assert_eq!(
        json["error"]["message"],
        "Invalid request: amount \"1.0000001\" has more than 6 decimal places"
    );
    assert!(json["timestamp"].is_string());

    let response = h
        .orchestrator
        .initiate_transfer_response(ethereum_to_solana(&h.ethereum, "10.5"))
        .await;
    assert!(response.success);
    let receipt = response.data.clone().unwrap();
    let json = serde_json::to_value(&response).unwrap();
    assert!(json.get("error").is_none());
    assert_eq!(json["data"]["transferId"], receipt.transfer_id.as_str());
    assert_eq!(json["data"]["status"], "CONFIRMED");

    let attestation = h.orchestrator.get_attestation_response(&receipt.transfer_id).await;
    assert!(attestation.success);
    assert_eq!(attestation.data.unwrap().status, AttestationState::Pending);

    let complete = h.orchestrator.complete_transfer_response(&receipt.transfer_id).await;
    assert!(!complete.success);
    assert_eq!(complete.error.unwrap().code, "ATTESTATION_NOT_READY");

    let status = h
        .orchestrator
        .get_transfer_status_response("ethereum", &receipt.tx_hash)
        .await;
    assert!(status.success);
    assert!(status.data.unwrap().burn_confirmed);
}
