// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! # cctp-engine
//!
//! Cross-chain USDC transfers over Circle's Cross-Chain Transfer Protocol,
//! between EVM chains and Solana.
//!
//! A transfer moves through three externally visible steps: a burn on the
//! source chain, an attestation from Circle's attestation service, and a
//! mint on the destination chain. [`TransferOrchestrator`] runs one step per
//! call and keeps a [`TransferRecord`] of everything it learns.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use alloy_chains::NamedChain;
//! use cctp_engine::{
//!     solana_mainnet, AlloyEvmClient, BridgeError, ChainRegistry, EngineConfig,
//!     EvmChainPreset, EvmTransferExecutor, Executors, InMemoryTransferStore,
//!     IrisAttestationProvider, TransferOrchestrator, TransferRequest,
//! };
//!
//! # async fn example() -> Result<(), BridgeError> {
//! # use alloy_provider::ProviderBuilder;
//! # let sender = "0x742d35Cc6634C0532925a3b844Bc9e7595f8fA0d".parse()?;
//! let config = EngineConfig::from_env()?;
//! let eth_url = "http://localhost:8545".parse().expect("valid url");
//! let provider = ProviderBuilder::new().connect_http("http://localhost:8545".parse().expect("valid url"));
//!
//! let chains = ChainRegistry::new()
//!     .with_chain(NamedChain::Mainnet.chain_config("ethereum", eth_url)?)
//!     .with_chain(solana_mainnet("https://api.mainnet-beta.solana.com".parse().expect("valid url")));
//!
//! let evm = EvmTransferExecutor::new(config.confirmation)
//!     .with_client("ethereum", Arc::new(AlloyEvmClient::new(provider, sender)));
//!
//! let orchestrator = TransferOrchestrator::builder()
//!     .chains(chains)
//!     .store(Arc::new(InMemoryTransferStore::new()))
//!     .executors(Executors { evm: Some(Arc::new(evm)), account_chain: None })
//!     .attestation_provider(Arc::new(IrisAttestationProvider::new(&config.attestation)?))
//!     .build()
//!     .with_engine_config(&config);
//!
//! let receipt = orchestrator
//!     .initiate_transfer(
//!         TransferRequest::builder()
//!             .source_chain("ethereum")
//!             .destination_chain("solana")
//!             .amount("10.5")
//!             .source_address("0x742d35Cc6634C0532925a3b844Bc9e7595f8fA0d")
//!             .destination_address("9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM")
//!             .build(),
//!     )
//!     .await?;
//!
//! // Later, once Circle has attested the burn:
//! let attestation = orchestrator.get_attestation(&receipt.transfer_id).await?;
//! if attestation.is_complete() {
//!     orchestrator.complete_transfer(&receipt.transfer_id).await?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Layout
//!
//! - [`protocol`]: message codec, domains, finality tiers, attestation types
//! - [`chain`]: chain configuration, presets and the [`ChainRegistry`]
//! - [`executor`]: burn and mint per chain family
//! - [`account_chain`]: Solana addresses, PDAs, instructions and transactions
//! - [`contracts`]: EVM calldata builders
//! - [`transfer`]: records, lifecycle and reconciliation
//! - [`providers`]: production RPC and attestation clients
//! - [`testing`]: fakes for every collaborator trait

pub mod account_chain;
pub mod attestation;
pub mod chain;
pub mod config;
pub mod contracts;
mod error;
pub mod executor;
pub mod hooks;
pub mod orchestrator;
pub mod protocol;
pub mod providers;
pub mod response;
pub mod testing;
pub mod traits;
pub mod transfer;

// Public module for advanced users who need custom instrumentation
pub mod spans;

pub use attestation::{AttestationClient, AttestationResult, AttestationState};
pub use chain::{
    solana_devnet, solana_mainnet, AccountChainContracts, ChainConfig, ChainContracts,
    ChainFamily, ChainRegistry, EvmChainPreset, EvmContracts,
};
pub use config::{AttestationConfig, ComputeBudgetConfig, ConfirmationConfig, EngineConfig, FeePolicy};
pub use error::{BridgeError, Result};
pub use executor::{
    AccountChainTransferExecutor, Executors, EvmTransferExecutor, TransferExecutor,
    TransferSubmission, TxConfirmation,
};
pub use hooks::{HookContext, HookRegistry};
pub use orchestrator::{parse_usdc_amount, TransferOrchestrator, TransferReceipt, TransferRequest};
pub use protocol::{
    decode_burn_body, decode_message, DomainId, FinalityThreshold, ParsedBurnBody, ParsedMessage,
};
pub use providers::{AlloyEvmClient, IrisAttestationProvider, SolanaJsonRpcClient};
pub use response::{ApiError, ApiResponse};
pub use traits::{
    AccountChainRpc, AttestationProvider, EvmChainClient, HookDataGenerator, TransferStore,
};
pub use transfer::{
    InMemoryTransferStore, StateMachine, TransferRecord, TransferStatus, TransferStatusReport,
};
