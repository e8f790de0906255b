// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Chain configuration and the registry of chains the engine can drive
//!
//! Every chain carries a family tag derived from its contract set. The tag is
//! the only place the engine branches between EVM and account-chain logic.

pub mod addresses;
mod presets;

use std::collections::HashMap;
use std::fmt;

use alloy_primitives::Address;
use bon::Builder;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::account_chain::Pubkey;
use crate::error::{BridgeError, Result};
use crate::protocol::{DomainId, FinalityThreshold};

pub use presets::{solana_devnet, solana_mainnet, EvmChainPreset};

/// How a chain is driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainFamily {
    /// Contract calls against a TokenMessenger / MessageTransmitter pair.
    Evm,
    /// Program instructions built and signed locally.
    AccountChain,
}

impl fmt::Display for ChainFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Evm => f.write_str("evm"),
            Self::AccountChain => f.write_str("account_chain"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvmContracts {
    pub token_messenger: Address,
    pub message_transmitter: Address,
    pub usdc: Address,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountChainContracts {
    pub token_messenger_minter: Pubkey,
    pub message_transmitter: Pubkey,
    pub usdc_mint: Pubkey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainContracts {
    Evm(EvmContracts),
    AccountChain(AccountChainContracts),
}

/// Static configuration for one chain.
///
/// # Example
///
/// ```rust
/// use cctp_engine::{ChainConfig, ChainContracts, DomainId, EvmContracts};
/// use alloy_primitives::Address;
///
/// let config = ChainConfig::builder()
///     .chain_id("ethereum")
///     .rpc_url("http://localhost:8545".parse().unwrap())
///     .domain(DomainId::Ethereum)
///     .contracts(ChainContracts::Evm(EvmContracts {
///         token_messenger: Address::ZERO,
///         message_transmitter: Address::ZERO,
///         usdc: Address::ZERO,
///     }))
///     .build();
///
/// assert_eq!(config.required_confirmations(), 1);
/// ```
#[derive(Builder, Debug, Clone)]
pub struct ChainConfig {
    #[builder(into)]
    chain_id: String,
    rpc_url: Url,
    domain: DomainId,
    contracts: ChainContracts,

    #[builder(default = FinalityThreshold::Fast.as_u32())]
    fast_finality_threshold: u32,

    #[builder(default = FinalityThreshold::Standard.as_u32())]
    standard_finality_threshold: u32,

    /// Confirmations after which a burn counts as confirmed
    #[builder(default = 1)]
    required_confirmations: u64,
}

impl ChainConfig {
    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    pub fn rpc_url(&self) -> &Url {
        &self.rpc_url
    }

    pub fn domain(&self) -> DomainId {
        self.domain
    }

    pub fn contracts(&self) -> &ChainContracts {
        &self.contracts
    }

    pub fn family(&self) -> ChainFamily {
        match self.contracts {
            ChainContracts::Evm(_) => ChainFamily::Evm,
            ChainContracts::AccountChain(_) => ChainFamily::AccountChain,
        }
    }

    /// Numeric threshold sent on-chain for the requested tier.
    pub fn finality_threshold(&self, tier: FinalityThreshold) -> u32 {
        if tier.is_fast() {
            self.fast_finality_threshold
        } else {
            self.standard_finality_threshold
        }
    }

    pub fn required_confirmations(&self) -> u64 {
        self.required_confirmations
    }

    pub fn evm_contracts(&self) -> Result<&EvmContracts> {
        match &self.contracts {
            ChainContracts::Evm(contracts) => Ok(contracts),
            ChainContracts::AccountChain(_) => Err(BridgeError::UnsupportedChain {
                chain: format!("{} is not an EVM chain", self.chain_id),
            }),
        }
    }

    pub fn account_chain_contracts(&self) -> Result<&AccountChainContracts> {
        match &self.contracts {
            ChainContracts::AccountChain(contracts) => Ok(contracts),
            ChainContracts::Evm(_) => Err(BridgeError::UnsupportedChain {
                chain: format!("{} is not an account chain", self.chain_id),
            }),
        }
    }
}

/// Chains the engine is configured for, keyed by chain identifier.
#[derive(Debug, Clone, Default)]
pub struct ChainRegistry {
    chains: HashMap<String, ChainConfig>,
}

impl ChainRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chain(mut self, config: ChainConfig) -> Self {
        self.insert(config);
        self
    }

    /// Adds or replaces a chain, returning the previous entry.
    pub fn insert(&mut self, config: ChainConfig) -> Option<ChainConfig> {
        self.chains.insert(config.chain_id.clone(), config)
    }

    pub fn get(&self, chain_id: &str) -> Result<&ChainConfig> {
        self.chains
            .get(chain_id)
            .ok_or_else(|| BridgeError::UnsupportedChain {
                chain: chain_id.to_string(),
            })
    }

    pub fn contains(&self, chain_id: &str) -> bool {
        self.chains.contains_key(chain_id)
    }

    pub fn by_domain(&self, domain: DomainId) -> Option<&ChainConfig> {
        self.chains.values().find(|c| c.domain == domain)
    }

    pub fn chain_ids(&self) -> impl Iterator<Item = &str> {
        self.chains.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}
