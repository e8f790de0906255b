// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Ready-made chain configurations
//!
//! EVM presets are derived from `alloy_chains::NamedChain` and use the unified
//! per-environment bridge contracts. Account-chain presets cover mainnet and
//! devnet.

use alloy_chains::NamedChain;
use alloy_primitives::Address;
use url::Url;

use super::addresses::*;
use super::{AccountChainContracts, ChainConfig, ChainContracts, EvmContracts};
use crate::error::{BridgeError, Result};
use crate::protocol::DomainId;

/// Bridge configuration for EVM chains known to `alloy_chains`.
///
/// # Example
///
/// ```rust
/// use cctp_engine::{DomainId, EvmChainPreset};
/// use alloy_chains::NamedChain;
///
/// assert!(NamedChain::Base.supports_bridge());
/// assert_eq!(NamedChain::Base.bridge_domain().unwrap(), DomainId::Base);
/// ```
pub trait EvmChainPreset {
    /// True if the chain has bridge contracts and a known USDC deployment.
    fn supports_bridge(&self) -> bool;

    fn bridge_domain(&self) -> Result<DomainId>;

    fn token_messenger_address(&self) -> Result<Address>;

    fn message_transmitter_address(&self) -> Result<Address>;

    fn usdc_address(&self) -> Result<Address>;

    /// Confirmations after which a burn is treated as confirmed.
    ///
    /// Ethereum L1 waits for two blocks; everything else for one.
    fn default_confirmations(&self) -> Result<u64>;

    /// Full chain configuration under `chain_id`.
    fn chain_config(&self, chain_id: &str, rpc_url: Url) -> Result<ChainConfig>;
}

impl EvmChainPreset for NamedChain {
    fn supports_bridge(&self) -> bool {
        matches!(
            self,
            Self::Mainnet
                | Self::Sepolia
                | Self::Arbitrum
                | Self::ArbitrumSepolia
                | Self::Base
                | Self::BaseSepolia
                | Self::Optimism
                | Self::Avalanche
                | Self::Polygon
                | Self::Unichain
                | Self::Linea
        )
    }

    fn bridge_domain(&self) -> Result<DomainId> {
        Ok(match self {
            Self::Mainnet | Self::Sepolia => DomainId::Ethereum,
            Self::Avalanche => DomainId::Avalanche,
            Self::Optimism => DomainId::Optimism,
            Self::Arbitrum | Self::ArbitrumSepolia => DomainId::Arbitrum,
            Self::Base | Self::BaseSepolia => DomainId::Base,
            Self::Polygon => DomainId::Polygon,
            Self::Unichain => DomainId::Unichain,
            Self::Linea => DomainId::Linea,
            _ => return Err(unsupported(self)),
        })
    }

    fn token_messenger_address(&self) -> Result<Address> {
        if !self.supports_bridge() {
            return Err(unsupported(self));
        }

        Ok(if self.is_testnet() {
            CCTP_V2_TOKEN_MESSENGER_TESTNET
        } else {
            CCTP_V2_TOKEN_MESSENGER_MAINNET
        })
    }

    fn message_transmitter_address(&self) -> Result<Address> {
        if !self.supports_bridge() {
            return Err(unsupported(self));
        }

        Ok(if self.is_testnet() {
            CCTP_V2_MESSAGE_TRANSMITTER_TESTNET
        } else {
            CCTP_V2_MESSAGE_TRANSMITTER_MAINNET
        })
    }

    fn usdc_address(&self) -> Result<Address> {
        Ok(match self {
            Self::Mainnet => ETHEREUM_USDC,
            Self::Sepolia => ETHEREUM_SEPOLIA_USDC,
            Self::Arbitrum => ARBITRUM_USDC,
            Self::ArbitrumSepolia => ARBITRUM_SEPOLIA_USDC,
            Self::Base => BASE_USDC,
            Self::BaseSepolia => BASE_SEPOLIA_USDC,
            Self::Optimism => OPTIMISM_USDC,
            Self::Avalanche => AVALANCHE_USDC,
            Self::Polygon => POLYGON_USDC,
            Self::Unichain => UNICHAIN_USDC,
            Self::Linea => LINEA_USDC,
            _ => return Err(unsupported(self)),
        })
    }

    fn default_confirmations(&self) -> Result<u64> {
        match self {
            Self::Mainnet | Self::Sepolia => Ok(2),
            other if other.supports_bridge() => Ok(1),
            other => Err(unsupported(other)),
        }
    }

    fn chain_config(&self, chain_id: &str, rpc_url: Url) -> Result<ChainConfig> {
        Ok(ChainConfig::builder()
            .chain_id(chain_id)
            .rpc_url(rpc_url)
            .domain(self.bridge_domain()?)
            .contracts(ChainContracts::Evm(EvmContracts {
                token_messenger: self.token_messenger_address()?,
                message_transmitter: self.message_transmitter_address()?,
                usdc: self.usdc_address()?,
            }))
            .required_confirmations(self.default_confirmations()?)
            .build())
    }
}

fn unsupported(chain: &NamedChain) -> BridgeError {
    BridgeError::UnsupportedChain {
        chain: chain.to_string(),
    }
}

/// Account-chain mainnet, registered as `"solana"`.
pub fn solana_mainnet(rpc_url: Url) -> ChainConfig {
    account_chain_config("solana", rpc_url, SOLANA_USDC_MINT)
}

/// Account-chain devnet, registered as `"solana-devnet"`.
pub fn solana_devnet(rpc_url: Url) -> ChainConfig {
    account_chain_config("solana-devnet", rpc_url, SOLANA_DEVNET_USDC_MINT)
}

fn account_chain_config(
    chain_id: &str,
    rpc_url: Url,
    usdc_mint: crate::account_chain::Pubkey,
) -> ChainConfig {
    ChainConfig::builder()
        .chain_id(chain_id)
        .rpc_url(rpc_url)
        .domain(DomainId::Solana)
        .contracts(ChainContracts::AccountChain(AccountChainContracts {
            token_messenger_minter: TOKEN_MESSENGER_MINTER_PROGRAM,
            message_transmitter: MESSAGE_TRANSMITTER_PROGRAM,
            usdc_mint,
        }))
        .build()
}
