// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Protocol domain identifiers
//!
//! A domain is the bridge's own chain number and is unrelated to a chain's
//! native chain id.
//!
//! Reference: <https://developers.circle.com/cctp/supported-domains>

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::chain::ChainFamily;
use crate::error::BridgeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
#[repr(u32)]
#[non_exhaustive]
pub enum DomainId {
    Ethereum = 0,
    Avalanche = 1,
    Optimism = 2,
    Arbitrum = 3,
    Solana = 5,
    Base = 6,
    Polygon = 7,
    Unichain = 10,
    Linea = 11,
    Codex = 12,
    Sonic = 13,
    WorldChain = 14,
    Monad = 15,
    Sei = 16,
    BnbSmartChain = 17,
    Xdc = 18,
    HyperEvm = 19,
    Ink = 21,
    Plume = 22,
    StarknetTestnet = 25,
    ArcTestnet = 26,
}

impl DomainId {
    #[inline]
    pub const fn as_u32(self) -> u32 {
        self as u32
    }

    pub const fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Ethereum),
            1 => Some(Self::Avalanche),
            2 => Some(Self::Optimism),
            3 => Some(Self::Arbitrum),
            5 => Some(Self::Solana),
            6 => Some(Self::Base),
            7 => Some(Self::Polygon),
            10 => Some(Self::Unichain),
            11 => Some(Self::Linea),
            12 => Some(Self::Codex),
            13 => Some(Self::Sonic),
            14 => Some(Self::WorldChain),
            15 => Some(Self::Monad),
            16 => Some(Self::Sei),
            17 => Some(Self::BnbSmartChain),
            18 => Some(Self::Xdc),
            19 => Some(Self::HyperEvm),
            21 => Some(Self::Ink),
            22 => Some(Self::Plume),
            25 => Some(Self::StarknetTestnet),
            26 => Some(Self::ArcTestnet),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Ethereum => "Ethereum",
            Self::Avalanche => "Avalanche",
            Self::Optimism => "Optimism",
            Self::Arbitrum => "Arbitrum",
            Self::Solana => "Solana",
            Self::Base => "Base",
            Self::Polygon => "Polygon",
            Self::Unichain => "Unichain",
            Self::Linea => "Linea",
            Self::Codex => "Codex",
            Self::Sonic => "Sonic",
            Self::WorldChain => "World Chain",
            Self::Monad => "Monad",
            Self::Sei => "Sei",
            Self::BnbSmartChain => "BNB Smart Chain",
            Self::Xdc => "XDC",
            Self::HyperEvm => "HyperEVM",
            Self::Ink => "Ink",
            Self::Plume => "Plume",
            Self::StarknetTestnet => "Starknet Testnet",
            Self::ArcTestnet => "Arc Testnet",
        }
    }

    /// Chain family this engine drives the domain with.
    ///
    /// `None` for domains neither executor can reach.
    pub const fn family(self) -> Option<ChainFamily> {
        match self {
            Self::Solana => Some(ChainFamily::AccountChain),
            Self::StarknetTestnet => None,
            _ => Some(ChainFamily::Evm),
        }
    }
}

impl From<DomainId> for u32 {
    #[inline]
    fn from(domain: DomainId) -> Self {
        domain.as_u32()
    }
}

impl TryFrom<u32> for DomainId {
    type Error = BridgeError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::from_u32(value).ok_or_else(|| BridgeError::UnsupportedChain {
            chain: format!("domain {value}"),
        })
    }
}

impl fmt::Display for DomainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.as_u32())
    }
}
