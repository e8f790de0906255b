// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
//! Contract and program addresses for the bridge across supported chains
//!
//! EVM chains share one TokenMessenger and one MessageTransmitter address per
//! environment. The account chain runs two programs plus the USDC mint.
//!
//! Reference: <https://developers.circle.com/cctp/evm-smart-contracts>

use alloy_primitives::{address, Address};

use crate::account_chain::Pubkey;

// =============================================================================
// EVM bridge contracts (unified per environment)
// =============================================================================

/// <https://developers.circle.com/cctp/evm-smart-contracts>
pub const CCTP_V2_MESSAGE_TRANSMITTER_MAINNET: Address =
    address!("81D40F21F12A8F0E3252Bccb954D722d4c464B64");

/// <https://developers.circle.com/cctp/evm-smart-contracts>
pub const CCTP_V2_TOKEN_MESSENGER_MAINNET: Address =
    address!("28b5a0e9C621a5BadaA536219b3a228C8168cf5d");

/// <https://developers.circle.com/cctp/evm-smart-contracts>
pub const CCTP_V2_MESSAGE_TRANSMITTER_TESTNET: Address =
    address!("E737e5cEBEEBa77EFE34D4aa090756590b1CE275");

/// <https://developers.circle.com/cctp/evm-smart-contracts>
pub const CCTP_V2_TOKEN_MESSENGER_TESTNET: Address =
    address!("8FE6B999Dc680CcFDD5Bf7EB0974218be2542DAA");

// =============================================================================
// USDC token contracts
// =============================================================================
//
// Reference: <https://developers.circle.com/stablecoins/usdc-contract-addresses>

pub const ETHEREUM_USDC: Address = address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48");
pub const ARBITRUM_USDC: Address = address!("af88d065e77c8cC2239327C5EDb3A432268e5831");
pub const BASE_USDC: Address = address!("833589fCD6eDb6E08f4c7C32D4f71b54bdA02913");
pub const OPTIMISM_USDC: Address = address!("0b2C639c533813f4Aa9D7837CAf62653d097Ff85");
pub const AVALANCHE_USDC: Address = address!("B97EF9Ef8734C71904D8002F8b6Bc66Dd9c48a6E");
pub const POLYGON_USDC: Address = address!("3c499c542cEF5E3811e1192ce70d8cC03d5c3359");
pub const LINEA_USDC: Address = address!("176211869cA2b568f2A7D4EE941E073a821EE1ff");
pub const UNICHAIN_USDC: Address = address!("078D782b760474a361dDA0AF3839290b0EF57AD6");

pub const ETHEREUM_SEPOLIA_USDC: Address = address!("1c7D4B196Cb0C7B01d743Fbc6116a902379C7238");
pub const BASE_SEPOLIA_USDC: Address = address!("036CbD53842c5426634e7929541eC2318f3dCF7e");
pub const ARBITRUM_SEPOLIA_USDC: Address = address!("75faf114eafb1BDbe2F0316DF893fd58CE46AA4d");

// =============================================================================
// Account chain programs
// =============================================================================
//
// Reference: <https://developers.circle.com/cctp/solana-programs>

/// `CCTPiPYPc6AsJuwueEnWgSgucamXDZwBd53dQ11YiKX3`
pub const TOKEN_MESSENGER_MINTER_PROGRAM: Pubkey = Pubkey::new([
    0xa6, 0x5f, 0xc9, 0x43, 0x41, 0x9a, 0x5a, 0xd5, 0x90, 0x04, 0x2f, 0xd6, 0x7c, 0x97, 0x91, 0xfd,
    0x01, 0x5a, 0xcf, 0x53, 0xa5, 0x4c, 0xc8, 0x23, 0xed, 0xb8, 0xff, 0x81, 0xb9, 0xed, 0x72, 0x2e,
]);

/// `CCTPmbSD7gX1bxKPAmg77w8oFzNFpaQiQUWD43TKaecd`
pub const MESSAGE_TRANSMITTER_PROGRAM: Pubkey = Pubkey::new([
    0xa6, 0x5f, 0xc9, 0x89, 0xdb, 0x5f, 0x5d, 0x42, 0x75, 0x9f, 0x3a, 0x54, 0x60, 0x58, 0xef, 0xcd,
    0xcd, 0xc0, 0xbf, 0x3c, 0x18, 0x98, 0x07, 0x2d, 0x8e, 0xb4, 0x5d, 0xd1, 0xd8, 0x05, 0x08, 0xce,
]);

/// `EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v`
pub const SOLANA_USDC_MINT: Pubkey = Pubkey::new([
    0xc6, 0xfa, 0x7a, 0xf3, 0xbe, 0xdb, 0xad, 0x3a, 0x3d, 0x65, 0xf3, 0x6a, 0xab, 0xc9, 0x74, 0x31,
    0xb1, 0xbb, 0xe4, 0xc2, 0xd2, 0xf6, 0xe0, 0xe4, 0x7c, 0xa6, 0x02, 0x03, 0x45, 0x2f, 0x5d, 0x61,
]);

/// `4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU`
pub const SOLANA_DEVNET_USDC_MINT: Pubkey = Pubkey::new([
    0x3b, 0x44, 0x2c, 0xb3, 0x91, 0x21, 0x57, 0xf1, 0x3a, 0x93, 0x3d, 0x01, 0x34, 0x28, 0x2d, 0x03,
    0x2b, 0x5f, 0xfe, 0xcd, 0x01, 0xa2, 0xdb, 0xf1, 0xb7, 0x79, 0x06, 0x08, 0xdf, 0x00, 0x2e, 0xa7,
]);

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(TOKEN_MESSENGER_MINTER_PROGRAM, "CCTPiPYPc6AsJuwueEnWgSgucamXDZwBd53dQ11YiKX3")]
    #[case(MESSAGE_TRANSMITTER_PROGRAM, "CCTPmbSD7gX1bxKPAmg77w8oFzNFpaQiQUWD43TKaecd")]
    #[case(SOLANA_USDC_MINT, "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v")]
    #[case(SOLANA_DEVNET_USDC_MINT, "4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU")]
    fn test_account_chain_ids_match_base58(#[case] key: Pubkey, #[case] expected: &str) {
        assert_eq!(key.to_string(), expected);
    }

    #[test]
    fn test_unified_addresses_differ_per_environment() {
        assert_ne!(CCTP_V2_TOKEN_MESSENGER_MAINNET, CCTP_V2_TOKEN_MESSENGER_TESTNET);
        assert_ne!(
            CCTP_V2_MESSAGE_TRANSMITTER_MAINNET,
            CCTP_V2_MESSAGE_TRANSMITTER_TESTNET
        );
    }
}
