// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
//! EVM contract bindings
//!
//! Calldata builders for the bridge contracts and a provider-backed ERC20
//! reader. Transactions are returned unsigned and submitted by an
//! [`EvmChainClient`](crate::EvmChainClient).

pub mod erc20;
pub mod message_transmitter;
pub mod token_messenger;

pub use erc20::{approve_transaction, Erc20Contract};
pub use message_transmitter::MessageTransmitterV2Contract;
pub use token_messenger::{DepositForBurnParams, TokenMessengerV2Contract};
