// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Production implementations of the collaborator traits.
//!
//! These talk to real EVM nodes, account-chain JSON-RPC nodes and Circle's
//! Iris API. Tests use the fakes in [`testing`](crate::testing) instead.

mod alloy;
mod iris;
mod solana;

pub use self::alloy::{apply_gas_buffer, AlloyEvmClient, DEFAULT_GAS_BUFFER_PERCENT};
pub use self::iris::IrisAttestationProvider;
pub use self::solana::SolanaJsonRpcClient;
