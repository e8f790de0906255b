// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Token-program account layout.
//!
//! Only the leading fields the engine reads are decoded:
//! mint `0..32`, owner `32..64`, amount `64..72` (u64 LE).

use super::pubkey::Pubkey;
use crate::error::{BridgeError, Result};

/// Full size of a token-program account.
pub const TOKEN_ACCOUNT_LEN: usize = 165;

const AMOUNT_END: usize = 72;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenAccount {
    pub mint: Pubkey,
    pub owner: Pubkey,
    pub amount: u64,
}

impl TokenAccount {
    pub fn unpack(data: &[u8]) -> Result<Self> {
        if data.len() < AMOUNT_END {
            return Err(BridgeError::MalformedMessage {
                reason: format!(
                    "token account data is {} bytes, need at least {AMOUNT_END}",
                    data.len()
                ),
            });
        }

        let mut amount = [0u8; 8];
        amount.copy_from_slice(&data[64..72]);

        Ok(Self {
            mint: Pubkey::from_slice(&data[0..32])?,
            owner: Pubkey::from_slice(&data[32..64])?,
            amount: u64::from_le_bytes(amount),
        })
    }
}
