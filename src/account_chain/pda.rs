// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Program-derived address derivation.
//!
//! A PDA is `sha256(seed_0 ∥ .. ∥ seed_n ∥ bump ∥ program_id ∥ "ProgramDerivedAddress")`
//! for the highest bump in 255..=0 whose hash is not a valid ed25519 point.

use curve25519_dalek::edwards::CompressedEdwardsY;
use sha2::{Digest, Sha256};

use super::pubkey::{Pubkey, ASSOCIATED_TOKEN_PROGRAM_ID, TOKEN_PROGRAM_ID};
use crate::error::{BridgeError, Result};

const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

/// Finds the canonical PDA and its bump seed.
pub fn find_program_address(seeds: &[&[u8]], program_id: &Pubkey) -> Result<(Pubkey, u8)> {
    for bump in (0u8..=255).rev() {
        if let Some(address) = create_program_address(seeds, bump, program_id) {
            return Ok((address, bump));
        }
    }

    Err(BridgeError::InvalidAddress {
        address: program_id.to_string(),
        reason: "no viable bump seed for program address".to_string(),
    })
}

/// Same as [`find_program_address`] without the bump.
pub fn derive_address(seeds: &[&[u8]], program_id: &Pubkey) -> Result<Pubkey> {
    find_program_address(seeds, program_id).map(|(address, _)| address)
}

/// Hashes one candidate; `None` if it lands on the curve.
pub fn create_program_address(seeds: &[&[u8]], bump: u8, program_id: &Pubkey) -> Option<Pubkey> {
    let mut hasher = Sha256::new();
    for seed in seeds {
        hasher.update(seed);
    }
    hasher.update([bump]);
    hasher.update(program_id.as_bytes());
    hasher.update(PDA_MARKER);

    let hash: [u8; 32] = hasher.finalize().into();
    if is_on_curve(&hash) {
        return None;
    }
    Some(Pubkey::new(hash))
}

pub fn is_on_curve(bytes: &[u8; 32]) -> bool {
    CompressedEdwardsY(*bytes).decompress().is_some()
}

/// Associated token account for a wallet and mint.
pub fn associated_token_address(wallet: &Pubkey, mint: &Pubkey) -> Result<Pubkey> {
    derive_address(
        &[wallet.as_ref(), TOKEN_PROGRAM_ID.as_ref(), mint.as_ref()],
        &ASSOCIATED_TOKEN_PROGRAM_ID,
    )
}
