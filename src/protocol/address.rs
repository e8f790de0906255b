// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Mint-recipient formatting
//!
//! Every address inside a message is 32 bytes wide. EVM addresses are
//! left-padded with 12 zero bytes; account-chain addresses are already 32
//! bytes and are used as-is.

use std::str::FromStr;

use alloy_primitives::{Address, FixedBytes};

use crate::account_chain::Pubkey;
use crate::chain::ChainFamily;
use crate::error::{BridgeError, Result};

/// Left-pads a 20-byte EVM address to 32 bytes.
pub fn evm_address_to_bytes32(address: Address) -> FixedBytes<32> {
    address.into_word()
}

/// Recovers an EVM address from a padded 32-byte value.
///
/// Returns `None` if any of the 12 leading bytes is non-zero.
pub fn bytes32_to_evm_address(bytes: &FixedBytes<32>) -> Option<Address> {
    if bytes[..12].iter().any(|b| *b != 0) {
        return None;
    }
    Some(Address::from_slice(&bytes[12..]))
}

/// Formats a destination address as the 32-byte mint recipient for the given
/// chain family.
pub fn mint_recipient_bytes(family: ChainFamily, address: &str) -> Result<FixedBytes<32>> {
    match family {
        ChainFamily::Evm => {
            let parsed = Address::from_str(address).map_err(|e| BridgeError::InvalidAddress {
                address: address.to_string(),
                reason: e.to_string(),
            })?;
            Ok(evm_address_to_bytes32(parsed))
        }
        ChainFamily::AccountChain => {
            let pubkey = Pubkey::from_str(address)?;
            Ok(FixedBytes::from(pubkey.to_bytes()))
        }
    }
}

/// Checks that `address` is well formed for `family`.
pub fn validate_address(family: ChainFamily, address: &str) -> Result<()> {
    mint_recipient_bytes(family, address).map(|_| ())
}
