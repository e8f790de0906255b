// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Protocol-level types: domains, finality tiers, the message codec and the
//! attestation service's response shapes.

mod address;
mod attestation;
mod domain_id;
mod finality;
mod message;

pub use address::{
    bytes32_to_evm_address, evm_address_to_bytes32, mint_recipient_bytes, validate_address,
};
pub use attestation::{AttestationStatus, V2AttestationResponse, V2Message};
pub use domain_id::DomainId;
pub use finality::FinalityThreshold;
pub use message::{
    decode_burn_body, decode_message, message_hash, ParsedBurnBody, ParsedMessage,
    BURN_BODY_SIZE, MESSAGE_HEADER_SIZE,
};
