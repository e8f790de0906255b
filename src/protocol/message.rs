// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Wire format of burn messages
//!
//! A message is a fixed 116-byte big-endian header followed by an opaque body.
//! Token transfers carry a burn body, itself a fixed 116-byte layout.
//!
//! # Header
//!
//! | offset | size | field              |
//! |--------|------|--------------------|
//! | 0      | 4    | version            |
//! | 4      | 4    | sourceDomain       |
//! | 8      | 4    | destinationDomain  |
//! | 12     | 8    | nonce              |
//! | 20     | 32   | sender             |
//! | 52     | 32   | recipient          |
//! | 84     | 32   | destinationCaller  |
//! | 116    | ..   | messageBody        |
//!
//! # Burn body
//!
//! | offset | size | field          |
//! |--------|------|----------------|
//! | 0      | 4    | bodyVersion    |
//! | 12     | 32   | burnToken      |
//! | 44     | 32   | mintRecipient  |
//! | 76     | 8    | amount         |
//! | 84     | 32   | messageSender  |
//!
//! Bytes 4..12 of the burn body are reserved and encoded as zero.

use alloy_primitives::{keccak256, Bytes, FixedBytes};
use serde::Serialize;

use super::DomainId;
use crate::error::{BridgeError, Result};

/// Size of the fixed message header in bytes.
pub const MESSAGE_HEADER_SIZE: usize = 116;

/// Size of the fixed burn body in bytes.
pub const BURN_BODY_SIZE: usize = 116;

const VERSION_OFFSET: usize = 0;
const SOURCE_DOMAIN_OFFSET: usize = 4;
const DESTINATION_DOMAIN_OFFSET: usize = 8;
const NONCE_OFFSET: usize = 12;
const SENDER_OFFSET: usize = 20;
const RECIPIENT_OFFSET: usize = 52;
const DESTINATION_CALLER_OFFSET: usize = 84;

const BODY_VERSION_OFFSET: usize = 0;
const BURN_TOKEN_OFFSET: usize = 12;
const MINT_RECIPIENT_OFFSET: usize = 44;
const AMOUNT_OFFSET: usize = 76;
const MESSAGE_SENDER_OFFSET: usize = 84;

/// A decoded protocol message.
///
/// Domains are kept as raw numbers so that messages from domains this crate
/// does not know about still decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedMessage {
    pub version: u32,
    pub source_domain: u32,
    pub destination_domain: u32,
    pub nonce: u64,
    pub sender: FixedBytes<32>,
    pub recipient: FixedBytes<32>,
    pub destination_caller: FixedBytes<32>,
    pub message_body: Bytes,
}

impl ParsedMessage {
    /// Decodes a message, failing with [`BridgeError::MalformedMessage`] when
    /// the header is truncated.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        ensure_len(bytes, MESSAGE_HEADER_SIZE, "message header")?;

        Ok(Self {
            version: read_u32(bytes, VERSION_OFFSET),
            source_domain: read_u32(bytes, SOURCE_DOMAIN_OFFSET),
            destination_domain: read_u32(bytes, DESTINATION_DOMAIN_OFFSET),
            nonce: read_u64(bytes, NONCE_OFFSET),
            sender: read_bytes32(bytes, SENDER_OFFSET),
            recipient: read_bytes32(bytes, RECIPIENT_OFFSET),
            destination_caller: read_bytes32(bytes, DESTINATION_CALLER_OFFSET),
            message_body: Bytes::copy_from_slice(&bytes[MESSAGE_HEADER_SIZE..]),
        })
    }

    pub fn encode(&self) -> Bytes {
        let mut bytes = Vec::with_capacity(MESSAGE_HEADER_SIZE + self.message_body.len());
        bytes.extend_from_slice(&self.version.to_be_bytes());
        bytes.extend_from_slice(&self.source_domain.to_be_bytes());
        bytes.extend_from_slice(&self.destination_domain.to_be_bytes());
        bytes.extend_from_slice(&self.nonce.to_be_bytes());
        bytes.extend_from_slice(self.sender.as_slice());
        bytes.extend_from_slice(self.recipient.as_slice());
        bytes.extend_from_slice(self.destination_caller.as_slice());
        bytes.extend_from_slice(&self.message_body);
        Bytes::from(bytes)
    }

    pub fn source_domain_id(&self) -> Option<DomainId> {
        DomainId::from_u32(self.source_domain)
    }

    pub fn destination_domain_id(&self) -> Option<DomainId> {
        DomainId::from_u32(self.destination_domain)
    }

    /// Decodes the body as a burn body.
    pub fn burn_body(&self) -> Result<ParsedBurnBody> {
        ParsedBurnBody::decode(&self.message_body)
    }
}

/// A decoded burn body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedBurnBody {
    pub body_version: u32,
    pub burn_token: FixedBytes<32>,
    pub mint_recipient: FixedBytes<32>,
    pub amount: u64,
    pub message_sender: FixedBytes<32>,
}

impl ParsedBurnBody {
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        ensure_len(bytes, BURN_BODY_SIZE, "burn body")?;

        Ok(Self {
            body_version: read_u32(bytes, BODY_VERSION_OFFSET),
            burn_token: read_bytes32(bytes, BURN_TOKEN_OFFSET),
            mint_recipient: read_bytes32(bytes, MINT_RECIPIENT_OFFSET),
            amount: read_u64(bytes, AMOUNT_OFFSET),
            message_sender: read_bytes32(bytes, MESSAGE_SENDER_OFFSET),
        })
    }

    pub fn encode(&self) -> Bytes {
        let mut bytes = vec![0u8; BURN_BODY_SIZE];
        bytes[BODY_VERSION_OFFSET..BODY_VERSION_OFFSET + 4]
            .copy_from_slice(&self.body_version.to_be_bytes());
        bytes[BURN_TOKEN_OFFSET..BURN_TOKEN_OFFSET + 32].copy_from_slice(self.burn_token.as_slice());
        bytes[MINT_RECIPIENT_OFFSET..MINT_RECIPIENT_OFFSET + 32]
            .copy_from_slice(self.mint_recipient.as_slice());
        bytes[AMOUNT_OFFSET..AMOUNT_OFFSET + 8].copy_from_slice(&self.amount.to_be_bytes());
        bytes[MESSAGE_SENDER_OFFSET..MESSAGE_SENDER_OFFSET + 32]
            .copy_from_slice(self.message_sender.as_slice());
        Bytes::from(bytes)
    }
}

/// Decodes a message header and body.
pub fn decode_message(bytes: &[u8]) -> Result<ParsedMessage> {
    ParsedMessage::decode(bytes)
}

/// Decodes a burn body.
pub fn decode_burn_body(bytes: &[u8]) -> Result<ParsedBurnBody> {
    ParsedBurnBody::decode(bytes)
}

/// keccak256 of the raw message bytes.
pub fn message_hash(message: &[u8]) -> FixedBytes<32> {
    keccak256(message)
}

fn ensure_len(bytes: &[u8], min: usize, what: &str) -> Result<()> {
    if bytes.len() < min {
        return Err(BridgeError::MalformedMessage {
            reason: format!("{what} needs at least {min} bytes, got {}", bytes.len()),
        });
    }
    Ok(())
}

// Callers check lengths first.
fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_be_bytes(buf)
}

fn read_u64(bytes: &[u8], offset: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[offset..offset + 8]);
    u64::from_be_bytes(buf)
}

fn read_bytes32(bytes: &[u8], offset: usize) -> FixedBytes<32> {
    FixedBytes::from_slice(&bytes[offset..offset + 32])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    /// Hand-assembled message: header with distinct byte patterns per field
    /// and a burn body with 8 trailing bytes of hook payload.
    fn golden_message() -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&[0x00, 0x00, 0x00, 0x01]); // version
        bytes.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]); // source domain 0
        bytes.extend_from_slice(&[0x00, 0x00, 0x00, 0x05]); // destination domain 5
        bytes.extend_from_slice(&[0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0xe2, 0x40]); // nonce 123456
        bytes.extend_from_slice(&[0x11; 32]); // sender
        bytes.extend_from_slice(&[0x22; 32]); // recipient
        bytes.extend_from_slice(&[0x00; 32]); // destination caller

        bytes.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]); // body version
        bytes.extend_from_slice(&[0x00; 8]); // reserved
        bytes.extend_from_slice(&[0x33; 32]); // burn token
        bytes.extend_from_slice(&[0x44; 32]); // mint recipient
        bytes.extend_from_slice(&[0x00, 0x00, 0x00, 0x00, 0x00, 0xa0, 0x37, 0xa0]); // 10_500_000
        bytes.extend_from_slice(&[0x55; 32]); // message sender
        bytes.extend_from_slice(&[0xde, 0xad, 0xbe, 0xef, 0xca, 0xfe, 0xba, 0xbe]);
        bytes
    }

    #[test]
    fn test_decode_golden_header() {
        let bytes = golden_message();
        assert_eq!(bytes.len(), MESSAGE_HEADER_SIZE + BURN_BODY_SIZE + 8);

        let message = decode_message(&bytes).unwrap();
        assert_eq!(message.version, 1);
        assert_eq!(message.source_domain, 0);
        assert_eq!(message.destination_domain, 5);
        assert_eq!(message.nonce, 123_456);
        assert_eq!(message.sender, FixedBytes::from([0x11; 32]));
        assert_eq!(message.recipient, FixedBytes::from([0x22; 32]));
        assert_eq!(message.destination_caller, FixedBytes::ZERO);
        assert_eq!(message.message_body.len(), BURN_BODY_SIZE + 8);
        assert_eq!(message.source_domain_id(), Some(DomainId::Ethereum));
        assert_eq!(message.destination_domain_id(), Some(DomainId::Solana));
    }

    #[test]
    fn test_decode_golden_burn_body() {
        let bytes = golden_message();
        let body = decode_burn_body(&bytes[MESSAGE_HEADER_SIZE..]).unwrap();

        assert_eq!(body.body_version, 0);
        assert_eq!(body.burn_token, FixedBytes::from([0x33; 32]));
        assert_eq!(body.mint_recipient, FixedBytes::from([0x44; 32]));
        assert_eq!(body.amount, 10_500_000);
        assert_eq!(body.message_sender, FixedBytes::from([0x55; 32]));
    }

    #[test]
    fn test_encode_matches_hand_built_layout() {
        let bytes = golden_message();
        let message = decode_message(&bytes).unwrap();
        assert_eq!(message.encode().as_ref(), bytes.as_slice());

        let body = message.burn_body().unwrap();
        assert_eq!(
            body.encode().as_ref(),
            &bytes[MESSAGE_HEADER_SIZE..MESSAGE_HEADER_SIZE + BURN_BODY_SIZE]
        );
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(50)]
    #[case(115)]
    fn test_short_message_is_malformed(#[case] len: usize) {
        let result = decode_message(&vec![0xab; len]);
        assert!(matches!(result, Err(BridgeError::MalformedMessage { .. })));
    }

    #[rstest]
    #[case(0)]
    #[case(84)]
    #[case(115)]
    fn test_short_burn_body_is_malformed(#[case] len: usize) {
        let result = decode_burn_body(&vec![0u8; len]);
        assert!(matches!(result, Err(BridgeError::MalformedMessage { .. })));
    }

    #[test]
    fn test_header_only_message_has_empty_body() {
        let message = decode_message(&[0u8; MESSAGE_HEADER_SIZE]).unwrap();
        assert!(message.message_body.is_empty());
        assert!(matches!(
            message.burn_body(),
            Err(BridgeError::MalformedMessage { .. })
        ));
    }

    #[test]
    fn test_unknown_domain_still_decodes() {
        let mut bytes = vec![0u8; MESSAGE_HEADER_SIZE];
        bytes[4..8].copy_from_slice(&999u32.to_be_bytes());
        let message = decode_message(&bytes).unwrap();
        assert_eq!(message.source_domain, 999);
        assert_eq!(message.source_domain_id(), None);
    }

    #[test]
    fn test_message_hash_is_keccak_of_raw_bytes() {
        assert_eq!(
            message_hash(&[]),
            alloy_primitives::b256!("c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470")
        );
    }
}
