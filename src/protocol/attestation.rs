// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

use alloy_primitives::{hex::FromHex, Bytes};
use serde::{Deserialize, Deserializer, Serialize};

/// Response of the attestation service's messages endpoint
/// (`/v2/messages/{domain}?transactionHash={tx}`).
///
/// A single transaction may emit several messages, so the payload is a list.
///
/// ```json
/// {
///   "messages": [
///     { "status": "complete", "message": "0x...", "attestation": "0x..." }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct V2AttestationResponse {
    pub messages: Vec<V2Message>,
}

impl V2AttestationResponse {
    /// First message with a complete attestation, if any.
    pub fn first_complete(&self) -> Option<&V2Message> {
        self.messages.iter().find(|m| m.is_complete())
    }
}

/// One message entry of a [`V2AttestationResponse`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct V2Message {
    pub status: AttestationStatus,

    #[serde(default, deserialize_with = "deserialize_optional_bytes_or_pending")]
    pub message: Option<Bytes>,

    /// Null, or the literal string "PENDING", until the attestation is signed
    #[serde(default, deserialize_with = "deserialize_optional_bytes_or_pending")]
    pub attestation: Option<Bytes>,
}

impl V2Message {
    /// Complete status with both message and attestation present.
    pub fn is_complete(&self) -> bool {
        self.status == AttestationStatus::Complete
            && self.message.is_some()
            && self.attestation.is_some()
    }
}

/// The service sometimes sends `"PENDING"` where a hex string is expected.
///
/// - valid hex, with or without `0x` → `Some(bytes)`
/// - `"PENDING"` in any case, empty string, null, missing → `None`
/// - anything else → error
fn deserialize_optional_bytes_or_pending<'de, D>(deserializer: D) -> Result<Option<Bytes>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;

    match opt {
        None => Ok(None),
        Some(s) if s.is_empty() => Ok(None),
        Some(s) if s.eq_ignore_ascii_case("pending") => Ok(None),
        Some(s) => {
            let bytes = Bytes::from_hex(s).map_err(serde::de::Error::custom)?;
            Ok(Some(bytes))
        }
    }
}

/// Attestation status reported by the service.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AttestationStatus {
    Complete,
    Pending,
    PendingConfirmations,
    Failed,
}
