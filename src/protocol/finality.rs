// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Finality tiers a burn can request before it is attested.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::BridgeError;

/// Finality a burn must reach before the attestor signs it.
///
/// `Fast` attests at the confirmed block level and may carry a fee.
/// `Standard` waits for hard finality and is free.
///
/// ```rust
/// use cctp_engine::FinalityThreshold;
///
/// assert_eq!(FinalityThreshold::Fast.as_u32(), 1000);
/// assert_eq!("standard".parse::<FinalityThreshold>().unwrap(), FinalityThreshold::Standard);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u32)]
pub enum FinalityThreshold {
    Fast = 1000,
    #[default]
    Standard = 2000,
}

impl FinalityThreshold {
    #[inline]
    pub const fn as_u32(self) -> u32 {
        self as u32
    }

    #[inline]
    pub const fn from_u32(value: u32) -> Option<Self> {
        match value {
            1000 => Some(Self::Fast),
            2000 => Some(Self::Standard),
            _ => None,
        }
    }

    #[inline]
    pub const fn is_fast(self) -> bool {
        matches!(self, Self::Fast)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Standard => "standard",
        }
    }
}

impl From<FinalityThreshold> for u32 {
    fn from(threshold: FinalityThreshold) -> Self {
        threshold.as_u32()
    }
}

impl FromStr for FinalityThreshold {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fast" | "1000" => Ok(Self::Fast),
            "standard" | "2000" => Ok(Self::Standard),
            other => Err(BridgeError::InvalidRequest(format!(
                "unknown finality threshold: {other}"
            ))),
        }
    }
}

impl fmt::Display for FinalityThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.as_u32())
    }
}
