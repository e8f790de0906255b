// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Engine configuration
//!
//! Every section has defaults suitable for mainnet and can be built with its
//! builder or loaded from `CCTP_ENGINE_*` environment variables (a `.env` file
//! is honoured).
//!
//! | Variable | Default |
//! |---|---|
//! | `CCTP_ENGINE_IRIS_URL` | `https://iris-api.circle.com` |
//! | `CCTP_ENGINE_ATTESTATION_TIMEOUT_SECS` | `10` |
//! | `CCTP_ENGINE_CONFIRMATION_TIMEOUT_SECS` | `120` |
//! | `CCTP_ENGINE_CONFIRMATION_POLL_MS` | `2000` |
//! | `CCTP_ENGINE_BURN_COMPUTE_UNITS` | `300000` |
//! | `CCTP_ENGINE_RECEIVE_COMPUTE_UNITS` | `400000` |
//! | `CCTP_ENGINE_COMPUTE_UNIT_PRICE` | `1000` |
//! | `CCTP_ENGINE_FEE_POLICY` | `zero` |
//! | `CCTP_ENGINE_DEFAULT_FINALITY` | `standard` |

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use bon::Builder;
use tracing::debug;

use crate::error::{BridgeError, Result};
use crate::protocol::FinalityThreshold;

/// Circle Iris API environment URLs
///
/// See <https://developers.circle.com/stablecoins/cctp-apis>
pub const IRIS_API: &str = "https://iris-api.circle.com";
pub const IRIS_API_SANDBOX: &str = "https://iris-api-sandbox.circle.com";

const ENV_PREFIX: &str = "CCTP_ENGINE_";

/// Attestation service access.
#[derive(Builder, Debug, Clone, PartialEq, Eq)]
pub struct AttestationConfig {
    #[builder(into, default = IRIS_API.to_string())]
    pub base_url: String,

    /// Upper bound on one request; a timeout is reported as pending
    #[builder(default = Duration::from_secs(10))]
    pub request_timeout: Duration,
}

impl Default for AttestationConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl AttestationConfig {
    pub fn sandbox() -> Self {
        Self::builder().base_url(IRIS_API_SANDBOX).build()
    }
}

/// How long to wait for submitted transactions.
#[derive(Builder, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationConfig {
    /// After this the transaction is reported unconfirmed, not failed
    #[builder(default = Duration::from_secs(120))]
    pub timeout: Duration,

    #[builder(default = Duration::from_secs(2))]
    pub poll_interval: Duration,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Compute budget attached to account-chain transactions.
#[derive(Builder, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComputeBudgetConfig {
    #[builder(default = 300_000)]
    pub burn_compute_units: u32,

    /// Completion mints through several CPIs and needs more
    #[builder(default = 400_000)]
    pub receive_compute_units: u32,

    #[builder(default = 1_000)]
    pub micro_lamports_per_unit: u64,
}

impl Default for ComputeBudgetConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Maximum fee offered for a fast burn.
///
/// Standard burns always offer zero. Text form: `zero`, `fixed:<units>`,
/// `bps:<basis points>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeePolicy {
    #[default]
    Zero,
    /// Flat amount in the smallest USDC unit
    Fixed(u64),
    /// Share of the amount, in basis points
    BasisPoints(u32),
}

impl FeePolicy {
    /// Fee for a burn of `amount` at `finality`; always below `amount`.
    pub fn max_fee(&self, amount: u64, finality: FinalityThreshold) -> Result<u64> {
        if !finality.is_fast() {
            return Ok(0);
        }

        let fee = match *self {
            Self::Zero => 0,
            Self::Fixed(fee) => fee,
            Self::BasisPoints(bps) => {
                if bps > 10_000 {
                    return Err(BridgeError::InvalidConfig(format!(
                        "fee of {bps} bps exceeds 100%"
                    )));
                }
                (amount as u128 * bps as u128 / 10_000) as u64
            }
        };

        if fee >= amount {
            return Err(BridgeError::InvalidRequest(format!(
                "max fee {fee} must be below amount {amount}"
            )));
        }
        Ok(fee)
    }
}

impl FromStr for FeePolicy {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let invalid = || BridgeError::InvalidConfig(format!("invalid fee policy: {s}"));

        match s.split_once(':') {
            None if s.eq_ignore_ascii_case("zero") => Ok(Self::Zero),
            Some(("fixed", value)) => value.parse().map(Self::Fixed).map_err(|_| invalid()),
            Some(("bps", value)) => value.parse().map(Self::BasisPoints).map_err(|_| invalid()),
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for FeePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Zero => f.write_str("zero"),
            Self::Fixed(fee) => write!(f, "fixed:{fee}"),
            Self::BasisPoints(bps) => write!(f, "bps:{bps}"),
        }
    }
}

/// All engine settings.
#[derive(Builder, Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineConfig {
    #[builder(default)]
    pub attestation: AttestationConfig,
    #[builder(default)]
    pub confirmation: ConfirmationConfig,
    #[builder(default)]
    pub compute_budget: ComputeBudgetConfig,
    #[builder(default)]
    pub fee_policy: FeePolicy,
    #[builder(default)]
    pub default_finality: FinalityThreshold,
}

impl EngineConfig {
    /// Loads `.env` if present, then reads `CCTP_ENGINE_*` variables.
    pub fn from_env() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!(path = %path.display(), event = "dotenv_loaded");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`, keyed by full variable name.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));
        let defaults = Self::default();

        let attestation = AttestationConfig {
            base_url: get("IRIS_URL").unwrap_or(defaults.attestation.base_url),
            request_timeout: parse_var(&get, "ATTESTATION_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.attestation.request_timeout),
        };

        let confirmation = ConfirmationConfig {
            timeout: parse_var(&get, "CONFIRMATION_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.confirmation.timeout),
            poll_interval: parse_var(&get, "CONFIRMATION_POLL_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.confirmation.poll_interval),
        };

        let compute_budget = ComputeBudgetConfig {
            burn_compute_units: parse_var(&get, "BURN_COMPUTE_UNITS")?
                .unwrap_or(defaults.compute_budget.burn_compute_units),
            receive_compute_units: parse_var(&get, "RECEIVE_COMPUTE_UNITS")?
                .unwrap_or(defaults.compute_budget.receive_compute_units),
            micro_lamports_per_unit: parse_var(&get, "COMPUTE_UNIT_PRICE")?
                .unwrap_or(defaults.compute_budget.micro_lamports_per_unit),
        };

        Ok(Self {
            attestation,
            confirmation,
            compute_budget,
            fee_policy: parse_var(&get, "FEE_POLICY")?.unwrap_or(defaults.fee_policy),
            default_finality: parse_var(&get, "DEFAULT_FINALITY")?
                .unwrap_or(defaults.default_finality),
        })
    }
}

fn parse_var<T: FromStr>(get: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<T>> {
    get(name)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|_| {
                BridgeError::InvalidConfig(format!("{ENV_PREFIX}{name} has invalid value {raw:?}"))
            })
        })
        .transpose()
}
