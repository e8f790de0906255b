// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Transfer lifecycle
//!
//! ```text
//! Created → Pending → Confirmed → Bridging → Completed
//!    └─────────┴──────────┴──────────┴──→ Failed
//! ```
//!
//! Forward jumps are allowed. Nothing leaves `Completed` or `Failed`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferStatus {
    /// Record exists, nothing submitted
    Created,
    /// Burn submitted, not yet confirmed
    Pending,
    /// Burn confirmed on the source chain
    Confirmed,
    /// Attestation available, mint not yet confirmed
    Bridging,
    Completed,
    Failed,
}

impl TransferStatus {
    pub const ALL: [TransferStatus; 6] = [
        Self::Created,
        Self::Pending,
        Self::Confirmed,
        Self::Bridging,
        Self::Completed,
        Self::Failed,
    ];

    fn rank(self) -> u8 {
        match self {
            Self::Created => 0,
            Self::Pending => 1,
            Self::Confirmed => 2,
            Self::Bridging => 3,
            Self::Completed => 4,
            Self::Failed => 5,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn can_transition_to(self, next: TransferStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        next == Self::Failed || next.rank() > self.rank()
    }

    /// Validated transition, returning the new status.
    pub fn transition(self, next: TransferStatus) -> Result<TransferStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(BridgeError::InvalidStatusTransition {
                from: self,
                to: next,
            })
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::Pending => "PENDING",
            Self::Confirmed => "CONFIRMED",
            Self::Bridging => "BRIDGING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A transfer can be completed once its burn is confirmed and attested.
pub fn can_complete(burn_confirmed: bool, attestation_complete: bool) -> bool {
    burn_confirmed && attestation_complete
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use TransferStatus::*;

    #[rstest]
    #[case(Created, Pending)]
    #[case(Pending, Confirmed)]
    #[case(Confirmed, Bridging)]
    #[case(Bridging, Completed)]
    #[case(Pending, Bridging)]
    #[case(Created, Failed)]
    #[case(Bridging, Failed)]
    fn test_allowed_transitions(#[case] from: TransferStatus, #[case] to: TransferStatus) {
        assert_eq!(from.transition(to).unwrap(), to);
    }

    #[rstest]
    #[case(Confirmed, Pending)]
    #[case(Bridging, Created)]
    #[case(Pending, Pending)]
    fn test_backward_and_self_transitions_rejected(
        #[case] from: TransferStatus,
        #[case] to: TransferStatus,
    ) {
        assert!(matches!(
            from.transition(to),
            Err(BridgeError::InvalidStatusTransition { .. })
        ));
    }

    #[test]
    fn test_terminal_states_are_final() {
        for terminal in [Completed, Failed] {
            for next in TransferStatus::ALL {
                let err = terminal.transition(next).unwrap_err();
                assert!(matches!(
                    err,
                    BridgeError::InvalidStatusTransition { from, to } if from == terminal && to == next
                ));
            }
        }
    }

    #[rstest]
    #[case(false, false, false)]
    #[case(true, false, false)]
    #[case(false, true, false)]
    #[case(true, true, true)]
    fn test_can_complete(
        #[case] burn_confirmed: bool,
        #[case] attestation_complete: bool,
        #[case] expected: bool,
    ) {
        assert_eq!(can_complete(burn_confirmed, attestation_complete), expected);
    }

    #[test]
    fn test_wire_names() {
        assert_eq!(serde_json::to_string(&Bridging).unwrap(), r#""BRIDGING""#);
        assert_eq!(Completed.to_string(), "COMPLETED");
    }
}
