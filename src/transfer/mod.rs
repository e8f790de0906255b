// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Transfer records, their lifecycle and reconciliation.

mod reconcile;
mod record;
mod status;
mod store;

pub use reconcile::{observed_status, reconcile_status, StateMachine, TransferStatusReport};
pub use record::{new_transfer_id, TransferFailure, TransferRecord, TransferStep};
pub use status::{can_complete, TransferStatus};
pub use store::InMemoryTransferStore;
