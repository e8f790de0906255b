// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Account-chain primitives built without an SDK
//!
//! Addresses, PDAs, instructions, the legacy transaction wire format and the
//! bridge programs' instruction layouts.

pub mod bridge_program;
mod instruction;
mod pda;
mod pubkey;
mod token_account;
mod transaction;

pub use instruction::{
    create_account, create_associated_token_account_idempotent, instruction_discriminator,
    set_compute_unit_limit, set_compute_unit_price, AccountMeta, Instruction, GLOBAL_NAMESPACE,
};
pub use pda::{associated_token_address, derive_address, find_program_address};
pub use pubkey::{
    Pubkey, ASSOCIATED_TOKEN_PROGRAM_ID, COMPUTE_BUDGET_PROGRAM_ID, SYSTEM_PROGRAM_ID,
    TOKEN_PROGRAM_ID,
};
pub use token_account::{TokenAccount, TOKEN_ACCOUNT_LEN};
pub use transaction::{
    encode_compact_u16, Keypair, Message, SignedTransaction, MAX_TRANSACTION_SIZE,
};
