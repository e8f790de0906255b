// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Legacy transaction wire format and multi-signer signing.
//!
//! ```text
//! Transaction:
//!   num_signatures          compact-u16
//!   signatures              64 bytes * num_signatures
//!   message:
//!     num_required_sigs     u8
//!     num_readonly_signed   u8
//!     num_readonly_unsigned u8
//!     num_accounts          compact-u16
//!     account_keys          32 bytes * num_accounts
//!     recent_blockhash      32 bytes
//!     num_instructions      compact-u16
//!     instructions[]
//!
//! Instruction:
//!   program_id_index        u8
//!   num_accounts            compact-u16
//!   account_indices         u8 * num_accounts
//!   data_len                compact-u16
//!   data                    u8 * data_len
//! ```

use ed25519_dalek::{Signer, SigningKey};
use rand::rngs::OsRng;

use super::instruction::Instruction;
use super::pubkey::Pubkey;
use crate::error::{BridgeError, Result};

/// Largest serialized transaction the network accepts.
pub const MAX_TRANSACTION_SIZE: usize = 1232;

/// An ed25519 signing key and its public key.
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Fresh random key pair.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Parses the 64-byte `secret ∥ public` form, base58 encoded, that
    /// wallet tooling exports.
    pub fn from_base58_string(encoded: &str) -> Result<Self> {
        let bytes = bs58::decode(encoded.trim())
            .into_vec()
            .map_err(|e| BridgeError::InvalidConfig(format!("invalid keypair encoding: {e}")))?;
        if bytes.len() != 64 {
            return Err(BridgeError::InvalidConfig(format!(
                "keypair must be 64 bytes, got {}",
                bytes.len()
            )));
        }

        let mut seed = [0u8; 32];
        seed.copy_from_slice(&bytes[..32]);
        let keypair = Self::from_seed(&seed);
        if keypair.pubkey().as_ref() != &bytes[32..] {
            return Err(BridgeError::InvalidConfig(
                "keypair public half does not match secret".to_string(),
            ));
        }
        Ok(keypair)
    }

    pub fn pubkey(&self) -> Pubkey {
        Pubkey::new(self.signing_key.verifying_key().to_bytes())
    }

    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }
}

impl std::fmt::Debug for Keypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keypair")
            .field("pubkey", &self.pubkey())
            .finish_non_exhaustive()
    }
}

pub fn encode_compact_u16(value: u16) -> Vec<u8> {
    let mut val = value as u32;
    let mut out = Vec::with_capacity(3);

    loop {
        let mut byte = (val & 0x7f) as u8;
        val >>= 7;
        if val > 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if val == 0 {
            break;
        }
    }

    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledInstruction {
    pub program_id_index: u8,
    pub account_indices: Vec<u8>,
    pub data: Vec<u8>,
}

/// A compiled message: deduplicated accounts in canonical order and
/// index-based instructions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub num_required_signatures: u8,
    pub num_readonly_signed: u8,
    pub num_readonly_unsigned: u8,
    pub account_keys: Vec<Pubkey>,
    pub recent_blockhash: [u8; 32],
    pub instructions: Vec<CompiledInstruction>,
}

impl Message {
    /// Compiles instructions with `fee_payer` at index 0.
    ///
    /// Accounts are ordered writable signers, readonly signers, writable
    /// non-signers, readonly non-signers, keeping first-seen order within
    /// each group.
    pub fn compile(
        instructions: &[Instruction],
        fee_payer: &Pubkey,
        recent_blockhash: [u8; 32],
    ) -> Result<Self> {
        struct Entry {
            pubkey: Pubkey,
            is_signer: bool,
            is_writable: bool,
        }

        let mut entries: Vec<Entry> = Vec::new();
        let mut upsert = |pubkey: Pubkey, signer: bool, writable: bool| {
            if let Some(entry) = entries.iter_mut().find(|e| e.pubkey == pubkey) {
                entry.is_signer |= signer;
                entry.is_writable |= writable;
            } else {
                entries.push(Entry {
                    pubkey,
                    is_signer: signer,
                    is_writable: writable,
                });
            }
        };

        upsert(*fee_payer, true, true);
        for ix in instructions {
            for meta in &ix.accounts {
                upsert(meta.pubkey, meta.is_signer, meta.is_writable);
            }
            upsert(ix.program_id, false, false);
        }

        // Stable sort; the fee payer is first in the first group.
        entries.sort_by_key(|e| match (e.is_signer, e.is_writable) {
            (true, true) => 0u8,
            (true, false) => 1,
            (false, true) => 2,
            (false, false) => 3,
        });

        if entries.len() > u8::MAX as usize {
            return Err(BridgeError::TransactionBuild(format!(
                "too many accounts: {}",
                entries.len()
            )));
        }

        let count = |f: fn(&Entry) -> bool| entries.iter().filter(|e| f(e)).count() as u8;
        let num_required_signatures = count(|e| e.is_signer);
        let num_readonly_signed = count(|e| e.is_signer && !e.is_writable);
        let num_readonly_unsigned = count(|e| !e.is_signer && !e.is_writable);

        let account_keys: Vec<Pubkey> = entries.iter().map(|e| e.pubkey).collect();
        let index_of = |key: &Pubkey| -> Result<u8> {
            account_keys
                .iter()
                .position(|k| k == key)
                .map(|i| i as u8)
                .ok_or_else(|| BridgeError::TransactionBuild(format!("account {key} not in keys")))
        };

        let mut compiled = Vec::with_capacity(instructions.len());
        for ix in instructions {
            let account_indices = ix
                .accounts
                .iter()
                .map(|meta| index_of(&meta.pubkey))
                .collect::<Result<Vec<u8>>>()?;
            compiled.push(CompiledInstruction {
                program_id_index: index_of(&ix.program_id)?,
                account_indices,
                data: ix.data.clone(),
            });
        }

        Ok(Self {
            num_required_signatures,
            num_readonly_signed,
            num_readonly_unsigned,
            account_keys,
            recent_blockhash,
            instructions: compiled,
        })
    }

    /// Bytes covered by the signatures.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(512);

        buf.push(self.num_required_signatures);
        buf.push(self.num_readonly_signed);
        buf.push(self.num_readonly_unsigned);

        buf.extend_from_slice(&encode_compact_u16(self.account_keys.len() as u16));
        for key in &self.account_keys {
            buf.extend_from_slice(key.as_ref());
        }

        buf.extend_from_slice(&self.recent_blockhash);

        buf.extend_from_slice(&encode_compact_u16(self.instructions.len() as u16));
        for ix in &self.instructions {
            buf.push(ix.program_id_index);
            buf.extend_from_slice(&encode_compact_u16(ix.account_indices.len() as u16));
            buf.extend_from_slice(&ix.account_indices);
            buf.extend_from_slice(&encode_compact_u16(ix.data.len() as u16));
            buf.extend_from_slice(&ix.data);
        }

        buf
    }

    /// Wire size of this message once signed.
    pub fn transaction_size(&self) -> usize {
        let signatures = self.num_required_signatures as usize;
        encode_compact_u16(signatures as u16).len() + signatures * 64 + self.serialize().len()
    }

    pub fn signer_keys(&self) -> &[Pubkey] {
        &self.account_keys[..self.num_required_signatures as usize]
    }
}

/// A fully signed transaction ready for submission.
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    pub signatures: Vec<[u8; 64]>,
    pub message: Message,
}

impl SignedTransaction {
    /// Signs `message` with every required signer.
    ///
    /// Each required signer must be present in `signers`; extra signers are
    /// an error.
    pub fn sign(message: Message, signers: &[&Keypair]) -> Result<Self> {
        let message_bytes = message.serialize();
        let mut signatures = Vec::with_capacity(message.num_required_signatures as usize);

        for required in message.signer_keys() {
            let keypair = signers
                .iter()
                .find(|k| k.pubkey() == *required)
                .ok_or_else(|| BridgeError::TransactionBuild(format!("missing signer {required}")))?;
            signatures.push(keypair.sign(&message_bytes));
        }

        if signers.len() > signatures.len() {
            return Err(BridgeError::TransactionBuild(
                "unexpected signer supplied".to_string(),
            ));
        }

        Ok(Self {
            signatures,
            message,
        })
    }

    /// Transaction id: the base58 first signature.
    pub fn signature(&self) -> String {
        self.signatures
            .first()
            .map(|s| bs58::encode(s).into_string())
            .unwrap_or_default()
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        let message_bytes = self.message.serialize();
        let mut wire = Vec::with_capacity(3 + self.signatures.len() * 64 + message_bytes.len());
        wire.extend_from_slice(&encode_compact_u16(self.signatures.len() as u16));
        for signature in &self.signatures {
            wire.extend_from_slice(signature);
        }
        wire.extend_from_slice(&message_bytes);

        if wire.len() > MAX_TRANSACTION_SIZE {
            return Err(BridgeError::TransactionBuild(format!(
                "transaction is {} bytes, limit is {MAX_TRANSACTION_SIZE}",
                wire.len()
            )));
        }
        Ok(wire)
    }
}
