// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Hand-built instructions for the account chain's bridge programs
//!
//! Two programs are involved: the token-messenger-minter (burn and mint) and
//! the message transmitter (message state, nonces). Every account either
//! program reads is a PDA derived here from fixed seeds.

use super::instruction::{instruction_discriminator, AccountMeta, Instruction, GLOBAL_NAMESPACE};
use super::pda::derive_address;
use super::pubkey::{Pubkey, SYSTEM_PROGRAM_ID, TOKEN_PROGRAM_ID};
use crate::chain::AccountChainContracts;
use crate::error::{BridgeError, Result};
use crate::protocol::{BURN_BODY_SIZE, MESSAGE_HEADER_SIZE};

pub const DEPOSIT_FOR_BURN: &str = "deposit_for_burn";
pub const RECEIVE_MESSAGE: &str = "receive_message";

/// Nonces tracked per used-nonces account.
pub const MAX_NONCES: u64 = 6400;

/// Domains from this number on separate the used-nonces seeds with `-`.
const NONCE_DELIMITER_DOMAIN: u32 = 11;

/// discriminator + rent payer + vec length + header + burn body
pub const MESSAGE_SENT_EVENT_SPACE: u64 = (8 + 32 + 4 + MESSAGE_HEADER_SIZE + BURN_BODY_SIZE) as u64;

/// PDAs owned by the token-messenger-minter program for one mint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenMessengerAccounts {
    pub token_messenger: Pubkey,
    pub token_minter: Pubkey,
    pub local_token: Pubkey,
    pub custody: Pubkey,
    pub sender_authority: Pubkey,
    pub event_authority: Pubkey,
}

impl TokenMessengerAccounts {
    pub fn derive(program: &Pubkey, mint: &Pubkey) -> Result<Self> {
        Ok(Self {
            token_messenger: derive_address(&[b"token_messenger"], program)?,
            token_minter: derive_address(&[b"token_minter"], program)?,
            local_token: derive_address(&[b"local_token", mint.as_ref()], program)?,
            custody: derive_address(&[b"custody", mint.as_ref()], program)?,
            sender_authority: derive_address(&[b"sender_authority"], program)?,
            event_authority: derive_address(&[b"__event_authority"], program)?,
        })
    }
}

/// PDAs owned by the message-transmitter program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageTransmitterAccounts {
    pub message_transmitter: Pubkey,
    /// Authority the transmitter signs with when it calls `receiver`.
    pub authority: Pubkey,
    pub event_authority: Pubkey,
}

impl MessageTransmitterAccounts {
    pub fn derive(program: &Pubkey, receiver: &Pubkey) -> Result<Self> {
        Ok(Self {
            message_transmitter: derive_address(&[b"message_transmitter"], program)?,
            authority: derive_address(
                &[b"message_transmitter_authority", receiver.as_ref()],
                program,
            )?,
            event_authority: derive_address(&[b"__event_authority"], program)?,
        })
    }
}

/// Remote token messenger registered for `domain`.
pub fn remote_token_messenger(program: &Pubkey, domain: u32) -> Result<Pubkey> {
    let domain = domain.to_string();
    derive_address(&[b"remote_token_messenger", domain.as_bytes()], program)
}

/// Mapping from a remote burn token to the local mint.
pub fn token_pair(program: &Pubkey, domain: u32, remote_token: &[u8; 32]) -> Result<Pubkey> {
    let domain = domain.to_string();
    derive_address(&[b"token_pair", domain.as_bytes(), remote_token], program)
}

/// First nonce of the window `nonce` falls into.
pub fn first_nonce(nonce: u64) -> u64 {
    nonce.saturating_sub(1) / MAX_NONCES * MAX_NONCES + 1
}

/// Used-nonces account covering `nonce` from `source_domain`.
pub fn used_nonces(program: &Pubkey, source_domain: u32, nonce: u64) -> Result<Pubkey> {
    let domain = source_domain.to_string();
    let first = first_nonce(nonce).to_string();
    let delimiter: &[u8] = if source_domain < NONCE_DELIMITER_DOMAIN {
        b""
    } else {
        b"-"
    };
    derive_address(
        &[b"used_nonces", domain.as_bytes(), delimiter, first.as_bytes()],
        program,
    )
}

/// `discriminator ∥ amount u64 LE ∥ destination domain u32 LE ∥ mint recipient ∥ destination caller`
///
/// The destination caller is zero so anyone may complete the transfer.
pub fn encode_deposit_for_burn(
    amount: u64,
    destination_domain: u32,
    mint_recipient: &[u8; 32],
) -> Vec<u8> {
    let mut data = Vec::with_capacity(8 + 8 + 4 + 32 + 32);
    data.extend_from_slice(&instruction_discriminator(GLOBAL_NAMESPACE, DEPOSIT_FOR_BURN));
    data.extend_from_slice(&amount.to_le_bytes());
    data.extend_from_slice(&destination_domain.to_le_bytes());
    data.extend_from_slice(mint_recipient);
    data.extend_from_slice(&[0u8; 32]);
    data
}

/// `discriminator ∥ u32 LE len ∥ message ∥ u32 LE len ∥ attestation`
pub fn encode_receive_message(message: &[u8], attestation: &[u8]) -> Result<Vec<u8>> {
    let mut data = Vec::with_capacity(8 + 4 + message.len() + 4 + attestation.len());
    data.extend_from_slice(&instruction_discriminator(GLOBAL_NAMESPACE, RECEIVE_MESSAGE));
    for field in [message, attestation] {
        let len = u32::try_from(field.len()).map_err(|_| {
            BridgeError::TransactionBuild(format!("field of {} bytes is too long", field.len()))
        })?;
        data.extend_from_slice(&len.to_le_bytes());
        data.extend_from_slice(field);
    }
    Ok(data)
}

/// Inputs for a burn on the account chain.
#[derive(Debug, Clone)]
pub struct DepositForBurn {
    pub owner: Pubkey,
    pub event_rent_payer: Pubkey,
    pub burn_token_account: Pubkey,
    pub message_sent_event_data: Pubkey,
    pub amount: u64,
    pub destination_domain: u32,
    pub mint_recipient: [u8; 32],
}

impl DepositForBurn {
    pub fn instruction(&self, contracts: &AccountChainContracts) -> Result<Instruction> {
        let tmm = contracts.token_messenger_minter;
        let mt = contracts.message_transmitter;
        let pdas = TokenMessengerAccounts::derive(&tmm, &contracts.usdc_mint)?;
        let transmitter = MessageTransmitterAccounts::derive(&mt, &tmm)?;

        Ok(Instruction {
            program_id: tmm,
            accounts: vec![
                AccountMeta::readonly(self.owner, true),
                AccountMeta::writable(self.event_rent_payer, true),
                AccountMeta::readonly(pdas.sender_authority, false),
                AccountMeta::writable(self.burn_token_account, false),
                AccountMeta::writable(transmitter.message_transmitter, false),
                AccountMeta::readonly(pdas.token_messenger, false),
                AccountMeta::readonly(
                    remote_token_messenger(&tmm, self.destination_domain)?,
                    false,
                ),
                AccountMeta::readonly(pdas.token_minter, false),
                AccountMeta::writable(pdas.local_token, false),
                AccountMeta::writable(contracts.usdc_mint, false),
                AccountMeta::writable(self.message_sent_event_data, true),
                AccountMeta::readonly(mt, false),
                AccountMeta::readonly(tmm, false),
                AccountMeta::readonly(TOKEN_PROGRAM_ID, false),
                AccountMeta::readonly(SYSTEM_PROGRAM_ID, false),
                AccountMeta::readonly(pdas.event_authority, false),
                AccountMeta::readonly(tmm, false),
            ],
            data: encode_deposit_for_burn(
                self.amount,
                self.destination_domain,
                &self.mint_recipient,
            ),
        })
    }
}

/// Inputs for completing an inbound transfer on the account chain.
#[derive(Debug, Clone)]
pub struct ReceiveMessage<'a> {
    pub payer: Pubkey,
    pub user_token_account: Pubkey,
    pub source_domain: u32,
    pub nonce: u64,
    /// Burn token on the source chain, as carried in the burn body.
    pub remote_token: [u8; 32],
    pub message: &'a [u8],
    pub attestation: &'a [u8],
}

impl ReceiveMessage<'_> {
    pub fn instruction(&self, contracts: &AccountChainContracts) -> Result<Instruction> {
        let tmm = contracts.token_messenger_minter;
        let mt = contracts.message_transmitter;
        let pdas = TokenMessengerAccounts::derive(&tmm, &contracts.usdc_mint)?;
        let transmitter = MessageTransmitterAccounts::derive(&mt, &tmm)?;

        let mut accounts = vec![
            AccountMeta::writable(self.payer, true),
            AccountMeta::readonly(self.payer, true),
            AccountMeta::readonly(transmitter.authority, false),
            AccountMeta::readonly(transmitter.message_transmitter, false),
            AccountMeta::writable(used_nonces(&mt, self.source_domain, self.nonce)?, false),
            AccountMeta::readonly(tmm, false),
            AccountMeta::readonly(SYSTEM_PROGRAM_ID, false),
            AccountMeta::readonly(transmitter.event_authority, false),
            AccountMeta::readonly(mt, false),
        ];

        // Forwarded to the token-messenger-minter's handler.
        accounts.extend([
            AccountMeta::readonly(pdas.token_messenger, false),
            AccountMeta::readonly(remote_token_messenger(&tmm, self.source_domain)?, false),
            AccountMeta::writable(pdas.token_minter, false),
            AccountMeta::writable(pdas.local_token, false),
            AccountMeta::readonly(
                token_pair(&tmm, self.source_domain, &self.remote_token)?,
                false,
            ),
            AccountMeta::writable(self.user_token_account, false),
            AccountMeta::writable(pdas.custody, false),
            AccountMeta::readonly(TOKEN_PROGRAM_ID, false),
            AccountMeta::readonly(pdas.event_authority, false),
            AccountMeta::readonly(tmm, false),
        ]);

        Ok(Instruction {
            program_id: mt,
            accounts,
            data: encode_receive_message(self.message, self.attestation)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::addresses::{
        MESSAGE_TRANSMITTER_PROGRAM, SOLANA_USDC_MINT, TOKEN_MESSENGER_MINTER_PROGRAM,
    };
    use alloy_primitives::hex;
    use rstest::rstest;

    fn contracts() -> AccountChainContracts {
        AccountChainContracts {
            token_messenger_minter: TOKEN_MESSENGER_MINTER_PROGRAM,
            message_transmitter: MESSAGE_TRANSMITTER_PROGRAM,
            usdc_mint: SOLANA_USDC_MINT,
        }
    }

    #[test]
    fn test_deposit_for_burn_layout() {
        let recipient = [0xabu8; 32];
        let data = encode_deposit_for_burn(10_500_000, 0, &recipient);

        assert_eq!(data.len(), 84);
        assert_eq!(hex::encode(&data[..8]), "d73c3d2e723780b0");
        assert_eq!(&data[8..16], &10_500_000u64.to_le_bytes());
        assert_eq!(&data[16..20], &[0, 0, 0, 0]);
        assert_eq!(&data[20..52], &recipient);
        assert_eq!(&data[52..84], &[0u8; 32]);
    }

    #[test]
    fn test_receive_message_layout() {
        let data = encode_receive_message(&[1, 2, 3], &[9; 5]).unwrap();

        assert_eq!(hex::encode(&data[..8]), "26907fe11fe1ee19");
        assert_eq!(&data[8..12], &3u32.to_le_bytes());
        assert_eq!(&data[12..15], &[1, 2, 3]);
        assert_eq!(&data[15..19], &5u32.to_le_bytes());
        assert_eq!(&data[19..], &[9; 5]);
    }

    #[rstest]
    #[case(1, 1)]
    #[case(6400, 1)]
    #[case(6401, 6401)]
    #[case(12_801, 12_801)]
    #[case(20_000, 19_201)]
    #[case(0, 1)]
    fn test_first_nonce_window(#[case] nonce: u64, #[case] expected: u64) {
        assert_eq!(first_nonce(nonce), expected);
    }

    #[test]
    fn test_used_nonces_share_a_window() {
        let mt = MESSAGE_TRANSMITTER_PROGRAM;
        assert_eq!(
            used_nonces(&mt, 0, 1).unwrap(),
            used_nonces(&mt, 0, 6400).unwrap()
        );
        assert_ne!(
            used_nonces(&mt, 0, 6400).unwrap(),
            used_nonces(&mt, 0, 6401).unwrap()
        );
        assert_ne!(
            used_nonces(&mt, 0, 1).unwrap(),
            used_nonces(&mt, 6, 1).unwrap()
        );
    }

    #[test]
    fn test_token_pair_is_keyed_by_domain_and_token() {
        let tmm = TOKEN_MESSENGER_MINTER_PROGRAM;
        let token = [7u8; 32];
        assert_ne!(
            token_pair(&tmm, 0, &token).unwrap(),
            token_pair(&tmm, 3, &token).unwrap()
        );
        assert_ne!(
            token_pair(&tmm, 0, &token).unwrap(),
            token_pair(&tmm, 0, &[8u8; 32]).unwrap()
        );
    }

    #[test]
    fn test_deposit_for_burn_accounts() {
        let owner = Pubkey::new([1u8; 32]);
        let event = Pubkey::new([2u8; 32]);
        let burn = DepositForBurn {
            owner,
            event_rent_payer: owner,
            burn_token_account: Pubkey::new([3u8; 32]),
            message_sent_event_data: event,
            amount: 1_000_000,
            destination_domain: 6,
            mint_recipient: [4u8; 32],
        };
        let ix = burn.instruction(&contracts()).unwrap();
        let pdas = TokenMessengerAccounts::derive(&TOKEN_MESSENGER_MINTER_PROGRAM, &SOLANA_USDC_MINT)
            .unwrap();

        assert_eq!(ix.program_id, TOKEN_MESSENGER_MINTER_PROGRAM);
        assert_eq!(ix.accounts.len(), 17);
        assert_eq!(ix.accounts[2].pubkey, pdas.sender_authority);
        assert_eq!(
            ix.accounts[6].pubkey,
            remote_token_messenger(&TOKEN_MESSENGER_MINTER_PROGRAM, 6).unwrap()
        );
        assert_eq!(ix.accounts[8].pubkey, pdas.local_token);
        assert!(ix.accounts[10].is_signer && ix.accounts[10].is_writable);
        assert_eq!(ix.accounts[15].pubkey, pdas.event_authority);
    }

    #[test]
    fn test_receive_message_accounts() {
        let payer = Pubkey::new([1u8; 32]);
        let user = Pubkey::new([5u8; 32]);
        let receive = ReceiveMessage {
            payer,
            user_token_account: user,
            source_domain: 0,
            nonce: 42,
            remote_token: [7u8; 32],
            message: &[0u8; 232],
            attestation: &[1u8; 65],
        };
        let ix = receive.instruction(&contracts()).unwrap();

        assert_eq!(ix.program_id, MESSAGE_TRANSMITTER_PROGRAM);
        assert_eq!(ix.accounts.len(), 19);
        assert_eq!(
            ix.accounts[4].pubkey,
            used_nonces(&MESSAGE_TRANSMITTER_PROGRAM, 0, 42).unwrap()
        );
        assert_eq!(ix.accounts[5].pubkey, TOKEN_MESSENGER_MINTER_PROGRAM);
        assert_eq!(ix.accounts[14].pubkey, user);
        assert!(ix.accounts[14].is_writable);
        assert_eq!(ix.data.len(), 8 + 4 + 232 + 4 + 65);
    }
}
