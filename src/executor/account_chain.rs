// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Burns and mints on the account chain with hand-built instructions.

use std::collections::HashMap;
use std::sync::Arc;

use alloy_primitives::Bytes;
use async_trait::async_trait;
use tracing::{debug, info, warn, Instrument};

use super::{
    decode_inbound, BurnRequest, TransferExecutor, TransferSubmission, TxConfirmation,
    FINALIZED_CONFIRMATIONS,
};
use crate::account_chain::bridge_program::{DepositForBurn, ReceiveMessage, MESSAGE_SENT_EVENT_SPACE};
use crate::account_chain::{
    associated_token_address, create_account, create_associated_token_account_idempotent,
    set_compute_unit_limit, set_compute_unit_price, Instruction, Keypair, Message, Pubkey,
    SignedTransaction, TokenAccount, MAX_TRANSACTION_SIZE, TOKEN_PROGRAM_ID,
};
use crate::chain::{ChainConfig, ChainFamily};
use crate::config::{ComputeBudgetConfig, ConfirmationConfig};
use crate::error::{BridgeError, Result};
use crate::protocol::mint_recipient_bytes;
use crate::spans;
use crate::traits::AccountChainRpc;

/// [`TransferExecutor`] for the account chain.
///
/// `payer` owns the burned tokens, pays fees and rent, and signs every
/// transaction.
pub struct AccountChainTransferExecutor {
    rpcs: HashMap<String, Arc<dyn AccountChainRpc>>,
    payer: Arc<Keypair>,
    compute_budget: ComputeBudgetConfig,
    confirmation: ConfirmationConfig,
}

impl AccountChainTransferExecutor {
    pub fn new(
        payer: Keypair,
        compute_budget: ComputeBudgetConfig,
        confirmation: ConfirmationConfig,
    ) -> Self {
        Self {
            rpcs: HashMap::new(),
            payer: Arc::new(payer),
            compute_budget,
            confirmation,
        }
    }

    pub fn with_rpc(mut self, chain_id: impl Into<String>, rpc: Arc<dyn AccountChainRpc>) -> Self {
        self.rpcs.insert(chain_id.into(), rpc);
        self
    }

    pub fn payer(&self) -> Pubkey {
        self.payer.pubkey()
    }

    fn rpc(&self, chain: &ChainConfig) -> Result<&Arc<dyn AccountChainRpc>> {
        self.rpcs
            .get(chain.chain_id())
            .ok_or_else(|| BridgeError::UnsupportedChain {
                chain: format!("no account-chain RPC configured for {}", chain.chain_id()),
            })
    }

    async fn burn(&self, request: &BurnRequest<'_>) -> Result<TransferSubmission> {
        let source = request.source;
        let contracts = source.account_chain_contracts()?;
        let rpc = self.rpc(source)?;

        if request.hook_data.is_some() {
            return Err(BridgeError::InvalidRequest(
                "hook data is not supported for account-chain burns".to_string(),
            ));
        }
        if request.max_fee > 0 || request.finality_threshold.is_fast() {
            debug!(
                max_fee = request.max_fee,
                finality = %request.finality_threshold,
                event = "account_chain_burn_ignores_fee_and_finality"
            );
        }

        let mint_recipient =
            mint_recipient_bytes(request.destination.family(), request.destination_address)?;
        let owner = self.payer.pubkey();
        let burn_token_account = associated_token_address(&owner, &contracts.usdc_mint)?;

        let account = rpc
            .get_account_info(&burn_token_account)
            .await?
            .ok_or_else(|| BridgeError::TokenAccountMissing {
                account: burn_token_account.to_string(),
            })?;
        let token_account = TokenAccount::unpack(&account.data)?;
        if token_account.amount < request.amount {
            return Err(BridgeError::InsufficientBalance {
                required: request.amount,
                available: token_account.amount,
            });
        }

        let event_account = Keypair::generate();
        let rent = rpc
            .get_minimum_balance_for_rent_exemption(MESSAGE_SENT_EVENT_SPACE)
            .await?;

        let burn = DepositForBurn {
            owner,
            event_rent_payer: owner,
            burn_token_account,
            message_sent_event_data: event_account.pubkey(),
            amount: request.amount,
            destination_domain: request.destination.domain().as_u32(),
            mint_recipient: mint_recipient.0,
        };
        let instructions = vec![
            set_compute_unit_limit(self.compute_budget.burn_compute_units),
            set_compute_unit_price(self.compute_budget.micro_lamports_per_unit),
            create_account(
                &owner,
                &event_account.pubkey(),
                rent,
                MESSAGE_SENT_EVENT_SPACE,
                &contracts.message_transmitter,
            ),
            burn.instruction(contracts)?,
        ];

        let blockhash = rpc.get_latest_blockhash().await?;
        let tx = build_transaction(
            "deposit_for_burn",
            source.chain_id(),
            &instructions,
            &owner,
            blockhash,
            &[self.payer.as_ref(), &event_account],
        )?;

        self.submit(rpc.as_ref(), source, &tx, "burn").await
    }

    async fn receive(
        &self,
        message: &Bytes,
        attestation: &Bytes,
        destination: &ChainConfig,
    ) -> Result<TransferSubmission> {
        let contracts = destination.account_chain_contracts()?;
        let rpc = self.rpc(destination)?;

        let parsed = decode_inbound(message, destination)?;
        let body = parsed.burn_body()?;
        let payer = self.payer.pubkey();
        let recipient = Pubkey::from(body.mint_recipient);

        let create_recipient = match rpc.get_account_info(&recipient).await? {
            Some(account) if account.owner == TOKEN_PROGRAM_ID => None,
            _ => {
                let ata = associated_token_address(&recipient, &contracts.usdc_mint)?;
                info!(
                    wallet = %recipient,
                    token_account = %ata,
                    event = "creating_recipient_token_account"
                );
                Some((
                    ata,
                    create_associated_token_account_idempotent(
                        &payer,
                        &ata,
                        &recipient,
                        &contracts.usdc_mint,
                    ),
                ))
            }
        };
        let user_token_account = create_recipient.as_ref().map_or(recipient, |(ata, _)| *ata);

        let receive = ReceiveMessage {
            payer,
            user_token_account,
            source_domain: parsed.source_domain,
            nonce: parsed.nonce,
            remote_token: body.burn_token.0,
            message,
            attestation,
        };
        let receive_instruction = receive.instruction(contracts)?;
        let blockhash = rpc.get_latest_blockhash().await?;

        let mut instructions = vec![
            set_compute_unit_limit(self.compute_budget.receive_compute_units),
            set_compute_unit_price(self.compute_budget.micro_lamports_per_unit),
        ];
        if let Some((_, create)) = create_recipient {
            let mut combined = instructions.clone();
            combined.extend([create.clone(), receive_instruction.clone()]);
            let size = Message::compile(&combined, &payer, blockhash)?.transaction_size();
            if size > MAX_TRANSACTION_SIZE {
                info!(size_bytes = size, event = "recipient_token_account_created_separately");
                self.create_recipient_account(rpc.as_ref(), destination, create, blockhash)
                    .await?;
            } else {
                instructions.push(create);
            }
        }
        instructions.push(receive_instruction);

        let tx = build_transaction(
            "receive_message",
            destination.chain_id(),
            &instructions,
            &payer,
            blockhash,
            &[self.payer.as_ref()],
        )?;

        self.submit(rpc.as_ref(), destination, &tx, "mint").await
    }

    /// Creates the recipient token account ahead of a receive that cannot
    /// carry the creation itself.
    async fn create_recipient_account(
        &self,
        rpc: &dyn AccountChainRpc,
        destination: &ChainConfig,
        create: Instruction,
        blockhash: [u8; 32],
    ) -> Result<()> {
        let payer = self.payer.pubkey();
        let tx = build_transaction(
            "create_recipient_token_account",
            destination.chain_id(),
            &[
                set_compute_unit_price(self.compute_budget.micro_lamports_per_unit),
                create,
            ],
            &payer,
            blockhash,
            &[self.payer.as_ref()],
        )?;

        let submission = self.submit(rpc, destination, &tx, "token_account").await?;
        if !submission.confirmed {
            return Err(BridgeError::TransferExecutionFailed {
                reason: format!(
                    "recipient token account creation {} not confirmed",
                    submission.tx_hash
                ),
            });
        }
        Ok(())
    }

    async fn submit(
        &self,
        rpc: &dyn AccountChainRpc,
        chain: &ChainConfig,
        tx: &SignedTransaction,
        kind: &'static str,
    ) -> Result<TransferSubmission> {
        let signature = tx.signature();
        let span = spans::wait_for_confirmation(&signature, chain.chain_id(), 1);

        let confirmed = rpc
            .send_and_confirm_transaction(tx, self.confirmation.timeout)
            .instrument(span)
            .await
            .map_err(|e| match e {
                BridgeError::TransferExecutionFailed { .. } => e,
                other => BridgeError::TransferExecutionFailed {
                    reason: format!("{kind} submission failed: {other}"),
                },
            })?;

        if confirmed {
            info!(signature = %signature, kind, event = "transaction_confirmed");
        } else {
            warn!(signature = %signature, kind, event = "confirmation_timed_out");
        }

        Ok(TransferSubmission {
            tx_hash: signature,
            confirmed,
        })
    }
}

/// Compiles and signs `instructions` with `fee_payer` paying.
fn build_transaction(
    kind: &'static str,
    chain: &str,
    instructions: &[Instruction],
    fee_payer: &Pubkey,
    blockhash: [u8; 32],
    signers: &[&Keypair],
) -> Result<SignedTransaction> {
    let span = spans::build_account_chain_transaction(kind, chain);
    let _guard = span.enter();

    let message = Message::compile(instructions, fee_payer, blockhash)?;
    let tx = SignedTransaction::sign(message, signers)?;
    let size = tx.serialize()?.len();

    span.record("instruction_count", instructions.len());
    span.record("size_bytes", size);
    debug!(signature = %tx.signature(), size_bytes = size, event = "transaction_built");
    Ok(tx)
}

#[async_trait]
impl TransferExecutor for AccountChainTransferExecutor {
    fn family(&self) -> ChainFamily {
        ChainFamily::AccountChain
    }

    fn signer_address(&self, _chain: &ChainConfig) -> Result<String> {
        Ok(self.payer.pubkey().to_string())
    }

    async fn execute_transfer(&self, request: &BurnRequest<'_>) -> Result<TransferSubmission> {
        let span = spans::execute_transfer(
            ChainFamily::AccountChain,
            request.source.chain_id(),
            request.destination.domain().as_u32(),
            request.amount,
        );

        async {
            let result = self.burn(request).await;
            if let Err(e) = &result {
                spans::record_error(e);
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn complete_transfer(
        &self,
        message: &Bytes,
        attestation: &Bytes,
        destination: &ChainConfig,
    ) -> Result<TransferSubmission> {
        self.receive(message, attestation, destination).await
    }

    async fn transaction_status(&self, chain: &ChainConfig, tx_ref: &str) -> Result<TxConfirmation> {
        let Some(status) = self.rpc(chain)?.get_signature_status(tx_ref).await? else {
            return Ok(TxConfirmation::not_found());
        };

        let failed = status.err.is_some();
        Ok(TxConfirmation {
            found: true,
            confirmed: status.is_confirmed(),
            confirmations: status.confirmations.unwrap_or(FINALIZED_CONFIRMATIONS),
            failed,
        })
    }
}

impl std::fmt::Debug for AccountChainTransferExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountChainTransferExecutor")
            .field("chains", &self.rpcs.keys().collect::<Vec<_>>())
            .field("payer", &self.payer.pubkey())
            .field("compute_budget", &self.compute_budget)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account_chain::bridge_program::{DEPOSIT_FOR_BURN, RECEIVE_MESSAGE};
    use crate::account_chain::{
        instruction_discriminator, ASSOCIATED_TOKEN_PROGRAM_ID, COMPUTE_BUDGET_PROGRAM_ID,
        GLOBAL_NAMESPACE, SYSTEM_PROGRAM_ID,
    };
    use crate::chain::{solana_mainnet, EvmChainPreset};
    use crate::protocol::{ParsedBurnBody, ParsedMessage};
    use crate::testing::{token_account_data, FakeAccountChainRpc};
    use crate::traits::AccountInfo;
    use alloy_chains::NamedChain;
    use alloy_primitives::FixedBytes;
    use url::Url;

    fn executor(rpc: Arc<FakeAccountChainRpc>) -> AccountChainTransferExecutor {
        AccountChainTransferExecutor::new(
            Keypair::from_seed(&[1u8; 32]),
            ComputeBudgetConfig::default(),
            ConfirmationConfig::default(),
        )
        .with_rpc("solana", rpc)
    }

    fn solana() -> ChainConfig {
        solana_mainnet(Url::parse("http://localhost:8899").unwrap())
    }

    fn base() -> ChainConfig {
        NamedChain::Base
            .chain_config("base", Url::parse("http://localhost:8545").unwrap())
            .unwrap()
    }

    fn burn_request<'a>(source: &'a ChainConfig, destination: &'a ChainConfig) -> BurnRequest<'a> {
        BurnRequest {
            source,
            destination,
            amount: 5_000_000,
            destination_address: "0x742d35Cc6634C0532925a3b844Bc9e7595f8fA0d",
            finality_threshold: Default::default(),
            max_fee: 0,
            hook_data: None,
        }
    }

    fn fund(rpc: &FakeAccountChainRpc, executor: &AccountChainTransferExecutor, amount: u64) {
        let contracts = *solana().account_chain_contracts().unwrap();
        let ata = associated_token_address(&executor.payer(), &contracts.usdc_mint).unwrap();
        rpc.set_account(
            ata,
            AccountInfo {
                lamports: 2_039_280,
                owner: TOKEN_PROGRAM_ID,
                data: token_account_data(&contracts.usdc_mint, &executor.payer(), amount),
            },
        );
    }

    #[tokio::test]
    async fn test_burn_transaction_layout() {
        let rpc = Arc::new(FakeAccountChainRpc::new());
        let executor = executor(rpc.clone());
        fund(&rpc, &executor, 10_000_000);
        let (source, destination) = (solana(), base());

        let submission = executor
            .execute_transfer(&burn_request(&source, &destination))
            .await
            .unwrap();
        assert!(submission.confirmed);

        let sent = rpc.submitted();
        assert_eq!(sent.len(), 1);
        let tx = &sent[0];
        assert_eq!(tx.signatures.len(), 2);
        assert_eq!(tx.signature(), submission.tx_hash);
        assert!(tx.serialize().unwrap().len() <= crate::account_chain::MAX_TRANSACTION_SIZE);

        let keys = &tx.message.account_keys;
        let programs: Vec<Pubkey> = tx
            .message
            .instructions
            .iter()
            .map(|ix| keys[ix.program_id_index as usize])
            .collect();
        let contracts = source.account_chain_contracts().unwrap();
        assert_eq!(
            programs,
            vec![
                COMPUTE_BUDGET_PROGRAM_ID,
                COMPUTE_BUDGET_PROGRAM_ID,
                SYSTEM_PROGRAM_ID,
                contracts.token_messenger_minter,
            ]
        );

        let burn_data = &tx.message.instructions[3].data;
        assert_eq!(
            &burn_data[..8],
            &instruction_discriminator(GLOBAL_NAMESPACE, DEPOSIT_FOR_BURN)
        );
        assert_eq!(&burn_data[8..16], &5_000_000u64.to_le_bytes());
        assert_eq!(&burn_data[16..20], &6u32.to_le_bytes());
        assert_eq!(&burn_data[20..32], &[0u8; 12]);
    }

    #[tokio::test]
    async fn test_missing_token_account() {
        let rpc = Arc::new(FakeAccountChainRpc::new());
        let executor = executor(rpc.clone());
        let (source, destination) = (solana(), base());

        let err = executor
            .execute_transfer(&burn_request(&source, &destination))
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::TokenAccountMissing { .. }));
        assert!(rpc.submitted().is_empty());
    }

    #[tokio::test]
    async fn test_insufficient_token_balance() {
        let rpc = Arc::new(FakeAccountChainRpc::new());
        let executor = executor(rpc.clone());
        fund(&rpc, &executor, 1_000);
        let (source, destination) = (solana(), base());

        let err = executor
            .execute_transfer(&burn_request(&source, &destination))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BridgeError::InsufficientBalance { required: 5_000_000, available: 1_000 }
        ));
        assert!(rpc.submitted().is_empty());
    }

    #[tokio::test]
    async fn test_hook_data_rejected() {
        let rpc = Arc::new(FakeAccountChainRpc::new());
        let executor = executor(rpc.clone());
        let (source, destination) = (solana(), base());
        let hook = Bytes::from(vec![1, 2, 3]);

        let mut request = burn_request(&source, &destination);
        request.hook_data = Some(&hook);
        assert!(matches!(
            executor.execute_transfer(&request).await,
            Err(BridgeError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_submission_is_execution_failure() {
        let rpc = Arc::new(FakeAccountChainRpc::new().failing("custom program error: 0x1"));
        let executor = executor(rpc.clone());
        fund(&rpc, &executor, 10_000_000);
        let (source, destination) = (solana(), base());

        assert!(matches!(
            executor.execute_transfer(&burn_request(&source, &destination)).await,
            Err(BridgeError::TransferExecutionFailed { .. })
        ));
    }

    fn inbound_message(recipient: Pubkey) -> Bytes {
        let body = ParsedBurnBody {
            body_version: 1,
            burn_token: FixedBytes::left_padding_from(&[0xa0; 20]),
            mint_recipient: FixedBytes::from(recipient.to_bytes()),
            amount: 5_000_000,
            message_sender: FixedBytes::left_padding_from(&[0x74; 20]),
        };
        ParsedMessage {
            version: 1,
            source_domain: 6,
            destination_domain: 5,
            nonce: 12_345,
            sender: FixedBytes::repeat_byte(1),
            recipient: FixedBytes::repeat_byte(2),
            destination_caller: FixedBytes::ZERO,
            message_body: body.encode(),
        }
        .encode()
    }

    #[tokio::test]
    async fn test_receive_creates_missing_recipient_account() {
        let rpc = Arc::new(FakeAccountChainRpc::new());
        let executor = executor(rpc.clone());
        let wallet = Keypair::from_seed(&[2u8; 32]).pubkey();
        let message = inbound_message(wallet);
        let attestation = Bytes::from(vec![9u8; 65]);

        let submission = executor
            .complete_transfer(&message, &attestation, &solana())
            .await
            .unwrap();
        assert!(submission.confirmed);

        let tx = &rpc.submitted()[0];
        assert_eq!(tx.signatures.len(), 1);
        assert_eq!(tx.message.instructions.len(), 4);

        let keys = &tx.message.account_keys;
        let create = &tx.message.instructions[2];
        assert_eq!(keys[create.program_id_index as usize], ASSOCIATED_TOKEN_PROGRAM_ID);

        let receive = &tx.message.instructions[3];
        assert_eq!(
            &receive.data[..8],
            &instruction_discriminator(GLOBAL_NAMESPACE, RECEIVE_MESSAGE)
        );
        assert_eq!(&receive.data[8..12], &(message.len() as u32).to_le_bytes());
    }

    #[tokio::test]
    async fn test_oversized_receive_creates_token_account_first() {
        let rpc = Arc::new(FakeAccountChainRpc::new());
        let executor = executor(rpc.clone());
        let wallet = Keypair::from_seed(&[2u8; 32]).pubkey();
        let message = inbound_message(wallet);
        // three signatures
        let attestation = Bytes::from(vec![9u8; 195]);

        let submission = executor
            .complete_transfer(&message, &attestation, &solana())
            .await
            .unwrap();

        let sent = rpc.submitted();
        assert_eq!(sent.len(), 2);

        let setup = &sent[0];
        let create = setup.message.instructions.last().unwrap();
        assert_eq!(
            setup.message.account_keys[create.program_id_index as usize],
            ASSOCIATED_TOKEN_PROGRAM_ID
        );

        let receive_tx = &sent[1];
        assert_eq!(receive_tx.signature(), submission.tx_hash);
        assert_eq!(receive_tx.message.instructions.len(), 3);
        assert_eq!(
            &receive_tx.message.instructions[2].data[..8],
            &instruction_discriminator(GLOBAL_NAMESPACE, RECEIVE_MESSAGE)
        );
        for tx in &sent {
            assert!(tx.serialize().unwrap().len() <= MAX_TRANSACTION_SIZE);
        }
    }

    #[tokio::test]
    async fn test_receive_rejects_message_for_another_domain() {
        let rpc = Arc::new(FakeAccountChainRpc::new());
        let executor = executor(rpc.clone());
        let message = crate::testing::burn_message(0, 6, FixedBytes::repeat_byte(3), 1_000_000);

        assert!(matches!(
            executor
                .complete_transfer(&message, &Bytes::from(vec![9u8; 65]), &solana())
                .await,
            Err(BridgeError::InvalidRequest(_))
        ));
        assert!(rpc.submitted().is_empty());
    }

    #[tokio::test]
    async fn test_receive_into_existing_token_account() {
        let rpc = Arc::new(FakeAccountChainRpc::new());
        let executor = executor(rpc.clone());
        let token_account = Keypair::from_seed(&[3u8; 32]).pubkey();
        rpc.set_account(
            token_account,
            AccountInfo {
                lamports: 2_039_280,
                owner: TOKEN_PROGRAM_ID,
                data: vec![0u8; crate::account_chain::TOKEN_ACCOUNT_LEN],
            },
        );

        executor
            .complete_transfer(&inbound_message(token_account), &Bytes::from(vec![9u8; 65]), &solana())
            .await
            .unwrap();

        assert_eq!(rpc.submitted()[0].message.instructions.len(), 3);
    }

    #[tokio::test]
    async fn test_receive_rejects_truncated_message() {
        let rpc = Arc::new(FakeAccountChainRpc::new());
        let executor = executor(rpc.clone());

        assert!(matches!(
            executor
                .complete_transfer(&Bytes::from(vec![0u8; 50]), &Bytes::new(), &solana())
                .await,
            Err(BridgeError::MalformedMessage { .. })
        ));
        assert!(rpc.submitted().is_empty());
    }
}
