// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Burns and mints on EVM chains through TokenMessengerV2 and
//! MessageTransmitterV2.

use std::collections::HashMap;
use std::sync::Arc;

use alloy_primitives::{Bytes, TxHash, U256};
use async_trait::async_trait;
use tracing::{debug, info, warn, Instrument};

use super::{
    confirmations_at, decode_inbound, BurnRequest, TransferExecutor, TransferSubmission,
    TxConfirmation,
};
use crate::chain::{ChainConfig, ChainFamily};
use crate::config::ConfirmationConfig;
use crate::contracts::{
    approve_transaction, DepositForBurnParams, MessageTransmitterV2Contract,
    TokenMessengerV2Contract,
};
use crate::error::{BridgeError, Result};
use crate::protocol::mint_recipient_bytes;
use crate::spans;
use crate::traits::{EvmChainClient, EvmReceipt};

/// [`TransferExecutor`] for EVM chains, with one signing client per chain.
#[derive(Clone, Default)]
pub struct EvmTransferExecutor {
    clients: HashMap<String, Arc<dyn EvmChainClient>>,
    confirmation: ConfirmationConfig,
}

impl EvmTransferExecutor {
    pub fn new(confirmation: ConfirmationConfig) -> Self {
        Self {
            clients: HashMap::new(),
            confirmation,
        }
    }

    /// Registers the client used for `chain_id`.
    pub fn with_client(mut self, chain_id: impl Into<String>, client: Arc<dyn EvmChainClient>) -> Self {
        self.clients.insert(chain_id.into(), client);
        self
    }

    fn client(&self, chain: &ChainConfig) -> Result<&Arc<dyn EvmChainClient>> {
        self.clients
            .get(chain.chain_id())
            .ok_or_else(|| BridgeError::UnsupportedChain {
                chain: format!("no EVM client configured for {}", chain.chain_id()),
            })
    }

    async fn burn(&self, request: &BurnRequest<'_>) -> Result<TransferSubmission> {
        let source = request.source;
        let contracts = source.evm_contracts()?;
        let client = self.client(source)?;
        let owner = client.sender();

        let mint_recipient =
            mint_recipient_bytes(request.destination.family(), request.destination_address)?;
        let amount = U256::from(request.amount);

        let (balance, allowance) = tokio::join!(
            client.balance_of(contracts.usdc, owner),
            client.allowance(contracts.usdc, owner, contracts.token_messenger),
        );
        let (balance, allowance) = (balance?, allowance?);

        if balance < amount {
            return Err(BridgeError::InsufficientBalance {
                required: request.amount,
                available: balance.saturating_to::<u64>(),
            });
        }

        if allowance < amount {
            self.approve(client.as_ref(), source, amount).await?;
        }

        let params = DepositForBurnParams::builder()
            .amount(amount)
            .destination_domain(request.destination.domain().as_u32())
            .mint_recipient(mint_recipient)
            .burn_token(contracts.usdc)
            .max_fee(U256::from(request.max_fee))
            .min_finality_threshold(source.finality_threshold(request.finality_threshold))
            .maybe_hook_data(request.hook_data.cloned())
            .build();
        let tx = TokenMessengerV2Contract::new(contracts.token_messenger)
            .deposit_for_burn_transaction(owner, &params);

        let tx_hash = client
            .send_transaction(tx)
            .await
            .map_err(|e| BridgeError::TransferExecutionFailed {
                reason: format!("burn submission failed: {e}"),
            })?;

        info!(
            tx_hash = %tx_hash,
            source_chain = source.chain_id(),
            destination_domain = request.destination.domain().as_u32(),
            has_hooks = request.hook_data.is_some(),
            event = "burn_transaction_sent"
        );

        let confirmed = self.wait_for_confirmation(client.as_ref(), source, tx_hash, "burn").await?;
        Ok(TransferSubmission {
            tx_hash: tx_hash.to_string(),
            confirmed,
        })
    }

    /// Approves exactly `amount` for the token messenger and waits for it.
    async fn approve(&self, client: &dyn EvmChainClient, source: &ChainConfig, amount: U256) -> Result<()> {
        let contracts = source.evm_contracts()?;
        let tx = approve_transaction(contracts.usdc, client.sender(), contracts.token_messenger, amount);

        let tx_hash = client
            .send_transaction(tx)
            .await
            .map_err(|e| BridgeError::TransferExecutionFailed {
                reason: format!("approval submission failed: {e}"),
            })?;

        match client.wait_for_receipt(tx_hash, self.confirmation.timeout).await {
            Ok(Some(receipt)) if receipt.success => {
                info!(tx_hash = %tx_hash, event = "approval_confirmed");
                Ok(())
            }
            Ok(Some(_)) => Err(BridgeError::TransferExecutionFailed {
                reason: format!("approval {tx_hash} reverted"),
            }),
            Ok(None) => Err(BridgeError::TransferExecutionFailed {
                reason: format!(
                    "approval {tx_hash} not confirmed within {}s",
                    self.confirmation.timeout.as_secs()
                ),
            }),
            Err(e) => Err(BridgeError::TransferExecutionFailed {
                reason: format!("approval {tx_hash} could not be confirmed: {e}"),
            }),
        }
    }

    /// Waits for `tx_hash`; a revert is an error, a timeout is `false`.
    async fn wait_for_confirmation(
        &self,
        client: &dyn EvmChainClient,
        chain: &ChainConfig,
        tx_hash: TxHash,
        kind: &'static str,
    ) -> Result<bool> {
        let span = spans::wait_for_confirmation(
            &tx_hash.to_string(),
            chain.chain_id(),
            chain.required_confirmations(),
        );

        async {
            let receipt = match client.wait_for_receipt(tx_hash, self.confirmation.timeout).await {
                Ok(Some(receipt)) => receipt,
                Ok(None) => {
                    warn!(tx_hash = %tx_hash, kind, event = "confirmation_timed_out");
                    return Ok(false);
                }
                Err(e) => {
                    warn!(tx_hash = %tx_hash, kind, error = %e, event = "confirmation_wait_failed");
                    return Ok(false);
                }
            };

            if !receipt.success {
                return Err(BridgeError::TransferExecutionFailed {
                    reason: format!("{kind} transaction {tx_hash} reverted"),
                });
            }

            let confirmations = self.confirmations(client, &receipt).await;
            debug!(
                tx_hash = %tx_hash,
                confirmations,
                required = chain.required_confirmations(),
                event = "transaction_mined"
            );
            Ok(confirmations >= chain.required_confirmations())
        }
        .instrument(span)
        .await
    }

    async fn confirmations(&self, client: &dyn EvmChainClient, receipt: &EvmReceipt) -> u64 {
        let Some(block) = receipt.block_number else {
            return 0;
        };
        match client.get_block_number().await {
            Ok(head) => confirmations_at(head, block),
            Err(e) => {
                warn!(error = %e, event = "block_number_unavailable");
                0
            }
        }
    }
}

#[async_trait]
impl TransferExecutor for EvmTransferExecutor {
    fn family(&self) -> ChainFamily {
        ChainFamily::Evm
    }

    fn signer_address(&self, chain: &ChainConfig) -> Result<String> {
        Ok(self.client(chain)?.sender().to_string())
    }

    async fn execute_transfer(&self, request: &BurnRequest<'_>) -> Result<TransferSubmission> {
        let span = spans::execute_transfer(
            ChainFamily::Evm,
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
        let contracts = destination.evm_contracts()?;
        let client = self.client(destination)?;
        let parsed = decode_inbound(message, destination)?;
        debug!(
            source_domain = parsed.source_domain,
            nonce = parsed.nonce,
            event = "inbound_message_decoded"
        );

        let tx = MessageTransmitterV2Contract::new(contracts.message_transmitter)
            .receive_message_transaction(client.sender(), message.clone(), attestation.clone());

        let tx_hash = client
            .send_transaction(tx)
            .await
            .map_err(|e| BridgeError::TransferExecutionFailed {
                reason: format!("mint submission failed: {e}"),
            })?;
        info!(
            tx_hash = %tx_hash,
            destination_chain = destination.chain_id(),
            event = "mint_transaction_sent"
        );

        let confirmed = self
            .wait_for_confirmation(client.as_ref(), destination, tx_hash, "mint")
            .await?;
        Ok(TransferSubmission {
            tx_hash: tx_hash.to_string(),
            confirmed,
        })
    }

    async fn transaction_status(&self, chain: &ChainConfig, tx_ref: &str) -> Result<TxConfirmation> {
        let client = self.client(chain)?;
        let tx_hash: TxHash = tx_ref.parse().map_err(|_| {
            BridgeError::InvalidRequest(format!("{tx_ref} is not an EVM transaction hash"))
        })?;

        let Some(receipt) = client.get_transaction_receipt(tx_hash).await? else {
            return Ok(TxConfirmation::not_found());
        };

        let failed = !receipt.success;
        let confirmations = self.confirmations(client.as_ref(), &receipt).await;
        Ok(TxConfirmation {
            found: true,
            confirmed: !failed && confirmations >= chain.required_confirmations(),
            confirmations,
            failed,
        })
    }
}
