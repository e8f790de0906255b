// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Alloy-based EVM chain client.

use std::time::Duration;

use alloy_network::{Ethereum, ReceiptResponse, TransactionBuilder};
use alloy_primitives::{Address, TxHash, U256};
use alloy_provider::Provider;
use alloy_rpc_types::{TransactionReceipt, TransactionRequest};
use async_trait::async_trait;
use tracing::{debug, instrument, trace};

use crate::contracts::Erc20Contract;
use crate::error::{BridgeError, Result};
use crate::traits::{EvmChainClient, EvmReceipt};

/// Default gas buffer percentage (20%)
pub const DEFAULT_GAS_BUFFER_PERCENT: u64 = 20;

/// `estimate * (100 + buffer_percent) / 100`
pub fn apply_gas_buffer(estimate: u64, buffer_percent: u64) -> u64 {
    estimate.saturating_mul(100 + buffer_percent) / 100
}

/// [`EvmChainClient`] over an alloy [`Provider`] that can sign for `sender`.
///
/// Gas is estimated per transaction and padded by `gas_buffer_percent`.
///
/// # Examples
///
/// ```rust,no_run
/// use alloy_primitives::address;
/// use alloy_provider::ProviderBuilder;
/// use cctp_engine::providers::AlloyEvmClient;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let provider = ProviderBuilder::new().connect("https://eth.llamarpc.com").await?;
/// let sender = address!("742d35Cc6634C0532925a3b844Bc9e7595f8fA0d");
/// let client = AlloyEvmClient::new(provider, sender);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct AlloyEvmClient<P>
where
    P: Provider<Ethereum> + Clone,
{
    provider: P,
    sender: Address,
    gas_buffer_percent: u64,
    poll_interval: Duration,
}

impl<P> AlloyEvmClient<P>
where
    P: Provider<Ethereum> + Clone,
{
    pub fn new(provider: P, sender: Address) -> Self {
        Self {
            provider,
            sender,
            gas_buffer_percent: DEFAULT_GAS_BUFFER_PERCENT,
            poll_interval: Duration::from_secs(2),
        }
    }

    pub fn with_gas_buffer_percent(mut self, percent: u64) -> Self {
        self.gas_buffer_percent = percent;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn inner(&self) -> &P {
        &self.provider
    }
}

fn to_receipt(receipt: &TransactionReceipt) -> EvmReceipt {
    EvmReceipt {
        transaction_hash: receipt.transaction_hash(),
        block_number: receipt.block_number(),
        success: receipt.status(),
    }
}

#[async_trait]
impl<P> EvmChainClient for AlloyEvmClient<P>
where
    P: Provider<Ethereum> + Clone + Send + Sync + 'static,
{
    fn sender(&self) -> Address {
        self.sender
    }

    async fn balance_of(&self, token: Address, owner: Address) -> Result<U256> {
        Erc20Contract::new(token, self.provider.clone())
            .balance_of(owner)
            .await
            .map_err(|e| BridgeError::Provider(format!("balanceOf failed: {e}")))
    }

    async fn allowance(&self, token: Address, owner: Address, spender: Address) -> Result<U256> {
        Erc20Contract::new(token, self.provider.clone())
            .allowance(owner, spender)
            .await
            .map_err(|e| BridgeError::Provider(format!("allowance failed: {e}")))
    }

    #[instrument(skip(self, tx), fields(sender = %self.sender))]
    async fn send_transaction(&self, tx: TransactionRequest) -> Result<TxHash> {
        let tx = tx.with_from(self.sender);
        let estimate = self.provider.estimate_gas(tx.clone()).await?;
        let gas_limit = apply_gas_buffer(estimate, self.gas_buffer_percent);

        let pending = self
            .provider
            .send_transaction(tx.with_gas_limit(gas_limit))
            .await?;
        let tx_hash = *pending.tx_hash();

        debug!(
            tx_hash = %tx_hash,
            gas_estimate = estimate,
            gas_limit = gas_limit,
            event = "transaction_sent"
        );
        Ok(tx_hash)
    }

    #[instrument(skip(self), fields(tx_hash = %tx_hash))]
    async fn wait_for_receipt(
        &self,
        tx_hash: TxHash,
        timeout: Duration,
    ) -> Result<Option<EvmReceipt>> {
        let poll = async {
            loop {
                if let Some(receipt) = self.get_transaction_receipt(tx_hash).await? {
                    return Ok::<_, BridgeError>(receipt);
                }
                trace!(event = "receipt_not_yet_available");
                tokio::time::sleep(self.poll_interval).await;
            }
        };

        match tokio::time::timeout(timeout, poll).await {
            Ok(receipt) => receipt.map(Some),
            Err(_) => {
                debug!(timeout_secs = timeout.as_secs(), event = "receipt_wait_timed_out");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self), fields(tx_hash = %tx_hash))]
    async fn get_transaction_receipt(&self, tx_hash: TxHash) -> Result<Option<EvmReceipt>> {
        trace!(event = "fetching_transaction_receipt");
        let result = self.provider.get_transaction_receipt(tx_hash).await?;

        Ok(result.as_ref().map(to_receipt))
    }

    #[instrument(skip(self))]
    async fn get_block_number(&self) -> Result<u64> {
        let block_number = self.provider.get_block_number().await?;

        trace!(block_number = block_number, event = "block_number_retrieved");
        Ok(block_number)
    }
}
