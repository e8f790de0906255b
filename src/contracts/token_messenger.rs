// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
//! TokenMessengerV2 bindings
//!
//! Builds the burn call: `depositForBurn`, or `depositForBurnWithHook` when the
//! caller forwards hook data to the destination.

use alloy_primitives::{Address, Bytes, FixedBytes, U256};
use alloy_rpc_types::{TransactionInput, TransactionRequest};
use alloy_sol_types::{sol, SolCall};
use bon::Builder;
use tracing::info;

use crate::spans;

/// Arguments of a burn.
#[derive(Builder, Debug, Clone)]
pub struct DepositForBurnParams {
    amount: U256,
    destination_domain: u32,
    mint_recipient: FixedBytes<32>,
    burn_token: Address,
    /// Zero lets anyone complete the transfer on the destination
    #[builder(default)]
    destination_caller: FixedBytes<32>,
    #[builder(default)]
    max_fee: U256,
    min_finality_threshold: u32,
    hook_data: Option<Bytes>,
}

impl DepositForBurnParams {
    pub fn amount(&self) -> U256 {
        self.amount
    }

    pub fn destination_domain(&self) -> u32 {
        self.destination_domain
    }

    pub fn mint_recipient(&self) -> FixedBytes<32> {
        self.mint_recipient
    }

    pub fn max_fee(&self) -> U256 {
        self.max_fee
    }

    pub fn hook_data(&self) -> Option<&Bytes> {
        self.hook_data.as_ref()
    }
}

/// The TokenMessengerV2 contract at a fixed address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenMessengerV2Contract {
    address: Address,
}

impl TokenMessengerV2Contract {
    pub fn new(address: Address) -> Self {
        Self { address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Unsigned burn transaction from `from`.
    pub fn deposit_for_burn_transaction(
        &self,
        from: Address,
        params: &DepositForBurnParams,
    ) -> TransactionRequest {
        let span = spans::deposit_for_burn(
            &from,
            params.destination_domain,
            &params.burn_token,
            &params.amount,
        );
        let _guard = span.enter();

        let calldata = match &params.hook_data {
            Some(hook_data) => TokenMessengerV2::depositForBurnWithHookCall {
                amount: params.amount,
                destinationDomain: params.destination_domain,
                mintRecipient: params.mint_recipient,
                burnToken: params.burn_token,
                destinationCaller: params.destination_caller,
                maxFee: params.max_fee,
                minFinalityThreshold: params.min_finality_threshold,
                hookData: hook_data.clone(),
            }
            .abi_encode(),
            None => TokenMessengerV2::depositForBurnCall {
                amount: params.amount,
                destinationDomain: params.destination_domain,
                mintRecipient: params.mint_recipient,
                burnToken: params.burn_token,
                destinationCaller: params.destination_caller,
                maxFee: params.max_fee,
                minFinalityThreshold: params.min_finality_threshold,
            }
            .abi_encode(),
        };

        info!(
            from_address = %from,
            mint_recipient = %params.mint_recipient,
            destination_domain = params.destination_domain,
            token_address = %params.burn_token,
            amount = %params.amount,
            max_fee = %params.max_fee,
            min_finality_threshold = params.min_finality_threshold,
            has_hooks = params.hook_data.is_some(),
            contract_address = %self.address,
            event = "deposit_for_burn_transaction_created"
        );

        TransactionRequest::default()
            .from(from)
            .to(self.address)
            .input(TransactionInput::new(calldata.into()))
    }
}

sol!(
    #[allow(missing_docs)]
    interface TokenMessengerV2 {
        function depositForBurn(
            uint256 amount,
            uint32 destinationDomain,
            bytes32 mintRecipient,
            address burnToken,
            bytes32 destinationCaller,
            uint256 maxFee,
            uint32 minFinalityThreshold
        ) external;

        function depositForBurnWithHook(
            uint256 amount,
            uint32 destinationDomain,
            bytes32 mintRecipient,
            address burnToken,
            bytes32 destinationCaller,
            uint256 maxFee,
            uint32 minFinalityThreshold,
            bytes hookData
        ) external;
    }
);
