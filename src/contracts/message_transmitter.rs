// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
//! MessageTransmitterV2 bindings

use alloy_primitives::{Address, Bytes};
use alloy_rpc_types::{TransactionInput, TransactionRequest};
use alloy_sol_types::{sol, SolCall};
use tracing::info;

/// The MessageTransmitterV2 contract at a fixed address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageTransmitterV2Contract {
    address: Address,
}

impl MessageTransmitterV2Contract {
    pub fn new(address: Address) -> Self {
        Self { address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Unsigned `receiveMessage(message, attestation)`, which mints on this chain.
    pub fn receive_message_transaction(
        &self,
        from: Address,
        message: Bytes,
        attestation: Bytes,
    ) -> TransactionRequest {
        info!(
            from_address = %from,
            message_len = message.len(),
            attestation_len = attestation.len(),
            contract_address = %self.address,
            event = "receive_message_transaction_created"
        );

        let call = MessageTransmitterV2::receiveMessageCall {
            message,
            attestation,
        };
        TransactionRequest::default()
            .from(from)
            .to(self.address)
            .input(TransactionInput::new(call.abi_encode().into()))
    }
}

sol!(
    #[allow(missing_docs)]
    interface MessageTransmitterV2 {
        function receiveMessage(bytes message, bytes attestation) external returns (bool success);
    }
);
