// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
//! ERC20 bindings for balance, allowance and approval
//!
//! Reads go through a provider-backed instance; the approval is returned as an
//! unsigned `TransactionRequest` for the chain client to submit.

use alloy_network::Ethereum;
use alloy_primitives::{Address, U256};
use alloy_provider::Provider;
use alloy_rpc_types::{TransactionInput, TransactionRequest};
use alloy_sol_types::{sol, SolCall};
use tracing::{debug, info};

use Erc20::Erc20Instance;

/// Provider-backed ERC20 reader.
pub struct Erc20Contract<P: Provider<Ethereum>> {
    instance: Erc20Instance<P>,
}

impl<P: Provider<Ethereum>> Erc20Contract<P> {
    pub fn new(address: Address, provider: P) -> Self {
        Self {
            instance: Erc20Instance::new(address, provider),
        }
    }

    /// Amount `spender` may move on behalf of `owner`.
    pub async fn allowance(
        &self,
        owner: Address,
        spender: Address,
    ) -> Result<U256, alloy_contract::Error> {
        let result = self.instance.allowance(owner, spender).call().await?;

        debug!(
            owner = %owner,
            spender = %spender,
            allowance = %result,
            contract_address = %self.instance.address(),
            event = "allowance_retrieved"
        );

        Ok(result)
    }

    pub async fn balance_of(&self, account: Address) -> Result<U256, alloy_contract::Error> {
        let result = self.instance.balanceOf(account).call().await?;

        debug!(
            account = %account,
            balance = %result,
            contract_address = %self.instance.address(),
            event = "balance_retrieved"
        );

        Ok(result)
    }
}

/// Unsigned `approve(spender, amount)` on `token`.
pub fn approve_transaction(
    token: Address,
    from: Address,
    spender: Address,
    amount: U256,
) -> TransactionRequest {
    info!(
        from = %from,
        spender = %spender,
        amount = %amount,
        contract_address = %token,
        event = "approve_transaction_created"
    );

    let call = Erc20::approveCall { spender, amount };
    TransactionRequest::default()
        .from(from)
        .to(token)
        .input(TransactionInput::new(call.abi_encode().into()))
}

// Minimal ERC20 interface
sol!(
    #[allow(missing_docs)]
    #[sol(rpc)]
    contract Erc20 {
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
        function balanceOf(address account) external view returns (uint256);
    }
);
