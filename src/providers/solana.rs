// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! JSON-RPC client for the account chain.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, instrument, trace, warn, Instrument};
use url::Url;

use crate::account_chain::{Pubkey, SignedTransaction};
use crate::error::{BridgeError, Result};
use crate::spans;
use crate::traits::{AccountChainRpc, AccountInfo, SignatureStatus};

const COMMITMENT: &str = "confirmed";

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct WithContext<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
struct BlockhashValue {
    blockhash: String,
}

#[derive(Debug, Deserialize)]
struct AccountValue {
    lamports: u64,
    owner: String,
    /// `[payload, encoding]`
    data: (String, String),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignatureStatusValue {
    slot: u64,
    confirmations: Option<u64>,
    err: Option<Value>,
    confirmation_status: Option<String>,
}

/// [`AccountChainRpc`] over HTTP JSON-RPC.
///
/// Reads use `confirmed` commitment; transactions are sent base64-encoded.
#[derive(Debug, Clone)]
pub struct SolanaJsonRpcClient {
    url: Url,
    client: Client,
    poll_interval: Duration,
}

impl SolanaJsonRpcClient {
    pub fn new(url: Url, request_timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            url,
            client,
            poll_interval: Duration::from_secs(2),
        })
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Calls `method`, returning its `result`.
    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method,
            params,
        };

        async {
            let response = self
                .client
                .post(self.url.clone())
                .header(CONTENT_TYPE, "application/json")
                .json(&request)
                .send()
                .await?;
            response.error_for_status_ref()?;

            let body: RpcResponse<T> = response.json().await?;
            match (body.result, body.error) {
                (_, Some(error)) => Err(BridgeError::Provider(format!(
                    "{method} failed ({}): {}",
                    error.code, error.message
                ))),
                (Some(result), None) => Ok(result),
                (None, None) => Err(BridgeError::Provider(format!(
                    "{method} returned neither result nor error"
                ))),
            }
        }
        .instrument(spans::rpc_call(method, &self.url))
        .await
    }
}

fn decode_account(value: AccountValue) -> Result<AccountInfo> {
    let (payload, encoding) = value.data;
    if encoding != "base64" {
        return Err(BridgeError::Provider(format!(
            "unexpected account encoding {encoding}"
        )));
    }

    Ok(AccountInfo {
        lamports: value.lamports,
        owner: value.owner.parse()?,
        data: BASE64
            .decode(payload)
            .map_err(|e| BridgeError::Provider(format!("invalid account data: {e}")))?,
    })
}

fn decode_blockhash(encoded: &str) -> Result<[u8; 32]> {
    let bytes = bs58::decode(encoded)
        .into_vec()
        .map_err(|e| BridgeError::Provider(format!("invalid blockhash {encoded}: {e}")))?;
    bytes
        .try_into()
        .map_err(|_| BridgeError::Provider(format!("blockhash {encoded} is not 32 bytes")))
}

#[async_trait]
impl AccountChainRpc for SolanaJsonRpcClient {
    async fn get_latest_blockhash(&self) -> Result<[u8; 32]> {
        let result: WithContext<BlockhashValue> = self
            .call("getLatestBlockhash", json!([{ "commitment": COMMITMENT }]))
            .await?;
        decode_blockhash(&result.value.blockhash)
    }

    async fn get_minimum_balance_for_rent_exemption(&self, space: u64) -> Result<u64> {
        self.call("getMinimumBalanceForRentExemption", json!([space]))
            .await
    }

    async fn get_account_info(&self, account: &Pubkey) -> Result<Option<AccountInfo>> {
        let result: WithContext<Option<AccountValue>> = self
            .call(
                "getAccountInfo",
                json!([account.to_string(), { "encoding": "base64", "commitment": COMMITMENT }]),
            )
            .await?;
        result.value.map(decode_account).transpose()
    }

    #[instrument(skip(self, tx), fields(signature = %tx.signature()))]
    async fn send_and_confirm_transaction(
        &self,
        tx: &SignedTransaction,
        timeout: Duration,
    ) -> Result<bool> {
        let wire = BASE64.encode(tx.serialize()?);
        let signature: String = self
            .call(
                "sendTransaction",
                json!([wire, { "encoding": "base64", "preflightCommitment": COMMITMENT }]),
            )
            .await
            .map_err(|e| BridgeError::TransferExecutionFailed {
                reason: e.to_string(),
            })?;
        debug!(signature = %signature, event = "transaction_sent");

        let poll = async {
            loop {
                if let Some(status) = self.get_signature_status(&signature).await? {
                    if let Some(err) = status.err {
                        return Err(BridgeError::TransferExecutionFailed { reason: err });
                    }
                    if status.is_confirmed() {
                        return Ok(());
                    }
                }
                trace!(event = "signature_not_yet_confirmed");
                tokio::time::sleep(self.poll_interval).await;
            }
        };

        match tokio::time::timeout(timeout, poll).await {
            Ok(result) => result.map(|()| true),
            Err(_) => {
                warn!(
                    signature = %signature,
                    timeout_secs = timeout.as_secs(),
                    event = "confirmation_timed_out"
                );
                Ok(false)
            }
        }
    }

    async fn get_signature_status(&self, signature: &str) -> Result<Option<SignatureStatus>> {
        let result: WithContext<Vec<Option<SignatureStatusValue>>> = self
            .call(
                "getSignatureStatuses",
                json!([[signature], { "searchTransactionHistory": true }]),
            )
            .await?;

        Ok(result
            .value
            .into_iter()
            .next()
            .flatten()
            .map(|status| SignatureStatus {
                slot: status.slot,
                confirmations: status.confirmations,
                err: status.err.map(|e| e.to_string()),
                confirmation_status: status.confirmation_status,
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method: "getMinimumBalanceForRentExemption",
            params: json!([276]),
        };
        insta::assert_snapshot!(
            serde_json::to_string(&request).unwrap(),
            @r#"{"jsonrpc":"2.0","id":1,"method":"getMinimumBalanceForRentExemption","params":[276]}"#
        );
    }

    #[test]
    fn test_error_response_parses() {
        let body = r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32002,"message":"Transaction simulation failed"}}"#;
        let response: RpcResponse<String> = serde_json::from_str(body).unwrap();
        assert!(response.result.is_none());
        assert_eq!(response.error.unwrap().code, -32002);
    }

    #[test]
    fn test_decode_account() {
        let body = r#"{
            "context": {"slot": 1},
            "value": {
                "lamports": 2039280,
                "owner": "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA",
                "data": ["AQID", "base64"],
                "executable": false,
                "rentEpoch": 0
            }
        }"#;
        let result: WithContext<Option<AccountValue>> = serde_json::from_str(body).unwrap();
        let account = decode_account(result.value.unwrap()).unwrap();

        assert_eq!(account.lamports, 2_039_280);
        assert_eq!(account.owner, crate::account_chain::TOKEN_PROGRAM_ID);
        assert_eq!(account.data, vec![1, 2, 3]);
    }

    #[test]
    fn test_missing_account_is_none() {
        let body = r#"{"context": {"slot": 1}, "value": null}"#;
        let result: WithContext<Option<AccountValue>> = serde_json::from_str(body).unwrap();
        assert!(result.value.is_none());
    }

    #[test]
    fn test_signature_status_parses() {
        let body = r#"{
            "context": {"slot": 82},
            "value": [{
                "slot": 72,
                "confirmations": 10,
                "err": null,
                "confirmationStatus": "confirmed"
            }, null]
        }"#;
        let result: WithContext<Vec<Option<SignatureStatusValue>>> =
            serde_json::from_str(body).unwrap();
        let status = result.value[0].as_ref().unwrap();
        assert_eq!(status.confirmations, Some(10));
        assert!(result.value[1].is_none());
    }

    #[test]
    fn test_decode_blockhash() {
        let encoded = bs58::encode([7u8; 32]).into_string();
        assert_eq!(decode_blockhash(&encoded).unwrap(), [7u8; 32]);
        assert!(decode_blockhash("abc").is_err());
    }
}
