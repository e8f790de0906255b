// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Circle Iris API attestation provider implementation.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, instrument, trace, warn, Instrument};
use url::Url;

use crate::config::AttestationConfig;
use crate::error::{BridgeError, Result};
use crate::protocol::V2AttestationResponse;
use crate::spans;
use crate::traits::AttestationProvider;

/// Attestation provider backed by Circle's Iris API.
///
/// A 404 and a request timeout both mean "not indexed yet" and are returned
/// as `None`. A 429 becomes [`BridgeError::RateLimitExceeded`].
///
/// # Examples
///
/// ```rust,no_run
/// use cctp_engine::config::AttestationConfig;
/// use cctp_engine::providers::IrisAttestationProvider;
/// use cctp_engine::traits::AttestationProvider;
///
/// # async fn example() -> Result<(), cctp_engine::BridgeError> {
/// let provider = IrisAttestationProvider::new(&AttestationConfig::sandbox())?;
/// let response = provider.get_messages(0, "0xabc").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct IrisAttestationProvider {
    base_url: Url,
    client: Client,
}

impl IrisAttestationProvider {
    pub fn new(config: &AttestationConfig) -> Result<Self> {
        let mut base_url = Url::parse(&config.base_url).map_err(|e| {
            BridgeError::InvalidConfig(format!("invalid attestation URL {}: {e}", config.base_url))
        })?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let client = Client::builder().timeout(config.request_timeout).build()?;

        Ok(Self { base_url, client })
    }

    /// `{base}/v2/messages/{domain}?transactionHash={tx}`
    pub fn messages_url(&self, source_domain: u32, tx_ref: &str) -> Result<Url> {
        let mut url = self
            .base_url
            .join(&format!("v2/messages/{source_domain}"))
            .map_err(|e| BridgeError::InvalidConfig(e.to_string()))?;
        url.query_pairs_mut().append_pair("transactionHash", tx_ref);
        Ok(url)
    }
}

#[async_trait]
impl AttestationProvider for IrisAttestationProvider {
    #[instrument(skip(self), level = "debug")]
    async fn get_messages(
        &self,
        source_domain: u32,
        tx_ref: &str,
    ) -> Result<Option<V2AttestationResponse>> {
        let url = self.messages_url(source_domain, tx_ref)?;
        let span = spans::attestation_request(&url);

        async move {
            trace!(url = %url, event = "attestation_request_sent");

            let response = match self.client.get(url).send().await {
                Ok(response) => response,
                Err(e) if e.is_timeout() => {
                    warn!(error = %e, event = "attestation_request_timed_out");
                    return Ok(None);
                }
                Err(e) => return Err(BridgeError::Network(e)),
            };

            let status_code = response.status();
            trace!(status_code = %status_code, event = "attestation_response_received");

            if status_code == StatusCode::TOO_MANY_REQUESTS {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|h| h.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(300);

                debug!(
                    retry_after_seconds = retry_after,
                    event = "attestation_rate_limited"
                );
                return Err(BridgeError::RateLimitExceeded {
                    retry_after_seconds: retry_after,
                });
            }

            if status_code == StatusCode::NOT_FOUND {
                debug!(event = "attestation_not_indexed");
                return Ok(None);
            }

            response.error_for_status_ref()?;

            let body = response.bytes().await?;
            let messages: V2AttestationResponse = serde_json::from_slice(&body)?;
            debug!(
                message_count = messages.messages.len(),
                event = "attestation_response_parsed"
            );

            Ok(Some(messages))
        }
        .instrument(span)
        .await
    }
}
