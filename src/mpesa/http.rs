use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::time::Duration;
use tracing::warn;

use crate::mpesa::error::{MpesaError, MpesaResult};

/// Thin JSON HTTP client with a timeout and bounded retries.
///
/// Non-2xx responses carrying a JSON body are handed back to the caller as
/// `Rejected` (the provider answered and said no); network errors, 5xx and
/// non-JSON bodies surface as `Unavailable`.
#[derive(Clone)]
pub struct MpesaHttpClient {
    client: Client,
    timeout: Duration,
    max_retries: u32,
}

impl MpesaHttpClient {
    pub fn new(timeout: Duration, max_retries: u32) -> MpesaResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MpesaError::Unavailable {
                message: format!("failed to initialize HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            timeout,
            max_retries,
        })
    }

    pub async fn request_json<T: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        url: &str,
        authorization: &str,
        body: Option<&JsonValue>,
    ) -> MpesaResult<T> {
        let mut last_error = None;
        for attempt in 0..=self.max_retries {
            let mut request = self
                .client
                .request(method.clone(), url)
                .timeout(self.timeout)
                .header("Authorization", authorization);
            if let Some(payload) = body {
                request = request.json(payload);
            }

            let response = request.send().await.map_err(|e| MpesaError::Unavailable {
                message: format!("provider request failed: {}", e),
            });

            match response {
                Ok(resp) => {
                    let status = resp.status();
                    let text = resp.text().await.unwrap_or_default();

                    if status.is_success() {
                        return serde_json::from_str::<T>(&text).map_err(|_| {
                            MpesaError::Unavailable {
                                message: format!("non-JSON provider response: {}", text),
                            }
                        });
                    }

                    if status.is_server_error() && attempt < self.max_retries {
                        warn!(
                            status = %status,
                            attempt = attempt + 1,
                            "provider server error, retrying"
                        );
                        tokio::time::sleep(Duration::from_secs(1 << attempt)).await;
                        continue;
                    }

                    if status.is_server_error() {
                        return Err(MpesaError::Unavailable {
                            message: format!("HTTP {}: {}", status, text),
                        });
                    }

                    // 4xx: extract the provider's own description when the
                    // body is JSON
                    let description = serde_json::from_str::<JsonValue>(&text)
                        .ok()
                        .and_then(|v| {
                            v.get("errorMessage")
                                .or_else(|| v.get("ResponseDescription"))
                                .and_then(|d| d.as_str())
                                .map(|d| d.to_string())
                        })
                        .unwrap_or_else(|| format!("HTTP {}: {}", status, text));

                    return Err(MpesaError::Rejected {
                        code: Some(status.as_u16().to_string()),
                        description,
                    });
                }
                Err(e) => {
                    last_error = Some(e);
                    if attempt < self.max_retries {
                        tokio::time::sleep(Duration::from_secs(1 << attempt)).await;
                        continue;
                    }
                }
            }
        }

        Err(last_error.unwrap_or(MpesaError::Unavailable {
            message: "provider request failed".to_string(),
        }))
    }
}
