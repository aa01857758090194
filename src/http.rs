//! JSON-over-HTTP plumbing shared by the embedding and answer clients.
//!
//! Both services speak the OpenAI wire format: bearer auth, JSON request
//! bodies, and `{"error": {"message": ...}}` bodies on failure.
//!
//! # Retry Strategy
//!
//! Retries are off by default (`max_retries = 0`). When enabled:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors and timeouts → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

/// A failed request: HTTP status when one was received, plus a readable message.
#[derive(Debug, Clone)]
pub struct HttpFailure {
    pub status: Option<u16>,
    pub message: String,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: Option<ApiErrorDetail>,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: Option<String>,
}

/// Build a client with a per-request timeout.
pub fn build_client(timeout_secs: u64) -> Result<reqwest::Client, HttpFailure> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| HttpFailure {
            status: None,
            message: format!("failed to build HTTP client: {}", e),
        })
}

/// Join a base URL and an endpoint path without doubling slashes.
pub fn endpoint(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Extract the provider's error message from a non-2xx body.
///
/// Prefers `error.message`, then the raw body, then a generic
/// `"<label> error (<status>)"` line.
pub fn error_message(label: &str, status: u16, body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(msg) = parsed.error.and_then(|e| e.message) {
            if !msg.trim().is_empty() {
                return msg;
            }
        }
    }
    let raw = body.trim();
    if !raw.is_empty() {
        return raw.to_string();
    }
    format!("{} error ({})", label, status)
}

/// POST a JSON body and decode the 2xx response into `T`.
///
/// `label` names the service in fallback error messages
/// (e.g. `"Embeddings"`, `"Chat"`).
pub async fn post_json<B, T>(
    client: &reqwest::Client,
    url: &str,
    api_key: &str,
    body: &B,
    max_retries: u32,
    label: &str,
) -> Result<T, HttpFailure>
where
    B: serde::Serialize + ?Sized,
    T: DeserializeOwned,
{
    let mut last_err = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tracing::warn!(attempt, delay_secs = delay.as_secs(), url, "retrying request");
            tokio::time::sleep(delay).await;
        }

        let resp = client
            .post(url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await;

        match resp {
            Ok(response) => {
                let status = response.status();
                let text = response.text().await.map_err(|e| HttpFailure {
                    status: Some(status.as_u16()),
                    message: format!("failed to read response body: {}", e),
                })?;

                if status.is_success() {
                    return serde_json::from_str::<T>(&text).map_err(|e| HttpFailure {
                        status: Some(status.as_u16()),
                        message: format!("malformed {} response: {}", label, e),
                    });
                }

                let failure = HttpFailure {
                    status: Some(status.as_u16()),
                    message: error_message(label, status.as_u16(), &text),
                };

                // Rate limited or server error: eligible for retry
                if status.as_u16() == 429 || status.is_server_error() {
                    last_err = Some(failure);
                    continue;
                }

                return Err(failure);
            }
            Err(e) => {
                let message = if e.is_timeout() {
                    format!("request to {} timed out", url)
                } else {
                    format!("request to {} failed: {}", url, e)
                };
                last_err = Some(HttpFailure {
                    status: None,
                    message,
                });
                continue;
            }
        }
    }

    Err(last_err.unwrap_or_else(|| HttpFailure {
        status: None,
        message: format!("{} request failed after retries", label),
    }))
}
