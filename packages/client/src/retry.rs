//! HTTP send helpers with retry for transient errors.
//!
//! Every API call goes through [`send_json`] instead of calling
//! `reqwest::RequestBuilder::send()` directly, so that connection
//! failures, timeouts, HTTP 429 and HTTP 5xx are retried with exponential
//! backoff while other 4xx responses fail immediately.
//!
//! ```ignore
//! let body: OccurrencesResponse =
//!     retry::send_json(|| client.get(&url).query(&params), 2).await?;
//! ```

use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::ClientError;

/// Maximum length of the response body kept in error messages.
const BODY_PREVIEW_LEN: usize = 300;

/// Sends the request built by `build_request` and decodes the JSON body.
///
/// The closure is called once per attempt since builders are consumed by
/// `.send()`.
///
/// # Errors
///
/// * [`ClientError::Unauthorized`] on HTTP 401.
/// * [`ClientError::Status`] on any other non-retryable status, or a
///   retryable one after `max_retries` retries.
/// * [`ClientError::Http`] if the request could not be sent.
/// * [`ClientError::Json`] if the body is not the expected JSON.
#[allow(clippy::future_not_send)]
pub async fn send_json<T, F>(build_request: F, max_retries: u32) -> Result<T, ClientError>
where
    T: DeserializeOwned,
    F: Fn() -> reqwest::RequestBuilder,
{
    let response = send_inner(&build_request, max_retries).await?;
    let url = response.url().to_string();
    let text = response.text().await?;

    serde_json::from_str(&text).map_err(|e| {
        log::warn!(
            "JSON decode failed for {url}: {e}\n  body preview: {}",
            preview(&text)
        );
        ClientError::Json(e)
    })
}

/// Retry loop. Returns the first 2xx/3xx response.
#[allow(clippy::future_not_send)]
async fn send_inner<F>(
    build_request: &F,
    max_retries: u32,
) -> Result<reqwest::Response, ClientError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut last_error: Option<ClientError> = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = backoff(attempt);
            log::warn!("  retry {attempt}/{max_retries} in {delay:?}...");
            tokio::time::sleep(delay).await;
        }

        match build_request().send().await {
            Err(e) => {
                if is_transient(&e) && attempt < max_retries {
                    log::warn!("  transient error: {e}");
                    last_error = Some(ClientError::Http(e));
                    continue;
                }
                return Err(ClientError::Http(e));
            }
            Ok(response) => {
                let status = response.status();

                if status == reqwest::StatusCode::UNAUTHORIZED {
                    log::warn!("{} rejected credentials (HTTP 401)", response.url());
                    return Err(ClientError::Unauthorized);
                }

                if is_retryable_status(status) {
                    let error = status_error(response).await;
                    if attempt < max_retries {
                        log::warn!("  HTTP {status}, will retry");
                        last_error = Some(error);
                        continue;
                    }
                    return Err(error);
                }

                if status.is_client_error() || status.is_server_error() {
                    return Err(status_error(response).await);
                }

                return Ok(response);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| ClientError::Status {
        status: 0,
        message: "request failed after all retries".to_string(),
    }))
}

/// Delay before retry `attempt` (1-based): 500ms, 1s, 2s, ...
fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(250_u64 << attempt.min(8))
}

fn is_retryable_status(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body() || e.is_request()
}

async fn status_error(response: reqwest::Response) -> ClientError {
    let status = response.status().as_u16();
    let message = response
        .text()
        .await
        .ok()
        .map(|body| error_message(&body))
        .unwrap_or_default();
    ClientError::Status { status, message }
}

/// Extracts the message of a `{"error": ...}` or `{"detail": ...}` body,
/// falling back to a preview of the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<dataplane_server_models::ApiErrorBody>(body)
        .map_or_else(|_| preview(body), |b| b.error)
}

fn preview(text: &str) -> String {
    if text.len() > BODY_PREVIEW_LEN {
        let mut end = BODY_PREVIEW_LEN;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &text[..end])
    } else {
        text.to_string()
    }
}
