//! HTTP send with exponential backoff for transient failures.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use semkon_core::{OracleError, OracleErrorKind, OracleResult};
use tracing::warn;

/// Longest error body echoed back in messages.
const ERROR_BODY_LIMIT: usize = 320;

/// Send a request, retrying transient failures.
///
/// Retry behavior, with `base` doubled per attempt:
/// - 429: waits `2 * base * 2^attempt`
/// - 5xx, connect errors and timeouts: waits `base * 2^attempt`
/// - other non-success statuses fail immediately as [`OracleErrorKind::Api`]
///
/// Exhausted retries fail as [`OracleErrorKind::Transport`].
pub async fn send_with_retry<F>(
    client: &Client,
    build_request: F,
    max_retries: u32,
    base: Duration,
    context: &str,
) -> OracleResult<Response>
where
    F: Fn(&Client) -> RequestBuilder,
{
    let attempts = max_retries.saturating_add(1);
    let mut last_failure = String::new();

    for attempt in 0..attempts {
        let is_last = attempt + 1 == attempts;
        let delay = match build_request(client).send().await {
            Ok(resp) => {
                let status = resp.status();
                if status.is_success() {
                    return Ok(resp);
                }
                let body = resp.text().await.unwrap_or_default();
                let body = truncate(&body, ERROR_BODY_LIMIT);
                if status == StatusCode::TOO_MANY_REQUESTS {
                    last_failure = format!("rate limited ({status}): {body}");
                    backoff(base, attempt + 1)
                } else if status.is_server_error() {
                    last_failure = format!("server error ({status}): {body}");
                    backoff(base, attempt)
                } else {
                    warn!("{}: non-retriable error ({})", context, status);
                    return Err(OracleError::new(
                        OracleErrorKind::Api,
                        format!("{context}: {status}: {body}"),
                    ));
                }
            }
            Err(e) if e.is_timeout() || e.is_connect() => {
                last_failure = format!("network error: {e}");
                backoff(base, attempt)
            }
            Err(e) => {
                warn!("{}: request failed: {}", context, e);
                return Err(OracleError::transport(format!("{context}: {e}")));
            }
        };

        if is_last {
            break;
        }
        warn!("{}: {}, retrying in {:?}", context, last_failure, delay);
        tokio::time::sleep(delay).await;
    }

    warn!("{}: failed after {} attempts", context, attempts);
    Err(OracleError::transport(format!(
        "{context}: gave up after {attempts} attempts, last failure: {last_failure}"
    )))
}

fn backoff(base: Duration, exponent: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(exponent))
}

/// Cut `value` to at most `max` characters.
pub(crate) fn truncate(value: &str, max: usize) -> String {
    match value.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &value[..idx]),
        None => value.to_string(),
    }
}
