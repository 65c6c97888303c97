//! HTTP plumbing shared by the network adapters.

use std::time::Duration;

use mentionbot_core::AppConfig;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::SourceError;
use crate::rate_limit::retry_with_backoff;
use crate::source::FetchContext;

const DEFAULT_USER_AGENT: &str = "mentionbot/0.1 (mention-monitoring)";

/// Client settings every adapter is built with.
#[derive(Debug, Clone)]
pub struct SourceSettings {
    /// Per-request timeout. Requests are additionally capped by the run deadline.
    pub timeout: Duration,
    pub user_agent: String,
    /// Retries after the first failure for transient errors.
    pub max_retries: u32,
    /// Base delay for exponential backoff: `backoff_base_ms * 2^attempt`.
    pub backoff_base_ms: u64,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_retries: 2,
            backoff_base_ms: 500,
        }
    }
}

impl SourceSettings {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.request_timeout_secs),
            user_agent: config.user_agent.clone(),
            max_retries: config.max_retries,
            backoff_base_ms: config.retry_backoff_base_ms,
        }
    }
}

/// Builds the `reqwest::Client` an adapter owns.
pub(crate) fn build_client(settings: &SourceSettings) -> Result<Client, SourceError> {
    let client = Client::builder()
        .timeout(settings.timeout)
        .connect_timeout(Duration::from_secs(10))
        .user_agent(settings.user_agent.as_str())
        .build()?;
    Ok(client)
}

/// Validates `base_url` and strips trailing slashes so endpoints can be
/// appended with `format!`.
pub(crate) fn normalize_base_url(base_url: &str) -> Result<String, SourceError> {
    let trimmed = base_url.trim_end_matches('/');
    reqwest::Url::parse(trimmed).map_err(|e| SourceError::InvalidBaseUrl {
        base_url: base_url.to_owned(),
        reason: e.to_string(),
    })?;
    Ok(trimmed.to_owned())
}

/// Sends the request produced by `build`, retrying transient failures.
///
/// 429 responses become [`SourceError::RateLimited`]; 5xx responses become
/// [`SourceError::UnexpectedStatus`] after retries are exhausted. Any other
/// status is handed back to the caller to interpret.
pub(crate) async fn send<F>(
    ctx: &FetchContext,
    settings: &SourceSettings,
    source_name: &'static str,
    build: F,
) -> Result<Response, SourceError>
where
    F: Fn() -> RequestBuilder,
{
    retry_with_backoff(ctx, settings.max_retries, settings.backoff_base_ms, || {
        let request = build().timeout(settings.timeout.min(ctx.remaining()));
        async move {
            let response = request.send().await?;
            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                return Err(SourceError::RateLimited {
                    source_name: source_name.to_owned(),
                    retry_after_secs: retry_after_secs(&response),
                });
            }

            if status.is_server_error() {
                return Err(SourceError::UnexpectedStatus {
                    status: status.as_u16(),
                    url: response.url().to_string(),
                });
            }

            Ok(response)
        }
    })
    .await
}

/// Asserts a 2xx status and parses the body as `T`.
pub(crate) async fn read_json<T: DeserializeOwned>(
    response: Response,
    context: &str,
) -> Result<T, SourceError> {
    let status = response.status();
    if !status.is_success() {
        return Err(SourceError::UnexpectedStatus {
            status: status.as_u16(),
            url: response.url().to_string(),
        });
    }

    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| SourceError::Deserialize {
        context: context.to_owned(),
        source: e,
    })
}

/// Seconds until the platform will accept requests again, from either
/// `Retry-After` or the epoch-based `x-rate-limit-reset` header.
fn retry_after_secs(response: &Response) -> Option<u64> {
    let headers = response.headers();
    if let Some(secs) = headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
    {
        return Some(secs);
    }

    let reset_epoch = headers
        .get("x-rate-limit-reset")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<i64>().ok())?;
    let now = chrono::Utc::now().timestamp();
    Some(u64::try_from(reset_epoch.saturating_sub(now)).unwrap_or(0))
}
