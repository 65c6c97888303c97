//! Request ids for every route, plus the guard in front of the run triggers
//! and the source listing.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::{
        header::{AUTHORIZATION, RETRY_AFTER},
        HeaderValue,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use mentionbot_core::{AppConfig, Environment};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use crate::api::ApiError;

const REQUEST_ID_HEADER: &str = "x-request-id";
const BUDGET_WINDOW: Duration = Duration::from_secs(60);
/// Budget bucket shared by every caller while auth is off.
const OPEN_CALLER: &str = "open";

#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Takes `x-request-id` from the request or mints a UUIDv4, exposes it as a
/// [`RequestId`] extension, runs the request inside a span carrying it and
/// echoes it back.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map_or_else(|| Uuid::new_v4().to_string(), str::to_owned);

    req.extensions_mut().insert(RequestId(id.clone()));
    let span = tracing::info_span!("request", request_id = %id);
    let mut res = next.run(req).instrument(span).await;

    if let Ok(value) = HeaderValue::from_str(&id) {
        res.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    res
}

#[derive(Debug)]
struct Window {
    opened_at: Instant,
    used: u32,
}

/// Per-caller allowance on the guarded routes, counted in fixed windows.
#[derive(Debug, Clone)]
pub struct TriggerBudget {
    per_window: u32,
    window: Duration,
    callers: Arc<Mutex<HashMap<String, Window>>>,
}

impl TriggerBudget {
    #[must_use]
    pub fn new(per_window: u32, window: Duration) -> Self {
        Self {
            per_window,
            window,
            callers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    #[must_use]
    pub fn per_minute(per_window: u32) -> Self {
        Self::new(per_window, BUDGET_WINDOW)
    }

    /// Spends one request from `caller`'s window. When the window is used up,
    /// returns how long until it reopens.
    async fn spend(&self, caller: &str) -> Result<(), Duration> {
        let now = Instant::now();
        let mut callers = self.callers.lock().await;
        let window = callers.entry(caller.to_owned()).or_insert(Window {
            opened_at: now,
            used: 0,
        });

        let age = now.duration_since(window.opened_at);
        if age >= self.window {
            window.opened_at = now;
            window.used = 0;
        } else if window.used >= self.per_window {
            return Err(self.window - age);
        }

        window.used += 1;
        Ok(())
    }
}

/// Bearer keys plus the trigger budget. With no keys configured every caller
/// shares one budget.
#[derive(Debug, Clone)]
pub struct AccessGuard {
    keys: Arc<HashSet<String>>,
    budget: TriggerBudget,
}

impl AccessGuard {
    #[must_use]
    pub fn new(keys: &[String], budget: TriggerBudget) -> Self {
        Self {
            keys: Arc::new(keys.iter().cloned().collect()),
            budget,
        }
    }

    /// Builds the guard from `MENTIONBOT_API_KEYS` and
    /// `MENTIONBOT_TRIGGER_BUDGET_PER_MINUTE`.
    ///
    /// # Errors
    ///
    /// Fails outside development when no API keys are configured.
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        if config.api_keys.is_empty() {
            if config.env != Environment::Development {
                anyhow::bail!(
                    "MENTIONBOT_API_KEYS is required in the {} environment",
                    config.env
                );
            }
            tracing::warn!("MENTIONBOT_API_KEYS not set; trigger routes are open in development");
        }
        Ok(Self::new(
            &config.api_keys,
            TriggerBudget::per_minute(config.trigger_budget_per_minute),
        ))
    }

    fn auth_enabled(&self) -> bool {
        !self.keys.is_empty()
    }

    /// The budget bucket for this request, or `None` if it is not allowed in.
    fn caller<'a>(&self, authorization: Option<&'a HeaderValue>) -> Option<&'a str> {
        if !self.auth_enabled() {
            return Some(OPEN_CALLER);
        }
        bearer_token(authorization).filter(|token| self.keys.contains(*token))
    }
}

/// Rejects callers without a known bearer key (when keys are configured),
/// then charges the caller's trigger budget.
pub async fn guard(State(access): State<AccessGuard>, req: Request, next: Next) -> Response {
    let request_id = req
        .extensions()
        .get::<RequestId>()
        .map(|r| r.0.clone())
        .unwrap_or_default();

    let Some(caller) = access.caller(req.headers().get(AUTHORIZATION)) else {
        tracing::info!(path = %req.uri().path(), "rejected request without a valid API key");
        return ApiError::new(request_id, "unauthorized", "missing or invalid bearer token")
            .into_response();
    };

    if let Err(reopens_in) = access.budget.spend(caller).await {
        tracing::warn!(
            path = %req.uri().path(),
            retry_after_secs = reopens_in.as_secs(),
            "trigger budget exhausted"
        );
        let mut res = ApiError::new(
            request_id,
            "rate_limited",
            "too many trigger requests, retry later",
        )
        .into_response();
        res.headers_mut().insert(
            RETRY_AFTER,
            HeaderValue::from(reopens_in.as_secs().max(1)),
        );
        return res;
    }

    next.run(req).await
}

fn bearer_token(value: Option<&HeaderValue>) -> Option<&str> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
