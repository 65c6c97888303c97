use thiserror::Error;

/// Errors returned by source adapters and their HTTP helpers.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Credentials were rejected or a token could not be obtained. Fatal for
    /// the adapter's whole fetch.
    #[error("authentication failed for {source_name}: {reason}")]
    Auth { source_name: String, reason: String },

    /// The platform asked us to back off. Adapters turn this into an empty
    /// result for the unit of work that hit it.
    #[error("rate limited by {source_name}{}", retry_hint(.retry_after_secs))]
    RateLimited {
        source_name: String,
        retry_after_secs: Option<u64>,
    },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("feed error for {url}: {reason}")]
    Feed { url: String, reason: String },

    #[error("invalid base URL \"{base_url}\": {reason}")]
    InvalidBaseUrl { base_url: String, reason: String },
}

impl SourceError {
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, SourceError::RateLimited { .. })
    }

    #[must_use]
    pub fn is_auth(&self) -> bool {
        matches!(self, SourceError::Auth { .. })
    }
}

#[allow(clippy::ref_option)]
fn retry_hint(retry_after_secs: &Option<u64>) -> String {
    match retry_after_secs {
        Some(secs) => format!(" (retry after {secs}s)"),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_message_formats_optional_retry() {
        let with = SourceError::RateLimited {
            source_name: "twitter".to_owned(),
            retry_after_secs: Some(900),
        };
        assert_eq!(with.to_string(), "rate limited by twitter (retry after 900s)");

        let without = SourceError::RateLimited {
            source_name: "reddit".to_owned(),
            retry_after_secs: None,
        };
        assert_eq!(without.to_string(), "rate limited by reddit");
    }
}
