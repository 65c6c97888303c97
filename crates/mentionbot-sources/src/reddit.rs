//! Reddit adapter (client-credentials OAuth, per-subreddit search).

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mentionbot_core::Mention;
use reqwest::Client;
use serde::Deserialize;

use crate::error::SourceError;
use crate::http::{build_client, normalize_base_url, read_json, send, SourceSettings};
use crate::source::{cutoff, dedup_by_id, FetchContext, MentionSource};
use crate::text::contains_keyword;

const NAME: &str = "reddit";
const AUTH_BASE_URL: &str = "https://www.reddit.com";
const API_BASE_URL: &str = "https://oauth.reddit.com";
const SUBREDDITS: &[&str] = &[
    "kubernetes",
    "azure",
    "devops",
    "docker",
    "cloudcomputing",
    "sysadmin",
    "programming",
];
const PAGE_LIMIT: u32 = 100;
const PAGE_COUNT: usize = 2;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
    after: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: Post,
}

#[derive(Debug, Deserialize)]
struct Post {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    selftext: String,
    #[serde(default)]
    author: String,
    #[serde(default)]
    subreddit: String,
    #[serde(default)]
    permalink: String,
    created_utc: f64,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    num_comments: i64,
}

pub struct RedditSource {
    client: Client,
    settings: SourceSettings,
    credentials: Option<(String, String)>,
    auth_base_url: String,
    api_base_url: String,
}

impl RedditSource {
    /// Creates an adapter against the production Reddit endpoints.
    ///
    /// The adapter is disabled unless both `client_id` and `client_secret`
    /// are present.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the HTTP client cannot be built.
    pub fn new(
        settings: SourceSettings,
        client_id: Option<String>,
        client_secret: Option<String>,
    ) -> Result<Self, SourceError> {
        Self::with_base_urls(
            settings,
            client_id,
            client_secret,
            AUTH_BASE_URL,
            API_BASE_URL,
        )
    }

    /// Creates an adapter with custom token and API hosts (for wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::InvalidBaseUrl`] if either URL does not parse.
    pub fn with_base_urls(
        settings: SourceSettings,
        client_id: Option<String>,
        client_secret: Option<String>,
        auth_base_url: &str,
        api_base_url: &str,
    ) -> Result<Self, SourceError> {
        let credentials = match (client_id, client_secret) {
            (Some(id), Some(secret)) => Some((id, secret)),
            _ => None,
        };
        Ok(Self {
            client: build_client(&settings)?,
            auth_base_url: normalize_base_url(auth_base_url)?,
            api_base_url: normalize_base_url(api_base_url)?,
            settings,
            credentials,
        })
    }

    async fn fetch_token(
        &self,
        ctx: &FetchContext,
        client_id: &str,
        client_secret: &str,
    ) -> Result<String, SourceError> {
        let url = format!("{}/api/v1/access_token", self.auth_base_url);
        let auth_error = |reason: String| SourceError::Auth {
            source_name: NAME.to_owned(),
            reason,
        };

        let response = send(ctx, &self.settings, NAME, || {
            self.client
                .post(&url)
                .basic_auth(client_id, Some(client_secret))
                .form(&[("grant_type", "client_credentials")])
        })
        .await
        .map_err(|e| {
            if e.is_rate_limited() {
                e
            } else {
                auth_error(format!("token request failed: {e}"))
            }
        })?;

        if !response.status().is_success() {
            return Err(auth_error(format!(
                "token exchange failed with status {}",
                response.status()
            )));
        }

        let token: TokenResponse = read_json(response, "reddit token")
            .await
            .map_err(|e| auth_error(e.to_string()))?;
        Ok(token.access_token)
    }

    async fn fetch_listing(
        &self,
        ctx: &FetchContext,
        token: &str,
        url: &str,
        params: &[(&str, String)],
        subreddit: &str,
    ) -> Result<Listing, SourceError> {
        let response = send(ctx, &self.settings, NAME, || {
            self.client.get(url).bearer_auth(token).query(params)
        })
        .await?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(SourceError::Auth {
                source_name: NAME.to_owned(),
                reason: "access token rejected".to_owned(),
            });
        }

        read_json(response, &format!("reddit search r/{subreddit}")).await
    }

    async fn search_subreddit(
        &self,
        ctx: &FetchContext,
        token: &str,
        subreddit: &str,
        keyword: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Mention>, SourceError> {
        let url = format!("{}/r/{subreddit}/search.json", self.api_base_url);
        let mut after: Option<String> = None;
        let mut mentions = Vec::new();

        for page in 0..PAGE_COUNT {
            if ctx.is_expired() {
                break;
            }

            let mut params: Vec<(&str, String)> = vec![
                ("q", keyword.to_owned()),
                ("restrict_sr", "1".to_owned()),
                ("sort", "new".to_owned()),
                ("limit", PAGE_LIMIT.to_string()),
            ];
            if let Some(cursor) = &after {
                params.push(("after", cursor.clone()));
            }

            let listing = match self.fetch_listing(ctx, token, &url, &params, subreddit).await {
                Ok(listing) => listing,
                Err(e) if page == 0 || e.is_auth() => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        source = NAME,
                        subreddit,
                        keyword,
                        page,
                        error = %e,
                        "later page failed, keeping earlier pages"
                    );
                    break;
                }
            };

            let mut reached_cutoff = false;
            for child in listing.data.children {
                let post = child.data;
                let Some(created_at) = post_timestamp(post.created_utc) else {
                    continue;
                };
                if created_at < cutoff {
                    reached_cutoff = true;
                    continue;
                }
                let text = format!("{} {}", post.title, post.selftext).to_lowercase();
                if !contains_keyword(&text, keyword) {
                    continue;
                }
                mentions.push(to_mention(post, created_at, keyword));
            }

            after = listing.data.after;
            if reached_cutoff || after.is_none() {
                break;
            }
        }

        Ok(mentions)
    }
}

#[allow(clippy::cast_possible_truncation)]
fn post_timestamp(created_utc: f64) -> Option<DateTime<Utc>> {
    if !created_utc.is_finite() {
        return None;
    }
    DateTime::from_timestamp(created_utc.trunc() as i64, 0)
}

fn to_mention(post: Post, created_at: DateTime<Utc>, keyword: &str) -> Mention {
    Mention {
        id: format!("reddit_{}", post.id),
        source: NAME.to_owned(),
        platform: format!("r/{}", post.subreddit),
        title: post.title,
        content: post.selftext,
        author: post.author,
        url: format!("https://reddit.com{}", post.permalink),
        created_at,
        score: post.score,
        comment_count: post.num_comments,
        sentiment: None,
        keywords: vec![keyword.to_owned()],
        relevance: None,
    }
}

#[async_trait]
impl MentionSource for RedditSource {
    fn name(&self) -> &'static str {
        NAME
    }

    fn is_enabled(&self) -> bool {
        self.credentials.is_some()
    }

    async fn fetch_mentions(
        &self,
        ctx: &FetchContext,
        keywords: &[String],
        window: Duration,
    ) -> Result<Vec<Mention>, SourceError> {
        let Some((client_id, client_secret)) = &self.credentials else {
            tracing::debug!(source = NAME, "disabled, missing credentials");
            return Ok(Vec::new());
        };

        let token = match self.fetch_token(ctx, client_id, client_secret).await {
            Ok(token) => token,
            Err(e) if e.is_rate_limited() => {
                tracing::warn!(source = NAME, error = %e, "token request rate limited, skipping run");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };
        let cutoff = cutoff(window);
        let mut mentions = Vec::new();

        'keywords: for keyword in keywords {
            for subreddit in SUBREDDITS {
                if ctx.is_expired() {
                    tracing::warn!(source = NAME, "deadline reached, returning partial results");
                    break 'keywords;
                }

                match self
                    .search_subreddit(ctx, &token, subreddit, keyword, cutoff)
                    .await
                {
                    Ok(found) => mentions.extend(found),
                    Err(e @ SourceError::Auth { .. }) => return Err(e),
                    Err(e) if e.is_rate_limited() => {
                        tracing::warn!(source = NAME, subreddit, keyword = keyword.as_str(), "rate limited, skipping");
                    }
                    Err(e) => {
                        tracing::warn!(
                            source = NAME,
                            subreddit,
                            keyword = keyword.as_str(),
                            error = %e,
                            "subreddit search failed"
                        );
                    }
                }
            }
        }

        dedup_by_id(&mut mentions);
        tracing::info!(source = NAME, count = mentions.len(), "fetched mentions");
        Ok(mentions)
    }
}
