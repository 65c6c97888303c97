//! Stack Overflow adapter over the Stack Exchange `search/advanced` API.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mentionbot_core::Mention;
use reqwest::Client;
use serde::Deserialize;

use crate::error::SourceError;
use crate::http::{build_client, normalize_base_url, send, SourceSettings};
use crate::source::{cutoff, dedup_by_id, FetchContext, MentionSource};
use crate::text::strip_html;

const NAME: &str = "stackoverflow";
const DEFAULT_BASE_URL: &str = "https://api.stackexchange.com";
const TAGGED: &str = "azure;kubernetes;docker;containers;devops";
const PAGE_SIZE: u32 = 100;
const MAX_PAGES: u32 = 3;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<Question>,
    #[serde(default)]
    has_more: bool,
    /// Seconds the API asks us to wait before the next request to the same method.
    backoff: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error_name: Option<String>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Question {
    question_id: u64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    body: String,
    owner: Option<Owner>,
    creation_date: i64,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    answer_count: i64,
    #[serde(default)]
    link: String,
}

#[derive(Debug, Deserialize)]
struct Owner {
    display_name: Option<String>,
}

struct Page {
    mentions: Vec<Mention>,
    has_more: bool,
    backoff: Option<u64>,
}

pub struct StackOverflowSource {
    client: Client,
    settings: SourceSettings,
    base_url: String,
}

impl StackOverflowSource {
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the HTTP client cannot be built.
    pub fn new(settings: SourceSettings) -> Result<Self, SourceError> {
        Self::with_base_url(settings, DEFAULT_BASE_URL)
    }

    /// # Errors
    ///
    /// Returns [`SourceError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn with_base_url(settings: SourceSettings, base_url: &str) -> Result<Self, SourceError> {
        Ok(Self {
            client: build_client(&settings)?,
            base_url: normalize_base_url(base_url)?,
            settings,
        })
    }

    async fn fetch_page(
        &self,
        ctx: &FetchContext,
        keyword: &str,
        from: DateTime<Utc>,
        page: u32,
    ) -> Result<Page, SourceError> {
        let url = format!("{}/2.3/search/advanced", self.base_url);
        let params = [
            ("order", "desc".to_owned()),
            ("sort", "creation".to_owned()),
            ("q", keyword.to_owned()),
            ("tagged", TAGGED.to_owned()),
            ("site", "stackoverflow".to_owned()),
            ("fromdate", from.timestamp().to_string()),
            ("pagesize", PAGE_SIZE.to_string()),
            ("page", page.to_string()),
            ("filter", "withbody".to_owned()),
        ];

        let response = send(ctx, &self.settings, NAME, || {
            self.client.get(&url).query(&params)
        })
        .await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let error: Option<ErrorResponse> = serde_json::from_str(&body).ok();
            if error
                .as_ref()
                .and_then(|e| e.error_name.as_deref())
                .is_some_and(|name| name == "throttle_violation")
            {
                return Err(SourceError::RateLimited {
                    source_name: NAME.to_owned(),
                    retry_after_secs: None,
                });
            }
            tracing::debug!(
                source = NAME,
                status = status.as_u16(),
                api_message = error.and_then(|e| e.error_message).unwrap_or_default(),
                "search request rejected"
            );
            return Err(SourceError::UnexpectedStatus {
                status: status.as_u16(),
                url,
            });
        }

        let parsed: SearchResponse =
            serde_json::from_str(&body).map_err(|e| SourceError::Deserialize {
                context: format!("stackoverflow search page {page}"),
                source: e,
            })?;

        let mentions = parsed
            .items
            .into_iter()
            .filter_map(|q| to_mention(q, keyword, from))
            .collect();

        Ok(Page {
            mentions,
            has_more: parsed.has_more,
            backoff: parsed.backoff,
        })
    }

    async fn search_keyword(
        &self,
        ctx: &FetchContext,
        keyword: &str,
        from: DateTime<Utc>,
    ) -> Result<Vec<Mention>, SourceError> {
        let mut mentions = Vec::new();

        for page in 1..=MAX_PAGES {
            if ctx.is_expired() {
                break;
            }

            let result = match self.fetch_page(ctx, keyword, from, page).await {
                Ok(result) => result,
                Err(e) if page == 1 => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        source = NAME,
                        keyword,
                        page,
                        error = %e,
                        "later page failed, keeping earlier pages"
                    );
                    break;
                }
            };
            mentions.extend(result.mentions);

            if let Some(secs) = result.backoff {
                tracing::info!(source = NAME, backoff_secs = secs, "API requested backoff");
                if !ctx.pause(Duration::from_secs(secs)).await {
                    break;
                }
            }

            if !result.has_more {
                break;
            }
        }

        Ok(mentions)
    }
}

fn to_mention(question: Question, keyword: &str, cutoff: DateTime<Utc>) -> Option<Mention> {
    let created_at = DateTime::from_timestamp(question.creation_date, 0)?;
    if created_at < cutoff {
        return None;
    }
    Some(Mention {
        id: format!("stackoverflow_{}", question.question_id),
        source: NAME.to_owned(),
        platform: "Stack Overflow".to_owned(),
        title: strip_html(&question.title),
        content: strip_html(&question.body),
        author: question
            .owner
            .and_then(|o| o.display_name)
            .unwrap_or_default(),
        url: question.link,
        created_at,
        score: question.score,
        comment_count: question.answer_count,
        sentiment: None,
        keywords: vec![keyword.to_owned()],
        relevance: None,
    })
}

#[async_trait]
impl MentionSource for StackOverflowSource {
    fn name(&self) -> &'static str {
        NAME
    }

    fn is_enabled(&self) -> bool {
        true
    }

    async fn fetch_mentions(
        &self,
        ctx: &FetchContext,
        keywords: &[String],
        window: Duration,
    ) -> Result<Vec<Mention>, SourceError> {
        let from = cutoff(window);
        let mut mentions = Vec::new();

        for keyword in keywords {
            if ctx.is_expired() {
                tracing::warn!(source = NAME, "deadline reached, returning partial results");
                break;
            }

            match self.search_keyword(ctx, keyword, from).await {
                Ok(found) => mentions.extend(found),
                Err(e) if e.is_rate_limited() => {
                    tracing::warn!(source = NAME, keyword = keyword.as_str(), "throttled, skipping keyword");
                }
                Err(e) => {
                    tracing::warn!(source = NAME, keyword = keyword.as_str(), error = %e, "keyword search failed");
                }
            }
        }

        dedup_by_id(&mut mentions);
        tracing::info!(source = NAME, count = mentions.len(), "fetched mentions");
        Ok(mentions)
    }
}
