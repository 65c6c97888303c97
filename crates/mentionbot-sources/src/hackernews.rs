//! Hacker News adapter over the public Firebase API.
//!
//! There is no search endpoint, so the adapter walks `newstories` and keeps
//! items whose title or text contains a keyword.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use mentionbot_core::Mention;
use reqwest::Client;
use serde::Deserialize;

use crate::error::SourceError;
use crate::http::{build_client, normalize_base_url, read_json, send, SourceSettings};
use crate::source::{cutoff, dedup_by_id, FetchContext, MentionSource};
use crate::text::{contains_keyword, strip_html};

const NAME: &str = "hackernews";
const DEFAULT_BASE_URL: &str = "https://hacker-news.firebaseio.com/v0";
const MAX_ITEMS: usize = 500;
const BATCH_SIZE: usize = 10;

#[derive(Debug, Deserialize)]
struct Item {
    id: u64,
    #[serde(default, rename = "type")]
    kind: String,
    #[serde(default)]
    by: String,
    #[serde(default)]
    time: i64,
    #[serde(default)]
    text: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    descendants: i64,
    #[serde(default)]
    deleted: bool,
    #[serde(default)]
    dead: bool,
}

pub struct HackerNewsSource {
    client: Client,
    settings: SourceSettings,
    base_url: String,
}

impl HackerNewsSource {
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

    async fn new_story_ids(&self, ctx: &FetchContext) -> Result<Vec<u64>, SourceError> {
        let url = format!("{}/newstories.json", self.base_url);
        let response = send(ctx, &self.settings, NAME, || self.client.get(&url)).await?;
        let mut ids: Vec<u64> = read_json(response, "hackernews newstories").await?;
        ids.truncate(MAX_ITEMS);
        Ok(ids)
    }

    async fn item(&self, ctx: &FetchContext, id: u64) -> Result<Option<Item>, SourceError> {
        let url = format!("{}/item/{id}.json", self.base_url);
        let response = send(ctx, &self.settings, NAME, || self.client.get(&url)).await?;
        read_json(response, &format!("hackernews item {id}")).await
    }
}

fn to_mention(item: Item, keywords: &[String], cutoff: DateTime<Utc>) -> Option<Mention> {
    if item.deleted || item.dead || item.time == 0 {
        return None;
    }
    let created_at = DateTime::from_timestamp(item.time, 0)?;
    if created_at < cutoff {
        return None;
    }

    let content = strip_html(&item.text);
    let haystack = format!("{} {content}", item.title).to_lowercase();
    let matched: Vec<String> = keywords
        .iter()
        .filter(|k| contains_keyword(&haystack, k))
        .cloned()
        .collect();
    if matched.is_empty() {
        return None;
    }

    let url = if item.kind == "story" && !item.url.is_empty() {
        item.url
    } else {
        format!("https://news.ycombinator.com/item?id={}", item.id)
    };

    Some(Mention {
        id: format!("hackernews_{}", item.id),
        source: NAME.to_owned(),
        platform: "Hacker News".to_owned(),
        title: item.title,
        content,
        author: item.by,
        url,
        created_at,
        score: item.score,
        comment_count: item.descendants,
        sentiment: None,
        keywords: matched,
        relevance: None,
    })
}

#[async_trait]
impl MentionSource for HackerNewsSource {
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
        let cutoff = cutoff(window);
        let ids = match self.new_story_ids(ctx).await {
            Ok(ids) => ids,
            Err(e) if e.is_rate_limited() => {
                tracing::warn!(source = NAME, error = %e, "story list rate limited, skipping run");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };
        let mut mentions = Vec::new();

        for batch in ids.chunks(BATCH_SIZE) {
            if ctx.is_expired() {
                tracing::warn!(source = NAME, "deadline reached, returning partial results");
                break;
            }

            let results = join_all(batch.iter().map(|&id| self.item(ctx, id))).await;

            let mut all_older = true;
            for (id, result) in batch.iter().zip(results) {
                match result {
                    Ok(Some(item)) => {
                        if DateTime::from_timestamp(item.time, 0).is_some_and(|t| t >= cutoff) {
                            all_older = false;
                        }
                        if let Some(mention) = to_mention(item, keywords, cutoff) {
                            mentions.push(mention);
                        }
                    }
                    Ok(None) => all_older = false,
                    Err(e) => {
                        all_older = false;
                        tracing::debug!(source = NAME, item = id, error = %e, "item fetch failed");
                    }
                }
            }

            // newstories is newest-first, so a fully stale batch ends the walk.
            if all_older {
                break;
            }
        }

        dedup_by_id(&mut mentions);
        tracing::info!(source = NAME, count = mentions.len(), "fetched mentions");
        Ok(mentions)
    }
}
