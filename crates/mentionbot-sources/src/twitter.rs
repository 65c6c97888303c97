//! X/Twitter adapter over the v2 recent-search API.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use mentionbot_core::Mention;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::error::SourceError;
use crate::http::{build_client, normalize_base_url, read_json, send, SourceSettings};
use crate::source::{cutoff, dedup_by_id, FetchContext, MentionSource};

const NAME: &str = "twitter";
const DEFAULT_BASE_URL: &str = "https://api.twitter.com";
const MAX_PAGES: usize = 2;
const TWEET_FIELDS: &str = "created_at,author_id,public_metrics,referenced_tweets";
/// Recent search only reaches back seven days.
const MAX_LOOKBACK: Duration = Duration::from_secs(7 * 24 * 3600 - 60);

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<Tweet>,
    meta: Option<Meta>,
}

#[derive(Debug, Deserialize)]
struct Meta {
    next_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Tweet {
    id: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    author_id: String,
    created_at: Option<DateTime<Utc>>,
    public_metrics: Option<PublicMetrics>,
    #[serde(default)]
    referenced_tweets: Vec<ReferencedTweet>,
}

#[derive(Debug, Default, Deserialize)]
struct PublicMetrics {
    #[serde(default)]
    like_count: i64,
    #[serde(default)]
    reply_count: i64,
}

#[derive(Debug, Deserialize)]
struct ReferencedTweet {
    #[serde(rename = "type")]
    kind: String,
}

impl Tweet {
    fn is_retweet(&self) -> bool {
        self.referenced_tweets.iter().any(|r| r.kind == "retweeted")
    }
}

pub struct TwitterSource {
    client: Client,
    settings: SourceSettings,
    bearer_token: Option<String>,
    keyword_delay: Duration,
    base_url: String,
}

impl TwitterSource {
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the HTTP client cannot be built.
    pub fn new(
        settings: SourceSettings,
        bearer_token: Option<String>,
        keyword_delay: Duration,
    ) -> Result<Self, SourceError> {
        Self::with_base_url(settings, bearer_token, keyword_delay, DEFAULT_BASE_URL)
    }

    /// # Errors
    ///
    /// Returns [`SourceError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn with_base_url(
        settings: SourceSettings,
        bearer_token: Option<String>,
        keyword_delay: Duration,
        base_url: &str,
    ) -> Result<Self, SourceError> {
        Ok(Self {
            client: build_client(&settings)?,
            base_url: normalize_base_url(base_url)?,
            settings,
            bearer_token,
            keyword_delay,
        })
    }

    async fn fetch_page(
        &self,
        ctx: &FetchContext,
        token: &str,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<SearchResponse, SourceError> {
        let response = send(ctx, &self.settings, NAME, || {
            self.client.get(url).bearer_auth(token).query(params)
        })
        .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(SourceError::Auth {
                source_name: NAME.to_owned(),
                reason: "bearer token rejected".to_owned(),
            });
        }

        read_json(response, "twitter recent search").await
    }

    async fn search(
        &self,
        ctx: &FetchContext,
        token: &str,
        keyword: &str,
        query: &str,
        start_time: DateTime<Utc>,
    ) -> Result<Vec<Mention>, SourceError> {
        let url = format!("{}/2/tweets/search/recent", self.base_url);
        let start = start_time.to_rfc3339_opts(SecondsFormat::Secs, true);
        let mut next_token: Option<String> = None;
        let mut mentions = Vec::new();

        for page_no in 0..MAX_PAGES {
            if ctx.is_expired() {
                break;
            }

            let mut params: Vec<(&str, String)> = vec![
                ("query", query.to_owned()),
                ("start_time", start.clone()),
                ("max_results", "100".to_owned()),
                ("tweet.fields", TWEET_FIELDS.to_owned()),
            ];
            if let Some(t) = &next_token {
                params.push(("next_token", t.clone()));
            }

            let page = match self.fetch_page(ctx, token, &url, &params).await {
                Ok(page) => page,
                Err(e) if page_no == 0 || e.is_auth() => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        source = NAME,
                        keyword,
                        page = page_no,
                        error = %e,
                        "later page failed, keeping earlier pages"
                    );
                    break;
                }
            };
            mentions.extend(
                page.data
                    .into_iter()
                    .filter(|t| !t.is_retweet())
                    .filter_map(|t| to_mention(t, keyword)),
            );

            next_token = page.meta.and_then(|m| m.next_token);
            if next_token.is_none() {
                break;
            }
        }

        Ok(mentions)
    }
}

/// Builds the search query for `keyword`, or `None` when an earlier query in
/// this run already covers it.
fn build_search_query(keyword: &str, searched: &HashSet<String>) -> Option<String> {
    let lower = keyword.trim().to_lowercase();
    match lower.as_str() {
        "aks" => Some(format!(
            r#"("{keyword}" OR "Azure Kubernetes Service") (azure OR kubernetes OR microsoft OR container OR k8s) -rifle -gun -weapon -firearm -AK47"#
        )),
        "azure kubernetes service" => {
            if searched.contains("aks") {
                None
            } else {
                Some(format!(r#""{keyword}" -rifle -gun -weapon"#))
            }
        }
        "azure kubernetes fleet manager" | "kubefleet" => {
            if searched.contains("azure kubernetes fleet manager") || searched.contains("kubefleet") {
                None
            } else {
                Some(
                    r#"("Azure Kubernetes Fleet Manager" OR "KubeFleet" OR "kube fleet") (azure OR kubernetes)"#
                        .to_owned(),
                )
            }
        }
        "kaito" => Some(format!(
            r#""{keyword}" (kubernetes OR k8s OR azure OR "AI inference")"#
        )),
        "azure container service" => Some(format!(r#""{keyword}" (azure OR container OR microsoft)"#)),
        _ => Some(format!(r#""{keyword}""#)),
    }
}

fn to_mention(tweet: Tweet, keyword: &str) -> Option<Mention> {
    let created_at = tweet.created_at?;
    let metrics = tweet.public_metrics.unwrap_or_default();
    Some(Mention {
        url: format!("https://twitter.com/i/status/{}", tweet.id),
        id: format!("twitter_{}", tweet.id),
        source: NAME.to_owned(),
        platform: "X.com (Twitter)".to_owned(),
        title: String::new(),
        content: tweet.text,
        author: tweet.author_id,
        created_at,
        score: metrics.like_count,
        comment_count: metrics.reply_count,
        sentiment: None,
        keywords: vec![keyword.to_owned()],
        relevance: None,
    })
}

#[async_trait]
impl MentionSource for TwitterSource {
    fn name(&self) -> &'static str {
        NAME
    }

    fn is_enabled(&self) -> bool {
        self.bearer_token.is_some()
    }

    async fn fetch_mentions(
        &self,
        ctx: &FetchContext,
        keywords: &[String],
        window: Duration,
    ) -> Result<Vec<Mention>, SourceError> {
        let Some(token) = &self.bearer_token else {
            tracing::debug!(source = NAME, "disabled, missing bearer token");
            return Ok(Vec::new());
        };

        let start_time = cutoff(window.min(MAX_LOOKBACK));
        let mut searched: HashSet<String> = HashSet::new();
        let mut mentions = Vec::new();

        for keyword in keywords {
            let Some(query) = build_search_query(keyword, &searched) else {
                tracing::debug!(source = NAME, keyword = keyword.as_str(), "covered by an earlier query");
                continue;
            };

            if !searched.is_empty() && !ctx.pause(self.keyword_delay).await {
                tracing::warn!(source = NAME, "deadline reached, returning partial results");
                break;
            }
            if ctx.is_expired() {
                break;
            }

            match self.search(ctx, token, keyword, &query, start_time).await {
                Ok(found) => {
                    tracing::debug!(source = NAME, keyword = keyword.as_str(), count = found.len(), "keyword searched");
                    mentions.extend(found);
                }
                Err(e @ SourceError::Auth { .. }) => return Err(e),
                Err(SourceError::RateLimited { retry_after_secs, .. }) => {
                    tracing::warn!(
                        source = NAME,
                        keyword = keyword.as_str(),
                        retry_after_secs,
                        "rate limited, skipping keyword"
                    );
                }
                Err(e) => {
                    tracing::warn!(source = NAME, keyword = keyword.as_str(), error = %e, "keyword search failed");
                }
            }
            searched.insert(keyword.trim().to_lowercase());
        }

        dedup_by_id(&mut mentions);
        tracing::info!(source = NAME, count = mentions.len(), "fetched mentions");
        Ok(mentions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aks_query_excludes_weapons() {
        let q = build_search_query("AKS", &HashSet::new()).unwrap();
        assert!(q.contains(r#""Azure Kubernetes Service""#));
        assert!(q.contains("-rifle"));
        assert!(q.contains("-AK47"));
    }

    #[test]
    fn azure_kubernetes_service_skipped_after_aks() {
        let mut searched = HashSet::new();
        assert!(build_search_query("Azure Kubernetes Service", &searched).is_some());
        searched.insert("aks".to_owned());
        assert!(build_search_query("Azure Kubernetes Service", &searched).is_none());
    }

    #[test]
    fn fleet_aliases_share_one_query() {
        let mut searched = HashSet::new();
        let first = build_search_query("KubeFleet", &searched).unwrap();
        assert!(first.contains("Fleet Manager"));
        searched.insert("kubefleet".to_owned());
        assert!(build_search_query("Azure Kubernetes Fleet Manager", &searched).is_none());
    }

    #[test]
    fn unknown_keywords_are_quoted() {
        assert_eq!(
            build_search_query("az aks", &HashSet::new()).as_deref(),
            Some(r#""az aks""#)
        );
    }

    #[test]
    fn retweets_are_detected() {
        let tweet: Tweet = serde_json::from_value(serde_json::json!({
            "id": "1",
            "text": "RT AKS",
            "referenced_tweets": [{"type": "retweeted", "id": "0"}]
        }))
        .unwrap();
        assert!(tweet.is_retweet());
    }
}
