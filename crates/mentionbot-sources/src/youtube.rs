//! YouTube adapter over the Data API v3 (video search + comment threads).

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use mentionbot_core::Mention;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::SourceError;
use crate::http::{build_client, normalize_base_url, send, SourceSettings};
use crate::source::{cutoff, dedup_by_id, FetchContext, MentionSource};
use crate::text::{contains_keyword, strip_html};

const NAME: &str = "youtube";
const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";
const MAX_SEARCH_PAGES: usize = 2;
const MAX_COMMENT_VIDEOS: usize = 10;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    #[serde(default)]
    items: Vec<Video>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Video {
    id: VideoId,
    snippet: VideoSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoId {
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoSnippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    channel_title: String,
    published_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct CommentThreadsResponse {
    #[serde(default)]
    items: Vec<CommentThread>,
}

#[derive(Debug, Deserialize)]
struct CommentThread {
    id: String,
    snippet: CommentThreadSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentThreadSnippet {
    top_level_comment: TopLevelComment,
    #[serde(default)]
    total_reply_count: i64,
}

#[derive(Debug, Deserialize)]
struct TopLevelComment {
    snippet: CommentSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentSnippet {
    #[serde(default)]
    text_display: String,
    #[serde(default)]
    author_display_name: String,
    published_at: DateTime<Utc>,
    #[serde(default)]
    like_count: i64,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    errors: Vec<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    reason: String,
}

/// Mentions gathered for one keyword. `quota_exhausted` is set when the
/// shared API quota ran out partway through.
struct KeywordMentions {
    mentions: Vec<Mention>,
    quota_exhausted: bool,
}

pub struct YouTubeSource {
    client: Client,
    settings: SourceSettings,
    api_key: Option<String>,
    base_url: String,
}

impl YouTubeSource {
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the HTTP client cannot be built.
    pub fn new(settings: SourceSettings, api_key: Option<String>) -> Result<Self, SourceError> {
        Self::with_base_url(settings, api_key, DEFAULT_BASE_URL)
    }

    /// # Errors
    ///
    /// Returns [`SourceError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn with_base_url(
        settings: SourceSettings,
        api_key: Option<String>,
        base_url: &str,
    ) -> Result<Self, SourceError> {
        Ok(Self {
            client: build_client(&settings)?,
            base_url: normalize_base_url(base_url)?,
            settings,
            api_key,
        })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        ctx: &FetchContext,
        endpoint: &str,
        params: &[(&str, String)],
        context: &str,
    ) -> Result<T, SourceError> {
        let url = format!("{}/{endpoint}", self.base_url);
        let response = send(ctx, &self.settings, NAME, || {
            self.client.get(&url).query(params)
        })
        .await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(classify_error(status.as_u16(), &body, url));
        }

        serde_json::from_str(&body).map_err(|e| SourceError::Deserialize {
            context: context.to_owned(),
            source: e,
        })
    }

    async fn search_videos(
        &self,
        ctx: &FetchContext,
        api_key: &str,
        keyword: &str,
        published_after: DateTime<Utc>,
    ) -> Result<KeywordMentions, SourceError> {
        let published = published_after.to_rfc3339_opts(SecondsFormat::Secs, true);
        let mut page_token: Option<String> = None;
        let mut mentions = Vec::new();
        let mut quota_exhausted = false;

        for page_no in 0..MAX_SEARCH_PAGES {
            if ctx.is_expired() {
                break;
            }

            let mut params: Vec<(&str, String)> = vec![
                ("part", "snippet".to_owned()),
                ("q", keyword.to_owned()),
                ("type", "video".to_owned()),
                ("order", "date".to_owned()),
                ("publishedAfter", published.clone()),
                ("maxResults", "50".to_owned()),
                ("key", api_key.to_owned()),
            ];
            if let Some(token) = &page_token {
                params.push(("pageToken", token.clone()));
            }

            let page: SearchResponse = match self
                .get(ctx, "search", &params, "youtube video search")
                .await
            {
                Ok(page) => page,
                Err(e) if page_no == 0 || e.is_auth() => return Err(e),
                Err(e) => {
                    quota_exhausted = e.is_rate_limited();
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
                page.items
                    .into_iter()
                    .filter_map(|v| video_to_mention(v, keyword)),
            );

            page_token = page.next_page_token;
            if page_token.is_none() {
                break;
            }
        }

        Ok(KeywordMentions {
            mentions,
            quota_exhausted,
        })
    }

    async fn video_comments(
        &self,
        ctx: &FetchContext,
        api_key: &str,
        video_id: &str,
        keyword: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Mention>, SourceError> {
        let params = [
            ("part", "snippet".to_owned()),
            ("videoId", video_id.to_owned()),
            ("maxResults", "100".to_owned()),
            ("textFormat", "plainText".to_owned()),
            ("key", api_key.to_owned()),
        ];
        let threads: CommentThreadsResponse = self
            .get(ctx, "commentThreads", &params, "youtube comment threads")
            .await?;

        Ok(threads
            .items
            .into_iter()
            .filter(|t| t.snippet.top_level_comment.snippet.published_at >= cutoff)
            .filter(|t| {
                contains_keyword(
                    &t.snippet.top_level_comment.snippet.text_display.to_lowercase(),
                    keyword,
                )
            })
            .map(|t| comment_to_mention(t, video_id, keyword))
            .collect())
    }

    async fn fetch_keyword(
        &self,
        ctx: &FetchContext,
        api_key: &str,
        keyword: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<KeywordMentions, SourceError> {
        let mut collected = self.search_videos(ctx, api_key, keyword, cutoff).await?;
        if collected.quota_exhausted {
            return Ok(collected);
        }
        let video_ids: Vec<String> = collected
            .mentions
            .iter()
            .filter_map(|m| m.id.strip_prefix("youtube_video_").map(ToOwned::to_owned))
            .take(MAX_COMMENT_VIDEOS)
            .collect();

        for video_id in &video_ids {
            if ctx.is_expired() {
                break;
            }
            match self
                .video_comments(ctx, api_key, video_id, keyword, cutoff)
                .await
            {
                Ok(comments) => collected.mentions.extend(comments),
                Err(e) if e.is_rate_limited() => {
                    tracing::warn!(source = NAME, video_id = video_id.as_str(), "quota exhausted during comment fetch");
                    collected.quota_exhausted = true;
                    break;
                }
                Err(SourceError::UnexpectedStatus { status: 403, .. }) => {
                    tracing::debug!(source = NAME, video_id = video_id.as_str(), "comments disabled");
                }
                Err(e) => {
                    tracing::warn!(source = NAME, video_id = video_id.as_str(), error = %e, "comment fetch failed");
                }
            }
        }

        Ok(collected)
    }
}

/// Maps a non-2xx YouTube response to a `SourceError` using the reasons in
/// the error body.
fn classify_error(status: u16, body: &str, url: String) -> SourceError {
    let reasons: Vec<String> = serde_json::from_str::<ApiErrorBody>(body)
        .map(|b| b.error.errors.into_iter().map(|e| e.reason).collect())
        .unwrap_or_default();

    if reasons
        .iter()
        .any(|r| r == "quotaExceeded" || r == "rateLimitExceeded" || r == "dailyLimitExceeded")
    {
        return SourceError::RateLimited {
            source_name: NAME.to_owned(),
            retry_after_secs: None,
        };
    }
    if reasons.iter().any(|r| r == "keyInvalid" || r == "keyExpired") {
        return SourceError::Auth {
            source_name: NAME.to_owned(),
            reason: "API key rejected".to_owned(),
        };
    }
    SourceError::UnexpectedStatus { status, url }
}

fn video_to_mention(video: Video, keyword: &str) -> Option<Mention> {
    let video_id = video.id.video_id?;
    Some(Mention {
        id: format!("youtube_video_{video_id}"),
        source: NAME.to_owned(),
        platform: "YouTube".to_owned(),
        title: strip_html(&video.snippet.title),
        content: strip_html(&video.snippet.description),
        author: video.snippet.channel_title,
        url: format!("https://www.youtube.com/watch?v={video_id}"),
        created_at: video.snippet.published_at,
        score: 0,
        comment_count: 0,
        sentiment: None,
        keywords: vec![keyword.to_owned()],
        relevance: None,
    })
}

fn comment_to_mention(thread: CommentThread, video_id: &str, keyword: &str) -> Mention {
    let replies = thread.snippet.total_reply_count;
    let comment = thread.snippet.top_level_comment.snippet;
    Mention {
        id: format!("youtube_comment_{}", thread.id),
        source: NAME.to_owned(),
        platform: "YouTube Comments".to_owned(),
        title: format!("Comment on video {video_id}"),
        content: comment.text_display,
        author: comment.author_display_name,
        url: format!("https://www.youtube.com/watch?v={video_id}&lc={}", thread.id),
        created_at: comment.published_at,
        score: comment.like_count,
        comment_count: replies,
        sentiment: None,
        keywords: vec![keyword.to_owned()],
        relevance: None,
    }
}

#[async_trait]
impl MentionSource for YouTubeSource {
    fn name(&self) -> &'static str {
        NAME
    }

    fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }

    async fn fetch_mentions(
        &self,
        ctx: &FetchContext,
        keywords: &[String],
        window: Duration,
    ) -> Result<Vec<Mention>, SourceError> {
        let Some(api_key) = &self.api_key else {
            tracing::debug!(source = NAME, "disabled, missing API key");
            return Ok(Vec::new());
        };

        let cutoff = cutoff(window);
        let mut mentions = Vec::new();

        for keyword in keywords {
            if ctx.is_expired() {
                tracing::warn!(source = NAME, "deadline reached, returning partial results");
                break;
            }

            match self.fetch_keyword(ctx, api_key, keyword, cutoff).await {
                Ok(found) => {
                    mentions.extend(found.mentions);
                    if found.quota_exhausted {
                        tracing::warn!(source = NAME, keyword = keyword.as_str(), "quota exhausted, stopping");
                        break;
                    }
                }
                Err(e @ SourceError::Auth { .. }) => return Err(e),
                Err(e) if e.is_rate_limited() => {
                    // Quota is shared across keywords, so nothing else will succeed.
                    tracing::warn!(source = NAME, keyword = keyword.as_str(), "quota exhausted, stopping");
                    break;
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_errors_are_rate_limits() {
        let body = r#"{"error":{"code":403,"errors":[{"reason":"quotaExceeded"}]}}"#;
        assert!(classify_error(403, body, "u".to_owned()).is_rate_limited());
    }

    #[test]
    fn invalid_key_is_auth_error() {
        let body = r#"{"error":{"code":400,"errors":[{"reason":"keyInvalid"}]}}"#;
        assert!(matches!(
            classify_error(400, body, "u".to_owned()),
            SourceError::Auth { .. }
        ));
    }

    #[test]
    fn comments_disabled_stays_a_plain_403() {
        let body = r#"{"error":{"code":403,"errors":[{"reason":"commentsDisabled"}]}}"#;
        assert!(matches!(
            classify_error(403, body, "u".to_owned()),
            SourceError::UnexpectedStatus { status: 403, .. }
        ));
    }
}
