//! Medium adapter over public tag RSS feeds.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mentionbot_core::Mention;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::Client;
use sha2::{Digest, Sha256};

use crate::error::SourceError;
use crate::http::{build_client, normalize_base_url, send, SourceSettings};
use crate::source::{cutoff, dedup_by_id, FetchContext, MentionSource};
use crate::text::{contains_keyword, strip_html, truncate_chars};

const NAME: &str = "medium";
const DEFAULT_BASE_URL: &str = "https://medium.com";
const TAG_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-');
const MAX_CONTENT_CHARS: usize = 2000;

/// One `<item>` from a feed, before keyword and window filtering.
#[derive(Debug, Default, Clone, PartialEq)]
pub(crate) struct FeedEntry {
    pub(crate) title: String,
    pub(crate) link: String,
    pub(crate) author: String,
    pub(crate) published: Option<DateTime<Utc>>,
    pub(crate) content: String,
}

/// A tag feed to read and the keyword that asked for it, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
struct TagRequest {
    tag: String,
    keyword: Option<String>,
}

pub struct MediumSource {
    client: Client,
    settings: SourceSettings,
    extra_tags: Vec<String>,
    base_url: String,
}

impl MediumSource {
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the HTTP client cannot be built.
    pub fn new(settings: SourceSettings, extra_tags: Vec<String>) -> Result<Self, SourceError> {
        Self::with_base_url(settings, extra_tags, DEFAULT_BASE_URL)
    }

    /// # Errors
    ///
    /// Returns [`SourceError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn with_base_url(
        settings: SourceSettings,
        extra_tags: Vec<String>,
        base_url: &str,
    ) -> Result<Self, SourceError> {
        Ok(Self {
            client: build_client(&settings)?,
            base_url: normalize_base_url(base_url)?,
            settings,
            extra_tags,
        })
    }

    async fn fetch_feed(&self, ctx: &FetchContext, tag: &str) -> Result<Vec<FeedEntry>, SourceError> {
        let url = format!(
            "{}/feed/tag/{}",
            self.base_url,
            utf8_percent_encode(tag, TAG_SEGMENT)
        );
        let response = send(ctx, &self.settings, NAME, || self.client.get(&url)).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::UnexpectedStatus {
                status: status.as_u16(),
                url,
            });
        }
        let body = response.text().await?;
        parse_feed(&body).map_err(|reason| SourceError::Feed { url, reason })
    }
}

/// Lowercase, hyphenated tag slug for a keyword (`"Azure Kubernetes"` →
/// `"azure-kubernetes"`).
fn tag_slug(keyword: &str) -> String {
    keyword
        .to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Keyword tags first, then the configured extra tags, each tag once.
fn tag_requests(keywords: &[String], extra_tags: &[String]) -> Vec<TagRequest> {
    let mut seen = HashSet::new();
    let mut requests = Vec::new();
    for keyword in keywords {
        let tag = tag_slug(keyword);
        if !tag.is_empty() && seen.insert(tag.clone()) {
            requests.push(TagRequest {
                tag,
                keyword: Some(keyword.clone()),
            });
        }
    }
    for extra in extra_tags {
        let tag = tag_slug(extra);
        if !tag.is_empty() && seen.insert(tag.clone()) {
            requests.push(TagRequest { tag, keyword: None });
        }
    }
    requests
}

fn mention_id(link: &str) -> String {
    let digest = format!("{:x}", Sha256::digest(link.as_bytes()));
    format!("medium_{}", &digest[..16])
}

/// Converts a feed entry into a mention.
///
/// Entries from a keyword's own tag feed are attributed to that keyword.
/// Entries from extra tags need at least one keyword in their text.
fn to_mention(
    entry: FeedEntry,
    request: &TagRequest,
    keywords: &[String],
    cutoff: DateTime<Utc>,
) -> Option<Mention> {
    if entry.link.is_empty() || entry.title.is_empty() {
        return None;
    }
    let published = entry.published?;
    if published < cutoff {
        return None;
    }

    let haystack = format!("{} {}", entry.title, entry.content).to_lowercase();
    let mut matched: Vec<String> = keywords
        .iter()
        .filter(|k| contains_keyword(&haystack, k))
        .cloned()
        .collect();
    if let Some(keyword) = &request.keyword {
        if !matched.contains(keyword) {
            matched.insert(0, keyword.clone());
        }
    }
    if matched.is_empty() {
        return None;
    }

    Some(Mention {
        id: mention_id(&entry.link),
        source: NAME.to_owned(),
        platform: "Medium".to_owned(),
        content: if entry.content.is_empty() {
            entry.title.clone()
        } else {
            truncate_chars(&entry.content, MAX_CONTENT_CHARS)
        },
        title: entry.title,
        author: if entry.author.is_empty() {
            "Medium Author".to_owned()
        } else {
            entry.author
        },
        url: entry.link,
        created_at: published,
        score: 0,
        comment_count: 0,
        sentiment: None,
        keywords: matched,
        relevance: None,
    })
}

/// Parse an RSS document into feed entries.
///
/// `<content:encoded>` wins over `<description>` for the body; both are
/// stripped of HTML.
pub(crate) fn parse_feed(xml: &str) -> Result<Vec<FeedEntry>, String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut in_item = false;
    let mut current_tag = String::new();
    let mut entry = FeedEntry::default();
    let mut description = String::new();
    let mut encoded = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                if name == "item" {
                    in_item = true;
                    entry = FeedEntry::default();
                    description.clear();
                    encoded.clear();
                }
                current_tag = name;
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                if name == "item" && in_item {
                    in_item = false;
                    let body = if encoded.is_empty() { &description } else { &encoded };
                    entry.content = strip_html(body);
                    entries.push(std::mem::take(&mut entry));
                }
                current_tag.clear();
            }
            Ok(Event::Text(e)) => {
                if in_item {
                    let text = e.unescape().map_err(|e| e.to_string())?.into_owned();
                    apply_field(&current_tag, text, &mut entry, &mut description, &mut encoded);
                }
            }
            Ok(Event::CData(e)) => {
                if in_item {
                    let text = String::from_utf8_lossy(e.as_ref()).into_owned();
                    apply_field(&current_tag, text, &mut entry, &mut description, &mut encoded);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.to_string()),
            _ => {}
        }
    }

    Ok(entries)
}

fn apply_field(
    tag: &str,
    text: String,
    entry: &mut FeedEntry,
    description: &mut String,
    encoded: &mut String,
) {
    match tag {
        "title" => entry.title = strip_html(&text),
        "link" => entry.link = text.trim().to_owned(),
        "dc:creator" | "author" => entry.author = text.trim().to_owned(),
        "pubDate" => {
            entry.published = DateTime::parse_from_rfc2822(text.trim())
                .ok()
                .map(|d| d.with_timezone(&Utc));
        }
        "description" => description.push_str(&text),
        "content:encoded" => encoded.push_str(&text),
        _ => {}
    }
}

#[async_trait]
impl MentionSource for MediumSource {
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
        let mut mentions = Vec::new();

        for request in tag_requests(keywords, &self.extra_tags) {
            if ctx.is_expired() {
                tracing::warn!(source = NAME, "deadline reached, returning partial results");
                break;
            }

            match self.fetch_feed(ctx, &request.tag).await {
                Ok(entries) => mentions.extend(
                    entries
                        .into_iter()
                        .filter_map(|e| to_mention(e, &request, keywords, cutoff)),
                ),
                Err(e) if e.is_rate_limited() => {
                    tracing::warn!(source = NAME, tag = request.tag.as_str(), "rate limited, skipping tag");
                }
                Err(e) => {
                    tracing::warn!(source = NAME, tag = request.tag.as_str(), error = %e, "tag feed failed");
                }
            }
        }

        dedup_by_id(&mut mentions);
        tracing::info!(source = NAME, count = mentions.len(), "fetched mentions");
        Ok(mentions)
    }
}
