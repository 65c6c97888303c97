use std::sync::Arc;
use std::time::Duration;

use mentionbot_core::AppConfig;

use crate::error::SourceError;
use crate::hackernews::HackerNewsSource;
use crate::http::SourceSettings;
use crate::medium::MediumSource;
use crate::reddit::RedditSource;
use crate::source::MentionSource;
use crate::stackoverflow::StackOverflowSource;
use crate::twitter::TwitterSource;
use crate::youtube::YouTubeSource;

/// Builds every adapter in a fixed order. Adapters without credentials are
/// included but report `is_enabled() == false`.
///
/// # Errors
///
/// Returns [`SourceError::Http`] if an HTTP client cannot be built.
pub fn build_sources(config: &AppConfig) -> Result<Vec<Arc<dyn MentionSource>>, SourceError> {
    let settings = SourceSettings::from_config(config);

    let sources: Vec<Arc<dyn MentionSource>> = vec![
        Arc::new(RedditSource::new(
            settings.clone(),
            config.reddit_client_id.clone(),
            config.reddit_client_secret.clone(),
        )?),
        Arc::new(StackOverflowSource::new(settings.clone())?),
        Arc::new(HackerNewsSource::new(settings.clone())?),
        Arc::new(TwitterSource::new(
            settings.clone(),
            config.twitter_bearer_token.clone(),
            Duration::from_secs(config.twitter_keyword_delay_secs),
        )?),
        Arc::new(YouTubeSource::new(
            settings.clone(),
            config.youtube_api_key.clone(),
        )?),
        Arc::new(MediumSource::new(settings, config.medium_extra_tags.clone())?),
    ];

    for source in &sources {
        tracing::debug!(
            source = source.name(),
            enabled = source.is_enabled(),
            "registered source"
        );
    }

    Ok(sources)
}
