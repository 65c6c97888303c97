//! Platform adapters that turn keyword searches into mentions.

pub mod error;
pub mod hackernews;
pub mod http;
pub mod medium;
mod rate_limit;
pub mod reddit;
pub mod registry;
pub mod source;
pub mod stackoverflow;
mod text;
pub mod twitter;
pub mod youtube;

pub use error::SourceError;
pub use hackernews::HackerNewsSource;
pub use http::SourceSettings;
pub use medium::MediumSource;
pub use reddit::RedditSource;
pub use registry::build_sources;
pub use source::{cutoff, dedup_by_id, FetchContext, MentionSource};
pub use stackoverflow::StackOverflowSource;
pub use twitter::TwitterSource;
pub use youtube::YouTubeSource;
