//! Built-in mentions for `sample-report`.

use chrono::{Duration, Utc};
use mentionbot_core::Mention;

fn sample(
    source: &str,
    platform: &str,
    n: u32,
    title: &str,
    content: &str,
    hours_ago: i64,
    score: i64,
) -> Mention {
    Mention {
        id: format!("sample_{source}_{n}"),
        source: source.to_string(),
        platform: platform.to_string(),
        title: title.to_string(),
        content: content.to_string(),
        author: format!("{source}_user_{n}"),
        url: format!("https://example.com/{source}/{n}"),
        created_at: Utc::now() - Duration::hours(hours_ago),
        score,
        comment_count: score / 4,
        sentiment: None,
        keywords: vec!["AKS".to_string()],
        relevance: None,
    }
}

/// A small mixed batch: every sentiment and several sources. Sentiment is left
/// unset so the report scores it.
pub(crate) fn sample_mentions() -> Vec<Mention> {
    vec![
        sample(
            "reddit",
            "r/AZURE",
            1,
            "Pods in my AKS cluster cannot reach the database",
            "Connectivity problem between namespaces since the last node pool upgrade.",
            3,
            12,
        ),
        sample(
            "stackoverflow",
            "Stack Overflow",
            1,
            "Azure Kubernetes Service ingress with private endpoints",
            "Which ingress controller do you use for internal-only services?",
            5,
            40,
        ),
        sample(
            "twitter",
            "Twitter/X",
            1,
            "Moved our workloads to Azure Kubernetes Service this week",
            "Autoscaling works out of the box, great experience so far.",
            8,
            47,
        ),
        sample(
            "hackernews",
            "Hacker News",
            1,
            "KubeFleet for multi-cluster Kubernetes management",
            "Curious how this compares with other fleet managers.",
            12,
            156,
        ),
        sample(
            "youtube",
            "YouTube",
            1,
            "AKS networking deep dive",
            "Walkthrough of CNI options, network policies and egress.",
            20,
            300,
        ),
    ]
}
