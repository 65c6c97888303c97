//! Report assembly.

use std::collections::BTreeMap;

use chrono::Utc;
use mentionbot_core::{Mention, Report, ReportKind, ReportSummary};

const TOP_SOURCES: usize = 5;

/// Period label used for urgent reports.
pub const URGENT_PERIOD: &str = "urgent check";

#[derive(Debug, Clone)]
pub struct ReportBuilder {
    period: String,
}

impl ReportBuilder {
    #[must_use]
    pub fn new(period: impl Into<String>) -> Self {
        Self {
            period: period.into(),
        }
    }

    /// Build a scheduled report. Mentions keep their order.
    #[must_use]
    pub fn build(&self, mentions: Vec<Mention>) -> Report {
        assemble(self.period.clone(), ReportKind::Scheduled, mentions, None, None)
    }

    /// Build the distinctly labelled report sent by the urgent check.
    #[must_use]
    pub fn urgent(mentions: Vec<Mention>, subject: &str) -> Report {
        let title = format!("URGENT {subject} Mentions Alert");
        let description = format!(
            "Found {} urgent {subject}-related mentions requiring immediate attention",
            mentions.len()
        );
        assemble(
            URGENT_PERIOD.to_string(),
            ReportKind::Urgent,
            mentions,
            Some(title),
            Some(description),
        )
    }
}

fn assemble(
    period: String,
    kind: ReportKind,
    mentions: Vec<Mention>,
    title: Option<String>,
    description: Option<String>,
) -> Report {
    let mut sources: BTreeMap<String, usize> = BTreeMap::new();
    let mut sentiment: BTreeMap<String, usize> = BTreeMap::new();
    let mut first_seen: Vec<&str> = Vec::new();

    for mention in &mentions {
        let count = sources.entry(mention.source.clone()).or_insert(0);
        if *count == 0 {
            first_seen.push(&mention.source);
        }
        *count += 1;
        *sentiment
            .entry(mention.sentiment_label().to_string())
            .or_insert(0) += 1;
    }

    let top_sources = top_sources(&first_seen, &sources);

    Report {
        generated_at: Utc::now(),
        period,
        total_mentions: mentions.len(),
        summary: ReportSummary {
            sources,
            sentiment,
            top_sources,
            kind,
            title,
            description,
        },
        mentions,
    }
}

/// Up to five `"name (count)"` entries, highest count first. Ties keep
/// first-seen order.
fn top_sources(first_seen: &[&str], counts: &BTreeMap<String, usize>) -> Vec<String> {
    let mut ranked: Vec<(&str, usize)> = first_seen
        .iter()
        .map(|name| (*name, counts.get(*name).copied().unwrap_or(0)))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked
        .into_iter()
        .take(TOP_SOURCES)
        .map(|(name, count)| format!("{name} ({count})"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mentionbot_core::Sentiment;

    fn mention(id: &str, source: &str, sentiment: Option<Sentiment>) -> Mention {
        Mention {
            id: id.to_string(),
            source: source.to_string(),
            platform: source.to_string(),
            title: String::new(),
            content: String::new(),
            author: "a".to_string(),
            url: String::new(),
            created_at: Utc::now(),
            score: 0,
            comment_count: 0,
            sentiment,
            keywords: Vec::new(),
            relevance: None,
        }
    }

    #[test]
    fn counts_sources_and_sentiment() {
        let report = ReportBuilder::new("weekly").build(vec![
            mention("1", "reddit", Some(Sentiment::Positive)),
            mention("2", "reddit", Some(Sentiment::Negative)),
            mention("3", "stackoverflow", Some(Sentiment::Neutral)),
        ]);

        assert_eq!(report.total_mentions, 3);
        assert_eq!(report.period, "weekly");
        assert_eq!(report.summary.kind, ReportKind::Scheduled);
        assert_eq!(report.summary.sources["reddit"], 2);
        assert_eq!(report.summary.sources["stackoverflow"], 1);
        assert_eq!(report.summary.sources.len(), 2);
        for label in ["positive", "negative", "neutral"] {
            assert_eq!(report.summary.sentiment[label], 1, "label {label}");
        }
        assert_eq!(report.summary.top_sources, vec!["reddit (2)", "stackoverflow (1)"]);
    }

    #[test]
    fn totals_match_for_any_mix() {
        let mentions: Vec<_> = (0..17)
            .map(|i| {
                let source = ["reddit", "youtube", "medium"][i % 3];
                let sentiment = match i % 4 {
                    0 => None,
                    1 => Some(Sentiment::Positive),
                    2 => Some(Sentiment::Negative),
                    _ => Some(Sentiment::Neutral),
                };
                mention(&i.to_string(), source, sentiment)
            })
            .collect();
        let report = ReportBuilder::new("daily").build(mentions);

        assert_eq!(report.total_mentions, report.mentions.len());
        assert_eq!(report.summary.sources.values().sum::<usize>(), 17);
        assert_eq!(report.summary.sentiment.values().sum::<usize>(), 17);
        assert_eq!(report.summary.sentiment["unscored"], 5);
    }

    #[test]
    fn empty_report_is_valid() {
        let report = ReportBuilder::new("daily").build(Vec::new());
        assert_eq!(report.total_mentions, 0);
        assert!(report.summary.sources.is_empty());
        assert!(report.summary.top_sources.is_empty());
    }

    #[test]
    fn top_sources_caps_at_five_and_keeps_first_seen_ties() {
        let names = ["medium", "youtube", "twitter", "reddit", "hackernews", "stackoverflow"];
        let mut mentions = Vec::new();
        for (i, name) in names.iter().enumerate() {
            mentions.push(mention(&format!("{name}-{i}"), name, None));
        }
        mentions.push(mention("extra", "reddit", None));

        let report = ReportBuilder::new("daily").build(mentions);
        assert_eq!(
            report.summary.top_sources,
            vec![
                "reddit (2)",
                "medium (1)",
                "youtube (1)",
                "twitter (1)",
                "hackernews (1)"
            ]
        );
    }

    #[test]
    fn mentions_keep_arrival_order() {
        let report = ReportBuilder::new("daily").build(vec![
            mention("b", "reddit", None),
            mention("a", "medium", None),
        ]);
        let ids: Vec<_> = report.mentions.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn urgent_report_is_labelled() {
        let report = ReportBuilder::urgent(vec![mention("1", "reddit", None)], "AKS");
        assert!(report.is_urgent());
        assert_eq!(report.period, URGENT_PERIOD);
        assert_eq!(report.summary.title.as_deref(), Some("URGENT AKS Mentions Alert"));
        assert!(report
            .summary
            .description
            .as_deref()
            .is_some_and(|d| d.starts_with("Found 1 urgent")));
    }
}
