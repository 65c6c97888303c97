//! Urgency classifier for the out-of-band check.

use mentionbot_core::{Mention, UrgencyRules};

use crate::relevance::RelevanceFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrgencyCategory {
    Security,
    Breaking,
    HighImpact,
}

impl UrgencyCategory {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            UrgencyCategory::Security => "security",
            UrgencyCategory::Breaking => "breaking",
            UrgencyCategory::HighImpact => "high-impact",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct UrgencyClassifier {
    rules: UrgencyRules,
}

impl UrgencyClassifier {
    #[must_use]
    pub fn new(rules: UrgencyRules) -> Self {
        Self { rules }
    }

    /// First matching category and term, checked security, then breaking,
    /// then high-impact.
    #[must_use]
    pub fn classify(&self, mention: &Mention) -> Option<(UrgencyCategory, &str)> {
        let text = mention.searchable_text();
        [
            (UrgencyCategory::Security, &self.rules.security),
            (UrgencyCategory::Breaking, &self.rules.breaking),
            (UrgencyCategory::HighImpact, &self.rules.high_impact),
        ]
        .into_iter()
        .find_map(|(category, terms)| {
            terms
                .iter()
                .find(|t| text.contains(t.as_str()))
                .map(|t| (category, t.as_str()))
        })
    }

    #[must_use]
    pub fn is_urgent(&self, mention: &Mention) -> bool {
        match self.classify(mention) {
            Some((category, term)) => {
                tracing::debug!(
                    id = %mention.id,
                    category = category.as_str(),
                    term,
                    title = %mention.title,
                    "urgent mention detected"
                );
                true
            }
            None => false,
        }
    }
}

/// Alert only on mentions that are both on-topic and urgent.
#[must_use]
pub fn should_alert(
    relevance: &RelevanceFilter,
    urgency: &UrgencyClassifier,
    mention: &Mention,
) -> bool {
    relevance.is_relevant(mention) && urgency.is_urgent(mention)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn mention(source: &str, title: &str, content: &str) -> Mention {
        Mention {
            id: "m1".to_string(),
            source: source.to_string(),
            platform: source.to_string(),
            title: title.to_string(),
            content: content.to_string(),
            author: "a".to_string(),
            url: "https://example.com".to_string(),
            created_at: Utc::now(),
            score: 0,
            comment_count: 0,
            sentiment: None,
            keywords: Vec::new(),
            relevance: None,
        }
    }

    #[test]
    fn categories_are_reported_in_order() {
        let classifier = UrgencyClassifier::default();
        let m = mention("reddit", "CVE-2024-1234 exploit", "service outage");
        assert_eq!(
            classifier.classify(&m),
            Some((UrgencyCategory::Security, "cve"))
        );

        let m = mention("reddit", "Azure Kubernetes Service", "service outage in westeurope");
        assert_eq!(
            classifier.classify(&m).map(|(c, _)| c),
            Some(UrgencyCategory::Breaking)
        );

        let m = mention("reddit", "Service retirement notice", "");
        assert_eq!(
            classifier.classify(&m).map(|(c, _)| c),
            Some(UrgencyCategory::HighImpact)
        );
    }

    #[test]
    fn plain_mention_is_not_urgent() {
        let classifier = UrgencyClassifier::default();
        assert!(!classifier.is_urgent(&mention("reddit", "AKS tips", "node pool sizing")));
    }

    #[test]
    fn urgency_without_relevance_does_not_alert() {
        let relevance = RelevanceFilter::default();
        let urgency = UrgencyClassifier::default();
        let m = mention("youtube", "Cyber attack on a gaming server", "ransomware");
        assert!(urgency.is_urgent(&m));
        assert!(!relevance.is_relevant(&m));
        assert!(!should_alert(&relevance, &urgency, &m));
    }

    #[test]
    fn relevant_and_urgent_alerts() {
        let relevance = RelevanceFilter::default();
        let urgency = UrgencyClassifier::default();
        let m = mention(
            "stackoverflow",
            "Azure Kubernetes Service security patch",
            "apply the hotfix now",
        );
        assert!(should_alert(&relevance, &urgency, &m));
    }
}
