//! Keyword-context relevance filter.

use mentionbot_core::{Mention, RelevanceRules};

fn contains_any<'a>(text: &str, terms: &'a [String]) -> Option<&'a str> {
    terms
        .iter()
        .find(|t| text.contains(t.as_str()))
        .map(String::as_str)
}

/// Separates true topical matches from keyword collisions.
///
/// Checks run in a fixed order over `lowercase(title + " " + content)`:
/// 1. a negative term rejects the mention outright;
/// 2. a primary term accepts it;
/// 3. technical sources accept it when a core term and a secondary term are
///    both present;
/// 4. everything else is rejected.
#[derive(Debug, Clone, Default)]
pub struct RelevanceFilter {
    rules: RelevanceRules,
}

impl RelevanceFilter {
    /// `rules` terms must already be lowercased (see `mentionbot_core::load_rules`).
    #[must_use]
    pub fn new(rules: RelevanceRules) -> Self {
        Self { rules }
    }

    #[must_use]
    pub fn is_relevant(&self, mention: &Mention) -> bool {
        let text = mention.searchable_text();

        if let Some(term) = contains_any(&text, &self.rules.negative) {
            tracing::trace!(id = %mention.id, term, "rejected by negative term");
            return false;
        }

        if contains_any(&text, &self.rules.primary).is_some() {
            return true;
        }

        if self
            .rules
            .technical_sources
            .iter()
            .any(|s| s == &mention.source)
        {
            return contains_any(&text, &self.rules.core).is_some()
                && contains_any(&text, &self.rules.secondary).is_some();
        }

        false
    }

    /// Keep only relevant mentions, preserving order.
    #[must_use]
    pub fn filter(&self, mentions: Vec<Mention>) -> Vec<Mention> {
        mentions.into_iter().filter(|m| self.is_relevant(m)).collect()
    }
}
