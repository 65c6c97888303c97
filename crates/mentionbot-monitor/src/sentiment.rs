//! Word-list sentiment scorer.

use mentionbot_core::{Mention, Sentiment, SentimentRules};

#[derive(Debug, Clone, Default)]
pub struct SentimentScorer {
    rules: SentimentRules,
}

impl SentimentScorer {
    #[must_use]
    pub fn new(rules: SentimentRules) -> Self {
        Self { rules }
    }

    /// Counts how many positive and negative words occur in `text` (each
    /// word at most once). The larger count wins; ties are neutral.
    #[must_use]
    pub fn score(&self, text: &str) -> Sentiment {
        let text = text.to_lowercase();
        let count = |words: &[String]| words.iter().filter(|w| text.contains(w.as_str())).count();

        let positive = count(&self.rules.positive);
        let negative = count(&self.rules.negative);

        match positive.cmp(&negative) {
            std::cmp::Ordering::Greater => Sentiment::Positive,
            std::cmp::Ordering::Less => Sentiment::Negative,
            std::cmp::Ordering::Equal => Sentiment::Neutral,
        }
    }

    /// Score the `content` of every mention that has no sentiment yet.
    pub fn score_unset(&self, mentions: &mut [Mention]) {
        for mention in mentions.iter_mut().filter(|m| m.sentiment.is_none()) {
            mention.sentiment = Some(self.score(&mention.content));
        }
    }
}
