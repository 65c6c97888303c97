//! Term tables used by the relevance, urgency and sentiment classifiers.
//!
//! Defaults are compiled in. A YAML file can replace any section; sections
//! missing from the file keep their defaults. All terms are trimmed and
//! lowercased at load so the classifiers can match against lowercased text.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

const PRIMARY_TERMS: &[&str] = &[
    "azure kubernetes service",
    "azure kubernetes",
    "azure kubernetes fleet",
    "azure kubernetes fleet manager",
    "azure container service",
    "azurecr.io",
    "az aks",
    "kubefleet",
    "kaito",
];

const CORE_TERMS: &[&str] = &["aks", "azure kubernetes"];

const SECONDARY_TERMS: &[&str] = &[
    "kubernetes",
    "k8s",
    "kubectl",
    "helm",
    "cluster",
    "container",
    "pod",
    "namespace",
    "ingress",
    "nodepool",
    "node pool",
    "deployment",
];

const NEGATIVE_TERMS: &[&str] = &[
    "rifle",
    "firearm",
    "weapon",
    "ammunition",
    "caliber",
    "ak47",
    "ak-47",
    "aks-74",
    "airsoft",
    "gaming",
    "trading",
    "forex",
    "makeup",
    "cosmetics",
    "amazon",
    "aws eks",
    "amazon eks",
    "eks cluster",
    "elastic kubernetes service",
    "gke",
    "google kubernetes engine",
    "openshift",
    "rancher",
    "minikube",
    "k3s",
    "docker desktop",
];

const TECHNICAL_SOURCES: &[&str] = &["reddit", "stackoverflow", "hackernews"];

const SECURITY_TERMS: &[&str] = &[
    "security vulnerability",
    "cve",
    "exploit",
    "breach",
    "attack",
    "malware",
    "ransomware",
    "phishing",
    "zero day",
    "critical security",
    "security patch",
    "hotfix",
    "urgent update",
    "immediate action required",
];

const BREAKING_TERMS: &[&str] = &[
    "breaking change",
    "deprecated",
    "end of life",
    "sunset",
    "service outage",
    "downtime",
    "incident",
    "degraded performance",
    "api changes",
    "breaking api",
    "mandatory upgrade",
];

const HIGH_IMPACT_TERMS: &[&str] = &[
    "microsoft announcement",
    "azure announcement",
    "urgent notice",
    "action required",
    "immediate attention",
    "critical update",
    "service retirement",
    "feature retirement",
];

const POSITIVE_WORDS: &[&str] = &[
    "good",
    "great",
    "excellent",
    "love",
    "awesome",
    "fantastic",
    "helpful",
    "works",
    "solved",
    "success",
];

const NEGATIVE_WORDS: &[&str] = &[
    "bad", "terrible", "awful", "hate", "broken", "error", "fail", "problem", "issue", "bug",
];

fn owned(terms: &[&str]) -> Vec<String> {
    terms.iter().map(|t| (*t).to_string()).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelevanceRules {
    /// Strong, unambiguous terms. Any one of them makes a mention relevant.
    pub primary: Vec<String>,
    /// Abbreviations that need ecosystem context on technical sources.
    pub core: Vec<String>,
    /// Broader ecosystem terms paired with a core term.
    pub secondary: Vec<String>,
    /// Terms that disqualify a mention regardless of anything else.
    pub negative: Vec<String>,
    /// Source names held to the core + secondary bar.
    pub technical_sources: Vec<String>,
}

impl Default for RelevanceRules {
    fn default() -> Self {
        Self {
            primary: owned(PRIMARY_TERMS),
            core: owned(CORE_TERMS),
            secondary: owned(SECONDARY_TERMS),
            negative: owned(NEGATIVE_TERMS),
            technical_sources: owned(TECHNICAL_SOURCES),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UrgencyRules {
    pub security: Vec<String>,
    pub breaking: Vec<String>,
    pub high_impact: Vec<String>,
}

impl Default for UrgencyRules {
    fn default() -> Self {
        Self {
            security: owned(SECURITY_TERMS),
            breaking: owned(BREAKING_TERMS),
            high_impact: owned(HIGH_IMPACT_TERMS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentimentRules {
    pub positive: Vec<String>,
    pub negative: Vec<String>,
}

impl Default for SentimentRules {
    fn default() -> Self {
        Self {
            positive: owned(POSITIVE_WORDS),
            negative: owned(NEGATIVE_WORDS),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rules {
    pub relevance: RelevanceRules,
    pub urgency: UrgencyRules,
    pub sentiment: SentimentRules,
}

impl Rules {
    fn normalize(&mut self) {
        for list in [
            &mut self.relevance.primary,
            &mut self.relevance.core,
            &mut self.relevance.secondary,
            &mut self.relevance.negative,
            &mut self.relevance.technical_sources,
            &mut self.urgency.security,
            &mut self.urgency.breaking,
            &mut self.urgency.high_impact,
            &mut self.sentiment.positive,
            &mut self.sentiment.negative,
        ] {
            normalize_terms(list);
        }
    }
}

fn normalize_terms(terms: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    *terms = terms
        .drain(..)
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(t.clone()))
        .collect();
}

/// Load the term tables.
///
/// `None` returns the compiled-in defaults.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or leaves a
/// required table empty.
pub fn load_rules(path: Option<&Path>) -> Result<Rules, ConfigError> {
    let Some(path) = path else {
        return Ok(Rules::default());
    };

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::RulesFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_rules(&content)
}

fn parse_rules(content: &str) -> Result<Rules, ConfigError> {
    let mut rules: Rules = serde_yaml::from_str(content).map_err(ConfigError::RulesFileParse)?;
    rules.normalize();
    validate_rules(&rules)?;
    Ok(rules)
}

fn validate_rules(rules: &Rules) -> Result<(), ConfigError> {
    if rules.relevance.primary.is_empty() && rules.relevance.core.is_empty() {
        return Err(ConfigError::Validation(
            "relevance rules need at least one primary or core term".to_string(),
        ));
    }

    let urgency = &rules.urgency;
    if urgency.security.is_empty() && urgency.breaking.is_empty() && urgency.high_impact.is_empty()
    {
        return Err(ConfigError::Validation(
            "urgency rules need at least one term".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_lowercase_and_non_empty() {
        let rules = Rules::default();
        for term in rules
            .relevance
            .primary
            .iter()
            .chain(&rules.relevance.negative)
            .chain(&rules.urgency.security)
        {
            assert_eq!(term, &term.to_lowercase());
            assert!(!term.is_empty());
        }
        assert!(!rules.relevance.primary.iter().any(|t| t == "aks"));
        assert!(rules.relevance.core.iter().any(|t| t == "aks"));
    }

    #[test]
    fn load_rules_without_path_returns_defaults() {
        assert_eq!(load_rules(None).unwrap(), Rules::default());
    }

    #[test]
    fn partial_file_keeps_other_sections() {
        let yaml = r"
relevance:
  negative:
    - '  Rifle '
    - rifle
    - ''
";
        let rules = parse_rules(yaml).unwrap();
        assert_eq!(rules.relevance.negative, vec!["rifle"]);
        assert_eq!(rules.relevance.primary, RelevanceRules::default().primary);
        assert_eq!(rules.urgency, UrgencyRules::default());
        assert_eq!(rules.sentiment, SentimentRules::default());
    }

    #[test]
    fn empty_relevance_tables_fail_validation() {
        let yaml = "relevance:\n  primary: []\n  core: []\n";
        let err = parse_rules(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)), "got: {err:?}");
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        let err = parse_rules("relevance: [not, a, map").unwrap_err();
        assert!(matches!(err, ConfigError::RulesFileParse(_)), "got: {err:?}");
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let path = std::env::temp_dir().join("mentionbot-rules-does-not-exist.yaml");
        let err = load_rules(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::RulesFileIo { .. }), "got: {err:?}");
    }

    #[test]
    fn load_rules_reads_file_from_disk() {
        let path = std::env::temp_dir().join(format!("mentionbot-rules-{}.yaml", uuid::Uuid::new_v4()));
        std::fs::write(&path, "sentiment:\n  positive: [Stellar]\n").unwrap();
        let rules = load_rules(Some(&path)).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(rules.sentiment.positive, vec!["stellar"]);
        assert_eq!(rules.sentiment.negative, SentimentRules::default().negative);
    }
}
