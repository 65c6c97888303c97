use std::sync::LazyLock;

use regex::Regex;

static TAGS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<[^>]+>").expect("valid tags regex"));

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Strip HTML tags, decode the common entities and collapse whitespace.
pub(crate) fn strip_html(html: &str) -> String {
    let without_tags = TAGS.replace_all(html, " ");
    let decoded = decode_entities(&without_tags);
    WHITESPACE.replace_all(decoded.trim(), " ").into_owned()
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&#x2F;", "/")
        .replace("&amp;", "&")
}

/// Case-insensitive containment check against an already-lowercased haystack.
pub(crate) fn contains_keyword(lower_haystack: &str, keyword: &str) -> bool {
    let needle = keyword.trim().to_lowercase();
    !needle.is_empty() && lower_haystack.contains(&needle)
}

/// Truncate to at most `max_chars` characters on a char boundary.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tags_and_decodes_entities() {
        let html = "<p>Upgrading <code>AKS</code> &amp; node pools</p>\n<p>It&#39;s &lt;fine&gt;</p>";
        assert_eq!(strip_html(html), "Upgrading AKS & node pools It's <fine>");
    }

    #[test]
    fn ampersand_entities_decode_once() {
        assert_eq!(strip_html("&amp;lt;"), "&lt;");
    }

    #[test]
    fn keyword_match_is_case_insensitive() {
        assert!(contains_keyword("running aks in prod", "AKS"));
        assert!(!contains_keyword("running eks in prod", "AKS"));
        assert!(!contains_keyword("anything", "  "));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
    }
}
