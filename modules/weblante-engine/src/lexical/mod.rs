//! Lexical analysis: keyword scoring and obfuscation detection.

pub mod keywords;
pub mod patterns;

pub use keywords::{KeywordResult, KeywordScorer, Tier};
pub use patterns::PatternSet;

/// Lowercase, map every non-alphanumeric character to a space and collapse
/// runs of whitespace.
pub fn normalize_text(text: &str) -> String {
    let mapped: String = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    mapped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Fuzzy detector over normalized text.
pub fn is_obfuscated(patterns: &PatternSet, text: &str) -> bool {
    patterns.is_match(&normalize_text(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("  Hello,   WORLD!!  p.o.r.n "), "hello world p o r n");
        assert_eq!(normalize_text(""), "");
    }

    #[test]
    fn test_is_obfuscated() {
        let set = PatternSet::fuzzy_variants();
        assert!(is_obfuscated(&set, "S_E_X"));
        assert!(!is_obfuscated(&set, "science experiments"));
    }
}
