//! Weighted keyword scoring.

use std::collections::HashSet;

use super::normalize_text;

/// Non-search text shorter than this is too thin to score.
pub const MIN_TEXT_LEN: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    High,
    Medium,
    Low,
}

impl Tier {
    pub fn weight(&self) -> f64 {
        match self {
            Tier::High => 3.0,
            Tier::Medium => 1.5,
            Tier::Low => 0.5,
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            Tier::High => "Detected high-risk adult keywords",
            Tier::Medium => "Detected medium-risk adult keywords",
            Tier::Low => "Detected low-risk adult keywords",
        }
    }
}

const HIGH: &[&str] = &[
    "porn",
    "porno",
    "pornography",
    "pornhub",
    "xxx",
    "xvideos",
    "xnxx",
    "xhamster",
    "hentai",
    "blowjob",
    "nsfw",
    "onlyfans",
    "camgirl",
    "camgirls",
    "brazzers",
    "redtube",
    "youporn",
];

const MEDIUM: &[&str] = &[
    "sex", "sexy", "nude", "nudes", "naked", "nudity", "erotic", "erotica", "fetish", "stripper",
    "escort", "escorts", "milf", "boobs", "horny", "orgasm", "sexting",
];

const LOW: &[&str] = &[
    "dating",
    "lingerie",
    "bikini",
    "kissing",
    "hookup",
    "seductive",
    "sensual",
    "flirt",
    "flirting",
    "babes",
];

/// Outcome of keyword analysis.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeywordResult {
    /// Within [0, 1].
    pub score: f64,
    /// One entry per tier that matched, high tier first.
    pub reasons: Vec<String>,
    /// Any high-tier keyword matched.
    pub hard_block: bool,
}

impl KeywordResult {
    pub fn is_clean(&self) -> bool {
        self.score == 0.0
    }
}

/// Tiered keyword scorer. Each tier counts distinct keyword hits.
#[derive(Debug, Clone)]
pub struct KeywordScorer {
    tiers: Vec<(Tier, HashSet<&'static str>)>,
    min_text_len: usize,
}

impl Default for KeywordScorer {
    fn default() -> Self {
        Self {
            tiers: vec![
                (Tier::High, HIGH.iter().copied().collect()),
                (Tier::Medium, MEDIUM.iter().copied().collect()),
                (Tier::Low, LOW.iter().copied().collect()),
            ],
            min_text_len: MIN_TEXT_LEN,
        }
    }
}

impl KeywordScorer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Score `text`. Search queries are scored at any length.
    pub fn score(&self, text: &str, is_search: bool) -> KeywordResult {
        if !is_search && text.trim().chars().count() < self.min_text_len {
            return KeywordResult::default();
        }

        let normalized = normalize_text(text);
        let tokens: Vec<&str> = normalized.split_whitespace().collect();
        if tokens.is_empty() {
            return KeywordResult::default();
        }
        let total = tokens.len() as f64;

        let mut result = KeywordResult::default();
        for (tier, words) in &self.tiers {
            let hits: HashSet<&str> = tokens
                .iter()
                .copied()
                .filter(|t| words.contains(t))
                .collect();
            if hits.is_empty() {
                continue;
            }
            result.score += (hits.len() as f64 / total * tier.weight()).min(1.0);
            result.reasons.push(tier.reason().to_string());
            if *tier == Tier::High {
                result.hard_block = true;
            }
        }
        result.score = result.score.min(1.0);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_high_tier_sets_hard_block() {
        let result = KeywordScorer::new().score("free porn", true);
        assert!(result.hard_block);
        assert_eq!(result.reasons, vec!["Detected high-risk adult keywords"]);
        assert_eq!(result.score, 1.0);
    }

    #[test]
    fn test_short_page_text_is_skipped() {
        let result = KeywordScorer::new().score("sexy nude", false);
        assert_eq!(result, KeywordResult::default());
    }

    #[test]
    fn test_search_is_never_length_exempt() {
        let result = KeywordScorer::new().score("bikini", true);
        assert_eq!(result.score, 0.5);
        assert!(!result.hard_block);
        assert_eq!(result.reasons, vec!["Detected low-risk adult keywords"]);
    }

    #[test]
    fn test_distinct_hits_scaled_by_token_count() {
        // "naked" twice counts once
        let text = "naked naked fetish one two three four five six seven and more words to pass the length";
        let tokens = normalize_text(text).split_whitespace().count() as f64;
        let result = KeywordScorer::new().score(text, false);
        assert!((result.score - 2.0 / tokens * 1.5).abs() < 1e-9);
        assert_eq!(result.reasons, vec!["Detected medium-risk adult keywords"]);
    }

    #[test]
    fn test_tiers_sum_and_cap() {
        let result = KeywordScorer::new().score("nude dating", true);
        // medium: min(1, 0.5 * 1.5) + low: min(1, 0.5 * 0.5)
        assert_eq!(result.score, 1.0);
        assert_eq!(result.reasons.len(), 2);
    }

    #[test]
    fn test_clean_text() {
        let result = KeywordScorer::new().score("how do volcanoes form", true);
        assert!(result.is_clean());
        assert!(result.reasons.is_empty());
    }

    #[test]
    fn test_substrings_do_not_count() {
        let result = KeywordScorer::new().score("sussex essex sextant", true);
        assert!(result.is_clean());
    }
}
