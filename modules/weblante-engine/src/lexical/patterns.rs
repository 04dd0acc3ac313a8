//! Regex batteries mapping a pattern to a category.

use regex::Regex;

/// An ordered list of `(pattern, category)` pairs. The first match wins.
#[derive(Debug, Clone)]
pub struct PatternSet {
    patterns: Vec<(Regex, &'static str)>,
}

impl PatternSet {
    /// Build from pattern sources. Panics on an invalid pattern, so only
    /// pass literals.
    pub fn new(patterns: &[(&str, &'static str)]) -> Self {
        Self {
            patterns: patterns
                .iter()
                .map(|(src, category)| (Regex::new(src).unwrap(), *category))
                .collect(),
        }
    }

    /// Unambiguous explicit search intent. Run over the lowercased query.
    pub fn explicit_search() -> Self {
        Self::new(&[
            (r"\bs[\W_]*e[\W_]*x\b", "sex"),
            (r"porn", "porn"),
            (r"\bxxx", "xxx"),
            (r"xvideos", "porn"),
            (r"xnxx", "porn"),
            (r"hentai", "hentai"),
            (r"\bnudes?\b", "nudes"),
            (r"blowjob", "sex"),
            (r"\bfuck", "sex"),
        ])
    }

    /// Obfuscated spellings. Run over normalized text, where punctuation has
    /// already become single spaces. Spaced forms must space every letter.
    pub fn fuzzy_variants() -> Self {
        Self::new(&[
            (r"\bp0rn", "porn"),
            (r"\bpr[o0]n\b", "porn"),
            (r"\bp [o0] r n\b", "porn"),
            (r"\bs3x", "sex"),
            (r"\bs e x\b", "sex"),
            (r"\bs[e3]ggs\b", "sex"),
            (r"\bn[u0]{2}d[e3]?[sz]\b", "nudes"),
            (r"\bnud3s?\b", "nudes"),
            (r"\bn u d e s?\b", "nudes"),
            (r"\bh[e3]nt[a4]i\b", "hentai"),
            (r"\bx x x\b", "xxx"),
            (r"\bb[o0]{2}bs\b", "boobs"),
            (r"\b[o0]nlyf[a4]ns\b", "onlyfans"),
            (r"\bn s f w\b", "nsfw"),
        ])
    }

    /// Category of the first matching pattern.
    pub fn find(&self, text: &str) -> Option<&'static str> {
        self.patterns
            .iter()
            .find(|(re, _)| re.is_match(text))
            .map(|(_, category)| *category)
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.find(text).is_some()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexical::normalize_text;

    #[test]
    fn test_explicit_search() {
        let set = PatternSet::explicit_search();
        assert_eq!(set.find("s.e.x videos"), Some("sex"));
        assert_eq!(set.find("free pornography"), Some("porn"));
        assert_eq!(set.find("send nudes"), Some("nudes"));
        assert_eq!(set.find("middlesex hospital"), None);
        assert_eq!(set.find("sextant navigation"), None);
        assert_eq!(set.find("nudibranch facts"), None);
    }

    #[test]
    fn test_fuzzy_leetspeak_and_spacing() {
        let set = PatternSet::fuzzy_variants();
        assert_eq!(set.find(&normalize_text("free p0rn")), Some("porn"));
        assert_eq!(set.find(&normalize_text("p.o.r.n")), Some("porn"));
        assert_eq!(set.find(&normalize_text("s-e-x")), Some("sex"));
        assert_eq!(set.find(&normalize_text("send n00dz")), Some("nudes"));
        assert_eq!(set.find(&normalize_text("x x x")), Some("xxx"));
        assert_eq!(set.find(&normalize_text("0nlyf4ns leaks")), Some("onlyfans"));
    }

    #[test]
    fn test_fuzzy_ignores_ordinary_text() {
        let set = PatternSet::fuzzy_variants();
        for text in ["pronoun practice", "sussex weather", "snow day", "ex post facto", "noodles recipe"] {
            assert!(!set.is_match(&normalize_text(text)), "{text}");
        }
    }

    #[test]
    fn test_custom_set() {
        let set = PatternSet::new(&[(r"\bcasino\b", "gambling")]);
        assert_eq!(set.len(), 1);
        assert_eq!(set.find("online casino bonus"), Some("gambling"));
    }
}
