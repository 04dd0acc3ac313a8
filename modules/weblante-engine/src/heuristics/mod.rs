//! Static-list checks. Each returns the reason string on a hit.

pub mod lists;

use std::sync::LazyLock;

use regex::Regex;

use crate::canonical::{self, domain_matches};
use lists::*;

/// A path token only counts when it starts a slash- or hyphen-delimited
/// segment and ends at a boundary, so `/sextant` or `/essex` stay clean.
static SUSPICIOUS_PATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    let tokens = SUSPICIOUS_PATH_TOKENS.join("|");
    Regex::new(&format!(r"[/-]({tokens})s?(?:$|[^a-z0-9])")).unwrap()
});

/// Known adult domain (exact or subdomain) or adult top-level domain.
pub fn check_adult_domain(url: &str) -> Option<String> {
    let host = canonical::host(url);
    if host.is_empty() {
        return None;
    }

    if let Some(domain) = domain_matches(&host, ADULT_DOMAINS) {
        return Some(format!("Known adult domain ({domain})"));
    }

    ADULT_TLDS
        .iter()
        .find(|tld| host.ends_with(*tld))
        .map(|tld| format!("Adult top-level domain ({tld})"))
}

/// Trusted domain (exact or subdomain).
pub fn check_allowlist(url: &str) -> Option<String> {
    let host = canonical::host(url);
    if host.is_empty() {
        return None;
    }
    domain_matches(&host, TRUSTED_DOMAINS).map(|d| format!("Trusted domain ({d})"))
}

/// Suspicious token at a segment boundary of the path.
pub fn check_url_path(url: &str) -> Option<String> {
    let parsed = canonical::parse_url(url)?;
    let path = parsed.path().to_lowercase();
    SUSPICIOUS_PATH_RE
        .captures(&path)
        .and_then(|caps| caps.get(1))
        .map(|token| format!("Suspicious URL path ({})", token.as_str()))
}

/// Gated social platform. Whether the gate applies is the caller's call.
pub fn check_social_media(url: &str) -> Option<String> {
    let host = canonical::host(url);
    domain_matches(&host, SOCIAL_MEDIA_DOMAINS).map(|d| format!("Social media platform ({d})"))
}

/// Redirect-parameter abuse or URL shortener. Unparseable URLs count as a hit.
pub fn check_link_security(url: &str) -> Option<String> {
    let Some(parsed) = canonical::parse_url(url) else {
        return Some("Malformed URL detected".to_string());
    };

    let has_redirect = parsed
        .query_pairs()
        .any(|(k, _)| REDIRECT_PARAMS.iter().any(|p| k.eq_ignore_ascii_case(p)));
    if has_redirect {
        return Some("Suspicious redirect detected".to_string());
    }

    let host = canonical::host(url);
    if domain_matches(&host, SHORTENER_DOMAINS).is_some() {
        return Some("URL shortener blocked for safety".to_string());
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adult_domain_exact_and_subdomain() {
        assert_eq!(
            check_adult_domain("https://www.pornhub.com/anything").as_deref(),
            Some("Known adult domain (pornhub.com)")
        );
        assert!(check_adult_domain("https://es.xvideos.com/").is_some());
        assert!(check_adult_domain("https://notpornhub.com.example.org/").is_none());
    }

    #[test]
    fn test_adult_tld() {
        assert_eq!(
            check_adult_domain("anything.xxx/page").as_deref(),
            Some("Adult top-level domain (.xxx)")
        );
        assert!(check_adult_domain("https://essex.gov.uk").is_none());
    }

    #[test]
    fn test_allowlist() {
        assert_eq!(
            check_allowlist("https://en.wikipedia.org/wiki/Moon").as_deref(),
            Some("Trusted domain (wikipedia.org)")
        );
        assert!(check_allowlist("https://wikipedia.org.evil.com/").is_none());
    }

    #[test]
    fn test_path_token_needs_segment_boundary() {
        assert_eq!(
            check_url_path("https://example.com/videos/free-porn-clips").as_deref(),
            Some("Suspicious URL path (porn)")
        );
        assert!(check_url_path("https://example.com/nsfw").is_some());
        assert!(check_url_path("https://example.com/gallery/nudes/").is_some());
        assert!(check_url_path("https://example.com/sextant-navigation").is_none());
        assert!(check_url_path("https://example.com/news/essex").is_none());
        assert!(check_url_path("https://example.com/middlesex-county").is_none());
    }

    #[test]
    fn test_path_check_ignores_query() {
        assert!(check_url_path("https://example.com/search?q=/porn").is_none());
    }

    #[test]
    fn test_social_media_matches_hosts_not_substrings() {
        assert!(check_social_media("https://www.instagram.com/someone").is_some());
        assert!(check_social_media("https://old.reddit.com/r/rust").is_some());
        assert!(check_social_media("https://fox.com/news").is_none());
    }

    #[test]
    fn test_link_security() {
        assert_eq!(
            check_link_security("https://example.com/login?next=/home").as_deref(),
            Some("Suspicious redirect detected")
        );
        assert_eq!(
            check_link_security("https://bit.ly/3abc").as_deref(),
            Some("URL shortener blocked for safety")
        );
        assert!(check_link_security("https://example.com/article").is_none());
    }
}
