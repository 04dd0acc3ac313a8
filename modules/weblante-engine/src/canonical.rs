//! URL canonicalization.
//!
//! Every navigation target is reduced to a lowercase `host + path` form with
//! `www.` stripped. Search navigations additionally keep their decoded query
//! text so two different searches never collapse into one key.

use url::Url;

/// Query parameters that carry free-text search input, in lookup order.
pub const SEARCH_PARAMS: &[&str] = &[
    "q",
    "oq",
    "as_q",
    "query",
    "search",
    "search_query",
    "k",
    "text",
    "wd",
    "keyword",
    "keywords",
];

/// Upper bound on percent-decoding passes. Enough to unwrap double and
/// triple encoding without looping on adversarial input.
pub const DECODE_PASSES: usize = 3;

/// A raw navigation target reduced to its comparison forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalUrl {
    /// Canonical form used for logging and comparison.
    pub canonical: String,
    /// Non-search form (`host + path`), used as the cache key.
    pub cache_key: String,
    pub host: String,
    pub path: String,
    pub is_search: bool,
    /// Decoded search text, empty when the navigation is not a search.
    pub query: String,
}

impl CanonicalUrl {
    /// Canonicalize a raw URL. Never fails: unparseable input falls back to
    /// its lowercased form.
    pub fn parse(raw: &str) -> Self {
        let Some(url) = parse_url(raw) else {
            let fallback = fallback(raw);
            return Self {
                canonical: fallback.clone(),
                cache_key: fallback,
                host: fallback_host(raw),
                path: String::new(),
                is_search: false,
                query: String::new(),
            };
        };

        let host = normalize_host(url.host_str().unwrap_or_default());
        let path = url.path().to_lowercase();
        let query = query_from(&url);
        let is_search = !query.is_empty() || is_search_engine(&host, &path);

        let cache_key = format!("{host}{path}");
        let canonical = if is_search && !query.is_empty() {
            format!("{cache_key}?q={}", query.to_lowercase())
        } else {
            cache_key.clone()
        };

        Self {
            canonical,
            cache_key,
            host,
            path,
            is_search,
            query,
        }
    }
}

/// Canonical form of `raw` (search mode keeps the decoded query).
pub fn canonicalize(raw: &str) -> String {
    CanonicalUrl::parse(raw).canonical
}

/// Non-search `host + path` form; the decision cache key.
pub fn cache_key(raw: &str) -> String {
    CanonicalUrl::parse(raw).cache_key
}

/// Whether `raw` is a search navigation.
pub fn is_search(raw: &str) -> bool {
    CanonicalUrl::parse(raw).is_search
}

/// Decoded search text carried by `raw`, or an empty string.
pub fn extract_query(raw: &str) -> String {
    parse_url(raw).map(|u| query_from(&u)).unwrap_or_default()
}

/// Normalized host (lowercase, no `www.`).
pub fn host(raw: &str) -> String {
    match parse_url(raw) {
        Some(url) => normalize_host(url.host_str().unwrap_or_default()),
        None => fallback_host(raw),
    }
}

/// Exact or subdomain match of `host` against `domains`.
pub fn domain_matches<'a>(host: &str, domains: &[&'a str]) -> Option<&'a str> {
    domains.iter().copied().find(|d| {
        host == *d
            || host
                .strip_suffix(d)
                .is_some_and(|prefix| prefix.ends_with('.'))
    })
}

/// Repeatedly percent-decode `input` (`+` read as a space), stopping once
/// the text is stable, invalid UTF-8 appears, or `passes` runs out.
pub fn safe_decode(input: &str, passes: usize) -> String {
    let mut out = input.to_string();
    for _ in 0..passes {
        let spaced = out.replace('+', " ");
        let decoded = match urlencoding::decode(&spaced) {
            Ok(d) => d.into_owned(),
            Err(_) => break,
        };
        if decoded == out {
            break;
        }
        out = decoded;
    }
    out
}

pub(crate) fn parse_url(raw: &str) -> Option<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };
    let url = Url::parse(&candidate).ok()?;
    match url.host_str() {
        Some(h) if !h.is_empty() => Some(url),
        _ => None,
    }
}

fn normalize_host(host: &str) -> String {
    let host = host.to_lowercase();
    match host.strip_prefix("www.") {
        Some(rest) => rest.to_string(),
        None => host,
    }
}

fn fallback(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn fallback_host(raw: &str) -> String {
    let lower = fallback(raw);
    let host = lower
        .split("://")
        .nth(1)
        .unwrap_or(&lower)
        .split(['/', '?', '#'])
        .next()
        .unwrap_or("")
        .to_string();
    normalize_host(&host)
}

/// First non-empty search parameter, fully decoded. `query_pairs` performs
/// the first decoding pass; `safe_decode` unwraps any nested encoding.
fn query_from(url: &Url) -> String {
    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    for param in SEARCH_PARAMS {
        let value = pairs
            .iter()
            .find(|(k, v)| k.eq_ignore_ascii_case(param) && !v.trim().is_empty())
            .map(|(_, v)| v);
        if let Some(value) = value {
            let decoded = safe_decode(value, DECODE_PASSES);
            let trimmed = decoded.trim();
            if !trimmed.is_empty() {
                return trimmed.to_string();
            }
        }
    }
    String::new()
}

/// Known search-engine result pages, matched by host and path prefix.
fn is_search_engine(host: &str, path: &str) -> bool {
    let labels: Vec<&str> = host.split('.').collect();
    let has_label = |name: &str| {
        labels
            .iter()
            .take(labels.len().saturating_sub(1))
            .any(|l| *l == name)
    };

    if has_label("google") || has_label("yandex") {
        return path.starts_with("/search");
    }

    match host {
        "bing.com" | "search.brave.com" | "search.yahoo.com" | "ecosia.org" => {
            path.starts_with("/search")
        }
        "duckduckgo.com" | "html.duckduckgo.com" => path == "/" || path.starts_with("/html"),
        "baidu.com" => path == "/s",
        "youtube.com" | "m.youtube.com" => path.starts_with("/results"),
        _ => false,
    }
}
