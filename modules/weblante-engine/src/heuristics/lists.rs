//! Static domain and token lists.

pub const ADULT_DOMAINS: &[&str] = &[
    "pornhub.com",
    "xvideos.com",
    "xnxx.com",
    "xhamster.com",
    "redtube.com",
    "youporn.com",
    "tube8.com",
    "spankbang.com",
    "eporner.com",
    "brazzers.com",
    "chaturbate.com",
    "stripchat.com",
    "livejasmin.com",
    "onlyfans.com",
    "fansly.com",
    "rule34.xxx",
    "nhentai.net",
    "hentaihaven.xxx",
    "motherless.com",
    "beeg.com",
];

pub const ADULT_TLDS: &[&str] = &[".xxx", ".porn", ".adult", ".sex"];

pub const TRUSTED_DOMAINS: &[&str] = &[
    "wikipedia.org",
    "wikimedia.org",
    "britannica.com",
    "khanacademy.org",
    "nationalgeographic.com",
    "nasa.gov",
    "nih.gov",
    "bbc.co.uk",
    "pbskids.org",
    "code.org",
    "scratch.mit.edu",
    "duolingo.com",
    "github.com",
    "stackoverflow.com",
    "google.com",
    "classroom.google.com",
    "docs.google.com",
    "coolmathgames.com",
];

/// Platforms gated for sessions under 16 regardless of content.
pub const SOCIAL_MEDIA_DOMAINS: &[&str] = &[
    "instagram.com",
    "facebook.com",
    "snapchat.com",
    "tiktok.com",
    "x.com",
    "twitter.com",
    "reddit.com",
    "tumblr.com",
];

pub const SUSPICIOUS_PATH_TOKENS: &[&str] = &["porn", "xxx", "sex", "nude", "hentai", "nsfw"];

pub const REDIRECT_PARAMS: &[&str] = &[
    "redirect",
    "redirect_uri",
    "redirect_url",
    "next",
    "continue",
    "url",
    "dest",
    "destination",
];

pub const SHORTENER_DOMAINS: &[&str] = &[
    "bit.ly",
    "t.co",
    "tinyurl.com",
    "goo.gl",
    "ow.ly",
    "is.gd",
    "buff.ly",
];
