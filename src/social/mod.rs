use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use validator::Validate;

const TWITTER_USERNAME: &str = r"[a-zA-Z0-9_]{4,15}";
const TELEGRAM_USERNAME: &str = r"[a-zA-Z][a-zA-Z0-9_]{5,32}";

/// `twitter.com/<user>` or `x.com/<user>`, scheme and `www.` optional.
pub static TWITTER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^(?:https?://)?(?:www\.)?(twitter\.com|x\.com)/{TWITTER_USERNAME}/?$"
    ))
    .expect("twitter pattern is valid")
});

/// `t.me/<user>` or `telegram.me/<user>`, plus `t.me/+<invite>` group links.
pub static TELEGRAM_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^(?:https?://)?(?:www\.)?(?:t\.me|telegram\.me)/(?:{TELEGRAM_USERNAME}|\+[a-zA-Z0-9_-]+)/?$"
    ))
    .expect("telegram pattern is valid")
});

pub static EMAIL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"));

pub fn is_twitter_url(value: &str) -> bool {
    TWITTER_REGEX.is_match(value)
}

pub fn is_telegram_url(value: &str) -> bool {
    TELEGRAM_REGEX.is_match(value)
}

pub fn is_email(value: &str) -> bool {
    EMAIL_REGEX.is_match(value)
}

// ── Profile links ──────────────────────────────────────────────────────────

/// Social links entered alongside a profile. Every field is optional.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct SocialLinks {
    #[validate(regex(path = *TWITTER_REGEX, message = "Must be a twitter.com or x.com profile link"))]
    pub twitter: Option<String>,
    #[validate(regex(path = *TELEGRAM_REGEX, message = "Must be a t.me profile or invite link"))]
    pub telegram: Option<String>,
    #[validate(regex(path = *EMAIL_REGEX, message = "Must be an email address"))]
    pub email: Option<String>,
}
