use axum::extract::{RawQuery, State};
use axum::http::Method;
use axum::Json;
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};
use crate::models::PreviewResponseDto;
use crate::state::AppState;

pub const URL_REQUIRED: &str = "URL is required and must be a string.";

// ── Query params ───────────────────────────────────────────────────────────

/// Pull the `url` parameter out of a raw query string. Missing, empty, and
/// repeated (`?url=a&url=b`) values all count as absent.
pub fn single_url_param(query: &str) -> Option<String> {
    let mut values = url::form_urlencoded::parse(query.as_bytes())
        .filter(|(key, _)| key == "url")
        .map(|(_, value)| value.into_owned());

    let first = values.next()?;
    if values.next().is_some() || first.is_empty() {
        return None;
    }
    Some(first)
}

// ── Handler ────────────────────────────────────────────────────────────────

/// ANY /api/og/get?url=<encoded-url>
///
/// Only GET is served; every other method gets 405 whatever the query holds.
/// Resolution failures (timeout, fetch error, no image) answer 200 with
/// `{ "result": "error" }`, so callers branch on the payload, not the status.
pub async fn get_og_preview(
    State(state): State<AppState>,
    method: Method,
    RawQuery(query): RawQuery,
) -> AppResult<Json<PreviewResponseDto>> {
    if method != Method::GET {
        return Err(AppError::MethodNotAllowed);
    }

    let query = query.unwrap_or_default();
    debug!(query = %query, "Request query");

    let Some(url) = single_url_param(&query) else {
        warn!("URL is required and must be a string");
        return Err(AppError::Validation(URL_REQUIRED.into()));
    };

    let result = state.resolver.resolve(&url).await;
    Ok(Json(result.into()))
}

// ── Unit tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_encoded_url() {
        assert_eq!(
            single_url_param("url=https%3A%2F%2Fexample.com%2Fa%3Fb%3Dc").as_deref(),
            Some("https://example.com/a?b=c")
        );
    }

    #[test]
    fn ignores_other_params() {
        assert_eq!(
            single_url_param("foo=bar&url=https://example.com").as_deref(),
            Some("https://example.com")
        );
    }

    #[test]
    fn missing_url_is_none() {
        assert!(single_url_param("").is_none());
        assert!(single_url_param("link=https://example.com").is_none());
    }

    #[test]
    fn empty_url_is_none() {
        assert!(single_url_param("url=").is_none());
        assert!(single_url_param("url").is_none());
    }

    #[test]
    fn repeated_url_is_none() {
        assert!(single_url_param("url=https://a.com&url=https://b.com").is_none());
    }
}
