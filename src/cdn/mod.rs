use url::Url;

use crate::config::CloudinaryConfig;

/// Maps an origin preview image URL to an image-CDN URL. `None` means "keep
/// the original".
pub trait ImageRewriter: Send + Sync {
    fn rewrite(&self, url: &str) -> Option<String>;
}

impl<F> ImageRewriter for F
where
    F: Fn(&str) -> Option<String> + Send + Sync,
{
    fn rewrite(&self, url: &str) -> Option<String> {
        self(url)
    }
}

// ── Implementations ────────────────────────────────────────────────────────

/// Used when no CDN is configured: every image keeps its origin URL.
pub struct NoopRewriter;

impl ImageRewriter for NoopRewriter {
    fn rewrite(&self, _url: &str) -> Option<String> {
        None
    }
}

/// Builds Cloudinary "fetch" URLs:
/// `{base}/{cloud}/image/fetch/{transformations}/{percent-encoded source}`.
#[derive(Clone, Debug)]
pub struct CloudinaryRewriter {
    base_url: String,
    cloud_name: String,
    transformations: String,
    cdn_host: Option<String>,
}

impl CloudinaryRewriter {
    pub fn new(config: CloudinaryConfig) -> Self {
        let cdn_host = Url::parse(&config.base_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_ascii_lowercase));
        Self {
            base_url: config.base_url,
            cloud_name: config.cloud_name,
            transformations: config.transformations,
            cdn_host,
        }
    }

    pub fn fetch_url(&self, source: &str) -> Option<String> {
        let parsed = Url::parse(source).ok()?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return None;
        }
        let host = parsed.host_str()?.to_ascii_lowercase();
        if self.cdn_host.as_deref() == Some(host.as_str()) {
            return None;
        }

        let encoded = urlencoding::encode(source);
        let transformations = self.transformations.trim_matches('/');
        if transformations.is_empty() {
            Some(format!(
                "{}/{}/image/fetch/{}",
                self.base_url, self.cloud_name, encoded
            ))
        } else {
            Some(format!(
                "{}/{}/image/fetch/{}/{}",
                self.base_url, self.cloud_name, transformations, encoded
            ))
        }
    }
}

impl ImageRewriter for CloudinaryRewriter {
    fn rewrite(&self, url: &str) -> Option<String> {
        self.fetch_url(url)
    }
}
