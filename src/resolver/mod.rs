use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cdn::ImageRewriter;
use crate::models::{Metadata, OpenGraphData, PreviewResult};
use crate::unfurl::{UnfurlError, Unfurler};

/// Outcome category recorded in logs. Never reaches the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum FailureKind {
    Timeout,
    FetchError,
    ParseError,
    NoImage,
}

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Timed out after {0:?}")]
    TimedOut(Duration),

    #[error(transparent)]
    Unfurl(#[from] UnfurlError),

    #[error("No Open Graph image found")]
    NoImage,

    #[error("Unfurl task failed: {0}")]
    TaskFailed(String),
}

impl ResolveError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ResolveError::TimedOut(_) => FailureKind::Timeout,
            ResolveError::Unfurl(UnfurlError::Parse(_)) => FailureKind::ParseError,
            ResolveError::Unfurl(_) | ResolveError::TaskFailed(_) => FailureKind::FetchError,
            ResolveError::NoImage => FailureKind::NoImage,
        }
    }
}

/// Resolves URLs to Open Graph previews: races an unfurl against the time
/// budget, requires a preview image, and routes that image through the CDN
/// rewriter. Holds no per-request state, so one instance serves every request.
pub struct LinkPreviewResolver {
    unfurler: Arc<dyn Unfurler>,
    rewriter: Arc<dyn ImageRewriter>,
    timeout: Duration,
}

impl LinkPreviewResolver {
    pub fn new(
        unfurler: Arc<dyn Unfurler>,
        rewriter: Arc<dyn ImageRewriter>,
        timeout: Duration,
    ) -> Self {
        Self {
            unfurler,
            rewriter,
            timeout,
        }
    }

    /// Resolve `url` to a preview. Every failure collapses to
    /// [`PreviewResult::Failure`]; the cause is logged.
    pub async fn resolve(&self, url: &str) -> PreviewResult {
        debug!(url = %url, "Unfurling URL");

        match self.try_resolve(url).await {
            Ok(open_graph) => {
                info!(url = %url, "Successfully unfurled URL");
                PreviewResult::Success { open_graph }
            }
            Err(e @ ResolveError::NoImage) => {
                warn!(url = %url, kind = %e.kind(), "No OG image found for URL");
                PreviewResult::Failure
            }
            Err(e) => {
                warn!(url = %url, kind = %e.kind(), error = %e, "Error unfurling URL");
                PreviewResult::Failure
            }
        }
    }

    /// Same as [`resolve`](Self::resolve) but keeps the failure cause.
    pub async fn try_resolve(&self, url: &str) -> Result<OpenGraphData, ResolveError> {
        let metadata = self.unfurl_within_budget(url).await?;
        let mut open_graph = metadata.open_graph.ok_or(ResolveError::NoImage)?;

        let image = open_graph
            .images
            .first_mut()
            .filter(|image| !image.url.is_empty())
            .ok_or(ResolveError::NoImage)?;

        if let Some(rewritten) = self.rewriter.rewrite(&image.url) {
            debug!(original = %image.url, rewritten = %rewritten, "Rewrote preview image URL");
            image.url = rewritten;
        }

        Ok(open_graph)
    }

    /// Run the unfurl as its own task and race it against the timer. Whichever
    /// branch of the `select!` completes first is the result. A losing unfurl
    /// task is detached, not aborted; its output is dropped when it finishes.
    async fn unfurl_within_budget(&self, url: &str) -> Result<Metadata, ResolveError> {
        let unfurler = Arc::clone(&self.unfurler);
        let target = url.to_owned();
        let fetch = tokio::spawn(async move { unfurler.unfurl(&target).await });

        tokio::select! {
            joined = fetch => match joined {
                Ok(result) => result.map_err(ResolveError::from),
                Err(e) => Err(ResolveError::TaskFailed(e.to_string())),
            },
            () = tokio::time::sleep(self.timeout) => Err(ResolveError::TimedOut(self.timeout)),
        }
    }
}
