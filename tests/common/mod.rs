// Each integration test file is a separate binary; helpers not used in every
// binary would otherwise trigger dead_code warnings from clippy.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use futures::future::BoxFuture;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use og_preview_server::{
    cdn::ImageRewriter,
    models::{Metadata, OgMedia, OpenGraphData},
    resolver::LinkPreviewResolver,
    state::AppState,
    unfurl::{UnfurlError, Unfurler},
};

pub const TEST_TIMEOUT: Duration = Duration::from_millis(5_000);

/// What the stub unfurler does once its delay elapses.
#[derive(Clone)]
pub enum Reply {
    Metadata(Metadata),
    Error,
}

/// Unfurler that sleeps for `delay` and then replies. Counts calls so tests can
/// check nothing was fetched.
pub struct StubUnfurler {
    pub delay: Duration,
    pub reply: Reply,
    pub calls: Arc<AtomicUsize>,
}

impl StubUnfurler {
    pub fn new(delay: Duration, reply: Reply) -> Self {
        Self {
            delay,
            reply,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn call_count(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl Unfurler for StubUnfurler {
    fn unfurl<'a>(&'a self, _url: &'a str) -> BoxFuture<'a, Result<Metadata, UnfurlError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
            tokio::time::sleep(self.delay).await;
            match &self.reply {
                Reply::Metadata(metadata) => Ok(metadata.clone()),
                Reply::Error => Err(UnfurlError::Status(500)),
            }
        })
    }
}

/// Rewriter standing in for the image CDN.
pub fn test_cdn(url: &str) -> Option<String> {
    Some(format!(
        "https://cdn.test/image/fetch/{}",
        urlencoding::encode(url)
    ))
}

/// A page with two images and the usual scalar fields.
pub fn sample_metadata() -> Metadata {
    Metadata {
        open_graph: Some(OpenGraphData {
            title: Some("Sample Article".into()),
            kind: Some("article".into()),
            url: Some("https://example.com/article".into()),
            description: Some("An article worth previewing".into()),
            site_name: Some("Example".into()),
            images: vec![
                OgMedia {
                    url: "https://example.com/cover.png".into(),
                    width: Some(1200),
                    height: Some(630),
                    alt: Some("Cover".into()),
                    ..Default::default()
                },
                OgMedia {
                    url: "https://example.com/second.png".into(),
                    ..Default::default()
                },
            ],
            ..Default::default()
        }),
    }
}

/// Build the application router wired to the given unfurler and rewriter.
pub fn create_test_app(unfurler: StubUnfurler, rewriter: Arc<dyn ImageRewriter>) -> Router {
    let state = AppState {
        resolver: Arc::new(LinkPreviewResolver::new(
            Arc::new(unfurler),
            rewriter,
            TEST_TIMEOUT,
        )),
    };
    og_preview_server::router(state)
}

// ── Request helpers ──────────────────────────────────────────────────────────

pub async fn request(app: Router, method: Method, uri: &str) -> (StatusCode, Value) {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, req).await
}

pub async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    request(app, Method::GET, uri).await
}

pub fn preview_uri(target: &str) -> String {
    format!("/api/og/get?url={}", urlencoding::encode(target))
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}
