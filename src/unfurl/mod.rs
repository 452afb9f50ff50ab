mod http;
pub mod parse;

use futures::future::BoxFuture;
use thiserror::Error;

use crate::models::Metadata;

pub use http::{is_private_ip, AddressFilter, HttpUnfurler, UnfurlSettings};

#[derive(Error, Debug)]
pub enum UnfurlError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Host {0} resolves to a private or reserved address")]
    BlockedHost(String),

    #[error("Could not resolve host {host}: {reason}")]
    Resolve { host: String, reason: String },

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Upstream returned HTTP {0}")]
    Status(u16),

    #[error("Unsupported content type: {0}")]
    UnsupportedContentType(String),

    /// The page was fetched but holds nothing to parse (e.g. an empty body).
    #[error("Could not parse page: {0}")]
    Parse(String),
}

/// Fetches a URL and returns whatever Open Graph metadata it exposes.
///
/// This is the seam the resolver races against its timer. [`HttpUnfurler`] is
/// the production implementation; tests plug in stubs.
pub trait Unfurler: Send + Sync {
    fn unfurl<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Metadata, UnfurlError>>;
}
