use std::error::Error as StdError;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::redirect::Policy;
use reqwest::{Client as ReqwestClient, Response};
use thiserror::Error;
use url::{Host, Url};

use super::{parse, UnfurlError, Unfurler};
use crate::config::Config;
use crate::models::Metadata;

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8";
const MAX_REDIRECTS: usize = 5;

/// Decides whether an address may be contacted. `true` means blocked.
pub type AddressFilter = fn(IpAddr) -> bool;

/// Returns `true` if `ip` is a private, loopback, or link-local address.
pub fn is_private_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            let o = v4.octets();
            matches!(
                o,
                [127, ..]
                    | [10, ..]
                    | [169, 254, ..]
                    | [192, 168, ..]
                    | [0, ..]
                    | [255, 255, 255, 255]
            ) || (o[0] == 172 && (16..=31).contains(&o[1]))
                || (o[0] == 100 && (64..=127).contains(&o[1]))
        }
        IpAddr::V6(v6) => {
            if let Some(v4) = v6.to_ipv4_mapped() {
                return is_private_ip(IpAddr::V4(v4));
            }
            v6.is_loopback()
                || v6.is_unspecified()
                || (v6.segments()[0] & 0xfe00 == 0xfc00)
                || (v6.segments()[0] & 0xffc0 == 0xfe80)
        }
    }
}

fn allow_all(_ip: IpAddr) -> bool {
    false
}

/// Raised from inside reqwest (redirect policy or DNS resolver) and recovered
/// from the error chain as [`UnfurlError::BlockedHost`].
#[derive(Error, Debug)]
#[error("{0} resolves to a blocked address")]
struct BlockedAddress(String);

// ── Settings ───────────────────────────────────────────────────────────────

/// Knobs for [`HttpUnfurler`], usually taken from [`Config`].
#[derive(Clone, Debug)]
pub struct UnfurlSettings {
    /// Client-level timeout. A backstop for fetches the resolver already gave
    /// up on, so it sits above the race budget.
    pub timeout: Duration,
    pub user_agent: String,
    pub max_body_bytes: usize,
    pub allow_private_hosts: bool,
}

impl From<&Config> for UnfurlSettings {
    fn from(config: &Config) -> Self {
        Self {
            timeout: config.unfurl_timeout * 2,
            user_agent: config.user_agent.clone(),
            max_body_bytes: config.max_body_bytes,
            allow_private_hosts: config.allow_private_hosts,
        }
    }
}

// ── Guards ─────────────────────────────────────────────────────────────────

/// DNS resolver that drops blocked addresses, so every connection reqwest
/// makes (first hop, redirects, DNS rebinding) is checked at connect time.
struct GuardedResolver {
    is_blocked: AddressFilter,
}

impl Resolve for GuardedResolver {
    fn resolve(&self, name: Name) -> Resolving {
        Box::pin(lookup_allowed(name.as_str().to_string(), self.is_blocked))
    }
}

async fn lookup_allowed(
    host: String,
    is_blocked: AddressFilter,
) -> Result<Addrs, Box<dyn StdError + Send + Sync>> {
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host.as_str(), 0))
        .await?
        .filter(|addr| !is_blocked(addr.ip()))
        .collect();
    if addrs.is_empty() {
        return Err(Box::new(BlockedAddress(host)));
    }
    Ok(Box::new(addrs.into_iter()))
}

/// Host of `url` if it is an IP literal the filter blocks. Domain names are
/// left to [`GuardedResolver`].
fn blocked_literal(url: &Url, is_blocked: AddressFilter) -> Option<String> {
    let ip = match url.host()? {
        Host::Ipv4(ip) => IpAddr::V4(ip),
        Host::Ipv6(ip) => IpAddr::V6(ip),
        Host::Domain(_) => return None,
    };
    is_blocked(ip).then(|| ip.to_string())
}

/// Follows at most [`MAX_REDIRECTS`] hops, each to http(s) and never to a
/// blocked IP literal.
fn redirect_policy(is_blocked: AddressFilter) -> Policy {
    Policy::custom(move |attempt| {
        if attempt.previous().len() >= MAX_REDIRECTS {
            return attempt.error("too many redirects");
        }
        if !matches!(attempt.url().scheme(), "http" | "https") {
            let scheme = attempt.url().scheme().to_string();
            return attempt.error(format!("redirect to unsupported scheme {scheme}"));
        }
        match blocked_literal(attempt.url(), is_blocked) {
            Some(host) => attempt.error(BlockedAddress(host)),
            None => attempt.follow(),
        }
    })
}

/// Map a reqwest failure, surfacing a guard rejection anywhere in its chain.
fn classify(err: reqwest::Error) -> UnfurlError {
    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(blocked) = cause.downcast_ref::<BlockedAddress>() {
            return UnfurlError::BlockedHost(blocked.0.clone());
        }
        source = cause.source();
    }
    UnfurlError::Request(err)
}

// ── Unfurler ───────────────────────────────────────────────────────────────

/// Unfurls pages over HTTP with reqwest and parses them with scraper.
///
/// The unfurler owns its client so the address guard always covers the
/// redirect policy and DNS resolution.
#[derive(Clone)]
pub struct HttpUnfurler {
    client: ReqwestClient,
    max_body_bytes: usize,
    is_blocked: AddressFilter,
}

impl HttpUnfurler {
    pub fn from_config(config: &Config) -> Result<Self, UnfurlError> {
        Self::new(UnfurlSettings::from(config))
    }

    /// Blocks private, loopback and link-local addresses unless
    /// `allow_private_hosts` is set.
    pub fn new(settings: UnfurlSettings) -> Result<Self, UnfurlError> {
        let is_blocked: AddressFilter = if settings.allow_private_hosts {
            allow_all
        } else {
            is_private_ip
        };
        Self::with_address_filter(settings, is_blocked)
    }

    /// Like [`new`](Self::new) with a custom blocklist. `allow_private_hosts`
    /// is ignored.
    pub fn with_address_filter(
        settings: UnfurlSettings,
        is_blocked: AddressFilter,
    ) -> Result<Self, UnfurlError> {
        let client = ReqwestClient::builder()
            .timeout(settings.timeout)
            .user_agent(settings.user_agent.as_str())
            .redirect(redirect_policy(is_blocked))
            .dns_resolver(Arc::new(GuardedResolver { is_blocked }))
            .build()?;

        Ok(Self {
            client,
            max_body_bytes: settings.max_body_bytes,
            is_blocked,
        })
    }

    async fn fetch(&self, url: &str) -> Result<Metadata, UnfurlError> {
        let parsed = Url::parse(url).map_err(|_| UnfurlError::InvalidUrl(url.to_string()))?;
        match parsed.scheme() {
            "http" | "https" => {}
            _ => return Err(UnfurlError::InvalidUrl(url.to_string())),
        }

        self.ensure_allowed_host(&parsed).await?;

        let mut response = self
            .client
            .get(parsed)
            .header(ACCEPT, ACCEPT_HTML)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(UnfurlError::Status(status.as_u16()));
        }

        if let Some(content_type) = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
        {
            let mime = content_type.split(';').next().unwrap_or("").trim();
            if !is_html(mime) {
                return Err(UnfurlError::UnsupportedContentType(mime.to_string()));
            }
        }

        let final_url = response.url().clone();
        let body = read_capped(&mut response, self.max_body_bytes).await?;
        let html = String::from_utf8_lossy(&body);
        if html.trim().is_empty() {
            return Err(UnfurlError::Parse("empty response body".into()));
        }

        Ok(Metadata {
            open_graph: parse::extract_open_graph(&html, Some(&final_url)),
        })
    }

    /// Resolve the first hop's host up front so a blocked target fails with a
    /// clear error before any connection is attempted.
    async fn ensure_allowed_host(&self, url: &Url) -> Result<(), UnfurlError> {
        if let Some(host) = blocked_literal(url, self.is_blocked) {
            return Err(UnfurlError::BlockedHost(host));
        }
        let domain = match url.host() {
            Some(Host::Domain(domain)) => domain,
            Some(_) => return Ok(()),
            None => return Err(UnfurlError::InvalidUrl(url.to_string())),
        };

        let port = url.port_or_known_default().unwrap_or(80);
        let addrs = tokio::net::lookup_host((domain, port))
            .await
            .map_err(|e| UnfurlError::Resolve {
                host: domain.to_string(),
                reason: e.to_string(),
            })?;
        for addr in addrs {
            if (self.is_blocked)(addr.ip()) {
                return Err(UnfurlError::BlockedHost(domain.to_string()));
            }
        }
        Ok(())
    }
}

impl Unfurler for HttpUnfurler {
    fn unfurl<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Metadata, UnfurlError>> {
        Box::pin(self.fetch(url))
    }
}

fn is_html(mime: &str) -> bool {
    mime.eq_ignore_ascii_case("text/html") || mime.eq_ignore_ascii_case("application/xhtml+xml")
}

/// Read at most `limit` bytes of the body. Open Graph tags live in `<head>`, so
/// a truncated document still parses usefully.
async fn read_capped(response: &mut Response, limit: usize) -> Result<Vec<u8>, UnfurlError> {
    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        let room = limit.saturating_sub(body.len());
        if chunk.len() >= room {
            body.extend_from_slice(&chunk[..room]);
            tracing::debug!(limit, "Truncated page body at byte limit");
            break;
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}
