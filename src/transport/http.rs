//! `reqwest`-backed [`Transport`].
//!
//! Every connection the client opens, redirect hops included, resolves names through
//! [`UrlGuard::resolve_checked`], so the address actually connected to is the one the
//! guard approved.

use super::{FetchRequest, Transport};
use crate::config::FetchConfig;
use crate::error::TransportError;
use crate::url_guard::UrlGuard;
use async_trait::async_trait;
use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, REFERER, USER_AGENT};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Error-chain text of a connection the guard refused at resolution time
const GUARD_REFUSAL: &str = "refused by url guard";

/// Substrings of an error chain that mark a TLS-class failure
const TLS_MARKERS: &[&str] = &[
    "certificate",
    "handshake",
    "tls",
    "ssl",
    "x509",
    "peer sent no certificates",
];

/// Substrings of an error chain that mark a name-resolution failure
const DNS_MARKERS: &[&str] = &[
    "dns error",
    "failed to lookup address",
    "name or service not known",
    "no such host",
    "nodename nor servname",
];

type LookupError = Box<dyn std::error::Error + Send + Sync>;

/// Lookup failure raised when a resolved address is blocked
#[derive(Debug, thiserror::Error)]
#[error("{}: {}", GUARD_REFUSAL, .0)]
struct GuardRefusal(TransportError);

/// DNS resolver handed to `reqwest`; refuses names that resolve to blocked addresses
#[derive(Debug, Clone)]
struct GuardedDns {
    guard: UrlGuard,
}

impl Resolve for GuardedDns {
    fn resolve(&self, name: Name) -> Resolving {
        let guard = self.guard.clone();
        Box::pin(async move {
            let host = name.as_str().trim_end_matches('.').to_ascii_lowercase();
            // The connector fills in the port
            let addresses = guard
                .resolve_checked(&host, &host, 0)
                .await
                .map_err(|e| -> LookupError {
                    if e.is_unsafe_target() {
                        Box::new(GuardRefusal(e))
                    } else {
                        Box::new(e)
                    }
                })?;
            let addrs: Addrs = Box::new(addresses.into_iter().map(|ip| SocketAddr::new(ip, 0)));
            Ok::<_, LookupError>(addrs)
        })
    }
}

/// HTTP transport over a caller-owned `reqwest::Client`
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a client with connection timeouts, a guard-backed DNS resolver and a
    /// redirect policy that refuses hops to blocked hosts or literal private addresses
    pub fn new(config: &FetchConfig, guard: &UrlGuard) -> Result<Self, reqwest::Error> {
        let max_redirects = config.max_redirects;
        let redirect_guard = guard.clone();
        let redirect_policy = reqwest::redirect::Policy::custom(move |attempt| {
            if attempt.previous().len() > max_redirects {
                return attempt.error(format!("more than {max_redirects} redirects"));
            }
            match redirect_guard.check_syntax(attempt.url()) {
                Ok(()) => attempt.follow(),
                Err(e) => attempt.error(e),
            }
        });

        let client = reqwest::Client::builder()
            .redirect(redirect_policy)
            .dns_resolver(Arc::new(GuardedDns {
                guard: guard.clone(),
            }))
            .connect_timeout(Duration::from_secs(5))
            .timeout(config.page_timeout.max(config.feed_timeout))
            .gzip(true)
            .build()?;

        Ok(Self { client })
    }

    /// Wrap an already configured client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, request: &FetchRequest) -> Result<String, TransportError> {
        let url = request.url.as_str();
        debug!(url = %url, "HTTP GET");

        let mut builder = self
            .client
            .get(request.url.clone())
            .header(USER_AGENT, &request.user_agent)
            .header(ACCEPT, request.accept)
            .header(ACCEPT_LANGUAGE, "ko-KR,ko;q=0.9,en-US;q=0.8,en;q=0.7");
        if let Some(referer) = &request.referer {
            builder = builder.header(REFERER, referer);
        }

        let response = builder.send().await.map_err(|e| classify(url, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| TransportError::Body {
            url: url.to_string(),
            message: error_chain(&e),
        })
    }
}

/// Map a `reqwest` error onto the transport taxonomy by inspecting its source chain
fn classify(url: &str, error: &reqwest::Error) -> TransportError {
    let message = error_chain(error);
    let lowered = message.to_ascii_lowercase();
    let url = url.to_string();

    if error.is_timeout() {
        return TransportError::Timeout {
            url,
            after: Duration::ZERO,
        };
    }
    if lowered.contains(GUARD_REFUSAL) {
        return TransportError::Request { url, message };
    }
    if TLS_MARKERS.iter().any(|m| lowered.contains(m)) {
        return TransportError::Tls { url, message };
    }
    if DNS_MARKERS.iter().any(|m| lowered.contains(m)) {
        return TransportError::Dns { url, message };
    }
    if error.is_connect() {
        return TransportError::Connect { url, message };
    }
    if error.is_body() || error.is_decode() {
        return TransportError::Body { url, message };
    }
    TransportError::Request { url, message }
}

/// Join an error and all of its sources into one line
fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut parts = vec![error.to_string()];
    let mut source = error.source();
    while let Some(inner) = source {
        parts.push(inner.to_string());
        source = inner.source();
    }
    parts.join(": ")
}
