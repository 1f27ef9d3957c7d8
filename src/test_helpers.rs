//! Test doubles for the network seams
//!
//! [`MockTransport`] answers requests from a route table and records every request it
//! receives. [`StaticResolver`] resolves every host to a fixed public address unless told
//! otherwise, so pipeline tests never touch real DNS.

use crate::error::TransportError;
use crate::transport::{FetchRequest, Transport};
use crate::url_guard::Resolver;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Canned outcome for one request
#[derive(Clone, Debug)]
pub enum MockResponse {
    /// 2xx with this body
    Body(String),
    /// Non-success HTTP status
    Status(u16),
    /// TLS handshake/certificate failure
    Tls,
    /// Connection refused
    ConnectRefused,
    /// Sleep this long, then fail as a timeout (lets the caller's timer win)
    Hang(Duration),
}

impl MockResponse {
    /// Shorthand for [`MockResponse::Body`]
    pub fn body(body: impl Into<String>) -> Self {
        MockResponse::Body(body.into())
    }
}

/// In-memory [`Transport`]
///
/// Responses registered for a URL are consumed in order; the last one repeats. Unknown
/// URLs answer 404.
#[derive(Debug, Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<String, VecDeque<MockResponse>>>,
    requests: Mutex<Vec<FetchRequest>>,
    arrivals: Mutex<Vec<Instant>>,
}

impl MockTransport {
    /// Empty route table
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `response` for `url`
    pub fn route(self, url: &str, response: MockResponse) -> Self {
        self.add_route(url, response);
        self
    }

    /// Queue `response` for `url` on a shared transport
    pub fn add_route(&self, url: &str, response: MockResponse) {
        if let Ok(mut routes) = self.routes.lock() {
            routes.entry(url.to_string()).or_default().push_back(response);
        }
    }

    /// Every request received, in order
    pub fn requests(&self) -> Vec<FetchRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Requested URLs, in order
    pub fn requested_urls(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .map(|r| r.url.to_string())
            .collect()
    }

    /// When each request arrived, in order
    pub fn arrivals(&self) -> Vec<Instant> {
        self.arrivals.lock().map(|a| a.clone()).unwrap_or_default()
    }

    /// Number of requests received
    pub fn request_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    fn next_response(&self, url: &str) -> Option<MockResponse> {
        let mut routes = self.routes.lock().ok()?;
        let queue = routes.get_mut(url)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, request: &FetchRequest) -> Result<String, TransportError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        if let Ok(mut arrivals) = self.arrivals.lock() {
            arrivals.push(Instant::now());
        }

        let url = request.url.to_string();
        match self.next_response(&url) {
            Some(MockResponse::Body(body)) => Ok(body),
            Some(MockResponse::Status(status)) => Err(TransportError::Status { url, status }),
            Some(MockResponse::Tls) => Err(TransportError::Tls {
                url,
                message: "invalid peer certificate: Expired".to_string(),
            }),
            Some(MockResponse::ConnectRefused) => Err(TransportError::Connect {
                url,
                message: "Connection refused (os error 111)".to_string(),
            }),
            Some(MockResponse::Hang(duration)) => {
                tokio::time::sleep(duration).await;
                Err(TransportError::Timeout {
                    url,
                    after: duration,
                })
            }
            None => Err(TransportError::Status { url, status: 404 }),
        }
    }
}

/// [`Resolver`] with a fixed answer table
#[derive(Debug, Clone)]
pub struct StaticResolver {
    default: Option<IpAddr>,
    hosts: HashMap<String, IpAddr>,
}

impl StaticResolver {
    /// Resolve every host to a documentation-range public address
    pub fn public() -> Self {
        Self {
            default: Some(IpAddr::V4(Ipv4Addr::new(93, 184, 216, 34))),
            hosts: HashMap::new(),
        }
    }

    /// Resolve nothing unless overridden
    pub fn empty() -> Self {
        Self {
            default: None,
            hosts: HashMap::new(),
        }
    }

    /// Override the answer for `host`
    pub fn with_host(mut self, host: &str, ip: IpAddr) -> Self {
        self.hosts.insert(host.to_string(), ip);
        self
    }
}

#[async_trait]
impl Resolver for StaticResolver {
    async fn resolve(&self, host: &str, _port: u16) -> std::io::Result<Vec<IpAddr>> {
        match self.hosts.get(host).copied().or(self.default) {
            Some(ip) => Ok(vec![ip]),
            None => Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no such host: {host}"),
            )),
        }
    }
}
