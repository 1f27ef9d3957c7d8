//! In-memory network doubles for crawls that must not touch the network

use async_trait::async_trait;
use feed_harvest::TransportError;
use feed_harvest::transport::{FetchRequest, Transport};
use feed_harvest::url_guard::Resolver;
use std::collections::{HashMap, VecDeque};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Mutex;
use std::time::Duration;

/// Canned outcome of one GET
#[derive(Clone, Debug)]
pub enum MockResponse {
    Body(String),
    Status(u16),
    Tls,
    ConnectRefused,
    /// Sleep, then fail as a timeout
    Hang(Duration),
}

/// Route table keyed by URL; queued responses are consumed and the last one repeats
#[derive(Debug, Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<String, VecDeque<MockResponse>>>,
    seen: Mutex<Vec<String>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(self, url: &str, response: MockResponse) -> Self {
        self.add_route(url, response);
        self
    }

    pub fn add_route(&self, url: &str, response: MockResponse) {
        self.routes
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(response);
    }

    pub fn requested_urls(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }

    fn respond(&self, url: &str) -> Option<MockResponse> {
        let mut routes = self.routes.lock().unwrap();
        let queue = routes.get_mut(url)?;
        if queue.len() > 1 { queue.pop_front() } else { queue.front().cloned() }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, request: &FetchRequest) -> Result<String, TransportError> {
        let url = request.url.to_string();
        self.seen.lock().unwrap().push(url.clone());

        match self.respond(&url) {
            Some(MockResponse::Body(body)) => Ok(body),
            Some(MockResponse::Status(status)) => Err(TransportError::Status { url, status }),
            Some(MockResponse::Tls) => Err(TransportError::Tls {
                url,
                message: "certificate has expired".to_string(),
            }),
            Some(MockResponse::ConnectRefused) => Err(TransportError::Connect {
                url,
                message: "connection refused".to_string(),
            }),
            Some(MockResponse::Hang(after)) => {
                tokio::time::sleep(after).await;
                Err(TransportError::Timeout { url, after })
            }
            None => Err(TransportError::Status { url, status: 404 }),
        }
    }
}

/// Resolves every host to one public address
#[derive(Debug, Clone, Copy)]
pub struct PublicResolver;

#[async_trait]
impl Resolver for PublicResolver {
    async fn resolve(&self, _host: &str, _port: u16) -> std::io::Result<Vec<IpAddr>> {
        Ok(vec![IpAddr::V4(Ipv4Addr::new(93, 184, 216, 34))])
    }
}
