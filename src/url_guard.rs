//! URL validation for SSRF protection
//!
//! Two gates live here:
//! - [`check_feed_url`] is the entry-point policy: the submitted feed must be on an
//!   allow-listed host and end with the required path suffix.
//! - [`UrlGuard`] is the network-level check applied to *every* outbound request. It
//!   rejects private, loopback and link-local targets both syntactically and after DNS
//!   resolution. Resolution happens on every call, so a hostname that flips to a private
//!   address between requests (DNS rebinding) is still caught. The same checked lookup
//!   ([`UrlGuard::resolve_checked`]) backs the HTTP client's own connections, redirect
//!   hops included.

use crate::config::FeedPolicy;
use crate::error::{SecurityError, TransportError};
use async_trait::async_trait;
use ipnet::IpNet;
use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::Arc;
use url::{Host, Url};

/// Address ranges no request may reach
const BLOCKED_RANGES: &[&str] = &[
    "0.0.0.0/8",          // "this" network
    "10.0.0.0/8",         // private
    "100.64.0.0/10",      // carrier-grade NAT
    "127.0.0.0/8",        // loopback
    "169.254.0.0/16",     // link-local / cloud metadata
    "172.16.0.0/12",      // private
    "192.0.0.0/24",       // IETF protocol assignments
    "192.168.0.0/16",     // private
    "198.18.0.0/15",      // benchmarking
    "224.0.0.0/4",        // multicast
    "255.255.255.255/32", // broadcast
    "::/128",             // unspecified
    "::1/128",            // IPv6 loopback
    "fc00::/7",           // IPv6 unique local
    "fe80::/10",          // IPv6 link-local
    "ff00::/8",           // IPv6 multicast
    "64:ff9b:1::/48",     // local-use NAT64
];

/// Hostnames blocked by name regardless of what they resolve to
const BLOCKED_HOSTS: &[&str] = &[
    "localhost",
    "metadata.google.internal",
    "metadata.gke.internal",
    "instance-data",
];

/// DNS resolution seam, so tests can simulate rebinding without a real resolver
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Resolve `host` to its addresses
    async fn resolve(&self, host: &str, port: u16) -> std::io::Result<Vec<IpAddr>>;
}

/// Resolver backed by the operating system (`tokio::net::lookup_host`)
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemResolver;

#[async_trait]
impl Resolver for SystemResolver {
    async fn resolve(&self, host: &str, port: u16) -> std::io::Result<Vec<IpAddr>> {
        let addrs = tokio::net::lookup_host((host, port)).await?;
        Ok(addrs.map(|addr| addr.ip()).collect())
    }
}

/// Network-level guard run before every outbound request
#[derive(Clone)]
pub struct UrlGuard {
    blocked_ranges: Vec<IpNet>,
    blocked_hosts: HashSet<String>,
    exempt_hosts: HashSet<String>,
    resolver: Arc<dyn Resolver>,
}

impl std::fmt::Debug for UrlGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UrlGuard")
            .field("blocked_ranges", &self.blocked_ranges)
            .field("blocked_hosts", &self.blocked_hosts)
            .field("exempt_hosts", &self.exempt_hosts)
            .finish_non_exhaustive()
    }
}

impl Default for UrlGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl UrlGuard {
    /// Create a guard with the default blocklists and the system resolver
    pub fn new() -> Self {
        Self {
            blocked_ranges: BLOCKED_RANGES
                .iter()
                .filter_map(|cidr| cidr.parse().ok())
                .collect(),
            blocked_hosts: BLOCKED_HOSTS.iter().map(|h| (*h).to_string()).collect(),
            exempt_hosts: HashSet::new(),
            resolver: Arc::new(SystemResolver),
        }
    }

    /// Use a different resolver
    pub fn with_resolver(mut self, resolver: Arc<dyn Resolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Exempt a host from all checks (for local test servers only)
    pub fn allow_host(mut self, host: impl Into<String>) -> Self {
        self.exempt_hosts.insert(host.into().to_ascii_lowercase());
        self
    }

    /// Block an additional CIDR range
    pub fn block_cidr(mut self, cidr: IpNet) -> Self {
        self.blocked_ranges.push(cidr);
        self
    }

    /// True if `ip` falls in a blocked range
    ///
    /// IPv6 forms carrying an IPv4 address (mapped, compatible, NAT64, 6to4) are also
    /// checked as that IPv4 address.
    pub fn is_blocked_ip(&self, ip: IpAddr) -> bool {
        let in_range = |ip: IpAddr| self.blocked_ranges.iter().any(|range| range.contains(&ip));
        match ip {
            IpAddr::V6(v6) => {
                in_range(ip) || embedded_ipv4(v6).is_some_and(|v4| in_range(IpAddr::V4(v4)))
            }
            v4 => in_range(v4),
        }
    }

    fn is_blocked_name(&self, host: &str) -> bool {
        self.blocked_hosts.contains(host) || host.ends_with(".localhost")
    }

    /// Syntactic checks only: scheme, host presence, blocked names and literal addresses
    pub fn check_syntax(&self, url: &Url) -> Result<(), SecurityError> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(SecurityError::DisallowedScheme(url.scheme().to_string()));
        }

        let host = url.host().ok_or(SecurityError::NoHost)?;
        let host_str = url.host_str().unwrap_or_default().to_ascii_lowercase();
        if self.exempt_hosts.contains(&host_str) {
            return Ok(());
        }

        match host {
            Host::Domain(domain) => {
                let domain = domain.trim_end_matches('.').to_ascii_lowercase();
                if self.is_blocked_name(&domain) {
                    return Err(SecurityError::BlockedHost(domain));
                }
            }
            Host::Ipv4(v4) => self.check_address(&host_str, IpAddr::V4(v4))?,
            Host::Ipv6(v6) => self.check_address(&host_str, IpAddr::V6(v6))?,
        }
        Ok(())
    }

    fn check_address(&self, host: &str, address: IpAddr) -> Result<(), SecurityError> {
        if self.is_blocked_ip(address) {
            return Err(SecurityError::BlockedAddress {
                host: host.to_string(),
                address,
            });
        }
        Ok(())
    }

    /// Full check for one outbound request: syntax, then DNS resolution of named hosts
    ///
    /// Returns the parsed URL on success. A guard refusal is
    /// [`TransportError::Unsafe`] (terminal); a resolver failure is
    /// [`TransportError::Dns`] (retryable).
    pub async fn assert_fetchable(&self, url: &str) -> Result<Url, TransportError> {
        let parsed = Url::parse(url).map_err(|e| TransportError::InvalidUrl(format!("{url}: {e}")))?;
        self.check_syntax(&parsed)?;

        let Some(Host::Domain(domain)) = parsed.host() else {
            return Ok(parsed);
        };
        let domain = domain.trim_end_matches('.').to_ascii_lowercase();
        if self.exempt_hosts.contains(&domain) {
            return Ok(parsed);
        }

        let port = parsed.port_or_known_default().unwrap_or(443);
        self.resolve_checked(url, &domain, port).await?;
        Ok(parsed)
    }

    /// Resolve `domain` and refuse it if any answer is a blocked address
    ///
    /// Exempt hosts are resolved without the address check. `url` is only used for
    /// error context.
    pub async fn resolve_checked(
        &self,
        url: &str,
        domain: &str,
        port: u16,
    ) -> Result<Vec<IpAddr>, TransportError> {
        let addresses = self
            .resolver
            .resolve(domain, port)
            .await
            .map_err(|e| TransportError::Dns {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        if addresses.is_empty() {
            return Err(TransportError::Dns {
                url: url.to_string(),
                message: format!("{domain} resolved to no addresses"),
            });
        }
        if self.exempt_hosts.contains(domain) {
            return Ok(addresses);
        }

        if let Some(&address) = addresses.iter().find(|ip| self.is_blocked_ip(**ip)) {
            tracing::warn!(
                url = %url,
                host = %domain,
                address = %address,
                "Hostname resolved to a blocked address"
            );
            return Err(SecurityError::BlockedAddress {
                host: domain.to_string(),
                address,
            }
            .into());
        }

        Ok(addresses)
    }
}

/// IPv4 address carried inside an IPv6 one, for the transition forms that route to it
fn embedded_ipv4(v6: Ipv6Addr) -> Option<Ipv4Addr> {
    let segments = v6.segments();
    let from_tail = || Ipv4Addr::from(((segments[6] as u32) << 16) | segments[7] as u32);
    match segments {
        // ::ffff:a.b.c.d
        [0, 0, 0, 0, 0, 0xffff, _, _] => Some(from_tail()),
        // ::a.b.c.d (deprecated IPv4-compatible)
        [0, 0, 0, 0, 0, 0, _, _] => Some(from_tail()),
        // 64:ff9b::a.b.c.d
        [0x64, 0xff9b, 0, 0, 0, 0, _, _] => Some(from_tail()),
        // 2002:aabb:ccdd::/48
        [0x2002, high, low, ..] => Some(Ipv4Addr::from(((high as u32) << 16) | low as u32)),
        _ => None,
    }
}

/// Entry-point policy for the submitted feed URL
pub fn check_feed_url(policy: &FeedPolicy, url: &str) -> Result<Url, SecurityError> {
    let parsed = Url::parse(url.trim())?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(SecurityError::DisallowedScheme(parsed.scheme().to_string()));
    }

    let host = parsed.host_str().ok_or(SecurityError::NoHost)?.to_ascii_lowercase();
    if !policy
        .allowed_hosts
        .iter()
        .any(|allowed| allowed.eq_ignore_ascii_case(&host))
    {
        return Err(SecurityError::FeedHostNotAllowed(host));
    }

    if !parsed.path().ends_with(&policy.required_suffix) {
        return Err(SecurityError::FeedPathNotAllowed {
            path: parsed.path().to_string(),
            required: policy.required_suffix.clone(),
        });
    }

    Ok(parsed)
}
