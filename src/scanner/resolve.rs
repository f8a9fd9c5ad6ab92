//! Target host resolution.
//!
//! Supports IPv4/IPv6 literals and hostnames. Hostnames go through the
//! system resolver configuration (hosts file included) via trust-dns.

use crate::error::ScanError;
use crate::scanner::traits::Resolver;
use async_trait::async_trait;
use std::net::IpAddr;
use tracing::debug;
use trust_dns_resolver::config::{ResolverConfig, ResolverOpts};
use trust_dns_resolver::TokioAsyncResolver;

/// Resolver backed by trust-dns.
///
/// IPv4 addresses are preferred when a name has both families, matching the
/// IPv4-only sockets of the classic connect scanner.
#[derive(Debug, Clone, Copy, Default)]
pub struct DnsResolver;

impl DnsResolver {
    pub fn new() -> Self {
        Self
    }

    fn resolver() -> TokioAsyncResolver {
        TokioAsyncResolver::tokio_from_system_conf().unwrap_or_else(|e| {
            debug!(error = %e, "system resolver config unavailable, using defaults");
            TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default())
        })
    }
}

#[async_trait]
impl Resolver for DnsResolver {
    async fn resolve(&self, host: &str) -> Result<IpAddr, ScanError> {
        let unresolvable = |reason: String| ScanError::HostUnresolvable {
            host: host.to_string(),
            reason,
        };

        if let Some(ip) = parse_ip_literal(host) {
            return Ok(ip);
        }

        if !is_valid_hostname(host) {
            return Err(unresolvable("not a valid hostname or IP address".to_string()));
        }

        let response = Self::resolver()
            .lookup_ip(host)
            .await
            .map_err(|e| unresolvable(e.to_string()))?;

        let ips: Vec<IpAddr> = response.iter().collect();
        let chosen = ips
            .iter()
            .find(|ip| ip.is_ipv4())
            .or_else(|| ips.first())
            .copied()
            .ok_or_else(|| unresolvable("no addresses found".to_string()))?;

        debug!(host, address = %chosen, candidates = ips.len(), "resolved target");
        Ok(chosen)
    }
}

/// Parse an IP literal, accepting bracketed IPv6 (`[::1]`).
fn parse_ip_literal(host: &str) -> Option<IpAddr> {
    let trimmed = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    trimmed.parse().ok()
}

/// Check if a string is a syntactically valid hostname.
fn is_valid_hostname(s: &str) -> bool {
    if s.is_empty() || s.len() > 253 {
        return false;
    }

    let s = s.strip_suffix('.').unwrap_or(s);
    s.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && label.chars().next().is_some_and(|c| c.is_ascii_alphanumeric())
            && label.chars().last().is_some_and(|c| c.is_ascii_alphanumeric())
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    })
}
