//! Forward DNS resolution for hostname entries in spider IP lists.

use once_cell::sync::OnceCell;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;
use trust_dns_resolver::config::{LookupIpStrategy, ResolverConfig, ResolverOpts};
use trust_dns_resolver::error::{ResolveError, ResolveErrorKind};
use trust_dns_resolver::Resolver;

use crate::error::ResolutionError;

/// Default DNS timeout for hostname entries.
pub const DEFAULT_DNS_TIMEOUT: Duration = Duration::from_millis(200);

/// Resolves a hostname to an IPv4 address.
///
/// Implementations must bound the time spent per lookup; the spider IP
/// loader calls this once for every hostname entry it finds.
pub trait ForwardResolver: Send + Sync {
    /// Resolve `host` to its first IPv4 address.
    fn resolve_ipv4(&self, host: &str) -> Result<Ipv4Addr, ResolutionError>;
}

/// Check whether an IP list entry names a host rather than an address.
pub fn is_hostname_entry(pattern: &str) -> bool {
    !pattern
        .chars()
        .next()
        .map(|c| c.is_ascii_digit())
        .unwrap_or(false)
}

/// Resolver backed by the system DNS configuration.
///
/// The underlying resolver is built on first use, so constructing one is
/// free when the IP lists hold no hostnames.
pub struct DnsForwardResolver {
    timeout: Duration,
    resolver: OnceCell<Resolver>,
}

impl DnsForwardResolver {
    /// Create a resolver with the given per-query timeout.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            resolver: OnceCell::new(),
        }
    }

    /// Get the per-query timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn resolver(&self) -> std::io::Result<&Resolver> {
        self.resolver.get_or_try_init(|| {
            let (config, opts) = trust_dns_resolver::system_conf::read_system_conf()
                .unwrap_or_else(|e| {
                    log::debug!("Using default resolver config: {}", e);
                    (ResolverConfig::default(), ResolverOpts::default())
                });
            Resolver::new(config, lookup_opts(opts, self.timeout))
        })
    }
}

/// Restrict resolver options to a single A query bounded by `timeout`.
fn lookup_opts(mut opts: ResolverOpts, timeout: Duration) -> ResolverOpts {
    opts.timeout = timeout;
    opts.attempts = 1;
    opts.ip_strategy = LookupIpStrategy::Ipv4Only;
    opts
}

impl Default for DnsForwardResolver {
    fn default() -> Self {
        Self::new(DEFAULT_DNS_TIMEOUT)
    }
}

impl ForwardResolver for DnsForwardResolver {
    fn resolve_ipv4(&self, host: &str) -> Result<Ipv4Addr, ResolutionError> {
        let resolver = self.resolver().map_err(|e| ResolutionError::Lookup {
            host: host.to_string(),
            reason: e.to_string(),
        })?;

        let addrs: Vec<IpAddr> = match resolver.lookup_ip(host) {
            Ok(lookup) => lookup.iter().collect(),
            Err(e) => return Err(map_resolve_error(host, &e)),
        };

        first_ipv4(host, &addrs)
    }
}

/// Pick the first IPv4 address out of a lookup result.
fn first_ipv4(host: &str, addrs: &[IpAddr]) -> Result<Ipv4Addr, ResolutionError> {
    if addrs.is_empty() {
        return Err(ResolutionError::EmptyResponse(host.to_string()));
    }
    addrs
        .iter()
        .find_map(|addr| match addr {
            IpAddr::V4(v4) => Some(*v4),
            IpAddr::V6(_) => None,
        })
        .ok_or_else(|| ResolutionError::NoARecord(host.to_string()))
}

fn map_resolve_error(host: &str, err: &ResolveError) -> ResolutionError {
    match err.kind() {
        ResolveErrorKind::NoRecordsFound { .. } => ResolutionError::EmptyResponse(host.to_string()),
        ResolveErrorKind::Timeout => ResolutionError::Timeout(host.to_string()),
        _ => ResolutionError::Lookup {
            host: host.to_string(),
            reason: err.to_string(),
        },
    }
}

/// Resolve `host` once with a fresh system resolver.
pub fn resolve_ipv4(host: &str, timeout: Duration) -> Result<Ipv4Addr, ResolutionError> {
    DnsForwardResolver::new(timeout).resolve_ipv4(host)
}
