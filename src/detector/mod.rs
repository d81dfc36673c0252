//! Spider classification.

mod config;

pub use config::{SpiderConfig, DEFAULT_DNS_TIMEOUT_MS, DEFAULT_SPIDERS_DIR};

use once_cell::sync::OnceCell;
use regex::Regex;
use std::collections::BTreeSet;
use std::io;
use std::path::Path;

use crate::export;
use crate::pattern::{self, PatternKind};
use crate::request::{SpiderRequest, FORWARDED_FOR_HEADER, USER_AGENT_HEADER};
use crate::resolver::{is_hostname_entry, DnsForwardResolver, ForwardResolver};
use crate::table::IpRangeTable;

/// SpiderDetector decides whether a request comes from a robot.
///
/// Rule files are read lazily, each set at most once per detector, even
/// when many threads hit the detector at the same time. After loading, all
/// checks are plain in-memory lookups.
///
/// Checks run in this order and the first match wins:
/// 1. User-Agent against the agent patterns
/// 2. Every `X-Forwarded-For` address against the IP table (if proxies are trusted)
/// 3. Client address against the IP table
/// 4. Reverse hostname against the domain patterns
///
/// # Examples
/// ```no_run
/// use spiderdetect::{SpiderConfig, SpiderDetector};
///
/// let detector = SpiderDetector::new(
///     SpiderConfig::new("/srv/dspace/config/spiders").with_case_insensitive(true),
/// );
/// detector.warm_up();
///
/// let bot = detector.is_spider(
///     "203.0.113.5",
///     None,
///     None,
///     Some("Mozilla/5.0 (compatible; Googlebot/2.1)"),
/// );
/// ```
pub struct SpiderDetector {
    config: SpiderConfig,
    resolver: Box<dyn ForwardResolver>,
    table: OnceCell<IpRangeTable>,
    agents: OnceCell<Vec<Regex>>,
    domains: OnceCell<Vec<Regex>>,
    filter_query: OnceCell<String>,
}

impl SpiderDetector {
    /// Create a detector that resolves hostname entries through system DNS.
    pub fn new(config: SpiderConfig) -> Self {
        let resolver = DnsForwardResolver::new(config.dns_timeout());
        Self::with_resolver(config, Box::new(resolver))
    }

    /// Create a detector with a custom hostname resolver.
    pub fn with_resolver(config: SpiderConfig, resolver: Box<dyn ForwardResolver>) -> Self {
        Self {
            config,
            resolver,
            table: OnceCell::new(),
            agents: OnceCell::new(),
            domains: OnceCell::new(),
            filter_query: OnceCell::new(),
        }
    }

    /// Get the configuration for this detector.
    pub fn config(&self) -> &SpiderConfig {
        &self.config
    }

    /// Load every rule set now instead of on first use.
    pub fn warm_up(&self) {
        let table = self.load_spider_ip_addresses();
        let agents = self.agent_patterns();
        let domains = self.domain_patterns();
        log::info!(
            "Spider rules ready: {} IP entries, {} agent patterns, {} domain patterns",
            table.len(),
            agents.len(),
            domains.len()
        );
    }

    /// Check a request signature against every rule set.
    pub fn is_spider(
        &self,
        client_ip: &str,
        proxy_ips: Option<&str>,
        hostname: Option<&str>,
        user_agent: Option<&str>,
    ) -> bool {
        let mut hostname = hostname.filter(|h| !h.is_empty()).map(str::to_string);

        if let Some(agent) = user_agent.filter(|a| !a.is_empty()) {
            let agents = self.agent_patterns();
            let agent = if self.config.case_insensitive {
                // Hostname is only folded once an agent is present.
                hostname = hostname.map(|h| h.to_lowercase());
                agent.to_lowercase()
            } else {
                agent.to_string()
            };
            if agents.iter().any(|pattern| pattern.is_match(&agent)) {
                log::debug!("Spider matched by agent: {}", agent);
                return true;
            }
        }

        if self.config.use_proxies {
            if let Some(chain) = proxy_ips {
                let matched = chain
                    .split(',')
                    .map(str::trim)
                    .filter(|ip| !ip.is_empty())
                    .any(|ip| self.is_spider_ip(ip));
                if matched {
                    return true;
                }
            }
        }

        if self.is_spider_ip(client_ip) {
            return true;
        }

        if let Some(hostname) = hostname {
            let domains = self.domain_patterns();
            if domains.iter().any(|pattern| pattern.is_match(&hostname)) {
                log::debug!("Spider matched by hostname: {}", hostname);
                return true;
            }
        }

        false
    }

    /// Check a request using the fields the HTTP layer exposes.
    pub fn is_spider_request<R: SpiderRequest + ?Sized>(&self, request: &R) -> bool {
        self.is_spider(
            request.remote_addr().unwrap_or_default(),
            request.header(FORWARDED_FOR_HEADER),
            request.remote_host(),
            request.header(USER_AGENT_HEADER),
        )
    }

    /// Check a single address against the spider IP table.
    ///
    /// Malformed addresses are not spiders.
    pub fn is_spider_ip(&self, ip: &str) -> bool {
        match self.load_spider_ip_addresses().contains(ip) {
            Ok(found) => found,
            Err(e) => {
                log::debug!("Treating malformed address as non-spider: {}", e);
                false
            }
        }
    }

    /// Whether a usage event for this request should be recorded.
    pub fn should_log_usage<R: SpiderRequest + ?Sized>(&self, request: &R) -> bool {
        self.config.log_bots || !self.is_spider_request(request)
    }

    /// Get the spider IP table, loading it on first use.
    pub fn load_spider_ip_addresses(&self) -> &IpRangeTable {
        self.table.get_or_init(|| self.build_ip_table())
    }

    /// Get every entry of the spider IP table.
    pub fn spider_ip_addresses(&self) -> BTreeSet<String> {
        self.load_spider_ip_addresses().to_set()
    }

    /// Get the statistics filter clause excluding all spider addresses.
    pub fn exclusion_filter(&self) -> &str {
        self.filter_query
            .get_or_init(|| export::exclusion_filter(self.spider_ip_addresses()))
    }

    /// Get the compiled User-Agent patterns, loading them on first use.
    pub fn agent_patterns(&self) -> &[Regex] {
        self.agents.get_or_init(|| self.build_patterns(PatternKind::Agents))
    }

    /// Get the compiled hostname patterns, loading them on first use.
    pub fn domain_patterns(&self) -> &[Regex] {
        self.domains.get_or_init(|| self.build_patterns(PatternKind::Domains))
    }

    /// Read the patterns from a single file.
    pub fn read_patterns(&self, path: impl AsRef<Path>) -> io::Result<BTreeSet<String>> {
        pattern::read_patterns(path)
    }

    fn build_patterns(&self, kind: PatternKind) -> Vec<Regex> {
        let dir = kind.dir(&self.config.spiders_dir);
        let raw = pattern::load_patterns_from_directory(&dir, self.config.case_insensitive);
        let compiled = pattern::compile_patterns(&raw);
        log::info!(
            "Loaded {} {} patterns from {:?}",
            compiled.len(),
            kind.as_str(),
            dir
        );
        compiled
    }

    fn build_ip_table(&self) -> IpRangeTable {
        let dir = PatternKind::Ips.dir(&self.config.spiders_dir);
        let mut table = IpRangeTable::new();

        for entry in pattern::load_patterns_from_directory(&dir, false) {
            let spec = if is_hostname_entry(&entry) {
                match self.resolver.resolve_ipv4(&entry) {
                    Ok(ip) => ip.to_string(),
                    Err(e) => {
                        log::warn!("Skipping spider entry {}: {}", entry, e);
                        continue;
                    }
                }
            } else {
                entry
            };

            if let Err(e) = table.add(&spec) {
                log::warn!("Skipping spider entry: {}", e);
            }
        }

        log::info!("Loaded {} spider IP entries from {:?}", table.len(), dir);
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResolutionError;
    use crate::request::RequestInfo;
    use std::fs;
    use std::net::Ipv4Addr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::{tempdir, TempDir};

    /// Resolver answering from a fixed table and counting calls.
    struct StaticResolver {
        hosts: Vec<(&'static str, Ipv4Addr)>,
        calls: Arc<AtomicUsize>,
    }

    impl ForwardResolver for StaticResolver {
        fn resolve_ipv4(&self, host: &str) -> Result<Ipv4Addr, ResolutionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.hosts
                .iter()
                .find(|(name, _)| *name == host)
                .map(|(_, ip)| *ip)
                .ok_or_else(|| ResolutionError::NoARecord(host.to_string()))
        }
    }

    fn spiders_dir(ips: &str, agents: &str, domains: &str) -> TempDir {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("ips.txt"), ips).unwrap();
        fs::create_dir(dir.path().join("agents")).unwrap();
        fs::write(dir.path().join("agents").join("list.txt"), agents).unwrap();
        fs::create_dir(dir.path().join("domains")).unwrap();
        fs::write(dir.path().join("domains").join("list.txt"), domains).unwrap();
        dir
    }

    fn detector(dir: &TempDir, config: SpiderConfig) -> (SpiderDetector, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let resolver = StaticResolver {
            hosts: vec![("crawler.example.org", Ipv4Addr::new(192, 0, 2, 77))],
            calls: calls.clone(),
        };
        let config = SpiderConfig {
            spiders_dir: dir.path().to_path_buf(),
            ..config
        };
        (SpiderDetector::with_resolver(config, Box::new(resolver)), calls)
    }

    #[test]
    fn test_agent_match_case_insensitive() {
        let dir = spiders_dir("", "GoogleBot\n", "");
        let (detector, _) = detector(&dir, SpiderConfig::default().with_case_insensitive(true));

        assert!(detector.is_spider("203.0.113.5", None, None, Some("googlebot/2.1")));
        assert!(detector.is_spider(
            "203.0.113.5",
            None,
            None,
            Some("Mozilla/5.0 (compatible; Googlebot/2.1)")
        ));
        assert!(!detector.is_spider("203.0.113.5", None, None, Some("Mozilla/5.0 Firefox")));
    }

    #[test]
    fn test_agent_match_case_sensitive() {
        let dir = spiders_dir("", "Googlebot\n", "");
        let (detector, _) = detector(&dir, SpiderConfig::default());

        assert!(detector.is_spider("203.0.113.5", None, None, Some("Googlebot/2.1")));
        assert!(!detector.is_spider("203.0.113.5", None, None, Some("googlebot/2.1")));
    }

    #[test]
    fn test_ip_subnet() {
        let dir = spiders_dir("198.51.100\n", "", "");
        let (detector, _) = detector(&dir, SpiderConfig::default());

        assert!(detector.is_spider("198.51.100.42", None, None, None));
        assert!(!detector.is_spider("198.51.101.42", None, None, None));
    }

    #[test]
    fn test_proxy_chain_needs_trust() {
        let dir = spiders_dir("198.51.100\n", "", "");
        let chain = Some("10.0.0.1, 198.51.100.7");

        let (untrusted, _) = detector(&dir, SpiderConfig::default());
        assert!(!untrusted.is_spider("10.0.0.2", chain, None, None));

        let (trusted, _) = detector(&dir, SpiderConfig::default().with_use_proxies(true));
        assert!(trusted.is_spider("10.0.0.2", chain, None, None));
        assert!(!trusted.is_spider("10.0.0.2", Some("10.0.0.1,,garbage"), None, None));
    }

    #[test]
    fn test_domain_match() {
        let dir = spiders_dir("", "", r"\.googlebot\.com$");
        let (detector, _) = detector(&dir, SpiderConfig::default());

        assert!(detector.is_spider(
            "10.0.0.1",
            None,
            Some("crawl-66-249-66-1.googlebot.com"),
            None
        ));
        assert!(!detector.is_spider("10.0.0.1", None, Some("www.example.com"), None));
    }

    #[test]
    fn test_hostname_folded_only_with_agent() {
        let dir = spiders_dir("", "", r"\.googlebot\.com$");
        let (detector, _) = detector(&dir, SpiderConfig::default().with_case_insensitive(true));
        let host = Some("CRAWL-1.GOOGLEBOT.COM");

        assert!(detector.is_spider("10.0.0.1", None, host, Some("Mozilla/5.0")));
        assert!(!detector.is_spider("10.0.0.1", None, host, None));
    }

    #[test]
    fn test_empty_agent_and_hostname_are_absent() {
        let dir = spiders_dir("", "^$\n", "^$\n");
        let (detector, _) = detector(&dir, SpiderConfig::default());

        assert!(!detector.is_spider("10.0.0.1", None, Some(""), Some("")));
        assert!(!detector.is_spider("10.0.0.1", None, None, Some("Wget/1.21")));
    }

    #[test]
    fn test_empty_agent_does_not_fold_hostname() {
        let dir = spiders_dir("", "", r"\.googlebot\.com$");
        let (detector, _) = detector(&dir, SpiderConfig::default().with_case_insensitive(true));
        let host = Some("CRAWL-1.GOOGLEBOT.COM");

        assert!(!detector.is_spider("10.0.0.1", None, host, Some("")));
        assert!(detector.is_spider("10.0.0.1", None, host, Some("Mozilla/5.0")));
    }

    #[test]
    fn test_malformed_ip_fails_open() {
        let dir = spiders_dir("10.0.0\n", "", "");
        let (detector, _) = detector(&dir, SpiderConfig::default());

        assert!(!detector.is_spider_ip("10.0.0"));
        assert!(!detector.is_spider_ip("not an ip"));
        assert!(!detector.is_spider_ip("::1"));
        assert!(!detector.is_spider("", None, None, None));
    }

    #[test]
    fn test_loader_resolves_and_skips() {
        let ips = concat!(
            "# spiders\n",
            "66.249.66.1\n",
            "crawler.example.org\n",
            "unknown.example.org\n",
            "1.2-3.4\n",
            "5.6.7.8-9.9.9.9\n",
            "10.1.1.1-10.1.1.3\n",
        );
        let dir = spiders_dir(ips, "", "");
        let (detector, calls) = detector(&dir, SpiderConfig::default());

        let set = detector.spider_ip_addresses();
        assert!(set.contains("66.249.66.1"));
        assert!(set.contains("192.0.2.77"));
        assert!(set.contains("10.1.1.2"));
        assert_eq!(set.len(), 5);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(detector.is_spider_ip("192.0.2.77"));
    }

    #[test]
    fn test_missing_directory() {
        let config = SpiderConfig::new("/nonexistent/spiders");
        let detector = SpiderDetector::with_resolver(
            config,
            Box::new(StaticResolver {
                hosts: Vec::new(),
                calls: Arc::new(AtomicUsize::new(0)),
            }),
        );

        detector.warm_up();
        assert!(detector.load_spider_ip_addresses().is_empty());
        assert!(detector.agent_patterns().is_empty());
        assert!(!detector.is_spider("1.2.3.4", None, Some("a.b"), Some("Googlebot")));
    }

    #[test]
    fn test_concurrent_first_use_loads_once() {
        let dir = spiders_dir("crawler.example.org\n", "", "");
        let (detector, calls) = detector(&dir, SpiderConfig::default());

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    assert!(detector.is_spider_ip("192.0.2.77"));
                });
            }
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_request_overload() {
        let dir = spiders_dir("198.51.100\n", "bingbot\n", "");
        let (detector, _) = detector(&dir, SpiderConfig::default().with_use_proxies(true));

        let by_agent =
            RequestInfo::new("10.0.0.1").with_user_agent("Mozilla/5.0 (compatible; bingbot/2.0)");
        let by_proxy = RequestInfo::new("10.0.0.1").with_forwarded_for("198.51.100.3");
        let human = RequestInfo::new("10.0.0.1").with_user_agent("Mozilla/5.0 Firefox");

        assert!(detector.is_spider_request(&by_agent));
        assert!(detector.is_spider_request(&by_proxy));
        assert!(!detector.is_spider_request(&human));
    }

    #[test]
    fn test_should_log_usage() {
        let dir = spiders_dir("198.51.100\n", "", "");
        let bot = RequestInfo::new("198.51.100.1");
        let human = RequestInfo::new("203.0.113.1");

        let (logging, _) = detector(&dir, SpiderConfig::default());
        assert!(logging.should_log_usage(&bot));

        let (dropping, _) = detector(&dir, SpiderConfig::default().with_log_bots(false));
        assert!(!dropping.should_log_usage(&bot));
        assert!(dropping.should_log_usage(&human));
    }

    #[test]
    fn test_exclusion_filter_cached() {
        let dir = spiders_dir("5.6.7\n1.2.3.4\n", "", "");
        let (detector, _) = detector(&dir, SpiderConfig::default());

        assert_eq!(detector.exclusion_filter(), " AND  NOT(ip: 1.2.3.4) NOT(ip: 5.6.7)");
        assert_eq!(detector.exclusion_filter(), " AND  NOT(ip: 1.2.3.4) NOT(ip: 5.6.7)");
    }
}
