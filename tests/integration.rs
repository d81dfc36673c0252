//! Integration tests for spider detection over a rule directory.

use spiderdetect::{
    ForwardResolver, IpRangeTable, RequestInfo, ResolutionError, SpiderConfig, SpiderDetector,
};
use std::fs;
use std::net::Ipv4Addr;
use std::path::Path;
use tempfile::tempdir;

/// Resolver that never touches the network.
struct NoDns;

impl ForwardResolver for NoDns {
    fn resolve_ipv4(&self, host: &str) -> Result<Ipv4Addr, ResolutionError> {
        Err(ResolutionError::EmptyResponse(host.to_string()))
    }
}

fn write(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn detector(config: SpiderConfig) -> SpiderDetector {
    SpiderDetector::with_resolver(config, Box::new(NoDns))
}

#[test]
fn test_googlebot_agent_end_to_end() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("agents").join("google.txt"), "Googlebot\n");

    let detector = detector(SpiderConfig::new(dir.path()).with_case_insensitive(true));

    assert!(detector.is_spider(
        "203.0.113.5",
        None,
        None,
        Some("Mozilla/5.0 (compatible; Googlebot/2.1)")
    ));
}

#[test]
fn test_subnet_end_to_end() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("iplist.txt"), "# crawlers\n198.51.100\n");

    let detector = detector(SpiderConfig::new(dir.path()));

    assert!(detector.is_spider("198.51.100.42", None, None, None));
    assert!(!detector.is_spider("198.51.101.42", None, None, None));
}

#[test]
fn test_full_rule_tree() {
    let dir = tempdir().unwrap();
    write(
        &dir.path().join("example.txt"),
        "66.249.66\n157.55.39.10-157.55.39.20\nunresolvable.invalid\n1.2.3.4-5.6.7.8\n",
    );
    write(&dir.path().join("extra.txt"), "207.46.13.1\n");
    write(&dir.path().join("agents").join("example.txt"), "bingbot\n^Wget/\n");
    write(
        &dir.path().join("domains").join("example.txt"),
        r"\.search\.msn\.com$",
    );

    let detector = detector(SpiderConfig::new(dir.path()).with_use_proxies(true));
    detector.warm_up();

    assert_eq!(detector.agent_patterns().len(), 2);
    assert_eq!(detector.domain_patterns().len(), 1);
    assert_eq!(detector.spider_ip_addresses().len(), 1 + 11 + 1);

    let cases = [
        (RequestInfo::new("66.249.66.200"), true),
        (RequestInfo::new("157.55.39.15"), true),
        (RequestInfo::new("157.55.39.21"), false),
        (RequestInfo::new("207.46.13.1"), true),
        (RequestInfo::new("10.0.0.1").with_user_agent("Wget/1.21"), true),
        (RequestInfo::new("10.0.0.1").with_user_agent("curl Wget/1.21"), false),
        (
            RequestInfo::new("10.0.0.1").with_remote_host("msnbot-1.search.msn.com"),
            true,
        ),
        (
            RequestInfo::new("10.0.0.1").with_forwarded_for("192.168.0.1, 66.249.66.9"),
            true,
        ),
        (RequestInfo::new("10.0.0.1").with_user_agent("Mozilla/5.0"), false),
        (RequestInfo::new("2001:db8::1"), false),
    ];

    for (request, expected) in cases {
        assert_eq!(detector.is_spider_request(&request), expected, "{:?}", request);
    }
}

#[test]
fn test_exported_entries_match() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("list.txt"), "8.8.8\n9.9.9.1-9.9.9.2\n");

    let detector = detector(SpiderConfig::new(dir.path()));
    let exported = detector.spider_ip_addresses();

    let mut rebuilt = IpRangeTable::new();
    for entry in &exported {
        rebuilt.add(entry).unwrap();
    }
    assert_eq!(rebuilt.to_set(), exported);
    assert!(rebuilt.contains("8.8.8.8").unwrap());
    assert!(rebuilt.contains("9.9.9.2").unwrap());
    assert!(!rebuilt.contains("9.9.9.3").unwrap());
}

#[test]
fn test_config_file_drives_detector() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("spiders").join("agents").join("a.txt"), "YandexBot\n");
    let config_path = dir.path().join("spiders.yml");
    write(
        &config_path,
        &format!(
            "spiders_dir: {}\ncase_insensitive: true\n",
            dir.path().join("spiders").display()
        ),
    );

    let detector = detector(SpiderConfig::load(&config_path).unwrap());
    assert!(detector.is_spider(
        "10.0.0.1",
        None,
        None,
        Some("Mozilla/5.0 (compatible; yandexbot/3.0)")
    ));
}
