//! spiderdetect - robot/crawler traffic detection for usage statistics.
//!
//! This crate decides whether an inbound request was made by a spider
//! (search engine crawler, monitoring bot, scraper) so that usage statistics
//! can flag or drop it.
//!
//! # Features
//!
//! - **IP table**: single addresses, /24 subnets and same-subnet ranges
//! - **Hostname entries**: IP lists may name hosts, resolved once at load time
//! - **User-Agent patterns**: regular expressions matched against the agent
//! - **Domain patterns**: regular expressions matched against the reverse hostname
//! - **Proxy support**: optional checking of the `X-Forwarded-For` chain
//! - **Thread-safe**: rule sets load once, lookups need no locking
//!
//! # Quick Start
//!
//! ```ignore
//! use spiderdetect::{RequestInfo, SpiderConfig, SpiderDetector};
//!
//! let config = SpiderConfig::new("/srv/dspace/config/spiders")
//!     .with_case_insensitive(true)
//!     .with_use_proxies(true);
//! let detector = SpiderDetector::new(config);
//!
//! let request = RequestInfo::new("66.249.66.1")
//!     .with_user_agent("Mozilla/5.0 (compatible; Googlebot/2.1)");
//! if detector.is_spider_request(&request) {
//!     println!("robot");
//! }
//! ```
//!
//! # Rule Files
//!
//! Rules live below one directory:
//!
//! - `spiders/*`: IPv4 addresses (`1.2.3.4`), subnets (`1.2.3`),
//!   ranges (`1.2.3.4-1.2.3.40`) and hostnames to resolve
//! - `spiders/agents/*`: User-Agent regular expressions
//! - `spiders/domains/*`: reverse hostname regular expressions
//!
//! Lines starting with `#` and blank lines are ignored.

mod error;
mod request;
mod table;

pub mod detector;
pub mod export;
pub mod pattern;
pub mod resolver;

// Re-export core types
pub use error::{Error, IpFormatError, ResolutionError, Result};
pub use table::IpRangeTable;

// Re-export detector types
pub use detector::{SpiderConfig, SpiderDetector};

// Re-export request descriptor
pub use request::{RequestInfo, SpiderRequest, FORWARDED_FOR_HEADER, USER_AGENT_HEADER};

// Re-export resolver types
pub use resolver::{DnsForwardResolver, ForwardResolver};

// Re-export pattern loading
pub use pattern::{load_patterns_from_directory, read_patterns, PatternKind};
