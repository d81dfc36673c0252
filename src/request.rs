//! Request descriptor consumed by the detector.

/// Header carrying the proxy chain.
pub const FORWARDED_FOR_HEADER: &str = "X-Forwarded-For";

/// Header carrying the client user agent.
pub const USER_AGENT_HEADER: &str = "User-Agent";

/// The parts of an inbound HTTP request the detector looks at.
///
/// The HTTP layer implements this for its own request type.
pub trait SpiderRequest {
    /// Remote address of the connection.
    fn remote_addr(&self) -> Option<&str>;

    /// Reverse-resolved hostname of the remote address, if known.
    fn remote_host(&self) -> Option<&str>;

    /// Header value by name. Names are matched case-insensitively.
    fn header(&self, name: &str) -> Option<&str>;
}

/// Owned request descriptor.
///
/// # Examples
/// ```
/// use spiderdetect::{RequestInfo, SpiderRequest};
///
/// let request = RequestInfo::new("203.0.113.5")
///     .with_user_agent("Mozilla/5.0 (compatible; Googlebot/2.1)");
/// assert_eq!(request.header("user-agent"), Some("Mozilla/5.0 (compatible; Googlebot/2.1)"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestInfo {
    remote_addr: Option<String>,
    remote_host: Option<String>,
    headers: Vec<(String, String)>,
}

impl RequestInfo {
    /// Create a descriptor for a connection from `remote_addr`.
    pub fn new(remote_addr: impl Into<String>) -> Self {
        Self {
            remote_addr: Some(remote_addr.into()),
            ..Self::default()
        }
    }

    /// Set the reverse-resolved hostname.
    pub fn with_remote_host(mut self, host: impl Into<String>) -> Self {
        self.remote_host = Some(host.into());
        self
    }

    /// Add a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the `X-Forwarded-For` header.
    pub fn with_forwarded_for(self, chain: impl Into<String>) -> Self {
        self.with_header(FORWARDED_FOR_HEADER, chain)
    }

    /// Set the `User-Agent` header.
    pub fn with_user_agent(self, agent: impl Into<String>) -> Self {
        self.with_header(USER_AGENT_HEADER, agent)
    }
}

impl SpiderRequest for RequestInfo {
    fn remote_addr(&self) -> Option<&str> {
        self.remote_addr.as_deref()
    }

    fn remote_host(&self) -> Option<&str> {
        self.remote_host.as_deref()
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}
