//! Error types for spiderdetect.

use thiserror::Error;

/// Error type for spiderdetect operations.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed IP, subnet or range
    #[error(transparent)]
    IpFormat(#[from] IpFormatError),

    /// Forward DNS failure
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
}

/// Result type alias for spiderdetect operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for IP range table operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IpFormatError {
    /// Range endpoints live in different /24 subnets
    #[error("ranges must share first three octets: {0}")]
    RangeAcrossSubnets(String),

    /// Subnet or address with fewer than three octets
    #[error("need at least 3 octets: {0}")]
    TooFewOctets(String),

    /// Lookup input that is not a complete dotted quad
    #[error("must be a single full IPv4 address: {0}")]
    NotFullAddress(String),

    /// Range whose last octet start is greater than its end
    #[error("range start is greater than range end: {0}")]
    ReversedRange(String),

    /// Octet that is not an integer in 0..=255
    #[error("invalid octet {octet:?} in {input}")]
    InvalidOctet { input: String, octet: String },
}

/// Error type for forward DNS resolution.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    /// The lookup returned no records at all
    #[error("empty DNS response for {0}")]
    EmptyResponse(String),

    /// The response held records, but no A record
    #[error("no A record found for {0}")]
    NoARecord(String),

    /// The lookup did not finish within the configured timeout
    #[error("DNS lookup timed out for {0}")]
    Timeout(String),

    /// Any other resolver failure
    #[error("DNS lookup failed for {host}: {reason}")]
    Lookup { host: String, reason: String },
}
