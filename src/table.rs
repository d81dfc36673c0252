//! Sparse IPv4 range table.
//!
//! Addresses are stored as a three level map keyed by the first, second and
//! third octet. Each /24 bucket either matches the whole subnet or holds the
//! set of fourth octets that were added to it.

use ahash::{AHashMap, AHashSet};
use std::collections::BTreeSet;

use crate::error::IpFormatError;

/// Third-level bucket for one /24 subnet.
#[derive(Debug, Clone)]
enum Bucket {
    /// Every address in the subnet matches
    Wildcard,
    /// Only the listed fourth octets match
    Hosts(AHashSet<String>),
}

type ThirdLevel = AHashMap<String, Bucket>;
type SecondLevel = AHashMap<String, ThirdLevel>;

/// IpRangeTable matches IPv4 addresses against single addresses,
/// /24 subnets and same-subnet ranges.
///
/// The table is append-only: entries can be added but never removed.
///
/// # Entry Formats
/// - Single address: `66.249.66.1`
/// - Subnet: `66.249.66` - matches `66.249.66.0` through `66.249.66.255`
/// - Range: `66.249.66.1-66.249.66.20` - inclusive, first three octets must agree
///
/// # Examples
/// ```
/// use spiderdetect::IpRangeTable;
///
/// let mut table = IpRangeTable::new();
/// table.add("198.51.100").unwrap();
/// table.add("10.0.0.5-10.0.0.9").unwrap();
///
/// assert!(table.contains("198.51.100.42").unwrap());
/// assert!(table.contains("10.0.0.7").unwrap());
/// assert!(!table.contains("10.0.0.10").unwrap());
/// ```
#[derive(Debug, Clone, Default)]
pub struct IpRangeTable {
    map: AHashMap<String, SecondLevel>,
}

impl IpRangeTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an address, subnet or range to the table.
    ///
    /// Adding to a subnet that is already fully matched is a no-op.
    pub fn add(&mut self, spec: &str) -> Result<(), IpFormatError> {
        let spec = spec.trim();
        let ends: Vec<&str> = spec.split('-').collect();

        match ends.as_slice() {
            [single] => self.add_single(spec, single),
            [start, end] => self.add_range(spec, start.trim(), end.trim()),
            _ => Err(IpFormatError::RangeAcrossSubnets(spec.to_string())),
        }
    }

    fn add_single(&mut self, spec: &str, ip: &str) -> Result<(), IpFormatError> {
        let octets: Vec<&str> = ip.split('.').map(str::trim).collect();
        if octets.len() < 3 {
            return Err(IpFormatError::TooFewOctets(spec.to_string()));
        }
        if octets.len() > 4 {
            return Err(IpFormatError::NotFullAddress(spec.to_string()));
        }
        let octets = octets
            .into_iter()
            .map(|octet| parse_octet(spec, octet).map(|o| o.to_string()))
            .collect::<Result<Vec<String>, _>>()?;

        let bucket = self.bucket_mut(&octets[0], &octets[1], &octets[2]);
        if octets.len() == 3 {
            *bucket = Bucket::Wildcard;
        } else if let Bucket::Hosts(hosts) = bucket {
            hosts.insert(octets[3].clone());
        }
        Ok(())
    }

    fn add_range(&mut self, spec: &str, start: &str, end: &str) -> Result<(), IpFormatError> {
        let start: Vec<&str> = start.split('.').map(str::trim).collect();
        let end: Vec<&str> = end.split('.').map(str::trim).collect();

        if start.len() != 4 || end.len() != 4 || start[..3] != end[..3] {
            return Err(IpFormatError::RangeAcrossSubnets(spec.to_string()));
        }

        let subnet = start[..3]
            .iter()
            .map(|octet| parse_octet(spec, octet).map(|o| o.to_string()))
            .collect::<Result<Vec<String>, _>>()?;
        let first = parse_octet(spec, start[3])?;
        let last = parse_octet(spec, end[3])?;
        if first > last {
            return Err(IpFormatError::ReversedRange(spec.to_string()));
        }

        if let Bucket::Hosts(hosts) = self.bucket_mut(&subnet[0], &subnet[1], &subnet[2]) {
            for octet in first..=last {
                hosts.insert(octet.to_string());
            }
        }
        Ok(())
    }

    /// Get the bucket for a /24, creating an empty one if needed.
    fn bucket_mut(&mut self, a: &str, b: &str, c: &str) -> &mut Bucket {
        self.map
            .entry(a.to_string())
            .or_default()
            .entry(b.to_string())
            .or_default()
            .entry(c.to_string())
            .or_insert_with(|| Bucket::Hosts(AHashSet::new()))
    }

    /// Check whether an address is matched by the table.
    ///
    /// IPv6 input is never matched and is not an error. Anything else that is
    /// not a full dotted quad is rejected.
    pub fn contains(&self, ip: &str) -> Result<bool, IpFormatError> {
        let ip = ip.trim();
        let octets: Vec<&str> = ip.split('.').collect();

        if ip.contains(':') || octets.len() > 4 {
            log::warn!("IPv6 address not supported by spider table: {}", ip);
            return Ok(false);
        }
        if octets.len() < 4 {
            return Err(IpFormatError::NotFullAddress(ip.to_string()));
        }

        let bucket = self
            .map
            .get(octets[0])
            .and_then(|second| second.get(octets[1]))
            .and_then(|third| third.get(octets[2]));

        Ok(match bucket {
            Some(Bucket::Wildcard) => true,
            Some(Bucket::Hosts(hosts)) => hosts.contains(octets[3]),
            None => false,
        })
    }

    /// Rebuild the textual entries held by the table.
    ///
    /// Fully matched subnets are emitted as `a.b.c`, everything else as
    /// individual `a.b.c.d` addresses.
    pub fn to_set(&self) -> BTreeSet<String> {
        let mut set = BTreeSet::new();
        for (a, second) in &self.map {
            for (b, third) in second {
                for (c, bucket) in third {
                    match bucket {
                        Bucket::Wildcard => {
                            set.insert(format!("{}.{}.{}", a, b, c));
                        }
                        Bucket::Hosts(hosts) => {
                            for d in hosts {
                                set.insert(format!("{}.{}.{}.{}", a, b, c, d));
                            }
                        }
                    }
                }
            }
        }
        set
    }

    /// Get the number of entries, counting a full subnet as one.
    pub fn len(&self) -> usize {
        self.map
            .values()
            .flat_map(|second| second.values())
            .flat_map(|third| third.values())
            .map(|bucket| match bucket {
                Bucket::Wildcard => 1,
                Bucket::Hosts(hosts) => hosts.len(),
            })
            .sum()
    }

    /// Check if the table holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn parse_octet(spec: &str, octet: &str) -> Result<u8, IpFormatError> {
    octet.parse::<u8>().map_err(|_| IpFormatError::InvalidOctet {
        input: spec.to_string(),
        octet: octet.to_string(),
    })
}
