//! Ordered collection of ranges forming one logical pool.

use std::fmt;
use std::net::IpAddr;
use std::ops::Deref;

use serde::{Deserialize, Serialize};

use super::range::Range;
use crate::error::{IpamError, Result};
use crate::utils::ip_utils::{canonicalize_ip, same_family};

/// A pool of non-overlapping ranges of one address family.
///
/// Order is significant: lookups return the first member that contains an
/// address, and iteration walks members in this order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RangeSet(Vec<Range>);

impl RangeSet {
    pub fn new(ranges: Vec<Range>) -> Self {
        RangeSet(ranges)
    }

    /// Canonicalize every member, then reject empty, mixed-family or
    /// overlapping sets. The first overlapping pair in scan order is reported.
    pub fn canonicalize(&mut self) -> Result<()> {
        if self.0.is_empty() {
            return Err(IpamError::Config("empty range set".to_string()));
        }

        for range in self.0.iter_mut() {
            range.canonicalize()?;
        }

        let family = self.0[0].start();
        if self.0.iter().any(|r| !same_family(r.start(), family)) {
            return Err(IpamError::Config("mixed address families".to_string()));
        }

        for (i, first) in self.0.iter().enumerate() {
            for (j, second) in self.0.iter().enumerate().skip(i + 1) {
                if first.overlaps(second) {
                    return Err(IpamError::OverlappingRanges {
                        first: i,
                        second: j,
                        first_range: first.to_string(),
                        second_range: second.to_string(),
                    });
                }
            }
        }

        Ok(())
    }

    pub fn contains(&self, addr: IpAddr) -> bool {
        self.range_for(addr).is_ok()
    }

    /// Index and a shared reference to the first member containing `addr`
    pub fn range_for(&self, addr: IpAddr) -> Result<(usize, &Range)> {
        let addr = canonicalize_ip(addr);
        self.0
            .iter()
            .enumerate()
            .find(|(_, r)| r.contains(addr))
            .ok_or_else(|| IpamError::NotInRangeSet {
                ip: addr,
                range_set: self.to_string(),
            })
    }

    /// Whether any member of this set overlaps any member of `other`
    pub fn overlaps(&self, other: &RangeSet) -> bool {
        self.0
            .iter()
            .any(|r| other.0.iter().any(|o| r.overlaps(o)))
    }

    /// IPv4 or IPv6, judged by the first member
    pub fn is_ipv4(&self) -> bool {
        self.0.first().map_or(false, |r| r.start().is_ipv4())
    }
}

impl Deref for RangeSet {
    type Target = [Range];

    fn deref(&self) -> &[Range] {
        &self.0
    }
}

impl fmt::Display for RangeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|r| r.to_string()).collect();
        write!(f, "{}", parts.join(","))
    }
}
