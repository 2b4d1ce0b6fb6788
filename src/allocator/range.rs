//! A single contiguous span of allocatable addresses inside one subnet.

use std::fmt;
use std::net::IpAddr;

use ipnet::IpNet;
use serde::{Deserialize, Serialize};

use crate::error::{IpamError, Result};
use crate::utils::ip_utils::{
    broadcast_ip, canonicalize_ip, canonicalize_net, last_ip, next_ip, same_family,
};

/// One range as written in the network configuration.
///
/// Unset bounds and gateway are filled in by [`Range::canonicalize`]; the
/// accessors below fall back to the same defaults so that a range is always
/// usable once it has been canonicalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Range {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range_start: Option<IpAddr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range_end: Option<IpAddr>,
    pub subnet: IpNet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway: Option<IpAddr>,
}

impl Range {
    pub fn new(subnet: IpNet) -> Self {
        Range {
            range_start: None,
            range_end: None,
            subnet,
            gateway: None,
        }
    }

    /// Normalize every address to the subnet's family, apply defaults and
    /// check that all bounds lie inside the subnet.
    pub fn canonicalize(&mut self) -> Result<()> {
        self.subnet = canonicalize_net(self.subnet);

        if self.subnet.prefix_len() > self.subnet.max_prefix_len().saturating_sub(2) {
            return Err(IpamError::RangeBounds(format!(
                "Network {} too small to allocate from",
                self.subnet
            )));
        }

        self.gateway = self.gateway.map(canonicalize_ip);
        self.range_start = self.range_start.map(canonicalize_ip);
        self.range_end = self.range_end.map(canonicalize_ip);
        let first = first_host(&self.subnet);

        match self.gateway {
            None => self.gateway = Some(first),
            Some(gw) => {
                if !same_family(gw, self.subnet.addr()) || !self.subnet.contains(&gw) {
                    return Err(IpamError::RangeBounds(format!(
                        "gateway {} not in network {}",
                        gw, self.subnet
                    )));
                }
            }
        }

        match self.range_start {
            None => self.range_start = Some(first),
            Some(start) => {
                if !self.contains(start) {
                    return Err(IpamError::RangeBounds(format!(
                        "RangeStart {} not in network {}",
                        start, self.subnet
                    )));
                }
            }
        }

        match self.range_end {
            None => self.range_end = Some(last_ip(&self.subnet)),
            Some(end) => {
                if !self.contains(end) {
                    return Err(IpamError::RangeBounds(format!(
                        "RangeEnd {} not in network {}",
                        end, self.subnet
                    )));
                }
                if broadcast_ip(&self.subnet) == Some(end) {
                    return Err(IpamError::RangeBounds(format!(
                        "RangeEnd {} is the broadcast address of {}",
                        end, self.subnet
                    )));
                }
            }
        }

        if self.start() > self.end() {
            return Err(IpamError::RangeBounds(format!(
                "RangeStart {} is after RangeEnd {}",
                self.start(),
                self.end()
            )));
        }

        Ok(())
    }

    /// First allocatable address
    pub fn start(&self) -> IpAddr {
        self.range_start.unwrap_or_else(|| first_host(&self.subnet))
    }

    /// Last allocatable address
    pub fn end(&self) -> IpAddr {
        self.range_end.unwrap_or_else(|| last_ip(&self.subnet))
    }

    pub fn gateway(&self) -> IpAddr {
        self.gateway.unwrap_or_else(|| first_host(&self.subnet))
    }

    /// Whether `addr` lies in the subnet and between the configured bounds
    pub fn contains(&self, addr: IpAddr) -> bool {
        let addr = canonicalize_ip(addr);
        if !same_family(addr, self.subnet.addr()) || !self.subnet.contains(&addr) {
            return false;
        }
        if let Some(start) = self.range_start {
            if addr < start {
                return false;
            }
        }
        if let Some(end) = self.range_end {
            if addr > end {
                return false;
            }
        }
        true
    }

    /// Whether either range's bounds fall inside the other.
    /// Ranges of different families never overlap.
    pub fn overlaps(&self, other: &Range) -> bool {
        if !same_family(self.start(), other.start()) {
            return false;
        }
        self.contains(other.start())
            || self.contains(other.end())
            || other.contains(self.start())
            || other.contains(self.end())
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start(), self.end())
    }
}

fn first_host(subnet: &IpNet) -> IpAddr {
    let base = subnet.network();
    next_ip(base).unwrap_or(base)
}
