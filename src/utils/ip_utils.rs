use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use ipnet::IpNet;

/// IP utility functions for normalization and address arithmetic

/// Collapse IPv4-mapped IPv6 addresses (`::ffff:a.b.c.d`) to plain IPv4
pub fn canonicalize_ip(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => IpAddr::V4(v4),
            None => IpAddr::V6(v6),
        },
        v4 => v4,
    }
}

/// Normalize a subnet: mapped IPv6 networks become IPv4, host bits are cleared
pub fn canonicalize_net(net: IpNet) -> IpNet {
    if let IpNet::V6(v6) = net {
        if let (Some(v4), true) = (v6.addr().to_ipv4_mapped(), v6.prefix_len() >= 96) {
            if let Ok(mapped) = IpNet::new(IpAddr::V4(v4), v6.prefix_len() - 96) {
                return mapped.trunc();
            }
        }
    }
    net.trunc()
}

/// Parse a textual address and normalize it
pub fn parse_ip(ip: &str) -> Option<IpAddr> {
    IpAddr::from_str(ip.trim()).ok().map(canonicalize_ip)
}

/// The address following `ip`, or `None` at the top of the address space
pub fn next_ip(ip: IpAddr) -> Option<IpAddr> {
    match ip {
        IpAddr::V4(v4) => u32::from(v4)
            .checked_add(1)
            .map(|n| IpAddr::V4(Ipv4Addr::from(n))),
        IpAddr::V6(v6) => u128::from(v6)
            .checked_add(1)
            .map(|n| IpAddr::V6(Ipv6Addr::from(n))),
    }
}

/// Same address family
pub fn same_family(a: IpAddr, b: IpAddr) -> bool {
    a.is_ipv4() == b.is_ipv4()
}

/// Last allocatable address of a subnet: broadcast minus one for IPv4,
/// the final address for IPv6
pub fn last_ip(net: &IpNet) -> IpAddr {
    match net {
        IpNet::V4(v4) => {
            let broadcast = u32::from(v4.broadcast());
            IpAddr::V4(Ipv4Addr::from(broadcast.saturating_sub(1)))
        }
        IpNet::V6(v6) => IpAddr::V6(v6.broadcast()),
    }
}

/// IPv4 broadcast address of a subnet; IPv6 has none
pub fn broadcast_ip(net: &IpNet) -> Option<IpAddr> {
    match net {
        IpNet::V4(v4) => Some(IpAddr::V4(v4.broadcast())),
        IpNet::V6(_) => None,
    }
}

/// Address family version string as reported in allocation results
pub fn ip_version(ip: IpAddr) -> &'static str {
    if ip.is_ipv4() {
        "4"
    } else {
        "6"
    }
}
