use crate::allocator::{Range, RangeSet};
use crate::config::{IpamConfig, NetConf, SINGLE_ADDRESS_VERSIONS};
use crate::error::{IpamError, Result};
use crate::utils::ip_utils::parse_ip;
use log::debug;
use std::net::IpAddr;

/// Load and validate the IPAM configuration from raw network config JSON.
///
/// `env_args` is the `K=V;K=V` argument string supplied by the runtime
/// (`IP=<addr>` requests a specific address). Returns the configuration and
/// the CNI version the result must be encoded for.
pub fn load_ipam_config(bytes: &[u8], env_args: &str) -> Result<(IpamConfig, String)> {
    let net: NetConf = serde_json::from_slice(bytes)?;
    let ipam = net
        .ipam
        .ok_or_else(|| IpamError::Config("IPAM config missing 'ipam' key".to_string()))?;

    // Requested addresses: environment first, then args.cni.ips
    let mut ip_args: Vec<IpAddr> = Vec::new();
    if let Some(ip) = parse_env_args(env_args)? {
        ip_args.push(ip);
    }
    if let Some(cni) = net.args.and_then(|a| a.cni) {
        for ip in &cni.ips {
            ip_args.push(parse_ip(ip).ok_or_else(|| IpamError::InvalidAddress(ip.clone()))?);
        }
    }

    // Runtime ranges, then the legacy single range, then configured sets
    let mut ranges: Vec<RangeSet> = net.runtime_config.ip_ranges;
    if let Some(subnet) = ipam.subnet {
        ranges.push(RangeSet::new(vec![Range {
            range_start: ipam.range_start,
            range_end: ipam.range_end,
            subnet,
            gateway: ipam.gateway,
        }]));
    }
    ranges.extend(ipam.ranges);

    if ranges.is_empty() {
        return Err(IpamError::Config("no IP ranges specified".to_string()));
    }

    let mut num_v4 = 0;
    let mut num_v6 = 0;
    for (i, range_set) in ranges.iter_mut().enumerate() {
        range_set
            .canonicalize()
            .map_err(|e| IpamError::Config(format!("invalid range set {}: {}", i, e)))?;
        if range_set.is_ipv4() {
            num_v4 += 1;
        } else {
            num_v6 += 1;
        }
    }

    if (num_v4 > 1 || num_v6 > 1) && SINGLE_ADDRESS_VERSIONS.contains(&net.cni_version.as_str()) {
        return Err(IpamError::Config(format!(
            "CNI version {} does not support more than 1 address per family",
            net.cni_version
        )));
    }

    for (i, first) in ranges.iter().enumerate() {
        for (j, second) in ranges.iter().enumerate().skip(i + 1) {
            if first.overlaps(second) {
                return Err(IpamError::Config(format!(
                    "range set {} overlaps with {}",
                    i, j
                )));
            }
        }
    }

    debug!("Loaded {} range set(s) for network {:?}", ranges.len(), net.name);

    let config = IpamConfig {
        name: net.name,
        ipam_type: ipam.ipam_type,
        routes: ipam.routes,
        data_dir: ipam.data_dir.filter(|d| !d.as_os_str().is_empty()),
        resolv_conf: ipam.resolv_conf.filter(|p| !p.as_os_str().is_empty()),
        ranges,
        ip_args,
    };
    Ok((config, net.cni_version))
}

/// Parse a `K=V;K=V` argument string, returning the requested `IP` if any.
///
/// Unknown keys are rejected unless `IgnoreUnknown` is set to a true value.
pub fn parse_env_args(args: &str) -> Result<Option<IpAddr>> {
    if args.is_empty() {
        return Ok(None);
    }

    let mut ip = None;
    let mut ignore_unknown = false;
    let mut unknown = Vec::new();

    for pair in args.split(';') {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| IpamError::Config(format!("ARGS: invalid pair {:?}", pair)))?;

        match key {
            "IgnoreUnknown" => {
                ignore_unknown = match value.to_ascii_lowercase().as_str() {
                    "1" | "true" => true,
                    "0" | "false" => false,
                    _ => {
                        return Err(IpamError::Config(format!(
                            "ARGS: error parsing IgnoreUnknown value {:?}",
                            value
                        )))
                    }
                };
            }
            "IP" => {
                let parsed = parse_ip(value)
                    .ok_or_else(|| IpamError::InvalidAddress(value.to_string()))?;
                ip = Some(parsed);
            }
            _ => unknown.push(key.to_string()),
        }
    }

    if !unknown.is_empty() && !ignore_unknown {
        return Err(IpamError::Config(format!("ARGS: unknown args {:?}", unknown)));
    }

    Ok(ip)
}
