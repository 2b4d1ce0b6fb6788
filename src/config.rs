use std::net::IpAddr;
use std::path::PathBuf;

use ipnet::IpNet;
use serde::{Deserialize, Serialize};

use crate::allocator::RangeSet;
use crate::types::Route;

/// CNI versions whose results carry at most one address per family
pub const SINGLE_ADDRESS_VERSIONS: &[&str] = &["", "0.1.0", "0.2.0"];

/// Network configuration as handed to the plugin
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetConf {
    /// Network name; also names the pool directory under the data dir
    #[serde(default)]
    pub name: String,
    /// Version of the result format the runtime expects
    #[serde(default)]
    pub cni_version: String,
    /// IPAM section; loading fails when it is missing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipam: Option<IpamSection>,
    /// (Optional) Ranges injected by the runtime instead of the config file
    #[serde(default)]
    pub runtime_config: RuntimeConfig,
    /// (Optional) Per-call arguments, e.g. requested addresses
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<NetArgs>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ip_ranges: Vec<RangeSet>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct NetArgs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cni: Option<IpamArgs>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct IpamArgs {
    /// Addresses the caller wants, at most one per range set
    #[serde(default)]
    pub ips: Vec<String>,
}

/// The `ipam` object of the network configuration
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpamSection {
    #[serde(rename = "type", default)]
    pub ipam_type: String,
    /// (Optional) Legacy single-range subnet
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subnet: Option<IpNet>,
    /// (Optional) Legacy single-range start
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range_start: Option<IpAddr>,
    /// (Optional) Legacy single-range end
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range_end: Option<IpAddr>,
    /// (Optional) Legacy single-range gateway
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway: Option<IpAddr>,
    /// Range sets, each allocating one address per call
    #[serde(default)]
    pub ranges: Vec<RangeSet>,
    /// (Optional) Routes copied verbatim into the result
    #[serde(default)]
    pub routes: Vec<Route>,
    /// (Optional) Directory holding per-network reservation state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    /// (Optional) resolv.conf whose contents become the result's DNS section
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolv_conf: Option<PathBuf>,
}

/// Validated IPAM configuration for one invocation
#[derive(Debug, Clone)]
pub struct IpamConfig {
    /// Network name, used as the pool name
    pub name: String,
    pub ipam_type: String,
    pub routes: Vec<Route>,
    pub data_dir: Option<PathBuf>,
    pub resolv_conf: Option<PathBuf>,
    /// Canonicalized, pairwise non-overlapping range sets
    pub ranges: Vec<RangeSet>,
    /// Requested addresses from the environment and from `args.cni.ips`
    pub ip_args: Vec<IpAddr>,
}
