//! Invocation orchestrator.
//!
//! Ties one ADD or DEL call together: configuration loading, opening the
//! pool's disk store, running the multi-pool coordinator and assembling the
//! result.

use log::info;

use crate::allocator::{allocate_all, release_all};
use crate::config::IpamConfig;
use crate::config_loader::load_ipam_config;
use crate::dns::parse_resolv_conf;
use crate::error::Result;
use crate::store::{DiskStore, Store};
use crate::types::{AllocationResult, Dns};

fn open_store(config: &IpamConfig) -> Result<DiskStore> {
    DiskStore::new(&config.name, config.data_dir.as_deref())
}

/// Allocate one address per range set for `container_id`
pub fn cmd_add(conf: &[u8], container_id: &str, env_args: &str) -> Result<AllocationResult> {
    let (config, cni_version) = load_ipam_config(conf, env_args)?;

    let dns = match &config.resolv_conf {
        Some(path) => parse_resolv_conf(path)?,
        None => Dns::default(),
    };

    let mut store = open_store(&config)?;
    let allocated = allocate_all(&mut store, &config.ranges, container_id, &config.ip_args);
    store.close()?;
    let ips = allocated?;

    info!(
        "Allocated {} address(es) for {} on network {}",
        ips.len(),
        container_id,
        config.name
    );

    Ok(AllocationResult {
        cni_version,
        ips,
        routes: config.routes,
        dns,
    })
}

/// Release everything `container_id` holds on the configured network
pub fn cmd_del(conf: &[u8], container_id: &str, env_args: &str) -> Result<()> {
    let (config, _) = load_ipam_config(conf, env_args)?;

    let mut store = open_store(&config)?;
    let released = release_all(&mut store, &config.ranges, container_id);
    store.close()?;
    released?;

    info!("Released {} on network {}", container_id, config.name);
    Ok(())
}
