//! # hostlocal - Host-local IP address management for container networks
//!
//! This library hands out IP addresses to containers from administrator
//! defined pools and remembers who holds what in a directory on the local
//! disk, so that independent invocations on the same host never hand out the
//! same address twice.
//!
//! ## Overview
//!
//! A network is configured with one or more range sets. Every ADD allocates
//! exactly one address from each range set for a container id; DEL releases
//! everything that id holds. Allocation walks each range set round-robin,
//! starting just after the address handed out last, and skips gateways.
//!
//! ## Key Features
//!
//! - **Multiple Pools**: IPv4 and IPv6 range sets allocated in one call
//! - **Requested Addresses**: Specific addresses via `IP=` or `args.cni.ips`
//! - **All or Nothing**: A failed range set releases what earlier ones reserved
//! - **Crash Safe**: One file per reservation, created atomically
//! - **Multi-process**: An advisory file lock serializes every pool update
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - `allocator`: Ranges, range sets, the round-robin iterator, the per-set
//!   allocator and the multi-pool coordinator
//! - `store`: The `Store` trait, the disk-backed store and its file lock
//! - `config`: Network configuration structures
//! - `config_loader`: Configuration parsing and validation
//! - `dns`: resolv.conf parsing
//! - `types`: Result structures returned to the runtime
//! - `error`: The crate error type
//! - `utils`: IP address helpers
//! - `orchestrator`: High-level ADD and DEL handling
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use hostlocal::orchestrator;
//!
//! let conf = br#"{
//!     "cniVersion": "0.3.1",
//!     "name": "mynet",
//!     "ipam": {"type": "host-local", "subnet": "10.1.2.0/24"}
//! }"#;
//!
//! // Reserve an address for the container
//! let result = orchestrator::cmd_add(conf, "container-1", "")?;
//! println!("{}", serde_json::to_string_pretty(&result)?);
//!
//! // /var/lib/cni/networks/mynet now contains:
//! // - 10.1.2.2: owned by container-1
//! // - last_reserved_ip.0: round-robin position of range set 0
//! // - lock: advisory lock file
//!
//! orchestrator::cmd_del(conf, "container-1", "")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Configuration Format
//!
//! ```json
//! {
//!   "cniVersion": "0.3.1",
//!   "name": "mynet",
//!   "ipam": {
//!     "type": "host-local",
//!     "ranges": [
//!       [{"subnet": "10.10.0.0/16", "rangeStart": "10.10.1.20", "rangeEnd": "10.10.3.50"}],
//!       [{"subnet": "2001:db8:1::/64"}]
//!     ],
//!     "routes": [{"dst": "0.0.0.0/0"}],
//!     "dataDir": "/run/my-orchestrator/container-ipam-state",
//!     "resolvConf": "/etc/resolv.conf"
//!   }
//! }
//! ```
//!
//! ## Error Handling
//!
//! The library returns `hostlocal::error::Result<T>` with a `thiserror`
//! derived `IpamError`. The `host-local` binary reports errors through
//! `color_eyre`.

pub mod allocator;
pub mod config;
pub mod config_loader;
pub mod dns;
pub mod error;
pub mod orchestrator;
pub mod store;
pub mod types;
pub mod utils;
