//! Shared utilities: IP address normalization, arithmetic and family checks.

pub mod ip_utils;

pub use ip_utils::{canonicalize_ip, canonicalize_net, next_ip, parse_ip, same_family};
