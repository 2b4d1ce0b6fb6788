//! resolv.conf parsing for the DNS section of an allocation result.

use std::fs;
use std::path::Path;

use log::debug;

use crate::error::{IpamError, Result};
use crate::types::Dns;

/// Read a resolv.conf-style file into a [`Dns`] value.
///
/// Lines starting with `#` or `;` are comments. Only `nameserver`, `domain`,
/// `search` and `options` are recognized; anything else is skipped.
pub fn parse_resolv_conf(path: &Path) -> Result<Dns> {
    let contents = fs::read_to_string(path)
        .map_err(|e| IpamError::io(format!("failed to read {}", path.display()), e))?;
    Ok(parse_resolv_conf_str(&contents))
}

pub fn parse_resolv_conf_str(contents: &str) -> Dns {
    let mut dns = Dns::default();

    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        let mut fields = line.split_whitespace();
        let Some(keyword) = fields.next() else {
            continue;
        };

        match keyword {
            "nameserver" => dns.nameservers.extend(fields.next().map(str::to_string)),
            "domain" => {
                if let Some(domain) = fields.next() {
                    dns.domain = domain.to_string();
                }
            }
            "search" => dns.search.extend(fields.map(str::to_string)),
            "options" => dns.options.extend(fields.map(str::to_string)),
            other => debug!("Ignoring resolv.conf keyword {:?}", other),
        }
    }

    dns
}
