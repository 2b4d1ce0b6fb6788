//! Error types shared by the range model, the stores and the allocators.

use std::net::IpAddr;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, IpamError>;

/// Errors raised while loading pools, reserving addresses or rolling back
#[derive(Debug, thiserror::Error)]
pub enum IpamError {
    /// Malformed configuration: empty or mixed-family range sets, missing keys
    #[error("{0}")]
    Config(String),

    /// Two members of one range set overlap; indices are positions in the set
    #[error("subnets {first_range} and {second_range} overlap")]
    OverlappingRanges {
        first: usize,
        second: usize,
        first_range: String,
        second_range: String,
    },

    /// Gateway or range bounds outside the subnet, or a subnet too small to use
    #[error("{0}")]
    RangeBounds(String),

    #[error("{ip} not in range set {range_set}")]
    NotInRangeSet { ip: IpAddr, range_set: String },

    /// Requested address is already reserved or is the gateway
    #[error("{0}")]
    AllocationConflict(String),

    #[error("no IP addresses available in range set {range_set}")]
    PoolExhausted { range_set: String },

    /// No last-reserved marker has been written for this range set yet
    #[error("no last reserved IP for range set {range_id}")]
    LastReservedNotFound { range_id: usize },

    #[error("{context}: {source}")]
    StoreIo {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Failure while compensating a partial allocation. Only ever logged.
    #[error("failed to release range set {index} for {id}: {source}")]
    Rollback {
        index: usize,
        id: String,
        source: Box<IpamError>,
    },

    #[error("failed to allocate for range {index}: {source}")]
    RangeAllocation {
        index: usize,
        source: Box<IpamError>,
    },

    #[error("failed to allocate all requested IPs: {}", join_ips(.0))]
    UnmatchedRequests(Vec<IpAddr>),

    #[error("{}", .0.join(";"))]
    Release(Vec<String>),

    #[error("cannot understand ip: {0}")]
    InvalidAddress(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl IpamError {
    /// Wrap an I/O error with the operation and path that produced it
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        IpamError::StoreIo {
            context: context.into(),
            source,
        }
    }
}

fn join_ips(ips: &[IpAddr]) -> String {
    ips.iter()
        .map(|ip| ip.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unmatched_requests_message() {
        let err = IpamError::UnmatchedRequests(vec![
            "10.1.2.88".parse().unwrap(),
            "10.1.2.77".parse().unwrap(),
        ]);
        assert_eq!(
            err.to_string(),
            "failed to allocate all requested IPs: 10.1.2.88 10.1.2.77"
        );
    }

    #[test]
    fn test_range_allocation_wraps_source() {
        let err = IpamError::RangeAllocation {
            index: 1,
            source: Box::new(IpamError::PoolExhausted {
                range_set: "10.0.0.1-10.0.0.2".to_string(),
            }),
        };
        assert_eq!(
            err.to_string(),
            "failed to allocate for range 1: no IP addresses available in range set 10.0.0.1-10.0.0.2"
        );
    }
}
