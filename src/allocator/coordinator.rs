//! Allocation across every range set of a network in one invocation.
//!
//! Either every range set yields an address or none does: a failure part way
//! through releases what earlier range sets already handed out before the
//! error is returned.

use std::fmt;
use std::net::IpAddr;

use super::ip_allocator::IpAllocator;
use super::range_set::RangeSet;
use crate::error::{IpamError, Result};
use crate::store::Store;
use crate::types::IpConfig;
use crate::utils::ip_utils::canonicalize_ip;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Pending,
    Allocating(usize),
    RollingBack,
    Failed,
    AllSucceeded,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Pending => write!(f, "pending"),
            Phase::Allocating(idx) => write!(f, "allocating range set {}", idx),
            Phase::RollingBack => write!(f, "rolling back"),
            Phase::Failed => write!(f, "failed"),
            Phase::AllSucceeded => write!(f, "all succeeded"),
        }
    }
}

struct Allocation<'r, S: Store + ?Sized> {
    store: &'r mut S,
    ranges: &'r [RangeSet],
    id: &'r str,
    phase: Phase,
    /// Indices of range sets that already reserved an address for `id`
    allocated: Vec<usize>,
}

impl<'r, S: Store + ?Sized> Allocation<'r, S> {
    fn transition(&mut self, next: Phase) {
        log::debug!("Allocation for {}: {} -> {}", self.id, self.phase, next);
        self.phase = next;
    }

    /// Release every range set allocated so far. Errors are logged only.
    fn roll_back(&mut self) {
        self.transition(Phase::RollingBack);
        for &index in &self.allocated {
            let released =
                IpAllocator::new(&self.ranges[index], &mut *self.store, index).release(self.id);
            if let Err(e) = released {
                let err = IpamError::Rollback {
                    index,
                    id: self.id.to_string(),
                    source: Box::new(e),
                };
                log::warn!("{}", err);
            }
        }
        self.allocated.clear();
        self.transition(Phase::Failed);
    }

    fn fail(&mut self, err: IpamError) -> IpamError {
        self.roll_back();
        err
    }
}

/// Allocate one address from each range set for `id`.
///
/// A requested address is used for the first range set that contains it;
/// range sets without a matching request auto-assign. Repeated requests for
/// the same address count once. Requests that match no range set fail the
/// whole allocation.
pub fn allocate_all<S: Store + ?Sized>(
    store: &mut S,
    ranges: &[RangeSet],
    id: &str,
    requested: &[IpAddr],
) -> Result<Vec<IpConfig>> {
    let mut unmatched: Vec<IpAddr> = Vec::with_capacity(requested.len());
    for ip in requested.iter().copied().map(canonicalize_ip) {
        if !unmatched.contains(&ip) {
            unmatched.push(ip);
        }
    }
    let mut results = Vec::with_capacity(ranges.len());
    let mut allocation = Allocation {
        store,
        ranges,
        id,
        phase: Phase::Pending,
        allocated: Vec::new(),
    };

    for (index, range_set) in ranges.iter().enumerate() {
        allocation.transition(Phase::Allocating(index));

        let requested_ip = unmatched
            .iter()
            .position(|ip| range_set.contains(*ip))
            .map(|pos| unmatched.remove(pos));

        let mut allocator = IpAllocator::new(range_set, &mut *allocation.store, index);
        match allocator.get(id, requested_ip) {
            Ok(config) => {
                allocation.allocated.push(index);
                results.push(config);
            }
            Err(e) => {
                return Err(allocation.fail(IpamError::RangeAllocation {
                    index,
                    source: Box::new(e),
                }));
            }
        }
    }

    if !unmatched.is_empty() {
        return Err(allocation.fail(IpamError::UnmatchedRequests(unmatched)));
    }

    allocation.transition(Phase::AllSucceeded);
    Ok(results)
}

/// Release everything `id` holds in each range set, reporting all failures
pub fn release_all<S: Store + ?Sized>(store: &mut S, ranges: &[RangeSet], id: &str) -> Result<()> {
    let mut errors = Vec::new();
    for (index, range_set) in ranges.iter().enumerate() {
        if let Err(e) = IpAllocator::new(range_set, &mut *store, index).release(id) {
            errors.push(e.to_string());
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(IpamError::Release(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::Range;
    use crate::store::MemoryStore;

    fn set(subnets: &[&str]) -> RangeSet {
        let mut set = RangeSet::new(
            subnets
                .iter()
                .map(|s| Range::new(s.parse().unwrap()))
                .collect(),
        );
        set.canonicalize().unwrap();
        set
    }

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_one_address_per_range_set() {
        let ranges = vec![set(&["10.1.2.0/24"]), set(&["2001:db8:1::/64"])];
        let mut store = MemoryStore::new();

        let ips = allocate_all(&mut store, &ranges, "dummy", &[]).unwrap();
        assert_eq!(ips.len(), 2);
        assert_eq!(ips[0].address.to_string(), "10.1.2.2/24");
        assert_eq!(ips[1].address.to_string(), "2001:db8:1::2/64");
        assert_eq!(store.last_reserved_ip(1).unwrap(), ip("2001:db8:1::2"));
    }

    #[test]
    fn test_requested_addresses_matched_per_set() {
        let ranges = vec![set(&["10.1.2.0/24"]), set(&["10.1.3.0/24"])];
        let mut store = MemoryStore::new();

        let requested = [ip("10.1.3.77"), ip("10.1.2.88")];
        let ips = allocate_all(&mut store, &ranges, "dummy", &requested).unwrap();
        assert_eq!(ips[0].address.addr(), ip("10.1.2.88"));
        assert_eq!(ips[1].address.addr(), ip("10.1.3.77"));
    }

    #[test]
    fn test_unmatched_requests_roll_back() {
        let ranges = vec![set(&["10.0.0.0/30"]), set(&["10.0.1.0/30"])];
        let mut store = MemoryStore::new();

        let requested = [ip("10.9.0.1"), ip("10.9.0.2")];
        let err = allocate_all(&mut store, &ranges, "dummy", &requested).unwrap_err();
        assert_eq!(
            err.to_string(),
            "failed to allocate all requested IPs: 10.9.0.1 10.9.0.2"
        );
        assert_eq!(store.reservation_count(), 0);
    }

    #[test]
    fn test_duplicate_requests_count_once() {
        let ranges = vec![set(&["10.1.2.0/24"])];
        let mut store = MemoryStore::new();

        let requested = [ip("10.1.2.88"), ip("::ffff:10.1.2.88"), ip("10.1.2.88")];
        let ips = allocate_all(&mut store, &ranges, "dummy", &requested).unwrap();
        assert_eq!(ips.len(), 1);
        assert_eq!(ips[0].address.addr(), ip("10.1.2.88"));
        assert_eq!(store.reservation_count(), 1);
    }

    #[test]
    fn test_second_request_in_same_set_unmatched() {
        let ranges = vec![set(&["10.1.2.0/24"])];
        let mut store = MemoryStore::new();

        let requested = [ip("10.1.2.88"), ip("10.1.2.77")];
        let err = allocate_all(&mut store, &ranges, "dummy", &requested).unwrap_err();
        assert!(err
            .to_string()
            .starts_with("failed to allocate all requested IPs: 10.1.2."));
        assert_eq!(store.reservation_count(), 0);
    }

    #[test]
    fn test_failure_releases_earlier_sets() {
        let ranges = vec![set(&["10.0.0.0/30"]), set(&["10.0.1.0/30"])];
        let mut store = MemoryStore::new();
        store.reserve("other", ip("10.0.1.2"), 1).unwrap();

        let err = allocate_all(&mut store, &ranges, "dummy", &[]).unwrap_err();
        assert!(matches!(err, IpamError::RangeAllocation { index: 1, .. }));
        assert!(err
            .to_string()
            .starts_with("failed to allocate for range 1: no IP addresses available"));

        assert_eq!(store.owner_of(ip("10.0.0.2")), None);
        assert_eq!(store.owner_of(ip("10.0.1.2")), Some("other"));
        assert!(!store.is_locked());
    }

    #[test]
    fn test_release_all_is_idempotent() {
        let ranges = vec![set(&["10.1.2.0/24"]), set(&["10.1.3.0/24"])];
        let mut store = MemoryStore::new();
        allocate_all(&mut store, &ranges, "dummy", &[]).unwrap();

        release_all(&mut store, &ranges, "dummy").unwrap();
        assert_eq!(store.reservation_count(), 0);
        release_all(&mut store, &ranges, "dummy").unwrap();
        release_all(&mut store, &ranges, "unknown").unwrap();
    }
}
