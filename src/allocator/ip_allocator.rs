//! Serves Get/Release requests for one range set against a shared store.

use std::net::IpAddr;

use ipnet::IpNet;

use super::iter::RangeIter;
use super::range::Range;
use super::range_set::RangeSet;
use crate::error::{IpamError, Result};
use crate::store::{Store, StoreGuard};
use crate::types::IpConfig;
use crate::utils::ip_utils::{canonicalize_ip, ip_version};

/// Binding of one range set, its index within the pool, and the pool's store.
/// Lives for a single request.
pub struct IpAllocator<'a, S: Store + ?Sized> {
    range_set: &'a RangeSet,
    store: &'a mut S,
    range_id: usize,
}

impl<'a, S: Store + ?Sized> IpAllocator<'a, S> {
    pub fn new(range_set: &'a RangeSet, store: &'a mut S, range_id: usize) -> Self {
        IpAllocator {
            range_set,
            store,
            range_id,
        }
    }

    /// Reserve an address for `id`: exactly `requested` when given,
    /// otherwise the next free address in round-robin order.
    pub fn get(&mut self, id: &str, requested: Option<IpAddr>) -> Result<IpConfig> {
        let range_set = self.range_set;
        let range_id = self.range_id;
        let mut store = StoreGuard::lock(&mut *self.store)?;

        let (ip, range) = match requested {
            Some(requested) => {
                let requested = canonicalize_ip(requested);
                let (_, range) = range_set.range_for(requested)?;

                if requested == range.gateway() {
                    return Err(IpamError::AllocationConflict(format!(
                        "requested ip {} is subnet's gateway",
                        requested
                    )));
                }

                if !store.reserve(id, requested, range_id)? {
                    return Err(IpamError::AllocationConflict(format!(
                        "requested IP address {} is not available in range set {}",
                        requested, range_set
                    )));
                }
                (requested, range)
            }
            None => {
                let iter = seed_iter(range_set, &*store, range_id);
                let mut reserved = None;
                for (candidate, range) in iter {
                    log::debug!("Trying {} for {}", candidate, id);
                    if store.reserve(id, candidate, range_id)? {
                        reserved = Some((candidate, range));
                        break;
                    }
                }
                reserved.ok_or_else(|| IpamError::PoolExhausted {
                    range_set: range_set.to_string(),
                })?
            }
        };

        log::info!("Allocated {} to {} from range set {}", ip, id, range_id);
        ip_config(ip, range)
    }

    /// Release every address `id` holds in this pool
    pub fn release(&mut self, id: &str) -> Result<()> {
        let mut store = StoreGuard::lock(&mut *self.store)?;
        store.release_by_id(id)?;
        log::info!("Released addresses held by {} in range set {}", id, self.range_id);
        Ok(())
    }

    /// Candidate iterator seeded from the store's last-reserved marker
    pub fn range_iter(&self) -> RangeIter<'a> {
        seed_iter(self.range_set, &*self.store, self.range_id)
    }
}

fn seed_iter<'r, S: Store + ?Sized>(
    range_set: &'r RangeSet,
    store: &S,
    range_id: usize,
) -> RangeIter<'r> {
    let last_reserved = match store.last_reserved_ip(range_id) {
        Ok(ip) => Some(ip),
        Err(IpamError::LastReservedNotFound { .. }) => None,
        Err(e) => {
            log::warn!("Error retrieving last reserved ip: {}", e);
            None
        }
    };
    RangeIter::resume(range_set, last_reserved)
}

fn ip_config(ip: IpAddr, range: &Range) -> Result<IpConfig> {
    let address = IpNet::new(ip, range.subnet.prefix_len())
        .map_err(|e| IpamError::RangeBounds(format!("invalid prefix for {}: {}", ip, e)))?;
    Ok(IpConfig {
        version: ip_version(ip).to_string(),
        address,
        gateway: range.gateway(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::collections::HashMap;

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

    struct Case {
        subnets: &'static [&'static str],
        ip_map: &'static [&'static str],
        last_ip: Option<&'static str>,
        expect: &'static str,
    }

    impl Case {
        fn run(&self) -> Result<IpConfig> {
            let p = set(self.subnets);
            let ip_map: HashMap<String, String> = self
                .ip_map
                .iter()
                .map(|ip| (ip.to_string(), "id".to_string()))
                .collect();
            let mut last = HashMap::new();
            if let Some(l) = self.last_ip {
                last.insert(0, ip(l));
            }
            let mut store = MemoryStore::with_state(ip_map, last);
            IpAllocator::new(&p, &mut store, 0).get("ID", None)
        }
    }

    #[test]
    fn test_round_robin_cases() {
        let cases = [
            Case {
                subnets: &["10.0.0.0/29"],
                ip_map: &[],
                last_ip: None,
                expect: "10.0.0.2",
            },
            Case {
                subnets: &["2001:db8:1::0/64"],
                ip_map: &[],
                last_ip: None,
                expect: "2001:db8:1::2",
            },
            Case {
                subnets: &["10.0.0.0/30"],
                ip_map: &[],
                last_ip: None,
                expect: "10.0.0.2",
            },
            Case {
                subnets: &["10.0.0.0/29"],
                ip_map: &["10.0.0.2"],
                last_ip: None,
                expect: "10.0.0.3",
            },
            Case {
                subnets: &["10.0.0.0/29"],
                ip_map: &[],
                last_ip: Some("10.0.0.5"),
                expect: "10.0.0.6",
            },
            Case {
                subnets: &["10.0.0.0/29"],
                ip_map: &["10.0.0.4", "10.0.0.5"],
                last_ip: Some("10.0.0.3"),
                expect: "10.0.0.6",
            },
            Case {
                subnets: &["10.0.0.0/29"],
                ip_map: &["10.0.0.6"],
                last_ip: Some("10.0.0.5"),
                expect: "10.0.0.2",
            },
            Case {
                subnets: &["10.0.0.0/29"],
                ip_map: &["10.0.0.2"],
                last_ip: Some("10.0.0.128"),
                expect: "10.0.0.3",
            },
            Case {
                subnets: &["10.0.0.0/29"],
                ip_map: &["10.0.0.2", "10.0.0.4", "10.0.0.5", "10.0.0.6"],
                last_ip: Some("10.0.0.3"),
                expect: "10.0.0.3",
            },
            Case {
                subnets: &["10.0.0.0/30", "10.0.1.0/30"],
                ip_map: &[],
                last_ip: None,
                expect: "10.0.0.2",
            },
            Case {
                subnets: &["10.0.0.0/30", "10.0.1.0/30"],
                ip_map: &[],
                last_ip: Some("10.0.0.2"),
                expect: "10.0.1.2",
            },
            Case {
                subnets: &["10.0.0.0/30", "10.0.1.0/30", "10.0.2.0/30"],
                ip_map: &[],
                last_ip: Some("10.0.2.2"),
                expect: "10.0.0.2",
            },
        ];

        for (idx, case) in cases.iter().enumerate() {
            let res = case.run().unwrap_or_else(|e| panic!("case {idx}: {e}"));
            assert_eq!(res.address.addr().to_string(), case.expect, "case {idx}");
        }
    }

    #[test]
    fn test_never_allocates_broadcast() {
        let p = set(&["192.168.1.0/29"]);
        let mut store = MemoryStore::new();
        let mut alloc = IpAllocator::new(&p, &mut store, 0);
        for i in 2..7 {
            let res = alloc.get("ID", None).unwrap();
            assert_eq!(res.address.to_string(), format!("192.168.1.{}/29", i));
        }
        assert!(alloc.get("ID", None).is_err());
    }

    #[test]
    fn test_round_robin_after_release() {
        let p = set(&["192.168.1.0/29"]);
        let mut store = MemoryStore::new();
        let mut alloc = IpAllocator::new(&p, &mut store, 0);

        let res = alloc.get("ID", None).unwrap();
        assert_eq!(res.address.to_string(), "192.168.1.2/29");
        alloc.release("ID").unwrap();

        let res = alloc.get("ID", None).unwrap();
        assert_eq!(res.address.to_string(), "192.168.1.3/29");
    }

    #[test]
    fn test_result_carries_gateway_and_version() {
        let p = set(&["2001:db8:1::/64"]);
        let mut store = MemoryStore::new();
        let res = IpAllocator::new(&p, &mut store, 0).get("ID", None).unwrap();
        assert_eq!(res.version, "6");
        assert_eq!(res.gateway, ip("2001:db8:1::1"));
        assert_eq!(res.address.prefix_len(), 64);
    }

    #[test]
    fn test_allocates_requested_ip() {
        let p = set(&["192.168.1.0/29"]);
        let mut store = MemoryStore::new();
        let res = IpAllocator::new(&p, &mut store, 0)
            .get("ID", Some(ip("192.168.1.5")))
            .unwrap();
        assert_eq!(res.address.addr(), ip("192.168.1.5"));
        assert_eq!(store.last_reserved_ip(0).unwrap(), ip("192.168.1.5"));
    }

    #[test]
    fn test_requested_ip_already_reserved() {
        let p = set(&["192.168.1.0/29"]);
        let mut store = MemoryStore::new();
        let mut alloc = IpAllocator::new(&p, &mut store, 0);
        alloc.get("ID", Some(ip("192.168.1.5"))).unwrap();

        let err = alloc.get("ID", Some(ip("192.168.1.5"))).unwrap_err();
        assert_eq!(
            err.to_string(),
            "requested IP address 192.168.1.5 is not available in range set 192.168.1.1-192.168.1.6"
        );
        assert!(matches!(err, IpamError::AllocationConflict(_)));
    }

    #[test]
    fn test_requested_gateway_rejected() {
        let p = set(&["192.168.1.0/29"]);
        let mut store = MemoryStore::new();
        let err = IpAllocator::new(&p, &mut store, 0)
            .get("ID", Some(ip("192.168.1.1")))
            .unwrap_err();
        assert_eq!(err.to_string(), "requested ip 192.168.1.1 is subnet's gateway");
        assert_eq!(store.reservation_count(), 0);
    }

    #[test]
    fn test_requested_ip_outside_bounds() {
        let mut r = Range::new("192.168.1.0/29".parse().unwrap());
        r.range_start = Some(ip("192.168.1.3"));
        r.range_end = Some(ip("192.168.1.4"));
        let mut p = RangeSet::new(vec![r]);
        p.canonicalize().unwrap();
        let mut store = MemoryStore::new();
        let mut alloc = IpAllocator::new(&p, &mut store, 0);

        let err = alloc.get("ID", Some(ip("192.168.1.5"))).unwrap_err();
        assert_eq!(
            err.to_string(),
            "192.168.1.5 not in range set 192.168.1.3-192.168.1.4"
        );
        assert!(alloc.get("ID", Some(ip("192.168.1.2"))).is_err());
    }

    #[test]
    fn test_out_of_ips() {
        let cases = [
            Case {
                subnets: &["10.0.0.0/30"],
                ip_map: &["10.0.0.2"],
                last_ip: None,
                expect: "",
            },
            Case {
                subnets: &["10.0.0.0/29"],
                ip_map: &["10.0.0.2", "10.0.0.3", "10.0.0.4", "10.0.0.5", "10.0.0.6"],
                last_ip: None,
                expect: "",
            },
            Case {
                subnets: &["10.0.0.0/30", "10.0.1.0/30"],
                ip_map: &["10.0.0.2", "10.0.1.2"],
                last_ip: None,
                expect: "",
            },
        ];

        for (idx, case) in cases.iter().enumerate() {
            let err = case.run().unwrap_err();
            assert!(
                err.to_string().starts_with("no IP addresses available in range set"),
                "case {idx}: {err}"
            );
            assert!(matches!(err, IpamError::PoolExhausted { .. }));
        }
    }

    #[test]
    fn test_lock_released_after_failure() {
        let p = set(&["10.0.0.0/30"]);
        let mut store = MemoryStore::new();
        store.reserve("other", ip("10.0.0.2"), 0).unwrap();
        assert!(IpAllocator::new(&p, &mut store, 0).get("ID", None).is_err());
        assert!(!store.is_locked());
    }

    #[test]
    fn test_range_iter_seeded_from_store() {
        let p = set(&["192.168.1.0/29"]);
        let mut store = MemoryStore::new();
        store.reserve("ID", ip("192.168.1.3"), 0).unwrap();
        store.release_by_id("ID").unwrap();

        let alloc = IpAllocator::new(&p, &mut store, 0);
        let got: Vec<String> = alloc.range_iter().map(|(ip, _)| ip.to_string()).collect();
        assert_eq!(
            got,
            ["192.168.1.4", "192.168.1.5", "192.168.1.6", "192.168.1.2", "192.168.1.3"]
        );
    }
}
