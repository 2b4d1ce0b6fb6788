//! Round-robin walk over the candidate addresses of a range set.
//!
//! The walk resumes after the last reserved address, visits every
//! non-gateway address of every member exactly once, wrapping from the end of
//! the last member to the start of the first, and stops when it returns to
//! where it began.

use std::net::IpAddr;

use super::range::Range;
use super::range_set::RangeSet;
use crate::utils::ip_utils::{canonicalize_ip, next_ip};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cursor {
    NotStarted,
    At(IpAddr),
}

#[derive(Debug, Clone)]
pub struct RangeIter<'a> {
    range_set: &'a RangeSet,
    range_idx: usize,
    cur: Cursor,
    /// Position of the first candidate of this cycle, recorded lazily
    start: Option<(usize, IpAddr)>,
    done: bool,
}

impl<'a> RangeIter<'a> {
    /// Start at the first address of the first range
    pub fn new(range_set: &'a RangeSet) -> Self {
        RangeIter {
            range_set,
            range_idx: 0,
            cur: Cursor::NotStarted,
            start: None,
            done: range_set.is_empty(),
        }
    }

    /// Continue after `last_reserved` if it is still part of the set,
    /// otherwise start fresh.
    pub fn resume(range_set: &'a RangeSet, last_reserved: Option<IpAddr>) -> Self {
        let mut iter = Self::new(range_set);
        if let Some(ip) = last_reserved.map(canonicalize_ip) {
            if let Ok((idx, _)) = range_set.range_for(ip) {
                iter.range_idx = idx;
                iter.cur = Cursor::At(ip);
            }
        }
        iter
    }

    /// Step from `ip` to the following position, wrapping into the next range
    fn advance(&mut self, ip: IpAddr) -> IpAddr {
        let range = &self.range_set[self.range_idx];
        match next_ip(ip) {
            Some(next) if ip < range.end() => next,
            _ => {
                self.range_idx = (self.range_idx + 1) % self.range_set.len();
                self.range_set[self.range_idx].start()
            }
        }
    }
}

impl<'a> Iterator for RangeIter<'a> {
    type Item = (IpAddr, &'a Range);

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            let candidate = match self.cur {
                Cursor::NotStarted => {
                    let first = self.range_set[self.range_idx].start();
                    self.start = Some((self.range_idx, first));
                    first
                }
                Cursor::At(ip) => {
                    let next = self.advance(ip);
                    match self.start {
                        None => self.start = Some((self.range_idx, next)),
                        Some(start) if start == (self.range_idx, next) => {
                            self.done = true;
                            return None;
                        }
                        Some(_) => {}
                    }
                    next
                }
            };
            self.cur = Cursor::At(candidate);

            let range = &self.range_set[self.range_idx];
            if candidate != range.gateway() {
                return Some((candidate, range));
            }
        }
    }
}
