//! In-memory store used by tests and by callers that do not need persistence.

use std::collections::HashMap;
use std::net::IpAddr;

use super::Store;
use crate::error::{IpamError, Result};

#[derive(Debug, Default)]
pub struct MemoryStore {
    /// Address (string form) -> owner id
    ip_map: HashMap<String, String>,
    last_reserved: HashMap<usize, IpAddr>,
    locked: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store with pre-existing reservations and markers
    pub fn with_state(
        ip_map: HashMap<String, String>,
        last_reserved: HashMap<usize, IpAddr>,
    ) -> Self {
        MemoryStore {
            ip_map,
            last_reserved,
            locked: false,
        }
    }

    pub fn owner_of(&self, ip: IpAddr) -> Option<&str> {
        self.ip_map.get(&ip.to_string()).map(String::as_str)
    }

    pub fn reservation_count(&self) -> usize {
        self.ip_map.len()
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }
}

impl Store for MemoryStore {
    fn lock(&mut self) -> Result<()> {
        self.locked = true;
        Ok(())
    }

    fn unlock(&mut self) -> Result<()> {
        self.locked = false;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }

    fn reserve(&mut self, id: &str, ip: IpAddr, range_id: usize) -> Result<bool> {
        let key = ip.to_string();
        if self.ip_map.contains_key(&key) {
            return Ok(false);
        }
        self.ip_map.insert(key, id.trim().to_string());
        self.last_reserved.insert(range_id, ip);
        Ok(true)
    }

    fn last_reserved_ip(&self, range_id: usize) -> Result<IpAddr> {
        self.last_reserved
            .get(&range_id)
            .copied()
            .ok_or(IpamError::LastReservedNotFound { range_id })
    }

    fn release(&mut self, ip: IpAddr) -> Result<()> {
        self.ip_map.remove(&ip.to_string());
        Ok(())
    }

    fn release_by_id(&mut self, id: &str) -> Result<()> {
        let id = id.trim();
        self.ip_map.retain(|_, owner| owner != id);
        Ok(())
    }
}
