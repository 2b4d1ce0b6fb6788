//! Persisted reservations and the per-pool lock that guards them.
//!
//! A [`Store`] owns all state that survives between invocations: which
//! address belongs to which owner, and the last address handed out for each
//! range set of a pool. Every read-modify-write sequence against a store must
//! happen while holding its lock; [`StoreGuard`] scopes that lock so it is
//! released on every exit path.

pub mod disk;
pub mod lock;
pub mod memory;

use std::net::IpAddr;
use std::ops::{Deref, DerefMut};

use crate::error::Result;

pub use disk::DiskStore;
pub use lock::FileLock;
pub use memory::MemoryStore;

/// Reservation storage for one named pool
pub trait Store {
    /// Block until the pool lock is held
    fn lock(&mut self) -> Result<()>;

    fn unlock(&mut self) -> Result<()>;

    fn close(&mut self) -> Result<()>;

    /// Claim `ip` for `id` if nobody holds it yet. On success `ip` becomes
    /// the last-reserved marker for `range_id`. Returns whether the claim
    /// was committed.
    fn reserve(&mut self, id: &str, ip: IpAddr, range_id: usize) -> Result<bool>;

    /// Fails with `IpamError::LastReservedNotFound` when no marker exists
    fn last_reserved_ip(&self, range_id: usize) -> Result<IpAddr>;

    fn release(&mut self, ip: IpAddr) -> Result<()>;

    /// Release every address owned by `id`. Owning nothing is not an error.
    fn release_by_id(&mut self, id: &str) -> Result<()>;
}

/// Holds a store's lock until dropped
pub struct StoreGuard<'a, S: Store + ?Sized> {
    store: &'a mut S,
}

impl<'a, S: Store + ?Sized> StoreGuard<'a, S> {
    pub fn lock(store: &'a mut S) -> Result<Self> {
        store.lock()?;
        Ok(StoreGuard { store })
    }
}

impl<S: Store + ?Sized> Deref for StoreGuard<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.store
    }
}

impl<S: Store + ?Sized> DerefMut for StoreGuard<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.store
    }
}

impl<S: Store + ?Sized> Drop for StoreGuard<'_, S> {
    fn drop(&mut self) {
        if let Err(e) = self.store.unlock() {
            log::error!("Failed to release store lock: {}", e);
        }
    }
}
