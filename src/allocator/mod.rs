//! Address pools and the allocators that hand out addresses from them.
//!
//! A network is configured with one or more [`RangeSet`]s (typically one per
//! address family). Each invocation builds an [`IpAllocator`] per range set,
//! all bound to the same [`Store`](crate::store::Store), and
//! [`allocate_all`] coordinates them so that a partial failure leaves no
//! reservations behind.

pub mod coordinator;
pub mod ip_allocator;
pub mod iter;
pub mod range;
pub mod range_set;

// Re-export commonly used types
pub use coordinator::{allocate_all, release_all};
pub use ip_allocator::IpAllocator;
pub use iter::RangeIter;
pub use range::Range;
pub use range_set::RangeSet;
