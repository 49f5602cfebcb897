// Allocation accounting shared by host and plugin through one store context.
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Fixed bytes charged per plant header.
pub const PLANT_OVERHEAD: usize = 32;
/// Fixed bytes charged per leaf record (key pointer, seed, count, flags, links).
pub const LEAF_OVERHEAD: usize = 40;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AllocError {
    pub requested: usize,
    pub available: usize,
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "requested {} bytes with {} available",
            self.requested, self.available
        )
    }
}

impl std::error::Error for AllocError {}

/// Pluggable allocation domain.
///
/// The store charges every plant and leaf footprint through this trait before
/// committing it and releases the same amount on teardown, so a host can bound
/// or audit what plugin code allocates through the store.
pub trait Allocator: Send + Sync {
    fn allocate(&self, bytes: usize) -> Result<(), AllocError>;

    fn release(&self, bytes: usize);

    fn in_use(&self) -> usize;
}

/// Never refuses; only tracks usage.
#[derive(Debug, Default)]
pub struct SystemAllocator {
    in_use: AtomicUsize,
}

impl SystemAllocator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Allocator for SystemAllocator {
    fn allocate(&self, bytes: usize) -> Result<(), AllocError> {
        self.in_use.fetch_add(bytes, Ordering::Relaxed);
        Ok(())
    }

    fn release(&self, bytes: usize) {
        self.in_use.fetch_sub(bytes, Ordering::Relaxed);
    }

    fn in_use(&self) -> usize {
        self.in_use.load(Ordering::Relaxed)
    }
}

/// Refuses any allocation that would push usage past `limit`.
#[derive(Debug)]
pub struct BoundedAllocator {
    limit: usize,
    in_use: AtomicUsize,
}

impl BoundedAllocator {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            in_use: AtomicUsize::new(0),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}

impl Allocator for BoundedAllocator {
    fn allocate(&self, bytes: usize) -> Result<(), AllocError> {
        self.in_use
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                current
                    .checked_add(bytes)
                    .filter(|next| *next <= self.limit)
            })
            .map(|_| ())
            .map_err(|current| AllocError {
                requested: bytes,
                available: self.limit.saturating_sub(current),
            })
    }

    fn release(&self, bytes: usize) {
        self.in_use.fetch_sub(bytes, Ordering::AcqRel);
    }

    fn in_use(&self) -> usize {
        self.in_use.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_allocator_tracks_usage() {
        let alloc = SystemAllocator::new();
        alloc.allocate(100).expect("allocate");
        alloc.allocate(20).expect("allocate");
        assert_eq!(alloc.in_use(), 120);
        alloc.release(100);
        assert_eq!(alloc.in_use(), 20);
    }

    #[test]
    fn bounded_allocator_refuses_past_limit() {
        let alloc = BoundedAllocator::new(64);
        alloc.allocate(60).expect("allocate");
        let err = alloc.allocate(5).expect_err("over limit");
        assert_eq!(err, AllocError { requested: 5, available: 4 });
        assert_eq!(alloc.in_use(), 60);

        alloc.allocate(4).expect("fits exactly");
        alloc.release(64);
        assert_eq!(alloc.in_use(), 0);
    }
}
