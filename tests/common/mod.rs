//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::cell::Cell;
use std::ptr::NonNull;
use vmarena::{Arena, Backend, Error, OsBackend};

/// Wraps the platform backend, counting every call and optionally failing
/// commits.
#[derive(Default)]
pub struct CountingBackend {
    pub reserves: Cell<usize>,
    pub commits: Cell<usize>,
    pub committed_bytes: Cell<usize>,
    pub decommits: Cell<usize>,
    pub releases: Cell<usize>,
    pub fail_commits: Cell<bool>,
}

unsafe impl Backend for CountingBackend {
    fn page_size(&self) -> usize {
        OsBackend.page_size()
    }

    fn reserve(&self, size: usize) -> Result<NonNull<u8>, Error> {
        let base = OsBackend.reserve(size)?;
        self.reserves.set(self.reserves.get() + 1);
        Ok(base)
    }

    unsafe fn commit(
        &self,
        base: NonNull<u8>,
        total_size: usize,
        additional_bytes: usize,
    ) -> Result<(), Error> {
        if self.fail_commits.get() {
            return Err(Error::CommitFailed {
                size: additional_bytes,
            });
        }
        unsafe { OsBackend.commit(base, total_size, additional_bytes)? };
        self.commits.set(self.commits.get() + 1);
        self.committed_bytes
            .set(self.committed_bytes.get() + additional_bytes);
        Ok(())
    }

    unsafe fn decommit(&self, addr: NonNull<u8>, size: usize) -> Result<(), Error> {
        unsafe { OsBackend.decommit(addr, size)? };
        self.decommits.set(self.decommits.get() + 1);
        Ok(())
    }

    unsafe fn release(&self, base: NonNull<u8>, size: usize) -> Result<(), Error> {
        unsafe { OsBackend.release(base, size)? };
        self.releases.set(self.releases.get() + 1);
        Ok(())
    }
}

/// Panics if the arena's positions are out of order or misaligned.
pub fn assert_invariants<B: Backend>(arena: &Arena<B>) {
    if !arena.is_reserved() {
        assert!(arena.base().is_null());
        assert_eq!(arena.used(), 0);
        assert_eq!(arena.committed(), 0);
        assert_eq!(arena.reserved_size(), 0);
        return;
    }
    assert!(arena.base() <= arena.cursor(), "cursor below base");
    assert!(
        arena.cursor() <= arena.committed_end(),
        "cursor past committed end"
    );
    assert!(
        arena.committed() <= arena.reserved_size(),
        "committed past reservation"
    );
    assert_eq!(arena.committed() % arena.page_size(), 0, "partial page");
}

/// Fill a buffer with a deterministic pattern derived from its address and size.
pub fn fill_pattern(ptr: *mut u8, size: usize) {
    let seed = ptr as usize ^ size;
    for i in 0..size {
        unsafe {
            *ptr.add(i) = ((seed.wrapping_add(i).wrapping_mul(0x9E37_79B9)) & 0xFF) as u8;
        }
    }
}

/// Verify the fill pattern. Returns true if intact.
pub fn check_pattern(ptr: *mut u8, size: usize) -> bool {
    let seed = ptr as usize ^ size;
    (0..size).all(|i| {
        let expected = ((seed.wrapping_add(i).wrapping_mul(0x9E37_79B9)) & 0xFF) as u8;
        unsafe { *ptr.add(i) == expected }
    })
}
