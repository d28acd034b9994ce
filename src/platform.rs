//! OS platform abstraction for reserve/commit virtual memory.
//!
//! The arena only talks to the [`Backend`] trait. [`OsBackend`] names the
//! implementation picked for the build target:
//! - Unix: `mmap(PROT_NONE)` to reserve, `mprotect` to commit,
//!   `madvise(MADV_DONTNEED)` + `mprotect` to decommit, `munmap` to release.
//! - Windows: `VirtualAlloc(MEM_RESERVE)` / `VirtualAlloc(MEM_COMMIT)` /
//!   `VirtualFree(MEM_DECOMMIT)` / `VirtualFree(MEM_RELEASE)`.
//! - Miri and other targets: [`HeapBackend`], which has no notion of
//!   reservation and backs the whole range up front.

use crate::error::Error;
use core::ptr::NonNull;

mod heap;
pub use heap::HeapBackend;

cfg_if::cfg_if! {
    if #[cfg(miri)] {
        /// Backend used by [`crate::Arena::new`] on this target.
        pub use heap::HeapBackend as OsBackend;
    } else if #[cfg(windows)] {
        mod windows;
        /// Backend used by [`crate::Arena::new`] on this target.
        pub use windows::VirtualMemory as OsBackend;
    } else if #[cfg(unix)] {
        mod unix;
        /// Backend used by [`crate::Arena::new`] on this target.
        pub use unix::VirtualMemory as OsBackend;
    } else {
        /// Backend used by [`crate::Arena::new`] on this target.
        pub use heap::HeapBackend as OsBackend;
    }
}

/// The four virtual-memory primitives an arena is built on, plus the page
/// size they operate at.
///
/// # Safety
///
/// Implementors guarantee that:
/// - `reserve` returns a `page_size`-aligned address of a range at least
///   `size` bytes long (rounded up to `page_size`) that no other code uses;
/// - after `commit` succeeds, the committed bytes are readable and writable
///   until they are decommitted or the reservation is released;
/// - `page_size` is a power of two and returns the same value on every call.
pub unsafe trait Backend {
    /// Granularity of commit and decommit, in bytes.
    fn page_size(&self) -> usize;

    /// Reserve `size` bytes of address space with no access and no physical
    /// backing. `size` need not be page-aligned.
    fn reserve(&self, size: usize) -> Result<NonNull<u8>, Error>;

    /// Commit the trailing `additional_bytes` of the first `total_size`
    /// bytes at `base`. Re-committing committed pages succeeds.
    ///
    /// # Safety
    ///
    /// `base` must come from `reserve` on this backend, `total_size` must not
    /// exceed the reservation, and both sizes must be page multiples.
    unsafe fn commit(
        &self,
        base: NonNull<u8>,
        total_size: usize,
        additional_bytes: usize,
    ) -> Result<(), Error>;

    /// Drop the physical backing and access for `size` bytes at `addr`,
    /// keeping the address range reserved.
    ///
    /// # Safety
    ///
    /// `addr` must be page-aligned and `addr..addr + size` must lie inside a
    /// live reservation from this backend. Its contents are lost.
    unsafe fn decommit(&self, addr: NonNull<u8>, size: usize) -> Result<(), Error>;

    /// Return the whole reservation to the OS.
    ///
    /// # Safety
    ///
    /// `base` and `size` must describe a live reservation from this backend.
    /// No pointer into it may be used afterwards.
    unsafe fn release(&self, base: NonNull<u8>, size: usize) -> Result<(), Error>;
}

unsafe impl<B: Backend + ?Sized> Backend for &B {
    #[inline]
    fn page_size(&self) -> usize {
        (**self).page_size()
    }

    #[inline]
    fn reserve(&self, size: usize) -> Result<NonNull<u8>, Error> {
        (**self).reserve(size)
    }

    #[inline]
    unsafe fn commit(
        &self,
        base: NonNull<u8>,
        total_size: usize,
        additional_bytes: usize,
    ) -> Result<(), Error> {
        unsafe { (**self).commit(base, total_size, additional_bytes) }
    }

    #[inline]
    unsafe fn decommit(&self, addr: NonNull<u8>, size: usize) -> Result<(), Error> {
        unsafe { (**self).decommit(addr, size) }
    }

    #[inline]
    unsafe fn release(&self, base: NonNull<u8>, size: usize) -> Result<(), Error> {
        unsafe { (**self).release(base, size) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_size_is_stable() {
        let os = OsBackend::default();
        let page = os.page_size();
        assert!(page >= 4096);
        assert!(page.is_power_of_two());
        assert_eq!(os.page_size(), page);
    }

    #[test]
    fn test_reserve_commit_release() {
        let os = OsBackend::default();
        let page = os.page_size();
        let size = page * 8;
        let base = os.reserve(size).unwrap();
        assert_eq!(base.as_ptr() as usize % page, 0);
        unsafe {
            os.commit(base, page * 2, page * 2).unwrap();
            let p = base.as_ptr();
            for i in 0..page * 2 {
                *p.add(i) = (i & 0xFF) as u8;
            }
            for i in 0..page * 2 {
                assert_eq!(*p.add(i), (i & 0xFF) as u8);
            }
            os.release(base, size).unwrap();
        }
    }

    #[test]
    fn test_commit_trailing_range() {
        let os = OsBackend::default();
        let page = os.page_size();
        let size = page * 4;
        let base = os.reserve(size).unwrap();
        unsafe {
            os.commit(base, page, page).unwrap();
            os.commit(base, page * 3, page * 2).unwrap();
            let p = base.as_ptr();
            *p = 0xAA;
            *p.add(page * 3 - 1) = 0xBB;
            assert_eq!(*p, 0xAA);
            assert_eq!(*p.add(page * 3 - 1), 0xBB);
            os.release(base, size).unwrap();
        }
    }

    #[test]
    fn test_recommit_after_decommit() {
        let os = OsBackend::default();
        let page = os.page_size();
        let size = page * 4;
        let base = os.reserve(size).unwrap();
        unsafe {
            os.commit(base, page * 2, page * 2).unwrap();
            let tail = base.add(page);
            os.decommit(tail, page).unwrap();
            os.commit(base, page * 2, page).unwrap();
            *tail.as_ptr() = 0x42;
            assert_eq!(*tail.as_ptr(), 0x42);
            os.release(base, size).unwrap();
        }
    }

    #[test]
    fn test_reserve_large() {
        let os = OsBackend::default();
        let size = 256 * 1024 * 1024;
        let base = os.reserve(size).unwrap();
        unsafe { os.release(base, size).unwrap() };
    }

    #[test]
    fn test_borrowed_backend() {
        let os = OsBackend::default();
        let borrowed = &os;
        assert_eq!(borrowed.page_size(), os.page_size());
    }
}
