//! Non-reservation fallback backed by the global allocator.
//!
//! Used under Miri, which cannot execute mmap/VirtualAlloc, and on targets
//! without a virtual-memory backend. A reservation is a real, zeroed
//! allocation of the full size, so commit and decommit have nothing to do.

use super::Backend;
use crate::align::align_up;
use crate::error::Error;
use core::alloc::Layout;
use core::ptr::NonNull;

/// Page size reported by [`HeapBackend`].
pub const HEAP_PAGE_SIZE: usize = 4096;

#[derive(Clone, Copy, Debug, Default)]
pub struct HeapBackend;

fn layout(size: usize) -> Option<Layout> {
    Layout::from_size_align(align_up(size, HEAP_PAGE_SIZE), HEAP_PAGE_SIZE).ok()
}

unsafe impl Backend for HeapBackend {
    #[inline]
    fn page_size(&self) -> usize {
        HEAP_PAGE_SIZE
    }

    fn reserve(&self, size: usize) -> Result<NonNull<u8>, Error> {
        let layout = layout(size)
            .filter(|l| l.size() > 0)
            .ok_or(Error::ReservationFailed { size })?;
        NonNull::new(unsafe { alloc::alloc::alloc_zeroed(layout) })
            .ok_or(Error::ReservationFailed { size })
    }

    unsafe fn commit(
        &self,
        _base: NonNull<u8>,
        _total_size: usize,
        _additional_bytes: usize,
    ) -> Result<(), Error> {
        Ok(())
    }

    unsafe fn decommit(&self, _addr: NonNull<u8>, _size: usize) -> Result<(), Error> {
        Ok(())
    }

    unsafe fn release(&self, base: NonNull<u8>, size: usize) -> Result<(), Error> {
        let layout = layout(size).ok_or(Error::ReleaseFailed { size })?;
        unsafe { alloc::alloc::dealloc(base.as_ptr(), layout) };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserve_is_usable_immediately() {
        let heap = HeapBackend;
        let base = heap.reserve(100).unwrap();
        assert_eq!(base.as_ptr() as usize % HEAP_PAGE_SIZE, 0);
        unsafe {
            heap.commit(base, HEAP_PAGE_SIZE, HEAP_PAGE_SIZE).unwrap();
            for i in 0..HEAP_PAGE_SIZE {
                assert_eq!(*base.as_ptr().add(i), 0);
            }
            heap.release(base, 100).unwrap();
        }
    }

    #[test]
    fn test_reserve_zero_fails() {
        assert_eq!(
            HeapBackend.reserve(0),
            Err(Error::ReservationFailed { size: 0 })
        );
    }

    #[test]
    fn test_reserve_overflow_fails() {
        assert!(HeapBackend.reserve(usize::MAX).is_err());
    }
}
