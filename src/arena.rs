//! Arena handle: one contiguous reservation, grown in place by committing
//! pages at its tail.
//!
//! An arena tracks three positions measured from `base`:
//!
//! ```text
//! base        cursor         committed                reserved_size
//!  |-- used --|--- slack ----|---- reserved, no access ----|
//! ```
//!
//! After every successful call `cursor <= committed <= reserved_size`, and
//! `committed` is a multiple of the page size. Bump allocations advance
//! `cursor` in `ALIGNMENT` steps while commits advance `committed` in page
//! steps, so many small allocations share one commit.
//!
//! The base address never moves. Pointers handed out stay valid until the
//! range they point into is decommitted or the arena is released.

use crate::align::{align_down, checked_align_up, is_aligned};
use crate::config::{ALIGNMENT, DEFAULT_RESERVE_SIZE};
use crate::error::Error;
use crate::platform::{Backend, OsBackend};
use crate::{stat_add, stat_inc, vm_trace};
use core::fmt;
use core::ptr::{self, NonNull};

const NOT_RESERVED: Error = Error::InvalidArgument {
    reason: "arena is not reserved",
};

/// A reserve-then-commit bump arena.
///
/// `Arena::new()` is the empty, unreserved state. The first growth request
/// reserves [`DEFAULT_RESERVE_SIZE`] bytes unless [`Arena::reserve`] was
/// called first. The reservation size is fixed until [`Arena::release`].
///
/// Not thread-safe: all mutation goes through `&mut self`.
pub struct Arena<B: Backend = OsBackend> {
    base: *mut u8,
    cursor: usize,
    committed: usize,
    reserved_size: usize,
    page_size: usize,
    backend: B,
}

// SAFETY: the arena exclusively owns its reservation; moving it to another
// thread moves that ownership with it.
unsafe impl<B: Backend + Send> Send for Arena<B> {}

impl Arena<OsBackend> {
    /// An empty arena on the platform backend.
    pub const fn new() -> Self {
        Self::with_backend(OsBackend)
    }
}

impl<B: Backend + Default> Default for Arena<B> {
    fn default() -> Self {
        Self::with_backend(B::default())
    }
}

impl<B: Backend> Arena<B> {
    /// An empty arena on a caller-supplied backend.
    pub const fn with_backend(backend: B) -> Self {
        Self {
            base: ptr::null_mut(),
            cursor: 0,
            committed: 0,
            reserved_size: 0,
            page_size: 0,
            backend,
        }
    }

    /// Rebuild an arena from positions previously read out of one.
    ///
    /// # Safety
    ///
    /// The parts must describe a live reservation from `backend` (or be the
    /// all-zero empty state) and satisfy the arena invariants.
    #[cfg(feature = "ffi")]
    pub(crate) unsafe fn from_raw_parts(
        base: *mut u8,
        cursor: usize,
        committed: usize,
        reserved_size: usize,
        page_size: usize,
        backend: B,
    ) -> Self {
        debug_assert!(cursor <= committed && committed <= reserved_size);
        Self {
            base,
            cursor,
            committed,
            reserved_size,
            page_size,
            backend,
        }
    }

    #[inline]
    pub fn is_reserved(&self) -> bool {
        !self.base.is_null()
    }

    /// Start of the reservation, or null when empty.
    #[inline]
    pub fn base(&self) -> *mut u8 {
        self.base
    }

    /// Address the next bump allocation will return.
    #[inline]
    pub fn cursor(&self) -> *mut u8 {
        self.base.wrapping_add(self.cursor)
    }

    /// One past the last committed byte.
    #[inline]
    pub fn committed_end(&self) -> *mut u8 {
        self.base.wrapping_add(self.committed)
    }

    /// Bytes handed out since the last reset.
    #[inline]
    pub fn used(&self) -> usize {
        self.cursor
    }

    /// Bytes backed by physical memory, counted from `base`.
    #[inline]
    pub fn committed(&self) -> usize {
        self.committed
    }

    /// Committed bytes not yet handed out.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.committed - self.cursor
    }

    #[inline]
    pub fn reserved_size(&self) -> usize {
        self.reserved_size
    }

    /// Page size cached at reservation time; zero while empty.
    #[inline]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    #[inline]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Reserve `reserve_size` bytes of address space, rounded up to the page
    /// size. Nothing is committed yet.
    ///
    /// Fails with `InvalidArgument` if the arena is already reserved or the
    /// size is zero; on any failure the arena stays empty.
    pub fn reserve(&mut self, reserve_size: usize) -> Result<(), Error> {
        if self.is_reserved() {
            return Err(Error::InvalidArgument {
                reason: "arena is already reserved",
            });
        }
        if reserve_size == 0 {
            return Err(Error::InvalidArgument {
                reason: "zero-byte reservation",
            });
        }
        let page_size = self.backend.page_size();
        let reserved_size = checked_align_up(reserve_size, page_size)
            .ok_or(Error::ReservationFailed { size: reserve_size })?;
        let base = self.backend.reserve(reserved_size).inspect_err(|_| {
            stat_inc!(reserve_failures);
        })?;
        debug_assert!(is_aligned(base.as_ptr() as usize, page_size));

        self.base = base.as_ptr();
        self.cursor = 0;
        self.committed = 0;
        self.reserved_size = reserved_size;
        self.page_size = page_size;

        stat_inc!(reserve_count);
        stat_add!(reserve_bytes, reserved_size);
        vm_trace!(base = ?self.base, size = reserved_size, "reserve");
        Ok(())
    }

    /// Bump-allocate `additional_bytes` (rounded up to `ALIGNMENT`),
    /// committing more pages if the committed slack is too small.
    ///
    /// Returns the pre-call cursor. Fails with `InvalidArgument` for a zero
    /// request and `CapacityExceeded` when the page-rounded end of the
    /// allocation would pass the reservation. A failure leaves the arena
    /// exactly as it was.
    pub fn grow_commit(&mut self, additional_bytes: usize) -> Result<NonNull<u8>, Error> {
        if additional_bytes == 0 {
            return Err(Error::InvalidArgument {
                reason: "zero-byte growth request",
            });
        }
        let size = checked_align_up(additional_bytes, ALIGNMENT)
            .ok_or_else(|| self.exceeded(self.cursor.saturating_add(additional_bytes)))?;

        if size > self.remaining() {
            self.commit_with(|arena| {
                let end = arena.cursor.saturating_add(size);
                checked_align_up(end, arena.page_size).ok_or_else(|| arena.exceeded(end))
            })?;
        }

        debug_assert!(self.cursor + size <= self.committed);
        // SAFETY: cursor + size <= committed, so this stays in the reservation.
        let ptr = unsafe { NonNull::new_unchecked(self.base.add(self.cursor)) };
        self.cursor += size;
        Ok(ptr)
    }

    /// Rewind the cursor to `base`. Committed pages stay committed, so later
    /// allocations up to the old high-water mark need no commit.
    #[inline]
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Decommit the trailing `trailing_bytes` of the committed region,
    /// rounded up to the page size.
    ///
    /// Fails with `InvalidArgument` when the rounded size exceeds the
    /// committed size or would cut below the cursor; [`Arena::reset`] first
    /// to shrink past live allocations.
    pub fn decommit(&mut self, trailing_bytes: usize) -> Result<(), Error> {
        let base = NonNull::new(self.base).ok_or(NOT_RESERVED)?;
        if trailing_bytes == 0 {
            return Err(Error::InvalidArgument {
                reason: "zero-byte decommit request",
            });
        }
        let new_end = self
            .committed
            .checked_sub(trailing_bytes)
            .map(|end| align_down(end, self.page_size))
            .ok_or(Error::InvalidArgument {
                reason: "decommit exceeds committed size",
            })?;
        let size = self.committed - new_end;
        if self.cursor > new_end {
            return Err(Error::InvalidArgument {
                reason: "decommit would cut below the cursor",
            });
        }

        // SAFETY: new_end..committed lies inside the reservation and holds no
        // live allocation.
        unsafe { self.backend.decommit(base.add(new_end), size) }.inspect_err(|_| {
            stat_inc!(decommit_failures);
        })?;
        self.committed = new_end;

        stat_inc!(decommit_count);
        stat_add!(decommit_bytes, size);
        vm_trace!(base = ?self.base, committed = new_end, size, "decommit");
        Ok(())
    }

    /// Return the reservation to the OS and leave the arena empty, ready to
    /// reserve again.
    ///
    /// Fails with `InvalidArgument` on an empty arena. On `ReleaseFailed` the
    /// arena keeps its reservation.
    pub fn release(&mut self) -> Result<(), Error> {
        let base = NonNull::new(self.base).ok_or(NOT_RESERVED)?;
        let size = self.reserved_size;
        // SAFETY: base/size describe our own live reservation.
        unsafe { self.backend.release(base, size) }.inspect_err(|_| {
            stat_inc!(release_failures);
        })?;

        self.base = ptr::null_mut();
        self.cursor = 0;
        self.committed = 0;
        self.reserved_size = 0;
        self.page_size = 0;

        stat_inc!(release_count);
        stat_add!(release_bytes, size);
        vm_trace!(base = ?base, size, "release");
        Ok(())
    }

    /// Grow the committed region to at least `total_size` bytes from `base`
    /// and move the cursor to the new committed end, like `realloc` on a
    /// buffer that never moves.
    ///
    /// `total_size == 0` releases the arena and returns `None`. A size at or
    /// below the committed size changes nothing and returns `base`.
    pub fn resize(&mut self, total_size: usize) -> Result<Option<NonNull<u8>>, Error> {
        if total_size == 0 {
            if self.is_reserved() {
                self.release()?;
            }
            return Ok(None);
        }
        self.grow_to(total_size).map(Some)
    }

    /// [`Arena::resize`] for a non-zero size.
    pub(crate) fn grow_to(&mut self, total_size: usize) -> Result<NonNull<u8>, Error> {
        debug_assert!(total_size > 0);
        if total_size > self.committed {
            self.commit_with(|arena| {
                checked_align_up(total_size, arena.page_size)
                    .ok_or_else(|| arena.exceeded(total_size))
            })?;
            self.cursor = self.committed;
        }
        NonNull::new(self.base).ok_or(NOT_RESERVED)
    }

    /// Reserve the default size if empty, then commit up to the page-aligned
    /// offset computed by `target`. An implicit reservation is handed back if
    /// anything after it fails.
    fn commit_with(
        &mut self,
        target: impl FnOnce(&Self) -> Result<usize, Error>,
    ) -> Result<(), Error> {
        let implicit = !self.is_reserved();
        if implicit {
            self.reserve(DEFAULT_RESERVE_SIZE)?;
        }
        let result = target(self).and_then(|end| self.commit_through(end));
        if result.is_err() && implicit {
            let _ = self.release();
        }
        result
    }

    fn commit_through(&mut self, end: usize) -> Result<(), Error> {
        debug_assert!(end > self.committed);
        debug_assert!(is_aligned(end, self.page_size));
        if end > self.reserved_size {
            return Err(self.exceeded(end));
        }
        let base = NonNull::new(self.base).ok_or(NOT_RESERVED)?;
        let additional = end - self.committed;
        // SAFETY: committed..end lies inside the reservation; both are page
        // multiples.
        unsafe { self.backend.commit(base, end, additional) }.inspect_err(|_| {
            stat_inc!(commit_failures);
        })?;
        self.committed = end;

        stat_inc!(commit_count);
        stat_add!(commit_bytes, additional);
        vm_trace!(base = ?self.base, committed = end, additional, "commit");
        Ok(())
    }

    #[inline]
    fn exceeded(&self, requested: usize) -> Error {
        Error::CapacityExceeded {
            requested,
            reserved: self.reserved_size,
        }
    }
}

impl<B: Backend> Drop for Arena<B> {
    fn drop(&mut self) {
        if self.is_reserved() {
            let _ = self.release();
        }
    }
}

impl<B: Backend> fmt::Debug for Arena<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("base", &self.base)
            .field("cursor", &self.cursor)
            .field("committed", &self.committed)
            .field("reserved_size", &self.reserved_size)
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}
