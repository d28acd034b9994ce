//! Self-describing allocations: an [`Arena`] stored in a header right before
//! the bytes handed to the caller.
//!
//! ```text
//! base (page-aligned)        base + header_size::<B>()
//!  |-- Arena<B> --|-- pad --|-- payload ...                    |
//! ```
//!
//! The payload pointer alone is enough to grow or free the allocation, the
//! same way a `realloc`ed pointer is. Because the base never moves, growing
//! always returns the same payload pointer and keeps its contents.

use crate::align::{align_up, is_aligned};
use crate::arena::Arena;
use crate::config::ALIGNMENT;
use crate::error::Error;
use crate::platform::{Backend, OsBackend};
use core::mem::{self, ManuallyDrop};
use core::ptr::NonNull;

/// Distance from the start of the region to the payload.
#[inline]
pub const fn header_size<B: Backend>() -> usize {
    align_up(mem::size_of::<Arena<B>>(), ALIGNMENT)
}

/// `realloc` on the platform backend.
///
/// - `(None, 0)` does nothing and returns `None`.
/// - `(None, n)` reserves a fresh region and returns a payload of at least
///   `n` bytes.
/// - `(Some(p), 0)` releases the region and returns `None`.
/// - `(Some(p), n)` grows the region to hold `n` payload bytes and returns
///   `p` again.
///
/// On error an existing allocation is left untouched and stays valid. New
/// bytes are not guaranteed to be zeroed.
///
/// # Safety
///
/// `data`, when `Some`, must have been returned by this function and not
/// freed since.
pub unsafe fn realloc(
    data: Option<NonNull<u8>>,
    total_size: usize,
) -> Result<Option<NonNull<u8>>, Error> {
    unsafe { realloc_in::<OsBackend>(data, total_size) }
}

/// [`realloc`] on any default-constructible backend.
///
/// # Safety
///
/// `data`, when `Some`, must have been returned by `realloc_in::<B>` and not
/// freed since.
pub unsafe fn realloc_in<B: Backend + Default>(
    data: Option<NonNull<u8>>,
    total_size: usize,
) -> Result<Option<NonNull<u8>>, Error> {
    let Some(data) = data else {
        if total_size == 0 {
            return Ok(None);
        }
        return allocate::<B>(total_size).map(Some);
    };

    let header = unsafe { header_of::<B>(data) };
    if total_size == 0 {
        // The arena lives inside the memory it is about to release, so work
        // on a copy. If release fails the header is still intact.
        let mut arena = ManuallyDrop::new(unsafe { header.as_ptr().read() });
        arena.release()?;
        drop(ManuallyDrop::into_inner(arena));
        return Ok(None);
    }

    let size = region_size::<B>(total_size)?;
    unsafe { (*header.as_ptr()).grow_to(size)? };
    Ok(Some(data))
}

/// Payload bytes currently usable without another commit.
///
/// # Safety
///
/// Same contract as the `data` argument of [`realloc_in`].
pub unsafe fn capacity<B: Backend>(data: NonNull<u8>) -> usize {
    let header = unsafe { header_of::<B>(data) };
    unsafe { header.as_ref() }.committed() - header_size::<B>()
}

/// Recover the arena that owns `data`.
///
/// # Safety
///
/// Same contract as the `data` argument of [`realloc_in`]. The returned
/// pointer is valid until the allocation is freed.
pub unsafe fn header_of<B: Backend>(data: NonNull<u8>) -> NonNull<Arena<B>> {
    debug_assert!(is_aligned(data.as_ptr() as usize, ALIGNMENT));
    // SAFETY: data sits header_size bytes past the start of the region.
    let header = unsafe { data.sub(header_size::<B>()) }.cast::<Arena<B>>();
    debug_assert!(header.as_ptr().is_aligned());
    debug_assert_eq!(
        unsafe { header.as_ref() }.base(),
        header.as_ptr().cast::<u8>()
    );
    header
}

fn region_size<B: Backend>(total_size: usize) -> Result<usize, Error> {
    total_size
        .checked_add(header_size::<B>())
        .ok_or(Error::CapacityExceeded {
            requested: usize::MAX,
            reserved: 0,
        })
}

fn allocate<B: Backend + Default>(total_size: usize) -> Result<NonNull<u8>, Error> {
    let size = region_size::<B>(total_size)?;
    let mut arena = Arena::with_backend(B::default());
    let base = arena.grow_to(size)?;

    let header = base.cast::<Arena<B>>();
    debug_assert!(header.as_ptr().is_aligned());
    // SAFETY: the first `size` bytes at base are committed and the base is
    // page-aligned, which satisfies the arena's alignment. Writing moves the
    // arena into its own region so it is not dropped here.
    unsafe { header.as_ptr().write(arena) };

    let data = unsafe { base.add(header_size::<B>()) };
    debug_assert!(is_aligned(data.as_ptr() as usize, ALIGNMENT));
    Ok(data)
}
