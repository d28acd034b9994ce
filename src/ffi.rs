//! C-ABI exports for linking the arena from C.
//!
//! Gated behind `features = ["ffi"]`. The handle is the plain-pointer
//! [`ArenaInfo`] struct; a zero-initialized one is the empty arena, so C
//! callers never need a constructor. Failures are reported as `false` or a
//! null pointer.

use crate::arena::Arena;
use crate::header;
use crate::platform::OsBackend;
use core::ffi::c_void;
use core::mem::ManuallyDrop;
use core::ptr::{self, NonNull};

/// C view of an [`Arena`] on the platform backend.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct ArenaInfo {
    pub base: *mut u8,
    pub ptr: *mut u8,
    pub end: *mut u8,
    pub reserved_size: usize,
    pub page_size: usize,
}

impl ArenaInfo {
    pub const fn empty() -> Self {
        Self {
            base: ptr::null_mut(),
            ptr: ptr::null_mut(),
            end: ptr::null_mut(),
            reserved_size: 0,
            page_size: 0,
        }
    }
}

impl Default for ArenaInfo {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<&Arena> for ArenaInfo {
    fn from(arena: &Arena) -> Self {
        Self {
            base: arena.base(),
            ptr: arena.cursor(),
            end: arena.committed_end(),
            reserved_size: arena.reserved_size(),
            page_size: arena.page_size(),
        }
    }
}

/// Run `f` on the arena described by `info` and write the result back.
///
/// The arena is never dropped here: the reservation belongs to `info`.
unsafe fn with_arena<R>(info: *mut ArenaInfo, f: impl FnOnce(&mut Arena) -> R) -> Option<R> {
    let info = unsafe { info.as_mut() }?;
    let mut arena = ManuallyDrop::new(if info.base.is_null() {
        Arena::new()
    } else {
        unsafe {
            Arena::from_raw_parts(
                info.base,
                info.ptr as usize - info.base as usize,
                info.end as usize - info.base as usize,
                info.reserved_size,
                info.page_size,
                OsBackend,
            )
        }
    });
    let result = f(&mut arena);
    *info = ArenaInfo::from(&*arena);
    Some(result)
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn vmarena_reserve(info: *mut ArenaInfo, reserve_size: usize) -> bool {
    unsafe { with_arena(info, |a| a.reserve(reserve_size).is_ok()) }.unwrap_or(false)
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn vmarena_commit(info: *mut ArenaInfo, additional_bytes: usize) -> *mut c_void {
    unsafe { with_arena(info, |a| a.grow_commit(additional_bytes).ok()) }
        .flatten()
        .map_or(ptr::null_mut(), |p| p.as_ptr().cast())
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn vmarena_decommit(info: *mut ArenaInfo, trailing_bytes: usize) -> bool {
    unsafe { with_arena(info, |a| a.decommit(trailing_bytes).is_ok()) }.unwrap_or(false)
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn vmarena_reset(info: *mut ArenaInfo) {
    unsafe { with_arena(info, |a| a.reset()) };
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn vmarena_free(info: *mut ArenaInfo) -> bool {
    unsafe { with_arena(info, |a| a.release().is_ok()) }.unwrap_or(false)
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn vmarena_resize(info: *mut ArenaInfo, total_size: usize) -> *mut c_void {
    unsafe { with_arena(info, |a| a.resize(total_size).ok().flatten()) }
        .flatten()
        .map_or(ptr::null_mut(), |p| p.as_ptr().cast())
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn vmarena_realloc(data: *mut c_void, total_size: usize) -> *mut c_void {
    let data = NonNull::new(data.cast::<u8>());
    match unsafe { header::realloc(data, total_size) } {
        Ok(Some(p)) => p.as_ptr().cast(),
        _ => ptr::null_mut(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeroed_info_lifecycle() {
        let mut info = ArenaInfo::default();
        unsafe {
            assert!(vmarena_reserve(&mut info, 1 << 20));
            assert_eq!(info.ptr, info.base);
            assert_eq!(info.end, info.base);

            let p = vmarena_commit(&mut info, 100);
            assert_eq!(p.cast::<u8>(), info.base);
            assert_eq!(info.ptr as usize - info.base as usize, 112);
            assert_eq!(info.end as usize - info.base as usize, info.page_size);

            assert!(vmarena_commit(&mut info, 0).is_null());

            vmarena_reset(&mut info);
            assert_eq!(info.ptr, info.base);
            assert!(vmarena_decommit(&mut info, 1));
            assert_eq!(info.end, info.base);

            assert!(vmarena_free(&mut info));
            assert!(info.base.is_null());
            assert!(!vmarena_free(&mut info));
        }
    }

    #[test]
    fn test_null_info() {
        unsafe {
            assert!(!vmarena_reserve(ptr::null_mut(), 4096));
            assert!(vmarena_commit(ptr::null_mut(), 16).is_null());
            vmarena_reset(ptr::null_mut());
        }
    }

    #[test]
    fn test_resize_and_realloc() {
        let mut info = ArenaInfo::default();
        unsafe {
            let base = vmarena_resize(&mut info, 5000);
            assert_eq!(base.cast::<u8>(), info.base);
            assert_eq!(info.ptr, info.end);
            assert!(vmarena_resize(&mut info, 0).is_null());
            assert!(info.base.is_null());

            let p = vmarena_realloc(ptr::null_mut(), 256);
            assert!(!p.is_null());
            let q = vmarena_realloc(p, 512);
            assert_eq!(p, q);
            assert!(vmarena_realloc(q, 0).is_null());
        }
    }
}
