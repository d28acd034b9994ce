//! Unix virtual memory implementation using mmap/mprotect/madvise/munmap.

use super::Backend;
use crate::align::align_up;
use crate::error::Error;
use crate::sync::SpinOnce;
use core::ffi::{c_int, c_long, c_void};
use core::ptr::NonNull;

const PROT_NONE: c_int = 0x0;
const PROT_READ: c_int = 0x1;
const PROT_WRITE: c_int = 0x2;
const MAP_PRIVATE: c_int = 0x02;
const MAP_FAILED: *mut c_void = !0usize as *mut c_void;
const MADV_DONTNEED: c_int = 4;

cfg_if::cfg_if! {
    if #[cfg(any(target_os = "linux", target_os = "android"))] {
        const MAP_ANONYMOUS: c_int = 0x20;
        const SC_PAGESIZE: Option<c_int> = Some(30);
    } else if #[cfg(target_vendor = "apple")] {
        const MAP_ANONYMOUS: c_int = 0x1000;
        const SC_PAGESIZE: Option<c_int> = Some(29);
    } else if #[cfg(any(target_os = "freebsd", target_os = "dragonfly"))] {
        const MAP_ANONYMOUS: c_int = 0x1000;
        const SC_PAGESIZE: Option<c_int> = Some(47);
    } else {
        const MAP_ANONYMOUS: c_int = 0x1000;
        const SC_PAGESIZE: Option<c_int> = None;
    }
}

/// Used when `sysconf` is unavailable or reports nonsense.
const FALLBACK_PAGE_SIZE: usize = 4096;

unsafe extern "C" {
    fn mmap(
        addr: *mut c_void,
        length: usize,
        prot: c_int,
        flags: c_int,
        fd: c_int,
        offset: c_long,
    ) -> *mut c_void;

    fn mprotect(addr: *mut c_void, length: usize, prot: c_int) -> c_int;

    fn madvise(addr: *mut c_void, length: usize, advice: c_int) -> c_int;

    fn munmap(addr: *mut c_void, length: usize) -> c_int;

    fn sysconf(name: c_int) -> c_long;
}

static PAGE_SIZE: SpinOnce<usize> = SpinOnce::new();

fn query_page_size() -> usize {
    let Some(name) = SC_PAGESIZE else {
        return FALLBACK_PAGE_SIZE;
    };
    let n = unsafe { sysconf(name) };
    if n > 0 && (n as usize).is_power_of_two() {
        n as usize
    } else {
        FALLBACK_PAGE_SIZE
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct VirtualMemory;

unsafe impl Backend for VirtualMemory {
    #[inline]
    fn page_size(&self) -> usize {
        *PAGE_SIZE.get_or_init(query_page_size)
    }

    fn reserve(&self, size: usize) -> Result<NonNull<u8>, Error> {
        let length = align_up(size, self.page_size());
        if length == 0 {
            return Err(Error::ReservationFailed { size });
        }
        let ptr = unsafe {
            mmap(
                core::ptr::null_mut(),
                length,
                PROT_NONE,
                MAP_PRIVATE | MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        if ptr == MAP_FAILED {
            return Err(Error::ReservationFailed { size });
        }
        NonNull::new(ptr as *mut u8).ok_or(Error::ReservationFailed { size })
    }

    unsafe fn commit(
        &self,
        base: NonNull<u8>,
        total_size: usize,
        additional_bytes: usize,
    ) -> Result<(), Error> {
        let addr = unsafe { base.as_ptr().add(total_size - additional_bytes) };
        // The kernel charges the range against overcommit here, so running
        // out of memory is reported as CommitFailed.
        let rc = unsafe { mprotect(addr as *mut c_void, additional_bytes, PROT_READ | PROT_WRITE) };
        if rc == 0 {
            Ok(())
        } else {
            Err(Error::CommitFailed {
                size: additional_bytes,
            })
        }
    }

    unsafe fn decommit(&self, addr: NonNull<u8>, size: usize) -> Result<(), Error> {
        let addr = addr.as_ptr() as *mut c_void;
        // DONTNEED drops the pages; PROT_NONE makes stray access fault.
        let rc = unsafe { madvise(addr, size, MADV_DONTNEED) };
        if rc != 0 || unsafe { mprotect(addr, size, PROT_NONE) } != 0 {
            return Err(Error::DecommitFailed { size });
        }
        Ok(())
    }

    unsafe fn release(&self, base: NonNull<u8>, size: usize) -> Result<(), Error> {
        if unsafe { munmap(base.as_ptr() as *mut c_void, size) } == 0 {
            Ok(())
        } else {
            Err(Error::ReleaseFailed { size })
        }
    }
}
