//! Windows virtual memory implementation using VirtualAlloc/VirtualFree.

use super::Backend;
use crate::error::Error;
use crate::sync::SpinOnce;
use core::ffi::c_void;
use core::ptr::NonNull;

const MEM_COMMIT: u32 = 0x1000;
const MEM_RESERVE: u32 = 0x2000;
const MEM_DECOMMIT: u32 = 0x4000;
const MEM_RELEASE: u32 = 0x8000;
const PAGE_NOACCESS: u32 = 0x01;
const PAGE_READWRITE: u32 = 0x04;

const FALLBACK_PAGE_SIZE: usize = 4096;

#[repr(C)]
#[allow(dead_code)]
struct SystemInfo {
    processor_architecture: u16,
    reserved: u16,
    page_size: u32,
    minimum_application_address: *mut c_void,
    maximum_application_address: *mut c_void,
    active_processor_mask: usize,
    number_of_processors: u32,
    processor_type: u32,
    allocation_granularity: u32,
    processor_level: u16,
    processor_revision: u16,
}

unsafe extern "system" {
    #[link_name = "VirtualAlloc"]
    fn virtual_alloc(
        lp_address: *mut c_void,
        dw_size: usize,
        fl_allocation_type: u32,
        fl_protect: u32,
    ) -> *mut c_void;

    #[link_name = "VirtualFree"]
    fn virtual_free(lp_address: *mut c_void, dw_size: usize, dw_free_type: u32) -> i32;

    #[link_name = "GetSystemInfo"]
    fn get_system_info(lp_system_info: *mut SystemInfo);
}

static PAGE_SIZE: SpinOnce<usize> = SpinOnce::new();

fn query_page_size() -> usize {
    let mut info = core::mem::MaybeUninit::<SystemInfo>::zeroed();
    unsafe { get_system_info(info.as_mut_ptr()) };
    let page = unsafe { info.assume_init() }.page_size as usize;
    if page.is_power_of_two() {
        page
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
        // Initialize the page size alongside the first reservation.
        let _ = self.page_size();
        if size == 0 {
            return Err(Error::ReservationFailed { size });
        }
        // VirtualAlloc rounds the size up to whole pages itself.
        let ptr =
            unsafe { virtual_alloc(core::ptr::null_mut(), size, MEM_RESERVE, PAGE_NOACCESS) };
        NonNull::new(ptr as *mut u8).ok_or(Error::ReservationFailed { size })
    }

    unsafe fn commit(
        &self,
        base: NonNull<u8>,
        total_size: usize,
        additional_bytes: usize,
    ) -> Result<(), Error> {
        let addr = unsafe { base.as_ptr().add(total_size - additional_bytes) };
        let ptr = unsafe {
            virtual_alloc(
                addr as *mut c_void,
                additional_bytes,
                MEM_COMMIT,
                PAGE_READWRITE,
            )
        };
        if ptr.is_null() {
            Err(Error::CommitFailed {
                size: additional_bytes,
            })
        } else {
            Ok(())
        }
    }

    unsafe fn decommit(&self, addr: NonNull<u8>, size: usize) -> Result<(), Error> {
        // MEM_DECOMMIT accepts ranges mixing committed and uncommitted pages.
        if unsafe { virtual_free(addr.as_ptr() as *mut c_void, size, MEM_DECOMMIT) } != 0 {
            Ok(())
        } else {
            Err(Error::DecommitFailed { size })
        }
    }

    unsafe fn release(&self, base: NonNull<u8>, size: usize) -> Result<(), Error> {
        // MEM_RELEASE requires dwSize = 0 (releases entire allocation)
        if unsafe { virtual_free(base.as_ptr() as *mut c_void, 0, MEM_RELEASE) } != 0 {
            Ok(())
        } else {
            Err(Error::ReleaseFailed { size })
        }
    }
}
