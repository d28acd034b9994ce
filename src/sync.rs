//! Single-initialization cell for process-wide cached values.
//!
//! We are `no_std`, so `std::sync::OnceLock` is unavailable. `SpinOnce`
//! uses the same test-and-set approach as a spinlock: the first caller runs
//! the initializer while later callers spin until the value is published.

use core::cell::UnsafeCell;
use core::mem::MaybeUninit;
use core::sync::atomic::{AtomicU8, Ordering};

const INCOMPLETE: u8 = 0;
const RUNNING: u8 = 1;
const COMPLETE: u8 = 2;

/// A cell written exactly once, usable in a `static`.
///
/// If the initializer panics the cell stays in the running state and other
/// callers spin forever, so initializers must not panic.
pub struct SpinOnce<T> {
    state: AtomicU8,
    value: UnsafeCell<MaybeUninit<T>>,
}

impl<T> Default for SpinOnce<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SpinOnce<T> {
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(INCOMPLETE),
            value: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }

    /// Returns the value if initialization has completed.
    #[inline]
    pub fn get(&self) -> Option<&T> {
        if self.state.load(Ordering::Acquire) == COMPLETE {
            // SAFETY: COMPLETE is only stored after the value is written.
            Some(unsafe { (*self.value.get()).assume_init_ref() })
        } else {
            None
        }
    }

    /// Returns the value, running `init` first if no caller has yet.
    ///
    /// Exactly one `init` runs even under concurrent first use.
    #[inline]
    pub fn get_or_init(&self, init: impl FnOnce() -> T) -> &T {
        match self.get() {
            Some(v) => v,
            None => self.init_slow(init),
        }
    }

    #[cold]
    fn init_slow(&self, init: impl FnOnce() -> T) -> &T {
        let mut init = Some(init);
        loop {
            match self.state.compare_exchange_weak(
                INCOMPLETE,
                RUNNING,
                Ordering::Acquire,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    if let Some(f) = init.take() {
                        // SAFETY: we hold the RUNNING state; nobody else writes.
                        unsafe { (*self.value.get()).write(f()) };
                    }
                    self.state.store(COMPLETE, Ordering::Release);
                    // SAFETY: just written above.
                    return unsafe { (*self.value.get()).assume_init_ref() };
                }
                Err(COMPLETE) => {
                    // SAFETY: COMPLETE observed with Acquire.
                    return unsafe { (*self.value.get()).assume_init_ref() };
                }
                Err(_) => core::hint::spin_loop(),
            }
        }
    }
}

impl<T> Drop for SpinOnce<T> {
    fn drop(&mut self) {
        if *self.state.get_mut() == COMPLETE {
            unsafe { self.value.get_mut().assume_init_drop() };
        }
    }
}

unsafe impl<T: Send> Send for SpinOnce<T> {}
unsafe impl<T: Send + Sync> Sync for SpinOnce<T> {}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;
    use core::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[test]
    fn test_get_before_init() {
        let once: SpinOnce<usize> = SpinOnce::new();
        assert!(once.get().is_none());
        assert_eq!(*once.get_or_init(|| 4096), 4096);
        assert_eq!(once.get(), Some(&4096));
    }

    #[test]
    fn test_init_runs_once() {
        let once = SpinOnce::new();
        let mut calls = 0;
        once.get_or_init(|| {
            calls += 1;
            7u64
        });
        once.get_or_init(|| {
            calls += 1;
            8u64
        });
        assert_eq!(calls, 1);
        assert_eq!(once.get(), Some(&7));
    }

    #[test]
    fn test_concurrent_first_use() {
        let once = Arc::new(SpinOnce::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let num_threads = 8;

        let handles: Vec<_> = (0..num_threads)
            .map(|_| {
                let once = Arc::clone(&once);
                let calls = Arc::clone(&calls);
                std::thread::spawn(move || {
                    *once.get_or_init(|| {
                        calls.fetch_add(1, Ordering::Relaxed);
                        16384usize
                    })
                })
            })
            .collect();

        for h in handles {
            assert_eq!(h.join().unwrap(), 16384);
        }
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_drop_initialized_value() {
        let marker = Arc::new(());
        {
            let once = SpinOnce::new();
            once.get_or_init(|| Arc::clone(&marker));
            assert_eq!(Arc::strong_count(&marker), 2);
        }
        assert_eq!(Arc::strong_count(&marker), 1);
    }
}
