//! Backend operation counters.
//!
//! All counters use `Relaxed` ordering. They are observational only; the
//! arena itself is single-threaded by contract.
//!
//! # Usage
//!
//! ```ignore
//! let snap = vmarena::stats::snapshot();
//! println!("commits: {} ({} bytes)", snap.commit_count, snap.commit_bytes);
//! ```
//!
//! Individual counter loads are atomic but a [`Snapshot`] as a whole is not
//! consistent with concurrent arenas on other threads.

use core::sync::atomic::{AtomicU64, Ordering};

pub(crate) struct Stats {
    /// Successful reservations.
    pub reserve_count: AtomicU64,
    /// Bytes of address space reserved.
    pub reserve_bytes: AtomicU64,
    /// Successful commit calls.
    pub commit_count: AtomicU64,
    /// Bytes committed.
    pub commit_bytes: AtomicU64,
    /// Successful decommit calls.
    pub decommit_count: AtomicU64,
    /// Bytes decommitted.
    pub decommit_bytes: AtomicU64,
    /// Successful releases.
    pub release_count: AtomicU64,
    /// Bytes of address space released.
    pub release_bytes: AtomicU64,
    /// Backend calls that returned an error.
    pub reserve_failures: AtomicU64,
    pub commit_failures: AtomicU64,
    pub decommit_failures: AtomicU64,
    pub release_failures: AtomicU64,
}

impl Stats {
    const fn new() -> Self {
        Self {
            reserve_count: AtomicU64::new(0),
            reserve_bytes: AtomicU64::new(0),
            commit_count: AtomicU64::new(0),
            commit_bytes: AtomicU64::new(0),
            decommit_count: AtomicU64::new(0),
            decommit_bytes: AtomicU64::new(0),
            release_count: AtomicU64::new(0),
            release_bytes: AtomicU64::new(0),
            reserve_failures: AtomicU64::new(0),
            commit_failures: AtomicU64::new(0),
            decommit_failures: AtomicU64::new(0),
            release_failures: AtomicU64::new(0),
        }
    }
}

pub(crate) static STATS: Stats = Stats::new();

/// A point-in-time snapshot of all counters.
#[derive(Clone, Copy, Debug, Default)]
pub struct Snapshot {
    pub reserve_count: u64,
    pub reserve_bytes: u64,
    pub commit_count: u64,
    pub commit_bytes: u64,
    pub decommit_count: u64,
    pub decommit_bytes: u64,
    pub release_count: u64,
    pub release_bytes: u64,
    pub reserve_failures: u64,
    pub commit_failures: u64,
    pub decommit_failures: u64,
    pub release_failures: u64,
}

impl Snapshot {
    /// Bytes currently reserved and not yet released, across all arenas.
    pub fn live_reserved_bytes(&self) -> u64 {
        self.reserve_bytes.saturating_sub(self.release_bytes)
    }
}

/// Load all counters with `Relaxed` ordering and return a [`Snapshot`].
pub fn snapshot() -> Snapshot {
    let s = &STATS;
    Snapshot {
        reserve_count: s.reserve_count.load(Ordering::Relaxed),
        reserve_bytes: s.reserve_bytes.load(Ordering::Relaxed),
        commit_count: s.commit_count.load(Ordering::Relaxed),
        commit_bytes: s.commit_bytes.load(Ordering::Relaxed),
        decommit_count: s.decommit_count.load(Ordering::Relaxed),
        decommit_bytes: s.decommit_bytes.load(Ordering::Relaxed),
        release_count: s.release_count.load(Ordering::Relaxed),
        release_bytes: s.release_bytes.load(Ordering::Relaxed),
        reserve_failures: s.reserve_failures.load(Ordering::Relaxed),
        commit_failures: s.commit_failures.load(Ordering::Relaxed),
        decommit_failures: s.decommit_failures.load(Ordering::Relaxed),
        release_failures: s.release_failures.load(Ordering::Relaxed),
    }
}
