//! Error type shared by the arena, the self-describing allocation and the
//! platform backends.

use core::fmt;

/// Errors that can occur during arena operations.
///
/// No operation retries on failure, and a failed call leaves the arena
/// exactly as it was before the call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
    /// The OS declined to reserve address space.
    ReservationFailed {
        /// Number of bytes requested.
        size: usize,
    },
    /// The OS declined to back pages with physical memory.
    CommitFailed {
        /// Number of bytes that were being committed.
        size: usize,
    },
    /// The OS rejected a decommit range.
    DecommitFailed {
        /// Number of bytes that were being decommitted.
        size: usize,
    },
    /// The OS declined to release a reservation. The arena keeps its
    /// reservation, so the caller must handle the leak.
    ReleaseFailed {
        /// Size of the reservation.
        size: usize,
    },
    /// Growth would run past the end of the reservation.
    CapacityExceeded {
        /// Committed size (from base) the request needed.
        requested: usize,
        /// Size of the reservation.
        reserved: usize,
    },
    /// The request is malformed for the arena's current state.
    InvalidArgument {
        /// What was wrong with the request.
        reason: &'static str,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReservationFailed { size } => {
                write!(f, "failed to reserve {size} bytes of address space")
            }
            Self::CommitFailed { size } => write!(f, "failed to commit {size} bytes"),
            Self::DecommitFailed { size } => write!(f, "failed to decommit {size} bytes"),
            Self::ReleaseFailed { size } => {
                write!(f, "failed to release reservation of {size} bytes")
            }
            Self::CapacityExceeded {
                requested,
                reserved,
            } => {
                write!(
                    f,
                    "reservation exceeded: requested {requested} bytes, reserved {reserved} bytes"
                )
            }
            Self::InvalidArgument { reason } => write!(f, "invalid argument: {reason}"),
        }
    }
}

impl core::error::Error for Error {}
