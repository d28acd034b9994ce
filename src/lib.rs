#![no_std]

//! vmarena: a virtual-memory-backed arena allocator.
//!
//! An [`Arena`] reserves a large contiguous address range up front and
//! commits physical pages only as it grows, so its base address never moves.
//! Two ways to use it:
//! - hold an [`Arena`] and bump-allocate with [`Arena::grow_commit`], or
//!   grow it to a capacity with [`Arena::resize`];
//! - use [`header::realloc`], which stores the arena in a header in front
//!   of the returned pointer so that pointer alone can be resized or freed.
//!
//! The OS primitives sit behind the [`platform::Backend`] trait; the
//! implementation for the build target is [`platform::OsBackend`].
//!
//! # Usage
//!
//! ```no_run
//! let mut arena = vmarena::Arena::new();
//! arena.reserve(1 << 20)?;
//! let a = arena.grow_commit(100)?;
//! let b = arena.grow_commit(100)?;
//! assert_eq!(b.as_ptr() as usize - a.as_ptr() as usize, 112);
//! arena.reset();
//! arena.release()?;
//! # Ok::<(), vmarena::Error>(())
//! ```

extern crate alloc;
#[cfg(test)]
extern crate std;

mod macros;

pub mod align;
pub mod arena;
pub mod config;
pub mod error;
#[cfg(feature = "ffi")]
pub mod ffi;
pub mod header;
pub mod platform;
#[cfg(feature = "stats")]
pub mod stats;
pub mod sync;

pub use arena::Arena;
pub use config::{ALIGNMENT, DEFAULT_RESERVE_SIZE};
pub use error::Error;
pub use platform::{Backend, HeapBackend, OsBackend};
