//! Compile-time configuration generated by `build.rs` from `vmarena.toml`.
//!
//! - `ALIGNMENT`: granularity of every bump allocation and of the payload
//!   returned by [`crate::header::realloc`].
//! - `DEFAULT_RESERVE_SIZE`: reservation made when an empty arena is asked to
//!   grow without an explicit [`crate::Arena::reserve`].

include!(concat!(env!("OUT_DIR"), "/config_gen.rs"));

const _: () = assert!(ALIGNMENT.is_power_of_two());
const _: () = assert!(DEFAULT_RESERVE_SIZE > 0);
