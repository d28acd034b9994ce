//! Power-of-two rounding helpers shared by the arena and the backends.

/// Round `size` up to the next multiple of `align` (must be a power of 2).
///
/// Wraps on overflow; use [`checked_align_up`] for caller-supplied sizes.
#[inline]
pub const fn align_up(size: usize, align: usize) -> usize {
    debug_assert!(align.is_power_of_two());
    size.wrapping_add(align - 1) & !(align - 1)
}

/// Round `size` up to the next multiple of `align`, or `None` on overflow.
#[inline]
pub const fn checked_align_up(size: usize, align: usize) -> Option<usize> {
    debug_assert!(align.is_power_of_two());
    match size.checked_add(align - 1) {
        Some(n) => Some(n & !(align - 1)),
        None => None,
    }
}

/// Round `size` down to a multiple of `align`.
#[inline]
pub const fn align_down(size: usize, align: usize) -> usize {
    debug_assert!(align.is_power_of_two());
    size & !(align - 1)
}

#[inline]
pub const fn is_aligned(size: usize, align: usize) -> bool {
    debug_assert!(align.is_power_of_two());
    size & (align - 1) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(0, 16), 0);
        assert_eq!(align_up(1, 16), 16);
        assert_eq!(align_up(16, 16), 16);
        assert_eq!(align_up(17, 16), 32);
        assert_eq!(align_up(4097, 4096), 8192);
    }

    #[test]
    fn test_checked_align_up_overflow() {
        assert_eq!(checked_align_up(100, 16), Some(112));
        assert_eq!(checked_align_up(usize::MAX, 16), None);
        assert_eq!(checked_align_up(usize::MAX - 4, 4096), None);
    }

    #[test]
    fn test_align_down() {
        assert_eq!(align_down(0, 4096), 0);
        assert_eq!(align_down(4095, 4096), 0);
        assert_eq!(align_down(8193, 4096), 8192);
    }

    #[test]
    fn test_is_aligned() {
        assert!(is_aligned(0, 16));
        assert!(is_aligned(48, 16));
        assert!(!is_aligned(40, 16));
    }
}
