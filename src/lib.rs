//! Small-sort kernel for hybrid comparison sorts.
//!
//! These are the leaf routines a recursive sort driver calls once a sub-slice is short enough,
//! at most [`policy::SMALL_SORT_GENERAL_THRESHOLD`] elements. Everything is expressed in terms of
//! an `is_less` function that must implement a strict weak ordering.
//!
//! - [`insertion`] extends an already sorted prefix, stable.
//! - [`network`] fixed 9 and 13 element sorting-networks and the unstable network small-sort.
//! - [`stable`] the 4 element stable sort and the general small-sort that uses scratch space.
//! - [`policy`] thresholds and the choice of strategy per length and element type class.

use core::ptr;

pub mod insertion;
pub mod network;
pub mod policy;
pub mod stable;

pub use insertion::{insertion_sort_shift_left, small_sort_fallback};
pub use network::{
    small_sort_network, small_sort_network_unchecked, sort13_optimal, sort9_optimal,
};
pub use policy::{
    general_sort_threshold, stable_small_sort, stable_small_sort_by, stable_small_sort_unchecked,
    unstable_small_sort, unstable_small_sort_by, unstable_small_sort_unchecked, Strategy,
    TypeClass,
};
pub use stable::{
    small_sort_general, small_sort_general_unchecked, small_sort_general_with_scratch,
    small_sort_general_with_scratch_unchecked, sort4_stable_into,
};

/// Copies `len` elements from `src` to `dst` when dropped.
///
/// Used to restore a slice to a permutation of its input should the user-provided comparison
/// function panic halfway through an operation that temporarily holds elements elsewhere.
pub(crate) struct CopyOnDrop<T> {
    pub(crate) src: *const T,
    pub(crate) dst: *mut T,
    pub(crate) len: usize,
}

impl<T> Drop for CopyOnDrop<T> {
    fn drop(&mut self) {
        // SAFETY: `src` must contain `len` initialized elements, and dst must
        // be valid to write `len` elements.
        unsafe {
            ptr::copy_nonoverlapping(self.src, self.dst, self.len);
        }
    }
}

/// Heuristic for types that can be swapped in registers without a detour through memory.
#[must_use]
pub(crate) const fn has_efficient_in_place_swap<T>() -> bool {
    core::mem::size_of::<T>() <= core::mem::size_of::<u64>()
}

#[cold]
#[inline(never)]
fn panic_on_ord_violation() -> ! {
    // This is indicative of a logic bug in the user-provided comparison function or Ord
    // implementation. If a strict weak ordering is not given, comparison based sorting cannot
    // yield a sorted result. E.g.: a < b < c < a
    panic!("user-provided comparison function does not correctly implement a total order");
}

#[cold]
#[inline(never)]
#[track_caller]
fn panic_on_precondition_violation(msg: &str) -> ! {
    // Continuing would silently produce a wrongly sorted slice, so the caller gets to know.
    panic!("small-sort precondition violated: {msg}");
}

#[test]
fn type_info() {
    assert!(has_efficient_in_place_swap::<i32>());
    assert!(has_efficient_in_place_swap::<u64>());
    assert!(has_efficient_in_place_swap::<(u32, u32)>());
    assert!(!has_efficient_in_place_swap::<u128>());
    assert!(!has_efficient_in_place_swap::<String>());
}
