//! Fixed sorting-networks and the unstable small-sort built on them.
//!
//! The networks are made of [`swap_if_less`] only, which swaps two elements if the second is less
//! than the first. Because they compare and exchange non-adjacent positions they are *not* stable:
//! equal elements may come out in a different relative order. Inputs consisting only of equal
//! elements are left untouched.

use core::mem::{ManuallyDrop, MaybeUninit};
use core::ptr;

use crate::insertion::insertion_sort_shift_left;
use crate::panic_on_precondition_violation;
use crate::policy::SMALL_SORT_NETWORK_SCRATCH_LEN;
use crate::stable::bidirectional_merge;

/// Sorts `v` with the 9 and 13 element sorting-networks, insertion sort and a final merge.
///
/// Unstable. Tuned to be efficient for integer like types.
///
/// # Panics
///
/// Panics if `v.len()` exceeds [`SMALL_SORT_NETWORK_SCRATCH_LEN`].
pub fn small_sort_network<T, F>(v: &mut [T], is_less: &mut F)
where
    T: Copy,
    F: FnMut(&T, &T) -> bool,
{
    // SAFETY: T is Copy, comparing temporary copies of it can't be observed in a way that leaks
    // or double frees anything.
    unsafe { small_sort_network_unchecked(v, is_less) }
}

/// Like [`small_sort_network`], but for any `T`.
///
/// # Safety
/// T must be observation safe, i.e. comparing a bitwise copy of a value that is later discarded
/// must not be observable. Types with interior mutability don't qualify.
pub unsafe fn small_sort_network_unchecked<T, F>(v: &mut [T], is_less: &mut F)
where
    F: FnMut(&T, &T) -> bool,
{
    let len = v.len();
    if len < 2 {
        return;
    }

    if len > SMALL_SORT_NETWORK_SCRATCH_LEN {
        panic_on_precondition_violation("network small-sort len exceeds scratch len");
    }

    // Below 18 the two halves would be too short to use the 9 element network.
    let len_div_2 = len / 2;
    let no_merge = len < 18;

    let v_base = v.as_mut_ptr();
    let initial_region_len = if no_merge { len } else { len_div_2 };

    // SAFETY: Both possible values of `initial_region_len` are in-bounds.
    presort_region(
        unsafe { &mut *ptr::slice_from_raw_parts_mut(v_base, initial_region_len) },
        is_less,
    );

    if no_merge {
        return;
    }

    // SAFETY: The right side of `v` based on `len_div_2` is guaranteed in-bounds.
    presort_region(
        unsafe { &mut *ptr::slice_from_raw_parts_mut(v_base.add(len_div_2), len - len_div_2) },
        is_less,
    );

    let mut stack_array = MaybeUninit::<[T; SMALL_SORT_NETWORK_SCRATCH_LEN]>::uninit();
    let scratch_base = stack_array.as_mut_ptr() as *mut T;

    // SAFETY: The caller guarantees T is observation safe. Should is_less panic v was not
    // modified by the merge and retains its previous content. scratch and v do not alias and
    // scratch has room for v.len() elements.
    unsafe {
        bidirectional_merge(&*ptr::slice_from_raw_parts(v_base, len), scratch_base, is_less);
        ptr::copy_nonoverlapping(scratch_base, v_base, len);
    }
}

/// Sorts one region of at most 17 elements, with the largest network that fits as head start.
fn presort_region<T, F>(region: &mut [T], is_less: &mut F)
where
    F: FnMut(&T, &T) -> bool,
{
    let presorted_len = if region.len() >= 13 {
        sort13_optimal(&mut region[..13], is_less);
        13
    } else if region.len() >= 9 {
        sort9_optimal(&mut region[..9], is_less);
        9
    } else {
        1
    };

    insertion_sort_shift_left(region, presorted_len, is_less);
}

#[inline(always)]
unsafe fn branchless_swap<T>(left: *mut T, right: *mut T, should_swap: bool) {
    // Select the sources first, then copy unconditionally, so no branch depends on the
    // comparison result.
    let left_swap = if should_swap { right } else { left };
    let right_swap = if should_swap { left } else { right };

    // SAFETY: the caller guarantees `left` and `right` are valid, aligned and distinct. The
    // temporary is a bitwise copy that is never dropped.
    unsafe {
        let right_swap_tmp = ManuallyDrop::new(ptr::read(right_swap));
        ptr::copy(left_swap, left, 1);
        ptr::copy_nonoverlapping(&*right_swap_tmp, right, 1);
    }
}

/// Swap two values in the slice pointed to by `v_base` at the position `a_pos` and `b_pos` if the
/// value at position `b_pos` is less than the one at position `a_pos`.
///
/// # Safety
/// `a_pos` and `b_pos` must be distinct and each added to `v_base` yield valid pointers into the
/// same allocation.
pub unsafe fn swap_if_less<T, F>(v_base: *mut T, a_pos: usize, b_pos: usize, is_less: &mut F)
where
    F: FnMut(&T, &T) -> bool,
{
    // SAFETY: see function level safety comment.
    unsafe {
        let v_a = v_base.add(a_pos);
        let v_b = v_base.add(b_pos);

        // The comparison happens before anything moves, a panicking is_less leaves v as is.
        // Equal elements are never swapped.
        let should_swap = is_less(&*v_b, &*v_a);
        branchless_swap(v_a, v_b, should_swap);
    }
}

/// Sorts exactly 9 elements with an optimal sorting-network of 25 comparators.
///
/// # Panics
///
/// Panics if `v.len() != 9`.
#[inline(never)]
pub fn sort9_optimal<T, F>(v: &mut [T], is_less: &mut F)
where
    F: FnMut(&T, &T) -> bool,
{
    if v.len() != 9 {
        panic_on_precondition_violation("sort9_optimal requires exactly 9 elements");
    }

    let v_base = v.as_mut_ptr();

    // SAFETY: We checked the len, every index below is in bounds.
    unsafe {
        swap_if_less(v_base, 0, 3, is_less);
        swap_if_less(v_base, 1, 7, is_less);
        swap_if_less(v_base, 2, 5, is_less);
        swap_if_less(v_base, 4, 8, is_less);
        swap_if_less(v_base, 0, 7, is_less);
        swap_if_less(v_base, 2, 4, is_less);
        swap_if_less(v_base, 3, 8, is_less);
        swap_if_less(v_base, 5, 6, is_less);
        swap_if_less(v_base, 0, 2, is_less);
        swap_if_less(v_base, 1, 3, is_less);
        swap_if_less(v_base, 4, 5, is_less);
        swap_if_less(v_base, 7, 8, is_less);
        swap_if_less(v_base, 1, 4, is_less);
        swap_if_less(v_base, 3, 6, is_less);
        swap_if_less(v_base, 5, 7, is_less);
        swap_if_less(v_base, 0, 1, is_less);
        swap_if_less(v_base, 2, 4, is_less);
        swap_if_less(v_base, 3, 5, is_less);
        swap_if_less(v_base, 6, 8, is_less);
        swap_if_less(v_base, 2, 3, is_less);
        swap_if_less(v_base, 4, 5, is_less);
        swap_if_less(v_base, 6, 7, is_less);
        swap_if_less(v_base, 1, 2, is_less);
        swap_if_less(v_base, 3, 4, is_less);
        swap_if_less(v_base, 5, 6, is_less);
    }
}

/// Sorts exactly 13 elements with an optimal sorting-network of 45 comparators.
///
/// # Panics
///
/// Panics if `v.len() != 13`.
#[inline(never)]
pub fn sort13_optimal<T, F>(v: &mut [T], is_less: &mut F)
where
    F: FnMut(&T, &T) -> bool,
{
    if v.len() != 13 {
        panic_on_precondition_violation("sort13_optimal requires exactly 13 elements");
    }

    let v_base = v.as_mut_ptr();

    // SAFETY: We checked the len, every index below is in bounds.
    unsafe {
        swap_if_less(v_base, 0, 12, is_less);
        swap_if_less(v_base, 1, 10, is_less);
        swap_if_less(v_base, 2, 9, is_less);
        swap_if_less(v_base, 3, 7, is_less);
        swap_if_less(v_base, 5, 11, is_less);
        swap_if_less(v_base, 6, 8, is_less);
        swap_if_less(v_base, 1, 6, is_less);
        swap_if_less(v_base, 2, 3, is_less);
        swap_if_less(v_base, 4, 11, is_less);
        swap_if_less(v_base, 7, 9, is_less);
        swap_if_less(v_base, 8, 10, is_less);
        swap_if_less(v_base, 0, 4, is_less);
        swap_if_less(v_base, 1, 2, is_less);
        swap_if_less(v_base, 3, 6, is_less);
        swap_if_less(v_base, 7, 8, is_less);
        swap_if_less(v_base, 9, 10, is_less);
        swap_if_less(v_base, 11, 12, is_less);
        swap_if_less(v_base, 4, 6, is_less);
        swap_if_less(v_base, 5, 9, is_less);
        swap_if_less(v_base, 8, 11, is_less);
        swap_if_less(v_base, 10, 12, is_less);
        swap_if_less(v_base, 0, 5, is_less);
        swap_if_less(v_base, 3, 8, is_less);
        swap_if_less(v_base, 4, 7, is_less);
        swap_if_less(v_base, 6, 11, is_less);
        swap_if_less(v_base, 9, 10, is_less);
        swap_if_less(v_base, 0, 1, is_less);
        swap_if_less(v_base, 2, 5, is_less);
        swap_if_less(v_base, 6, 9, is_less);
        swap_if_less(v_base, 7, 8, is_less);
        swap_if_less(v_base, 10, 11, is_less);
        swap_if_less(v_base, 1, 3, is_less);
        swap_if_less(v_base, 2, 4, is_less);
        swap_if_less(v_base, 5, 6, is_less);
        swap_if_less(v_base, 9, 10, is_less);
        swap_if_less(v_base, 1, 2, is_less);
        swap_if_less(v_base, 3, 4, is_less);
        swap_if_less(v_base, 5, 7, is_less);
        swap_if_less(v_base, 6, 8, is_less);
        swap_if_less(v_base, 2, 3, is_less);
        swap_if_less(v_base, 4, 5, is_less);
        swap_if_less(v_base, 6, 7, is_less);
        swap_if_less(v_base, 8, 9, is_less);
        swap_if_less(v_base, 3, 4, is_less);
        swap_if_less(v_base, 5, 6, is_less);
    }
}
