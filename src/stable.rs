//! Stable building blocks and the general small-sort that uses scratch space.

use core::mem::{self, MaybeUninit};
use core::ptr;

use crate::insertion::insert_tail;
use crate::policy::SMALL_SORT_GENERAL_SCRATCH_LEN;
use crate::{panic_on_ord_violation, panic_on_precondition_violation, CopyOnDrop};

/// Stable small-sort for up to [`crate::policy::SMALL_SORT_GENERAL_THRESHOLD`] elements, using a
/// stack allocated scratch buffer.
pub fn small_sort_general<T, F>(v: &mut [T], is_less: &mut F)
where
    T: Copy,
    F: FnMut(&T, &T) -> bool,
{
    // SAFETY: T is Copy, comparing temporary copies of it can't be observed in a way that leaks
    // or double frees anything.
    unsafe { small_sort_general_unchecked(v, is_less) }
}

/// Stable small-sort using the caller provided `scratch`, which must hold at least
/// `v.len() + 16` elements.
///
/// # Panics
///
/// Panics if `scratch` is too short.
pub fn small_sort_general_with_scratch<T, F>(
    v: &mut [T],
    scratch: &mut [MaybeUninit<T>],
    is_less: &mut F,
) where
    T: Copy,
    F: FnMut(&T, &T) -> bool,
{
    // SAFETY: See `small_sort_general`.
    unsafe { small_sort_general_with_scratch_unchecked(v, scratch, is_less) }
}

/// Like [`small_sort_general`], but for any `T`.
///
/// # Safety
/// T must be observation safe, i.e. comparing a bitwise copy of a value that is later discarded
/// must not be observable. Types with interior mutability don't qualify.
pub unsafe fn small_sort_general_unchecked<T, F>(v: &mut [T], is_less: &mut F)
where
    F: FnMut(&T, &T) -> bool,
{
    let mut stack_array = MaybeUninit::<[T; SMALL_SORT_GENERAL_SCRATCH_LEN]>::uninit();

    // SAFETY: The memory is backed by `stack_array`, and the operation is safe as long as the len
    // is the same.
    let scratch = unsafe {
        &mut *ptr::slice_from_raw_parts_mut(
            stack_array.as_mut_ptr() as *mut MaybeUninit<T>,
            SMALL_SORT_GENERAL_SCRATCH_LEN,
        )
    };

    // SAFETY: forwarded to the caller.
    unsafe { small_sort_general_with_scratch_unchecked(v, scratch, is_less) }
}

/// Like [`small_sort_general_with_scratch`], but for any `T`.
///
/// # Safety
/// See [`small_sort_general_unchecked`].
pub unsafe fn small_sort_general_with_scratch_unchecked<T, F>(
    v: &mut [T],
    scratch: &mut [MaybeUninit<T>],
    is_less: &mut F,
) where
    F: FnMut(&T, &T) -> bool,
{
    let len = v.len();
    if len < 2 {
        return;
    }

    if scratch.len() < len + 16 {
        panic_on_precondition_violation("general small-sort scratch must hold len + 16 elements");
    }

    let v_base = v.as_mut_ptr();
    let len_div_2 = len / 2;

    // SAFETY: See individual comments.
    unsafe {
        let scratch_base = scratch.as_mut_ptr() as *mut T;

        let presorted_len = if mem::size_of::<T>() <= 16 && len >= 16 {
            // SAFETY: scratch_base is valid and has enough space. The temporary scratch space of
            // sort8_stable lives past the end of the halves, which is why scratch needs len + 16.
            sort8_stable(v_base, scratch_base, scratch_base.add(len), is_less);
            sort8_stable(
                v_base.add(len_div_2),
                scratch_base.add(len_div_2),
                scratch_base.add(len + 8),
                is_less,
            );

            8
        } else if len >= 8 {
            // SAFETY: scratch_base is valid and has enough space.
            sort4_stable(v_base, scratch_base, is_less);
            sort4_stable(v_base.add(len_div_2), scratch_base.add(len_div_2), is_less);

            4
        } else {
            ptr::copy_nonoverlapping(v_base, scratch_base, 1);
            ptr::copy_nonoverlapping(v_base.add(len_div_2), scratch_base.add(len_div_2), 1);

            1
        };

        for offset in [0, len_div_2] {
            // SAFETY: at this point dst is initialized with presorted_len elements. We extend
            // this to desired_len, src is valid for desired_len elements.
            let src = v_base.add(offset);
            let dst = scratch_base.add(offset);
            let desired_len = if offset == 0 {
                len_div_2
            } else {
                len - len_div_2
            };

            for i in presorted_len..desired_len {
                ptr::copy_nonoverlapping(src.add(i), dst.add(i), 1);
                insert_tail(dst, dst.add(i), is_less);
            }
        }

        // Restores v from the fully initialized scratch should the merge panic.
        let drop_guard = CopyOnDrop {
            src: scratch_base,
            dst: v_base,
            len,
        };

        // SAFETY: scratch[..len] holds both sorted halves, v is only a destination now.
        bidirectional_merge(
            &*ptr::slice_from_raw_parts(drop_guard.src, drop_guard.len),
            drop_guard.dst,
            is_less,
        );
        mem::forget(drop_guard);
    }
}

/// Stable 4 element sort of `src` into `dst` with exactly 5 comparisons.
///
/// `src` is only read.
///
/// # Panics
///
/// Panics if `src` or `dst` are not exactly 4 elements long.
pub fn sort4_stable_into<T, F>(src: &[T], dst: &mut [T], is_less: &mut F)
where
    T: Copy,
    F: FnMut(&T, &T) -> bool,
{
    if src.len() != 4 || dst.len() != 4 {
        panic_on_precondition_violation("sort4_stable reads and writes exactly 4 elements");
    }

    // SAFETY: We checked the lens, src and dst can't overlap as dst is borrowed mutably. T is Copy,
    // so the copies written to dst can coexist with src.
    unsafe { sort4_stable(src.as_ptr(), dst.as_mut_ptr(), is_less) };
}

/// Raw pointer form of [`sort4_stable_into`], also used on scratch memory.
///
/// # Safety
/// `v_base` is valid for 4 reads and `dst` for 4 writes. `dst[0..4]` receives bitwise copies, for
/// non-`Copy` types ownership moves there.
///
/// # Panics
///
/// Panics if `v_base[0..4]` and `dst[0..4]` overlap.
#[cfg_attr(feature = "no_inline_sub_functions", inline(never))]
pub unsafe fn sort4_stable<T, F>(v_base: *const T, dst: *mut T, is_less: &mut F)
where
    F: FnMut(&T, &T) -> bool,
{
    let span = 4 * mem::size_of::<T>();
    let (src_addr, dst_addr) = (v_base as usize, dst as usize);
    if src_addr < dst_addr + span && dst_addr < src_addr + span {
        panic_on_precondition_violation("sort4_stable source and destination overlap");
    }

    // Only pointers are selected, each element is copied to dst exactly once at the end.

    // SAFETY: offsets stay within 0..4 of v_base and dst.
    unsafe {
        // Order the pairs (0, 1) and (2, 3), ties keep their position.
        let c1 = is_less(&*v_base.add(1), &*v_base);
        let c2 = is_less(&*v_base.add(3), &*v_base.add(2));
        let a = v_base.add(c1 as usize);
        let b = v_base.add(!c1 as usize);
        let c = v_base.add(2 + c2 as usize);
        let d = v_base.add(2 + (!c2 as usize));

        // The pair minimums decide min, the pair maximums decide max. The two middle elements
        // are named by original position so the last comparison can break ties left first.
        let c3 = is_less(&*c, &*a);
        let c4 = is_less(&*d, &*b);
        let min = select(c3, c, a);
        let max = select(c4, b, d);
        let mid_left = select(c3, a, select(c4, c, b));
        let mid_right = select(c4, d, select(c3, b, c));

        let c5 = is_less(&*mid_right, &*mid_left);
        let lo = select(c5, mid_right, mid_left);
        let hi = select(c5, mid_left, mid_right);

        ptr::copy_nonoverlapping(min, dst, 1);
        ptr::copy_nonoverlapping(lo, dst.add(1), 1);
        ptr::copy_nonoverlapping(hi, dst.add(2), 1);
        ptr::copy_nonoverlapping(max, dst.add(3), 1);
    }

    #[inline(always)]
    fn select<T>(cond: bool, if_true: *const T, if_false: *const T) -> *const T {
        if cond {
            if_true
        } else {
            if_false
        }
    }
}

/// Two stable 4-sorts into `scratch_base`, merged into `dst[0..8]`.
///
/// # Safety
/// `v_base` is valid for 8 reads, `scratch_base` and `dst` for 8 writes each, none overlap. T must
/// be observation safe.
#[cfg_attr(feature = "no_inline_sub_functions", inline(never))]
unsafe fn sort8_stable<T, F>(v_base: *mut T, dst: *mut T, scratch_base: *mut T, is_less: &mut F)
where
    F: FnMut(&T, &T) -> bool,
{
    // SAFETY: see function level safety comment.
    unsafe {
        sort4_stable(v_base, scratch_base, is_less);
        sort4_stable(v_base.add(4), scratch_base.add(4), is_less);
    }

    // SAFETY: scratch_base[0..8] holds two sorted runs of 4.
    unsafe {
        bidirectional_merge(&*ptr::slice_from_raw_parts(scratch_base, 8), dst, is_less);
    }
}

#[inline(always)]
unsafe fn merge_up<T, F>(
    mut left_src: *const T,
    mut right_src: *const T,
    mut dst: *mut T,
    is_less: &mut F,
) -> (*const T, *const T, *mut T)
where
    F: FnMut(&T, &T) -> bool,
{
    // Writes the smaller head to dst, the left head on ties. Both cursors advance by a
    // computed amount so the selection compiles to conditional moves.

    // SAFETY: `left_src`, `right_src` are readable and `dst` writable, none of them alias.
    unsafe {
        let is_l = !is_less(&*right_src, &*left_src);
        let src = if is_l { left_src } else { right_src };
        ptr::copy_nonoverlapping(src, dst, 1);
        right_src = right_src.wrapping_add(!is_l as usize);
        left_src = left_src.wrapping_add(is_l as usize);
        dst = dst.add(1);
    }

    (left_src, right_src, dst)
}

#[inline(always)]
unsafe fn merge_down<T, F>(
    mut left_src: *const T,
    mut right_src: *const T,
    mut dst: *mut T,
    is_less: &mut F,
) -> (*const T, *const T, *mut T)
where
    F: FnMut(&T, &T) -> bool,
{
    // Mirror of merge_up: writes the larger tail to dst, the right tail on ties, and moves the
    // cursors down.

    // SAFETY: `left_src`, `right_src` are readable and `dst` writable, none of them alias.
    unsafe {
        let is_l = !is_less(&*right_src, &*left_src);
        let src = if is_l { right_src } else { left_src };
        ptr::copy_nonoverlapping(src, dst, 1);
        right_src = right_src.wrapping_sub(is_l as usize);
        left_src = left_src.wrapping_sub(!is_l as usize);
        dst = dst.wrapping_sub(1);
    }

    (left_src, right_src, dst)
}

/// Merges the sorted runs `v[..len / 2]` and `v[len / 2..]` into `dst`, filling it from the
/// front and the back at the same time. For odd lengths the right run is one longer and the
/// element left over after the loop fills the middle slot.
///
/// # Safety
/// `dst` is valid for `v.len()` writes and doesn't alias `v`, `v.len() >= 2`. T must be
/// observation safe: comparisons run on elements of `v` that `dst` may end up not holding.
#[cfg_attr(feature = "no_inline_sub_functions", inline(never))]
pub(crate) unsafe fn bidirectional_merge<T, F>(v: &[T], dst: *mut T, is_less: &mut F)
where
    F: FnMut(&T, &T) -> bool,
{
    // Each iteration writes one element at the front cursor and one at the back cursor. With a
    // strict weak order the forward and backward cursors of each run meet exactly once all
    // elements are written.

    let len = v.len();
    let src = v.as_ptr();

    let len_div_2 = len / 2;

    // SAFETY: each iteration moves exactly one read cursor per direction, so for any comparison
    // results the reads stay inside `v` and the writes inside `dst[..len]`.
    unsafe {
        let mut left = src;
        let mut right = src.add(len_div_2);
        let mut dst = dst;

        let mut left_rev = src.add(len_div_2 - 1);
        let mut right_rev = src.add(len - 1);
        let mut dst_rev = dst.add(len - 1);

        for _ in 0..len_div_2 {
            (left, right, dst) = merge_up(left, right, dst, is_less);
            (left_rev, right_rev, dst_rev) = merge_down(left_rev, right_rev, dst_rev, is_less);
        }

        let left_end = left_rev.wrapping_add(1);
        let right_end = right_rev.wrapping_add(1);

        // Odd length, so one element is left unconsumed in the input.
        if len % 2 != 0 {
            let left_nonempty = left < left_end;
            let last_src = if left_nonempty { left } else { right };
            ptr::copy_nonoverlapping(last_src, dst, 1);
            left = left.wrapping_add(left_nonempty as usize);
            right = right.wrapping_add((!left_nonempty) as usize);
        }

        // Cursors that didn't meet mean the comparison function is not a strict weak order, dst
        // may then hold duplicates and is never handed back.
        if left != left_end || right != right_end {
            panic_on_ord_violation();
        }
    }
}
