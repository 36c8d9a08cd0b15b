use core::mem::ManuallyDrop;
use core::ptr;

use crate::{panic_on_precondition_violation, CopyOnDrop};

/// Sorts `v` with insertion sort, the strategy used for types and lengths that don't qualify for
/// anything more sophisticated.
pub fn small_sort_fallback<T, F>(v: &mut [T], is_less: &mut F)
where
    F: FnMut(&T, &T) -> bool,
{
    if v.len() >= 2 {
        insertion_sort_shift_left(v, 1, is_less);
    }
}

/// Sorts range [begin, tail] assuming [begin, tail) is already sorted.
///
/// # Safety
/// begin < tail and p must be valid and initialized for all begin <= p <= tail.
#[cfg_attr(feature = "no_inline_sub_functions", inline(never))]
pub(crate) unsafe fn insert_tail<T, F>(begin: *mut T, tail: *mut T, is_less: &mut F)
where
    F: FnMut(&T, &T) -> bool,
{
    // SAFETY: see individual comments.
    unsafe {
        // SAFETY: in-bounds as tail > begin.
        let mut sift = tail.sub(1);
        if !is_less(&*tail, &*sift) {
            return;
        }

        // SAFETY: after this read tail is never read from again, as we only ever read from sift,
        // sift < tail and we only ever decrease sift. Thus this is effectively a move, not a copy.
        // Should a panic occur, or we have found the correct insertion position, gap_guard
        // ensures the element is moved back into the slice.
        let tmp = ManuallyDrop::new(tail.read());
        let mut gap_guard = CopyOnDrop {
            src: &*tmp,
            dst: tail,
            len: 1,
        };

        loop {
            // SAFETY: we move sift into the gap (which is valid), and point the gap guard
            // destination at sift, ensuring that if a panic occurs the gap is once again filled.
            ptr::copy_nonoverlapping(sift, gap_guard.dst, 1);
            gap_guard.dst = sift;

            if sift == begin {
                break;
            }

            // SAFETY: we checked that sift != begin, thus this is in-bounds.
            sift = sift.sub(1);
            if !is_less(&tmp, &*sift) {
                break;
            }
        }
        // `gap_guard` gets dropped and thus copies `tmp` into the remaining gap.
    }
}

/// Sort `v` assuming `v[..offset]` is already sorted.
///
/// Each element of `v[offset..]` is shifted left until the element before it is not greater, so
/// equal elements never pass each other. Already sorted input costs one comparison per element.
///
/// # Panics
///
/// Panics if `offset == 0` or `offset > v.len()`.
pub fn insertion_sort_shift_left<T, F>(v: &mut [T], offset: usize, is_less: &mut F)
where
    F: FnMut(&T, &T) -> bool,
{
    let len = v.len();
    if offset == 0 || offset > len {
        panic_on_precondition_violation("insertion sort offset must be in 1..=len");
    }

    // SAFETY: see individual comments.
    unsafe {
        // We write this basic loop directly using pointers, as when we use a for loop LLVM likes
        // to unroll this loop which we do not want.
        // SAFETY: v_end is the one-past-end pointer, and we checked that offset <= len, thus tail
        // is also in-bounds.
        let v_base = v.as_mut_ptr();
        let v_end = v_base.add(len);
        let mut tail = v_base.add(offset);
        while tail != v_end {
            // SAFETY: v_base and tail are both valid pointers to elements, and v_base < tail
            // since we checked offset != 0.
            insert_tail(v_base, tail, is_less);

            // SAFETY: we checked that tail is not yet the one-past-end pointer.
            tail = tail.add(1);
        }
    }
}
