//! Thresholds and the choice of small-sort strategy.
//!
//! It's important to differentiate between small-sort performance for small slices and small-sort
//! performance sorting small sub-slices as part of the main loop of a sort driver. For the former
//! cold CPU state is the representative benchmark, for the latter the same code is called many
//! times and hot benchmarks are fine. These routines target the latter.

use core::cmp::Ordering;
use core::mem;

use crate::{has_efficient_in_place_swap, panic_on_precondition_violation};
use crate::insertion::small_sort_fallback;
use crate::network::{small_sort_network, small_sort_network_unchecked};
use crate::stable::{small_sort_general, small_sort_general_unchecked};

/// Optimal number of comparisons, and good perf.
pub const SMALL_SORT_FALLBACK_THRESHOLD: usize = 16;

/// From a comparison perspective 20 was ~2% more efficient for fully random input, but for
/// wall-clock performance choosing 32 yielded better performance overall.
///
/// If you change this value, you have to adjust [`crate::stable::small_sort_general`] !
pub const SMALL_SORT_GENERAL_THRESHOLD: usize = 32;

/// The general small-sort uses `sort8_stable` as primitive, which needs 8 elements of temporary
/// space per half past the end of the presorted halves.
pub const SMALL_SORT_GENERAL_SCRATCH_LEN: usize = SMALL_SORT_GENERAL_THRESHOLD + 16;

/// If you change this value, you have to adjust [`crate::network::small_sort_network`] !
pub const SMALL_SORT_NETWORK_THRESHOLD: usize = 32;
pub const SMALL_SORT_NETWORK_SCRATCH_LEN: usize = SMALL_SORT_NETWORK_THRESHOLD;

/// Using a stack array could cause a stack overflow if the type `T` is very large. To be
/// conservative the strategies that require a stack array are limited to types that fit within
/// this many bytes.
pub const MAX_STACK_ARRAY_SIZE: usize = 4096;

/// Caller supplied classification of the element type.
///
/// The scratch based strategies evaluate the comparison function on temporary bitwise copies that
/// may not end up in the final slice. That is only sound if the type can't alter itself during
/// comparison, in Rust terms if it has no interior mutability (it is `Freeze`). A type like
/// `Mutex<Option<Box<str>>>` could otherwise lead to a double free.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeClass {
    /// Moving a temporary copy has no observable side effects.
    Freeze,
    /// Comparisons may mutate the value, every comparison must happen on the one true copy.
    NonFreeze,
}

impl TypeClass {
    /// Length up to which a general small-sort is preferred for this class of types.
    ///
    /// Non-Freeze types never take the scratch based path, so their cutover is the one that is
    /// optimal for insertion sort.
    #[must_use]
    pub const fn general_sort_threshold(self) -> usize {
        match self {
            TypeClass::Freeze => SMALL_SORT_GENERAL_THRESHOLD,
            TypeClass::NonFreeze => SMALL_SORT_FALLBACK_THRESHOLD,
        }
    }
}

/// See [`TypeClass::general_sort_threshold`].
#[must_use]
pub const fn general_sort_threshold(class: TypeClass) -> usize {
    class.general_sort_threshold()
}

/// The small-sort strategies the dispatchers choose from.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// [`small_sort_fallback`], insertion sort from offset 1.
    Fallback,
    /// [`crate::small_sort_general`], stable, needs [`SMALL_SORT_GENERAL_SCRATCH_LEN`] scratch.
    General,
    /// [`small_sort_network`], unstable, needs [`SMALL_SORT_NETWORK_SCRATCH_LEN`] scratch.
    Network,
}

impl Strategy {
    /// For which input length <= return value, it is preferable to call the strategy.
    #[must_use]
    pub const fn threshold(self) -> usize {
        match self {
            Strategy::Fallback => SMALL_SORT_FALLBACK_THRESHOLD,
            Strategy::General => SMALL_SORT_GENERAL_THRESHOLD,
            Strategy::Network => SMALL_SORT_NETWORK_THRESHOLD,
        }
    }

    /// Number of scratch elements the strategy places on the stack.
    #[must_use]
    pub const fn scratch_len(self) -> usize {
        match self {
            Strategy::Fallback => 0,
            Strategy::General => SMALL_SORT_GENERAL_SCRATCH_LEN,
            Strategy::Network => SMALL_SORT_NETWORK_SCRATCH_LEN,
        }
    }

    #[must_use]
    pub const fn is_stable(self) -> bool {
        !matches!(self, Strategy::Network)
    }
}

const fn fits_on_stack<T>(scratch_len: usize) -> bool {
    mem::size_of::<T>() * scratch_len <= MAX_STACK_ARRAY_SIZE
}

/// Picks the stable strategy for `T`.
#[must_use]
pub const fn choose_stable_strategy<T>(class: TypeClass) -> Strategy {
    match class {
        TypeClass::Freeze if fits_on_stack::<T>(SMALL_SORT_GENERAL_SCRATCH_LEN) => {
            Strategy::General
        }
        _ => Strategy::Fallback,
    }
}

/// Picks the unstable strategy for `T`.
///
/// The sorting-networks are tuned for types that can be swapped in registers, larger types are
/// better served by the general small-sort.
#[must_use]
pub const fn choose_unstable_strategy<T>(class: TypeClass) -> Strategy {
    match class {
        TypeClass::NonFreeze => Strategy::Fallback,
        TypeClass::Freeze => {
            if has_efficient_in_place_swap::<T>()
                && fits_on_stack::<T>(SMALL_SORT_NETWORK_SCRATCH_LEN)
            {
                Strategy::Network
            } else if fits_on_stack::<T>(SMALL_SORT_GENERAL_SCRATCH_LEN) {
                Strategy::General
            } else {
                Strategy::Fallback
            }
        }
    }
}

#[must_use]
pub const fn stable_small_sort_threshold<T>(class: TypeClass) -> usize {
    choose_stable_strategy::<T>(class).threshold()
}

#[must_use]
pub const fn unstable_small_sort_threshold<T>(class: TypeClass) -> usize {
    choose_unstable_strategy::<T>(class).threshold()
}

/// Inputs shorter than [`SMALL_SORT_FALLBACK_THRESHOLD`] always take insertion sort, whatever
/// `strategy` would be.
#[inline(always)]
#[track_caller]
fn strategy_for_len(len: usize, strategy: Strategy) -> Strategy {
    if len > strategy.threshold() {
        panic_on_precondition_violation("len exceeds the threshold of the chosen strategy");
    }

    if len < SMALL_SORT_FALLBACK_THRESHOLD {
        Strategy::Fallback
    } else {
        strategy
    }
}

/// Stably sorts `v` with the strategy chosen for `T` and `class`.
///
/// Inputs shorter than [`SMALL_SORT_FALLBACK_THRESHOLD`] are insertion sorted directly.
///
/// # Panics
///
/// Panics if `v.len()` exceeds [`stable_small_sort_threshold`].
#[track_caller]
pub fn stable_small_sort<T, F>(v: &mut [T], class: TypeClass, is_less: &mut F)
where
    T: Copy,
    F: FnMut(&T, &T) -> bool,
{
    match strategy_for_len(v.len(), choose_stable_strategy::<T>(class)) {
        Strategy::General => small_sort_general(v, is_less),
        _ => small_sort_fallback(v, is_less),
    }
}

/// Like [`stable_small_sort`], but for any `T`.
///
/// # Safety
/// If `class` is [`TypeClass::Freeze`] the caller must guarantee that `T` has no interior
/// mutability, comparisons on temporary copies must not be observable.
#[track_caller]
pub unsafe fn stable_small_sort_unchecked<T, F>(v: &mut [T], class: TypeClass, is_less: &mut F)
where
    F: FnMut(&T, &T) -> bool,
{
    match strategy_for_len(v.len(), choose_stable_strategy::<T>(class)) {
        // SAFETY: The caller vouched for T being Freeze.
        Strategy::General => unsafe { small_sort_general_unchecked(v, is_less) },
        _ => small_sort_fallback(v, is_less),
    }
}

/// Sorts `v` with the strategy chosen for `T` and `class`, might not preserve the order of equal
/// elements.
///
/// Inputs shorter than [`SMALL_SORT_FALLBACK_THRESHOLD`] are insertion sorted directly.
///
/// # Panics
///
/// Panics if `v.len()` exceeds [`unstable_small_sort_threshold`].
#[track_caller]
pub fn unstable_small_sort<T, F>(v: &mut [T], class: TypeClass, is_less: &mut F)
where
    T: Copy,
    F: FnMut(&T, &T) -> bool,
{
    match strategy_for_len(v.len(), choose_unstable_strategy::<T>(class)) {
        Strategy::Network => small_sort_network(v, is_less),
        Strategy::General => small_sort_general(v, is_less),
        Strategy::Fallback => small_sort_fallback(v, is_less),
    }
}

/// Like [`unstable_small_sort`], but for any `T`.
///
/// # Safety
/// Same as [`stable_small_sort_unchecked`].
#[track_caller]
pub unsafe fn unstable_small_sort_unchecked<T, F>(v: &mut [T], class: TypeClass, is_less: &mut F)
where
    F: FnMut(&T, &T) -> bool,
{
    // SAFETY: The caller vouched for T being Freeze, the scratch based strategies are only chosen
    // for Freeze.
    match strategy_for_len(v.len(), choose_unstable_strategy::<T>(class)) {
        Strategy::Network => unsafe { small_sort_network_unchecked(v, is_less) },
        Strategy::General => unsafe { small_sort_general_unchecked(v, is_less) },
        Strategy::Fallback => small_sort_fallback(v, is_less),
    }
}

/// [`stable_small_sort`] with a comparator function.
#[track_caller]
pub fn stable_small_sort_by<T, F>(v: &mut [T], class: TypeClass, mut compare: F)
where
    T: Copy,
    F: FnMut(&T, &T) -> Ordering,
{
    stable_small_sort(v, class, &mut |a, b| compare(a, b) == Ordering::Less);
}

/// [`unstable_small_sort`] with a comparator function.
#[track_caller]
pub fn unstable_small_sort_by<T, F>(v: &mut [T], class: TypeClass, mut compare: F)
where
    T: Copy,
    F: FnMut(&T, &T) -> Ordering,
{
    unstable_small_sort(v, class, &mut |a, b| compare(a, b) == Ordering::Less);
}
