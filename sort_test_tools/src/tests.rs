use std::cell::Cell;
use std::cmp::Ordering;
use std::fmt::Debug;
use std::io::{self, Write};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Mutex;

use crate::patterns;
use crate::Sort;

#[cfg(miri)]
const TEST_SIZES: [usize; 16] = [0, 1, 2, 3, 4, 5, 7, 8, 9, 12, 13, 16, 17, 18, 26, 32];

#[cfg(feature = "large_test_sizes")]
#[cfg(not(miri))]
const TEST_SIZES: [usize; 41] = [
    0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24, 25,
    26, 27, 28, 29, 30, 31, 32, 33, 35, 50, 64, 100, 200, 500, 1_000,
];

#[cfg(not(feature = "large_test_sizes"))]
#[cfg(not(miri))]
const TEST_SIZES: [usize; 37] = [
    0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24, 25,
    26, 27, 28, 29, 30, 31, 32, 33, 35, 50, 64,
];

fn test_sizes<S: Sort>() -> impl Iterator<Item = usize> {
    TEST_SIZES.into_iter().filter(|len| *len <= S::max_len())
}

fn get_or_init_random_seed<S: Sort>() -> u64 {
    static SEED_WRITTEN: Mutex<bool> = Mutex::new(false);
    let seed = patterns::random_init_seed();

    let mut seed_writer = SEED_WRITTEN.lock().unwrap();
    if !*seed_writer {
        // Always write the seed before doing anything to ensure reproducibility of crashes.
        io::stdout()
            .write_all(format!("\nSeed: {seed}\nTesting: {}\n\n", <S as Sort>::name()).as_bytes())
            .unwrap();
        io::stdout().flush().unwrap();

        *seed_writer = true;
    }

    seed
}

fn sort_comp<T: Ord + Clone + Debug, S: Sort>(v: &mut [T]) {
    let _seed = get_or_init_random_seed::<S>();

    let original_clone = v.to_vec();

    let mut stdlib_sorted_vec = v.to_vec();
    let stdlib_sorted = stdlib_sorted_vec.as_mut_slice();
    stdlib_sorted.sort();

    let testsort_sorted = v;
    <S as Sort>::sort(testsort_sorted);

    assert_eq!(stdlib_sorted.len(), testsort_sorted.len());

    if stdlib_sorted.iter().zip(testsort_sorted.iter()).any(|(a, b)| a != b) {
        // Small-sort inputs are short enough to always print them in full.
        eprintln!("Original: {:?}", original_clone);
        eprintln!("Expected: {:?}", stdlib_sorted);
        eprintln!("Got:      {:?}", testsort_sorted);

        panic!("Test assertion failed!")
    }
}

fn test_impl<T: Ord + Clone + Debug, S: Sort>(pattern_fn: impl Fn(usize) -> Vec<T>) {
    for test_size in test_sizes::<S>() {
        let mut test_data = pattern_fn(test_size);
        sort_comp::<T, S>(test_data.as_mut_slice());
    }
}

fn test_impl_custom<S: Sort>(mut test_fn: impl FnMut(usize, fn(usize) -> Vec<i32>)) {
    let test_pattern_fns: Vec<fn(usize) -> Vec<i32>> = vec![
        patterns::random,
        |len| patterns::random_uniform(len, 0..=(((len as f64).log2().round()) as i32)),
        |len| patterns::random_uniform(len, 0..=1),
        patterns::ascending,
        patterns::descending,
        |len| patterns::saw_mixed(len, ((len as f64).log2().round()) as usize),
    ];

    for test_pattern_fn in test_pattern_fns {
        for test_size in test_sizes::<S>() {
            if test_size < 2 {
                continue;
            }

            test_fn(test_size, test_pattern_fn);
        }
    }
}

fn is_stable_impl<S: Sort>() -> bool {
    !<S as Sort>::name().contains("unstable")
}

fn is_observation_safe_impl<S: Sort>() -> bool {
    // Implementations that claim Freeze for every type compare temporary copies.
    let name = <S as Sort>::name();
    name.contains("non_freeze") || name.contains("fallback")
}

// For the stability tests, pack the key and the occurrence counter inside a single u64.
fn i32_tup_as_u64(val: (i32, i32)) -> u64 {
    let a_bytes = val.0.to_le_bytes();
    let b_bytes = val.1.to_le_bytes();

    u64::from_le_bytes([a_bytes, b_bytes].concat().try_into().unwrap())
}

fn i32_tup_from_u64(val: u64) -> (i32, i32) {
    let bytes = val.to_le_bytes();

    let a = i32::from_le_bytes(bytes[0..4].try_into().unwrap());
    let b = i32::from_le_bytes(bytes[4..8].try_into().unwrap());

    (a, b)
}

// --- TESTS ---

pub fn basic<S: Sort>() {
    sort_comp::<i32, S>(&mut []);
    sort_comp::<(), S>(&mut []);
    sort_comp::<(), S>(&mut [()]);
    sort_comp::<(), S>(&mut [(), ()]);
    sort_comp::<(), S>(&mut [(), (), ()]);
    sort_comp::<i32, S>(&mut [2, 3]);
    sort_comp::<i32, S>(&mut [2, 3, 6]);
    sort_comp::<i32, S>(&mut [2, 3, 99, 6]);
    sort_comp::<i32, S>(&mut [2, 7709, 400, 90932]);
    sort_comp::<i32, S>(&mut [15, -1, 3, -1, -3, -1, 7]);
    sort_comp::<i32, S>(&mut [5, 3, 4, 1, 2]);
    sort_comp::<i32, S>(&mut [9, 8, 7, 6, 5, 4, 3, 2, 1]);
}

pub fn fixed_seed<S: Sort>() {
    let fixed_seed_a = patterns::random_init_seed();
    let fixed_seed_b = patterns::random_init_seed();

    assert_eq!(fixed_seed_a, fixed_seed_b);
}

pub fn random<S: Sort>() {
    test_impl::<i32, S>(patterns::random);
}

pub fn random_type_u64<S: Sort>() {
    test_impl::<u64, S>(|len| {
        patterns::random(len)
            .iter()
            .map(|val| -> u64 {
                // Extends the value into the 64 bit range,
                // while preserving input order.
                let x = ((*val as i64) + (i32::MAX as i64) + 1) as u64;
                x.checked_mul(i32::MAX as u64).unwrap()
            })
            .collect()
    });
}

pub fn random_type_u128<S: Sort>() {
    test_impl::<u128, S>(|len| {
        patterns::random(len)
            .iter()
            .map(|val| -> u128 {
                // Extends the value into the 128 bit range,
                // while preserving input order.
                let x = ((*val as i128) + (i64::MAX as i128) + 1) as u128;
                x.checked_mul(i64::MAX as u128).unwrap()
            })
            .collect()
    });
}

pub fn random_large_val<S: Sort>() {
    // Too large for sort8_stable and for register swaps, takes the sort4_stable presort path.
    test_impl::<[u64; 4], S>(|len| {
        patterns::random(len)
            .into_iter()
            .map(|val| [val as u64, 0, 0, 0])
            .collect()
    });
}

pub fn random_d4<S: Sort>() {
    test_impl::<i32, S>(|len| patterns::random_uniform(len, 0..4));
}

pub fn random_d16<S: Sort>() {
    test_impl::<i32, S>(|len| patterns::random_uniform(len, 0..16));
}

pub fn random_binary<S: Sort>() {
    test_impl::<i32, S>(|len| patterns::random_uniform(len, 0..=1));
}

pub fn random_z1<S: Sort>() {
    test_impl::<i32, S>(|len| patterns::random_zipf(len, 1.0));
}

pub fn random_s50<S: Sort>() {
    test_impl::<i32, S>(|len| patterns::random_sorted(len, 50.0));
}

pub fn random_s95<S: Sort>() {
    test_impl::<i32, S>(|len| patterns::random_sorted(len, 95.0));
}

pub fn permutation<S: Sort>() {
    test_impl::<i32, S>(patterns::permutation);
}

pub fn all_equal<S: Sort>() {
    test_impl::<i32, S>(patterns::all_equal);
}

pub fn ascending<S: Sort>() {
    test_impl::<i32, S>(patterns::ascending);
}

pub fn descending<S: Sort>() {
    test_impl::<i32, S>(patterns::descending);
}

pub fn saw_mixed<S: Sort>() {
    test_impl::<i32, S>(|len| patterns::saw_mixed(len, ((len as f64).log2().round()) as usize));
}

pub fn pipe_organ<S: Sort>() {
    test_impl::<i32, S>(patterns::pipe_organ);
}

pub fn random_str<S: Sort>() {
    test_impl::<String, S>(|len| {
        patterns::random(len)
            .into_iter()
            .map(|val| format!("{}", val))
            .collect::<Vec<_>>()
    });
}

pub fn idempotent<S: Sort>() {
    let _seed = get_or_init_random_seed::<S>();

    let test_fn = |test_size: usize, pattern_fn: fn(usize) -> Vec<i32>| {
        let mut v = pattern_fn(test_size);
        <S as Sort>::sort(&mut v);

        let sorted_once = v.clone();
        <S as Sort>::sort(&mut v);

        assert_eq!(v, sorted_once);
    };

    test_impl_custom::<S>(test_fn);
}

pub fn all_equal_keys_untouched<S: Sort>() {
    let _seed = get_or_init_random_seed::<S>();

    // Even the unstable strategies never swap equal elements, so input consisting of only one key
    // must come out exactly as it went in.
    for test_size in test_sizes::<S>() {
        let orig = (0..test_size as i32)
            .map(|i| i32_tup_as_u64((7, i)))
            .collect::<Vec<_>>();

        let mut v = orig.clone();
        <S as Sort>::sort_by(&mut v, |a, b| {
            i32_tup_from_u64(*a).0.cmp(&i32_tup_from_u64(*b).0)
        });

        assert_eq!(v, orig);
    }
}

pub fn stability<S: Sort>() {
    let _seed = get_or_init_random_seed::<S>();

    if !is_stable_impl::<S>() {
        // It would be great to mark the test as skipped, but that isn't possible as of now.
        return;
    }

    let rounds = if cfg!(miri) { 1 } else { 10 };

    let rand_vals = patterns::random_uniform(5_000, 0..=9);
    let mut rand_idx = 0;

    for len in test_sizes::<S>() {
        for _ in 0..rounds {
            let mut counts = [0; 10];

            // Pairs of (key, nth occurrence of key), the occurrence counters of one key are
            // ascending in input order.
            let orig: Vec<_> = (0..len)
                .map(|_| {
                    let n = rand_vals[rand_idx];
                    rand_idx += 1;
                    if rand_idx >= rand_vals.len() {
                        rand_idx = 0;
                    }

                    counts[n as usize] += 1;
                    i32_tup_as_u64((n, counts[n as usize]))
                })
                .collect();

            let mut v = orig.clone();
            <S as Sort>::sort_by(&mut v, |a_packed, b_packed| {
                let a = i32_tup_from_u64(*a_packed).0;
                let b = i32_tup_from_u64(*b_packed).0;

                a.cmp(&b)
            });

            // Comparing full pairs checks that equal keys kept their occurrence order.
            assert!(v
                .windows(2)
                .all(|w| i32_tup_from_u64(w[0]) <= i32_tup_from_u64(w[1])));
        }
    }
}

pub fn stability_with_patterns<S: Sort>() {
    let _seed = get_or_init_random_seed::<S>();

    if !is_stable_impl::<S>() {
        return;
    }

    let test_fn = |test_size: usize, pattern_fn: fn(usize) -> Vec<i32>| {
        let pattern = pattern_fn(test_size);

        let mut counts = [0i32; 128];

        let orig: Vec<_> = pattern
            .iter()
            .map(|val| {
                let n = val.saturating_abs() % counts.len() as i32;
                counts[n as usize] += 1;
                i32_tup_as_u64((n, counts[n as usize]))
            })
            .collect();

        let mut v = orig.clone();
        <S as Sort>::sort_by(&mut v, |a_packed, b_packed| {
            let a = i32_tup_from_u64(*a_packed).0;
            let b = i32_tup_from_u64(*b_packed).0;

            a.cmp(&b)
        });

        assert!(v
            .windows(2)
            .all(|w| i32_tup_from_u64(w[0]) <= i32_tup_from_u64(w[1])));
    };

    test_impl_custom::<S>(test_fn);
}

pub fn comp_panic<S: Sort>() {
    // A panicking comparison must not leave duplicated owners behind, miri catches double
    // frees of the heap backed elements.

    let seed = get_or_init_random_seed::<S>();

    let test_fn = |test_size: usize, pattern_fn: fn(usize) -> Vec<i32>| {
        // Needs to be non trivial dtor.
        let mut pattern = pattern_fn(test_size)
            .into_iter()
            .map(|val| vec![val, val, val])
            .collect::<Vec<Vec<i32>>>();

        let val = panic::catch_unwind(AssertUnwindSafe(|| {
            <S as Sort>::sort_by(&mut pattern, |a, b| {
                if a[0].abs() < (i32::MAX / test_size as i32) {
                    panic!(
                        "Explicit panic. Seed: {}. test_size: {}. a: {} b: {}",
                        seed, test_size, a[0], b[0]
                    );
                }

                a[0].cmp(&b[0])
            });

            pattern
                .get(pattern.len().saturating_sub(1))
                .map(|val| val[0])
                .unwrap_or(66)
        }));
        if let Err(err) = val {
            // Side effect.
            println!("{:?}", err);
        }
    };

    test_impl_custom::<S>(test_fn);
}

fn calc_comps_required<T: Clone, S: Sort>(
    test_data: &[T],
    mut cmp_fn: impl FnMut(&T, &T) -> Ordering,
) -> u32 {
    let mut comp_counter = 0u32;

    let mut test_data_clone = test_data.to_vec();
    <S as Sort>::sort_by(&mut test_data_clone, |a, b| {
        comp_counter += 1;

        cmp_fn(a, b)
    });

    comp_counter
}

pub fn panic_retain_original_set<S: Sort>() {
    let _seed = get_or_init_random_seed::<S>();

    let test_fn = |test_size: usize, pattern_fn: fn(usize) -> Vec<i32>| {
        let mut test_data = pattern_fn(test_size);

        let sum_before: i64 = test_data.iter().map(|x| *x as i64).sum();

        // Panic at a random one of the comparisons a full run needs.
        let required_comps = calc_comps_required::<i32, S>(&test_data, |a, b| a.cmp(b));
        let panic_threshold =
            patterns::random_uniform(1, 1..=required_comps as i32)[0] as usize - 1;

        let mut comp_counter = 0;

        let res = panic::catch_unwind(AssertUnwindSafe(|| {
            <S as Sort>::sort_by(&mut test_data, |a, b| {
                if comp_counter == panic_threshold {
                    panic!();
                }
                comp_counter += 1;

                a.cmp(b)
            });
        }));

        assert!(res.is_err());

        // If the sum before and after don't match, it means the set of elements hasn't remained the
        // same.
        let sum_after: i64 = test_data.iter().map(|x| *x as i64).sum();
        assert_eq!(sum_before, sum_after);
    };

    test_impl_custom::<S>(test_fn);
}

pub fn observable_is_less<S: Sort>() {
    let _seed = get_or_init_random_seed::<S>();

    if !is_observation_safe_impl::<S>() {
        return;
    }

    // Every mutation a comparison makes must end up in the sorted slice. Comparing a temporary
    // copy that is later discarded would lose it, which for types with interior mutability can
    // mean a double free.

    #[derive(PartialEq, Eq, Debug, Clone)]
    struct CompCount {
        val: i32,
        comp_count: Cell<u32>,
    }

    impl CompCount {
        fn new(val: i32) -> Self {
            Self {
                val,
                comp_count: Cell::new(0),
            }
        }
    }

    let test_fn = |test_size: usize, pattern_fn: fn(usize) -> Vec<i32>| {
        let pattern = pattern_fn(test_size);
        let mut test_input = pattern
            .into_iter()
            .map(CompCount::new)
            .collect::<Vec<_>>();

        let mut comp_count_global = 0;

        <S as Sort>::sort_by(&mut test_input, |a, b| {
            a.comp_count.replace(a.comp_count.get() + 1);
            b.comp_count.replace(b.comp_count.get() + 1);
            comp_count_global += 1;

            a.val.cmp(&b.val)
        });

        let total_inner: u64 = test_input.iter().map(|c| c.comp_count.get() as u64).sum();

        assert_eq!(total_inner, comp_count_global * 2);
    };

    test_impl_custom::<S>(test_fn);
}

pub fn violate_ord_retain_original_set<S: Sort>() {
    let _seed = get_or_init_random_seed::<S>();

    // Broken comparison functions may cause a panic or a wrong order, never a lost or duplicated
    // element.

    // One seeded batch of orderings, consumed round robin.
    let random_orderings = patterns::random_uniform(5_000, 0..3);

    let mut random_idx: usize = 0;
    let mut next_random_ordering = move || {
        let ordering = match random_orderings[random_idx % random_orderings.len()] {
            0 => Ordering::Less,
            1 => Ordering::Equal,
            _ => Ordering::Greater,
        };
        random_idx += 1;

        ordering
    };

    let mut streak_counter: usize = 0;

    let mut invalid_ord_comp_functions: Vec<Box<dyn FnMut(&i32, &i32) -> Ordering>> = vec![
        Box::new(|_a, _b| -> Ordering {
            // random
            // Eg. is_less(a, b) is true and is_less(b, a) is also true.
            next_random_ordering()
        }),
        Box::new(|_a, _b| -> Ordering {
            // everything is less -> 1, 2, 3 -> 3, 1, 2 etc.
            Ordering::Less
        }),
        Box::new(|a, b| -> Ordering {
            // Correct for the first few comparisons, then claims everything is greater.
            const STREAK_LEN: usize = 10;

            streak_counter += 1;
            if streak_counter <= STREAK_LEN {
                a.cmp(b)
            } else {
                if streak_counter == STREAK_LEN * 2 {
                    streak_counter = 0;
                }
                Ordering::Greater
            }
        }),
    ];

    for comp_func in &mut invalid_ord_comp_functions {
        let test_fn = |test_size: usize, pattern_fn: fn(usize) -> Vec<i32>| {
            let mut test_data = pattern_fn(test_size);
            let sum_before: i64 = test_data.iter().map(|x| *x as i64).sum();

            // It's ok to panic on Ord violation or to complete.
            // In both cases the original elements must still be present.
            let _ = panic::catch_unwind(AssertUnwindSafe(|| {
                <S as Sort>::sort_by(&mut test_data, &mut *comp_func);
            }));

            // If the sum before and after don't match, it means the set of elements hasn't
            // remained the same.
            let sum_after: i64 = test_data.iter().map(|x| *x as i64).sum();
            assert_eq!(sum_before, sum_after);
        };

        test_impl_custom::<S>(test_fn);

        if cfg!(miri) {
            // This test is prohibitively expensive in miri, so only run one of the comparison
            // functions.
            break;
        }
    }
}

pub fn sort_vs_sort_by<S: Sort>() {
    let _seed = get_or_init_random_seed::<S>();

    // Ensure that sort and sort_by produce the same result.
    let mut input_normal = [800, 3, -801, 5, -801, -3, 60, 200, 50, 7, 10];
    let expected = [-801, -801, -3, 3, 5, 7, 10, 50, 60, 200, 800];

    let mut input_sort_by = input_normal.to_vec();

    <S as Sort>::sort(&mut input_normal);
    <S as Sort>::sort_by(&mut input_sort_by, |a, b| a.cmp(b));

    assert_eq!(input_normal, expected);
    assert_eq!(input_sort_by, expected);
}

pub fn int_edge<S: Sort>() {
    let _seed = get_or_init_random_seed::<S>();

    // Ensure that the sort can handle integer edge cases.
    sort_comp::<i32, S>(&mut [i32::MIN, i32::MAX]);
    sort_comp::<i32, S>(&mut [i32::MAX, i32::MIN]);
    sort_comp::<i32, S>(&mut [i32::MIN, 3]);
    sort_comp::<i32, S>(&mut [i32::MIN, -3]);
    sort_comp::<i32, S>(&mut [i32::MIN, -3, i32::MAX]);
    sort_comp::<i32, S>(&mut [i32::MIN, -3, i32::MAX, i32::MIN, 5]);
    sort_comp::<i32, S>(&mut [i32::MAX, 3, i32::MIN, 5, i32::MIN, -3, 60, 200, 50, 7, 10]);

    sort_comp::<u64, S>(&mut [u64::MIN, u64::MAX]);
    sort_comp::<u64, S>(&mut [u64::MAX, u64::MIN]);
    sort_comp::<u64, S>(&mut [u64::MIN, u64::MAX - 3, u64::MAX, u64::MIN, 5]);
    sort_comp::<u64, S>(&mut [
        u64::MAX,
        3,
        u64::MIN,
        5,
        u64::MIN,
        u64::MAX - 3,
        60,
        200,
        50,
        7,
        10,
    ]);

    let mut longest = patterns::random(S::max_len().min(32) - 3);
    longest.push(i32::MAX);
    longest.push(i32::MIN);
    longest.push(i32::MAX);
    sort_comp::<i32, S>(&mut longest);
}

#[doc(hidden)]
#[macro_export]
macro_rules! instantiate_sort_test_impl_inner {
    ($sort_impl:ty, miri_yes, $sort_name:ident) => {
        #[test]
        fn $sort_name() {
            sort_test_tools::tests::$sort_name::<$sort_impl>();
        }
    };
    ($sort_impl:ty, miri_no, $sort_name:ident) => {
        #[test]
        #[cfg(not(miri))]
        fn $sort_name() {
            sort_test_tools::tests::$sort_name::<$sort_impl>();
        }

        #[test]
        #[cfg(miri)]
        #[ignore]
        fn $sort_name() {}
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! instantiate_sort_test_impl {
    ($sort_impl:ty, $([$miri_use:ident, $sort_name:ident]),*) => {
        $(
            sort_test_tools::instantiate_sort_test_impl_inner!($sort_impl, $miri_use, $sort_name);
        )*
    };
}

#[macro_export]
macro_rules! instantiate_sort_tests {
    ($sort_impl:ty) => {
        sort_test_tools::instantiate_sort_test_impl!(
            $sort_impl,
            [miri_yes, all_equal],
            [miri_yes, all_equal_keys_untouched],
            [miri_yes, ascending],
            [miri_yes, basic],
            [miri_yes, comp_panic],
            [miri_yes, descending],
            [miri_yes, fixed_seed],
            [miri_no, idempotent],
            [miri_yes, int_edge],
            [miri_yes, observable_is_less],
            [miri_yes, panic_retain_original_set],
            [miri_yes, permutation],
            [miri_yes, pipe_organ],
            [miri_yes, random],
            [miri_no, random_binary],
            [miri_no, random_d16],
            [miri_yes, random_d4],
            [miri_yes, random_large_val],
            [miri_yes, random_s50],
            [miri_no, random_s95],
            [miri_yes, random_str],
            [miri_yes, random_type_u128],
            [miri_yes, random_type_u64],
            [miri_yes, random_z1],
            [miri_yes, saw_mixed],
            [miri_yes, sort_vs_sort_by],
            [miri_yes, stability],
            [miri_no, stability_with_patterns],
            [miri_yes, violate_ord_retain_original_set]
        );
    };
}
