#![no_main]

use libfuzzer_sys::fuzz_target;

use smallsort_fuzz::{reference_sort, u8_as_x};

fuzz_target!(|data: &[u8]| {
    let Some((&offset_byte, rest)) = data.split_first() else {
        return;
    };

    let mut v = u8_as_x::<i32>(rest);
    if v.is_empty() {
        return;
    }

    // Establish the sorted prefix the insertion sort relies on.
    let offset = (offset_byte as usize % v.len()) + 1;
    v[..offset].sort();

    let expected = reference_sort(&v, |x| *x);
    smallsort::insertion_sort_shift_left(&mut v, offset, &mut |a, b| a < b);
    assert_eq!(v, expected);
});
