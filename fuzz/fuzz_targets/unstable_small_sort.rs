#![no_main]

use libfuzzer_sys::fuzz_target;

use smallsort::TypeClass;
use smallsort_fuzz::{reference_sort, u8_as_x};

fuzz_target!(|data: &[u8]| {
    let v = u8_as_x::<i32>(data);
    let expected = reference_sort(&v, |x| *x);

    let mut sorted = v.clone();
    smallsort::unstable_small_sort(&mut sorted, TypeClass::Freeze, &mut |a, b| a < b);
    assert_eq!(sorted, expected);

    let mut sorted = v;
    smallsort::small_sort_network(&mut sorted, &mut |a, b| a < b);
    assert_eq!(sorted, expected);
});
