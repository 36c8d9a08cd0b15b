#![no_main]

use libfuzzer_sys::fuzz_target;

use smallsort::TypeClass;
use smallsort_fuzz::{reference_sort, u8_as_x};

fuzz_target!(|data: &[u8]| {
    // Small key space to get plenty of ties, the low bits tag the original position.
    let v = u8_as_x::<u8>(data)
        .into_iter()
        .enumerate()
        .map(|(i, key)| ((key % 8) as u16) << 8 | i as u16)
        .collect::<Vec<_>>();

    for class in [TypeClass::Freeze, TypeClass::NonFreeze] {
        let len = v.len().min(class.general_sort_threshold());
        let expected = reference_sort(&v[..len], |x| x >> 8);

        let mut sorted = v[..len].to_vec();
        smallsort::stable_small_sort(&mut sorted, class, &mut |a, b| (a >> 8) < (b >> 8));
        assert_eq!(sorted, expected);
    }
});
