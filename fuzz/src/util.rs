use std::mem;

use smallsort::policy::SMALL_SORT_GENERAL_THRESHOLD;

/// Reinterprets the fuzzer input as integers, at most as many as a small-sort accepts.
pub fn u8_as_x<T: Copy + FromLeBytes>(data: &[u8]) -> Vec<T> {
    data.chunks_exact(mem::size_of::<T>())
        .take(SMALL_SORT_GENERAL_THRESHOLD)
        .map(T::from_le_bytes)
        .collect()
}

pub trait FromLeBytes {
    fn from_le_bytes(bytes: &[u8]) -> Self;
}

impl FromLeBytes for u8 {
    fn from_le_bytes(bytes: &[u8]) -> Self {
        bytes[0]
    }
}

impl FromLeBytes for i32 {
    fn from_le_bytes(bytes: &[u8]) -> Self {
        i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    }
}

/// Sorts a copy of `v` by key only with the std stable sort, the reference for every check.
pub fn reference_sort<T: Copy, K: Ord>(v: &[T], key: impl Fn(&T) -> K) -> Vec<T> {
    let mut expected = v.to_vec();
    expected.sort_by_key(key);
    expected
}
