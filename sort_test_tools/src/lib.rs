pub trait Sort {
    fn name() -> String;

    /// Longest input the implementation accepts, small-sorts are only defined up to a threshold.
    fn max_len() -> usize;

    fn sort<T>(arr: &mut [T])
    where
        T: Ord;

    fn sort_by<T, F>(arr: &mut [T], compare: F)
    where
        F: FnMut(&T, &T) -> std::cmp::Ordering;
}

pub mod patterns;
pub mod tests;
