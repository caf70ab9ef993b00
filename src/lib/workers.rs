//! Worker-count resolution.
//!
//! The count is resolved once per run and passed explicitly to every stage.

use std::num::NonZeroUsize;

/// Threads left free for the main thread and the OS when no count is requested.
const RESERVED_THREADS: usize = 2;

/// Default worker count: available parallelism minus two, at least one.
#[must_use]
pub fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
        .saturating_sub(RESERVED_THREADS)
        .max(1)
}

/// Resolves the worker count from alias values given in precedence order.
///
/// The first `Some` wins; values below one are clamped to one. With no value
/// the default from [`default_worker_count`] is used.
///
/// ```
/// use molpipe_lib::workers::resolve_worker_count;
///
/// assert_eq!(resolve_worker_count(&[None, Some(4), Some(8)]), 4);
/// assert_eq!(resolve_worker_count(&[Some(-3)]), 1);
/// assert!(resolve_worker_count(&[None, None]) >= 1);
/// ```
#[must_use]
pub fn resolve_worker_count(requested: &[Option<i64>]) -> usize {
    match requested.iter().flatten().next() {
        Some(&n) => usize::try_from(n).unwrap_or(0).max(1),
        None => default_worker_count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(&[Some(3), Some(5), None, Some(7)], 3)]
    #[case(&[None, Some(5), Some(6), Some(7)], 5)]
    #[case(&[None, None, Some(6), Some(7)], 6)]
    #[case(&[None, None, None, Some(7)], 7)]
    #[case(&[Some(0)], 1)]
    #[case(&[Some(-1), Some(4)], 1)]
    fn test_resolve_precedence(#[case] requested: &[Option<i64>], #[case] expected: usize) {
        assert_eq!(resolve_worker_count(requested), expected);
    }

    #[test]
    fn test_default_is_positive() {
        assert!(default_worker_count() >= 1);
        assert_eq!(resolve_worker_count(&[]), default_worker_count());
    }
}
