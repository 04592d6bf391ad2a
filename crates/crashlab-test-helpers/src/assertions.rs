//! Assertion macros for scores and orderings.

/// Assert that two floating-point values are approximately equal.
///
/// ```rust
/// use crashlab_test_helpers::assert_approx_eq;
///
/// assert_approx_eq!(0.1_f64 + 0.2, 0.3, 1e-9);
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $tolerance:expr $(,)?) => {
        let left = $left;
        let right = $right;
        let tolerance = $tolerance;
        let diff = (left - right).abs();
        if diff > tolerance {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}`,\n  tolerance: `{:?}`",
                left, right, diff, tolerance
            );
        }
    };
    ($left:expr, $right:expr, $tolerance:expr, $($arg:tt)+) => {
        let left = $left;
        let right = $right;
        let tolerance = $tolerance;
        let diff = (left - right).abs();
        if diff > tolerance {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}`,\n  tolerance: `{:?}`: {}",
                left, right, diff, tolerance, format_args!($($arg)+)
            );
        }
    };
}

/// Assert that a value lies in an inclusive range.
///
/// ```rust
/// use crashlab_test_helpers::assert_in_range;
///
/// assert_in_range!(0.62, 0.0, 1.0);
/// ```
#[macro_export]
macro_rules! assert_in_range {
    ($value:expr, $min:expr, $max:expr $(,)?) => {
        let value = $value;
        let min = $min;
        let max = $max;
        if !(value >= min && value <= max) {
            panic!(
                "assertion failed: `{:?}` not in range [{:?}, {:?}]",
                value, min, max
            );
        }
    };
}

/// Assert that a slice of keys is sorted in non-increasing order.
///
/// ```rust
/// use crashlab_test_helpers::assert_sorted_desc;
///
/// assert_sorted_desc!(&[(3, 90.0), (3, 40.0), (2, 75.0)]);
/// ```
#[macro_export]
macro_rules! assert_sorted_desc {
    ($items:expr $(,)?) => {
        let items = $items;
        for (index, pair) in items.windows(2).enumerate() {
            if let [a, b] = pair {
                if a.partial_cmp(b) == Some(::std::cmp::Ordering::Less) {
                    panic!(
                        "assertion failed: not sorted descending at index {}: `{:?}` < `{:?}`",
                        index, a, b
                    );
                }
            }
        }
    };
}
