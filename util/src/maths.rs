//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Map a value from one range into another.
pub fn lin_map<T>(source_range: (T, T), target_range: (T, T), value: T) -> T
where
    T: Float,
{
    target_range.0
        + ((value - source_range.0) * (target_range.1 - target_range.0)
            / (source_range.1 - source_range.0))
}

/// Clamp a value into the range [min, max].
pub fn clamp<T>(value: &T, min: &T, max: &T) -> T
where
    T: Float,
{
    let mut ret = *value;

    if ret > *max {
        ret = *max
    }
    if ret < *min {
        ret = *min
    }

    ret
}

/// Arithmetic mean of a slice, or `None` if the slice is empty.
///
/// Empty inputs are a valid degenerate case for sparse pixel sets, so the
/// caller must handle `None` rather than rely on a NaN propagating.
pub fn mean<T>(values: &[T]) -> Option<T>
where
    T: Float + std::ops::AddAssign,
{
    if values.is_empty() {
        return None;
    }

    let mut sum = T::from(0).unwrap();

    for v in values {
        sum += *v;
    }

    Some(sum / T::from(values.len()).unwrap())
}

/// Get the signed angular distance between two angles in the range [0, 2pi].
///
/// This function will return the shortest signed distance between a and b
/// accounting for wrapping between 0 and 2pi.
pub fn get_ang_dist_2pi<T>(a: T, b: T) -> T
where
    T: Float,
{
    let tau_t: T = T::from(std::f64::consts::TAU).unwrap();

    let c = rem_euclid(a - b, tau_t);
    let d = rem_euclid(b - a, tau_t);

    if c < d {
        -c
    } else {
        d
    }
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
///
/// This function is taken from the std library as num is missing it.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float,
{
    let r = lhs % rhs;
    if r < T::from(0.0).unwrap() {
        r + rhs.abs()
    } else {
        r
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_lin_map() {
        assert_eq!(lin_map((0f64, 1f64), (0f64, 255f64), 0.5), 127.5);
        assert_eq!(lin_map((-1f64, 1f64), (0f64, 10f64), 0f64), 5f64);
    }

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(&20f64, &-15f64, &15f64), 15f64);
        assert_eq!(clamp(&-20f64, &-15f64, &15f64), -15f64);
        assert_eq!(clamp(&3f64, &-15f64, &15f64), 3f64);
    }

    #[test]
    fn test_mean() {
        assert_eq!(mean::<f64>(&[]), None);
        assert_eq!(mean(&[1f64, 2f64, 3f64]), Some(2f64));
    }

    #[test]
    fn test_get_ang_dist_2pi() {
        const TAU: f64 = std::f64::consts::TAU;

        assert_eq!(get_ang_dist_2pi(1f64, 2f64), 1f64);
        assert_eq!(get_ang_dist_2pi(2f64, 1f64), -1f64);
        assert_eq!(get_ang_dist_2pi(0f64, TAU), 0f64);
        assert_eq!(get_ang_dist_2pi(TAU, 0f64), 0f64);
        assert_eq!(get_ang_dist_2pi(1f64, TAU), -1f64);
        assert_eq!(get_ang_dist_2pi(0f64, TAU - 1f64), -1f64);
        assert_eq!(get_ang_dist_2pi(TAU - 1f64, 1f64), 2f64);
    }
}
