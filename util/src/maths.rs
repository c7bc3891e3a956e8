//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Map a value from one range into another.
pub fn lin_map<T>(source_range: (T, T), target_range: (T, T), value: T) -> T
where
    T: Float,
{
    target_range.0
        + ((value - source_range.0) * (target_range.1 - target_range.0)
            / (source_range.1 - source_range.0))
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
///
/// `num_traits::Float` does not provide `rem_euclid`, so this mirrors the std implementation.
/// Due to round-off the result can equal `rhs.abs()` when `lhs` is a tiny negative number.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float,
{
    let r = lhs % rhs;
    if r < T::zero() {
        r + rhs.abs()
    } else {
        r
    }
}

/// Wrap an angle into the range [-pi, pi).
pub fn wrap_pi<T>(angle: T) -> T
where
    T: Float,
{
    let pi_t = T::from(std::f64::consts::PI).unwrap_or_else(T::zero);
    let tau_t = pi_t + pi_t;

    // rem_euclid can round up to tau, which would give pi
    let wrapped = rem_euclid(angle + pi_t, tau_t) - pi_t;
    if wrapped >= pi_t {
        -pi_t
    } else {
        wrapped
    }
}

/// Get the signed shortest angular distance to travel from `from` to `to`.
///
/// The result is in [-pi, pi), positive meaning `to` is reached by rotating anticlockwise.
pub fn ang_dist<T>(from: T, to: T) -> T
where
    T: Float,
{
    wrap_pi(to - from)
}

/// Apply a deadband to a normalised input.
///
/// Inputs with a magnitude below `width` are zeroed, and the remaining range is rescaled so that
/// the output still spans [-1, 1] without a step at the edge of the band.
pub fn deadband<T>(value: T, width: T) -> T
where
    T: Float,
{
    if value.abs() < width {
        T::zero()
    } else {
        value.signum() * lin_map((width, T::one()), (T::zero(), T::one()), value.abs())
    }
}

/// Evaluate a logistic curve which moves from `start` to `end` as `t` increases.
///
/// The curve passes half way between the two values at `t = centre`, `steepness` controls how
/// sharp the transition is (higher is sharper).
pub fn logistic<T>(t: T, start: T, end: T, centre: T, steepness: T) -> T
where
    T: Float,
{
    end + (start - end) / (T::one() + (steepness * (t - centre)).exp())
}

/// Raise a controller output to at least `floor` in magnitude, keeping its sign.
///
/// A zero output stays at zero, so a controller that is exactly on target is not pushed off it.
pub fn apply_floor<T>(output: T, floor: T) -> T
where
    T: Float,
{
    if output == T::zero() || output.abs() >= floor {
        output
    } else {
        output.signum() * floor
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::PI;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_wrap_pi() {
        assert!(close(wrap_pi(0.0), 0.0));
        assert!(close(wrap_pi(3.0 * PI / 2.0), -PI / 2.0));
        assert!(close(wrap_pi(-3.0 * PI / 2.0), PI / 2.0));
        assert!(close(wrap_pi(PI), -PI));
        assert!(close(wrap_pi(7.0 * PI + 0.1), -PI + 0.1));

        // Just below -pi, where the remainder rounds to the top of the range
        for n in 1..=8 {
            let angle = -f64::from_bits(PI.to_bits() + n);
            let w = wrap_pi(angle);
            assert!(w >= -PI && w < PI, "wrap_pi({}) = {}", angle, w);
        }
    }

    #[test]
    fn test_ang_dist() {
        assert!(close(ang_dist(1.0, 2.0), 1.0));
        assert!(close(ang_dist(2.0, 1.0), -1.0));

        // 170 deg to -170 deg is 20 deg anticlockwise, not 340 clockwise
        let d = ang_dist(170f64.to_radians(), -170f64.to_radians());
        assert!(close(d, 20f64.to_radians()));
    }

    #[test]
    fn test_deadband() {
        assert_eq!(deadband(0.05, 0.1), 0.0);
        assert_eq!(deadband(-0.09, 0.1), 0.0);
        assert!(close(deadband(1.0, 0.1), 1.0));
        assert!(close(deadband(-1.0, 0.1), -1.0));
        assert!(close(deadband(0.55, 0.1), 0.5));
    }

    #[test]
    fn test_logistic() {
        // Half way at the centre
        assert!(close(logistic(2.0, 3.0, 1.0, 2.0, 4.0), 2.0));

        // Close to the start value well before the centre, close to the end well after
        assert!((logistic(0.0, 3.0, 1.0, 2.0, 10.0) - 3.0).abs() < 1e-6);
        assert!((logistic(4.0, 3.0, 1.0, 2.0, 10.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_apply_floor() {
        assert_eq!(apply_floor(0.0, 0.2), 0.0);
        assert_eq!(apply_floor(0.05, 0.2), 0.2);
        assert_eq!(apply_floor(-0.05, 0.2), -0.2);
        assert_eq!(apply_floor(0.7, 0.2), 0.7);
    }
}
