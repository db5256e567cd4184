//! Easing curves
//!
//! Input is the fraction of elapsed move time (0.0 to 1.0), output is the
//! fraction of completed movement: 0.0 at the start position, 1.0 at the
//! end position. Back and elastic overshoot below 0.0 and above 1.0.
//!
//! Only the "in" shape is implemented here; out, in-out and bouncing shapes
//! are derived by the call style (see [`CallStyle`](super::CallStyle)).
//! Bounce is the exception: its canonical form is the "out" shape.

use core::f32::consts::{FRAC_PI_2, PI};

/// Signature of an easing curve, including user supplied ones
pub type EaseFn = fn(f32) -> f32;

/// Offset marking an easing result as a direct degree instead of a fraction
///
/// A curve returning `EASE_FUNCTION_DEGREE_INDICATOR_OFFSET + 90.0` moves
/// the servo to 90 degree regardless of start and end position.
pub const EASE_FUNCTION_DEGREE_INDICATOR_OFFSET: f32 = 200.0;

/// Results at or above this value are treated as direct degrees
pub const EASE_FUNCTION_DEGREE_THRESHOLD: f32 = EASE_FUNCTION_DEGREE_INDICATOR_OFFSET / 2.0;

/// `t²`
pub fn quadratic_in(t: f32) -> f32 {
    t * t
}

/// `t³`
pub fn cubic_in(t: f32) -> f32 {
    t * quadratic_in(t)
}

/// `t⁴`
pub fn quartic_in(t: f32) -> f32 {
    quadratic_in(quadratic_in(t))
}

/// Negative cosine of the first quadrant, behaves almost like quadratic
pub fn sine_in(t: f32) -> f32 {
    libm::sinf((t - 1.0) * FRAC_PI_2) + 1.0
}

/// Quarter circle, very fast towards the end
pub fn circular_in(t: f32) -> f32 {
    1.0 - libm::sqrtf(1.0 - t * t)
}

/// Pulls back below the start before moving
pub fn back_in(t: f32) -> f32 {
    t * t * t - t * libm::sinf(t * PI)
}

/// Oscillates with growing amplitude around the start
pub fn elastic_in(t: f32) -> f32 {
    libm::sinf(13.0 * FRAC_PI_2 * t) * libm::powf(2.0, 10.0 * (t - 1.0))
}

/// Bouncing arrival at the end position ("out" shape)
///
/// Four parabolic segments split at 4/11, 8/11 and 9/10.
pub fn bounce_out(t: f32) -> f32 {
    if t < 4.0 / 11.0 {
        (121.0 * t * t) / 16.0
    } else if t < 8.0 / 11.0 {
        (363.0 / 40.0 * t * t) - (99.0 / 10.0 * t) + 17.0 / 5.0
    } else if t < 9.0 / 10.0 {
        (4356.0 / 361.0 * t * t) - (35442.0 / 1805.0 * t) + 16061.0 / 1805.0
    } else {
        (54.0 / 5.0 * t * t) - (513.0 / 25.0 * t) + 268.0 / 25.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const EPSILON: f32 = 1e-3;

    const ALL: [(&str, EaseFn); 8] = [
        ("quadratic", quadratic_in),
        ("cubic", cubic_in),
        ("quartic", quartic_in),
        ("sine", sine_in),
        ("circular", circular_in),
        ("back", back_in),
        ("elastic", elastic_in),
        ("bounce", bounce_out),
    ];

    const MONOTONIC: [EaseFn; 5] = [quadratic_in, cubic_in, quartic_in, sine_in, circular_in];

    #[test]
    fn test_end_points() {
        for (name, f) in ALL {
            assert!(f(0.0).abs() < EPSILON, "{} at 0.0 = {}", name, f(0.0));
            assert!((f(1.0) - 1.0).abs() < EPSILON, "{} at 1.0 = {}", name, f(1.0));
        }
    }

    #[test]
    fn test_polynomials() {
        assert_eq!(quadratic_in(0.5), 0.25);
        assert_eq!(cubic_in(0.5), 0.125);
        assert_eq!(quartic_in(0.5), 0.0625);
    }

    #[test]
    fn test_sine_close_to_quadratic() {
        let mid = sine_in(0.5);
        assert!((mid - 0.2929).abs() < EPSILON);
    }

    #[test]
    fn test_back_overshoots_below_start() {
        let min = (1..100)
            .map(|i| back_in(i as f32 / 100.0))
            .fold(f32::MAX, f32::min);
        assert!(min < 0.0);
    }

    #[test]
    fn test_elastic_oscillates() {
        let samples = (1..100).map(|i| elastic_in(i as f32 / 100.0));
        let negatives = samples.filter(|v| *v < 0.0).count();
        assert!(negatives > 0);
    }

    #[test]
    fn test_bounce_continuous_at_breakpoints() {
        for bp in [4.0 / 11.0, 8.0 / 11.0, 9.0 / 10.0f32] {
            let left = bounce_out(bp - 1e-4);
            let right = bounce_out(bp + 1e-4);
            assert!((left - right).abs() < 0.01, "jump at {}", bp);
        }
        // Each segment touches 1.0 at its breakpoint
        assert!((bounce_out(4.0 / 11.0) - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_degree_threshold() {
        assert_eq!(EASE_FUNCTION_DEGREE_THRESHOLD, 100.0);
        assert!(bounce_out(1.0) < EASE_FUNCTION_DEGREE_THRESHOLD);
    }

    proptest! {
        #[test]
        fn prop_monotonic_curves(a in 0.0f32..=1.0, b in 0.0f32..=1.0) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            for f in MONOTONIC {
                prop_assert!(f(lo) <= f(hi) + 1e-6);
            }
        }

        #[test]
        fn prop_bounce_stays_in_range(t in 0.0f32..=1.0) {
            let v = bounce_out(t);
            prop_assert!(v >= -EPSILON && v <= 1.0 + EPSILON);
        }
    }
}
