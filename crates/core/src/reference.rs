//! Software escape-time computation in single precision.
//!
//! The accelerator iterates in binary32, so comparing against an `f64`
//! reference would disagree near the set boundary. Both this reference and
//! the behavioral [`crate::sim::Simulator`] go through [`step`] and
//! [`escaped`], which keeps cross-validation bit-exact.

/// Escape threshold on |z|², i.e. |z| > 2.
pub const ESCAPE_RADIUS_SQUARED: f32 = 4.0;

/// One application of z ← z² + c.
#[inline]
pub fn step(zr: f32, zi: f32, cr: f32, ci: f32) -> (f32, f32) {
    let zr2 = zr * zr;
    let zi2 = zi * zi;
    let zrzi = zr * zi;
    (zr2 - zi2 + cr, zrzi + zrzi + ci)
}

/// Whether `z` lies outside the escape circle.
#[inline]
pub fn escaped(zr: f32, zi: f32) -> bool {
    zr * zr + zi * zi > ESCAPE_RADIUS_SQUARED
}

/// Number of iterations from z = 0 until |z| > 2, capped at `max_iterations`.
///
/// The iteration that first leaves the circle is counted, so a point with
/// |c| > 2 returns 1.
pub fn escape_time(cr: f32, ci: f32, max_iterations: u32) -> u32 {
    let (mut zr, mut zi) = (0.0f32, 0.0f32);
    for n in 1..=max_iterations {
        (zr, zi) = step(zr, zi, cr, ci);
        if escaped(zr, zi) {
            return n;
        }
    }
    max_iterations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_points() {
        assert_eq!(escape_time(-2.0, 0.0, 32), 32);
        assert_eq!(escape_time(-2.01, 0.0, 32), 1);
        assert_eq!(escape_time(0.0, 0.0, 32), 32);
        assert_eq!(escape_time(1.2, 1.4, 32), 2);
        assert_eq!(escape_time(-1.0, -0.5, 32), 5);
        assert_eq!(escape_time(-0.2, 0.8333333, 32), 20);
    }

    #[test]
    fn test_zero_budget() {
        assert_eq!(escape_time(5.0, 5.0, 0), 0);
    }

    #[test]
    fn test_boundary_is_not_escaped() {
        // |z| == 2 exactly stays inside
        assert!(!escaped(-2.0, 0.0));
        assert!(escaped(-2.0, 0.001));
    }
}
