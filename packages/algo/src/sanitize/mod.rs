//! Data Sanitization
//!
//! Numerical guards shared by every policy module. Scores leaving this crate
//! are always finite and, where the domain says so, inside `[0, 1]`.

/// Clamp a score into `[0, 1]`; NaN collapses to `0.0`.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

/// Replace NaN/Inf with `fallback`.
pub fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

/// Counters read back from storage are never trusted to be non-negative.
pub fn non_negative(count: i64) -> f64 {
    count.max(0) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_unit_bounds() {
        assert_eq!(clamp_unit(-0.3), 0.0);
        assert_eq!(clamp_unit(1.7), 1.0);
        assert_eq!(clamp_unit(0.42), 0.42);
        assert_eq!(clamp_unit(f64::NAN), 0.0);
        assert_eq!(clamp_unit(f64::INFINITY), 1.0);
    }

    #[test]
    fn test_finite_or() {
        assert_eq!(finite_or(f64::NAN, 0.5), 0.5);
        assert_eq!(finite_or(f64::NEG_INFINITY, 0.0), 0.0);
        assert_eq!(finite_or(3.0, 0.0), 3.0);
    }

    #[test]
    fn test_non_negative() {
        assert_eq!(non_negative(-4), 0.0);
        assert_eq!(non_negative(7), 7.0);
    }
}
