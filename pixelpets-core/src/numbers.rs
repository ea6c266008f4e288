//! Numeric conversion helpers centralizing safe numeric casts.

use num_traits::cast::cast;

/// Scale a whole number of units by an integer percentage, flooring the result.
///
/// Integer arithmetic keeps `floor(units * pct / 100)` exact where a float
/// multiply (`3 * 0.8`) would not be.
#[must_use]
pub fn scale_units_floor(units: u32, pct: u32) -> i32 {
    let scaled = u64::from(units) * u64::from(pct) / 100;
    cast::<u64, i32>(scaled).unwrap_or(i32::MAX)
}

/// Whole non-negative units that fit in a u32, saturating on overflow.
#[must_use]
pub fn clamp_i64_to_u32(value: i64) -> u32 {
    if value <= 0 {
        return 0;
    }
    cast::<i64, u32>(value).unwrap_or(u32::MAX)
}

/// Arithmetic mean of a slice of stats, 0.0 when empty.
#[must_use]
pub fn mean_i32(values: &[i32]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let total: i64 = values.iter().map(|v| i64::from(*v)).sum();
    let len = cast::<usize, f64>(values.len()).unwrap_or(1.0);
    cast::<i64, f64>(total).unwrap_or(0.0) / len
}

/// Whole percentage `part / whole`, capped at 100. A zero `whole` counts as complete.
#[must_use]
pub fn percent_capped(part: u64, whole: u64) -> u8 {
    if whole == 0 {
        return 100;
    }
    let pct = u128::from(part) * 100 / u128::from(whole);
    cast::<u128, u8>(pct.min(100)).unwrap_or(100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaling_floors_exactly() {
        assert_eq!(scale_units_floor(3, 80), 2);
        assert_eq!(scale_units_floor(3, 50), 1);
        assert_eq!(scale_units_floor(10, 30), 3);
        assert_eq!(scale_units_floor(0, 100), 0);
        assert_eq!(scale_units_floor(u32::MAX, 100), i32::MAX);
    }

    #[test]
    fn clamps_cover_ranges() {
        assert_eq!(clamp_i64_to_u32(-5), 0);
        assert_eq!(clamp_i64_to_u32(i64::MAX), u32::MAX);
    }

    #[test]
    fn mean_and_percent() {
        assert!((mean_i32(&[50, 100]) - 75.0).abs() < f64::EPSILON);
        assert!(mean_i32(&[]).abs() < f64::EPSILON);
        assert_eq!(percent_capped(50, 200), 25);
        assert_eq!(percent_capped(500, 200), 100);
        assert_eq!(percent_capped(1, 0), 100);
    }
}
