//! Exact comparisons between the three numeric kinds.
//!
//! No comparison goes through a lossy cast: a double is split into its
//! integral and fractional parts before it meets an integer.

use std::cmp::Ordering;

/// 2^63 as a double, the first value above `i64::MAX`.
const TWO_POW_63: f64 = 9_223_372_036_854_775_808.0;
/// 2^64 as a double, the first value above `u64::MAX`.
const TWO_POW_64: f64 = 18_446_744_073_709_551_616.0;

pub(crate) fn compare_int_uint(a: i64, b: u64) -> Ordering {
    match u64::try_from(a) {
        Ok(a) => a.cmp(&b),
        Err(_) => Ordering::Less,
    }
}

pub(crate) fn compare_int_double(a: i64, b: f64) -> Option<Ordering> {
    if b.is_nan() {
        return None;
    }
    if b >= TWO_POW_63 {
        return Some(Ordering::Less);
    }
    if b < -TWO_POW_63 {
        return Some(Ordering::Greater);
    }
    // In range, so the truncation is exact.
    let integral = b.trunc() as i64;
    Some(a.cmp(&integral).then_with(|| fraction_ordering(b)))
}

pub(crate) fn compare_uint_double(a: u64, b: f64) -> Option<Ordering> {
    if b.is_nan() {
        return None;
    }
    if b < 0.0 {
        return Some(Ordering::Greater);
    }
    if b >= TWO_POW_64 {
        return Some(Ordering::Less);
    }
    let integral = b.trunc() as u64;
    Some(a.cmp(&integral).then_with(|| fraction_ordering(b)))
}

/// Ordering of an integer equal to `trunc(b)` against `b` itself.
fn fraction_ordering(b: f64) -> Ordering {
    let fract = b.fract();
    if fract > 0.0 {
        Ordering::Less
    } else if fract < 0.0 {
        Ordering::Greater
    } else {
        Ordering::Equal
    }
}

/// Returns the double as an `i64` if it holds an exact integer in range.
pub(crate) fn double_as_int(d: f64) -> Option<i64> {
    (d.fract() == 0.0 && (-TWO_POW_63..TWO_POW_63).contains(&d)).then(|| d as i64)
}

/// Returns the double as a `u64` if it holds an exact integer in range.
pub(crate) fn double_as_uint(d: f64) -> Option<u64> {
    (d.fract() == 0.0 && (0.0..TWO_POW_64).contains(&d)).then(|| d as u64)
}
