//! Timestamps and durations.
//!
//! Timestamps cover the years 0001 to 9999 and read and print as RFC 3339.
//! Durations are bounded to about ten thousand years and read as a sequence
//! of decimal amounts with units (`1h30m`, `-1.5s`, `250ms`), printing as
//! seconds (`5400.25s`).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, Offset, Utc};
use chrono_tz::Tz;

use super::EvalError;

const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Seconds of `0001-01-01T00:00:00Z`.
const MIN_TIMESTAMP_SECONDS: i64 = -62_135_596_800;
/// Seconds of `9999-12-31T23:59:59Z`.
const MAX_TIMESTAMP_SECONDS: i64 = 253_402_300_799;
/// About ten thousand years, in seconds.
const MAX_DURATION_SECONDS: i64 = 315_576_000_000;

/// An instant, as seconds and nanoseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    pub seconds: i64,
    /// Always in `0..1_000_000_000`.
    pub nanos: i32,
}

impl Timestamp {
    pub fn new(seconds: i64, nanos: i32) -> Self {
        Self { seconds, nanos }
    }

    pub fn from_seconds(seconds: i64) -> Self {
        Self { seconds, nanos: 0 }
    }

    /// True if the timestamp lies in the years 0001 to 9999.
    pub fn is_valid(&self) -> bool {
        (MIN_TIMESTAMP_SECONDS..=MAX_TIMESTAMP_SECONDS).contains(&self.seconds)
            && (0..NANOS_PER_SECOND as i32).contains(&self.nanos)
    }

    pub fn to_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.seconds, u32::try_from(self.nanos).ok()?)
    }

    /// The instant as a local time in `zone`: an IANA name such as
    /// `"Europe/Paris"` or a fixed offset such as `"-05:30"` or `"02:00"`.
    pub(crate) fn in_zone(&self, zone: &str) -> Result<DateTime<FixedOffset>, EvalError> {
        let utc = self
            .to_utc()
            .ok_or_else(|| EvalError::range_error("timestamp out of range"))?;
        if let Ok(tz) = zone.parse::<Tz>() {
            let local = utc.with_timezone(&tz);
            let offset = local.offset().fix();
            return Ok(local.with_timezone(&offset));
        }
        let offset = fixed_offset(zone)
            .ok_or_else(|| EvalError::invalid_argument(format!("unknown timezone '{}'", zone)))?;
        Ok(utc.with_timezone(&offset))
    }

    /// Shift by a duration, failing on overflow or when leaving the valid range.
    pub fn checked_add(&self, d: &Duration) -> Option<Timestamp> {
        let total = self.total_nanos() + d.total_nanos();
        let ts = Timestamp::new(
            i64::try_from(total.div_euclid(NANOS_PER_SECOND as i128)).ok()?,
            total.rem_euclid(NANOS_PER_SECOND as i128) as i32,
        );
        ts.is_valid().then_some(ts)
    }

    pub fn checked_sub(&self, d: &Duration) -> Option<Timestamp> {
        self.checked_add(&d.checked_neg()?)
    }

    /// The duration from `other` to `self`.
    pub fn checked_diff(&self, other: &Timestamp) -> Option<Duration> {
        Duration::from_total_nanos(self.total_nanos() - other.total_nanos())
    }

    fn total_nanos(&self) -> i128 {
        self.seconds as i128 * NANOS_PER_SECOND as i128 + self.nanos as i128
    }
}

impl FromStr for Timestamp {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed = DateTime::parse_from_rfc3339(s).map_err(|e| {
            EvalError::invalid_argument(format!("invalid timestamp '{}': {}", s, e))
        })?;
        let ts = Timestamp::new(parsed.timestamp(), parsed.timestamp_subsec_nanos() as i32);
        if !ts.is_valid() {
            return Err(EvalError::range_error(format!("timestamp '{}' out of range", s)));
        }
        Ok(ts)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(utc) = self.to_utc() else {
            return write!(f, "{}s", self.seconds);
        };
        write!(f, "{}", utc.format("%Y-%m-%dT%H:%M:%S"))?;
        write_fraction(f, self.nanos.unsigned_abs())?;
        f.write_str("Z")
    }
}

/// A signed span of time. Both components share the sign of the whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Duration {
    pub seconds: i64,
    pub nanos: i32,
}

impl Duration {
    pub fn new(seconds: i64, nanos: i32) -> Self {
        Self { seconds, nanos }
    }

    pub fn from_seconds(seconds: i64) -> Self {
        Self { seconds, nanos: 0 }
    }

    /// `None` when the total is outside the valid range.
    fn from_total_nanos(total: i128) -> Option<Duration> {
        let seconds = i64::try_from(total / NANOS_PER_SECOND as i128).ok()?;
        let d = Duration::new(seconds, (total % NANOS_PER_SECOND as i128) as i32);
        d.is_valid().then_some(d)
    }

    fn total_nanos(&self) -> i128 {
        self.seconds as i128 * NANOS_PER_SECOND as i128 + self.nanos as i128
    }

    pub fn is_valid(&self) -> bool {
        self.seconds.abs() <= MAX_DURATION_SECONDS
    }

    pub fn checked_add(&self, other: &Duration) -> Option<Duration> {
        Duration::from_total_nanos(self.total_nanos() + other.total_nanos())
    }

    pub fn checked_sub(&self, other: &Duration) -> Option<Duration> {
        Duration::from_total_nanos(self.total_nanos() - other.total_nanos())
    }

    pub fn checked_neg(&self) -> Option<Duration> {
        Duration::from_total_nanos(-self.total_nanos())
    }
}

impl FromStr for Duration {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || EvalError::invalid_argument(format!("invalid duration '{}'", s));
        let (sign, mut rest) = match s.strip_prefix('-') {
            Some(rest) => (-1, rest),
            None => (1, s.strip_prefix('+').unwrap_or(s)),
        };
        if rest.is_empty() {
            return Err(invalid());
        }
        let mut total: i128 = 0;
        while !rest.is_empty() {
            let (nanos, tail) = duration_term(rest).ok_or_else(invalid)?;
            total = total.checked_add(nanos).ok_or_else(invalid)?;
            rest = tail;
        }
        Duration::from_total_nanos(sign * total)
            .ok_or_else(|| EvalError::range_error(format!("duration '{}' out of range", s)))
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.total_nanos();
        if total < 0 {
            f.write_str("-")?;
        }
        let total = total.unsigned_abs();
        write!(f, "{}", total / NANOS_PER_SECOND as u128)?;
        write_fraction(f, (total % NANOS_PER_SECOND as u128) as u32)?;
        f.write_str("s")
    }
}

/// `.` and the significant digits of a nanosecond count; nothing for zero.
fn write_fraction(f: &mut fmt::Formatter<'_>, nanos: u32) -> fmt::Result {
    if nanos == 0 {
        return Ok(());
    }
    let digits = format!("{:09}", nanos);
    write!(f, ".{}", digits.trim_end_matches('0'))
}

/// One `<decimal><unit>` term of a duration, in nanoseconds, plus the
/// unconsumed input. The fraction is scaled exactly, without floats.
fn duration_term(s: &str) -> Option<(i128, &str)> {
    let number_len = s
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(s.len());
    let (number, rest) = s.split_at(number_len);
    let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }

    let (unit, rest): (i128, &str) = [
        ("ns", 1),
        ("us", 1_000),
        ("\u{00b5}s", 1_000),
        ("ms", 1_000_000),
        ("s", 1_000_000_000),
        ("m", 60_000_000_000),
        ("h", 3_600_000_000_000),
    ]
    .into_iter()
    .find_map(|(suffix, scale)| rest.strip_prefix(suffix).map(|tail| (scale, tail)))?;

    let whole: i128 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let mut nanos = whole.checked_mul(unit)?;
    let mut scale = unit;
    for digit in fraction.chars() {
        scale /= 10;
        nanos += digit.to_digit(10)? as i128 * scale;
    }
    Some((nanos, rest))
}

/// `[+-]HH:MM`, with a missing sign read as east of UTC.
fn fixed_offset(zone: &str) -> Option<FixedOffset> {
    let (sign, rest) = match zone.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, zone.strip_prefix('+').unwrap_or(zone)),
    };
    let (hours, minutes) = rest.split_once(':')?;
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if !(0..60).contains(&minutes) {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}
