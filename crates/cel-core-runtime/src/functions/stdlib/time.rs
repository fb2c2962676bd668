//! Timestamp and duration accessors.
//!
//! Timestamp accessors read the instant in UTC, or in the timezone named by
//! an optional second argument (IANA name or fixed offset such as
//! `"+05:30"`).

use std::sync::Arc;

use chrono::{DateTime, Datelike, FixedOffset, Timelike};

use crate::functions::{FunctionDescriptor, Overload};
use crate::value::{Duration, EvalError, Timestamp, Value, ValueKind as K};

type TimestampAccessor = fn(&DateTime<FixedOffset>) -> i64;

const TIMESTAMP_ACCESSORS: [(&str, TimestampAccessor); 10] = [
    ("getFullYear", |dt| dt.year() as i64),
    ("getMonth", |dt| dt.month0() as i64),
    ("getDate", |dt| dt.day() as i64),
    ("getDayOfMonth", |dt| dt.day0() as i64),
    ("getDayOfWeek", |dt| dt.weekday().num_days_from_sunday() as i64),
    ("getDayOfYear", |dt| dt.ordinal0() as i64),
    ("getHours", |dt| dt.hour() as i64),
    ("getMinutes", |dt| dt.minute() as i64),
    ("getSeconds", |dt| dt.second() as i64),
    ("getMilliseconds", |dt| (dt.nanosecond() / 1_000_000) as i64),
];

/// Every duration accessor reads the whole duration in its unit.
const DURATION_ACCESSORS: [(&str, fn(&Duration) -> i64); 4] = [
    ("getHours", |d| d.seconds / 3_600),
    ("getMinutes", |d| d.seconds / 60),
    ("getSeconds", |d| d.seconds),
    ("getMilliseconds", |d| d.seconds * 1_000 + d.nanos as i64 / 1_000_000),
];

pub(super) fn register(out: &mut Vec<Overload>) {
    for (name, accessor) in TIMESTAMP_ACCESSORS {
        out.push(Overload::new(
            format!("timestamp_{}", name),
            FunctionDescriptor::new(name, true, vec![K::Timestamp]),
            Arc::new(move |args: &[Value]| match args {
                [Value::Timestamp(ts)] => read_timestamp(ts, "UTC", accessor),
                _ => Value::error(EvalError::no_matching_overload(name)),
            }),
        ));
        out.push(Overload::new(
            format!("timestamp_{}_with_tz", name),
            FunctionDescriptor::new(name, true, vec![K::Timestamp, K::String]),
            Arc::new(move |args: &[Value]| match args {
                [Value::Timestamp(ts), Value::String(zone)] => read_timestamp(ts, zone, accessor),
                _ => Value::error(EvalError::no_matching_overload(name)),
            }),
        ));
    }
    for (name, accessor) in DURATION_ACCESSORS {
        out.push(Overload::new(
            format!("duration_{}", name),
            FunctionDescriptor::new(name, true, vec![K::Duration]),
            Arc::new(move |args: &[Value]| match args {
                [Value::Duration(d)] => Value::Int(accessor(d)),
                _ => Value::error(EvalError::no_matching_overload(name)),
            }),
        ));
    }
}

fn read_timestamp(ts: &Timestamp, zone: &str, accessor: TimestampAccessor) -> Value {
    match ts.in_zone(zone) {
        Ok(local) => Value::Int(accessor(&local)),
        Err(err) => Value::error(err),
    }
}
