//! Conversions between `std::time::Duration` and `google.protobuf.Duration`.
//!
//! Missing or negative wire durations read as zero, which the bridge treats
//! as "no value" for every duration it carries.

use std::time::Duration;

/// Encode a duration for the wire, saturating at the protobuf maximum.
pub fn to_proto(value: Duration) -> prost_types::Duration {
    prost_types::Duration::try_from(value).unwrap_or(prost_types::Duration {
        seconds: i64::MAX,
        nanos: 999_999_999,
    })
}

/// Decode an optional wire duration.
pub fn from_proto(value: Option<prost_types::Duration>) -> Duration {
    value
        .and_then(|d| Duration::try_from(d).ok())
        .unwrap_or_default()
}
