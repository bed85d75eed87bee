use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::Serialize;

/// Reserved "deliberately unset" value for float targets. We will not be
/// asked to hold a temperature of -3.4e38 degrees before new physics is
/// invented, so the value can never collide with a real reading (0 can).
pub const NULL_TARGET_F64: f64 = -(f32::MAX as f64);

/// Reserved "deliberately unset" value for integer targets, same reasoning
/// as [`NULL_TARGET_F64`].
pub const NULL_TARGET_INT: i64 = i32::MIN as i64;

/// Returns true if a float field holds the null target rather than a reading.
pub fn is_null_f64(value: f64) -> bool {
    value == NULL_TARGET_F64
}

/// Returns true if an integer field holds the null target.
pub fn is_null_int(value: i64) -> bool {
    value == NULL_TARGET_INT
}

/// One decoded schedule row: the chamber conditions to hold from `datetime`
/// until the next timepoint fires.
///
/// Scalar fields hold either a real value or the documented null target,
/// never an ambiguous zero. `channels` always has one entry per channel
/// column discovered in the header.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimePoint {
    pub datetime: DateTime<FixedOffset>,
    #[serde(rename = "simDatetime")]
    pub sim_datetime: Option<DateTime<FixedOffset>>,
    pub temperature: f64,
    #[serde(rename = "relativeHumidity")]
    pub relative_humidity: f64,
    pub light1: i64,
    pub light2: i64,
    pub co2: f64,
    #[serde(rename = "totalSolar")]
    pub total_solar: f64,
    pub channels: Vec<f64>,
}

struct Nulled(f64);

impl fmt::Display for Nulled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if is_null_f64(self.0) {
            write!(f, "NULL")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

// Renders null targets as "NULL" so operator logs stay readable.
impl fmt::Display for TimePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{datetime: {}", self.datetime)?;
        match self.sim_datetime {
            Some(sim) => write!(f, ", sim: {sim}")?,
            None => write!(f, ", sim: NULL")?,
        }
        write!(f, ", temperature: {}", Nulled(self.temperature))?;
        write!(f, ", humidity: {}", Nulled(self.relative_humidity))?;
        if is_null_int(self.light1) {
            write!(f, ", light1: NULL")?;
        } else {
            write!(f, ", light1: {}", self.light1)?;
        }
        if is_null_int(self.light2) {
            write!(f, ", light2: NULL")?;
        } else {
            write!(f, ", light2: {}", self.light2)?;
        }
        write!(f, ", co2: {}", Nulled(self.co2))?;
        write!(f, ", totalsolar: {}", Nulled(self.total_solar))?;
        write!(f, ", channels: [")?;
        for (i, value) in self.channels.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", Nulled(*value))?;
        }
        write!(f, "]}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    #[test]
    fn null_targets_are_out_of_physical_range() {
        assert!(NULL_TARGET_F64 < -1e38);
        assert!(NULL_TARGET_INT < -2_000_000_000);
        assert!(!is_null_f64(0.0));
        assert!(!is_null_int(0));
    }

    #[test]
    fn display_substitutes_null_for_sentinels() {
        let point = TimePoint {
            datetime: FixedOffset::east_opt(0)
                .unwrap()
                .with_ymd_and_hms(2021, 6, 1, 8, 0, 0)
                .unwrap(),
            sim_datetime: None,
            temperature: 21.5,
            relative_humidity: NULL_TARGET_F64,
            light1: 400,
            light2: NULL_TARGET_INT,
            co2: NULL_TARGET_F64,
            total_solar: 0.0,
            channels: vec![1.0, NULL_TARGET_F64],
        };

        let repr = point.to_string();
        assert!(repr.contains("temperature: 21.5"));
        assert!(repr.contains("humidity: NULL"));
        assert!(repr.contains("light2: NULL"));
        assert!(repr.contains("totalsolar: 0"));
        assert_eq!(repr.matches("NULL").count(), 5);
    }
}
