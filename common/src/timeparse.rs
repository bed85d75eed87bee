use chrono::{DateTime, Duration, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::DecodeError;

// Day-first resolution: "03/04/2021" is the 3rd of April. Month-first
// layouts are deliberately absent from these lists.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
    "%d/%m/%y %H:%M:%S",
    "%d/%m/%y %H:%M",
    "%d %b %Y %H:%M:%S",
    "%d %b %Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%d %b %Y"];

/// Timezone context for interpreting schedule timestamps that carry no
/// explicit offset. Captured once at startup, fixed for the whole run.
#[derive(Debug, Clone, Copy)]
pub struct TimeContext {
    offset: FixedOffset,
}

impl TimeContext {
    /// Context using the process's local zone offset.
    pub fn local() -> Self {
        Self {
            offset: *Local::now().offset(),
        }
    }

    pub fn with_offset(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Attaches the context offset to a naive timestamp (e.g. from a typed
    /// spreadsheet cell).
    pub fn resolve_naive(&self, naive: NaiveDateTime) -> DateTime<FixedOffset> {
        let utc = naive - Duration::seconds(i64::from(self.offset.local_minus_utc()));
        DateTime::from_naive_utc_and_offset(utc, self.offset)
    }

    /// Lenient datetime extraction from free-form text. Prefers day-first
    /// interpretation for ambiguous dates; an explicit offset in the text
    /// wins, otherwise the context offset applies. Date-only text resolves
    /// to midnight.
    pub fn parse(&self, text: &str) -> Result<DateTime<FixedOffset>, DecodeError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(DecodeError::Datetime {
                value: text.to_string(),
            });
        }

        if let Ok(datetime) = DateTime::parse_from_rfc3339(trimmed) {
            return Ok(datetime);
        }

        for format in DATETIME_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
                return Ok(self.resolve_naive(naive));
            }
        }

        for format in DATE_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
                return Ok(self.resolve_naive(date.and_time(NaiveTime::MIN)));
            }
        }

        Err(DecodeError::Datetime {
            value: text.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone, Timelike};
    use pretty_assertions::assert_eq;

    fn ctx() -> TimeContext {
        TimeContext::with_offset(FixedOffset::east_opt(10 * 3600).unwrap())
    }

    #[test]
    fn parses_iso_datetime_with_context_offset() {
        let parsed = ctx().parse("2021-06-01 08:30:00").unwrap();
        let expected = FixedOffset::east_opt(10 * 3600)
            .unwrap()
            .with_ymd_and_hms(2021, 6, 1, 8, 30, 0)
            .unwrap();
        assert_eq!(parsed, expected);
    }

    #[test]
    fn ambiguous_slash_date_is_day_first() {
        let parsed = ctx().parse("03/04/2021 12:00").unwrap();
        assert_eq!(parsed.day(), 3);
        assert_eq!(parsed.month(), 4);
    }

    #[test]
    fn explicit_offset_in_text_wins() {
        let parsed = ctx().parse("2021-06-01T08:00:00+02:00").unwrap();
        assert_eq!(parsed.offset().local_minus_utc(), 2 * 3600);
    }

    #[test]
    fn date_only_resolves_to_midnight() {
        let parsed = ctx().parse("14/02/2022").unwrap();
        assert_eq!(parsed.hour(), 0);
        assert_eq!(parsed.day(), 14);
        assert_eq!(parsed.month(), 2);
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(ctx().parse("not a time").is_err());
        assert!(ctx().parse("").is_err());
    }

    #[test]
    fn surrounding_whitespace_is_tolerated() {
        let parsed = ctx().parse("  2021-06-01 08:00:00\t").unwrap();
        assert_eq!(parsed.hour(), 8);
    }
}
