use crate::error::SchemaError;

/// Header labels the schema mapper recognises. Matching is exact and
/// case-sensitive after trimming surrounding whitespace and commas.
pub const HEADER_DATETIME: &str = "datetime";
pub const HEADER_SIM_DATETIME: &str = "datetime-sim";
pub const HEADER_TEMPERATURE: &str = "temperature";
pub const HEADER_HUMIDITY: &str = "humidity";
pub const HEADER_LIGHT1: &str = "light1";
pub const HEADER_LIGHT2: &str = "light2";
pub const HEADER_CO2: &str = "co2";
pub const HEADER_TOTAL_SOLAR: &str = "totalsolar";

fn channel_label(n: usize) -> String {
    format!("channel-{n}")
}

/// Column positions resolved from one schedule header row.
///
/// A value object: resolving a second header row produces a fresh set of
/// indices with no residue from the first. `datetime` is the only column a
/// schedule cannot function without.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIndices {
    pub datetime: usize,
    pub sim_datetime: Option<usize>,
    pub temperature: Option<usize>,
    pub humidity: Option<usize>,
    pub light1: Option<usize>,
    pub light2: Option<usize>,
    pub co2: Option<usize>,
    pub total_solar: Option<usize>,
    /// Positions of `channel-1..channel-k`, ascending. Discovery probes
    /// labels starting at 1 and stops at the first gap: the channels need
    /// not be adjacent in the row, but their numbering must be contiguous.
    pub channels: Vec<usize>,
}

fn position(headers: &[String], label: &str) -> Option<usize> {
    headers
        .iter()
        .position(|header| header.trim_matches(|c: char| c.is_whitespace() || c == ',') == label)
}

impl FieldIndices {
    pub fn resolve(headers: &[String]) -> Result<Self, SchemaError> {
        let datetime =
            position(headers, HEADER_DATETIME).ok_or(SchemaError::MissingDatetimeColumn)?;

        let mut channels = Vec::new();
        let mut n = 1;
        while let Some(idx) = position(headers, &channel_label(n)) {
            channels.push(idx);
            n += 1;
        }

        Ok(Self {
            datetime,
            sim_datetime: position(headers, HEADER_SIM_DATETIME),
            temperature: position(headers, HEADER_TEMPERATURE),
            humidity: position(headers, HEADER_HUMIDITY),
            light1: position(headers, HEADER_LIGHT1),
            light2: position(headers, HEADER_LIGHT2),
            co2: position(headers, HEADER_CO2),
            total_solar: position(headers, HEADER_TOTAL_SOLAR),
            channels,
        })
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn headers(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn resolves_all_scalar_fields() {
        let indices = FieldIndices::resolve(&headers(&[
            "datetime",
            "datetime-sim",
            "temperature",
            "humidity",
            "light1",
            "light2",
            "co2",
            "totalsolar",
        ]))
        .unwrap();

        assert_eq!(indices.datetime, 0);
        assert_eq!(indices.sim_datetime, Some(1));
        assert_eq!(indices.temperature, Some(2));
        assert_eq!(indices.humidity, Some(3));
        assert_eq!(indices.light1, Some(4));
        assert_eq!(indices.light2, Some(5));
        assert_eq!(indices.co2, Some(6));
        assert_eq!(indices.total_solar, Some(7));
        assert!(indices.channels.is_empty());
    }

    #[test]
    fn missing_datetime_is_fatal() {
        let err = FieldIndices::resolve(&headers(&["temperature", "humidity"])).unwrap_err();
        assert!(matches!(err, SchemaError::MissingDatetimeColumn));
    }

    #[test]
    fn discovers_channels_interspersed_with_unrelated_columns() {
        let indices = FieldIndices::resolve(&headers(&[
            "channel-2",
            "datetime",
            "channel-1",
            "note",
            "channel-3",
        ]))
        .unwrap();

        assert_eq!(indices.channels, vec![2, 0, 4]);
    }

    #[test]
    fn channel_gap_stops_discovery() {
        // channel-2 is absent, so channel-3 is never considered.
        let indices =
            FieldIndices::resolve(&headers(&["datetime", "channel-1", "channel-3"])).unwrap();
        assert_eq!(indices.channels, vec![1]);
    }

    #[test]
    fn headers_are_trimmed_of_whitespace_and_commas() {
        let indices =
            FieldIndices::resolve(&headers(&[" datetime ", "\ttemperature,", "humidity\n"]))
                .unwrap();
        assert_eq!(indices.datetime, 0);
        assert_eq!(indices.temperature, Some(1));
        assert_eq!(indices.humidity, Some(2));
    }

    #[test]
    fn matching_is_case_sensitive() {
        assert!(FieldIndices::resolve(&headers(&["Datetime"])).is_err());
    }

    #[test]
    fn second_resolution_carries_no_residue() {
        let first =
            FieldIndices::resolve(&headers(&["datetime", "temperature", "channel-1"])).unwrap();
        assert_eq!(first.channels, vec![2]);
        assert_eq!(first.temperature, Some(1));

        let second = FieldIndices::resolve(&headers(&["humidity", "datetime"])).unwrap();
        assert_eq!(second.datetime, 1);
        assert_eq!(second.humidity, Some(0));
        assert_eq!(second.temperature, None);
        assert!(second.channels.is_empty());
    }
}
