use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use crate::error::DecodeError;
use crate::schema::FieldIndices;
use crate::timeparse::TimeContext;
use crate::types::{TimePoint, NULL_TARGET_F64, NULL_TARGET_INT};

static MATCH_FLOAT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[-+]?(?:\d+(?:\.\d*)?|\.\d+)").expect("float regex"));

/// One cell of a schedule row. CSV sources produce `Text`/`Empty`;
/// spreadsheet sources may additionally produce typed `Number` and
/// `DateTime` cells, which skip text extraction entirely.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    DateTime(NaiveDateTime),
}

impl Cell {
    pub fn text(text: impl Into<String>) -> Self {
        let text = text.into();
        if text.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(text)
        }
    }
}

/// Pulls the first decimal number out of free-form text, tolerating unit
/// suffixes and other trailing junk ("21.5C" decodes as 21.5).
fn extract_float(text: &str) -> Option<f64> {
    MATCH_FLOAT
        .find(text)
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

fn is_null_text(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.is_empty() || trimmed == "NULL"
}

fn float_field(cells: &[Cell], idx: Option<usize>, field: &'static str) -> Result<f64, DecodeError> {
    let Some(idx) = idx else {
        return Ok(NULL_TARGET_F64);
    };
    match cells.get(idx) {
        None | Some(Cell::Empty) => Ok(NULL_TARGET_F64),
        Some(Cell::Number(value)) => Ok(*value),
        Some(Cell::Text(text)) => {
            if is_null_text(text) {
                return Ok(NULL_TARGET_F64);
            }
            extract_float(text).ok_or_else(|| DecodeError::Numeric {
                field,
                value: text.clone(),
            })
        }
        Some(Cell::DateTime(dt)) => Err(DecodeError::Numeric {
            field,
            value: dt.to_string(),
        }),
    }
}

fn int_field(cells: &[Cell], idx: Option<usize>, field: &'static str) -> Result<i64, DecodeError> {
    let Some(idx) = idx else {
        return Ok(NULL_TARGET_INT);
    };
    match cells.get(idx) {
        None | Some(Cell::Empty) => Ok(NULL_TARGET_INT),
        Some(Cell::Number(value)) => Ok(*value as i64),
        Some(Cell::Text(text)) => {
            if is_null_text(text) {
                return Ok(NULL_TARGET_INT);
            }
            text.trim().parse::<i64>().map_err(|_| DecodeError::Numeric {
                field,
                value: text.clone(),
            })
        }
        Some(Cell::DateTime(dt)) => Err(DecodeError::Numeric {
            field,
            value: dt.to_string(),
        }),
    }
}

impl TimePoint {
    /// Decodes one data row against the resolved column indices.
    ///
    /// A failed datetime or scalar parse fails the whole row; the sim
    /// datetime and individual channels degrade to their null/unset values
    /// instead, so one bad channel cell cannot drop a whole timepoint.
    pub fn from_cells(
        indices: &FieldIndices,
        cells: &[Cell],
        ctx: &TimeContext,
    ) -> Result<Self, DecodeError> {
        let datetime = match cells.get(indices.datetime) {
            Some(Cell::DateTime(naive)) => ctx.resolve_naive(*naive),
            Some(Cell::Text(text)) => ctx.parse(text)?,
            _ => {
                return Err(DecodeError::Datetime {
                    value: String::new(),
                })
            }
        };

        let sim_datetime = indices.sim_datetime.and_then(|idx| match cells.get(idx) {
            Some(Cell::DateTime(naive)) => Some(ctx.resolve_naive(*naive)),
            Some(Cell::Text(text)) => match ctx.parse(text) {
                Ok(parsed) => Some(parsed),
                Err(err) => {
                    warn!("could not decode sim datetime: {err}");
                    None
                }
            },
            _ => None,
        });

        let mut channels = Vec::with_capacity(indices.channels.len());
        for (n, &idx) in indices.channels.iter().enumerate() {
            let value = match float_field(cells, Some(idx), "channel") {
                Ok(value) => value,
                Err(err) => {
                    // A bad channel cell gets the null target; the rest of
                    // the row still decodes.
                    warn!(channel = n + 1, "substituting null target: {err}");
                    NULL_TARGET_F64
                }
            };
            channels.push(value);
        }

        Ok(Self {
            datetime,
            sim_datetime,
            temperature: float_field(cells, indices.temperature, "temperature")?,
            relative_humidity: float_field(cells, indices.humidity, "humidity")?,
            light1: int_field(cells, indices.light1, "light1")?,
            light2: int_field(cells, indices.light2, "light2")?,
            co2: float_field(cells, indices.co2, "co2")?,
            total_solar: float_field(cells, indices.total_solar, "totalsolar")?,
            channels,
        })
    }
}
