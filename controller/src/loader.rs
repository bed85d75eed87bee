use std::path::{Path, PathBuf};

use chamber_common::{Cell, FieldIndices, SchemaError, TimeContext, TimePoint};
use chrono::{DateTime, Duration, FixedOffset};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::source;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to read schedule file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read csv data from {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("failed to read workbook {path}: {source}")]
    Xlsx {
        path: PathBuf,
        #[source]
        source: calamine::XlsxError,
    },
    #[error("no sheet named \"timepoints\" in {path}")]
    MissingSheet { path: PathBuf },
    #[error("unsupported schedule format for {path} (expected .csv or .xlsx)")]
    UnsupportedFormat { path: PathBuf },
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("{path} has no usable timepoint rows")]
    NoUsableRows { path: PathBuf },
}

/// Reads a whole schedule file into an ordered sequence of timepoints.
///
/// Rows that fail mandatory decoding are skipped with a warning. With
/// `loop_first_day` set, accumulation stops after the first 24-hour window
/// (a row exactly 24 hours after the first is still included, giving the
/// repeat cycle its closing entry).
pub fn load_schedule(
    path: &Path,
    loop_first_day: bool,
    ctx: &TimeContext,
) -> Result<Vec<TimePoint>, LoadError> {
    let table = source::read_table(path)?;
    let indices = FieldIndices::resolve(&table.headers)?;
    debug!(?indices, "resolved schedule columns");

    let schedule = decode_rows(&table.rows, &indices, loop_first_day, ctx);
    if schedule.is_empty() {
        return Err(LoadError::NoUsableRows {
            path: path.to_path_buf(),
        });
    }

    info!(
        points = schedule.len(),
        channels = indices.channel_count(),
        loop_first_day,
        "loaded schedule"
    );
    Ok(schedule)
}

fn decode_rows(
    rows: &[Vec<Cell>],
    indices: &FieldIndices,
    loop_first_day: bool,
    ctx: &TimeContext,
) -> Vec<TimePoint> {
    let mut schedule = Vec::new();
    let mut window_end: Option<DateTime<FixedOffset>> = None;

    for (i, cells) in rows.iter().enumerate() {
        let point = match TimePoint::from_cells(indices, cells, ctx) {
            Ok(point) => point,
            Err(err) => {
                // Row numbers are 1-based and count the header line.
                warn!(row = i + 2, "skipping row: {err}");
                continue;
            }
        };

        if loop_first_day {
            let end = *window_end.get_or_insert(point.datetime + Duration::hours(24));
            if point.datetime > end {
                break;
            }
        }

        schedule.push(point);
    }

    schedule
}
