//! The perpetual schedule-walking loop.
//!
//! A pure [`CyclePlanner`] decides what happens next given "now"; the async
//! [`run_schedule`] driver sleeps until each target instant and calls the
//! apply callback with bounded retry. Keeping the time arithmetic out of
//! the IO loop is what makes the catch-up and wraparound policy testable.

use std::time::Duration as StdDuration;

use chamber_common::TimePoint;
use chrono::{DateTime, Days, Duration, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use thiserror::Error;
use tracing::{info, warn};

/// Cap on apply attempts per fired timepoint. No backoff between attempts.
pub const MAX_APPLY_ATTEMPTS: u32 = 10;

/// How often an exhausted one-shot schedule re-checks for work.
const EXHAUSTED_RESCAN: StdDuration = StdDuration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Walk the whole file once, taking each datetime at face value.
    Once,
    /// Replay the first-day window forever, re-projecting each entry's
    /// time-of-day onto the current date.
    DailyRepeat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Fire this entry immediately: it is the most recently due-but-unfired
    /// timepoint at process start, i.e. what should be active right now.
    CatchUp { index: usize },
    /// Sleep until `at`, then fire this entry.
    Fire {
        index: usize,
        at: DateTime<FixedOffset>,
    },
    /// No entry will ever come due again (one-shot schedule fully in the
    /// past). The driver idles but stays alive.
    Exhausted,
}

/// Walks the ordered schedule, computing each entry's next target instant.
///
/// State is a cursor plus the cycle date the current pass projects onto.
/// Entries whose target is already past are skipped cheaply, remembering
/// the last one passed; the first future target triggers a one-time
/// catch-up fire of that remembered entry.
pub struct CyclePlanner<'a> {
    schedule: &'a [TimePoint],
    mode: RunMode,
    pos: usize,
    cycle_date: Option<NaiveDate>,
    last_passed: Option<usize>,
    first_fire_done: bool,
}

impl<'a> CyclePlanner<'a> {
    pub fn new(schedule: &'a [TimePoint], mode: RunMode) -> Self {
        debug_assert!(!schedule.is_empty());
        Self {
            schedule,
            mode,
            pos: 0,
            cycle_date: None,
            last_passed: None,
            first_fire_done: false,
        }
    }

    pub fn next_step(&mut self, now: DateTime<FixedOffset>) -> Step {
        let len = self.schedule.len();
        let mut seen = 0usize;

        loop {
            if self.pos >= len {
                self.pos = 0;
                if self.mode == RunMode::DailyRepeat {
                    if let Some(date) = self.cycle_date {
                        self.cycle_date = date.checked_add_days(Days::new(1));
                    }
                }
            }

            if self.pos == 0 && self.mode == RunMode::DailyRepeat {
                // Clamp the cycle forward so replay after days of downtime
                // resumes at today's phase instead of walking day by day.
                let today = now.date_naive();
                self.cycle_date = Some(self.cycle_date.map_or(today, |date| date.max(today)));
            }

            if seen >= 2 * len {
                return Step::Exhausted;
            }

            let index = self.pos;
            let at = self.target_instant(index);

            if at <= now {
                self.last_passed = Some(index);
                self.pos += 1;
                seen += 1;
                continue;
            }

            if !self.first_fire_done {
                self.first_fire_done = true;
                if let Some(stale) = self.last_passed {
                    return Step::CatchUp { index: stale };
                }
            }

            self.pos += 1;
            return Step::Fire { index, at };
        }
    }

    fn target_instant(&self, index: usize) -> DateTime<FixedOffset> {
        let entry = &self.schedule[index];
        match self.mode {
            RunMode::Once => entry.datetime,
            RunMode::DailyRepeat => {
                let Some(cycle_date) = self.cycle_date else {
                    return entry.datetime;
                };
                // Preserve the entry's whole-day offset from the window's
                // first row: a closing row 24h after the first lands on the
                // cycle's next day, so it always fires after all others and
                // the cycle restarts cleanly.
                let base = self.schedule[0].datetime.date_naive();
                let day_offset = (entry.datetime.date_naive() - base).num_days().max(0) as u64;
                let date = cycle_date
                    .checked_add_days(Days::new(day_offset))
                    .unwrap_or(cycle_date);
                project(date.and_time(entry.datetime.time()), *entry.datetime.offset())
            }
        }
    }
}

fn project(naive: NaiveDateTime, offset: FixedOffset) -> DateTime<FixedOffset> {
    let utc = naive - Duration::seconds(i64::from(offset.local_minus_utc()));
    DateTime::from_naive_utc_and_offset(utc, offset)
}

/// A target that slipped into the past while we were computing it fires
/// immediately rather than erroring.
fn wait_duration(at: DateTime<FixedOffset>, now: DateTime<FixedOffset>) -> StdDuration {
    (at - now).to_std().unwrap_or(StdDuration::ZERO)
}

fn apply_with_retry<F>(apply: &mut F, point: &TimePoint) -> bool
where
    F: FnMut(&TimePoint) -> bool,
{
    info!("timepoint: {point}");
    for attempt in 1..=MAX_APPLY_ATTEMPTS {
        if apply(point) {
            return true;
        }
        warn!(attempt, "apply reported failure");
    }
    warn!("giving up after {MAX_APPLY_ATTEMPTS} attempts");
    false
}

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("schedule has no usable timepoints")]
    EmptySchedule,
}

/// Drives the schedule forever. Never returns under normal operation;
/// shutdown is the caller cancelling this future (the sleeps are the only
/// suspension points, so nothing is ever left half-applied).
pub async fn run_schedule<F>(
    schedule: &[TimePoint],
    mode: RunMode,
    mut apply: F,
) -> Result<(), RunnerError>
where
    F: FnMut(&TimePoint) -> bool,
{
    if schedule.is_empty() {
        return Err(RunnerError::EmptySchedule);
    }

    let offset = *schedule[0].datetime.offset();
    let total = schedule.len();
    let mut planner = CyclePlanner::new(schedule, mode);
    let mut exhausted_logged = false;

    loop {
        let now = Utc::now().with_timezone(&offset);
        match planner.next_step(now) {
            Step::CatchUp { index } => {
                info!(index, total, "running last-passed timepoint on startup");
                apply_with_retry(&mut apply, &schedule[index]);
            }
            Step::Fire { index, at } => {
                let wait = wait_duration(at, now);
                if !wait.is_zero() {
                    info!(
                        index,
                        total,
                        "sleeping {}s until timepoint at {at}",
                        wait.as_secs()
                    );
                    tokio::time::sleep(wait).await;
                }
                apply_with_retry(&mut apply, &schedule[index]);
            }
            Step::Exhausted => {
                if !exhausted_logged {
                    exhausted_logged = true;
                    info!("no future timepoints remain; idling until shutdown");
                }
                tokio::time::sleep(EXHAUSTED_RESCAN).await;
            }
        }
    }
}
