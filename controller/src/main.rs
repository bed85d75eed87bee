mod loader;
mod mqtt;
mod runner;
mod source;

use std::path::PathBuf;

use anyhow::Context;
use chamber_common::{TimeContext, TimePoint};
use chrono::{Offset, Utc};
use chrono_tz::Tz;
use clap::Parser;
use tracing::info;

use crate::loader::load_schedule;
use crate::mqtt::{MqttConfig, MqttSink};
use crate::runner::{run_schedule, RunMode};

/// Drives growth chamber conditions from a schedule of timepoints.
#[derive(Debug, Parser)]
#[command(name = "chamber-controller")]
struct Args {
    /// Schedule file: .csv, or .xlsx with a "timepoints" sheet.
    conditions: PathBuf,

    /// Replay the schedule's first 24 hours every day instead of walking
    /// the whole file once.
    #[arg(long, env = "LOOP_FIRST_DAY")]
    loop_first_day: bool,

    /// IANA timezone for datetimes without an explicit offset. Defaults to
    /// the system's local offset.
    #[arg(long, env = "CHAMBER_TZ")]
    timezone: Option<String>,

    /// Chamber name, used in the setpoint topic and client id.
    #[arg(long, env = "CHAMBER_NAME", default_value = "chamber")]
    chamber: String,

    /// MQTT broker host. When unset, setpoints are logged instead of
    /// published.
    #[arg(long, env = "MQTT_HOST")]
    mqtt_host: Option<String>,

    #[arg(long, env = "MQTT_PORT", default_value_t = 1883)]
    mqtt_port: u16,

    #[arg(long, env = "MQTT_USER", default_value = "")]
    mqtt_user: String,

    #[arg(long, env = "MQTT_PASS", default_value = "")]
    mqtt_pass: String,
}

fn time_context_for(timezone: Option<&str>) -> anyhow::Result<TimeContext> {
    let Some(name) = timezone else {
        return Ok(TimeContext::local());
    };
    let tz: Tz = name
        .parse()
        .map_err(|_| anyhow::anyhow!("unknown timezone {name:?}"))?;
    Ok(TimeContext::with_offset(
        Utc::now().with_timezone(&tz).offset().fix(),
    ))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let ctx = time_context_for(args.timezone.as_deref())?;

    let schedule = load_schedule(&args.conditions, args.loop_first_day, &ctx)
        .with_context(|| format!("loading schedule from {}", args.conditions.display()))?;

    let mode = if args.loop_first_day {
        RunMode::DailyRepeat
    } else {
        RunMode::Once
    };

    let sink = args.mqtt_host.clone().map(|host| {
        MqttSink::connect(MqttConfig {
            host,
            port: args.mqtt_port,
            user: args.mqtt_user.clone(),
            pass: args.mqtt_pass.clone(),
            chamber: args.chamber.clone(),
        })
    });

    let apply = move |point: &TimePoint| match &sink {
        Some(sink) => sink.apply(point),
        None => {
            info!("applying {point}");
            true
        }
    };

    tokio::select! {
        result = run_schedule(&schedule, mode, apply) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown requested");
        }
    }

    Ok(())
}
