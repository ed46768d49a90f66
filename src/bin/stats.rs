//! Offline report over a status database produced by tg-eye: last-seen,
//! median online time per day and long offline gaps, per user.

use anyhow::{Context, Result};
use chrono::{DateTime, Local, TimeZone};
use clap::Parser;
use log::{debug, info};
use std::path::PathBuf;
use std::time::Duration;
use tg_eye::stats::{
    format_duration, median_duration, offline_gaps, online_intervals, online_time_per_day,
};
use tg_eye::store::StatusStore;

const LONG_GAP: Duration = Duration::from_secs(3 * 3_600);

#[derive(Parser, Debug)]
#[command(name = "tg-eye-stats")]
struct Args {
    /// Path of the status database to read.
    #[arg(long, default_value = "user_status.sqlite3")]
    db: PathBuf,
}

fn main() {
    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_target(false)
        .init();

    if let Err(e) = run(args) {
        eprintln!("{e:#}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let store = StatusStore::open_read_only(&args.db)
        .with_context(|| format!("opening status database at {}", args.db.display()))?;

    for user in store.list_users()? {
        let samples = store.statuses_for_user(user.user_id)?;

        let last_online = match samples.iter().rev().find(|s| s.is_online) {
            Some(s) => format!("last online {} ago", ago(s.timestamp)),
            None => "last online: ---".to_string(),
        };

        let intervals = online_intervals(&samples);
        let per_day = online_time_per_day(&intervals);
        let durations: Vec<_> = per_day.iter().map(|(_, d)| *d).collect();
        let median = median_duration(&durations).unwrap_or_default();

        info!(
            "{}\tid: {}\t{}\tmedian online time per day: {}",
            user.full_name.as_deref().unwrap_or("<no_name>"),
            user.user_id,
            last_online,
            format_duration(median)
        );

        for gap in offline_gaps(&intervals, LONG_GAP) {
            debug!(
                "offline from {} to {} ({})",
                format_timestamp(gap.start),
                format_timestamp(gap.end),
                format_duration(Duration::from_secs((gap.end - gap.start).unsigned_abs()))
            );
        }
        for (day, total) in per_day {
            debug!("{}: {}", format_day(day), format_duration(total));
        }
    }

    Ok(())
}

fn format_timestamp(timestamp: i64) -> String {
    Local
        .timestamp_opt(timestamp, 0)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

fn format_day(day_start: i64) -> String {
    DateTime::from_timestamp(day_start, 0)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| day_start.to_string())
}

fn ago(timestamp: i64) -> String {
    let elapsed = Local::now().timestamp().saturating_sub(timestamp);
    format_duration(Duration::from_secs(elapsed.max(0) as u64))
}
