//! Weekly trigger.
//!
//! Cron expressions use the familiar five fields (`min hour dom month dow`)
//! and are evaluated in local time. A zero seconds field is prepended before
//! handing them to the `cron` crate, which expects six or seven.
//!
//! The period passed to the pipeline is the ISO-8601 week number of the local
//! date on which the schedule fired.

use crate::api::Platform;
use crate::content::ContentSource;
use crate::ledger::LedgerStore;
use crate::pipeline::{Pipeline, PipelineError, RunOutcome, Trigger};
use chrono::{DateTime, Datelike, Local, NaiveDate, TimeZone};
use cron::Schedule;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("invalid cron expression '{expr}': {reason}")]
    InvalidCron { expr: String, reason: String },
    #[error("cron expression '{0}' has no upcoming firing")]
    Exhausted(String),
}

/// Parse a five-field cron expression.
pub fn parse_schedule(expr: &str) -> Result<Schedule, ScheduleError> {
    let fields = expr.split_whitespace().count();
    if fields != 5 {
        return Err(ScheduleError::InvalidCron {
            expr: expr.to_string(),
            reason: format!("expected 5 fields, found {fields}"),
        });
    }
    format!("0 {expr}")
        .parse::<Schedule>()
        .map_err(|e| ScheduleError::InvalidCron {
            expr: expr.to_string(),
            reason: e.to_string(),
        })
}

/// First firing strictly after `after`.
pub fn next_fire<Tz: TimeZone>(schedule: &Schedule, after: &DateTime<Tz>) -> Option<DateTime<Tz>> {
    schedule.after(after).next()
}

/// ISO-8601 week number (1..=53) of `date`.
pub fn iso_week_number(date: NaiveDate) -> u32 {
    date.iso_week().week()
}

/// Period for a run started now.
pub fn current_period() -> u32 {
    iso_week_number(Local::now().date_naive())
}

/// Run the pipeline for the period a firing at `fired_at` stands for.
pub async fn fire<P, C, S, Tz>(
    pipeline: &Pipeline<P, C, S>,
    fired_at: &DateTime<Tz>,
) -> Result<RunOutcome, PipelineError>
where
    P: Platform,
    C: ContentSource,
    S: LedgerStore,
    Tz: TimeZone,
{
    let period = iso_week_number(fired_at.date_naive());
    pipeline.run_once(period, Trigger::Scheduled).await
}

/// Sleep until each firing of `schedule` and run the pipeline.
///
/// Failed runs are logged and the loop waits for the next firing. Only a
/// schedule with no future firing ends the loop.
pub async fn run_scheduled<P, C, S>(
    pipeline: &Pipeline<P, C, S>,
    schedule: &Schedule,
) -> Result<(), ScheduleError>
where
    P: Platform,
    C: ContentSource,
    S: LedgerStore,
{
    loop {
        let now = Local::now();
        let next = next_fire(schedule, &now)
            .ok_or_else(|| ScheduleError::Exhausted(schedule.source().to_string()))?;
        let wait = (next - now).to_std().unwrap_or_default();
        info!(next = %next.to_rfc3339(), wait_secs = wait.as_secs(), "waiting for next firing");
        tokio::time::sleep(wait).await;

        match fire(pipeline, &next).await {
            Ok(RunOutcome::Published(entry)) => {
                info!(week = entry.period, "scheduled run published");
            }
            Ok(RunOutcome::AlreadyPublished { period }) => {
                info!(week = period, "scheduled run skipped, already published");
            }
            Err(e) => {
                warn!(error = %e, "scheduled run failed, waiting for next firing");
            }
        }
    }
}
