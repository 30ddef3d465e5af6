// src/scheduler/mod.rs
//! Background wake-up handling: decide whether "now" is a sync slot, then run
//! one windowed sync for the enabled metrics.

use std::str::FromStr;

use chrono::{DateTime, Duration, FixedOffset, Timelike};
use thiserror::Error;
use tracing::{info, warn};

use crate::pipeline::RecordSink;
use crate::prefs::{PreferenceStore, SyncPreferences};
use crate::source::RecordSource;
use crate::sync::{SyncEngine, SyncMode};
use crate::window::{SyncWindow, WindowError};

/// Minutes after the configured minute during which a wake-up still counts
/// as on schedule.
pub const SLOT_TOLERANCE_MINUTES: u32 = 15;

/// Oldest data a catch-up sync reaches back for.
pub const CATCH_UP_LIMIT_DAYS: i64 = 90;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("unknown sync cadence '{0}' (expected 1h, 4h or 24h)")]
    UnknownCadence(String),
    #[error("invalid sync time '{0}' (expected HH:MM)")]
    InvalidTime(String),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SyncCadence {
    Hourly,
    EveryFourHours,
    #[default]
    Daily,
}

impl SyncCadence {
    pub fn token(&self) -> &'static str {
        match self {
            SyncCadence::Hourly => "1h",
            SyncCadence::EveryFourHours => "4h",
            SyncCadence::Daily => "24h",
        }
    }

    pub fn span(&self) -> Duration {
        match self {
            SyncCadence::Hourly => Duration::hours(1),
            SyncCadence::EveryFourHours => Duration::hours(4),
            SyncCadence::Daily => Duration::hours(24),
        }
    }

    pub fn all() -> &'static [SyncCadence] {
        &[SyncCadence::Hourly, SyncCadence::EveryFourHours, SyncCadence::Daily]
    }
}

impl FromStr for SyncCadence {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1h" | "hourly" => Ok(SyncCadence::Hourly),
            "4h" | "every_4_hours" => Ok(SyncCadence::EveryFourHours),
            "24h" | "daily" => Ok(SyncCadence::Daily),
            other => Err(ScheduleError::UnknownCadence(other.to_string())),
        }
    }
}

impl std::fmt::Display for SyncCadence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.token())
    }
}

/// Configured local time of day, `HH:MM`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SyncTime {
    pub hour: u32,
    pub minute: u32,
}

impl SyncTime {
    pub fn new(hour: u32, minute: u32) -> Result<Self, ScheduleError> {
        if hour > 23 || minute > 59 {
            return Err(ScheduleError::InvalidTime(format!("{}:{}", hour, minute)));
        }
        Ok(Self { hour, minute })
    }

    fn minute_in_window(&self, minute: u32) -> bool {
        minute >= self.minute && minute < self.minute + SLOT_TOLERANCE_MINUTES
    }
}

impl FromStr for SyncTime {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ScheduleError::InvalidTime(s.to_string());
        let (h, m) = s.trim().split_once(':').ok_or_else(invalid)?;
        let hour = h.parse().map_err(|_| invalid())?;
        let minute = m.parse().map_err(|_| invalid())?;
        Self::new(hour, minute).map_err(|_| invalid())
    }
}

impl std::fmt::Display for SyncTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Outcome of the slot check for one wake-up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncDecision {
    Skip,
    /// Hourly cadence acts on every wake-up
    Always,
    InSlot,
    /// The last submitting sync is older than one span plus the tolerance,
    /// and no background sync ran during the last span
    CatchUp,
}

impl SyncDecision {
    pub fn should_act(&self) -> bool {
        !matches!(self, SyncDecision::Skip)
    }
}

/// Decide whether a wake-up at `now` (local time) should sync.
///
/// `last_synced` is the last background sync that submitted data and
/// `last_attempt` the last one that read the store at all. Catch-up fires at
/// most once per cadence span, so empty or failing syncs are not retried on
/// every wake-up.
pub fn decide(
    cadence: SyncCadence,
    time: SyncTime,
    now: DateTime<FixedOffset>,
    last_synced: Option<DateTime<FixedOffset>>,
    last_attempt: Option<DateTime<FixedOffset>>,
) -> SyncDecision {
    let in_slot = match cadence {
        SyncCadence::Hourly => return SyncDecision::Always,
        SyncCadence::EveryFourHours => {
            now.hour() % 4 == time.hour % 4 && time.minute_in_window(now.minute())
        }
        SyncCadence::Daily => now.hour() == time.hour && time.minute_in_window(now.minute()),
    };
    if in_slot {
        return SyncDecision::InSlot;
    }
    let overdue = cadence.span() + Duration::minutes(i64::from(SLOT_TOLERANCE_MINUTES));
    let Some(last) = last_synced else {
        return SyncDecision::Skip;
    };
    if now.signed_duration_since(last) <= overdue {
        return SyncDecision::Skip;
    }
    match last_attempt {
        Some(attempt) if now.signed_duration_since(attempt) < cadence.span() => SyncDecision::Skip,
        _ => SyncDecision::CatchUp,
    }
}

/// Window for an acting wake-up: one cadence span, or for a catch-up
/// everything since the last submitting sync, capped at
/// [`CATCH_UP_LIMIT_DAYS`].
pub fn background_window(
    decision: SyncDecision,
    cadence: SyncCadence,
    now: DateTime<FixedOffset>,
    last_synced: Option<DateTime<FixedOffset>>,
) -> Result<SyncWindow, WindowError> {
    let span = match (decision, last_synced) {
        (SyncDecision::CatchUp, Some(last)) => now
            .signed_duration_since(last)
            .clamp(cadence.span(), Duration::days(CATCH_UP_LIMIT_DAYS)),
        _ => cadence.span(),
    };
    SyncWindow::span_ending(now, span)
}

/// Result reported to the host's background-task runtime.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackgroundFetchResult {
    NewData,
    NoData,
    Failed,
}

/// Host completion signal for one background invocation.
pub trait TaskCompletion: Send + Sync {
    fn complete(&self, result: BackgroundFetchResult);
}

impl<F> TaskCompletion for F
where
    F: Fn(BackgroundFetchResult) + Send + Sync,
{
    fn complete(&self, result: BackgroundFetchResult) {
        self(result)
    }
}

/// Signals completion exactly once; an unfinished guard reports `Failed`.
struct CompletionGuard<'a, C: TaskCompletion + ?Sized> {
    completion: Option<&'a C>,
}

impl<'a, C: TaskCompletion + ?Sized> CompletionGuard<'a, C> {
    fn new(completion: &'a C) -> Self {
        Self {
            completion: Some(completion),
        }
    }

    fn finish(mut self, result: BackgroundFetchResult) -> BackgroundFetchResult {
        if let Some(completion) = self.completion.take() {
            completion.complete(result);
        }
        result
    }
}

impl<C: TaskCompletion + ?Sized> Drop for CompletionGuard<'_, C> {
    fn drop(&mut self) {
        if let Some(completion) = self.completion.take() {
            warn!("background task ended without a result");
            completion.complete(BackgroundFetchResult::Failed);
        }
    }
}

/// Entry point for one host wake-up.
#[tracing::instrument(name = "background_tick", skip_all, fields(now = %now))]
pub async fn run_background_tick<S, K, P, C>(
    engine: &SyncEngine<S, K>,
    prefs: &P,
    now: DateTime<FixedOffset>,
    completion: &C,
) -> BackgroundFetchResult
where
    S: RecordSource,
    K: RecordSink,
    P: PreferenceStore + ?Sized,
    C: TaskCompletion + ?Sized,
{
    let guard = CompletionGuard::new(completion);

    let cadence = prefs.load_sync_cadence();
    let time = prefs.load_sync_time();
    let last_synced = prefs.load_last_synced();
    let decision = decide(cadence, time, now, last_synced, prefs.load_last_attempt());
    if !decision.should_act() {
        info!(%cadence, %time, "outside sync slot, skipping");
        return guard.finish(BackgroundFetchResult::NoData);
    }

    let enabled = prefs.enabled_metrics(engine.catalog());
    if enabled.is_empty() {
        info!("no metrics enabled");
        return guard.finish(BackgroundFetchResult::NoData);
    }

    let window = match background_window(decision, cadence, now, last_synced) {
        Ok(window) => window,
        Err(e) => {
            warn!(error = %e, "could not build background window");
            return guard.finish(BackgroundFetchResult::Failed);
        }
    };

    info!(
        %cadence,
        ?decision,
        metrics = enabled.len(),
        start = %window.start(),
        "background sync starting"
    );
    prefs.save_last_attempt(now);
    let result = engine.sync_window(&enabled, window, SyncMode::Background).await;
    let outcome = if !result.success {
        BackgroundFetchResult::Failed
    } else if result.submitted_count > 0 {
        prefs.save_last_synced(now);
        BackgroundFetchResult::NewData
    } else {
        BackgroundFetchResult::NoData
    };
    info!(?outcome, submitted = result.submitted_count, "background sync finished");
    guard.finish(outcome)
}
