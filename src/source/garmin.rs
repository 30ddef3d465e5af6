// src/source/garmin.rs
//! Garmin Connect adapter implementing RecordSource.
//!
//! Talks to the Garmin companion microservice, which logs in with a stored
//! token blob and returns per-day summaries. Daily values carry only a date,
//! so they become instant records stamped at local midnight.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeDelta, TimeZone};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::{Availability, PermissionRequest, RecordSource, SourceError};
use crate::convert::Unit;
use crate::metric::{MetricDescriptor, MetricKind};
use crate::record::{AggregatedRecord, ExerciseSession, Quantity, RawPayload, RawRecord};
use crate::window::{local_midnight, SyncWindow};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for the Garmin microservice
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GarminConfig {
    pub base_url: String,
    pub user_id: String,
    /// Serialized Garmin session tokens
    pub tokens: String,
}

#[derive(Clone, Copy, Debug)]
enum GarminShape {
    /// `{date, ...}` entries with one numeric field
    Daily(&'static str, Unit),
    /// `"120/80, 60 bpm"` strings
    BloodPressure,
    /// Sleep duration in seconds
    Sleep,
    /// Activities endpoint
    Activities,
    /// Planned workouts from the activities endpoint
    Workouts,
}

#[derive(Clone, Copy, Debug)]
struct GarminMetric {
    metric_type: &'static str,
    shape: GarminShape,
    statistic: bool,
}

fn garmin_metric(kind: MetricKind) -> Option<GarminMetric> {
    use GarminShape::*;
    let (metric_type, shape, statistic) = match kind {
        MetricKind::Steps => ("steps", Daily("/value", Unit::Count), true),
        MetricKind::Distance => ("total_distance", Daily("/value", Unit::Kilometers), true),
        MetricKind::FloorsClimbed => ("floors", Daily("/floors_ascended", Unit::Count), true),
        MetricKind::RestingHeartRate => (
            "heart_rates",
            Daily("/resting_heart_rate", Unit::BeatsPerMinute),
            false,
        ),
        MetricKind::OxygenSaturation => ("spo2", Daily("/average_spo2", Unit::Percent), false),
        MetricKind::RespiratoryRate => (
            "respiration",
            Daily("/average_respiration_rate", Unit::BreathsPerMinute),
            false,
        ),
        MetricKind::Vo2Max => (
            "max_metrics",
            Daily("/vo2_max", Unit::MillilitersPerKilogramMinute),
            false,
        ),
        MetricKind::HeartRateVariability => {
            ("hrv", Daily("/average_overnight_hrv", Unit::Milliseconds), false)
        }
        MetricKind::Weight => ("body_composition", Daily("/weight", Unit::Kilograms), false),
        MetricKind::BodyFat => (
            "body_composition",
            Daily("/body_fat_percentage", Unit::Percent),
            false,
        ),
        MetricKind::BloodPressure => ("blood_pressure", BloodPressure, false),
        MetricKind::Sleep => ("sleep", Sleep, false),
        MetricKind::Exercise => ("activities", Activities, false),
        MetricKind::Workout => ("workouts", Workouts, false),
        MetricKind::Stress => ("stress", Daily("/stress_level", Unit::Score), false),
        MetricKind::BodyBattery => ("body_battery", Daily("/highest", Unit::Score), false),
        MetricKind::IntensityMinutes => (
            "intensity_minutes",
            Daily("/total_intensity_minutes", Unit::Minutes),
            true,
        ),
        // The service reports active seconds already converted to minutes.
        MetricKind::ActiveMinutes => ("active_seconds", Daily("/value", Unit::Minutes), true),
        _ => return None,
    };
    Some(GarminMetric {
        metric_type,
        shape,
        statistic,
    })
}

#[derive(Debug, Serialize)]
struct DataRequest<'a> {
    user_id: &'a str,
    tokens: &'a str,
    start_date: String,
    end_date: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    metric_types: Vec<&'a str>,
}

#[derive(Debug, Default, Deserialize)]
struct HealthResponse {
    #[serde(default)]
    data: HashMap<String, Vec<Value>>,
}

#[derive(Debug, Default, Deserialize)]
struct ActivitiesResponse {
    #[serde(default)]
    activities: Vec<ActivityEntry>,
    #[serde(default)]
    workouts: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct ActivityEntry {
    activity: Value,
}

/// Parse `"120/80, 60 bpm"` into systolic and diastolic.
pub(crate) fn parse_blood_pressure(raw: &str) -> Option<(f64, f64)> {
    let reading = raw.split(',').next()?.trim();
    let (systolic, diastolic) = reading.split_once('/')?;
    Some((systolic.trim().parse().ok()?, diastolic.trim().parse().ok()?))
}

/// Entry date as `YYYY-MM-DD` or epoch milliseconds.
fn entry_date(entry: &Value, offset: &FixedOffset) -> Option<NaiveDate> {
    match entry.get("date")? {
        Value::String(s) => NaiveDate::parse_from_str(s.get(..10)?, "%Y-%m-%d").ok(),
        Value::Number(n) => {
            let millis = n.as_i64()?;
            DateTime::<chrono::Utc>::from_timestamp_millis(millis).map(|t| t.with_timezone(offset).date_naive())
        }
        _ => None,
    }
}

fn number(entry: &Value, pointer: &str) -> Option<f64> {
    let found = entry.pointer(pointer)?;
    found
        .as_f64()
        .or_else(|| found.as_str().and_then(|s| s.trim().parse().ok()))
        .filter(|v: &f64| v.is_finite())
}

/// `start` shifted by a duration in seconds. None for negative or
/// non-finite durations and for ends chrono cannot represent.
fn end_after(start: DateTime<FixedOffset>, seconds: f64) -> Option<DateTime<FixedOffset>> {
    if !seconds.is_finite() || seconds < 0.0 {
        return None;
    }
    let delta = TimeDelta::try_seconds(seconds.round() as i64)?;
    start.checked_add_signed(delta)
}

/// Garmin local timestamps: `2024-06-01 07:15:00` or `2024-06-01T07:15:00.0`.
fn local_time(raw: &str, offset: &FixedOffset) -> Option<DateTime<FixedOffset>> {
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()?;
    offset.from_local_datetime(&naive).single()
}

fn daily_record(
    kind: MetricKind,
    shape: GarminShape,
    entry: &Value,
    offset: &FixedOffset,
) -> Option<RawRecord> {
    let date = entry_date(entry, offset)?;
    let midnight = local_midnight(date, offset).ok()?;
    let record = match shape {
        GarminShape::Daily(pointer, unit) => {
            let Some(value) = number(entry, pointer) else {
                debug!(metric = %kind, ?entry, "entry without a numeric value");
                return None;
            };
            RawRecord::instant(midnight, RawPayload::Quantity(Quantity::new(value, unit)))
        }
        GarminShape::BloodPressure => {
            let parsed = entry
                .get("value")
                .and_then(Value::as_str)
                .and_then(parse_blood_pressure);
            if parsed.is_none() {
                debug!(metric = %kind, ?entry, "unparseable blood pressure reading");
            }
            RawRecord::instant(
                midnight,
                RawPayload::BloodPressure {
                    systolic: parsed.map(|(s, _)| s),
                    diastolic: parsed.map(|(_, d)| d),
                },
            )
        }
        GarminShape::Sleep => {
            let seconds = number(entry, "/sleep_duration");
            let Some(end) = seconds.and_then(|s| end_after(midnight, s)) else {
                debug!(metric = %kind, ?seconds, "unusable sleep duration");
                return None;
            };
            RawRecord::interval(midnight, end, RawPayload::SleepSession { stages: Vec::new() })
        }
        GarminShape::Activities | GarminShape::Workouts => return None,
    };
    Some(record.with_source("garmin"))
}

/// Map one activity summary into an exercise record. Durations arrive in
/// minutes and distances in kilometres.
fn activity_record(activity: &Value, offset: &FixedOffset) -> Option<RawRecord> {
    let start_local = activity.get("startTimeLocal").and_then(Value::as_str)?;
    let start = local_time(start_local, offset)?;
    let minutes = number(activity, "/duration");
    let Some(end) = minutes.and_then(|m| end_after(start, m * 60.0)) else {
        debug!(start = %start, ?minutes, "unusable activity duration");
        return None;
    };
    let session = ExerciseSession {
        activity_type: activity
            .pointer("/activityType/typeKey")
            .and_then(Value::as_str)
            .map(str::to_string),
        title: activity
            .get("activityName")
            .and_then(Value::as_str)
            .map(str::to_string),
        energy: number(activity, "/calories").map(|v| Quantity::new(v, Unit::Kilocalories)),
        distance: number(activity, "/distance").map(|v| Quantity::new(v, Unit::Kilometers)),
        laps: Vec::new(),
    };
    Some(RawRecord::interval(start, end, RawPayload::Exercise(session)).with_source("garmin"))
}

/// Map a planned workout into an exercise-shaped record. Workouts have no
/// session time, so they are stamped at their last update (falling back to
/// creation) and kept only when that instant lies inside the window.
fn workout_record(workout: &Value, window: &SyncWindow) -> Option<RawRecord> {
    let offset = window.offset();
    let stamped = ["/updateDate", "/updatedDate", "/createdDate"]
        .iter()
        .find_map(|p| workout.pointer(p).and_then(Value::as_str))?;
    let start = local_time(stamped, &offset)?;
    if !window.contains(&start) {
        return None;
    }
    let seconds = number(workout, "/estimatedDurationInSecs");
    let Some(end) = seconds.and_then(|s| end_after(start, s)) else {
        debug!(start = %start, ?seconds, "workout without a usable estimated duration");
        return None;
    };
    let session = ExerciseSession {
        activity_type: workout
            .pointer("/sportType/sportTypeKey")
            .and_then(Value::as_str)
            .map(str::to_string),
        title: workout
            .get("workoutName")
            .and_then(Value::as_str)
            .map(str::to_string),
        energy: None,
        distance: number(workout, "/estimatedDistanceInMeters")
            .map(|v| Quantity::new(v, Unit::Meters)),
        laps: Vec::new(),
    };
    Some(RawRecord::interval(start, end, RawPayload::Exercise(session)).with_source("garmin"))
}

/// Garmin-backed record source
pub struct GarminSource {
    config: GarminConfig,
    client: Client,
    availability: OnceCell<Availability>,
}

impl GarminSource {
    pub fn new(config: GarminConfig) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SourceError::Http(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            config,
            client,
            availability: OnceCell::new(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Result of the last `initialize()`, if it has run.
    pub fn availability(&self) -> Option<&Availability> {
        self.availability.get()
    }

    fn ensure_initialized(&self) -> Result<(), SourceError> {
        match self.availability.get() {
            Some(a) if a.is_available() => Ok(()),
            _ => Err(SourceError::NotInitialized),
        }
    }

    fn unsupported(&self, kind: MetricKind) -> SourceError {
        SourceError::Unsupported {
            metric: kind,
            platform: self.platform(),
        }
    }

    async fn probe(&self) -> Availability {
        if self.config.tokens.trim().is_empty() {
            return Availability::Unavailable {
                reason: "no Garmin session tokens configured".to_string(),
            };
        }
        match self.client.get(self.url("/")).send().await {
            Ok(resp) if resp.status().is_success() => Availability::Available,
            Ok(resp) => Availability::Unavailable {
                reason: format!("Garmin service returned HTTP {}", resp.status().as_u16()),
            },
            Err(e) => Availability::Unavailable {
                reason: format!("Garmin service unreachable: {}", e),
            },
        }
    }

    async fn post<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &DataRequest<'_>,
    ) -> Result<T, SourceError> {
        let url = self.url(path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| SourceError::Http(e.to_string()))?;
        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "(failed to read body)".to_string());
            warn!(url = %url, status, body = %text, "Garmin service returned error status");
            return Err(SourceError::Http(format!("HTTP {} from {}", status, url)));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| SourceError::Decode(e.to_string()))
    }

    fn request<'a>(&'a self, window: &SyncWindow, metric_types: Vec<&'a str>) -> DataRequest<'a> {
        DataRequest {
            user_id: &self.config.user_id,
            tokens: &self.config.tokens,
            start_date: window.start().date_naive().to_string(),
            end_date: window.end().date_naive().to_string(),
            metric_types,
        }
    }

    async fn activities(&self, window: &SyncWindow) -> Result<ActivitiesResponse, SourceError> {
        let body = self.request(window, Vec::new());
        self.post("/data/activities_and_workouts", &body).await
    }

    async fn daily_entries(
        &self,
        metric_type: &'static str,
        window: &SyncWindow,
    ) -> Result<Vec<Value>, SourceError> {
        let body = self.request(window, vec![metric_type]);
        let mut response: HealthResponse = self.post("/data/health_and_wellness", &body).await?;
        Ok(response.data.remove(metric_type).unwrap_or_default())
    }
}

#[async_trait]
impl RecordSource for GarminSource {
    fn platform(&self) -> &'static str {
        "garmin"
    }

    async fn initialize(&self) -> bool {
        let availability = self.availability.get_or_init(|| self.probe()).await;
        match availability {
            Availability::Available => info!(url = %self.config.base_url, "Garmin service available"),
            Availability::Unavailable { reason } => warn!(%reason, "Garmin service unavailable"),
        }
        availability.is_available()
    }

    fn supports_metric(&self, kind: MetricKind) -> bool {
        garmin_metric(kind).is_some()
    }

    fn supports_statistic(&self, kind: MetricKind) -> bool {
        garmin_metric(kind).is_some_and(|m| m.statistic)
    }

    /// Access was granted when the tokens were issued; nothing to prompt.
    async fn request_permissions(&self, _requests: &[PermissionRequest]) -> bool {
        self.ensure_initialized().is_ok()
    }

    async fn try_read_records(
        &self,
        kind: MetricKind,
        window: &SyncWindow,
    ) -> Result<Vec<RawRecord>, SourceError> {
        self.ensure_initialized()?;
        let metric = garmin_metric(kind).ok_or_else(|| self.unsupported(kind))?;
        let offset = window.offset();

        let records: Vec<RawRecord> = match metric.shape {
            GarminShape::Activities => self
                .activities(window)
                .await?
                .activities
                .iter()
                .filter_map(|a| activity_record(&a.activity, &offset))
                .collect(),
            GarminShape::Workouts => self
                .activities(window)
                .await?
                .workouts
                .iter()
                .filter_map(|w| workout_record(w, window))
                .collect(),
            shape => self
                .daily_entries(metric.metric_type, window)
                .await?
                .iter()
                .filter_map(|entry| daily_record(kind, shape, entry, &offset))
                .collect(),
        };
        debug!(metric = %kind, records = records.len(), "read Garmin records");
        Ok(records)
    }

    async fn try_read_aggregated_statistic(
        &self,
        descriptor: &MetricDescriptor,
        window: &SyncWindow,
    ) -> Result<Vec<AggregatedRecord>, SourceError> {
        self.ensure_initialized()?;
        let kind = descriptor.kind;
        let metric = garmin_metric(kind)
            .filter(|m| m.statistic)
            .ok_or_else(|| self.unsupported(kind))?;
        let GarminShape::Daily(pointer, unit) = metric.shape else {
            return Err(self.unsupported(kind));
        };
        let offset = window.offset();
        let days = window.days();

        let mut rows: Vec<AggregatedRecord> = self
            .daily_entries(metric.metric_type, window)
            .await?
            .iter()
            .filter_map(|entry| {
                let date = entry_date(entry, &offset).filter(|d| days.contains(d))?;
                let value = Quantity {
                    value: number(entry, pointer),
                    unit,
                }
                .value_in(descriptor.unit)
                .filter(|v| *v > 0.0)?;
                Some(AggregatedRecord {
                    date,
                    value,
                    record_type: descriptor.record_type.to_string(),
                })
            })
            .collect();
        rows.sort_by_key(|r| r.date);
        rows.dedup_by_key(|r| r.date);
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    #[test]
    fn blood_pressure_strings_parse() {
        assert_eq!(parse_blood_pressure("120/80, 60 bpm"), Some((120.0, 80.0)));
        assert_eq!(parse_blood_pressure(" 131 / 85 "), Some((131.0, 85.0)));
        assert_eq!(parse_blood_pressure("n/a"), None);
        assert_eq!(parse_blood_pressure("120"), None);
    }

    #[test]
    fn entry_dates_accept_strings_and_epoch_millis() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        assert_eq!(entry_date(&json!({"date": "2024-06-01"}), &utc()), Some(date));
        assert_eq!(
            entry_date(&json!({"date": 1717243200000_i64}), &utc()),
            Some(date)
        );
        assert_eq!(entry_date(&json!({"value": 3}), &utc()), None);
    }

    #[test]
    fn daily_entries_are_stamped_at_local_midnight() {
        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let record = daily_record(
            MetricKind::RestingHeartRate,
            GarminShape::Daily("/resting_heart_rate", Unit::BeatsPerMinute),
            &json!({"date": "2024-06-01", "resting_heart_rate": 52}),
            &offset,
        )
        .unwrap();
        assert_eq!(
            record.start_time.unwrap().to_rfc3339(),
            "2024-06-01T00:00:00+02:00"
        );
        assert_eq!(
            record.payload,
            RawPayload::Quantity(Quantity::new(52.0, Unit::BeatsPerMinute))
        );
        assert_eq!(record.source.as_deref(), Some("garmin"));
    }

    #[test]
    fn sleep_duration_becomes_interval() {
        let record = daily_record(
            MetricKind::Sleep,
            GarminShape::Sleep,
            &json!({"date": "2024-06-01", "sleep_duration": 27000}),
            &utc(),
        )
        .unwrap();
        let minutes = (record.end_time.unwrap() - record.start_time.unwrap()).num_minutes();
        assert_eq!(minutes, 450);
    }

    #[test]
    fn activities_become_exercise_sessions() {
        let activity = json!({
            "activityName": "Morning Run",
            "activityType": {"typeKey": "running"},
            "startTimeLocal": "2024-06-01 07:15:00",
            "duration": 42.5,
            "distance": 8.1,
            "calories": 610
        });
        let record = activity_record(&activity, &utc()).unwrap();
        match record.payload {
            RawPayload::Exercise(session) => {
                assert_eq!(session.activity_type.as_deref(), Some("running"));
                assert_eq!(session.title.as_deref(), Some("Morning Run"));
                assert_eq!(session.distance, Some(Quantity::new(8.1, Unit::Kilometers)));
            }
            other => panic!("unexpected payload {:?}", other),
        }
        let minutes = (record.end_time.unwrap() - record.start_time.unwrap()).num_seconds();
        assert_eq!(minutes, 2550);
    }

    #[test]
    fn unusable_sleep_durations_are_dropped() {
        for seconds in [json!(1e18), json!(1e14), json!(-3600), json!("eight hours"), json!(null)] {
            let entry = json!({"date": "2024-06-01", "sleep_duration": seconds});
            assert!(
                daily_record(MetricKind::Sleep, GarminShape::Sleep, &entry, &utc()).is_none(),
                "kept sleep_duration {}",
                seconds
            );
        }
        let entry = json!({"date": "2024-06-01", "sleep_duration": "27000"});
        assert!(daily_record(MetricKind::Sleep, GarminShape::Sleep, &entry, &utc()).is_some());
    }

    #[test]
    fn unusable_activity_durations_are_dropped() {
        for duration in [json!(1e15), json!(-5), json!("n/a"), json!(f64::MAX)] {
            let activity = json!({
                "startTimeLocal": "2024-06-01 08:00:00",
                "duration": duration
            });
            assert!(
                activity_record(&activity, &utc()).is_none(),
                "kept duration {}",
                duration
            );
        }
        let zero = json!({"startTimeLocal": "2024-06-01 08:00:00", "duration": 0});
        let record = activity_record(&zero, &utc()).unwrap();
        assert_eq!(record.start_time, record.end_time);
    }

    #[test]
    fn non_numeric_daily_values_are_dropped() {
        let shape = GarminShape::Daily("/value", Unit::Count);
        for value in [json!("lots"), json!(null), json!({"total": 3}), json!([1, 2])] {
            let entry = json!({"date": "2024-06-01", "value": value});
            assert!(daily_record(MetricKind::Steps, shape, &entry, &utc()).is_none());
        }
        let entry = json!({"date": "2024-06-01", "value": " 8342 "});
        let record = daily_record(MetricKind::Steps, shape, &entry, &utc()).unwrap();
        assert_eq!(record.payload, RawPayload::Quantity(Quantity::new(8342.0, Unit::Count)));
    }

    #[test]
    fn workouts_inside_window_become_exercise_records() {
        let now = DateTime::parse_from_rfc3339("2024-06-02T20:00:00+00:00").unwrap();
        let window = SyncWindow::resolve(crate::window::SyncDuration::Days7, now).unwrap();
        let workout = json!({
            "workoutName": "Threshold intervals",
            "sportType": {"sportTypeKey": "running"},
            "updateDate": "2024-06-01T18:30:00.0",
            "createdDate": "2024-01-10T09:00:00.0",
            "estimatedDurationInSecs": 2700
        });
        let record = workout_record(&workout, &window).unwrap();
        assert_eq!(
            (record.end_time.unwrap() - record.start_time.unwrap()).num_minutes(),
            45
        );
        match record.payload {
            RawPayload::Exercise(session) => {
                assert_eq!(session.title.as_deref(), Some("Threshold intervals"));
                assert_eq!(session.activity_type.as_deref(), Some("running"));
            }
            other => panic!("unexpected payload {:?}", other),
        }

        let stale = json!({"workoutName": "Old", "createdDate": "2023-01-10T09:00:00.0", "estimatedDurationInSecs": 600});
        assert!(workout_record(&stale, &window).is_none());
        let huge = json!({"workoutName": "Huge", "updateDate": "2024-06-01T18:30:00.0", "estimatedDurationInSecs": 1e300});
        assert!(workout_record(&huge, &window).is_none());
    }

    #[test]
    fn garmin_only_metrics_are_mapped() {
        let source = GarminSource::new(GarminConfig::default()).unwrap();
        for kind in [
            MetricKind::Stress,
            MetricKind::BodyBattery,
            MetricKind::IntensityMinutes,
            MetricKind::ActiveMinutes,
            MetricKind::Workout,
        ] {
            assert!(source.supports_metric(kind), "{} unsupported", kind);
        }
        assert!(source.supports_statistic(MetricKind::IntensityMinutes));
        assert!(source.supports_statistic(MetricKind::ActiveMinutes));
        assert!(!source.supports_statistic(MetricKind::Stress));
    }

    #[tokio::test]
    async fn missing_tokens_is_unavailable() {
        let source = GarminSource::new(GarminConfig {
            base_url: "http://127.0.0.1:9".into(),
            user_id: "u1".into(),
            tokens: "  ".into(),
        })
        .unwrap();
        assert!(!source.initialize().await);
        assert!(!source.request_permissions(&[]).await);
    }

    #[test]
    fn only_daily_totals_are_statistics() {
        let source = GarminSource::new(GarminConfig::default()).unwrap();
        assert!(source.supports_statistic(MetricKind::Steps));
        assert!(source.supports_statistic(MetricKind::FloorsClimbed));
        assert!(!source.supports_statistic(MetricKind::Weight));
        assert!(!source.supports_metric(MetricKind::HeartRate));
        assert!(source.supports_metric(MetricKind::Exercise));
    }
}
