// src/source/health_connect.rs
//! Health Connect adapter implementing RecordSource.
//!
//! The Health Connect bridge hands records back as JSON objects: timestamps as
//! ISO strings, measurements wrapped in unit objects (`{"inKilograms": 70.2}`),
//! heart rate as a `samples[]` series and sleep as sessions with `stages[]`.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::{
    supports_via_constituents, Access, Availability, BridgeError, PermissionRequest, RecordSource,
    SourceError,
};
use crate::convert::Unit;
use crate::metric::{MetricDescriptor, MetricKind};
use crate::record::{
    AggregatedRecord, ExerciseSession, Lap, Quantity, RawPayload, RawRecord, Sample, SleepStage,
    StageSegment,
};
use crate::window::SyncWindow;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SdkStatus {
    Available,
    UpdateRequired,
    Unavailable,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HcPermission {
    /// "read" or "write"
    pub access_type: String,
    pub record_type: String,
}

impl HcPermission {
    fn new(access: Access, record_type: &str) -> Self {
        Self {
            access_type: match access {
                Access::Read => "read".to_string(),
                Access::Write => "write".to_string(),
            },
            record_type: record_type.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeRangeFilter {
    pub operator: &'static str,
    pub start_time: String,
    pub end_time: String,
}

impl TimeRangeFilter {
    pub fn between(start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> Self {
        Self {
            operator: "between",
            start_time: start.to_rfc3339(),
            end_time: end.to_rfc3339(),
        }
    }
}

/// Native Health Connect surface the adapter consumes.
#[async_trait]
pub trait HealthConnectBridge: Send + Sync {
    async fn sdk_status(&self) -> SdkStatus;

    async fn initialize(&self) -> Result<bool, BridgeError>;

    /// Returns the permissions the user granted.
    async fn request_permission(
        &self,
        permissions: &[HcPermission],
    ) -> Result<Vec<HcPermission>, BridgeError>;

    async fn read_records(
        &self,
        record_type: &str,
        filter: &TimeRangeFilter,
    ) -> Result<Vec<Value>, BridgeError>;

    /// Aggregate result object, e.g. `{"COUNT_TOTAL": 8342}`.
    async fn aggregate_record(
        &self,
        record_type: &str,
        filter: &TimeRangeFilter,
    ) -> Result<Value, BridgeError>;
}

#[derive(Clone, Copy, Debug)]
enum Shape {
    /// Interval record with one measurement
    Interval(&'static str, Unit),
    /// Point-in-time record with one measurement
    Instant(&'static str, Unit),
    /// `samples[]` series; pointer is relative to each sample
    Samples(&'static str, Unit),
    BloodPressure,
    Sleep,
    Exercise,
    /// Only available through the aggregate API
    StatisticOnly,
}

#[derive(Clone, Copy, Debug)]
struct HcType {
    record_type: &'static str,
    shape: Shape,
    aggregate: Option<(&'static str, Unit)>,
}

fn hc_type(kind: MetricKind) -> Option<HcType> {
    use Shape::*;
    let (record_type, shape, aggregate) = match kind {
        MetricKind::Steps => ("Steps", Interval("/count", Unit::Count), Some(("/COUNT_TOTAL", Unit::Count))),
        MetricKind::ActiveCalories => (
            "ActiveCaloriesBurned",
            Interval("/energy/inKilocalories", Unit::Kilocalories),
            Some(("/ACTIVE_CALORIES_TOTAL/inKilocalories", Unit::Kilocalories)),
        ),
        MetricKind::BasalCalories => (
            "BasalMetabolicRate",
            StatisticOnly,
            Some(("/BASAL_CALORIES_TOTAL/inKilocalories", Unit::Kilocalories)),
        ),
        MetricKind::HeartRate => ("HeartRate", Samples("/beatsPerMinute", Unit::BeatsPerMinute), None),
        MetricKind::Distance => (
            "Distance",
            Interval("/distance/inMeters", Unit::Meters),
            Some(("/DISTANCE/inMeters", Unit::Meters)),
        ),
        MetricKind::FloorsClimbed => (
            "FloorsClimbed",
            Interval("/floors", Unit::Count),
            Some(("/FLOORS_CLIMBED_TOTAL", Unit::Count)),
        ),
        MetricKind::Hydration => ("Hydration", Interval("/volume/inMilliliters", Unit::Milliliters), None),
        MetricKind::Weight => ("Weight", Instant("/weight/inKilograms", Unit::Kilograms), None),
        MetricKind::Height => ("Height", Instant("/height/inMeters", Unit::Meters), None),
        MetricKind::BodyFat => ("BodyFat", Instant("/percentage", Unit::Percent), None),
        MetricKind::BloodGlucose => (
            "BloodGlucose",
            Instant("/level/inMillimolesPerLiter", Unit::MillimolesPerLiter),
            None,
        ),
        MetricKind::OxygenSaturation => ("OxygenSaturation", Instant("/percentage", Unit::Percent), None),
        MetricKind::RestingHeartRate => (
            "RestingHeartRate",
            Instant("/beatsPerMinute", Unit::BeatsPerMinute),
            None,
        ),
        MetricKind::RespiratoryRate => ("RespiratoryRate", Instant("/rate", Unit::BreathsPerMinute), None),
        MetricKind::Vo2Max => (
            "Vo2Max",
            Instant("/vo2MillilitersPerMinuteKilogram", Unit::MillilitersPerKilogramMinute),
            None,
        ),
        MetricKind::LeanBodyMass => ("LeanBodyMass", Instant("/mass/inKilograms", Unit::Kilograms), None),
        MetricKind::HeartRateVariability => (
            "HeartRateVariabilityRmssd",
            Instant("/heartRateVariabilityMillis", Unit::Milliseconds),
            None,
        ),
        MetricKind::BloodPressure => ("BloodPressure", BloodPressure, None),
        MetricKind::Sleep => ("SleepSession", Sleep, None),
        MetricKind::Exercise => ("ExerciseSession", Exercise, None),
        MetricKind::TotalCalories
        | MetricKind::Stress
        | MetricKind::BodyBattery
        | MetricKind::IntensityMinutes
        | MetricKind::ActiveMinutes
        | MetricKind::Workout => return None,
    };
    Some(HcType {
        record_type,
        shape,
        aggregate,
    })
}

/// SleepSessionRecord.STAGE_TYPE_*
fn sleep_stage(code: i64) -> SleepStage {
    match code {
        1 | 7 => SleepStage::Awake,
        2 => SleepStage::Asleep,
        3 => SleepStage::InBed,
        4 => SleepStage::Light,
        5 => SleepStage::Deep,
        6 => SleepStage::Rem,
        _ => SleepStage::Unknown,
    }
}

/// ExerciseSessionRecord.EXERCISE_TYPE_*
fn exercise_name(code: i64) -> String {
    match code {
        8 => "biking".to_string(),
        37 => "hiking".to_string(),
        56 => "running".to_string(),
        70 => "strength_training".to_string(),
        73 => "swimming_open_water".to_string(),
        74 => "swimming_pool".to_string(),
        79 => "walking".to_string(),
        83 => "yoga".to_string(),
        other => format!("exercise_{}", other),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HcMetadata {
    data_origin: Option<String>,
}

/// Fields shared by every Health Connect record; the rest stays as JSON.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HcEnvelope {
    start_time: Option<String>,
    end_time: Option<String>,
    time: Option<String>,
    metadata: Option<HcMetadata>,
    #[serde(flatten)]
    fields: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HcStage {
    start_time: String,
    end_time: String,
    stage: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HcLap {
    start_time: String,
    end_time: String,
    length: Option<Value>,
}

fn parse_time(raw: Option<&str>, offset: &FixedOffset) -> Option<DateTime<FixedOffset>> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(offset))
}

/// Number at `pointer`, unwrapping `{"value": n}` percentage objects.
fn number_at(value: &Value, pointer: &str) -> Option<f64> {
    let found = value.pointer(pointer)?;
    found
        .as_f64()
        .or_else(|| found.get("value").and_then(Value::as_f64))
}

fn parse_record(kind: MetricKind, shape: Shape, raw: Value, offset: &FixedOffset) -> Option<RawRecord> {
    let envelope: HcEnvelope = match serde_json::from_value(raw) {
        Ok(e) => e,
        Err(e) => {
            debug!(metric = %kind, error = %e, "skipping malformed Health Connect record");
            return None;
        }
    };
    let start = parse_time(envelope.start_time.as_deref().or(envelope.time.as_deref()), offset);
    let end = parse_time(envelope.end_time.as_deref(), offset);
    let fields = &envelope.fields;

    let payload = match shape {
        Shape::Interval(pointer, unit) | Shape::Instant(pointer, unit) => {
            RawPayload::Quantity(Quantity {
                value: number_at(fields, pointer),
                unit,
            })
        }
        Shape::Samples(pointer, unit) => {
            let samples = fields
                .get("samples")
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(|s| {
                            let time = parse_time(s.get("time").and_then(Value::as_str), offset)?;
                            Some(Sample {
                                time,
                                value: number_at(s, pointer),
                            })
                        })
                        .collect()
                })
                .unwrap_or_default();
            RawPayload::Samples { unit, samples }
        }
        Shape::BloodPressure => RawPayload::BloodPressure {
            systolic: number_at(fields, "/systolic/inMillimetersOfMercury"),
            diastolic: number_at(fields, "/diastolic/inMillimetersOfMercury"),
        },
        Shape::Sleep => {
            let stages: Vec<HcStage> = fields
                .get("stages")
                .cloned()
                .and_then(|v| serde_json::from_value(v).ok())
                .unwrap_or_default();
            RawPayload::SleepSession {
                stages: stages
                    .into_iter()
                    .filter_map(|s| {
                        Some(StageSegment {
                            stage: sleep_stage(s.stage),
                            start: parse_time(Some(&s.start_time), offset)?,
                            end: parse_time(Some(&s.end_time), offset)?,
                        })
                    })
                    .collect(),
            }
        }
        Shape::Exercise => {
            let laps: Vec<HcLap> = fields
                .get("laps")
                .cloned()
                .and_then(|v| serde_json::from_value(v).ok())
                .unwrap_or_default();
            RawPayload::Exercise(ExerciseSession {
                activity_type: fields.get("exerciseType").and_then(Value::as_i64).map(exercise_name),
                title: fields.get("title").and_then(Value::as_str).map(str::to_string),
                energy: None,
                distance: None,
                laps: laps
                    .into_iter()
                    .filter_map(|lap| {
                        Some(Lap {
                            start: parse_time(Some(&lap.start_time), offset)?,
                            end: parse_time(Some(&lap.end_time), offset)?,
                            distance: lap
                                .length
                                .as_ref()
                                .and_then(|l| number_at(l, "/inMeters"))
                                .map(|m| Quantity::new(m, Unit::Meters)),
                        })
                    })
                    .collect(),
            })
        }
        Shape::StatisticOnly => return None,
    };

    Some(RawRecord {
        start_time: start,
        end_time: end,
        source: envelope.metadata.and_then(|m| m.data_origin),
        payload,
    })
}

/// Health Connect-backed record source
pub struct HealthConnectSource<B> {
    bridge: B,
    availability: OnceCell<Availability>,
}

impl<B: HealthConnectBridge> HealthConnectSource<B> {
    pub fn new(bridge: B) -> Self {
        Self {
            bridge,
            availability: OnceCell::new(),
        }
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
        match self.bridge.sdk_status().await {
            SdkStatus::Available => {}
            SdkStatus::UpdateRequired => {
                return Availability::Unavailable {
                    reason: "Health Connect provider needs an update".to_string(),
                }
            }
            SdkStatus::Unavailable => {
                return Availability::Unavailable {
                    reason: "Health Connect is not installed".to_string(),
                }
            }
        }
        match self.bridge.initialize().await {
            Ok(true) => Availability::Available,
            Ok(false) => Availability::Unavailable {
                reason: "Health Connect client failed to initialize".to_string(),
            },
            Err(e) => Availability::Unavailable {
                reason: format!("Health Connect initialization error: {}", e),
            },
        }
    }
}

#[async_trait]
impl<B: HealthConnectBridge> RecordSource for HealthConnectSource<B> {
    fn platform(&self) -> &'static str {
        "health_connect"
    }

    async fn initialize(&self) -> bool {
        let availability = self.availability.get_or_init(|| self.probe()).await;
        match availability {
            Availability::Available => info!("Health Connect available"),
            Availability::Unavailable { reason } => warn!(%reason, "Health Connect unavailable"),
        }
        availability.is_available()
    }

    fn supports_metric(&self, kind: MetricKind) -> bool {
        hc_type(kind).is_some() || supports_via_constituents(kind, |k| hc_type(k).is_some())
    }

    fn supports_statistic(&self, kind: MetricKind) -> bool {
        hc_type(kind).is_some_and(|t| t.aggregate.is_some())
    }

    async fn request_permissions(&self, requests: &[PermissionRequest]) -> bool {
        if self.ensure_initialized().is_err() {
            warn!("permission request before Health Connect initialization");
            return false;
        }
        let mut wanted: Vec<HcPermission> = Vec::new();
        for request in requests {
            let kinds: Vec<MetricKind> = if request.metric.constituents().is_empty() {
                vec![request.metric]
            } else {
                request.metric.constituents().to_vec()
            };
            for kind in kinds {
                if let Some(t) = hc_type(kind) {
                    let permission = HcPermission::new(request.access, t.record_type);
                    if !wanted.contains(&permission) {
                        wanted.push(permission);
                    }
                }
            }
        }
        if wanted.is_empty() {
            return true;
        }
        match self.bridge.request_permission(&wanted).await {
            Ok(granted) => {
                let missing: Vec<&str> = wanted
                    .iter()
                    .filter(|p| !granted.contains(p))
                    .map(|p| p.record_type.as_str())
                    .collect();
                if missing.is_empty() {
                    true
                } else {
                    warn!(?missing, "Health Connect permissions not granted");
                    false
                }
            }
            Err(e) => {
                warn!(error = %e, "Health Connect permission request failed");
                false
            }
        }
    }

    async fn try_read_records(
        &self,
        kind: MetricKind,
        window: &SyncWindow,
    ) -> Result<Vec<RawRecord>, SourceError> {
        self.ensure_initialized()?;
        let t = hc_type(kind).ok_or_else(|| self.unsupported(kind))?;
        if matches!(t.shape, Shape::StatisticOnly) {
            return Err(self.unsupported(kind));
        }
        let filter = TimeRangeFilter::between(window.start(), window.end());
        let raw = self.bridge.read_records(t.record_type, &filter).await?;
        let total = raw.len();
        let offset = window.offset();
        let records: Vec<RawRecord> = raw
            .into_iter()
            .filter_map(|r| parse_record(kind, t.shape, r, &offset))
            .collect();
        debug!(metric = %kind, total, kept = records.len(), "read Health Connect records");
        Ok(records)
    }

    async fn try_read_aggregated_statistic(
        &self,
        descriptor: &MetricDescriptor,
        window: &SyncWindow,
    ) -> Result<Vec<AggregatedRecord>, SourceError> {
        self.ensure_initialized()?;
        let kind = descriptor.kind;
        let t = hc_type(kind).ok_or_else(|| self.unsupported(kind))?;
        let (pointer, unit) = t.aggregate.ok_or_else(|| self.unsupported(kind))?;

        let mut rows = Vec::new();
        for day in window.day_ranges()? {
            let filter = TimeRangeFilter::between(day.start, day.end);
            let result = self.bridge.aggregate_record(t.record_type, &filter).await?;
            let value = number_at(&result, pointer)
                .and_then(|v| Quantity::new(v, unit).value_in(descriptor.unit));
            match value {
                Some(v) if v > 0.0 => rows.push(AggregatedRecord {
                    date: day.date,
                    value: v,
                    record_type: descriptor.record_type.to_string(),
                }),
                _ => debug!(metric = %kind, date = %day.date, "no aggregate for day"),
            }
        }
        Ok(rows)
    }
}
