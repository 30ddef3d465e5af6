// src/record.rs
//! Record shapes flowing through the pipeline: raw platform observations,
//! per-day aggregates, and the canonical wire record.

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::convert::{convert, Unit};

/// A single measured value with its platform unit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quantity {
    pub value: Option<f64>,
    pub unit: Unit,
}

impl Quantity {
    pub fn new(value: f64, unit: Unit) -> Self {
        Self {
            value: Some(value),
            unit,
        }
    }

    pub fn missing(unit: Unit) -> Self {
        Self { value: None, unit }
    }

    /// Value converted to `unit`; None when missing, non-finite, or not convertible.
    pub fn value_in(&self, unit: Unit) -> Option<f64> {
        self.value.and_then(|v| convert(v, self.unit, unit))
    }
}

/// One sample inside a multi-sample record (e.g. heart-rate series).
#[derive(Clone, Debug, PartialEq)]
pub struct Sample {
    pub time: DateTime<FixedOffset>,
    pub value: Option<f64>,
}

/// Vendor-neutral sleep stage
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SleepStage {
    Awake,
    Light,
    Deep,
    Rem,
    /// Asleep without stage detail
    Asleep,
    InBed,
    Unknown,
}

/// Staged segment inside a sleep session record.
#[derive(Clone, Debug, PartialEq)]
pub struct StageSegment {
    pub stage: SleepStage,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Lap {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub distance: Option<Quantity>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExerciseSession {
    pub activity_type: Option<String>,
    pub title: Option<String>,
    pub energy: Option<Quantity>,
    pub distance: Option<Quantity>,
    pub laps: Vec<Lap>,
}

/// Metric-specific body of a raw record.
#[derive(Clone, Debug, PartialEq)]
pub enum RawPayload {
    Quantity(Quantity),
    Samples { unit: Unit, samples: Vec<Sample> },
    /// Values in mmHg
    BloodPressure {
        systolic: Option<f64>,
        diastolic: Option<f64>,
    },
    SleepStage(SleepStage),
    SleepSession { stages: Vec<StageSegment> },
    Exercise(ExerciseSession),
}

/// Platform observation, normalized only as far as its shape. Never persisted.
#[derive(Clone, Debug, PartialEq)]
pub struct RawRecord {
    pub start_time: Option<DateTime<FixedOffset>>,
    pub end_time: Option<DateTime<FixedOffset>>,
    /// Originating app or device, when the platform reports one
    pub source: Option<String>,
    pub payload: RawPayload,
}

impl RawRecord {
    pub fn instant(time: DateTime<FixedOffset>, payload: RawPayload) -> Self {
        Self {
            start_time: Some(time),
            end_time: None,
            source: None,
            payload,
        }
    }

    pub fn interval(
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
        payload: RawPayload,
    ) -> Self {
        Self {
            start_time: Some(start),
            end_time: Some(end),
            source: None,
            payload,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Timestamp that decides the day bucket: end time, falling back to start time.
    pub fn bucket_time(&self) -> Option<DateTime<FixedOffset>> {
        self.end_time.or(self.start_time)
    }

    /// Timestamp that decides the event date of point-in-time and session records.
    pub fn event_time(&self) -> Option<DateTime<FixedOffset>> {
        self.start_time.or(self.end_time)
    }
}

/// One row per calendar day per metric.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AggregatedRecord {
    pub date: NaiveDate,
    pub value: f64,
    #[serde(rename = "type")]
    pub record_type: String,
}

/// Minutes spent in each sleep stage.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StageMinutes {
    pub awake: f64,
    pub light: f64,
    pub deep: f64,
    pub rem: f64,
    pub asleep: f64,
    pub in_bed: f64,
    pub unknown: f64,
}

impl StageMinutes {
    pub fn add(&mut self, stage: SleepStage, minutes: f64) {
        let slot = match stage {
            SleepStage::Awake => &mut self.awake,
            SleepStage::Light => &mut self.light,
            SleepStage::Deep => &mut self.deep,
            SleepStage::Rem => &mut self.rem,
            SleepStage::Asleep => &mut self.asleep,
            SleepStage::InBed => &mut self.in_bed,
            SleepStage::Unknown => &mut self.unknown,
        };
        *slot += minutes;
    }

    pub fn time_asleep(&self) -> f64 {
        self.light + self.deep + self.rem + self.asleep
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SleepStageEvent {
    pub stage: SleepStage,
    pub start_time: DateTime<FixedOffset>,
    pub end_time: DateTime<FixedOffset>,
    pub duration_in_seconds: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SleepDetail {
    pub bedtime: DateTime<FixedOffset>,
    pub wake_time: DateTime<FixedOffset>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub time_asleep_minutes: f64,
    pub stage_minutes: StageMinutes,
    pub stage_events: Vec<SleepStageEvent>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LapDetail {
    pub start_time: DateTime<FixedOffset>,
    pub end_time: DateTime<FixedOffset>,
    pub duration_minutes: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExerciseDetail {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub start_time: DateTime<FixedOffset>,
    pub end_time: DateTime<FixedOffset>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calories_kcal: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub laps: Vec<LapDetail>,
}

/// The only shape that crosses the sync boundary to the server.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CanonicalHealthRecord {
    #[serde(rename = "type")]
    pub record_type: String,
    pub date: NaiveDate,
    pub value: f64,
    pub unit: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub sleep: Option<SleepDetail>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub exercise: Option<ExerciseDetail>,
}

impl CanonicalHealthRecord {
    /// Build a record, returning None when the date is missing or the value is
    /// missing or not finite. No placeholder is ever substituted.
    pub fn checked(
        record_type: impl Into<String>,
        date: Option<NaiveDate>,
        value: Option<f64>,
        unit: Unit,
    ) -> Option<Self> {
        let date = date?;
        let value = value.filter(|v| v.is_finite())?;
        Some(Self {
            record_type: record_type.into(),
            date,
            value,
            unit: unit.symbol().to_string(),
            sleep: None,
            exercise: None,
        })
    }

    pub fn with_sleep(mut self, detail: SleepDetail) -> Self {
        self.sleep = Some(detail);
        self
    }

    pub fn with_exercise(mut self, detail: ExerciseDetail) -> Self {
        self.exercise = Some(detail);
        self
    }
}
