// src/source/healthkit.rs
//! HealthKit adapter implementing RecordSource.
//!
//! HealthKit hands back typed samples: quantity samples in a requested unit,
//! category samples for sleep, correlations for blood pressure and workouts.
//! Cumulative statistics come from a single-range sum query, so daily rows are
//! produced by querying one local calendar day at a time.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::{
    supports_via_constituents, Access, Availability, BridgeError, PermissionRequest, RecordSource,
    SourceError,
};
use crate::convert::Unit;
use crate::metric::{MetricDescriptor, MetricKind};
use crate::record::{
    AggregatedRecord, ExerciseSession, Lap, Quantity, RawPayload, RawRecord, SleepStage,
};
use crate::window::SyncWindow;

const BLOOD_PRESSURE_SYSTOLIC: &str = "HKQuantityTypeIdentifierBloodPressureSystolic";
const BLOOD_PRESSURE_DIASTOLIC: &str = "HKQuantityTypeIdentifierBloodPressureDiastolic";

#[derive(Clone, Debug, PartialEq)]
pub struct HkQuantitySample {
    pub uuid: String,
    pub start_date: DateTime<FixedOffset>,
    pub end_date: DateTime<FixedOffset>,
    /// Value in the unit passed to the query
    pub quantity: f64,
    pub source_name: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct HkCategorySample {
    pub uuid: String,
    pub start_date: DateTime<FixedOffset>,
    pub end_date: DateTime<FixedOffset>,
    /// Raw HKCategoryValue
    pub value: i64,
    pub source_name: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct HkCorrelationMember {
    pub type_identifier: String,
    pub sample: HkQuantitySample,
}

#[derive(Clone, Debug, PartialEq)]
pub struct HkCorrelation {
    pub uuid: String,
    pub start_date: DateTime<FixedOffset>,
    pub end_date: DateTime<FixedOffset>,
    pub objects: Vec<HkCorrelationMember>,
    pub source_name: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct HkWorkoutLap {
    pub start_date: DateTime<FixedOffset>,
    pub end_date: DateTime<FixedOffset>,
    pub distance_meters: Option<f64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct HkWorkout {
    pub uuid: String,
    pub activity_name: Option<String>,
    pub start_date: DateTime<FixedOffset>,
    pub end_date: DateTime<FixedOffset>,
    pub total_energy_burned_kcal: Option<f64>,
    pub total_distance_meters: Option<f64>,
    pub laps: Vec<HkWorkoutLap>,
    pub source_name: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum HkSample {
    Quantity(HkQuantitySample),
    Category(HkCategorySample),
    Correlation(HkCorrelation),
    Workout(HkWorkout),
}

/// Native HealthKit surface the adapter consumes.
#[async_trait]
pub trait HealthKitBridge: Send + Sync {
    async fn is_health_data_available(&self) -> bool;

    /// Presents the authorization sheet. HealthKit never reveals read grants,
    /// so success only means the sheet was handled.
    async fn request_authorization(
        &self,
        to_share: &[&'static str],
        to_read: &[&'static str],
    ) -> Result<(), BridgeError>;

    async fn query_samples(
        &self,
        type_identifier: &str,
        unit: Option<&str>,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Result<Vec<HkSample>, BridgeError>;

    /// HKStatisticsQuery with `.cumulativeSum` over one range; None when no data.
    async fn cumulative_sum(
        &self,
        type_identifier: &str,
        unit: &str,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Result<Option<f64>, BridgeError>;
}

/// HealthKit type for a metric: identifier, query unit string and what that unit means.
#[derive(Clone, Copy, Debug)]
struct HkType {
    identifier: &'static str,
    unit: Option<(&'static str, Unit)>,
    cumulative: bool,
}

const fn quantity(identifier: &'static str, unit: &'static str, meaning: Unit, cumulative: bool) -> HkType {
    HkType {
        identifier,
        unit: Some((unit, meaning)),
        cumulative,
    }
}

fn hk_type(kind: MetricKind) -> Option<HkType> {
    let t = match kind {
        MetricKind::Steps => quantity("HKQuantityTypeIdentifierStepCount", "count", Unit::Count, true),
        MetricKind::ActiveCalories => {
            quantity("HKQuantityTypeIdentifierActiveEnergyBurned", "kcal", Unit::Kilocalories, true)
        }
        MetricKind::BasalCalories => {
            quantity("HKQuantityTypeIdentifierBasalEnergyBurned", "kcal", Unit::Kilocalories, true)
        }
        MetricKind::HeartRate => {
            quantity("HKQuantityTypeIdentifierHeartRate", "count/min", Unit::BeatsPerMinute, false)
        }
        MetricKind::Distance => {
            quantity("HKQuantityTypeIdentifierDistanceWalkingRunning", "m", Unit::Meters, true)
        }
        MetricKind::FloorsClimbed => {
            quantity("HKQuantityTypeIdentifierFlightsClimbed", "count", Unit::Count, true)
        }
        MetricKind::Hydration => {
            quantity("HKQuantityTypeIdentifierDietaryWater", "mL", Unit::Milliliters, true)
        }
        MetricKind::Weight => quantity("HKQuantityTypeIdentifierBodyMass", "kg", Unit::Kilograms, false),
        MetricKind::Height => quantity("HKQuantityTypeIdentifierHeight", "cm", Unit::Centimeters, false),
        // HealthKit's "%" unit yields 0-1 values
        MetricKind::BodyFat => {
            quantity("HKQuantityTypeIdentifierBodyFatPercentage", "%", Unit::Fraction, false)
        }
        MetricKind::BloodGlucose => quantity(
            "HKQuantityTypeIdentifierBloodGlucose",
            "mg/dL",
            Unit::MilligramsPerDeciliter,
            false,
        ),
        MetricKind::OxygenSaturation => {
            quantity("HKQuantityTypeIdentifierOxygenSaturation", "%", Unit::Fraction, false)
        }
        MetricKind::RestingHeartRate => quantity(
            "HKQuantityTypeIdentifierRestingHeartRate",
            "count/min",
            Unit::BeatsPerMinute,
            false,
        ),
        MetricKind::RespiratoryRate => quantity(
            "HKQuantityTypeIdentifierRespiratoryRate",
            "count/min",
            Unit::BreathsPerMinute,
            false,
        ),
        MetricKind::Vo2Max => quantity(
            "HKQuantityTypeIdentifierVO2Max",
            "ml/kg*min",
            Unit::MillilitersPerKilogramMinute,
            false,
        ),
        MetricKind::LeanBodyMass => {
            quantity("HKQuantityTypeIdentifierLeanBodyMass", "kg", Unit::Kilograms, false)
        }
        MetricKind::HeartRateVariability => quantity(
            "HKQuantityTypeIdentifierHeartRateVariabilitySDNN",
            "ms",
            Unit::Milliseconds,
            false,
        ),
        MetricKind::BloodPressure => quantity(
            "HKCorrelationTypeIdentifierBloodPressure",
            "mmHg",
            Unit::MillimetersOfMercury,
            false,
        ),
        MetricKind::Sleep => HkType {
            identifier: "HKCategoryTypeIdentifierSleepAnalysis",
            unit: None,
            cumulative: false,
        },
        MetricKind::Exercise => HkType {
            identifier: "HKWorkoutTypeIdentifier",
            unit: None,
            cumulative: false,
        },
        MetricKind::TotalCalories
        | MetricKind::Stress
        | MetricKind::BodyBattery
        | MetricKind::IntensityMinutes
        | MetricKind::ActiveMinutes
        | MetricKind::Workout => return None,
    };
    Some(t)
}

/// HKCategoryValueSleepAnalysis
fn sleep_stage(value: i64) -> SleepStage {
    match value {
        0 => SleepStage::InBed,
        1 => SleepStage::Asleep,
        2 => SleepStage::Awake,
        3 => SleepStage::Light,
        4 => SleepStage::Deep,
        5 => SleepStage::Rem,
        _ => SleepStage::Unknown,
    }
}

/// HealthKit-backed record source
pub struct HealthKitSource<B> {
    bridge: B,
    availability: OnceCell<Availability>,
}

impl<B: HealthKitBridge> HealthKitSource<B> {
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

    fn type_for(&self, kind: MetricKind) -> Result<HkType, SourceError> {
        hk_type(kind).ok_or(SourceError::Unsupported {
            metric: kind,
            platform: self.platform(),
        })
    }

    fn to_raw(&self, kind: MetricKind, meaning: Option<Unit>, sample: HkSample) -> Option<RawRecord> {
        let record = match (kind, sample) {
            (MetricKind::BloodPressure, HkSample::Correlation(c)) => {
                let member = |id: &str| {
                    c.objects
                        .iter()
                        .find(|m| m.type_identifier == id)
                        .map(|m| m.sample.quantity)
                };
                let payload = RawPayload::BloodPressure {
                    systolic: member(BLOOD_PRESSURE_SYSTOLIC),
                    diastolic: member(BLOOD_PRESSURE_DIASTOLIC),
                };
                with_source(RawRecord::instant(c.start_date, payload), c.source_name)
            }
            (MetricKind::Sleep, HkSample::Category(c)) => with_source(
                RawRecord::interval(
                    c.start_date,
                    c.end_date,
                    RawPayload::SleepStage(sleep_stage(c.value)),
                ),
                c.source_name,
            ),
            (MetricKind::Exercise, HkSample::Workout(w)) => {
                let session = ExerciseSession {
                    activity_type: w.activity_name,
                    title: None,
                    energy: w
                        .total_energy_burned_kcal
                        .map(|v| Quantity::new(v, Unit::Kilocalories)),
                    distance: w.total_distance_meters.map(|v| Quantity::new(v, Unit::Meters)),
                    laps: w
                        .laps
                        .into_iter()
                        .map(|lap| Lap {
                            start: lap.start_date,
                            end: lap.end_date,
                            distance: lap.distance_meters.map(|v| Quantity::new(v, Unit::Meters)),
                        })
                        .collect(),
                };
                with_source(
                    RawRecord::interval(w.start_date, w.end_date, RawPayload::Exercise(session)),
                    w.source_name,
                )
            }
            (_, HkSample::Quantity(q)) => {
                let unit = meaning?;
                let payload = RawPayload::Quantity(Quantity::new(q.quantity, unit));
                let record = if q.start_date == q.end_date {
                    RawRecord::instant(q.start_date, payload)
                } else {
                    RawRecord::interval(q.start_date, q.end_date, payload)
                };
                with_source(record, q.source_name)
            }
            (kind, other) => {
                debug!(metric = %kind, sample = ?other, "unexpected HealthKit sample shape, dropping");
                return None;
            }
        };
        Some(record)
    }
}

fn with_source(record: RawRecord, source: Option<String>) -> RawRecord {
    match source {
        Some(name) => record.with_source(name),
        None => record,
    }
}

#[async_trait]
impl<B: HealthKitBridge> RecordSource for HealthKitSource<B> {
    fn platform(&self) -> &'static str {
        "healthkit"
    }

    async fn initialize(&self) -> bool {
        self.availability
            .get_or_init(|| async {
                if self.bridge.is_health_data_available().await {
                    info!("HealthKit available");
                    Availability::Available
                } else {
                    warn!("HealthKit not available on this device");
                    Availability::Unavailable {
                        reason: "HealthKit is not available on this device".to_string(),
                    }
                }
            })
            .await
            .is_available()
    }

    fn supports_metric(&self, kind: MetricKind) -> bool {
        hk_type(kind).is_some() || supports_via_constituents(kind, |k| hk_type(k).is_some())
    }

    fn supports_statistic(&self, kind: MetricKind) -> bool {
        hk_type(kind).is_some_and(|t| t.cumulative)
    }

    async fn request_permissions(&self, requests: &[PermissionRequest]) -> bool {
        if self.ensure_initialized().is_err() {
            warn!("permission request before HealthKit initialization");
            return false;
        }
        let mut to_read = Vec::new();
        let mut to_share = Vec::new();
        for request in requests {
            let kinds: Vec<MetricKind> = if request.metric.constituents().is_empty() {
                vec![request.metric]
            } else {
                request.metric.constituents().to_vec()
            };
            for kind in kinds {
                let Some(t) = hk_type(kind) else { continue };
                let target = match request.access {
                    Access::Read => &mut to_read,
                    Access::Write => &mut to_share,
                };
                if !target.contains(&t.identifier) {
                    target.push(t.identifier);
                }
            }
        }
        match self.bridge.request_authorization(&to_share, &to_read).await {
            Ok(()) => {
                debug!(read = to_read.len(), share = to_share.len(), "HealthKit authorization completed");
                true
            }
            Err(e) => {
                warn!(error = %e, "HealthKit authorization failed");
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
        let t = self.type_for(kind)?;
        let samples = self
            .bridge
            .query_samples(t.identifier, t.unit.map(|(s, _)| s), window.start(), window.end())
            .await?;
        let total = samples.len();
        let records: Vec<RawRecord> = samples
            .into_iter()
            .filter_map(|s| self.to_raw(kind, t.unit.map(|(_, u)| u), s))
            .collect();
        debug!(metric = %kind, total, kept = records.len(), "read HealthKit samples");
        Ok(records)
    }

    async fn try_read_aggregated_statistic(
        &self,
        descriptor: &MetricDescriptor,
        window: &SyncWindow,
    ) -> Result<Vec<AggregatedRecord>, SourceError> {
        self.ensure_initialized()?;
        let kind = descriptor.kind;
        let t = self.type_for(kind)?;
        let (unit_str, meaning) = match t.unit {
            Some(u) if t.cumulative => u,
            _ => {
                return Err(SourceError::Unsupported {
                    metric: kind,
                    platform: self.platform(),
                })
            }
        };

        // One statistics query per local day, issued together.
        let days = window.day_ranges()?;
        let sums = futures::future::try_join_all(days.iter().map(|day| {
            self.bridge
                .cumulative_sum(t.identifier, unit_str, day.start, day.end)
        }))
        .await?;

        let mut rows = Vec::new();
        for (day, sum) in days.iter().zip(sums) {
            let value = sum.and_then(|v| Quantity::new(v, meaning).value_in(descriptor.unit));
            match value {
                Some(v) if v > 0.0 => rows.push(AggregatedRecord {
                    date: day.date,
                    value: v,
                    record_type: descriptor.record_type.to_string(),
                }),
                _ => debug!(metric = %kind, date = %day.date, "no statistic for day"),
            }
        }
        Ok(rows)
    }
}
