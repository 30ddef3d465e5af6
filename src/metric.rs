// src/metric.rs
//! Supported health metrics and their static descriptors.

use crate::convert::Unit;

/// Type-safe representation of the metric kinds the engine can sync
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetricKind {
    Steps,
    ActiveCalories,
    BasalCalories,
    TotalCalories,
    HeartRate,
    Distance,
    FloorsClimbed,
    Hydration,
    Weight,
    Height,
    BodyFat,
    BloodGlucose,
    OxygenSaturation,
    RestingHeartRate,
    RespiratoryRate,
    Vo2Max,
    LeanBodyMass,
    HeartRateVariability,
    BloodPressure,
    Sleep,
    Exercise,
    Stress,
    BodyBattery,
    IntensityMinutes,
    ActiveMinutes,
    Workout,
}

impl MetricKind {
    /// Platform-neutral record identifier (the key sources and transform handlers use)
    pub fn id(&self) -> &'static str {
        match self {
            MetricKind::Steps => "Steps",
            MetricKind::ActiveCalories => "ActiveCaloriesBurned",
            MetricKind::BasalCalories => "BasalCaloriesBurned",
            MetricKind::TotalCalories => "TotalCaloriesBurned",
            MetricKind::HeartRate => "HeartRate",
            MetricKind::Distance => "Distance",
            MetricKind::FloorsClimbed => "FloorsClimbed",
            MetricKind::Hydration => "Hydration",
            MetricKind::Weight => "Weight",
            MetricKind::Height => "Height",
            MetricKind::BodyFat => "BodyFat",
            MetricKind::BloodGlucose => "BloodGlucose",
            MetricKind::OxygenSaturation => "OxygenSaturation",
            MetricKind::RestingHeartRate => "RestingHeartRate",
            MetricKind::RespiratoryRate => "RespiratoryRate",
            MetricKind::Vo2Max => "Vo2Max",
            MetricKind::LeanBodyMass => "LeanBodyMass",
            MetricKind::HeartRateVariability => "HeartRateVariability",
            MetricKind::BloodPressure => "BloodPressure",
            MetricKind::Sleep => "SleepSession",
            MetricKind::Exercise => "ExerciseSession",
            MetricKind::Stress => "Stress",
            MetricKind::BodyBattery => "BodyBattery",
            MetricKind::IntensityMinutes => "IntensityMinutes",
            MetricKind::ActiveMinutes => "ActiveMinutes",
            MetricKind::Workout => "Workout",
        }
    }

    /// All supported metric kinds, in sync order
    pub fn all() -> &'static [MetricKind] {
        &[
            MetricKind::Steps,
            MetricKind::ActiveCalories,
            MetricKind::BasalCalories,
            MetricKind::TotalCalories,
            MetricKind::HeartRate,
            MetricKind::Distance,
            MetricKind::FloorsClimbed,
            MetricKind::Hydration,
            MetricKind::Weight,
            MetricKind::Height,
            MetricKind::BodyFat,
            MetricKind::BloodGlucose,
            MetricKind::OxygenSaturation,
            MetricKind::RestingHeartRate,
            MetricKind::RespiratoryRate,
            MetricKind::Vo2Max,
            MetricKind::LeanBodyMass,
            MetricKind::HeartRateVariability,
            MetricKind::BloodPressure,
            MetricKind::Sleep,
            MetricKind::Exercise,
            MetricKind::Stress,
            MetricKind::BodyBattery,
            MetricKind::IntensityMinutes,
            MetricKind::ActiveMinutes,
            MetricKind::Workout,
        ]
    }

    /// Parse from record identifier string
    pub fn from_id(id: &str) -> Option<MetricKind> {
        MetricKind::all().iter().copied().find(|kind| kind.id() == id)
    }

    /// Metrics that must be read to produce this one.
    /// Only derived metrics have constituents.
    pub fn constituents(&self) -> &'static [MetricKind] {
        match self {
            MetricKind::TotalCalories => &[MetricKind::BasalCalories, MetricKind::ActiveCalories],
            _ => &[],
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// How raw observations of a metric reduce to what the transformer sees.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reduction {
    /// Daily total of interval values
    Sum,
    /// Daily mean rounded to the nearest integer
    Mean,
    /// Daily basal + active energy
    DerivedTotal,
    /// No reduction; raw records go straight to the transformer
    None,
}

/// Static configuration for one supported metric.
#[derive(Clone, Debug, PartialEq)]
pub struct MetricDescriptor {
    pub kind: MetricKind,
    /// Canonical `type` field on the wire
    pub record_type: &'static str,
    pub unit: Unit,
    /// Preference key holding the enable flag
    pub state_key: &'static str,
    pub reduction: Reduction,
    /// Whether platform-native daily statistics should be preferred over summing raw records
    pub native_statistic: bool,
}

impl MetricDescriptor {
    /// Record-source identifier to query
    pub fn id(&self) -> &'static str {
        self.kind.id()
    }
}

const fn descriptor(
    kind: MetricKind,
    record_type: &'static str,
    unit: Unit,
    state_key: &'static str,
    reduction: Reduction,
    native_statistic: bool,
) -> MetricDescriptor {
    MetricDescriptor {
        kind,
        record_type,
        unit,
        state_key,
        reduction,
        native_statistic,
    }
}

static BUILTIN: &[MetricDescriptor] = &[
    descriptor(MetricKind::Steps, "step", Unit::Count, "isStepsSyncEnabled", Reduction::Sum, true),
    descriptor(
        MetricKind::ActiveCalories,
        "active_calories",
        Unit::Kilocalories,
        "isActiveCaloriesSyncEnabled",
        Reduction::Sum,
        true,
    ),
    descriptor(
        MetricKind::BasalCalories,
        "basal_calories",
        Unit::Kilocalories,
        "isBasalCaloriesSyncEnabled",
        Reduction::Sum,
        true,
    ),
    descriptor(
        MetricKind::TotalCalories,
        "total_calories",
        Unit::Kilocalories,
        "isTotalCaloriesSyncEnabled",
        Reduction::DerivedTotal,
        true,
    ),
    descriptor(
        MetricKind::HeartRate,
        "heart_rate",
        Unit::BeatsPerMinute,
        "isHeartRateSyncEnabled",
        Reduction::Mean,
        false,
    ),
    descriptor(
        MetricKind::Distance,
        "distance",
        Unit::Kilometers,
        "isDistanceSyncEnabled",
        Reduction::Sum,
        true,
    ),
    descriptor(
        MetricKind::FloorsClimbed,
        "floors_climbed",
        Unit::Count,
        "isFloorsClimbedSyncEnabled",
        Reduction::Sum,
        true,
    ),
    descriptor(
        MetricKind::Hydration,
        "water",
        Unit::Milliliters,
        "isHydrationSyncEnabled",
        Reduction::Sum,
        false,
    ),
    descriptor(MetricKind::Weight, "weight", Unit::Kilograms, "isWeightSyncEnabled", Reduction::None, false),
    descriptor(MetricKind::Height, "height", Unit::Centimeters, "isHeightSyncEnabled", Reduction::None, false),
    descriptor(
        MetricKind::BodyFat,
        "body_fat_percentage",
        Unit::Percent,
        "isBodyFatSyncEnabled",
        Reduction::None,
        false,
    ),
    descriptor(
        MetricKind::BloodGlucose,
        "blood_glucose",
        Unit::MillimolesPerLiter,
        "isBloodGlucoseSyncEnabled",
        Reduction::None,
        false,
    ),
    descriptor(
        MetricKind::OxygenSaturation,
        "oxygen_saturation",
        Unit::Percent,
        "isOxygenSaturationSyncEnabled",
        Reduction::None,
        false,
    ),
    descriptor(
        MetricKind::RestingHeartRate,
        "resting_heart_rate",
        Unit::BeatsPerMinute,
        "isRestingHeartRateSyncEnabled",
        Reduction::None,
        false,
    ),
    descriptor(
        MetricKind::RespiratoryRate,
        "respiratory_rate",
        Unit::BreathsPerMinute,
        "isRespiratoryRateSyncEnabled",
        Reduction::None,
        false,
    ),
    descriptor(
        MetricKind::Vo2Max,
        "vo2_max",
        Unit::MillilitersPerKilogramMinute,
        "isVo2MaxSyncEnabled",
        Reduction::None,
        false,
    ),
    descriptor(
        MetricKind::LeanBodyMass,
        "lean_body_mass",
        Unit::Kilograms,
        "isLeanBodyMassSyncEnabled",
        Reduction::None,
        false,
    ),
    descriptor(
        MetricKind::HeartRateVariability,
        "heart_rate_variability",
        Unit::Milliseconds,
        "isHeartRateVariabilitySyncEnabled",
        Reduction::None,
        false,
    ),
    descriptor(
        MetricKind::BloodPressure,
        "blood_pressure",
        Unit::MillimetersOfMercury,
        "isBloodPressureSyncEnabled",
        Reduction::None,
        false,
    ),
    descriptor(MetricKind::Sleep, "sleep_session", Unit::Minutes, "isSleepSessionSyncEnabled", Reduction::None, false),
    descriptor(
        MetricKind::Exercise,
        "exercise_session",
        Unit::Minutes,
        "isExerciseSessionSyncEnabled",
        Reduction::None,
        false,
    ),
    descriptor(MetricKind::Stress, "stress_level", Unit::Score, "isStressSyncEnabled", Reduction::None, false),
    descriptor(
        MetricKind::BodyBattery,
        "body_battery",
        Unit::Score,
        "isBodyBatterySyncEnabled",
        Reduction::None,
        false,
    ),
    descriptor(
        MetricKind::IntensityMinutes,
        "intensity_minutes",
        Unit::Minutes,
        "isIntensityMinutesSyncEnabled",
        Reduction::Sum,
        true,
    ),
    descriptor(
        MetricKind::ActiveMinutes,
        "active_minutes",
        Unit::Minutes,
        "isActiveMinutesSyncEnabled",
        Reduction::Sum,
        true,
    ),
    descriptor(MetricKind::Workout, "workout", Unit::Minutes, "isWorkoutSyncEnabled", Reduction::None, false),
];

/// Immutable set of metric descriptors, built once at startup.
#[derive(Clone, Debug)]
pub struct MetricCatalog {
    descriptors: Vec<MetricDescriptor>,
}

impl MetricCatalog {
    pub fn builtin() -> Self {
        Self {
            descriptors: BUILTIN.to_vec(),
        }
    }

    /// Catalog restricted to the given kinds, keeping builtin order.
    pub fn only(kinds: &[MetricKind]) -> Self {
        Self {
            descriptors: BUILTIN
                .iter()
                .filter(|d| kinds.contains(&d.kind))
                .cloned()
                .collect(),
        }
    }

    pub fn get(&self, kind: MetricKind) -> Option<&MetricDescriptor> {
        self.descriptors.iter().find(|d| d.kind == kind)
    }

    /// Look up by canonical `type` or record identifier, case-insensitively.
    pub fn find(&self, name: &str) -> Option<&MetricDescriptor> {
        self.descriptors.iter().find(|d| {
            d.record_type.eq_ignore_ascii_case(name) || d.id().eq_ignore_ascii_case(name)
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetricDescriptor> {
        self.descriptors.iter()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

impl Default for MetricCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn kind_round_trips_through_id() {
        for kind in MetricKind::all() {
            assert_eq!(MetricKind::from_id(kind.id()), Some(*kind));
        }
        assert_eq!(MetricKind::from_id("Nutrition"), None);
    }

    #[test]
    fn builtin_catalog_covers_every_kind_once() {
        let catalog = MetricCatalog::builtin();
        assert_eq!(catalog.len(), MetricKind::all().len());
        for kind in MetricKind::all() {
            assert!(catalog.get(*kind).is_some(), "missing descriptor for {}", kind);
        }
    }

    #[test]
    fn state_keys_and_types_are_unique() {
        let catalog = MetricCatalog::builtin();
        let keys: HashSet<_> = catalog.iter().map(|d| d.state_key).collect();
        let types: HashSet<_> = catalog.iter().map(|d| d.record_type).collect();
        assert_eq!(keys.len(), catalog.len());
        assert_eq!(types.len(), catalog.len());
    }

    #[test]
    fn steps_descriptor_matches_wire_contract() {
        let catalog = MetricCatalog::builtin();
        let steps = catalog.get(MetricKind::Steps).unwrap();
        assert_eq!(steps.record_type, "step");
        assert_eq!(steps.unit.symbol(), "count");
        assert_eq!(steps.reduction, Reduction::Sum);
        assert!(steps.native_statistic);
    }

    #[test]
    fn find_accepts_type_or_id() {
        let catalog = MetricCatalog::builtin();
        assert_eq!(catalog.find("step").unwrap().kind, MetricKind::Steps);
        assert_eq!(catalog.find("heartrate").unwrap().kind, MetricKind::HeartRate);
        assert!(catalog.find("nope").is_none());
    }

    #[test]
    fn only_total_calories_has_constituents() {
        for kind in MetricKind::all() {
            let expected = *kind == MetricKind::TotalCalories;
            assert_eq!(!kind.constituents().is_empty(), expected);
        }
    }
}
