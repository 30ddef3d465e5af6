// src/convert.rs
//! Shared unit conversion utilities

use serde::{Deserialize, Serialize};

/// Measurement units seen on the platform side and on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Count,
    Kilocalories,
    Kilojoules,
    Meters,
    Kilometers,
    Centimeters,
    Inches,
    Miles,
    Kilograms,
    Grams,
    Pounds,
    /// 0-100 scale.
    Percent,
    /// 0-1 scale; HealthKit reports percentages this way.
    Fraction,
    MillimolesPerLiter,
    MilligramsPerDeciliter,
    BeatsPerMinute,
    BreathsPerMinute,
    MillilitersPerKilogramMinute,
    Milliseconds,
    Seconds,
    Minutes,
    Milliliters,
    Liters,
    MillimetersOfMercury,
    /// Dimensionless 0-100 device index (stress, body battery).
    Score,
}

/// Physical dimension of a unit. Conversion is only defined within a dimension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Dimension {
    Count,
    Energy,
    Length,
    Mass,
    Ratio,
    Glucose,
    HeartRate,
    BreathRate,
    Vo2,
    Time,
    Volume,
    Pressure,
    Score,
}

/// mg/dL per mmol/L for glucose.
const GLUCOSE_MGDL_PER_MMOL: f64 = 18.0182;

impl Unit {
    /// Symbol sent to the server as the canonical `unit` field
    pub fn symbol(&self) -> &'static str {
        match self {
            Unit::Count => "count",
            Unit::Kilocalories => "kcal",
            Unit::Kilojoules => "kJ",
            Unit::Meters => "m",
            Unit::Kilometers => "km",
            Unit::Centimeters => "cm",
            Unit::Inches => "in",
            Unit::Miles => "mi",
            Unit::Kilograms => "kg",
            Unit::Grams => "g",
            Unit::Pounds => "lb",
            Unit::Percent => "%",
            Unit::Fraction => "fraction",
            Unit::MillimolesPerLiter => "mmol/L",
            Unit::MilligramsPerDeciliter => "mg/dL",
            Unit::BeatsPerMinute => "bpm",
            Unit::BreathsPerMinute => "breaths/min",
            Unit::MillilitersPerKilogramMinute => "ml/kg/min",
            Unit::Milliseconds => "ms",
            Unit::Seconds => "s",
            Unit::Minutes => "min",
            Unit::Milliliters => "mL",
            Unit::Liters => "L",
            Unit::MillimetersOfMercury => "mmHg",
            Unit::Score => "score",
        }
    }

    fn dimension(&self) -> Dimension {
        match self {
            Unit::Count => Dimension::Count,
            Unit::Kilocalories | Unit::Kilojoules => Dimension::Energy,
            Unit::Meters | Unit::Kilometers | Unit::Centimeters | Unit::Inches | Unit::Miles => {
                Dimension::Length
            }
            Unit::Kilograms | Unit::Grams | Unit::Pounds => Dimension::Mass,
            Unit::Percent | Unit::Fraction => Dimension::Ratio,
            Unit::MillimolesPerLiter | Unit::MilligramsPerDeciliter => Dimension::Glucose,
            Unit::BeatsPerMinute => Dimension::HeartRate,
            Unit::BreathsPerMinute => Dimension::BreathRate,
            Unit::MillilitersPerKilogramMinute => Dimension::Vo2,
            Unit::Milliseconds | Unit::Seconds | Unit::Minutes => Dimension::Time,
            Unit::Milliliters | Unit::Liters => Dimension::Volume,
            Unit::MillimetersOfMercury => Dimension::Pressure,
            Unit::Score => Dimension::Score,
        }
    }

    /// Multiplier taking a value in this unit to the dimension's base unit
    /// (kcal, m, kg, %, mmol/L, s, mL; identity elsewhere).
    fn to_base(&self) -> f64 {
        match self {
            Unit::Kilojoules => 1.0 / 4.184,
            Unit::Kilometers => 1000.0,
            Unit::Centimeters => 0.01,
            Unit::Inches => 0.0254,
            Unit::Miles => 1609.344,
            Unit::Grams => 0.001,
            Unit::Pounds => 0.453_592_37,
            Unit::Fraction => 100.0,
            Unit::MilligramsPerDeciliter => 1.0 / GLUCOSE_MGDL_PER_MMOL,
            Unit::Milliseconds => 0.001,
            Unit::Minutes => 60.0,
            Unit::Liters => 1000.0,
            _ => 1.0,
        }
    }
}

impl std::fmt::Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Convert `value` from one unit to another.
/// Returns None when the units measure different things or the input is not finite.
pub fn convert(value: f64, from: Unit, to: Unit) -> Option<f64> {
    if !value.is_finite() {
        return None;
    }
    if from == to {
        return Some(value);
    }
    if from.dimension() != to.dimension() {
        tracing::debug!(%from, %to, "no conversion between units");
        return None;
    }
    let converted = value * from.to_base() / to.to_base();
    converted.is_finite().then_some(converted)
}

pub fn grams_to_kg(g: f64) -> f64 {
    g / 1000.0
}

pub fn meters_to_km(m: f64) -> f64 {
    m / 1000.0
}

pub fn seconds_to_minutes(s: f64) -> f64 {
    s / 60.0
}
