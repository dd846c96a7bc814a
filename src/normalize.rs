//! Event normalization
//!
//! Raw log rows arrive with inconsistent timestamp formats, mixed weight
//! units and missing fields. This module converts them into the canonical
//! event types in `models`, and owns the single civil-timezone conversion
//! every hour-of-day computation must go through.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::GlucoraError;
use crate::models::{
    ActivityEvent, AnalysisWindow, GlucoseReading, Intensity, MealEvent, MedicationEvent,
    PatientProfile, PatientSnapshot, TimingTag, WeightEvent,
};

/// Pounds-to-kilograms conversion factor
pub const LB_TO_KG: f64 = 0.453592;

/// Accepted timezone-naive timestamp layouts, tried in order after RFC 3339
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Civil-timezone policy for hour-of-day bucketing
///
/// Injected from configuration rather than hardcoded so the engine is
/// portable across deployments. Every analyzer that looks at "what hour was
/// this" converts through here; mixing conversions would silently corrupt
/// circadian results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimePolicy {
    offset: FixedOffset,
}

impl TimePolicy {
    /// Build from minutes east of UTC
    pub fn from_offset_minutes(minutes: i32) -> Result<Self, GlucoraError> {
        let offset = FixedOffset::east_opt(minutes * 60).ok_or_else(|| {
            GlucoraError::Configuration(format!("invalid timezone offset: {} minutes", minutes))
        })?;
        Ok(TimePolicy { offset })
    }

    /// Convert an instant to local civil time
    pub fn local(&self, instant: DateTime<Utc>) -> DateTime<FixedOffset> {
        instant.with_timezone(&self.offset)
    }

    /// Local hour of day, 0-23
    pub fn local_hour(&self, instant: DateTime<Utc>) -> u32 {
        self.local(instant).hour()
    }

    /// Minutes elapsed since local midnight
    pub fn minutes_since_midnight(&self, instant: DateTime<Utc>) -> u32 {
        let local = self.local(instant);
        local.hour() * 60 + local.minute()
    }

    /// Local calendar date
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        self.local(instant).date_naive()
    }
}

/// Parse a logged timestamp into a UTC instant.
///
/// Accepts RFC 3339 (including the trailing literal "Z"), then the naive
/// layouts clients have historically sent. Timezone-naive values are assumed
/// UTC. Returns `None` for unparsable text; callers drop the record and
/// continue.
pub fn parse_instant(text: &str) -> Option<DateTime<Utc>> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.with_timezone(&Utc));
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(naive.and_utc());
        }
    }

    debug!(timestamp = trimmed, "dropping record with unparsable timestamp");
    None
}

/// Convert a weight value to kilograms given its logged unit.
///
/// Unknown or missing units are taken as kilograms already.
pub fn weight_to_kg(value: f64, unit: Option<&str>) -> f64 {
    match unit.map(|u| u.trim().to_lowercase()) {
        Some(u) if u == "lb" || u == "lbs" || u == "pound" || u == "pounds" => value * LB_TO_KG,
        _ => value,
    }
}

/// Raw glucose log row as stored
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RawGlucoseRow {
    pub reading: Option<f64>,
    pub timestamp: Option<String>,
    pub timing: Option<String>,
    pub notes: Option<String>,
}

/// Raw meal log row as stored
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RawMealRow {
    pub meal: Option<String>,
    pub description: Option<String>,
    pub timestamp: Option<String>,
}

/// Raw medication log row as stored
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RawMedicationRow {
    pub medication_name: Option<String>,
    pub quantity: Option<String>,
    pub timestamp: Option<String>,
    pub notes: Option<String>,
}

/// Raw activity log row as stored
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RawActivityRow {
    pub activity_type: Option<String>,
    pub duration_minutes: Option<f64>,
    pub intensity: Option<String>,
    pub timestamp: Option<String>,
}

/// Raw weight log row as stored
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RawWeightRow {
    pub weight: Option<f64>,
    pub unit: Option<String>,
    pub timestamp: Option<String>,
}

/// Normalize glucose rows.
///
/// Rows without a timestamp are excluded (the event effectively never
/// happened); a missing reading value normalizes to 0.0 so row positions
/// stay aligned with sibling per-event lists. 0.0 means "no data" downstream,
/// never a real measurement.
pub fn normalize_glucose(rows: &[RawGlucoseRow]) -> Vec<GlucoseReading> {
    rows.iter()
        .filter_map(|row| {
            let instant = parse_instant(row.timestamp.as_deref()?)?;
            Some(GlucoseReading {
                reading: row.reading.unwrap_or(0.0),
                instant,
                timing_tag: row.timing.as_deref().and_then(TimingTag::parse),
                notes: row.notes.clone(),
            })
        })
        .collect()
}

/// Normalize meal rows. Rows without a timestamp or label are excluded.
pub fn normalize_meals(rows: &[RawMealRow]) -> Vec<MealEvent> {
    rows.iter()
        .filter_map(|row| {
            let instant = parse_instant(row.timestamp.as_deref()?)?;
            let label = row.meal.as_deref()?.trim();
            if label.is_empty() {
                return None;
            }
            Some(MealEvent {
                label: label.to_string(),
                description: row.description.clone(),
                instant,
            })
        })
        .collect()
}

/// Normalize medication rows. Rows without a timestamp or name are excluded.
pub fn normalize_medications(rows: &[RawMedicationRow]) -> Vec<MedicationEvent> {
    rows.iter()
        .filter_map(|row| {
            let instant = parse_instant(row.timestamp.as_deref()?)?;
            let name = row.medication_name.as_deref()?.trim();
            if name.is_empty() {
                return None;
            }
            Some(MedicationEvent {
                medication_name: name.to_string(),
                quantity: row.quantity.clone(),
                instant,
                notes: row.notes.clone(),
            })
        })
        .collect()
}

/// Normalize activity rows. Missing duration normalizes to 0 minutes.
pub fn normalize_activities(rows: &[RawActivityRow]) -> Vec<ActivityEvent> {
    rows.iter()
        .filter_map(|row| {
            let instant = parse_instant(row.timestamp.as_deref()?)?;
            let activity_type = row.activity_type.as_deref()?.trim();
            if activity_type.is_empty() {
                return None;
            }
            let duration = row.duration_minutes.unwrap_or(0.0).max(0.0).round() as u32;
            Some(ActivityEvent {
                activity_type: activity_type.to_string(),
                duration_minutes: duration,
                intensity: row.intensity.as_deref().map(Intensity::parse),
                instant,
            })
        })
        .collect()
}

/// Normalize weight rows, converting pounds to kilograms.
///
/// Rows without a timestamp or a positive value are excluded; unlike the
/// glucose list, weight rows have no positional alignment to preserve.
pub fn normalize_weights(rows: &[RawWeightRow]) -> Vec<WeightEvent> {
    rows.iter()
        .filter_map(|row| {
            let instant = parse_instant(row.timestamp.as_deref()?)?;
            let weight = row.weight?;
            if weight <= 0.0 {
                return None;
            }
            Some(WeightEvent {
                weight_kg: weight_to_kg(weight, row.unit.as_deref()),
                instant,
            })
        })
        .collect()
}

/// Raw per-patient snapshot as handed over by the data-access layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSnapshot {
    pub profile: PatientProfile,

    /// Days of history this snapshot covers
    pub days_of_history: u32,

    /// Reference instant as a timestamp string; falls back to the caller's
    /// `default_now` when missing or unparsable
    #[serde(default)]
    pub now: Option<String>,

    #[serde(default)]
    pub glucose_readings: Vec<RawGlucoseRow>,
    #[serde(default)]
    pub meal_logs: Vec<RawMealRow>,
    #[serde(default)]
    pub medication_logs: Vec<RawMedicationRow>,
    #[serde(default)]
    pub activity_logs: Vec<RawActivityRow>,
    #[serde(default)]
    pub weight_logs: Vec<RawWeightRow>,
}

impl RawSnapshot {
    /// Normalize every log list into a canonical snapshot.
    ///
    /// `default_now` supplies the reference instant when the raw snapshot
    /// does not carry one; pass a fixed value in tests to keep runs
    /// reproducible.
    pub fn normalize(&self, default_now: DateTime<Utc>) -> Result<PatientSnapshot, GlucoraError> {
        let now = self
            .now
            .as_deref()
            .and_then(parse_instant)
            .unwrap_or(default_now);
        let window = AnalysisWindow::new(self.days_of_history, now);
        window.validate()?;

        Ok(PatientSnapshot {
            profile: self.profile.clone(),
            window,
            glucose: normalize_glucose(&self.glucose_readings),
            meals: normalize_meals(&self.meal_logs),
            medications: normalize_medications(&self.medication_logs),
            activities: normalize_activities(&self.activity_logs),
            weights: normalize_weights(&self.weight_logs),
        })
    }
}
