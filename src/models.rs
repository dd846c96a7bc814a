use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::GlucoraError;

/// Context tag describing when a glucose reading was taken relative to
/// daily routine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimingTag {
    Waking,
    PreMeal,
    PostMeal,
    Bedtime,
}

impl TimingTag {
    /// Parse a free-text tag as logged by the client.
    ///
    /// Tags are logged inconsistently ("pre-meal", "premeal", "before meal"),
    /// so matching is lenient. Unknown text maps to `None` rather than an
    /// error; a reading without a recognizable tag is still a valid reading.
    pub fn parse(text: &str) -> Option<Self> {
        let normalized: String = text
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        match normalized.as_str() {
            "waking" | "fasting" | "morning" => Some(TimingTag::Waking),
            "premeal" | "beforemeal" => Some(TimingTag::PreMeal),
            "postmeal" | "aftermeal" => Some(TimingTag::PostMeal),
            "bedtime" | "night" => Some(TimingTag::Bedtime),
            _ => None,
        }
    }
}

impl fmt::Display for TimingTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimingTag::Waking => write!(f, "waking"),
            TimingTag::PreMeal => write!(f, "pre-meal"),
            TimingTag::PostMeal => write!(f, "post-meal"),
            TimingTag::Bedtime => write!(f, "bedtime"),
        }
    }
}

/// A single blood glucose measurement in mg/dL
///
/// Invariant: `reading` > 0 for real measurements. A reading of 0.0 means
/// "value missing at ingestion" (see `normalize`); analyzers must treat it
/// as no data, never as hypoglycemia.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlucoseReading {
    /// Measured value in mg/dL
    pub reading: f64,

    /// Timezone-aware instant of the measurement
    pub instant: DateTime<Utc>,

    /// Optional routine context tag
    pub timing_tag: Option<TimingTag>,

    /// Optional free-text notes
    pub notes: Option<String>,
}

/// A logged meal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealEvent {
    /// Free-text meal label; correlation grouping is exact-match on this
    pub label: String,

    /// Optional longer description
    pub description: Option<String>,

    /// Timezone-aware instant the meal was eaten
    pub instant: DateTime<Utc>,
}

/// A logged medication dose
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicationEvent {
    /// Medication name as logged
    pub medication_name: String,

    /// Optional free-text dose quantity ("500mg", "10 units")
    pub quantity: Option<String>,

    /// Timezone-aware instant the dose was taken
    pub instant: DateTime<Utc>,

    /// Optional free-text notes
    pub notes: Option<String>,
}

/// Subjective intensity of an activity session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intensity {
    Low,
    Moderate,
    High,
    /// Free text that did not match a known level
    Other(String),
}

impl Intensity {
    pub fn parse(text: &str) -> Self {
        match text.trim().to_lowercase().as_str() {
            "low" | "light" | "easy" => Intensity::Low,
            "moderate" | "medium" => Intensity::Moderate,
            "high" | "intense" | "vigorous" | "hard" => Intensity::High,
            _ => Intensity::Other(text.trim().to_string()),
        }
    }
}

impl fmt::Display for Intensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Intensity::Low => write!(f, "low"),
            Intensity::Moderate => write!(f, "moderate"),
            Intensity::High => write!(f, "high"),
            Intensity::Other(text) => write!(f, "{}", text),
        }
    }
}

impl Serialize for Intensity {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Intensity {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Ok(Intensity::parse(&text))
    }
}

/// A logged physical activity session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEvent {
    /// Activity type as logged ("walking", "swimming"); correlation
    /// grouping is exact-match on this
    pub activity_type: String,

    /// Session duration in minutes
    pub duration_minutes: u32,

    /// Optional subjective intensity
    pub intensity: Option<Intensity>,

    /// Timezone-aware instant the session started
    pub instant: DateTime<Utc>,
}

/// A logged body weight measurement
///
/// Weight is normalized to kilograms at ingestion; downstream comparisons
/// operate in kg only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightEvent {
    /// Body weight in kilograms
    pub weight_kg: f64,

    /// Timezone-aware instant of the measurement
    pub instant: DateTime<Utc>,
}

/// Demographic and medical facts about the patient
///
/// Read-only input; the analysis engine never mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PatientProfile {
    /// Age in years
    pub age: Option<u16>,

    /// Sex as recorded in the profile
    pub sex: Option<String>,

    /// Ethnicity as recorded in the profile
    pub ethnicity: Option<String>,

    /// Height in centimeters
    pub height_cm: Option<f64>,

    /// Diagnosed conditions ("Type 2 Diabetes", "Hypertension")
    #[serde(default)]
    pub conditions: Vec<String>,

    /// Active medication names; medication timing analysis covers
    /// exactly this list
    #[serde(default)]
    pub medications: Vec<String>,
}

impl PatientProfile {
    /// True if any diagnosed condition names diabetes (case-insensitive
    /// substring match, so "Type 2 Diabetes" and "gestational diabetes"
    /// both qualify).
    pub fn has_diabetes_condition(&self) -> bool {
        self.conditions
            .iter()
            .any(|c| c.to_lowercase().contains("diabetes"))
    }
}

/// Time span of history under analysis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisWindow {
    /// Number of days of history the snapshot covers, >= 1
    pub days_of_history: u32,

    /// Reference instant; "now" from the engine's point of view.
    /// Supplied by the caller so repeated runs on the same snapshot
    /// are reproducible.
    pub now: DateTime<Utc>,
}

impl AnalysisWindow {
    pub fn new(days_of_history: u32, now: DateTime<Utc>) -> Self {
        AnalysisWindow {
            days_of_history,
            now,
        }
    }

    /// Start of the window. Includes a one-hour safety buffer so events
    /// timestamped by a client clock slightly ahead of the store's are
    /// not dropped at the boundary.
    pub fn since(&self) -> DateTime<Utc> {
        self.now - Duration::days(i64::from(self.days_of_history)) - Duration::hours(1)
    }

    /// Contract check for the upstream data-access collaborator. A window
    /// with no days is a caller bug, not a data-quality issue, and is the
    /// one condition that fails the whole analysis run.
    pub fn validate(&self) -> Result<(), GlucoraError> {
        if self.days_of_history < 1 {
            return Err(GlucoraError::InvalidSnapshot(format!(
                "days_of_history must be >= 1, got {}",
                self.days_of_history
            )));
        }
        Ok(())
    }
}

/// Immutable per-patient input snapshot for one analysis run
///
/// Fetched once by the data-access layer, already filtered to the analysis
/// window. The engine reads it synchronously and never mutates it, so
/// concurrent runs for different patients need no locking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientSnapshot {
    pub profile: PatientProfile,
    pub window: AnalysisWindow,
    pub glucose: Vec<GlucoseReading>,
    pub meals: Vec<MealEvent>,
    pub medications: Vec<MedicationEvent>,
    pub activities: Vec<ActivityEvent>,
    pub weights: Vec<WeightEvent>,
}

impl PatientSnapshot {
    /// Empty snapshot for the given profile and window. Mostly useful in
    /// tests and as a base for builder-style population.
    pub fn empty(profile: PatientProfile, window: AnalysisWindow) -> Self {
        PatientSnapshot {
            profile,
            window,
            glucose: Vec::new(),
            meals: Vec::new(),
            medications: Vec::new(),
            activities: Vec::new(),
            weights: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timing_tag_parses_variants() {
        assert_eq!(TimingTag::parse("Pre-Meal"), Some(TimingTag::PreMeal));
        assert_eq!(TimingTag::parse("before meal"), Some(TimingTag::PreMeal));
        assert_eq!(TimingTag::parse("FASTING"), Some(TimingTag::Waking));
        assert_eq!(TimingTag::parse("random"), None);
    }

    #[test]
    fn intensity_parse_falls_back_to_other() {
        assert_eq!(Intensity::parse("Vigorous"), Intensity::High);
        assert_eq!(
            Intensity::parse("zone 2"),
            Intensity::Other("zone 2".to_string())
        );
    }

    #[test]
    fn diabetes_condition_is_substring_match() {
        let profile = PatientProfile {
            conditions: vec!["Type 2 Diabetes".to_string()],
            ..Default::default()
        };
        assert!(profile.has_diabetes_condition());

        let profile = PatientProfile {
            conditions: vec!["Hypertension".to_string()],
            ..Default::default()
        };
        assert!(!profile.has_diabetes_condition());
    }

    #[test]
    fn window_since_includes_clock_skew_buffer() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        let window = AnalysisWindow::new(7, now);
        let expected = Utc.with_ymd_and_hms(2024, 3, 3, 11, 0, 0).unwrap();
        assert_eq!(window.since(), expected);
    }

    #[test]
    fn window_rejects_zero_days() {
        let window = AnalysisWindow::new(0, Utc::now());
        assert!(window.validate().is_err());
    }
}
