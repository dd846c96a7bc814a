//! Personalized target synthesis
//!
//! Combines the other analyzers' outputs into one actionable package: a
//! glucose range matched to current control, eating windows at circadian
//! troughs, activity windows ahead of circadian peaks, and the logged-mode
//! hour for each medication.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::circadian::CircadianPattern;
use crate::config::TargetConfig;
use crate::error::AnalysisError;
use crate::medication::MedicationEffectiveness;
use crate::models::{GlucoseReading, PatientProfile};
use crate::stats;

const ANALYSIS: &str = "personalized_targets";

/// Fallback recommendation times when no circadian pattern exists yet
const DEFAULT_MEAL_TIMES: [&str; 3] = ["08:00", "12:00", "18:00"];
const DEFAULT_ACTIVITY_TIMES: [&str; 2] = ["06:00", "18:00"];

/// Personalized glucose range and schedule recommendations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalizedTargets {
    /// Suggested glucose range lower bound, mg/dL
    pub range_min: f64,

    /// Suggested glucose range upper bound, mg/dL
    pub range_max: f64,

    /// Why this range was chosen, phrased for the patient
    pub rationale: String,

    /// Recommended meal times of day, "HH:00"
    pub best_meal_times: Vec<String>,

    /// Recommended activity times of day, "HH:00"
    pub best_activity_times: Vec<String>,

    /// Per-medication recommended dose time, from each medication's
    /// logged-hour mode
    pub medication_schedule: BTreeMap<String, String>,
}

/// Target synthesizer; runs last, over the other analyzers' outputs
pub struct TargetSynthesizer<'a> {
    config: &'a TargetConfig,
}

impl<'a> TargetSynthesizer<'a> {
    pub fn new(config: &'a TargetConfig) -> Self {
        TargetSynthesizer { config }
    }

    pub fn synthesize(
        &self,
        profile: &PatientProfile,
        glucose: &[GlucoseReading],
        circadian: Option<&CircadianPattern>,
        medication_effectiveness: &[MedicationEffectiveness],
    ) -> Result<PersonalizedTargets, AnalysisError> {
        let values: Vec<f64> = glucose
            .iter()
            .filter(|r| r.reading > 0.0)
            .map(|r| r.reading)
            .collect();
        let Some(avg_glucose) = stats::mean(&values) else {
            return Err(AnalysisError::insufficient(
                ANALYSIS,
                "no glucose readings to base targets on",
            ));
        };

        let (range, rationale) = if profile.has_diabetes_condition() {
            if avg_glucose < self.config.control_cutoff {
                (
                    self.config.tight_range,
                    format!(
                        "Your glucose control is good. Maintaining {:.0}-{:.0} mg/dL will help prevent complications.",
                        self.config.tight_range.0, self.config.tight_range.1
                    ),
                )
            } else {
                (
                    self.config.wide_range,
                    format!(
                        "Your glucose levels are elevated. Aim for {:.0}-{:.0} mg/dL initially, then work toward {:.0}-{:.0} mg/dL with your healthcare provider.",
                        self.config.wide_range.0,
                        self.config.wide_range.1,
                        self.config.tight_range.0,
                        self.config.tight_range.1
                    ),
                )
            }
        } else {
            (
                self.config.generic_range,
                "Standard target range for glucose management.".to_string(),
            )
        };

        // Glucose troughs are good eating windows
        let mut best_meal_times: Vec<String> = circadian
            .map(|c| {
                c.low_hours
                    .iter()
                    .take(2)
                    .map(|&hour| format_hour(hour))
                    .collect()
            })
            .unwrap_or_default();
        if best_meal_times.is_empty() {
            best_meal_times = DEFAULT_MEAL_TIMES.iter().map(|s| s.to_string()).collect();
        }

        // Activity shortly before a peak blunts it. Only the time-of-day
        // shift matters, so a configured lead above a day reduces mod 24.
        let lead_hours = self.config.activity_lead_hours % 24;
        let mut best_activity_times: Vec<String> = circadian
            .map(|c| {
                c.peak_hours
                    .iter()
                    .take(2)
                    .map(|&hour| format_hour((hour + 24 - lead_hours) % 24))
                    .collect()
            })
            .unwrap_or_default();
        if best_activity_times.is_empty() {
            best_activity_times = DEFAULT_ACTIVITY_TIMES
                .iter()
                .map(|s| s.to_string())
                .collect();
        }

        let medication_schedule: BTreeMap<String, String> = medication_effectiveness
            .iter()
            .filter_map(|m| {
                m.optimal_hour
                    .map(|hour| (m.medication_name.clone(), format_hour(hour)))
            })
            .collect();

        Ok(PersonalizedTargets {
            range_min: range.0,
            range_max: range.1,
            rationale,
            best_meal_times,
            best_activity_times,
            medication_schedule,
        })
    }
}

fn format_hour(hour: u32) -> String {
    format!("{:02}:00", hour)
}
