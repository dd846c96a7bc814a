//! Medication timing effectiveness
//!
//! Adherence compares logged doses against the expected count for the
//! window, where the expected daily frequency comes from per-medication
//! configuration (default once daily). The effectiveness score is an
//! adherence proxy, not a causal measure of glycemic effect.

use serde::{Deserialize, Serialize};

use crate::config::MedicationConfig;
use crate::error::AnalysisError;
use crate::models::{MedicationEvent, PatientProfile};
use crate::normalize::TimePolicy;
use crate::stats;

const ANALYSIS: &str = "medication_timing";

/// Timing and adherence summary for one active medication
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicationEffectiveness {
    /// Medication name from the patient's active list
    pub medication_name: String,

    /// Most common local hour doses were logged at
    pub optimal_hour: Option<u32>,

    /// Logged doses as a percentage of expected doses over the window.
    /// Can exceed 100 when doses were logged more often than expected.
    pub adherence_rate: f64,

    /// min(1.0, adherence/100). A placeholder proxy for effectiveness
    /// until outcome-linked scoring exists.
    pub effectiveness_score: f64,

    /// Doses actually logged in the window
    pub logged_doses: u32,
}

/// Medication timing analyzer
pub struct MedicationTimingAnalyzer<'a> {
    config: &'a MedicationConfig,
    policy: TimePolicy,
}

impl<'a> MedicationTimingAnalyzer<'a> {
    pub fn new(config: &'a MedicationConfig, policy: TimePolicy) -> Self {
        MedicationTimingAnalyzer { config, policy }
    }

    /// Analyze each medication on the patient's active list. Medications
    /// with no logged doses in the window are omitted rather than reported
    /// at zero; absence of logging is the consistency scorer's concern.
    pub fn analyze(
        &self,
        profile: &PatientProfile,
        logs: &[MedicationEvent],
        days_of_history: u32,
    ) -> Result<Vec<MedicationEffectiveness>, AnalysisError> {
        if profile.medications.is_empty() {
            return Err(AnalysisError::insufficient(
                ANALYSIS,
                "no active medications in profile",
            ));
        }
        if logs.is_empty() {
            return Err(AnalysisError::insufficient(
                ANALYSIS,
                "no medication doses logged",
            ));
        }

        let results = profile
            .medications
            .iter()
            .filter_map(|med_name| {
                let med_logs: Vec<&MedicationEvent> = logs
                    .iter()
                    .filter(|log| log.medication_name.eq_ignore_ascii_case(med_name))
                    .collect();
                if med_logs.is_empty() {
                    return None;
                }

                let expected =
                    f64::from(days_of_history) * self.config.daily_doses_for(med_name);
                let adherence_rate = if expected > 0.0 {
                    med_logs.len() as f64 / expected * 100.0
                } else {
                    0.0
                };

                let hours: Vec<u32> = med_logs
                    .iter()
                    .map(|log| self.policy.local_hour(log.instant))
                    .collect();

                Some(MedicationEffectiveness {
                    medication_name: med_name.clone(),
                    optimal_hour: stats::mode(&hours),
                    adherence_rate,
                    effectiveness_score: (adherence_rate / 100.0).min(1.0),
                    logged_doses: med_logs.len() as u32,
                })
            })
            .collect();

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn dose(name: &str, day: u32, hour: u32) -> MedicationEvent {
        MedicationEvent {
            medication_name: name.to_string(),
            quantity: None,
            instant: Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap(),
            notes: None,
        }
    }

    fn profile(meds: &[&str]) -> PatientProfile {
        PatientProfile {
            medications: meds.iter().map(|m| m.to_string()).collect(),
            ..Default::default()
        }
    }

    fn analyzer(config: &MedicationConfig) -> MedicationTimingAnalyzer<'_> {
        MedicationTimingAnalyzer::new(config, TimePolicy::from_offset_minutes(0).unwrap())
    }

    #[test]
    fn adherence_over_seven_days() {
        let config = MedicationConfig::default();
        let logs: Vec<MedicationEvent> =
            (1..=5).map(|day| dose("Metformin", day, 8)).collect();
        let results = analyzer(&config)
            .analyze(&profile(&["Metformin"]), &logs, 7)
            .unwrap();

        assert_eq!(results.len(), 1);
        let result = &results[0];
        assert!((result.adherence_rate - 71.428571).abs() < 1e-4);
        assert!((result.effectiveness_score - 0.714286).abs() < 1e-4);
        assert_eq!(result.optimal_hour, Some(8));
        assert_eq!(result.logged_doses, 5);
    }

    #[test]
    fn name_matching_ignores_case() {
        let config = MedicationConfig::default();
        let logs = vec![dose("metformin", 1, 8)];
        let results = analyzer(&config)
            .analyze(&profile(&["Metformin"]), &logs, 7)
            .unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn per_medication_frequency_changes_expected_doses() {
        let mut config = MedicationConfig::default();
        config
            .expected_daily_doses
            .insert("metformin".to_string(), 2.0);
        // 7 logged doses over 7 days at twice daily expected = 50%
        let logs: Vec<MedicationEvent> =
            (1..=7).map(|day| dose("Metformin", day, 8)).collect();
        let results = analyzer(&config)
            .analyze(&profile(&["Metformin"]), &logs, 7)
            .unwrap();
        assert!((results[0].adherence_rate - 50.0).abs() < 1e-9);
    }

    #[test]
    fn optimal_hour_is_the_mode() {
        let config = MedicationConfig::default();
        let logs = vec![
            dose("Insulin", 1, 7),
            dose("Insulin", 2, 7),
            dose("Insulin", 3, 19),
        ];
        let results = analyzer(&config)
            .analyze(&profile(&["Insulin"]), &logs, 7)
            .unwrap();
        assert_eq!(results[0].optimal_hour, Some(7));
    }

    #[test]
    fn unlogged_medication_is_omitted() {
        let config = MedicationConfig::default();
        let logs = vec![dose("Metformin", 1, 8)];
        let results = analyzer(&config)
            .analyze(&profile(&["Metformin", "Insulin"]), &logs, 7)
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].medication_name, "Metformin");
    }

    #[test]
    fn empty_inputs_are_insufficient_data() {
        let config = MedicationConfig::default();
        let err = analyzer(&config)
            .analyze(&profile(&[]), &[dose("Metformin", 1, 8)], 7)
            .unwrap_err();
        assert!(err.is_insufficient_data());

        let err = analyzer(&config)
            .analyze(&profile(&["Metformin"]), &[], 7)
            .unwrap_err();
        assert!(err.is_insufficient_data());
    }
}
