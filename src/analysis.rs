//! Pattern analysis orchestrator
//!
//! The sole public entry point of the engine. Runs every analyzer over one
//! immutable snapshot and assembles the aggregate result. Analyzers are
//! independent of one another (only the target synthesizer consumes other
//! outputs), and each one degrades to an absent sub-result on failure
//! rather than aborting the run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::activity::{ActivityGlucoseAnalyzer, ActivityGlucoseCorrelation};
use crate::circadian::{CircadianAnalyzer, CircadianPattern};
use crate::config::AnalysisConfig;
use crate::consistency::{ConsistencyScorer, LifestyleConsistency};
use crate::error::{AnalysisError, Result};
use crate::meals::{MealCorrelationMatrix, MealGlucoseAnalyzer};
use crate::medication::{MedicationEffectiveness, MedicationTimingAnalyzer};
use crate::models::PatientSnapshot;
use crate::normalize::TimePolicy;
use crate::risk::{HypoglycemiaRisk, HypoglycemiaRiskScorer};
use crate::spikes::{SpikePattern, SpikePatternAnalyzer};
use crate::targets::{PersonalizedTargets, TargetSynthesizer};
use crate::weight::{WeightGlucoseAnalyzer, WeightGlucoseCorrelation};

/// Aggregate output of one analysis run
///
/// Every sub-result is optional: `None` means the corresponding analyzer
/// did not have enough data (or failed internally), never that the run as
/// a whole failed. Consumers must render absence as "insufficient data",
/// not as an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Reference instant the analysis was computed against; copied from
    /// the snapshot window so identical snapshots produce identical output
    pub generated_at: DateTime<Utc>,

    pub circadian: Option<CircadianPattern>,
    pub meal_correlations: Option<MealCorrelationMatrix>,
    pub medication_effectiveness: Option<Vec<MedicationEffectiveness>>,
    pub spike_pattern: Option<SpikePattern>,
    pub activity_correlations: Option<Vec<ActivityGlucoseCorrelation>>,
    pub weight_correlation: Option<WeightGlucoseCorrelation>,
    pub hypoglycemia_risk: Option<HypoglycemiaRisk>,
    pub lifestyle_consistency: Option<LifestyleConsistency>,
    pub personalized_targets: Option<PersonalizedTargets>,
}

/// The analysis engine
#[derive(Debug, Clone, Default)]
pub struct PatternAnalyzer {
    config: AnalysisConfig,
}

impl PatternAnalyzer {
    /// Analyzer with default policy configuration
    pub fn new() -> Self {
        PatternAnalyzer {
            config: AnalysisConfig::default(),
        }
    }

    pub fn with_config(config: AnalysisConfig) -> Self {
        PatternAnalyzer { config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Run every analyzer over the snapshot.
    ///
    /// Fails only on a contract violation (invalid window, unusable
    /// timezone configuration); data absence of any kind degrades to
    /// `None` sub-results instead.
    pub fn analyze(&self, snapshot: &PatientSnapshot) -> Result<AnalysisResult> {
        snapshot.window.validate()?;
        let policy = TimePolicy::from_offset_minutes(self.config.timezone_offset_minutes)?;

        info!(
            days = snapshot.window.days_of_history,
            glucose = snapshot.glucose.len(),
            meals = snapshot.meals.len(),
            medications = snapshot.medications.len(),
            activities = snapshot.activities.len(),
            weights = snapshot.weights.len(),
            "starting pattern analysis"
        );

        let days = snapshot.window.days_of_history;

        let circadian = contained(
            CircadianAnalyzer::new(&self.config.circadian, policy).analyze(&snapshot.glucose),
        );
        let meal_correlations = contained(
            MealGlucoseAnalyzer::new(&self.config.meal)
                .analyze(&snapshot.meals, &snapshot.glucose),
        );
        let medication_effectiveness = contained(
            MedicationTimingAnalyzer::new(&self.config.medication, policy).analyze(
                &snapshot.profile,
                &snapshot.medications,
                days,
            ),
        );
        let spike_pattern = contained(
            SpikePatternAnalyzer::new(&self.config.spikes, policy)
                .analyze(&snapshot.glucose, days),
        );
        let activity_correlations = contained(
            ActivityGlucoseAnalyzer::new(&self.config.activity, policy)
                .analyze(&snapshot.activities, &snapshot.glucose),
        );
        let weight_correlation = contained(
            WeightGlucoseAnalyzer::new(&self.config.weight).analyze(
                &snapshot.weights,
                &snapshot.glucose,
                days,
            ),
        );
        let hypoglycemia_risk =
            contained(HypoglycemiaRiskScorer::new(&self.config.risk).analyze(snapshot));
        let lifestyle_consistency =
            contained(ConsistencyScorer::new(&self.config.consistency, policy).analyze(snapshot));

        // Synthesis runs last; it is the only analyzer consuming other
        // analyzers' outputs
        let personalized_targets = contained(TargetSynthesizer::new(&self.config.targets).synthesize(
            &snapshot.profile,
            &snapshot.glucose,
            circadian.as_ref(),
            medication_effectiveness.as_deref().unwrap_or(&[]),
        ));

        Ok(AnalysisResult {
            generated_at: snapshot.window.now,
            circadian,
            meal_correlations,
            medication_effectiveness,
            spike_pattern,
            activity_correlations,
            weight_correlation,
            hypoglycemia_risk,
            lifestyle_consistency,
            personalized_targets,
        })
    }
}

/// Analyzer boundary: downgrade any analyzer error to an absent result.
/// Insufficient data is the expected early-weeks outcome and logs quietly;
/// anything else is a bug worth a warning.
fn contained<T>(result: std::result::Result<T, AnalysisError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) if err.is_insufficient_data() => {
            debug!(analysis = err.analysis(), %err, "sub-analysis skipped");
            None
        }
        Err(err) => {
            warn!(analysis = err.analysis(), %err, "sub-analysis failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    use crate::models::{
        AnalysisWindow, GlucoseReading, MealEvent, PatientProfile, PatientSnapshot,
    };

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 20, 0, 0).unwrap()
    }

    fn reading(hours_ago: i64, value: f64) -> GlucoseReading {
        GlucoseReading {
            reading: value,
            instant: now() - Duration::hours(hours_ago),
            timing_tag: None,
            notes: None,
        }
    }

    fn base_snapshot() -> PatientSnapshot {
        PatientSnapshot::empty(PatientProfile::default(), AnalysisWindow::new(7, now()))
    }

    #[test]
    fn invalid_window_is_fatal() {
        let mut snapshot = base_snapshot();
        snapshot.window.days_of_history = 0;
        assert!(PatternAnalyzer::new().analyze(&snapshot).is_err());
    }

    #[test]
    fn empty_snapshot_yields_all_absent_sub_results() {
        let result = PatternAnalyzer::new().analyze(&base_snapshot()).unwrap();
        assert!(result.circadian.is_none());
        assert!(result.meal_correlations.is_none());
        assert!(result.medication_effectiveness.is_none());
        assert!(result.spike_pattern.is_none());
        assert!(result.activity_correlations.is_none());
        assert!(result.weight_correlation.is_none());
        assert!(result.hypoglycemia_risk.is_none());
        assert!(result.lifestyle_consistency.is_none());
        assert!(result.personalized_targets.is_none());
    }

    #[test]
    fn glucose_alone_enables_glucose_derived_analyses() {
        let mut snapshot = base_snapshot();
        snapshot.glucose = vec![reading(30, 100.0), reading(20, 120.0), reading(10, 110.0)];
        let result = PatternAnalyzer::new().analyze(&snapshot).unwrap();
        assert!(result.circadian.is_some());
        assert!(result.hypoglycemia_risk.is_some());
        assert!(result.personalized_targets.is_some());
        // Meal correlation still needs meals
        assert!(result.meal_correlations.is_none());
    }

    #[test]
    fn analysis_is_idempotent_over_identical_snapshots() {
        let mut snapshot = base_snapshot();
        snapshot.glucose = vec![reading(30, 100.0), reading(20, 160.0), reading(10, 90.0)];
        snapshot.meals = vec![MealEvent {
            label: "Lunch".to_string(),
            description: None,
            instant: now() - Duration::hours(25),
        }];

        let analyzer = PatternAnalyzer::new();
        let first = analyzer.analyze(&snapshot).unwrap();
        let second = analyzer.analyze(&snapshot).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn generated_at_is_the_window_reference_instant() {
        let mut snapshot = base_snapshot();
        snapshot.glucose = vec![reading(10, 100.0)];
        let result = PatternAnalyzer::new().analyze(&snapshot).unwrap();
        assert_eq!(result.generated_at, now());
    }
}
