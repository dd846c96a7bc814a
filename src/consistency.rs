//! Lifestyle consistency scoring
//!
//! Meal and medication consistency model time-of-day regularity: the
//! population standard deviation of minutes-since-local-midnight, normalized
//! against a configured divisor. Activity consistency measures day coverage
//! instead, since one walk a day at any hour is the behavior worth
//! rewarding.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ConsistencyConfig;
use crate::error::AnalysisError;
use crate::models::PatientSnapshot;
use crate::normalize::TimePolicy;
use crate::stats;

const ANALYSIS: &str = "lifestyle_consistency";

/// Regularity scores per category, all in [0, 1]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifestyleConsistency {
    /// Unweighted mean of the three category scores
    pub overall_score: f64,

    /// Meal time-of-day regularity
    pub meal_timing: f64,

    /// Medication time-of-day regularity
    pub medication_timing: f64,

    /// Fraction of window days with at least one activity
    pub activity_coverage: f64,

    /// Named categories that fell below their thresholds or were not
    /// logged at all
    pub improvement_areas: Vec<String>,
}

/// Lifestyle consistency scorer
pub struct ConsistencyScorer<'a> {
    config: &'a ConsistencyConfig,
    policy: TimePolicy,
}

impl<'a> ConsistencyScorer<'a> {
    pub fn new(config: &'a ConsistencyConfig, policy: TimePolicy) -> Self {
        ConsistencyScorer { config, policy }
    }

    pub fn analyze(
        &self,
        snapshot: &PatientSnapshot,
    ) -> Result<LifestyleConsistency, AnalysisError> {
        if snapshot.meals.is_empty()
            && snapshot.medications.is_empty()
            && snapshot.activities.is_empty()
        {
            return Err(AnalysisError::insufficient(
                ANALYSIS,
                "no meal, medication or activity logs in window",
            ));
        }

        let mut improvement_areas: Vec<String> = Vec::new();

        let meal_instants: Vec<DateTime<Utc>> =
            snapshot.meals.iter().map(|m| m.instant).collect();
        let meal_timing = self.timing_score(
            &meal_instants,
            "Meal timing consistency",
            "Regular meal logging",
            &mut improvement_areas,
        );

        let med_instants: Vec<DateTime<Utc>> =
            snapshot.medications.iter().map(|m| m.instant).collect();
        let medication_timing = self.timing_score(
            &med_instants,
            "Medication timing consistency",
            "Regular medication logging",
            &mut improvement_areas,
        );

        let activity_coverage = if snapshot.activities.is_empty() {
            improvement_areas.push("Activity logging".to_string());
            self.config.missing_category_score
        } else {
            let active_days: BTreeSet<_> = snapshot
                .activities
                .iter()
                .map(|a| self.policy.local_date(a.instant))
                .collect();
            let coverage = if snapshot.window.days_of_history > 0 {
                (active_days.len() as f64 / f64::from(snapshot.window.days_of_history)).min(1.0)
            } else {
                0.0
            };
            if coverage < self.config.coverage_threshold {
                improvement_areas.push("Regular physical activity".to_string());
            }
            coverage
        };

        let overall_score = (meal_timing + medication_timing + activity_coverage) / 3.0;

        Ok(LifestyleConsistency {
            overall_score,
            meal_timing,
            medication_timing,
            activity_coverage,
            improvement_areas,
        })
    }

    /// Time-of-day regularity for one category. Fewer than two events says
    /// nothing about regularity, so the category scores neutral; zero
    /// events additionally flags the logging habit itself.
    fn timing_score(
        &self,
        instants: &[DateTime<Utc>],
        low_score_label: &str,
        missing_label: &str,
        improvement_areas: &mut Vec<String>,
    ) -> f64 {
        if instants.is_empty() {
            improvement_areas.push(missing_label.to_string());
            return self.config.missing_category_score;
        }
        if instants.len() < 2 {
            return self.config.missing_category_score;
        }

        let minutes: Vec<f64> = instants
            .iter()
            .map(|&instant| f64::from(self.policy.minutes_since_midnight(instant)))
            .collect();
        let std_dev = stats::population_std_dev(&minutes).unwrap_or(0.0);
        let score = (1.0 - std_dev / self.config.timing_stddev_minutes).max(0.0);

        if score < self.config.timing_threshold {
            improvement_areas.push(low_score_label.to_string());
        }
        score
    }
}
