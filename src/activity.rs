//! Activity-to-glucose correlation
//!
//! Unlike the meal analyzer, activity effect is measured mean-to-mean:
//! the mean glucose in the hour before a session against the mean in the
//! sustained window after it. Exercise changes the level for hours, so a
//! single peak would mostly measure whatever was eaten nearby.

use std::collections::BTreeMap;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::config::ActivityCorrelationConfig;
use crate::error::AnalysisError;
use crate::models::{ActivityEvent, GlucoseReading};
use crate::normalize::TimePolicy;
use crate::stats;
use crate::temporal::SampleSeries;

const ANALYSIS: &str = "activity_correlation";

/// Glucose effect of one activity type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityGlucoseCorrelation {
    /// Activity type as logged
    pub activity_type: String,

    /// Mean pre-session glucose across counted sessions, mg/dL
    pub avg_glucose_before: f64,

    /// Mean post-session glucose across counted sessions, mg/dL
    pub avg_glucose_after: f64,

    /// after - before; negative means the activity lowers glucose
    pub glucose_change: f64,

    /// Most common local start hour for this activity
    pub optimal_hour: Option<u32>,

    /// Sessions with both a before and an after measurement
    pub occurrences: u32,
}

/// Activity-to-glucose analyzer
pub struct ActivityGlucoseAnalyzer<'a> {
    config: &'a ActivityCorrelationConfig,
    policy: TimePolicy,
}

impl<'a> ActivityGlucoseAnalyzer<'a> {
    pub fn new(config: &'a ActivityCorrelationConfig, policy: TimePolicy) -> Self {
        ActivityGlucoseAnalyzer { config, policy }
    }

    pub fn analyze(
        &self,
        activities: &[ActivityEvent],
        glucose: &[GlucoseReading],
    ) -> Result<Vec<ActivityGlucoseCorrelation>, AnalysisError> {
        if activities.is_empty() {
            return Err(AnalysisError::insufficient(ANALYSIS, "no activities logged"));
        }
        let series = SampleSeries::from_readings(glucose);
        if series.is_empty() {
            return Err(AnalysisError::insufficient(
                ANALYSIS,
                "no glucose readings to correlate against",
            ));
        }

        let before = Duration::hours(self.config.before_window_hours);
        let after_start = Duration::hours(self.config.after_window_start_hours);
        let after_end = Duration::hours(self.config.after_window_end_hours);

        struct TypeAccumulator {
            before_means: Vec<f64>,
            after_means: Vec<f64>,
            start_hours: Vec<u32>,
        }

        let mut per_type: BTreeMap<&str, TypeAccumulator> = BTreeMap::new();
        for activity in activities {
            let acc = per_type
                .entry(activity.activity_type.as_str())
                .or_insert_with(|| TypeAccumulator {
                    before_means: Vec::new(),
                    after_means: Vec::new(),
                    start_hours: Vec::new(),
                });
            acc.start_hours.push(self.policy.local_hour(activity.instant));

            let before_mean = series.lookback_mean(activity.instant, before);
            let after_window = series.between_exclusive_inclusive(
                activity.instant + after_start,
                activity.instant + after_end,
            );
            let after_values: Vec<f64> = after_window.iter().map(|s| s.value).collect();
            let after_mean = stats::mean(&after_values);

            // A session only counts with a measurement on both sides
            if let (Some(before_mean), Some(after_mean)) = (before_mean, after_mean) {
                acc.before_means.push(before_mean);
                acc.after_means.push(after_mean);
            }
        }

        let correlations = per_type
            .into_iter()
            .filter_map(|(activity_type, acc)| {
                let avg_before = stats::mean(&acc.before_means)?;
                let avg_after = stats::mean(&acc.after_means)?;
                Some(ActivityGlucoseCorrelation {
                    activity_type: activity_type.to_string(),
                    avg_glucose_before: avg_before,
                    avg_glucose_after: avg_after,
                    glucose_change: avg_after - avg_before,
                    optimal_hour: stats::mode(&acc.start_hours),
                    occurrences: acc.before_means.len() as u32,
                })
            })
            .collect();

        Ok(correlations)
    }
}
