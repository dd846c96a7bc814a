//! Meal-to-glucose spike correlation
//!
//! For each logged meal, the baseline is the last glucose measurement at or
//! before the meal and the response is every measurement within the forward
//! window. The delta is max(response) - baseline: the peak excursion is the
//! clinically relevant signal for food, not the average, so this analyzer is
//! deliberately spike-style where the activity analyzer is mean-to-mean.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::MealCorrelationConfig;
use crate::error::AnalysisError;
use crate::models::{GlucoseReading, MealEvent};
use crate::stats;
use crate::temporal::{CorrelationRecord, SampleSeries};

const ANALYSIS: &str = "meal_correlation";

/// Per-label meal correlations plus best/worst rankings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealCorrelationMatrix {
    /// Up to `ranking_size` lowest-spiking meal labels, none flagged
    /// high-spike; lowest first
    pub best_meals: Vec<String>,

    /// Up to `ranking_size` highest-spiking labels that crossed the
    /// high-spike threshold; highest first
    pub worst_meals: Vec<String>,

    /// One record per distinct meal label, sorted by average spike
    /// ascending. `delta` is the average peak excursion.
    pub correlations: Vec<CorrelationRecord>,

    /// Mean of the per-label average spikes, mg/dL
    pub avg_spike_all_meals: Option<f64>,
}

/// Meal-to-glucose spike analyzer
pub struct MealGlucoseAnalyzer<'a> {
    config: &'a MealCorrelationConfig,
}

impl<'a> MealGlucoseAnalyzer<'a> {
    pub fn new(config: &'a MealCorrelationConfig) -> Self {
        MealGlucoseAnalyzer { config }
    }

    pub fn analyze(
        &self,
        meals: &[MealEvent],
        glucose: &[GlucoseReading],
    ) -> Result<MealCorrelationMatrix, AnalysisError> {
        if meals.is_empty() {
            return Err(AnalysisError::insufficient(ANALYSIS, "no meals logged"));
        }
        let series = SampleSeries::from_readings(glucose);
        if series.is_empty() {
            return Err(AnalysisError::insufficient(
                ANALYSIS,
                "no glucose readings to correlate against",
            ));
        }

        let lookahead = Duration::hours(self.config.response_window_hours);

        // Label grouping is case-sensitive exact match: "Fried rice" and
        // "fried rice" are intentionally distinct logging habits
        let mut per_label: BTreeMap<&str, Vec<DateTime<Utc>>> = BTreeMap::new();
        for meal in meals {
            per_label
                .entry(meal.label.as_str())
                .or_default()
                .push(meal.instant);
        }

        let mut correlations: Vec<CorrelationRecord> = per_label
            .into_iter()
            .filter_map(|(label, instants)| {
                let mut baselines: Vec<f64> = Vec::new();
                let mut peaks: Vec<f64> = Vec::new();
                let mut spikes: Vec<f64> = Vec::new();
                for record in series.correlate(&instants, lookahead) {
                    // An occurrence with no response measurement has no spike
                    let Some(spike) = record.peak_delta() else {
                        continue;
                    };
                    baselines.push(record.baseline.value);
                    peaks.push(record.baseline.value + spike);
                    spikes.push(spike);
                }
                // Labels with no usable occurrence are omitted entirely
                let avg_spike = stats::mean(&spikes)?;
                Some(CorrelationRecord {
                    subject: label.to_string(),
                    baseline: stats::mean(&baselines).unwrap_or(0.0),
                    response: stats::mean(&peaks).unwrap_or(0.0),
                    delta: avg_spike,
                    occurrences: spikes.len() as u32,
                    is_high: avg_spike > self.config.high_spike_threshold,
                })
            })
            .collect();

        correlations.sort_by(|a, b| {
            a.delta
                .partial_cmp(&b.delta)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.subject.cmp(&b.subject))
        });

        let best_meals: Vec<String> = correlations
            .iter()
            .filter(|c| !c.is_high)
            .take(self.config.ranking_size)
            .map(|c| c.subject.clone())
            .collect();
        let worst_meals: Vec<String> = correlations
            .iter()
            .rev()
            .filter(|c| c.is_high)
            .take(self.config.ranking_size)
            .map(|c| c.subject.clone())
            .collect();

        let deltas: Vec<f64> = correlations.iter().map(|c| c.delta).collect();
        let avg_spike_all_meals = stats::mean(&deltas);

        Ok(MealCorrelationMatrix {
            best_meals,
            worst_meals,
            correlations,
            avg_spike_all_meals,
        })
    }
}
