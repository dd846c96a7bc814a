//! Circadian glucose rhythm analysis
//!
//! Buckets readings by local hour of day and ranks the buckets by mean
//! glucose. The resulting peak/low hours feed the personalized target
//! synthesizer (low hours are good eating windows, peaks are worth
//! pre-empting with activity).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::CircadianConfig;
use crate::error::AnalysisError;
use crate::models::GlucoseReading;
use crate::normalize::TimePolicy;
use crate::stats;

const ANALYSIS: &str = "circadian";

/// Hour-of-day glucose rhythm for one patient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircadianPattern {
    /// Local hours with the highest mean glucose, highest first.
    /// Up to `rank_size` entries; fewer when fewer distinct hours were
    /// logged.
    pub peak_hours: Vec<u32>,

    /// Local hours with the lowest mean glucose, lowest first
    pub low_hours: Vec<u32>,

    /// Mean glucose of the top peak hour, mg/dL
    pub peak_avg_glucose: Option<f64>,

    /// Mean glucose of the lowest hour, mg/dL
    pub low_avg_glucose: Option<f64>,

    /// How flat the rhythm is, in [0, 1]. 1.0 means hourly means are
    /// identical; 0.0 means they spread beyond the configured divisor.
    pub pattern_stability: f64,
}

/// Circadian rhythm analyzer
pub struct CircadianAnalyzer<'a> {
    config: &'a CircadianConfig,
    policy: TimePolicy,
}

impl<'a> CircadianAnalyzer<'a> {
    pub fn new(config: &'a CircadianConfig, policy: TimePolicy) -> Self {
        CircadianAnalyzer { config, policy }
    }

    pub fn analyze(&self, readings: &[GlucoseReading]) -> Result<CircadianPattern, AnalysisError> {
        // BTreeMap keeps hours in a deterministic order so tied means rank
        // identically run to run
        let mut buckets: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
        for reading in readings {
            if reading.reading <= 0.0 {
                continue;
            }
            buckets
                .entry(self.policy.local_hour(reading.instant))
                .or_default()
                .push(reading.reading);
        }

        if buckets.is_empty() {
            return Err(AnalysisError::insufficient(
                ANALYSIS,
                "no glucose readings in window",
            ));
        }

        let hourly_means: Vec<(u32, f64)> = buckets
            .iter()
            .map(|(&hour, values)| (hour, stats::mean(values).unwrap_or(0.0)))
            .collect();

        let mut ranked = hourly_means.clone();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let peak_hours: Vec<u32> = ranked
            .iter()
            .take(self.config.rank_size)
            .map(|&(hour, _)| hour)
            .collect();
        let low_hours: Vec<u32> = ranked
            .iter()
            .rev()
            .take(self.config.rank_size)
            .map(|&(hour, _)| hour)
            .collect();

        let peak_avg_glucose = ranked.first().map(|&(_, mean)| mean);
        let low_avg_glucose = ranked.last().map(|&(_, mean)| mean);

        let means: Vec<f64> = hourly_means.iter().map(|&(_, mean)| mean).collect();
        let pattern_stability = if means.len() > 1 {
            let std_dev = stats::population_std_dev(&means).unwrap_or(0.0);
            (1.0 - std_dev / self.config.stability_divisor).max(0.0)
        } else {
            // A single bucket says nothing about rhythm either way
            0.5
        };

        Ok(CircadianPattern {
            peak_hours,
            low_hours,
            peak_avg_glucose,
            low_avg_glucose,
            pattern_stability,
        })
    }
}
