//! Glucose spike pattern detection
//!
//! Scans consecutive reading pairs for sharp rises without attributing them
//! to any trigger; the meal analyzer does attribution. Useful on its own for
//! patients who log glucose but little else.

use serde::{Deserialize, Serialize};

use crate::config::SpikeConfig;
use crate::error::AnalysisError;
use crate::models::GlucoseReading;
use crate::normalize::TimePolicy;
use crate::stats;
use crate::temporal::SampleSeries;

const ANALYSIS: &str = "spike_pattern";

/// Unattributed glucose spike summary for the window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpikePattern {
    /// Mean rise across detected spikes, mg/dL
    pub avg_spike_magnitude: f64,

    /// Detected spikes per day of history
    pub spike_frequency_per_day: f64,

    /// Local hours where spikes most often land, most frequent first
    pub common_spike_hours: Vec<u32>,

    /// Total spikes detected in the window
    pub spike_count: u32,
}

/// Spike pattern analyzer
pub struct SpikePatternAnalyzer<'a> {
    config: &'a SpikeConfig,
    policy: TimePolicy,
}

impl<'a> SpikePatternAnalyzer<'a> {
    pub fn new(config: &'a SpikeConfig, policy: TimePolicy) -> Self {
        SpikePatternAnalyzer { config, policy }
    }

    pub fn analyze(
        &self,
        readings: &[GlucoseReading],
        days_of_history: u32,
    ) -> Result<SpikePattern, AnalysisError> {
        let series = SampleSeries::from_readings(readings);
        if series.len() < 2 {
            return Err(AnalysisError::insufficient(
                ANALYSIS,
                format!("need at least 2 readings, have {}", series.len()),
            ));
        }

        let mut magnitudes: Vec<f64> = Vec::new();
        let mut spike_hours: Vec<u32> = Vec::new();

        for pair in series.samples().windows(2) {
            let gap_hours = (pair[1].instant - pair[0].instant).num_minutes() as f64 / 60.0;
            if gap_hours < self.config.min_gap_hours || gap_hours > self.config.max_gap_hours {
                continue;
            }
            let rise = pair[1].value - pair[0].value;
            if rise > self.config.min_rise {
                magnitudes.push(rise);
                spike_hours.push(self.policy.local_hour(pair[1].instant));
            }
        }

        let Some(avg_spike_magnitude) = stats::mean(&magnitudes) else {
            return Err(AnalysisError::insufficient(
                ANALYSIS,
                "no qualifying spikes detected",
            ));
        };

        let spike_frequency_per_day = if days_of_history > 0 {
            magnitudes.len() as f64 / f64::from(days_of_history)
        } else {
            0.0
        };

        Ok(SpikePattern {
            avg_spike_magnitude,
            spike_frequency_per_day,
            common_spike_hours: stats::ranked_by_count(&spike_hours, self.config.common_hour_count),
            spike_count: magnitudes.len() as u32,
        })
    }
}
