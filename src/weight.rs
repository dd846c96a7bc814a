//! Weight/glucose correlation
//!
//! Compares the weight trajectory over the window with the shift in mean
//! glucose between the earlier and later half of the readings. The reported
//! `correlation_strength` is a fixed sign heuristic from configuration, not
//! a computed Pearson coefficient; downstream consumers are told as much in
//! the type's documentation and should treat it as directional only.

use serde::{Deserialize, Serialize};

use crate::config::WeightCorrelationConfig;
use crate::error::AnalysisError;
use crate::models::{GlucoseReading, WeightEvent};
use crate::stats;

const ANALYSIS: &str = "weight_correlation";

/// Joint weight and glucose movement over the analysis window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightGlucoseCorrelation {
    /// Most recent weight minus oldest, kg
    pub weight_change_kg: f64,

    /// Mean glucose of the later half of readings minus the earlier half,
    /// mg/dL
    pub glucose_change_mg_dl: f64,

    /// Heuristic directional strength. Not a statistical correlation
    /// coefficient; a placeholder policy value until a real
    /// Pearson/Spearman computation replaces it.
    pub correlation_strength: f64,

    /// Days of history the comparison covered
    pub days_observed: u32,
}

/// Weight/glucose analyzer
pub struct WeightGlucoseAnalyzer<'a> {
    config: &'a WeightCorrelationConfig,
}

impl<'a> WeightGlucoseAnalyzer<'a> {
    pub fn new(config: &'a WeightCorrelationConfig) -> Self {
        WeightGlucoseAnalyzer { config }
    }

    pub fn analyze(
        &self,
        weights: &[WeightEvent],
        glucose: &[GlucoseReading],
        days_of_history: u32,
    ) -> Result<WeightGlucoseCorrelation, AnalysisError> {
        // 0.0 placeholders are not measurements, for weight as for glucose
        let mut weights: Vec<&WeightEvent> =
            weights.iter().filter(|w| w.weight_kg > 0.0).collect();
        if weights.len() < 2 {
            return Err(AnalysisError::insufficient(
                ANALYSIS,
                format!("need at least 2 weight measurements, have {}", weights.len()),
            ));
        }

        let mut readings: Vec<&GlucoseReading> =
            glucose.iter().filter(|r| r.reading > 0.0).collect();
        if readings.len() < 2 {
            return Err(AnalysisError::insufficient(
                ANALYSIS,
                format!("need at least 2 glucose readings, have {}", readings.len()),
            ));
        }

        // Chronological order by instant, not log-insertion order
        weights.sort_by_key(|w| w.instant);
        readings.sort_by_key(|r| r.instant);

        let weight_change_kg = weights[weights.len() - 1].weight_kg - weights[0].weight_kg;

        let midpoint = readings.len() / 2;
        let earlier: Vec<f64> = readings[..midpoint].iter().map(|r| r.reading).collect();
        let later: Vec<f64> = readings[midpoint..].iter().map(|r| r.reading).collect();
        let glucose_change_mg_dl =
            stats::mean(&later).unwrap_or(0.0) - stats::mean(&earlier).unwrap_or(0.0);

        let correlation_strength = if weight_change_kg < 0.0 {
            self.config.loss_correlation
        } else {
            self.config.gain_correlation
        };

        Ok(WeightGlucoseCorrelation {
            weight_change_kg,
            glucose_change_mg_dl,
            correlation_strength,
            days_observed: days_of_history,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
    }

    fn weight(day: u32, kg: f64) -> WeightEvent {
        WeightEvent {
            weight_kg: kg,
            instant: at(day, 7),
        }
    }

    fn reading(day: u32, hour: u32, value: f64) -> GlucoseReading {
        GlucoseReading {
            reading: value,
            instant: at(day, hour),
            timing_tag: None,
            notes: None,
        }
    }

    #[test]
    fn weight_loss_pairs_with_negative_strength() {
        let config = WeightCorrelationConfig::default();
        let weights = vec![weight(1, 82.0), weight(14, 80.5)];
        let glucose = vec![
            reading(1, 8, 160.0),
            reading(5, 8, 150.0),
            reading(10, 8, 130.0),
            reading(14, 8, 120.0),
        ];
        let result = WeightGlucoseAnalyzer::new(&config)
            .analyze(&weights, &glucose, 14)
            .unwrap();

        assert!((result.weight_change_kg + 1.5).abs() < 1e-9);
        assert_eq!(result.glucose_change_mg_dl, -30.0);
        assert_eq!(result.correlation_strength, -0.3);
        assert_eq!(result.days_observed, 14);
    }

    #[test]
    fn weight_gain_pairs_with_positive_strength() {
        let config = WeightCorrelationConfig::default();
        let weights = vec![weight(1, 80.0), weight(14, 81.0)];
        let glucose = vec![reading(1, 8, 120.0), reading(14, 8, 140.0)];
        let result = WeightGlucoseAnalyzer::new(&config)
            .analyze(&weights, &glucose, 14)
            .unwrap();
        assert_eq!(result.correlation_strength, 0.2);
    }

    #[test]
    fn weight_change_uses_chronological_order() {
        let config = WeightCorrelationConfig::default();
        // Newest logged first; chronological ordering must still win
        let weights = vec![weight(14, 79.0), weight(1, 82.0)];
        let glucose = vec![reading(1, 8, 120.0), reading(14, 8, 120.0)];
        let result = WeightGlucoseAnalyzer::new(&config)
            .analyze(&weights, &glucose, 14)
            .unwrap();
        assert!((result.weight_change_kg + 3.0).abs() < 1e-9);
    }

    #[test]
    fn placeholder_weights_are_not_measurements() {
        let config = WeightCorrelationConfig::default();
        // A valueless row plus one real measurement is still one measurement
        let weights = vec![weight(1, 0.0), weight(14, 80.0)];
        let glucose = vec![reading(1, 8, 120.0), reading(14, 8, 130.0)];
        let err = WeightGlucoseAnalyzer::new(&config)
            .analyze(&weights, &glucose, 14)
            .unwrap_err();
        assert!(err.is_insufficient_data());
    }

    #[test]
    fn placeholder_weights_are_excluded_from_the_trajectory() {
        let config = WeightCorrelationConfig::default();
        let weights = vec![weight(1, 0.0), weight(2, 82.0), weight(14, 80.0)];
        let glucose = vec![reading(1, 8, 120.0), reading(14, 8, 120.0)];
        let result = WeightGlucoseAnalyzer::new(&config)
            .analyze(&weights, &glucose, 14)
            .unwrap();
        assert!((result.weight_change_kg + 2.0).abs() < 1e-9);
        assert_eq!(result.correlation_strength, -0.3);
    }

    #[test]
    fn too_few_weights_is_insufficient_data() {
        let config = WeightCorrelationConfig::default();
        let err = WeightGlucoseAnalyzer::new(&config)
            .analyze(&[], &[reading(1, 8, 120.0), reading(2, 8, 130.0)], 7)
            .unwrap_err();
        assert!(err.is_insufficient_data());

        let err = WeightGlucoseAnalyzer::new(&config)
            .analyze(&[weight(1, 80.0)], &[reading(1, 8, 120.0)], 7)
            .unwrap_err();
        assert!(err.is_insufficient_data());
    }
}
