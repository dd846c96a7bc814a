//! Hypoglycemia risk scoring
//!
//! Additive rule model over independent recent-window signals, capped at
//! 1.0. Each fired rule contributes a fixed configured weight and a
//! human-readable factor, so the downstream presentation layer can always
//! answer "why is this score high". Rule order never affects the result.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::RiskConfig;
use crate::error::AnalysisError;
use crate::models::PatientSnapshot;
use crate::stats;

const ANALYSIS: &str = "hypoglycemia_risk";

/// Short-horizon glucose direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GlucoseTrend {
    Decreasing,
    Stable,
    Increasing,
}

impl fmt::Display for GlucoseTrend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GlucoseTrend::Decreasing => write!(f, "decreasing"),
            GlucoseTrend::Stable => write!(f, "stable"),
            GlucoseTrend::Increasing => write!(f, "increasing"),
        }
    }
}

/// Near-term hypoglycemia risk with its contributing signals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HypoglycemiaRisk {
    /// Additive score in [0, 1]
    pub risk_score: f64,

    /// Human-readable label for every rule that fired
    pub contributing_factors: Vec<String>,

    /// Hours since the most recent logged meal, if any meal was logged
    pub hours_since_last_meal: Option<f64>,

    /// True when the most recent activity fell inside the recency window
    pub recent_activity: bool,

    /// True when the latest insulin dose was logged after the latest meal
    pub medication_without_meal: bool,

    /// Short-horizon glucose direction
    pub trend: GlucoseTrend,
}

/// Hypoglycemia risk scorer
pub struct HypoglycemiaRiskScorer<'a> {
    config: &'a RiskConfig,
}

impl<'a> HypoglycemiaRiskScorer<'a> {
    pub fn new(config: &'a RiskConfig) -> Self {
        HypoglycemiaRiskScorer { config }
    }

    pub fn analyze(&self, snapshot: &PatientSnapshot) -> Result<HypoglycemiaRisk, AnalysisError> {
        // Most recent first; 0.0 placeholders are not measurements
        let mut readings: Vec<(chrono::DateTime<chrono::Utc>, f64)> = snapshot
            .glucose
            .iter()
            .filter(|r| r.reading > 0.0)
            .map(|r| (r.instant, r.reading))
            .collect();
        if readings.is_empty() {
            return Err(AnalysisError::insufficient(
                ANALYSIS,
                "no glucose readings in window",
            ));
        }
        readings.sort_by_key(|&(instant, _)| std::cmp::Reverse(instant));

        let now = snapshot.window.now;
        let mut score = 0.0;
        let mut factors: Vec<String> = Vec::new();

        // Recent lows among the 5 newest readings
        let has_recent_low = readings
            .iter()
            .take(5)
            .any(|&(_, value)| value < self.config.recent_low_threshold);
        if has_recent_low {
            score += self.config.recent_low_weight;
            factors.push("Recent low glucose readings".to_string());
        }

        // Short-horizon trend: newest 3 against the prior 3
        let trend = if readings.len() >= 6 {
            let recent: Vec<f64> = readings[..3].iter().map(|&(_, v)| v).collect();
            let prior: Vec<f64> = readings[3..6].iter().map(|&(_, v)| v).collect();
            let recent_mean = stats::mean(&recent).unwrap_or(0.0);
            let prior_mean = stats::mean(&prior).unwrap_or(0.0);
            if recent_mean <= prior_mean - self.config.trend_threshold {
                GlucoseTrend::Decreasing
            } else if recent_mean >= prior_mean + self.config.trend_threshold {
                GlucoseTrend::Increasing
            } else {
                GlucoseTrend::Stable
            }
        } else {
            GlucoseTrend::Stable
        };
        if trend == GlucoseTrend::Decreasing {
            score += self.config.trend_weight;
            factors.push("Decreasing glucose trend".to_string());
        }

        // Time since last meal
        let last_meal = snapshot.meals.iter().map(|m| m.instant).max();
        let hours_since_last_meal =
            last_meal.map(|instant| (now - instant).num_minutes() as f64 / 60.0);
        if let Some(hours) = hours_since_last_meal {
            if hours > self.config.meal_gap_hours {
                score += self.config.meal_gap_weight;
                factors.push("Long time since last meal".to_string());
            }
        }

        // Recent physical activity keeps lowering glucose for hours
        let last_activity = snapshot.activities.iter().map(|a| a.instant).max();
        let recent_activity = last_activity
            .map(|instant| {
                (now - instant).num_minutes() as f64 / 60.0 < self.config.activity_recency_hours
            })
            .unwrap_or(false);
        if recent_activity {
            score += self.config.activity_weight;
            factors.push("Recent physical activity".to_string());
        }

        // Insulin logged after the latest meal means a dose is working
        // without food behind it
        let last_insulin = snapshot
            .medications
            .iter()
            .filter(|m| m.medication_name.to_lowercase().contains("insulin"))
            .map(|m| m.instant)
            .max();
        let medication_without_meal = match (last_insulin, last_meal) {
            (Some(insulin), Some(meal)) => insulin > meal,
            _ => false,
        };
        if medication_without_meal {
            score += self.config.insulin_without_meal_weight;
            factors.push("Insulin taken without recent meal".to_string());
        }

        Ok(HypoglycemiaRisk {
            risk_score: score.min(1.0),
            contributing_factors: factors,
            hours_since_last_meal,
            recent_activity,
            medication_without_meal,
            trend,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    use crate::models::{
        ActivityEvent, AnalysisWindow, GlucoseReading, MealEvent, MedicationEvent, PatientProfile,
    };

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 20, 0, 0).unwrap()
    }

    fn snapshot() -> PatientSnapshot {
        PatientSnapshot::empty(PatientProfile::default(), AnalysisWindow::new(7, now()))
    }

    fn reading(hours_ago: i64, value: f64) -> GlucoseReading {
        GlucoseReading {
            reading: value,
            instant: now() - Duration::hours(hours_ago),
            timing_tag: None,
            notes: None,
        }
    }

    fn meal(hours_ago: i64) -> MealEvent {
        MealEvent {
            label: "Meal".to_string(),
            description: None,
            instant: now() - Duration::hours(hours_ago),
        }
    }

    #[test]
    fn low_window_plus_fasting_gap_scores_half() {
        let config = RiskConfig::default();
        let mut snap = snapshot();
        // 2 of the last 5 readings below 70, values steady otherwise
        snap.glucose = vec![
            reading(1, 65.0),
            reading(2, 90.0),
            reading(3, 68.0),
            reading(4, 90.0),
            reading(5, 90.0),
        ];
        snap.meals = vec![meal(8)];

        let risk = HypoglycemiaRiskScorer::new(&config).analyze(&snap).unwrap();
        assert!((risk.risk_score - 0.5).abs() < 1e-9);
        assert_eq!(risk.trend, GlucoseTrend::Stable);
        assert_eq!(risk.hours_since_last_meal, Some(8.0));
        assert!(risk
            .contributing_factors
            .contains(&"Recent low glucose readings".to_string()));
        assert!(risk
            .contributing_factors
            .contains(&"Long time since last meal".to_string()));
        assert_eq!(risk.contributing_factors.len(), 2);
    }

    #[test]
    fn decreasing_trend_fires_on_mean_shift() {
        let config = RiskConfig::default();
        let mut snap = snapshot();
        snap.glucose = vec![
            reading(1, 100.0),
            reading(2, 100.0),
            reading(3, 100.0),
            reading(4, 120.0),
            reading(5, 120.0),
            reading(6, 120.0),
        ];
        let risk = HypoglycemiaRiskScorer::new(&config).analyze(&snap).unwrap();
        assert_eq!(risk.trend, GlucoseTrend::Decreasing);
        assert!((risk.risk_score - 0.2).abs() < 1e-9);
    }

    #[test]
    fn increasing_trend_fires_no_rule() {
        let config = RiskConfig::default();
        let mut snap = snapshot();
        snap.glucose = vec![
            reading(1, 140.0),
            reading(2, 140.0),
            reading(3, 140.0),
            reading(4, 110.0),
            reading(5, 110.0),
            reading(6, 110.0),
        ];
        let risk = HypoglycemiaRiskScorer::new(&config).analyze(&snap).unwrap();
        assert_eq!(risk.trend, GlucoseTrend::Increasing);
        assert_eq!(risk.risk_score, 0.0);
    }

    #[test]
    fn fewer_than_six_readings_means_stable_trend() {
        let config = RiskConfig::default();
        let mut snap = snapshot();
        snap.glucose = vec![reading(1, 80.0), reading(2, 150.0)];
        let risk = HypoglycemiaRiskScorer::new(&config).analyze(&snap).unwrap();
        assert_eq!(risk.trend, GlucoseTrend::Stable);
    }

    #[test]
    fn recent_activity_and_insulin_ordering_fire() {
        let config = RiskConfig::default();
        let mut snap = snapshot();
        snap.glucose = vec![reading(1, 90.0)];
        snap.meals = vec![meal(3)];
        snap.activities = vec![ActivityEvent {
            activity_type: "walking".to_string(),
            duration_minutes: 30,
            intensity: None,
            instant: now() - Duration::hours(2),
        }];
        snap.medications = vec![MedicationEvent {
            medication_name: "Insulin Glargine".to_string(),
            quantity: None,
            instant: now() - Duration::hours(1),
            notes: None,
        }];

        let risk = HypoglycemiaRiskScorer::new(&config).analyze(&snap).unwrap();
        assert!(risk.recent_activity);
        assert!(risk.medication_without_meal);
        assert!((risk.risk_score - 0.3).abs() < 1e-9);
        assert_eq!(risk.contributing_factors.len(), 2);
    }

    #[test]
    fn score_caps_at_one() {
        let mut config = RiskConfig::default();
        config.recent_low_weight = 0.9;
        config.meal_gap_weight = 0.9;
        let mut snap = snapshot();
        snap.glucose = vec![reading(1, 60.0)];
        snap.meals = vec![meal(10)];
        let risk = HypoglycemiaRiskScorer::new(&config).analyze(&snap).unwrap();
        assert_eq!(risk.risk_score, 1.0);
    }

    #[test]
    fn no_readings_is_insufficient_data() {
        let config = RiskConfig::default();
        let err = HypoglycemiaRiskScorer::new(&config)
            .analyze(&snapshot())
            .unwrap_err();
        assert!(err.is_insufficient_data());
    }
}
