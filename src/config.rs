//! Analysis policy configuration
//!
//! Every heuristic constant in the engine lives here as a named,
//! overridable value. None of these numbers is a physiological constant;
//! they are policy knobs inherited from the product's first deployment and
//! are expected to be tuned per deployment without code changes.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::logging::LogConfig;

/// Full engine configuration, one section per analyzer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Civil timezone used for every hour-of-day computation, expressed as
    /// minutes east of UTC. All analyzers must convert through this single
    /// policy or circadian results become meaningless. Default is UTC+8,
    /// matching the first deployment region.
    pub timezone_offset_minutes: i32,

    pub circadian: CircadianConfig,
    pub meal: MealCorrelationConfig,
    pub activity: ActivityCorrelationConfig,
    pub weight: WeightCorrelationConfig,
    pub medication: MedicationConfig,
    pub spikes: SpikeConfig,
    pub risk: RiskConfig,
    pub consistency: ConsistencyConfig,
    pub targets: TargetConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            timezone_offset_minutes: 480,
            circadian: CircadianConfig::default(),
            meal: MealCorrelationConfig::default(),
            activity: ActivityCorrelationConfig::default(),
            weight: WeightCorrelationConfig::default(),
            medication: MedicationConfig::default(),
            spikes: SpikeConfig::default(),
            risk: RiskConfig::default(),
            consistency: ConsistencyConfig::default(),
            targets: TargetConfig::default(),
        }
    }
}

/// Circadian rhythm analysis settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircadianConfig {
    /// Std-dev of hourly means (mg/dL) at which stability bottoms out at 0
    pub stability_divisor: f64,

    /// How many peak and low hours to report
    pub rank_size: usize,
}

impl Default for CircadianConfig {
    fn default() -> Self {
        CircadianConfig {
            stability_divisor: 50.0,
            rank_size: 3,
        }
    }
}

/// Meal-to-glucose spike correlation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MealCorrelationConfig {
    /// Forward response window after a meal, in hours
    pub response_window_hours: i64,

    /// Average spike (mg/dL) above which a meal is flagged high-spike
    pub high_spike_threshold: f64,

    /// Max entries in the best/worst meal rankings
    pub ranking_size: usize,
}

impl Default for MealCorrelationConfig {
    fn default() -> Self {
        MealCorrelationConfig {
            response_window_hours: 3,
            high_spike_threshold: 40.0,
            ranking_size: 5,
        }
    }
}

/// Activity-to-glucose correlation settings
///
/// Activity uses mean-to-mean deltas rather than peak excursion: the signal
/// of interest is sustained effect, not a single spike.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivityCorrelationConfig {
    /// Baseline window before activity start, in hours
    pub before_window_hours: i64,

    /// Response window start offset after activity start, in hours
    pub after_window_start_hours: i64,

    /// Response window end offset after activity start, in hours
    pub after_window_end_hours: i64,
}

impl Default for ActivityCorrelationConfig {
    fn default() -> Self {
        ActivityCorrelationConfig {
            before_window_hours: 1,
            after_window_start_hours: 1,
            after_window_end_hours: 3,
        }
    }
}

/// Weight/glucose correlation settings
///
/// `correlation_strength` output is a fixed sign heuristic, not a Pearson
/// coefficient. Flagged to stakeholders as a placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightCorrelationConfig {
    /// Reported strength when weight decreased over the window
    pub loss_correlation: f64,

    /// Reported strength when weight held or increased
    pub gain_correlation: f64,
}

impl Default for WeightCorrelationConfig {
    fn default() -> Self {
        WeightCorrelationConfig {
            loss_correlation: -0.3,
            gain_correlation: 0.2,
        }
    }
}

/// Medication timing analysis settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MedicationConfig {
    /// Expected doses per day when a medication has no specific entry
    pub default_daily_doses: f64,

    /// Per-medication expected doses per day, keyed by lowercased name.
    /// Overrides the once-daily default for twice-daily regimens and the
    /// like.
    pub expected_daily_doses: HashMap<String, f64>,
}

impl Default for MedicationConfig {
    fn default() -> Self {
        MedicationConfig {
            default_daily_doses: 1.0,
            expected_daily_doses: HashMap::new(),
        }
    }
}

impl MedicationConfig {
    /// Expected doses per day for the named medication
    pub fn daily_doses_for(&self, medication_name: &str) -> f64 {
        self.expected_daily_doses
            .get(&medication_name.to_lowercase())
            .copied()
            .unwrap_or(self.default_daily_doses)
    }
}

/// Glucose spike pattern detection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpikeConfig {
    /// Minimum rise between consecutive readings to count as a spike, mg/dL
    pub min_rise: f64,

    /// Minimum gap between the pair of readings, in hours
    pub min_gap_hours: f64,

    /// Maximum gap between the pair of readings, in hours
    pub max_gap_hours: f64,

    /// How many common spike hours to report
    pub common_hour_count: usize,
}

impl Default for SpikeConfig {
    fn default() -> Self {
        SpikeConfig {
            min_rise: 20.0,
            min_gap_hours: 0.5,
            max_gap_hours: 4.0,
            common_hour_count: 3,
        }
    }
}

/// Hypoglycemia risk rule weights and thresholds
///
/// The model is purely additive and capped at 1.0, so rule order never
/// matters. Weights sum above 1.0 on purpose: several simultaneous signals
/// saturate the score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// A reading below this (mg/dL) among the 5 most recent counts as a
    /// recent low
    pub recent_low_threshold: f64,
    pub recent_low_weight: f64,

    /// Mean shift (mg/dL) between the last 3 and prior 3 readings that
    /// classifies the trend as decreasing/increasing
    pub trend_threshold: f64,
    pub trend_weight: f64,

    /// Hours since last meal above which the fasting-gap rule fires
    pub meal_gap_hours: f64,
    pub meal_gap_weight: f64,

    /// Activity within this many hours counts as recent
    pub activity_recency_hours: f64,
    pub activity_weight: f64,

    /// Weight for an insulin dose logged after the most recent meal
    pub insulin_without_meal_weight: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        RiskConfig {
            recent_low_threshold: 70.0,
            recent_low_weight: 0.3,
            trend_threshold: 10.0,
            trend_weight: 0.2,
            meal_gap_hours: 6.0,
            meal_gap_weight: 0.2,
            activity_recency_hours: 4.0,
            activity_weight: 0.15,
            insulin_without_meal_weight: 0.15,
        }
    }
}

/// Lifestyle consistency scoring settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsistencyConfig {
    /// Std-dev of event times (minutes since local midnight) at which a
    /// timing category's score bottoms out at 0
    pub timing_stddev_minutes: f64,

    /// Timing categories below this score are flagged for improvement
    pub timing_threshold: f64,

    /// Activity day-coverage below this is flagged for improvement
    pub coverage_threshold: f64,

    /// Score assigned to a category with no logged events
    pub missing_category_score: f64,
}

impl Default for ConsistencyConfig {
    fn default() -> Self {
        ConsistencyConfig {
            timing_stddev_minutes: 120.0,
            timing_threshold: 0.6,
            coverage_threshold: 0.5,
            missing_category_score: 0.5,
        }
    }
}

/// Personalized glucose target settings, all in mg/dL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Average glucose below which a diabetic patient gets the tight range
    pub control_cutoff: f64,

    /// Tight range for well-controlled diabetes
    pub tight_range: (f64, f64),

    /// Wider initial range for elevated averages
    pub wide_range: (f64, f64),

    /// Generic default range when no diabetes condition is present
    pub generic_range: (f64, f64),

    /// Hours to shift activity recommendations before each circadian peak
    pub activity_lead_hours: u32,
}

impl Default for TargetConfig {
    fn default() -> Self {
        TargetConfig {
            control_cutoff: 140.0,
            tight_range: (80.0, 140.0),
            wide_range: (80.0, 180.0),
            generic_range: (70.0, 140.0),
            activity_lead_hours: 2,
        }
    }
}

/// Application-level configuration persisted as TOML
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Logging settings
    pub logging: LogConfig,

    /// Analysis policy settings
    pub analysis: AnalysisConfig,
}

impl AppConfig {
    /// Default config file location under the platform config directory
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("glucora")
            .join("config.toml")
    }

    /// Load configuration from the given path, or defaults if the file
    /// does not exist yet
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(AppConfig::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: AppConfig = toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Write configuration to the given path, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create config dir {}", parent.display()))?;
        }
        let raw = toml::to_string_pretty(self).context("failed to serialize config")?;
        fs::write(path, raw)
            .with_context(|| format!("failed to write config file {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_policy_constants() {
        let config = AnalysisConfig::default();
        assert_eq!(config.meal.high_spike_threshold, 40.0);
        assert_eq!(config.circadian.stability_divisor, 50.0);
        assert_eq!(config.consistency.timing_stddev_minutes, 120.0);
        assert_eq!(config.risk.recent_low_threshold, 70.0);
        assert_eq!(config.risk.recent_low_weight, 0.3);
    }

    #[test]
    fn medication_dose_lookup_is_case_insensitive() {
        let mut config = MedicationConfig::default();
        config
            .expected_daily_doses
            .insert("metformin".to_string(), 2.0);
        assert_eq!(config.daily_doses_for("Metformin"), 2.0);
        assert_eq!(config.daily_doses_for("Insulin"), 1.0);
    }

    #[test]
    fn config_round_trips_through_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = AppConfig::default();
        config.analysis.timezone_offset_minutes = 330;
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded.analysis.timezone_offset_minutes, 330);
        assert_eq!(loaded.analysis, config.analysis);
    }

    #[test]
    fn missing_config_file_yields_defaults() {
        let loaded = AppConfig::load(Path::new("/nonexistent/glucora.toml")).unwrap();
        assert_eq!(loaded.analysis, AnalysisConfig::default());
    }
}
