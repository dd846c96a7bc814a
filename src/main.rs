use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use glucora::analysis::{AnalysisResult, PatternAnalyzer};
use glucora::config::AppConfig;
use glucora::logging::init_logging;
use glucora::normalize::RawSnapshot;

#[derive(Parser)]
#[command(
    name = "glucora",
    about = "Personalized glucose pattern analysis",
    version
)]
struct Cli {
    /// Path to the configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a patient snapshot and print the derived patterns
    Analyze {
        /// JSON snapshot file produced by the data-access layer
        #[arg(short, long)]
        input: PathBuf,

        /// Emit the full result as JSON instead of tables
        #[arg(long)]
        json: bool,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Write a default configuration file
    Init,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(AppConfig::default_path);
    let app_config = AppConfig::load(&config_path)?;
    let _guard = init_logging(&app_config.logging)?;

    match cli.command {
        Commands::Analyze { input, json } => run_analyze(&app_config, &input, json),
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                println!("{}", toml::to_string_pretty(&app_config)?);
                Ok(())
            }
            ConfigAction::Init => {
                app_config.save(&config_path)?;
                println!("Wrote configuration to {}", config_path.display());
                Ok(())
            }
        },
    }
}

fn run_analyze(app_config: &AppConfig, input: &PathBuf, json: bool) -> Result<()> {
    let raw = std::fs::read_to_string(input)
        .with_context(|| format!("failed to read snapshot {}", input.display()))?;
    let snapshot: RawSnapshot = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse snapshot {}", input.display()))?;
    let snapshot = snapshot.normalize(Utc::now())?;

    let analyzer = PatternAnalyzer::with_config(app_config.analysis.clone());
    let result = analyzer.analyze(&snapshot)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        render(&result);
    }
    Ok(())
}

#[derive(Tabled)]
struct MealRow {
    #[tabled(rename = "Meal")]
    meal: String,
    #[tabled(rename = "Avg spike (mg/dL)")]
    avg_spike: String,
    #[tabled(rename = "Times logged")]
    occurrences: u32,
    #[tabled(rename = "High spike")]
    high: String,
}

#[derive(Tabled)]
struct MedicationRow {
    #[tabled(rename = "Medication")]
    name: String,
    #[tabled(rename = "Usual hour")]
    hour: String,
    #[tabled(rename = "Adherence")]
    adherence: String,
    #[tabled(rename = "Effectiveness")]
    effectiveness: String,
}

fn render(result: &AnalysisResult) {
    println!("{}", "Glucose pattern analysis".bold());
    println!();

    match &result.circadian {
        Some(circadian) => {
            println!("{}", "Circadian rhythm".bold());
            println!(
                "  peak hours: {:?}  low hours: {:?}  stability: {:.2}",
                circadian.peak_hours, circadian.low_hours, circadian.pattern_stability
            );
        }
        None => absent("Circadian rhythm"),
    }
    println!();

    match &result.meal_correlations {
        Some(matrix) => {
            println!("{}", "Meal correlations".bold());
            let rows: Vec<MealRow> = matrix
                .correlations
                .iter()
                .map(|c| MealRow {
                    meal: c.subject.clone(),
                    avg_spike: format!("{:+.1}", c.delta),
                    occurrences: c.occurrences,
                    high: if c.is_high { "yes".red().to_string() } else { "no".to_string() },
                })
                .collect();
            println!("{}", Table::new(rows).with(Style::rounded()));
            if !matrix.best_meals.is_empty() {
                println!("  best: {}", matrix.best_meals.join(", ").green());
            }
            if !matrix.worst_meals.is_empty() {
                println!("  worst: {}", matrix.worst_meals.join(", ").red());
            }
        }
        None => absent("Meal correlations"),
    }
    println!();

    match &result.medication_effectiveness {
        Some(medications) if !medications.is_empty() => {
            println!("{}", "Medication timing".bold());
            let rows: Vec<MedicationRow> = medications
                .iter()
                .map(|m| MedicationRow {
                    name: m.medication_name.clone(),
                    hour: m
                        .optimal_hour
                        .map(|h| format!("{:02}:00", h))
                        .unwrap_or_else(|| "-".to_string()),
                    adherence: format!("{:.0}%", m.adherence_rate),
                    effectiveness: format!("{:.2}", m.effectiveness_score),
                })
                .collect();
            println!("{}", Table::new(rows).with(Style::rounded()));
        }
        _ => absent("Medication timing"),
    }
    println!();

    match &result.activity_correlations {
        Some(activities) if !activities.is_empty() => {
            println!("{}", "Activity impact".bold());
            for activity in activities {
                println!(
                    "  {}: {:+.1} mg/dL ({} sessions)",
                    activity.activity_type, activity.glucose_change, activity.occurrences
                );
            }
        }
        _ => absent("Activity impact"),
    }
    println!();

    match &result.weight_correlation {
        Some(weight) => {
            println!("{}", "Weight and glucose".bold());
            println!(
                "  weight {:+.1} kg, glucose {:+.1} mg/dL over {} days",
                weight.weight_change_kg, weight.glucose_change_mg_dl, weight.days_observed
            );
        }
        None => absent("Weight and glucose"),
    }
    println!();

    match &result.hypoglycemia_risk {
        Some(risk) => {
            let score = format!("{:.2}", risk.risk_score);
            let score = if risk.risk_score >= 0.6 {
                score.red().bold()
            } else if risk.risk_score >= 0.3 {
                score.yellow()
            } else {
                score.green()
            };
            println!("{} {} (trend: {})", "Hypoglycemia risk".bold(), score, risk.trend);
            for factor in &risk.contributing_factors {
                println!("  - {}", factor);
            }
        }
        None => absent("Hypoglycemia risk"),
    }
    println!();

    match &result.lifestyle_consistency {
        Some(consistency) => {
            println!(
                "{} {:.2} (meals {:.2}, medication {:.2}, activity {:.2})",
                "Lifestyle consistency".bold(),
                consistency.overall_score,
                consistency.meal_timing,
                consistency.medication_timing,
                consistency.activity_coverage
            );
            for area in &consistency.improvement_areas {
                println!("  - needs work: {}", area);
            }
        }
        None => absent("Lifestyle consistency"),
    }
    println!();

    match &result.personalized_targets {
        Some(targets) => {
            println!("{}", "Personalized targets".bold());
            println!(
                "  glucose range: {:.0}-{:.0} mg/dL",
                targets.range_min, targets.range_max
            );
            println!("  {}", targets.rationale);
            println!("  meal times: {}", targets.best_meal_times.join(", "));
            println!("  activity times: {}", targets.best_activity_times.join(", "));
            for (medication, time) in &targets.medication_schedule {
                println!("  {} at {}", medication, time);
            }
        }
        None => absent("Personalized targets"),
    }
}

fn absent(section: &str) {
    println!("{} {}", section.bold(), "insufficient data".dimmed());
}
