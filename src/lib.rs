// Library interface for the Glucora pattern analysis engine
// Allows integration tests and the CLI to access the core functionality

pub mod activity;
pub mod analysis;
pub mod circadian;
pub mod config;
pub mod consistency;
pub mod error;
pub mod logging;
pub mod meals;
pub mod medication;
pub mod models;
pub mod normalize;
pub mod risk;
pub mod spikes;
pub mod stats;
pub mod targets;
pub mod temporal;
pub mod weight;

// Re-export commonly used types for convenience
pub use analysis::{AnalysisResult, PatternAnalyzer};
pub use config::{AnalysisConfig, AppConfig};
pub use error::{AnalysisError, GlucoraError, Result};
pub use logging::{init_logging, LogConfig, LogFormat, LogLevel};
pub use models::*;
pub use normalize::{RawSnapshot, TimePolicy};
