//! Unified error hierarchy for Glucora
//!
//! The taxonomy deliberately separates "there is not enough data to say
//! anything" from real faults. Insufficient data is the dominant outcome in
//! early logging weeks and is never fatal; only a contract violation by the
//! upstream data-access layer fails a whole analysis run.

use thiserror::Error;

/// Top-level error type for all Glucora operations
#[derive(Debug, Error)]
pub enum GlucoraError {
    /// The input snapshot violates the upstream contract (missing profile
    /// data, non-positive window). The only error that aborts a run.
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),

    /// Error surfaced from a single analyzer
    #[error("analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    /// Configuration loading or validation errors
    #[error("configuration error: {0}")]
    Configuration(String),

    /// IO errors (config files, CLI snapshot input)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot or config (de)serialization errors
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Per-analyzer error type
///
/// Each analyzer returns `Result<T, AnalysisError>` instead of silently
/// producing defaults; the orchestrator decides how each variant degrades.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The analyzer's minimum-data requirement was not met. Expected and
    /// non-fatal; downgrades to an absent sub-result.
    #[error("insufficient data for {analysis}: {reason}")]
    InsufficientData {
        analysis: &'static str,
        reason: String,
    },

    /// A record could not be interpreted (unparsable timestamp, impossible
    /// value). Recovered at the record level; reported only when it makes a
    /// whole analyzer unusable.
    #[error("malformed record in {analysis}: {reason}")]
    MalformedRecord {
        analysis: &'static str,
        reason: String,
    },

    /// Anything unexpected inside an analyzer. Contained at the analyzer
    /// boundary; never aborts the run.
    #[error("internal error in {analysis}: {reason}")]
    Internal {
        analysis: &'static str,
        reason: String,
    },
}

impl AnalysisError {
    pub fn insufficient(analysis: &'static str, reason: impl Into<String>) -> Self {
        AnalysisError::InsufficientData {
            analysis,
            reason: reason.into(),
        }
    }

    /// True for the expected "not enough history yet" outcome, as opposed
    /// to a real bug worth a warning in the logs.
    pub fn is_insufficient_data(&self) -> bool {
        matches!(self, AnalysisError::InsufficientData { .. })
    }

    /// Name of the analyzer that produced this error
    pub fn analysis(&self) -> &'static str {
        match self {
            AnalysisError::InsufficientData { analysis, .. }
            | AnalysisError::MalformedRecord { analysis, .. }
            | AnalysisError::Internal { analysis, .. } => analysis,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            AnalysisError::InsufficientData { .. } => ErrorSeverity::Info,
            AnalysisError::MalformedRecord { .. } => ErrorSeverity::Warning,
            AnalysisError::Internal { .. } => ErrorSeverity::Error,
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Error,
    Warning,
    Info,
}

impl ErrorSeverity {
    /// Convert to tracing level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Error => tracing::Level::ERROR,
            ErrorSeverity::Warning => tracing::Level::WARN,
            ErrorSeverity::Info => tracing::Level::INFO,
        }
    }
}

/// Result type alias for Glucora operations
pub type Result<T> = std::result::Result<T, GlucoraError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_data_is_info_severity() {
        let err = AnalysisError::insufficient("circadian", "no glucose readings");
        assert!(err.is_insufficient_data());
        assert_eq!(err.severity(), ErrorSeverity::Info);
        assert_eq!(err.analysis(), "circadian");
    }

    #[test]
    fn internal_errors_are_error_severity() {
        let err = AnalysisError::Internal {
            analysis: "meals",
            reason: "test".to_string(),
        };
        assert!(!err.is_insufficient_data());
        assert_eq!(err.severity().to_tracing_level(), tracing::Level::ERROR);
    }
}
