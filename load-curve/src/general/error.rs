use thiserror::Error;

/// Errors of the normalization pipeline.
///
/// `UnknownQuantityCode` and `EmptyInterpolationWindow` are not fatal: stages
/// that hit them keep going and hand them back as diagnostics.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    #[error("Unparsable timestamp in row {row}: '{value}'")]
    MalformedTimestamp { row: usize, value: String },

    #[error("Column '{column}': OBIS code '{code}' not found in catalog, treated as unitless")]
    UnknownQuantityCode { column: String, code: String },

    #[error("Column '{column}': {missing} value(s) at the edges cannot be interpolated")]
    EmptyInterpolationWindow { column: String, missing: usize },

    #[error("Table contains no rows")]
    EmptyTable,

    #[error("Column '{column}' has {actual} values, index has {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("Unknown column: '{0}'")]
    UnknownColumn(String),

    #[error("Import failed: {0}")]
    Import(String),

    #[error("Weather data: {0}")]
    Weather(String),

    #[error("Chart export failed: {0}")]
    Plot(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl PipelineError {
    /// Whether the pipeline may continue after this error
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PipelineError::UnknownQuantityCode { .. } | PipelineError::EmptyInterpolationWindow { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_offender() {
        let err = PipelineError::MalformedTimestamp {
            row: 4,
            value: "31.02.2023".to_string(),
        };
        assert_eq!(err.to_string(), "Unparsable timestamp in row 4: '31.02.2023'");
        assert!(!err.is_recoverable());

        let err = PipelineError::UnknownQuantityCode {
            column: "1-1:99.29.0".to_string(),
            code: "99".to_string(),
        };
        assert!(err.to_string().contains("'99'"));
        assert!(err.is_recoverable());
    }
}
