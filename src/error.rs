//! Error types.
//!
//! - `LoadError`: why a CSV could not be turned into records
//! - `DataError`: failures of the data preparation layer (load, schema, margin)
//! - `AppError`: process-level error carrying the exit code of the `sales` binary

use std::path::PathBuf;

use crate::domain::{Column, MonthlyPeriod};

/// Reasons a sales CSV failed to load. Loading is all-or-nothing, so any of
/// these aborts the whole file.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Failed to open CSV '{}': {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("line {line}: missing required value: `{column}`")]
    MissingValue { line: usize, column: Column },

    #[error("line {line}: invalid date '{value}'. Expected YYYY-MM-DD, YYYY/MM/DD or an ISO timestamp.")]
    InvalidDate { line: usize, value: String },

    #[error("line {line}: invalid `{column}` value '{value}' (expected a finite number)")]
    InvalidNumber {
        line: usize,
        column: Column,
        value: String,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("Missing required column: `{column}`")]
    Schema { column: Column },

    #[error("Profit margin is undefined for {month}: sales sum is zero")]
    DivisionUndefined { month: MonthlyPeriod },
}

impl DataError {
    pub fn exit_code(&self) -> u8 {
        match self {
            DataError::Load(_) | DataError::Schema { .. } => 2,
            DataError::DivisionUndefined { .. } => 3,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<DataError> for AppError {
    fn from(err: DataError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_errors_map_to_exit_codes() {
        let schema = DataError::Schema {
            column: Column::Sales,
        };
        let app: AppError = schema.into();
        assert_eq!(app.exit_code(), 2);
        assert_eq!(app.to_string(), "Missing required column: `sales`");

        let month = MonthlyPeriod::new(2024, 3).unwrap();
        let app: AppError = DataError::DivisionUndefined { month }.into();
        assert_eq!(app.exit_code(), 3);
        assert!(app.to_string().contains("2024-03"));
    }

    #[test]
    fn load_errors_keep_line_numbers() {
        let err = DataError::from(LoadError::InvalidDate {
            line: 7,
            value: "yesterday".to_string(),
        });
        assert!(err.to_string().starts_with("line 7: invalid date 'yesterday'"));
        assert_eq!(err.exit_code(), 2);
    }
}
