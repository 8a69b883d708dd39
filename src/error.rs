// Error types for reading, validating and flagging a rating snapshot.
//
// Every failure is fatal for the batch job. The class tells the operator
// whether the input file is wrong (schema), its contents are wrong (data),
// or the machine ran out of something (resource).

use arrow::datatypes::DataType;
use arrow::error::ArrowError;
use parquet::errors::ParquetError;
use thiserror::Error;

/// Broad failure category, reported alongside the error message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Missing or mistyped required columns. Detected before any computation.
    Schema,
    /// Values that make a flag undefined (null ids, unusable timestamps).
    Data,
    /// Storage or memory exhaustion, unreadable files. No partial output.
    Resource,
}

impl ErrorClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorClass::Schema => "schema",
            ErrorClass::Data => "data",
            ErrorClass::Resource => "resource",
        }
    }
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum FlagError {
    #[error("missing required column `{0}`")]
    MissingColumn(String),

    #[error("column `{column}` has unsupported type {found}, expected {expected}")]
    UnsupportedType {
        column: String,
        found: DataType,
        expected: &'static str,
    },

    #[error("column `{column}` has {count} null values (first at row {first_row})")]
    NullValues {
        column: String,
        count: usize,
        first_row: usize,
    },

    #[error("`{column}` value {value} at row {row} is outside the representable time range")]
    TimestampOutOfRange {
        column: String,
        row: usize,
        value: i64,
    },

    #[error("flag column length {got} does not match table length {expected}")]
    LengthMismatch { got: usize, expected: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("arrow: {0}")]
    Arrow(#[from] ArrowError),

    #[error("parquet: {0}")]
    Parquet(#[from] ParquetError),
}

impl FlagError {
    pub fn class(&self) -> ErrorClass {
        match self {
            FlagError::MissingColumn(_) | FlagError::UnsupportedType { .. } => ErrorClass::Schema,
            FlagError::NullValues { .. }
            | FlagError::TimestampOutOfRange { .. }
            | FlagError::LengthMismatch { .. } => ErrorClass::Data,
            FlagError::Io(_) | FlagError::Arrow(_) | FlagError::Parquet(_) => ErrorClass::Resource,
        }
    }
}

pub type Result<T> = std::result::Result<T, FlagError>;
