// ⚠️ Error Taxonomy - what can go wrong while reading or writing QIF
//
// Record-level failures never abort a parse: they are collected next to the
// partially built Document and handed back together.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// CODEC ERRORS
// ============================================================================

/// Failure of a single field value codec (date, amount, status, action).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("'{value}' matches none of the configured date formats")]
    InvalidDate { value: String },
    #[error("'{value}' is not a valid amount")]
    InvalidAmount { value: String },
    #[error("'{value}' is not a cleared status (expected blank, *, c, X or R)")]
    InvalidClearedStatus { value: String },
    #[error("'{value}' is not a known investment action")]
    InvalidAction { value: String },
    #[error("'{value}' is not a memorized transaction type (expected KC, KD, KP, KI or KE)")]
    InvalidMemorizedType { value: String },
    #[error("'{value}' is not a whole number")]
    InvalidInteger { value: String },
    #[error("unknown date format pattern '{value}'")]
    UnknownDateFormat { value: String },
}

// ============================================================================
// PARSE ERRORS
// ============================================================================

/// Coarse class of a [`QifError`], handy for counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Format,
    FieldValue,
    InvariantViolation,
    UnsupportedEntity,
}

/// Errors reported by `parse`. Every variant carries the 1-based source line
/// of the offending header, field or record.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QifError {
    #[error("line {line}: {message}")]
    Format { line: usize, message: String },

    #[error("line {line}: field '{code}': {reason}")]
    FieldValue {
        line: usize,
        code: String,
        value: String,
        reason: String,
    },

    #[error("record at line {line}: {message}")]
    InvariantViolation { line: usize, message: String },

    #[error("line {line}: unsupported entity header '{header}'")]
    UnsupportedEntity { line: usize, header: String },
}

impl QifError {
    pub fn format(line: usize, message: impl Into<String>) -> Self {
        QifError::Format {
            line,
            message: message.into(),
        }
    }

    pub fn field_value(line: usize, code: &str, value: &str, err: CodecError) -> Self {
        QifError::FieldValue {
            line,
            code: code.to_string(),
            value: value.to_string(),
            reason: err.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            QifError::Format { .. } => ErrorKind::Format,
            QifError::FieldValue { .. } => ErrorKind::FieldValue,
            QifError::InvariantViolation { .. } => ErrorKind::InvariantViolation,
            QifError::UnsupportedEntity { .. } => ErrorKind::UnsupportedEntity,
        }
    }

    pub fn line(&self) -> usize {
        match self {
            QifError::Format { line, .. }
            | QifError::FieldValue { line, .. }
            | QifError::InvariantViolation { line, .. }
            | QifError::UnsupportedEntity { line, .. } => *line,
        }
    }

    /// Non-fatal findings that leave the record in the Document.
    pub fn is_warning(&self) -> bool {
        matches!(self, QifError::InvariantViolation { .. })
    }
}

// ============================================================================
// GENERATION ERRORS
// ============================================================================

/// Errors reported by `generate`. `record` identifies the offending record,
/// e.g. `Bank:Checking#3` or `Category#0`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GenerateError {
    #[error("{record}: missing required field '{field}'")]
    MissingField { record: String, field: &'static str },

    #[error("{record}: register account '{account}' has no account definition")]
    UnregisteredAccount { record: String, account: String },

    #[error("{record}: {message}")]
    MisplacedRecord { record: String, message: String },

    #[error("failed to write QIF output: {0}")]
    Io(String),
}

impl From<std::io::Error> for GenerateError {
    fn from(err: std::io::Error) -> Self {
        GenerateError::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_and_line() {
        let err = QifError::format(7, "truncated record");
        assert_eq!(err.kind(), ErrorKind::Format);
        assert_eq!(err.line(), 7);
        assert!(!err.is_warning());
        assert_eq!(err.to_string(), "line 7: truncated record");
    }

    #[test]
    fn test_field_value_carries_codec_reason() {
        let err = QifError::field_value(
            3,
            "D",
            "99/99/99",
            CodecError::InvalidDate {
                value: "99/99/99".to_string(),
            },
        );
        assert_eq!(err.kind(), ErrorKind::FieldValue);
        assert!(err.to_string().contains("matches none of the configured date formats"));
    }

    #[test]
    fn test_invariant_violation_is_warning() {
        let err = QifError::InvariantViolation {
            line: 1,
            message: "splits sum to -99.99".to_string(),
        };
        assert!(err.is_warning());
    }
}
