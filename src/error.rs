//! Error types for SQL safety checks

use crate::types::{OperationKind, SqlMode};
use thiserror::Error;

/// Rejection of a whole statement batch
///
/// Rejections are ordinary negative results: nothing is retried and nothing
/// in the batch runs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SafetyError {
    /// More statements than the configured cap
    #[error("Too many SQL statements: {count} (max {max})")]
    TooManyStatements { count: usize, max: usize },

    /// Statement kind not in the active mode's allow-set
    #[error("Statement #{index} is a {kind} operation, which is not allowed in {mode} mode")]
    ForbiddenOperation {
        /// 1-based statement index
        index: usize,
        kind: OperationKind,
        mode: SqlMode,
        /// Offending statement as the caller supplied it
        statement: String,
    },
}

impl SafetyError {
    /// 1-based index of the offending statement, if the rejection names one
    pub fn statement_index(&self) -> Option<usize> {
        match self {
            Self::TooManyStatements { .. } => None,
            Self::ForbiddenOperation { index, .. } => Some(*index),
        }
    }
}

/// Unrecognized SQL mode name
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown SQL mode '{0}': expected read_only, write_no_delete or write_full")]
pub struct ParseSqlModeError(pub String);
