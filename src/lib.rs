//! SQL statement safety engine for model-generated SQL
//!
//! Splits an arbitrary text blob into statements without being fooled by
//! string literals, quoted identifiers, comments or dollar-quoted bodies,
//! classifies each statement, enforces a permission mode over the batch and
//! caps the rows read statements can return.
//!
//! Callers use two operations: [`validate`] before anything reaches a
//! connection, and [`apply_limit`] on each accepted read statement.
//! [`prepare_statements`] does both in one call.

pub mod error;
pub mod types;

pub mod classifier;
pub mod config;
pub mod policy;
pub mod safety;
pub mod scanner;
pub mod sql_limiter;
pub mod sql_parser;

// Re-exports
pub use classifier::{NestedOperation, classify, classify_sql, nested_operations, primary_operation};
pub use config::Settings;
pub use error::{ParseSqlModeError, SafetyError};
pub use policy::{ValidatedStatement, Validation, validate};
pub use safety::{PreparedBatch, prepare_statements};
pub use scanner::{Span, SpanKind, scan};
pub use sql_limiter::{apply_limit, has_row_limit};
pub use sql_parser::{
    Segment, Statement, extract_first_keyword, split_segments, split_sql_statements,
    split_statements, strip_comments,
};
pub use types::{OperationKind, PreparedStatement, ScanWarning, SqlMode};
