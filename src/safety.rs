//! Validation and row capping combined into an executable batch
//!
//! This is what an orchestration layer calls between receiving SQL from the
//! model and handing statements to a database connection.

use crate::error::SafetyError;
use crate::policy::validate;
use crate::scanner::{SpanKind, scan};
use crate::sql_limiter::apply_limit;
use crate::types::{OperationKind, PreparedStatement, ScanWarning, SqlMode};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Statements cleared to run, in order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PreparedBatch {
    /// Mode the batch was validated under
    pub mode: SqlMode,

    pub statements: Vec<PreparedStatement>,

    /// Non-fatal scan findings worth surfacing to the user
    pub warnings: Vec<ScanWarning>,
}

impl PreparedBatch {
    /// Nothing to run; the caller decides how to answer a no-op
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Every statement is a plain read
    pub fn all_reads(&self) -> bool {
        !self.statements.is_empty() && self.statements.iter().all(|s| !s.modifies_data)
    }

    /// Any statement writes, so the batch should run inside one transaction
    pub fn requires_transaction(&self) -> bool {
        self.statements.iter().any(|s| s.modifies_data)
    }

    /// Kind of the statement whose result answers the user
    pub fn last_kind(&self) -> Option<OperationKind> {
        self.statements.last().map(|s| s.kind)
    }

    /// The batch as one script, for echoing back what will run
    ///
    /// A statement ending in a `--` comment gets its `;` on the next line.
    ///
    /// # Examples
    /// ```
    /// # use nl2sql_safety::{SqlMode, prepare_statements};
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let batch = prepare_statements("select 1; select 2", SqlMode::ReadOnly, 4, 10)?;
    /// assert_eq!(batch.joined_sql(), "select 1 LIMIT 10;\n\nselect 2 LIMIT 10;");
    /// # Ok(())
    /// # }
    /// ```
    pub fn joined_sql(&self) -> String {
        let mut joined = String::new();
        for (i, statement) in self.statements.iter().enumerate() {
            if i > 0 {
                joined.push_str("\n\n");
            }
            joined.push_str(&statement.sql);
            if ends_in_line_comment(&statement.sql) {
                joined.push('\n');
            }
            joined.push(';');
        }
        joined
    }
}

/// A `;` appended here would land inside the comment
fn ends_in_line_comment(sql: &str) -> bool {
    scan(sql.trim_end())
        .last()
        .is_some_and(|s| s.kind == SpanKind::LineComment)
}

/// Validate `sql` under `mode` and cap every read statement at `max_rows`
///
/// # Examples
/// ```
/// # use nl2sql_safety::{SqlMode, prepare_statements};
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let batch = prepare_statements(
///     "SELECT * FROM orders; INSERT INTO audit VALUES (1) RETURNING *;",
///     SqlMode::WriteNoDelete,
///     4,
///     50,
/// )?;
/// assert_eq!(batch.statements[0].sql, "SELECT * FROM orders LIMIT 50");
/// assert_eq!(batch.statements[1].sql, "INSERT INTO audit VALUES (1) RETURNING *");
/// assert!(batch.requires_transaction());
/// # Ok(())
/// # }
/// ```
pub fn prepare_statements(
    sql: &str,
    mode: SqlMode,
    max_statements: usize,
    max_rows: usize,
) -> Result<PreparedBatch, SafetyError> {
    let validation = validate(sql, mode, max_statements)?;

    let statements = validation
        .statements
        .iter()
        .map(|validated| {
            let text = validated.statement.sql();
            let sql = if validated.kind.is_read() {
                apply_limit(text, max_rows)
            } else {
                text.to_string()
            };
            PreparedStatement {
                index: validated.statement.index,
                kind: validated.kind,
                sql,
                modifies_data: validated.modifies_data,
            }
        })
        .collect::<Vec<_>>();

    log::debug!(
        "Prepared {} statement(s) under {} mode",
        statements.len(),
        mode
    );

    Ok(PreparedBatch {
        mode,
        statements,
        warnings: validation.warnings,
    })
}
