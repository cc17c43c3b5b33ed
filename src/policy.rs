//! Mode policy enforcement over a whole statement batch

use crate::classifier::{classify_tokens, nested_operations_in, primary_operation_in};
use crate::error::SafetyError;
use crate::sql_parser::{Statement, split_sql_statements};
use crate::types::{OperationKind, ScanWarning, SqlMode};

/// Statement accepted by [`validate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedStatement<'a> {
    pub statement: Statement<'a>,
    pub kind: OperationKind,
    /// Writes somewhere, either directly or through a data-modifying CTE
    pub modifies_data: bool,
}

/// Accepted batch, in original order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation<'a> {
    pub mode: SqlMode,
    pub statements: Vec<ValidatedStatement<'a>>,
    pub warnings: Vec<ScanWarning>,
}

impl Validation<'_> {
    /// True when the input held nothing but whitespace and comments
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }
}

/// Split, count, classify and check every statement against `mode`
///
/// The whole batch is accepted or the first offending statement rejects it.
/// An input with no statements is accepted with zero statements.
///
/// # Examples
/// ```
/// # use nl2sql_safety::policy::validate;
/// # use nl2sql_safety::types::{OperationKind, SqlMode};
/// # use nl2sql_safety::SafetyError;
/// let result = validate("SELECT * FROM users; DELETE FROM users;", SqlMode::ReadOnly, 4);
/// assert!(matches!(
///     result,
///     Err(SafetyError::ForbiddenOperation { index: 2, kind: OperationKind::Delete, .. })
/// ));
///
/// let accepted = validate("SELECT 1; SELECT 2", SqlMode::ReadOnly, 4);
/// assert_eq!(accepted.map(|v| v.len()), Ok(2));
/// ```
pub fn validate(
    sql: &str,
    mode: SqlMode,
    max_statements: usize,
) -> Result<Validation<'_>, SafetyError> {
    let statements = split_sql_statements(sql);
    log::debug!("Split SQL into {} statement(s)", statements.len());

    if statements.len() > max_statements {
        log::warn!(
            "Rejected SQL batch: {} statements exceeds the cap of {}",
            statements.len(),
            max_statements
        );
        return Err(SafetyError::TooManyStatements {
            count: statements.len(),
            max: max_statements,
        });
    }

    let mut validated = Vec::with_capacity(statements.len());
    let mut warnings = Vec::new();

    for statement in statements {
        let tokens = statement.tokens();
        let kind = classify_tokens(&tokens);
        ensure_allowed(mode, &statement, kind)?;

        let mut modifies_data = !kind.is_read();
        if kind == OperationKind::With {
            for nested in nested_operations_in(&tokens) {
                ensure_allowed(mode, &statement, nested.kind)?;
                modifies_data |= !nested.kind.is_read();
            }
        }

        // SELECT ... INTO
        let primary = primary_operation_in(&tokens);
        if primary != kind {
            ensure_allowed(mode, &statement, primary)?;
            modifies_data |= !primary.is_read();
        }

        if let Some(span) = statement.unterminated() {
            log::warn!(
                "Statement #{} ends inside an unterminated {}",
                statement.index,
                span.kind.describe()
            );
            warnings.push(ScanWarning::UnterminatedConstruct {
                statement_index: statement.index,
                construct: span.kind.describe().to_string(),
            });
        }

        validated.push(ValidatedStatement {
            statement,
            kind,
            modifies_data,
        });
    }

    Ok(Validation {
        mode,
        statements: validated,
        warnings,
    })
}

fn ensure_allowed(
    mode: SqlMode,
    statement: &Statement<'_>,
    kind: OperationKind,
) -> Result<(), SafetyError> {
    if mode.allows(kind) {
        return Ok(());
    }
    log::warn!(
        "Rejected statement #{}: {} is not allowed in {} mode",
        statement.index,
        kind,
        mode
    );
    Err(SafetyError::ForbiddenOperation {
        index: statement.index,
        kind,
        mode,
        statement: statement.sql().to_string(),
    })
}
