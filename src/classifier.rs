//! Statement classification by leading keyword
//!
//! Only code spans are inspected: a `DELETE` inside a string literal, quoted
//! identifier, comment or dollar-quoted body never affects the result.

use crate::scanner::scan;
use crate::sql_parser::{CodeToken, Statement, TokenKind, code_tokens};
use crate::types::OperationKind;

/// Words that may sit between `CREATE` and the object keyword
const CREATE_MODIFIERS: &[&str] = &[
    "OR",
    "REPLACE",
    "TEMP",
    "TEMPORARY",
    "UNLOGGED",
    "GLOBAL",
    "LOCAL",
    "UNIQUE",
    "MATERIALIZED",
];

/// Classify one split statement
///
/// # Examples
/// ```
/// # use nl2sql_safety::classifier::classify;
/// # use nl2sql_safety::sql_parser::split_sql_statements;
/// # use nl2sql_safety::types::OperationKind;
/// let stmts = split_sql_statements("-- report\nSELECT 'x; DELETE FROM t'");
/// assert_eq!(classify(&stmts[0]), OperationKind::Select);
/// ```
pub fn classify(statement: &Statement<'_>) -> OperationKind {
    classify_tokens(&statement.tokens())
}

/// Classify raw text as a single statement
pub fn classify_sql(sql: &str) -> OperationKind {
    let spans = scan(sql);
    classify_tokens(&code_tokens(sql, &spans))
}

pub(crate) fn classify_tokens(tokens: &[CodeToken<'_>]) -> OperationKind {
    let mut rest = tokens.iter().skip_while(|t| t.kind == TokenKind::OpenParen);
    match rest.next() {
        Some(first) if first.kind == TokenKind::Word => keyword_kind(first, rest),
        _ => OperationKind::Unknown,
    }
}

fn keyword_kind<'t, 'a: 't>(
    word: &CodeToken<'a>,
    rest: impl Iterator<Item = &'t CodeToken<'a>>,
) -> OperationKind {
    match word.text.to_ascii_uppercase().as_str() {
        "SELECT" => OperationKind::Select,
        "WITH" => OperationKind::With,
        "INSERT" => OperationKind::Insert,
        "UPDATE" => OperationKind::Update,
        "DELETE" => OperationKind::Delete,
        "CREATE" => create_kind(rest),
        "DROP" => OperationKind::Drop,
        "ALTER" => OperationKind::Alter,
        "TRUNCATE" => OperationKind::Truncate,
        "GRANT" | "REVOKE" => OperationKind::GrantRevoke,
        "COPY" => OperationKind::Copy,
        "VACUUM" | "ANALYZE" => OperationKind::VacuumAnalyze,
        "CALL" | "DO" => OperationKind::FunctionOrProcedure,
        _ => OperationKind::Unknown,
    }
}

fn create_kind<'t, 'a: 't>(rest: impl Iterator<Item = &'t CodeToken<'a>>) -> OperationKind {
    for token in rest {
        if token.kind != TokenKind::Word {
            break;
        }
        let upper = token.text.to_ascii_uppercase();
        match upper.as_str() {
            "TABLE" => return OperationKind::CreateTable,
            "VIEW" => return OperationKind::CreateView,
            "INDEX" => return OperationKind::CreateIndex,
            "FUNCTION" | "PROCEDURE" => return OperationKind::FunctionOrProcedure,
            modifier if CREATE_MODIFIERS.contains(&modifier) => continue,
            _ => break,
        }
    }
    OperationKind::Unknown
}

/// Sub-statement found inside a `WITH` statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NestedOperation {
    pub kind: OperationKind,
    /// The statement following the CTE list, as opposed to a CTE body
    pub top_level: bool,
}

/// Sub-statements of a `WITH` statement
///
/// Reports the leading keyword of every parenthesised body (`AS (DELETE ...`)
/// and the first statement keyword at depth zero once a CTE body has closed
/// (`WITH x AS (...) UPDATE ...`, also behind `SEARCH` or `CYCLE` clauses).
/// Later depth-zero keywords such as `FOR UPDATE` or `DO UPDATE` belong to
/// that statement and are not reported. `MERGE` shows up as `Unknown`.
///
/// # Examples
/// ```
/// # use nl2sql_safety::classifier::nested_operations;
/// # use nl2sql_safety::sql_parser::split_sql_statements;
/// # use nl2sql_safety::types::OperationKind;
/// let stmts = split_sql_statements("WITH d AS (DELETE FROM t RETURNING *) SELECT * FROM d");
/// let kinds: Vec<_> = nested_operations(&stmts[0]).iter().map(|n| n.kind).collect();
/// assert_eq!(kinds, vec![OperationKind::Delete, OperationKind::Select]);
/// ```
pub fn nested_operations(statement: &Statement<'_>) -> Vec<NestedOperation> {
    nested_operations_in(&statement.tokens())
}

pub(crate) fn nested_operations_in(tokens: &[CodeToken<'_>]) -> Vec<NestedOperation> {
    let mut nested = Vec::new();
    let mut depth = 0usize;
    let mut prev: Option<TokenKind> = None;
    let mut body_closed = false;
    let mut found_top_level = false;

    for token in tokens {
        match token.kind {
            TokenKind::OpenParen => depth += 1,
            TokenKind::CloseParen => {
                depth = depth.saturating_sub(1);
                body_closed |= depth == 0;
            }
            TokenKind::Word => {
                let opens_body = prev == Some(TokenKind::OpenParen);
                let top_level = depth == 0 && body_closed && !found_top_level;
                if opens_body || top_level {
                    if let Some(kind) = sub_statement_kind(token.text) {
                        nested.push(NestedOperation { kind, top_level });
                        found_top_level |= top_level;
                    }
                }
            }
            _ => {}
        }
        prev = Some(token.kind);
    }

    nested
}

fn sub_statement_kind(word: &str) -> Option<OperationKind> {
    match word.to_ascii_uppercase().as_str() {
        "SELECT" => Some(OperationKind::Select),
        "WITH" => Some(OperationKind::With),
        "INSERT" => Some(OperationKind::Insert),
        "UPDATE" => Some(OperationKind::Update),
        "DELETE" => Some(OperationKind::Delete),
        "MERGE" => Some(OperationKind::Unknown),
        _ => None,
    }
}

/// Operation that decides what a statement returns
///
/// Same as [`classify`] except for `WITH`, which resolves to the statement
/// following its CTE list when one is found, and for `SELECT ... INTO`,
/// which resolves to `CreateTable`.
pub fn primary_operation(statement: &Statement<'_>) -> OperationKind {
    primary_operation_in(&statement.tokens())
}

pub(crate) fn primary_operation_in(tokens: &[CodeToken<'_>]) -> OperationKind {
    let kind = match classify_tokens(tokens) {
        OperationKind::With => nested_operations_in(tokens)
            .into_iter()
            .find(|n| n.top_level)
            .map_or(OperationKind::With, |n| n.kind),
        kind => kind,
    };
    if kind == OperationKind::Select && selects_into(tokens) {
        return OperationKind::CreateTable;
    }
    kind
}

/// `SELECT ... INTO new_table` creates the table it names
fn selects_into(tokens: &[CodeToken<'_>]) -> bool {
    let mut depth = 0usize;
    tokens.iter().any(|token| match token.kind {
        TokenKind::OpenParen => {
            depth += 1;
            false
        }
        TokenKind::CloseParen => {
            depth = depth.saturating_sub(1);
            false
        }
        TokenKind::Word => depth == 0 && token.is_keyword("INTO"),
        _ => false,
    })
}
