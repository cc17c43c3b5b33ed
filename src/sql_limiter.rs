//! Row capping for read statements to prevent excessive data transfer

use crate::classifier::primary_operation_in;
use crate::scanner::scan;
use crate::sql_parser::{CodeToken, Segment, TokenKind, code_tokens, split_segments};

/// Append `LIMIT {max_rows}` to read statements that have no top-level cap
///
/// # Behavior
/// - Only SELECT and WITH statements whose primary statement is a read are touched
/// - An existing top-level `LIMIT` or `FETCH` is never overridden, so applying
///   the cap twice gives the same text as applying it once. Whatever argument
///   it carries counts: `LIMIT ALL` and `LIMIT NULL` leave the statement uncapped
/// - `SELECT ... INTO` creates a table and is not capped
/// - The clause goes right after the last piece of code, ahead of any trailing
///   comment or semicolon
/// - INSERT/UPDATE/DELETE with `RETURNING` are left alone
/// - Text holding several statements gets each read capped on its own; the
///   separators are kept as they are
///
/// # Examples
/// ```
/// # use nl2sql_safety::sql_limiter::apply_limit;
/// assert_eq!(apply_limit("SELECT * FROM orders", 50), "SELECT * FROM orders LIMIT 50");
/// assert_eq!(apply_limit("SELECT * FROM orders;", 50), "SELECT * FROM orders LIMIT 50;");
/// assert_eq!(
///     apply_limit("SELECT * FROM orders LIMIT 10;", 50),
///     "SELECT * FROM orders LIMIT 10;"
/// );
/// ```
pub fn apply_limit(sql: &str, max_rows: usize) -> String {
    let spans = scan(sql);
    let insertions: Vec<usize> = split_segments(sql, &spans)
        .iter()
        .filter_map(limit_insertion_point)
        .collect();

    if insertions.is_empty() {
        return sql.to_string();
    }

    let clause = format!(" LIMIT {}", max_rows);
    let mut limited = String::with_capacity(sql.len() + insertions.len() * clause.len());
    let mut copied = 0;
    for at in insertions {
        limited.push_str(&sql[copied..at]);
        limited.push_str(&clause);
        copied = at;
    }
    limited.push_str(&sql[copied..]);

    log::debug!("Applied row cap of {} to SQL", max_rows);
    limited
}

/// Whether the text already carries a top-level row cap
///
/// # Examples
/// ```
/// # use nl2sql_safety::sql_limiter::has_row_limit;
/// assert!(has_row_limit("SELECT * FROM t LIMIT 5"));
/// assert!(has_row_limit("SELECT * FROM t FETCH FIRST 5 ROWS ONLY"));
/// assert!(!has_row_limit("SELECT * FROM (SELECT * FROM t LIMIT 5) s"));
/// assert!(!has_row_limit("SELECT 'LIMIT 5' FROM t"));
/// ```
pub fn has_row_limit(sql: &str) -> bool {
    let spans = scan(sql);
    has_top_level_limit(&code_tokens(sql, &spans))
}

/// Absolute offset where the cap goes, or None when the segment is left alone
fn limit_insertion_point(segment: &Segment<'_>) -> Option<usize> {
    if segment.is_blank() {
        return None;
    }

    let tokens = code_tokens(segment.text(), segment.spans());
    if !primary_operation_in(&tokens).is_read() || has_top_level_limit(&tokens) {
        return None;
    }

    let text = segment.text();
    let last = segment
        .spans()
        .iter()
        .rev()
        .find(|s| s.is_significant(text))?;
    let end = if last.is_code() {
        last.start + last.text(text).trim_end().len()
    } else {
        last.end
    };

    Some(segment.range.start + end)
}

/// Walk backward for `LIMIT`/`FETCH` outside any parentheses
fn has_top_level_limit(tokens: &[CodeToken<'_>]) -> bool {
    let mut depth = 0usize;
    for token in tokens.iter().rev() {
        match token.kind {
            TokenKind::CloseParen => depth += 1,
            TokenKind::OpenParen => depth = depth.saturating_sub(1),
            TokenKind::Word if depth == 0 => {
                if token.is_keyword("LIMIT") || token.is_keyword("FETCH") {
                    return true;
                }
            }
            _ => {}
        }
    }
    false
}
