//! SQL statement splitting, comment stripping, and keyword extraction
//!
//! Everything here works on the scanner's span model, so separators and
//! keywords are only ever recognized inside plain code.

use crate::scanner::{Span, SpanKind, scan};
use lazy_regex::{Lazy, Regex, lazy_regex};
use std::ops::Range;

// Identifiers, numeric literals, and the punctuation that matters for structure
static CODE_TOKEN: Lazy<Regex> =
    lazy_regex!(r"[A-Za-z_][A-Za-z0-9_$]*|[0-9][A-Za-z0-9_$.]*|[();.]");

/// Structural token kinds found in code spans
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Bare word that may be a keyword
    Word,
    /// Qualified name part (`t.limit`) or identifier tail that can never be a keyword
    Name,
    Number,
    OpenParen,
    CloseParen,
    Dot,
    Semicolon,
}

/// A token from a code span
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeToken<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub start: usize,
}

impl CodeToken<'_> {
    /// Case-insensitive keyword match on bare words only
    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.kind == TokenKind::Word && self.text.eq_ignore_ascii_case(keyword)
    }
}

/// Tokenize the code spans of `sql`, skipping strings, identifiers and comments
pub fn code_tokens<'a>(sql: &'a str, spans: &[Span]) -> Vec<CodeToken<'a>> {
    let bytes = sql.as_bytes();
    let mut tokens: Vec<CodeToken<'a>> = Vec::new();

    for span in spans.iter().filter(|s| s.is_code()) {
        for m in CODE_TOKEN.find_iter(span.text(sql)) {
            let start = span.start + m.start();
            let text = m.as_str();
            let kind = match text.as_bytes()[0] {
                b'(' => TokenKind::OpenParen,
                b')' => TokenKind::CloseParen,
                b'.' => TokenKind::Dot,
                b';' => TokenKind::Semicolon,
                b'0'..=b'9' => TokenKind::Number,
                _ => {
                    let after_dot = tokens.last().is_some_and(|t| t.kind == TokenKind::Dot);
                    let glued = start > 0 && bytes[start - 1] >= 0x80;
                    if after_dot || glued {
                        TokenKind::Name
                    } else {
                        TokenKind::Word
                    }
                }
            };
            tokens.push(CodeToken { kind, text, start });
        }
    }

    tokens
}

/// Text between two separators, possibly blank
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment<'a> {
    /// Byte range in the original input
    pub range: Range<usize>,
    text: &'a str,
    spans: Vec<Span>,
}

impl<'a> Segment<'a> {
    /// Raw text, including surrounding whitespace and comments
    pub fn text(&self) -> &'a str {
        self.text
    }

    /// Spans of this segment, offsets relative to [`Segment::text`]
    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    /// Whitespace and comments only
    pub fn is_blank(&self) -> bool {
        !self.spans.iter().any(|s| s.is_significant(self.text))
    }
}

/// One non-blank statement of a split input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement<'a> {
    /// 1-based position among the statements of the input
    pub index: usize,
    segment: Segment<'a>,
}

impl<'a> Statement<'a> {
    /// Byte range in the original input
    pub fn range(&self) -> Range<usize> {
        self.segment.range.clone()
    }

    /// Raw text between separators, so `input[range] == text`
    pub fn text(&self) -> &'a str {
        self.segment.text
    }

    /// Text with surrounding whitespace removed
    pub fn sql(&self) -> &'a str {
        self.segment.text.trim()
    }

    /// Spans of this statement, offsets relative to [`Statement::text`]
    pub fn spans(&self) -> &[Span] {
        &self.segment.spans
    }

    /// First construct left open at end of input, if any
    pub fn unterminated(&self) -> Option<&Span> {
        self.segment.spans.iter().find(|s| !s.terminated)
    }

    pub fn tokens(&self) -> Vec<CodeToken<'a>> {
        code_tokens(self.segment.text, &self.segment.spans)
    }
}

/// Cut `sql` at every semicolon that sits in a code span
///
/// Joining the segment texts with `;` reproduces `sql` exactly. Blank
/// segments are kept; see [`split_statements`] for the filtered view.
pub fn split_segments<'a>(sql: &'a str, spans: &[Span]) -> Vec<Segment<'a>> {
    let separators = spans.iter().filter(|s| s.is_code()).flat_map(|span| {
        span.text(sql)
            .bytes()
            .enumerate()
            .filter(|&(_, b)| b == b';')
            .map(move |(offset, _)| span.start + offset)
    });

    let mut segments = Vec::new();
    let mut cursor = 0;
    let mut start = 0;

    for end in separators.chain(std::iter::once(sql.len())) {
        let range = start..end;
        let spans = clip_spans(spans, &mut cursor, &range);
        segments.push(Segment {
            text: &sql[range.clone()],
            range,
            spans,
        });
        start = end + 1;
    }

    segments
}

/// Spans overlapping `range`, rebased to it; `cursor` keeps the walk linear
fn clip_spans(spans: &[Span], cursor: &mut usize, range: &Range<usize>) -> Vec<Span> {
    let mut clipped = Vec::new();
    while let Some(span) = spans.get(*cursor) {
        if span.start >= range.end {
            break;
        }
        if let Some(piece) = span.clip(range) {
            clipped.push(piece);
        }
        if span.end > range.end {
            break;
        }
        *cursor += 1;
    }
    clipped
}

/// Non-blank statements of a scanned input, in order
pub fn split_statements<'a>(sql: &'a str, spans: &[Span]) -> Vec<Statement<'a>> {
    split_segments(sql, spans)
        .into_iter()
        .filter(|segment| !segment.is_blank())
        .enumerate()
        .map(|(i, segment)| Statement {
            index: i + 1,
            segment,
        })
        .collect()
}

/// Split multi-statement SQL by semicolons, respecting quotes, comments and dollar blocks
///
/// # Examples
/// ```
/// # use nl2sql_safety::sql_parser::split_sql_statements;
/// let sql = "SELECT 1; INSERT INTO t VALUES ('a;b'); SELECT 2;";
/// let stmts = split_sql_statements(sql);
/// assert_eq!(stmts.len(), 3);
/// assert_eq!(stmts[1].sql(), "INSERT INTO t VALUES ('a;b')");
/// ```
pub fn split_sql_statements(sql: &str) -> Vec<Statement<'_>> {
    let spans = scan(sql);
    split_statements(sql, &spans)
}

/// Remove SQL comments, keeping string literals and quoted blocks intact
///
/// Block comments become a single space so the tokens around them stay apart.
///
/// # Examples
/// ```
/// # use nl2sql_safety::sql_parser::strip_comments;
/// let sql = "SELECT * FROM users -- get all\n/* WHERE active */";
/// assert_eq!(strip_comments(sql).trim(), "SELECT * FROM users");
///
/// let sql = "SELECT $$ -- not a comment $$ FROM t";
/// assert!(strip_comments(sql).contains("-- not a comment"));
/// ```
pub fn strip_comments(sql: &str) -> String {
    let mut cleaned = String::with_capacity(sql.len());
    for span in scan(sql) {
        match span.kind {
            SpanKind::LineComment => {}
            SpanKind::BlockComment => cleaned.push(' '),
            _ => cleaned.push_str(span.text(sql)),
        }
    }
    cleaned
}

/// Extract the first SQL keyword from a statement, lowercased
///
/// Leading comments, whitespace and opening parentheses are skipped.
///
/// # Examples
/// ```
/// # use nl2sql_safety::sql_parser::extract_first_keyword;
/// assert_eq!(extract_first_keyword("  SELECT * FROM users").as_deref(), Some("select"));
/// assert_eq!(extract_first_keyword("-- comment\nINSERT INTO logs").as_deref(), Some("insert"));
/// assert_eq!(extract_first_keyword("/* only a comment */"), None);
/// ```
pub fn extract_first_keyword(sql: &str) -> Option<String> {
    let spans = scan(sql);
    code_tokens(sql, &spans)
        .into_iter()
        .find(|t| t.kind != TokenKind::OpenParen)
        .filter(|t| t.kind == TokenKind::Word)
        .map(|t| t.text.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sqls(sql: &str) -> Vec<&str> {
        split_sql_statements(sql).iter().map(|s| s.sql()).collect()
    }

    #[test]
    fn test_split_respects_string_literals() {
        let stmts = sqls("SELECT 1; INSERT INTO t VALUES ('a;b;c'); SELECT 2;");
        assert_eq!(stmts.len(), 3);
        assert!(stmts[1].contains("'a;b;c'"));
    }

    #[test]
    fn test_split_respects_identifiers_and_comments() {
        let stmts = sqls("SELECT \"a;b\" FROM t -- x;y\n; /* ; */ SELECT 2");
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[0], "SELECT \"a;b\" FROM t -- x;y");
        assert_eq!(stmts[1], "/* ; */ SELECT 2");
    }

    #[test]
    fn test_split_respects_dollar_quotes() {
        let sql = "CREATE FUNCTION f() RETURNS void AS $$ DELETE FROM t; $$ LANGUAGE sql; SELECT 1";
        let stmts = sqls(sql);
        assert_eq!(stmts.len(), 2);
        assert!(stmts[0].ends_with("LANGUAGE sql"));
    }

    #[test]
    fn test_blank_statements_dropped() {
        assert!(sqls("").is_empty());
        assert!(sqls("   \n\t").is_empty());
        assert!(sqls(";;; -- nothing\n; /* here */").is_empty());
        assert_eq!(sqls(";; SELECT 1 ;;"), vec!["SELECT 1"]);
    }

    #[test]
    fn test_statement_indices_skip_blanks() {
        let stmts = split_sql_statements("; SELECT 1;; SELECT 2");
        let indices: Vec<usize> = stmts.iter().map(|s| s.index).collect();
        assert_eq!(indices, vec![1, 2]);
    }

    #[test]
    fn test_segments_are_lossless() {
        for sql in [
            "SELECT 1; SELECT 2;",
            ";;",
            "SELECT 'a;b' ; -- c;\n DELETE FROM t",
            "SELECT $x$;$x$; SELECT \"q;\"",
            "SELECT 'unterminated; DROP TABLE t",
            "",
        ] {
            let spans = scan(sql);
            let segments = split_segments(sql, &spans);
            let joined = segments
                .iter()
                .map(|s| s.text())
                .collect::<Vec<_>>()
                .join(";");
            assert_eq!(joined, sql);
            for segment in &segments {
                assert_eq!(&sql[segment.range.clone()], segment.text());
            }
        }
    }

    #[test]
    fn test_statement_spans_are_relative() {
        let stmts = split_sql_statements("SELECT 1; SELECT 'x'");
        assert_eq!(stmts.len(), 2);
        let second = &stmts[1];
        assert_eq!(second.text(), " SELECT 'x'");
        let quoted = second.spans().iter().find(|s| s.kind == SpanKind::SingleQuoted);
        assert!(quoted.is_some());
        if let Some(quoted) = quoted {
            assert_eq!(quoted.text(second.text()), "'x'");
        }
    }

    #[test]
    fn test_unterminated_quote_swallows_rest() {
        let stmts = split_sql_statements("SELECT 'oops; DELETE FROM users;");
        assert_eq!(stmts.len(), 1);
        assert!(stmts[0].unterminated().is_some());
    }

    #[test]
    fn test_code_tokens_skip_non_code() {
        let sql = "SELECT 'delete' AS \"drop\", t.limit FROM t -- truncate";
        let spans = scan(sql);
        let words: Vec<&str> = code_tokens(sql, &spans)
            .into_iter()
            .filter(|t| t.kind == TokenKind::Word)
            .map(|t| t.text)
            .collect();
        assert_eq!(words, vec!["SELECT", "AS", "t", "FROM", "t"]);
    }

    #[test]
    fn test_code_tokens_numbers_are_not_words() {
        let sql = "SELECT 1e10, 123abc";
        let spans = scan(sql);
        let tokens = code_tokens(sql, &spans);
        assert_eq!(tokens.iter().filter(|t| t.kind == TokenKind::Number).count(), 2);
        assert!(tokens.iter().all(|t| !t.is_keyword("abc")));
    }

    #[test]
    fn test_strip_preserves_strings() {
        let cleaned = strip_comments("SELECT '-- not a comment' FROM t");
        assert!(cleaned.contains("-- not a comment"));
    }

    #[test]
    fn test_strip_keeps_tokens_apart() {
        assert_eq!(strip_comments("SELECT/*x*/1"), "SELECT 1");
    }

    #[test]
    fn test_unicode_in_comments_and_strings() {
        let cleaned = strip_comments("-- コメント\nSELECT '日本語' FROM t /* 注释 */");
        assert!(!cleaned.contains("コメント"));
        assert!(!cleaned.contains("注释"));
        assert!(cleaned.contains("日本語"));
    }

    #[test]
    fn test_first_keyword_skips_parens() {
        assert_eq!(
            extract_first_keyword("((SELECT 1)) UNION (SELECT 2)").as_deref(),
            Some("select")
        );
        assert_eq!(extract_first_keyword("'just a string'"), None);
        assert_eq!(extract_first_keyword(""), None);
    }
}
