//! Lexical scanning of raw SQL text into tagged spans
//!
//! The scanner never fails: every byte of the input is covered by exactly one
//! span, and constructs left open at end of input become a trailing span of
//! their kind with `terminated == false`.

use std::ops::Range;

/// Kind of a scanned span
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SpanKind {
    /// Plain SQL code, the only place keywords and separators are recognized
    Code,
    /// `'...'` string literal (also `E'...'` escape strings)
    SingleQuoted,
    /// `"..."` quoted identifier
    DoubleQuoted,
    /// `$tag$ ... $tag$` block, keyed by the tag text (empty for `$$`)
    DollarQuoted(String),
    /// `-- ...` up to the next `\n` or `\r`
    LineComment,
    /// `/* ... */`, not nested
    BlockComment,
}

impl SpanKind {
    /// Human-readable construct name, used in warnings
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::SingleQuoted => "string literal",
            Self::DoubleQuoted => "quoted identifier",
            Self::DollarQuoted(_) => "dollar-quoted block",
            Self::LineComment => "line comment",
            Self::BlockComment => "block comment",
        }
    }
}

/// A contiguous run of source text tagged with its lexical kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub kind: SpanKind,
    pub start: usize,
    pub end: usize,
    /// False when the construct ran into end of input before closing
    pub terminated: bool,
}

impl Span {
    fn new(kind: SpanKind, start: usize, end: usize, terminated: bool) -> Self {
        Self {
            kind,
            start,
            end,
            terminated,
        }
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Source text covered by this span
    pub fn text<'a>(&self, sql: &'a str) -> &'a str {
        &sql[self.start..self.end]
    }

    pub fn is_code(&self) -> bool {
        self.kind == SpanKind::Code
    }

    pub fn is_comment(&self) -> bool {
        matches!(self.kind, SpanKind::LineComment | SpanKind::BlockComment)
    }

    /// Whether the span carries statement content (anything but whitespace or comments)
    pub fn is_significant(&self, sql: &str) -> bool {
        match self.kind {
            SpanKind::Code => !self.text(sql).trim().is_empty(),
            SpanKind::LineComment | SpanKind::BlockComment => false,
            _ => true,
        }
    }

    /// Copy of this span clipped to `range` and rebased so `range.start` becomes 0
    pub(crate) fn clip(&self, range: &Range<usize>) -> Option<Span> {
        let start = self.start.max(range.start);
        let end = self.end.min(range.end);
        if start >= end {
            return None;
        }
        Some(Span::new(
            self.kind.clone(),
            start - range.start,
            end - range.start,
            self.terminated,
        ))
    }
}

/// Scan SQL text into spans
///
/// # Examples
/// ```
/// # use nl2sql_safety::scanner::{scan, SpanKind};
/// let sql = "SELECT 'a;b' -- note\nFROM t";
/// let spans = scan(sql);
/// assert_eq!(spans[0].kind, SpanKind::Code);
/// assert_eq!(spans[1].kind, SpanKind::SingleQuoted);
/// assert_eq!(spans[1].text(sql), "'a;b'");
/// assert_eq!(spans[3].kind, SpanKind::LineComment);
/// ```
pub fn scan(sql: &str) -> Vec<Span> {
    let bytes = sql.as_bytes();
    let mut spans = Vec::new();
    let mut code_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        let opened = match bytes[i] {
            b'\'' => Some(scan_single_quoted(bytes, i)),
            b'"' => Some(scan_quoted(bytes, i, b'"', SpanKind::DoubleQuoted)),
            b'-' if bytes.get(i + 1) == Some(&b'-') => Some(scan_line_comment(bytes, i)),
            b'/' if bytes.get(i + 1) == Some(&b'*') => Some(scan_block_comment(sql, i)),
            b'$' => dollar_tag(sql, i).map(|tag| scan_dollar_quoted(sql, i, tag)),
            _ => None,
        };

        match opened {
            Some(span) => {
                if code_start < i {
                    spans.push(Span::new(SpanKind::Code, code_start, i, true));
                }
                i = span.end;
                code_start = i;
                spans.push(span);
            }
            None => i += 1,
        }
    }

    if code_start < bytes.len() {
        spans.push(Span::new(SpanKind::Code, code_start, bytes.len(), true));
    }

    spans
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b >= 0x80
}

/// `'...'`, switching to backslash escapes for an `E'...'` prefix
fn scan_single_quoted(bytes: &[u8], start: usize) -> Span {
    let escape_string = start > 0
        && matches!(bytes[start - 1], b'e' | b'E')
        && (start < 2 || !is_ident_byte(bytes[start - 2]));

    if !escape_string {
        return scan_quoted(bytes, start, b'\'', SpanKind::SingleQuoted);
    }

    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\'' if bytes.get(i + 1) == Some(&b'\'') => i += 2,
            b'\'' => return Span::new(SpanKind::SingleQuoted, start, i + 1, true),
            _ => i += 1,
        }
    }
    Span::new(SpanKind::SingleQuoted, start, bytes.len(), false)
}

/// Quoted run closed by an undoubled `quote`
fn scan_quoted(bytes: &[u8], start: usize, quote: u8, kind: SpanKind) -> Span {
    let mut i = start + 1;
    while i < bytes.len() {
        if bytes[i] == quote {
            if bytes.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return Span::new(kind, start, i + 1, true);
        }
        i += 1;
    }
    Span::new(kind, start, bytes.len(), false)
}

/// `--` comment up to, not including, the first `\n` or `\r`
fn scan_line_comment(bytes: &[u8], start: usize) -> Span {
    let end = bytes[start..]
        .iter()
        .position(|&b| b == b'\n' || b == b'\r')
        .map_or(bytes.len(), |offset| start + offset);
    Span::new(SpanKind::LineComment, start, end, true)
}

fn scan_block_comment(sql: &str, start: usize) -> Span {
    match sql[start + 2..].find("*/") {
        Some(offset) => Span::new(SpanKind::BlockComment, start, start + 2 + offset + 2, true),
        None => Span::new(SpanKind::BlockComment, start, sql.len(), false),
    }
}

/// Tag of a `$tag$` opener at `start`, if one begins there
///
/// `$1` style parameters and `$` inside identifiers (`foo$bar`) are not openers.
fn dollar_tag(sql: &str, start: usize) -> Option<&str> {
    let bytes = sql.as_bytes();
    if start > 0 && is_ident_byte(bytes[start - 1]) {
        return None;
    }

    let mut i = start + 1;
    while i < bytes.len() {
        let b = bytes[i];
        if b == b'$' {
            return Some(&sql[start + 1..i]);
        }
        let valid = if i == start + 1 {
            b.is_ascii_alphabetic() || b == b'_' || b >= 0x80
        } else {
            b.is_ascii_alphanumeric() || b == b'_' || b >= 0x80
        };
        if !valid {
            return None;
        }
        i += 1;
    }
    None
}

fn scan_dollar_quoted(sql: &str, start: usize, tag: &str) -> Span {
    let delimiter = format!("${}$", tag);
    let body_start = start + delimiter.len();
    let kind = SpanKind::DollarQuoted(tag.to_string());

    match sql[body_start..].find(&delimiter) {
        Some(offset) => Span::new(kind, start, body_start + offset + delimiter.len(), true),
        None => Span::new(kind, start, sql.len(), false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(sql: &str) -> Vec<SpanKind> {
        scan(sql).into_iter().map(|s| s.kind).collect()
    }

    fn assert_covers(sql: &str) {
        let spans = scan(sql);
        let mut pos = 0;
        for span in &spans {
            assert_eq!(span.start, pos, "gap or overlap in spans for {:?}", sql);
            assert!(span.end > span.start);
            pos = span.end;
        }
        assert_eq!(pos, sql.len());
    }

    #[test]
    fn test_plain_code_is_single_span() {
        let spans = scan("SELECT * FROM users");
        assert_eq!(spans.len(), 1);
        assert!(spans[0].is_code());
    }

    #[test]
    fn test_empty_input_has_no_spans() {
        assert!(scan("").is_empty());
    }

    #[test]
    fn test_doubled_quote_does_not_terminate() {
        let sql = "SELECT 'can''t; stop' FROM t";
        let spans = scan(sql);
        assert_eq!(spans[1].kind, SpanKind::SingleQuoted);
        assert_eq!(spans[1].text(sql), "'can''t; stop'");
        assert!(spans[1].terminated);
    }

    #[test]
    fn test_double_quoted_identifier() {
        let sql = "SELECT \"weird\"\"col;\" FROM t";
        let spans = scan(sql);
        assert_eq!(spans[1].kind, SpanKind::DoubleQuoted);
        assert_eq!(spans[1].text(sql), "\"weird\"\"col;\"");
    }

    #[test]
    fn test_comments() {
        assert_eq!(
            kinds("-- a\nSELECT /* b */ 1"),
            vec![
                SpanKind::LineComment,
                SpanKind::Code,
                SpanKind::BlockComment,
                SpanKind::Code,
            ]
        );
    }

    #[test]
    fn test_block_comments_do_not_nest() {
        let sql = "/* outer /* inner */ SELECT 1 */";
        let spans = scan(sql);
        assert_eq!(spans[0].text(sql), "/* outer /* inner */");
        assert_eq!(spans[1].kind, SpanKind::Code);
    }

    #[test]
    fn test_dollar_quoted_tags() {
        let sql = "SELECT $fn$ a $$ b; $fn$, $$x$$";
        let spans = scan(sql);
        assert_eq!(spans[1].kind, SpanKind::DollarQuoted("fn".to_string()));
        assert_eq!(spans[1].text(sql), "$fn$ a $$ b; $fn$");
        assert_eq!(spans[3].kind, SpanKind::DollarQuoted(String::new()));
        assert_eq!(spans[3].text(sql), "$$x$$");
    }

    #[test]
    fn test_positional_parameters_are_code() {
        let sql = "SELECT * FROM t WHERE a = $1 AND b = $2";
        assert_eq!(kinds(sql), vec![SpanKind::Code]);
    }

    #[test]
    fn test_dollar_inside_identifier_is_code() {
        assert_eq!(kinds("SELECT foo$bar$ FROM t"), vec![SpanKind::Code]);
    }

    #[test]
    fn test_escape_string_backslash() {
        let sql = "SELECT E'it\\'s; fine' FROM t";
        let spans = scan(sql);
        assert_eq!(spans[1].kind, SpanKind::SingleQuoted);
        assert_eq!(spans[1].text(sql), "'it\\'s; fine'");
        assert!(spans[1].terminated);
    }

    #[test]
    fn test_backslash_is_literal_in_standard_string() {
        let sql = "SELECT 'C:\\' FROM t";
        let spans = scan(sql);
        assert_eq!(spans[1].text(sql), "'C:\\'");
        assert_eq!(spans[2].text(sql), " FROM t");
    }

    #[test]
    fn test_unterminated_constructs_fold_into_trailing_span() {
        for (sql, kind) in [
            ("SELECT 'open", SpanKind::SingleQuoted),
            ("SELECT \"open", SpanKind::DoubleQuoted),
            ("SELECT 1 /* open", SpanKind::BlockComment),
            ("SELECT $q$ open", SpanKind::DollarQuoted("q".to_string())),
        ] {
            let spans = scan(sql);
            let last = spans.last();
            assert!(last.is_some(), "no spans for {:?}", sql);
            if let Some(last) = last {
                assert_eq!(last.kind, kind);
                assert!(!last.terminated);
                assert_eq!(last.end, sql.len());
            }
        }
    }

    #[test]
    fn test_line_comment_at_end_is_terminated() {
        let spans = scan("SELECT 1 -- trailing");
        assert!(spans.iter().all(|s| s.terminated));
    }

    #[test]
    fn test_carriage_return_ends_line_comment() {
        let sql = "SELECT 1 -- note\r; DELETE FROM users";
        let spans = scan(sql);
        assert_eq!(spans[1].kind, SpanKind::LineComment);
        assert_eq!(spans[1].text(sql), "-- note");
        assert_eq!(spans[2].kind, SpanKind::Code);
        assert_eq!(spans[2].text(sql), "\r; DELETE FROM users");

        let sql = "SELECT 1 -- note\r\nFROM t";
        let spans = scan(sql);
        assert_eq!(spans[1].text(sql), "-- note");
        assert_eq!(spans[2].text(sql), "\r\nFROM t");
    }

    #[test]
    fn test_spans_cover_input() {
        for sql in [
            "SELECT 1",
            "SELECT 'a''b' \"c\" -- d\n/* e */ $$f$$ $t$g$t$;",
            "'unterminated",
            "SELECT '日本語' -- コメント\nFROM t",
            "$$",
            "--",
            "/*/",
            "-- a\rSELECT 1;\r\n-- b\r\nSELECT 2",
        ] {
            assert_covers(sql);
        }
    }
}
