//! Source-location types and the error taxonomy shared by every stage of
//! table construction and interpretation.

use smartstring::alias::String;
use thiserror::Error;

/// A position in source text: 1-based line, 0-based column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Position {
    /// 1-based line number.
    pub line: usize,
    /// 0-based column number (byte position within the line).
    pub column: usize,
}

impl Position {
    #[inline]
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// A half-open source range: `[start, end)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    #[inline]
    pub const fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Merge with another span by covering both.
    pub fn merge(&self, other: &Span) -> Span {
        let start = if self.start <= other.start {
            self.start
        } else {
            other.start
        };
        let end = if self.end >= other.end {
            self.end
        } else {
            other.end
        };
        Span { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Pretty-print for diagnostics.
    pub fn display(&self) -> std::string::String {
        format!(
            "span {}:{} to {}:{}",
            self.start.line, self.start.column, self.end.line, self.end.column
        )
    }
}

/// Build a `Span` inline from line/column coordinates.
#[macro_export]
macro_rules! span {
    ($line_start:expr, $col_start:expr, $line_end:expr, $col_end:expr) => {
        $crate::Span {
            start: $crate::Position {
                line: $line_start,
                column: $col_start,
            },
            end: $crate::Position {
                line: $line_end,
                column: $col_end,
            },
        }
    };
}

/// Errors raised by grammar construction, table building, tokenizing, and
/// the table-driven interpreters.
///
/// Constructors fail fast with the variant naming the offending symbol,
/// production, or state; the interpreters attach source locations.
#[derive(Debug, Clone, Error)]
pub enum PartabError {
    /// Malformed grammar structure, undefined symbol, duplicate operator.
    #[error("invalid grammar: {0}")]
    InvalidGrammar(String),

    /// LL(1) collision, or an LR conflict left standing when a conflict-free
    /// table was demanded.
    #[error("unresolvable conflict: {0}")]
    Unresolvable(String),

    /// The tokenizer could not match input at the cursor.
    #[error("unexpected token {lexeme:?} at {}:{}", span.start.line, span.start.column)]
    UnexpectedToken { lexeme: String, span: Span },

    /// The interpreter hit an error cell or an unexpected token.
    #[error("parse error: {message} on {lexeme:?} at {}:{}", span.start.line, span.start.column)]
    ParseError {
        message: String,
        lexeme: String,
        span: Span,
    },
}

impl PartabError {
    pub fn invalid_grammar(msg: impl AsRef<str>) -> Self {
        Self::InvalidGrammar(String::from(msg.as_ref()))
    }

    pub fn unresolvable(msg: impl AsRef<str>) -> Self {
        Self::Unresolvable(String::from(msg.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_merge_covers_both() {
        let a = span!(1, 5, 1, 10);
        let b = span!(1, 2, 2, 0);
        let m = a.merge(&b);
        assert_eq!(m.start, Position::new(1, 2));
        assert_eq!(m.end, Position::new(2, 0));
    }

    #[test]
    fn span_display_is_human_readable() {
        let s = span!(3, 0, 3, 4);
        assert_eq!(s.display(), "span 3:0 to 3:4");
    }

    #[test]
    fn errors_carry_location() {
        let e = PartabError::UnexpectedToken {
            lexeme: "@".into(),
            span: span!(2, 7, 2, 8),
        };
        let msg = e.to_string();
        assert!(msg.contains("2:7"));
        assert!(msg.contains("@"));
    }

    fn _assert_send_sync_static<T: Send + Sync + 'static>() {}

    #[test]
    fn error_is_send_sync_static() {
        _assert_send_sync_static::<PartabError>();
    }
}
