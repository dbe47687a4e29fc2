//! Token types produced by the calc lexer.

use scriptline::Range;

/// Source region of a token or syntax node. Both ends always carry a byte
/// offset.
pub type Span = Range;

/// The smallest span covering both `a` and `b`.
pub fn merge(a: Span, b: Span) -> Span {
    let start = if a.start.offset <= b.start.offset {
        a.start
    } else {
        b.start
    };
    let end = if a.end.offset >= b.end.offset {
        a.end
    } else {
        b.end
    };
    Span::new(start, end)
}

/// The kind of a lexical token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Integer literal, e.g. `42`.
    Integer(i64),
    /// String literal (contents without surrounding quotes).
    String(String),
    /// An identifier, e.g. `total`, `println`.
    Identifier(String),
    /// An annotation name including the `@` sigil stripped, e.g.
    /// `depends_on` for `@depends_on`.
    Annotation(String),

    /// The reserved word `let`.
    Let,

    /// One of `+ - * / %`.
    Operator(char),
    /// `=`
    Equals,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `,`
    Comma,
    /// `;` ends a statement.
    Semicolon,
    /// A line break; also ends a statement.
    Newline,

    /// `// ...` (text does NOT include the leading `//`).
    LineComment(String),

    /// End of input.
    Eof,
    /// An unrecognized character or malformed token.
    Error(String),
}

impl TokenKind {
    /// Human-readable name for error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Integer(_) => "integer",
            Self::String(_) => "string",
            Self::Identifier(_) => "identifier",
            Self::Annotation(_) => "annotation",
            Self::Let => "`let`",
            Self::Operator(_) => "operator",
            Self::Equals => "`=`",
            Self::LParen => "`(`",
            Self::RParen => "`)`",
            Self::Comma => "`,`",
            Self::Semicolon => "`;`",
            Self::Newline => "end of line",
            Self::LineComment(_) => "line comment",
            Self::Eof => "end of input",
            Self::Error(_) => "error",
        }
    }

    pub fn is_comment(&self) -> bool {
        matches!(self, Self::LineComment(_))
    }

    /// `;`, a line break or the end of input.
    pub fn ends_statement(&self) -> bool {
        matches!(self, Self::Semicolon | Self::Newline | Self::Eof)
    }
}

/// A token with its source span.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// The original source text of this token.
    pub lexeme: String,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span, lexeme: impl Into<String>) -> Self {
        Self {
            kind,
            span,
            lexeme: lexeme.into(),
        }
    }

    pub fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }
}
