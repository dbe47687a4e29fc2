//! Lexer for calc source text.
//!
//! [`Lexer`] walks a `&str` and implements [`Iterator`] over [`Token`]s,
//! ending with exactly one [`TokenKind::Eof`]. Every token records byte
//! offset, line and column for both ends, so parse and compile errors
//! point back into the (merged) script text.
//!
//! Line breaks are significant: they end statements and come out as
//! [`TokenKind::Newline`]. A `\r\n` pair is a single line break.

use scriptline::Position;

use crate::token::{Span, Token, TokenKind};

/// Byte cursor with position tracking.
struct Cursor<'a> {
    bytes: &'a [u8],
    text: &'a str,
    offset: usize,
    line: usize,
    column: usize,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            bytes: text.as_bytes(),
            text,
            offset: 0,
            line: 1,
            column: 1,
        }
    }

    fn pos(&self) -> Position {
        Position::with_offset(self.line, self.column, self.offset)
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.offset).copied()
    }

    fn peek_ahead(&self, n: usize) -> Option<u8> {
        self.bytes.get(self.offset + n).copied()
    }

    fn peek_char(&self) -> Option<char> {
        self.text[self.offset..].chars().next()
    }

    fn advance(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.offset += 1;
        if b == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(b)
    }

    /// Consume one full UTF-8 character.
    fn advance_char(&mut self) -> Option<char> {
        let ch = self.peek_char()?;
        for _ in 0..ch.len_utf8() {
            self.advance();
        }
        Some(ch)
    }

    fn slice(&self, start: Position) -> &'a str {
        let from = start.offset.unwrap_or(self.offset);
        &self.text[from..self.offset]
    }
}

pub struct Lexer<'a> {
    cursor: Cursor<'a>,
    emitted_eof: bool,
}

impl<'a> Lexer<'a> {
    pub fn from_str(source: &'a str) -> Self {
        Self {
            cursor: Cursor::new(source),
            emitted_eof: false,
        }
    }

    fn pos(&self) -> Position {
        self.cursor.pos()
    }

    fn token(&self, kind: TokenKind, start: Position) -> Token {
        Token::new(kind, Span::new(start, self.pos()), self.cursor.slice(start))
    }

    // ───────────────────────────────────────────────────────────
    //  Whitespace and comments
    // ───────────────────────────────────────────────────────────

    fn skip_whitespace(&mut self) {
        while let Some(b' ' | b'\t' | 0x0B | 0x0C) = self.cursor.peek() {
            self.cursor.advance();
        }
        // a lone `\r` is whitespace; `\r\n` is a line break
        if self.cursor.peek() == Some(b'\r')
            && self.cursor.peek_ahead(1) != Some(b'\n')
        {
            self.cursor.advance();
            self.skip_whitespace();
        }
    }

    fn lex_line_comment(&mut self) -> Token {
        let start = self.pos();
        self.cursor.advance();
        self.cursor.advance();
        let text_start = self.cursor.offset;
        while !matches!(self.cursor.peek(), Some(b'\n' | b'\r') | None) {
            self.cursor.advance_char();
        }
        let text = self.cursor.text[text_start..self.cursor.offset].to_string();
        self.token(TokenKind::LineComment(text), start)
    }

    fn lex_newline(&mut self) -> Token {
        let start = self.pos();
        if self.cursor.peek() == Some(b'\r') {
            self.cursor.advance();
        }
        self.cursor.advance();
        self.token(TokenKind::Newline, start)
    }

    // ───────────────────────────────────────────────────────────
    //  Literals
    // ───────────────────────────────────────────────────────────

    /// Escape sequences: `\\`, `\"`, `\n`, `\t`.
    fn lex_string(&mut self) -> Token {
        let start = self.pos();
        self.cursor.advance();
        let mut value = String::new();
        loop {
            match self.cursor.peek() {
                Some(b'"') => {
                    self.cursor.advance();
                    break;
                }
                Some(b'\\') => {
                    self.cursor.advance();
                    match self.cursor.advance_char() {
                        Some('n') => value.push('\n'),
                        Some('t') => value.push('\t'),
                        Some(ch @ ('\\' | '"')) => value.push(ch),
                        Some(ch) => {
                            return self.token(
                                TokenKind::Error(format!(
                                    "unknown string escape `\\{ch}`"
                                )),
                                start,
                            );
                        }
                        None => {
                            return self.token(
                                TokenKind::Error("unterminated string".into()),
                                start,
                            );
                        }
                    }
                }
                Some(b'\n' | b'\r') | None => {
                    return self.token(
                        TokenKind::Error("unterminated string".into()),
                        start,
                    );
                }
                Some(_) => {
                    if let Some(ch) = self.cursor.advance_char() {
                        value.push(ch);
                    }
                }
            }
        }
        self.token(TokenKind::String(value), start)
    }

    /// Digits with optional `_` separators. Signs are operators.
    fn lex_number(&mut self) -> Token {
        let start = self.pos();
        let mut digits = String::new();
        while let Some(b) = self.cursor.peek() {
            if b.is_ascii_digit() {
                digits.push(b as char);
            } else if b != b'_' {
                break;
            }
            self.cursor.advance();
        }

        if let Some(ch) = self.cursor.peek_char() {
            if ch.is_alphabetic() {
                self.cursor.advance_char();
                return self.token(
                    TokenKind::Error(format!("invalid digit `{ch}` in number")),
                    start,
                );
            }
        }

        match digits.parse::<i64>() {
            Ok(value) => self.token(TokenKind::Integer(value), start),
            Err(err) => self.token(
                TokenKind::Error(format!("invalid integer: {err}")),
                start,
            ),
        }
    }

    // ───────────────────────────────────────────────────────────
    //  Identifiers and annotations
    // ───────────────────────────────────────────────────────────

    fn read_name(&mut self) -> String {
        let mut name = String::new();
        while let Some(ch) = self.cursor.peek_char() {
            if ch.is_alphanumeric() || ch == '_' {
                self.cursor.advance_char();
                name.push(ch);
            } else {
                break;
            }
        }
        name
    }

    fn lex_identifier(&mut self) -> Token {
        let start = self.pos();
        let name = self.read_name();
        let kind = match name.as_str() {
            "let" => TokenKind::Let,
            _ => TokenKind::Identifier(name),
        };
        self.token(kind, start)
    }

    fn lex_annotation(&mut self) -> Token {
        let start = self.pos();
        self.cursor.advance();
        match self.cursor.peek_char() {
            Some(ch) if ch.is_alphabetic() || ch == '_' => {
                let name = self.read_name();
                self.token(TokenKind::Annotation(name), start)
            }
            _ => self.token(
                TokenKind::Error("expected annotation name after `@`".into()),
                start,
            ),
        }
    }

    // ───────────────────────────────────────────────────────────
    //  Main dispatch
    // ───────────────────────────────────────────────────────────

    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();
        let start = self.pos();

        let b = match self.cursor.peek() {
            Some(b) => b,
            None => {
                self.emitted_eof = true;
                return Token::new(TokenKind::Eof, Span::new(start, start), "");
            }
        };

        let single = |lexer: &mut Self, kind: TokenKind| {
            lexer.cursor.advance();
            lexer.token(kind, start)
        };

        match b {
            b'/' if self.cursor.peek_ahead(1) == Some(b'/') => {
                self.lex_line_comment()
            }
            b'\n' | b'\r' => self.lex_newline(),
            b'"' => self.lex_string(),
            b'@' => self.lex_annotation(),
            b'0'..=b'9' => self.lex_number(),
            b'+' | b'-' | b'*' | b'/' | b'%' => {
                single(self, TokenKind::Operator(b as char))
            }
            b'=' => single(self, TokenKind::Equals),
            b'(' => single(self, TokenKind::LParen),
            b')' => single(self, TokenKind::RParen),
            b',' => single(self, TokenKind::Comma),
            b';' => single(self, TokenKind::Semicolon),
            _ => match self.cursor.peek_char() {
                Some(ch) if ch.is_alphabetic() || ch == '_' => {
                    self.lex_identifier()
                }
                Some(ch) => {
                    self.cursor.advance_char();
                    self.token(
                        TokenKind::Error(format!("unexpected character `{ch}`")),
                        start,
                    )
                }
                None => {
                    self.emitted_eof = true;
                    Token::new(TokenKind::Eof, Span::new(start, start), "")
                }
            },
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.emitted_eof {
            return None;
        }
        Some(self.next_token())
    }
}
