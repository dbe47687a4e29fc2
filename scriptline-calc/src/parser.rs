use scriptline::Position;

use crate::{
    ast::{
        AnnotationNode, BinaryOp, Expr, ExprKind, Script, Statement, StatementKind,
    },
    token::{Span, Token, TokenKind, merge},
};

#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

impl ParseError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at {}", self.message, self.span)
    }
}

impl std::error::Error for ParseError {}

/// Error for `tok` where `expected` was wanted. Lexer errors keep their own
/// message.
fn unexpected(tok: &Token, expected: &str) -> ParseError {
    match &tok.kind {
        TokenKind::Error(message) => ParseError::new(message.clone(), tok.span),
        kind => ParseError::new(
            format!("expected {expected}, found {}", kind.name()),
            tok.span,
        ),
    }
}

pub struct Parser<I: Iterator<Item = Token>> {
    tokens: std::iter::Peekable<I>,
    last_span: Span,
}

impl<I: Iterator<Item = Token>> Parser<I> {
    pub fn new(tokens: I) -> Self {
        let origin = Position::origin();
        Self {
            tokens: tokens.peekable(),
            last_span: Span::new(origin, origin),
        }
    }

    fn skip_comments(&mut self) {
        while self.tokens.next_if(|tok| tok.kind.is_comment()).is_some() {}
    }

    fn peek_kind(&mut self) -> &TokenKind {
        self.skip_comments();
        match self.tokens.peek() {
            Some(tok) => &tok.kind,
            None => &TokenKind::Eof,
        }
    }

    fn advance(&mut self) -> Token {
        self.skip_comments();
        match self.tokens.next() {
            Some(tok) => {
                self.last_span = tok.span;
                tok
            }
            None => Token::new(TokenKind::Eof, self.last_span, ""),
        }
    }

    fn expect(&mut self, expected: &TokenKind) -> Result<Token, ParseError> {
        if self.check(expected) {
            Ok(self.advance())
        } else {
            Err(self.error_at_peek(expected.name()))
        }
    }

    /// Error for the next token. A statement terminator is left in place
    /// so recovery resumes at the following statement.
    fn error_at_peek(&mut self, expected: &str) -> ParseError {
        if self.peek_kind().ends_statement() {
            match self.tokens.peek() {
                Some(tok) => unexpected(tok, expected),
                None => ParseError::new(
                    format!("expected {expected}, found end of input"),
                    self.last_span,
                ),
            }
        } else {
            let tok = self.advance();
            unexpected(&tok, expected)
        }
    }

    fn check(&mut self, kind: &TokenKind) -> bool {
        std::mem::discriminant(self.peek_kind()) == std::mem::discriminant(kind)
    }

    /// Parse a whole script, recovering at statement boundaries so every
    /// statement with a syntax error is reported.
    pub fn parse_script(mut self) -> (Script, Vec<ParseError>) {
        let mut script = Script::default();
        let mut errors = Vec::new();

        loop {
            while matches!(
                self.peek_kind(),
                TokenKind::Newline | TokenKind::Semicolon
            ) {
                self.advance();
            }
            if self.check(&TokenKind::Eof) {
                break;
            }

            let parsed = self.parse_item(&mut script).and_then(|()| {
                if self.peek_kind().ends_statement() {
                    Ok(())
                } else {
                    Err(self.error_at_peek("end of statement"))
                }
            });
            if let Err(err) = parsed {
                errors.push(err);
                self.recover();
            }
        }

        (script, errors)
    }

    fn recover(&mut self) {
        while !self.peek_kind().ends_statement() {
            self.advance();
        }
    }

    fn parse_item(&mut self, script: &mut Script) -> Result<(), ParseError> {
        if matches!(self.peek_kind(), TokenKind::Annotation(_)) {
            let annotation = self.parse_annotation()?;
            script.annotations.push(annotation);
        } else {
            let statement = self.parse_statement()?;
            script.statements.push(statement);
        }
        Ok(())
    }

    fn parse_annotation(&mut self) -> Result<AnnotationNode, ParseError> {
        let tok = self.advance();
        let name = match tok.kind {
            TokenKind::Annotation(name) => name,
            _ => return Err(unexpected(&tok, "annotation")),
        };
        let mut span = tok.span;
        let mut arguments = Vec::new();

        if self.check(&TokenKind::LParen) {
            self.advance();
            if !self.check(&TokenKind::RParen) {
                loop {
                    match self.peek_kind().clone() {
                        TokenKind::String(value) => {
                            self.advance();
                            arguments.push(value);
                        }
                        _ => return Err(self.error_at_peek("string argument")),
                    }
                    if !self.check(&TokenKind::Comma) {
                        break;
                    }
                    self.advance();
                }
            }
            let close = self.expect(&TokenKind::RParen)?;
            span = merge(span, close.span);
        }

        Ok(AnnotationNode {
            name,
            arguments,
            span,
        })
    }

    fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        if self.check(&TokenKind::Let) {
            let start = self.advance().span;
            let TokenKind::Identifier(name) = self.peek_kind().clone() else {
                return Err(self.error_at_peek("identifier"));
            };
            let tok = self.advance();
            self.expect(&TokenKind::Equals)?;
            let value = self.parse_expression()?;
            let span = merge(start, value.span);
            return Ok(Statement {
                kind: StatementKind::Let {
                    name,
                    name_span: tok.span,
                    value,
                },
                span,
            });
        }

        if matches!(self.peek_kind(), TokenKind::Identifier(name) if name == "println")
        {
            let callee = self.advance();
            if self.check(&TokenKind::LParen) {
                self.advance();
                let value = self.parse_expression()?;
                let close = self.expect(&TokenKind::RParen)?;
                return Ok(Statement {
                    kind: StatementKind::Print(value),
                    span: merge(callee.span, close.span),
                });
            }
            // `println` used as a plain name
            let left = Expr::new(
                ExprKind::Identifier(callee.lexeme.clone()),
                callee.span,
            );
            let expr = self.parse_binary_with_left(left, 0)?;
            return Ok(Statement {
                span: expr.span,
                kind: StatementKind::Expression(expr),
            });
        }

        let expr = self.parse_expression()?;
        Ok(Statement {
            span: expr.span,
            kind: StatementKind::Expression(expr),
        })
    }

    pub fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary_with_min_precedence(0)
    }

    fn parse_binary_with_min_precedence(
        &mut self,
        min_prec: u8,
    ) -> Result<Expr, ParseError> {
        let left = self.parse_unary_level()?;
        self.parse_binary_with_left(left, min_prec)
    }

    fn parse_binary_with_left(
        &mut self,
        mut left: Expr,
        min_prec: u8,
    ) -> Result<Expr, ParseError> {
        while let TokenKind::Operator(symbol) = *self.peek_kind() {
            let Some(op) = BinaryOp::from_symbol(symbol) else {
                break;
            };
            if op.precedence() < min_prec {
                break;
            }
            self.advance();
            let right = self.parse_binary_with_min_precedence(op.precedence() + 1)?;
            let span = merge(left.span, right.span);
            left = Expr::new(
                ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            );
        }
        Ok(left)
    }

    fn parse_unary_level(&mut self) -> Result<Expr, ParseError> {
        if matches!(self.peek_kind(), TokenKind::Operator('-')) {
            let minus = self.advance();
            let operand = self.parse_unary_level()?;
            let span = merge(minus.span, operand.span);
            return Ok(Expr::new(ExprKind::Negate(Box::new(operand)), span));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        if self.peek_kind().ends_statement() {
            return Err(self.error_at_peek("expression"));
        }
        let tok = self.advance();
        match tok.kind {
            TokenKind::Integer(value) => {
                Ok(Expr::new(ExprKind::Integer(value), tok.span))
            }
            TokenKind::String(value) => {
                Ok(Expr::new(ExprKind::String(value), tok.span))
            }
            TokenKind::Identifier(name) => {
                Ok(Expr::new(ExprKind::Identifier(name), tok.span))
            }
            TokenKind::LParen => {
                let inner = self.parse_expression()?;
                let close = self.expect(&TokenKind::RParen)?;
                Ok(Expr::new(inner.kind, merge(tok.span, close.span)))
            }
            _ => Err(unexpected(&tok, "expression")),
        }
    }
}

/// Lex and parse `source`.
pub fn parse(source: &str) -> (Script, Vec<ParseError>) {
    Parser::new(crate::lexer::Lexer::from_str(source)).parse_script()
}
