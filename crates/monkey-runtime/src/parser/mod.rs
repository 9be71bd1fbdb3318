//! Parsing (tokens to AST)
//!
//! The parser converts a stream of tokens into an Abstract Syntax Tree (AST).
//! Uses Pratt parsing for expressions and recursive descent for statements.

mod expr;
mod stmt;

use crate::ast::*;
use crate::diagnostic::{error_codes, Diagnostic};
use crate::token::{Token, TokenKind};

/// Parser state for building AST from tokens
pub struct Parser {
    pub(super) tokens: Vec<Token>,
    pub(super) current: usize,
    pub(super) diagnostics: Vec<Diagnostic>,
}

/// Operator precedence levels for Pratt parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(super) enum Precedence {
    Lowest,
    Equals,      // == !=
    LessGreater, // < <= > >=
    Sum,         // + -
    Product,     // * /
    Prefix,      // ! -
    Call,        // () []
}

impl Parser {
    /// Create a new parser for the given tokens
    ///
    /// The token stream is expected to end with `Eof`, as produced by the lexer.
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            current: 0,
            diagnostics: Vec::new(),
        }
    }

    /// Parse tokens into an AST
    ///
    /// Errors are collected as diagnostics; the parser resynchronizes at the
    /// next statement boundary and keeps going.
    pub fn parse(&mut self) -> (Program, Vec<Diagnostic>) {
        let mut statements = Vec::new();

        while !self.is_at_end() {
            match self.parse_statement() {
                Ok(stmt) => statements.push(stmt),
                Err(_) => self.synchronize(),
            }
        }

        (Program { statements }, std::mem::take(&mut self.diagnostics))
    }

    // === Helper methods ===

    /// Advance to next token and return reference to previous
    pub(super) fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        &self.tokens[self.current - 1]
    }

    /// Peek at current token
    pub(super) fn peek(&self) -> &Token {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[self.current.min(last)]
    }

    /// Check if current token matches kind
    pub(super) fn check(&self, kind: TokenKind) -> bool {
        !self.is_at_end() && self.peek().kind == kind
    }

    /// Match and consume token if it matches
    pub(super) fn match_token(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consume token of given kind or error
    pub(super) fn consume(&mut self, kind: TokenKind, message: &str) -> Result<&Token, ()> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            self.error(message);
            Err(())
        }
    }

    /// Consume an identifier token
    pub(super) fn consume_identifier(&mut self, context: &str) -> Result<Identifier, ()> {
        let current = self.peek();
        if current.kind == TokenKind::Identifier {
            let token = self.advance();
            Ok(Identifier {
                name: token.lexeme.clone(),
                span: token.span,
            })
        } else if TokenKind::is_keyword(&current.lexeme).is_some() {
            let message = format!("Cannot use keyword '{}' as {}", current.lexeme, context);
            self.error(&message);
            Err(())
        } else {
            let message = format!("Expected {} but found '{}'", context, current.kind);
            self.error(&message);
            Err(())
        }
    }

    /// Check if at end of token stream
    pub(super) fn is_at_end(&self) -> bool {
        self.current >= self.tokens.len() || self.tokens[self.current].kind == TokenKind::Eof
    }

    /// Record a syntax error at the current token
    ///
    /// Lexer error tokens already carry their own diagnostic, so they are not reported twice.
    pub(super) fn error(&mut self, message: &str) {
        let token = self.peek();
        if token.kind == TokenKind::Error {
            return;
        }
        let span = token.span;
        self.diagnostics.push(
            Diagnostic::error_with_code(error_codes::SYNTAX_ERROR, message, span)
                .with_label("syntax error"),
        );
    }

    /// Skip tokens until a likely statement boundary
    pub(super) fn synchronize(&mut self) {
        self.advance();

        while !self.is_at_end() {
            if self.tokens[self.current - 1].kind == TokenKind::Semicolon {
                return;
            }

            match self.peek().kind {
                TokenKind::Var
                | TokenKind::Return
                | TokenKind::If
                | TokenKind::While
                | TokenKind::For => return,
                _ => {
                    self.advance();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::span::Span;
    use pretty_assertions::assert_eq;

    fn parse_source(source: &str) -> (Program, Vec<Diagnostic>) {
        let (tokens, lex_diags) = Lexer::new(source).tokenize();
        assert!(lex_diags.is_empty(), "lexer errors: {:?}", lex_diags);
        Parser::new(tokens).parse()
    }

    fn parse_ok(source: &str) -> Program {
        let (program, diagnostics) = parse_source(source);
        assert!(diagnostics.is_empty(), "parse errors: {:?}", diagnostics);
        program
    }

    fn single_expr(source: &str) -> Expr {
        let program = parse_ok(source);
        assert_eq!(program.statements.len(), 1);
        match program.statements.into_iter().next() {
            Some(Stmt::Expr(stmt)) => stmt.expr,
            other => panic!("Expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_var_statement() {
        let program = parse_ok("var answer = 42;");
        match &program.statements[0] {
            Stmt::Let(stmt) => {
                assert_eq!(stmt.name.name, "answer");
                assert_eq!(stmt.value, Expr::Literal(Literal::Integer(42), Span::new(13, 15)));
                assert_eq!(stmt.span, Span::new(0, 16));
            }
            other => panic!("Expected let statement, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_return_with_and_without_value() {
        let program = parse_ok("return 1; return;");
        assert!(matches!(&program.statements[0], Stmt::Return(r) if r.value.is_some()));
        assert!(matches!(&program.statements[1], Stmt::Return(r) if r.value.is_none()));
    }

    #[test]
    fn test_semicolons_are_optional_for_expressions() {
        let program = parse_ok("1 + 2\n3");
        assert_eq!(program.statements.len(), 2);
    }

    #[test]
    fn test_recovery_after_error() {
        let (program, diagnostics) = parse_source("var = 5; var y = 2;");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, error_codes::SYNTAX_ERROR);
        assert_eq!(program.statements.len(), 1);
    }

    #[test]
    fn test_keyword_as_name_is_rejected() {
        let (_, diagnostics) = parse_source("var if = 1;");
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("Cannot use keyword 'if'"));
    }

    #[test]
    fn test_function_literal_params() {
        match single_expr("func(a, b) { a + b }") {
            Expr::Function(f) => {
                let names: Vec<_> = f.params.iter().map(|p| p.name.as_str()).collect();
                assert_eq!(names, vec!["a", "b"]);
                assert_eq!(f.body.statements.len(), 1);
            }
            other => panic!("Expected function literal, got {:?}", other),
        }
    }

    #[test]
    fn test_unclosed_block_reports_error() {
        let (_, diagnostics) = parse_source("if (true) { 1");
        assert!(!diagnostics.is_empty());
    }
}
