//! Statement parsing

use crate::ast::*;
use crate::parser::Parser;
use crate::token::TokenKind;

impl Parser {
    /// Parse a statement
    pub(super) fn parse_statement(&mut self) -> Result<Stmt, ()> {
        match self.peek().kind {
            TokenKind::Var => Ok(Stmt::Let(self.parse_let()?)),
            TokenKind::Return => Ok(Stmt::Return(self.parse_return()?)),
            _ => Ok(Stmt::Expr(self.parse_expression_statement()?)),
        }
    }

    /// Parse `var name = value;`
    pub(super) fn parse_let(&mut self) -> Result<LetStmt, ()> {
        let var_span = self.consume(TokenKind::Var, "Expected 'var'")?.span;
        let name = self.consume_identifier("a variable name")?;
        self.consume(TokenKind::Assign, "Expected '=' after variable name")?;
        let value = self.parse_expression()?;

        let mut span = var_span.merge(value.span());
        if self.check(TokenKind::Semicolon) {
            span = span.merge(self.advance().span);
        }

        Ok(LetStmt { name, value, span })
    }

    /// Parse `return;` or `return value;`
    fn parse_return(&mut self) -> Result<ReturnStmt, ()> {
        let mut span = self.consume(TokenKind::Return, "Expected 'return'")?.span;

        let value = if self.check(TokenKind::Semicolon)
            || self.check(TokenKind::RightBrace)
            || self.is_at_end()
        {
            None
        } else {
            let expr = self.parse_expression()?;
            span = span.merge(expr.span());
            Some(expr)
        };

        if self.check(TokenKind::Semicolon) {
            span = span.merge(self.advance().span);
        }

        Ok(ReturnStmt { value, span })
    }

    /// Parse an expression statement with an optional trailing semicolon
    fn parse_expression_statement(&mut self) -> Result<ExprStmt, ()> {
        let expr = self.parse_expression()?;

        if Self::is_assignment_operator(self.peek().kind) {
            self.error("Invalid assignment target, only variables can be assigned");
            return Err(());
        }

        let mut span = expr.span();
        if self.check(TokenKind::Semicolon) {
            span = span.merge(self.advance().span);
        }

        Ok(ExprStmt { expr, span })
    }

    /// Parse `{ statements }`
    pub(super) fn parse_block(&mut self) -> Result<Block, ()> {
        let start_span = self.consume(TokenKind::LeftBrace, "Expected '{'")?.span;
        let mut statements = Vec::new();

        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            statements.push(self.parse_statement()?);
        }

        let end_span = self.consume(TokenKind::RightBrace, "Expected '}' to close block")?.span;

        Ok(Block {
            statements,
            span: start_span.merge(end_span),
        })
    }

    pub(super) fn is_assignment_operator(kind: TokenKind) -> bool {
        matches!(
            kind,
            TokenKind::Assign
                | TokenKind::PlusEqual
                | TokenKind::MinusEqual
                | TokenKind::StarEqual
                | TokenKind::SlashEqual
        )
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn parse(source: &str) -> (Program, usize) {
        let (tokens, _) = Lexer::new(source).tokenize();
        let (program, diagnostics) = Parser::new(tokens).parse();
        (program, diagnostics.len())
    }

    #[test]
    fn test_bare_return_before_brace() {
        let (program, errors) = parse("func() { return }");
        assert_eq!(errors, 0);
        let Stmt::Expr(ExprStmt { expr: Expr::Function(f), .. }) = &program.statements[0] else {
            panic!("Expected function literal");
        };
        assert!(matches!(&f.body.statements[0], Stmt::Return(r) if r.value.is_none()));
    }

    #[test]
    fn test_index_assignment_is_rejected() {
        let (_, errors) = parse("var a = [1]; a[0] = 2;");
        assert_eq!(errors, 1);
    }

    #[test]
    fn test_empty_block() {
        let (program, errors) = parse("if (true) {}");
        assert_eq!(errors, 0);
        let Stmt::Expr(ExprStmt { expr: Expr::If(if_expr), .. }) = &program.statements[0] else {
            panic!("Expected if expression");
        };
        assert!(if_expr.consequence.statements.is_empty());
        assert!(if_expr.alternative.is_none());
    }
}
