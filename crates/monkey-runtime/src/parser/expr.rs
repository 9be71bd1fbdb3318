//! Expression parsing (Pratt parsing)

use crate::ast::*;
use crate::parser::{Parser, Precedence};
use crate::token::{Token, TokenKind};

impl Parser {
    /// Parse an expression
    pub(super) fn parse_expression(&mut self) -> Result<Expr, ()> {
        self.parse_precedence(Precedence::Lowest)
    }

    /// Parse expression with given precedence
    pub(super) fn parse_precedence(&mut self, precedence: Precedence) -> Result<Expr, ()> {
        let mut left = self.parse_prefix()?;

        while precedence < self.current_precedence() {
            left = self.parse_infix(left)?;
        }

        Ok(left)
    }

    /// Parse prefix expression
    fn parse_prefix(&mut self) -> Result<Expr, ()> {
        match self.peek().kind {
            TokenKind::Integer => self.parse_integer(),
            TokenKind::Float => self.parse_float(),
            TokenKind::String => self.parse_string(),
            TokenKind::True | TokenKind::False => self.parse_bool(),
            TokenKind::Identifier => self.parse_identifier(),
            TokenKind::LeftParen => self.parse_group(),
            TokenKind::LeftBracket => self.parse_array_literal(),
            TokenKind::Minus | TokenKind::Bang => self.parse_prefix_op(),
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::Func => self.parse_function_literal(),
            _ => {
                let message = format!("Expected expression but found '{}'", self.peek().kind);
                self.error(&message);
                Err(())
            }
        }
    }

    /// Parse infix expression
    fn parse_infix(&mut self, left: Expr) -> Result<Expr, ()> {
        match self.peek().kind {
            TokenKind::Plus
            | TokenKind::Minus
            | TokenKind::Star
            | TokenKind::Slash
            | TokenKind::EqualEqual
            | TokenKind::BangEqual
            | TokenKind::Less
            | TokenKind::LessEqual
            | TokenKind::Greater
            | TokenKind::GreaterEqual => self.parse_binary(left),
            TokenKind::LeftParen => self.parse_call(left),
            TokenKind::LeftBracket => self.parse_index(left),
            _ => Ok(left),
        }
    }

    /// Get current token precedence
    pub(super) fn current_precedence(&self) -> Precedence {
        Self::token_precedence(self.peek())
    }

    fn token_precedence(token: &Token) -> Precedence {
        match token.kind {
            TokenKind::EqualEqual | TokenKind::BangEqual => Precedence::Equals,
            TokenKind::Less
            | TokenKind::LessEqual
            | TokenKind::Greater
            | TokenKind::GreaterEqual => Precedence::LessGreater,
            TokenKind::Plus | TokenKind::Minus => Precedence::Sum,
            TokenKind::Star | TokenKind::Slash => Precedence::Product,
            TokenKind::LeftParen | TokenKind::LeftBracket => Precedence::Call,
            _ => Precedence::Lowest,
        }
    }

    fn parse_integer(&mut self) -> Result<Expr, ()> {
        let token = self.peek().clone();
        match token.lexeme.parse::<i64>() {
            Ok(value) => {
                self.advance();
                Ok(Expr::Literal(Literal::Integer(value), token.span))
            }
            Err(_) => {
                self.error(&format!("Invalid integer literal '{}'", token.lexeme));
                Err(())
            }
        }
    }

    fn parse_float(&mut self) -> Result<Expr, ()> {
        let token = self.peek().clone();
        match token.lexeme.parse::<f64>() {
            Ok(value) => {
                self.advance();
                Ok(Expr::Literal(Literal::Float(value), token.span))
            }
            Err(_) => {
                self.error(&format!("Invalid float literal '{}'", token.lexeme));
                Err(())
            }
        }
    }

    fn parse_string(&mut self) -> Result<Expr, ()> {
        let token = self.advance();
        Ok(Expr::Literal(Literal::String(token.lexeme.clone()), token.span))
    }

    fn parse_bool(&mut self) -> Result<Expr, ()> {
        let token = self.advance();
        let value = token.kind == TokenKind::True;
        Ok(Expr::Literal(Literal::Boolean(value), token.span))
    }

    /// Parse an identifier, or an assignment when one follows it
    fn parse_identifier(&mut self) -> Result<Expr, ()> {
        let token = self.advance();
        let target = Identifier {
            name: token.lexeme.clone(),
            span: token.span,
        };

        if !Self::is_assignment_operator(self.peek().kind) {
            return Ok(Expr::Identifier(target));
        }

        let op = match self.advance().kind {
            TokenKind::PlusEqual => Some(InfixOp::Add),
            TokenKind::MinusEqual => Some(InfixOp::Sub),
            TokenKind::StarEqual => Some(InfixOp::Mul),
            TokenKind::SlashEqual => Some(InfixOp::Div),
            _ => None,
        };

        let rhs = self.parse_expression()?;
        let span = target.span.merge(rhs.span());

        // x op= v  ==>  x = x op v
        let value = match op {
            Some(op) => Expr::Infix(InfixExpr {
                op,
                left: Box::new(Expr::Identifier(target.clone())),
                right: Box::new(rhs),
                span,
            }),
            None => rhs,
        };

        Ok(Expr::Assign(AssignExpr {
            target,
            value: Box::new(value),
            span,
        }))
    }

    /// Parse grouped expression; the group itself leaves no node behind
    fn parse_group(&mut self) -> Result<Expr, ()> {
        self.consume(TokenKind::LeftParen, "Expected '('")?;
        let expr = self.parse_expression()?;
        self.consume(TokenKind::RightParen, "Expected ')'")?;
        Ok(expr)
    }

    fn parse_array_literal(&mut self) -> Result<Expr, ()> {
        let start_span = self.consume(TokenKind::LeftBracket, "Expected '['")?.span;
        let elements = self.parse_expression_list(TokenKind::RightBracket)?;
        let end_span = self.consume(TokenKind::RightBracket, "Expected ']'")?.span;

        Ok(Expr::Array(ArrayLiteral {
            elements,
            span: start_span.merge(end_span),
        }))
    }

    /// Comma-separated expressions up to (not including) `end`
    fn parse_expression_list(&mut self, end: TokenKind) -> Result<Vec<Expr>, ()> {
        let mut items = Vec::new();

        if !self.check(end) {
            loop {
                items.push(self.parse_expression()?);
                if !self.match_token(TokenKind::Comma) {
                    break;
                }
            }
        }

        Ok(items)
    }

    fn parse_prefix_op(&mut self) -> Result<Expr, ()> {
        let op_token = self.advance();
        let op_span = op_token.span;
        let op = if op_token.kind == TokenKind::Minus {
            PrefixOp::Negate
        } else {
            PrefixOp::Not
        };

        let operand = self.parse_precedence(Precedence::Prefix)?;
        let span = op_span.merge(operand.span());

        Ok(Expr::Prefix(PrefixExpr {
            op,
            operand: Box::new(operand),
            span,
        }))
    }

    fn parse_binary(&mut self, left: Expr) -> Result<Expr, ()> {
        let left_span = left.span();
        let op_token = self.advance();
        let op_kind = op_token.kind;
        let precedence = Self::token_precedence(op_token);

        let op = match op_kind {
            TokenKind::Plus => InfixOp::Add,
            TokenKind::Minus => InfixOp::Sub,
            TokenKind::Star => InfixOp::Mul,
            TokenKind::Slash => InfixOp::Div,
            TokenKind::EqualEqual => InfixOp::Eq,
            TokenKind::BangEqual => InfixOp::Ne,
            TokenKind::Less => InfixOp::Lt,
            TokenKind::LessEqual => InfixOp::Le,
            TokenKind::Greater => InfixOp::Gt,
            _ => InfixOp::Ge,
        };

        let right = self.parse_precedence(precedence)?;
        let span = left_span.merge(right.span());

        Ok(Expr::Infix(InfixExpr {
            op,
            left: Box::new(left),
            right: Box::new(right),
            span,
        }))
    }

    /// Parse `if (cond) { ... } [else { ... } | else if ...]`
    fn parse_if(&mut self) -> Result<Expr, ()> {
        let if_span = self.consume(TokenKind::If, "Expected 'if'")?.span;
        self.consume(TokenKind::LeftParen, "Expected '(' after 'if'")?;
        let condition = self.parse_expression()?;
        self.consume(TokenKind::RightParen, "Expected ')' after condition")?;
        let consequence = self.parse_block()?;
        let mut span = if_span.merge(consequence.span);

        let alternative = if self.match_token(TokenKind::Else) {
            let block = if self.check(TokenKind::If) {
                // else if: wrap the nested if-expression in a synthetic block
                let nested = self.parse_if()?;
                let nested_span = nested.span();
                Block {
                    statements: vec![Stmt::Expr(ExprStmt {
                        expr: nested,
                        span: nested_span,
                    })],
                    span: nested_span,
                }
            } else {
                self.parse_block()?
            };
            span = span.merge(block.span);
            Some(block)
        } else {
            None
        };

        Ok(Expr::If(IfExpr {
            condition: Box::new(condition),
            consequence,
            alternative,
            span,
        }))
    }

    /// Parse `while (cond) { ... }`
    fn parse_while(&mut self) -> Result<Expr, ()> {
        let while_span = self.consume(TokenKind::While, "Expected 'while'")?.span;
        self.consume(TokenKind::LeftParen, "Expected '(' after 'while'")?;
        let condition = self.parse_expression()?;
        self.consume(TokenKind::RightParen, "Expected ')' after condition")?;
        let body = self.parse_block()?;
        let span = while_span.merge(body.span);

        Ok(Expr::While(WhileExpr {
            condition: Box::new(condition),
            body,
            span,
        }))
    }

    /// Parse `for (var name = init; cond; post) { ... }`
    fn parse_for(&mut self) -> Result<Expr, ()> {
        let for_span = self.consume(TokenKind::For, "Expected 'for'")?.span;
        self.consume(TokenKind::LeftParen, "Expected '(' after 'for'")?;

        if !self.check(TokenKind::Var) {
            self.error("Expected 'var' to start the loop initializer");
            return Err(());
        }
        // parse_let eats an optional ';' but the header requires one
        let init = self.parse_let()?;
        if self.tokens[self.current - 1].kind != TokenKind::Semicolon {
            self.error("Expected ';' after loop initializer");
            return Err(());
        }

        let condition = self.parse_expression()?;
        self.consume(TokenKind::Semicolon, "Expected ';' after loop condition")?;
        let post = self.parse_expression()?;
        self.consume(TokenKind::RightParen, "Expected ')' after loop header")?;
        let body = self.parse_block()?;
        let span = for_span.merge(body.span);

        Ok(Expr::For(ForExpr {
            init: Box::new(init),
            condition: Box::new(condition),
            post: Box::new(post),
            body,
            span,
        }))
    }

    /// Parse `func(params) { body }`
    fn parse_function_literal(&mut self) -> Result<Expr, ()> {
        let func_span = self.consume(TokenKind::Func, "Expected 'func'")?.span;
        self.consume(TokenKind::LeftParen, "Expected '(' after 'func'")?;

        let mut params = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                params.push(self.consume_identifier("a parameter name")?);
                if !self.match_token(TokenKind::Comma) {
                    break;
                }
            }
        }

        self.consume(TokenKind::RightParen, "Expected ')' after parameters")?;
        let body = self.parse_block()?;
        let span = func_span.merge(body.span);

        Ok(Expr::Function(FunctionLiteral { params, body, span }))
    }

    fn parse_call(&mut self, callee: Expr) -> Result<Expr, ()> {
        let callee_span = callee.span();
        self.consume(TokenKind::LeftParen, "Expected '('")?;
        let args = self.parse_expression_list(TokenKind::RightParen)?;
        let end_span = self.consume(TokenKind::RightParen, "Expected ')' after arguments")?.span;

        Ok(Expr::Call(CallExpr {
            callee: Box::new(callee),
            args,
            span: callee_span.merge(end_span),
        }))
    }

    fn parse_index(&mut self, target: Expr) -> Result<Expr, ()> {
        let target_span = target.span();
        self.consume(TokenKind::LeftBracket, "Expected '['")?;
        let index = self.parse_expression()?;
        let end_span = self.consume(TokenKind::RightBracket, "Expected ']'")?.span;

        Ok(Expr::Index(IndexExpr {
            target: Box::new(target),
            index: Box::new(index),
            span: target_span.merge(end_span),
        }))
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn parse_expr(source: &str) -> Expr {
        let (tokens, _) = Lexer::new(source).tokenize();
        let (program, diagnostics) = Parser::new(tokens).parse();
        assert!(diagnostics.is_empty(), "parse errors: {:?}", diagnostics);
        match program.statements.into_iter().next() {
            Some(Stmt::Expr(stmt)) => stmt.expr,
            other => panic!("Expected expression statement, got {:?}", other),
        }
    }

    /// Render an expression fully parenthesized to check grouping
    fn render(expr: &Expr) -> String {
        match expr {
            Expr::Literal(Literal::Integer(n), _) => n.to_string(),
            Expr::Literal(Literal::Boolean(b), _) => b.to_string(),
            Expr::Literal(Literal::Float(f), _) => f.to_string(),
            Expr::Literal(Literal::String(s), _) => format!("{:?}", s),
            Expr::Identifier(id) => id.name.clone(),
            Expr::Prefix(p) => format!("({}{})", p.op, render(&p.operand)),
            Expr::Infix(i) => format!("({} {} {})", render(&i.left), i.op, render(&i.right)),
            Expr::Call(c) => format!(
                "{}({})",
                render(&c.callee),
                c.args.iter().map(render).collect::<Vec<_>>().join(", ")
            ),
            Expr::Index(i) => format!("({}[{}])", render(&i.target), render(&i.index)),
            Expr::Array(a) => format!(
                "[{}]",
                a.elements.iter().map(render).collect::<Vec<_>>().join(", ")
            ),
            Expr::Assign(a) => format!("({} = {})", a.target.name, render(&a.value)),
            other => format!("{:?}", other),
        }
    }

    #[rstest]
    #[case("-a * b", "((-a) * b)")]
    #[case("!-a", "(!(-a))")]
    #[case("a + b * c", "(a + (b * c))")]
    #[case("a * b / c", "((a * b) / c)")]
    #[case("a + b - c", "((a + b) - c)")]
    #[case("1 < 2 == true", "((1 < 2) == true)")]
    #[case("3 >= 4 != 5 <= 6", "((3 >= 4) != (5 <= 6))")]
    #[case("(a + b) * c", "((a + b) * c)")]
    #[case("add(a, b * c)[0]", "(add(a, (b * c))[0])")]
    #[case("a * [1, 2][b]", "(a * ([1, 2][b]))")]
    #[case("-f(x)", "(-f(x))")]
    fn test_operator_precedence(#[case] source: &str, #[case] expected: &str) {
        assert_eq!(render(&parse_expr(source)), expected);
    }

    #[rstest]
    #[case("x = 5", "(x = 5)")]
    #[case("x += 1", "(x = (x + 1))")]
    #[case("x -= y * 2", "(x = (x - (y * 2)))")]
    #[case("x *= 3", "(x = (x * 3))")]
    #[case("x /= 4", "(x = (x / 4))")]
    #[case("x = y = 1", "(x = (y = 1))")]
    fn test_assignment_desugaring(#[case] source: &str, #[case] expected: &str) {
        assert_eq!(render(&parse_expr(source)), expected);
    }

    #[test]
    fn test_if_else_if_chain_nests() {
        let Expr::If(outer) = parse_expr("if (a) { 1 } else if (b) { 2 } else { 3 }") else {
            panic!("Expected if expression");
        };
        let alternative = outer.alternative.expect("else branch");
        assert_eq!(alternative.statements.len(), 1);
        let Stmt::Expr(ExprStmt { expr: Expr::If(inner), .. }) = &alternative.statements[0] else {
            panic!("Expected nested if");
        };
        assert!(inner.alternative.is_some());
    }

    #[test]
    fn test_while_loop() {
        let Expr::While(w) = parse_expr("while (i < 10) { i += 1; }") else {
            panic!("Expected while expression");
        };
        assert_eq!(render(&w.condition), "(i < 10)");
        assert_eq!(w.body.statements.len(), 1);
    }

    #[test]
    fn test_for_loop() {
        let Expr::For(f) = parse_expr("for (var i = 0; i < 3; i += 1) { print(i); }") else {
            panic!("Expected for expression");
        };
        assert_eq!(f.init.name.name, "i");
        assert_eq!(render(&f.init.value), "0");
        assert_eq!(render(&f.condition), "(i < 3)");
        assert_eq!(render(&f.post), "(i = (i + 1))");
        assert_eq!(f.body.statements.len(), 1);
    }

    #[rstest]
    #[case("for (i = 0; i < 3; i += 1) { }")]
    #[case("for (var i = 0 i < 3; i += 1) { }")]
    #[case("for (var i = 0; i < 3) { }")]
    #[case("for (var i = 0; i < 3; i += 1) i")]
    fn test_malformed_for_header(#[case] source: &str) {
        let (tokens, _) = Lexer::new(source).tokenize();
        let (_, diagnostics) = Parser::new(tokens).parse();
        assert!(!diagnostics.is_empty(), "Expected a syntax error for {:?}", source);
    }

    #[test]
    fn test_literals() {
        assert_eq!(render(&parse_expr("2.5")), "2.5");
        assert_eq!(render(&parse_expr("\"hi\"")), "\"hi\"");
        assert_eq!(render(&parse_expr("false")), "false");
    }
}
