//! Recursive-descent parser producing the VSOP AST from a token stream.
//!
//! One function per grammar production, split per construct kind. Parse
//! errors are reported through the shared
//! [`Handler`] and recovery is minimal: on a malformed construct the parser
//! reports and returns a best-effort placeholder rather than panicking, so
//! a single syntax error doesn't stop every later diagnostic.

use crate::ast::{BinOp, Class, Expr, ExprKind, Field, Formal, Method, Program, Type, UnOp};
use vsopc_lex::{Spanned, Token};
use vsopc_util::{Handler, Span, Symbol};

pub struct Parser<'a> {
    tokens: Vec<Spanned>,
    pos: usize,
    handler: &'a Handler,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: Vec<Spanned>, handler: &'a Handler) -> Self {
        Self {
            tokens,
            pos: 0,
            handler,
        }
    }

    fn current(&self) -> &Token {
        &self.tokens[self.pos].token
    }

    fn current_span(&self) -> Span {
        self.tokens[self.pos].span
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].token.clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn check(&self, expected: &Token) -> bool {
        std::mem::discriminant(self.current()) == std::mem::discriminant(expected)
    }

    fn eat(&mut self, expected: Token) -> bool {
        if self.check(&expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token, what: &str) {
        if !self.eat(expected) {
            self.handler.error(
                format!("expected {what}, found {:?}", self.current()),
                self.current_span(),
            );
        }
    }

    fn expect_ident(&mut self) -> Symbol {
        match self.current().clone() {
            Token::Ident(s) => {
                self.advance();
                s
            }
            other => {
                self.handler.error(
                    format!("expected identifier, found {other:?}"),
                    self.current_span(),
                );
                Symbol::intern("<error>")
            }
        }
    }

    fn expect_type_ident(&mut self) -> Symbol {
        match self.current().clone() {
            Token::TypeIdent(s) => {
                self.advance();
                s
            }
            other => {
                self.handler.error(
                    format!("expected type identifier, found {other:?}"),
                    self.current_span(),
                );
                Symbol::intern("<error>")
            }
        }
    }

    pub fn parse_program(mut self) -> Program {
        let mut classes = Vec::new();
        while !matches!(self.current(), Token::Eof) {
            classes.push(self.parse_class());
        }
        Program { classes }
    }

    fn parse_class(&mut self) -> Class {
        let start = self.current_span();
        self.expect(Token::Class, "'class'");
        let name = self.expect_type_ident();
        let parent = if self.eat(Token::Extends) {
            Some(self.expect_type_ident())
        } else {
            None
        };
        self.expect(Token::LBrace, "'{'");

        let mut fields = Vec::new();
        let mut methods = Vec::new();
        while !matches!(self.current(), Token::RBrace | Token::Eof) {
            let member_start = self.current_span();
            let member_name = self.expect_ident();
            if self.check(&Token::LParen) {
                methods.push(self.parse_method_rest(member_name, member_start));
            } else {
                fields.push(self.parse_field_rest(member_name, member_start));
            }
        }
        let end = self.current_span();
        self.expect(Token::RBrace, "'}'");
        Class {
            name,
            parent,
            fields,
            methods,
            span: start.to(end),
        }
    }

    fn parse_field_rest(&mut self, name: Symbol, start: Span) -> Field {
        self.expect(Token::Colon, "':'");
        let ty = self.parse_type();
        let init = if self.eat(Token::Assign) {
            Some(self.parse_expr())
        } else {
            None
        };
        let end = self.current_span();
        self.expect(Token::Semicolon, "';'");
        Field {
            name,
            ty,
            init,
            span: start.to(end),
        }
    }

    fn parse_method_rest(&mut self, name: Symbol, start: Span) -> Method {
        self.expect(Token::LParen, "'('");
        let mut formals = Vec::new();
        if !self.check(&Token::RParen) {
            formals.push(self.parse_formal());
            while self.eat(Token::Comma) {
                formals.push(self.parse_formal());
            }
        }
        self.expect(Token::RParen, "')'");
        self.expect(Token::Colon, "':'");
        let ret_ty = self.parse_type();
        let body = self.parse_block();
        let span = start.to(body.span);
        Method {
            name,
            formals,
            ret_ty,
            body,
            span,
        }
    }

    fn parse_formal(&mut self) -> Formal {
        let start = self.current_span();
        let name = self.expect_ident();
        self.expect(Token::Colon, "':'");
        let ty = self.parse_type();
        Formal {
            name,
            ty,
            span: start,
        }
    }

    fn parse_type(&mut self) -> Type {
        match self.current().clone() {
            Token::Int32 => {
                self.advance();
                Type::Int32
            }
            Token::Bool => {
                self.advance();
                Type::Bool
            }
            Token::String => {
                self.advance();
                Type::StringT
            }
            Token::Unit => {
                self.advance();
                Type::Unit
            }
            Token::TypeIdent(s) => {
                self.advance();
                Type::Class(s)
            }
            other => {
                self.handler
                    .error(format!("expected type, found {other:?}"), self.current_span());
                Type::Unit
            }
        }
    }

    // Expression grammar, lowest to highest precedence:
    //   expr       := if | while | let | assign
    //   assign     := ident "<-" expr | and_expr
    //   and_expr   := not_expr ("and" not_expr)*
    //   not_expr   := "not" not_expr | compare
    //   compare    := additive (("=" | "<" | "<=") additive)?
    //   additive   := multiplicative (("+" | "-") multiplicative)*
    //   multiplicative := unary (("*" | "/") unary)*
    //   unary      := "-" unary | "isnull" unary | pow
    //   pow        := postfix ("^" unary)?
    //   postfix    := primary ("." ident "(" args ")")*

    pub fn parse_expr(&mut self) -> Expr {
        match self.current() {
            Token::If => self.parse_if(),
            Token::While => self.parse_while(),
            Token::Let => self.parse_let(),
            _ => self.parse_assign(),
        }
    }

    fn parse_if(&mut self) -> Expr {
        let start = self.current_span();
        self.expect(Token::If, "'if'");
        let cond = Box::new(self.parse_expr());
        self.expect(Token::Then, "'then'");
        let then_branch = Box::new(self.parse_expr());
        let else_branch = if self.eat(Token::Else) {
            Some(Box::new(self.parse_expr()))
        } else {
            None
        };
        let span = start.to(self.prev_span());
        Expr::new(
            ExprKind::If {
                cond,
                then_branch,
                else_branch,
            },
            span,
        )
    }

    fn parse_while(&mut self) -> Expr {
        let start = self.current_span();
        self.expect(Token::While, "'while'");
        let cond = Box::new(self.parse_expr());
        self.expect(Token::Do, "'do'");
        let body = Box::new(self.parse_expr());
        let span = start.to(self.prev_span());
        Expr::new(ExprKind::While { cond, body }, span)
    }

    fn parse_let(&mut self) -> Expr {
        let start = self.current_span();
        self.expect(Token::Let, "'let'");
        let name = self.expect_ident();
        self.expect(Token::Colon, "':'");
        let ty = self.parse_type();
        let init = if self.eat(Token::Assign) {
            Some(Box::new(self.parse_expr()))
        } else {
            None
        };
        self.expect(Token::In, "'in'");
        let body = Box::new(self.parse_expr());
        let span = start.to(self.prev_span());
        Expr::new(
            ExprKind::Let {
                name,
                ty,
                init,
                body,
            },
            span,
        )
    }

    fn parse_assign(&mut self) -> Expr {
        if let Token::Ident(name) = self.current().clone() {
            if matches!(self.peek(1), Token::Assign) {
                let start = self.current_span();
                self.advance();
                self.advance();
                let value = Box::new(self.parse_expr());
                let span = start.to(self.prev_span());
                return Expr::new(ExprKind::Assign(name, value), span);
            }
        }
        self.parse_and()
    }

    fn peek(&self, offset: usize) -> Token {
        let idx = (self.pos + offset).min(self.tokens.len() - 1);
        self.tokens[idx].token.clone()
    }

    fn parse_and(&mut self) -> Expr {
        let mut lhs = self.parse_not();
        while self.eat(Token::And) {
            let rhs = self.parse_not();
            let span = lhs.span.to(rhs.span);
            lhs = Expr::new(ExprKind::BinOp(BinOp::And, Box::new(lhs), Box::new(rhs)), span);
        }
        lhs
    }

    fn parse_not(&mut self) -> Expr {
        if self.check(&Token::Not) {
            let start = self.current_span();
            self.advance();
            let operand = Box::new(self.parse_not());
            let span = start.to(self.prev_span());
            return Expr::new(ExprKind::UnOp(UnOp::Not, operand), span);
        }
        self.parse_compare()
    }

    fn parse_compare(&mut self) -> Expr {
        let lhs = self.parse_additive();
        let op = match self.current() {
            Token::Equal => BinOp::Eq,
            Token::Lower => BinOp::Lower,
            Token::LowerEqual => BinOp::LowerEqual,
            _ => return lhs,
        };
        self.advance();
        let rhs = self.parse_additive();
        let span = lhs.span.to(rhs.span);
        Expr::new(ExprKind::BinOp(op, Box::new(lhs), Box::new(rhs)), span)
    }

    fn parse_additive(&mut self) -> Expr {
        let mut lhs = self.parse_multiplicative();
        loop {
            let op = match self.current() {
                Token::Plus => BinOp::Add,
                Token::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_multiplicative();
            let span = lhs.span.to(rhs.span);
            lhs = Expr::new(ExprKind::BinOp(op, Box::new(lhs), Box::new(rhs)), span);
        }
        lhs
    }

    fn parse_multiplicative(&mut self) -> Expr {
        let mut lhs = self.parse_unary();
        loop {
            let op = match self.current() {
                Token::Times => BinOp::Mul,
                Token::Div => BinOp::Div,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_unary();
            let span = lhs.span.to(rhs.span);
            lhs = Expr::new(ExprKind::BinOp(op, Box::new(lhs), Box::new(rhs)), span);
        }
        lhs
    }

    fn parse_unary(&mut self) -> Expr {
        match self.current() {
            Token::Minus => {
                let start = self.current_span();
                self.advance();
                let operand = Box::new(self.parse_unary());
                let span = start.to(self.prev_span());
                Expr::new(ExprKind::UnOp(UnOp::Neg, operand), span)
            }
            Token::Isnull => {
                let start = self.current_span();
                self.advance();
                let operand = Box::new(self.parse_unary());
                let span = start.to(self.prev_span());
                Expr::new(ExprKind::UnOp(UnOp::IsNull, operand), span)
            }
            _ => self.parse_pow(),
        }
    }

    fn parse_pow(&mut self) -> Expr {
        let base = self.parse_postfix();
        if self.eat(Token::Pow) {
            let exponent = Box::new(self.parse_unary());
            let span = base.span.to(exponent.span);
            return Expr::new(ExprKind::BinOp(BinOp::Pow, Box::new(base), exponent), span);
        }
        base
    }

    fn parse_postfix(&mut self) -> Expr {
        let mut expr = self.parse_primary();
        while self.eat(Token::Dot) {
            let method = self.expect_ident();
            self.expect(Token::LParen, "'('");
            let args = self.parse_args();
            let end = self.current_span();
            self.expect(Token::RParen, "')'");
            let span = expr.span.to(end);
            expr = Expr::new(
                ExprKind::MethodCall {
                    receiver: Box::new(expr),
                    method,
                    args,
                },
                span,
            );
        }
        expr
    }

    fn parse_args(&mut self) -> Vec<Expr> {
        let mut args = Vec::new();
        if !self.check(&Token::RParen) {
            args.push(self.parse_expr());
            while self.eat(Token::Comma) {
                args.push(self.parse_expr());
            }
        }
        args
    }

    fn parse_primary(&mut self) -> Expr {
        let start = self.current_span();
        match self.current().clone() {
            Token::IntegerLiteral(v) => {
                self.advance();
                Expr::new(ExprKind::IntLiteral(v), start)
            }
            Token::StringLiteral(s) => {
                self.advance();
                Expr::new(ExprKind::StringLiteral(s), start)
            }
            Token::True => {
                self.advance();
                Expr::new(ExprKind::BoolLiteral(true), start)
            }
            Token::False => {
                self.advance();
                Expr::new(ExprKind::BoolLiteral(false), start)
            }
            Token::Unit => {
                self.advance();
                Expr::new(ExprKind::UnitLiteral, start)
            }
            Token::SelfKw => {
                self.advance();
                Expr::new(ExprKind::SelfExpr, start)
            }
            Token::New => {
                self.advance();
                let ty = self.expect_type_ident();
                Expr::new(ExprKind::New(ty), start)
            }
            Token::Ident(name) => {
                self.advance();
                if self.eat(Token::LParen) {
                    let args = self.parse_args();
                    let end = self.current_span();
                    self.expect(Token::RParen, "')'");
                    Expr::new(ExprKind::Call { method: name, args }, start.to(end))
                } else {
                    Expr::new(ExprKind::Ident(name), start)
                }
            }
            Token::LParen => {
                self.advance();
                if self.eat(Token::RParen) {
                    return Expr::new(ExprKind::UnitLiteral, start.to(self.prev_span()));
                }
                let inner = self.parse_expr();
                let end = self.current_span();
                self.expect(Token::RParen, "')'");
                Expr::new(inner.kind, start.to(end))
            }
            Token::LBrace => self.parse_block(),
            other => {
                self.handler
                    .error(format!("unexpected token {other:?} in expression"), start);
                self.advance();
                Expr::new(ExprKind::UnitLiteral, start)
            }
        }
    }

    fn parse_block(&mut self) -> Expr {
        let start = self.current_span();
        self.expect(Token::LBrace, "'{'");
        let mut exprs = Vec::new();
        if !self.check(&Token::RBrace) {
            exprs.push(self.parse_expr());
            while self.eat(Token::Semicolon) {
                exprs.push(self.parse_expr());
            }
        }
        let end = self.current_span();
        self.expect(Token::RBrace, "'}'");
        Expr::new(ExprKind::Block(exprs), start.to(end))
    }

    fn prev_span(&self) -> Span {
        let idx = self.pos.saturating_sub(1);
        self.tokens[idx].span
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vsopc_lex::Lexer;

    fn parse(source: &str) -> (Program, usize) {
        let handler = Handler::new("test.vsop");
        let tokens = Lexer::new(source, &handler).tokenize();
        let program = Parser::new(tokens, &handler).parse_program();
        (program, handler.error_count())
    }

    #[test]
    fn parses_empty_main_class() {
        let (program, errors) = parse(
            "class Main { main(): int32 { 0 } }",
        );
        assert_eq!(errors, 0);
        assert_eq!(program.classes.len(), 1);
        assert_eq!(program.classes[0].methods.len(), 1);
        assert_eq!(program.classes[0].methods[0].formals.len(), 0);
    }

    #[test]
    fn parses_field_with_initializer_and_extends() {
        let (program, errors) = parse(
            "class Counter extends Object { count: int32 <- 0; }",
        );
        assert_eq!(errors, 0);
        let class = &program.classes[0];
        assert_eq!(class.parent.unwrap().as_str(), "Object");
        assert_eq!(class.fields.len(), 1);
        assert!(class.fields[0].init.is_some());
    }

    #[test]
    fn parses_if_while_let_and_assignment() {
        let (program, errors) = parse(
            "class Main { main(): int32 { \
             let x: int32 <- 0 in \
             while x < 10 do x <- x + 1; \
             if x = 10 then 0 else 1 } }",
        );
        assert_eq!(errors, 0);
        assert_eq!(program.classes[0].methods.len(), 1);
    }

    #[test]
    fn parses_method_call_chain_and_new() {
        let (program, errors) = parse(
            "class Main { main(): int32 { (new Main).helper(1, 2) } \
             helper(a: int32, b: int32): int32 { a + b } }",
        );
        assert_eq!(errors, 0);
        assert_eq!(program.classes[0].methods.len(), 2);
    }

    #[test]
    fn reports_error_on_missing_closing_brace() {
        let (_program, errors) = parse("class Main { main(): int32 { 0 }");
        assert!(errors > 0);
    }

    #[test]
    fn respects_operator_precedence() {
        let (program, errors) = parse("class Main { main(): int32 { 1 + 2 * 3 } }");
        assert_eq!(errors, 0);
        let body = &program.classes[0].methods[0].body;
        match &body.kind {
            ExprKind::Block(exprs) => match &exprs[0].kind {
                ExprKind::BinOp(BinOp::Add, _, rhs) => {
                    assert!(matches!(rhs.kind, ExprKind::BinOp(BinOp::Mul, _, _)));
                }
                other => panic!("expected Add at top level, got {other:?}"),
            },
            other => panic!("expected Block, got {other:?}"),
        }
    }
}
