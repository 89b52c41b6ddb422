//! Statement parser with precedence climbing for expressions.
//!
//! Statements may be separated by `;` but need not be. A bare expression
//! followed by `=` becomes an assignment when it is an identifier.

use crate::ast::*;
use crate::error::ParseError;
use crate::lexer::Lexer;
use crate::token::{Token, TokenKind};

/// Parse a whole fragment.
///
/// ```
/// use quill_parser::parse_program;
///
/// let prog = parse_program("let x = 1 + 2").unwrap();
/// assert_eq!(prog.stmts.len(), 1);
/// ```
pub fn parse_program(source: &str) -> Result<Program, ParseError> {
    let mut parser = Parser::new(Lexer::tokenize(source)?);
    let stmts = parser.stmts_until(TokenKind::Eof)?;
    Ok(Program { stmts })
}

/// Parse exactly one braced block.
///
/// ```
/// use quill_parser::parse_block;
///
/// let block = parse_block("{ let a = 1; a + 1 }").unwrap();
/// assert_eq!(block.stmts.len(), 2);
/// ```
pub fn parse_block(source: &str) -> Result<Block, ParseError> {
    let mut parser = Parser::new(Lexer::tokenize(source)?);
    let block = parser.block()?;
    parser.consume(TokenKind::Eof)?;
    Ok(block)
}

/// Binding strength, weakest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Prec {
    Lowest,
    Or,
    And,
    Compare,
    Sum,
    Product,
    Prefix,
}

impl Prec {
    fn of_infix(kind: TokenKind) -> Option<Prec> {
        use TokenKind::*;
        Some(match kind {
            Or => Prec::Or,
            And => Prec::And,
            Eq | Neq | Lt | Le | Gt | Ge => Prec::Compare,
            Plus | Minus => Prec::Sum,
            Star | Slash | Percent => Prec::Product,
            _ => return None,
        })
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    /// `tokens` must end with `Eof`, as `Lexer::tokenize` guarantees.
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn kind(&self) -> TokenKind {
        self.current().kind
    }

    fn span(&self) -> Span {
        self.current().span.clone()
    }

    fn bump(&mut self) -> Token {
        let token = self.current().clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn check(&mut self, kind: TokenKind) -> bool {
        let hit = self.kind() == kind;
        if hit {
            self.bump();
        }
        hit
    }

    fn error_here(&self, expected: &str) -> ParseError {
        let token = self.current();
        ParseError::at(format!("expected {expected}, found `{}`", token.shown()), &token.span)
    }

    fn consume(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        if self.kind() == kind {
            Ok(self.bump())
        } else {
            Err(self.error_here(&format!("`{}`", kind.describe())))
        }
    }

    fn ident(&mut self) -> Result<String, ParseError> {
        if self.kind() == TokenKind::Ident {
            Ok(self.bump().lexeme)
        } else {
            Err(self.error_here("identifier"))
        }
    }

    /// Comma-separated items up to and including `)`. A trailing comma is fine.
    fn parenthesized<T>(
        &mut self,
        mut item: impl FnMut(&mut Self) -> Result<T, ParseError>,
    ) -> Result<Vec<T>, ParseError> {
        let mut items = Vec::new();
        while self.kind() != TokenKind::RParen {
            items.push(item(self)?);
            if !self.check(TokenKind::Comma) {
                break;
            }
        }
        self.consume(TokenKind::RParen)?;
        Ok(items)
    }

    fn stmts_until(&mut self, end: TokenKind) -> Result<Vec<Stmt>, ParseError> {
        let mut stmts = Vec::new();
        while self.kind() != end && self.kind() != TokenKind::Eof {
            stmts.push(self.stmt()?);
            self.check(TokenKind::Semicolon);
        }
        Ok(stmts)
    }

    fn block(&mut self) -> Result<Block, ParseError> {
        let span = self.consume(TokenKind::LBrace)?.span;
        let stmts = self.stmts_until(TokenKind::RBrace)?;
        self.consume(TokenKind::RBrace)?;
        Ok(Block { stmts, span })
    }

    // --- statements ---

    fn stmt(&mut self) -> Result<Stmt, ParseError> {
        match self.kind() {
            TokenKind::Let => self.binding(false),
            TokenKind::Mut => self.binding(true),
            TokenKind::Fn => self.fn_decl(),
            TokenKind::Return => {
                let span = self.bump().span;
                let value = if self.kind().starts_expr() {
                    Some(self.expr()?)
                } else {
                    None
                };
                Ok(Stmt::Return { value, span })
            }
            TokenKind::While => {
                let span = self.bump().span;
                let condition = self.expr()?;
                let body = self.block()?;
                Ok(Stmt::While {
                    condition,
                    body,
                    span,
                })
            }
            _ => self.expr_or_assignment(),
        }
    }

    fn binding(&mut self, mutable: bool) -> Result<Stmt, ParseError> {
        let span = self.bump().span;
        let name = self.ident()?;
        self.consume(TokenKind::Assign)?;
        let value = self.expr()?;
        Ok(if mutable {
            Stmt::MutDecl { name, value, span }
        } else {
            Stmt::LetDecl { name, value, span }
        })
    }

    fn fn_decl(&mut self) -> Result<Stmt, ParseError> {
        let span = self.bump().span;
        let name = self.ident()?;
        self.consume(TokenKind::LParen)?;
        let params = self.parenthesized(Self::ident)?;
        let body = self.block()?;
        Ok(Stmt::FnDecl {
            name,
            params,
            body,
            span,
        })
    }

    fn expr_or_assignment(&mut self) -> Result<Stmt, ParseError> {
        let target = self.expr()?;
        if self.kind() != TokenKind::Assign {
            return Ok(Stmt::Expr(target));
        }
        let span = target.span().clone();
        if !matches!(target, Expr::Ident { .. }) {
            return Err(ParseError::at("invalid assignment target", &span));
        }
        self.bump();
        let value = self.expr()?;
        Ok(Stmt::Assignment {
            target,
            value,
            span,
        })
    }

    // --- expressions ---

    fn expr(&mut self) -> Result<Expr, ParseError> {
        self.expr_above(Prec::Lowest)
    }

    /// Parse operators binding tighter than `min`; operators of equal
    /// strength associate to the left.
    fn expr_above(&mut self, min: Prec) -> Result<Expr, ParseError> {
        let mut lhs = self.prefix()?;
        loop {
            if self.kind() == TokenKind::LParen {
                lhs = self.call(lhs)?;
                continue;
            }
            let kind = self.kind();
            let (Some(prec), Some(op)) = (Prec::of_infix(kind), kind.binary_op()) else {
                break;
            };
            if prec <= min {
                break;
            }
            self.bump();
            let rhs = self.expr_above(prec)?;
            let span = lhs.span().clone();
            lhs = Expr::BinOp {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                span,
            };
            if prec == Prec::Compare && Prec::of_infix(self.kind()) == Some(Prec::Compare) {
                return Err(ParseError::at(
                    "comparison operators cannot be chained; use `&&` to combine: `a < b && b < c`",
                    &self.current().span,
                ));
            }
        }
        Ok(lhs)
    }

    fn prefix(&mut self) -> Result<Expr, ParseError> {
        let op = match self.kind() {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Not => UnaryOp::Not,
            _ => return self.atom(),
        };
        let span = self.bump().span;
        let operand = Box::new(self.expr_above(Prec::Prefix)?);
        Ok(Expr::UnaryOp { op, operand, span })
    }

    fn atom(&mut self) -> Result<Expr, ParseError> {
        let span = self.span();
        let expr = match self.kind() {
            TokenKind::Integer => Expr::Number {
                value: self.bump().lexeme,
                span,
            },
            TokenKind::StringLit => Expr::StringLit {
                value: self.bump().lexeme,
                span,
            },
            TokenKind::Ident => Expr::Ident {
                name: self.bump().lexeme,
                span,
            },
            TokenKind::True | TokenKind::False => Expr::Bool {
                value: self.bump().kind == TokenKind::True,
                span,
            },
            TokenKind::Nil => {
                self.bump();
                Expr::Nil { span }
            }
            TokenKind::LParen => {
                self.bump();
                let inner = self.expr()?;
                self.consume(TokenKind::RParen)?;
                inner
            }
            TokenKind::LBrace => Expr::Block(self.block()?),
            TokenKind::If => self.if_expr()?,
            _ => return Err(self.error_here("expression")),
        };
        Ok(expr)
    }

    fn call(&mut self, callee: Expr) -> Result<Expr, ParseError> {
        let span = callee.span().clone();
        self.bump();
        let args = self.parenthesized(Self::expr)?;
        Ok(Expr::Call {
            callee: Box::new(callee),
            args,
            span,
        })
    }

    fn if_expr(&mut self) -> Result<Expr, ParseError> {
        let span = self.consume(TokenKind::If)?.span;
        let condition = Box::new(self.expr()?);
        let then_block = self.block()?;
        let else_branch = if !self.check(TokenKind::Else) {
            None
        } else if self.kind() == TokenKind::If {
            Some(ElseBranch::If(Box::new(self.if_expr()?)))
        } else {
            Some(ElseBranch::Block(self.block()?))
        };
        Ok(Expr::If {
            condition,
            then_block,
            else_branch,
            span,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_number() {
        let prog = parse_program("42").unwrap();
        assert_eq!(prog.stmts.len(), 1);
        match &prog.stmts[0] {
            Stmt::Expr(Expr::Number { value, .. }) => assert_eq!(value, "42"),
            other => panic!("expected Number, got {other:?}"),
        }
    }

    #[test]
    fn parse_negative_number() {
        let prog = parse_program("-7").unwrap();
        match &prog.stmts[0] {
            Stmt::Expr(Expr::UnaryOp {
                op: UnaryOp::Neg,
                operand,
                ..
            }) => {
                assert!(matches!(operand.as_ref(), Expr::Number { value, .. } if value == "7"));
            }
            other => panic!("expected UnaryOp, got {other:?}"),
        }
    }

    #[test]
    fn parse_let_decl() {
        let prog = parse_program("let x = 5").unwrap();
        match &prog.stmts[0] {
            Stmt::LetDecl { name, value, .. } => {
                assert_eq!(name, "x");
                assert!(matches!(value, Expr::Number { .. }));
            }
            other => panic!("expected LetDecl, got {other:?}"),
        }
    }

    #[test]
    fn parse_binary_precedence() {
        let prog = parse_program("1 + 2 * 3").unwrap();
        match &prog.stmts[0] {
            Stmt::Expr(Expr::BinOp {
                op: BinOp::Add,
                rhs,
                ..
            }) => {
                assert!(matches!(rhs.as_ref(), Expr::BinOp { op: BinOp::Mul, .. }));
            }
            other => panic!("expected Add at the root, got {other:?}"),
        }
    }

    #[test]
    fn parse_function_call() {
        let prog = parse_program("max(1, 2,)").unwrap();
        match &prog.stmts[0] {
            Stmt::Expr(Expr::Call { callee, args, .. }) => {
                assert!(matches!(callee.as_ref(), Expr::Ident { name, .. } if name == "max"));
                assert_eq!(args.len(), 2);
            }
            other => panic!("expected Call, got {other:?}"),
        }
    }

    #[test]
    fn parse_assignment_requires_identifier() {
        let err = parse_program("f() = 1").unwrap_err();
        assert_eq!(err.message, "invalid assignment target");
    }

    #[test]
    fn chained_comparison_is_rejected() {
        let err = parse_program("a < b < c").unwrap_err();
        assert!(err.message.contains("cannot be chained"));
    }

    #[test]
    fn parse_block_rejects_trailing_tokens() {
        assert!(parse_block("{ 1 } 2").is_err());
    }
}
