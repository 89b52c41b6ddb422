//! Token kinds and their surface spelling.

use crate::ast::{BinOp, Span};

#[derive(Clone, Debug)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// Source text for identifiers and numbers (underscores removed), raw
    /// contents for strings, the spelling for everything else.
    pub lexeme: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Integer,
    StringLit,
    Ident,

    Let,
    Mut,
    If,
    Else,
    While,
    Fn,
    Return,
    Nil,
    True,
    False,

    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Eq,
    Neq,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Not,
    Assign,

    LParen,
    RParen,
    LBrace,
    RBrace,
    Comma,
    Semicolon,

    Eof,
}

const KEYWORDS: &[(&str, TokenKind)] = &[
    ("let", TokenKind::Let),
    ("mut", TokenKind::Mut),
    ("if", TokenKind::If),
    ("else", TokenKind::Else),
    ("while", TokenKind::While),
    ("fn", TokenKind::Fn),
    ("return", TokenKind::Return),
    ("nil", TokenKind::Nil),
    ("true", TokenKind::True),
    ("false", TokenKind::False),
];

/// Operators and delimiters, longest spelling first so `==` wins over `=`.
pub(crate) const PUNCTUATION: &[(&str, TokenKind)] = &[
    ("==", TokenKind::Eq),
    ("!=", TokenKind::Neq),
    ("<=", TokenKind::Le),
    (">=", TokenKind::Ge),
    ("&&", TokenKind::And),
    ("||", TokenKind::Or),
    ("+", TokenKind::Plus),
    ("-", TokenKind::Minus),
    ("*", TokenKind::Star),
    ("/", TokenKind::Slash),
    ("%", TokenKind::Percent),
    ("<", TokenKind::Lt),
    (">", TokenKind::Gt),
    ("!", TokenKind::Not),
    ("=", TokenKind::Assign),
    ("(", TokenKind::LParen),
    (")", TokenKind::RParen),
    ("{", TokenKind::LBrace),
    ("}", TokenKind::RBrace),
    (",", TokenKind::Comma),
    (";", TokenKind::Semicolon),
];

impl TokenKind {
    pub fn keyword(word: &str) -> Option<TokenKind> {
        KEYWORDS
            .iter()
            .find(|(spelling, _)| *spelling == word)
            .map(|&(_, kind)| kind)
    }

    /// How the kind reads in an error message.
    pub fn describe(self) -> &'static str {
        match self {
            TokenKind::Integer => "integer",
            TokenKind::StringLit => "string",
            TokenKind::Ident => "identifier",
            TokenKind::Eof => "end of file",
            other => KEYWORDS
                .iter()
                .chain(PUNCTUATION)
                .find(|&&(_, kind)| kind == other)
                .map_or("token", |&(spelling, _)| spelling),
        }
    }

    pub fn binary_op(self) -> Option<BinOp> {
        Some(match self {
            TokenKind::Plus => BinOp::Add,
            TokenKind::Minus => BinOp::Sub,
            TokenKind::Star => BinOp::Mul,
            TokenKind::Slash => BinOp::Div,
            TokenKind::Percent => BinOp::Mod,
            TokenKind::Eq => BinOp::Eq,
            TokenKind::Neq => BinOp::Neq,
            TokenKind::Lt => BinOp::Lt,
            TokenKind::Le => BinOp::Le,
            TokenKind::Gt => BinOp::Gt,
            TokenKind::Ge => BinOp::Ge,
            TokenKind::And => BinOp::And,
            TokenKind::Or => BinOp::Or,
            _ => return None,
        })
    }

    pub fn starts_expr(self) -> bool {
        matches!(
            self,
            TokenKind::Integer
                | TokenKind::StringLit
                | TokenKind::Ident
                | TokenKind::True
                | TokenKind::False
                | TokenKind::Nil
                | TokenKind::LParen
                | TokenKind::LBrace
                | TokenKind::Minus
                | TokenKind::Not
                | TokenKind::If
        )
    }
}

impl Token {
    /// The token as quoted in "found `...`".
    pub fn shown(&self) -> &str {
        if self.kind == TokenKind::Eof || self.lexeme.is_empty() {
            self.kind.describe()
        } else {
            &self.lexeme
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_resolve() {
        assert_eq!(TokenKind::keyword("while"), Some(TokenKind::While));
        assert_eq!(TokenKind::keyword("whilst"), None);
    }

    #[test]
    fn descriptions() {
        assert_eq!(TokenKind::Ge.describe(), ">=");
        assert_eq!(TokenKind::Return.describe(), "return");
        assert_eq!(TokenKind::Eof.describe(), "end of file");
    }
}
