//! Turns fragment text into tokens in one left-to-right pass.

use crate::ast::Span;
use crate::error::ParseError;
use crate::token::{Token, TokenKind, PUNCTUATION};

pub struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    line: usize,
    col: usize,
}

impl<'a> Lexer<'a> {
    /// Tokenize `src`. The last token is always `Eof`.
    pub fn tokenize(src: &str) -> Result<Vec<Token>, ParseError> {
        let mut lexer = Lexer {
            src,
            pos: 0,
            line: 1,
            col: 1,
        };
        let mut tokens = Vec::new();
        loop {
            let token = lexer.token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn current(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.current()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn bump_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while self.current().is_some_and(&pred) {
            self.bump();
        }
        &self.src[start..self.pos]
    }

    fn here(&self) -> Span {
        Span {
            line: self.line,
            col: self.col,
        }
    }

    fn skip_trivia(&mut self) -> Result<(), ParseError> {
        loop {
            self.bump_while(char::is_whitespace);
            if self.rest().starts_with("//") {
                self.bump_while(|c| c != '\n');
            } else if self.rest().starts_with("/*") {
                let open = self.here();
                self.bump();
                self.bump();
                loop {
                    if self.rest().starts_with("*/") {
                        self.bump();
                        self.bump();
                        break;
                    }
                    if self.bump().is_none() {
                        return Err(ParseError::at("unterminated block comment", &open));
                    }
                }
            } else {
                return Ok(());
            }
        }
    }

    fn token(&mut self) -> Result<Token, ParseError> {
        self.skip_trivia()?;
        let span = self.here();
        let Some(c) = self.current() else {
            return Ok(Token {
                kind: TokenKind::Eof,
                span,
                lexeme: String::new(),
            });
        };

        let (kind, lexeme) = if c.is_ascii_digit() {
            let digits = self.bump_while(|c| c.is_ascii_digit() || c == '_');
            (TokenKind::Integer, digits.replace('_', ""))
        } else if c.is_ascii_alphabetic() || c == '_' {
            let word = self.bump_while(|c| c.is_ascii_alphanumeric() || c == '_');
            let kind = TokenKind::keyword(word).unwrap_or(TokenKind::Ident);
            (kind, word.to_string())
        } else if c == '"' {
            (TokenKind::StringLit, self.string(&span)?)
        } else {
            let rest = self.rest();
            let Some(&(spelling, kind)) = PUNCTUATION.iter().find(|(p, _)| rest.starts_with(p))
            else {
                return Err(ParseError::at(format!("unexpected character `{c}`"), &span));
            };
            for _ in spelling.chars() {
                self.bump();
            }
            (kind, spelling.to_string())
        };
        Ok(Token { kind, span, lexeme })
    }

    /// Raw string contents, escapes checked but kept as written.
    fn string(&mut self, open: &Span) -> Result<String, ParseError> {
        self.bump();
        let mut raw = String::new();
        loop {
            match self.bump() {
                None => return Err(ParseError::at("unterminated string literal", open)),
                Some('"') => return Ok(raw),
                Some('\\') => {
                    let at = self.here();
                    match self.bump() {
                        Some(esc @ ('"' | '\\' | 'n' | 'r' | 't' | '0')) => {
                            raw.push('\\');
                            raw.push(esc);
                        }
                        Some(other) => {
                            return Err(ParseError::at(
                                format!("invalid escape sequence `\\{other}`"),
                                &at,
                            ))
                        }
                        None => return Err(ParseError::at("unterminated string literal", open)),
                    }
                }
                Some(c) => raw.push(c),
            }
        }
    }
}

/// Resolve the escapes the lexer left in a string literal.
pub fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('0') => out.push('\0'),
            Some(c @ ('"' | '\\')) => out.push(c),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::tokenize(src)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn simple_tokens() {
        assert_eq!(
            kinds("let x = 1 + 2;"),
            vec![
                TokenKind::Let,
                TokenKind::Ident,
                TokenKind::Assign,
                TokenKind::Integer,
                TokenKind::Plus,
                TokenKind::Integer,
                TokenKind::Semicolon,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn two_char_operators() {
        assert_eq!(
            kinds("== != <= >= && || < > ! ="),
            vec![
                TokenKind::Eq,
                TokenKind::Neq,
                TokenKind::Le,
                TokenKind::Ge,
                TokenKind::And,
                TokenKind::Or,
                TokenKind::Lt,
                TokenKind::Gt,
                TokenKind::Not,
                TokenKind::Assign,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn keywords_and_identifiers() {
        assert_eq!(
            kinds("fn while return mut nil truthy"),
            vec![
                TokenKind::Fn,
                TokenKind::While,
                TokenKind::Return,
                TokenKind::Mut,
                TokenKind::Nil,
                TokenKind::Ident,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            kinds("1 // line\n/* block\n */ 2"),
            vec![TokenKind::Integer, TokenKind::Integer, TokenKind::Eof]
        );
    }

    #[test]
    fn unterminated_block_comment() {
        let err = Lexer::tokenize("1 /* open").unwrap_err();
        assert_eq!(err.message, "unterminated block comment");
        assert_eq!((err.line, err.col), (1, 3));
    }

    #[test]
    fn underscores_in_numbers() {
        let toks = Lexer::tokenize("1_000_000").unwrap();
        assert_eq!(toks[0].lexeme, "1000000");
    }

    #[test]
    fn string_with_escapes_and_utf8() {
        let toks = Lexer::tokenize(r#""héllo\n""#).unwrap();
        assert_eq!(toks[0].kind, TokenKind::StringLit);
        assert_eq!(toks[0].lexeme, "héllo\\n");
        assert_eq!(unescape(&toks[0].lexeme), "héllo\n");
    }

    #[test]
    fn invalid_escape_is_rejected() {
        let err = Lexer::tokenize(r#""\q""#).unwrap_err();
        assert!(err.message.contains("invalid escape"));
    }

    #[test]
    fn lone_ampersand_is_rejected() {
        let err = Lexer::tokenize("a & b").unwrap_err();
        assert_eq!(err.message, "unexpected character `&`");
    }

    #[test]
    fn spans_track_lines() {
        let toks = Lexer::tokenize("a\n  b").unwrap();
        assert_eq!(toks[1].span, Span { line: 2, col: 3 });
    }
}
