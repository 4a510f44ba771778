use std::ops::Range;

use crate::parser::error::CompileError;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Number(f64),
    Str(String),
    True,
    False,

    Ident(String),

    // Keywords
    And,
    Or,
    Not,
    In,

    // Operators
    Tilde,
    Star,
    DoubleStar,
    Minus,
    Assign, // =
    EqEq,
    BangEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Comma,
    Colon,

    // Grouping
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,

    // Statement separators: `;` or a line break outside brackets
    Separator,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Range<usize>,
}

/// Split a ptag source block into tokens.
///
/// Line breaks inside `()`, `[]` and `{}` are insignificant; at depth zero
/// they separate statements. Runs of separators collapse into one and
/// leading/trailing separators are dropped.
pub fn tokenize(source: &str) -> Result<Vec<Token>, CompileError> {
    let mut lexer = Lexer {
        source,
        pos: 0,
        depth: 0,
        tokens: Vec::new(),
    };
    lexer.run()?;
    Ok(lexer.tokens)
}

struct Lexer<'a> {
    source: &'a str,
    pos: usize,
    depth: usize,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn peek(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        let mut chars = self.source[self.pos..].chars();
        chars.next();
        chars.next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn push(&mut self, kind: TokenKind, start: usize) {
        self.tokens.push(Token {
            kind,
            span: start..self.pos,
        });
    }

    fn push_separator(&mut self, start: usize) {
        let redundant = matches!(
            self.tokens.last(),
            None | Some(Token {
                kind: TokenKind::Separator,
                ..
            })
        );
        if !redundant {
            self.push(TokenKind::Separator, start);
        }
    }

    fn run(&mut self) -> Result<(), CompileError> {
        while let Some(c) = self.peek() {
            let start = self.pos;
            match c {
                '\n' | '\r' => {
                    self.bump();
                    if self.depth == 0 {
                        self.push_separator(start);
                    }
                }
                ';' => {
                    self.bump();
                    self.push_separator(start);
                }
                c if c.is_whitespace() => {
                    self.bump();
                }
                '#' => {
                    while let Some(c) = self.peek() {
                        if c == '\n' || c == '\r' {
                            break;
                        }
                        self.bump();
                    }
                }
                '"' | '\'' => self.string(c)?,
                '0'..='9' => self.number()?,
                '.' if self.peek_second().is_some_and(|d| d.is_ascii_digit()) => self.number()?,
                c if c.is_alphabetic() || c == '_' => self.word(),
                _ => self.punct(c)?,
            }
        }

        if matches!(
            self.tokens.last(),
            Some(Token {
                kind: TokenKind::Separator,
                ..
            })
        ) {
            self.tokens.pop();
        }
        Ok(())
    }

    fn string(&mut self, quote: char) -> Result<(), CompileError> {
        let start = self.pos;
        self.bump();
        let mut value = String::new();
        loop {
            let Some(c) = self.bump() else {
                return Err(CompileError::syntax(
                    "unterminated string literal",
                    start..self.pos,
                ));
            };
            match c {
                '\\' => {
                    let at = self.pos - 1;
                    let escaped = self.bump().ok_or_else(|| {
                        CompileError::syntax("unterminated string literal", start..self.pos)
                    })?;
                    value.push(match escaped {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        '\\' | '\'' | '"' => escaped,
                        other => {
                            return Err(CompileError::syntax(
                                format!("unknown escape '\\{}'", other),
                                at..self.pos,
                            ));
                        }
                    });
                }
                '\n' | '\r' => {
                    return Err(CompileError::syntax(
                        "line break inside string literal",
                        start..self.pos,
                    ));
                }
                c if c == quote => break,
                c => value.push(c),
            }
        }
        self.push(TokenKind::Str(value), start);
        Ok(())
    }

    fn number(&mut self) -> Result<(), CompileError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || c == '.' || c == '_' {
                self.bump();
            } else if (c == 'e' || c == 'E')
                && self
                    .peek_second()
                    .is_some_and(|d| d.is_ascii_digit() || d == '-' || d == '+')
            {
                self.bump();
                self.bump();
            } else {
                break;
            }
        }
        let text: String = self.source[start..self.pos]
            .chars()
            .filter(|c| *c != '_')
            .collect();
        let value = text.parse::<f64>().map_err(|_| {
            CompileError::syntax(format!("invalid number literal '{}'", text), start..self.pos)
        })?;
        if !value.is_finite() {
            return Err(CompileError::syntax("number literal out of range", start..self.pos));
        }
        self.push(TokenKind::Number(value), start);
        Ok(())
    }

    fn word(&mut self) {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.bump();
            } else {
                break;
            }
        }
        let kind = match &self.source[start..self.pos] {
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "not" => TokenKind::Not,
            "in" => TokenKind::In,
            "True" => TokenKind::True,
            "False" => TokenKind::False,
            word => TokenKind::Ident(word.to_string()),
        };
        self.push(kind, start);
    }

    fn punct(&mut self, c: char) -> Result<(), CompileError> {
        let start = self.pos;
        self.bump();
        let next = self.peek();
        let kind = match (c, next) {
            ('=', Some('=')) => {
                self.bump();
                TokenKind::EqEq
            }
            ('!', Some('=')) => {
                self.bump();
                TokenKind::BangEq
            }
            ('<', Some('=')) => {
                self.bump();
                TokenKind::LtEq
            }
            ('>', Some('=')) => {
                self.bump();
                TokenKind::GtEq
            }
            ('*', Some('*')) => {
                self.bump();
                TokenKind::DoubleStar
            }
            ('=', _) => TokenKind::Assign,
            ('<', _) => TokenKind::Lt,
            ('>', _) => TokenKind::Gt,
            ('*', _) => TokenKind::Star,
            ('~', _) => TokenKind::Tilde,
            ('-', _) => TokenKind::Minus,
            (',', _) => TokenKind::Comma,
            (':', _) => TokenKind::Colon,
            ('(', _) | ('[', _) | ('{', _) => {
                self.depth += 1;
                match c {
                    '(' => TokenKind::LParen,
                    '[' => TokenKind::LBracket,
                    _ => TokenKind::LBrace,
                }
            }
            (')', _) | (']', _) | ('}', _) => {
                self.depth = self.depth.saturating_sub(1);
                match c {
                    ')' => TokenKind::RParen,
                    ']' => TokenKind::RBracket,
                    _ => TokenKind::RBrace,
                }
            }
            _ => {
                return Err(CompileError::syntax(
                    format!("unexpected character '{}'", c),
                    start..self.pos,
                ));
            }
        };
        self.push(kind, start);
        Ok(())
    }
}
