use std::ops::Range;

use crate::ast::{CompareOp, Node, NodeKind, RecordEntry};
use crate::parser::error::CompileError;
use crate::parser::lexer::{Token, TokenKind, tokenize};

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Parse a block of separator-delimited statements.
pub fn parse_block(source: &str) -> Result<Vec<Node>, CompileError> {
    let tokens = tokenize(source)?;
    let mut parser = ExprParser::new(tokens, source.len());
    let mut statements = Vec::new();

    while !parser.at_end() {
        statements.push(parser.parse_expr()?);
        if parser.at_end() {
            break;
        }
        parser.expect(TokenKind::Separator, "end of statement")?;
    }

    Ok(statements)
}

/// Parse exactly one expression.
pub fn parse_single(source: &str) -> Result<Node, CompileError> {
    let mut statements = parse_block(source)?;
    match statements.len() {
        1 => Ok(statements.remove(0)),
        n => Err(CompileError::new(
            crate::parser::CompileErrorKind::ExpectedSingle(n),
            0..source.len(),
        )),
    }
}

// ---------------------------------------------------------------------------
// Recursive descent parser
// ---------------------------------------------------------------------------
//
// Precedence, loosest first:
//   or  →  and  →  not  →  comparison (== != < <= > >= in, not in)
//   →  unary (- ~)  →  postfix (call, subscript)  →  primary

struct ExprParser {
    tokens: Vec<Token>,
    pos: usize,
    source_len: usize,
}

impl ExprParser {
    fn new(tokens: Vec<Token>, source_len: usize) -> Self {
        ExprParser {
            tokens,
            pos: 0,
            source_len,
        }
    }

    fn peek(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    fn peek_second(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos + 1).map(|t| &t.kind)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// Span of the current token, or an empty span at end of input.
    fn here(&self) -> Range<usize> {
        self.tokens
            .get(self.pos)
            .map(|t| t.span.clone())
            .unwrap_or(self.source_len..self.source_len)
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek() == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token, CompileError> {
        match self.advance() {
            Some(t) if t.kind == kind => Ok(t),
            Some(t) => Err(CompileError::syntax(
                format!("expected {}, found {}", what, describe_token(&t.kind)),
                t.span,
            )),
            None => Err(CompileError::syntax(
                format!("expected {}, found end of input", what),
                self.here(),
            )),
        }
    }

    fn parse_expr(&mut self) -> Result<Node, CompileError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Node, CompileError> {
        let first = self.parse_and()?;
        if self.peek() != Some(&TokenKind::Or) {
            return Ok(first);
        }
        let mut operands = vec![first];
        while self.eat(&TokenKind::Or) {
            operands.push(self.parse_and()?);
        }
        Ok(fold_span(operands, NodeKind::Or))
    }

    fn parse_and(&mut self) -> Result<Node, CompileError> {
        let first = self.parse_not()?;
        if self.peek() != Some(&TokenKind::And) {
            return Ok(first);
        }
        let mut operands = vec![first];
        while self.eat(&TokenKind::And) {
            operands.push(self.parse_not()?);
        }
        Ok(fold_span(operands, NodeKind::And))
    }

    fn parse_not(&mut self) -> Result<Node, CompileError> {
        if self.peek() == Some(&TokenKind::Not) {
            let start = self.here().start;
            self.advance();
            let operand = self.parse_not()?;
            let span = start..operand.span.end;
            return Ok(Node::new(NodeKind::Not(Box::new(operand)), span));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Node, CompileError> {
        let left = self.parse_unary()?;
        let Some(op) = self.comparison_operator() else {
            return Ok(left);
        };
        let right = self.parse_unary()?;
        if self.comparison_operator().is_some() {
            return Err(CompileError::unsupported(
                "chained comparison",
                left.span.start..self.here().end,
            ));
        }
        let span = left.span.start..right.span.end;
        Ok(Node::new(
            NodeKind::Compare {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            span,
        ))
    }

    /// Consume a comparison operator if one is next.
    fn comparison_operator(&mut self) -> Option<CompareOp> {
        let op = match self.peek()? {
            TokenKind::EqEq => CompareOp::Eq,
            TokenKind::BangEq => CompareOp::NotEq,
            TokenKind::Lt => CompareOp::Lt,
            TokenKind::LtEq => CompareOp::LtEq,
            TokenKind::Gt => CompareOp::Gt,
            TokenKind::GtEq => CompareOp::GtEq,
            TokenKind::In => CompareOp::In,
            TokenKind::Not if self.peek_second() == Some(&TokenKind::In) => {
                self.advance();
                CompareOp::NotIn
            }
            _ => return None,
        };
        self.advance();
        Some(op)
    }

    fn parse_unary(&mut self) -> Result<Node, CompileError> {
        let start = self.here().start;
        match self.peek() {
            Some(TokenKind::Minus) => {
                self.advance();
                let operand = self.parse_unary()?;
                let span = start..operand.span.end;
                Ok(match operand.kind {
                    NodeKind::Number(n) => Node::new(NodeKind::Number(-n), span),
                    _ => Node::new(NodeKind::Negate(Box::new(operand)), span),
                })
            }
            Some(TokenKind::Tilde) => {
                self.advance();
                let operand = self.parse_unary()?;
                let span = start..operand.span.end;
                match operand.kind {
                    NodeKind::Name(name) => Ok(Node::new(NodeKind::Capture(name), span)),
                    _ => Err(CompileError::syntax(
                        format!("'~' must be followed by a name, found {}", operand.describe()),
                        span,
                    )),
                }
            }
            _ => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> Result<Node, CompileError> {
        let mut node = self.parse_primary()?;
        loop {
            match self.peek() {
                Some(TokenKind::LParen) => {
                    self.advance();
                    let args = self.parse_items(TokenKind::RParen, ")", Self::parse_argument)?;
                    let end = self.expect(TokenKind::RParen, "')'")?.span.end;
                    let span = node.span.start..end;
                    node = Node::new(
                        NodeKind::Call {
                            function: Box::new(node),
                            args,
                        },
                        span,
                    );
                }
                Some(TokenKind::LBracket) => {
                    self.advance();
                    let items = self.parse_items(TokenKind::RBracket, "]", Self::parse_expr)?;
                    let end = self.expect(TokenKind::RBracket, "']'")?.span.end;
                    if items.is_empty() {
                        return Err(CompileError::syntax("empty subscript", node.span.start..end));
                    }
                    let span = node.span.start..end;
                    node = Node::new(
                        NodeKind::Subscript {
                            target: Box::new(node),
                            items,
                        },
                        span,
                    );
                }
                _ => return Ok(node),
            }
        }
    }

    fn parse_primary(&mut self) -> Result<Node, CompileError> {
        let token = self.advance().ok_or_else(|| {
            CompileError::syntax("unexpected end of expression", self.here())
        })?;
        let span = token.span.clone();

        match token.kind {
            TokenKind::Number(n) => Ok(Node::new(NodeKind::Number(n), span)),
            TokenKind::Str(s) => Ok(Node::new(NodeKind::Str(s), span)),
            TokenKind::True => Ok(Node::new(NodeKind::Bool(true), span)),
            TokenKind::False => Ok(Node::new(NodeKind::Bool(false), span)),
            TokenKind::Ident(name) => Ok(Node::new(NodeKind::Name(name), span)),

            TokenKind::LParen => {
                let inner = self.parse_expr()?;
                let end = self.expect(TokenKind::RParen, "')'")?.span.end;
                Ok(Node::new(inner.kind, span.start..end))
            }

            TokenKind::LBracket => {
                let elements = self.parse_items(TokenKind::RBracket, "]", Self::parse_element)?;
                let end = self.expect(TokenKind::RBracket, "']'")?.span.end;
                Ok(Node::new(NodeKind::List(elements), span.start..end))
            }

            TokenKind::LBrace => {
                let entries = self.parse_items(TokenKind::RBrace, "}", Self::parse_record_entry)?;
                let end = self.expect(TokenKind::RBrace, "'}'")?.span.end;
                Ok(Node::new(NodeKind::Record(entries), span.start..end))
            }

            other => Err(CompileError::syntax(
                format!("unexpected {}", describe_token(&other)),
                span,
            )),
        }
    }

    /// Comma-separated items up to (not including) `close`; trailing comma allowed.
    fn parse_items<T>(
        &mut self,
        close: TokenKind,
        close_text: &str,
        mut item: impl FnMut(&mut Self) -> Result<T, CompileError>,
    ) -> Result<Vec<T>, CompileError> {
        let mut items = Vec::new();
        while self.peek() != Some(&close) {
            if self.at_end() {
                return Err(CompileError::syntax(
                    format!("expected '{}', found end of input", close_text),
                    self.here(),
                ));
            }
            items.push(item(self)?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Ok(items)
    }

    /// List element: an expression or `*expr`.
    fn parse_element(&mut self) -> Result<Node, CompileError> {
        if self.peek() == Some(&TokenKind::Star) {
            let start = self.here().start;
            self.advance();
            let inner = self.parse_expr()?;
            let span = start..inner.span.end;
            return Ok(Node::new(NodeKind::Starred(Box::new(inner)), span));
        }
        self.parse_expr()
    }

    /// Call argument: an element or `name=expr`.
    fn parse_argument(&mut self) -> Result<Node, CompileError> {
        if let (Some(TokenKind::Ident(name)), Some(TokenKind::Assign)) = (self.peek(), self.peek_second()) {
            let name = name.clone();
            let start = self.here().start;
            self.advance();
            self.advance();
            let value = self.parse_expr()?;
            let span = start..value.span.end;
            return Ok(Node::new(
                NodeKind::Keyword {
                    name,
                    value: Box::new(value),
                },
                span,
            ));
        }
        self.parse_element()
    }

    fn parse_record_entry(&mut self) -> Result<RecordEntry, CompileError> {
        if self.eat(&TokenKind::DoubleStar) {
            return Ok(RecordEntry::Splat(self.parse_expr()?));
        }
        let key = self.parse_expr()?;
        self.expect(TokenKind::Colon, "':'")?;
        let value = self.parse_expr()?;
        Ok(RecordEntry::Pair(key, value))
    }
}

fn fold_span(operands: Vec<Node>, build: fn(Vec<Node>) -> NodeKind) -> Node {
    let start = operands.first().map(|n| n.span.start).unwrap_or(0);
    let end = operands.last().map(|n| n.span.end).unwrap_or(start);
    Node::new(build(operands), start..end)
}

fn describe_token(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Number(n) => format!("number {}", n),
        TokenKind::Str(s) => format!("string {:?}", s),
        TokenKind::Ident(name) => format!("name '{}'", name),
        TokenKind::Separator => "end of statement".to_string(),
        other => format!("{:?}", other),
    }
}
