//! Tokens to expressions.
//!
//! Grammar: `(head expr*)` is an application, `[expr*]` is shorthand for
//! `(list expr*)`, and any other token is a [`Name`].
//!
//! [`parse`] is the batch entry point: the whole token sequence must form
//! complete expressions. [`Parser`] is the incremental one used by
//! interactive front-ends. It buffers tokens until the buffer starts with a
//! complete expression; running out of tokens mid-expression is not an error
//! there, only a reason to wait.

use crate::ast::{Expr, LambdaExpr, Name};
use crate::lexer::{Token, tokenize};
use crate::{Error, MAX_PARSE_DEPTH, ParseError, ParseErrorKind};

fn incomplete(what: &str) -> ParseError {
    ParseError::from_message(ParseErrorKind::Incomplete, format!("unexpected end of input in {what}"))
}

/// Parse one expression starting at `pos`; returns it and the position after it
fn parse_expr(tokens: &[Token], pos: usize, depth: usize) -> Result<(Expr, usize), ParseError> {
    if depth >= MAX_PARSE_DEPTH {
        return Err(ParseError::from_message(
            ParseErrorKind::TooDeeplyNested,
            format!("expression too deeply nested (max depth: {MAX_PARSE_DEPTH})"),
        ));
    }

    let Some(token) = tokens.get(pos) else {
        return Err(incomplete("expression"));
    };

    match token.as_str() {
        "(" => {
            let head = match tokens.get(pos + 1).map(String::as_str) {
                None => return Err(incomplete("application")),
                Some(")") => {
                    return Err(ParseError::with_found(
                        ParseErrorKind::InvalidSyntax,
                        "empty application: expected a name after '('",
                        ")",
                    ));
                }
                Some(t @ ("(" | "[" | "]")) => {
                    return Err(ParseError::with_found(
                        ParseErrorKind::InvalidSyntax,
                        "application head must be a name",
                        t,
                    ));
                }
                Some(t) => Name::from(t),
            };
            let (args, next) = parse_sequence(tokens, pos + 2, depth, ")")?;
            Ok((Expr::Call(LambdaExpr::new(head, args)), next))
        }
        "[" => {
            let (items, next) = parse_sequence(tokens, pos + 1, depth, "]")?;
            Ok((Expr::Call(LambdaExpr::new("list", items)), next))
        }
        t @ (")" | "]") => Err(ParseError::with_found(
            ParseErrorKind::InvalidSyntax,
            "unexpected closing delimiter",
            t,
        )),
        t => Ok((Expr::Name(Name::from(t)), pos + 1)),
    }
}

/// Parse expressions up to and including the `close` delimiter
fn parse_sequence(
    tokens: &[Token],
    mut pos: usize,
    depth: usize,
    close: &str,
) -> Result<(Vec<Expr>, usize), ParseError> {
    let mut items = Vec::new();
    loop {
        match tokens.get(pos).map(String::as_str) {
            None => return Err(incomplete(if close == ")" { "application" } else { "list" })),
            Some(t) if t == close => return Ok((items, pos + 1)),
            Some(t @ (")" | "]")) => {
                return Err(ParseError::with_found(
                    ParseErrorKind::InvalidSyntax,
                    format!("mismatched delimiter: expected '{close}'"),
                    t,
                ));
            }
            Some(_) => {
                let (expr, next) = parse_expr(tokens, pos, depth + 1)?;
                items.push(expr);
                pos = next;
            }
        }
    }
}

/// Parse a complete token sequence.
///
/// Running out of tokens inside an expression is a
/// [`ParseErrorKind::Incomplete`] parse error here.
pub fn parse(tokens: &[Token]) -> Result<Vec<Expr>, Error> {
    let mut exprs = Vec::new();
    let mut pos = 0;
    while pos < tokens.len() {
        let (expr, next) = parse_expr(tokens, pos, 0)?;
        exprs.push(expr);
        pos = next;
    }
    Ok(exprs)
}

/// Tokenize and parse source text
pub fn parse_str(text: &str) -> Result<Vec<Expr>, Error> {
    parse(&tokenize(text)?)
}

/// Incremental parser fed one token at a time.
#[derive(Debug, Clone, Default)]
pub struct Parser {
    buffer: Vec<Token>,
}

impl Parser {
    pub fn new() -> Self {
        Parser::default()
    }

    /// Append a token and try to parse one expression from the buffer start.
    ///
    /// Returns `Ok(None)` while the expression is incomplete. On malformed
    /// input the buffer is discarded and the error returned.
    pub fn input(&mut self, token: Token) -> Result<Option<Expr>, Error> {
        self.buffer.push(token);
        match parse_expr(&self.buffer, 0, 0) {
            Ok((expr, consumed)) => {
                self.buffer.drain(..consumed);
                Ok(Some(expr))
            }
            Err(e) if e.is_incomplete() => Ok(None),
            Err(e) => {
                tracing::debug!(pending = self.buffer.len(), "discarding malformed parser buffer");
                self.buffer.clear();
                Err(e.into())
            }
        }
    }

    /// Feed several tokens, collecting every expression completed along the way
    pub fn input_all(&mut self, tokens: impl IntoIterator<Item = Token>) -> Result<Vec<Expr>, Error> {
        let mut exprs = Vec::new();
        for token in tokens {
            if let Some(expr) = self.input(token)? {
                exprs.push(expr);
            }
        }
        Ok(exprs)
    }

    /// Discard any partially entered expression
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Tokens waiting for the rest of their expression
    pub fn pending(&self) -> &[Token] {
        &self.buffer
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}
