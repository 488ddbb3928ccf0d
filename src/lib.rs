//! fplang - a small S-expression language runtime
//!
//! This crate provides a tokenizer, a batch and incremental parser, and a
//! tree-walking evaluator over a stack of lexical frames. Native callables are
//! plugged in as *modules* (which receive their call syntax unevaluated and
//! decide what to evaluate) or *extensions* (which receive fully evaluated
//! arguments).
//!
//! ```text
//! (let y 1)
//! (let f (lambda x (add x y)))   // f captures y = 1
//! (let y 2)
//! (f 5)                          // 6
//! (case (sign (sub 3 5)) 1 "pos" 0 "zero" _ "neg")
//! (add * [1 2 3] 4)              // splat: (add 1 2 3 4)
//! ```
//!
//! ## Evaluation model
//!
//! - The global frame (index 0 of the [`frame::Stack`]) holds every built-in and
//!   every top-level `let`.
//! - Lambdas capture a *copy* of the frame they were created in; later changes
//!   to that frame are never observed by the closure.
//! - Calls in tail position reuse the current top frame instead of pushing a
//!   new one, so tail-recursive functions run in constant stack.
//! - Evaluation polls a [`cancel::CancelToken`] at every step and stops with
//!   [`Error::Interrupt`] or [`Error::Timeout`].
//!
//! ## Modules
//!
//! - `lexer`: text to tokens
//! - `parser`: tokens to expressions, batch or one token at a time
//! - `evaluator`: the runtime and its `step` function
//! - `builtins`: the built-in modules and extensions
//! - `json`: JSON rendering of objects and stacks for tooling

use std::fmt;

use crate::module::Arity;

/// Maximum nesting depth accepted by the parser
pub const MAX_PARSE_DEPTH: usize = 256;

/// Maximum number of frames on the stack before evaluation fails with
/// [`Error::StackOverflow`]
pub const MAX_STACK_DEPTH: usize = 1000;

/// Maximum number of nested native evaluation steps.
/// Bounds recursion that does not push frames (e.g. through extension arguments).
pub const MAX_EVAL_DEPTH: usize = 10_000;

/// Maximum nesting depth of a list, dict or closure chain built by evaluation.
/// Cloning, dropping and printing objects recurse natively, so deeper values
/// are refused when constructed.
pub const MAX_OBJECT_DEPTH: usize = 512;

/// Categorizes the different kinds of parsing errors.
#[derive(Debug, PartialEq, Clone)]
pub enum ParseErrorKind {
    /// Invalid or unexpected syntax (stray closing delimiter, bad escape, missing head)
    InvalidSyntax,
    /// Input ended before the expression was complete (unclosed parens, unterminated string)
    Incomplete,
    /// Expression nesting exceeded [`MAX_PARSE_DEPTH`]
    TooDeeplyNested,
}

/// A structured error providing detailed information about a parsing failure.
#[derive(Debug, PartialEq, Clone)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    /// Context snippet from the input showing where the error occurred (max 100 chars)
    pub context: Option<String>,
    /// The problematic token or character encountered, if identifiable
    pub found: Option<String>,
}

impl ParseError {
    pub fn new(
        kind: ParseErrorKind,
        message: impl Into<String>,
        context: Option<String>,
        found: Option<String>,
    ) -> Self {
        ParseError {
            kind,
            message: message.into(),
            context,
            found,
        }
    }

    /// Create a ParseError with a kind and message but no context
    pub fn from_message(kind: ParseErrorKind, message: impl Into<String>) -> Self {
        Self::new(kind, message, None, None)
    }

    /// Create a ParseError naming the offending token
    pub fn with_found(
        kind: ParseErrorKind,
        message: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::new(kind, message, None, Some(found.into()))
    }

    /// Create a ParseError with context extracted from input at a given char offset
    pub fn with_context(
        kind: ParseErrorKind,
        message: impl Into<String>,
        input: &str,
        error_offset: usize,
    ) -> Self {
        const MAX_CONTEXT: usize = 100;

        let context_start = error_offset.saturating_sub(20);
        let context_str: String = input
            .chars()
            .skip(context_start)
            .take(MAX_CONTEXT)
            .collect();

        let mut display_context = String::new();
        if context_start > 0 {
            display_context.push_str("[...]");
        }
        display_context.push_str(&context_str);
        if context_start + context_str.chars().count() < input.chars().count() {
            display_context.push_str("[...]");
        }

        // Keep the snippet on one line
        let display_context = display_context.replace('\n', "\\n").replace('\r', "");

        Self::new(kind, message, Some(display_context), None)
    }

    /// True when more input could still complete the expression
    pub fn is_incomplete(&self) -> bool {
        self.kind == ParseErrorKind::Incomplete
    }
}

/// Error types for the runtime
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    ParseError(ParseError),
    /// A name resolved neither to a literal nor to any binding on the stack
    NameNotFound(String),
    TypeMismatch(String),
    ArityError {
        expected: Arity,
        got: usize,
        expression: Option<String>,
    },
    DivisionByZero,
    /// 1-based index outside the list
    IndexOutOfRange {
        index: i64,
        len: usize,
    },
    NoCaseMatched(String),
    StackOverflow,
    Timeout,
    Interrupt,
    /// Malformed special-form usage, integer overflow and other evaluation failures
    EvalError(String),
}

impl Error {
    /// Create an ArityError without expression context
    pub fn arity_error(expected: Arity, got: usize) -> Self {
        Error::ArityError {
            expected,
            got,
            expression: None,
        }
    }

    /// Create an ArityError with expression context
    pub fn arity_error_with_expr(expected: Arity, got: usize, expression: String) -> Self {
        Error::ArityError {
            expected,
            got,
            expression: Some(expression),
        }
    }

    /// Attach call context to an arity error that has none yet
    pub(crate) fn with_expression(self, expression: impl FnOnce() -> String) -> Self {
        match self {
            Error::ArityError {
                expected,
                got,
                expression: None,
            } => Error::arity_error_with_expr(expected, got, expression()),
            other => other,
        }
    }
}

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Self {
        Error::ParseError(e)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::ParseError(e) => {
                write!(f, "ParseError: {}", e.message)?;
                if let Some(found) = &e.found {
                    write!(f, "\nFound: {found}")?;
                }
                if let Some(context) = &e.context {
                    write!(f, "\nContext: {context}")?;
                }
                Ok(())
            }
            Error::NameNotFound(name) => write!(f, "NameNotFound: object not found {name}"),
            Error::TypeMismatch(msg) => write!(f, "TypeMismatch: {msg}"),
            Error::ArityError {
                expected,
                got,
                expression,
            } => match expression {
                Some(expr) => write!(
                    f,
                    "ArityError: expression {expr}: expected {expected} arguments, got {got}"
                ),
                None => write!(f, "ArityError: expected {expected} arguments but got {got}"),
            },
            Error::DivisionByZero => write!(f, "DivisionByZero: division by zero"),
            Error::IndexOutOfRange { index, len } => write!(
                f,
                "IndexOutOfRange: index {index} outside 1..={len}"
            ),
            Error::NoCaseMatched(expr) => write!(f, "NoCaseMatched: no case matched {expr}"),
            Error::StackOverflow => write!(f, "StackOverflow: stack overflow"),
            Error::Timeout => write!(f, "Timeout: evaluation deadline exceeded"),
            Error::Interrupt => write!(f, "Interrupt: interrupted"),
            Error::EvalError(msg) => write!(f, "EvaluationError: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

pub mod ast;
pub mod builtins;
pub mod cancel;
pub mod evaluator;
pub mod frame;
pub mod intooperation;
pub mod lexer;
pub mod module;
pub mod object;
pub mod parser;

#[cfg(feature = "json")]
pub mod json;

pub use ast::{Expr, LambdaExpr, Name};
pub use cancel::CancelToken;
pub use evaluator::{Runtime, RuntimeConfig, StepContext};
pub use lexer::{Token, tokenize};
pub use object::Object;
pub use parser::{Parser, parse, parse_str};
