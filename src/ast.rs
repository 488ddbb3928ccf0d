//! Syntax tree produced by the parser.
//!
//! The grammar has exactly two node kinds: a [`Name`] (any atom, including
//! integer and string literals, `_` and `*`) and a [`LambdaExpr`], the
//! application `(head arg*)`. Whether a name is a literal or a variable is only
//! decided at evaluation time (see [`crate::object::parse_literal`]), and what a
//! call does depends on what its head resolves to.
//!
//! `Display` renders source text that the parser reads back into an equal tree.
//! Helper constructors (`name`, `call`) keep test trees short.

use std::borrow::Borrow;
use std::fmt;

/// Raw atom text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name(String);

impl Name {
    pub fn new(text: impl Into<String>) -> Self {
        Name(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Name {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Name {
    fn from(s: &str) -> Self {
        Name(s.to_owned())
    }
}

impl From<String> for Name {
    fn from(s: String) -> Self {
        Name(s)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Application node: `(head arg*)`
#[derive(Debug, Clone, PartialEq)]
pub struct LambdaExpr {
    pub head: Name,
    pub args: Vec<Expr>,
}

impl LambdaExpr {
    pub fn new(head: impl Into<Name>, args: Vec<Expr>) -> Self {
        LambdaExpr {
            head: head.into(),
            args,
        }
    }
}

impl fmt::Display for LambdaExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}", self.head)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        write!(f, ")")
    }
}

/// Expression: union of [`Name`] and [`LambdaExpr`]
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Name(Name),
    Call(LambdaExpr),
}

impl Expr {
    pub fn as_name(&self) -> Option<&Name> {
        match self {
            Expr::Name(name) => Some(name),
            Expr::Call(_) => None,
        }
    }
}

impl From<Name> for Expr {
    fn from(name: Name) -> Self {
        Expr::Name(name)
    }
}

impl From<LambdaExpr> for Expr {
    fn from(call: LambdaExpr) -> Self {
        Expr::Call(call)
    }
}

impl From<&str> for Expr {
    fn from(text: &str) -> Self {
        Expr::Name(Name::from(text))
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Name(name) => write!(f, "{name}"),
            Expr::Call(call) => write!(f, "{call}"),
        }
    }
}

/// Helper for building name nodes in tests
#[cfg_attr(not(test), expect(dead_code))]
pub(crate) fn name(text: &str) -> Expr {
    Expr::Name(Name::from(text))
}

/// Helper for building application nodes in tests.
/// Accepts anything convertible to `Expr` for the arguments, so mixed
/// `name(..)`/`call(..)`/`"atom"` lists read naturally.
#[cfg_attr(not(test), expect(dead_code))]
pub(crate) fn call<E: Into<Expr>>(head: &str, args: Vec<E>) -> Expr {
    Expr::Call(LambdaExpr::new(head, args.into_iter().map(Into::into).collect()))
}
