//! Native callables.
//!
//! A [`Module`] is stored in a frame like any other object. It comes in two
//! flavours:
//!
//! - **Special** modules receive the unevaluated [`LambdaExpr`] and the runtime,
//!   and decide themselves which arguments to evaluate (`let`, `case`, `map`...).
//! - **Extensions** receive fully evaluated arguments. The evaluator evaluates
//!   them left to right, splices every `* <list>` pair in place, validates the
//!   arity and then calls the native function.
//!
//! Special modules return an [`Outcome`]: either a finished value, or an
//! expression the evaluator should continue with in the caller's tail position.

use std::fmt;
use std::sync::Arc;

use crate::Error;
use crate::ast::{Expr, LambdaExpr};
use crate::evaluator::{Runtime, StepContext};
use crate::object::Object;

/// Argument count accepted by a callable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly n arguments
    Exact(usize),
    /// At least n arguments
    AtLeast(usize),
    /// Between min and max arguments (inclusive)
    Range(usize, usize),
    /// Any number of arguments
    Any,
}

impl Arity {
    pub fn accepts(self, got: usize) -> bool {
        match self {
            Arity::Exact(n) => got == n,
            Arity::AtLeast(n) => got >= n,
            Arity::Range(min, max) => (min..=max).contains(&got),
            Arity::Any => true,
        }
    }

    pub fn validate(self, got: usize) -> Result<(), Error> {
        if self.accepts(got) {
            Ok(())
        } else {
            Err(Error::arity_error(self, got))
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "exactly {n}"),
            Arity::AtLeast(n) => write!(f, "at least {n}"),
            Arity::Range(min, max) => write!(f, "between {min} and {max}"),
            Arity::Any => write!(f, "any number of"),
        }
    }
}

/// Result of a special module
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Finished value
    Value(Object),
    /// Continue by evaluating this expression in the caller's position
    Eval(Expr),
}

impl From<Object> for Outcome {
    fn from(o: Object) -> Self {
        Outcome::Value(o)
    }
}

/// Signature of a special module: unevaluated call plus runtime access
pub type ModuleFn =
    dyn Fn(&mut Runtime, &LambdaExpr, StepContext<'_>) -> Result<Outcome, Error> + Send + Sync;

/// Canonical erased extension signature.
///
/// Extensions receive ownership of their (already spliced) argument vector.
pub type ExtensionFn = dyn Fn(Vec<Object>) -> Result<Object, Error> + Send + Sync;

/// How a module consumes its arguments
#[derive(Clone)]
pub enum ModuleKind {
    Special(Arc<ModuleFn>),
    Extension(Arc<ExtensionFn>),
}

impl fmt::Debug for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleKind::Special(_) => write!(f, "Special(<fn>)"),
            ModuleKind::Extension(_) => write!(f, "Extension(<fn>)"),
        }
    }
}

#[derive(Debug)]
struct ModuleDef {
    name: String,
    arity: Arity,
    man: String,
    kind: ModuleKind,
}

/// Named native callable.
///
/// Cloning is cheap: the definition is shared.
#[derive(Debug, Clone)]
pub struct Module(Arc<ModuleDef>);

impl Module {
    pub fn special<F>(name: impl Into<String>, arity: Arity, man: impl Into<String>, f: F) -> Self
    where
        F: Fn(&mut Runtime, &LambdaExpr, StepContext<'_>) -> Result<Outcome, Error>
            + Send
            + Sync
            + 'static,
    {
        Self::from_kind(name, arity, man, ModuleKind::Special(Arc::new(f)))
    }

    pub fn extension(
        name: impl Into<String>,
        arity: Arity,
        man: impl Into<String>,
        f: Arc<ExtensionFn>,
    ) -> Self {
        Self::from_kind(name, arity, man, ModuleKind::Extension(f))
    }

    fn from_kind(
        name: impl Into<String>,
        arity: Arity,
        man: impl Into<String>,
        kind: ModuleKind,
    ) -> Self {
        Module(Arc::new(ModuleDef {
            name: name.into(),
            arity,
            man: man.into(),
            kind,
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn arity(&self) -> Arity {
        self.0.arity
    }

    /// One-line manual entry
    pub fn man(&self) -> &str {
        &self.0.man
    }

    pub fn kind(&self) -> &ModuleKind {
        &self.0.kind
    }

    pub fn is_extension(&self) -> bool {
        matches!(self.0.kind, ModuleKind::Extension(_))
    }

    /// Call an extension with already evaluated arguments.
    ///
    /// Splices `*` markers and validates arity before invoking the native fn.
    pub fn invoke(&self, args: Vec<Object>) -> Result<Object, Error> {
        match self.kind() {
            ModuleKind::Extension(f) => {
                let args = splice_unwrap(args)?;
                self.arity().validate(args.len())?;
                f(args)?.within_depth_limit()
            }
            ModuleKind::Special(_) => Err(Error::TypeMismatch(format!(
                "{} takes unevaluated arguments and cannot be applied to values",
                self.name()
            ))),
        }
    }
}

/// Replace every `*` marker and the list that follows it with the list's elements
pub(crate) fn splice_unwrap(args: Vec<Object>) -> Result<Vec<Object>, Error> {
    if !args.iter().any(|a| matches!(a, Object::Unwrap)) {
        return Ok(args);
    }

    let mut out = Vec::with_capacity(args.len());
    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        if !matches!(arg, Object::Unwrap) {
            out.push(arg);
            continue;
        }
        match iter.next() {
            Some(Object::List(items)) => out.extend(items),
            Some(other) => {
                return Err(Error::TypeMismatch(format!(
                    "* must be followed by a list, found {}",
                    other.type_name()
                )));
            }
            None => {
                return Err(Error::TypeMismatch(
                    "* must be followed by a list, found end of arguments".into(),
                ));
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;

    #[test]
    fn test_arity_validation() {
        let test_cases = vec![
            (Arity::Exact(2), 2, true),
            (Arity::Exact(2), 1, false),
            (Arity::Exact(0), 0, true),
            (Arity::AtLeast(1), 0, false),
            (Arity::AtLeast(1), 5, true),
            (Arity::Range(1, 3), 0, false),
            (Arity::Range(1, 3), 3, true),
            (Arity::Range(1, 3), 4, false),
            (Arity::Any, 0, true),
        ];

        for (i, (arity, got, ok)) in test_cases.into_iter().enumerate() {
            assert_eq!(arity.validate(got).is_ok(), ok, "Test case {} failed", i + 1);
        }

        assert_eq!(
            Arity::Exact(2).validate(3),
            Err(Error::arity_error(Arity::Exact(2), 3))
        );
        assert_eq!(
            format!("{}", Error::arity_error(Arity::AtLeast(1), 0)),
            "ArityError: expected at least 1 arguments but got 0"
        );
    }

    #[test]
    fn test_splice_unwrap() {
        let spliced = splice_unwrap(vec![
            Object::from(1),
            Object::Unwrap,
            Object::from([2, 3]),
            Object::from(4),
            Object::Unwrap,
            Object::nil(),
        ])
        .unwrap();
        assert_eq!(spliced, vec![1, 2, 3, 4].into_iter().map(Object::from).collect::<Vec<_>>());

        assert!(matches!(
            splice_unwrap(vec![Object::Unwrap, Object::from(1)]),
            Err(Error::TypeMismatch(_))
        ));
        assert!(matches!(
            splice_unwrap(vec![Object::from(1), Object::Unwrap]),
            Err(Error::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_module_identity() {
        let f: Arc<ExtensionFn> = Arc::new(|args: Vec<Object>| Ok(Object::from(args.len())));
        let m = Module::extension("count", Arity::Any, "count arguments", f.clone());
        assert!(m.is_extension());
        assert_eq!(m.name(), "count");
        assert_eq!(m.man(), "count arguments");
        assert_eq!(
            m.invoke(vec![Object::Unwrap, Object::from([1, 2, 3])]).unwrap(),
            Object::from(3)
        );

        // Modules compare by name
        let other = Module::extension("count", Arity::Exact(0), "", f);
        assert_eq!(Object::Module(m), Object::Module(other));
    }
}
