//! Runtime values.
//!
//! [`Object`] is the tagged union every evaluation produces: integers, strings,
//! lists, dicts, closures ([`Lambda`]), native callables ([`Module`]) and the two
//! markers `_` ([`Object::Wildcard`], the `case` default) and `*`
//! ([`Object::Unwrap`], argument splat). Equality is structural, which is what
//! dict key lookup and `case` pattern matching rely on.
//!
//! Closures and modules sit behind `Arc`, so copying a frame (which closure
//! creation does) never deep-copies the closures stored in it.

use std::fmt;
use std::sync::Arc;

use crate::ast::{Expr, Name};
use crate::{Error, MAX_OBJECT_DEPTH};
use crate::frame::Frame;
use crate::module::Module;

/// Integer type of the language
pub type Int = i64;

/// User-defined function: parameters, body and the captured frame snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Lambda {
    pub params: Vec<Name>,
    pub body: Expr,
    /// Copy of the defining frame taken when the lambda was created
    pub frame: Frame,
    depth: usize,
}

impl Lambda {
    /// Fails when the captured frame holds values nested too deeply to wrap
    pub fn new(params: Vec<Name>, body: Expr, frame: Frame) -> Result<Self, Error> {
        let depth = 1 + frame.values().map(Object::depth).max().unwrap_or(0);
        check_depth(depth)?;
        Ok(Lambda {
            params,
            body,
            frame,
            depth,
        })
    }
}

impl fmt::Display for Lambda {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(lambda")?;
        for param in &self.params {
            write!(f, " {param}")?;
        }
        write!(f, " {})", self.body)
    }
}

/// Mapping from objects to objects with structural key comparison.
///
/// Keys are compared with `Object`'s `PartialEq`, so lookups are linear; dicts
/// in this language are small records rather than bulk storage.
#[derive(Debug, Clone, Default)]
pub struct Dict {
    entries: Vec<(Object, Object)>,
}

impl Dict {
    pub fn new() -> Self {
        Dict::default()
    }

    pub fn get(&self, key: &Object) -> Option<&Object> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Insert or replace; returns the previous value for the key
    pub fn insert(&mut self, key: Object, value: Object) -> Option<Object> {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &Object> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Object, &Object)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }
}

impl PartialEq for Dict {
    fn eq(&self, other: &Self) -> bool {
        // Insertion order is not part of a dict's identity
        self.len() == other.len()
            && self
                .entries
                .iter()
                .all(|(k, v)| other.get(k).is_some_and(|ov| ov == v))
    }
}

impl FromIterator<(Object, Object)> for Dict {
    fn from_iter<I: IntoIterator<Item = (Object, Object)>>(iter: I) -> Self {
        let mut dict = Dict::new();
        for (k, v) in iter {
            dict.insert(k, v);
        }
        dict
    }
}

/// Core value type of the runtime
#[derive(Clone)]
pub enum Object {
    Int(Int),
    String(String),
    List(Vec<Object>),
    Dict(Dict),
    Lambda(Arc<Lambda>),
    Module(Module),
    /// `_`: matches anything in `case` pattern position
    Wildcard,
    /// `*`: splices the following list into an extension's argument list
    Unwrap,
}

impl Object {
    /// The empty list, returned by forms that have no useful value
    pub fn nil() -> Self {
        Object::List(Vec::new())
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Object::Int(_) => "int",
            Object::String(_) => "string",
            Object::List(_) => "list",
            Object::Dict(_) => "dict",
            Object::Lambda(_) => "lambda",
            Object::Module(_) => "module",
            Object::Wildcard => "wildcard",
            Object::Unwrap => "unwrap",
        }
    }

    /// Nesting depth: 0 for scalars, one more than the deepest element for
    /// containers. Closures carry the depth of their captured frame.
    pub fn depth(&self) -> usize {
        match self {
            Object::List(items) => 1 + items.iter().map(Object::depth).max().unwrap_or(0),
            Object::Dict(dict) => {
                1 + dict
                    .iter()
                    .map(|(k, v)| k.depth().max(v.depth()))
                    .max()
                    .unwrap_or(0)
            }
            Object::Lambda(lambda) => lambda.depth,
            _ => 0,
        }
    }

    /// Pass the object through if it is within [`MAX_OBJECT_DEPTH`]
    pub fn within_depth_limit(self) -> Result<Self, Error> {
        check_depth(self.depth())?;
        Ok(self)
    }
}

fn check_depth(depth: usize) -> Result<(), Error> {
    if depth > MAX_OBJECT_DEPTH {
        return Err(Error::EvalError(format!(
            "object nested deeper than {MAX_OBJECT_DEPTH} levels"
        )));
    }
    Ok(())
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Object::Int(n) => write!(f, "Int({n})"),
            Object::String(s) => write!(f, "String({s:?})"),
            Object::List(items) => {
                write!(f, "List(")?;
                for (i, v) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v:?}")?;
                }
                write!(f, ")")
            }
            Object::Dict(dict) => {
                write!(f, "Dict(")?;
                for (i, (k, v)) in dict.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k:?} => {v:?}")?;
                }
                write!(f, ")")
            }
            Object::Lambda(lambda) => write!(
                f,
                "Lambda(params={:?}, body={})",
                lambda.params, lambda.body
            ),
            Object::Module(module) => write!(f, "Module({})", module.name()),
            Object::Wildcard => write!(f, "Wildcard"),
            Object::Unwrap => write!(f, "Unwrap"),
        }
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Object::Int(a), Object::Int(b)) => a == b,
            (Object::String(a), Object::String(b)) => a == b,
            (Object::List(a), Object::List(b)) => a == b,
            (Object::Dict(a), Object::Dict(b)) => a == b,
            (Object::Lambda(a), Object::Lambda(b)) => Arc::ptr_eq(a, b) || a == b,
            // Modules compare by name, not by function pointer
            (Object::Module(a), Object::Module(b)) => a.name() == b.name(),
            (Object::Wildcard, Object::Wildcard) | (Object::Unwrap, Object::Unwrap) => true,
            _ => false,
        }
    }
}

/// Writes a string literal that the tokenizer reads back unchanged
pub(crate) fn write_quoted(f: &mut impl fmt::Write, s: &str) -> fmt::Result {
    f.write_char('"')?;
    for ch in s.chars() {
        match ch {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            '\r' => f.write_str("\\r")?,
            c => f.write_char(c)?,
        }
    }
    f.write_char('"')
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Object::Int(n) => write!(f, "{n}"),
            Object::String(s) => write_quoted(f, s),
            // Bracket form re-parses to (list ...)
            Object::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Object::Dict(dict) => {
                write!(f, "(dict")?;
                for (k, v) in dict.iter() {
                    write!(f, " {k} {v}")?;
                }
                write!(f, ")")
            }
            Object::Lambda(lambda) => write!(f, "{lambda}"),
            Object::Module(module) => write!(f, "#<module:{}>", module.name()),
            Object::Wildcard => write!(f, "_"),
            Object::Unwrap => write!(f, "*"),
        }
    }
}

impl From<&str> for Object {
    fn from(s: &str) -> Self {
        Object::String(s.to_owned())
    }
}

impl From<String> for Object {
    fn from(s: String) -> Self {
        Object::String(s)
    }
}

macro_rules! impl_from_integer {
    ($int_type:ty) => {
        impl From<$int_type> for Object {
            fn from(n: $int_type) -> Self {
                Object::Int(Int::from(n))
            }
        }
    };
}

impl_from_integer!(i8);
impl_from_integer!(i16);
impl_from_integer!(i32);
impl_from_integer!(Int);
impl_from_integer!(u8);
impl_from_integer!(u16);
impl_from_integer!(u32);

impl From<usize> for Object {
    fn from(n: usize) -> Self {
        // Lengths beyond i64::MAX cannot be built in memory
        Object::Int(Int::try_from(n).unwrap_or(Int::MAX))
    }
}

impl<T: Into<Object>> From<Vec<T>> for Object {
    fn from(v: Vec<T>) -> Self {
        Object::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Object>, const N: usize> From<[T; N]> for Object {
    fn from(arr: [T; N]) -> Self {
        Object::List(arr.into_iter().map(Into::into).collect())
    }
}

impl From<Dict> for Object {
    fn from(d: Dict) -> Self {
        Object::Dict(d)
    }
}

impl From<Module> for Object {
    fn from(m: Module) -> Self {
        Object::Module(m)
    }
}

impl TryFrom<Object> for Int {
    type Error = Error;

    fn try_from(o: Object) -> Result<Int, Error> {
        match o {
            Object::Int(n) => Ok(n),
            other => Err(Error::TypeMismatch(format!(
                "expected int, found {}",
                other.type_name()
            ))),
        }
    }
}

impl TryFrom<Object> for String {
    type Error = Error;

    fn try_from(o: Object) -> Result<String, Error> {
        match o {
            Object::String(s) => Ok(s),
            other => Err(Error::TypeMismatch(format!(
                "expected string, found {}",
                other.type_name()
            ))),
        }
    }
}

impl TryFrom<Object> for Vec<Object> {
    type Error = Error;

    fn try_from(o: Object) -> Result<Vec<Object>, Error> {
        match o {
            Object::List(items) => Ok(items),
            other => Err(Error::TypeMismatch(format!(
                "expected list, found {}",
                other.type_name()
            ))),
        }
    }
}

impl TryFrom<Object> for Dict {
    type Error = Error;

    fn try_from(o: Object) -> Result<Dict, Error> {
        match o {
            Object::Dict(d) => Ok(d),
            other => Err(Error::TypeMismatch(format!(
                "expected dict, found {}",
                other.type_name()
            ))),
        }
    }
}

fn looks_like_integer(text: &str) -> bool {
    let digits = text
        .strip_prefix('-')
        .or_else(|| text.strip_prefix('+'))
        .unwrap_or(text);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Decode the body of a quoted token (quotes included), resolving escapes.
pub(crate) fn decode_string_literal(raw: &str) -> Result<String, Error> {
    let mut chars = raw.chars();
    let quote = chars
        .next()
        .filter(|c| *c == '"' || *c == '\'')
        .ok_or_else(|| Error::EvalError(format!("not a string literal: {raw}")))?;
    let body = chars.as_str();
    let body = body
        .strip_suffix(quote)
        .ok_or_else(|| Error::EvalError(format!("unterminated string literal: {raw}")))?;

    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            Some(other) => {
                return Err(Error::EvalError(format!(
                    "unknown escape sequence \\{other} in {raw}"
                )));
            }
            None => {
                return Err(Error::EvalError(format!(
                    "dangling escape at end of {raw}"
                )));
            }
        }
    }
    Ok(out)
}

/// Resolve a name as a literal.
///
/// Tries, in order: `_`, `*`, a decimal integer, then a quoted string.
/// `Ok(None)` means the name is a variable reference.
pub fn parse_literal(name: &Name) -> Result<Option<Object>, Error> {
    let text = name.as_str();
    match text {
        "_" => return Ok(Some(Object::Wildcard)),
        "*" => return Ok(Some(Object::Unwrap)),
        _ => {}
    }

    if looks_like_integer(text) {
        return text
            .parse::<Int>()
            .map(|n| Some(Object::Int(n)))
            .map_err(|_| Error::EvalError(format!("integer literal out of range: {text}")));
    }

    if text.starts_with('"') || text.starts_with('\'') {
        return decode_string_literal(text).map(|s| Some(Object::String(s)));
    }

    Ok(None)
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;

    fn lit(text: &str) -> Result<Option<Object>, Error> {
        parse_literal(&Name::from(text))
    }

    #[test]
    fn test_parse_literal_data_driven() {
        let test_cases: Vec<(&str, Option<Object>)> = vec![
            ("_", Some(Object::Wildcard)),
            ("*", Some(Object::Unwrap)),
            ("0", Some(Object::from(0))),
            ("42", Some(Object::from(42))),
            ("-17", Some(Object::from(-17))),
            ("+5", Some(Object::from(5))),
            ("9223372036854775807", Some(Object::from(i64::MAX))),
            ("-9223372036854775808", Some(Object::from(i64::MIN))),
            ("\"hello\"", Some(Object::from("hello"))),
            ("'single'", Some(Object::from("single"))),
            (r#""a\"b""#, Some(Object::from("a\"b"))),
            (r#""tab\there""#, Some(Object::from("tab\there"))),
            (r#"'it\'s'"#, Some(Object::from("it's"))),
            ("\"\"", Some(Object::from(""))),
            // Variable references
            ("x", None),
            ("-", None),
            ("+", None),
            ("__", None),
            ("1a", None),
            ("-x", None),
        ];

        for (i, (input, expected)) in test_cases.into_iter().enumerate() {
            assert_eq!(lit(input).unwrap(), expected, "Test case {} ({input})", i + 1);
        }
    }

    #[test]
    fn test_parse_literal_errors() {
        assert!(matches!(lit("99999999999999999999"), Err(Error::EvalError(_))));
        assert!(matches!(lit(r#""bad\q""#), Err(Error::EvalError(_))));
        assert!(matches!(lit("\"open"), Err(Error::EvalError(_))));
    }

    #[test]
    fn test_structural_equality() {
        assert_eq!(Object::from([1, 2, 3]), Object::from(vec![1, 2, 3]));
        assert_ne!(Object::from([1, 2]), Object::from([2, 1]));
        assert_ne!(Object::from(1), Object::from("1"));
        assert_eq!(Object::Wildcard, Object::Wildcard);
        assert_ne!(Object::Wildcard, Object::Unwrap);

        let a: Dict = [(Object::from("x"), Object::from(1)), (Object::from(2), Object::from("y"))]
            .into_iter()
            .collect();
        let b: Dict = [(Object::from(2), Object::from("y")), (Object::from("x"), Object::from(1))]
            .into_iter()
            .collect();
        assert_eq!(Object::Dict(a.clone()), Object::Dict(b));

        let mut c = a;
        c.insert(Object::from("x"), Object::from(5));
        assert_eq!(c.len(), 2);
        assert_eq!(c.get(&Object::from("x")), Some(&Object::from(5)));
    }

    #[test]
    fn test_display_round_trips_through_literals() {
        let s = Object::from("line\n\"quoted\"\\");
        let shown = format!("{s}");
        assert_eq!(shown, r#""line\n\"quoted\"\\""#);
        assert_eq!(lit(&shown).unwrap(), Some(s));

        assert_eq!(format!("{}", Object::from([1, 2, 3])), "[1 2 3]");
        assert_eq!(format!("{}", Object::nil()), "[]");
        assert_eq!(format!("{}", Object::Wildcard), "_");
    }
}
