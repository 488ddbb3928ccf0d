use crate::Error;
use crate::module::{Arity, ExtensionFn};
use crate::object::{Int, Object};
use std::iter::FusedIterator;
use std::marker::PhantomData;
use std::sync::Arc;

// Adapter layer that turns strongly-typed Rust functions into the erased
// `ExtensionFn` stored in extension modules. Builtins and
// `Runtime::register_extension` both go through here, so argument
// conversion errors look the same everywhere.

// =====================================================================
// Fixed parameter conversion
// =====================================================================

/// Turns one evaluated argument into a typed parameter.
///
/// `Param<'a>` may borrow from the argument slot (`&str`, typed list
/// iterators) or take it by value (`Object`, `i64`, `String`).
pub trait FromParam {
    type Param<'a>;

    fn from_arg<'a>(value: &'a mut Object) -> Result<Self::Param<'a>, Error>;
}

impl FromParam for Object {
    type Param<'a> = Object;

    fn from_arg<'a>(value: &'a mut Object) -> Result<Self::Param<'a>, Error> {
        // Move out so the builtin owns list/string payloads without cloning
        Ok(std::mem::replace(value, Object::nil()))
    }
}

// Scalar and container parameters convertible through `TryFrom<Object>`
// (i64, String, Vec<Object>, Dict).
impl<T> FromParam for T
where
    T: TryFrom<Object, Error = Error>,
{
    type Param<'a> = T;

    fn from_arg<'a>(value: &'a mut Object) -> Result<Self::Param<'a>, Error> {
        T::try_from(std::mem::replace(value, Object::nil()))
    }
}

impl FromParam for &str {
    type Param<'a> = &'a str;

    fn from_arg<'a>(value: &'a mut Object) -> Result<Self::Param<'a>, Error> {
        if let Object::String(s) = value {
            Ok(s.as_str())
        } else {
            Err(Error::TypeMismatch(format!(
                "expected string, found {}",
                value.type_name()
            )))
        }
    }
}

impl<'b, K> FromParam for TypedIter<'b, K>
where
    K: ElementKind,
{
    type Param<'a> = TypedIter<'a, K>;

    fn from_arg<'a>(value: &'a mut Object) -> Result<Self::Param<'a>, Error> {
        if let Object::List(items) = value {
            TypedIter::<K>::new(items.as_slice())
        } else {
            Err(Error::TypeMismatch(format!(
                "expected list, found {}",
                value.type_name()
            )))
        }
    }
}

// =====================================================================
// Typed iterators over argument slices
// =====================================================================

/// How to view an `Object` slice as a typed iterator: one upfront type
/// check, then an infallible projection per element.
#[doc(hidden)]
pub trait ElementKind {
    type Item<'a>;

    fn precheck(slice: &[Object]) -> Result<(), Error>;
    fn project<'a>(v: &'a Object) -> Option<Self::Item<'a>>;
}

#[doc(hidden)]
pub struct TypedIter<'a, K: ElementKind> {
    inner: std::slice::Iter<'a, Object>,
    _marker: PhantomData<K>,
}

impl<'a, K> TypedIter<'a, K>
where
    K: ElementKind,
{
    pub(crate) fn new(values: &'a [Object]) -> Result<Self, Error> {
        K::precheck(values)?;
        Ok(TypedIter {
            inner: values.iter(),
            _marker: PhantomData,
        })
    }
}

impl<'a, K> Iterator for TypedIter<'a, K>
where
    K: ElementKind,
{
    type Item = K::Item<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        // precheck guarantees every element projects
        K::project(self.inner.next()?)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K> ExactSizeIterator for TypedIter<'_, K> where K: ElementKind {}
impl<K> FusedIterator for TypedIter<'_, K> where K: ElementKind {}

#[doc(hidden)]
pub struct ObjectKind;

impl ElementKind for ObjectKind {
    type Item<'a> = &'a Object;

    fn precheck(_slice: &[Object]) -> Result<(), Error> {
        Ok(())
    }

    fn project<'a>(v: &'a Object) -> Option<Self::Item<'a>> {
        Some(v)
    }
}

#[doc(hidden)]
pub struct IntKind;

impl ElementKind for IntKind {
    type Item<'a> = Int;

    fn precheck(slice: &[Object]) -> Result<(), Error> {
        match slice.iter().find(|v| !matches!(v, Object::Int(_))) {
            Some(v) => Err(Error::TypeMismatch(format!(
                "expected int, found {}",
                v.type_name()
            ))),
            None => Ok(()),
        }
    }

    fn project<'a>(v: &'a Object) -> Option<Self::Item<'a>> {
        match v {
            Object::Int(n) => Some(*n),
            _ => None,
        }
    }
}

#[doc(hidden)]
pub struct StrKind;

impl ElementKind for StrKind {
    type Item<'a> = &'a str;

    fn precheck(slice: &[Object]) -> Result<(), Error> {
        match slice.iter().find(|v| !matches!(v, Object::String(_))) {
            Some(v) => Err(Error::TypeMismatch(format!(
                "expected string, found {}",
                v.type_name()
            ))),
            None => Ok(()),
        }
    }

    fn project<'a>(v: &'a Object) -> Option<Self::Item<'a>> {
        match v {
            Object::String(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

/// Any objects, by reference
pub type ObjIter<'a> = TypedIter<'a, ObjectKind>;

/// Integers; the whole slice is type checked before the first element
pub type IntIter<'a> = TypedIter<'a, IntKind>;

/// Strings; the whole slice is type checked before the first element
pub type StrIter<'a> = TypedIter<'a, StrKind>;

// =====================================================================
// Rest parameters
// =====================================================================

/// Builds the rest parameter of a variadic extension from the argument tail
pub trait FromRest {
    type Param<'a>;

    fn from_rest<'a>(slice: &'a [Object]) -> Result<Self::Param<'a>, Error>;
}

impl<K> FromRest for TypedIter<'static, K>
where
    K: ElementKind,
{
    type Param<'a> = TypedIter<'a, K>;

    fn from_rest<'a>(slice: &'a [Object]) -> Result<Self::Param<'a>, Error> {
        TypedIter::<K>::new(slice)
    }
}

// =====================================================================
// Return values
// =====================================================================

/// Normalizes builtin return types to `Result<Object, Error>`
pub trait IntoObjectResult {
    fn into_object_result(self) -> Result<Object, Error>;
}

impl<T> IntoObjectResult for Result<T, Error>
where
    T: Into<Object>,
{
    fn into_object_result(self) -> Result<Object, Error> {
        self.map(Into::into)
    }
}

impl<T> IntoObjectResult for T
where
    T: Into<Object>,
{
    fn into_object_result(self) -> Result<Object, Error> {
        Ok(self.into())
    }
}

/// Fixed-arity typed function → [`ExtensionFn`]
pub trait IntoExtension<Args> {
    /// Number of parameters in the Rust signature
    const ARITY: usize;

    fn into_extension(self) -> Arc<ExtensionFn>;
}

/// Typed function with a rest parameter (optionally after a fixed
/// prefix) → [`ExtensionFn`]. Total arity is declared separately at
/// registration since the signature only bounds it from below.
pub trait IntoVariadicExtension<Args> {
    fn into_variadic_extension(self) -> Arc<ExtensionFn>;
}

impl<F, I, R> IntoVariadicExtension<(I,)> for F
where
    I: FromRest,
    F: for<'a> Fn(<I as FromRest>::Param<'a>) -> R + Send + Sync + 'static,
    R: IntoObjectResult,
{
    fn into_variadic_extension(self) -> Arc<ExtensionFn> {
        Arc::new(move |args: Vec<Object>| {
            let rest_param: <I as FromRest>::Param<'_> = <I as FromRest>::from_rest(&args[..])?;
            (self)(rest_param).into_object_result()
        })
    }
}

macro_rules! impl_into_variadic_extension_for_prefix_and_rest {
    ($prefix:expr, $( $v:ident, $p:ident : $A:ident ),+ ) => {
        impl<F, I, R, $( $A ),+> IntoVariadicExtension<( $( $A, )+ I, )> for F
        where
            I: FromRest,
            $( $A: FromParam, )+
            F: for<'a> Fn(
                    $( <$A as FromParam>::Param<'a> ),+,
                    <I as FromRest>::Param<'a>,
                ) -> R
                + Send
                + Sync
                + 'static,
            R: IntoObjectResult,
        {
            fn into_variadic_extension(self) -> Arc<ExtensionFn> {
                Arc::new(move |mut args: Vec<Object>| {
                    let len = args.len();
                    match args.as_mut_slice() {
                        &mut [ $( ref mut $v ),+, ref mut rest @ .. ] => {
                            $(
                                let $p: <$A as FromParam>::Param<'_> =
                                    <$A as FromParam>::from_arg($v)?;
                            )+

                            let rest_param: <I as FromRest>::Param<'_> =
                                <I as FromRest>::from_rest(&*rest)?;

                            (self)( $( $p ),+, rest_param ).into_object_result()
                        }
                        _ => Err(Error::arity_error(Arity::AtLeast($prefix), len)),
                    }
                })
            }
        }
    };
}

impl_into_variadic_extension_for_prefix_and_rest!(1, v0, p0: A1);
impl_into_variadic_extension_for_prefix_and_rest!(2, v0, p0: A1, v1, p1: A2);
impl_into_variadic_extension_for_prefix_and_rest!(3, v0, p0: A1, v1, p1: A2, v2, p2: A3);

macro_rules! impl_into_extension_for_arity {
    ($arity:expr, $( $v:ident, $p:ident : $A:ident ),+ ) => {
        impl<F, R, $( $A ),+> IntoExtension<( $( $A, )+ )> for F
        where
            F: for<'a> Fn( $( <$A as FromParam>::Param<'a> ),+ ) -> R
                + Send
                + Sync
                + 'static,
            $( $A: FromParam, )+
            R: IntoObjectResult,
        {
            const ARITY: usize = $arity;

            fn into_extension(self) -> Arc<ExtensionFn> {
                Arc::new(move |mut args: Vec<Object>| {
                    let len = args.len();
                    match args.as_mut_slice() {
                        &mut [ $( ref mut $v ),+ ] => {
                            $(
                                let $p: <$A as FromParam>::Param<'_> =
                                    <$A as FromParam>::from_arg($v)?;
                            )+

                            (self)( $( $p ),+ ).into_object_result()
                        }
                        _ => Err(Error::arity_error(Arity::Exact($arity), len)),
                    }
                })
            }
        }
    };
}

impl<F, R> IntoExtension<()> for F
where
    F: Fn() -> R + Send + Sync + 'static,
    R: IntoObjectResult,
{
    const ARITY: usize = 0;

    fn into_extension(self) -> Arc<ExtensionFn> {
        Arc::new(move |args: Vec<Object>| {
            if !args.is_empty() {
                return Err(Error::arity_error(Arity::Exact(0), args.len()));
            }
            (self)().into_object_result()
        })
    }
}

impl_into_extension_for_arity!(1, v0, p0: A1);
impl_into_extension_for_arity!(2, v0, p0: A1, v1, p1: A2);
impl_into_extension_for_arity!(3, v0, p0: A1, v1, p1: A2, v2, p2: A3);
impl_into_extension_for_arity!(4, v0, p0: A1, v1, p1: A2, v2, p2: A3, v3, p3: A4);
