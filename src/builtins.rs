//! Built-in modules and extensions.
//!
//! ## Special modules
//!
//! These receive their call unevaluated and control evaluation themselves:
//!
//! ```text
//! (let name expr+)          ; bind in the top frame, value of the last expr
//! (del name expr*)          ; evaluate exprs, then remove the binding
//! (lambda param* body)      ; closure over a copy of the top frame
//! (case x pat res ...)      ; first pattern equal to x (or `_`) selects res
//! (map list f)              ; apply f to every element
//! (reset) / (kaboom)        ; drop every frame above the global one
//! (stack expr*)             ; snapshot of all frames
//! (print expr*)             ; write values to the runtime output
//! ```
//!
//! ## Extensions
//!
//! Everything else takes evaluated arguments and is wired through the
//! typed adapters in [`crate::intooperation`]. Integer arithmetic is checked:
//! overflow is an `EvalError`, never a wrap-around. Lists are indexed from 1
//! with closed intervals: `(slice l i j)` needs `1 <= i <= j <= (len l)`.

use std::sync::{Arc, LazyLock};

use crate::ast::{Expr, LambdaExpr, Name};
use crate::evaluator::{Runtime, StepContext};
use crate::frame::Frame;
use crate::intooperation::{IntIter, IntoExtension, IntoVariadicExtension, ObjIter};
use crate::module::{Arity, ExtensionFn, Module, ModuleKind, Outcome, splice_unwrap};
use crate::object::{Dict, Int, Lambda, Object, parse_literal};
use crate::Error;

/// Modules every runtime has, including `Runtime::plain`
const CORE_MODULES: [&str; 3] = ["let", "lambda", "case"];

/// Binding used for the element when `map` applies a special module
const MAP_ITEM: &str = "%map-item";

//
// Special modules
//

/// The bindable name in first position of `let`/`del`
fn binding_name<'e>(call: &'e LambdaExpr, expr: &'e Expr) -> Result<&'e Name, Error> {
    match expr {
        Expr::Name(name) if parse_literal(name)?.is_none() => Ok(name),
        Expr::Name(name) => Err(Error::EvalError(format!(
            "{}: cannot bind literal {name}",
            call.head
        ))),
        Expr::Call(_) => Err(Error::EvalError(format!(
            "{}: expected a name, found {expr}",
            call.head
        ))),
    }
}

fn eval_let(rt: &mut Runtime, call: &LambdaExpr, ctx: StepContext<'_>) -> Result<Outcome, Error> {
    let name = binding_name(call, &call.args[0])?.clone();
    let value = rt
        .eval_args(&call.args[1..], ctx)?
        .pop()
        .unwrap_or_else(Object::nil);
    rt.stack_mut().top_mut().insert(name, value.clone());
    Ok(Outcome::Value(value))
}

fn eval_del(rt: &mut Runtime, call: &LambdaExpr, ctx: StepContext<'_>) -> Result<Outcome, Error> {
    let name = binding_name(call, &call.args[0])?;
    for arg in &call.args[1..] {
        rt.eval(arg, ctx.arg())?;
    }
    rt.stack_mut().top_mut().remove(name.as_str());
    Ok(Outcome::Value(Object::nil()))
}

fn eval_lambda(rt: &mut Runtime, call: &LambdaExpr, _ctx: StepContext<'_>) -> Result<Outcome, Error> {
    let (body, params) = call
        .args
        .split_last()
        .ok_or_else(|| Error::arity_error_with_expr(Arity::AtLeast(1), 0, call.to_string()))?;

    let params = params
        .iter()
        .map(|param| binding_name(call, param).cloned())
        .collect::<Result<Vec<_>, _>>()?;

    let lambda = Lambda::new(params, body.clone(), rt.stack().top().clone())?;
    Ok(Outcome::Value(Object::Lambda(Arc::new(lambda))))
}

fn eval_case(rt: &mut Runtime, call: &LambdaExpr, ctx: StepContext<'_>) -> Result<Outcome, Error> {
    let (discriminant, arms) = call
        .args
        .split_first()
        .ok_or_else(|| Error::arity_error_with_expr(Arity::AtLeast(1), 0, call.to_string()))?;
    if arms.len() % 2 != 0 {
        return Err(Error::EvalError(format!(
            "case expects pattern/result pairs after the discriminant: {call}"
        )));
    }

    let value = rt.eval(discriminant, ctx.arg())?;
    for arm in arms.chunks_exact(2) {
        let pattern = rt.eval(&arm[0], ctx.arg())?;
        if pattern == Object::Wildcard || pattern == value {
            return Ok(Outcome::Eval(arm[1].clone()));
        }
    }
    Err(Error::NoCaseMatched(call.to_string()))
}

fn eval_reset(rt: &mut Runtime, _call: &LambdaExpr, _ctx: StepContext<'_>) -> Result<Outcome, Error> {
    rt.stack_mut().truncate_to_global();
    Ok(Outcome::Value(Object::nil()))
}

fn eval_map(rt: &mut Runtime, call: &LambdaExpr, ctx: StepContext<'_>) -> Result<Outcome, Error> {
    let items = match rt.eval(&call.args[0], ctx.arg())? {
        Object::List(items) => items,
        other => {
            return Err(Error::TypeMismatch(format!(
                "map expects a list as first argument, found {}",
                other.type_name()
            )));
        }
    };
    let func = rt.eval(&call.args[1], ctx.arg())?;

    let mut results = Vec::with_capacity(items.len());
    match func {
        Object::Lambda(lambda) => {
            if lambda.params.len() != 1 {
                return Err(Error::arity_error_with_expr(
                    Arity::Exact(1),
                    lambda.params.len(),
                    call.to_string(),
                ));
            }
            for item in items {
                results.push(rt.apply_lambda(&lambda, vec![item], call, ctx.arg())?);
            }
        }
        Object::Module(module) => {
            if !module.arity().accepts(1) {
                return Err(Error::arity_error_with_expr(module.arity(), 1, call.to_string()));
            }
            match module.kind() {
                ModuleKind::Extension(_) => {
                    for item in items {
                        results.push(module.invoke(vec![item])?);
                    }
                }
                ModuleKind::Special(f) => {
                    // Hand the element over through a scratch frame, as if
                    // the source had been `(module item)`
                    let synthetic = LambdaExpr::new(module.name(), vec![Expr::from(MAP_ITEM)]);
                    for item in items {
                        let frame: Frame = [(Name::from(MAP_ITEM), item)].into_iter().collect();
                        rt.stack_mut().push(frame);
                        let result = match f(rt, &synthetic, ctx.arg()) {
                            Ok(Outcome::Value(v)) => Ok(v),
                            Ok(Outcome::Eval(expr)) => rt.eval(&expr, ctx.arg()),
                            Err(e) => Err(e),
                        };
                        rt.stack_mut().pop();
                        results.push(result?);
                    }
                }
            }
        }
        other => {
            return Err(Error::TypeMismatch(format!(
                "map expects a lambda or module as second argument, found {}",
                other.type_name()
            )));
        }
    }
    Ok(Outcome::Value(Object::List(results).within_depth_limit()?))
}

fn eval_stack(rt: &mut Runtime, call: &LambdaExpr, ctx: StepContext<'_>) -> Result<Outcome, Error> {
    rt.eval_args(&call.args, ctx.arg())?;
    let frames = rt
        .stack()
        .frames()
        .iter()
        .map(|frame| {
            Object::Dict(
                frame
                    .sorted()
                    .into_iter()
                    .map(|(name, value)| (Object::from(name.as_str()), value.clone()))
                    .collect(),
            )
        })
        .collect();
    Ok(Outcome::Value(Object::List(frames).within_depth_limit()?))
}

/// Text `print` writes for a value: strings raw, everything else as source
fn print_text(value: &Object) -> String {
    match value {
        Object::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn eval_print(rt: &mut Runtime, call: &LambdaExpr, ctx: StepContext<'_>) -> Result<Outcome, Error> {
    let values = splice_unwrap(rt.eval_args(&call.args, ctx.arg())?)?;
    let line = values.iter().map(print_text).collect::<Vec<_>>().join(" ");
    rt.write_output(&line)?;
    Ok(Outcome::Value(Object::from(values.len())))
}

//
// Extensions
//

fn overflow(op: &str) -> Error {
    Error::EvalError(format!("integer overflow in {op}"))
}

fn builtin_add(mut values: IntIter<'_>) -> Result<Int, Error> {
    values.try_fold(0, |acc: Int, n| acc.checked_add(n).ok_or_else(|| overflow("add")))
}

fn builtin_sub(a: Int, b: Int) -> Result<Int, Error> {
    a.checked_sub(b).ok_or_else(|| overflow("sub"))
}

fn builtin_mul(mut values: IntIter<'_>) -> Result<Int, Error> {
    values.try_fold(1, |acc: Int, n| acc.checked_mul(n).ok_or_else(|| overflow("mul")))
}

fn builtin_div(a: Int, b: Int) -> Result<Int, Error> {
    if b == 0 {
        return Err(Error::DivisionByZero);
    }
    a.checked_div(b).ok_or_else(|| overflow("div"))
}

fn builtin_mod(a: Int, b: Int) -> Result<Int, Error> {
    if b == 0 {
        return Err(Error::DivisionByZero);
    }
    a.checked_rem(b).ok_or_else(|| overflow("mod"))
}

fn builtin_sign(n: Int) -> Int {
    n.signum()
}

fn builtin_tail(values: ObjIter<'_>) -> Result<Object, Error> {
    values
        .last()
        .cloned()
        .ok_or_else(|| Error::arity_error(Arity::AtLeast(1), 0))
}

fn builtin_list(args: Vec<Object>) -> Result<Object, Error> {
    Ok(Object::List(args))
}

fn builtin_append(mut list: Vec<Object>, values: ObjIter<'_>) -> Vec<Object> {
    list.extend(values.cloned());
    list
}

/// Convert a 1-based position to an index, if `1 <= pos <= len`
fn position(pos: Int, len: usize) -> Result<usize, Error> {
    usize::try_from(pos)
        .ok()
        .filter(|p| (1..=len).contains(p))
        .map(|p| p - 1)
        .ok_or(Error::IndexOutOfRange { index: pos, len })
}

fn builtin_slice(list: Vec<Object>, i: Int, j: Int) -> Result<Vec<Object>, Error> {
    let start = position(i, list.len())?;
    let end = position(j, list.len())?;
    if end < start {
        return Err(Error::IndexOutOfRange {
            index: j,
            len: list.len(),
        });
    }
    Ok(list[start..=end].to_vec())
}

fn builtin_peek(mut list: Vec<Object>, i: Int) -> Result<Object, Error> {
    let index = position(i, list.len())?;
    Ok(list.swap_remove(index))
}

fn builtin_len(value: Object) -> Result<usize, Error> {
    match value {
        Object::List(items) => Ok(items.len()),
        Object::String(s) => Ok(s.chars().count()),
        Object::Dict(d) => Ok(d.len()),
        other => Err(Error::TypeMismatch(format!(
            "len expects a list, string or dict, found {}",
            other.type_name()
        ))),
    }
}

fn builtin_type(values: ObjIter<'_>) -> Object {
    let mut names: Vec<Object> = values.map(|v| Object::from(v.type_name())).collect();
    if names.len() == 1 {
        names.swap_remove(0)
    } else {
        Object::List(names)
    }
}

/// String to code points, or code points back to a string
fn builtin_unicode(args: Vec<Object>) -> Result<Object, Error> {
    if let [Object::String(s)] = args.as_slice() {
        return Ok(Object::List(s.chars().map(|c| Object::from(u32::from(c))).collect()));
    }

    let mut out = String::with_capacity(args.len());
    for arg in &args {
        let Object::Int(n) = arg else {
            return Err(Error::TypeMismatch(format!(
                "unicode expects one string or integers, found {}",
                arg.type_name()
            )));
        };
        let c = u32::try_from(*n)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| Error::EvalError(format!("invalid code point {n}")))?;
        out.push(c);
    }
    Ok(Object::String(out))
}

fn builtin_dict(args: Vec<Object>) -> Result<Object, Error> {
    if args.len() % 2 != 0 {
        return Err(Error::EvalError(
            "dict expects alternating keys and values".into(),
        ));
    }
    let mut dict = Dict::new();
    let mut iter = args.into_iter();
    while let (Some(k), Some(v)) = (iter.next(), iter.next()) {
        dict.insert(k, v);
    }
    Ok(Object::Dict(dict))
}

fn builtin_get(dict: Dict, key: Object) -> Result<Object, Error> {
    dict.get(&key)
        .cloned()
        .ok_or_else(|| Error::EvalError(format!("key not found: {key}")))
}

fn builtin_set(mut dict: Dict, key: Object, value: Object) -> Dict {
    dict.insert(key, value);
    dict
}

fn builtin_keys(dict: Dict) -> Vec<Object> {
    dict.keys().cloned().collect()
}

fn builtin_man(value: Object) -> Result<String, Error> {
    match value {
        Object::Module(module) => Ok(module.man().to_owned()),
        Object::Lambda(lambda) => Ok(lambda.to_string()),
        other => Err(Error::EvalError(format!(
            "no manual entry for a {}",
            other.type_name()
        ))),
    }
}

#[cfg(feature = "json")]
fn builtin_json(value: Object) -> String {
    crate::json::object_to_json(&value).to_string()
}

/// Global registry of all built-in modules.
///
/// Kept as one contiguous list for ease of auditing; extensions go through
/// the same adapter layer as `Runtime::register_extension`.
static BUILTIN_MODULES: LazyLock<Vec<Module>> = LazyLock::new(|| {
    fn fixed<Args, F>(f: F) -> Arc<ExtensionFn>
    where
        F: IntoExtension<Args>,
    {
        <F as IntoExtension<Args>>::into_extension(f)
    }

    fn variadic<Args, F>(f: F) -> Arc<ExtensionFn>
    where
        F: IntoVariadicExtension<Args>,
    {
        <F as IntoVariadicExtension<Args>>::into_variadic_extension(f)
    }

    fn raw(f: fn(Vec<Object>) -> Result<Object, Error>) -> Arc<ExtensionFn> {
        Arc::new(f)
    }

    #[cfg_attr(not(feature = "json"), expect(unused_mut))]
    let mut modules = vec![
        // Language core
        Module::special("let", Arity::AtLeast(2), "(let name expr+): bind name in the current frame", eval_let),
        Module::special("lambda", Arity::AtLeast(1), "(lambda param* body): closure over a copy of the current frame", eval_lambda),
        Module::special("case", Arity::AtLeast(1), "(case x pattern result ...): result of the first pattern equal to x, _ matches anything", eval_case),
        // Frames
        Module::special("del", Arity::AtLeast(1), "(del name expr*): remove name from the current frame", eval_del),
        Module::special("reset", Arity::Exact(0), "(reset): drop every frame but the global one", eval_reset),
        Module::special("kaboom", Arity::Exact(0), "(kaboom): same as reset", eval_reset),
        Module::special("stack", Arity::Any, "(stack expr*): list of frames as dicts, global first", eval_stack),
        Module::special("map", Arity::Exact(2), "(map list f): apply a one-argument lambda or module to each element", eval_map),
        Module::special("print", Arity::Any, "(print expr*): write values to the output, returns how many", eval_print),
        // Arithmetic
        Module::extension("add", Arity::Any, "(add int*): sum", variadic::<(IntIter<'static>,), _>(builtin_add)),
        Module::extension("sub", Arity::Exact(2), "(sub a b): difference", fixed::<(Int, Int), _>(builtin_sub)),
        Module::extension("mul", Arity::Any, "(mul int*): product", variadic::<(IntIter<'static>,), _>(builtin_mul)),
        Module::extension("div", Arity::Exact(2), "(div a b): quotient truncated toward zero", fixed::<(Int, Int), _>(builtin_div)),
        Module::extension("mod", Arity::Exact(2), "(mod a b): remainder with the sign of a", fixed::<(Int, Int), _>(builtin_mod)),
        Module::extension("sign", Arity::Exact(1), "(sign int): -1, 0 or 1", fixed::<(Int,), _>(builtin_sign)),
        // Sequencing and lists
        Module::extension("tail", Arity::AtLeast(1), "(tail expr+): value of the last expression", variadic::<(ObjIter<'static>,), _>(builtin_tail)),
        Module::extension("list", Arity::Any, "(list expr*): new list, also written [expr*]", raw(builtin_list)),
        Module::extension("append", Arity::AtLeast(1), "(append list expr*): list with values added at the end", variadic::<(Vec<Object>, ObjIter<'static>), _>(builtin_append)),
        Module::extension("slice", Arity::Exact(3), "(slice list i j): elements i through j, counted from 1", fixed::<(Vec<Object>, Int, Int), _>(builtin_slice)),
        Module::extension("peek", Arity::Exact(2), "(peek list i): element i, counted from 1", fixed::<(Vec<Object>, Int), _>(builtin_peek)),
        Module::extension("len", Arity::Exact(1), "(len x): length of a list, string or dict", fixed::<(Object,), _>(builtin_len)),
        // Introspection
        Module::extension("type", Arity::AtLeast(1), "(type expr+): type name, or list of names", variadic::<(ObjIter<'static>,), _>(builtin_type)),
        Module::extension("unicode", Arity::AtLeast(1), "(unicode string) or (unicode int+): convert between text and code points", raw(builtin_unicode)),
        Module::extension("man", Arity::Exact(1), "(man f): manual entry of a module, source of a lambda", fixed::<(Object,), _>(builtin_man)),
        // Dicts
        Module::extension("dict", Arity::Any, "(dict key value ...): new dict", raw(builtin_dict)),
        Module::extension("get", Arity::Exact(2), "(get dict key): value stored under key", fixed::<(Dict, Object), _>(builtin_get)),
        Module::extension("set", Arity::Exact(3), "(set dict key value): dict with key bound to value", fixed::<(Dict, Object, Object), _>(builtin_set)),
        Module::extension("keys", Arity::Exact(1), "(keys dict): keys in insertion order", fixed::<(Dict,), _>(builtin_keys)),
    ];

    #[cfg(feature = "json")]
    modules.push(Module::extension(
        "json",
        Arity::Exact(1),
        "(json x): JSON text for any value",
        fixed::<(Object,), _>(builtin_json),
    ));

    modules
});

/// `let`, `lambda` and `case`
pub fn core_modules() -> Vec<Module> {
    BUILTIN_MODULES
        .iter()
        .filter(|m| CORE_MODULES.contains(&m.name()))
        .cloned()
        .collect()
}

/// Every built-in module and extension
pub fn all_modules() -> Vec<Module> {
    BUILTIN_MODULES.clone()
}

/// Look up a built-in by name
pub fn find_builtin(name: &str) -> Option<&'static Module> {
    BUILTIN_MODULES.iter().find(|m| m.name() == name)
}
