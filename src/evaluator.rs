//! The runtime and its `step` function.
//!
//! A [`Runtime`] owns the frame [`Stack`] and a [`RuntimeConfig`]. Evaluation
//! is depth-first and strictly left to right. Each evaluation step first polls
//! the [`CancelToken`] and the stack bounds, then:
//!
//! - a `Name` resolves as a literal, or else by stack lookup (top to bottom)
//! - a call resolves its head the same way and dispatches on the result:
//!   lambdas get their arguments evaluated and bound over the captured frame,
//!   special modules receive the raw call, extensions receive evaluated and
//!   spliced arguments
//!
//! Lambda calls in tail position merge their frame into the current top frame
//! and continue in the same loop iteration instead of pushing, so tail
//! recursion runs in constant stack (both the frame stack and the native one).

use std::borrow::Cow;
use std::fmt;
use std::io::Write;
use std::sync::{Arc, Mutex};

use crate::ast::{Expr, LambdaExpr, Name};
use crate::builtins;
use crate::cancel::CancelToken;
use crate::frame::{Frame, Stack};
use crate::intooperation::{IntoExtension, IntoVariadicExtension};
use crate::module::{Arity, Module, ModuleKind, Outcome};
use crate::object::{Lambda, Object, parse_literal};
use crate::parser::parse_str;
use crate::{Error, MAX_EVAL_DEPTH, MAX_STACK_DEPTH};

/// Minimum native stack space to keep available (100KB red zone)
#[cfg(not(target_arch = "wasm32"))]
const RED_ZONE: usize = 100 * 1024;

/// Native stack space allocated when growing (1MB)
#[cfg(not(target_arch = "wasm32"))]
const STACK_PER_RECURSION: usize = 1024 * 1024;

#[inline]
#[cfg(not(target_arch = "wasm32"))]
fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

#[inline]
#[cfg(target_arch = "wasm32")]
fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}

/// Shared sink for `print`
pub type Output = Arc<Mutex<dyn Write + Send>>;

/// Runtime limits and switches
#[derive(Clone)]
pub struct RuntimeConfig {
    /// Frames allowed on the stack before `StackOverflow`
    pub max_stack_depth: usize,
    /// Nested evaluation steps allowed before `StackOverflow`
    pub max_eval_depth: usize,
    /// Warn when a lookup resolves in a frame other than the global or top one
    pub detect_non_pure: bool,
    /// Reuse the top frame for calls in tail position
    pub tail_calls: bool,
    pub output: Output,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            max_stack_depth: MAX_STACK_DEPTH,
            max_eval_depth: MAX_EVAL_DEPTH,
            detect_non_pure: true,
            tail_calls: true,
            output: Arc::new(Mutex::new(std::io::stdout())),
        }
    }
}

impl fmt::Debug for RuntimeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeConfig")
            .field("max_stack_depth", &self.max_stack_depth)
            .field("max_eval_depth", &self.max_eval_depth)
            .field("detect_non_pure", &self.detect_non_pure)
            .field("tail_calls", &self.tail_calls)
            .finish_non_exhaustive()
    }
}

/// Per-step evaluation state threaded through the recursion
#[derive(Debug, Clone, Copy)]
pub struct StepContext<'c> {
    cancel: &'c CancelToken,
    depth: usize,
    tail: bool,
}

impl<'c> StepContext<'c> {
    /// Top-level context: depth 0, not in tail position
    pub fn new(cancel: &'c CancelToken) -> Self {
        StepContext {
            cancel,
            depth: 0,
            tail: false,
        }
    }

    pub fn cancel(&self) -> &'c CancelToken {
        self.cancel
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn is_tail(&self) -> bool {
        self.tail
    }

    /// Argument whose value the caller still has to process
    pub fn arg(self) -> Self {
        StepContext {
            depth: self.depth + 1,
            tail: false,
            ..self
        }
    }

    /// Sub-expression whose value becomes the caller's own value
    pub fn last_arg(self) -> Self {
        StepContext {
            depth: self.depth + 1,
            ..self
        }
    }

    /// Lambda body
    pub fn body(self) -> Self {
        StepContext {
            depth: self.depth + 1,
            tail: true,
            ..self
        }
    }
}

/// Interpreter state: the frame stack plus configuration
#[derive(Debug, Clone)]
pub struct Runtime {
    stack: Stack,
    config: RuntimeConfig,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime {
    /// Runtime with only the language core: `let`, `lambda` and `case`
    pub fn plain() -> Self {
        let mut runtime = Runtime {
            stack: Stack::new(),
            config: RuntimeConfig::default(),
        };
        for module in builtins::core_modules() {
            runtime.load_module(module);
        }
        runtime
    }

    /// Runtime with every built-in module and extension
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        let mut runtime = Runtime {
            stack: Stack::new(),
            config,
        };
        for module in builtins::all_modules() {
            runtime.load_module(module);
        }
        runtime
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut RuntimeConfig {
        &mut self.config
    }

    /// Bind a module in the global frame under its own name
    pub fn load_module(&mut self, module: Module) -> &mut Self {
        self.stack
            .global_mut()
            .insert(Name::from(module.name()), Object::Module(module));
        self
    }

    /// Register a strongly-typed Rust function as an extension.
    ///
    /// ```
    /// use fplang::{CancelToken, Object, Runtime};
    ///
    /// let mut rt = Runtime::new();
    /// rt.register_extension::<(i64,), _>("double", |n: i64| n * 2);
    /// assert_eq!(rt.run("(double 21)", &CancelToken::new()), Ok(Object::Int(42)));
    /// ```
    ///
    /// Supported parameter types: `i64`, `&str`, `String`, `Object`,
    /// `Vec<Object>`, `Dict` and the list iterators
    /// [`crate::intooperation::IntIter`], [`crate::intooperation::StrIter`] and
    /// [`crate::intooperation::ObjIter`]. Any `R: Into<Object>` or
    /// `Result<R, Error>` can be returned. Arity is the parameter count.
    /// The parameter tuple cannot be inferred through the adapter traits, so
    /// it is spelled out at the call site.
    pub fn register_extension<Args, F>(&mut self, name: &str, f: F) -> &mut Self
    where
        F: IntoExtension<Args>,
    {
        let arity = Arity::Exact(F::ARITY);
        let module = Module::extension(
            name,
            arity,
            format!("({name} ...): native extension"),
            f.into_extension(),
        );
        self.load_module(module)
    }

    /// Register a function whose last parameter collects the remaining arguments.
    ///
    /// `arity` bounds the total argument count (after splicing).
    pub fn register_variadic_extension<Args, F>(&mut self, name: &str, arity: Arity, f: F) -> &mut Self
    where
        F: IntoVariadicExtension<Args>,
    {
        let module = Module::extension(
            name,
            arity,
            format!("({name} ...): native extension"),
            f.into_variadic_extension(),
        );
        self.load_module(module)
    }

    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    pub fn stack_mut(&mut self) -> &mut Stack {
        &mut self.stack
    }

    /// Copy of the stack, for rolling back an interrupted step
    pub fn snapshot(&self) -> Stack {
        self.stack.clone()
    }

    pub fn restore(&mut self, stack: Stack) {
        self.stack = stack;
    }

    /// Write one line to the configured output
    pub(crate) fn write_output(&self, line: &str) -> Result<(), Error> {
        let mut out = self
            .config
            .output
            .lock()
            .map_err(|_| Error::EvalError("output sink poisoned".into()))?;
        writeln!(out, "{line}")
            .and_then(|()| out.flush())
            .map_err(|e| Error::EvalError(format!("write failed: {e}")))
    }

    /// Evaluate a top-level expression
    pub fn step(&mut self, expr: &Expr, cancel: &CancelToken) -> Result<Object, Error> {
        self.eval(expr, StepContext::new(cancel))
    }

    /// Tokenize, parse and step every expression in `text`; returns the last value
    pub fn run(&mut self, text: &str, cancel: &CancelToken) -> Result<Object, Error> {
        let mut last = Object::nil();
        for expr in parse_str(text)? {
            last = self.step(&expr, cancel)?;
        }
        Ok(last)
    }

    /// Evaluate `expr` in the given context. Used by special modules for the
    /// arguments they choose to evaluate.
    pub fn eval(&mut self, expr: &Expr, ctx: StepContext<'_>) -> Result<Object, Error> {
        ensure_sufficient_stack(|| self.eval_loop(expr, ctx))
    }

    /// Evaluate arguments left to right; the last one inherits the tail flag
    pub fn eval_args(&mut self, args: &[Expr], ctx: StepContext<'_>) -> Result<Vec<Object>, Error> {
        let last = args.len().saturating_sub(1);
        args.iter()
            .enumerate()
            .map(|(i, arg)| {
                let arg_ctx = if i == last { ctx.last_arg() } else { ctx.arg() };
                self.eval(arg, arg_ctx)
            })
            .collect()
    }

    fn check_limits(&self, ctx: &StepContext<'_>) -> Result<(), Error> {
        ctx.cancel.check()?;
        if self.stack.len() > self.config.max_stack_depth || ctx.depth > self.config.max_eval_depth {
            tracing::debug!(frames = self.stack.len(), depth = ctx.depth, "stack limit reached");
            return Err(Error::StackOverflow);
        }
        Ok(())
    }

    /// Resolve a name: literal first, then the stack
    pub fn resolve(&self, name: &Name) -> Result<Object, Error> {
        if let Some(literal) = parse_literal(name)? {
            return Ok(literal);
        }

        let (index, value) = self
            .stack
            .lookup(name.as_str())
            .ok_or_else(|| Error::NameNotFound(name.to_string()))?;

        if self.config.detect_non_pure && is_non_pure(index, self.stack.top_index()) {
            tracing::warn!(
                target: "fplang::evaluator",
                name = name.as_str(),
                frame = index,
                top = self.stack.top_index(),
                "non-pure lookup: name resolved in an enclosing call frame"
            );
        }
        Ok(value.clone())
    }

    fn eval_loop(&mut self, expr: &Expr, ctx: StepContext<'_>) -> Result<Object, Error> {
        let mut expr: Cow<'_, Expr> = Cow::Borrowed(expr);

        loop {
            self.check_limits(&ctx)?;

            let call = match &*expr {
                Expr::Name(name) => return self.resolve(name),
                Expr::Call(call) => call,
            };

            let next = match self.resolve(&call.head)? {
                Object::Lambda(lambda) => {
                    let args = self.eval_args(&call.args, ctx)?;
                    let frame = bind_params(&lambda, args, call)?;

                    if ctx.tail && self.config.tail_calls && self.stack.top_index() > 0 {
                        tracing::trace!(head = call.head.as_str(), "tail call reuses top frame");
                        self.stack.top_mut().merge_from(frame);
                        lambda.body.clone()
                    } else {
                        self.stack.push(frame);
                        tracing::trace!(head = call.head.as_str(), frames = self.stack.len(), "push frame");
                        let result = self.eval(&lambda.body, ctx.body());
                        self.stack.pop();
                        return result;
                    }
                }
                Object::Module(module) => match module.kind() {
                    ModuleKind::Special(f) => {
                        module
                            .arity()
                            .validate(call.args.len())
                            .map_err(|e| e.with_expression(|| call.to_string()))?;
                        match f(self, call, ctx)? {
                            Outcome::Value(value) => return Ok(value),
                            Outcome::Eval(next) => next,
                        }
                    }
                    ModuleKind::Extension(_) => {
                        let args = self.eval_args(&call.args, ctx)?;
                        return module
                            .invoke(args)
                            .map_err(|e| e.with_expression(|| call.to_string()));
                    }
                },
                other => {
                    return Err(Error::TypeMismatch(format!(
                        "{} is a {} and cannot be called",
                        call.head,
                        other.type_name()
                    )));
                }
            };

            expr = Cow::Owned(next);
        }
    }

    /// Apply a lambda to already evaluated arguments in a fresh frame.
    ///
    /// Used by `map`; never reuses the caller's frame.
    pub(crate) fn apply_lambda(
        &mut self,
        lambda: &Lambda,
        args: Vec<Object>,
        call: &LambdaExpr,
        ctx: StepContext<'_>,
    ) -> Result<Object, Error> {
        let frame = bind_params(lambda, args, call)?;
        self.stack.push(frame);
        let result = self.eval(&lambda.body, ctx.body());
        self.stack.pop();
        result
    }
}

/// A hit outside both the global frame and the active call's own frame means
/// the name leaked in from a caller
fn is_non_pure(index: usize, top: usize) -> bool {
    index != 0 && index != top
}

/// Captured frame overlaid with parameter bindings
fn bind_params(lambda: &Lambda, args: Vec<Object>, call: &LambdaExpr) -> Result<Frame, Error> {
    if args.len() != lambda.params.len() {
        return Err(Error::arity_error_with_expr(
            Arity::Exact(lambda.params.len()),
            args.len(),
            call.to_string(),
        ));
    }
    let params: Frame = lambda.params.iter().cloned().zip(args).collect();
    Ok(lambda.frame.clone().merge(params))
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use crate::ParseErrorKind;

    /// Test result variants for evaluation tests
    #[derive(Debug)]
    enum TestResult {
        EvalResult(Object),          // Evaluation should succeed with this value
        SpecificError(&'static str), // Evaluation should fail with an error whose Display starts with this
        AnyError,                    // Evaluation should fail (any error)
    }
    use TestResult::*;

    fn success<T: Into<Object>>(value: T) -> TestResult {
        EvalResult(value.into())
    }

    /// Each case runs in a fresh runtime; inputs may hold several expressions
    fn run_tests(test_cases: Vec<(&str, TestResult)>) {
        for (i, (input, expected)) in test_cases.into_iter().enumerate() {
            let mut rt = Runtime::new();
            let result = rt.run(input, &CancelToken::new());
            match (result, &expected) {
                (Ok(actual), EvalResult(expected)) => {
                    assert_eq!(actual, *expected, "Test case {} ({input}): value mismatch", i + 1);
                }
                (Err(e), SpecificError(prefix)) => {
                    let msg = e.to_string();
                    assert!(
                        msg.starts_with(prefix),
                        "Test case {} ({input}): error {msg:?} does not start with {prefix:?}",
                        i + 1
                    );
                }
                (Err(_), AnyError) => {}
                (result, expected) => panic!(
                    "Test case {} ({input}): expected {expected:?}, got {result:?}",
                    i + 1
                ),
            }
        }
    }

    #[test]
    fn test_names_and_literals() {
        run_tests(vec![
            ("42", success(42)),
            ("-7", success(-7)),
            ("\"hi\"", success("hi")),
            ("_", EvalResult(Object::Wildcard)),
            ("*", EvalResult(Object::Unwrap)),
            ("undefined", SpecificError("NameNotFound")),
            ("(let x 5) x", success(5)),
            ("(let x 1) (let x 2) x", success(2)),
            ("(undefined 1)", SpecificError("NameNotFound")),
            ("(let x 5) (x 1)", SpecificError("TypeMismatch")),
            ("(\"str\" 1)", SpecificError("TypeMismatch")),
        ]);
    }

    #[test]
    fn test_lambda_application() {
        run_tests(vec![
            ("((lambda x x) 1)", AnyError), // head must be a name
            ("(let id (lambda x x)) (id 9)", success(9)),
            ("(let k (lambda 7)) (k)", success(7)),
            ("(let f (lambda a b (sub a b))) (f 10 3)", success(7)),
            ("(let f (lambda a b (sub a b))) (f 1)", SpecificError("ArityError")),
            ("(let f (lambda a (add a 1))) (f 1 2)", SpecificError("ArityError")),
            // Closure snapshot
            ("(let y 1) (let f (lambda x (add x y))) (let y 2) (f 5)", success(6)),
            // Parameters shadow captured names
            ("(let x 100) (let f (lambda x (add x 1))) (f 1)", success(2)),
            // Recursion through the global frame
            (
                "(let fact (lambda n (case n 0 1 _ (mul n (fact (sub n 1)))))) (fact 10)",
                success(3_628_800),
            ),
            // Curried closures capture the calling frame
            ("(let adder (lambda a (lambda b (add a b)))) (let add5 (adder 5)) (add5 10)", success(15)),
        ]);
    }

    #[test]
    fn test_argument_evaluation_order() {
        let buf = Arc::new(Mutex::new(Vec::<u8>::new()));
        let mut rt = Runtime::with_config(RuntimeConfig {
            output: buf.clone(),
            ..RuntimeConfig::default()
        });

        // print returns the number of values it printed
        let result = rt.run("(add (print 1) (print 2 \"two\") (print 3))", &CancelToken::new());
        assert_eq!(result.unwrap(), Object::from(4));

        let printed = String::from_utf8(buf.lock().unwrap().clone()).unwrap();
        assert_eq!(printed, "1\n2 two\n3\n");
    }

    #[test]
    fn test_tail_call_keeps_stack_flat() {
        let program = "(let count (lambda n acc (case n 0 acc _ (count (sub n 1) (add acc 1)))))";

        let mut rt = Runtime::new();
        let cancel = CancelToken::new();
        rt.run(program, &cancel).unwrap();
        assert_eq!(rt.run("(count 20000 0)", &cancel).unwrap(), Object::from(20_000));
        assert_eq!(rt.stack().len(), 1);

        let mut naive = Runtime::with_config(RuntimeConfig {
            tail_calls: false,
            ..RuntimeConfig::default()
        });
        naive.run(program, &cancel).unwrap();
        assert_eq!(naive.run("(count 100 0)", &cancel).unwrap(), Object::from(100));
        assert_eq!(naive.run("(count 20000 0)", &cancel), Err(crate::Error::StackOverflow));
    }

    #[test]
    fn test_cancellation_and_deadline() {
        let mut rt = Runtime::new();
        let cancelled = CancelToken::new();
        cancelled.cancel();
        assert_eq!(rt.run("(add 1 2)", &cancelled), Err(crate::Error::Interrupt));

        let expired = CancelToken::with_deadline(std::time::Instant::now());
        assert_eq!(rt.run("1", &expired), Err(crate::Error::Timeout));
    }

    #[test]
    fn test_plain_runtime_has_only_core() {
        let mut rt = Runtime::plain();
        let cancel = CancelToken::new();
        assert_eq!(
            rt.run("(let f (lambda x (case x 1 \"one\" _ \"other\"))) (f 1)", &cancel)
                .unwrap(),
            Object::from("one")
        );
        assert!(matches!(rt.run("(add 1 2)", &cancel), Err(crate::Error::NameNotFound(_))));
    }

    #[test]
    fn test_register_extensions() {
        use crate::intooperation::IntIter;

        let mut rt = Runtime::new();
        rt.register_extension::<(i64,), _>("double", |n: i64| n * 2);
        rt.register_extension::<(&str,), _>("shout", |s: &str| format!("{}!", s.to_uppercase()));
        rt.register_variadic_extension::<(i64, IntIter<'static>), _>(
            "max",
            Arity::AtLeast(1),
            |first: i64, rest: IntIter<'_>| rest.fold(first, i64::max),
        );

        let cancel = CancelToken::new();
        let test_cases = vec![
            ("(double 21)", Ok(Object::from(42))),
            ("(shout \"hey\")", Ok(Object::from("HEY!"))),
            ("(max 3 9 2)", Ok(Object::from(9))),
            ("(max * [4 1])", Ok(Object::from(4))),
        ];
        for (i, (input, expected)) in test_cases.into_iter().enumerate() {
            assert_eq!(rt.run(input, &cancel), expected, "Test case {} failed", i + 1);
        }

        match rt.run("(double 1 2)", &cancel) {
            Err(crate::Error::ArityError { expression, .. }) => {
                assert_eq!(expression.as_deref(), Some("(double 1 2)"));
            }
            other => panic!("expected arity error, got {other:?}"),
        }
        assert!(matches!(rt.run("(max)", &cancel), Err(crate::Error::ArityError { .. })));
    }

    #[test]
    fn test_deep_objects_are_refused() {
        let build = "(let build (lambda n acc (case n 0 acc _ (build (sub n 1) [acc]))))";
        let wrap = "(let wrap (lambda n acc (case n 0 acc _ (wrap (sub n 1) (dict \"k\" acc)))))";
        let grow = "(let grow (lambda n acc (case n 0 acc _ (grow (sub n 1) (append [] acc)))))";
        let chain = "(let chain (lambda n f (case n 0 f _ (chain (sub n 1) (lambda (f))))))";

        run_tests(vec![
            (&format!("{build} (len (build 100 []))"), success(1)),
            (&format!("{build} (build 10000 [])"), SpecificError("EvaluationError: object nested")),
            (&format!("{wrap} (wrap 10000 0)"), SpecificError("EvaluationError: object nested")),
            (&format!("{grow} (grow 10000 0)"), SpecificError("EvaluationError: object nested")),
            (&format!("{chain} (let f (chain 3 (lambda 7))) (f)"), success(7)),
            (&format!("{chain} (chain 10000 (lambda 0))"), SpecificError("EvaluationError: object nested")),
            // map wraps its results in one more list
            (
                &format!("{build} (map [1] (lambda x (build {} [])))", crate::MAX_OBJECT_DEPTH - 1),
                SpecificError("EvaluationError: object nested"),
            ),
        ]);
    }

    #[test]
    fn test_objects_at_depth_limit_stay_usable() {
        let mut rt = Runtime::new();
        let cancel = CancelToken::new();
        rt.run("(let build (lambda n acc (case n 0 acc _ (build (sub n 1) [acc]))))", &cancel)
            .unwrap();

        let source = format!("(let deep (build {} []))", crate::MAX_OBJECT_DEPTH - 1);
        let deep = rt.run(&source, &cancel).unwrap();
        assert_eq!(deep.depth(), crate::MAX_OBJECT_DEPTH);

        let copy = deep.clone();
        assert_eq!(copy, deep);
        assert!(deep.to_string().starts_with("[[[["));
        assert_eq!(rt.run("(case deep deep \"same\" _ \"different\")", &cancel).unwrap(), Object::from("same"));

        // One more level is refused, and the runtime carries on
        assert!(matches!(rt.run("[deep]", &cancel), Err(crate::Error::EvalError(_))));
        assert_eq!(rt.run("(len deep)", &cancel).unwrap(), Object::from(1));
    }

    #[test]
    fn test_non_pure_hits() {
        let test_cases = vec![
            // (frame index of the hit, top index, leaked)
            (0, 0, false),
            (0, 3, false),
            (3, 3, false),
            (1, 2, true),
            (2, 5, true),
        ];
        for (i, (index, top, expected)) in test_cases.into_iter().enumerate() {
            assert_eq!(is_non_pure(index, top), expected, "Test case {} failed", i + 1);
        }
    }

    /// Run `source` in a fresh runtime and return what was logged at WARN
    fn warnings_for(source: &str, detect_non_pure: bool) -> String {
        #[derive(Clone)]
        struct Capture(Arc<Mutex<Vec<u8>>>);

        impl Write for Capture {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                self.0.lock().unwrap().extend_from_slice(buf);
                Ok(buf.len())
            }

            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let logged = Arc::new(Mutex::new(Vec::new()));
        let writer = Capture(logged.clone());
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let mut rt = Runtime::with_config(RuntimeConfig {
                detect_non_pure,
                ..RuntimeConfig::default()
            });
            rt.run(source, &CancelToken::new()).unwrap();
        });

        String::from_utf8(logged.lock().unwrap().clone()).unwrap()
    }

    #[test]
    fn test_non_pure_lookup_is_reported() {
        // g never captured `secret`; it only finds it in f's frame below its own
        let leaky = "(let g (lambda x (add x secret))) (let f (lambda secret (add (g 1) 0))) (f 10)";
        let pure = "(let k 5) (let h (lambda x (add x k))) (let f (lambda y (add (h y) 0))) (f 1)";

        let logged = warnings_for(leaky, true);
        assert!(logged.contains("non-pure lookup"), "no warning in {logged:?}");
        assert!(logged.contains("secret"), "warning does not name the binding: {logged:?}");

        assert_eq!(warnings_for(leaky, false), "");
        assert_eq!(warnings_for(pure, true), "");
    }

    #[test]
    fn test_run_reports_parse_errors() {
        let mut rt = Runtime::new();
        match rt.run("(add 1", &CancelToken::new()) {
            Err(crate::Error::ParseError(e)) => assert_eq!(e.kind, ParseErrorKind::Incomplete),
            other => panic!("expected parse error, got {other:?}"),
        }
    }
}
