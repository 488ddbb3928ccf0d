//! End-to-end sessions through the public API: each test drives one runtime
//! through a sequence of inputs, the way an interactive front-end would.
#![expect(clippy::unwrap_used)] // test code OK

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use fplang::{CancelToken, Error, Object, Parser, Runtime, RuntimeConfig, builtins, tokenize};

/// Expected outcome of one input in a session
#[derive(Debug)]
enum Step {
    Success(Object),             // Input should evaluate to this value
    Done,                        // Input should succeed; the value is not interesting
    SpecificError(&'static str), // Input should fail with an error whose Display starts with this
}
use Step::*;

fn success<T: Into<Object>>(value: T) -> Step {
    Success(value.into())
}

/// Run inputs in order against one runtime; state carries over between them
fn run_session(rt: &mut Runtime, steps: Vec<(&str, Step)>) {
    let cancel = CancelToken::new();
    for (i, (input, expected)) in steps.into_iter().enumerate() {
        match (rt.run(input, &cancel), expected) {
            (Ok(actual), Success(expected)) => {
                assert_eq!(actual, expected, "Step {} ({input}): value mismatch", i + 1);
            }
            (Ok(_), Done) => {}
            (Err(e), SpecificError(prefix)) => {
                let msg = e.to_string();
                assert!(
                    msg.starts_with(prefix),
                    "Step {} ({input}): error {msg:?} does not start with {prefix:?}",
                    i + 1
                );
            }
            (result, expected) => {
                panic!("Step {} ({input}): expected {expected:?}, got {result:?}", i + 1)
            }
        }
    }
}

#[test]
fn closures_capture_a_snapshot() {
    run_session(
        &mut Runtime::new(),
        vec![
            ("(let y 1)", success(1)),
            ("(let f (lambda x (add x y)))", Done),
            ("(let y 2)", success(2)),
            ("(f 5)", success(6)),
            ("y", success(2)),
            // Later definitions are invisible to f, earlier ones stay
            ("(del y)", Done),
            ("(f 5)", success(6)),
            ("y", SpecificError("NameNotFound")),
        ],
    );
}

#[test]
fn case_selects_first_match() {
    run_session(
        &mut Runtime::new(),
        vec![
            ("(case 2 1 \"a\" 2 \"b\" _ \"c\")", success("b")),
            ("(case 9 1 \"a\" 2 \"b\" _ \"c\")", success("c")),
            ("(case 9 1 \"a\" 2 \"b\")", SpecificError("NoCaseMatched")),
            (
                "(let describe (lambda n (case (sign n) 1 \"positive\" 0 \"zero\" _ \"negative\")))",
                Done,
            ),
            ("(map [5 0 -5] describe)", success(["positive", "zero", "negative"])),
        ],
    );
}

#[test]
fn tail_recursion_runs_in_constant_stack() {
    let program = "(let loop (lambda n acc (case n 0 acc _ (loop (sub n 1) (add acc n)))))";

    let mut rt = Runtime::new();
    run_session(
        &mut rt,
        vec![
            (program, Done),
            ("(loop 50000 0)", success(1_250_025_000)),
            // Non-tail recursion still works within the frame limit
            ("(let fact (lambda n (case n 0 1 _ (mul n (fact (sub n 1))))))", Done),
            ("(fact 20)", success(2_432_902_008_176_640_000_i64)),
            ("(fact 21)", SpecificError("EvaluationError")),
            ("(fact 100000)", SpecificError("StackOverflow")),
        ],
    );
    assert_eq!(rt.stack().len(), 1, "frames left behind after errors");

    let mut naive = Runtime::with_config(RuntimeConfig {
        tail_calls: false,
        ..RuntimeConfig::default()
    });
    run_session(
        &mut naive,
        vec![
            (program, Done),
            ("(loop 500 0)", success(125_250)),
            ("(loop 50000 0)", SpecificError("StackOverflow")),
        ],
    );
}

#[test]
fn incremental_parser_feeds_the_runtime() {
    let mut rt = Runtime::new();
    let mut parser = Parser::new();
    let cancel = CancelToken::new();
    let mut results = Vec::new();

    for line in ["(let x 2) (add x", "  1)", "[x", "x]"] {
        for token in tokenize(line).unwrap() {
            if let Some(expr) = parser.input(token).unwrap() {
                results.push(rt.step(&expr, &cancel).unwrap());
            }
        }
    }

    assert_eq!(
        results,
        vec![Object::from(2), Object::from(3), Object::from([2, 2])]
    );
    assert!(parser.is_empty());

    // Abandoned input leaves no trace
    for token in tokenize("(let x").unwrap() {
        assert_eq!(parser.input(token).unwrap(), None);
    }
    parser.clear();
    let exprs = parser.input_all(tokenize("x").unwrap()).unwrap();
    assert_eq!(rt.step(&exprs[0], &cancel).unwrap(), Object::from(2));
}

#[test]
fn interrupted_step_can_be_rolled_back() {
    let mut rt = Runtime::new();
    run_session(
        &mut rt,
        vec![
            ("(let spin (lambda n (spin (add n 1))))", Done),
            ("(let kept 1)", Done),
        ],
    );

    // Deadline
    let snapshot = rt.snapshot();
    let result = rt.run("(let lost (spin 0))", &CancelToken::with_timeout(Duration::from_millis(20)));
    assert_eq!(result, Err(Error::Timeout));
    rt.restore(snapshot.clone());
    assert_eq!(rt.stack(), &snapshot);

    // Cancellation from another thread
    let cancel = CancelToken::new();
    let remote = cancel.clone();
    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        remote.cancel();
    });
    let result = rt.run("(spin 0)", &cancel);
    canceller.join().unwrap();
    assert_eq!(result, Err(Error::Interrupt));
    rt.restore(snapshot.clone());

    // A reset token evaluates normally again
    cancel.reset();
    assert_eq!(rt.run("kept", &cancel), Ok(Object::from(1)));
    assert!(matches!(rt.run("lost", &cancel), Err(Error::NameNotFound(_))));
}

#[test]
fn list_positions_are_one_based_and_closed() {
    run_session(
        &mut Runtime::new(),
        vec![
            ("(let l [\"a\" \"b\" \"c\"])", Done),
            ("(peek l 1)", success("a")),
            ("(peek l (len l))", success("c")),
            ("(peek l 0)", SpecificError("IndexOutOfRange")),
            ("(peek l (add (len l) 1))", SpecificError("IndexOutOfRange")),
            ("(slice l 1 (len l))", success(["a", "b", "c"])),
            ("(slice l 2 2)", success(["b"])),
            ("(slice l 0 1)", SpecificError("IndexOutOfRange")),
            ("(slice l 1 4)", SpecificError("IndexOutOfRange")),
        ],
    );
}

#[test]
fn splat_expands_lists_in_place() {
    run_session(
        &mut Runtime::new(),
        vec![
            ("(let nums [1 2 3])", Done),
            ("(add * nums)", success(6)),
            ("(add 10 * nums 100)", success(116)),
            ("(list * nums * nums)", success([1, 2, 3, 1, 2, 3])),
            ("(sub * nums)", SpecificError("ArityError")),
            ("(add * 1)", SpecificError("TypeMismatch")),
        ],
    );
}

#[test]
fn print_writes_to_the_configured_output() {
    let buf = Arc::new(Mutex::new(Vec::<u8>::new()));
    let mut rt = Runtime::with_config(RuntimeConfig {
        output: buf.clone(),
        ..RuntimeConfig::default()
    });

    run_session(
        &mut rt,
        vec![
            ("(print \"hello\" \"world\")", success(2)),
            ("(print [1 \"two\"] (dict \"k\" 3))", success(2)),
            ("(print * [1 2 3])", success(3)),
            ("(print)", success(0)),
        ],
    );

    let printed = String::from_utf8(buf.lock().unwrap().clone()).unwrap();
    assert_eq!(printed, "hello world\n[1 \"two\"] (dict \"k\" 3)\n1 2 3\n\n");
}

#[test]
fn plain_runtime_loads_modules_on_demand() {
    let mut rt = Runtime::plain();
    run_session(
        &mut rt,
        vec![
            ("(let x 1)", success(1)),
            ("(add x 1)", SpecificError("NameNotFound")),
        ],
    );

    for name in ["add", "sign"] {
        let module = builtins::find_builtin(name).unwrap().clone();
        rt.load_module(module);
    }
    rt.register_extension::<(i64, i64), _>("pow", |base: i64, exp: i64| {
        base.checked_pow(u32::try_from(exp).unwrap_or(u32::MAX))
            .map(Object::from)
            .ok_or_else(|| Error::EvalError("overflow".into()))
    });

    run_session(
        &mut rt,
        vec![
            ("(add x 1)", success(2)),
            ("(sign -3)", success(-1)),
            ("(pow 2 10)", success(1024)),
            ("(pow 2 100)", SpecificError("EvaluationError")),
            ("(mul 2 2)", SpecificError("NameNotFound")),
        ],
    );
}
