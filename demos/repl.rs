use fplang::frame::Stack;
use fplang::{CancelToken, Error, Expr, Object, Parser, Runtime, tokenize};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::panic;
use std::process;
use std::time::Duration;

fn main() {
    init_tracing();

    let result = panic::catch_unwind(run_repl);

    match result {
        Ok(Ok(())) => {}
        Ok(Err(err)) => {
            eprintln!("Error: {err}");
            process::exit(1);
        }
        Err(panic_info) => {
            eprintln!("The REPL encountered an unexpected error and must exit.");

            if let Some(msg) = panic_info.downcast_ref::<&str>() {
                eprintln!("Error: {msg}");
            } else if let Some(msg) = panic_info.downcast_ref::<String>() {
                eprintln!("Error: {msg}");
            } else {
                eprintln!("Error: Unknown panic occurred");
            }

            process::exit(1);
        }
    }
}

/// Log to stderr when `RUST_LOG` is set, e.g. `RUST_LOG=fplang=debug`
fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    if std::env::var_os("RUST_LOG").is_none() {
        return;
    }
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_writer(std::io::stderr),
        )
        .with(EnvFilter::from_default_env())
        .init();
}

fn run_repl() -> Result<(), ReadlineError> {
    println!("fplang interactive runtime");
    println!("Enter expressions like: (add 1 2)");
    println!("Type :help for more commands, Ctrl+C to discard input, Ctrl+D to exit.");
    println!();

    let mut rl = DefaultEditor::new()?;
    let mut rt = Runtime::new();
    let mut parser = Parser::new();
    // Text held back because it ends inside a string literal
    let mut partial = String::new();
    let mut timeout: Option<Duration> = None;

    loop {
        let idle = parser.is_empty() && partial.is_empty();
        match rl.readline(if idle { "fplang> " } else { "  ...> " }) {
            Ok(line) => {
                if line.trim().is_empty() && idle {
                    continue;
                }
                let _ = rl.add_history_entry(line.as_str());

                if idle && let Some(command) = line.trim().strip_prefix(':') {
                    if !run_command(command, &mut rt, &mut timeout) {
                        println!("Goodbye!");
                        break;
                    }
                    continue;
                }

                let text = if partial.is_empty() {
                    line
                } else {
                    format!("{}\n{line}", std::mem::take(&mut partial))
                };

                let tokens = match tokenize(&text) {
                    Ok(tokens) => tokens,
                    Err(Error::ParseError(e)) if e.is_incomplete() => {
                        partial = text;
                        continue;
                    }
                    Err(e) => {
                        println!("Error: {e}");
                        continue;
                    }
                };

                for token in tokens {
                    match parser.input(token) {
                        Ok(Some(expr)) => evaluate(&mut rt, &expr, timeout),
                        Ok(None) => {}
                        Err(e) => {
                            println!("Error: {e}");
                            break;
                        }
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                if idle {
                    println!("Goodbye!");
                    break;
                }
                parser.clear();
                partial.clear();
                println!("Input discarded.");
            }
            Err(ReadlineError::Eof) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

/// Step one expression; interrupted steps leave the stack as it was before
fn evaluate(rt: &mut Runtime, expr: &Expr, timeout: Option<Duration>) {
    let cancel = match timeout {
        Some(limit) => CancelToken::with_timeout(limit),
        None => CancelToken::new(),
    };
    let snapshot = rt.snapshot();

    match rt.step(expr, &cancel) {
        Ok(value) => println!("{value}"),
        Err(e @ (Error::Interrupt | Error::Timeout)) => {
            rt.restore(snapshot);
            println!("Error: {e} (changes rolled back)");
        }
        Err(e) => println!("Error: {e}"),
    }
}

/// Handle a `:command`; returns false when the REPL should exit
fn run_command(command: &str, rt: &mut Runtime, timeout: &mut Option<Duration>) -> bool {
    let mut words = command.split_whitespace();
    match (words.next(), words.next()) {
        (Some("help"), _) => print_help(),
        (Some("stack"), _) => print_stack(rt.stack()),
        #[cfg(feature = "json")]
        (Some("json"), _) => {
            let json = fplang::json::stack_to_json(rt.stack());
            match serde_json::to_string_pretty(&json) {
                Ok(text) => println!("{text}"),
                Err(_) => println!("{json}"),
            }
        }
        (Some("timeout"), Some("off")) => {
            *timeout = None;
            println!("Timeout disabled.");
        }
        (Some("timeout"), Some(ms)) => match ms.parse::<u64>() {
            Ok(ms) => {
                *timeout = Some(Duration::from_millis(ms));
                println!("Each step now stops after {ms} ms.");
            }
            Err(_) => println!("Usage: :timeout <milliseconds>|off"),
        },
        (Some("timeout"), None) => match timeout {
            Some(limit) => println!("Timeout: {} ms", limit.as_millis()),
            None => println!("Timeout: off"),
        },
        (Some("reset"), _) => {
            *rt = Runtime::new();
            println!("Runtime reset.");
        }
        (Some("quit" | "exit"), _) => return false,
        _ => println!("Unknown command :{command}. Type :help for a list."),
    }
    true
}

fn print_help() {
    println!("Commands:");
    println!("  :help             - Show this help message");
    println!("  :stack            - Show user bindings in every frame");
    #[cfg(feature = "json")]
    println!("  :json             - Dump the whole stack as JSON");
    println!("  :timeout <ms|off> - Limit how long a single expression may run");
    println!("  :reset            - Start over with a fresh runtime");
    println!("  :quit, :exit      - Exit the interpreter");
    println!("  Ctrl+C            - Discard a partially entered expression");
    println!("  Ctrl+D            - Exit the interpreter");
    println!();
    println!("Language:");
    println!("  Literals: 42, -5, \"text\", 'text', _ (wildcard), * (splat)");
    println!("  Lists: [1 2 3] is (list 1 2 3)");
    println!("  Binding: (let x 5), (del x)");
    println!("  Functions: (let inc (lambda n (add n 1))) (inc 41)");
    println!("  Branching: (case x 0 \"zero\" _ \"other\")");
    println!("  Splat: (add * [1 2 3])");
    println!("  Comments: // to end of line");
    println!();
    println!("Use (man name) for the manual entry of any built-in.");
}

fn print_stack(stack: &Stack) {
    for (index, frame) in stack.frames().iter().enumerate() {
        let user: Vec<_> = frame
            .sorted()
            .into_iter()
            .filter(|(_, value)| !matches!(value, Object::Module(_)))
            .collect();

        let label = if index == 0 { "global".to_owned() } else { format!("frame {index}") };
        if user.is_empty() {
            println!("{label}: no user bindings");
            continue;
        }
        println!("{label} ({} bindings):", user.len());
        for (name, value) in user {
            println!("  {name} = {value}");
        }
    }
}
