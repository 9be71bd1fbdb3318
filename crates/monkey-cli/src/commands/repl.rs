//! REPL command implementation

use anyhow::Result;
use monkey_config::MonkeyConfig;
use monkey_runtime::{Diagnostic, ReplCore, ReplResult, Value};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::debug;

/// What the loop should do after a line of input
#[derive(Debug, PartialEq)]
enum Command<'a> {
    Quit,
    Reset,
    Help,
    Vars,
    Unknown(&'a str),
    Eval(&'a str),
    Skip,
}

fn parse_command(line: &str) -> Command<'_> {
    let trimmed = line.trim();
    match trimmed {
        "" => Command::Skip,
        ":quit" | ":q" => Command::Quit,
        ":reset" => Command::Reset,
        ":help" | ":h" => Command::Help,
        ":vars" | ":v" => Command::Vars,
        other if other.starts_with(':') => Command::Unknown(other),
        _ => Command::Eval(line),
    }
}

/// Run the interactive REPL
///
/// If `no_history` is true, history is neither loaded nor saved.
pub fn run(no_history: bool, config: &MonkeyConfig) -> Result<()> {
    let mut rl = DefaultEditor::new()?;
    let mut repl = ReplCore::with_config(config.vm.clone());

    let history_path = if no_history {
        None
    } else {
        match config.repl.prepare_history_file() {
            Ok(path) => path,
            Err(e) => {
                debug!(error = %e, "history disabled");
                None
            }
        }
    };
    if let Some(ref path) = history_path {
        let _ = rl.load_history(path); // Ignore errors if file doesn't exist
    }

    println!("Monkey v{} REPL", monkey_runtime::VERSION);
    println!("Type expressions or statements, or :quit to exit");
    println!();

    loop {
        match rl.readline(&config.repl.prompt) {
            Ok(line) => match parse_command(&line) {
                Command::Skip => continue,
                Command::Quit => {
                    println!("Goodbye!");
                    break;
                }
                Command::Reset => {
                    repl.reset();
                    println!("REPL state reset");
                }
                Command::Help => print_help(),
                Command::Vars => print_vars(&repl.defined_names()),
                Command::Unknown(cmd) => {
                    println!("Unknown command {} (try :help)", cmd);
                }
                Command::Eval(input) => {
                    let _ = rl.add_history_entry(input);
                    let result = repl.eval_line(input);
                    for line in render(&result) {
                        println!("{}", line);
                    }
                }
            },
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C
                println!("^C");
                println!("Use :quit or :q to exit");
            }
            Err(ReadlineError::Eof) => {
                // Ctrl+D
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                eprintln!("Error: {:?}", err);
                break;
            }
        }
    }

    if let Some(path) = history_path {
        if let Err(e) = rl.save_history(&path) {
            debug!(path = %path.display(), error = %e, "could not save history");
        }
    }

    Ok(())
}

/// Lines to show for one evaluation: diagnostics first, then the value
fn render(result: &ReplResult) -> Vec<String> {
    let mut lines: Vec<String> = result.diagnostics.iter().map(format_diagnostic).collect();

    if let Some(value) = &result.value {
        if !matches!(value, Value::Null) {
            lines.push(value.to_string());
        }
    }
    lines
}

/// Print help information
fn print_help() {
    println!("Monkey REPL Commands:");
    println!("  :quit, :q         Exit the REPL");
    println!("  :reset            Clear all variables and functions");
    println!("  :help, :h         Show this help message");
    println!("  :vars, :v         List defined globals");
    println!();
    println!("Type any Monkey expression or statement to evaluate it.");
    println!("Examples:");
    println!("  >> 1 + 2");
    println!("  >> var x = 42;");
    println!("  >> var double = func(n) {{ n * 2 }};");
    println!("  >> double(x)");
}

fn print_vars(names: &[String]) {
    if names.is_empty() {
        println!("No variables defined.");
        return;
    }
    for name in names {
        println!("  {}", name);
    }
}

/// Format a diagnostic for display
///
/// The input is a single line, so the location is the column alone.
fn format_diagnostic(diag: &Diagnostic) -> String {
    if diag.snippet.is_empty() {
        format!("{}[{}]: {}", diag.level, diag.code, diag.message)
    } else {
        format!(
            "{}[{}]: {} (column {})",
            diag.level, diag.code, diag.message, diag.column
        )
    }
}
