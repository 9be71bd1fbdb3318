pub mod ast;
pub mod disasm;
pub mod repl;
pub mod run;

use anyhow::{Context, Result};
use monkey_runtime::Diagnostic;
use std::fs;

/// Read a source file, naming it in the error
pub(crate) fn read_source(file_path: &str) -> Result<String> {
    fs::read_to_string(file_path)
        .with_context(|| format!("Failed to read source file: {}", file_path))
}

/// Print diagnostics tagged with `file_path`
///
/// JSON goes to stdout so it can be piped; human-readable output goes to stderr.
pub(crate) fn report(diagnostics: &[Diagnostic], file_path: &str, json: bool) -> Result<()> {
    let tagged: Vec<Diagnostic> = diagnostics
        .iter()
        .cloned()
        .map(|d| d.with_file(file_path))
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&tagged)?);
    } else {
        for diag in &tagged {
            eprint!("{}", diag.to_human_string());
        }
    }
    Ok(())
}
