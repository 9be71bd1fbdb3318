//! Run command - execute Monkey source files

use super::{read_source, report};
use anyhow::Result;
use monkey_config::VmConfig;
use monkey_runtime::{Monkey, Value};

/// Run a Monkey source file
///
/// Compiles and executes the source file, printing the result to stdout.
pub fn run(file_path: &str, json: bool, vm: &VmConfig) -> Result<()> {
    let source = read_source(file_path)?;

    let runtime = Monkey::with_config(vm.clone());
    match runtime.eval_with_warnings(&source) {
        Ok(outcome) => {
            if !outcome.warnings.is_empty() {
                report(&outcome.warnings, file_path, json)?;
            }
            if !matches!(outcome.value, Value::Null) {
                println!("{}", outcome.value);
            }
            Ok(())
        }
        Err(diagnostics) => {
            report(&diagnostics, file_path, json)?;
            Err(anyhow::anyhow!("Failed to execute {}", file_path))
        }
    }
}
