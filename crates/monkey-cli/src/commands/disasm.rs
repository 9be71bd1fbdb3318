//! Disasm command - show compiled bytecode

use super::{read_source, report};
use anyhow::Result;
use monkey_runtime::{disassemble, Monkey};

/// Compile the file and print its disassembly to stdout
pub fn run(file_path: &str) -> Result<()> {
    let source = read_source(file_path)?;

    match Monkey::new().compile(&source) {
        Ok(bytecode) => {
            print!("{}", disassemble(&bytecode));
            Ok(())
        }
        Err(diagnostics) => {
            report(&diagnostics, file_path, false)?;
            Err(anyhow::anyhow!("Failed to compile {}", file_path))
        }
    }
}
