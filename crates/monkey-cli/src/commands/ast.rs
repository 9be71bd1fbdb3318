//! AST dump command - output AST as JSON

use super::{read_source, report};
use anyhow::Result;
use monkey_runtime::ast::VersionedProgram;
use monkey_runtime::parse_source;

/// Dump AST to JSON
///
/// Parses the source file and outputs the AST as JSON to stdout.
pub fn run(file_path: &str) -> Result<()> {
    let source = read_source(file_path)?;

    let program = match parse_source(&source) {
        Ok(program) => program,
        Err(diagnostics) => {
            report(&diagnostics, file_path, false)?;
            return Err(anyhow::anyhow!("Parse errors"));
        }
    };

    let json = VersionedProgram::new(program).to_json()?;
    println!("{}", json);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_ast_dump_simple() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "var x = 42;").unwrap();

        let result = run(temp_file.path().to_str().unwrap());
        assert!(result.is_ok());
    }

    #[test]
    fn test_ast_dump_invalid_syntax() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "var x =").unwrap();

        let result = run(temp_file.path().to_str().unwrap());
        assert!(result.is_err());
    }

    #[test]
    fn test_ast_dump_missing_file() {
        let result = run("nonexistent.mk");
        assert!(result.is_err());
    }
}
