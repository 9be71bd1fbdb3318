//! Embedding API for running Monkey programs
//!
//! Bundles the front end, compiler and VM behind one call. For interactive
//! use with state carried across inputs see [`ReplCore`](crate::repl::ReplCore).

use crate::ast::{Program, Stmt};
use crate::bytecode::Bytecode;
use crate::compiler::Compiler;
use crate::diagnostic::Diagnostic;
use crate::lexer::Lexer;
use crate::parser::Parser;
use crate::value::Value;
use crate::vm::VM;
use monkey_config::VmConfig;
use std::path::Path;
use tracing::debug;

/// Result type for runtime operations
pub type RuntimeResult<T> = Result<T, Vec<Diagnostic>>;

/// Lex and parse `source`
///
/// Lexer errors stop the pipeline before parsing. All returned diagnostics
/// carry line and column information resolved against `source`.
pub fn parse_source(source: &str) -> RuntimeResult<Program> {
    let mut lexer = Lexer::new(source);
    let (tokens, lex_diags) = lexer.tokenize();
    if !lex_diags.is_empty() {
        return Err(attach_source(lex_diags, source));
    }

    let mut parser = Parser::new(tokens);
    let (program, parse_diags) = parser.parse();
    if !parse_diags.is_empty() {
        return Err(attach_source(parse_diags, source));
    }

    Ok(program)
}

pub(crate) fn attach_source(diagnostics: Vec<Diagnostic>, source: &str) -> Vec<Diagnostic> {
    diagnostics
        .into_iter()
        .map(|d| d.with_source(source))
        .collect()
}

/// Whether the program ends in an expression statement whose value is observable
pub(crate) fn ends_in_expression(program: &Program) -> bool {
    matches!(program.statements.last(), Some(Stmt::Expr(_)))
}

/// A successful evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub value: Value,
    pub warnings: Vec<Diagnostic>,
}

/// Monkey runtime instance
///
/// Each call to [`eval`](Monkey::eval) runs in a fresh global scope.
///
/// # Examples
///
/// ```
/// use monkey_runtime::{Monkey, Value};
///
/// let runtime = Monkey::new();
/// let result = runtime.eval("var double = func(x) { x * 2 }; double(21);");
/// assert_eq!(result, Ok(Value::Integer(42)));
/// ```
pub struct Monkey {
    config: VmConfig,
}

impl Monkey {
    /// Create a runtime with the default VM limits
    pub fn new() -> Self {
        Self::with_config(VmConfig::default())
    }

    /// Create a runtime with explicit VM limits
    pub fn with_config(config: VmConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    /// Compile `source` to bytecode without running it
    ///
    /// Compiler warnings are dropped; use [`compile_with_warnings`](Monkey::compile_with_warnings)
    /// to keep them.
    pub fn compile(&self, source: &str) -> RuntimeResult<Bytecode> {
        self.compile_with_warnings(source).map(|(bytecode, _)| bytecode)
    }

    /// Compile `source`, returning the bytecode and any warnings
    pub fn compile_with_warnings(&self, source: &str) -> RuntimeResult<(Bytecode, Vec<Diagnostic>)> {
        let program = parse_source(source)?;
        let mut compiler = Compiler::new();
        let bytecode = compiler
            .compile(&program)
            .map_err(|diags| attach_source(diags, source))?;
        let warnings = attach_source(compiler.warnings().to_vec(), source);
        Ok((bytecode, warnings))
    }

    /// Evaluate Monkey source code
    ///
    /// Returns the value of the final expression statement, or null when the
    /// program ends in a declaration or return.
    ///
    /// # Examples
    ///
    /// ```
    /// use monkey_runtime::{Monkey, Value};
    ///
    /// let runtime = Monkey::new();
    /// assert_eq!(runtime.eval("if (1 > 2) { 10 } else { 20 }"), Ok(Value::Integer(20)));
    /// assert!(runtime.eval("1 / 0").is_err());
    /// ```
    pub fn eval(&self, source: &str) -> RuntimeResult<Value> {
        self.eval_with_warnings(source).map(|outcome| outcome.value)
    }

    /// Evaluate Monkey source code, keeping compiler warnings
    pub fn eval_with_warnings(&self, source: &str) -> RuntimeResult<Outcome> {
        let program = parse_source(source)?;
        let mut compiler = Compiler::new();
        let bytecode = compiler
            .compile(&program)
            .map_err(|diags| attach_source(diags, source))?;
        let warnings = attach_source(compiler.warnings().to_vec(), source);

        debug!(
            bytes = bytecode.instructions.len(),
            constants = bytecode.constants.len(),
            "running program"
        );

        let mut vm = VM::with_config(bytecode, &self.config);
        vm.run().map_err(|e| vec![e.to_diagnostic()])?;

        let value = if ends_in_expression(&program) {
            vm.last_popped()
        } else {
            Value::Null
        };
        Ok(Outcome { value, warnings })
    }

    /// Evaluate a Monkey source file
    ///
    /// Diagnostics are tagged with the file path.
    pub fn eval_file(&self, path: impl AsRef<Path>) -> RuntimeResult<Value> {
        let path = path.as_ref();
        let file = path.display().to_string();
        let source = std::fs::read_to_string(path).map_err(|e| {
            vec![Diagnostic::error(
                format!("failed to read {}: {}", file, e),
                crate::span::Span::dummy(),
            )
            .with_file(file.clone())]
        })?;

        self.eval(&source)
            .map_err(|diags| diags.into_iter().map(|d| d.with_file(file.clone())).collect())
    }
}

impl Default for Monkey {
    fn default() -> Self {
        Self::new()
    }
}
