//! REPL core logic (UI-agnostic)

use crate::compiler::Compiler;
use crate::diagnostic::Diagnostic;
use crate::runtime::{attach_source, ends_in_expression, parse_source};
use crate::symbol::SymbolTable;
use crate::value::Value;
use crate::vm::{Globals, VM};
use monkey_config::VmConfig;
use std::mem;

/// REPL result type
#[derive(Debug)]
pub struct ReplResult {
    /// The value produced by evaluation (None if statement or error)
    pub value: Option<Value>,
    /// Diagnostics from all phases, warnings included
    pub diagnostics: Vec<Diagnostic>,
}

impl ReplResult {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

/// REPL core state
///
/// Maintains persistent state across multiple eval calls:
/// - Global definitions keep their symbol slots
/// - The constant pool only grows, so older functions stay valid
/// - Errors do not reset state
pub struct ReplCore {
    symbols: SymbolTable,
    constants: Vec<Value>,
    globals: Globals,
    config: VmConfig,
}

impl ReplCore {
    /// Create a new REPL core with the default VM limits
    pub fn new() -> Self {
        Self::with_config(VmConfig::default())
    }

    pub fn with_config(config: VmConfig) -> Self {
        let (symbols, constants) = Compiler::new().into_state();
        Self {
            symbols,
            constants,
            globals: Globals::new(config.globals_size),
            config,
        }
    }

    /// Evaluate one line (or block) of input
    ///
    /// Definitions made by earlier inputs are visible. Nothing is rolled back:
    /// names defined before a compile error stay defined (reading as null until
    /// assigned), and global writes made before a runtime error remain.
    pub fn eval_line(&mut self, input: &str) -> ReplResult {
        let program = match parse_source(input) {
            Ok(program) => program,
            Err(diagnostics) => {
                return ReplResult {
                    value: None,
                    diagnostics,
                }
            }
        };

        let mut compiler =
            Compiler::new_with_state(mem::take(&mut self.symbols), mem::take(&mut self.constants));
        let compiled = compiler.compile(&program);
        let mut diagnostics = attach_source(compiler.warnings().to_vec(), input);
        (self.symbols, self.constants) = compiler.into_state();

        let bytecode = match compiled {
            Ok(bytecode) => bytecode,
            Err(errors) => {
                diagnostics.extend(attach_source(errors, input));
                return ReplResult {
                    value: None,
                    diagnostics,
                };
            }
        };

        let globals = mem::replace(&mut self.globals, Globals::new(0));
        let mut vm = VM::with_config_and_globals(bytecode, &self.config, globals);
        let result = vm.run();
        let last = vm.last_popped();
        self.globals = vm.into_globals();

        match result {
            Ok(()) => ReplResult {
                value: ends_in_expression(&program).then_some(last),
                diagnostics,
            },
            Err(e) => {
                diagnostics.push(e.to_diagnostic());
                ReplResult {
                    value: None,
                    diagnostics,
                }
            }
        }
    }

    /// Forget every definition made so far
    pub fn reset(&mut self) {
        *self = Self::with_config(self.config.clone());
    }

    /// Names defined at the top level so far, in definition order
    pub fn defined_names(&self) -> Vec<String> {
        self.symbols.defined_names()
    }
}

impl Default for ReplCore {
    fn default() -> Self {
        Self::new()
    }
}
