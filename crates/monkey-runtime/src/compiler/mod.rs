//! AST to bytecode compiler
//!
//! Single-pass tree walk emitting stack-based bytecode.
//! - Expressions leave exactly one value on the stack
//! - Expression statements discard it with `Pop`; `var` and `return` leave nothing
//! - Each function body compiles into its own scope on a scope stack
//! - Names resolve through a chained symbol table (globals, locals, builtins)
//! - Forward jumps are emitted with a placeholder and patched in place

mod expr;
mod stmt;

use crate::ast::*;
use crate::bytecode::{make, Bytecode, Instructions, Opcode};
use crate::diagnostic::{error_codes, Diagnostic};
use crate::span::Span;
use crate::stdlib::BUILTINS;
use crate::symbol::{Symbol, SymbolScope, SymbolTable};
use crate::value::Value;
use thiserror::Error;
use tracing::debug;

/// Constant pool and global slot indices are u16 operands
pub const MAX_CONSTANTS: usize = 1 << 16;
pub const MAX_GLOBALS: usize = 1 << 16;
/// Local slots are u8 operands
pub const MAX_LOCALS: usize = 1 << 8;
/// Call argument counts are a u8 operand
pub const MAX_ARGUMENTS: usize = u8::MAX as usize;
/// Array element counts are a u16 operand
pub const MAX_ARRAY_ELEMENTS: usize = u16::MAX as usize;
/// Jump targets are u16 offsets into the current scope's instructions
pub const MAX_JUMP_TARGET: usize = u16::MAX as usize;

/// Compile error
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CompileError {
    #[error("undefined variable {name}")]
    UndefinedVariable { name: String, span: Span },

    #[error("cannot assign to builtin {name}")]
    AssignToBuiltin { name: String, span: Span },

    #[error("return outside function")]
    ReturnOutsideFunction { span: Span },

    #[error("cannot capture local variable {name}")]
    CapturedLocal { name: String, span: Span },

    #[error("too many {what} (limit {limit})")]
    LimitExceeded {
        what: &'static str,
        limit: usize,
        span: Span,
    },
}

impl CompileError {
    pub fn span(&self) -> Span {
        match self {
            CompileError::UndefinedVariable { span, .. }
            | CompileError::AssignToBuiltin { span, .. }
            | CompileError::ReturnOutsideFunction { span }
            | CompileError::CapturedLocal { span, .. }
            | CompileError::LimitExceeded { span, .. } => *span,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            CompileError::UndefinedVariable { .. } => error_codes::UNDEFINED_VARIABLE,
            CompileError::AssignToBuiltin { .. } => error_codes::ASSIGN_TO_BUILTIN,
            CompileError::ReturnOutsideFunction { .. } => error_codes::RETURN_OUTSIDE_FUNCTION,
            CompileError::CapturedLocal { .. } => error_codes::CAPTURED_LOCAL,
            CompileError::LimitExceeded { .. } => error_codes::LIMIT_EXCEEDED,
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = Diagnostic::error_with_code(self.code(), self.to_string(), self.span())
            .with_label("compile error");
        match self {
            CompileError::CapturedLocal { .. } => {
                diag.with_help("functions only see their own locals, globals and builtins")
            }
            _ => diag,
        }
    }
}

/// Opcode and offset of an emitted instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct EmittedInstruction {
    pub(super) opcode: Opcode,
    pub(super) position: usize,
}

/// Per-function instruction buffer
#[derive(Debug, Clone, Default)]
pub(super) struct CompilationScope {
    pub(super) instructions: Instructions,
    pub(super) last_instruction: Option<EmittedInstruction>,
    pub(super) previous_instruction: Option<EmittedInstruction>,
}

/// Compiler state
pub struct Compiler {
    /// Constant pool, shared by every scope
    pub(super) constants: Vec<Value>,
    pub(super) symbols: SymbolTable,
    /// Innermost scope last; the root scope is never popped
    pub(super) scopes: Vec<CompilationScope>,
    pub(super) warnings: Vec<Diagnostic>,
}

impl Compiler {
    /// Create a compiler with a fresh global table and the builtins registered
    pub fn new() -> Self {
        let mut symbols = SymbolTable::new();
        for (index, builtin) in BUILTINS.iter().enumerate() {
            symbols.define_builtin(index, builtin.name);
        }
        Self::new_with_state(symbols, Vec::new())
    }

    /// Resume from the symbol table and constants of an earlier compilation
    pub fn new_with_state(symbols: SymbolTable, constants: Vec<Value>) -> Self {
        Self {
            constants,
            symbols,
            scopes: vec![CompilationScope::default()],
            warnings: Vec::new(),
        }
    }

    /// Hand the global table and constant pool back for the next compilation
    pub fn into_state(self) -> (SymbolTable, Vec<Value>) {
        (self.symbols, self.constants)
    }

    /// Warnings collected so far (never fatal)
    pub fn warnings(&self) -> &[Diagnostic] {
        &self.warnings
    }

    /// Compile a program to bytecode
    ///
    /// Stops at the first error. Symbols defined and constants added before the
    /// error stay in the compiler's state.
    pub fn compile(&mut self, program: &Program) -> Result<Bytecode, Vec<Diagnostic>> {
        debug!(
            statements = program.statements.len(),
            constants = self.constants.len(),
            "compiling program"
        );

        for stmt in &program.statements {
            if let Err(err) = self.compile_stmt(stmt) {
                debug!(error = %err, "compilation failed");
                self.unwind();
                return Err(vec![err.to_diagnostic()]);
            }
        }

        let root = std::mem::take(&mut self.scopes[0]);
        Ok(Bytecode::new(root.instructions, self.constants.clone()))
    }

    /// Drop any half-compiled function scopes and the root buffer after an error
    fn unwind(&mut self) {
        while self.scopes.len() > 1 {
            self.leave_scope();
        }
        self.scopes[0] = CompilationScope::default();
    }

    pub(super) fn scope(&self) -> &CompilationScope {
        &self.scopes[self.scopes.len() - 1]
    }

    fn scope_mut(&mut self) -> &mut CompilationScope {
        let last = self.scopes.len() - 1;
        &mut self.scopes[last]
    }

    /// Whether code is being emitted into a function body
    pub(super) fn in_function(&self) -> bool {
        self.scopes.len() > 1
    }

    /// Emit one instruction into the current scope, returning its offset
    pub(super) fn emit(&mut self, op: Opcode, operands: &[usize]) -> usize {
        let instruction = make(op, operands);
        let scope = self.scope_mut();
        let position = scope.instructions.push(&instruction);
        scope.previous_instruction = scope.last_instruction;
        scope.last_instruction = Some(EmittedInstruction {
            opcode: op,
            position,
        });
        position
    }

    /// Offset the next emitted instruction will land at
    pub(super) fn current_position(&self) -> usize {
        self.scope().instructions.len()
    }

    pub(super) fn last_instruction_is(&self, op: Opcode) -> bool {
        matches!(self.scope().last_instruction, Some(last) if last.opcode == op)
    }

    /// Undo a trailing `Pop` so the value it would discard stays on the stack
    pub(super) fn remove_last_pop(&mut self) {
        let scope = self.scope_mut();
        if let Some(last) = scope.last_instruction {
            scope.instructions.truncate(last.position);
            scope.last_instruction = scope.previous_instruction;
        }
    }

    /// Turn a trailing `Pop` into `ReturnValue`
    pub(super) fn replace_last_pop_with_return(&mut self) {
        let scope = self.scope_mut();
        if let Some(last) = scope.last_instruction.as_mut() {
            scope
                .instructions
                .replace(last.position, &make(Opcode::ReturnValue, &[]));
            last.opcode = Opcode::ReturnValue;
        }
    }

    /// Patch a jump at `position` to land on `target`
    pub(super) fn change_operand(
        &mut self,
        position: usize,
        op: Opcode,
        target: usize,
        span: Span,
    ) -> Result<(), CompileError> {
        if target > MAX_JUMP_TARGET {
            return Err(CompileError::LimitExceeded {
                what: "instruction bytes",
                limit: MAX_JUMP_TARGET,
                span,
            });
        }
        self.scope_mut()
            .instructions
            .replace(position, &make(op, &[target]));
        Ok(())
    }

    /// Append to the constant pool, returning the new index
    pub(super) fn add_constant(&mut self, value: Value, span: Span) -> Result<usize, CompileError> {
        if self.constants.len() >= MAX_CONSTANTS {
            return Err(CompileError::LimitExceeded {
                what: "constants",
                limit: MAX_CONSTANTS,
                span,
            });
        }
        self.constants.push(value);
        Ok(self.constants.len() - 1)
    }

    pub(super) fn emit_constant(&mut self, value: Value, span: Span) -> Result<usize, CompileError> {
        let index = self.add_constant(value, span)?;
        Ok(self.emit(Opcode::Constant, &[index]))
    }

    /// Start compiling a function body
    pub(super) fn enter_scope(&mut self) {
        self.scopes.push(CompilationScope::default());
        let outer = std::mem::take(&mut self.symbols);
        self.symbols = SymbolTable::new_enclosed(outer);
    }

    /// Finish a function body, returning its instructions and local slot count
    pub(super) fn leave_scope(&mut self) -> (Instructions, usize) {
        let num_locals = self.symbols.num_definitions();
        let scope = self.scopes.pop().unwrap_or_default();
        if let Some(outer) = std::mem::take(&mut self.symbols).into_outer() {
            self.symbols = outer;
        }
        (scope.instructions, num_locals)
    }

    /// Bind a new name in the current table, enforcing slot limits
    pub(super) fn define(&mut self, ident: &Identifier) -> Result<Symbol, CompileError> {
        if let Some(existing) = self.symbols.resolve(&ident.name) {
            if existing.scope == SymbolScope::Builtin {
                self.warnings.push(
                    Diagnostic::warning_with_code(
                        error_codes::SHADOWS_BUILTIN,
                        format!("`{}` shadows a builtin function", ident.name),
                        ident.span,
                    )
                    .with_label("shadows builtin"),
                );
            }
        }

        let symbol = self.symbols.define(&ident.name);
        let limit = match symbol.scope {
            SymbolScope::Global => MAX_GLOBALS,
            _ => MAX_LOCALS,
        };
        if symbol.index >= limit {
            return Err(CompileError::LimitExceeded {
                what: if symbol.scope == SymbolScope::Global {
                    "globals"
                } else {
                    "locals"
                },
                limit,
                span: ident.span,
            });
        }
        Ok(symbol)
    }

    /// Resolve a name for reading or writing
    ///
    /// Locals of an enclosing function are rejected: there are no closures.
    pub(super) fn resolve(&self, ident: &Identifier) -> Result<Symbol, CompileError> {
        let symbol =
            self.symbols
                .resolve(&ident.name)
                .ok_or_else(|| CompileError::UndefinedVariable {
                    name: ident.name.clone(),
                    span: ident.span,
                })?;

        if symbol.scope == SymbolScope::Local && !self.symbols.defines_locally(&ident.name) {
            return Err(CompileError::CapturedLocal {
                name: ident.name.clone(),
                span: ident.span,
            });
        }
        Ok(symbol)
    }

    pub(super) fn load_symbol(&mut self, symbol: &Symbol) {
        let op = match symbol.scope {
            SymbolScope::Global => Opcode::GetGlobal,
            SymbolScope::Local => Opcode::GetLocal,
            SymbolScope::Builtin => Opcode::GetBuiltin,
        };
        self.emit(op, &[symbol.index]);
    }

    pub(super) fn store_symbol(&mut self, symbol: &Symbol, span: Span) -> Result<(), CompileError> {
        let op = match symbol.scope {
            SymbolScope::Global => Opcode::SetGlobal,
            SymbolScope::Local => Opcode::SetLocal,
            SymbolScope::Builtin => {
                return Err(CompileError::AssignToBuiltin {
                    name: symbol.name.clone(),
                    span,
                })
            }
        };
        self.emit(op, &[symbol.index]);
        Ok(())
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;
    use crate::value::CompiledFunction;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn parse(source: &str) -> Program {
        let (tokens, lex_diags) = Lexer::new(source).tokenize();
        assert!(lex_diags.is_empty(), "Lexer errors: {:?}", lex_diags);
        let (program, parse_diags) = Parser::new(tokens).parse();
        assert!(parse_diags.is_empty(), "Parser errors: {:?}", parse_diags);
        program
    }

    fn compile_source(source: &str) -> Bytecode {
        Compiler::new()
            .compile(&parse(source))
            .expect("Compilation failed")
    }

    fn compile_error(source: &str) -> Diagnostic {
        let mut diags = Compiler::new()
            .compile(&parse(source))
            .expect_err("Expected a compile error");
        assert_eq!(diags.len(), 1);
        diags.remove(0)
    }

    fn concat(instructions: Vec<Vec<u8>>) -> Instructions {
        instructions.into_iter().collect()
    }

    fn function(constant: &Value) -> &CompiledFunction {
        match constant {
            Value::Function(f) => f,
            other => panic!("Expected function constant, got {:?}", other),
        }
    }

    #[rstest]
    #[case("1 + 2", Opcode::Add)]
    #[case("1 - 2", Opcode::Sub)]
    #[case("1 * 2", Opcode::Mul)]
    #[case("1 / 2", Opcode::Div)]
    #[case("1 > 2", Opcode::Greater)]
    #[case("1 == 2", Opcode::Equal)]
    #[case("1 != 2", Opcode::NotEqual)]
    fn test_binary_operators(#[case] source: &str, #[case] op: Opcode) {
        let bytecode = compile_source(source);
        assert_eq!(
            bytecode.instructions,
            concat(vec![
                make(Opcode::Constant, &[0]),
                make(Opcode::Constant, &[1]),
                make(op, &[]),
                make(Opcode::Pop, &[]),
            ])
        );
        assert_eq!(bytecode.constants, vec![Value::Integer(1), Value::Integer(2)]);
    }

    #[test]
    fn test_less_than_swaps_operands() {
        let bytecode = compile_source("1 < 2");
        assert_eq!(bytecode.constants, vec![Value::Integer(2), Value::Integer(1)]);
        assert_eq!(
            bytecode.instructions,
            concat(vec![
                make(Opcode::Constant, &[0]),
                make(Opcode::Constant, &[1]),
                make(Opcode::Greater, &[]),
                make(Opcode::Pop, &[]),
            ])
        );
    }

    #[rstest]
    #[case("1 <= 2", vec![Value::Integer(1), Value::Integer(2)])]
    #[case("1 >= 2", vec![Value::Integer(2), Value::Integer(1)])]
    fn test_inclusive_comparisons_negate_greater(
        #[case] source: &str,
        #[case] constants: Vec<Value>,
    ) {
        let bytecode = compile_source(source);
        assert_eq!(bytecode.constants, constants);
        assert_eq!(
            bytecode.instructions,
            concat(vec![
                make(Opcode::Constant, &[0]),
                make(Opcode::Constant, &[1]),
                make(Opcode::Greater, &[]),
                make(Opcode::Not, &[]),
                make(Opcode::Pop, &[]),
            ])
        );
    }

    #[test]
    fn test_prefix_and_booleans() {
        let bytecode = compile_source("-1; !true; false;");
        assert_eq!(
            bytecode.instructions,
            concat(vec![
                make(Opcode::Constant, &[0]),
                make(Opcode::Negate, &[]),
                make(Opcode::Pop, &[]),
                make(Opcode::True, &[]),
                make(Opcode::Not, &[]),
                make(Opcode::Pop, &[]),
                make(Opcode::False, &[]),
                make(Opcode::Pop, &[]),
            ])
        );
    }

    #[test]
    fn test_constants_are_not_deduplicated() {
        let bytecode = compile_source("1; 1; \"a\"; 2.5;");
        assert_eq!(
            bytecode.constants,
            vec![
                Value::Integer(1),
                Value::Integer(1),
                Value::string("a"),
                Value::Float(2.5)
            ]
        );
    }

    #[test]
    fn test_if_without_else_pushes_null() {
        let bytecode = compile_source("if (true) { 10 }; 3333;");
        assert_eq!(
            bytecode.instructions,
            concat(vec![
                make(Opcode::True, &[]),              // 0000
                make(Opcode::JumpNotTruthy, &[10]),   // 0001
                make(Opcode::Constant, &[0]),         // 0004
                make(Opcode::Jump, &[11]),            // 0007
                make(Opcode::Null, &[]),              // 0010
                make(Opcode::Pop, &[]),               // 0011
                make(Opcode::Constant, &[1]),         // 0012
                make(Opcode::Pop, &[]),               // 0015
            ])
        );
    }

    #[test]
    fn test_if_with_else() {
        let bytecode = compile_source("if (true) { 10 } else { 20 }; 3333;");
        assert_eq!(
            bytecode.instructions,
            concat(vec![
                make(Opcode::True, &[]),              // 0000
                make(Opcode::JumpNotTruthy, &[10]),   // 0001
                make(Opcode::Constant, &[0]),         // 0004
                make(Opcode::Jump, &[13]),            // 0007
                make(Opcode::Constant, &[1]),         // 0010
                make(Opcode::Pop, &[]),               // 0013
                make(Opcode::Constant, &[2]),         // 0014
                make(Opcode::Pop, &[]),               // 0017
            ])
        );
    }

    #[test]
    fn test_if_branch_without_value_pushes_null() {
        let bytecode = compile_source("if (true) { var a = 1; }");
        assert_eq!(
            bytecode.instructions,
            concat(vec![
                make(Opcode::True, &[]),              // 0000
                make(Opcode::JumpNotTruthy, &[14]),   // 0001
                make(Opcode::Constant, &[0]),         // 0004
                make(Opcode::SetGlobal, &[0]),        // 0007
                make(Opcode::Null, &[]),              // 0010
                make(Opcode::Jump, &[15]),            // 0011
                make(Opcode::Null, &[]),              // 0014
                make(Opcode::Pop, &[]),               // 0015
            ])
        );
    }

    #[test]
    fn test_while_loop() {
        let bytecode = compile_source("while (false) { 1 }");
        assert_eq!(
            bytecode.instructions,
            concat(vec![
                make(Opcode::False, &[]),             // 0000
                make(Opcode::JumpNotTruthy, &[11]),   // 0001
                make(Opcode::Constant, &[0]),         // 0004
                make(Opcode::Pop, &[]),               // 0007
                make(Opcode::Jump, &[0]),             // 0008
                make(Opcode::Null, &[]),              // 0011
                make(Opcode::Pop, &[]),               // 0012
            ])
        );
    }

    #[test]
    fn test_global_let_and_read() {
        let bytecode = compile_source("var one = 1; var two = 2; one;");
        assert_eq!(
            bytecode.instructions,
            concat(vec![
                make(Opcode::Constant, &[0]),
                make(Opcode::SetGlobal, &[0]),
                make(Opcode::Constant, &[1]),
                make(Opcode::SetGlobal, &[1]),
                make(Opcode::GetGlobal, &[0]),
                make(Opcode::Pop, &[]),
            ])
        );
    }

    #[test]
    fn test_assignment_yields_value() {
        let bytecode = compile_source("var x = 1; x += 2;");
        assert_eq!(
            bytecode.instructions,
            concat(vec![
                make(Opcode::Constant, &[0]),
                make(Opcode::SetGlobal, &[0]),
                make(Opcode::GetGlobal, &[0]),
                make(Opcode::Constant, &[1]),
                make(Opcode::Add, &[]),
                make(Opcode::SetGlobal, &[0]),
                make(Opcode::GetGlobal, &[0]),
                make(Opcode::Pop, &[]),
            ])
        );
    }

    #[test]
    fn test_array_and_index() {
        let bytecode = compile_source("[1, 2][0]");
        assert_eq!(
            bytecode.instructions,
            concat(vec![
                make(Opcode::Constant, &[0]),
                make(Opcode::Constant, &[1]),
                make(Opcode::Array, &[2]),
                make(Opcode::Constant, &[2]),
                make(Opcode::Index, &[]),
                make(Opcode::Pop, &[]),
            ])
        );
    }

    #[rstest]
    #[case("func() { return 5 + 10 }")]
    #[case("func() { 5 + 10 }")]
    #[case("func() { 5 + 10; }")]
    fn test_function_body_returns_last_value(#[case] source: &str) {
        let bytecode = compile_source(source);
        assert_eq!(
            bytecode.instructions,
            concat(vec![make(Opcode::Constant, &[2]), make(Opcode::Pop, &[])])
        );
        let f = function(&bytecode.constants[2]);
        assert_eq!(
            f.instructions,
            concat(vec![
                make(Opcode::Constant, &[0]),
                make(Opcode::Constant, &[1]),
                make(Opcode::Add, &[]),
                make(Opcode::ReturnValue, &[]),
            ])
        );
        assert_eq!(f.num_parameters, 0);
        assert_eq!(f.num_locals, 0);
    }

    #[test]
    fn test_empty_function_returns_null() {
        let bytecode = compile_source("func() { }");
        let f = function(&bytecode.constants[0]);
        assert_eq!(f.instructions, concat(vec![make(Opcode::Return, &[])]));
    }

    #[test]
    fn test_function_locals_and_parameters() {
        let bytecode = compile_source("func(a) { var b = a; b }");
        let f = function(&bytecode.constants[0]);
        assert_eq!(
            f.instructions,
            concat(vec![
                make(Opcode::GetLocal, &[0]),
                make(Opcode::SetLocal, &[1]),
                make(Opcode::GetLocal, &[1]),
                make(Opcode::ReturnValue, &[]),
            ])
        );
        assert_eq!(f.num_parameters, 1);
        assert_eq!(f.num_locals, 2);
    }

    #[test]
    fn test_function_reads_globals() {
        let bytecode = compile_source("var num = 55; func() { num }");
        let f = function(&bytecode.constants[1]);
        assert_eq!(
            f.instructions,
            concat(vec![
                make(Opcode::GetGlobal, &[0]),
                make(Opcode::ReturnValue, &[]),
            ])
        );
    }

    #[test]
    fn test_recursive_binding_is_visible_in_body() {
        let bytecode = compile_source("var f = func(x) { f(x) };");
        assert_eq!(
            bytecode.instructions,
            concat(vec![
                make(Opcode::Constant, &[0]),
                make(Opcode::SetGlobal, &[0]),
            ])
        );
        let f = function(&bytecode.constants[0]);
        assert_eq!(f.name.as_deref(), Some("f"));
        assert_eq!(
            f.instructions,
            concat(vec![
                make(Opcode::GetGlobal, &[0]),
                make(Opcode::GetLocal, &[0]),
                make(Opcode::Call, &[1]),
                make(Opcode::ReturnValue, &[]),
            ])
        );
    }

    #[test]
    fn test_builtins_resolve_by_index() {
        let bytecode = compile_source("len([]); push([], 1);");
        assert_eq!(
            bytecode.instructions,
            concat(vec![
                make(Opcode::GetBuiltin, &[0]),
                make(Opcode::Array, &[0]),
                make(Opcode::Call, &[1]),
                make(Opcode::Pop, &[]),
                make(Opcode::GetBuiltin, &[2]),
                make(Opcode::Array, &[0]),
                make(Opcode::Constant, &[0]),
                make(Opcode::Call, &[2]),
                make(Opcode::Pop, &[]),
            ])
        );
    }

    #[test]
    fn test_nested_functions_do_not_share_slots() {
        let bytecode = compile_source("func() { var a = 1; func() { var b = 2; b } }");
        let inner = function(&bytecode.constants[2]);
        assert_eq!(
            inner.instructions,
            concat(vec![
                make(Opcode::Constant, &[1]),
                make(Opcode::SetLocal, &[0]),
                make(Opcode::GetLocal, &[0]),
                make(Opcode::ReturnValue, &[]),
            ])
        );
        let outer = function(&bytecode.constants[3]);
        assert_eq!(outer.num_locals, 1);
    }

    #[rstest]
    #[case("x;", error_codes::UNDEFINED_VARIABLE, "undefined variable x")]
    #[case("y = 1;", error_codes::UNDEFINED_VARIABLE, "undefined variable y")]
    #[case("return 1;", error_codes::RETURN_OUTSIDE_FUNCTION, "return outside function")]
    #[case(
        "func(a) { func() { a } }",
        error_codes::CAPTURED_LOCAL,
        "cannot capture local variable a"
    )]
    #[case("len = 1;", error_codes::ASSIGN_TO_BUILTIN, "cannot assign to builtin len")]
    fn test_compile_errors(#[case] source: &str, #[case] code: &str, #[case] message: &str) {
        let diag = compile_error(source);
        assert_eq!(diag.code, code);
        assert_eq!(diag.message, message);
    }

    #[test]
    fn test_error_span_points_at_name() {
        let diag = compile_error("var a = 1;\nmissing;");
        assert_eq!(diag.span, Span::new(11, 18));
    }

    #[test]
    fn test_error_keeps_earlier_definitions() {
        let mut compiler = Compiler::new();
        assert!(compiler.compile(&parse("var a = 1; b;")).is_err());

        let (symbols, constants) = compiler.into_state();
        assert_eq!(constants, vec![Value::Integer(1)]);
        assert_eq!(symbols.resolve("a").map(|s| s.index), Some(0));
        assert!(symbols.is_global());
    }

    #[test]
    fn test_error_inside_function_restores_global_table() {
        let mut compiler = Compiler::new();
        assert!(compiler.compile(&parse("var f = func() { nope };")).is_err());
        let bytecode = compiler.compile(&parse("f;")).unwrap();
        assert_eq!(
            bytecode.instructions,
            concat(vec![make(Opcode::GetGlobal, &[0]), make(Opcode::Pop, &[])])
        );
    }

    #[test]
    fn test_state_threads_between_compilations() {
        let mut first = Compiler::new();
        first.compile(&parse("var a = 1;")).unwrap();
        let (symbols, constants) = first.into_state();

        let mut second = Compiler::new_with_state(symbols, constants);
        let bytecode = second.compile(&parse("a + 2;")).unwrap();
        assert_eq!(bytecode.constants, vec![Value::Integer(1), Value::Integer(2)]);
        assert_eq!(
            bytecode.instructions,
            concat(vec![
                make(Opcode::GetGlobal, &[0]),
                make(Opcode::Constant, &[1]),
                make(Opcode::Add, &[]),
                make(Opcode::Pop, &[]),
            ])
        );
    }

    #[test]
    fn test_shadowing_builtin_warns() {
        let mut compiler = Compiler::new();
        compiler.compile(&parse("var len = 1;")).unwrap();
        assert_eq!(compiler.warnings().len(), 1);
        assert_eq!(compiler.warnings()[0].code, error_codes::SHADOWS_BUILTIN);
    }

    #[test]
    fn test_constant_limit() {
        let mut compiler = Compiler::new();
        compiler.constants = vec![Value::Null; MAX_CONSTANTS];
        let err = compiler.add_constant(Value::Integer(1), Span::dummy()).unwrap_err();
        assert!(matches!(err, CompileError::LimitExceeded { what: "constants", .. }));
    }

    #[test]
    fn test_jump_target_limit() {
        // Each `1;` is Constant + Pop, 4 bytes
        let source = "1;\n".repeat(17_000) + "if (false) { 10 } else { 20 }";
        let diag = compile_error(&source);
        assert_eq!(diag.code, error_codes::LIMIT_EXCEEDED);
        assert_eq!(diag.message, "too many instruction bytes (limit 65535)");
    }

    #[test]
    fn test_while_exit_past_jump_limit() {
        let source = format!("while (false) {{ {} }}", "1;".repeat(17_000));
        assert_eq!(compile_error(&source).code, error_codes::LIMIT_EXCEEDED);
    }

    #[test]
    fn test_jump_target_just_under_limit() {
        let source = "1;\n".repeat(16_000) + "if (false) { 10 } else { 20 }";
        let bytecode = compile_source(&source);
        assert!(bytecode.instructions.len() <= MAX_JUMP_TARGET);
    }
}
