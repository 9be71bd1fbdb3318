//! Monkey Runtime - Core language implementation
//!
//! This library provides the complete Monkey language runtime including:
//! - Lexical analysis and parsing
//! - Bytecode compilation with scoped symbol resolution
//! - A stack-based virtual machine
//! - Builtin functions

/// Monkey runtime version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Public API modules
pub mod ast;
pub mod bytecode;
pub mod compiler;
pub mod diagnostic;
pub mod lexer;
pub mod parser;
pub mod repl;
pub mod runtime;
pub mod span;
pub mod stdlib;
pub mod symbol;
pub mod token;
pub mod value;
pub mod vm;

// Re-export commonly used types
pub use ast::Program;
pub use bytecode::{disassemble, Bytecode, Instructions, Opcode};
pub use compiler::{CompileError, Compiler};
pub use diagnostic::{error_codes, Diagnostic, DiagnosticLevel, DIAG_VERSION};
pub use lexer::Lexer;
pub use parser::Parser;
pub use repl::{ReplCore, ReplResult};
pub use runtime::{parse_source, Monkey, Outcome, RuntimeResult};
pub use span::Span;
pub use symbol::{Symbol, SymbolScope, SymbolTable};
pub use token::{Token, TokenKind};
pub use value::{CompiledFunction, RuntimeError, Value};
pub use vm::{Globals, VmState, VM};
