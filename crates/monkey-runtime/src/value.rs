//! Runtime value representation
//!
//! Shared by the compiler (constant pool) and the VM (stack, globals).
//! - Integers, Floats, Booleans, Null: immediate values
//! - Strings and Arrays: reference-counted (Arc), immutable from the language side
//! - Functions: compiled bytecode bodies or entries in the builtin table

use crate::bytecode::Instructions;
use crate::diagnostic::{error_codes, Diagnostic};
use crate::span::Span;
use crate::stdlib::Builtin;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// A compiled function body
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompiledFunction {
    pub instructions: Instructions,
    /// Slots reserved on the stack for the frame (parameters first)
    pub num_locals: usize,
    pub num_parameters: usize,
    /// Binding name when the literal was the value of a `var`
    pub name: Option<String>,
}

impl CompiledFunction {
    pub fn new(instructions: Instructions, num_locals: usize, num_parameters: usize) -> Self {
        Self {
            instructions,
            num_locals,
            num_parameters,
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Runtime value type
#[derive(Clone)]
pub enum Value {
    /// 64-bit signed integer
    Integer(i64),
    /// IEEE 754 double
    Float(f64),
    /// String value (reference-counted, immutable)
    String(Arc<String>),
    Boolean(bool),
    Null,
    /// Array value (reference-counted, immutable)
    Array(Arc<Vec<Value>>),
    /// Compiled function from the constant pool
    Function(Arc<CompiledFunction>),
    /// Entry in the builtin table
    Builtin(&'static Builtin),
    /// First-class error value produced by builtins
    Error(Arc<String>),
    /// Wrapped return value; the VM unwraps it on return
    Return(Box<Value>),
}

impl Value {
    /// Create a new string value
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(Arc::new(s.into()))
    }

    /// Create a new array value
    pub fn array(values: Vec<Value>) -> Self {
        Value::Array(Arc::new(values))
    }

    /// Create a new error value
    pub fn error(message: impl Into<String>) -> Self {
        Value::Error(Arc::new(message.into()))
    }

    /// Type name as reported by `typeof` and in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "INTEGER",
            Value::Float(_) => "FLOAT",
            Value::String(_) => "STRING",
            Value::Boolean(_) => "BOOLEAN",
            Value::Null => "NULL",
            Value::Array(_) => "ARRAY",
            Value::Function(_) => "FUNCTION",
            Value::Builtin(_) => "BUILTIN",
            Value::Error(_) => "ERROR",
            Value::Return(_) => "RETURN_VALUE",
        }
    }

    /// Only `null` and `false` are falsey
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Null | Value::Boolean(false))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    /// Strip any return wrappers
    pub fn unwrap_return(self) -> Value {
        match self {
            Value::Return(inner) => inner.unwrap_return(),
            other => other,
        }
    }

    /// Rendering used for elements nested inside an array
    fn fmt_nested(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{:?}", s.as_str()),
            other => write!(f, "{}", other),
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl PartialEq for Value {
    /// Values of different kinds are never equal. Strings and arrays compare
    /// by content; compiled functions by identity; builtins by name.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Null, Value::Null) => true,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Arc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => a.name == b.name,
            (Value::Error(a), Value::Error(b)) => a == b,
            (Value::Return(a), Value::Return(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "{}", n),
            Value::Float(n) => {
                // Whole floats keep a trailing `.0`
                if n.fract() == 0.0 && n.is_finite() {
                    write!(f, "{:.1}", n)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::String(s) => write!(f, "{}", s.as_str()),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Null => write!(f, "null"),
            Value::Array(elements) => {
                write!(f, "[")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    element.fmt_nested(f)?;
                }
                write!(f, "]")
            }
            Value::Function(func) => match &func.name {
                Some(name) => write!(f, "<fn {}>", name),
                None => write!(f, "<fn>"),
            },
            Value::Builtin(builtin) => write!(f, "<builtin {}>", builtin.name),
            Value::Error(message) => write!(f, "ERROR: {}", message),
            Value::Return(inner) => write!(f, "{}", inner),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "Integer({})", n),
            Value::Float(n) => write!(f, "Float({})", n),
            Value::String(s) => write!(f, "String({:?})", s.as_str()),
            Value::Boolean(b) => write!(f, "Boolean({})", b),
            Value::Null => write!(f, "Null"),
            Value::Array(elements) => write!(f, "Array({:?})", elements.as_slice()),
            Value::Function(func) => write!(f, "Function({:?})", func),
            Value::Builtin(builtin) => write!(f, "Builtin({:?})", builtin.name),
            Value::Error(message) => write!(f, "Error({:?})", message.as_str()),
            Value::Return(inner) => write!(f, "Return({:?})", inner),
        }
    }
}

/// Fatal VM error. Halts the machine; nothing is rolled back.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RuntimeError {
    #[error("stack overflow (capacity {capacity})")]
    StackOverflow { capacity: usize },

    #[error("frame overflow (max {max_frames} frames)")]
    FrameOverflow { max_frames: usize },

    #[error("stack underflow")]
    StackUnderflow,

    #[error("unknown opcode {byte:#04x} at offset {offset}")]
    UnknownOpcode { byte: u8, offset: usize },

    #[error("truncated {opcode} instruction at offset {offset}")]
    TruncatedInstruction { opcode: String, offset: usize },

    #[error("unsupported types for binary operation: {left} {op} {right}")]
    UnsupportedBinaryOperation {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },

    /// `<`, `<=` and `>=` all lower to `Greater`, so no operator is named
    #[error("unsupported types for comparison: {first} and {second}")]
    UnsupportedComparison {
        first: &'static str,
        second: &'static str,
    },

    #[error("unsupported type for {op}: {operand}")]
    UnsupportedUnaryOperation {
        op: &'static str,
        operand: &'static str,
    },

    #[error("index operator not supported: {target}[{index}]")]
    UnsupportedIndex {
        target: &'static str,
        index: &'static str,
    },

    #[error("calling non-function: {type_name}")]
    NotCallable { type_name: &'static str },

    #[error("wrong number of arguments: want={expected}, got={got}")]
    WrongArity { expected: usize, got: usize },

    #[error("division by zero")]
    DivisionByZero,

    #[error("constant index {index} out of range")]
    ConstantOutOfRange { index: usize },

    #[error("global index {index} out of range (capacity {capacity})")]
    GlobalOutOfRange { index: usize, capacity: usize },

    #[error("local slot {index} out of range")]
    LocalOutOfRange { index: usize },

    #[error("builtin index {index} out of range")]
    BuiltinOutOfRange { index: usize },

    #[error("vm has already halted")]
    AlreadyHalted,
}

impl RuntimeError {
    /// Stable diagnostic code for this error
    pub fn code(&self) -> &'static str {
        match self {
            RuntimeError::StackOverflow { .. } => error_codes::STACK_OVERFLOW,
            RuntimeError::FrameOverflow { .. } => error_codes::FRAME_OVERFLOW,
            RuntimeError::StackUnderflow => error_codes::STACK_UNDERFLOW,
            RuntimeError::UnknownOpcode { .. } => error_codes::UNKNOWN_OPCODE,
            RuntimeError::TruncatedInstruction { .. }
            | RuntimeError::ConstantOutOfRange { .. }
            | RuntimeError::GlobalOutOfRange { .. }
            | RuntimeError::LocalOutOfRange { .. }
            | RuntimeError::BuiltinOutOfRange { .. } => error_codes::BAD_OPERAND,
            RuntimeError::UnsupportedBinaryOperation { .. }
            | RuntimeError::UnsupportedComparison { .. }
            | RuntimeError::UnsupportedUnaryOperation { .. } => error_codes::TYPE_MISMATCH,
            RuntimeError::UnsupportedIndex { .. } => error_codes::NOT_INDEXABLE,
            RuntimeError::NotCallable { .. } => error_codes::NOT_CALLABLE,
            RuntimeError::WrongArity { .. } => error_codes::ARITY_MISMATCH,
            RuntimeError::DivisionByZero => error_codes::DIVIDE_BY_ZERO,
            RuntimeError::AlreadyHalted => error_codes::VM_STATE,
        }
    }

    /// Bytecode carries no source positions, so the diagnostic has a dummy span
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::error_with_code(self.code(), self.to_string(), Span::dummy())
            .with_label("runtime error")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stdlib;

    #[test]
    fn test_display_primitives() {
        assert_eq!(Value::Integer(-42).to_string(), "-42");
        assert_eq!(Value::Float(3.0).to_string(), "3.0");
        assert_eq!(Value::Float(2.5).to_string(), "2.5");
        assert_eq!(Value::Boolean(true).to_string(), "true");
        assert_eq!(Value::Null.to_string(), "null");
        assert_eq!(Value::string("hi").to_string(), "hi");
        assert_eq!(Value::error("boom").to_string(), "ERROR: boom");
    }

    #[test]
    fn test_display_array_quotes_strings() {
        let value = Value::array(vec![Value::Integer(1), Value::string("a"), Value::Null]);
        assert_eq!(value.to_string(), r#"[1, "a", null]"#);
    }

    #[test]
    fn test_display_functions() {
        let anonymous = Value::Function(Arc::new(CompiledFunction::default()));
        assert_eq!(anonymous.to_string(), "<fn>");

        let named = Value::Function(Arc::new(CompiledFunction::default().with_name("fib")));
        assert_eq!(named.to_string(), "<fn fib>");

        let len = stdlib::lookup("len").unwrap();
        assert_eq!(Value::Builtin(len).to_string(), "<builtin len>");
    }

    #[test]
    fn test_truthiness() {
        assert!(Value::Integer(0).is_truthy());
        assert!(Value::string("").is_truthy());
        assert!(Value::array(vec![]).is_truthy());
        assert!(Value::Boolean(true).is_truthy());
        assert!(!Value::Boolean(false).is_truthy());
        assert!(!Value::Null.is_truthy());
    }

    #[test]
    fn test_equality_never_crosses_kinds() {
        assert_ne!(Value::Integer(1), Value::Float(1.0));
        assert_ne!(Value::Integer(1), Value::Boolean(true));
        assert_ne!(Value::Null, Value::Boolean(false));
        assert_eq!(Value::string("ab"), Value::string("ab"));
        assert_eq!(
            Value::array(vec![Value::Integer(1)]),
            Value::array(vec![Value::Integer(1)])
        );
    }

    #[test]
    fn test_function_equality_is_identity() {
        let f = Arc::new(CompiledFunction::default());
        let same = Value::Function(Arc::clone(&f));
        assert_eq!(Value::Function(f), same);
        assert_ne!(
            Value::Function(Arc::new(CompiledFunction::default())),
            Value::Function(Arc::new(CompiledFunction::default()))
        );
    }

    #[test]
    fn test_unwrap_return() {
        let wrapped = Value::Return(Box::new(Value::Return(Box::new(Value::Integer(3)))));
        assert_eq!(wrapped.type_name(), "RETURN_VALUE");
        assert_eq!(wrapped.unwrap_return(), Value::Integer(3));
    }

    #[test]
    fn test_runtime_error_messages() {
        assert_eq!(
            RuntimeError::WrongArity {
                expected: 1,
                got: 2
            }
            .to_string(),
            "wrong number of arguments: want=1, got=2"
        );
        assert_eq!(
            RuntimeError::UnsupportedBinaryOperation {
                op: "+",
                left: "INTEGER",
                right: "FLOAT"
            }
            .to_string(),
            "unsupported types for binary operation: INTEGER + FLOAT"
        );
        assert_eq!(
            RuntimeError::UnknownOpcode {
                byte: 0xEE,
                offset: 4
            }
            .to_string(),
            "unknown opcode 0xee at offset 4"
        );
    }

    #[test]
    fn test_runtime_error_diagnostic_code() {
        let diag = RuntimeError::DivisionByZero.to_diagnostic();
        assert_eq!(diag.code, error_codes::DIVIDE_BY_ZERO);
        assert_eq!(diag.message, "division by zero");
        assert!(diag.is_error());
    }
}
