//! Shared test utilities
//!
//! Helpers for evaluating Monkey source in integration tests with less
//! boilerplate.

#![allow(dead_code)]

use monkey_runtime::bytecode::Bytecode;
use monkey_runtime::{parse_source, Compiler, Monkey, RuntimeError, Value, VM};

// Re-export testing utilities
pub use pretty_assertions::{assert_eq, assert_ne};

/// Compile source that is expected to be valid
pub fn compile(source: &str) -> Bytecode {
    let program = parse_source(source).expect("parse failed");
    let mut compiler = Compiler::new();
    compiler.compile(&program).expect("compilation failed")
}

/// Compile and run, returning the VM so tests can inspect its final state
pub fn run_vm(source: &str) -> (VM, Result<(), RuntimeError>) {
    let mut vm = VM::new(compile(source));
    let result = vm.run();
    (vm, result)
}

/// Evaluate through the embedding API
pub fn eval(source: &str) -> Value {
    match Monkey::new().eval(source) {
        Ok(value) => value,
        Err(diags) => panic!("Expected success for {:?}, got {:?}", source, diags),
    }
}

/// Run source expected to fail at runtime and return the error
pub fn runtime_error(source: &str) -> RuntimeError {
    match run_vm(source) {
        (_, Err(err)) => err,
        (vm, Ok(())) => panic!(
            "Expected runtime error for {:?}, got {:?}",
            source,
            vm.last_popped()
        ),
    }
}

/// Assert that source code evaluates to an integer
pub fn assert_eval_integer(source: &str, expected: i64) {
    match eval(source) {
        Value::Integer(n) => assert_eq!(n, expected, "for {:?}", source),
        other => panic!("Expected Integer({}), got {:?}", expected, other),
    }
}

/// Assert that source code evaluates to a string
pub fn assert_eval_string(source: &str, expected: &str) {
    match eval(source) {
        Value::String(s) => assert_eq!(s.as_str(), expected, "for {:?}", source),
        other => panic!("Expected String({:?}), got {:?}", expected, other),
    }
}

/// Assert that source code evaluates to null
pub fn assert_eval_null(source: &str) {
    match eval(source) {
        Value::Null => {}
        other => panic!("Expected Null, got {:?}", other),
    }
}

/// Assert that source code produces a diagnostic with a specific code
pub fn assert_error_code(source: &str, expected_code: &str) {
    match Monkey::new().eval(source) {
        Err(diags) => {
            assert!(!diags.is_empty(), "Expected error, got success");
            assert_eq!(
                diags[0].code, expected_code,
                "Expected error code {}, got {}: {}",
                expected_code, diags[0].code, diags[0].message
            );
        }
        Ok(value) => panic!(
            "Expected error {}, got success with value {:?}",
            expected_code, value
        ),
    }
}
