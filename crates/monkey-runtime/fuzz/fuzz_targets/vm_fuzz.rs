//! VM stability fuzzer
//!
//! Two paths, picked by the first byte:
//!
//! 1. Source: arbitrary text through `Monkey::eval`, which must return a value
//!    or diagnostics and give the same answer twice.
//! 2. Raw bytecode: arbitrary bytes run as a root instruction stream, which
//!    must halt with a `RuntimeError` rather than panic.

#![no_main]

use libfuzzer_sys::fuzz_target;

use monkey_config::VmConfig;
use monkey_runtime::bytecode::{Bytecode, Instructions};
use monkey_runtime::{Monkey, Opcode, Value, VM};

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    if data[0] % 2 == 0 {
        if let Ok(input) = std::str::from_utf8(&data[1..]) {
            fuzz_source(input);
        }
    } else {
        fuzz_bytecode(&data[1..]);
    }
});

fn fuzz_source(input: &str) {
    // Loops can legitimately run forever
    if input.contains("while") || input.contains("for") {
        return;
    }

    let runtime = Monkey::with_config(VmConfig {
        max_frames: 64,
        ..VmConfig::default()
    });
    let first = runtime.eval(input);
    let second = runtime.eval(input);
    assert_eq!(first.is_ok(), second.is_ok(), "eval is non-deterministic");
}

fn fuzz_bytecode(bytes: &[u8]) {
    // Backward jumps can loop forever
    let jumps = [Opcode::Jump as u8, Opcode::JumpNotTruthy as u8];
    if bytes.iter().any(|b| jumps.contains(b)) {
        return;
    }

    let bytecode = Bytecode::new(
        Instructions::from(bytes.to_vec()),
        vec![Value::Integer(1), Value::string("fuzz")],
    );
    let config = VmConfig {
        stack_size: 64,
        max_frames: 8,
        globals_size: 16,
    };
    let mut vm = VM::with_config(bytecode, &config);
    let _ = vm.run();
}
