//! Instruction decoding and operator semantics for the VM
//!
//! Opcode bytes decode through a static lookup table. The operator helpers
//! hold the numeric and type rules for arithmetic, comparison, negation and
//! indexing so the dispatch loop only moves values around.

use crate::bytecode::Opcode;
use crate::value::{RuntimeError, Value};

/// Static dispatch table mapping byte values to optional Opcodes.
/// Indexed by the raw u8 opcode byte.
static OPCODE_TABLE: [Option<Opcode>; 256] = {
    let mut table: [Option<Opcode>; 256] = [None; 256];

    // Constants (0x01-0x04)
    table[0x01] = Some(Opcode::Constant);
    table[0x02] = Some(Opcode::Null);
    table[0x03] = Some(Opcode::True);
    table[0x04] = Some(Opcode::False);

    // Variables (0x10-0x14)
    table[0x10] = Some(Opcode::GetLocal);
    table[0x11] = Some(Opcode::SetLocal);
    table[0x12] = Some(Opcode::GetGlobal);
    table[0x13] = Some(Opcode::SetGlobal);
    table[0x14] = Some(Opcode::GetBuiltin);

    // Arithmetic (0x20-0x25)
    table[0x20] = Some(Opcode::Add);
    table[0x21] = Some(Opcode::Sub);
    table[0x22] = Some(Opcode::Mul);
    table[0x23] = Some(Opcode::Div);
    table[0x25] = Some(Opcode::Negate);

    // Comparison (0x30-0x34)
    table[0x30] = Some(Opcode::Equal);
    table[0x31] = Some(Opcode::NotEqual);
    table[0x34] = Some(Opcode::Greater);

    // Logical
    table[0x40] = Some(Opcode::Not);

    // Control flow (0x50-0x51)
    table[0x50] = Some(Opcode::Jump);
    table[0x51] = Some(Opcode::JumpNotTruthy);

    // Functions (0x60-0x62)
    table[0x60] = Some(Opcode::Call);
    table[0x61] = Some(Opcode::ReturnValue);
    table[0x62] = Some(Opcode::Return);

    // Arrays (0x70-0x71)
    table[0x70] = Some(Opcode::Array);
    table[0x71] = Some(Opcode::Index);

    // Stack manipulation
    table[0x80] = Some(Opcode::Pop);

    table
};

/// Decode an opcode byte using the static lookup table.
/// Returns None for invalid opcode bytes.
#[inline(always)]
pub fn decode_opcode(byte: u8) -> Option<Opcode> {
    OPCODE_TABLE[byte as usize]
}

/// Source-level spelling of an operator opcode, for error messages
fn symbol(op: Opcode) -> &'static str {
    match op {
        Opcode::Add => "+",
        Opcode::Sub => "-",
        Opcode::Mul => "*",
        Opcode::Div => "/",
        Opcode::Equal => "==",
        Opcode::NotEqual => "!=",
        Opcode::Greater => ">",
        Opcode::Negate => "-",
        Opcode::Not => "!",
        _ => "?",
    }
}

fn unsupported(op: Opcode, left: &Value, right: &Value) -> RuntimeError {
    RuntimeError::UnsupportedBinaryOperation {
        op: symbol(op),
        left: left.type_name(),
        right: right.type_name(),
    }
}

/// Type names in sorted order: operands may have been swapped by the compiler
fn unordered(left: &Value, right: &Value) -> RuntimeError {
    let (first, second) = if left.type_name() <= right.type_name() {
        (left.type_name(), right.type_name())
    } else {
        (right.type_name(), left.type_name())
    };
    RuntimeError::UnsupportedComparison { first, second }
}

/// `Add`, `Sub`, `Mul`, `Div`
///
/// Integers wrap on overflow and divide truncating toward zero. There is no
/// implicit conversion between integers and floats.
pub fn binary_op(op: Opcode, left: &Value, right: &Value) -> Result<Value, RuntimeError> {
    match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => {
            let result = match op {
                Opcode::Add => a.wrapping_add(*b),
                Opcode::Sub => a.wrapping_sub(*b),
                Opcode::Mul => a.wrapping_mul(*b),
                Opcode::Div if *b == 0 => return Err(RuntimeError::DivisionByZero),
                Opcode::Div => a.wrapping_div(*b),
                _ => return Err(unsupported(op, left, right)),
            };
            Ok(Value::Integer(result))
        }
        (Value::Float(a), Value::Float(b)) => {
            let result = match op {
                Opcode::Add => a + b,
                Opcode::Sub => a - b,
                Opcode::Mul => a * b,
                Opcode::Div => a / b,
                _ => return Err(unsupported(op, left, right)),
            };
            Ok(Value::Float(result))
        }
        (Value::String(a), Value::String(b)) if op == Opcode::Add => {
            let mut joined = String::with_capacity(a.len() + b.len());
            joined.push_str(a);
            joined.push_str(b);
            Ok(Value::string(joined))
        }
        _ => Err(unsupported(op, left, right)),
    }
}

/// `Equal`, `NotEqual`, `Greater`
///
/// Equality is defined for every pair of values; ordering only for two
/// integers or two floats.
pub fn compare(op: Opcode, left: &Value, right: &Value) -> Result<Value, RuntimeError> {
    let result = match op {
        Opcode::Equal => left == right,
        Opcode::NotEqual => left != right,
        Opcode::Greater => match (left, right) {
            (Value::Integer(a), Value::Integer(b)) => a > b,
            (Value::Float(a), Value::Float(b)) => a > b,
            _ => return Err(unordered(left, right)),
        },
        _ => return Err(unsupported(op, left, right)),
    };
    Ok(Value::Boolean(result))
}

/// `Negate`
pub fn negate(operand: &Value) -> Result<Value, RuntimeError> {
    match operand {
        Value::Integer(n) => Ok(Value::Integer(n.wrapping_neg())),
        Value::Float(n) => Ok(Value::Float(-n)),
        other => Err(RuntimeError::UnsupportedUnaryOperation {
            op: symbol(Opcode::Negate),
            operand: other.type_name(),
        }),
    }
}

/// `Index`: arrays by element, strings by character
///
/// Out-of-range indices, negative ones included, yield null.
pub fn index(target: &Value, index: &Value) -> Result<Value, RuntimeError> {
    match (target, index) {
        (Value::Array(elements), Value::Integer(i)) => Ok(usize::try_from(*i)
            .ok()
            .and_then(|i| elements.get(i).cloned())
            .unwrap_or(Value::Null)),
        (Value::String(s), Value::Integer(i)) => Ok(usize::try_from(*i)
            .ok()
            .and_then(|i| s.chars().nth(i))
            .map(|c| Value::string(c.to_string()))
            .unwrap_or(Value::Null)),
        _ => Err(RuntimeError::UnsupportedIndex {
            target: target.type_name(),
            index: index.type_name(),
        }),
    }
}
