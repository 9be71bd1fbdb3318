//! Bytecode instruction set
//!
//! Stack-based bytecode organized by category. Operands follow the opcode
//! byte inline, big-endian, with a fixed width per opcode.

/// Bytecode opcode
///
/// Explicit byte values keep encoded streams stable across builds.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    // ===== Constants (0x01-0x0F) =====
    /// Push constant from pool [u16 index]
    Constant = 0x01,
    /// Push null
    Null = 0x02,
    /// Push true
    True = 0x03,
    /// Push false
    False = 0x04,

    // ===== Variables (0x10-0x1F) =====
    /// Push frame-relative local slot [u8 slot]
    GetLocal = 0x10,
    /// Pop into frame-relative local slot [u8 slot]
    SetLocal = 0x11,
    /// Push global slot [u16 index]
    GetGlobal = 0x12,
    /// Pop into global slot [u16 index]
    SetGlobal = 0x13,
    /// Push builtin function [u8 index]
    GetBuiltin = 0x14,

    // ===== Arithmetic (0x20-0x2F) =====
    /// Pop b, pop a, push a + b
    Add = 0x20,
    /// Pop b, pop a, push a - b
    Sub = 0x21,
    /// Pop b, pop a, push a * b
    Mul = 0x22,
    /// Pop b, pop a, push a / b
    Div = 0x23,
    /// Pop a, push -a
    Negate = 0x25,

    // ===== Comparison (0x30-0x3F) =====
    /// Pop b, pop a, push a == b
    Equal = 0x30,
    /// Pop b, pop a, push a != b
    NotEqual = 0x31,
    /// Pop b, pop a, push a > b
    Greater = 0x34,

    // ===== Logical (0x40-0x4F) =====
    /// Pop a, push !truthy(a)
    Not = 0x40,

    // ===== Control flow (0x50-0x5F) =====
    /// Jump to absolute offset [u16 target]
    Jump = 0x50,
    /// Pop condition, jump to absolute offset if falsey [u16 target]
    JumpNotTruthy = 0x51,

    // ===== Functions (0x60-0x6F) =====
    /// Call the value below the arguments [u8 arg_count]
    Call = 0x60,
    /// Pop return value, leave the frame, push it
    ReturnValue = 0x61,
    /// Leave the frame, push null
    Return = 0x62,

    // ===== Arrays (0x70-0x7F) =====
    /// Collapse the top n values into an array [u16 count]
    Array = 0x70,
    /// Pop index, pop target, push target[index]
    Index = 0x71,

    // ===== Stack manipulation (0x80-0x8F) =====
    /// Pop and discard top of stack
    Pop = 0x80,
}

impl Opcode {
    /// Byte widths of this opcode's operands, in encoding order
    pub fn operand_widths(self) -> &'static [usize] {
        match self {
            Opcode::Constant
            | Opcode::GetGlobal
            | Opcode::SetGlobal
            | Opcode::Jump
            | Opcode::JumpNotTruthy
            | Opcode::Array => &[2],
            Opcode::GetLocal | Opcode::SetLocal | Opcode::GetBuiltin | Opcode::Call => &[1],
            _ => &[],
        }
    }

    /// Total operand bytes following the opcode byte
    pub fn operand_size(self) -> usize {
        self.operand_widths().iter().sum()
    }
}

impl TryFrom<u8> for Opcode {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            0x01 => Ok(Opcode::Constant),
            0x02 => Ok(Opcode::Null),
            0x03 => Ok(Opcode::True),
            0x04 => Ok(Opcode::False),
            0x10 => Ok(Opcode::GetLocal),
            0x11 => Ok(Opcode::SetLocal),
            0x12 => Ok(Opcode::GetGlobal),
            0x13 => Ok(Opcode::SetGlobal),
            0x14 => Ok(Opcode::GetBuiltin),
            0x20 => Ok(Opcode::Add),
            0x21 => Ok(Opcode::Sub),
            0x22 => Ok(Opcode::Mul),
            0x23 => Ok(Opcode::Div),
            0x25 => Ok(Opcode::Negate),
            0x30 => Ok(Opcode::Equal),
            0x31 => Ok(Opcode::NotEqual),
            0x34 => Ok(Opcode::Greater),
            0x40 => Ok(Opcode::Not),
            0x50 => Ok(Opcode::Jump),
            0x51 => Ok(Opcode::JumpNotTruthy),
            0x60 => Ok(Opcode::Call),
            0x61 => Ok(Opcode::ReturnValue),
            0x62 => Ok(Opcode::Return),
            0x70 => Ok(Opcode::Array),
            0x71 => Ok(Opcode::Index),
            0x80 => Ok(Opcode::Pop),
            other => Err(other),
        }
    }
}
