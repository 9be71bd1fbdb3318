//! Bytecode representation
//!
//! An instruction stream is a flat byte vector: one opcode byte followed by
//! its big-endian operands. Jumps carry the absolute byte offset to resume at.
//! A compiled unit is the root instruction stream plus its constant pool.

pub mod disasm;
mod opcode;

pub use disasm::disassemble;
pub use opcode::Opcode;

use crate::value::Value;

/// Operand written into forward jumps until the real target is known
pub const JUMP_PLACEHOLDER: usize = 0xFFFF;

/// Encode one instruction
///
/// Operands beyond the opcode's arity are ignored; each operand is truncated to its width.
pub fn make(op: Opcode, operands: &[usize]) -> Vec<u8> {
    let widths = op.operand_widths();
    let mut instruction = Vec::with_capacity(1 + op.operand_size());
    instruction.push(op as u8);

    for (operand, width) in operands.iter().zip(widths) {
        match width {
            2 => instruction.extend_from_slice(&(*operand as u16).to_be_bytes()),
            _ => instruction.push(*operand as u8),
        }
    }

    instruction
}

/// Decode the operands of `op` from `bytes` (the bytes right after the opcode)
///
/// Returns the operands and the number of bytes consumed, or `None` if the
/// stream ends before the operands do.
pub fn read_operands(op: Opcode, bytes: &[u8]) -> Option<(Vec<usize>, usize)> {
    let mut operands = Vec::with_capacity(op.operand_widths().len());
    let mut offset = 0;

    for width in op.operand_widths() {
        let value = match width {
            2 => read_u16(bytes, offset)? as usize,
            _ => *bytes.get(offset)? as usize,
        };
        operands.push(value);
        offset += width;
    }

    Some((operands, offset))
}

/// Read a big-endian u16 at `offset`
pub fn read_u16(bytes: &[u8], offset: usize) -> Option<u16> {
    let hi = *bytes.get(offset)?;
    let lo = *bytes.get(offset + 1)?;
    Some(u16::from_be_bytes([hi, lo]))
}

/// Append-only instruction stream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Instructions(Vec<u8>);

impl Instructions {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Append an encoded instruction, returning its starting offset
    pub fn push(&mut self, instruction: &[u8]) -> usize {
        let position = self.0.len();
        self.0.extend_from_slice(instruction);
        position
    }

    /// Drop everything from `len` onward
    pub fn truncate(&mut self, len: usize) {
        self.0.truncate(len);
    }

    /// Overwrite bytes in place starting at `position`
    pub fn replace(&mut self, position: usize, bytes: &[u8]) {
        self.0[position..position + bytes.len()].copy_from_slice(bytes);
    }

    /// Decode the instruction starting at `offset`
    ///
    /// Returns the opcode, its operands and the total instruction width.
    /// `Err(byte)` for an unknown opcode byte, `Ok(None)` past the end or for
    /// a truncated operand.
    pub fn decode(&self, offset: usize) -> Result<Option<(Opcode, Vec<usize>, usize)>, u8> {
        let Some(&byte) = self.0.get(offset) else {
            return Ok(None);
        };
        let op = Opcode::try_from(byte)?;
        Ok(read_operands(op, &self.0[offset + 1..]).map(|(operands, read)| (op, operands, 1 + read)))
    }
}

impl From<Vec<u8>> for Instructions {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl FromIterator<Vec<u8>> for Instructions {
    fn from_iter<I: IntoIterator<Item = Vec<u8>>>(iter: I) -> Self {
        Self(iter.into_iter().flatten().collect())
    }
}

/// A compiled unit: root instruction stream plus constant pool
#[derive(Debug, Clone, Default)]
pub struct Bytecode {
    pub instructions: Instructions,
    pub constants: Vec<Value>,
}

impl Bytecode {
    pub fn new(instructions: Instructions, constants: Vec<Value>) -> Self {
        Self {
            instructions,
            constants,
        }
    }
}
