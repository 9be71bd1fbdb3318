//! Bytecode disassembler for debugging

use crate::bytecode::{Bytecode, Instructions};
use crate::value::Value;
use std::fmt;

/// One line per instruction: `{offset:04} {Opcode} {operands...}`
impl fmt::Display for Instructions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut offset = 0;

        while offset < self.len() {
            match self.decode(offset) {
                Ok(Some((op, operands, width))) => {
                    write!(f, "{:04} {:?}", offset, op)?;
                    for operand in operands {
                        write!(f, " {}", operand)?;
                    }
                    writeln!(f)?;
                    offset += width;
                }
                Ok(None) => {
                    writeln!(f, "{:04} <truncated>", offset)?;
                    break;
                }
                Err(byte) => {
                    writeln!(f, "{:04} <unknown opcode {:#04x}>", offset, byte)?;
                    offset += 1;
                }
            }
        }

        Ok(())
    }
}

/// Disassemble a compiled unit: constant pool, function bodies, then the root stream
pub fn disassemble(bytecode: &Bytecode) -> String {
    let mut output = String::new();

    output.push_str("=== Constants ===\n");
    for (index, constant) in bytecode.constants.iter().enumerate() {
        output.push_str(&format!("{:04}: {}\n", index, constant));
    }

    for (index, constant) in bytecode.constants.iter().enumerate() {
        if let Value::Function(function) = constant {
            output.push_str(&format!(
                "\n=== Function {:04} {} (params={}, locals={}) ===\n",
                index, constant, function.num_parameters, function.num_locals
            ));
            output.push_str(&function.instructions.to_string());
        }
    }

    output.push_str("\n=== Instructions ===\n");
    output.push_str(&bytecode.instructions.to_string());

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::{make, Opcode};

    #[test]
    fn test_instruction_listing() {
        let ins: Instructions = vec![
            make(Opcode::Add, &[]),
            make(Opcode::GetLocal, &[1]),
            make(Opcode::Constant, &[2]),
            make(Opcode::Constant, &[65535]),
        ]
        .into_iter()
        .collect();

        insta::assert_snapshot!(ins.to_string().trim_end(), @r"
        0000 Add
        0001 GetLocal 1
        0003 Constant 2
        0006 Constant 65535
        ");
    }

    #[test]
    fn test_unknown_and_truncated_bytes() {
        let ins = Instructions::from(vec![0xEE, Opcode::Constant as u8, 0x00]);
        assert_eq!(ins.to_string(), "0000 <unknown opcode 0xee>\n0001 <truncated>\n");
    }

    #[test]
    fn test_disassemble_sections() {
        let bytecode = Bytecode::new(
            vec![make(Opcode::Constant, &[0]), make(Opcode::Pop, &[])]
                .into_iter()
                .collect(),
            vec![Value::Integer(7)],
        );
        let text = disassemble(&bytecode);
        assert!(text.starts_with("=== Constants ===\n0000: 7\n"));
        assert!(text.ends_with("=== Instructions ===\n0000 Constant 0\n0003 Pop\n"));
    }
}
