//! Stack-based virtual machine
//!
//! Executes bytecode with a fixed-size value stack, an explicit call-frame
//! stack and a fixed-size global slot array.
//! - `push` writes at `sp` and advances it; `pop` only moves `sp` back, so the
//!   most recently popped value stays readable via [`VM::last_popped`]
//! - Every call gets a frame; builtins run without one
//! - Any fatal error halts the machine without rolling back side effects

pub mod dispatch;
mod frame;

pub use frame::Frame;

use crate::bytecode::{Bytecode, Opcode};
use crate::stdlib;
use crate::value::{CompiledFunction, RuntimeError, Value};
use monkey_config::VmConfig;
use std::sync::Arc;
use tracing::{debug, instrument, trace};

/// Global slot array shared across frames and, in a REPL, across runs
#[derive(Debug, Clone, PartialEq)]
pub struct Globals(Vec<Value>);

impl Globals {
    /// `size` slots, all null
    pub fn new(size: usize) -> Self {
        Self(vec![Value::Null; size])
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    /// Store into a slot; `false` if the index is out of range
    pub fn set(&mut self, index: usize, value: Value) -> bool {
        match self.0.get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for Globals {
    fn default() -> Self {
        Self::new(VmConfig::default().globals_size)
    }
}

/// Lifecycle of a VM instance
#[derive(Debug, Clone, PartialEq)]
pub enum VmState {
    Idle,
    Running,
    /// Finished, successfully or with the error that stopped it
    Halted(Result<(), RuntimeError>),
}

/// Virtual machine state
pub struct VM {
    constants: Vec<Value>,
    /// Pre-sized value stack; slots at and above `sp` are stale, not cleared
    stack: Vec<Value>,
    /// Next free stack slot
    sp: usize,
    globals: Globals,
    frames: Vec<Frame>,
    max_frames: usize,
    state: VmState,
}

impl VM {
    /// Create a VM with the default limits and fresh globals
    pub fn new(bytecode: Bytecode) -> Self {
        Self::with_config(bytecode, &VmConfig::default())
    }

    /// Create a VM with configured limits and fresh globals
    pub fn with_config(bytecode: Bytecode, config: &VmConfig) -> Self {
        Self::with_config_and_globals(bytecode, config, Globals::new(config.globals_size))
    }

    /// Create a VM that continues with globals from an earlier run
    pub fn with_globals(bytecode: Bytecode, globals: Globals) -> Self {
        Self::with_config_and_globals(bytecode, &VmConfig::default(), globals)
    }

    pub fn with_config_and_globals(bytecode: Bytecode, config: &VmConfig, globals: Globals) -> Self {
        let root = CompiledFunction::new(bytecode.instructions, 0, 0);
        let mut frames = Vec::with_capacity(config.max_frames.min(64));
        frames.push(Frame::new(Arc::new(root), 0));

        Self {
            constants: bytecode.constants,
            stack: vec![Value::Null; config.stack_size],
            sp: 0,
            globals,
            frames,
            max_frames: config.max_frames,
            state: VmState::Idle,
        }
    }

    /// Execute the program to completion
    ///
    /// A VM runs once; calling `run` again after it halted is an error.
    #[instrument(level = "debug", skip_all, err(level = "warn"))]
    pub fn run(&mut self) -> Result<(), RuntimeError> {
        if self.state != VmState::Idle {
            return Err(RuntimeError::AlreadyHalted);
        }

        self.state = VmState::Running;
        let result = self.execute();
        debug!(sp = self.sp, frames = self.frames.len(), ok = result.is_ok(), "vm halted");
        self.state = VmState::Halted(result.clone());
        result
    }

    pub fn state(&self) -> &VmState {
        &self.state
    }

    /// The value most recently popped, i.e. `stack[sp]`
    ///
    /// After a successful run this is the value of the last top-level
    /// expression statement.
    pub fn last_popped(&self) -> Value {
        self.stack.get(self.sp).cloned().unwrap_or(Value::Null)
    }

    /// Top of the stack, if anything is on it
    pub fn stack_top(&self) -> Option<&Value> {
        self.sp.checked_sub(1).and_then(|top| self.stack.get(top))
    }

    pub fn sp(&self) -> usize {
        self.sp
    }

    pub fn frame_depth(&self) -> usize {
        self.frames.len()
    }

    pub fn globals(&self) -> &Globals {
        &self.globals
    }

    /// Take the globals back, e.g. to hand them to the next REPL run
    pub fn into_globals(self) -> Globals {
        self.globals
    }

    fn execute(&mut self) -> Result<(), RuntimeError> {
        loop {
            let Some((op, operand, next_ip)) = self.fetch()? else {
                // Falling off the end of a function body is an implicit `return;`
                if self.frames.len() == 1 {
                    return Ok(());
                }
                self.return_from_frame(Value::Null)?;
                continue;
            };
            self.current_frame_mut().ip = next_ip;
            trace!(?op, operand, sp = self.sp, depth = self.frames.len(), "dispatch");

            match op {
                // ===== Constants =====
                Opcode::Constant => {
                    let value = self
                        .constants
                        .get(operand)
                        .cloned()
                        .ok_or(RuntimeError::ConstantOutOfRange { index: operand })?;
                    self.push(value)?;
                }
                Opcode::Null => self.push(Value::Null)?,
                Opcode::True => self.push(Value::Boolean(true))?,
                Opcode::False => self.push(Value::Boolean(false))?,

                // ===== Variables =====
                Opcode::GetLocal => {
                    let slot = self.local_slot(operand)?;
                    let value = self.stack[slot].clone();
                    self.push(value)?;
                }
                Opcode::SetLocal => {
                    let slot = self.local_slot(operand)?;
                    let value = self.pop()?;
                    self.stack[slot] = value;
                }
                Opcode::GetGlobal => {
                    let value = self.globals.get(operand).cloned().ok_or(
                        RuntimeError::GlobalOutOfRange {
                            index: operand,
                            capacity: self.globals.len(),
                        },
                    )?;
                    self.push(value)?;
                }
                Opcode::SetGlobal => {
                    let value = self.pop()?;
                    if !self.globals.set(operand, value) {
                        return Err(RuntimeError::GlobalOutOfRange {
                            index: operand,
                            capacity: self.globals.len(),
                        });
                    }
                }
                Opcode::GetBuiltin => {
                    let builtin = stdlib::get(operand)
                        .ok_or(RuntimeError::BuiltinOutOfRange { index: operand })?;
                    self.push(Value::Builtin(builtin))?;
                }

                // ===== Arithmetic and comparison =====
                Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Div => {
                    let right = self.pop()?;
                    let left = self.pop()?;
                    self.push(dispatch::binary_op(op, &left, &right)?)?;
                }
                Opcode::Equal | Opcode::NotEqual | Opcode::Greater => {
                    let right = self.pop()?;
                    let left = self.pop()?;
                    self.push(dispatch::compare(op, &left, &right)?)?;
                }
                Opcode::Negate => {
                    let operand = self.pop()?;
                    self.push(dispatch::negate(&operand)?)?;
                }
                Opcode::Not => {
                    let operand = self.pop()?;
                    self.push(Value::Boolean(!operand.is_truthy()))?;
                }

                // ===== Control flow =====
                Opcode::Jump => self.current_frame_mut().ip = operand,
                Opcode::JumpNotTruthy => {
                    let condition = self.pop()?;
                    if !condition.is_truthy() {
                        self.current_frame_mut().ip = operand;
                    }
                }

                // ===== Functions =====
                Opcode::Call => self.call(operand)?,
                Opcode::ReturnValue => {
                    let value = self.pop()?.unwrap_return();
                    if self.return_from_frame(value)? {
                        return Ok(());
                    }
                }
                Opcode::Return => {
                    if self.return_from_frame(Value::Null)? {
                        return Ok(());
                    }
                }

                // ===== Arrays =====
                Opcode::Array => {
                    let start = self
                        .sp
                        .checked_sub(operand)
                        .ok_or(RuntimeError::StackUnderflow)?;
                    let elements = self.stack[start..self.sp].to_vec();
                    self.sp = start;
                    self.push(Value::array(elements))?;
                }
                Opcode::Index => {
                    let index = self.pop()?;
                    let target = self.pop()?;
                    self.push(dispatch::index(&target, &index)?)?;
                }

                // ===== Stack manipulation =====
                Opcode::Pop => {
                    self.pop()?;
                }
            }
        }
    }

    /// Decode the instruction at the current frame's `ip`
    ///
    /// Returns the opcode, its operand (0 if it has none) and the offset of
    /// the following instruction, or `None` at the end of the stream.
    fn fetch(&self) -> Result<Option<(Opcode, usize, usize)>, RuntimeError> {
        let frame = self.current_frame();
        let code = frame.instructions().as_bytes();
        let ip = frame.ip;

        let Some(&byte) = code.get(ip) else {
            return Ok(None);
        };
        let op = dispatch::decode_opcode(byte)
            .ok_or(RuntimeError::UnknownOpcode { byte, offset: ip })?;

        let width = op.operand_size();
        let operand_bytes = code
            .get(ip + 1..ip + 1 + width)
            .ok_or_else(|| RuntimeError::TruncatedInstruction {
                opcode: format!("{:?}", op),
                offset: ip,
            })?;
        let operand = match *operand_bytes {
            [] => 0,
            [b] => b as usize,
            [hi, lo, ..] => u16::from_be_bytes([hi, lo]) as usize,
        };

        Ok(Some((op, operand, ip + 1 + width)))
    }

    /// Invoke the value sitting below the top `argc` stack slots
    fn call(&mut self, argc: usize) -> Result<(), RuntimeError> {
        let callee_slot = self
            .sp
            .checked_sub(argc + 1)
            .ok_or(RuntimeError::StackUnderflow)?;

        match self.stack[callee_slot].clone() {
            Value::Function(function) => {
                if argc != function.num_parameters {
                    return Err(RuntimeError::WrongArity {
                        expected: function.num_parameters,
                        got: argc,
                    });
                }
                if self.frames.len() >= self.max_frames {
                    return Err(RuntimeError::FrameOverflow {
                        max_frames: self.max_frames,
                    });
                }

                let base_pointer = self.sp - argc;
                let frame_top = base_pointer + function.num_locals;
                if frame_top > self.stack.len() {
                    return Err(RuntimeError::StackOverflow {
                        capacity: self.stack.len(),
                    });
                }
                for slot in &mut self.stack[self.sp..frame_top] {
                    *slot = Value::Null;
                }

                debug!(
                    function = function.name.as_deref().unwrap_or("<anonymous>"),
                    argc,
                    depth = self.frames.len() + 1,
                    "call"
                );
                self.frames.push(Frame::new(function, base_pointer));
                self.sp = frame_top;
                Ok(())
            }
            Value::Builtin(builtin) => {
                let result = builtin.call(&self.stack[callee_slot + 1..self.sp]);
                trace!(builtin = builtin.name, argc, "builtin call");
                self.sp = callee_slot;
                self.push(result)
            }
            other => Err(RuntimeError::NotCallable {
                type_name: other.type_name(),
            }),
        }
    }

    /// Leave the current frame, replacing the callee slot with `value`
    ///
    /// Returns `true` when the root frame itself returned, which ends the run.
    fn return_from_frame(&mut self, value: Value) -> Result<bool, RuntimeError> {
        if self.frames.len() == 1 {
            self.push(value)?;
            self.sp -= 1;
            return Ok(true);
        }

        if let Some(frame) = self.frames.pop() {
            debug!(depth = self.frames.len(), "return");
            self.sp = frame.base_pointer.saturating_sub(1);
        }
        self.push(value)?;
        Ok(false)
    }

    /// Absolute stack index of local slot `index` in the current frame
    fn local_slot(&self, index: usize) -> Result<usize, RuntimeError> {
        let frame = self.current_frame();
        if index >= frame.function.num_locals {
            return Err(RuntimeError::LocalOutOfRange { index });
        }
        Ok(frame.base_pointer + index)
    }

    fn current_frame(&self) -> &Frame {
        &self.frames[self.frames.len() - 1]
    }

    fn current_frame_mut(&mut self) -> &mut Frame {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    #[inline(always)]
    fn push(&mut self, value: Value) -> Result<(), RuntimeError> {
        let capacity = self.stack.len();
        let slot = self
            .stack
            .get_mut(self.sp)
            .ok_or(RuntimeError::StackOverflow { capacity })?;
        *slot = value;
        self.sp += 1;
        Ok(())
    }

    /// Move `sp` back one slot; the value stays in place
    #[inline(always)]
    fn pop(&mut self) -> Result<Value, RuntimeError> {
        if self.sp == 0 {
            return Err(RuntimeError::StackUnderflow);
        }
        self.sp -= 1;
        Ok(self.stack[self.sp].clone())
    }
}
