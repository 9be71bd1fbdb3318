//! Call frame implementation for function calls

use crate::bytecode::Instructions;
use crate::value::CompiledFunction;
use std::sync::Arc;

/// Call frame for function calls
///
/// Each call pushes a frame that tracks:
/// - The function being executed (its own instruction stream)
/// - The offset of the next instruction to execute in that stream (`ip`)
/// - Where the function's locals start on the value stack (`base_pointer`)
///
/// The top-level code runs in a root frame with `base_pointer = 0`.
///
/// ## Stack Layout Example
///
/// ```text
/// main calls add(1, 2), add declares one more local:
///
/// [...] [<fn add>] [1] [2] [local]
///                   ^
///                   add frame base_pointer
/// ```
///
/// `GetLocal n` in `add` reads `stack[base_pointer + n]`. On return the
/// stack pointer drops to `base_pointer - 1`, discarding the callee slot too.
#[derive(Debug, Clone)]
pub struct Frame {
    pub function: Arc<CompiledFunction>,
    /// Offset of the next instruction byte
    pub ip: usize,
    /// Stack index of local slot 0
    pub base_pointer: usize,
}

impl Frame {
    pub fn new(function: Arc<CompiledFunction>, base_pointer: usize) -> Self {
        Self {
            function,
            ip: 0,
            base_pointer,
        }
    }

    pub fn instructions(&self) -> &Instructions {
        &self.function.instructions
    }
}
