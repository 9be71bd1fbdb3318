//! Expression compilation

use crate::ast::*;
use crate::bytecode::{Opcode, JUMP_PLACEHOLDER};
use crate::compiler::{CompileError, Compiler, MAX_ARGUMENTS, MAX_ARRAY_ELEMENTS};
use crate::span::Span;
use crate::value::{CompiledFunction, Value};
use std::sync::Arc;
use tracing::debug;

impl Compiler {
    /// Compile an expression, leaving its value on the stack
    pub(super) fn compile_expr(&mut self, expr: &Expr) -> Result<(), CompileError> {
        match expr {
            Expr::Literal(lit, span) => self.compile_literal(lit, *span),
            Expr::Identifier(ident) => {
                let symbol = self.resolve(ident)?;
                self.load_symbol(&symbol);
                Ok(())
            }
            Expr::Prefix(prefix) => {
                self.compile_expr(&prefix.operand)?;
                let op = match prefix.op {
                    PrefixOp::Not => Opcode::Not,
                    PrefixOp::Negate => Opcode::Negate,
                };
                self.emit(op, &[]);
                Ok(())
            }
            Expr::Infix(infix) => self.compile_infix(infix),
            Expr::If(if_expr) => self.compile_if(if_expr),
            Expr::While(while_expr) => self.compile_while(while_expr),
            Expr::For(for_expr) => self.compile_for(for_expr),
            Expr::Function(func) => self.compile_function(func, None),
            Expr::Call(call) => self.compile_call(call),
            Expr::Array(array) => self.compile_array(array),
            Expr::Index(index) => {
                self.compile_expr(&index.target)?;
                self.compile_expr(&index.index)?;
                self.emit(Opcode::Index, &[]);
                Ok(())
            }
            Expr::Assign(assign) => self.compile_assign(assign),
        }
    }

    fn compile_literal(&mut self, lit: &Literal, span: Span) -> Result<(), CompileError> {
        match lit {
            Literal::Integer(n) => {
                self.emit_constant(Value::Integer(*n), span)?;
            }
            Literal::Float(n) => {
                self.emit_constant(Value::Float(*n), span)?;
            }
            Literal::String(s) => {
                self.emit_constant(Value::string(s.as_str()), span)?;
            }
            Literal::Boolean(true) => {
                self.emit(Opcode::True, &[]);
            }
            Literal::Boolean(false) => {
                self.emit(Opcode::False, &[]);
            }
        }
        Ok(())
    }

    /// Only `Greater` exists: `<` swaps its operands, `<=` and `>=` negate
    fn compile_infix(&mut self, infix: &InfixExpr) -> Result<(), CompileError> {
        let (first, second) = match infix.op {
            InfixOp::Lt | InfixOp::Ge => (&infix.right, &infix.left),
            _ => (&infix.left, &infix.right),
        };
        self.compile_expr(first)?;
        self.compile_expr(second)?;

        match infix.op {
            InfixOp::Add => self.emit(Opcode::Add, &[]),
            InfixOp::Sub => self.emit(Opcode::Sub, &[]),
            InfixOp::Mul => self.emit(Opcode::Mul, &[]),
            InfixOp::Div => self.emit(Opcode::Div, &[]),
            InfixOp::Eq => self.emit(Opcode::Equal, &[]),
            InfixOp::Ne => self.emit(Opcode::NotEqual, &[]),
            InfixOp::Gt | InfixOp::Lt => self.emit(Opcode::Greater, &[]),
            InfixOp::Le | InfixOp::Ge => {
                self.emit(Opcode::Greater, &[]);
                self.emit(Opcode::Not, &[])
            }
        };
        Ok(())
    }

    /// Compile an if-expression; exactly one value is left whichever branch runs
    fn compile_if(&mut self, if_expr: &IfExpr) -> Result<(), CompileError> {
        self.compile_expr(&if_expr.condition)?;
        let jump_not_truthy = self.emit(Opcode::JumpNotTruthy, &[JUMP_PLACEHOLDER]);

        self.compile_branch(&if_expr.consequence)?;
        let jump = self.emit(Opcode::Jump, &[JUMP_PLACEHOLDER]);

        let after_consequence = self.current_position();
        self.change_operand(
            jump_not_truthy,
            Opcode::JumpNotTruthy,
            after_consequence,
            if_expr.span,
        )?;

        match &if_expr.alternative {
            Some(alternative) => self.compile_branch(alternative)?,
            None => {
                self.emit(Opcode::Null, &[]);
            }
        }

        let after_alternative = self.current_position();
        self.change_operand(jump, Opcode::Jump, after_alternative, if_expr.span)?;
        Ok(())
    }

    /// Compile a branch body so it leaves its last expression value (or null)
    fn compile_branch(&mut self, block: &Block) -> Result<(), CompileError> {
        self.compile_block(block)?;
        if self.last_instruction_is(Opcode::Pop) {
            self.remove_last_pop();
        } else {
            self.emit(Opcode::Null, &[]);
        }
        Ok(())
    }

    /// Compile a while loop; the loop itself evaluates to null
    fn compile_while(&mut self, while_expr: &WhileExpr) -> Result<(), CompileError> {
        let loop_start = self.current_position();
        self.compile_expr(&while_expr.condition)?;
        let exit = self.emit(Opcode::JumpNotTruthy, &[JUMP_PLACEHOLDER]);

        self.compile_block(&while_expr.body)?;
        self.emit(Opcode::Jump, &[loop_start]);

        let after_loop = self.current_position();
        self.change_operand(exit, Opcode::JumpNotTruthy, after_loop, while_expr.span)?;
        self.emit(Opcode::Null, &[]);
        Ok(())
    }

    /// Compile a for loop: the initializer runs once, the post expression
    /// after every body pass. The loop itself evaluates to null.
    fn compile_for(&mut self, for_expr: &ForExpr) -> Result<(), CompileError> {
        self.compile_let(&for_expr.init)?;

        let loop_start = self.current_position();
        self.compile_expr(&for_expr.condition)?;
        let exit = self.emit(Opcode::JumpNotTruthy, &[JUMP_PLACEHOLDER]);

        self.compile_block(&for_expr.body)?;
        self.compile_expr(&for_expr.post)?;
        self.emit(Opcode::Pop, &[]);
        self.emit(Opcode::Jump, &[loop_start]);

        let after_loop = self.current_position();
        self.change_operand(exit, Opcode::JumpNotTruthy, after_loop, for_expr.span)?;
        self.emit(Opcode::Null, &[]);
        Ok(())
    }

    /// Compile a function literal into a constant and push it
    pub(super) fn compile_function(
        &mut self,
        func: &FunctionLiteral,
        name: Option<&str>,
    ) -> Result<(), CompileError> {
        self.enter_scope();

        for param in &func.params {
            self.define(param)?;
        }
        self.compile_block(&func.body)?;

        if self.last_instruction_is(Opcode::Pop) {
            self.replace_last_pop_with_return();
        }
        if !self.last_instruction_is(Opcode::ReturnValue) {
            self.emit(Opcode::Return, &[]);
        }

        let (instructions, num_locals) = self.leave_scope();
        debug!(
            name = name.unwrap_or("<anonymous>"),
            params = func.params.len(),
            locals = num_locals,
            bytes = instructions.len(),
            "compiled function"
        );

        let mut function = CompiledFunction::new(instructions, num_locals, func.params.len());
        if let Some(name) = name {
            function = function.with_name(name);
        }
        self.emit_constant(Value::Function(Arc::new(function)), func.span)?;
        Ok(())
    }

    fn compile_call(&mut self, call: &CallExpr) -> Result<(), CompileError> {
        if call.args.len() > MAX_ARGUMENTS {
            return Err(CompileError::LimitExceeded {
                what: "call arguments",
                limit: MAX_ARGUMENTS,
                span: call.span,
            });
        }

        self.compile_expr(&call.callee)?;
        for arg in &call.args {
            self.compile_expr(arg)?;
        }
        self.emit(Opcode::Call, &[call.args.len()]);
        Ok(())
    }

    fn compile_array(&mut self, array: &ArrayLiteral) -> Result<(), CompileError> {
        if array.elements.len() > MAX_ARRAY_ELEMENTS {
            return Err(CompileError::LimitExceeded {
                what: "array elements",
                limit: MAX_ARRAY_ELEMENTS,
                span: array.span,
            });
        }

        for element in &array.elements {
            self.compile_expr(element)?;
        }
        self.emit(Opcode::Array, &[array.elements.len()]);
        Ok(())
    }

    /// Store then reload, so the assignment evaluates to the assigned value
    fn compile_assign(&mut self, assign: &AssignExpr) -> Result<(), CompileError> {
        let symbol = self.resolve(&assign.target)?;
        self.compile_expr(&assign.value)?;
        self.store_symbol(&symbol, assign.target.span)?;
        self.load_symbol(&symbol);
        Ok(())
    }
}
