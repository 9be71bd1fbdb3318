//! Statement compilation

use crate::ast::*;
use crate::bytecode::Opcode;
use crate::compiler::{CompileError, Compiler};

impl Compiler {
    /// Compile a statement
    pub(super) fn compile_stmt(&mut self, stmt: &Stmt) -> Result<(), CompileError> {
        match stmt {
            Stmt::Let(let_stmt) => self.compile_let(let_stmt),
            Stmt::Return(ret) => self.compile_return(ret),
            Stmt::Expr(expr_stmt) => {
                self.compile_expr(&expr_stmt.expr)?;
                self.emit(Opcode::Pop, &[]);
                Ok(())
            }
        }
    }

    /// Compile `var name = value;`
    ///
    /// A function literal sees its own name so it can recurse; any other value
    /// is compiled before the name exists, so `var x = x + 1` reads the old `x`.
    pub(super) fn compile_let(&mut self, stmt: &LetStmt) -> Result<(), CompileError> {
        let symbol = match &stmt.value {
            Expr::Function(func) => {
                let symbol = self.define(&stmt.name)?;
                self.compile_function(func, Some(&stmt.name.name))?;
                symbol
            }
            value => {
                self.compile_expr(value)?;
                self.define(&stmt.name)?
            }
        };
        self.store_symbol(&symbol, stmt.name.span)
    }

    /// Compile `return;` or `return value;`
    fn compile_return(&mut self, ret: &ReturnStmt) -> Result<(), CompileError> {
        if !self.in_function() {
            return Err(CompileError::ReturnOutsideFunction { span: ret.span });
        }

        match &ret.value {
            Some(value) => self.compile_expr(value)?,
            None => {
                self.emit(Opcode::Null, &[]);
            }
        }
        self.emit(Opcode::ReturnValue, &[]);
        Ok(())
    }

    /// Compile the statements of a block in the current scope
    pub(super) fn compile_block(&mut self, block: &Block) -> Result<(), CompileError> {
        for stmt in &block.statements {
            self.compile_stmt(stmt)?;
        }
        Ok(())
    }
}
