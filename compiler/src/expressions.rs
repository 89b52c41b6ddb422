use memory::Value;
use quill_parser::ast::{BinOp, Block, ElseBranch, Expr, Span, Stmt, UnaryOp};
use quill_parser::unescape;
use vm::opcode::OpCode;
use vm::Constant;

use crate::codegen::Compiler;
use crate::error::CompilerError;
use crate::scopes::ScopeCompiler;
use crate::statements::StatementCompiler;

pub trait ExpressionCompiler {
    /// Compile into a fresh register on top of the register stack.
    fn compile_expr(&mut self, expr: &Expr) -> Result<u8, CompilerError>;
    /// Compile into `target`. Temporaries above it are freed on return.
    fn compile_expr_into(&mut self, expr: &Expr, target: u8) -> Result<(), CompilerError>;
    fn compile_block_into(&mut self, block: &Block, target: u8) -> Result<(), CompilerError>;
    fn compile_ident(&mut self, name: &str, span: &Span, target: u8) -> Result<(), CompilerError>;
    fn compile_binary(
        &mut self,
        op: BinOp,
        lhs: &Expr,
        rhs: &Expr,
        target: u8,
    ) -> Result<(), CompilerError>;
    fn compile_if(
        &mut self,
        condition: &Expr,
        then_block: &Block,
        else_branch: Option<&ElseBranch>,
        target: u8,
    ) -> Result<(), CompilerError>;
    fn compile_call(&mut self, callee: &Expr, args: &[Expr], target: u8)
        -> Result<(), CompilerError>;
}

fn arith_opcode(op: BinOp) -> Option<OpCode> {
    Some(match op {
        BinOp::Add => OpCode::Add,
        BinOp::Sub => OpCode::Sub,
        BinOp::Mul => OpCode::Mul,
        BinOp::Div => OpCode::Div,
        BinOp::Mod => OpCode::Mod,
        BinOp::Eq => OpCode::Eq,
        BinOp::Neq => OpCode::NotEq,
        BinOp::Lt => OpCode::Lt,
        BinOp::Le => OpCode::Le,
        BinOp::Gt => OpCode::Gt,
        BinOp::Ge => OpCode::Ge,
        BinOp::And | BinOp::Or => return None,
    })
}

fn parse_int(lexeme: &str) -> Result<i64, CompilerError> {
    let digits: String = lexeme.chars().filter(|&c| c != '_').collect();
    let n: i64 = digits.parse().map_err(|_| {
        if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
            CompilerError::IntegerOutOfRange(lexeme.to_string())
        } else {
            CompilerError::InvalidNumber(lexeme.to_string())
        }
    })?;
    match Value::checked_int(n) {
        Some(_) => Ok(n),
        None => Err(CompilerError::IntegerOutOfRange(lexeme.to_string())),
    }
}

impl ExpressionCompiler for Compiler<'_> {
    fn compile_expr(&mut self, expr: &Expr) -> Result<u8, CompilerError> {
        let reg = self.alloc_reg()?;
        self.compile_expr_into(expr, reg)?;
        Ok(reg)
    }

    fn compile_expr_into(&mut self, expr: &Expr, target: u8) -> Result<(), CompilerError> {
        match expr {
            Expr::Number { value, .. } => {
                let n = parse_int(value)?;
                let k = self.current().add_constant(Constant::Int(n))?;
                self.emit_abx(OpCode::LoadConst, target, k);
            }
            Expr::StringLit { value, .. } => {
                let idx = self.intern_string(unescape(value));
                let k = self.current().add_constant(Constant::Str(idx))?;
                self.emit_abx(OpCode::LoadConst, target, k);
            }
            Expr::Bool { value: true, .. } => self.emit_abx(OpCode::LoadTrue, target, 0),
            Expr::Bool { value: false, .. } => self.emit_abx(OpCode::LoadFalse, target, 0),
            Expr::Nil { .. } => self.emit_abx(OpCode::LoadNil, target, 0),
            Expr::Ident { name, span } => self.compile_ident(name, span, target)?,
            Expr::BinOp { op, lhs, rhs, .. } => self.compile_binary(*op, lhs, rhs, target)?,
            Expr::UnaryOp { op, operand, .. } => {
                self.compile_expr_into(operand, target)?;
                let opcode = match op {
                    UnaryOp::Neg => OpCode::Neg,
                    UnaryOp::Not => OpCode::LogNot,
                };
                self.emit_abc(opcode, target, target, 0);
            }
            Expr::Call { callee, args, .. } => self.compile_call(callee, args, target)?,
            Expr::If {
                condition,
                then_block,
                else_branch,
                ..
            } => self.compile_if(condition, then_block, else_branch.as_ref(), target)?,
            Expr::Block(block) => self.compile_block_into(block, target)?,
        }
        Ok(())
    }

    fn compile_block_into(&mut self, block: &Block, target: u8) -> Result<(), CompilerError> {
        self.begin_scope();
        let (last, init) = match block.stmts.split_last() {
            Some((last, init)) => (Some(last), init),
            None => (None, &[][..]),
        };
        for stmt in init {
            self.compile_stmt(stmt)?;
        }
        match last {
            Some(Stmt::Expr(tail)) => self.compile_expr_into(tail, target)?,
            Some(stmt) => {
                self.compile_stmt(stmt)?;
                self.emit_abx(OpCode::LoadNil, target, 0);
            }
            None => self.emit_abx(OpCode::LoadNil, target, 0),
        }
        self.end_scope();
        Ok(())
    }

    fn compile_ident(&mut self, name: &str, span: &Span, target: u8) -> Result<(), CompilerError> {
        if let Some(local) = self.current_ref().resolve_local(name) {
            let reg = local.reg;
            if reg != target {
                self.emit_abc(OpCode::Move, target, reg, 0);
            }
            return Ok(());
        }
        if let Some(sym) = self.resolve_global(name) {
            let slot = u16::try_from(sym.slot).map_err(|_| CompilerError::TooManyGlobals)?;
            self.emit_abx(OpCode::GetGlobal, target, slot);
            return Ok(());
        }
        if let Some(index) = self.env.primitive(name) {
            let index = u16::try_from(index).map_err(|_| CompilerError::TooManyGlobals)?;
            self.emit_abx(OpCode::GetPrim, target, index);
            return Ok(());
        }
        Err(CompilerError::UnboundIdentifier {
            name: name.to_string(),
            line: span.line,
            col: span.col,
        })
    }

    fn compile_binary(
        &mut self,
        op: BinOp,
        lhs: &Expr,
        rhs: &Expr,
        target: u8,
    ) -> Result<(), CompilerError> {
        let Some(opcode) = arith_opcode(op) else {
            // Short-circuit: the result is whichever operand decided it
            let jump_op = if op == BinOp::And {
                OpCode::JumpIfFalse
            } else {
                OpCode::JumpIfTrue
            };
            self.compile_expr_into(lhs, target)?;
            let skip = self.current().emit_jump(jump_op, target);
            self.compile_expr_into(rhs, target)?;
            return self.current().patch_jump(skip);
        };

        // Accumulate into target
        self.compile_expr_into(lhs, target)?;
        let right = self.compile_expr(rhs)?;
        self.emit_abc(opcode, target, target, right);
        self.free_reg(right);
        Ok(())
    }

    fn compile_if(
        &mut self,
        condition: &Expr,
        then_block: &Block,
        else_branch: Option<&ElseBranch>,
        target: u8,
    ) -> Result<(), CompilerError> {
        let cond = self.compile_expr(condition)?;
        let else_jump = self.current().emit_jump(OpCode::JumpIfFalse, cond);
        self.free_reg(cond);

        self.compile_block_into(then_block, target)?;
        let end_jump = self.current().emit_jump(OpCode::Jump, 0);

        self.current().patch_jump(else_jump)?;
        match else_branch {
            Some(ElseBranch::Block(block)) => self.compile_block_into(block, target)?,
            Some(ElseBranch::If(expr)) => self.compile_expr_into(expr, target)?,
            None => self.emit_abx(OpCode::LoadNil, target, 0),
        }
        self.current().patch_jump(end_jump)
    }

    fn compile_call(
        &mut self,
        callee: &Expr,
        args: &[Expr],
        target: u8,
    ) -> Result<(), CompilerError> {
        let argc = u8::try_from(args.len())
            .ok()
            .filter(|&n| n < u8::MAX)
            .ok_or(CompilerError::TooManyArguments)?;

        // Callee then arguments, contiguous
        let func_reg = self.compile_expr(callee)?;
        let mut arg_regs = Vec::with_capacity(args.len());
        for arg in args {
            arg_regs.push(self.compile_expr(arg)?);
        }

        self.emit_abc(OpCode::Call, target, func_reg, argc);

        for reg in arg_regs.into_iter().rev() {
            self.free_reg(reg);
        }
        self.free_reg(func_reg);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_literals_allow_underscores() {
        assert_eq!(parse_int("1_000").unwrap(), 1000);
    }

    #[test]
    fn literals_beyond_i60_are_rejected() {
        assert_eq!(
            parse_int("576460752303423488"),
            Err(CompilerError::IntegerOutOfRange("576460752303423488".into()))
        );
        assert_eq!(
            parse_int("99999999999999999999"),
            Err(CompilerError::IntegerOutOfRange("99999999999999999999".into()))
        );
    }
}
