use quill_parser::ast::{Block, Expr, Span, Stmt};
use vm::opcode::OpCode;
use vm::Constant;

use crate::codegen::Compiler;
use crate::error::CompilerError;
use crate::expressions::ExpressionCompiler;
use crate::function_compiler::FunctionCompiler;
use crate::scopes::ScopeCompiler;

pub trait StatementCompiler {
    fn compile_stmt(&mut self, stmt: &Stmt) -> Result<(), CompilerError>;
    fn compile_binding(
        &mut self,
        name: &str,
        value: &Expr,
        mutable: bool,
    ) -> Result<(), CompilerError>;
    fn compile_assignment(
        &mut self,
        target: &Expr,
        value: &Expr,
        span: &Span,
    ) -> Result<(), CompilerError>;
    fn compile_fn_decl(
        &mut self,
        name: &str,
        params: &[String],
        body: &Block,
        span: &Span,
    ) -> Result<(), CompilerError>;
    fn compile_while(&mut self, condition: &Expr, body: &Block) -> Result<(), CompilerError>;
}

impl StatementCompiler for Compiler<'_> {
    fn compile_stmt(&mut self, stmt: &Stmt) -> Result<(), CompilerError> {
        match stmt {
            Stmt::LetDecl { name, value, .. } => self.compile_binding(name, value, false),
            Stmt::MutDecl { name, value, .. } => self.compile_binding(name, value, true),
            Stmt::Assignment {
                target,
                value,
                span,
            } => self.compile_assignment(target, value, span),
            Stmt::FnDecl {
                name,
                params,
                body,
                span,
            } => self.compile_fn_decl(name, params, body, span),
            Stmt::Return { value, span } => {
                if !self.in_function() {
                    return Err(CompilerError::ReturnOutsideFunction {
                        line: span.line,
                        col: span.col,
                    });
                }
                let reg = match value {
                    Some(expr) => self.compile_expr(expr)?,
                    None => {
                        let reg = self.alloc_reg()?;
                        self.emit_abx(OpCode::LoadNil, reg, 0);
                        reg
                    }
                };
                self.emit_abc(OpCode::Return, reg, 0, 0);
                self.free_reg(reg);
                Ok(())
            }
            Stmt::While {
                condition, body, ..
            } => self.compile_while(condition, body),
            Stmt::Expr(expr) => {
                if self.at_top_level() {
                    // The last top-level expression is the fragment's value
                    let target = self.result_reg;
                    self.compile_expr_into(expr, target)?;
                } else {
                    let reg = self.compile_expr(expr)?;
                    self.free_reg(reg);
                }
                Ok(())
            }
        }
    }

    fn compile_binding(
        &mut self,
        name: &str,
        value: &Expr,
        mutable: bool,
    ) -> Result<(), CompilerError> {
        // The value sees the previous binding of `name`
        let reg = self.compile_expr(value)?;

        if self.at_top_level() {
            let slot = self.stage_global(name, mutable)?;
            self.emit_abx(OpCode::DefGlobal, reg, slot);
            self.free_reg(reg);
        } else {
            self.declare_local(name, reg, mutable);
        }
        Ok(())
    }

    fn compile_assignment(
        &mut self,
        target: &Expr,
        value: &Expr,
        span: &Span,
    ) -> Result<(), CompilerError> {
        let Expr::Ident { name, .. } = target else {
            // The parser only produces identifier targets
            return Err(CompilerError::ImmutableAssignment {
                name: "<expression>".into(),
                line: span.line,
                col: span.col,
            });
        };
        let immutable = || CompilerError::ImmutableAssignment {
            name: name.clone(),
            line: span.line,
            col: span.col,
        };

        if let Some(local) = self.current_ref().resolve_local(name) {
            if !local.mutable {
                return Err(immutable());
            }
            let dest = local.reg;
            let reg = self.compile_expr(value)?;
            self.emit_abc(OpCode::Move, dest, reg, 0);
            self.free_reg(reg);
            return Ok(());
        }

        match self.resolve_global(name) {
            Some(sym) if sym.mutable => {
                let slot = u16::try_from(sym.slot).map_err(|_| CompilerError::TooManyGlobals)?;
                let reg = self.compile_expr(value)?;
                self.emit_abx(OpCode::SetGlobal, reg, slot);
                self.free_reg(reg);
                Ok(())
            }
            Some(_) => Err(immutable()),
            None if self.env.primitive(name).is_some() => Err(immutable()),
            None => Err(CompilerError::UnboundIdentifier {
                name: name.clone(),
                line: span.line,
                col: span.col,
            }),
        }
    }

    fn compile_fn_decl(
        &mut self,
        name: &str,
        params: &[String],
        body: &Block,
        span: &Span,
    ) -> Result<(), CompilerError> {
        if !self.at_top_level() {
            return Err(CompilerError::NestedFunction {
                name: name.to_string(),
                line: span.line,
                col: span.col,
            });
        }
        let arity = u8::try_from(params.len())
            .ok()
            .filter(|&n| n < u8::MAX)
            .ok_or(CompilerError::TooManyArguments)?;

        // Staged before the body so the function can call itself
        let slot = self.stage_global(name, false)?;

        self.compilers.push(FunctionCompiler::new(name, arity));
        self.begin_scope();
        self.declare_params(params)?;
        let result = self.alloc_reg()?;
        self.compile_block_into(body, result)?;
        self.emit_abc(OpCode::Return, result, 0, 0);

        let Some(func) = self.compilers.pop() else {
            return Ok(());
        };
        let proto_index = self.prototypes.len() as u32;
        self.prototypes.push(func.into_prototype());

        let k = self
            .current()
            .add_constant(Constant::Function(proto_index))?;
        let reg = self.alloc_reg()?;
        self.emit_abx(OpCode::LoadConst, reg, k);
        self.emit_abx(OpCode::DefGlobal, reg, slot);
        self.free_reg(reg);
        Ok(())
    }

    fn compile_while(&mut self, condition: &Expr, body: &Block) -> Result<(), CompilerError> {
        let loop_start = self.current_ref().here();

        let cond = self.compile_expr(condition)?;
        let exit_jump = self.current().emit_jump(OpCode::JumpIfFalse, cond);
        self.free_reg(cond);

        let scratch = self.alloc_reg()?;
        self.compile_block_into(body, scratch)?;
        self.free_reg(scratch);

        self.current().emit_loop(loop_start)?;
        self.current().patch_jump(exit_jump)
    }
}
