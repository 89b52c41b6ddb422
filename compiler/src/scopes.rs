use crate::codegen::Compiler;
use crate::error::CompilerError;
use crate::function_compiler::Local;

pub trait ScopeCompiler {
    fn begin_scope(&mut self);
    fn end_scope(&mut self);
    fn declare_local(&mut self, name: &str, reg: u8, mutable: bool);
    fn declare_params(&mut self, params: &[String]) -> Result<(), CompilerError>;
}

impl ScopeCompiler for Compiler<'_> {
    fn begin_scope(&mut self) {
        self.current().scope_depth += 1;
    }

    fn end_scope(&mut self) {
        let func = self.current();
        func.scope_depth -= 1;
        let current_depth = func.scope_depth;

        // Locals are ordered by creation, so the out-of-scope ones are a suffix
        while func
            .locals
            .last()
            .is_some_and(|local| local.depth > current_depth)
        {
            if let Some(local) = func.locals.pop() {
                func.free_reg(local.reg);
            }
        }
    }

    fn declare_local(&mut self, name: &str, reg: u8, mutable: bool) {
        let func = self.current();
        let depth = func.scope_depth;
        func.locals.push(Local {
            name: name.to_string(),
            depth,
            reg,
            mutable,
        });
    }

    /// Parameters live in R0..R(arity-1) at depth 1.
    fn declare_params(&mut self, params: &[String]) -> Result<(), CompilerError> {
        for (i, param) in params.iter().enumerate() {
            if params[..i].contains(param) {
                return Err(CompilerError::DuplicateParameter(param.clone()));
            }
            self.declare_local(param, i as u8, false);
        }
        Ok(())
    }
}
