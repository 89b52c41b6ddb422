use crate::error::CompilerError;
use vm::opcode::instruction::{encode_abc, encode_abx};
use vm::opcode::OpCode;
use vm::{Constant, Prototype};

pub struct Local {
    pub name: String,
    pub depth: u32,
    pub reg: u8,
    pub mutable: bool,
}

/// State specific to ONE function being compiled
pub struct FunctionCompiler {
    pub name: String,
    pub arity: u8,
    pub locals: Vec<Local>,
    pub scope_depth: u32,
    pub bytecode: Vec<u32>,
    pub constants: Vec<Constant>,

    // Register allocator state
    pub reg_top: u8,
    pub max_slots: u16,
}

impl FunctionCompiler {
    /// Creates a new function compiler.
    /// reg_top starts at arity so arguments keep R0..R(arity-1).
    pub fn new(name: impl Into<String>, arity: u8) -> Self {
        Self {
            name: name.into(),
            arity,
            locals: Vec::new(),
            scope_depth: 0,
            bytecode: Vec::new(),
            constants: Vec::new(),
            reg_top: arity,
            max_slots: arity as u16,
        }
    }

    pub fn alloc_reg(&mut self) -> Result<u8, CompilerError> {
        let r = self.reg_top;
        if r == u8::MAX {
            return Err(CompilerError::RegisterOverflow);
        }
        self.reg_top += 1;

        // High water mark
        if (self.reg_top as u16) > self.max_slots {
            self.max_slots = self.reg_top as u16;
        }

        Ok(r)
    }

    /// Registers are a stack: only the topmost one may be freed.
    pub fn free_reg(&mut self, reg: u8) {
        debug_assert_eq!(reg + 1, self.reg_top, "register hygiene");
        self.reg_top -= 1;
    }

    pub fn add_constant(&mut self, constant: Constant) -> Result<u16, CompilerError> {
        if let Some(idx) = self.constants.iter().position(|c| c == &constant) {
            return Ok(idx as u16);
        }
        if self.constants.len() > u16::MAX as usize {
            return Err(CompilerError::TooManyConstants);
        }
        self.constants.push(constant);
        Ok((self.constants.len() - 1) as u16)
    }

    pub fn emit_abc(&mut self, op: OpCode, a: u8, b: u8, c: u8) {
        self.bytecode.push(encode_abc(op.as_u8(), a, b, c));
    }

    pub fn emit_abx(&mut self, op: OpCode, a: u8, bx: u16) {
        self.bytecode.push(encode_abx(op.as_u8(), a, bx));
    }

    /// Position of the next instruction.
    pub fn here(&self) -> usize {
        self.bytecode.len()
    }

    /// Emit a jump with a placeholder target, returning its position.
    pub fn emit_jump(&mut self, op: OpCode, a: u8) -> usize {
        let pos = self.here();
        self.emit_abx(op, a, 0);
        pos
    }

    /// Point the jump at `pos` to the next instruction.
    pub fn patch_jump(&mut self, pos: usize) -> Result<(), CompilerError> {
        let target = u16::try_from(self.here()).map_err(|_| CompilerError::JumpTooFar)?;
        let word = self.bytecode[pos];
        let op = vm::opcode::instruction::decode_opcode(word);
        let a = vm::opcode::instruction::decode_a(word);
        self.bytecode[pos] = encode_abx(op, a, target);
        Ok(())
    }

    pub fn emit_loop(&mut self, start: usize) -> Result<(), CompilerError> {
        let target = u16::try_from(start).map_err(|_| CompilerError::JumpTooFar)?;
        self.emit_abx(OpCode::Jump, 0, target);
        Ok(())
    }

    pub fn resolve_local(&self, name: &str) -> Option<&Local> {
        self.locals.iter().rev().find(|local| local.name == name)
    }

    pub fn into_prototype(self) -> Prototype {
        Prototype {
            name: self.name,
            arity: self.arity,
            max_slots: self.max_slots.max(1),
            constants: self.constants,
            code: self.bytecode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_start_after_arguments() {
        let mut f = FunctionCompiler::new("f", 2);
        assert_eq!(f.alloc_reg().unwrap(), 2);
        assert_eq!(f.max_slots, 3);
        f.free_reg(2);
        assert_eq!(f.reg_top, 2);
        assert_eq!(f.max_slots, 3);
    }

    #[test]
    fn constants_are_deduplicated() {
        let mut f = FunctionCompiler::new("main", 0);
        let a = f.add_constant(Constant::Int(7)).unwrap();
        let b = f.add_constant(Constant::Str(0)).unwrap();
        assert_eq!(f.add_constant(Constant::Int(7)).unwrap(), a);
        assert_ne!(a, b);
        assert_eq!(f.constants.len(), 2);
    }

    #[test]
    fn patched_jump_targets_next_instruction() {
        let mut f = FunctionCompiler::new("main", 0);
        let pos = f.emit_jump(OpCode::JumpIfFalse, 3);
        f.emit_abc(OpCode::LoadNil, 0, 0, 0);
        f.patch_jump(pos).unwrap();
        let word = f.bytecode[pos];
        assert_eq!(vm::opcode::instruction::decode_a(word), 3);
        assert_eq!(vm::opcode::instruction::decode_bx(word), 2);
    }

    #[test]
    fn register_file_is_bounded() {
        let mut f = FunctionCompiler::new("main", 0);
        for _ in 0..255 {
            f.alloc_reg().unwrap();
        }
        assert_eq!(f.alloc_reg(), Err(CompilerError::RegisterOverflow));
    }
}
