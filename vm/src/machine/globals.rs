use crate::error::RuntimeError;
use crate::opcode::{instruction::*, OpCode};
use memory::Value;

use super::stack::StackOps;

/// Trait for global slot and primitive instruction handlers
///
/// Reads see this run's own writes first, then the committed table.
pub trait GlobalOps {
    fn handle_globals(
        &mut self,
        op: OpCode,
        instruction: u32,
        base: usize,
    ) -> Result<(), RuntimeError>;

    fn read_global(&self, slot: usize) -> Result<Value, RuntimeError>;
}

impl GlobalOps for super::vm::Machine<'_> {
    fn handle_globals(
        &mut self,
        op: OpCode,
        instruction: u32,
        base: usize,
    ) -> Result<(), RuntimeError> {
        let a = decode_a(instruction) as usize;
        let slot = decode_bx(instruction) as usize;

        match op {
            OpCode::DefGlobal => {
                let val = self.get_reg(base, a)?;
                self.pending.insert(slot, val);
            }

            OpCode::GetGlobal => {
                let val = self.read_global(slot)?;
                self.set_reg(base, a, val)?;
            }

            OpCode::SetGlobal => {
                // Only slots that already exist may be assigned
                if !self.pending.contains_key(&slot) {
                    self.read_global(slot)?;
                }
                let val = self.get_reg(base, a)?;
                self.pending.insert(slot, val);
            }

            OpCode::GetPrim => {
                self.primitives.lookup(slot)?;
                self.set_reg(base, a, Value::native(slot as u32))?;
            }

            _ => {
                return Err(RuntimeError::SystemError(format!(
                    "{op} is not a global instruction"
                )))
            }
        }

        Ok(())
    }

    fn read_global(&self, slot: usize) -> Result<Value, RuntimeError> {
        let val = match self.pending.get(&slot) {
            Some(&v) => v,
            None => self.globals.get(slot)?,
        };
        if val.is_empty() {
            return Err(RuntimeError::UnboundGlobal(slot));
        }
        Ok(val)
    }
}
