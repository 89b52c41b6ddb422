use crate::error::RuntimeError;
use memory::Value;

/// Trait for stack operations (registers)
pub trait StackOps {
    fn get_reg(&self, base: usize, reg: usize) -> Result<Value, RuntimeError>;
    fn set_reg(&mut self, base: usize, reg: usize, val: Value) -> Result<(), RuntimeError>;
}

impl StackOps for super::vm::Machine<'_> {
    #[inline(always)]
    fn get_reg(&self, base: usize, reg: usize) -> Result<Value, RuntimeError> {
        self.stack
            .get(base + reg)
            .copied()
            .ok_or_else(|| RuntimeError::SystemError(format!("register R{reg} out of frame")))
    }

    #[inline(always)]
    fn set_reg(&mut self, base: usize, reg: usize, val: Value) -> Result<(), RuntimeError> {
        let slot = self
            .stack
            .get_mut(base + reg)
            .ok_or_else(|| RuntimeError::SystemError(format!("register R{reg} out of frame")))?;
        *slot = val;
        Ok(())
    }
}
