use crate::error::RuntimeError;
use crate::opcode::instruction::*;
use memory::Value;

use super::frame::CallFrame;
use super::stack::StackOps;
use super::vm::MAX_FRAMES;

/// Trait for call/return handling
pub trait ControlFlowOps {
    fn handle_call(&mut self, instruction: u32, base: usize) -> Result<(), RuntimeError>;

    fn call_native(
        &mut self,
        func_val: Value,
        args_start: usize,
        args_count: usize,
        dest: usize,
    ) -> Result<(), RuntimeError>;

    /// Pop the current frame. Returns the value when the entry frame returns.
    fn return_from_frame(&mut self, value: Value) -> Result<Option<Value>, RuntimeError>;
}

impl ControlFlowOps for super::vm::Machine<'_> {
    fn handle_call(&mut self, instruction: u32, base: usize) -> Result<(), RuntimeError> {
        let a = decode_a(instruction) as usize;
        let b = decode_b(instruction) as usize;
        let c = decode_c(instruction) as usize;

        let func_val = self.get_reg(base, b)?;
        let args_start = base + b + 1;
        let dest = base + a;

        if args_start + c > self.stack.len() {
            return Err(RuntimeError::SystemError(
                "call arguments outside the frame".into(),
            ));
        }

        if func_val.is_native() {
            return self.call_native(func_val, args_start, c, dest);
        }

        let Some(handle) = func_val.as_handle().filter(|_| func_val.is_function()) else {
            return Err(RuntimeError::TypeMismatch(format!(
                "cannot call a value of type {}",
                func_val.type_name()
            )));
        };

        let (arity, max_slots, name) = {
            let func = self.function(handle)?;
            (func.arity as usize, func.max_slots as usize, func.name.clone())
        };
        if arity != c {
            return Err(RuntimeError::ArityMismatch(format!(
                "{} expects {} args, got {}",
                name, arity, c
            )));
        }
        if self.frames.len() >= MAX_FRAMES {
            return Err(RuntimeError::StackOverflow);
        }

        self.reserve(args_start, max_slots)?;
        self.frames.push(CallFrame::new(handle, args_start, dest));
        Ok(())
    }

    fn call_native(
        &mut self,
        func_val: Value,
        args_start: usize,
        args_count: usize,
        dest: usize,
    ) -> Result<(), RuntimeError> {
        let index = func_val
            .as_handle()
            .ok_or_else(|| RuntimeError::TypeMismatch("bad primitive handle".into()))?;
        let (func, arity, name) = {
            let n = self.primitives.lookup(index as usize)?;
            (n.func, n.arity, n.name.clone())
        };

        if arity != -1 && arity as usize != args_count {
            return Err(RuntimeError::ArityMismatch(format!(
                "{}() expects {} args, got {}",
                name, arity, args_count
            )));
        }

        let args: Vec<Value> = self.stack[args_start..args_start + args_count].to_vec();
        let res = func(self, &args)?;
        self.set_reg(dest, 0, res)
    }

    fn return_from_frame(&mut self, value: Value) -> Result<Option<Value>, RuntimeError> {
        let Some(frame) = self.frames.pop() else {
            return Ok(Some(value));
        };
        if self.frames.is_empty() {
            return Ok(Some(value));
        }
        self.set_reg(frame.dest, 0, value)?;
        Ok(None)
    }
}
