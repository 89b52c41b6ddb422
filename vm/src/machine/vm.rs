use std::cell::{Ref, RefMut};
use std::collections::BTreeMap;
use std::io::Write;

use crate::error::RuntimeError;
use crate::format;
use crate::globals::GlobalTable;
use crate::native::PrimitiveRegistry;
use crate::opcode::{instruction::*, OpCode};
use memory::{Function, Heap, Value};

use super::arithmetic::ArithmeticOps;
use super::control::ControlFlowOps;
use super::frame::CallFrame;
use super::globals::GlobalOps;
use super::stack::StackOps;

pub const STACK_MAX: usize = 65_536;
pub const MAX_FRAMES: usize = 512;

/// The interpreter for one reified unit.
///
/// Holds shared borrows of the global table and registry and a mutable
/// borrow of the heap for as long as the unit runs. Global writes land in
/// `pending` and are only committed by the caller once the run succeeds.
pub struct Machine<'a> {
    pub heap: RefMut<'a, Heap>,
    pub(super) globals: Ref<'a, GlobalTable>,
    pub(super) primitives: Ref<'a, PrimitiveRegistry>,
    pub(super) pending: BTreeMap<usize, Value>,
    pub stack: Vec<Value>,
    pub frames: Vec<CallFrame>,
    out: &'a mut dyn Write,
    fuel: Option<u64>,
    executed: u64,
}

impl<'a> Machine<'a> {
    pub fn new(
        heap: RefMut<'a, Heap>,
        globals: Ref<'a, GlobalTable>,
        primitives: Ref<'a, PrimitiveRegistry>,
        out: &'a mut dyn Write,
    ) -> Self {
        Self {
            heap,
            globals,
            primitives,
            pending: BTreeMap::new(),
            stack: Vec::with_capacity(256),
            frames: Vec::with_capacity(16),
            out,
            fuel: None,
            executed: 0,
        }
    }

    /// Stop with `FuelExhausted` after `limit` instructions.
    pub fn with_fuel(mut self, limit: Option<u64>) -> Self {
        self.fuel = limit;
        self
    }

    /// Global writes made so far, in slot order.
    pub fn take_writes(&mut self) -> Vec<(usize, Value)> {
        std::mem::take(&mut self.pending).into_iter().collect()
    }

    pub fn primitives(&self) -> &PrimitiveRegistry {
        &self.primitives
    }

    /// Write one line to the session output.
    pub fn write_line(&mut self, line: &str) -> Result<(), RuntimeError> {
        writeln!(self.out, "{line}").map_err(|e| RuntimeError::Output(e.to_string()))
    }

    /// The value as `print` shows it.
    pub fn val_to_string(&self, val: &Value) -> String {
        format::display_value(&self.heap, &self.primitives, *val)
    }

    /// Structural equality: strings compare by content.
    pub fn values_equal(&self, v1: Value, v2: Value) -> bool {
        if v1 == v2 {
            return true;
        }
        if v1.is_string() && v2.is_string() {
            let (Some(h1), Some(h2)) = (v1.as_handle(), v2.as_handle()) else {
                return false;
            };
            match (self.heap.get_string(h1), self.heap.get_string(h2)) {
                (Some(s1), Some(s2)) => s1 == s2,
                _ => false,
            }
        } else {
            false
        }
    }

    pub(super) fn function(&self, handle: u32) -> Result<&Function, RuntimeError> {
        self.heap
            .get_function(handle)
            .ok_or(RuntimeError::FunctionNotFound(handle))
    }

    /// Make sure registers `base..base + slots` exist.
    pub(super) fn reserve(&mut self, base: usize, slots: usize) -> Result<(), RuntimeError> {
        let needed = base + slots;
        if needed > STACK_MAX {
            return Err(RuntimeError::StackOverflow);
        }
        if self.stack.len() < needed {
            self.stack.resize(needed, Value::nil());
        }
        Ok(())
    }

    /// Run `function` as the entry frame and return its result.
    pub fn execute(&mut self, function: u32) -> Result<Value, RuntimeError> {
        let max_slots = self.function(function)?.max_slots as usize;
        self.stack.clear();
        self.frames.clear();
        self.reserve(0, max_slots)?;
        self.frames.push(CallFrame::new(function, 0, 0));
        self.interpret()
    }

    fn burn_fuel(&mut self) -> Result<(), RuntimeError> {
        self.executed += 1;
        match self.fuel {
            Some(limit) if self.executed > limit => Err(RuntimeError::FuelExhausted(limit)),
            _ => Ok(()),
        }
    }

    /// Main interpretation loop
    fn interpret(&mut self) -> Result<Value, RuntimeError> {
        while let Some(frame) = self.frames.last() {
            let frame_idx = self.frames.len() - 1;
            let (function, ip, base) = (frame.function, frame.ip, frame.base);

            let word = self.function(function)?.chunk.get(ip).copied();
            let Some(instruction) = word else {
                // Falling off the end returns nil
                if let Some(value) = self.return_from_frame(Value::nil())? {
                    return Ok(value);
                }
                continue;
            };
            self.frames[frame_idx].ip += 1;
            self.burn_fuel()?;

            let op_byte = decode_opcode(instruction);
            let op = OpCode::from_u8(op_byte).ok_or(RuntimeError::InvalidOpcode(op_byte))?;

            use crate::opcode::OpCode::*;

            match op {
                // Arithmetic and comparison (delegated to arithmetic.rs)
                Add | Sub | Mul | Div | Mod | Neg | Lt | Le | Gt | Ge => {
                    self.handle_arithmetic(op, instruction, base)?;
                }

                // Calls (delegated to control.rs)
                Call => {
                    self.handle_call(instruction, base)?;
                }

                Return => {
                    let a = decode_a(instruction) as usize;
                    let value = self.get_reg(base, a)?;
                    if let Some(value) = self.return_from_frame(value)? {
                        return Ok(value);
                    }
                }

                // Globals and primitives (delegated to globals.rs)
                DefGlobal | GetGlobal | SetGlobal | GetPrim => {
                    self.handle_globals(op, instruction, base)?;
                }

                Jump => {
                    let dest = decode_bx(instruction) as usize;
                    self.frames[frame_idx].ip = dest;
                }

                JumpIfFalse => {
                    let a = decode_a(instruction) as usize;
                    let dest = decode_bx(instruction) as usize;
                    if self.get_reg(base, a)?.is_falsey() {
                        self.frames[frame_idx].ip = dest;
                    }
                }

                JumpIfTrue => {
                    let a = decode_a(instruction) as usize;
                    let dest = decode_bx(instruction) as usize;
                    if !self.get_reg(base, a)?.is_falsey() {
                        self.frames[frame_idx].ip = dest;
                    }
                }

                Eq | NotEq => {
                    let a = decode_a(instruction) as usize;
                    let b = decode_b(instruction) as usize;
                    let c = decode_c(instruction) as usize;
                    let v1 = self.get_reg(base, b)?;
                    let v2 = self.get_reg(base, c)?;
                    let equal = self.values_equal(v1, v2);
                    self.set_reg(base, a, Value::bool(equal == (op == Eq)))?;
                }

                LogNot => {
                    let a = decode_a(instruction) as usize;
                    let b = decode_b(instruction) as usize;
                    let vb = self.get_reg(base, b)?;
                    self.set_reg(base, a, Value::bool(vb.is_falsey()))?;
                }

                // Constants & Moves
                LoadConst => {
                    let a = decode_a(instruction) as usize;
                    let bx = decode_bx(instruction) as usize;
                    let val = self
                        .function(function)?
                        .constants
                        .get(bx)
                        .copied()
                        .ok_or_else(|| {
                            RuntimeError::SystemError(format!("constant K{bx} out of range"))
                        })?;
                    self.set_reg(base, a, val)?;
                }

                LoadTrue => {
                    let a = decode_a(instruction) as usize;
                    self.set_reg(base, a, Value::bool(true))?;
                }

                LoadFalse => {
                    let a = decode_a(instruction) as usize;
                    self.set_reg(base, a, Value::bool(false))?;
                }

                LoadNil => {
                    let a = decode_a(instruction) as usize;
                    self.set_reg(base, a, Value::nil())?;
                }

                Move => {
                    let a = decode_a(instruction) as usize;
                    let b = decode_b(instruction) as usize;
                    let val = self.get_reg(base, b)?;
                    self.set_reg(base, a, val)?;
                }
            }
        }

        Ok(Value::nil())
    }
}
