use std::cmp::Ordering;

use crate::error::RuntimeError;
use crate::opcode::{instruction::*, OpCode};
use memory::Value;

use super::stack::StackOps;

/// Trait for arithmetic and ordering instruction handlers
pub trait ArithmeticOps {
    fn handle_arithmetic(
        &mut self,
        op: OpCode,
        instruction: u32,
        base: usize,
    ) -> Result<(), RuntimeError>;

    fn concat_strings(&mut self, lhs: Value, rhs: Value) -> Result<Value, RuntimeError>;

    fn compare(&self, lhs: Value, rhs: Value, op: OpCode) -> Result<Ordering, RuntimeError>;
}

fn int_operands(lhs: Value, rhs: Value, op: OpCode) -> Result<(i64, i64), RuntimeError> {
    match (lhs.as_int(), rhs.as_int()) {
        (Some(x), Some(y)) => Ok((x, y)),
        _ => Err(RuntimeError::TypeMismatch(format!(
            "{} expects int operands, got {} and {}",
            op,
            lhs.type_name(),
            rhs.type_name()
        ))),
    }
}

/// Re-tag an i64 result, failing when it leaves the i60 range.
fn checked(result: Option<i64>) -> Result<Value, RuntimeError> {
    result
        .and_then(Value::checked_int)
        .ok_or(RuntimeError::IntegerOverflow)
}

impl ArithmeticOps for super::vm::Machine<'_> {
    fn handle_arithmetic(
        &mut self,
        op: OpCode,
        instruction: u32,
        base: usize,
    ) -> Result<(), RuntimeError> {
        let a = decode_a(instruction) as usize;
        let b = decode_b(instruction) as usize;
        let vb = self.get_reg(base, b)?;

        if op == OpCode::Neg {
            let (x, _) = int_operands(vb, Value::int(0), op)?;
            let res = checked(x.checked_neg())?;
            return self.set_reg(base, a, res);
        }

        let c = decode_c(instruction) as usize;
        let vc = self.get_reg(base, c)?;

        let res = match op {
            OpCode::Add if vb.is_string() && vc.is_string() => self.concat_strings(vb, vc)?,
            OpCode::Add => {
                let (x, y) = int_operands(vb, vc, op)?;
                checked(x.checked_add(y))?
            }
            OpCode::Sub => {
                let (x, y) = int_operands(vb, vc, op)?;
                checked(x.checked_sub(y))?
            }
            OpCode::Mul => {
                let (x, y) = int_operands(vb, vc, op)?;
                checked(x.checked_mul(y))?
            }
            OpCode::Div => {
                let (x, y) = int_operands(vb, vc, op)?;
                if y == 0 {
                    return Err(RuntimeError::DivisionByZero);
                }
                checked(x.checked_div(y))?
            }
            OpCode::Mod => {
                let (x, y) = int_operands(vb, vc, op)?;
                if y == 0 {
                    return Err(RuntimeError::DivisionByZero);
                }
                checked(x.checked_rem(y))?
            }
            OpCode::Lt => Value::bool(self.compare(vb, vc, op)? == Ordering::Less),
            OpCode::Le => Value::bool(self.compare(vb, vc, op)? != Ordering::Greater),
            OpCode::Gt => Value::bool(self.compare(vb, vc, op)? == Ordering::Greater),
            OpCode::Ge => Value::bool(self.compare(vb, vc, op)? != Ordering::Less),
            _ => {
                return Err(RuntimeError::SystemError(format!(
                    "{op} is not an arithmetic instruction"
                )))
            }
        };
        self.set_reg(base, a, res)
    }

    fn concat_strings(&mut self, lhs: Value, rhs: Value) -> Result<Value, RuntimeError> {
        let (Some(h1), Some(h2)) = (lhs.as_handle(), rhs.as_handle()) else {
            return Err(RuntimeError::TypeMismatch("bad string handle".into()));
        };
        let joined = match (self.heap.get_string(h1), self.heap.get_string(h2)) {
            (Some(s1), Some(s2)) => format!("{s1}{s2}"),
            _ => return Err(RuntimeError::SystemError("Dangling string handle".into())),
        };
        let handle = self.heap.alloc_string(joined);
        Ok(Value::string(handle))
    }

    fn compare(&self, lhs: Value, rhs: Value, op: OpCode) -> Result<Ordering, RuntimeError> {
        if lhs.is_string() && rhs.is_string() {
            let (Some(h1), Some(h2)) = (lhs.as_handle(), rhs.as_handle()) else {
                return Err(RuntimeError::TypeMismatch("bad string handle".into()));
            };
            return match (self.heap.get_string(h1), self.heap.get_string(h2)) {
                (Some(s1), Some(s2)) => Ok(s1.cmp(s2)),
                _ => Err(RuntimeError::SystemError("Dangling string handle".into())),
            };
        }
        let (x, y) = int_operands(lhs, rhs, op)?;
        Ok(x.cmp(&y))
    }
}
