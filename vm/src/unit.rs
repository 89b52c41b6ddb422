use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use log::debug;
use memory::{Function, Value};

use crate::error::{LinkError, RuntimeError};
use crate::executable::{Constant, Executable, Prototype};
use crate::globals::GlobalTable;
use crate::image::ProgramImage;
use crate::machine::Machine;
use crate::opcode::{instruction::*, OpCode, Shape};

/// Result of one successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub value: Value,
    /// Global writes the run made, in slot order. Not yet committed.
    pub writes: Vec<(usize, Value)>,
}

impl Outcome {
    /// Persist the writes: grow the table to fit, then set each slot.
    pub fn commit(&self, globals: &mut GlobalTable) -> Result<(), LinkError> {
        if let Some(max) = self.writes.iter().map(|(slot, _)| *slot).max() {
            globals.ensure_capacity(max + 1);
        }
        for &(slot, value) in &self.writes {
            globals.set(slot, value)?;
        }
        Ok(())
    }
}

/// An executable unit materialised into the live image.
///
/// The unit owns nothing but handles: it observes the session's tables, so
/// growth after reification is visible to it.
#[derive(Debug)]
pub struct ReifiedUnit {
    image: ProgramImage,
    main: u32,
    functions: Vec<u32>,
    size_hint: usize,
}

impl ReifiedUnit {
    /// Verify `exe` against the image, then intern its strings and allocate
    /// its functions in the shared heap.
    pub fn bind(
        exe: Executable,
        image: &ProgramImage,
        size_hint: usize,
    ) -> Result<ReifiedUnit, LinkError> {
        let prim_count = image.primitives.borrow().count();
        for proto in exe.prototypes.iter().chain(std::iter::once(&exe.main)) {
            verify_prototype(proto, &exe, prim_count)?;
        }

        let mut heap = image.heap.borrow_mut();
        let strings = heap.import_strings(exe.strings);

        // Allocate every prototype first so constants can refer to any of them
        let functions: Vec<u32> = exe
            .prototypes
            .iter()
            .map(|p| heap.alloc_function(shell(p)))
            .collect();
        let main = heap.alloc_function(shell(&exe.main));

        let targets = functions
            .iter()
            .copied()
            .zip(exe.prototypes.iter())
            .chain(std::iter::once((main, &exe.main)));
        for (handle, proto) in targets {
            let constants: Vec<Value> = proto
                .constants
                .iter()
                .map(|c| link_constant(c, &strings, &functions))
                .collect();
            if let Some(func) = heap.get_function_mut(handle) {
                func.constants = constants;
            }
        }

        debug!(
            "bound unit: main fn #{}, {} prototypes, {} strings",
            main,
            functions.len(),
            strings.len()
        );
        Ok(ReifiedUnit {
            image: image.clone(),
            main,
            functions,
            size_hint,
        })
    }

    /// Run the unit's main body.
    ///
    /// Global writes are collected in the returned [`Outcome`] and are not
    /// applied to the table; a failing run therefore leaves it untouched.
    pub fn run(&self, out: &mut dyn Write, fuel: Option<u64>) -> Result<Outcome, RuntimeError> {
        let heap = self
            .image
            .heap
            .try_borrow_mut()
            .map_err(|_| RuntimeError::SystemError("heap is already borrowed".into()))?;
        let globals = self
            .image
            .globals
            .try_borrow()
            .map_err(|_| RuntimeError::SystemError("global table is being modified".into()))?;
        let primitives = self
            .image
            .primitives
            .try_borrow()
            .map_err(|_| RuntimeError::SystemError("primitive registry is being modified".into()))?;

        let mut machine = Machine::new(heap, globals, primitives, out).with_fuel(fuel);
        let value = machine.execute(self.main)?;
        let writes = machine.take_writes();
        Ok(Outcome { value, writes })
    }

    /// Run and commit in one step.
    pub fn run_and_commit(
        &self,
        out: &mut dyn Write,
        fuel: Option<u64>,
    ) -> Result<Value, RuntimeError> {
        let outcome = self.run(out, fuel)?;
        outcome.commit(&mut self.image.globals.borrow_mut())?;
        Ok(outcome.value)
    }

    /// The live global table this unit is bound to.
    pub fn globals(&self) -> Rc<RefCell<GlobalTable>> {
        Rc::clone(&self.image.globals)
    }

    pub fn get_global(&self, index: usize) -> Result<Value, LinkError> {
        self.image.globals.borrow().get(index)
    }

    pub fn set_global(&self, index: usize, value: Value) -> Result<(), LinkError> {
        self.image.globals.borrow_mut().set(index, value)
    }

    pub fn image(&self) -> &ProgramImage {
        &self.image
    }

    pub fn main_function(&self) -> u32 {
        self.main
    }

    pub fn functions(&self) -> &[u32] {
        &self.functions
    }

    pub fn size_hint(&self) -> usize {
        self.size_hint
    }
}

fn shell(proto: &Prototype) -> Function {
    Function {
        name: proto.name.clone(),
        arity: proto.arity,
        max_slots: proto.max_slots,
        chunk: proto.code.clone(),
        constants: Vec::new(),
    }
}

// Indices were checked by `verify_prototype`.
fn link_constant(c: &Constant, strings: &[u32], functions: &[u32]) -> Value {
    match c {
        Constant::Int(n) => Value::int(*n),
        Constant::Str(i) => Value::string(strings[*i as usize]),
        Constant::Bool(b) => Value::bool(*b),
        Constant::Nil => Value::nil(),
        Constant::Function(i) => Value::function(functions[*i as usize]),
    }
}

fn malformed(proto: &Prototype, msg: impl std::fmt::Display) -> LinkError {
    LinkError::MalformedUnit(format!("in `{}`: {}", proto.name, msg))
}

fn verify_prototype(
    proto: &Prototype,
    exe: &Executable,
    prim_count: usize,
) -> Result<(), LinkError> {
    let slots = proto.max_slots as usize;
    if proto.arity as usize > slots {
        return Err(malformed(proto, "arity exceeds register count"));
    }

    for (i, c) in proto.constants.iter().enumerate() {
        let ok = match c {
            Constant::Int(n) => Value::checked_int(*n).is_some(),
            Constant::Str(idx) => (*idx as usize) < exe.strings.len(),
            Constant::Function(idx) => (*idx as usize) < exe.prototypes.len(),
            Constant::Bool(_) | Constant::Nil => true,
        };
        if !ok {
            return Err(malformed(proto, format!("constant K{i} is invalid: {c:?}")));
        }
    }

    let reg = |ip: usize, r: u8| -> Result<(), LinkError> {
        if (r as usize) < slots {
            Ok(())
        } else {
            Err(malformed(proto, format!("@{ip}: register R{r} >= {slots}")))
        }
    };

    for (ip, &word) in proto.code.iter().enumerate() {
        let byte = decode_opcode(word);
        let op = OpCode::from_u8(byte)
            .ok_or_else(|| malformed(proto, format!("@{ip}: invalid opcode {byte}")))?;
        let (a, b, c, bx) = (
            decode_a(word),
            decode_b(word),
            decode_c(word),
            decode_bx(word) as usize,
        );
        match op.shape() {
            Shape::A | Shape::ABx => reg(ip, a)?,
            Shape::AB => {
                reg(ip, a)?;
                reg(ip, b)?;
            }
            Shape::ABC => {
                reg(ip, a)?;
                reg(ip, b)?;
                reg(ip, c)?;
            }
            Shape::Bx => {}
        }
        use OpCode::*;
        match op {
            LoadConst => {
                if bx >= proto.constants.len() {
                    return Err(malformed(proto, format!("@{ip}: constant K{bx} out of range")));
                }
            }
            Call => {
                let last = b as usize + c as usize;
                if last >= slots {
                    return Err(malformed(proto, format!("@{ip}: call window R{last} >= {slots}")));
                }
            }
            Jump | JumpIfFalse | JumpIfTrue => {
                if bx > proto.code.len() {
                    return Err(malformed(proto, format!("@{ip}: jump target {bx} outside chunk")));
                }
            }
            GetPrim => {
                if bx >= prim_count {
                    return Err(LinkError::UnknownPrimitive {
                        index: bx,
                        count: prim_count,
                    });
                }
            }
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abx(op: OpCode, a: u8, bx: u16) -> u32 {
        encode_abx(op.as_u8(), a, bx)
    }

    fn main_with(code: Vec<u32>, slots: u16) -> Executable {
        let mut main = Prototype::new("main");
        main.max_slots = slots;
        main.code = code;
        Executable::from_main(main)
    }

    #[test]
    fn register_outside_frame_is_malformed() {
        let image = ProgramImage::new();
        let exe = main_with(vec![abx(OpCode::LoadNil, 3, 0)], 2);
        let err = ReifiedUnit::bind(exe, &image, 1).unwrap_err();
        assert!(matches!(err, LinkError::MalformedUnit(_)), "{err:?}");
    }

    #[test]
    fn unknown_primitive_is_rejected_at_bind() {
        let image = ProgramImage::with_stdlib();
        let count = image.primitives.borrow().count();
        let exe = main_with(vec![abx(OpCode::GetPrim, 0, count as u16)], 1);
        assert_eq!(
            ReifiedUnit::bind(exe, &image, 1).unwrap_err(),
            LinkError::UnknownPrimitive { index: count, count }
        );
    }

    #[test]
    fn jump_to_end_is_allowed_but_not_past_it() {
        let image = ProgramImage::new();
        let ok = main_with(vec![abx(OpCode::Jump, 0, 1)], 0);
        assert!(ReifiedUnit::bind(ok, &image, 1).is_ok());
        let bad = main_with(vec![abx(OpCode::Jump, 0, 2)], 0);
        assert!(ReifiedUnit::bind(bad, &image, 1).is_err());
    }

    #[test]
    fn rejected_unit_leaves_heap_untouched() {
        let image = ProgramImage::new();
        let mut exe = main_with(vec![0xEE00_0000], 1);
        exe.strings.push("unused".into());
        assert!(ReifiedUnit::bind(exe, &image, 1).is_err());
        assert!(image.heap.borrow().strings.is_empty());
        assert!(image.heap.borrow().functions.is_empty());
    }

    #[test]
    fn commit_grows_table_to_highest_write() {
        let mut table = GlobalTable::new();
        let outcome = Outcome {
            value: Value::nil(),
            writes: vec![(0, Value::int(1)), (4, Value::int(5))],
        };
        outcome.commit(&mut table).unwrap();
        assert_eq!(table.len(), 5);
        assert_eq!(table.get(4).unwrap().as_int(), Some(5));
        assert!(!table.is_bound(2));
    }
}
