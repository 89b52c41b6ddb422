use log::debug;

use crate::error::{LinkError, RuntimeError};
use crate::machine::Machine;
use memory::Value;

// The unified signature for ALL primitives (stdlib or host-defined)
// args: Slice of values from the caller's registers.
pub type NativeFn = fn(vm: &mut Machine<'_>, args: &[Value]) -> Result<Value, RuntimeError>;

#[derive(Clone)]
pub struct NativeObj {
    pub name: String,
    pub func: NativeFn,
    pub arity: isize, // -1 for variadic
}

impl NativeObj {
    pub fn new(name: impl Into<String>, func: NativeFn, arity: isize) -> Self {
        Self {
            name: name.into(),
            func,
            arity,
        }
    }
}

impl std::fmt::Debug for NativeObj {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeObj")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

/// Append-only table of primitives addressed by index.
///
/// An index, once handed out, names the same entry forever.
#[derive(Debug, Default)]
pub struct PrimitiveRegistry {
    entries: Vec<NativeObj>,
}

impl PrimitiveRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-populated with the standard primitives.
    pub fn with_stdlib() -> Self {
        let mut registry = Self::new();
        registry.bootstrap_natives();
        registry
    }

    /// Append `native` and return its index, which equals the previous count.
    pub fn register(&mut self, native: NativeObj) -> u32 {
        let index = self.entries.len() as u32;
        debug!(
            "primitive #{} registered: {} (arity {})",
            index, native.name, native.arity
        );
        self.entries.push(native);
        index
    }

    pub fn lookup(&self, index: usize) -> Result<&NativeObj, LinkError> {
        self.entries.get(index).ok_or(LinkError::UnknownPrimitive {
            index,
            count: self.entries.len(),
        })
    }

    /// Next free index.
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    /// Newest index registered under `name`.
    pub fn index_of(&self, name: &str) -> Option<u32> {
        self.entries
            .iter()
            .rposition(|n| n.name == name)
            .map(|i| i as u32)
    }

    pub fn names(&self) -> impl Iterator<Item = (u32, &str)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, n)| (i as u32, n.name.as_str()))
    }

    pub fn bootstrap_natives(&mut self) {
        use crate::stdlib::core::*;

        self.register(NativeObj::new("print", native_print, -1));
        self.register(NativeObj::new("len", native_len, 1));
        self.register(NativeObj::new("typeof", native_typeof, 1));
        self.register(NativeObj::new("assert", native_assert, 1));
        self.register(NativeObj::new("to_string", native_to_string, 1));
        self.register(NativeObj::new("abs", native_abs, 1));
        self.register(NativeObj::new("min", native_min, 2));
        self.register(NativeObj::new("max", native_max, 2));
    }
}
