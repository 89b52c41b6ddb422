use std::collections::HashMap;

use vm::PrimitiveRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalSymbol {
    pub slot: usize,
    pub mutable: bool,
}

/// A global binding introduced by one fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Definition {
    pub name: String,
    pub slot: usize,
    pub mutable: bool,
}

/// Name resolution state carried across toplevel turns.
///
/// Slots are never reused: redefining a name moves it to a fresh slot and
/// code compiled against the old slot keeps reading the old value.
#[derive(Debug, Clone, Default)]
pub struct SymbolEnv {
    globals: HashMap<String, GlobalSymbol>,
    next_slot: usize,
    primitives: HashMap<String, u32>,
}

impl SymbolEnv {
    pub fn new() -> Self {
        Self::default()
    }

    /// An environment that knows every primitive in `registry`.
    pub fn with_primitives(registry: &PrimitiveRegistry) -> Self {
        let mut env = Self::new();
        env.sync_primitives(registry);
        env
    }

    /// Pick up primitives registered since the last sync.
    /// Later registrations shadow earlier ones of the same name.
    pub fn sync_primitives(&mut self, registry: &PrimitiveRegistry) {
        for (index, name) in registry.names() {
            self.primitives.insert(name.to_string(), index);
        }
    }

    pub fn define_primitive(&mut self, name: impl Into<String>, index: u32) {
        self.primitives.insert(name.into(), index);
    }

    pub fn global(&self, name: &str) -> Option<GlobalSymbol> {
        self.globals.get(name).copied()
    }

    pub fn primitive(&self, name: &str) -> Option<u32> {
        self.primitives.get(name).copied()
    }

    pub fn next_slot(&self) -> usize {
        self.next_slot
    }

    pub fn global_count(&self) -> usize {
        self.globals.len()
    }

    /// Make the definitions of a successful turn visible to later compiles.
    pub fn commit(&mut self, definitions: &[Definition]) {
        for def in definitions {
            self.globals.insert(
                def.name.clone(),
                GlobalSymbol {
                    slot: def.slot,
                    mutable: def.mutable,
                },
            );
            self.next_slot = self.next_slot.max(def.slot + 1);
        }
    }

    /// Bound names ordered by slot.
    pub fn bindings(&self) -> Vec<(&str, GlobalSymbol)> {
        let mut out: Vec<_> = self
            .globals
            .iter()
            .map(|(name, sym)| (name.as_str(), *sym))
            .collect();
        out.sort_by_key(|(_, sym)| sym.slot);
        out
    }
}
