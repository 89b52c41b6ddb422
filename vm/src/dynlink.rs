//! Native shared-library surface for hosts without a dynamic loader.
//!
//! Opening and closing always succeed so call sites can keep strict
//! acquire/release pairing. Symbol lookup always comes back
//! [`SymbolNotFound`]. A looked-up name is never evaluated as code.

use log::debug;

use crate::error::SymbolNotFound;

/// Token for an opened library. Resolves no symbols.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "library handles must be released with `close_library`"]
pub struct LibraryHandle {
    id: u32,
    name: String,
}

impl LibraryHandle {
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Address of a resolved native symbol. Never produced by the stub.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolAddress(pub usize);

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CurrentLibraries {
    pub count: usize,
    pub handles: Vec<u32>,
}

#[derive(Debug, Default)]
pub struct DynamicLibraryStub {
    next_id: u32,
}

impl DynamicLibraryStub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_library(&mut self, name: &str) -> LibraryHandle {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        debug!("dynlink open `{}` -> handle {}", name, id);
        LibraryHandle {
            id,
            name: name.to_string(),
        }
    }

    pub fn close_library(&mut self, handle: LibraryHandle) {
        debug!("dynlink close `{}` (handle {})", handle.name, handle.id);
    }

    pub fn lookup_symbol(
        &self,
        handle: &LibraryHandle,
        name: &str,
    ) -> Result<SymbolAddress, SymbolNotFound> {
        Err(SymbolNotFound {
            library: handle.name.clone(),
            symbol: name.to_string(),
        })
    }

    /// Nothing is ever resident.
    pub fn current_libraries(&self) -> CurrentLibraries {
        CurrentLibraries::default()
    }

    /// Open `name`, run `f` with the handle, then close it whatever `f` returns.
    pub fn with_library<T>(
        &mut self,
        name: &str,
        f: impl FnOnce(&Self, &LibraryHandle) -> T,
    ) -> T {
        let handle = self.open_library(name);
        let result = f(self, &handle);
        self.close_library(handle);
        result
    }
}
