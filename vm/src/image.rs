use std::cell::RefCell;
use std::rc::Rc;

use memory::Heap;

use crate::globals::GlobalTable;
use crate::native::PrimitiveRegistry;

/// The live program image: one global table, one primitive registry and one
/// heap for the whole session.
///
/// Cloning clones the handles. Every clone observes the same tables.
#[derive(Clone, Default)]
pub struct ProgramImage {
    pub globals: Rc<RefCell<GlobalTable>>,
    pub primitives: Rc<RefCell<PrimitiveRegistry>>,
    pub heap: Rc<RefCell<Heap>>,
}

impl ProgramImage {
    /// An image with an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// An image whose registry already holds the standard primitives.
    pub fn with_stdlib() -> Self {
        Self {
            primitives: Rc::new(RefCell::new(PrimitiveRegistry::with_stdlib())),
            ..Self::default()
        }
    }

    /// Whether `other` shares this image's tables.
    pub fn same_as(&self, other: &ProgramImage) -> bool {
        Rc::ptr_eq(&self.globals, &other.globals)
            && Rc::ptr_eq(&self.primitives, &other.primitives)
            && Rc::ptr_eq(&self.heap, &other.heap)
    }
}

impl std::fmt::Debug for ProgramImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgramImage")
            .field("globals", &self.globals.try_borrow().map(|g| g.len()).ok())
            .field(
                "primitives",
                &self.primitives.try_borrow().map(|p| p.count()).ok(),
            )
            .finish_non_exhaustive()
    }
}
