pub mod dynlink;
pub mod error;
pub mod executable;
pub mod format;
pub mod globals;
pub mod image;
pub mod loader;
pub mod machine;
pub mod meta;
pub mod native;
pub mod opcode;
pub mod reifier;
pub mod stdlib;
pub mod unit;

pub use dynlink::{CurrentLibraries, DynamicLibraryStub, LibraryHandle, SymbolAddress};
pub use error::{LinkError, LoaderError, MetaError, RuntimeError, SymbolNotFound};
pub use executable::{Constant, Executable, Prototype};
pub use globals::GlobalTable;
pub use image::ProgramImage;
pub use loader::{load_executable, load_from_bytes};
pub use machine::{CallFrame, Machine};
pub use meta::{
    current_environment, invoke_traced_function, section_table, static_alloc, static_free,
    SectionTable, StaticBlock, TermInfo, TermStatus,
};
pub use native::{NativeFn, NativeObj, PrimitiveRegistry};
pub use opcode::OpCode;
pub use reifier::{BytecodeBackend, ReifyBackend, Reifier};
pub use unit::{Outcome, ReifiedUnit};
