//! The register machine that runs one reified unit.
//!
//! `vm` holds the machine state and dispatch loop; each instruction family
//! is a trait implemented on [`Machine`] in its own file.

mod arithmetic;
mod control;
mod frame;
mod globals;
mod stack;
mod vm;

pub use frame::CallFrame;
pub use stack::StackOps;
pub use vm::{Machine, MAX_FRAMES, STACK_MAX};
