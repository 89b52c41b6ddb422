//! Terminal-capability, tracing and image-introspection stubs for the
//! toplevel. Operations the host cannot perform return [`MetaError`].

use log::debug;
use memory::Value;

use crate::error::MetaError;
use crate::image::ProgramImage;

/// What the terminal supports. Only the no-capability answer exists: callers
/// fall back to plain output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermStatus {
    BadTerm,
}

/// Terminal capability queries. No capability database is consulted, so
/// setup always reports `BadTerm` and the drawing calls do nothing.
#[derive(Debug, Default)]
pub struct TermInfo;

impl TermInfo {
    pub fn setup() -> TermStatus {
        TermStatus::BadTerm
    }

    pub fn backup(&self, _lines: usize) {}

    pub fn standout(&self, _on: bool) {}

    pub fn resume(&self, _lines: usize) {}
}

/// Snapshot of the image's linkage tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionTable {
    pub globals: usize,
    pub bound: usize,
    pub primitives: Vec<(u32, String)>,
}

impl std::fmt::Display for SectionTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "globals: {} slots ({} bound)", self.globals, self.bound)?;
        write!(f, "primitives: {}", self.primitives.len())?;
        for (index, name) in &self.primitives {
            write!(f, "\n  #{index} {name}")?;
        }
        Ok(())
    }
}

/// Calling a function under the tracer. There is no tracer.
pub fn invoke_traced_function() -> Result<Value, MetaError> {
    Err(MetaError::InvalidArgument("invoke_traced_function"))
}

/// The toplevel's typing environment, which this runtime does not keep.
pub fn current_environment() -> Result<Value, MetaError> {
    Err(MetaError::NotImplemented("current_environment"))
}

/// A zero-filled buffer outside the value heap.
#[derive(Debug, PartialEq, Eq)]
pub struct StaticBlock {
    bytes: Vec<u8>,
}

impl StaticBlock {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.bytes
    }
}

pub fn static_alloc(len: usize) -> StaticBlock {
    debug!("static alloc {} bytes", len);
    StaticBlock {
        bytes: vec![0; len],
    }
}

/// Release a block from [`static_alloc`]. Always succeeds.
pub fn static_free(block: StaticBlock) {
    debug!("static free {} bytes", block.len());
}

pub fn section_table(image: &ProgramImage) -> SectionTable {
    let globals = image.globals.borrow();
    let primitives = image.primitives.borrow();
    SectionTable {
        globals: globals.len(),
        bound: globals.iter().filter(|(_, v)| !v.is_empty()).count(),
        primitives: primitives
            .names()
            .map(|(i, name)| (i, name.to_string()))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_reports_bad_term() {
        assert_eq!(TermInfo::setup(), TermStatus::BadTerm);
    }

    #[test]
    fn tracing_and_environment_are_unavailable() {
        assert_eq!(
            invoke_traced_function(),
            Err(MetaError::InvalidArgument("invoke_traced_function"))
        );
        let err = current_environment().unwrap_err();
        assert_eq!(err.to_string(), "current_environment not implemented");
    }

    #[test]
    fn static_blocks_are_zeroed_and_freed() {
        let mut block = static_alloc(16);
        assert_eq!(block.len(), 16);
        assert!(block.as_mut_slice().iter().all(|&b| b == 0));
        block.as_mut_slice()[3] = 7;
        static_free(block);
        assert!(static_alloc(0).is_empty());
    }

    #[test]
    fn section_table_counts_bound_slots() {
        let image = ProgramImage::with_stdlib();
        {
            let mut globals = image.globals.borrow_mut();
            globals.ensure_capacity(3);
            globals.set(1, Value::int(7)).unwrap();
        }
        let table = section_table(&image);
        assert_eq!(table.globals, 3);
        assert_eq!(table.bound, 1);
        assert_eq!(table.primitives[0], (0, "print".to_string()));
        assert!(table.to_string().starts_with("globals: 3 slots (1 bound)"));
    }
}
