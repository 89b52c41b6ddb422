/// One activation of a bytecode function.
///
/// Registers of the frame live at `stack[base..base + max_slots]`. When the
/// frame returns, its result is stored at the absolute stack index `dest`
/// of the caller.
#[derive(Debug, Clone)]
pub struct CallFrame {
    /// Heap handle of the running function.
    pub function: u32,
    pub ip: usize,
    pub base: usize,
    pub dest: usize,
}

impl CallFrame {
    pub fn new(function: u32, base: usize, dest: usize) -> Self {
        Self {
            function,
            ip: 0,
            base,
            dest,
        }
    }
}
