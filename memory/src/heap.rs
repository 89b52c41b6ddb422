use crate::Value;

/// A compiled function living in the heap.
///
/// Register layout: arguments occupy R0..R(arity-1), locals and temporaries
/// follow up to `max_slots`.
#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    pub arity: u8,
    pub max_slots: u16,
    pub chunk: Vec<u32>,
    pub constants: Vec<Value>,
}

#[derive(Debug, Clone)]
pub struct Arena<T> {
    pub data: Vec<T>,
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    fn alloc(&mut self, item: T) -> u32 {
        let index = self.data.len() as u32;
        self.data.push(item);
        index
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Append-only object store shared by every turn of a toplevel session.
///
/// Nothing is ever freed: globals committed by an earlier turn may hold any
/// handle, and those bindings must keep resolving for the life of the image.
#[derive(Debug, Default)]
pub struct Heap {
    pub strings: Arena<String>,
    pub functions: Arena<Function>,
    pub bytes_allocated: usize,
}

impl Heap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc_string(&mut self, s: String) -> u32 {
        self.bytes_allocated += s.capacity();
        self.strings.alloc(s)
    }

    pub fn alloc_function(&mut self, f: Function) -> u32 {
        self.bytes_allocated += f.chunk.len() * std::mem::size_of::<u32>()
            + f.constants.len() * std::mem::size_of::<Value>();
        self.functions.alloc(f)
    }

    pub fn get_string(&self, handle: u32) -> Option<&String> {
        self.strings.data.get(handle as usize)
    }

    pub fn get_function(&self, handle: u32) -> Option<&Function> {
        self.functions.data.get(handle as usize)
    }

    pub fn get_function_mut(&mut self, handle: u32) -> Option<&mut Function> {
        self.functions.data.get_mut(handle as usize)
    }

    /// Import a batch of strings, returning their handles in order.
    pub fn import_strings(&mut self, strings: impl IntoIterator<Item = String>) -> Vec<u32> {
        strings.into_iter().map(|s| self.alloc_string(s)).collect()
    }
}
