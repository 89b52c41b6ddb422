use std::io::{self, Write};

use byteorder::{LittleEndian, WriteBytesExt};

pub const MAGIC: &[u8; 4] = b"QBC\x01";

// Constant pool tags
pub const SER_TAG_INT: u8 = 0;
pub const SER_TAG_STRING: u8 = 1;
pub const SER_TAG_TRUE: u8 = 2;
pub const SER_TAG_FALSE: u8 = 3;
pub const SER_TAG_FUNCTION: u8 = 4;
pub const SER_TAG_NIL: u8 = 255;

/// Constant pool entry. Indices refer to the owning [`Executable`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constant {
    Int(i64),
    Str(u32),
    Bool(bool),
    Nil,
    Function(u32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prototype {
    pub name: String,
    pub arity: u8,
    pub max_slots: u16,
    pub constants: Vec<Constant>,
    pub code: Vec<u32>,
}

impl Prototype {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arity: 0,
            max_slots: 0,
            constants: Vec::new(),
            code: Vec::new(),
        }
    }

    fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u32::<LittleEndian>(self.name.len() as u32)?;
        w.write_all(self.name.as_bytes())?;
        w.write_u8(self.arity)?;
        w.write_u16::<LittleEndian>(self.max_slots)?;

        w.write_u32::<LittleEndian>(self.constants.len() as u32)?;
        for c in &self.constants {
            match c {
                Constant::Int(n) => {
                    w.write_u8(SER_TAG_INT)?;
                    w.write_i64::<LittleEndian>(*n)?;
                }
                Constant::Str(idx) => {
                    w.write_u8(SER_TAG_STRING)?;
                    w.write_u32::<LittleEndian>(*idx)?;
                }
                Constant::Bool(true) => w.write_u8(SER_TAG_TRUE)?,
                Constant::Bool(false) => w.write_u8(SER_TAG_FALSE)?,
                Constant::Function(idx) => {
                    w.write_u8(SER_TAG_FUNCTION)?;
                    w.write_u32::<LittleEndian>(*idx)?;
                }
                Constant::Nil => w.write_u8(SER_TAG_NIL)?,
            }
        }

        w.write_u32::<LittleEndian>(self.code.len() as u32)?;
        for word in &self.code {
            w.write_u32::<LittleEndian>(*word)?;
        }
        Ok(())
    }
}

/// A decoded unit, independent of any heap.
///
/// Strings and prototypes are addressed by index. Binding turns those into
/// heap handles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Executable {
    pub strings: Vec<String>,
    pub prototypes: Vec<Prototype>,
    pub main: Prototype,
}

impl Executable {
    /// A unit with no strings and no nested prototypes.
    pub fn from_main(main: Prototype) -> Self {
        Self {
            strings: Vec::new(),
            prototypes: Vec::new(),
            main,
        }
    }

    /// Total instruction count across every prototype.
    pub fn instruction_count(&self) -> usize {
        self.main.code.len() + self.prototypes.iter().map(|p| p.code.len()).sum::<usize>()
    }

    pub fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(MAGIC)?;

        w.write_u32::<LittleEndian>(self.strings.len() as u32)?;
        for s in &self.strings {
            w.write_u32::<LittleEndian>(s.len() as u32)?;
            w.write_all(s.as_bytes())?;
        }

        w.write_u32::<LittleEndian>(self.prototypes.len() as u32)?;
        for proto in &self.prototypes {
            proto.encode(w)?;
        }

        self.main.encode(w)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        // Writing into a Vec cannot fail.
        let _ = self.encode(&mut bytes);
        bytes
    }
}
