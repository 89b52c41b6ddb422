use std::io::{Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::LoaderError;
use crate::executable::*;

pub const MAX_STRING_COUNT: u32 = 1_000_000;
pub const MAX_STRING_LEN: u32 = 4096;
pub const MAX_PROTOTYPES: u32 = 65_535;
pub const MAX_CONSTANTS: u32 = 65_536;
pub const MAX_CODE_LEN: u32 = 1_000_000;

/// Decode a `.qbc` unit.
///
/// # Security
/// Every count is checked before allocating, against "Allocation Bomb"
/// inputs. Bytes after the main prototype are rejected.
pub fn load_executable<R: Read>(reader: &mut R) -> Result<Executable, LoaderError> {
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return Err(LoaderError::Format(
            "Invalid binary magic or version".to_string(),
        ));
    }

    // --- String Table ---
    let str_count = reader.read_u32::<LittleEndian>()?;
    if str_count > MAX_STRING_COUNT {
        return Err(LoaderError::Security(format!(
            "String count too large: {}",
            str_count
        )));
    }
    let mut strings = Vec::with_capacity(str_count.min(1024) as usize);
    for _ in 0..str_count {
        strings.push(read_string(reader, "String")?);
    }

    // --- Prototypes (Function Table) ---
    let proto_count = reader.read_u32::<LittleEndian>()?;
    if proto_count > MAX_PROTOTYPES {
        return Err(LoaderError::Security(format!(
            "Prototype count too large: {}",
            proto_count
        )));
    }
    let mut prototypes = Vec::with_capacity(proto_count.min(1024) as usize);
    for _ in 0..proto_count {
        prototypes.push(read_prototype(reader)?);
    }

    let main = read_prototype(reader)?;

    let mut trailing = [0u8; 1];
    if reader.read(&mut trailing)? != 0 {
        return Err(LoaderError::Format(
            "Trailing bytes after main prototype".to_string(),
        ));
    }

    Ok(Executable {
        strings,
        prototypes,
        main,
    })
}

fn read_string<R: Read>(reader: &mut R, what: &str) -> Result<String, LoaderError> {
    let len = reader.read_u32::<LittleEndian>()?;

    // SECURITY: Allocation Bomb Protection
    if len > MAX_STRING_LEN {
        return Err(LoaderError::Security(format!(
            "{} length exceeds limit of {}: {}",
            what, MAX_STRING_LEN, len
        )));
    }

    let mut bytes = vec![0u8; len as usize];
    reader.read_exact(&mut bytes)?;
    String::from_utf8(bytes).map_err(|_| LoaderError::Format(format!("Invalid UTF-8 in {what}")))
}

fn read_prototype<R: Read>(reader: &mut R) -> Result<Prototype, LoaderError> {
    let name = read_string(reader, "Function name")?;
    let arity = reader.read_u8()?;
    let max_slots = reader.read_u16::<LittleEndian>()?;

    let const_count = reader.read_u32::<LittleEndian>()?;
    if const_count > MAX_CONSTANTS {
        return Err(LoaderError::Security(format!(
            "Constant count too large: {}",
            const_count
        )));
    }
    let mut constants = Vec::with_capacity(const_count.min(1024) as usize);
    for _ in 0..const_count {
        let tag = reader.read_u8()?;
        let constant = match tag {
            SER_TAG_INT => Constant::Int(reader.read_i64::<LittleEndian>()?),
            SER_TAG_STRING => Constant::Str(reader.read_u32::<LittleEndian>()?),
            SER_TAG_TRUE => Constant::Bool(true),
            SER_TAG_FALSE => Constant::Bool(false),
            SER_TAG_FUNCTION => Constant::Function(reader.read_u32::<LittleEndian>()?),
            SER_TAG_NIL => Constant::Nil,
            _ => {
                return Err(LoaderError::Format(format!(
                    "Unknown constant tag: {}",
                    tag
                )))
            }
        };
        constants.push(constant);
    }

    let code_len = reader.read_u32::<LittleEndian>()?;
    if code_len > MAX_CODE_LEN {
        return Err(LoaderError::Security(format!(
            "Bytecode length too large: {}",
            code_len
        )));
    }
    let mut code = Vec::with_capacity(code_len.min(4096) as usize);
    for _ in 0..code_len {
        code.push(reader.read_u32::<LittleEndian>()?);
    }

    Ok(Prototype {
        name,
        arity,
        max_slots,
        constants,
        code,
    })
}

/// Decode a unit held in memory.
pub fn load_from_bytes(bytes: &[u8]) -> Result<Executable, LoaderError> {
    load_executable(&mut Cursor::new(bytes))
}
