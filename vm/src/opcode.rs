//! Quill instruction set.
//!
//! Every instruction is one `u32`, opcode in the top byte:
//!
//! ```text
//! ABC: [op:8][A:8][B:8][C:8]
//! ABx: [op:8][A:8][Bx:16]
//! ```
//!
//! The numbering is part of the `.qbc` format. Append new opcodes, never
//! renumber.

use std::fmt;

/// Which operands an instruction reads as registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// `A` is a register; nothing else.
    A,
    /// `A` and `B` are registers.
    AB,
    /// `A`, `B` and `C` are registers.
    ABC,
    /// `A` is a register and `Bx` a 16-bit index or target.
    ABx,
    /// `Bx` only (unconditional jump).
    Bx,
}

macro_rules! define_opcodes {
    ($($name:ident = $byte:literal, $mnemonic:literal, $shape:ident;)*) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum OpCode {
            $($name = $byte,)*
        }

        impl OpCode {
            pub const ALL: &'static [OpCode] = &[$(OpCode::$name,)*];

            pub fn from_u8(byte: u8) -> Option<Self> {
                match byte {
                    $($byte => Some(OpCode::$name),)*
                    _ => None,
                }
            }

            pub fn name(self) -> &'static str {
                match self {
                    $(OpCode::$name => $mnemonic,)*
                }
            }

            pub fn shape(self) -> Shape {
                match self {
                    $(OpCode::$name => Shape::$shape,)*
                }
            }
        }
    };
}

define_opcodes! {
    // R[A] = K[Bx]
    LoadConst   = 0,  "LOAD_CONST",    ABx;
    LoadTrue    = 1,  "LOAD_TRUE",     A;
    LoadFalse   = 2,  "LOAD_FALSE",    A;
    LoadNil     = 3,  "LOAD_NIL",      A;
    Move        = 4,  "MOVE",          AB;

    // Ints, plus string concatenation for Add
    Add         = 5,  "ADD",           ABC;
    Sub         = 6,  "SUB",           ABC;
    Mul         = 7,  "MUL",           ABC;
    Div         = 8,  "DIV",           ABC;
    Mod         = 9,  "MOD",           ABC;
    Neg         = 10, "NEG",           AB;

    Eq          = 11, "EQ",            ABC;
    NotEq       = 12, "NOT_EQ",        ABC;
    Lt          = 13, "LT",            ABC;
    Le          = 14, "LE",            ABC;
    Gt          = 15, "GT",            ABC;
    Ge          = 16, "GE",            ABC;
    LogNot      = 17, "LOG_NOT",       AB;

    // Bx is an absolute instruction index
    Jump        = 18, "JUMP",          Bx;
    JumpIfFalse = 19, "JUMP_IF_FALSE", ABx;
    JumpIfTrue  = 20, "JUMP_IF_TRUE",  ABx;

    // Bx is a global slot
    GetGlobal   = 21, "GET_GLOBAL",    ABx;
    SetGlobal   = 22, "SET_GLOBAL",    ABx;
    DefGlobal   = 23, "DEF_GLOBAL",    ABx;
    // Bx is a primitive index
    GetPrim     = 24, "GET_PRIM",      ABx;

    // R[A] = R[B](R[B+1] .. R[B+C])
    Call        = 25, "CALL",          AB;
    Return      = 26, "RETURN",        A;
}

impl OpCode {
    #[inline]
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn is_abx(self) -> bool {
        matches!(self.shape(), Shape::ABx | Shape::Bx)
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Packing and unpacking of instruction words.
pub mod instruction {
    #[inline]
    pub fn encode_abc(opcode: u8, a: u8, b: u8, c: u8) -> u32 {
        u32::from_be_bytes([opcode, a, b, c])
    }

    #[inline]
    pub fn encode_abx(opcode: u8, a: u8, bx: u16) -> u32 {
        let [hi, lo] = bx.to_be_bytes();
        u32::from_be_bytes([opcode, a, hi, lo])
    }

    #[inline]
    pub fn decode_opcode(word: u32) -> u8 {
        word.to_be_bytes()[0]
    }

    #[inline]
    pub fn decode_a(word: u32) -> u8 {
        word.to_be_bytes()[1]
    }

    #[inline]
    pub fn decode_b(word: u32) -> u8 {
        word.to_be_bytes()[2]
    }

    #[inline]
    pub fn decode_c(word: u32) -> u8 {
        word.to_be_bytes()[3]
    }

    #[inline]
    pub fn decode_bx(word: u32) -> u16 {
        word as u16
    }
}

#[cfg(test)]
mod tests {
    use super::instruction::*;
    use super::*;

    #[test]
    fn numbering_is_dense_and_round_trips() {
        for (i, &op) in OpCode::ALL.iter().enumerate() {
            assert_eq!(op.as_u8() as usize, i);
            assert_eq!(OpCode::from_u8(op.as_u8()), Some(op));
        }
        assert_eq!(OpCode::from_u8(OpCode::ALL.len() as u8), None);
        assert_eq!(OpCode::from_u8(0xFF), None);
    }

    #[test]
    fn mnemonics() {
        assert_eq!(OpCode::JumpIfFalse.to_string(), "JUMP_IF_FALSE");
        assert_eq!(OpCode::GetPrim.name(), "GET_PRIM");
    }

    #[test]
    fn abc_layout() {
        let word = encode_abc(OpCode::Add.as_u8(), 1, 2, 3);
        assert_eq!(word, 0x0501_0203);
        assert_eq!(decode_opcode(word), OpCode::Add.as_u8());
        assert_eq!((decode_a(word), decode_b(word), decode_c(word)), (1, 2, 3));
    }

    #[test]
    fn abx_layout() {
        let word = encode_abx(OpCode::GetGlobal.as_u8(), 5, 1000);
        assert_eq!(decode_opcode(word), OpCode::GetGlobal.as_u8());
        assert_eq!(decode_a(word), 5);
        assert_eq!(decode_bx(word), 1000);
        assert!(OpCode::GetGlobal.is_abx());
        assert!(!OpCode::Call.is_abx());
    }
}
