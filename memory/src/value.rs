use std::fmt;

// --- Tagged u64 Constants ---
// Bits 63..60 = tag  (4 bits, 16 possible types)
// Bits 59..0  = payload (60 bits)

const TAG_SHIFT: u32 = 60;
const PAYLOAD_MASK: u64 = (1u64 << 60) - 1; // 0x0FFF_FFFF_FFFF_FFFF

pub const TAG_INT: u64 = 0; // i60 inline (most common -> tag 0 for speed)
pub const TAG_NIL: u64 = 1;
pub const TAG_FALSE: u64 = 2;
pub const TAG_TRUE: u64 = 3;
/// Placeholder held by a global slot that has been allocated but never bound.
pub const TAG_EMPTY: u64 = 4;
pub const TAG_STRING: u64 = 5;
pub const TAG_FUNCTION: u64 = 6;
pub const TAG_NATIVE: u64 = 7;
// 8-15 reserved

// i60 range constants
pub const I60_MIN: i64 = -(1i64 << 59);
pub const I60_MAX: i64 = (1i64 << 59) - 1;

const _: () = assert!(TAG_NATIVE < 16, "tags must fit in 4 bits");

#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct Value(pub u64);

impl Value {
    // --- Constructors ---

    /// Integer constructor. Returns `None` when `val` does not fit in 60 bits.
    #[inline]
    pub fn checked_int(val: i64) -> Option<Self> {
        if (I60_MIN..=I60_MAX).contains(&val) {
            Some(Value::int(val))
        } else {
            None
        }
    }

    /// Wrapping integer constructor: bits above the i60 payload are dropped.
    #[inline]
    pub fn int(val: i64) -> Self {
        Value((TAG_INT << TAG_SHIFT) | ((val as u64) & PAYLOAD_MASK))
    }

    #[inline]
    pub fn nil() -> Self {
        Value(TAG_NIL << TAG_SHIFT)
    }

    #[inline]
    pub fn empty() -> Self {
        Value(TAG_EMPTY << TAG_SHIFT)
    }

    #[inline]
    pub fn bool(b: bool) -> Self {
        if b {
            Value(TAG_TRUE << TAG_SHIFT)
        } else {
            Value(TAG_FALSE << TAG_SHIFT)
        }
    }

    #[inline]
    pub fn string(handle: u32) -> Self {
        Value::make_obj(TAG_STRING, handle)
    }

    #[inline]
    pub fn function(handle: u32) -> Self {
        Value::make_obj(TAG_FUNCTION, handle)
    }

    #[inline]
    pub fn native(index: u32) -> Self {
        Value::make_obj(TAG_NATIVE, index)
    }

    #[inline]
    fn make_obj(tag: u64, handle: u32) -> Self {
        Value((tag << TAG_SHIFT) | (handle as u64))
    }

    // --- Checkers ---

    #[inline]
    pub fn tag(&self) -> u64 {
        self.0 >> TAG_SHIFT
    }

    #[inline]
    fn has_tag(&self, tag: u64) -> bool {
        self.tag() == tag
    }

    pub fn is_int(&self) -> bool {
        self.has_tag(TAG_INT)
    }

    /// Heap-backed or table-backed: carries a 32-bit handle.
    pub fn is_obj(&self) -> bool {
        matches!(self.tag(), TAG_STRING | TAG_FUNCTION | TAG_NATIVE)
    }

    pub fn is_nil(&self) -> bool {
        self.has_tag(TAG_NIL)
    }

    pub fn is_empty(&self) -> bool {
        self.has_tag(TAG_EMPTY)
    }

    pub fn is_bool(&self) -> bool {
        self.as_bool().is_some()
    }

    pub fn is_string(&self) -> bool {
        self.has_tag(TAG_STRING)
    }

    pub fn is_function(&self) -> bool {
        self.has_tag(TAG_FUNCTION)
    }

    pub fn is_native(&self) -> bool {
        self.has_tag(TAG_NATIVE)
    }

    // --- Accessors ---

    #[inline]
    pub fn as_int(&self) -> Option<i64> {
        // Shift the payload up to bit 63, then arithmetic-shift back down
        self.is_int()
            .then(|| ((self.0 << (64 - TAG_SHIFT)) as i64) >> (64 - TAG_SHIFT))
    }

    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self.tag() {
            TAG_TRUE => Some(true),
            TAG_FALSE => Some(false),
            _ => None,
        }
    }

    #[inline]
    pub fn is_falsey(&self) -> bool {
        matches!(self.tag(), TAG_NIL | TAG_FALSE)
    }

    #[inline]
    pub fn as_handle(&self) -> Option<u32> {
        self.is_obj().then_some(self.0 as u32)
    }

    /// Short type name, as reported by `typeof` and the toplevel echo.
    pub fn type_name(&self) -> &'static str {
        match self.tag() {
            TAG_INT => "int",
            TAG_NIL => "nil",
            TAG_FALSE | TAG_TRUE => "bool",
            TAG_EMPTY => "empty",
            TAG_STRING => "string",
            TAG_FUNCTION => "fn",
            TAG_NATIVE => "primitive",
            _ => "unknown",
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::empty()
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(n) = self.as_int() {
            return write!(f, "Int({n})");
        }
        if let Some(b) = self.as_bool() {
            return write!(f, "Bool({b})");
        }
        match (self.tag(), self.as_handle()) {
            (TAG_NIL, _) => f.write_str("Nil"),
            (TAG_EMPTY, _) => f.write_str("Empty"),
            (TAG_STRING, Some(h)) => write!(f, "String({h})"),
            (TAG_FUNCTION, Some(h)) => write!(f, "Function({h})"),
            (TAG_NATIVE, Some(i)) => write!(f, "NativeFn({i})"),
            _ => write!(f, "Unknown({:#x})", self.0),
        }
    }
}
