use num_enum::{IntoPrimitive, TryFromPrimitive};
use strum::Display;

/// Wire-level typecode, one byte, as laid out by AMQP 1.0 section 1.6.
///
/// Several logical [`crate::atom::Tag`]s have more than one `TypeCode`
/// (a zero-value elision, a narrow form, a wide form); the decoder accepts
/// all of them, the encoder picks the narrowest one that fits (see
/// `codec::encoder::choose_code`).
#[allow(non_camel_case_types)]
#[derive(
    Debug, Eq, PartialEq, TryFromPrimitive, IntoPrimitive, Copy, Clone, Display,
)]
#[repr(u8)]
pub enum TypeCode {
    DESCRIPTOR = 0x00,

    NULL = 0x40,
    TRUE = 0x41,
    FALSE = 0x42,
    UINT0 = 0x43,
    ULONG0 = 0x44,
    LIST0 = 0x45,

    UBYTE = 0x50,
    BYTE = 0x51,
    SMALL_UINT = 0x52,
    SMALL_ULONG = 0x53,
    SMALL_INT = 0x54,
    SMALL_LONG = 0x55,
    BOOL = 0x56,

    USHORT = 0x60,
    SHORT = 0x61,

    UINT = 0x70,
    INT = 0x71,
    FLOAT = 0x72,
    CHAR = 0x73,
    DECIMAL32 = 0x74,

    ULONG = 0x80,
    LONG = 0x81,
    DOUBLE = 0x82,
    TIMESTAMP = 0x83,
    DECIMAL64 = 0x84,

    DECIMAL128 = 0x94,

    UUID = 0x98,

    VBIN8 = 0xA0,
    STR8 = 0xA1,
    SYM8 = 0xA3,

    VBIN32 = 0xB0,
    STR32 = 0xB1,
    SYM32 = 0xB3,

    LIST8 = 0xC0,
    MAP8 = 0xC1,

    LIST32 = 0xD0,
    MAP32 = 0xD1,

    ARRAY8 = 0xE0,
    ARRAY32 = 0xF0,
}

impl TypeCode {
    /// True for codes whose payload carries no size/count prefix at all
    /// (the zero-value elisions and the booleans).
    pub fn is_fixed_zero_width(self) -> bool {
        matches!(
            self,
            TypeCode::NULL
                | TypeCode::TRUE
                | TypeCode::FALSE
                | TypeCode::UINT0
                | TypeCode::ULONG0
                | TypeCode::LIST0
        )
    }

    /// True for the four composite wide-form codes (list/map/array, short and long).
    pub fn is_composite(self) -> bool {
        matches!(
            self,
            TypeCode::LIST8
                | TypeCode::MAP8
                | TypeCode::LIST32
                | TypeCode::MAP32
                | TypeCode::ARRAY8
                | TypeCode::ARRAY32
        )
    }

    /// True for the "short form" (1-byte size/count) composite and variable-length codes.
    pub fn is_short_form(self) -> bool {
        matches!(
            self,
            TypeCode::VBIN8
                | TypeCode::STR8
                | TypeCode::SYM8
                | TypeCode::LIST8
                | TypeCode::MAP8
                | TypeCode::ARRAY8
        )
    }
}
