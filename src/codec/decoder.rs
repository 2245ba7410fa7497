//! AMQP wire bytes → tree.
//!
//! Mirrors the encoder's typecode table in reverse: read one byte, dispatch
//! on it, and for composites recurse into `enter`/`exit` the same way
//! `tree::builder::PutBuilder` does by hand. Every composite's declared
//! size is checked against what was actually consumed (`verify_consumed`) so
//! a truncated or padded body is rejected rather than silently accepted.

use crate::atom::{Atom, Tag};
use crate::cursor::ByteCursor;
use crate::error::{AmqpError, Result};
use crate::tree::node::NodeId;
use crate::tree::Tree;
use crate::typecode::TypeCode;
use uuid::Uuid;

/// Decodes exactly one top-level value from `cur` into `tree`, returning the
/// id of the node it created.
pub fn decode_one(tree: &mut Tree, cur: &mut ByteCursor) -> Result<NodeId> {
    decode_node(tree, cur)?;
    Ok(tree.current())
}

/// Decodes every value remaining in `cur` as a sequence of top-level items.
pub fn decode_all(tree: &mut Tree, cur: &mut ByteCursor) -> Result<()> {
    while !cur.is_empty() {
        decode_node(tree, cur)?;
    }
    Ok(())
}

fn read_typecode(cur: &mut ByteCursor) -> Result<TypeCode> {
    let byte = cur.read_u8()?;
    TypeCode::try_from(byte)
        .map_err(|_| AmqpError::arg_err(format!("unknown typecode 0x{byte:02X}")))
}

fn decode_node(tree: &mut Tree, cur: &mut ByteCursor) -> Result<()> {
    let offset = cur.position();
    let code = read_typecode(cur)?;
    match code {
        TypeCode::DESCRIPTOR => {
            tree.put_described()?;
            tree.enter()?;
            decode_node(tree, cur)?;
            decode_node(tree, cur)?;
            tree.exit()?;
        }
        TypeCode::NULL => {
            tree.put_null()?;
        }
        TypeCode::TRUE => {
            tree.put_bool(true)?;
        }
        TypeCode::FALSE => {
            tree.put_bool(false)?;
        }
        TypeCode::UINT0 => {
            tree.put_uint(0)?;
        }
        TypeCode::ULONG0 => {
            tree.put_ulong(0)?;
        }
        TypeCode::LIST0 => {
            tree.put_list()?;
        }
        TypeCode::UBYTE => {
            let v = cur.read_u8()?;
            tree.put_ubyte(v)?;
        }
        TypeCode::BYTE => {
            let v = cur.read_i8()?;
            tree.put_byte(v)?;
        }
        TypeCode::SMALL_UINT => {
            let v = cur.read_u8()?;
            tree.put_uint(v as u32)?;
        }
        TypeCode::SMALL_ULONG => {
            let v = cur.read_u8()?;
            tree.put_ulong(v as u64)?;
        }
        TypeCode::SMALL_INT => {
            let v = cur.read_i8()?;
            tree.put_int(v as i32)?;
        }
        TypeCode::SMALL_LONG => {
            let v = cur.read_i8()?;
            tree.put_long(v as i64)?;
        }
        TypeCode::BOOL => {
            let v = cur.read_u8()?;
            tree.put_bool(v != 0)?;
        }
        TypeCode::USHORT => {
            let v = cur.read_u16()?;
            tree.put_ushort(v)?;
        }
        TypeCode::SHORT => {
            let v = cur.read_i16()?;
            tree.put_short(v)?;
        }
        TypeCode::UINT => {
            let v = cur.read_u32()?;
            tree.put_uint(v)?;
        }
        TypeCode::INT => {
            let v = cur.read_i32()?;
            tree.put_int(v)?;
        }
        TypeCode::FLOAT => {
            let v = cur.read_f32()?;
            tree.put_float(v)?;
        }
        TypeCode::CHAR => {
            let v = cur.read_u32()?;
            let c = char::from_u32(v)
                .ok_or_else(|| AmqpError::arg_err(format!("0x{v:08X} is not a valid char")))?;
            tree.put_char(c)?;
        }
        TypeCode::DECIMAL32 => {
            let bytes = cur.read_slice(4)?;
            let mut bits = [0u8; 4];
            bits.copy_from_slice(bytes);
            tree.put_decimal32(bits)?;
        }
        TypeCode::ULONG => {
            let v = cur.read_u64()?;
            tree.put_ulong(v)?;
        }
        TypeCode::LONG => {
            let v = cur.read_i64()?;
            tree.put_long(v)?;
        }
        TypeCode::DOUBLE => {
            let v = cur.read_f64()?;
            tree.put_double(v)?;
        }
        TypeCode::TIMESTAMP => {
            let v = cur.read_i64()?;
            tree.put_timestamp(v)?;
        }
        TypeCode::DECIMAL64 => {
            let bytes = cur.read_slice(8)?;
            let mut bits = [0u8; 8];
            bits.copy_from_slice(bytes);
            tree.put_decimal64(bits)?;
        }
        TypeCode::DECIMAL128 => {
            let bits = cur.read_block16()?;
            tree.put_decimal128(bits)?;
        }
        TypeCode::UUID => {
            let bits = cur.read_block16()?;
            tree.put_uuid(Uuid::from_bytes(bits))?;
        }
        TypeCode::VBIN8 => {
            let n = cur.read_u8()? as usize;
            let bytes = cur.read_slice(n)?;
            tree.put_binary(bytes)?;
        }
        TypeCode::VBIN32 => {
            let n = cur.read_u32()? as usize;
            let bytes = cur.read_slice(n)?;
            tree.put_binary(bytes)?;
        }
        TypeCode::STR8 => {
            let n = cur.read_u8()? as usize;
            let text = utf8(cur.read_slice(n)?)?;
            tree.put_string(text)?;
        }
        TypeCode::STR32 => {
            let n = cur.read_u32()? as usize;
            let text = utf8(cur.read_slice(n)?)?;
            tree.put_string(text)?;
        }
        TypeCode::SYM8 => {
            let n = cur.read_u8()? as usize;
            let text = utf8(cur.read_slice(n)?)?;
            tree.put_symbol(text)?;
        }
        TypeCode::SYM32 => {
            let n = cur.read_u32()? as usize;
            let text = utf8(cur.read_slice(n)?)?;
            tree.put_symbol(text)?;
        }
        TypeCode::LIST8 => decode_list(tree, cur, true)?,
        TypeCode::LIST32 => decode_list(tree, cur, false)?,
        TypeCode::MAP8 => decode_map(tree, cur, true)?,
        TypeCode::MAP32 => decode_map(tree, cur, false)?,
        TypeCode::ARRAY8 => decode_array(tree, cur, true)?,
        TypeCode::ARRAY32 => decode_array(tree, cur, false)?,
    }
    log::trace!(
        "decoded {:?} from wire code {code} at offset {offset}",
        tree.tag(tree.current())
    );
    Ok(())
}

fn utf8(bytes: &[u8]) -> Result<&str> {
    core::str::from_utf8(bytes).map_err(|e| AmqpError::arg_err(format!("invalid utf-8: {e}")))
}

/// Reads the size and count fields (1 byte each for `short`, 4 otherwise)
/// and returns them along with the cursor position the size field counts
/// from, so the caller can check its declared length against reality.
fn read_framing(cur: &mut ByteCursor, short: bool) -> Result<(u32, u32, usize)> {
    let size = if short {
        cur.read_u8()? as u32
    } else {
        cur.read_u32()?
    };
    let count = if short {
        cur.read_u8()? as u32
    } else {
        cur.read_u32()?
    };
    let start = cur.position();
    Ok((size, count, start))
}

fn verify_consumed(cur: &ByteCursor, start: usize, size: u32) -> Result<()> {
    let consumed = (cur.position() - start) as u32;
    if consumed != size {
        return Err(AmqpError::arg_err(format!(
            "composite declared size {size} byte(s) but {consumed} were decoded"
        )));
    }
    Ok(())
}

fn decode_list(tree: &mut Tree, cur: &mut ByteCursor, short: bool) -> Result<()> {
    let (size, count, start) = read_framing(cur, short)?;
    tree.put_list()?;
    tree.enter()?;
    for _ in 0..count {
        decode_node(tree, cur)?;
    }
    tree.exit()?;
    verify_consumed(cur, start, size)
}

fn decode_map(tree: &mut Tree, cur: &mut ByteCursor, short: bool) -> Result<()> {
    let (size, count, start) = read_framing(cur, short)?;
    if count % 2 != 0 {
        return Err(AmqpError::arg_err("map has an odd number of entries"));
    }
    tree.put_map()?;
    tree.enter()?;
    for _ in 0..count {
        decode_node(tree, cur)?;
    }
    tree.exit()?;
    verify_consumed(cur, start, size)
}

fn decode_array(tree: &mut Tree, cur: &mut ByteCursor, short: bool) -> Result<()> {
    let (size, count, start) = read_framing(cur, short)?;

    // The element type isn't known until after the optional descriptor, so
    // the array node is created with a placeholder and patched below. The
    // descriptor, if any, decodes into the array's first child slot exactly
    // like any other described value's descriptor.
    let described = cur.peek_u8()? == u8::from(TypeCode::DESCRIPTOR);
    let array_id = tree.put_array(described, Tag::Null)?;
    tree.enter()?;
    if described {
        cur.read_u8()?;
        decode_node(tree, cur)?;
    }

    let element_code = read_typecode(cur)?;
    let element_type = element_type_of(element_code)?;
    tree.set_atom(
        array_id,
        Atom::Array {
            element_type,
            described,
        },
    );

    for _ in 0..count {
        decode_element_payload(tree, cur, element_code)?;
    }
    tree.exit()?;
    verify_consumed(cur, start, size)
}

fn element_type_of(code: TypeCode) -> Result<Tag> {
    Ok(match code {
        TypeCode::NULL => Tag::Null,
        TypeCode::BOOL => Tag::Bool,
        TypeCode::UBYTE => Tag::UByte,
        TypeCode::BYTE => Tag::Byte,
        TypeCode::USHORT => Tag::UShort,
        TypeCode::SHORT => Tag::Short,
        TypeCode::UINT => Tag::UInt,
        TypeCode::INT => Tag::Int,
        TypeCode::CHAR => Tag::Char,
        TypeCode::ULONG => Tag::ULong,
        TypeCode::LONG => Tag::Long,
        TypeCode::TIMESTAMP => Tag::Timestamp,
        TypeCode::FLOAT => Tag::Float,
        TypeCode::DOUBLE => Tag::Double,
        TypeCode::DECIMAL32 => Tag::Decimal32,
        TypeCode::DECIMAL64 => Tag::Decimal64,
        TypeCode::DECIMAL128 => Tag::Decimal128,
        TypeCode::UUID => Tag::Uuid,
        TypeCode::VBIN8 | TypeCode::VBIN32 => Tag::Binary,
        TypeCode::STR8 | TypeCode::STR32 => Tag::String,
        TypeCode::SYM8 | TypeCode::SYM32 => Tag::Symbol,
        other => {
            return Err(AmqpError::arg_err(format!(
                "{other} is not a valid array element code"
            )))
        }
    })
}

/// Reads one array element's payload at the width `element_code` implies.
/// The element typecode itself was already consumed once, before the loop.
fn decode_element_payload(tree: &mut Tree, cur: &mut ByteCursor, element_code: TypeCode) -> Result<()> {
    match element_code {
        TypeCode::NULL => {
            tree.put_null()?;
        }
        TypeCode::BOOL => {
            let v = cur.read_u8()?;
            tree.put_bool(v != 0)?;
        }
        TypeCode::UBYTE => {
            let v = cur.read_u8()?;
            tree.put_ubyte(v)?;
        }
        TypeCode::BYTE => {
            let v = cur.read_i8()?;
            tree.put_byte(v)?;
        }
        TypeCode::USHORT => {
            let v = cur.read_u16()?;
            tree.put_ushort(v)?;
        }
        TypeCode::SHORT => {
            let v = cur.read_i16()?;
            tree.put_short(v)?;
        }
        TypeCode::UINT => {
            let v = cur.read_u32()?;
            tree.put_uint(v)?;
        }
        TypeCode::INT => {
            let v = cur.read_i32()?;
            tree.put_int(v)?;
        }
        TypeCode::CHAR => {
            let v = cur.read_u32()?;
            let c = char::from_u32(v)
                .ok_or_else(|| AmqpError::arg_err(format!("0x{v:08X} is not a valid char")))?;
            tree.put_char(c)?;
        }
        TypeCode::ULONG => {
            let v = cur.read_u64()?;
            tree.put_ulong(v)?;
        }
        TypeCode::LONG => {
            let v = cur.read_i64()?;
            tree.put_long(v)?;
        }
        TypeCode::TIMESTAMP => {
            let v = cur.read_i64()?;
            tree.put_timestamp(v)?;
        }
        TypeCode::FLOAT => {
            let v = cur.read_f32()?;
            tree.put_float(v)?;
        }
        TypeCode::DOUBLE => {
            let v = cur.read_f64()?;
            tree.put_double(v)?;
        }
        TypeCode::DECIMAL32 => {
            let bytes = cur.read_slice(4)?;
            let mut bits = [0u8; 4];
            bits.copy_from_slice(bytes);
            tree.put_decimal32(bits)?;
        }
        TypeCode::DECIMAL64 => {
            let bytes = cur.read_slice(8)?;
            let mut bits = [0u8; 8];
            bits.copy_from_slice(bytes);
            tree.put_decimal64(bits)?;
        }
        TypeCode::DECIMAL128 => {
            let bits = cur.read_block16()?;
            tree.put_decimal128(bits)?;
        }
        TypeCode::UUID => {
            let bits = cur.read_block16()?;
            tree.put_uuid(Uuid::from_bytes(bits))?;
        }
        TypeCode::VBIN8 => {
            let n = cur.read_u8()? as usize;
            let bytes = cur.read_slice(n)?;
            tree.put_binary(bytes)?;
        }
        TypeCode::VBIN32 => {
            let n = cur.read_u32()? as usize;
            let bytes = cur.read_slice(n)?;
            tree.put_binary(bytes)?;
        }
        TypeCode::STR8 => {
            let n = cur.read_u8()? as usize;
            let text = utf8(cur.read_slice(n)?)?;
            tree.put_string(text)?;
        }
        TypeCode::STR32 => {
            let n = cur.read_u32()? as usize;
            let text = utf8(cur.read_slice(n)?)?;
            tree.put_string(text)?;
        }
        TypeCode::SYM8 => {
            let n = cur.read_u8()? as usize;
            let text = utf8(cur.read_slice(n)?)?;
            tree.put_symbol(text)?;
        }
        TypeCode::SYM32 => {
            let n = cur.read_u32()? as usize;
            let text = utf8(cur.read_slice(n)?)?;
            tree.put_symbol(text)?;
        }
        other => {
            return Err(AmqpError::arg_err(format!(
                "{other} is not a valid array element code"
            )))
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encoder;
    use crate::tree::Tree;

    #[test]
    fn round_trips_small_uint() {
        let mut src = Tree::new();
        src.put_uint(42).unwrap();
        let id = src.down_of(src.root());
        let bytes = encoder::encode_one(&src, id).unwrap();

        let mut dst = Tree::new();
        let mut cur = ByteCursor::new(&bytes);
        let decoded = decode_one(&mut dst, &mut cur).unwrap();
        assert!(cur.is_empty());
        assert_eq!(*dst.atom(decoded), *src.atom(id));
    }

    #[test]
    fn round_trips_nested_list_and_string() {
        let mut src = Tree::new();
        src.put_list().unwrap();
        src.enter().unwrap();
        src.put_string("hello").unwrap();
        src.put_int(-7).unwrap();
        src.exit().unwrap();
        let id = src.down_of(src.root());
        let bytes = encoder::encode_one(&src, id).unwrap();

        let mut dst = Tree::new();
        let mut cur = ByteCursor::new(&bytes);
        decode_one(&mut dst, &mut cur).unwrap();
        assert!(cur.is_empty());

        let list = dst.down_of(dst.root());
        assert_eq!(dst.tag(list), Tag::List);
        let first = dst.down_of(list);
        if let crate::atom::Atom::String(slice) = *dst.atom(first) {
            assert_eq!(dst.str_of(slice).unwrap(), "hello");
        } else {
            unreachable!("expected a string node");
        }
        let second = dst.next_of(first);
        assert_eq!(dst.tag(second), Tag::Int);
    }

    #[test]
    fn round_trips_typed_array() {
        let mut src = Tree::new();
        src.put_array(false, Tag::UInt).unwrap();
        src.enter().unwrap();
        src.put_uint(1).unwrap();
        src.put_uint(2).unwrap();
        src.put_uint(3).unwrap();
        src.exit().unwrap();
        let id = src.down_of(src.root());
        let bytes = encoder::encode_one(&src, id).unwrap();

        let mut dst = Tree::new();
        let mut cur = ByteCursor::new(&bytes);
        decode_one(&mut dst, &mut cur).unwrap();
        assert!(cur.is_empty());

        let array = dst.down_of(dst.root());
        assert!(matches!(
            *dst.atom(array),
            crate::atom::Atom::Array {
                element_type: Tag::UInt,
                described: false
            }
        ));
        assert_eq!(dst.children_count(array), 3);
    }

    #[test]
    fn round_trips_described_array_with_no_elements() {
        let mut src = Tree::new();
        src.put_array(true, Tag::UInt).unwrap();
        src.enter().unwrap();
        src.put_symbol("urn:x").unwrap();
        src.exit().unwrap();
        let id = src.down_of(src.root());
        let bytes = encoder::encode_one(&src, id).unwrap();

        let mut dst = Tree::new();
        let mut cur = ByteCursor::new(&bytes);
        decode_one(&mut dst, &mut cur).unwrap();
        assert!(cur.is_empty());

        let array = dst.down_of(dst.root());
        assert_eq!(dst.children_count(array), 1);
    }

    #[test]
    fn rejects_unknown_typecode() {
        let bytes = [0x1A];
        let mut tree = Tree::new();
        let mut cur = ByteCursor::new(&bytes);
        assert!(decode_one(&mut tree, &mut cur).is_err());
    }

    #[test]
    fn rejects_truncated_composite_size() {
        // LIST8 claiming a 10-byte body but supplying only 2.
        let bytes = [0xC0, 10, 1, 0x43];
        let mut tree = Tree::new();
        let mut cur = ByteCursor::new(&bytes);
        assert!(decode_one(&mut tree, &mut cur).is_err());
    }
}
