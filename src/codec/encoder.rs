//! Tree → AMQP wire bytes.
//!
//! Traverses the tree in pre-order (`encode_node`), picking the narrowest
//! wire code for each scalar per §4.2's table and always preferring the
//! short composite form when the body and count both fit in a byte — see
//! `compose_framing`. Arrays share one element typecode across all data
//! elements; that width decision is made up front by scanning the
//! already-built children (`array_element_code`), not backpatched.

use crate::atom::{Atom, Slice, Tag};
use crate::cursor::ByteWriter;
use crate::error::{AmqpError, Result};
use crate::tree::node::NodeId;
use crate::tree::Tree;
use crate::typecode::TypeCode;

/// Encodes the single logical value rooted at `id`.
pub fn encode_one(tree: &Tree, id: NodeId) -> Result<Vec<u8>> {
    let mut w = ByteWriter::new();
    encode_node(tree, id, &mut w)?;
    Ok(w.into_bytes())
}

/// Encodes every top-level value in the tree, in order.
pub fn encode_all(tree: &Tree) -> Result<Vec<u8>> {
    let mut w = ByteWriter::new();
    let mut child = tree.down_of(tree.root());
    while child.is_some() {
        encode_node(tree, child, &mut w)?;
        child = tree.next_of(child);
    }
    Ok(w.into_bytes())
}

fn encode_node(tree: &Tree, id: NodeId, out: &mut ByteWriter) -> Result<()> {
    let tag = tree.tag(id);
    let offset = out.len();
    match *tree.atom(id) {
        Atom::Described => encode_described(tree, id, out)?,
        Atom::List => encode_list(tree, id, out)?,
        Atom::Map => encode_map(tree, id, out)?,
        Atom::Array {
            element_type,
            described,
        } => encode_array(tree, id, element_type, described, out)?,
        ref scalar => {
            let code = choose_scalar_code(scalar)?;
            out.write_u8(code.into());
            write_scalar_payload(tree, code, scalar, out)?;
            log::trace!("encoded {tag:?} as wire code {code} at offset {offset}");
            return Ok(());
        }
    }
    log::trace!(
        "encoded {tag:?} composite at offset {offset}, framing written over {} byte(s)",
        out.len() - offset
    );
    Ok(())
}

fn encode_described(tree: &Tree, id: NodeId, out: &mut ByteWriter) -> Result<()> {
    if tree.children_count(id) != 2 {
        return Err(AmqpError::err(
            "described node must have exactly two children",
        ));
    }
    out.write_u8(TypeCode::DESCRIPTOR.into());
    let descriptor = tree.down_of(id);
    let value = tree.next_of(descriptor);
    encode_node(tree, descriptor, out)?;
    encode_node(tree, value, out)
}

fn encode_list(tree: &Tree, id: NodeId, out: &mut ByteWriter) -> Result<()> {
    let count = tree.children_count(id);
    if count == 0 {
        out.write_u8(TypeCode::LIST0.into());
        return Ok(());
    }
    let mut body = ByteWriter::new();
    let mut child = tree.down_of(id);
    while child.is_some() {
        encode_node(tree, child, &mut body)?;
        child = tree.next_of(child);
    }
    write_composite_framing(TypeCode::LIST8, TypeCode::LIST32, count, body, out);
    Ok(())
}

fn encode_map(tree: &Tree, id: NodeId, out: &mut ByteWriter) -> Result<()> {
    let count = tree.children_count(id);
    if count % 2 != 0 {
        return Err(AmqpError::err("map must have an even number of children"));
    }
    let mut body = ByteWriter::new();
    let mut child = tree.down_of(id);
    while child.is_some() {
        encode_node(tree, child, &mut body)?;
        child = tree.next_of(child);
    }
    write_composite_framing(TypeCode::MAP8, TypeCode::MAP32, count, body, out);
    Ok(())
}

fn encode_array(
    tree: &Tree,
    id: NodeId,
    element_type: Tag,
    described: bool,
    out: &mut ByteWriter,
) -> Result<()> {
    let mut body = ByteWriter::new();
    let mut child = tree.down_of(id);

    if described {
        let descriptor = child;
        if descriptor.is_none() {
            return Err(AmqpError::err("described array is missing its descriptor"));
        }
        // The 0x00 marker is what lets the decoder tell "this first byte is
        // a descriptor" apart from "this first byte is the shared element
        // code" — both would otherwise just be a typecode byte.
        body.write_u8(TypeCode::DESCRIPTOR.into());
        encode_node(tree, descriptor, &mut body)?;
        child = tree.next_of(descriptor);
    }

    let data_start = child;
    let element_code = array_element_code(tree, element_type, data_start)?;
    body.write_u8(element_code.into());

    let mut count = 0u32;
    let mut cursor = data_start;
    while cursor.is_some() {
        write_array_element_payload(tree, cursor, element_code, &mut body)?;
        count += 1;
        cursor = tree.next_of(cursor);
    }

    write_composite_framing(TypeCode::ARRAY8, TypeCode::ARRAY32, count, body, out);
    Ok(())
}

/// Picks the one wire code every data element of the array will share.
/// Fixed-width tags have exactly one canonical (always-wide) code; for the
/// variable-length tags, scans the already-built elements to see whether
/// the short (1-byte length) form fits all of them.
fn array_element_code(tree: &Tree, element_type: Tag, first_data: NodeId) -> Result<TypeCode> {
    Ok(match element_type {
        Tag::Null => TypeCode::NULL,
        Tag::Bool => TypeCode::BOOL,
        Tag::UByte => TypeCode::UBYTE,
        Tag::Byte => TypeCode::BYTE,
        Tag::UShort => TypeCode::USHORT,
        Tag::Short => TypeCode::SHORT,
        Tag::UInt => TypeCode::UINT,
        Tag::Int => TypeCode::INT,
        Tag::Char => TypeCode::CHAR,
        Tag::ULong => TypeCode::ULONG,
        Tag::Long => TypeCode::LONG,
        Tag::Timestamp => TypeCode::TIMESTAMP,
        Tag::Float => TypeCode::FLOAT,
        Tag::Double => TypeCode::DOUBLE,
        Tag::Decimal32 => TypeCode::DECIMAL32,
        Tag::Decimal64 => TypeCode::DECIMAL64,
        Tag::Decimal128 => TypeCode::DECIMAL128,
        Tag::Uuid => TypeCode::UUID,
        Tag::Binary => variable_length_code(
            tree,
            first_data,
            TypeCode::VBIN8,
            TypeCode::VBIN32,
            |a| matches!(a, Atom::Binary(_)),
        )?,
        Tag::String => variable_length_code(
            tree,
            first_data,
            TypeCode::STR8,
            TypeCode::STR32,
            |a| matches!(a, Atom::String(_)),
        )?,
        Tag::Symbol => variable_length_code(
            tree,
            first_data,
            TypeCode::SYM8,
            TypeCode::SYM32,
            |a| matches!(a, Atom::Symbol(_)),
        )?,
        Tag::List | Tag::Map | Tag::Array | Tag::Described => {
            return Err(AmqpError::arg_err(
                "nested composite array element types are not supported",
            ))
        }
    })
}

fn variable_length_code(
    tree: &Tree,
    first_data: NodeId,
    short: TypeCode,
    long: TypeCode,
    expect: impl Fn(&Atom) -> bool,
) -> Result<TypeCode> {
    let mut child = first_data;
    let mut all_short = true;
    while child.is_some() {
        let atom = tree.atom(child);
        if !expect(atom) {
            return Err(AmqpError::arg_err("array element does not match declared element type"));
        }
        if slice_of(atom).len > 255 {
            all_short = false;
        }
        child = tree.next_of(child);
    }
    Ok(if all_short { short } else { long })
}

fn slice_of(atom: &Atom) -> Slice {
    match atom {
        Atom::Binary(s) | Atom::String(s) | Atom::Symbol(s) => *s,
        _ => Slice::EMPTY,
    }
}

fn write_composite_framing(
    short: TypeCode,
    long: TypeCode,
    count: u32,
    body: ByteWriter,
    out: &mut ByteWriter,
) {
    let body_len = body.len();
    if count <= 255 && body_len <= 255 {
        out.write_u8(short.into());
        out.write_u8(body_len as u8);
        out.write_u8(count as u8);
    } else {
        out.write_u8(long.into());
        out.write_u32(body_len as u32);
        out.write_u32(count);
    }
    out.write_bytes(&body.into_bytes());
}

/// Per-element payload writer used inside arrays: the typecode has
/// already been written once for the whole array, so only the payload
/// goes out here, at the width `element_code` implies.
fn write_array_element_payload(
    tree: &Tree,
    id: NodeId,
    element_code: TypeCode,
    out: &mut ByteWriter,
) -> Result<()> {
    write_scalar_payload(tree, element_code, tree.atom(id), out)
}

fn choose_scalar_code(atom: &Atom) -> Result<TypeCode> {
    Ok(match *atom {
        Atom::Null => TypeCode::NULL,
        Atom::Bool(true) => TypeCode::TRUE,
        Atom::Bool(false) => TypeCode::FALSE,
        Atom::UByte(_) => TypeCode::UBYTE,
        Atom::Byte(_) => TypeCode::BYTE,
        Atom::UShort(_) => TypeCode::USHORT,
        Atom::Short(_) => TypeCode::SHORT,
        Atom::UInt(0) => TypeCode::UINT0,
        Atom::UInt(v) if v <= 0xFF => TypeCode::SMALL_UINT,
        Atom::UInt(_) => TypeCode::UINT,
        Atom::Int(v) if (-128..=127).contains(&v) => TypeCode::SMALL_INT,
        Atom::Int(_) => TypeCode::INT,
        Atom::Char(_) => TypeCode::CHAR,
        Atom::ULong(0) => TypeCode::ULONG0,
        Atom::ULong(v) if v <= 0xFF => TypeCode::SMALL_ULONG,
        Atom::ULong(_) => TypeCode::ULONG,
        Atom::Long(v) if (-128..=127).contains(&v) => TypeCode::SMALL_LONG,
        Atom::Long(_) => TypeCode::LONG,
        Atom::Timestamp(_) => TypeCode::TIMESTAMP,
        Atom::Float(_) => TypeCode::FLOAT,
        Atom::Double(_) => TypeCode::DOUBLE,
        Atom::Decimal32(_) => TypeCode::DECIMAL32,
        Atom::Decimal64(_) => TypeCode::DECIMAL64,
        Atom::Decimal128(_) => TypeCode::DECIMAL128,
        Atom::Uuid(_) => TypeCode::UUID,
        Atom::Binary(s) if s.len <= 255 => TypeCode::VBIN8,
        Atom::Binary(_) => TypeCode::VBIN32,
        Atom::String(s) if s.len <= 255 => TypeCode::STR8,
        Atom::String(_) => TypeCode::STR32,
        Atom::Symbol(s) if s.len <= 255 => TypeCode::SYM8,
        Atom::Symbol(_) => TypeCode::SYM32,
        Atom::Described | Atom::Array { .. } | Atom::List | Atom::Map => {
            return Err(AmqpError::arg_err("not a scalar atom"))
        }
    })
}

fn write_scalar_payload(
    tree: &Tree,
    code: TypeCode,
    atom: &Atom,
    out: &mut ByteWriter,
) -> Result<()> {
    match code {
        TypeCode::NULL | TypeCode::TRUE | TypeCode::FALSE | TypeCode::UINT0 | TypeCode::ULONG0 => {
            // zero-width payloads: the code alone carries the value
        }
        TypeCode::BOOL => {
            let Atom::Bool(v) = atom else { return type_mismatch(code) };
            out.write_u8(if *v { 1 } else { 0 });
        }
        TypeCode::UBYTE => {
            let Atom::UByte(v) = atom else { return type_mismatch(code) };
            out.write_u8(*v);
        }
        TypeCode::BYTE => {
            let Atom::Byte(v) = atom else { return type_mismatch(code) };
            out.write_i8(*v);
        }
        TypeCode::SMALL_UINT => {
            let Atom::UInt(v) = atom else { return type_mismatch(code) };
            out.write_u8(*v as u8);
        }
        TypeCode::USHORT => {
            let Atom::UShort(v) = atom else { return type_mismatch(code) };
            out.write_u16(*v);
        }
        TypeCode::SHORT => {
            let Atom::Short(v) = atom else { return type_mismatch(code) };
            out.write_i16(*v);
        }
        TypeCode::UINT => {
            let Atom::UInt(v) = atom else { return type_mismatch(code) };
            out.write_u32(*v);
        }
        TypeCode::SMALL_INT => {
            let Atom::Int(v) = atom else { return type_mismatch(code) };
            out.write_i8(*v as i8);
        }
        TypeCode::INT => {
            let Atom::Int(v) = atom else { return type_mismatch(code) };
            out.write_i32(*v);
        }
        TypeCode::CHAR => {
            let Atom::Char(v) = atom else { return type_mismatch(code) };
            out.write_u32(*v as u32);
        }
        TypeCode::SMALL_ULONG => {
            let Atom::ULong(v) = atom else { return type_mismatch(code) };
            out.write_u8(*v as u8);
        }
        TypeCode::ULONG => {
            let Atom::ULong(v) = atom else { return type_mismatch(code) };
            out.write_u64(*v);
        }
        TypeCode::SMALL_LONG => {
            let Atom::Long(v) = atom else { return type_mismatch(code) };
            out.write_i8(*v as i8);
        }
        TypeCode::LONG => {
            let Atom::Long(v) = atom else { return type_mismatch(code) };
            out.write_i64(*v);
        }
        TypeCode::TIMESTAMP => {
            let Atom::Timestamp(v) = atom else { return type_mismatch(code) };
            out.write_i64(*v);
        }
        TypeCode::FLOAT => {
            let Atom::Float(v) = atom else { return type_mismatch(code) };
            out.write_f32(*v);
        }
        TypeCode::DOUBLE => {
            let Atom::Double(v) = atom else { return type_mismatch(code) };
            out.write_f64(*v);
        }
        TypeCode::DECIMAL32 => {
            let Atom::Decimal32(v) = atom else { return type_mismatch(code) };
            out.write_bytes(v);
        }
        TypeCode::DECIMAL64 => {
            let Atom::Decimal64(v) = atom else { return type_mismatch(code) };
            out.write_bytes(v);
        }
        TypeCode::DECIMAL128 => {
            let Atom::Decimal128(v) = atom else { return type_mismatch(code) };
            out.write_bytes(v);
        }
        TypeCode::UUID => {
            let Atom::Uuid(v) = atom else { return type_mismatch(code) };
            out.write_bytes(v.as_bytes());
        }
        TypeCode::VBIN8 | TypeCode::VBIN32 => {
            let Atom::Binary(slice) = atom else { return type_mismatch(code) };
            write_length_prefixed(tree, *slice, code == TypeCode::VBIN8, out)?;
        }
        TypeCode::STR8 | TypeCode::STR32 => {
            let Atom::String(slice) = atom else { return type_mismatch(code) };
            write_length_prefixed(tree, *slice, code == TypeCode::STR8, out)?;
        }
        TypeCode::SYM8 | TypeCode::SYM32 => {
            let Atom::Symbol(slice) = atom else { return type_mismatch(code) };
            write_length_prefixed(tree, *slice, code == TypeCode::SYM8, out)?;
        }
        TypeCode::DESCRIPTOR
        | TypeCode::LIST0
        | TypeCode::LIST8
        | TypeCode::LIST32
        | TypeCode::MAP8
        | TypeCode::MAP32
        | TypeCode::ARRAY8
        | TypeCode::ARRAY32 => {
            return Err(AmqpError::arg_err(format!(
                "{code} is not a scalar wire code"
            )))
        }
    }
    Ok(())
}

fn write_length_prefixed(tree: &Tree, slice: Slice, short: bool, out: &mut ByteWriter) -> Result<()> {
    let bytes = tree.bytes_of(slice)?;
    if short {
        out.write_u8(bytes.len() as u8);
    } else {
        out.write_u32(bytes.len() as u32);
    }
    out.write_bytes(bytes);
    Ok(())
}

fn type_mismatch(code: TypeCode) -> Result<()> {
    Err(AmqpError::arg_err(format!(
        "atom does not match selected wire code {code}"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Tree;

    #[test]
    fn empty_list_is_one_byte() {
        let mut t = Tree::new();
        t.put_list().unwrap();
        let id = t.down_of(t.root());
        let bytes = encode_one(&t, id).unwrap();
        assert_eq!(bytes, vec![0x45]);
    }

    #[test]
    fn small_uint_uses_narrow_form() {
        let mut t = Tree::new();
        t.put_uint(42).unwrap();
        let id = t.down_of(t.root());
        let bytes = encode_one(&t, id).unwrap();
        assert_eq!(bytes, vec![0x52, 42]);
    }

    #[test]
    fn list_of_255_uses_short_form_256_uses_long_form() {
        let mut short = Tree::new();
        short.put_list().unwrap();
        short.enter().unwrap();
        for _ in 0..255 {
            short.put_bool(false).unwrap();
        }
        short.exit().unwrap();
        let id = short.down_of(short.root());
        let bytes = encode_one(&short, id).unwrap();
        assert_eq!(bytes[0], 0xC0);

        let mut long = Tree::new();
        long.put_list().unwrap();
        long.enter().unwrap();
        for _ in 0..256 {
            long.put_bool(false).unwrap();
        }
        long.exit().unwrap();
        let id = long.down_of(long.root());
        let bytes = encode_one(&long, id).unwrap();
        assert_eq!(bytes[0], 0xD0);
    }

    #[test]
    fn typed_uint_array_shares_one_element_code() {
        let mut t = Tree::new();
        t.put_array(false, Tag::UInt).unwrap();
        t.enter().unwrap();
        t.put_uint(1).unwrap();
        t.put_uint(2).unwrap();
        t.put_uint(3).unwrap();
        t.exit().unwrap();
        let id = t.down_of(t.root());
        let bytes = encode_one(&t, id).unwrap();
        // ARRAY8 code, size, count, element code 0x70, then 3 big-endian u32s
        assert_eq!(bytes[0], 0xE0);
        let element_code_offset = 3;
        assert_eq!(bytes[element_code_offset], 0x70);
        assert_eq!(&bytes[element_code_offset + 1..element_code_offset + 5], &[0, 0, 0, 1]);
    }

    #[test]
    fn described_array_with_no_elements_still_emits_element_code() {
        let mut t = Tree::new();
        t.put_array(true, Tag::UInt).unwrap();
        t.enter().unwrap();
        t.put_symbol("urn:x").unwrap();
        t.exit().unwrap();
        let id = t.down_of(t.root());
        let bytes = encode_one(&t, id).unwrap();
        assert_eq!(bytes[0], 0xE0);
        // last byte of the body is the element typecode, 0x70, with nothing after it
        assert_eq!(*bytes.last().unwrap(), 0x70);
    }
}
