//! Renders a tree as human-readable AMQP-literal-style text — the format
//! side of round-tripping a value for logs and error messages, not a
//! parseable serialization.
//!
//! Strings are always double-quoted. Symbols print bare when every byte is
//! an "identifier" byte (ASCII alphanumeric, `_`, `-`, `.`, `:` — covers the
//! `amqp:accepted:list`-style descriptors this codec actually sees) and are
//! single-quoted otherwise — quoting is driven by byte content, not by
//! `char::is_alphabetic`, so a symbol like `"a b"` or one carrying non-ASCII
//! bytes is never printed unquoted.

use crate::atom::Atom;
use crate::tree::node::NodeId;
use crate::tree::Tree;
use std::fmt::Write as _;

/// Renders every top-level value currently in `tree`, one per line.
pub fn format_tree(tree: &Tree) -> String {
    let mut out = String::new();
    let mut child = tree.down_of(tree.root());
    let mut first = true;
    while child.is_some() {
        if !first {
            out.push('\n');
        }
        first = false;
        write_value(tree, child, &mut out);
        child = tree.next_of(child);
    }
    out
}

fn is_bare_symbol_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.' | b':')
}

fn write_escaped(s: &str, quote: char, out: &mut String) {
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
}

fn write_binary(bytes: &[u8], out: &mut String) {
    out.push_str("0x");
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
}

fn write_value(tree: &Tree, id: NodeId, out: &mut String) {
    match tree.atom(id) {
        Atom::Null => out.push_str("null"),
        Atom::Bool(v) => out.push_str(if *v { "true" } else { "false" }),
        Atom::UByte(v) => {
            let _ = write!(out, "{v}");
        }
        Atom::Byte(v) => {
            let _ = write!(out, "{v}");
        }
        Atom::UShort(v) => {
            let _ = write!(out, "{v}");
        }
        Atom::Short(v) => {
            let _ = write!(out, "{v}");
        }
        Atom::UInt(v) => {
            let _ = write!(out, "{v}");
        }
        Atom::Int(v) => {
            let _ = write!(out, "{v}");
        }
        Atom::Char(v) => write_escaped(&v.to_string(), '\'', out),
        Atom::ULong(v) => {
            let _ = write!(out, "{v}");
        }
        Atom::Long(v) => {
            let _ = write!(out, "{v}");
        }
        Atom::Timestamp(v) => {
            let _ = write!(out, "{v}t");
        }
        Atom::Float(v) => {
            let _ = write!(out, "{v}f");
        }
        Atom::Double(v) => {
            let _ = write!(out, "{v}d");
        }
        Atom::Decimal32(bits) => write_binary(bits, out),
        Atom::Decimal64(bits) => write_binary(bits, out),
        Atom::Decimal128(bits) => write_binary(bits, out),
        Atom::Uuid(v) => {
            let _ = write!(out, "{v}");
        }
        Atom::Binary(slice) => match tree.bytes_of(*slice) {
            Ok(bytes) => write_binary(bytes, out),
            Err(_) => out.push_str("<invalid binary>"),
        },
        Atom::String(slice) => match tree.str_of(*slice) {
            Ok(s) => write_escaped(s, '"', out),
            Err(_) => out.push_str("<invalid utf-8>"),
        },
        Atom::Symbol(slice) => {
            let bytes = tree.bytes_of(*slice).unwrap_or(&[]);
            if !bytes.is_empty() && bytes.iter().all(|b| is_bare_symbol_byte(*b)) {
                out.push_str(tree.str_of(*slice).unwrap_or(""));
            } else {
                write_escaped(tree.str_of(*slice).unwrap_or(""), '\'', out);
            }
        }
        Atom::Described => {
            out.push('@');
            let descriptor = tree.down_of(id);
            write_value(tree, descriptor, out);
            out.push(' ');
            write_value(tree, tree.next_of(descriptor), out);
        }
        Atom::Array {
            element_type,
            described,
        } => {
            out.push_str("@T[");
            let _ = write!(out, "{element_type:?}");
            let mut child = tree.down_of(id);
            if *described {
                out.push_str("; @");
                write_value(tree, child, out);
                child = tree.next_of(child);
            }
            out.push_str("; ");
            write_list_items(tree, child, out);
            out.push(']');
        }
        Atom::List => {
            out.push('[');
            write_list_items(tree, tree.down_of(id), out);
            out.push(']');
        }
        Atom::Map => {
            out.push('{');
            let mut child = tree.down_of(id);
            let mut first = true;
            while child.is_some() {
                if !first {
                    out.push_str(", ");
                }
                first = false;
                write_value(tree, child, out);
                out.push_str(": ");
                child = tree.next_of(child);
                if child.is_some() {
                    write_value(tree, child, out);
                    child = tree.next_of(child);
                }
            }
            out.push('}');
        }
    }
}

fn write_list_items(tree: &Tree, first_child: NodeId, out: &mut String) {
    let mut child = first_child;
    let mut first = true;
    while child.is_some() {
        if !first {
            out.push_str(", ");
        }
        first = false;
        write_value(tree, child, out);
        child = tree.next_of(child);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_list_of_scalars() {
        let mut tree = Tree::new();
        tree.put_list().unwrap();
        tree.enter().unwrap();
        tree.put_uint(1).unwrap();
        tree.put_string("hi").unwrap();
        tree.put_bool(true).unwrap();
        tree.exit().unwrap();

        assert_eq!(format_tree(&tree), "[1, \"hi\", true]");
    }

    #[test]
    fn bare_symbol_prints_unquoted_odd_one_is_quoted() {
        let mut tree = Tree::new();
        tree.put_symbol("amqp:accepted:list").unwrap();
        tree.put_symbol("has space").unwrap();

        assert_eq!(
            format_tree(&tree),
            "amqp:accepted:list\n'has space'"
        );
    }

    #[test]
    fn renders_described_value() {
        let mut tree = Tree::new();
        tree.put_described().unwrap();
        tree.enter().unwrap();
        tree.put_ulong(0x70).unwrap();
        tree.put_uint(1).unwrap();
        tree.exit().unwrap();

        assert_eq!(format_tree(&tree), "@112 1");
    }
}
