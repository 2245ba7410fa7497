//! The `fill` half of the format-string mini-language (§4.6): appends into
//! a [`Tree`] from a format string plus a matching slice of [`FillArg`]s.
//!
//! One format character maps to one tree append, with three structural
//! exceptions: containers (`[ ]`, `{ }`, `@T[ ]`/`@DT[ ]`) recurse until their
//! closing bracket, `D` always takes exactly two following values, and `?`
//! takes one `Bool` argument deciding whether the following value is
//! emitted for real or replaced by `null` (in which case its format codes
//! and arguments are still consumed, just not appended — see `skip_value`).

use super::FillArg;
use crate::atom::Tag;
use crate::error::{AmqpError, Result};
use crate::tree::Tree;
use std::iter::Peekable;
use std::str::Chars;

/// Runs `fmt` against `args`, appending every value it describes at the
/// tree's current insertion point.
pub fn fill(tree: &mut Tree, fmt: &str, args: &[FillArg]) -> Result<()> {
    let mut chars = fmt.chars().peekable();
    let mut ai = 0usize;
    while chars.peek().is_some() {
        fill_value(tree, &mut chars, args, &mut ai)?;
    }
    if ai != args.len() {
        return Err(AmqpError::arg_err(format!(
            "fill: format string consumed {ai} argument(s), {} were supplied",
            args.len()
        )));
    }
    Ok(())
}

fn next_arg<'a, 'b>(args: &'b [FillArg<'a>], ai: &mut usize) -> Result<&'b FillArg<'a>> {
    let arg = args
        .get(*ai)
        .ok_or_else(|| AmqpError::arg_err("fill: not enough arguments for format string"))?;
    *ai += 1;
    Ok(arg)
}

macro_rules! expect_arg {
    ($fn_name:ident, $variant:ident, $ty:ty) => {
        fn $fn_name(arg: &FillArg) -> Result<$ty> {
            match arg {
                FillArg::$variant(v) => Ok(*v),
                other => Err(AmqpError::arg_err(format!(
                    "fill: expected a {} argument, got {other:?}",
                    stringify!($variant)
                ))),
            }
        }
    };
}

expect_arg!(expect_bool, Bool, bool);
expect_arg!(expect_ubyte, UByte, u8);
expect_arg!(expect_byte, Byte, i8);
expect_arg!(expect_ushort, UShort, u16);
expect_arg!(expect_short, Short, i16);
expect_arg!(expect_uint, UInt, u32);
expect_arg!(expect_int, Int, i32);
expect_arg!(expect_char, Char, char);
expect_arg!(expect_ulong, ULong, u64);
expect_arg!(expect_long, Long, i64);
expect_arg!(expect_timestamp, Timestamp, i64);
expect_arg!(expect_float, Float, f32);
expect_arg!(expect_double, Double, f64);
expect_arg!(expect_element_type, ElementType, Tag);

fn expect_binary<'a>(arg: &FillArg<'a>) -> Result<&'a [u8]> {
    match arg {
        FillArg::Binary(v) => Ok(v),
        other => Err(AmqpError::arg_err(format!(
            "fill: expected a Binary argument, got {other:?}"
        ))),
    }
}

fn expect_string<'a>(arg: &FillArg<'a>) -> Result<&'a str> {
    match arg {
        FillArg::String(v) => Ok(v),
        other => Err(AmqpError::arg_err(format!(
            "fill: expected a String argument, got {other:?}"
        ))),
    }
}

fn expect_symbol<'a>(arg: &FillArg<'a>) -> Result<&'a str> {
    match arg {
        FillArg::Symbol(v) => Ok(v),
        other => Err(AmqpError::arg_err(format!(
            "fill: expected a Symbol argument, got {other:?}"
        ))),
    }
}

fn expect_symbols<'a>(arg: &FillArg<'a>) -> Result<&'a [&'a str]> {
    match arg {
        FillArg::Symbols(v) => Ok(v),
        other => Err(AmqpError::arg_err(format!(
            "fill: expected a Symbols argument, got {other:?}"
        ))),
    }
}

fn expect_tree<'a>(arg: &FillArg<'a>) -> Result<&'a Tree> {
    match arg {
        FillArg::Source(v) => Ok(v),
        other => Err(AmqpError::arg_err(format!(
            "fill: expected a Source argument, got {other:?}"
        ))),
    }
}

/// After appending any value, if the insertion point's parent is a
/// `described` node that now has both its children, exit it — the auto-exit
/// rule that lets `D<descriptor><value>` read as one unit without brackets.
fn maybe_auto_exit_described(tree: &mut Tree) -> Result<()> {
    let parent = tree.cursor_parent();
    if parent.is_some() && tree.tag(parent) == Tag::Described && tree.children_count(parent) == 2 {
        tree.exit()?;
    }
    Ok(())
}

fn fill_value(
    tree: &mut Tree,
    chars: &mut Peekable<Chars>,
    args: &[FillArg],
    ai: &mut usize,
) -> Result<()> {
    let code = chars
        .next()
        .ok_or_else(|| AmqpError::err("fill: unexpected end of format string"))?;
    match code {
        'n' => {
            tree.put_null()?;
        }
        'o' => {
            let v = expect_bool(next_arg(args, ai)?)?;
            tree.put_bool(v)?;
        }
        'B' => {
            let v = expect_ubyte(next_arg(args, ai)?)?;
            tree.put_ubyte(v)?;
        }
        'b' => {
            let v = expect_byte(next_arg(args, ai)?)?;
            tree.put_byte(v)?;
        }
        'H' => {
            let v = expect_ushort(next_arg(args, ai)?)?;
            tree.put_ushort(v)?;
        }
        'h' => {
            let v = expect_short(next_arg(args, ai)?)?;
            tree.put_short(v)?;
        }
        'I' => {
            let v = expect_uint(next_arg(args, ai)?)?;
            tree.put_uint(v)?;
        }
        'i' => {
            let v = expect_int(next_arg(args, ai)?)?;
            tree.put_int(v)?;
        }
        'c' => {
            let v = expect_char(next_arg(args, ai)?)?;
            tree.put_char(v)?;
        }
        'L' => {
            let v = expect_ulong(next_arg(args, ai)?)?;
            tree.put_ulong(v)?;
        }
        'l' => {
            let v = expect_long(next_arg(args, ai)?)?;
            tree.put_long(v)?;
        }
        't' => {
            let v = expect_timestamp(next_arg(args, ai)?)?;
            tree.put_timestamp(v)?;
        }
        'f' => {
            let v = expect_float(next_arg(args, ai)?)?;
            tree.put_float(v)?;
        }
        'd' => {
            let v = expect_double(next_arg(args, ai)?)?;
            tree.put_double(v)?;
        }
        'z' => {
            let v = expect_binary(next_arg(args, ai)?)?;
            tree.put_binary(v)?;
        }
        'S' => {
            let v = expect_string(next_arg(args, ai)?)?;
            tree.put_string(v)?;
        }
        's' => {
            let v = expect_symbol(next_arg(args, ai)?)?;
            tree.put_symbol(v)?;
        }
        '[' => {
            tree.put_list()?;
            tree.enter()?;
            while chars.peek() != Some(&']') {
                fill_value(tree, chars, args, ai)?;
            }
            chars.next();
            tree.exit()?;
        }
        '{' => {
            tree.put_map()?;
            tree.enter()?;
            while chars.peek() != Some(&'}') {
                fill_value(tree, chars, args, ai)?;
            }
            chars.next();
            tree.exit()?;
        }
        '@' => {
            let described = chars.peek() == Some(&'D');
            if described {
                chars.next();
            }
            if chars.next() != Some('T') {
                return Err(AmqpError::err(
                    "fill: array must open with 'T' to set its element type",
                ));
            }
            if chars.next() != Some('[') {
                return Err(AmqpError::err("fill: expected '[' after 'T'"));
            }
            let element_type = expect_element_type(next_arg(args, ai)?)?;
            tree.put_array(described, element_type)?;
            tree.enter()?;
            if described {
                fill_value(tree, chars, args, ai)?;
            }
            while chars.peek() != Some(&']') {
                fill_value(tree, chars, args, ai)?;
            }
            chars.next();
            tree.exit()?;
        }
        'D' => {
            tree.put_described()?;
            tree.enter()?;
            fill_value(tree, chars, args, ai)?;
            fill_value(tree, chars, args, ai)?;
        }
        '?' => {
            let cond = expect_bool(next_arg(args, ai)?)?;
            if cond {
                fill_value(tree, chars, args, ai)?;
            } else {
                tree.put_null()?;
                skip_value(chars, ai)?;
            }
        }
        '*' => {
            let mut n = 0usize;
            while let Some(d) = chars.peek().and_then(|c| c.to_digit(10)) {
                n = n * 10 + d as usize;
                chars.next();
            }
            let rep_code = chars
                .next()
                .ok_or_else(|| AmqpError::err("fill: '*N' missing its repeated code"))?;
            if rep_code != 's' {
                return Err(AmqpError::arg_err(
                    "fill: '*N' repeat is only supported for symbol ('s') elements",
                ));
            }
            let symbols = expect_symbols(next_arg(args, ai)?)?;
            if symbols.len() != n {
                return Err(AmqpError::arg_err(format!(
                    "fill: '*{n}s' expected {n} symbol(s), got {}",
                    symbols.len()
                )));
            }
            for sym in symbols {
                tree.put_symbol(sym)?;
            }
        }
        'C' => {
            let src = expect_tree(next_arg(args, ai)?)?;
            tree.append(src)?;
        }
        other => {
            return Err(AmqpError::arg_err(format!(
                "fill: unknown format code '{other}'"
            )))
        }
    }
    maybe_auto_exit_described(tree)
}

/// Walks the same grammar as [`fill_value`] without touching the tree —
/// used when `?`'s condition is false, so the format cursor and argument
/// index stay in lockstep with what a "real" fill would have consumed.
fn skip_value(chars: &mut Peekable<Chars>, ai: &mut usize) -> Result<()> {
    let code = chars
        .next()
        .ok_or_else(|| AmqpError::err("fill: unexpected end of format string"))?;
    match code {
        'n' => {}
        'o' | 'B' | 'b' | 'H' | 'h' | 'I' | 'i' | 'c' | 'L' | 'l' | 't' | 'f' | 'd' | 'z' | 'S'
        | 's' | 'C' => {
            *ai += 1;
        }
        '[' => {
            while chars.peek() != Some(&']') {
                skip_value(chars, ai)?;
            }
            chars.next();
        }
        '{' => {
            while chars.peek() != Some(&'}') {
                skip_value(chars, ai)?;
            }
            chars.next();
        }
        '@' => {
            let described = chars.peek() == Some(&'D');
            if described {
                chars.next();
            }
            chars.next(); // 'T'
            chars.next(); // '['
            *ai += 1;
            if described {
                skip_value(chars, ai)?;
            }
            while chars.peek() != Some(&']') {
                skip_value(chars, ai)?;
            }
            chars.next();
        }
        'D' => {
            skip_value(chars, ai)?;
            skip_value(chars, ai)?;
        }
        '?' => {
            *ai += 1;
            skip_value(chars, ai)?;
        }
        '*' => {
            while chars.peek().and_then(|c| c.to_digit(10)).is_some() {
                chars.next();
            }
            chars.next();
            *ai += 1;
        }
        other => {
            return Err(AmqpError::arg_err(format!(
                "fill: unknown format code '{other}' while skipping"
            )))
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::Atom;

    #[test]
    fn fills_described_list_per_scenario_one() {
        let mut tree = Tree::new();
        fill(
            &mut tree,
            "DL[SSI]",
            &[
                FillArg::ULong(0x70),
                FillArg::String("hello"),
                FillArg::String("world"),
                FillArg::UInt(42),
            ],
        )
        .unwrap();

        let described = tree.down_of(tree.root());
        assert_eq!(tree.tag(described), Tag::Described);
        assert_eq!(tree.children_count(described), 2);
        let descriptor = tree.down_of(described);
        assert_eq!(*tree.atom(descriptor), Atom::ULong(0x70));
        let list = tree.next_of(descriptor);
        assert_eq!(tree.tag(list), Tag::List);
        assert_eq!(tree.children_count(list), 3);
    }

    #[test]
    fn fills_typed_array_per_scenario_two() {
        let mut tree = Tree::new();
        fill(
            &mut tree,
            "@T[III]",
            &[
                FillArg::ElementType(Tag::UInt),
                FillArg::UInt(1),
                FillArg::UInt(2),
                FillArg::UInt(3),
            ],
        )
        .unwrap();

        let array = tree.down_of(tree.root());
        assert!(matches!(
            *tree.atom(array),
            Atom::Array {
                element_type: Tag::UInt,
                described: false
            }
        ));
        assert_eq!(tree.children_count(array), 3);
    }

    #[test]
    fn conditional_false_emits_null_and_stays_in_sync() {
        let mut tree = Tree::new();
        fill(
            &mut tree,
            "[?SI]",
            &[FillArg::Bool(false), FillArg::String("skipped"), FillArg::UInt(9)],
        )
        .unwrap();

        let list = tree.down_of(tree.root());
        assert_eq!(tree.children_count(list), 2);
        let first = tree.down_of(list);
        assert_eq!(tree.tag(first), Tag::Null);
        let second = tree.next_of(first);
        assert_eq!(*tree.atom(second), Atom::UInt(9));
    }
}
