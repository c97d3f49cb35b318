//! COPY text-format rendering for coerced cells.
//!
//! COPY text format rules:
//! - NULL: `\N`
//! - Strings: backslash-escape `\`, tab, newline, carriage return; strip
//!   null bytes
//! - Booleans: `t` / `f`
//! - Arrays and ranges: rendered as their SQL literal, then escaped like
//!   any other string field

use std::io::Write;

use crate::infer::Cell;

/// Append one field to a COPY text buffer.
pub(crate) fn write_copy_field(buf: &mut Vec<u8>, cell: &Cell) {
    match cell {
        Cell::Null => buf.extend_from_slice(b"\\N"),
        Cell::Text(s) => escape_text(buf, s),
        Cell::Int(i) => {
            let _ = write!(buf, "{i}");
        }
        Cell::Float(f) => {
            let _ = write!(buf, "{f}");
        }
        Cell::Bool(b) => buf.push(if *b { b't' } else { b'f' }),
        Cell::Array(items) => escape_text(buf, &array_literal(items)),
        Cell::Range { start, end } => escape_text(buf, &range_literal(start, end)),
    }
}

/// Append one full row: tab-separated fields, newline-terminated.
pub(crate) fn write_copy_row(buf: &mut Vec<u8>, row: &[Cell]) {
    for (i, cell) in row.iter().enumerate() {
        if i > 0 {
            buf.push(b'\t');
        }
        write_copy_field(buf, cell);
    }
    buf.push(b'\n');
}

fn escape_text(buf: &mut Vec<u8>, value: &str) {
    for byte in value.bytes() {
        match byte {
            b'\\' => buf.extend_from_slice(b"\\\\"),
            b'\t' => buf.extend_from_slice(b"\\t"),
            b'\n' => buf.extend_from_slice(b"\\n"),
            b'\r' => buf.extend_from_slice(b"\\r"),
            0 => {} // skip null bytes
            _ => buf.push(byte),
        }
    }
}

/// SQL array literal with every element quoted.
fn array_literal(items: &[String]) -> String {
    let mut out = String::from("{");
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push('"');
        for ch in item.chars() {
            if ch == '"' || ch == '\\' {
                out.push('\\');
            }
            out.push(ch);
        }
        out.push('"');
    }
    out.push('}');
    out
}

/// SQL range literal; an absent bound renders as unbounded.
fn range_literal(start: &Option<String>, end: &Option<String>) -> String {
    let mut out = String::new();
    out.push(if start.is_some() { '[' } else { '(' });
    if let Some(s) = start {
        out.push('"');
        out.push_str(s);
        out.push('"');
    }
    out.push(',');
    if let Some(e) = end {
        out.push('"');
        out.push_str(e);
        out.push('"');
        out.push(']');
    } else {
        out.push(')');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(cell: &Cell) -> String {
        let mut buf = Vec::new();
        write_copy_field(&mut buf, cell);
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_null_and_scalars() {
        assert_eq!(field(&Cell::Null), "\\N");
        assert_eq!(field(&Cell::Int(-7)), "-7");
        assert_eq!(field(&Cell::Float(2.5)), "2.5");
        assert_eq!(field(&Cell::Bool(true)), "t");
        assert_eq!(field(&Cell::Bool(false)), "f");
        assert_eq!(field(&Cell::Text("plain".into())), "plain");
    }

    #[test]
    fn test_text_escaping() {
        assert_eq!(
            field(&Cell::Text("a\tb\nc\\d\re".into())),
            "a\\tb\\nc\\\\d\\re"
        );
        assert_eq!(field(&Cell::Text("nul\0byte".into())), "nulbyte");
    }

    #[test]
    fn test_array_literal_quotes_elements() {
        assert_eq!(
            field(&Cell::Array(vec!["red".into(), "blue".into()])),
            "{\"red\",\"blue\"}"
        );
        assert_eq!(field(&Cell::Array(vec![])), "{}");
        // Embedded quotes and backslashes double-escape: once for the array
        // literal, once for COPY.
        assert_eq!(
            field(&Cell::Array(vec!["sa\"id".into()])),
            "{\"sa\\\\\"id\"}"
        );
    }

    #[test]
    fn test_range_literals() {
        assert_eq!(
            field(&Cell::Range {
                start: Some("2024-01-01".into()),
                end: Some("2024-01-31".into()),
            }),
            "[\"2024-01-01\",\"2024-01-31\"]"
        );
        assert_eq!(
            field(&Cell::Range {
                start: Some("2024-01-01".into()),
                end: None,
            }),
            "[\"2024-01-01\",)"
        );
    }

    #[test]
    fn test_row_rendering() {
        let mut buf = Vec::new();
        write_copy_row(
            &mut buf,
            &[Cell::Text("p-1".into()), Cell::Null, Cell::Int(3)],
        );
        assert_eq!(String::from_utf8(buf).unwrap(), "p-1\t\\N\t3\n");
    }
}
