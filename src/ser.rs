//! Rendering documents and values back to TOML text.

#[cfg(test)]
#[path = "./ser_tests.rs"]
mod tests;

use crate::table::TableKind;
use crate::value::{Integer, Key, Value};
use crate::{Array, Document, Error, ErrorKind, Table};
use std::fmt::Write;

/// Single-line arrays longer than this are wrapped, one element per line.
const MAX_INLINE_ARRAY_WIDTH: usize = 60;

const INDENT: &str = "    ";

/// Where a value is being written.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Position {
    /// Right hand side of a `key = value` line in a section.
    Field,
    /// Element of a wrapped array at the given depth.
    Array(usize),
    /// Inside an inline table, or anywhere else that must stay on one line.
    OneLine,
}

struct Emitter {
    out: String,
    group_digits: bool,
}

/// Serializes a document.
///
/// Every table lists its plain fields first, followed by its sub-tables and
/// arrays of tables in their original order. Comments and the original
/// layout are not preserved, but parsing the output yields a document equal
/// to the input.
pub fn to_string(doc: &Document) -> Result<String, Error> {
    let mut emitter = Emitter {
        out: String::new(),
        group_digits: true,
    };
    let mut path = Vec::new();
    emitter.table_body(doc.root(), &mut path)?;
    Ok(emitter.out)
}

/// Renders a value on a single line with plain integer digits, as used when
/// a value is spliced into existing text.
pub(crate) fn value_to_line(value: &Value) -> Result<String, Error> {
    let mut emitter = Emitter {
        out: String::new(),
        group_digits: false,
    };
    emitter.value(value, Position::OneLine)?;
    Ok(emitter.out)
}

/// True for values written as sections rather than `key = value` lines.
fn is_section(value: &Value) -> bool {
    match value {
        Value::Table(t) => t.kind() != TableKind::Inline,
        Value::Array(a) => a.is_array_of_tables() && !a.is_empty(),
        _ => false,
    }
}

impl Emitter {
    fn table_body(&mut self, table: &Table, path: &mut Vec<String>) -> Result<(), Error> {
        for (key, value) in table {
            if is_section(value) {
                continue;
            }
            write_key(&mut self.out, &key.name);
            self.out.push_str(" = ");
            self.value(value, Position::Field)?;
            self.out.push('\n');
        }
        for (key, value) in table {
            if !is_section(value) {
                continue;
            }
            path.push(key.name.clone());
            match value {
                Value::Table(sub) => self.section(sub, path)?,
                Value::Array(array) => self.array_of_tables(array, path)?,
                _ => {}
            }
            path.pop();
        }
        Ok(())
    }

    fn section(&mut self, table: &Table, path: &mut Vec<String>) -> Result<(), Error> {
        let has_fields = table.iter().any(|(_, v)| !is_section(v));
        if has_fields || table.is_empty() {
            self.header(path, false);
        }
        self.table_body(table, path)
    }

    fn array_of_tables(&mut self, array: &Array, path: &mut Vec<String>) -> Result<(), Error> {
        for element in array {
            let Value::Table(table) = element else {
                return Err(ErrorKind::NotATable {
                    path: path.join("."),
                }
                .into());
            };
            self.header(path, true);
            self.table_body(table, path)?;
        }
        Ok(())
    }

    fn header(&mut self, path: &[String], array: bool) {
        if !self.out.is_empty() {
            self.out.push('\n');
        }
        self.out.push_str(if array { "[[" } else { "[" });
        self.out.push_str(&dotted_path(path));
        self.out.push_str(if array { "]]\n" } else { "]\n" });
    }

    fn value(&mut self, value: &Value, pos: Position) -> Result<(), Error> {
        match value {
            Value::String(s) => write_string(&mut self.out, s, pos == Position::Field),
            Value::Integer(i) => self.integer(i),
            Value::Float(f) => write_float(&mut self.out, *f),
            Value::Boolean(b) => self.out.push_str(if *b { "true" } else { "false" }),
            Value::Datetime(dt) => {
                let _ = write!(self.out, "{dt}");
            }
            Value::Array(array) => return self.array(array, pos),
            Value::Table(table) => return self.inline_table(table),
        }
        Ok(())
    }

    fn integer(&mut self, value: &Integer) {
        let digits = value.to_string();
        if !self.group_digits {
            self.out.push_str(&digits);
            return;
        }
        let (sign, digits) = match digits.strip_prefix('-') {
            Some(rest) => ("-", rest),
            None => ("", digits.as_str()),
        };
        self.out.push_str(sign);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                self.out.push('_');
            }
            self.out.push(ch);
        }
    }

    fn array(&mut self, array: &Array, pos: Position) -> Result<(), Error> {
        array.check_homogeneous()?;
        let depth = match pos {
            Position::Array(depth) => depth + 1,
            _ => 1,
        };
        let element_pos = match pos {
            Position::OneLine => Position::OneLine,
            _ => Position::Array(depth),
        };

        let mut items = Vec::with_capacity(array.len());
        for element in array {
            let mut inner = Emitter {
                out: String::new(),
                group_digits: self.group_digits,
            };
            inner.value(element, element_pos)?;
            items.push(inner.out);
        }

        let width = 2 + items.iter().map(|s| s.len() + 2).sum::<usize>();
        let wrap = pos != Position::OneLine
            && !items.is_empty()
            && (width > MAX_INLINE_ARRAY_WIDTH || items.iter().any(|s| s.contains('\n')));
        if !wrap {
            self.out.push('[');
            self.out.push_str(&items.join(", "));
            self.out.push(']');
            return Ok(());
        }
        self.out.push_str("[\n");
        for item in &items {
            for _ in 0..depth {
                self.out.push_str(INDENT);
            }
            self.out.push_str(item);
            self.out.push_str(",\n");
        }
        for _ in 1..depth {
            self.out.push_str(INDENT);
        }
        self.out.push(']');
        Ok(())
    }

    fn inline_table(&mut self, table: &Table) -> Result<(), Error> {
        if table.is_empty() {
            self.out.push_str("{}");
            return Ok(());
        }
        self.out.push_str("{ ");
        for (i, (key, value)) in table.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            write_key(&mut self.out, &key.name);
            self.out.push_str(" = ");
            self.value(value, Position::OneLine)?;
        }
        self.out.push_str(" }");
        Ok(())
    }
}

pub(crate) fn is_bare_key(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Writes a key, quoting it when it is not a valid bare key.
pub(crate) fn write_key(out: &mut String, name: &str) {
    if is_bare_key(name) {
        out.push_str(name);
    } else {
        write_basic(out, name, false);
    }
}

pub(crate) fn format_key(key: &Key) -> String {
    let mut out = String::new();
    write_key(&mut out, &key.name);
    out
}

/// Joins keys into a dotted path accepted by [`Document::get`] and
/// [`SectionPatch::new`](crate::SectionPatch::new), quoting keys that are
/// not bare.
///
/// ```
/// assert_eq!(toml_patchwork::dotted_path(["bot", "my plugin"]), "bot.\"my plugin\"");
/// ```
pub fn dotted_path<I, S>(keys: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::new();
    for (i, key) in keys.into_iter().enumerate() {
        if i > 0 {
            out.push('.');
        }
        write_key(&mut out, key.as_ref());
    }
    out
}

fn write_string(out: &mut String, s: &str, multiline_ok: bool) {
    if multiline_ok && s.contains('\n') {
        out.push_str("\"\"\"\n");
        escape_into(out, s, true);
        out.push_str("\"\"\"");
        return;
    }
    let literal_ok = s.contains('"') && !s.chars().any(|c| c == '\'' || c.is_control());
    if literal_ok {
        out.push('\'');
        out.push_str(s);
        out.push('\'');
    } else {
        write_basic(out, s, false);
    }
}

fn write_basic(out: &mut String, s: &str, multiline: bool) {
    out.push('"');
    escape_into(out, s, multiline);
    out.push('"');
}

fn escape_into(out: &mut String, s: &str, multiline: bool) {
    for ch in s.chars() {
        match ch {
            '\n' if multiline => out.push('\n'),
            '\u{8}' => out.push_str("\\b"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\u{c}' => out.push_str("\\f"),
            '\r' => out.push_str("\\r"),
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04X}", c as u32);
            }
            c => out.push(c),
        }
    }
}

fn write_float(out: &mut String, f: f64) {
    if f.is_nan() {
        out.push_str(if f.is_sign_negative() { "-nan" } else { "nan" });
        return;
    }
    if f.is_infinite() {
        out.push_str(if f > 0.0 { "inf" } else { "-inf" });
        return;
    }
    if f == 0.0 {
        out.push_str(if f.is_sign_negative() { "-0.0" } else { "0.0" });
        return;
    }
    let mut buffer = zmij::Buffer::new();
    let text = buffer.format(f);
    out.push_str(text);
    if !text.contains(['.', 'e', 'E']) {
        out.push_str(".0");
    }
}
