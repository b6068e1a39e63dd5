//! Turning values back into JSON and cell text.

use chrono::Local;
use log::trace;

use crate::shape::{Def, Shape, StructDef};
use crate::value::{Dynamic, Record, Value};

/// A sink for JSON output.
pub trait JsonWrite {
    /// Appends `buf`.
    fn write(&mut self, buf: &[u8]);

    /// Hints that `additional` more bytes are coming.
    fn reserve(&mut self, additional: usize);
}

impl JsonWrite for Vec<u8> {
    fn write(&mut self, buf: &[u8]) {
        self.extend_from_slice(buf);
    }

    fn reserve(&mut self, additional: usize) {
        Vec::reserve(self, additional);
    }
}

impl<W: JsonWrite + ?Sized> JsonWrite for &mut W {
    fn write(&mut self, buf: &[u8]) {
        (**self).write(buf);
    }

    fn reserve(&mut self, additional: usize) {
        (**self).reserve(additional);
    }
}

/// Serializes `value` as compact JSON, using `shape` for key names.
///
/// Struct keys are JSON names (`json` tag, else the declared name), fields
/// tagged `json:"-"` are skipped and untagged embedded structs are promoted
/// into their parent object, mirroring how payloads are decoded.
pub fn to_json_string(shape: &Shape, value: &Value) -> String {
    let mut out = Vec::new();
    to_writer(shape, value, &mut out);
    bytes_to_string(out)
}

/// Serializes `value` as pretty-printed JSON.
pub fn to_json_string_pretty(shape: &Shape, value: &Value) -> String {
    let mut out = Vec::new();
    to_writer_pretty(shape, value, &mut out);
    bytes_to_string(out)
}

/// Serializes `value` as compact JSON into `writer`.
pub fn to_writer<W: JsonWrite>(shape: &Shape, value: &Value, mut writer: W) {
    serialize_value(Some(shape), value, &mut writer, None, 0);
}

/// Serializes `value` as pretty-printed JSON into `writer`.
pub fn to_writer_pretty<W: JsonWrite>(shape: &Shape, value: &Value, mut writer: W) {
    serialize_value(Some(shape), value, &mut writer, Some("  "), 0);
}

fn bytes_to_string(bytes: Vec<u8>) -> String {
    // only whole UTF-8 sequences are ever written
    String::from_utf8(bytes).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}

/// Write indentation for pretty printing
fn write_indent<W: JsonWrite>(writer: &mut W, indent: Option<&str>, depth: usize) {
    if let Some(indent_str) = indent {
        for _ in 0..depth {
            writer.write(indent_str.as_bytes());
        }
    }
}

/// Write a newline for pretty printing
fn write_newline<W: JsonWrite>(writer: &mut W, indent: Option<&str>) {
    if indent.is_some() {
        writer.write(b"\n");
    }
}

/// Write a space after colon for pretty printing
fn write_colon<W: JsonWrite>(writer: &mut W, indent: Option<&str>) {
    if indent.is_some() {
        writer.write(b": ");
    } else {
        writer.write(b":");
    }
}

/// Separator and indentation before a container member.
fn begin_member<W: JsonWrite>(writer: &mut W, indent: Option<&str>, depth: usize, first: &mut bool) {
    if !*first {
        writer.write(b",");
    }
    *first = false;
    write_newline(writer, indent);
    write_indent(writer, indent, depth + 1);
}

fn end_container<W: JsonWrite>(
    writer: &mut W,
    indent: Option<&str>,
    depth: usize,
    first: bool,
    close: &[u8],
) {
    if !first {
        write_newline(writer, indent);
        write_indent(writer, indent, depth);
    }
    writer.write(close);
}

fn write_json_string<W: JsonWrite>(writer: &mut W, s: &str) {
    writer.reserve(s.len() + 2);
    writer.write(b"\"");
    for c in s.chars() {
        write_json_escaped_char(writer, c);
    }
    writer.write(b"\"");
}

fn write_json_escaped_char<W: JsonWrite>(writer: &mut W, c: char) {
    match c {
        '"' => writer.write(b"\\\""),
        '\\' => writer.write(b"\\\\"),
        '\n' => writer.write(b"\\n"),
        '\r' => writer.write(b"\\r"),
        '\t' => writer.write(b"\\t"),
        '\u{08}' => writer.write(b"\\b"),
        '\u{0C}' => writer.write(b"\\f"),
        c if c.is_ascii_control() => {
            let code_point = c as u32;
            let to_hex = |d: u32| {
                if d < 10 {
                    b'0' + d as u8
                } else {
                    b'a' + (d - 10) as u8
                }
            };
            writer.write(&[
                b'\\',
                b'u',
                to_hex((code_point >> 12) & 0xF),
                to_hex((code_point >> 8) & 0xF),
                to_hex((code_point >> 4) & 0xF),
                to_hex(code_point & 0xF),
            ]);
        }
        c => {
            let mut buf = [0u8; 4];
            writer.write(c.encode_utf8(&mut buf).as_bytes());
        }
    }
}

fn write_f64<W: JsonWrite>(writer: &mut W, v: f64) {
    if v.is_finite() {
        writer.write(ryu::Buffer::new().format_finite(v).as_bytes());
    } else {
        writer.write(b"null");
    }
}

fn write_f32<W: JsonWrite>(writer: &mut W, v: f32) {
    if v.is_finite() {
        writer.write(ryu::Buffer::new().format_finite(v).as_bytes());
    } else {
        writer.write(b"null");
    }
}

/// Integers as text, for both JSON numbers and quoted map keys.
pub(crate) fn integer_text(value: &Value) -> Option<String> {
    let mut buf = itoa::Buffer::new();
    let text = match *value {
        Value::I8(v) => buf.format(v),
        Value::I16(v) => buf.format(v),
        Value::I32(v) => buf.format(v),
        Value::I64(v) => buf.format(v),
        Value::ISize(v) => buf.format(v),
        Value::U8(v) => buf.format(v),
        Value::U16(v) => buf.format(v),
        Value::U32(v) => buf.format(v),
        Value::U64(v) => buf.format(v),
        Value::USize(v) => buf.format(v),
        _ => return None,
    };
    Some(text.to_string())
}

fn serialize_value<W: JsonWrite>(
    shape: Option<&Shape>,
    value: &Value,
    writer: &mut W,
    indent: Option<&str>,
    depth: usize,
) {
    trace!("Serializing a {:?}", shape.map(|s| s.type_identifier.as_str()));

    match value {
        Value::Bool(v) => writer.write(if *v { b"true" } else { b"false" }),
        Value::F32(v) => write_f32(writer, *v),
        Value::F64(v) => write_f64(writer, *v),
        Value::Complex64(c) => write_json_string(writer, &c.to_string()),
        Value::Complex128(c) => write_json_string(writer, &c.to_string()),
        Value::String(s) => write_json_string(writer, s),
        Value::Time(Some(t)) => write_json_string(writer, &t.to_rfc3339()),
        Value::Time(None) | Value::Pointer(None) => writer.write(b"null"),
        Value::Pointer(Some(inner)) => {
            let pointee = shape.and_then(|s| match &s.def {
                Def::Pointer(p) => Some(&**p),
                _ => None,
            });
            serialize_value(pointee, inner, writer, indent, depth);
        }
        Value::Struct(record) => {
            writer.write(b"{");
            let mut first = true;
            match shape.and_then(Shape::struct_def) {
                Some(def) => serialize_members(def, record, writer, indent, depth, &mut first),
                None => {
                    for (name, v) in &record.fields {
                        begin_member(writer, indent, depth, &mut first);
                        write_json_string(writer, name);
                        write_colon(writer, indent);
                        serialize_value(None, v, writer, indent, depth + 1);
                    }
                }
            }
            end_container(writer, indent, depth, first, b"}");
        }
        Value::Slice(items) | Value::Array(items) => {
            let elem = shape.and_then(|s| match &s.def {
                Def::Slice(e) => Some(&**e),
                Def::Array(a) => Some(&*a.elem),
                _ => None,
            });
            writer.write(b"[");
            let mut first = true;
            for item in items {
                begin_member(writer, indent, depth, &mut first);
                serialize_value(elem, item, writer, indent, depth + 1);
            }
            end_container(writer, indent, depth, first, b"]");
        }
        Value::Map(entries) => {
            let value_shape = shape.and_then(|s| match &s.def {
                Def::Map(m) => Some(&*m.value),
                _ => None,
            });
            writer.write(b"{");
            let mut first = true;
            for (key, v) in entries {
                begin_member(writer, indent, depth, &mut first);
                serialize_map_key(key, writer);
                write_colon(writer, indent);
                serialize_value(value_shape, v, writer, indent, depth + 1);
            }
            end_container(writer, indent, depth, first, b"}");
        }
        Value::Dynamic(d) => serialize_dynamic(d, writer, indent, depth),
        other => match integer_text(other) {
            Some(text) => writer.write(text.as_bytes()),
            None => writer.write(b"null"),
        },
    }
}

/// Writes the members of a struct, promoting untagged embedded structs.
fn serialize_members<W: JsonWrite>(
    def: &StructDef,
    record: &Record,
    writer: &mut W,
    indent: Option<&str>,
    depth: usize,
    first: &mut bool,
) {
    for (field, (_, v)) in def.fields.iter().zip(&record.fields) {
        if field.is_promoted() {
            if let (Def::Struct(inner), Value::Struct(inner_record)) = (&field.shape.def, v) {
                serialize_members(inner, inner_record, writer, indent, depth, first);
                continue;
            }
        }
        let Some(name) = field.json_name() else {
            trace!("Skipping field {} tagged json:\"-\"", field.name);
            continue;
        };
        begin_member(writer, indent, depth, first);
        write_json_string(writer, name);
        write_colon(writer, indent);
        serialize_value(Some(&field.shape), v, writer, indent, depth + 1);
    }
}

fn serialize_map_key<W: JsonWrite>(key: &Value, writer: &mut W) {
    match key {
        Value::String(s) => write_json_string(writer, s),
        other => match integer_text(other) {
            Some(text) => {
                writer.write(b"\"");
                writer.write(text.as_bytes());
                writer.write(b"\"");
            }
            None => write_json_string(writer, &render_value(None, other)),
        },
    }
}

fn serialize_dynamic<W: JsonWrite>(
    value: &Dynamic,
    writer: &mut W,
    indent: Option<&str>,
    depth: usize,
) {
    match value {
        Dynamic::Null => writer.write(b"null"),
        Dynamic::Bool(b) => writer.write(if *b { b"true" } else { b"false" }),
        Dynamic::Number(n) => write_f64(writer, *n),
        Dynamic::String(s) => write_json_string(writer, s),
        Dynamic::Array(items) => {
            writer.write(b"[");
            let mut first = true;
            for item in items {
                begin_member(writer, indent, depth, &mut first);
                serialize_dynamic(item, writer, indent, depth + 1);
            }
            end_container(writer, indent, depth, first, b"]");
        }
        Dynamic::Object(entries) => {
            writer.write(b"{");
            let mut first = true;
            for (key, v) in entries {
                begin_member(writer, indent, depth, &mut first);
                write_json_string(writer, key);
                write_colon(writer, indent);
                serialize_dynamic(v, writer, indent, depth + 1);
            }
            end_container(writer, indent, depth, first, b"}");
        }
    }
}

// ============================================================================
// Cell text
// ============================================================================

/// Layout times are rendered with.
pub const CELL_TIME_LAYOUT: &str = "%Y-%m-%d %H:%M:%S";

/// Renders `value` as the text of a spreadsheet cell.
///
/// Scalars are plain text, instants are local `YYYY-MM-DD HH:MM:SS` (`null`
/// for the zero instant), nil pointers are blank and composites are compact
/// JSON. Coercing the result with the same shape gives back the value, up to
/// sub-second precision. `f32` values only survive that with
/// [`CoerceOptions::float32_quirk`](crate::CoerceOptions::float32_quirk)
/// turned off.
pub fn render_cell(shape: &Shape, value: &Value) -> String {
    render_value(Some(shape), value)
}

fn render_value(shape: Option<&Shape>, value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::F32(v) => ryu::Buffer::new().format(*v).to_string(),
        Value::F64(v) => ryu::Buffer::new().format(*v).to_string(),
        Value::Complex64(c) => c.to_string(),
        Value::Complex128(c) => c.to_string(),
        Value::Time(Some(t)) => t.with_timezone(&Local).format(CELL_TIME_LAYOUT).to_string(),
        Value::Time(None) => "null".to_string(),
        Value::Pointer(None) => String::new(),
        Value::Pointer(Some(inner)) => {
            let pointee = shape.and_then(|s| match &s.def {
                Def::Pointer(p) => Some(&**p),
                _ => None,
            });
            render_value(pointee, inner)
        }
        Value::Struct(_) | Value::Slice(_) | Value::Array(_) | Value::Map(_) | Value::Dynamic(_) => {
            let mut out = Vec::new();
            serialize_value(shape, value, &mut out, None, 0);
            bytes_to_string(out)
        }
        other => integer_text(other).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_control_characters() {
        let mut out = Vec::new();
        write_json_string(&mut out, "a\"b\u{1}\n");
        assert_eq!(String::from_utf8(out).unwrap(), r#""a\"b\u0001\n""#);
    }
}
