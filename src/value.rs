//! Materialized values.

use chrono::{DateTime, FixedOffset};
use num_complex::Complex;

use crate::shape::{Def, ScalarKind, Shape, StructDef};

/// An instant with the offset it was interpreted in.
pub type Instant = DateTime<FixedOffset>;

/// A value materialized from cell text, shaped by a [`Shape`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// `bool`
    Bool(bool),
    /// `i8`
    I8(i8),
    /// `i16`
    I16(i16),
    /// `i32`
    I32(i32),
    /// `i64`
    I64(i64),
    /// `isize`
    ISize(isize),
    /// `u8`
    U8(u8),
    /// `u16`
    U16(u16),
    /// `u32`
    U32(u32),
    /// `u64`
    U64(u64),
    /// `usize`
    USize(usize),
    /// `f32`
    F32(f32),
    /// `f64`
    F64(f64),
    /// Complex number with `f32` parts
    Complex64(Complex<f32>),
    /// Complex number with `f64` parts
    Complex128(Complex<f64>),
    /// Text
    String(String),
    /// A time-like struct; `None` is the zero instant
    Time(Option<Instant>),
    /// A struct
    Struct(Record),
    /// A growable sequence
    Slice(Vec<Value>),
    /// A fixed-length sequence
    Array(Vec<Value>),
    /// Map entries in insertion order, keys unique
    Map(Vec<(Value, Value)>),
    /// A nullable indirection
    Pointer(Option<Box<Value>>),
    /// An untyped JSON value, for interface-typed elements
    Dynamic(Dynamic),
}

/// An untyped JSON value.
#[derive(Debug, Clone, PartialEq)]
pub enum Dynamic {
    /// `null`
    Null,
    /// `true` / `false`
    Bool(bool),
    /// Any number
    Number(f64),
    /// A string
    String(String),
    /// An array
    Array(Vec<Dynamic>),
    /// An object, keys in insertion order
    Object(Vec<(String, Dynamic)>),
}

/// The fields of a struct value, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// The struct's type identifier
    pub type_identifier: String,
    /// Field values by declared name; embedded structs nest as records
    pub fields: Vec<(String, Value)>,
}

impl Record {
    /// A record of `shape` with every field at its zero value.
    pub fn zero(shape: &Shape, def: &StructDef) -> Record {
        Record {
            type_identifier: shape.type_identifier.clone(),
            fields: def
                .fields
                .iter()
                .map(|f| (f.name.clone(), Value::zero(&f.shape)))
                .collect(),
        }
    }

    /// The value of the field declared as `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Mutable access to the field declared as `name`.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.fields
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Assigns `value` to the field at `path`, a list of field positions
    /// descending through embedded structs. Returns `false` if the path
    /// does not lead to a field.
    pub fn set_path(&mut self, path: &[usize], value: Value) -> bool {
        match path {
            [] => false,
            [last] => match self.fields.get_mut(*last) {
                Some((_, slot)) => {
                    *slot = value;
                    true
                }
                None => false,
            },
            [first, rest @ ..] => match self.fields.get_mut(*first) {
                Some((_, Value::Struct(inner))) => inner.set_path(rest, value),
                _ => false,
            },
        }
    }

    /// Looks up a field by a path of positions.
    pub fn get_path(&self, path: &[usize]) -> Option<&Value> {
        let (first, rest) = path.split_first()?;
        let (_, value) = self.fields.get(*first)?;
        match (rest, value) {
            ([], v) => Some(v),
            (rest, Value::Struct(inner)) => inner.get_path(rest),
            _ => None,
        }
    }
}

impl Value {
    /// The zero value of `shape`: zero numbers, empty text, empty
    /// collections, zero-filled arrays, nil pointers, and records whose
    /// fields are all zero.
    pub fn zero(shape: &Shape) -> Value {
        if shape.is_time_like() {
            return Value::Time(None);
        }
        match &shape.def {
            Def::Scalar(kind) => Value::zero_scalar(*kind),
            Def::Struct(def) => Value::Struct(Record::zero(shape, def)),
            Def::Slice(_) => Value::Slice(Vec::new()),
            Def::Array(a) => Value::Array((0..a.len).map(|_| Value::zero(&a.elem)).collect()),
            Def::Map(_) => Value::Map(Vec::new()),
            Def::Pointer(_) => Value::Pointer(None),
            Def::Opaque(_) => Value::Dynamic(Dynamic::Null),
        }
    }

    /// The zero value of a scalar kind.
    pub fn zero_scalar(kind: ScalarKind) -> Value {
        match kind {
            ScalarKind::Bool => Value::Bool(false),
            ScalarKind::I8 => Value::I8(0),
            ScalarKind::I16 => Value::I16(0),
            ScalarKind::I32 => Value::I32(0),
            ScalarKind::I64 => Value::I64(0),
            ScalarKind::ISize => Value::ISize(0),
            ScalarKind::U8 => Value::U8(0),
            ScalarKind::U16 => Value::U16(0),
            ScalarKind::U32 => Value::U32(0),
            ScalarKind::U64 => Value::U64(0),
            ScalarKind::USize => Value::USize(0),
            ScalarKind::F32 => Value::F32(0.0),
            ScalarKind::F64 => Value::F64(0.0),
            ScalarKind::Complex64 => Value::Complex64(Complex::new(0.0, 0.0)),
            ScalarKind::Complex128 => Value::Complex128(Complex::new(0.0, 0.0)),
            ScalarKind::String => Value::String(String::new()),
        }
    }

    /// The text, for `String` values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// The flag, for `Bool` values.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Any signed integer, widened; unsigned integers that fit.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::I8(v) => Some(v.into()),
            Value::I16(v) => Some(v.into()),
            Value::I32(v) => Some(v.into()),
            Value::I64(v) => Some(v),
            Value::ISize(v) => i64::try_from(v).ok(),
            Value::U8(v) => Some(v.into()),
            Value::U16(v) => Some(v.into()),
            Value::U32(v) => Some(v.into()),
            Value::U64(v) => i64::try_from(v).ok(),
            Value::USize(v) => i64::try_from(v).ok(),
            _ => None,
        }
    }

    /// Any unsigned integer, widened; signed integers that are not negative.
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Value::U8(v) => Some(v.into()),
            Value::U16(v) => Some(v.into()),
            Value::U32(v) => Some(v.into()),
            Value::U64(v) => Some(v),
            Value::USize(v) => u64::try_from(v).ok(),
            Value::I8(_) | Value::I16(_) | Value::I32(_) | Value::I64(_) | Value::ISize(_) => {
                self.as_i64().and_then(|v| u64::try_from(v).ok())
            }
            _ => None,
        }
    }

    /// Either float, widened.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::F32(v) => Some(v.into()),
            Value::F64(v) => Some(v),
            _ => None,
        }
    }

    /// The record, for `Struct` values.
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Struct(r) => Some(r),
            _ => None,
        }
    }

    /// The instant, for `Time` values; `Some(None)` is the zero instant.
    pub fn as_time(&self) -> Option<Option<Instant>> {
        match self {
            Value::Time(t) => Some(*t),
            _ => None,
        }
    }

    /// The elements, for `Slice` and `Array` values.
    pub fn as_elements(&self) -> Option<&[Value]> {
        match self {
            Value::Slice(v) | Value::Array(v) => Some(v),
            _ => None,
        }
    }

    /// The entries, for `Map` values.
    pub fn as_entries(&self) -> Option<&[(Value, Value)]> {
        match self {
            Value::Map(v) => Some(v),
            _ => None,
        }
    }

    /// The pointee, for `Pointer` values; `Some(None)` is a nil pointer.
    pub fn as_pointee(&self) -> Option<Option<&Value>> {
        match self {
            Value::Pointer(p) => Some(p.as_deref()),
            _ => None,
        }
    }

    /// `true` for a nil pointer.
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Pointer(None))
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Value::Struct(record)
    }
}

impl Dynamic {
    /// The object entry under `key`.
    pub fn get(&self, key: &str) -> Option<&Dynamic> {
        match self {
            Dynamic::Object(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }
}
