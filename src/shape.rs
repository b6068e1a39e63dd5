//! Resolved shapes: the immutable type tree every coercion dispatches on.

use std::fmt;
use std::sync::Arc;

use crate::tag::Tag;

/// Primitive kinds a cell can be parsed into directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    /// `bool`
    Bool,
    /// `i8`
    I8,
    /// `i16`
    I16,
    /// `i32`
    I32,
    /// `i64`
    I64,
    /// `isize`
    ISize,
    /// `u8`
    U8,
    /// `u16`
    U16,
    /// `u32`
    U32,
    /// `u64`
    U64,
    /// `usize`
    USize,
    /// `f32`
    F32,
    /// `f64`
    F64,
    /// Complex number with `f32` parts
    Complex64,
    /// Complex number with `f64` parts
    Complex128,
    /// UTF-8 text
    String,
}

impl ScalarKind {
    /// Rust-style name of the type a value of this kind holds.
    pub fn type_identifier(self) -> &'static str {
        match self {
            ScalarKind::Bool => "bool",
            ScalarKind::I8 => "i8",
            ScalarKind::I16 => "i16",
            ScalarKind::I32 => "i32",
            ScalarKind::I64 => "i64",
            ScalarKind::ISize => "isize",
            ScalarKind::U8 => "u8",
            ScalarKind::U16 => "u16",
            ScalarKind::U32 => "u32",
            ScalarKind::U64 => "u64",
            ScalarKind::USize => "usize",
            ScalarKind::F32 => "f32",
            ScalarKind::F64 => "f64",
            ScalarKind::Complex64 => "Complex<f32>",
            ScalarKind::Complex128 => "Complex<f64>",
            ScalarKind::String => "String",
        }
    }

    /// Signed or unsigned integer of any width.
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            ScalarKind::I8
                | ScalarKind::I16
                | ScalarKind::I32
                | ScalarKind::I64
                | ScalarKind::ISize
                | ScalarKind::U8
                | ScalarKind::U16
                | ScalarKind::U32
                | ScalarKind::U64
                | ScalarKind::USize
        )
    }
}

/// Kinds that resolve but can never be coerced into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpaqueKind {
    /// Channel
    Chan,
    /// Function
    Func,
    /// Interface (dynamically typed)
    Interface,
    /// Raw pointer
    UnsafePointer,
}

/// The discriminant of a [`Def`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// A primitive
    Scalar(ScalarKind),
    /// A struct
    Struct,
    /// A growable sequence
    Slice,
    /// A fixed-length sequence
    Array,
    /// A key/value map
    Map,
    /// A nullable indirection
    Pointer,
    /// An unsupported kind
    Opaque(OpaqueKind),
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Scalar(k) => f.write_str(k.type_identifier()),
            Kind::Struct => f.write_str("struct"),
            Kind::Slice => f.write_str("slice"),
            Kind::Array => f.write_str("array"),
            Kind::Map => f.write_str("map"),
            Kind::Pointer => f.write_str("pointer"),
            Kind::Opaque(OpaqueKind::Chan) => f.write_str("channel"),
            Kind::Opaque(OpaqueKind::Func) => f.write_str("function"),
            Kind::Opaque(OpaqueKind::Interface) => f.write_str("interface"),
            Kind::Opaque(OpaqueKind::UnsafePointer) => f.write_str("unsafe pointer"),
        }
    }
}

/// Why a shape counts as a named alias.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Alias {
    /// A named type over a non-struct representation, e.g. `Status` over `u8`
    Repr,
    /// A registered named struct
    Struct,
    /// A registered named struct that represents an instant
    TimeLike,
}

/// A resolved type.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    /// Name of the type, e.g. `u8`, `Vec<String>`, `Status`
    pub type_identifier: String,
    /// Structure of the type
    pub def: Def,
    /// Set when the declared identity differs from the representation
    pub alias: Option<Alias>,
}

impl Shape {
    /// The kind this shape dispatches on.
    pub fn kind(&self) -> Kind {
        self.def.kind()
    }

    /// `true` for any named alias.
    pub fn is_named_alias(&self) -> bool {
        self.alias.is_some()
    }

    /// `true` for a registered time-like struct.
    pub fn is_time_like(&self) -> bool {
        self.alias == Some(Alias::TimeLike)
    }

    /// The struct definition, if this is a struct.
    pub fn struct_def(&self) -> Option<&StructDef> {
        match &self.def {
            Def::Struct(def) => Some(def),
            _ => None,
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.type_identifier)
    }
}

/// The structure of a [`Shape`].
#[derive(Debug, Clone, PartialEq)]
pub enum Def {
    /// A primitive
    Scalar(ScalarKind),
    /// A struct and its fields
    Struct(StructDef),
    /// A growable sequence of the element shape
    Slice(Arc<Shape>),
    /// A fixed-length sequence
    Array(ArrayDef),
    /// A key/value map
    Map(MapDef),
    /// A nullable indirection to the pointee shape
    Pointer(Arc<Shape>),
    /// An unsupported kind
    Opaque(OpaqueKind),
}

impl Def {
    /// The kind discriminant.
    pub fn kind(&self) -> Kind {
        match self {
            Def::Scalar(k) => Kind::Scalar(*k),
            Def::Struct(_) => Kind::Struct,
            Def::Slice(_) => Kind::Slice,
            Def::Array(_) => Kind::Array,
            Def::Map(_) => Kind::Map,
            Def::Pointer(_) => Kind::Pointer,
            Def::Opaque(k) => Kind::Opaque(*k),
        }
    }
}

/// Fields of a struct, in declaration order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StructDef {
    /// The fields
    pub fields: Vec<Field>,
}

/// A fixed-length array.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayDef {
    /// Element shape
    pub elem: Arc<Shape>,
    /// Number of elements
    pub len: usize,
}

/// A map.
#[derive(Debug, Clone, PartialEq)]
pub struct MapDef {
    /// Key shape
    pub key: Arc<Shape>,
    /// Value shape
    pub value: Arc<Shape>,
}

/// A struct field.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Declared name
    pub name: String,
    /// Struct tag
    pub tag: Tag,
    /// The field's shape
    pub shape: Arc<Shape>,
    /// Declared without a name, its fields promoted into the parent
    pub embedded: bool,
}

impl Field {
    /// The key this field uses in JSON objects, or `None` when the field is
    /// skipped (`json:"-"`).
    pub fn json_name(&self) -> Option<&str> {
        let Some(value) = self.tag.lookup("json") else {
            return Some(&self.name);
        };
        let name = match value {
            std::borrow::Cow::Borrowed(v) => v.split(',').next().unwrap_or(""),
            // escapes inside json tag names are not meaningful; fall back
            std::borrow::Cow::Owned(_) => "",
        };
        match name {
            "-" => None,
            "" => Some(&self.name),
            name => Some(name),
        }
    }

    /// `true` when the field's own fields appear directly in the parent JSON
    /// object instead of under a key.
    pub fn is_promoted(&self) -> bool {
        self.embedded
            && self.shape.alias.is_none()
            && matches!(self.shape.def, Def::Struct(_))
            && self
                .tag
                .lookup("json")
                .is_none_or(|v| v.split(',').next().unwrap_or("").is_empty())
    }
}
