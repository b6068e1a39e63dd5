//! Declared type descriptors, the input to shape resolution.
//!
//! A [`TypeDesc`] describes a target type the way it was declared: names,
//! tags and embedding included. [`Registry::resolve`](crate::Registry::resolve)
//! turns it into a [`Shape`](crate::Shape).
//!
//! ```
//! use cellcast::{StructDesc, TypeDesc};
//!
//! let point = TypeDesc::structure(
//!     StructDesc::new("Point")
//!         .field("X", r#"json:"x""#, TypeDesc::f64())
//!         .field("Y", r#"json:"y""#, TypeDesc::f64()),
//! );
//! let status = TypeDesc::named("Status", TypeDesc::u8());
//! # let _ = (point, status);
//! ```

use crate::shape::{OpaqueKind, ScalarKind};

/// A declared type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeDesc {
    /// A primitive
    Scalar(ScalarKind),
    /// A named type over some representation
    Named {
        /// The declared name
        name: String,
        /// The underlying representation
        repr: Box<TypeDesc>,
    },
    /// A struct literal
    Struct(StructDesc),
    /// A growable sequence
    Slice(Box<TypeDesc>),
    /// A fixed-length sequence
    Array(Box<TypeDesc>, usize),
    /// A key/value map
    Map(Box<TypeDesc>, Box<TypeDesc>),
    /// A nullable indirection
    Pointer(Box<TypeDesc>),
    /// A kind that is never coerced into
    Opaque(OpaqueKind),
}

macro_rules! scalar_ctors {
    ($($fn_name:ident => $kind:ident),* $(,)?) => {
        $(
            #[doc = concat!("The `", stringify!($fn_name), "` descriptor.")]
            pub fn $fn_name() -> Self {
                TypeDesc::Scalar(ScalarKind::$kind)
            }
        )*
    };
}

impl TypeDesc {
    scalar_ctors! {
        bool => Bool,
        i8 => I8,
        i16 => I16,
        i32 => I32,
        i64 => I64,
        isize => ISize,
        u8 => U8,
        u16 => U16,
        u32 => U32,
        u64 => U64,
        usize => USize,
        f32 => F32,
        f64 => F64,
        complex64 => Complex64,
        complex128 => Complex128,
        string => String,
    }

    /// A named type over `repr`.
    pub fn named(name: impl Into<String>, repr: TypeDesc) -> Self {
        TypeDesc::Named {
            name: name.into(),
            repr: Box::new(repr),
        }
    }

    /// A struct.
    pub fn structure(desc: StructDesc) -> Self {
        TypeDesc::Struct(desc)
    }

    /// The instant type, `Time`, registered as time-like by default.
    pub fn time() -> Self {
        TypeDesc::named("Time", TypeDesc::Struct(StructDesc::anonymous()))
    }

    /// `Vec<elem>`
    pub fn slice(elem: TypeDesc) -> Self {
        TypeDesc::Slice(Box::new(elem))
    }

    /// `[elem; len]`
    pub fn array(elem: TypeDesc, len: usize) -> Self {
        TypeDesc::Array(Box::new(elem), len)
    }

    /// `Map<key, value>`
    pub fn map(key: TypeDesc, value: TypeDesc) -> Self {
        TypeDesc::Map(Box::new(key), Box::new(value))
    }

    /// A pointer to `pointee`.
    pub fn pointer(pointee: TypeDesc) -> Self {
        TypeDesc::Pointer(Box::new(pointee))
    }

    /// A kind that resolves but is never coerced into.
    pub fn opaque(kind: OpaqueKind) -> Self {
        TypeDesc::Opaque(kind)
    }
}

/// A struct literal: an optional name and its fields in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct StructDesc {
    /// The declared name; `None` for anonymous structs
    pub name: Option<String>,
    /// The fields
    pub fields: Vec<FieldDesc>,
}

impl StructDesc {
    /// A named struct with no fields yet.
    pub fn new(name: impl Into<String>) -> Self {
        StructDesc {
            name: Some(name.into()),
            fields: Vec::new(),
        }
    }

    /// An anonymous struct with no fields yet.
    pub fn anonymous() -> Self {
        StructDesc::default()
    }

    /// Adds a named field.
    pub fn field(mut self, name: impl Into<String>, tag: impl Into<String>, ty: TypeDesc) -> Self {
        self.fields.push(FieldDesc {
            name: name.into(),
            tag: tag.into(),
            ty,
            embedded: false,
        });
        self
    }

    /// Adds an embedded field. Its name is the embedded type's name.
    pub fn embed(mut self, name: impl Into<String>, tag: impl Into<String>, ty: TypeDesc) -> Self {
        self.fields.push(FieldDesc {
            name: name.into(),
            tag: tag.into(),
            ty,
            embedded: true,
        });
        self
    }
}

/// A declared struct field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldDesc {
    /// Declared name
    pub name: String,
    /// Raw tag text
    pub tag: String,
    /// Declared type
    pub ty: TypeDesc,
    /// Declared without a name
    pub embedded: bool,
}
