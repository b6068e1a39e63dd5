#![warn(missing_docs)]
#![forbid(unsafe_code)]
//! Materialize typed values from spreadsheet cell text.
//!
//! A target type is declared as a [`TypeDesc`] and resolved once into a
//! shared [`Shape`]. Cell text is then coerced into a [`Value`] of that shape:
//! scalars are parsed at their exact width, time-like cells go through a
//! chain of date layouts, and composites (structs, slices, arrays, maps) are
//! read from JSON.
//!
//! ```
//! use cellcast::{coerce, resolve_shape, StructDesc, TypeDesc, Value};
//!
//! let point = resolve_shape(&TypeDesc::structure(
//!     StructDesc::new("Point")
//!         .field("X", r#"json:"x""#, TypeDesc::i32())
//!         .field("Y", r#"json:"y""#, TypeDesc::i32()),
//! ));
//!
//! let value = coerce(&point, r#"{"x": 3, "y": -4}"#).unwrap();
//! let record = value.as_record().unwrap();
//! assert_eq!(record.get("X"), Some(&Value::I32(3)));
//! assert_eq!(record.get("Y"), Some(&Value::I32(-4)));
//! ```
//!
//! Whole sheets are read with a [`Reader`], which maps column titles onto
//! fields through a [`FieldIndex`]:
//!
//! ```
//! use cellcast::{grid, resolve_shape, Reader, Sheet, StructDesc, TypeDesc, Value};
//!
//! let user = resolve_shape(&TypeDesc::structure(
//!     StructDesc::new("User")
//!         .field("Id", "", TypeDesc::u32())
//!         .field("Name", "", TypeDesc::string()),
//! ));
//! let sheet = Sheet::from_grid(grid(&[&["Id", "Name"], &["7", "ada"]]), true).unwrap();
//!
//! let out = Reader::default().materialize(&user, &sheet).unwrap();
//! assert!(out.errors.is_empty());
//! assert_eq!(out.records[0].get("Id"), Some(&Value::U32(7)));
//! ```
//!
//! # Testing
//!
//! The integration tests install a logger through `facet-testhelpers`, which
//! can only happen once per process. Run them with `cargo nextest run`.

mod coerce;
mod date;
mod desc;
mod error;
mod index;
mod json;
mod reader;
mod resolve;
mod scalar;
mod serialize;
mod shape;
mod sheet;
mod span;
mod tag;
mod tokenizer;
mod value;

pub use coerce::{CoerceOptions, Coercer, coerce};
pub use date::{DateSentinel, LAYOUTS, ZERO_DATE_TEXT, parse_date, sentinel_of, try_parse_date};
pub use desc::{FieldDesc, StructDesc, TypeDesc};
pub use error::{CoerceError, CoerceErrorKind, DecodeErrorKind, PathSegment};
pub use index::{
    DEFAULT_TAG_NAME, FieldDescriptor, FieldIndex, IndexOptions, KeySource, build_field_index,
    flatten, flatten_with,
};
pub use json::{decode as decode_json, is_valid as is_valid_json};
pub use reader::{CellError, Materialized, Reader, ReaderConfig, ReaderError};
pub use resolve::{Registry, ShapeCache, resolve_shape};
pub use scalar::{coerce_scalar, coerce_scalar_with};
pub use serialize::{
    CELL_TIME_LAYOUT, JsonWrite, render_cell, to_json_string, to_json_string_pretty, to_writer,
    to_writer_pretty,
};
pub use shape::{Alias, ArrayDef, Def, Field, Kind, MapDef, OpaqueKind, ScalarKind, Shape, StructDef};
pub use sheet::{Sheet, SheetError, grid};
pub use span::{Pos, Span};
pub use tag::Tag;
pub use tokenizer::{TokenError, TokenErrorKind};
pub use value::{Dynamic, Instant, Record, Value};
