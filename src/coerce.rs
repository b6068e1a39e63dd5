//! The coercion entry point: cell text in, a value of the target shape out.

use crate::date::{parse_date, parse_date_strict};
use crate::error::{CoerceError, CoerceErrorKind, PathSegment};
use crate::json;
use crate::scalar::coerce_scalar_with;
use crate::shape::{Alias, Def, Shape};
use crate::value::Value;

/// How lenient coercion is.
///
/// The defaults reproduce the historical behavior: malformed composites and
/// dates fall back to zero values and sentinels, and 32-bit floats read as
/// zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoerceOptions {
    /// Turn silent fallbacks into errors
    pub strict: bool,
    /// Every non-empty `f32` cell reads as `0.0`
    pub float32_quirk: bool,
}

impl Default for CoerceOptions {
    fn default() -> Self {
        CoerceOptions {
            strict: false,
            float32_quirk: true,
        }
    }
}

impl CoerceOptions {
    /// Sets strict mode.
    ///
    /// In strict mode slice, array and map cells that are not JSON fail with
    /// [`CoerceErrorKind::InvalidJson`], time cells matching no layout fail
    /// with [`CoerceErrorKind::UnrecognizedDate`], and `bool` cells other than
    /// `"true"`, `"false"` and `""` fail with [`CoerceErrorKind::ParseFailure`].
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Sets whether non-empty `f32` cells read as `0.0`.
    pub fn float32_quirk(mut self, quirk: bool) -> Self {
        self.float32_quirk = quirk;
        self
    }
}

/// Coerces cell text into values, with fixed options.
#[derive(Debug, Clone, Copy, Default)]
pub struct Coercer {
    options: CoerceOptions,
}

impl Coercer {
    /// A coercer using `options`.
    pub fn new(options: CoerceOptions) -> Self {
        Coercer { options }
    }

    /// The options in effect.
    pub fn options(&self) -> &CoerceOptions {
        &self.options
    }

    /// Coerces `text` into a value of `shape`.
    pub fn coerce(&self, shape: &Shape, text: &str) -> Result<Value, CoerceError> {
        log::trace!("coerce: shape={shape} alias={:?} text={text:?}", shape.alias);
        match shape.alias {
            Some(Alias::TimeLike) => self.coerce_time(shape, text),
            Some(Alias::Struct) => self.coerce_named_struct(shape, text),
            Some(Alias::Repr) | None => self.coerce_def(shape, text),
        }
    }

    fn coerce_time(&self, shape: &Shape, text: &str) -> Result<Value, CoerceError> {
        if json::is_valid(text) {
            return json::decode(shape, text);
        }
        if !self.options.strict {
            return Ok(Value::Time(Some(parse_date(text))));
        }
        parse_date_strict(text)
            .map(|instant| Value::Time(Some(instant)))
            .ok_or_else(|| {
                CoerceError::new(CoerceErrorKind::UnrecognizedDate {
                    text: text.to_string(),
                })
            })
    }

    /// Named structs check JSON validity up front; plain structs do not.
    fn coerce_named_struct(&self, shape: &Shape, text: &str) -> Result<Value, CoerceError> {
        if text.is_empty() {
            return Ok(Value::zero(shape));
        }
        if !json::is_valid(text) {
            return Err(CoerceError::new(CoerceErrorKind::NotJsonFormat {
                text: text.to_string(),
                type_identifier: shape.type_identifier.clone(),
            }));
        }
        json::decode(shape, text)
    }

    fn coerce_def(&self, shape: &Shape, text: &str) -> Result<Value, CoerceError> {
        match &shape.def {
            Def::Scalar(kind) => coerce_scalar_with(*kind, text, &self.options),
            Def::Struct(_) => {
                if text.is_empty() {
                    return Ok(Value::zero(shape));
                }
                json::decode(shape, text)
            }
            Def::Slice(_) | Def::Array(_) | Def::Map(_) => {
                if text.is_empty() {
                    return Ok(Value::zero(shape));
                }
                if json::is_valid(text) {
                    return json::decode(shape, text);
                }
                if self.options.strict {
                    return Err(CoerceError::new(CoerceErrorKind::InvalidJson {
                        text: text.to_string(),
                        type_identifier: shape.type_identifier.clone(),
                    }));
                }
                log::trace!("coerce: {text:?} is not JSON, using the zero {shape}");
                Ok(Value::zero(shape))
            }
            Def::Pointer(pointee) => {
                if text.is_empty() || text == "null" {
                    return Ok(Value::Pointer(None));
                }
                let value = self
                    .coerce(pointee, text)
                    .map_err(|e| e.with_path(PathSegment::Deref))?;
                Ok(Value::Pointer(Some(Box::new(value))))
            }
            Def::Opaque(_) => Err(CoerceError::new(CoerceErrorKind::UnsupportedKind {
                kind: shape.kind(),
            })),
        }
    }
}

/// Coerces `text` into a value of `shape` with the default options.
///
/// ```
/// use cellcast::{coerce, resolve_shape, TypeDesc, Value};
///
/// let shape = resolve_shape(&TypeDesc::slice(TypeDesc::i32()));
/// assert_eq!(
///     coerce(&shape, "[1, -2]").unwrap(),
///     Value::Slice(vec![Value::I32(1), Value::I32(-2)])
/// );
/// assert_eq!(coerce(&shape, "not json").unwrap(), Value::Slice(vec![]));
/// ```
pub fn coerce(shape: &Shape, text: &str) -> Result<Value, CoerceError> {
    Coercer::default().coerce(shape, text)
}
