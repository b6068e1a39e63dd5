//! Parsing cell text into primitive values.

use std::fmt::Display;
use std::str::FromStr;

use lexical_parse_float::FromLexical as _;
use lexical_parse_integer::FromLexical as _;
use num_complex::Complex;

use crate::coerce::CoerceOptions;
use crate::error::{CoerceError, CoerceErrorKind};
use crate::shape::ScalarKind;
use crate::value::Value;

/// Coerces `text` into a scalar of `kind` with the default options.
///
/// Empty text is the kind's zero value. Numbers are parsed at their exact
/// width; `bool` is `true` only for the text `"true"`.
pub fn coerce_scalar(kind: ScalarKind, text: &str) -> Result<Value, CoerceError> {
    coerce_scalar_with(kind, text, &CoerceOptions::default())
}

/// Coerces `text` into a scalar of `kind`.
pub fn coerce_scalar_with(
    kind: ScalarKind,
    text: &str,
    options: &CoerceOptions,
) -> Result<Value, CoerceError> {
    log::trace!("coerce_scalar: kind={kind:?} text={text:?}");
    let bytes = text.as_bytes();
    let value = match kind {
        ScalarKind::String => Value::String(text.to_string()),
        ScalarKind::Bool => parse_bool(text, options)?,
        _ if text.is_empty() => Value::zero_scalar(kind),
        ScalarKind::I8 => Value::I8(i8::from_lexical(bytes).map_err(|e| failure(text, e))?),
        ScalarKind::I16 => Value::I16(i16::from_lexical(bytes).map_err(|e| failure(text, e))?),
        ScalarKind::I32 => Value::I32(i32::from_lexical(bytes).map_err(|e| failure(text, e))?),
        ScalarKind::I64 => Value::I64(i64::from_lexical(bytes).map_err(|e| failure(text, e))?),
        ScalarKind::ISize => {
            Value::ISize(isize::from_lexical(bytes).map_err(|e| failure(text, e))?)
        }
        ScalarKind::U8 => Value::U8(u8::from_lexical(bytes).map_err(|e| failure(text, e))?),
        ScalarKind::U16 => Value::U16(u16::from_lexical(bytes).map_err(|e| failure(text, e))?),
        ScalarKind::U32 => Value::U32(u32::from_lexical(bytes).map_err(|e| failure(text, e))?),
        ScalarKind::U64 => Value::U64(u64::from_lexical(bytes).map_err(|e| failure(text, e))?),
        ScalarKind::USize => {
            Value::USize(usize::from_lexical(bytes).map_err(|e| failure(text, e))?)
        }
        ScalarKind::F32 if options.float32_quirk => {
            // historical behavior: every non-empty f32 cell reads as zero
            log::trace!("coerce_scalar: f32 quirk discards {text:?}");
            Value::F32(0.0)
        }
        ScalarKind::F32 => Value::F32(f32::from_lexical(bytes).map_err(|e| failure(text, e))?),
        ScalarKind::F64 => Value::F64(f64::from_lexical(bytes).map_err(|e| failure(text, e))?),
        ScalarKind::Complex64 => Value::Complex64(parse_complex::<f32>(text)?),
        ScalarKind::Complex128 => Value::Complex128(parse_complex::<f64>(text)?),
    };
    Ok(value)
}

fn parse_bool(text: &str, options: &CoerceOptions) -> Result<Value, CoerceError> {
    match text {
        "true" => Ok(Value::Bool(true)),
        "false" | "" => Ok(Value::Bool(false)),
        _ if options.strict => Err(CoerceError::new(CoerceErrorKind::ParseFailure {
            text: text.to_string(),
            message: "expected \"true\" or \"false\"".to_string(),
        })),
        _ => Ok(Value::Bool(false)),
    }
}

/// Parses `a+bi` forms, optionally wrapped in parentheses.
fn parse_complex<T>(text: &str) -> Result<Complex<T>, CoerceError>
where
    Complex<T>: FromStr<Err: Display>,
{
    let inner = text
        .strip_prefix('(')
        .and_then(|t| t.strip_suffix(')'))
        .unwrap_or(text);
    inner.parse::<Complex<T>>().map_err(|e| failure(text, e))
}

fn failure(text: &str, err: impl Display) -> CoerceError {
    CoerceError::new(CoerceErrorKind::ParseFailure {
        text: text.to_string(),
        message: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_width_rejects_overflow() {
        assert_eq!(coerce_scalar(ScalarKind::I8, "127").unwrap(), Value::I8(127));
        let err = coerce_scalar(ScalarKind::I8, "128").unwrap_err();
        assert_eq!(err.kind.code(), "cellcast::parse_failure");
    }

    #[test]
    fn complex_accepts_parentheses() {
        assert_eq!(
            coerce_scalar(ScalarKind::Complex128, "(1+2i)").unwrap(),
            Value::Complex128(Complex::new(1.0, 2.0))
        );
        assert_eq!(
            coerce_scalar(ScalarKind::Complex64, "3").unwrap(),
            Value::Complex64(Complex::new(3.0, 0.0))
        );
    }
}
