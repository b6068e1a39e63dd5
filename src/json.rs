//! Recursive descent decoder for JSON payloads in composite cells.

use std::borrow::Cow;
use std::collections::HashMap;
use std::collections::hash_map::Entry;

use lexical_parse_float::FromLexical as _;
use lexical_parse_integer::FromLexical as _;

use crate::date::parse_date_strict;
use crate::error::{CoerceError, DecodeErrorKind, PathSegment};
use crate::serialize::integer_text;
use crate::shape::{ArrayDef, Def, MapDef, OpaqueKind, ScalarKind, Shape, StructDef};
use crate::span::{Span, Spanned};
use crate::tokenizer::{Number, Token, Tokenizer};
use crate::value::{Dynamic, Record, Value};

type Result<T> = std::result::Result<T, CoerceError>;

/// Objects and arrays nested deeper than this are rejected.
const MAX_DEPTH: usize = 512;

// ============================================================================
// Struct field lookup
// ============================================================================

/// A JSON key a struct accepts, and where its value lands in the record.
struct Target<'s> {
    name: &'s str,
    declared: &'s str,
    shape: &'s Shape,
    path: Vec<usize>,
    depth: usize,
}

/// Collects the keys of `def`, promoting the fields of untagged embedded
/// structs into the parent object.
fn collect_targets<'s>(def: &'s StructDef, prefix: &[usize], out: &mut Vec<Target<'s>>) {
    for (i, field) in def.fields.iter().enumerate() {
        let mut path = prefix.to_vec();
        path.push(i);
        if field.is_promoted() {
            if let Def::Struct(inner) = &field.shape.def {
                collect_targets(inner, &path, out);
                continue;
            }
        }
        if let Some(name) = field.json_name() {
            out.push(Target {
                name,
                declared: &field.name,
                shape: &field.shape,
                path,
                depth: prefix.len(),
            });
        }
    }
}

/// Exact match first, then ASCII case-insensitive. The shallowest field wins
/// and ties go to the first declared.
fn find_target<'t, 's>(targets: &'t [Target<'s>], key: &str) -> Option<&'t Target<'s>> {
    shallowest(targets, |t| t.name == key)
        .or_else(|| shallowest(targets, |t| t.name.eq_ignore_ascii_case(key)))
}

fn shallowest<'t, 's>(
    targets: &'t [Target<'s>],
    matches: impl Fn(&Target<'s>) -> bool,
) -> Option<&'t Target<'s>> {
    targets
        .iter()
        .filter(|t| matches(t))
        .min_by_key(|t| t.depth)
}

fn token_category(token: &Token<'_>) -> &'static str {
    match token {
        Token::LBrace => "object",
        Token::LBracket => "array",
        Token::String(_) => "string",
        Token::Number(_) => "number",
        Token::True | Token::False => "boolean",
        Token::Null => "null",
        Token::RBrace | Token::RBracket | Token::Colon | Token::Comma => "punctuation",
        Token::Eof => "end of input",
    }
}

// ============================================================================
// Decoder
// ============================================================================

/// JSON decoder producing [`Value`]s shaped by a [`Shape`].
pub(crate) struct JsonDecoder<'input> {
    tokenizer: Tokenizer<'input>,
    /// Peeked token (for lookahead)
    peeked: Option<Spanned<Token<'input>>>,
    depth: usize,
}

impl<'input> JsonDecoder<'input> {
    pub fn new(input: &'input str) -> Self {
        JsonDecoder {
            tokenizer: Tokenizer::new(input),
            peeked: None,
            depth: 0,
        }
    }

    /// Peek at the next token without consuming it.
    fn peek(&mut self) -> Result<&Spanned<Token<'input>>> {
        let token = match self.peeked.take() {
            Some(token) => token,
            None => self.tokenizer.next_token()?,
        };
        Ok(&*self.peeked.insert(token))
    }

    /// Consume and return the next token.
    fn next(&mut self) -> Result<Spanned<Token<'input>>> {
        match self.peeked.take() {
            Some(token) => Ok(token),
            None => Ok(self.tokenizer.next_token()?),
        }
    }

    /// Consume the next token, which must be `expected`.
    fn expect(&mut self, expected: Token<'static>, name: &'static str) -> Result<Span> {
        let token = self.next()?;
        if token.node == expected {
            Ok(token.span)
        } else {
            Err(unexpected(&token, name))
        }
    }

    fn enter(&mut self, span: Span) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(CoerceError::at(DecodeErrorKind::TooDeep.into(), span));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    /// Whether the next token closes the current container, consuming it if so.
    fn eat_close(&mut self, close: &Token<'static>) -> Result<bool> {
        if self.peek()?.node == *close {
            self.next()?;
            return Ok(true);
        }
        Ok(false)
    }

    /// After an element: a comma continues, `close` ends the container.
    fn after_element(&mut self, close: Token<'static>, expected: &'static str) -> Result<bool> {
        let token = self.next()?;
        match &token.node {
            Token::Comma => Ok(true),
            node if *node == close => Ok(false),
            _ => Err(unexpected(&token, expected)),
        }
    }

    /// Skip a JSON value, checking its grammar.
    pub fn skip_value(&mut self) -> Result<Span> {
        let token = self.next()?;
        let span = token.span;
        match token.node {
            Token::LBrace => {
                self.enter(span)?;
                if !self.eat_close(&Token::RBrace)? {
                    loop {
                        let key = self.next()?;
                        if !matches!(key.node, Token::String(_)) {
                            return Err(unexpected(&key, "string key"));
                        }
                        self.expect(Token::Colon, "':'")?;
                        self.skip_value()?;
                        if !self.after_element(Token::RBrace, "',' or '}'")? {
                            break;
                        }
                    }
                }
                self.leave();
            }
            Token::LBracket => {
                self.enter(span)?;
                if !self.eat_close(&Token::RBracket)? {
                    loop {
                        self.skip_value()?;
                        if !self.after_element(Token::RBracket, "',' or ']'")? {
                            break;
                        }
                    }
                }
                self.leave();
            }
            Token::String(_) | Token::Number(_) | Token::True | Token::False | Token::Null => {}
            _ => return Err(unexpected(&token, "value")),
        }
        Ok(span)
    }

    /// Require that nothing but whitespace follows the root value.
    pub fn finish(&mut self) -> Result<()> {
        let trailing = self.next()?;
        if trailing.node != Token::Eof {
            return Err(unexpected(&trailing, "end of input"));
        }
        Ok(())
    }

    /// Decode one value of `shape`.
    pub fn decode_value(&mut self, shape: &Shape) -> Result<Value> {
        log::trace!("decode_value: shape={shape}");

        if matches!(self.peek()?.node, Token::Null) {
            self.next()?;
            return Ok(Value::zero(shape));
        }
        if shape.is_time_like() {
            return self.decode_time(shape);
        }

        match &shape.def {
            Def::Scalar(kind) => self.decode_scalar(*kind),
            Def::Struct(def) => self.decode_struct(shape, def).map(Value::Struct),
            Def::Slice(elem) => self.decode_list(elem).map(Value::Slice),
            Def::Array(array) => self.decode_array(array).map(Value::Array),
            Def::Map(map) => self.decode_map(map).map(Value::Map),
            Def::Pointer(pointee) => {
                let value = self
                    .decode_value(pointee)
                    .map_err(|e| e.with_path(PathSegment::Deref))?;
                Ok(Value::Pointer(Some(Box::new(value))))
            }
            Def::Opaque(OpaqueKind::Interface) => self.decode_dynamic().map(Value::Dynamic),
            Def::Opaque(_) => {
                let token = self.next()?;
                Err(CoerceError::at(
                    DecodeErrorKind::NotDecodable {
                        type_identifier: shape.type_identifier.clone(),
                    }
                    .into(),
                    token.span,
                ))
            }
        }
    }

    /// A time is a string: RFC 3339 first, then the cell date layouts.
    /// Strings matching neither are decode errors, in strict mode or not.
    fn decode_time(&mut self, shape: &Shape) -> Result<Value> {
        log::trace!("decode_time");
        let token = self.next()?;
        let Token::String(text) = &token.node else {
            return Err(mismatch(&shape.type_identifier, &token));
        };
        if let Ok(instant) = chrono::DateTime::parse_from_rfc3339(text) {
            return Ok(Value::Time(Some(instant)));
        }
        match parse_date_strict(text) {
            Some(instant) => Ok(Value::Time(Some(instant))),
            None => Err(CoerceError::at(
                DecodeErrorKind::InvalidTime {
                    text: text.to_string(),
                }
                .into(),
                token.span,
            )),
        }
    }

    fn decode_scalar(&mut self, kind: ScalarKind) -> Result<Value> {
        log::trace!("decode_scalar: {kind:?}");
        let token = self.next()?;
        let target = kind.type_identifier();

        let value = match (kind, &token.node) {
            (ScalarKind::String, Token::String(s)) => Value::String(s.to_string()),
            (ScalarKind::Bool, Token::True) => Value::Bool(true),
            (ScalarKind::Bool, Token::False) => Value::Bool(false),
            (ScalarKind::Complex64 | ScalarKind::Complex128, _) => {
                return Err(CoerceError::at(
                    DecodeErrorKind::NotDecodable {
                        type_identifier: target.to_string(),
                    }
                    .into(),
                    token.span,
                ));
            }
            (kind, Token::Number(n)) if kind.is_integer() => {
                if !n.integral {
                    return Err(CoerceError::at(
                        DecodeErrorKind::TypeMismatch {
                            expected: target.to_string(),
                            got: "fractional number",
                        }
                        .into(),
                        token.span,
                    ));
                }
                parse_integer(kind, n).ok_or_else(|| out_of_range(n, target, token.span))?
            }
            (ScalarKind::F32, Token::Number(n)) => {
                let v = f32::from_lexical(n.text.as_bytes())
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| out_of_range(n, target, token.span))?;
                Value::F32(v)
            }
            (ScalarKind::F64, Token::Number(n)) => {
                let v = f64::from_lexical(n.text.as_bytes())
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| out_of_range(n, target, token.span))?;
                Value::F64(v)
            }
            _ => return Err(mismatch(target, &token)),
        };
        Ok(value)
    }

    fn decode_struct(&mut self, shape: &Shape, def: &StructDef) -> Result<Record> {
        log::trace!("decode_struct: {shape}");

        let token = self.next()?;
        if !matches!(token.node, Token::LBrace) {
            return Err(mismatch(&shape.type_identifier, &token));
        }
        self.enter(token.span)?;

        let mut targets = Vec::new();
        collect_targets(def, &[], &mut targets);
        let mut record = Record::zero(shape, def);

        if !self.eat_close(&Token::RBrace)? {
            loop {
                let key_token = self.next()?;
                let Token::String(key) = key_token.node else {
                    return Err(unexpected(&key_token, "string key"));
                };
                self.expect(Token::Colon, "':'")?;

                match find_target(&targets, &key) {
                    Some(target) => {
                        let value = self
                            .decode_value(target.shape)
                            .map_err(|e| e.with_path(PathSegment::Field(target.declared.into())))?;
                        record.set_path(&target.path, value);
                    }
                    None => {
                        log::trace!("decode_struct: skipping unknown key {key:?}");
                        self.skip_value()?;
                    }
                }

                if !self.after_element(Token::RBrace, "',' or '}'")? {
                    break;
                }
            }
        }

        self.leave();
        Ok(record)
    }

    fn decode_list(&mut self, elem: &Shape) -> Result<Vec<Value>> {
        log::trace!("decode_list: Vec<{elem}>");

        let token = self.next()?;
        if !matches!(token.node, Token::LBracket) {
            return Err(mismatch(&format!("Vec<{elem}>"), &token));
        }
        self.enter(token.span)?;

        let mut items = Vec::new();
        if !self.eat_close(&Token::RBracket)? {
            loop {
                let index = items.len();
                let item = self
                    .decode_value(elem)
                    .map_err(|e| e.with_path(PathSegment::Index(index)))?;
                items.push(item);
                if !self.after_element(Token::RBracket, "',' or ']'")? {
                    break;
                }
            }
        }

        self.leave();
        Ok(items)
    }

    /// Excess elements are checked and dropped, missing ones stay zero.
    fn decode_array(&mut self, array: &ArrayDef) -> Result<Vec<Value>> {
        log::trace!("decode_array: [{}; {}]", array.elem, array.len);

        let token = self.next()?;
        if !matches!(token.node, Token::LBracket) {
            return Err(mismatch(&format!("[{}; {}]", array.elem, array.len), &token));
        }
        self.enter(token.span)?;

        let mut items = Vec::with_capacity(array.len);
        if !self.eat_close(&Token::RBracket)? {
            let mut index = 0;
            loop {
                if index < array.len {
                    let item = self
                        .decode_value(&array.elem)
                        .map_err(|e| e.with_path(PathSegment::Index(index)))?;
                    items.push(item);
                } else {
                    self.skip_value()?;
                }
                index += 1;
                if !self.after_element(Token::RBracket, "',' or ']'")? {
                    break;
                }
            }
        }
        while items.len() < array.len {
            items.push(Value::zero(&array.elem));
        }

        self.leave();
        Ok(items)
    }

    /// Later duplicates of a key overwrite earlier ones in place.
    fn decode_map(&mut self, map: &MapDef) -> Result<Vec<(Value, Value)>> {
        log::trace!("decode_map: Map<{}, {}>", map.key, map.value);

        let token = self.next()?;
        if !matches!(token.node, Token::LBrace) {
            return Err(mismatch(&format!("Map<{}, {}>", map.key, map.value), &token));
        }
        self.enter(token.span)?;

        let mut entries: Vec<(Value, Value)> = Vec::new();
        let mut slots: HashMap<String, usize> = HashMap::new();
        if !self.eat_close(&Token::RBrace)? {
            loop {
                let key_token = self.next()?;
                let Token::String(key_text) = key_token.node else {
                    return Err(unexpected(&key_token, "string key"));
                };
                let key = decode_key(&map.key, &key_text, key_token.span)?;
                self.expect(Token::Colon, "':'")?;

                let value = self
                    .decode_value(&map.value)
                    .map_err(|e| e.with_path(PathSegment::Key(key_text.to_string())))?;
                let slot_key = match &key {
                    Value::String(s) => s.clone(),
                    other => integer_text(other).unwrap_or_default(),
                };
                match slots.entry(slot_key) {
                    Entry::Occupied(slot) => entries[*slot.get()].1 = value,
                    Entry::Vacant(slot) => {
                        slot.insert(entries.len());
                        entries.push((key, value));
                    }
                }

                if !self.after_element(Token::RBrace, "',' or '}'")? {
                    break;
                }
            }
        }

        self.leave();
        Ok(entries)
    }

    /// Untyped decoding for interface-typed elements.
    fn decode_dynamic(&mut self) -> Result<Dynamic> {
        let token = self.next()?;
        let value = match token.node {
            Token::Null => Dynamic::Null,
            Token::True => Dynamic::Bool(true),
            Token::False => Dynamic::Bool(false),
            Token::String(s) => Dynamic::String(s.into_owned()),
            Token::Number(n) => Dynamic::Number(
                f64::from_lexical(n.text.as_bytes())
                    .map_err(|_| out_of_range(&n, "f64", token.span))?,
            ),
            Token::LBracket => {
                self.enter(token.span)?;
                let mut items = Vec::new();
                if !self.eat_close(&Token::RBracket)? {
                    loop {
                        let index = items.len();
                        let item = self
                            .decode_dynamic()
                            .map_err(|e| e.with_path(PathSegment::Index(index)))?;
                        items.push(item);
                        if !self.after_element(Token::RBracket, "',' or ']'")? {
                            break;
                        }
                    }
                }
                self.leave();
                Dynamic::Array(items)
            }
            Token::LBrace => {
                self.enter(token.span)?;
                let mut entries: Vec<(String, Dynamic)> = Vec::new();
                let mut slots: HashMap<String, usize> = HashMap::new();
                if !self.eat_close(&Token::RBrace)? {
                    loop {
                        let key_token = self.next()?;
                        let Token::String(key) = key_token.node else {
                            return Err(unexpected(&key_token, "string key"));
                        };
                        self.expect(Token::Colon, "':'")?;
                        let value = self
                            .decode_dynamic()
                            .map_err(|e| e.with_path(PathSegment::Key(key.to_string())))?;
                        match slots.entry(key.to_string()) {
                            Entry::Occupied(slot) => entries[*slot.get()].1 = value,
                            Entry::Vacant(slot) => {
                                slot.insert(entries.len());
                                entries.push((key.into_owned(), value));
                            }
                        }
                        if !self.after_element(Token::RBrace, "',' or '}'")? {
                            break;
                        }
                    }
                }
                self.leave();
                Dynamic::Object(entries)
            }
            _ => return Err(unexpected(&token, "value")),
        };
        Ok(value)
    }
}

fn parse_integer(kind: ScalarKind, n: &Number<'_>) -> Option<Value> {
    let bytes = n.text.as_bytes();
    let value = match kind {
        ScalarKind::I8 => Value::I8(i8::from_lexical(bytes).ok()?),
        ScalarKind::I16 => Value::I16(i16::from_lexical(bytes).ok()?),
        ScalarKind::I32 => Value::I32(i32::from_lexical(bytes).ok()?),
        ScalarKind::I64 => Value::I64(i64::from_lexical(bytes).ok()?),
        ScalarKind::ISize => Value::ISize(isize::from_lexical(bytes).ok()?),
        ScalarKind::U8 => Value::U8(u8::from_lexical(bytes).ok()?),
        ScalarKind::U16 => Value::U16(u16::from_lexical(bytes).ok()?),
        ScalarKind::U32 => Value::U32(u32::from_lexical(bytes).ok()?),
        ScalarKind::U64 => Value::U64(u64::from_lexical(bytes).ok()?),
        ScalarKind::USize => Value::USize(usize::from_lexical(bytes).ok()?),
        _ => return None,
    };
    Some(value)
}

/// Map keys are object keys: text for string keys, parsed for integer keys.
fn decode_key(shape: &Shape, text: &Cow<'_, str>, span: Span) -> Result<Value> {
    let invalid = || {
        CoerceError::at(
            DecodeErrorKind::InvalidKey {
                key: text.to_string(),
                target_type: shape.type_identifier.clone(),
            }
            .into(),
            span,
        )
    };
    match &shape.def {
        Def::Scalar(ScalarKind::String) => Ok(Value::String(text.to_string())),
        Def::Scalar(kind) if kind.is_integer() => {
            let n = Number {
                text: &**text,
                integral: true,
            };
            parse_integer(*kind, &n).ok_or_else(invalid)
        }
        _ => Err(invalid()),
    }
}

fn unexpected(token: &Spanned<Token<'_>>, expected: &'static str) -> CoerceError {
    CoerceError::at(
        DecodeErrorKind::UnexpectedToken {
            got: token.node.to_string(),
            expected,
        }
        .into(),
        token.span,
    )
}

fn mismatch(expected: &str, token: &Spanned<Token<'_>>) -> CoerceError {
    if matches!(token.node, Token::RBrace | Token::RBracket | Token::Colon | Token::Comma | Token::Eof) {
        return unexpected(token, "value");
    }
    CoerceError::at(
        DecodeErrorKind::TypeMismatch {
            expected: expected.to_string(),
            got: token_category(&token.node),
        }
        .into(),
        token.span,
    )
}

fn out_of_range(n: &Number<'_>, target_type: &'static str, span: Span) -> CoerceError {
    CoerceError::at(
        DecodeErrorKind::NumberOutOfRange {
            value: n.text.to_string(),
            target_type,
        }
        .into(),
        span,
    )
}

// ============================================================================
// Public API
// ============================================================================

fn strip_bom(text: &str) -> &str {
    text.strip_prefix('\u{feff}').unwrap_or(text)
}

/// Whether `text` is exactly one well-formed JSON value.
///
/// ```
/// assert!(cellcast::is_valid_json(r#"{"a": [1, 2.5, null]}"#));
/// assert!(!cellcast::is_valid_json("not json"));
/// assert!(!cellcast::is_valid_json(""));
/// ```
pub fn is_valid(text: &str) -> bool {
    let mut decoder = JsonDecoder::new(strip_bom(text));
    decoder.skip_value().and_then(|_| decoder.finish()).is_ok()
}

/// Decodes `text` as one JSON value of `shape`.
///
/// Errors carry the text as source code for rich diagnostics. Their spans
/// count from the start of `text`, byte order mark included.
pub fn decode(shape: &Shape, text: &str) -> Result<Value> {
    let input = strip_bom(text);
    let mut decoder = JsonDecoder::new(input);
    decoder
        .decode_value(shape)
        .and_then(|value| decoder.finish().map(|()| value))
        .map_err(|mut e| {
            if let Some(span) = &mut e.span {
                span.start += text.len() - input.len();
            }
            e.with_source(text)
        })
}
