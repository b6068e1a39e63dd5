//! Coercion errors, with miette diagnostics for JSON payloads.

use std::fmt::{self, Display};

use crate::shape::Kind;
use crate::span::Span;
use crate::tokenizer::{TokenError, TokenErrorKind};

/// Find the best matching name from a list of candidates.
/// Returns Some(suggestion) if a match with similarity >= 0.6 is found.
pub(crate) fn find_similar<'a>(unknown: &str, candidates: impl IntoIterator<Item = &'a str>) -> Option<&'a str> {
    let mut best_match: Option<(&'a str, f64)> = None;

    for candidate in candidates {
        let similarity = strsim::jaro_winkler(unknown, candidate);
        if similarity >= 0.6 && best_match.is_none_or(|(_, best_sim)| similarity > best_sim) {
            best_match = Some((candidate, similarity));
        }
    }

    best_match.map(|(name, _)| name)
}

// ============================================================================
// Paths
// ============================================================================

/// One step from the coerced root value down to the place an error occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// A struct field, by declared name
    Field(String),
    /// A slice or array element
    Index(usize),
    /// A map entry, by its JSON key
    Key(String),
    /// The pointee of a pointer
    Deref,
}

impl Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Field(name) => write!(f, ".{name}"),
            PathSegment::Index(i) => write!(f, "[{i}]"),
            PathSegment::Key(key) => write!(f, "[{key:?}]"),
            PathSegment::Deref => f.write_str("*"),
        }
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Error returned when cell text cannot be coerced into a shape.
#[derive(Debug, Clone, PartialEq)]
pub struct CoerceError {
    /// The specific kind of error
    pub kind: CoerceErrorKind,
    /// Where in the value tree the error occurred, outermost first
    pub path: Vec<PathSegment>,
    /// Span into the cell text, when the error came from the JSON decoder
    pub span: Option<Span>,
    /// The cell text (for diagnostics)
    pub source_code: Option<String>,
}

impl Display for CoerceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "at {}: {}", self.path_string(), self.kind)
        }
    }
}

impl std::error::Error for CoerceError {}

impl miette::Diagnostic for CoerceError {
    fn code<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        Some(Box::new(self.kind.code()))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        self.source_code
            .as_ref()
            .map(|s| s as &dyn miette::SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = miette::LabeledSpan> + '_>> {
        let span = self.span?;
        Some(Box::new(std::iter::once(miette::LabeledSpan::new_with_span(
            Some(self.kind.label()),
            span,
        ))))
    }
}

impl CoerceError {
    /// Create an error without span information
    pub fn new(kind: CoerceErrorKind) -> Self {
        CoerceError {
            kind,
            path: Vec::new(),
            span: None,
            source_code: None,
        }
    }

    /// Create an error pointing at a span of the cell text
    pub fn at(kind: CoerceErrorKind, span: Span) -> Self {
        CoerceError {
            span: Some(span),
            ..CoerceError::new(kind)
        }
    }

    /// Prepend a path segment, as the error bubbles up through a composite
    pub fn with_path(mut self, segment: PathSegment) -> Self {
        self.path.insert(0, segment);
        self
    }

    /// Attach source code for rich diagnostics
    pub fn with_source(mut self, source: &str) -> Self {
        self.source_code = Some(source.to_string());
        self
    }

    /// The path rendered as `.field[0]["key"]*`
    pub fn path_string(&self) -> String {
        self.path.iter().map(|s| s.to_string()).collect()
    }
}

/// Specific error kinds for coercion
#[derive(Debug, Clone, PartialEq)]
pub enum CoerceErrorKind {
    /// The shape has no coercion rule (channel, function, interface, unsafe pointer)
    UnsupportedKind {
        /// The rejected kind
        kind: Kind,
    },
    /// A scalar's text did not parse
    ParseFailure {
        /// The offending text
        text: String,
        /// The parser's message
        message: String,
    },
    /// A JSON payload failed to decode into the target shape
    JsonDecodeFailure(DecodeErrorKind),
    /// A named struct received text that is not JSON
    NotJsonFormat {
        /// The offending text
        text: String,
        /// The struct's type identifier
        type_identifier: String,
    },
    /// A slice, array or map received text that is not JSON (strict mode only)
    InvalidJson {
        /// The offending text
        text: String,
        /// The target's type identifier
        type_identifier: String,
    },
    /// No date layout matched (strict mode only)
    UnrecognizedDate {
        /// The offending text
        text: String,
    },
}

impl Display for CoerceErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoerceErrorKind::UnsupportedKind { kind } => {
                write!(f, "cannot coerce text into a value of kind {kind}")
            }
            CoerceErrorKind::ParseFailure { text, message } => {
                write!(f, "failed to parse {text:?}: {message}")
            }
            CoerceErrorKind::JsonDecodeFailure(e) => write!(f, "invalid JSON payload: {e}"),
            CoerceErrorKind::NotJsonFormat {
                text,
                type_identifier,
            } => write!(f, "{text:?} is not JSON, cannot decode it as {type_identifier}"),
            CoerceErrorKind::InvalidJson {
                text,
                type_identifier,
            } => write!(f, "{text:?} is not valid JSON for {type_identifier}"),
            CoerceErrorKind::UnrecognizedDate { text } => {
                write!(f, "{text:?} does not match any known date layout")
            }
        }
    }
}

impl CoerceErrorKind {
    /// Get an error code for this kind of error.
    pub fn code(&self) -> &'static str {
        match self {
            CoerceErrorKind::UnsupportedKind { .. } => "cellcast::unsupported_kind",
            CoerceErrorKind::ParseFailure { .. } => "cellcast::parse_failure",
            CoerceErrorKind::JsonDecodeFailure(e) => e.code(),
            CoerceErrorKind::NotJsonFormat { .. } => "cellcast::not_json_format",
            CoerceErrorKind::InvalidJson { .. } => "cellcast::invalid_json",
            CoerceErrorKind::UnrecognizedDate { .. } => "cellcast::unrecognized_date",
        }
    }

    /// Get a label describing where/what the error points to.
    pub fn label(&self) -> String {
        match self {
            CoerceErrorKind::JsonDecodeFailure(e) => e.label(),
            CoerceErrorKind::UnsupportedKind { kind } => format!("{kind} is not supported"),
            CoerceErrorKind::ParseFailure { message, .. } => message.clone(),
            CoerceErrorKind::NotJsonFormat { .. } | CoerceErrorKind::InvalidJson { .. } => {
                "not JSON".into()
            }
            CoerceErrorKind::UnrecognizedDate { .. } => "unrecognized date".into(),
        }
    }
}

/// Reasons a JSON payload did not decode into its target shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeErrorKind {
    /// Tokenizer error
    Token(TokenErrorKind),
    /// A token that the grammar does not allow here
    UnexpectedToken {
        /// What was found
        got: String,
        /// What was expected
        expected: &'static str,
    },
    /// A JSON value of the wrong type for the target
    TypeMismatch {
        /// The target type
        expected: String,
        /// The JSON type found
        got: &'static str,
    },
    /// A number that does not fit the target type
    NumberOutOfRange {
        /// The number as written
        value: String,
        /// The target type
        target_type: &'static str,
    },
    /// An object key that does not parse as the map's key type
    InvalidKey {
        /// The key text
        key: String,
        /// The map's key type
        target_type: String,
    },
    /// The target type has no JSON representation
    NotDecodable {
        /// The target type
        type_identifier: String,
    },
    /// Nesting exceeded the decoder's depth limit
    TooDeep,
    /// A string that is neither RFC 3339 nor a known date layout
    InvalidTime {
        /// The string's contents
        text: String,
    },
}

impl Display for DecodeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeErrorKind::Token(e) => write!(f, "{e}"),
            DecodeErrorKind::UnexpectedToken { got, expected } => {
                write!(f, "unexpected token: got {got}, expected {expected}")
            }
            DecodeErrorKind::TypeMismatch { expected, got } => {
                write!(f, "type mismatch: expected {expected}, got {got}")
            }
            DecodeErrorKind::NumberOutOfRange { value, target_type } => {
                write!(f, "number {value} out of range for {target_type}")
            }
            DecodeErrorKind::InvalidKey { key, target_type } => {
                write!(f, "key {key:?} is not a valid {target_type}")
            }
            DecodeErrorKind::NotDecodable { type_identifier } => {
                write!(f, "{type_identifier} cannot be decoded from JSON")
            }
            DecodeErrorKind::TooDeep => write!(f, "nesting too deep"),
            DecodeErrorKind::InvalidTime { text } => {
                write!(f, "{text:?} is not an RFC 3339 time or a known date layout")
            }
        }
    }
}

impl DecodeErrorKind {
    /// Get an error code for this kind of error.
    pub fn code(&self) -> &'static str {
        match self {
            DecodeErrorKind::Token(_) => "cellcast::json::token",
            DecodeErrorKind::UnexpectedToken { .. } => "cellcast::json::unexpected_token",
            DecodeErrorKind::TypeMismatch { .. } => "cellcast::json::type_mismatch",
            DecodeErrorKind::NumberOutOfRange { .. } => "cellcast::json::number_out_of_range",
            DecodeErrorKind::InvalidKey { .. } => "cellcast::json::invalid_key",
            DecodeErrorKind::NotDecodable { .. } => "cellcast::json::not_decodable",
            DecodeErrorKind::TooDeep => "cellcast::json::too_deep",
            DecodeErrorKind::InvalidTime { .. } => "cellcast::json::invalid_time",
        }
    }

    /// Get a label describing where/what the error points to.
    pub fn label(&self) -> String {
        match self {
            DecodeErrorKind::Token(e) => match e {
                TokenErrorKind::UnexpectedCharacter(c) => format!("unexpected '{c}'"),
                TokenErrorKind::UnexpectedEof(ctx) => format!("unexpected end of input {ctx}"),
                TokenErrorKind::InvalidEscape => "invalid escape".into(),
                TokenErrorKind::InvalidNumber => "malformed number".into(),
            },
            DecodeErrorKind::UnexpectedToken { got, expected } => {
                format!("expected {expected}, got {got}")
            }
            DecodeErrorKind::TypeMismatch { expected, got } => {
                format!("expected {expected}, got {got}")
            }
            DecodeErrorKind::NumberOutOfRange { target_type, .. } => {
                format!("out of range for {target_type}")
            }
            DecodeErrorKind::InvalidKey { target_type, .. } => format!("not a {target_type}"),
            DecodeErrorKind::NotDecodable { .. } => "not decodable".into(),
            DecodeErrorKind::TooDeep => "nested too deep".into(),
            DecodeErrorKind::InvalidTime { .. } => "not a time".into(),
        }
    }
}

impl From<DecodeErrorKind> for CoerceErrorKind {
    fn from(kind: DecodeErrorKind) -> Self {
        CoerceErrorKind::JsonDecodeFailure(kind)
    }
}

impl From<TokenError> for CoerceError {
    fn from(err: TokenError) -> Self {
        CoerceError::at(DecodeErrorKind::Token(err.kind).into(), err.span)
    }
}
