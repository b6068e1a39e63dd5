//! RFC 8259 tokenizer for the JSON payloads carried by composite cells.

use std::borrow::Cow;
use std::fmt;

use crate::span::{Pos, Span, Spanned};

/// Errors raised while splitting cell text into JSON tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenErrorKind {
    /// A character that cannot start or continue a token
    UnexpectedCharacter(char),
    /// Input ended in the middle of a token
    UnexpectedEof(&'static str),
    /// A backslash escape that JSON does not define
    InvalidEscape,
    /// A number that does not follow the JSON number grammar
    InvalidNumber,
}

impl fmt::Display for TokenErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenErrorKind::UnexpectedCharacter(c) => write!(f, "unexpected character {c:?}"),
            TokenErrorKind::UnexpectedEof(ctx) => write!(f, "unexpected end of input {ctx}"),
            TokenErrorKind::InvalidEscape => write!(f, "invalid escape sequence"),
            TokenErrorKind::InvalidNumber => write!(f, "malformed number"),
        }
    }
}

/// A tokenizer error and where it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenError {
    /// What went wrong
    pub kind: TokenErrorKind,
    /// Where it went wrong
    pub span: Span,
}

impl TokenError {
    fn new(kind: TokenErrorKind, span: Span) -> Self {
        TokenError { kind, span }
    }
}

/// The lexeme of a JSON number, parsed later at the width of its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Number<'input> {
    pub text: &'input str,
    /// No fraction and no exponent
    pub integral: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token<'input> {
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Colon,
    Comma,
    String(Cow<'input, str>),
    Number(Number<'input>),
    True,
    False,
    Null,
    Eof,
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::LBrace => f.write_str("'{'"),
            Token::RBrace => f.write_str("'}'"),
            Token::LBracket => f.write_str("'['"),
            Token::RBracket => f.write_str("']'"),
            Token::Colon => f.write_str("':'"),
            Token::Comma => f.write_str("','"),
            Token::String(s) => write!(f, "string {s:?}"),
            Token::Number(n) => write!(f, "number {}", n.text),
            Token::True => f.write_str("true"),
            Token::False => f.write_str("false"),
            Token::Null => f.write_str("null"),
            Token::Eof => f.write_str("end of input"),
        }
    }
}

pub(crate) struct Tokenizer<'input> {
    input: &'input str,
    pos: Pos,
}

impl<'input> Tokenizer<'input> {
    pub fn new(input: &'input str) -> Self {
        Tokenizer { input, pos: 0 }
    }

    pub fn next_token(&mut self) -> Result<Spanned<Token<'input>>, TokenError> {
        self.skip_whitespace();
        let start = self.pos;
        let Some(&b) = self.input.as_bytes().get(start) else {
            return Ok(Spanned {
                node: Token::Eof,
                span: Span::new(start, 0),
            });
        };
        let single = |node| Spanned {
            node,
            span: Span::new(start, 1),
        };
        match b {
            b'{' => {
                self.pos += 1;
                Ok(single(Token::LBrace))
            }
            b'}' => {
                self.pos += 1;
                Ok(single(Token::RBrace))
            }
            b'[' => {
                self.pos += 1;
                Ok(single(Token::LBracket))
            }
            b']' => {
                self.pos += 1;
                Ok(single(Token::RBracket))
            }
            b':' => {
                self.pos += 1;
                Ok(single(Token::Colon))
            }
            b',' => {
                self.pos += 1;
                Ok(single(Token::Comma))
            }
            b'"' => self.parse_string(start),
            b'-' | b'0'..=b'9' => self.parse_number(start),
            b't' => self.parse_literal("true", Token::True),
            b'f' => self.parse_literal("false", Token::False),
            b'n' => self.parse_literal("null", Token::Null),
            _ => Err(self.unexpected_char(start)),
        }
    }

    fn unexpected_char(&self, at: Pos) -> TokenError {
        let c = self.input[at..].chars().next().unwrap_or('\u{fffd}');
        TokenError::new(
            TokenErrorKind::UnexpectedCharacter(c),
            Span::new(at, c.len_utf8()),
        )
    }

    fn skip_whitespace(&mut self) {
        while let Some(&b) = self.input.as_bytes().get(self.pos) {
            match b {
                b' ' | b'\t' | b'\n' | b'\r' => self.pos += 1,
                _ => break,
            }
        }
    }

    fn parse_string(&mut self, start: Pos) -> Result<Spanned<Token<'input>>, TokenError> {
        // opening quote
        self.pos += 1;
        let content_start = self.pos;
        let mut run_start = self.pos;
        let mut owned: Option<String> = None;

        loop {
            let Some(&b) = self.input.as_bytes().get(self.pos) else {
                return Err(TokenError::new(
                    TokenErrorKind::UnexpectedEof("in string literal"),
                    Span::between(start, self.pos),
                ));
            };
            match b {
                b'"' => {
                    let node = match owned {
                        Some(mut buf) => {
                            buf.push_str(&self.input[run_start..self.pos]);
                            Cow::Owned(buf)
                        }
                        None => Cow::Borrowed(&self.input[content_start..self.pos]),
                    };
                    self.pos += 1;
                    return Ok(Spanned {
                        node: Token::String(node),
                        span: Span::between(start, self.pos),
                    });
                }
                b'\\' => {
                    let buf = owned.get_or_insert_with(String::new);
                    buf.push_str(&self.input[run_start..self.pos]);
                    self.pos += 1;
                    let c = self.parse_escape()?;
                    buf.push(c);
                    run_start = self.pos;
                }
                0x00..=0x1f => return Err(self.unexpected_char(self.pos)),
                _ => self.pos += 1,
            }
        }
    }

    /// Called with `pos` just past the backslash.
    fn parse_escape(&mut self) -> Result<char, TokenError> {
        let at = self.pos - 1;
        let Some(&e) = self.input.as_bytes().get(self.pos) else {
            return Err(TokenError::new(
                TokenErrorKind::UnexpectedEof("in string escape"),
                Span::between(at, self.pos),
            ));
        };
        self.pos += 1;
        let c = match e {
            b'"' => '"',
            b'\\' => '\\',
            b'/' => '/',
            b'b' => '\u{8}',
            b'f' => '\u{c}',
            b'n' => '\n',
            b'r' => '\r',
            b't' => '\t',
            b'u' => {
                // unpaired surrogates decode to U+FFFD
                let hi = self.parse_hex4(at)?;
                let code = match hi {
                    0xD800..=0xDBFF => self
                        .low_surrogate()
                        .map(|lo| 0x10000 + ((hi - 0xD800) << 10) + (lo - 0xDC00)),
                    _ => Some(hi),
                };
                code.and_then(char::from_u32)
                    .unwrap_or(char::REPLACEMENT_CHARACTER)
            }
            _ => {
                return Err(TokenError::new(
                    TokenErrorKind::InvalidEscape,
                    Span::between(at, self.pos),
                ));
            }
        };
        Ok(c)
    }

    /// Consumes a `\uXXXX` low surrogate at `pos`, if one is there. Anything
    /// else is left for the string loop.
    fn low_surrogate(&mut self) -> Option<u32> {
        let bytes = self.input.as_bytes().get(self.pos..self.pos + 6)?;
        let (prefix, hex) = bytes.split_at(2);
        if prefix != b"\\u" || !hex.iter().all(u8::is_ascii_hexdigit) {
            return None;
        }
        let lo = hex
            .iter()
            .filter_map(|&b| (b as char).to_digit(16))
            .fold(0, |acc, d| acc * 16 + d);
        if !(0xDC00..0xE000).contains(&lo) {
            return None;
        }
        self.pos += 6;
        Some(lo)
    }

    fn parse_hex4(&mut self, escape_start: Pos) -> Result<u32, TokenError> {
        let mut code = 0u32;
        for _ in 0..4 {
            let digit = self
                .input
                .as_bytes()
                .get(self.pos)
                .and_then(|&b| (b as char).to_digit(16));
            match digit {
                Some(d) => {
                    code = code * 16 + d;
                    self.pos += 1;
                }
                None if self.pos >= self.input.len() => {
                    return Err(TokenError::new(
                        TokenErrorKind::UnexpectedEof("in unicode escape"),
                        Span::between(escape_start, self.pos),
                    ));
                }
                None => {
                    return Err(TokenError::new(
                        TokenErrorKind::InvalidEscape,
                        Span::between(escape_start, self.pos + 1),
                    ));
                }
            }
        }
        Ok(code)
    }

    fn parse_number(&mut self, start: Pos) -> Result<Spanned<Token<'input>>, TokenError> {
        let bytes = self.input.as_bytes();
        let is_digit = |at: usize| matches!(bytes.get(at), Some(b'0'..=b'9'));
        let malformed = |end: usize| {
            TokenError::new(
                TokenErrorKind::InvalidNumber,
                Span::between(start, (end + 1).min(bytes.len())),
            )
        };

        let mut end = start;
        let mut integral = true;
        if bytes[end] == b'-' {
            end += 1;
        }
        match bytes.get(end) {
            Some(b'0') => end += 1,
            Some(b'1'..=b'9') => {
                while is_digit(end) {
                    end += 1;
                }
            }
            _ => return Err(malformed(end)),
        }
        if bytes.get(end) == Some(&b'.') {
            integral = false;
            end += 1;
            let digits = end;
            while is_digit(end) {
                end += 1;
            }
            if end == digits {
                return Err(malformed(end));
            }
        }
        if matches!(bytes.get(end), Some(b'e' | b'E')) {
            integral = false;
            end += 1;
            if matches!(bytes.get(end), Some(b'+' | b'-')) {
                end += 1;
            }
            let digits = end;
            while is_digit(end) {
                end += 1;
            }
            if end == digits {
                return Err(malformed(end));
            }
        }

        self.pos = end;
        Ok(Spanned {
            node: Token::Number(Number {
                text: &self.input[start..end],
                integral,
            }),
            span: Span::between(start, end),
        })
    }

    fn parse_literal(
        &mut self,
        literal: &'static str,
        node: Token<'input>,
    ) -> Result<Spanned<Token<'input>>, TokenError> {
        let start = self.pos;
        let rest = &self.input.as_bytes()[start..];
        if rest.starts_with(literal.as_bytes()) {
            self.pos += literal.len();
            return Ok(Spanned {
                node,
                span: Span::new(start, literal.len()),
            });
        }
        // report the first byte that diverges from the literal
        let matched = rest
            .iter()
            .zip(literal.as_bytes())
            .take_while(|(a, b)| a == b)
            .count();
        if matched == rest.len() {
            return Err(TokenError::new(
                TokenErrorKind::UnexpectedEof("in literal"),
                Span::between(start, self.input.len()),
            ));
        }
        Err(self.unexpected_char(start + matched))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Result<Vec<Token<'_>>, TokenErrorKind> {
        let mut tokenizer = Tokenizer::new(input);
        let mut out = Vec::new();
        loop {
            let token = tokenizer.next_token().map_err(|e| e.kind)?;
            if token.node == Token::Eof {
                return Ok(out);
            }
            out.push(token.node);
        }
    }

    #[test]
    fn splits_an_object() {
        let toks = tokens(r#"{"id": 1, "tags": [true, null]}"#).unwrap();
        assert_eq!(
            toks,
            vec![
                Token::LBrace,
                Token::String("id".into()),
                Token::Colon,
                Token::Number(Number {
                    text: "1",
                    integral: true
                }),
                Token::Comma,
                Token::String("tags".into()),
                Token::Colon,
                Token::LBracket,
                Token::True,
                Token::Comma,
                Token::Null,
                Token::RBracket,
                Token::RBrace,
            ]
        );
    }

    #[test]
    fn strings_without_escapes_are_borrowed() {
        let toks = tokens(r#""plain""#).unwrap();
        assert!(matches!(&toks[0], Token::String(Cow::Borrowed("plain"))));
    }

    #[test]
    fn escapes_are_decoded() {
        let toks = tokens(r#""a\"b\\c\né😀""#).unwrap();
        assert_eq!(toks, vec![Token::String("a\"b\\c\né😀".into())]);
    }

    #[test]
    fn lone_surrogates_become_replacement_characters() {
        assert_eq!(tokens(r#""\ud83d""#), Ok(vec![Token::String("\u{fffd}".into())]));
        assert_eq!(tokens(r#""a\udc00""#), Ok(vec![Token::String("a\u{fffd}".into())]));
        // a high surrogate followed by a non-surrogate escape keeps the escape
        assert_eq!(
            tokens(r#""\ud800\u0041""#),
            Ok(vec![Token::String("\u{fffd}A".into())])
        );
        assert_eq!(
            tokens(r#""\ud800\ud800\udc00""#),
            Ok(vec![Token::String("\u{fffd}\u{10000}".into())])
        );
        assert_eq!(tokens(r#""\uzzzz""#), Err(TokenErrorKind::InvalidEscape));
    }

    #[test]
    fn number_grammar() {
        let num = |s| match tokens(s).unwrap().as_slice() {
            [Token::Number(n)] => n.integral,
            other => panic!("unexpected {other:?}"),
        };
        assert!(num("-13"));
        assert!(!num("1.5"));
        assert!(!num("2e10"));
        assert_eq!(tokens("1."), Err(TokenErrorKind::InvalidNumber));
        assert_eq!(tokens("-"), Err(TokenErrorKind::InvalidNumber));
        assert_eq!(tokens("1e+"), Err(TokenErrorKind::InvalidNumber));
    }

    #[test]
    fn leading_zero_splits_into_two_numbers() {
        assert_eq!(tokens("01").unwrap().len(), 2);
    }

    #[test]
    fn control_characters_in_strings_are_rejected() {
        assert_eq!(
            tokens("\"a\tb\""),
            Err(TokenErrorKind::UnexpectedCharacter('\t'))
        );
    }

    #[test]
    fn truncated_literals() {
        assert_eq!(tokens("nul"), Err(TokenErrorKind::UnexpectedEof("in literal")));
        assert_eq!(tokens("trux"), Err(TokenErrorKind::UnexpectedCharacter('x')));
        assert_eq!(
            tokens("\"open"),
            Err(TokenErrorKind::UnexpectedEof("in string literal"))
        );
    }
}
