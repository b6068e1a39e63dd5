//! Struct tags in the `key:"value" other:"value"` convention.

use std::borrow::Cow;

/// The raw tag text attached to a struct field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Tag(String);

impl Tag {
    /// Wraps raw tag text.
    pub fn new(raw: impl Into<String>) -> Self {
        Tag(raw.into())
    }

    /// The tag text as written.
    pub fn raw(&self) -> &str {
        &self.0
    }

    /// `true` when the field carries no tag at all.
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Looks up the value stored under `key`, unquoting it.
    ///
    /// Returns `None` when the key is absent or the tag does not follow the
    /// `key:"value"` convention past that point.
    pub fn lookup(&self, key: &str) -> Option<Cow<'_, str>> {
        self.pairs().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    /// `true` when the whole tag parses as `key:"value"` pairs.
    pub fn is_conventional(&self) -> bool {
        let mut parser = Pairs { rest: &self.0 };
        let mut seen = false;
        while parser.next().is_some() {
            seen = true;
        }
        seen && parser.rest.trim().is_empty()
    }

    fn pairs(&self) -> Pairs<'_> {
        Pairs { rest: &self.0 }
    }
}

impl From<&str> for Tag {
    fn from(raw: &str) -> Self {
        Tag::new(raw)
    }
}

struct Pairs<'a> {
    rest: &'a str,
}

impl<'a> Iterator for Pairs<'a> {
    type Item = (&'a str, Cow<'a, str>);

    fn next(&mut self) -> Option<Self::Item> {
        let rest = self.rest.trim_start_matches(' ');
        let bytes = rest.as_bytes();

        // key: printable ASCII, excluding space, quote and colon
        let key_len = bytes
            .iter()
            .take_while(|&&b| b > b' ' && b != b':' && b != b'"' && b != 0x7f)
            .count();
        if key_len == 0 || bytes.get(key_len) != Some(&b':') || bytes.get(key_len + 1) != Some(&b'"')
        {
            return None;
        }
        let key = &rest[..key_len];

        let value_start = key_len + 2;
        let mut i = value_start;
        let mut escaped = false;
        while i < bytes.len() {
            match bytes[i] {
                b'\\' => {
                    escaped = true;
                    i += 1;
                }
                b'"' => break,
                _ => {}
            }
            i += 1;
        }
        if i >= bytes.len() {
            return None;
        }
        let quoted = &rest[value_start..i];
        self.rest = &rest[i + 1..];

        let value = if escaped {
            Cow::Owned(unescape(quoted))
        } else {
            Cow::Borrowed(quoted)
        };
        Some((key, value))
    }
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn looks_up_each_key() {
        let tag = Tag::new(r#"json:"point,omitempty" xlsx:"Point""#);
        assert_eq!(tag.lookup("json").as_deref(), Some("point,omitempty"));
        assert_eq!(tag.lookup("xlsx").as_deref(), Some("Point"));
        assert_eq!(tag.lookup("yaml"), None);
        assert!(tag.is_conventional());
    }

    #[test]
    fn escaped_quotes_are_unquoted() {
        let tag = Tag::new(r#"note:"say \"hi\"""#);
        assert_eq!(tag.lookup("note").as_deref(), Some(r#"say "hi""#));
    }

    #[test]
    fn raw_text_is_not_conventional() {
        let tag = Tag::new("Point");
        assert!(!tag.is_conventional());
        assert_eq!(tag.lookup("json"), None);
        assert_eq!(tag.raw(), "Point");
    }

    #[test]
    fn unterminated_value_stops_parsing() {
        let tag = Tag::new(r#"json:"id" xlsx:"open"#);
        assert_eq!(tag.lookup("json").as_deref(), Some("id"));
        assert_eq!(tag.lookup("xlsx"), None);
        assert!(!tag.is_conventional());
    }

    #[test]
    fn empty_tag() {
        assert!(Tag::default().is_empty());
        assert!(!Tag::default().is_conventional());
    }
}
