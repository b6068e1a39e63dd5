//! Field indexes: mapping column titles and tags onto struct fields.
//!
//! Fields of embedded structs are flattened in place of the embedding field,
//! so a title can address them as if they were declared on the outer struct.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::find_similar;
use crate::shape::{Def, Field, Shape};

/// Where a field's key comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KeySource {
    /// The declared field name
    #[default]
    DeclaredName,
    /// The value of a struct tag, see [`IndexOptions::tag_name`]
    Tag,
}

/// Options for building a [`FieldIndex`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexOptions {
    /// Where keys come from
    pub key_source: KeySource,
    /// The tag consulted when keying by tag
    pub tag_name: String,
}

/// The tag consulted when none is configured.
pub const DEFAULT_TAG_NAME: &str = "json";

impl Default for IndexOptions {
    fn default() -> Self {
        IndexOptions {
            key_source: KeySource::DeclaredName,
            tag_name: DEFAULT_TAG_NAME.to_string(),
        }
    }
}

impl IndexOptions {
    /// Sets the key source.
    pub fn key_source(mut self, key_source: KeySource) -> Self {
        self.key_source = key_source;
        self
    }

    /// Sets the tag consulted when keying by tag. An empty name means `json`.
    pub fn tag_name(mut self, tag_name: impl Into<String>) -> Self {
        let tag_name = tag_name.into();
        self.tag_name = if tag_name.is_empty() {
            DEFAULT_TAG_NAME.to_string()
        } else {
            tag_name
        };
        self
    }
}

/// A flattened field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    /// The name the field was declared with
    pub declared_name: String,
    /// The key the field is indexed under
    pub key: String,
    /// The field's shape
    pub shape: Arc<Shape>,
    /// Declared without a name
    pub embedded: bool,
    /// Field positions from the indexed struct down to this field
    pub path: Vec<usize>,
}

/// Flattens the fields of `shape`, keyed by declared name.
///
/// Returns nothing if `shape` is not a struct.
pub fn flatten(shape: &Shape) -> Vec<FieldDescriptor> {
    flatten_with(shape, &IndexOptions::default())
}

/// Flattens the fields of `shape` depth-first in declaration order, with
/// embedded plain structs replaced by their own fields.
pub fn flatten_with(shape: &Shape, options: &IndexOptions) -> Vec<FieldDescriptor> {
    let mut out = Vec::new();
    if let Def::Struct(def) = &shape.def {
        flatten_into(&def.fields, options, &[], &mut out);
    }
    out
}

fn flatten_into(
    fields: &[Field],
    options: &IndexOptions,
    prefix: &[usize],
    out: &mut Vec<FieldDescriptor>,
) {
    for (i, field) in fields.iter().enumerate() {
        let mut path = prefix.to_vec();
        path.push(i);

        let expands = field.embedded && field.shape.alias.is_none();
        if let (true, Def::Struct(inner)) = (expands, &field.shape.def) {
            log::trace!("flatten: expanding embedded {}", field.name);
            flatten_into(&inner.fields, options, &path, out);
            continue;
        }

        out.push(FieldDescriptor {
            declared_name: field.name.clone(),
            key: key_for(field, options),
            shape: Arc::clone(&field.shape),
            embedded: field.embedded,
            path,
        });
    }
}

fn key_for(field: &Field, options: &IndexOptions) -> String {
    match options.key_source {
        KeySource::DeclaredName => field.name.clone(),
        KeySource::Tag => {
            if let Some(value) = field.tag.lookup(&options.tag_name) {
                let name = value.split(',').next().unwrap_or("");
                if name.is_empty() {
                    field.name.clone()
                } else {
                    name.to_string()
                }
            } else if !field.tag.is_empty() && !field.tag.is_conventional() {
                field.tag.raw().trim().to_string()
            } else {
                field.name.clone()
            }
        }
    }
}

/// Key → field lookup over a struct's flattened fields.
///
/// Immutable once built; share it across threads behind an `Arc` or a
/// reference.
#[derive(Debug, Clone)]
pub struct FieldIndex {
    fields: Vec<FieldDescriptor>,
    by_key: HashMap<String, usize>,
}

impl FieldIndex {
    /// Indexes the flattened fields of `shape`. When two fields share a key,
    /// the later one in flattened order wins.
    pub fn build(shape: &Shape, options: &IndexOptions) -> FieldIndex {
        let fields = flatten_with(shape, options);
        let mut by_key = HashMap::with_capacity(fields.len());
        for (i, field) in fields.iter().enumerate() {
            if let Some(prev) = by_key.insert(field.key.clone(), i) {
                log::debug!(
                    "FieldIndex::build: {} overrides {} for key {:?} in {}",
                    field.declared_name,
                    fields[prev].declared_name,
                    field.key,
                    shape.type_identifier,
                );
            }
        }
        log::debug!(
            "FieldIndex::build: {} keys for {}",
            by_key.len(),
            shape.type_identifier
        );
        FieldIndex { fields, by_key }
    }

    /// The field indexed under `key`.
    pub fn get(&self, key: &str) -> Option<&FieldDescriptor> {
        self.by_key.get(key).map(|&i| &self.fields[i])
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    /// `true` if no field is indexed.
    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    /// The indexed keys, in flattened order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.iter().map(|f| f.key.as_str())
    }

    /// The winning fields, in flattened order.
    pub fn iter(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields
            .iter()
            .enumerate()
            .filter(|(i, f)| self.by_key.get(&f.key) == Some(i))
            .map(|(_, f)| f)
    }

    /// The indexed key most similar to `key`, for "did you mean" hints.
    pub fn suggest(&self, key: &str) -> Option<&str> {
        find_similar(key, self.keys())
    }
}

/// Builds the index of `shape` with keys from `key_source`, reading
/// `tag_name` (default `json` when empty) when keying by tag.
pub fn build_field_index(shape: &Shape, key_source: KeySource, tag_name: &str) -> FieldIndex {
    FieldIndex::build(
        shape,
        &IndexOptions::default()
            .key_source(key_source)
            .tag_name(tag_name),
    )
}
