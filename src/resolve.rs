//! Shape resolution: turning declared [`TypeDesc`]s into shared [`Shape`]s.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use crate::desc::{StructDesc, TypeDesc};
use crate::shape::{Alias, ArrayDef, Def, Field, Kind, MapDef, Shape, StructDef};
use crate::tag::Tag;

/// The named struct types that count as aliases.
///
/// A named struct that is registered as time-like is coerced through the
/// date heuristics; one registered as a plain named struct is coerced from
/// JSON only. Unregistered named structs are plain structs.
#[derive(Debug, Clone)]
pub struct Registry {
    time_like: HashSet<String>,
    named_structs: HashSet<String>,
}

impl Default for Registry {
    fn default() -> Self {
        Registry::empty().with_time_like("Time")
    }
}

impl Registry {
    /// A registry with nothing registered, not even `Time`.
    pub fn empty() -> Self {
        Registry {
            time_like: HashSet::new(),
            named_structs: HashSet::new(),
        }
    }

    /// Registers `name` as a time-like struct.
    pub fn with_time_like(mut self, name: impl Into<String>) -> Self {
        self.time_like.insert(name.into());
        self
    }

    /// Registers `name` as a named struct alias.
    pub fn with_named_struct(mut self, name: impl Into<String>) -> Self {
        self.named_structs.insert(name.into());
        self
    }

    /// The kind `desc` resolves to, without building the shape.
    pub fn kind_of(&self, desc: &TypeDesc) -> Kind {
        match desc {
            TypeDesc::Scalar(k) => Kind::Scalar(*k),
            TypeDesc::Named { repr, .. } => self.kind_of(repr),
            TypeDesc::Struct(_) => Kind::Struct,
            TypeDesc::Slice(_) => Kind::Slice,
            TypeDesc::Array(..) => Kind::Array,
            TypeDesc::Map(..) => Kind::Map,
            TypeDesc::Pointer(_) => Kind::Pointer,
            TypeDesc::Opaque(k) => Kind::Opaque(*k),
        }
    }

    /// Resolves a descriptor. Never fails: unsupported kinds resolve to
    /// [`Def::Opaque`] and are rejected when coerced into.
    pub fn resolve(&self, desc: &TypeDesc) -> Arc<Shape> {
        Arc::new(self.resolve_inner(desc))
    }

    fn resolve_inner(&self, desc: &TypeDesc) -> Shape {
        match desc {
            TypeDesc::Scalar(k) => Shape {
                type_identifier: k.type_identifier().to_string(),
                def: Def::Scalar(*k),
                alias: None,
            },
            TypeDesc::Named { name, repr } => match struct_under(repr) {
                // the outermost name decides the alias
                Some(s) => self.resolve_struct(name, s),
                None => Shape {
                    type_identifier: name.clone(),
                    alias: Some(Alias::Repr),
                    ..self.resolve_inner(repr)
                },
            },
            TypeDesc::Struct(s) => match &s.name {
                Some(name) => self.resolve_struct(name, s),
                None => Shape {
                    type_identifier: "struct".to_string(),
                    def: Def::Struct(self.resolve_fields(s)),
                    alias: None,
                },
            },
            TypeDesc::Slice(elem) => {
                let elem = self.resolve(elem);
                Shape {
                    type_identifier: format!("Vec<{elem}>"),
                    def: Def::Slice(elem),
                    alias: None,
                }
            }
            TypeDesc::Array(elem, len) => {
                let elem = self.resolve(elem);
                Shape {
                    type_identifier: format!("[{elem}; {len}]"),
                    def: Def::Array(ArrayDef { elem, len: *len }),
                    alias: None,
                }
            }
            TypeDesc::Map(key, value) => {
                let key = self.resolve(key);
                let value = self.resolve(value);
                Shape {
                    type_identifier: format!("Map<{key}, {value}>"),
                    def: Def::Map(MapDef { key, value }),
                    alias: None,
                }
            }
            TypeDesc::Pointer(pointee) => {
                let pointee = self.resolve(pointee);
                Shape {
                    type_identifier: format!("Option<Box<{pointee}>>"),
                    def: Def::Pointer(pointee),
                    alias: None,
                }
            }
            TypeDesc::Opaque(k) => Shape {
                type_identifier: Kind::Opaque(*k).to_string(),
                def: Def::Opaque(*k),
                alias: None,
            },
        }
    }

    fn resolve_struct(&self, name: &str, desc: &StructDesc) -> Shape {
        let alias = if self.time_like.contains(name) {
            Some(Alias::TimeLike)
        } else if self.named_structs.contains(name) {
            Some(Alias::Struct)
        } else {
            None
        };
        log::trace!("resolve_struct: {name} alias={alias:?}");
        Shape {
            type_identifier: name.to_string(),
            def: Def::Struct(self.resolve_fields(desc)),
            alias,
        }
    }

    fn resolve_fields(&self, desc: &StructDesc) -> StructDef {
        StructDef {
            fields: desc
                .fields
                .iter()
                .map(|f| Field {
                    name: f.name.clone(),
                    tag: Tag::new(f.tag.as_str()),
                    shape: self.resolve(&f.ty),
                    embedded: f.embedded,
                })
                .collect(),
        }
    }
}

/// The struct a chain of names bottoms out in, if any.
fn struct_under(desc: &TypeDesc) -> Option<&StructDesc> {
    match desc {
        TypeDesc::Struct(s) => Some(s),
        TypeDesc::Named { repr, .. } => struct_under(repr),
        _ => None,
    }
}

/// Resolves `desc` with the default registry.
pub fn resolve_shape(desc: &TypeDesc) -> Arc<Shape> {
    Registry::default().resolve(desc)
}

/// Memoizes resolution by descriptor identity.
///
/// Shapes are derived on first use and shared afterwards; the cache can be
/// used from several threads at once.
#[derive(Debug)]
pub struct ShapeCache {
    registry: Registry,
    shapes: RwLock<HashMap<TypeDesc, Arc<Shape>>>,
}

impl Default for ShapeCache {
    fn default() -> Self {
        ShapeCache::new(Registry::default())
    }
}

impl ShapeCache {
    /// An empty cache resolving through `registry`.
    pub fn new(registry: Registry) -> Self {
        ShapeCache {
            registry,
            shapes: RwLock::new(HashMap::new()),
        }
    }

    /// The registry shapes are resolved with.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Returns the cached shape for `desc`, resolving it on first use.
    pub fn get_or_resolve(&self, desc: &TypeDesc) -> Arc<Shape> {
        {
            let shapes = self.shapes.read().unwrap_or_else(|e| e.into_inner());
            if let Some(shape) = shapes.get(desc) {
                return Arc::clone(shape);
            }
        }
        let shape = self.registry.resolve(desc);
        let mut shapes = self.shapes.write().unwrap_or_else(|e| e.into_inner());
        Arc::clone(shapes.entry(desc.clone()).or_insert(shape))
    }

    /// Number of cached shapes.
    pub fn len(&self) -> usize {
        self.shapes.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// `true` if nothing has been resolved yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
