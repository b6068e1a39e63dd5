use std::sync::Arc;

use cellcast::{
    FieldIndex, IndexOptions, KeySource, Registry, StructDesc, TypeDesc, build_field_index,
    flatten, flatten_with, resolve_shape,
};
use facet_testhelpers::test;

fn audited() -> StructDesc {
    StructDesc::new("Audit")
        .field("CreatedBy", r#"json:"created_by""#, TypeDesc::string())
        .field("Note", r#"json:"note""#, TypeDesc::string())
}

fn invoice() -> TypeDesc {
    TypeDesc::structure(
        StructDesc::new("Invoice")
            .field("Number", r#"json:"number" xlsx:"No.""#, TypeDesc::u32())
            .embed("Audit", "", TypeDesc::structure(audited()))
            .field("Note", r#"json:",omitempty""#, TypeDesc::string())
            .field("Total", "Grand Total", TypeDesc::f64())
            .field("Hidden", r#"xlsx:"hidden""#, TypeDesc::bool()),
    )
}

#[test]
fn embedded_structs_are_flattened_in_place() {
    let shape = resolve_shape(&invoice());
    let fields = flatten(&shape);
    let names: Vec<_> = fields.iter().map(|f| f.declared_name.as_str()).collect();
    assert_eq!(
        names,
        ["Number", "CreatedBy", "Note", "Note", "Total", "Hidden"]
    );
    assert_eq!(fields[1].path, [1, 0]);
    assert_eq!(fields[3].path, [2]);
    assert!(fields.iter().all(|f| !f.embedded));
}

#[test]
fn flatten_of_a_non_struct_is_empty() {
    let shape = resolve_shape(&TypeDesc::slice(TypeDesc::i32()));
    assert!(flatten(&shape).is_empty());
}

#[test]
fn later_fields_win_duplicate_keys() {
    let shape = resolve_shape(&invoice());
    let index = FieldIndex::build(&shape, &IndexOptions::default());
    assert_eq!(index.len(), 5);
    assert_eq!(index.get("Note").map(|f| f.path.clone()), Some(vec![2]));
    assert_eq!(
        index.keys().collect::<Vec<_>>(),
        ["Number", "CreatedBy", "Note", "Total", "Hidden"]
    );
}

#[test]
fn keys_from_tags() {
    let shape = resolve_shape(&invoice());
    let index = build_field_index(&shape, KeySource::Tag, "json");

    assert_eq!(index.get("number").unwrap().declared_name, "Number");
    assert_eq!(index.get("created_by").unwrap().path, [1, 0]);
    assert_eq!(index.get("note").unwrap().path, [1, 1]);
    // an empty tag name falls back to the declared name
    assert_eq!(index.get("Note").unwrap().path, [2]);
    // a raw, unconventional tag is used as the key itself
    assert_eq!(index.get("Grand Total").unwrap().declared_name, "Total");
    // a conventional tag without the consulted key keeps the declared name
    assert_eq!(index.get("Hidden").unwrap().declared_name, "Hidden");
}

#[test]
fn other_tag_names() {
    let shape = resolve_shape(&invoice());
    let index = build_field_index(&shape, KeySource::Tag, "xlsx");
    assert_eq!(index.get("No.").unwrap().declared_name, "Number");
    assert_eq!(index.get("hidden").unwrap().declared_name, "Hidden");
    assert!(index.get("number").is_none());

    // empty means json
    let index = build_field_index(&shape, KeySource::Tag, "");
    assert!(index.get("number").is_some());
}

#[test]
fn named_struct_aliases_are_not_flattened() {
    let registry = Registry::default().with_named_struct("Audit");
    let shape = registry.resolve(&invoice());
    let index = FieldIndex::build(&shape, &IndexOptions::default());
    let audit = index.get("Audit").unwrap();
    assert!(audit.embedded);
    assert_eq!(audit.path, [1]);
    assert!(index.get("CreatedBy").is_none());
}

#[test]
fn suggestions_for_near_misses() {
    let shape = resolve_shape(&invoice());
    let index = FieldIndex::build(&shape, &IndexOptions::default());
    assert_eq!(index.suggest("Totl"), Some("Total"));
    assert_eq!(index.suggest("zzzzzz"), None);
}

#[test]
fn options_builder() {
    let options = IndexOptions::default()
        .key_source(KeySource::Tag)
        .tag_name("xlsx");
    assert_eq!(options.key_source, KeySource::Tag);
    assert_eq!(options.tag_name, "xlsx");
    assert_eq!(IndexOptions::default().tag_name("").tag_name, "json");

    let shape = resolve_shape(&invoice());
    let keys: Vec<_> = flatten_with(&shape, &options)
        .into_iter()
        .map(|f| f.key)
        .collect();
    assert_eq!(keys, ["No.", "CreatedBy", "Note", "Note", "Grand Total", "hidden"]);
}

#[test]
fn index_is_shared_across_threads() {
    let shape = resolve_shape(&invoice());
    let index = Arc::new(build_field_index(&shape, KeySource::Tag, "json"));

    std::thread::scope(|scope| {
        for _ in 0..4 {
            let index = Arc::clone(&index);
            scope.spawn(move || {
                for _ in 0..100 {
                    assert_eq!(index.get("number").unwrap().declared_name, "Number");
                    assert_eq!(index.get("created_by").unwrap().path, [1, 0]);
                }
            });
        }
    });
}
