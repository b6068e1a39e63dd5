use std::sync::Arc;

use cellcast::{
    Alias, Def, Kind, OpaqueKind, Registry, ScalarKind, ShapeCache, StructDesc, TypeDesc,
    resolve_shape,
};
use facet_testhelpers::test;

#[test]
fn type_identifiers() {
    let cases = [
        (TypeDesc::i64(), "i64"),
        (TypeDesc::slice(TypeDesc::string()), "Vec<String>"),
        (TypeDesc::array(TypeDesc::f32(), 4), "[f32; 4]"),
        (TypeDesc::map(TypeDesc::string(), TypeDesc::u8()), "Map<String, u8>"),
        (TypeDesc::pointer(TypeDesc::bool()), "Option<Box<bool>>"),
        (TypeDesc::structure(StructDesc::anonymous()), "struct"),
        (TypeDesc::named("Celsius", TypeDesc::f64()), "Celsius"),
    ];
    for (desc, expected) in cases {
        assert_eq!(resolve_shape(&desc).type_identifier, expected);
    }
}

#[test]
fn kinds_see_through_names() {
    let registry = Registry::default();
    assert_eq!(
        registry.kind_of(&TypeDesc::named("Celsius", TypeDesc::f64())),
        Kind::Scalar(ScalarKind::F64)
    );
    assert_eq!(registry.kind_of(&TypeDesc::time()), Kind::Struct);
    assert_eq!(
        registry.kind_of(&TypeDesc::opaque(OpaqueKind::Func)),
        Kind::Opaque(OpaqueKind::Func)
    );
}

#[test]
fn aliases() {
    let registry = Registry::default().with_named_struct("Money");
    let money = TypeDesc::structure(StructDesc::new("Money").field("Cents", "", TypeDesc::i64()));

    assert_eq!(registry.resolve(&money).alias, Some(Alias::Struct));
    assert_eq!(resolve_shape(&money).alias, None);
    assert_eq!(resolve_shape(&TypeDesc::time()).alias, Some(Alias::TimeLike));
    assert_eq!(Registry::empty().resolve(&TypeDesc::time()).alias, None);

    let custom = Registry::empty().with_time_like("Timestamp");
    let stamp = TypeDesc::named("Timestamp", TypeDesc::structure(StructDesc::anonymous()));
    assert!(custom.resolve(&stamp).is_time_like());
}

#[test]
fn names_over_named_structs_use_the_outer_name() {
    let my_time = TypeDesc::named("MyTime", TypeDesc::time());

    let plain = resolve_shape(&my_time);
    assert_eq!(plain.type_identifier, "MyTime");
    assert_eq!(plain.alias, None);
    assert!(matches!(plain.def, Def::Struct(_)));

    let registry = Registry::default().with_time_like("MyTime");
    assert!(registry.resolve(&my_time).is_time_like());

    let registry = Registry::default().with_named_struct("MyTime");
    assert_eq!(registry.resolve(&my_time).alias, Some(Alias::Struct));
}

#[test]
fn nested_shapes_are_resolved() {
    let shape = resolve_shape(&TypeDesc::map(
        TypeDesc::string(),
        TypeDesc::slice(TypeDesc::named("Celsius", TypeDesc::f64())),
    ));
    let Def::Map(map) = &shape.def else {
        panic!("expected a map, got {shape}");
    };
    let Def::Slice(elem) = &map.value.def else {
        panic!("expected a slice");
    };
    assert_eq!(elem.alias, Some(Alias::Repr));
    assert_eq!(elem.kind(), Kind::Scalar(ScalarKind::F64));
}

#[test]
fn cache_shares_resolved_shapes() {
    let cache = ShapeCache::new(Registry::default());
    assert!(cache.is_empty());

    let desc = TypeDesc::slice(TypeDesc::u16());
    let first = cache.get_or_resolve(&desc);
    let second = cache.get_or_resolve(&desc);
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(cache.len(), 1);

    std::thread::scope(|scope| {
        for i in 0..4u32 {
            let cache = &cache;
            scope.spawn(move || {
                let desc = TypeDesc::array(TypeDesc::u16(), i as usize);
                cache.get_or_resolve(&desc);
            });
        }
    });
    assert_eq!(cache.len(), 5);
}
