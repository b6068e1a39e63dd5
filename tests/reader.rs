use cellcast::{
    CoerceErrorKind, IndexOptions, KeySource, Reader, ReaderConfig, ReaderError, Sheet,
    SheetError, StructDesc, TypeDesc, Value, grid, resolve_shape,
};
use facet_testhelpers::test;

fn station() -> TypeDesc {
    TypeDesc::structure(
        StructDesc::new("Station")
            .field("Id", r#"json:"id""#, TypeDesc::u32())
            .field("Name", r#"json:"name""#, TypeDesc::string())
            .field(
                "Point",
                r#"json:"point""#,
                TypeDesc::array(TypeDesc::f64(), 2),
            )
            .embed(
                "Meta",
                "",
                TypeDesc::structure(
                    StructDesc::new("Meta")
                        .field("Opened", r#"json:"opened""#, TypeDesc::time())
                        .field("Status", r#"json:"status""#, TypeDesc::named("Status", TypeDesc::u8())),
                ),
            ),
    )
}

fn sheet() -> Sheet {
    Sheet::from_grid(
        grid(&[
            &["Id", "Name", "Point", "Opened", "Status"],
            &["1", "Hauptbahnhof", "[52.52, 13.37]", "2006-05-26 00:00:00", "2"],
            &["2", "Südkreuz", "", "", "1"],
        ]),
        true,
    )
    .unwrap()
}

#[test]
fn titles_map_onto_flattened_fields() {
    let shape = resolve_shape(&station());
    let out = Reader::default().materialize(&shape, &sheet()).unwrap();
    assert!(out.errors.is_empty(), "{:?}", out.errors);
    assert_eq!(out.records.len(), 2);

    let first = &out.records[0];
    assert_eq!(first.get("Id"), Some(&Value::U32(1)));
    assert_eq!(first.get("Name"), Some(&Value::String("Hauptbahnhof".into())));
    assert_eq!(
        first.get("Point"),
        Some(&Value::Array(vec![Value::F64(52.52), Value::F64(13.37)]))
    );
    assert!(matches!(first.get_path(&[3, 0]), Some(Value::Time(Some(_)))));
    assert_eq!(first.get_path(&[3, 1]), Some(&Value::U8(2)));

    let second = &out.records[1];
    assert_eq!(
        second.get("Point"),
        Some(&Value::Array(vec![Value::F64(0.0), Value::F64(0.0)]))
    );
    assert_eq!(second.get_path(&[3, 1]), Some(&Value::U8(1)));
}

#[test]
fn titles_by_tag() {
    let shape = resolve_shape(&station());
    let sheet = Sheet::from_grid(
        grid(&[&["id", "status", "unknown"], &["9", "3", "ignored"]]),
        true,
    )
    .unwrap();
    let reader = Reader::new(
        ReaderConfig::default().index(IndexOptions::default().key_source(KeySource::Tag)),
    );
    let out = reader.materialize(&shape, &sheet).unwrap();
    assert!(out.errors.is_empty());
    assert_eq!(out.records[0].get("Id"), Some(&Value::U32(9)));
    assert_eq!(out.records[0].get_path(&[3, 1]), Some(&Value::U8(3)));
    assert_eq!(out.records[0].get("Name"), Some(&Value::String(String::new())));
}

#[test]
fn positional_columns() {
    let shape = resolve_shape(&station());
    let sheet = Sheet::from_grid(grid(&[&["4", "Ostkreuz", "[1, 2]"]]), false).unwrap();
    assert_eq!(sheet.titles(), ["0", "1", "2"]);

    let reader = Reader::new(ReaderConfig::default().with_titles(false));
    let out = reader.materialize(&shape, &sheet).unwrap();
    assert!(out.errors.is_empty());
    assert_eq!(out.records[0].get("Id"), Some(&Value::U32(4)));
    assert_eq!(out.records[0].get("Name"), Some(&Value::String("Ostkreuz".into())));
    assert_eq!(
        out.records[0].get("Point"),
        Some(&Value::Array(vec![Value::F64(1.0), Value::F64(2.0)]))
    );
}

#[test]
fn failing_cells_are_collected_and_left_zero() {
    let shape = resolve_shape(&station());
    let sheet = Sheet::from_grid(
        grid(&[&["Id", "Name", "Status"], &["-1", "ok", "300"], &["5", "fine", "1"]]),
        true,
    )
    .unwrap();
    let out = Reader::default().materialize(&shape, &sheet).unwrap();

    assert_eq!(out.records.len(), 2);
    assert_eq!(out.records[0].get("Id"), Some(&Value::U32(0)));
    assert_eq!(out.records[0].get("Name"), Some(&Value::String("ok".into())));
    assert_eq!(out.records[1].get("Id"), Some(&Value::U32(5)));

    let cells: Vec<_> = out.errors.iter().map(|e| (e.row, e.column, e.title.as_str())).collect();
    assert_eq!(cells, [(0, 0, "Id"), (0, 2, "Status")]);
    assert!(matches!(
        out.errors[0].error.kind,
        CoerceErrorKind::ParseFailure { .. }
    ));
    assert!(out.errors[1].to_string().starts_with("row 0 column 2 (Status): "));
}

#[test]
fn only_structs_can_be_materialized() {
    let sheet = sheet();
    let err = Reader::default()
        .materialize(&resolve_shape(&TypeDesc::slice(TypeDesc::i32())), &sheet)
        .unwrap_err();
    assert_eq!(
        err,
        ReaderError::NotAStruct {
            type_identifier: "Vec<i32>".into()
        }
    );

    let err = Reader::default()
        .materialize(&resolve_shape(&TypeDesc::time()), &sheet)
        .unwrap_err();
    assert_eq!(
        err,
        ReaderError::NotAStruct {
            type_identifier: "Time".into()
        }
    );
}

#[test]
fn empty_grids_have_no_data() {
    assert_eq!(Sheet::from_grid(Vec::new(), true), Err(SheetError::NoData));
    assert_eq!(Sheet::from_grid(Vec::new(), false), Err(SheetError::NoData));

    let titles_only = Sheet::from_grid(grid(&[&["Id"]]), true).unwrap();
    let shape = resolve_shape(&station());
    let out = Reader::default().materialize(&shape, &titles_only).unwrap();
    assert!(out.records.is_empty());
}

#[test]
fn filtering_rows() {
    let mut sheet = sheet();
    let opened = sheet.filter(|row| row.get(3).is_some_and(|c| !c.is_empty()));
    assert_eq!(opened.rows().len(), 1);
    assert_eq!(opened.cell(0, 1), "Hauptbahnhof");
    assert_eq!(opened.cell(0, 9), "");

    sheet.retain_rows(|row| row[0] == "2");
    assert_eq!(sheet.cell(0, 1), "Südkreuz");
}
