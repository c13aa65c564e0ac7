use colcalc::{
    build_args, ArgumentResolver, ArgumentSpec, Column, ColumnRef, DataType, ResolveError, ResolveMode, Row, Value,
};

fn columns() -> Vec<Column> {
    vec![
        Column::new("a", "A", DataType::Number),
        Column::new("b", "B", DataType::Number),
    ]
}

fn row() -> Row {
    Row::new("booking-17", 4).with("a", 5).with("b", 9)
}

fn computed(arguments: Vec<ArgumentSpec>) -> Column {
    Column::computed("c", "C", "f", arguments)
}

#[test]
fn single_reference_resolves_to_value() {
    let col = computed(vec![ArgumentSpec::column("A")]);
    assert_eq!(build_args(&col, &row(), &columns()), vec![Value::from(5)]);
}

#[test]
fn multi_reference_resolves_to_nested_array() {
    let col = computed(vec![ArgumentSpec::columns(["A", "B"])]);
    let args = build_args(&col, &row(), &columns());
    assert_eq!(args, vec![Value::Array(vec![Value::from(5), Value::from(9)])]);
}

#[test]
fn reserved_tokens_ignore_column_list() {
    let col = computed(vec![ArgumentSpec::column("ID"), ArgumentSpec::column("Row")]);
    assert_eq!(col.arguments[0].column_reference, Some(ColumnRef::RowId));
    assert_eq!(col.arguments[1].column_reference, Some(ColumnRef::RowOrdinal));

    let args = build_args(&col, &row(), &[]);
    assert_eq!(args, vec![Value::from("booking-17"), Value::from(4)]);
}

#[test]
fn reserved_tokens_inside_reference_list() {
    let col = computed(vec![ArgumentSpec::columns(["ID", "A", "Row"])]);
    let args = build_args(&col, &row(), &columns());
    assert_eq!(
        args,
        vec![Value::Array(vec![Value::from("booking-17"), Value::from(5), Value::from(4)])]
    );
}

#[test]
fn unknown_names_are_undefined_holes() {
    let col = computed(vec![ArgumentSpec::column("Missing"), ArgumentSpec::columns(["A", "Nope"])]);
    let args = build_args(&col, &row(), &columns());
    assert_eq!(
        args,
        vec![Value::Undefined, Value::Array(vec![Value::from(5), Value::Undefined])]
    );
}

#[test]
fn known_column_without_stored_value_is_undefined() {
    let cols = columns();
    let col = computed(vec![ArgumentSpec::column("B")]);
    let sparse = Row::new("r", 0).with("a", 1);
    assert_eq!(build_args(&col, &sparse, &cols), vec![Value::Undefined]);
}

#[test]
fn strict_mode_rejects_unknown_names() {
    let cols = columns();
    let resolver = ArgumentResolver::new(&cols, ResolveMode::Strict);
    let col = computed(vec![ArgumentSpec::column("A"), ArgumentSpec::column("Typo")]);
    match resolver.build_args(&col, &row()) {
        Err(ResolveError::UnknownColumn { column, reference }) => {
            assert_eq!(column, "C");
            assert_eq!(reference, "Typo");
        }
        other => panic!("expected UnknownColumn, got {other:?}"),
    }
}

#[test]
fn resolution_priority_and_fallthrough() {
    let mut spec = ArgumentSpec::column("A");
    spec.column_references = vec![ColumnRef::named("B")];
    spec.value = Some(Value::from(1));

    let mut blank = ArgumentSpec::literal("7", "number");
    blank.column_reference = Some(ColumnRef::named(""));

    let col = computed(vec![spec, blank, ArgumentSpec::default()]);
    let args = build_args(&col, &row(), &columns());
    assert_eq!(
        args,
        vec![Value::Array(vec![Value::from(9)]), Value::from(7), Value::Undefined]
    );
}

#[test]
fn hoisted_resolver_serves_many_rows() {
    let cols = columns();
    let resolver = ArgumentResolver::new(&cols, ResolveMode::Permissive);
    assert_eq!(resolver.index().len(), 2);

    let col = computed(vec![ArgumentSpec::column("A"), ArgumentSpec::column("B")]);
    for i in 0..5 {
        let r = Row::new(format!("r{i}"), i).with("a", i).with("b", i * 10);
        let args = resolver.build_args(&col, &r).unwrap();
        assert_eq!(args, vec![Value::from(i), Value::from(i * 10)]);
    }
}

#[test]
fn columns_and_rows_load_from_json() {
    let cols: Vec<Column> = serde_json::from_str(
        r#"[
            {"id": "a", "columnName": "A", "dataType": "number"},
            {"id": "c", "columnName": "C", "dataType": "function", "function": "sum",
             "arguments": [
                {"name": "x", "columnReference": "A"},
                {"columnReferences": ["A", "ID"]},
                {"value": "1,2", "type": "string[]"}
             ]}
        ]"#,
    )
    .unwrap();
    let r: Row = serde_json::from_str(r#"{"id": "doc-1", "row": 2, "fields": {"a": 3}}"#).unwrap();

    assert!(cols[1].is_computed());
    assert_eq!(cols[1].function.as_deref(), Some("sum"));
    let args = build_args(&cols[1], &r, &cols);
    assert_eq!(
        args,
        vec![
            Value::from(3),
            Value::Array(vec![Value::from(3), Value::from("doc-1")]),
            Value::Array(vec![Value::from("1"), Value::from("2")]),
        ]
    );
}
