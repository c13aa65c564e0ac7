use colcalc::{coerce_literal, Value};

fn strings(items: &[&str]) -> Value {
    Value::Array(items.iter().map(|s| Value::from(*s)).collect())
}

#[test]
fn array_types_split_strings_without_numeric_coercion() {
    assert_eq!(coerce_literal(&Value::from("1,2,3"), "number[]"), strings(&["1", "2", "3"]));
    assert_eq!(coerce_literal(&Value::from(" a, ,b ,"), "array"), strings(&["a", "b"]));
    assert_eq!(coerce_literal(&Value::from("x,y"), "{}"), strings(&["x", "y"]));
    assert_eq!(coerce_literal(&Value::from("only"), "string[]"), strings(&["only"]));
    assert_eq!(coerce_literal(&Value::from(""), "string[]"), strings(&[]));
}

#[test]
fn array_markers_match_case_insensitively() {
    assert_eq!(coerce_literal(&Value::from("p,q"), "Array<string>"), strings(&["p", "q"]));
}

#[test]
fn arrays_pass_through_for_any_type() {
    let arr = Value::Array(vec![Value::from(1), Value::Null]);
    assert_eq!(coerce_literal(&arr, "number"), arr);
    assert_eq!(coerce_literal(&arr, ""), arr);
}

#[test]
fn number_type_parses() {
    assert_eq!(coerce_literal(&Value::from("42"), "number"), Value::from(42));
    assert_eq!(coerce_literal(&Value::from(" 2.5 "), "number"), Value::from(2.5));
    assert_eq!(coerce_literal(&Value::from(7), "number"), Value::from(7));
    assert_eq!(coerce_literal(&Value::from(true), "number"), Value::from(1));
}

#[test]
fn unparseable_number_is_nan_not_error() {
    let out = coerce_literal(&Value::from("abc"), "number");
    assert!(out.as_f64().is_some_and(f64::is_nan), "got {out:?}");
}

#[test]
fn boolean_type_compares_text() {
    assert_eq!(coerce_literal(&Value::from("true"), "boolean"), Value::from(true));
    assert_eq!(coerce_literal(&Value::from("false"), "boolean"), Value::from(false));
    assert_eq!(coerce_literal(&Value::from("yes"), "boolean"), Value::from(false));
    assert_eq!(coerce_literal(&Value::from(true), "boolean"), Value::from(true));
}

#[test]
fn other_types_pass_through() {
    assert_eq!(coerce_literal(&Value::from("1,2"), "string"), Value::from("1,2"));
    assert_eq!(coerce_literal(&Value::from(3), ""), Value::from(3));
    // non-string literal with an array type is not split
    assert_eq!(coerce_literal(&Value::from(3), "string[]"), Value::from(3));
}
