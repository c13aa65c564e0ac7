use colcalc::{ArgumentSpec, Column, DataType, DependencyGraph};

fn col(id: &str, name: &str) -> Column {
    Column::new(id, name, DataType::Number)
}

fn calc(id: &str, name: &str, reads: &[&str]) -> Column {
    Column::computed(id, name, "f", reads.iter().map(|r| ArgumentSpec::column(*r)).collect())
}

#[test]
fn order_puts_upstream_first_and_keeps_declared_order_otherwise() {
    let cols = vec![
        calc("net", "Net", &["Gross", "Tax"]),
        col("price", "Price"),
        calc("gross", "Gross", &["Price"]),
        calc("tax", "Tax", &["Gross"]),
        calc("stamp", "Stamp", &["ID"]),
    ];
    let graph = DependencyGraph::from_columns(&cols);
    assert_eq!(graph.evaluation_order(), ["gross", "stamp", "tax", "net"]);
    assert!(graph.cyclic().is_empty());
}

#[test]
fn dependents_are_transitive_nearest_first() {
    let cols = vec![
        col("price", "Price"),
        calc("gross", "Gross", &["Price"]),
        calc("tax", "Tax", &["Gross"]),
        calc("net", "Net", &["Gross", "Tax"]),
        calc("unrelated", "Unrelated", &["Row"]),
    ];
    let graph = DependencyGraph::from_columns(&cols);
    assert_eq!(graph.direct_dependents("price"), ["gross"]);
    assert_eq!(graph.dependents_of("price"), ["gross", "tax", "net"]);
    assert!(graph.dependents_of("net").is_empty());
    assert!(graph.dependents_of("missing").is_empty());
}

#[test]
fn multi_reference_arguments_add_edges() {
    let cols = vec![
        col("a", "A"),
        col("b", "B"),
        Column::computed("sum", "Sum", "sum", vec![ArgumentSpec::columns(["A", "B", "Nope"])]),
    ];
    let graph = DependencyGraph::from_columns(&cols);
    assert_eq!(graph.direct_dependents("a"), ["sum"]);
    assert_eq!(graph.direct_dependents("b"), ["sum"]);
}

#[test]
fn cycles_are_reported_and_appended() {
    let cols = vec![
        calc("x", "X", &["Y"]),
        calc("y", "Y", &["X"]),
        calc("z", "Z", &["Price"]),
        col("price", "Price"),
    ];
    let graph = DependencyGraph::from_columns(&cols);
    assert_eq!(graph.cyclic(), ["x", "y"]);
    assert_eq!(graph.evaluation_order(), ["z", "x", "y"]);
}
