use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Read access to a row's data.
///
/// Implement this for your own row representation to compute cells without first
/// copying into a [`Row`]. The engine only ever reads through this trait.
pub trait RowSource {
    /// Document identifier, resolved by the reserved `ID` reference.
    fn row_id(&self) -> &str;
    /// Ordinal position, resolved by the reserved `Row` reference.
    fn ordinal(&self) -> u64;
    /// Stored value for a column id, if any.
    fn field(&self, column_id: &str) -> Option<&Value>;
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Row {
    pub id: String,
    #[serde(default)]
    pub row: u64,
    #[serde(default)]
    pub fields: HashMap<String, Value>,
}

impl Row {
    pub fn new(id: impl Into<String>, row: u64) -> Self {
        Row { id: id.into(), row, fields: HashMap::new() }
    }

    pub fn with(mut self, column_id: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(column_id.into(), value.into());
        self
    }

    pub fn set(&mut self, column_id: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(column_id.into(), value.into());
    }
}

impl RowSource for Row {
    fn row_id(&self) -> &str {
        &self.id
    }

    fn ordinal(&self) -> u64 {
        self.row
    }

    fn field(&self, column_id: &str) -> Option<&Value> {
        self.fields.get(column_id)
    }
}

/// A row source with a set of values layered over another source.
pub(crate) struct Overlay<'a, R: ?Sized> {
    pub base: &'a R,
    pub fields: HashMap<String, Value>,
}

impl<R: RowSource + ?Sized> RowSource for Overlay<'_, R> {
    fn row_id(&self) -> &str {
        self.base.row_id()
    }

    fn ordinal(&self) -> u64 {
        self.base.ordinal()
    }

    fn field(&self, column_id: &str) -> Option<&Value> {
        self.fields.get(column_id).or_else(|| self.base.field(column_id))
    }
}

/// Identifies one cell: a column of a specific row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellKey {
    pub row_id: String,
    pub column_id: String,
}

impl CellKey {
    pub fn new(row_id: impl Into<String>, column_id: impl Into<String>) -> Self {
        CellKey { row_id: row_id.into(), column_id: column_id.into() }
    }
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.row_id, self.column_id)
    }
}
