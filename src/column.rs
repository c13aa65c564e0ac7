use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reserved reference token resolving to the row's document identifier.
pub const ROW_ID_TOKEN: &str = "ID";
/// Reserved reference token resolving to the row's ordinal position.
pub const ROW_ORDINAL_TOKEN: &str = "Row";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    #[default]
    String,
    Number,
    Boolean,
    Date,
    Currency,
    Select,
    Email,
    Function,
}

/// Where a single argument value comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ColumnRef {
    RowId,
    RowOrdinal,
    Named(String),
}

impl ColumnRef {
    pub fn parse(token: &str) -> ColumnRef {
        match token {
            ROW_ID_TOKEN => ColumnRef::RowId,
            ROW_ORDINAL_TOKEN => ColumnRef::RowOrdinal,
            name => ColumnRef::Named(name.to_string()),
        }
    }

    pub fn named(name: impl Into<String>) -> ColumnRef {
        ColumnRef::Named(name.into())
    }

    /// A named reference with an empty name counts as "no reference".
    pub fn is_blank(&self) -> bool {
        matches!(self, ColumnRef::Named(name) if name.is_empty())
    }
}

impl From<String> for ColumnRef {
    fn from(token: String) -> Self {
        ColumnRef::parse(&token)
    }
}

impl From<&str> for ColumnRef {
    fn from(token: &str) -> Self {
        ColumnRef::parse(token)
    }
}

impl From<ColumnRef> for String {
    fn from(r: ColumnRef) -> Self {
        r.to_string()
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnRef::RowId => f.write_str(ROW_ID_TOKEN),
            ColumnRef::RowOrdinal => f.write_str(ROW_ORDINAL_TOKEN),
            ColumnRef::Named(name) => f.write_str(name),
        }
    }
}

/// Declarative description of one positional argument of a computed column.
///
/// Resolution modes are tried in order: `column_references`, `column_reference`, `value`.
/// If none applies the argument is [`Value::Undefined`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArgumentSpec {
    /// Parameter name, informational only.
    pub name: String,
    /// Declared type, e.g. `number`, `boolean`, `string[]`. Drives literal coercion.
    #[serde(rename = "type")]
    pub type_hint: String,
    pub column_reference: Option<ColumnRef>,
    pub column_references: Vec<ColumnRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl ArgumentSpec {
    pub fn column(reference: impl Into<ColumnRef>) -> Self {
        ArgumentSpec { column_reference: Some(reference.into()), ..Default::default() }
    }

    pub fn columns<I, R>(references: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<ColumnRef>,
    {
        ArgumentSpec {
            column_references: references.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn literal(value: impl Into<Value>, type_hint: impl Into<String>) -> Self {
        ArgumentSpec {
            type_hint: type_hint.into(),
            value: Some(value.into()),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// All column references this argument depends on, in declared order.
    pub fn references(&self) -> impl Iterator<Item = &ColumnRef> {
        self.column_references
            .iter()
            .chain(self.column_reference.iter())
            .filter(|r| !r.is_blank())
    }
}

/// A typed slot in a row. Only `Function` columns are computed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub id: String,
    pub column_name: String,
    #[serde(default)]
    pub data_type: DataType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
    /// Positional parameter order of the registered callable.
    #[serde(default)]
    pub arguments: Vec<ArgumentSpec>,
}

impl Column {
    pub fn new(id: impl Into<String>, column_name: impl Into<String>, data_type: DataType) -> Self {
        Column {
            id: id.into(),
            column_name: column_name.into(),
            data_type,
            function: None,
            arguments: Vec::new(),
        }
    }

    pub fn computed(
        id: impl Into<String>,
        column_name: impl Into<String>,
        function: impl Into<String>,
        arguments: Vec<ArgumentSpec>,
    ) -> Self {
        Column {
            id: id.into(),
            column_name: column_name.into(),
            data_type: DataType::Function,
            function: Some(function.into()),
            arguments,
        }
    }

    pub fn is_computed(&self) -> bool {
        self.data_type == DataType::Function
    }

    /// Names of the columns this column reads, excluding the reserved row tokens.
    pub fn referenced_names(&self) -> impl Iterator<Item = &str> {
        self.arguments.iter().flat_map(|a| a.references()).filter_map(|r| match r {
            ColumnRef::Named(name) => Some(name.as_str()),
            _ => None,
        })
    }
}
