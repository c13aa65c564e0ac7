use crate::column::{ArgumentSpec, Column, ColumnRef};
use crate::error::ResolveError;
use crate::row::RowSource;
use crate::value::Value;
use serde::Deserialize;
use std::collections::HashMap;

/// What to do with a reference to a column name that does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolveMode {
    /// Unknown names resolve to `Undefined`; the callable decides how to treat the hole.
    #[default]
    Permissive,
    /// Unknown names fail with [`ResolveError::UnknownColumn`].
    Strict,
}

/// Name → column index over a column list.
///
/// Building it is linear in the number of columns; when resolving many rows against the
/// same columns, build one and reuse it through [`ArgumentResolver`].
pub struct ColumnIndex<'a> {
    by_name: HashMap<&'a str, &'a Column>,
}

impl<'a> ColumnIndex<'a> {
    pub fn new(columns: &'a [Column]) -> Self {
        let by_name = columns.iter().map(|c| (c.column_name.as_str(), c)).collect();
        ColumnIndex { by_name }
    }

    pub fn get(&self, name: &str) -> Option<&'a Column> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// Builds positional argument vectors for computed columns.
pub struct ArgumentResolver<'a> {
    index: ColumnIndex<'a>,
    mode: ResolveMode,
}

impl<'a> ArgumentResolver<'a> {
    pub fn new(columns: &'a [Column], mode: ResolveMode) -> Self {
        ArgumentResolver { index: ColumnIndex::new(columns), mode }
    }

    pub fn index(&self) -> &ColumnIndex<'a> {
        &self.index
    }

    /// Resolves every argument of `column` against `row`. The result has exactly one
    /// entry per declared argument.
    pub fn build_args<R>(&self, column: &Column, row: &R) -> Result<Vec<Value>, ResolveError>
    where
        R: RowSource + ?Sized,
    {
        column
            .arguments
            .iter()
            .map(|spec| self.resolve_arg(column, spec, row))
            .collect()
    }

    fn resolve_arg<R>(&self, column: &Column, spec: &ArgumentSpec, row: &R) -> Result<Value, ResolveError>
    where
        R: RowSource + ?Sized,
    {
        if !spec.column_references.is_empty() {
            let values = spec
                .column_references
                .iter()
                .map(|r| self.resolve_ref(column, r, row))
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(Value::Array(values));
        }
        if let Some(reference) = spec.column_reference.as_ref().filter(|r| !r.is_blank()) {
            return self.resolve_ref(column, reference, row);
        }
        if let Some(value) = &spec.value {
            return Ok(coerce_literal(value, &spec.type_hint));
        }
        Ok(Value::Undefined)
    }

    fn resolve_ref<R>(&self, column: &Column, reference: &ColumnRef, row: &R) -> Result<Value, ResolveError>
    where
        R: RowSource + ?Sized,
    {
        match reference {
            ColumnRef::RowId => Ok(Value::String(row.row_id().to_string())),
            ColumnRef::RowOrdinal => Ok(Value::from(row.ordinal())),
            ColumnRef::Named(name) => match self.index.get(name) {
                Some(target) => Ok(row.field(&target.id).cloned().unwrap_or_default()),
                None if self.mode == ResolveMode::Strict => Err(ResolveError::UnknownColumn {
                    column: column.column_name.clone(),
                    reference: name.clone(),
                }),
                None => Ok(Value::Undefined),
            },
        }
    }
}

/// Resolves the arguments of `column` against `row`, indexing `all_columns` for this call
/// only. Unknown column names resolve to `Undefined`.
pub fn build_args<R>(column: &Column, row: &R, all_columns: &[Column]) -> Vec<Value>
where
    R: RowSource + ?Sized,
{
    ArgumentResolver::new(all_columns, ResolveMode::Permissive)
        .build_args(column, row)
        .unwrap_or_else(|_| vec![Value::Undefined; column.arguments.len()])
}

const ARRAY_MARKERS: [&str; 4] = ["[]", "array", "{}", "string[]"];

/// Coerces a literal argument according to its declared type.
///
/// Arrays pass through. For an array-like type a string literal is split on commas,
/// trimmed, and empty segments dropped (elements stay strings). `number` parses, with
/// unparseable text becoming NaN. `boolean` is true only for the text `true`.
pub fn coerce_literal(value: &Value, type_hint: &str) -> Value {
    if let Value::Array(_) = value {
        return value.clone();
    }
    let hint = type_hint.to_ascii_lowercase();
    if ARRAY_MARKERS.iter().any(|m| hint.contains(m)) {
        if let Value::String(s) = value {
            return Value::Array(
                s.split(',')
                    .map(str::trim)
                    .filter(|seg| !seg.is_empty())
                    .map(Value::from)
                    .collect(),
            );
        }
    }
    if hint.contains("number") {
        return Value::Number(value.to_number());
    }
    if hint.contains("boolean") {
        return Value::Bool(value.to_string() == "true");
    }
    value.clone()
}
