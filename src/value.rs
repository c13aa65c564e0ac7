use crate::error::FnError;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// A dynamically typed cell value.
///
/// `Undefined` is distinct from `Null`: it marks an argument whose source could not be
/// resolved (a missing column, an absent field, an empty argument spec) and lets the
/// callable apply its own default.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(from = "serde_json::Value")]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
    Object(BTreeMap<String, Value>),
}

impl Value {
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Lenient numeric conversion: numbers pass, strings are parsed after trimming,
    /// booleans become 1/0. Anything else, including unparseable text, is NaN.
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Number(n) => *n,
            Value::Bool(true) => 1.0,
            Value::Bool(false) => 0.0,
            Value::String(s) => s.trim().parse::<f64>().unwrap_or(f64::NAN),
            _ => f64::NAN,
        }
    }

    /// Deterministic serialization used for cache keys. Undefined and NaN serialize as
    /// `null`; the infinities get their own tags so they never share a key.
    pub(crate) fn cache_fragment(args: &[Value]) -> String {
        serde_json::to_string(&KeyRepr::Slice(args)).unwrap_or_default()
    }
}

const INFINITY_TAG: &str = "\u{0}inf";

enum KeyRepr<'a> {
    Slice(&'a [Value]),
    One(&'a Value),
}

impl Serialize for KeyRepr<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            KeyRepr::Slice(items) => serializer.collect_seq(items.iter().map(KeyRepr::One)),
            KeyRepr::One(Value::Number(n)) if n.is_infinite() => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(INFINITY_TAG, if *n > 0.0 { "+" } else { "-" })?;
                map.end()
            }
            KeyRepr::One(Value::Array(items)) => KeyRepr::Slice(items).serialize(serializer),
            KeyRepr::One(Value::Object(map)) => {
                serializer.collect_map(map.iter().map(|(k, v)| (k, KeyRepr::One(v))))
            }
            KeyRepr::One(other) => other.serialize(serializer),
        }
    }
}

fn fmt_number(n: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if n.is_nan() {
        f.write_str("NaN")
    } else if n.is_infinite() {
        f.write_str(if n > 0.0 { "Infinity" } else { "-Infinity" })
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        write!(f, "{}", n as i64)
    } else {
        write!(f, "{n}")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => fmt_number(*n, f),
            Value::String(s) => f.write_str(s),
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    if !item.is_nullish() {
                        write!(f, "{item}")?;
                    }
                }
                Ok(())
            }
            Value::Object(_) => f.write_str("[object Object]"),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Undefined | Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) if n.is_finite() => serializer.serialize_f64(*n),
            Value::Number(_) => serializer.serialize_unit(),
            Value::String(s) => serializer.serialize_str(s),
            Value::Array(items) => items.serialize(serializer),
            Value::Object(map) => map.serialize(serializer),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

macro_rules! number_from {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(n: $t) -> Self {
                Value::Number(n as f64)
            }
        })*
    };
}
number_from!(f64, f32, i64, i32, u64, u32, usize);

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Value::Object(map)
    }
}

/// Conversion from a positional argument into a typed `#[function]` parameter.
///
/// `None` means the argument vector was shorter than the parameter list.
pub trait FromArg: Sized {
    fn from_arg(arg: Option<&Value>) -> Result<Self, FnError>;
}

fn present(arg: Option<&Value>) -> Result<&Value, FnError> {
    match arg {
        None | Some(Value::Undefined) => Err(FnError::from("value is undefined")),
        Some(Value::Null) => Err(FnError::from("value is null")),
        Some(v) => Ok(v),
    }
}

impl FromArg for Value {
    fn from_arg(arg: Option<&Value>) -> Result<Self, FnError> {
        Ok(arg.cloned().unwrap_or_default())
    }
}

impl FromArg for f64 {
    fn from_arg(arg: Option<&Value>) -> Result<Self, FnError> {
        match present(arg)? {
            Value::Number(n) => Ok(*n),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| FnError::new(format!("expected a number, got {s:?}"))),
            other => Err(FnError::new(format!("expected a number, got {other}"))),
        }
    }
}

impl FromArg for String {
    fn from_arg(arg: Option<&Value>) -> Result<Self, FnError> {
        match present(arg)? {
            Value::String(s) => Ok(s.clone()),
            v @ (Value::Number(_) | Value::Bool(_)) => Ok(v.to_string()),
            other => Err(FnError::new(format!("expected a string, got {other}"))),
        }
    }
}

impl FromArg for bool {
    fn from_arg(arg: Option<&Value>) -> Result<Self, FnError> {
        match present(arg)? {
            Value::Bool(b) => Ok(*b),
            Value::String(s) if s == "true" => Ok(true),
            Value::String(s) if s == "false" => Ok(false),
            other => Err(FnError::new(format!("expected a boolean, got {other}"))),
        }
    }
}

impl<T: FromArg> FromArg for Option<T> {
    fn from_arg(arg: Option<&Value>) -> Result<Self, FnError> {
        match arg {
            None | Some(Value::Undefined) | Some(Value::Null) => Ok(None),
            Some(v) => T::from_arg(Some(v)).map(Some),
        }
    }
}

impl<T: FromArg> FromArg for Vec<T> {
    fn from_arg(arg: Option<&Value>) -> Result<Self, FnError> {
        match present(arg)? {
            Value::Array(items) => items.iter().map(|v| T::from_arg(Some(v))).collect(),
            other => Err(FnError::new(format!("expected an array, got {other}"))),
        }
    }
}

/// Binds positional argument `position` to a typed parameter, naming the function and
/// position in the error. Used by code generated from `#[function]`.
#[doc(hidden)]
pub fn bind_arg<T: FromArg>(function: &str, position: usize, args: &[Value]) -> Result<T, FnError> {
    T::from_arg(args.get(position))
        .map_err(|e| FnError::new(format!("{function}: argument {position}: {e}")))
}

/// Conversion from a `#[function]` return value into the engine's result type.
pub trait IntoOutcome {
    fn into_outcome(self) -> Result<Value, FnError>;
}

macro_rules! outcome_from_value {
    ($($t:ty),*) => {
        $(impl IntoOutcome for $t {
            fn into_outcome(self) -> Result<Value, FnError> {
                Ok(self.into())
            }
        })*
    };
}
outcome_from_value!(Value, f64, f32, i64, i32, u64, u32, usize, bool, String, &'static str);

impl<T: Into<Value>> IntoOutcome for Vec<T> {
    fn into_outcome(self) -> Result<Value, FnError> {
        Ok(self.into())
    }
}

impl<T: Into<Value>> IntoOutcome for Option<T> {
    fn into_outcome(self) -> Result<Value, FnError> {
        Ok(self.into())
    }
}

impl<T: Into<Value>, E: Into<FnError>> IntoOutcome for Result<T, E> {
    fn into_outcome(self) -> Result<Value, FnError> {
        self.map(Into::into).map_err(Into::into)
    }
}
