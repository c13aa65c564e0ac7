use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Why an execution failed. Returned inside [`Execution`](crate::Execution), never thrown
/// across the `execute` boundary.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExecError {
    #[error("function not found: {function}")]
    FunctionNotFound { function: String },
    #[error("function is not callable: {function}")]
    NotCallable { function: String },
    #[error("function {function} timed out after {}ms", timeout.as_millis())]
    Timeout { function: String, timeout: Duration },
    #[error("{message}")]
    Threw { function: String, message: String },
}

impl ExecError {
    pub fn function(&self) -> &str {
        match self {
            ExecError::FunctionNotFound { function }
            | ExecError::NotCallable { function }
            | ExecError::Timeout { function, .. }
            | ExecError::Threw { function, .. } => function,
        }
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("function already exists: {0}")]
    FunctionExists(String),
    #[error("no #[function] submitted under the name: {0}")]
    NotSubmitted(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("column {column} references unknown column: {reference}")]
    UnknownColumn { column: String, reference: String },
}

/// Error type returned by registered column functions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct FnError(String);

impl FnError {
    pub fn new(message: impl fmt::Display) -> Self {
        FnError(message.to_string())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

impl From<String> for FnError {
    fn from(message: String) -> Self {
        FnError(message)
    }
}

impl From<&str> for FnError {
    fn from(message: &str) -> Self {
        FnError(message.to_string())
    }
}
