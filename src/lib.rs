mod cache;
mod column;
mod config;
mod deps;
mod engine;
mod error;
mod invalidation;
mod macros;
mod registry;
mod resolver;
mod row;
mod rt_types;
mod value;

pub use cache::{ArgsSnapshot, CacheEntry, CacheKey, Timestamped, TtlCache};
pub use column::{ArgumentSpec, Column, ColumnRef, DataType, ROW_ID_TOKEN, ROW_ORDINAL_TOKEN};
pub use config::{
    EngineConfig, FailureLogging, DEFAULT_ARGS_TTL, DEFAULT_MAX_RESULT_ENTRIES, DEFAULT_RESULT_TTL,
    DEFAULT_TIMEOUT,
};
pub use deps::DependencyGraph;
pub use engine::{CellResult, ColumnEngine, EngineStats, Execution, ExecutionPath, RowComputation};
pub use error::{ExecError, FnError, RegistryError, ResolveError};
pub use registry::FunctionRegistry;
pub use resolver::{build_args, coerce_literal, ArgumentResolver, ColumnIndex, ResolveMode};
pub use row::{CellKey, Row, RowSource};
pub use rt_types::{AsyncFn, AsyncShim, Callable, FnFuture, FnKind, FnMeta, FnResult, SyncFn, SyncShim};
pub use value::{bind_arg, FromArg, IntoOutcome, Value};

// Re-export inventory and the #[function] macro for user crates
pub use colcalc_macros::function;
pub use inventory;
