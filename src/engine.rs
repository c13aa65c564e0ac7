use crate::cache::{ArgsSnapshot, CacheEntry, CacheKey, TtlCache};
use crate::column::Column;
use crate::config::{EngineConfig, FailureLogging};
use crate::deps::DependencyGraph;
use crate::error::{ExecError, RegistryError, ResolveError};
use crate::invalidation::{InvalidationIndex, Provenance};
use crate::registry::FunctionRegistry;
use crate::resolver::ArgumentResolver;
use crate::row::{CellKey, Overlay, RowSource};
use crate::rt_types::{AsyncFn, Callable, FnResult, SyncFn};
use crate::value::Value;
use futures::FutureExt;
use log::{debug, trace, warn};
use parking_lot::Mutex;
use std::any::Any;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;
use tokio::time::Instant;

/// Which path produced an [`Execution`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionPath {
    /// A pending recompute marker forced execution past both caches.
    Forced,
    /// Arguments matched the function's last snapshot and the result was cached.
    SnapshotHit,
    /// The result cache held a live entry.
    CacheHit,
    /// The function was invoked (or resolution failed).
    Computed,
}

/// Outcome of one `execute` call.
#[derive(Debug, Clone, PartialEq)]
pub struct Execution {
    pub function: String,
    pub outcome: Result<Value, ExecError>,
    /// Zero on a snapshot hit; the originally recorded time on a cache hit.
    pub execution_time: Duration,
    pub path: ExecutionPath,
}

impl Execution {
    fn failed(function: &str, error: ExecError) -> Self {
        Execution {
            function: function.to_string(),
            outcome: Err(error),
            execution_time: Duration::ZERO,
            path: ExecutionPath::Computed,
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn result(&self) -> Option<&Value> {
        self.outcome.as_ref().ok()
    }

    pub fn error(&self) -> Option<&ExecError> {
        self.outcome.as_ref().err()
    }

    pub fn error_message(&self) -> Option<String> {
        self.error().map(ToString::to_string)
    }

    /// True when no function was invoked to produce this result.
    pub fn from_cache(&self) -> bool {
        matches!(self.path, ExecutionPath::SnapshotHit | ExecutionPath::CacheHit)
    }
}

/// Counters and sizes for observability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Callables actually run, whatever their outcome.
    pub invocations: u64,
    pub snapshot_hits: u64,
    pub cache_hits: u64,
    pub forced: u64,
    pub failures: u64,
    pub timeouts: u64,
    pub result_entries: usize,
    pub snapshot_entries: usize,
    /// Distinct result cache keys attributed to at least one cell.
    pub tracked_keys: usize,
    pub pending_marks: usize,
}

struct EngineState {
    resolved: HashMap<String, Callable>,
    results: TtlCache<CacheKey, CacheEntry>,
    snapshots: TtlCache<String, ArgsSnapshot>,
    invalidation: InvalidationIndex,
    provenance: Provenance,
    stats: EngineStats,
}

impl EngineState {
    fn new(config: &EngineConfig) -> Self {
        EngineState {
            resolved: HashMap::new(),
            results: TtlCache::new(config.result_ttl, config.max_result_entries),
            snapshots: TtlCache::new(config.args_ttl, None),
            invalidation: InvalidationIndex::default(),
            provenance: Provenance::default(),
            stats: EngineStats::default(),
        }
    }

    fn drop_function(&mut self, function: &str) {
        self.resolved.remove(function);
        self.results.retain(|k, _| k.function != function);
        self.snapshots.remove(function);
        self.provenance.forget_function(function);
    }

    fn clear_caches(&mut self) {
        self.resolved.clear();
        self.results.clear();
        self.snapshots.clear();
        self.provenance.clear();
    }
}

/// Computes function-column values with memoization and dependency invalidation.
///
/// All methods take `&self`; shared state sits behind a mutex that is never held across
/// an await, so one engine can serve many concurrent callers. Identical concurrent
/// requests are not deduplicated: both run and the last write wins.
///
/// Async functions are awaited under `tokio::time::timeout`, so execution must happen
/// inside a Tokio runtime.
pub struct ColumnEngine {
    registry: FunctionRegistry,
    config: EngineConfig,
    state: Mutex<EngineState>,
}

impl Default for ColumnEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ColumnEngine {
    pub fn new() -> Self {
        Self::with_registry(FunctionRegistry::new(), EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self::with_registry(FunctionRegistry::new(), config)
    }

    pub fn with_registry(registry: FunctionRegistry, config: EngineConfig) -> Self {
        let state = Mutex::new(EngineState::new(&config));
        ColumnEngine { registry, config, state }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    pub fn register(&mut self, name: &str, callable: Callable) -> Result<(), RegistryError> {
        self.registry.register(name, callable)
    }

    pub fn register_sync<F>(&mut self, name: &str, f: F) -> Result<(), RegistryError>
    where
        F: Fn(&[Value]) -> FnResult + Send + Sync + 'static,
    {
        self.registry.register_sync(name, f)
    }

    pub fn register_async<F, Fut>(&mut self, name: &str, f: F) -> Result<(), RegistryError>
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = FnResult> + Send + 'static,
    {
        self.registry.register_async(name, f)
    }

    pub fn declare(&mut self, name: &str) -> Result<(), RegistryError> {
        self.registry.declare(name)
    }

    pub fn register_submitted(&mut self, ident: &str) -> Result<(), RegistryError> {
        self.registry.register_submitted(ident)
    }

    pub fn register_all_submitted(&mut self) -> usize {
        self.registry.register_all_submitted()
    }

    /// Swaps the implementation of `name` and drops everything cached for it.
    pub fn replace_function(&mut self, name: &str, callable: Callable) {
        self.registry.replace(name, callable);
        self.invalidate(name);
    }

    pub fn unregister_function(&mut self, name: &str) -> bool {
        let removed = self.registry.unregister(name);
        self.invalidate(name);
        removed
    }

    /// Empties the registry along with every cached result and snapshot. Pending
    /// recompute markers are kept.
    pub fn clear_functions(&mut self) {
        self.registry.clear();
        self.state.get_mut().clear_caches();
    }

    fn callable(&self, function_id: &str) -> Result<Callable, ExecError> {
        if let Some(c) = self.state.lock().resolved.get(function_id) {
            return Ok(c.clone());
        }
        let callable = self.registry.resolve(function_id)?;
        self.state
            .lock()
            .resolved
            .insert(function_id.to_string(), callable.clone());
        Ok(callable)
    }

    /// Runs `function_id` with `args`, going through the recompute marker of `cell`, the
    /// args snapshot and the result cache before invoking anything.
    ///
    /// Never fails at this boundary: every error is reported in [`Execution::outcome`],
    /// and failures are never cached.
    pub async fn execute(
        &self,
        function_id: &str,
        args: Vec<Value>,
        timeout: Duration,
        cell: Option<&CellKey>,
    ) -> Execution {
        let key = CacheKey::new(function_id, &args);
        let forced = cell.is_some_and(|cell| self.state.lock().invalidation.take(cell));

        if forced {
            debug!("forced recompute of {function_id} for {}", cell.map(ToString::to_string).unwrap_or_default());
        } else if let Some(hit) = self.lookup_cached(function_id, &args, &key, cell) {
            return hit;
        }

        self.invoke(function_id, args, key, timeout, forced, cell).await
    }

    fn lookup_cached(
        &self,
        function_id: &str,
        args: &[Value],
        key: &CacheKey,
        cell: Option<&CellKey>,
    ) -> Option<Execution> {
        let now = Instant::now();
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let unchanged = state
            .snapshots
            .get(function_id, now)
            .is_some_and(|snap| snap.matches(args));
        if unchanged {
            if let Some(entry) = state.results.get(key, now) {
                let result = entry.result.clone();
                if let Some(cell) = cell {
                    state.provenance.record(cell, key);
                }
                state.stats.snapshot_hits += 1;
                trace!("{function_id}: arguments unchanged, reusing result");
                return Some(Execution {
                    function: function_id.to_string(),
                    outcome: Ok(result),
                    execution_time: Duration::ZERO,
                    path: ExecutionPath::SnapshotHit,
                });
            }
        } else {
            state.snapshots.insert(
                function_id.to_string(),
                ArgsSnapshot { args: args.to_vec(), timestamp: now },
            );
        }

        let entry = state.results.get(key, now)?;
        let (result, execution_time) = (entry.result.clone(), entry.execution_time);
        if let Some(cell) = cell {
            state.provenance.record(cell, key);
        }
        state.stats.cache_hits += 1;
        trace!("{function_id}: result cache hit");
        Some(Execution {
            function: function_id.to_string(),
            outcome: Ok(result),
            execution_time,
            path: ExecutionPath::CacheHit,
        })
    }

    async fn invoke(
        &self,
        function_id: &str,
        args: Vec<Value>,
        key: CacheKey,
        timeout: Duration,
        forced: bool,
        cell: Option<&CellKey>,
    ) -> Execution {
        let started = Instant::now();
        let (ran, outcome) = match self.callable(function_id) {
            Ok(Callable::Sync(f)) => (true, call_sync(function_id, &f, &args)),
            Ok(Callable::Async(f)) => (true, call_async(function_id, &f, args.clone(), timeout).await),
            Err(e) => (false, Err(e)),
        };
        let now = Instant::now();
        let execution_time = now.saturating_duration_since(started);

        let mut guard = self.state.lock();
        let state = &mut *guard;
        if ran {
            state.stats.invocations += 1;
        }
        match &outcome {
            Ok(result) => {
                if forced {
                    state.stats.forced += 1;
                    state
                        .snapshots
                        .insert(function_id.to_string(), ArgsSnapshot { args, timestamp: now });
                }
                let evicted = state.results.insert(
                    key.clone(),
                    CacheEntry { result: result.clone(), timestamp: now, execution_time },
                );
                if let Some(cell) = cell {
                    state.provenance.record(cell, &key);
                }
                for old in &evicted {
                    state.provenance.forget(old);
                }
            }
            Err(err) => {
                state.stats.failures += 1;
                if matches!(err, ExecError::Timeout { .. }) {
                    state.stats.timeouts += 1;
                }
                match self.config.failure_logging {
                    FailureLogging::Verbose => warn!("{function_id} failed: {err}"),
                    FailureLogging::Quiet => debug!("{function_id} failed: {err}"),
                }
            }
        }

        Execution {
            function: function_id.to_string(),
            outcome,
            execution_time,
            path: if forced { ExecutionPath::Forced } else { ExecutionPath::Computed },
        }
    }

    /// Resolves `column`'s arguments against `row` and executes its function for the
    /// cell `(row, column)`.
    ///
    /// Only strict resolve mode returns `Err`. A column without a function yields a
    /// `NotCallable` execution.
    pub async fn compute_cell<R>(
        &self,
        column: &Column,
        row: &R,
        all_columns: &[Column],
        timeout: Duration,
    ) -> Result<Execution, ResolveError>
    where
        R: RowSource + ?Sized,
    {
        let resolver = ArgumentResolver::new(all_columns, self.config.resolve_mode);
        self.compute_with(&resolver, column, row, timeout).await
    }

    async fn compute_with<R>(
        &self,
        resolver: &ArgumentResolver<'_>,
        column: &Column,
        row: &R,
        timeout: Duration,
    ) -> Result<Execution, ResolveError>
    where
        R: RowSource + ?Sized,
    {
        let function = match column.function.as_deref() {
            Some(f) if column.is_computed() => f,
            _ => {
                let error = ExecError::NotCallable { function: column.id.clone() };
                return Ok(Execution::failed(&column.id, error));
            }
        };
        let args = resolver.build_args(column, row)?;
        let cell = CellKey::new(row.row_id(), column.id.as_str());
        Ok(self.execute(function, args, timeout, Some(&cell)).await)
    }

    /// Computes every function column of `row` in dependency order.
    ///
    /// Successful results are layered over a private view of the row so later columns
    /// read fresh upstream values; `row` itself is never modified.
    pub async fn compute_row<R>(&self, row: &R, all_columns: &[Column], timeout: Duration) -> RowComputation
    where
        R: RowSource + ?Sized,
    {
        let plan = RowPlan::new(all_columns, &self.config);
        self.compute_planned(&plan, row, timeout).await
    }

    /// Bulk recompute over many rows, indexing the columns once.
    pub async fn compute_rows<R>(&self, rows: &[R], all_columns: &[Column], timeout: Duration) -> Vec<RowComputation>
    where
        R: RowSource,
    {
        let plan = RowPlan::new(all_columns, &self.config);
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(self.compute_planned(&plan, row, timeout).await);
        }
        out
    }

    async fn compute_planned<R>(&self, plan: &RowPlan<'_>, row: &R, timeout: Duration) -> RowComputation
    where
        R: RowSource + ?Sized,
    {
        let mut view = Overlay { base: row, fields: HashMap::new() };
        let mut cells = Vec::with_capacity(plan.graph.evaluation_order().len());
        for id in plan.graph.evaluation_order() {
            let Some(column) = plan.by_id.get(id.as_str()) else {
                continue;
            };
            let outcome = self.compute_with(&plan.resolver, column, &view, timeout).await;
            if let Ok(Execution { outcome: Ok(value), .. }) = &outcome {
                view.fields.insert(column.id.clone(), value.clone());
            }
            cells.push(CellResult { column_id: column.id.clone(), outcome });
        }
        RowComputation { row_id: row.row_id().to_string(), cells }
    }

    /// Marks every computed column downstream of `column_id` in `row_id` for a forced
    /// recompute and drops their cached results. Returns the affected cells.
    pub fn notify_change(&self, graph: &DependencyGraph, row_id: &str, column_id: &str) -> Vec<CellKey> {
        let cells: Vec<CellKey> = graph
            .dependents_of(column_id)
            .into_iter()
            .map(|dep| CellKey::new(row_id, dep))
            .collect();
        for cell in &cells {
            self.invalidate_cell(cell);
            self.state.lock().invalidation.mark(cell.clone());
        }
        debug!("{row_id}/{column_id} changed, {} dependent cells marked", cells.len());
        cells
    }

    pub fn mark_for_recomputation(&self, row_id: &str, column_id: &str) {
        self.state.lock().invalidation.mark(CellKey::new(row_id, column_id));
    }

    /// Cancels a pending forced recompute. Returns whether one was pending.
    pub fn clear_recomputation_flag(&self, row_id: &str, column_id: &str) -> bool {
        self.state.lock().invalidation.clear(&CellKey::new(row_id, column_id))
    }

    pub fn is_marked_for_recomputation(&self, row_id: &str, column_id: &str) -> bool {
        self.state.lock().invalidation.is_marked(&CellKey::new(row_id, column_id))
    }

    /// Drops the result cache and args-snapshot entries written for this cell.
    pub fn invalidate_for_row_column(&self, row_id: &str, column_id: &str) {
        self.invalidate_cell(&CellKey::new(row_id, column_id));
    }

    /// Drops every pending marker for `row_id`. Returns how many were pending.
    pub fn clear_row_recomputation_flags(&self, row_id: &str) -> usize {
        self.state.lock().invalidation.clear_row(row_id)
    }

    pub fn clear_all_recomputation_flags(&self) {
        self.state.lock().invalidation.clear_all();
    }

    fn invalidate_cell(&self, cell: &CellKey) {
        let mut state = self.state.lock();
        for key in state.provenance.take(cell) {
            state.snapshots.remove(key.function.as_str());
            state.results.remove(&key);
        }
    }

    /// Drops cached results written for any cell of `row_id`.
    pub fn invalidate_row(&self, row_id: &str) {
        let mut state = self.state.lock();
        for key in state.provenance.take_row(row_id) {
            state.snapshots.remove(key.function.as_str());
            state.results.remove(&key);
        }
    }

    /// Drops the resolved callable and every cached result and snapshot for `function_id`.
    pub fn invalidate(&self, function_id: &str) {
        self.state.lock().drop_function(function_id);
    }

    pub fn invalidate_many<I, S>(&self, function_ids: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut state = self.state.lock();
        for id in function_ids {
            state.drop_function(id.as_ref());
        }
    }

    /// Drops every resolved callable, cached result and snapshot. Pending recompute
    /// markers are kept.
    pub fn clear_all(&self) {
        self.state.lock().clear_caches();
    }

    pub fn stats(&self) -> EngineStats {
        let state = self.state.lock();
        EngineStats {
            result_entries: state.results.len(),
            snapshot_entries: state.snapshots.len(),
            tracked_keys: state.provenance.len(),
            pending_marks: state.invalidation.len(),
            ..state.stats
        }
    }
}

/// Column index, resolver and evaluation order shared across the rows of one pass.
struct RowPlan<'a> {
    resolver: ArgumentResolver<'a>,
    graph: DependencyGraph,
    by_id: HashMap<&'a str, &'a Column>,
}

impl<'a> RowPlan<'a> {
    fn new(columns: &'a [Column], config: &EngineConfig) -> Self {
        let graph = DependencyGraph::from_columns(columns);
        if !graph.cyclic().is_empty() {
            warn!("reference cycle among computed columns: {:?}", graph.cyclic());
        }
        RowPlan {
            resolver: ArgumentResolver::new(columns, config.resolve_mode),
            graph,
            by_id: columns.iter().map(|c| (c.id.as_str(), c)).collect(),
        }
    }
}

/// Outcome of computing one cell during a row pass.
#[derive(Debug, Clone, PartialEq)]
pub struct CellResult {
    pub column_id: String,
    pub outcome: Result<Execution, ResolveError>,
}

impl CellResult {
    pub fn is_success(&self) -> bool {
        matches!(&self.outcome, Ok(e) if e.is_success())
    }
}

/// Per-row aggregate of computed cells, in evaluation order.
#[derive(Debug, Clone, PartialEq)]
pub struct RowComputation {
    pub row_id: String,
    pub cells: Vec<CellResult>,
}

impl RowComputation {
    pub fn get(&self, column_id: &str) -> Option<&CellResult> {
        self.cells.iter().find(|c| c.column_id == column_id)
    }

    /// Successful values keyed by column id, for the caller to persist.
    pub fn updates(&self) -> HashMap<String, Value> {
        self.cells
            .iter()
            .filter_map(|c| match &c.outcome {
                Ok(Execution { outcome: Ok(v), .. }) => Some((c.column_id.clone(), v.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn successes(&self) -> usize {
        self.cells.iter().filter(|c| c.is_success()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &CellResult> {
        self.cells.iter().filter(|c| !c.is_success())
    }

    pub fn all_succeeded(&self) -> bool {
        self.cells.iter().all(CellResult::is_success)
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "function panicked".to_string()
    }
}

fn threw(function_id: &str, message: String) -> ExecError {
    ExecError::Threw { function: function_id.to_string(), message }
}

fn call_sync(function_id: &str, f: &SyncFn, args: &[Value]) -> Result<Value, ExecError> {
    match catch_unwind(AssertUnwindSafe(|| f(args))) {
        Ok(Ok(v)) => Ok(v),
        Ok(Err(e)) => Err(threw(function_id, e.to_string())),
        Err(payload) => Err(threw(function_id, panic_message(payload))),
    }
}

async fn call_async(
    function_id: &str,
    f: &AsyncFn,
    args: Vec<Value>,
    timeout: Duration,
) -> Result<Value, ExecError> {
    let fut = match catch_unwind(AssertUnwindSafe(|| f(args))) {
        Ok(fut) => fut,
        Err(payload) => return Err(threw(function_id, panic_message(payload))),
    };
    match tokio::time::timeout(timeout, AssertUnwindSafe(fut).catch_unwind()).await {
        Ok(Ok(Ok(v))) => Ok(v),
        Ok(Ok(Err(e))) => Err(threw(function_id, e.to_string())),
        Ok(Err(payload)) => Err(threw(function_id, panic_message(payload))),
        Err(_) => Err(ExecError::Timeout { function: function_id.to_string(), timeout }),
    }
}
