use crate::error::FnError;
use crate::value::Value;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

pub type FnResult = Result<Value, FnError>;
pub type FnFuture = BoxFuture<'static, FnResult>;

/// Shim signatures generated by `#[function]`.
pub type SyncShim = fn(&[Value]) -> FnResult;
pub type AsyncShim = fn(Vec<Value>) -> FnFuture;

pub type SyncFn = Arc<dyn Fn(&[Value]) -> FnResult + Send + Sync>;
pub type AsyncFn = Arc<dyn Fn(Vec<Value>) -> FnFuture + Send + Sync>;

/// A registered implementation together with its execution capability.
///
/// The capability is fixed at registration time: sync callables run inline and cannot
/// time out, async callables are awaited under the caller's timeout.
#[derive(Clone)]
pub enum Callable {
    Sync(SyncFn),
    Async(AsyncFn),
}

impl Callable {
    pub fn from_sync<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> FnResult + Send + Sync + 'static,
    {
        Callable::Sync(Arc::new(f))
    }

    pub fn from_async<F, Fut>(f: F) -> Self
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = FnResult> + Send + 'static,
    {
        Callable::Async(Arc::new(move |args| f(args).boxed()))
    }

    pub fn is_async(&self) -> bool {
        matches!(self, Callable::Async(_))
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callable::Sync(_) => f.write_str("Callable::Sync"),
            Callable::Async(_) => f.write_str("Callable::Async"),
        }
    }
}

#[derive(Clone, Copy)]
pub enum FnKind {
    Sync(SyncShim),
    Async(AsyncShim),
}

/// Metadata submitted by `#[function]` through `inventory`.
pub struct FnMeta {
    /// Registry id the function is registered under.
    pub name: &'static str,
    /// Rust identifier of the annotated function.
    pub ident: &'static str,
    pub mod_path: &'static str,
    pub kind: FnKind,
}

impl FnMeta {
    pub fn callable(&self) -> Callable {
        match self.kind {
            FnKind::Sync(f) => Callable::Sync(Arc::new(f)),
            FnKind::Async(f) => Callable::Async(Arc::new(f)),
        }
    }
}

inventory::collect!(FnMeta);
