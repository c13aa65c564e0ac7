use crate::error::{ExecError, FnError, RegistryError};
use crate::rt_types::{Callable, FnMeta, FnResult};
use crate::value::Value;
use log::debug;
use std::collections::HashMap;
use std::future::Future;

#[derive(Clone, Debug)]
enum Entry {
    Callable(Callable),
    /// Known id without an invocable implementation.
    Declared,
}

/// Static mapping from function id to implementation.
///
/// Populated at startup, either by hand (`register_sync`/`register_async`) or from
/// functions annotated with `#[function]`, and read-only while cells are computed.
#[derive(Clone, Debug, Default)]
pub struct FunctionRegistry {
    entries: HashMap<String, Entry>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every function submitted with `#[function]` in the binary.
    pub fn from_submitted() -> Self {
        let mut registry = Self::new();
        registry.register_all_submitted();
        registry
    }

    pub fn register(&mut self, name: &str, callable: Callable) -> Result<(), RegistryError> {
        if self.entries.contains_key(name) {
            return Err(RegistryError::FunctionExists(name.to_string()));
        }
        debug!("registering function {name} ({callable:?})");
        self.entries.insert(name.to_string(), Entry::Callable(callable));
        Ok(())
    }

    pub fn register_sync<F>(&mut self, name: &str, f: F) -> Result<(), RegistryError>
    where
        F: Fn(&[Value]) -> FnResult + Send + Sync + 'static,
    {
        self.register(name, Callable::from_sync(f))
    }

    pub fn register_async<F, Fut>(&mut self, name: &str, f: F) -> Result<(), RegistryError>
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, FnError>> + Send + 'static,
    {
        self.register(name, Callable::from_async(f))
    }

    /// Registers an id that has no implementation. Resolving it fails with
    /// [`ExecError::NotCallable`].
    pub fn declare(&mut self, name: &str) -> Result<(), RegistryError> {
        if self.entries.contains_key(name) {
            return Err(RegistryError::FunctionExists(name.to_string()));
        }
        self.entries.insert(name.to_string(), Entry::Declared);
        Ok(())
    }

    /// Inserts or overwrites an entry. Returns true if an entry was replaced.
    pub fn replace(&mut self, name: &str, callable: Callable) -> bool {
        self.entries
            .insert(name.to_string(), Entry::Callable(callable))
            .is_some()
    }

    pub fn unregister(&mut self, name: &str) -> bool {
        self.entries.remove(name).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Registers the `#[function]` whose Rust identifier is `ident`.
    pub fn register_submitted(&mut self, ident: &str) -> Result<(), RegistryError> {
        let meta = inventory::iter::<FnMeta>
            .into_iter()
            .find(|m| m.ident == ident)
            .ok_or_else(|| RegistryError::NotSubmitted(ident.to_string()))?;
        self.register(meta.name, meta.callable())
    }

    /// Registers every submitted `#[function]` not already present. Returns how many
    /// were added.
    pub fn register_all_submitted(&mut self) -> usize {
        let mut added = 0;
        for meta in inventory::iter::<FnMeta> {
            if !self.entries.contains_key(meta.name) {
                debug!("registering {}::{} as {}", meta.mod_path, meta.ident, meta.name);
                self.entries
                    .insert(meta.name.to_string(), Entry::Callable(meta.callable()));
                added += 1;
            }
        }
        added
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn resolve(&self, name: &str) -> Result<Callable, ExecError> {
        match self.entries.get(name) {
            Some(Entry::Callable(c)) => Ok(c.clone()),
            Some(Entry::Declared) => Err(ExecError::NotCallable { function: name.to_string() }),
            None => Err(ExecError::FunctionNotFound { function: name.to_string() }),
        }
    }
}
