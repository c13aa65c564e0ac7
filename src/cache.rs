use crate::value::Value;
use indexmap::IndexMap;
use std::borrow::Borrow;
use std::hash::Hash;
use std::time::Duration;
use tokio::time::Instant;

/// A memoized function result.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub result: Value,
    pub timestamp: Instant,
    /// How long the original execution took.
    pub execution_time: Duration,
}

/// The last arguments seen for a function.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgsSnapshot {
    pub args: Vec<Value>,
    pub timestamp: Instant,
}

impl ArgsSnapshot {
    /// Same length and slot-by-slot equal. NaN never equals NaN.
    pub fn matches(&self, args: &[Value]) -> bool {
        self.args.len() == args.len() && self.args.iter().zip(args).all(|(a, b)| a == b)
    }
}

pub trait Timestamped {
    fn timestamp(&self) -> Instant;
}

impl Timestamped for CacheEntry {
    fn timestamp(&self) -> Instant {
        self.timestamp
    }
}

impl Timestamped for ArgsSnapshot {
    fn timestamp(&self) -> Instant {
        self.timestamp
    }
}

/// Result cache key: function id plus the serialized argument vector.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    pub function: String,
    pub args: String,
}

impl CacheKey {
    pub fn new(function: &str, args: &[Value]) -> Self {
        CacheKey { function: function.to_string(), args: Value::cache_fragment(args) }
    }
}

/// Key-value store with lazy TTL expiry and an optional LRU bound.
///
/// Expired entries are never swept; `get` treats them as absent and the next `insert`
/// for the same key overwrites them. An entry whose age equals the TTL is still live.
///
/// Recency is the insertion order of the backing `IndexMap`. Touching an entry on a hit
/// and evicting from the front both shift the tail, so hits and evicting inserts cost
/// O(n) in the number of entries. That is cheap at the default bound of ten thousand
/// entries; much larger bounds want a linked LRU.
#[derive(Debug)]
pub struct TtlCache<K, V> {
    entries: IndexMap<K, V>,
    ttl: Duration,
    capacity: Option<usize>,
}

impl<K, V> TtlCache<K, V>
where
    K: Hash + Eq,
    V: Timestamped,
{
    pub fn new(ttl: Duration, capacity: Option<usize>) -> Self {
        TtlCache { entries: IndexMap::new(), ttl, capacity }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn is_live(&self, entry: &V, now: Instant) -> bool {
        now.saturating_duration_since(entry.timestamp()) <= self.ttl
    }

    /// Returns the entry if present and not expired at `now`, marking it most recently used.
    pub fn get<Q>(&mut self, key: &Q, now: Instant) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = self.entries.get_index_of(key)?;
        let (_, entry) = self.entries.get_index(idx)?;
        if !self.is_live(entry, now) {
            return None;
        }
        let last = self.entries.len() - 1;
        self.entries.move_index(idx, last);
        self.entries.get_index(last).map(|(_, v)| v)
    }

    /// Like [`get`](Self::get) without touching recency.
    pub fn peek<Q>(&self, key: &Q, now: Instant) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.get(key).filter(|e| self.is_live(e, now))
    }

    /// Inserts or overwrites `key` as most recently used. Returns the keys evicted to
    /// stay within capacity, least recently used first.
    pub fn insert(&mut self, key: K, value: V) -> Vec<K> {
        let (idx, _) = self.entries.insert_full(key, value);
        let last = self.entries.len() - 1;
        self.entries.move_index(idx, last);
        let mut evicted = Vec::new();
        if let Some(cap) = self.capacity {
            while self.entries.len() > cap {
                match self.entries.shift_remove_index(0) {
                    Some((k, _)) => evicted.push(k),
                    None => break,
                }
            }
        }
        evicted
    }

    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.shift_remove(key)
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&K, &V) -> bool) {
        self.entries.retain(|k, v| keep(k, v));
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
