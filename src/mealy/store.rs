//! Per-key state storage
//!
//! The store is caller-owned memory, not a cache: nothing is evicted. State
//! for a key lives until `delete` is called, so callers that churn through
//! conversations must delete state on teardown or it accumulates.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Key → state map
pub trait Store<S>: Send + Sync {
    fn get(&self, id: &str) -> Option<S>;

    fn set(&self, id: &str, state: S);

    fn has(&self, id: &str) -> bool;

    fn delete(&self, id: &str);
}

impl<S, T: Store<S> + ?Sized> Store<S> for Arc<T> {
    fn get(&self, id: &str) -> Option<S> {
        (**self).get(id)
    }

    fn set(&self, id: &str, state: S) {
        (**self).set(id, state);
    }

    fn has(&self, id: &str) -> bool {
        (**self).has(id)
    }

    fn delete(&self, id: &str) {
        (**self).delete(id);
    }
}

/// In-memory store for the lifetime of the process
#[derive(Debug)]
pub struct MemoryStore<S> {
    states: RwLock<HashMap<String, S>>,
}

impl<S> MemoryStore<S> {
    pub fn new() -> Self {
        Self {
            states: RwLock::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.states
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys with stored state, in no particular order
    pub fn ids(&self) -> Vec<String> {
        self.states
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }
}

impl<S> Default for MemoryStore<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Clone + Send + Sync> Store<S> for MemoryStore<S> {
    fn get(&self, id: &str) -> Option<S> {
        self.states
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    fn set(&self, id: &str, state: S) {
        self.states
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.to_string(), state);
    }

    fn has(&self, id: &str) -> bool {
        self.states
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(id)
    }

    fn delete(&self, id: &str) {
        self.states
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
    }
}
