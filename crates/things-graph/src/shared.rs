//! Thread-safe handle around an `EntityGraph`.
//!
//! One coarse `RwLock` guards the whole graph: readers run concurrently,
//! every mutation is exclusive. Two-sided relationship registration happens
//! inside a single write section, so no reader observes it half done.

use std::sync::{Arc, RwLock};

use crate::error::{GraphError, Result};
use crate::graph::EntityGraph;

/// Cloneable shared handle to a graph.
#[derive(Debug, Clone, Default)]
pub struct SharedGraph {
    inner: Arc<RwLock<EntityGraph>>,
}

impl SharedGraph {
    pub fn new(graph: EntityGraph) -> Self {
        Self {
            inner: Arc::new(RwLock::new(graph)),
        }
    }

    /// Run `f` under the shared lock.
    pub fn read<R>(&self, f: impl FnOnce(&EntityGraph) -> R) -> Result<R> {
        let guard = self.inner.read().map_err(|_| GraphError::LockPoisoned)?;
        Ok(f(&guard))
    }

    /// Run `f` under the exclusive lock.
    pub fn write<R>(&self, f: impl FnOnce(&mut EntityGraph) -> R) -> Result<R> {
        let mut guard = self.inner.write().map_err(|_| GraphError::LockPoisoned)?;
        Ok(f(&mut guard))
    }
}

impl From<EntityGraph> for SharedGraph {
    fn from(graph: EntityGraph) -> Self {
        Self::new(graph)
    }
}
