//! Per-container state management.
//!
//! Provides [`ContainerMap`], a thread-safe concurrent store that keeps one
//! isolated state instance per container.

use std::sync::Arc;

use dashmap::DashMap;

use crate::types::ContainerId;

/// Thread-safe store holding one state instance of type `T` per container.
///
/// Uses `DashMap` for lock-free concurrent access.
///
/// # Examples
///
/// ```
/// use treegate_core::{ContainerId, ContainerMap};
///
/// #[derive(Debug, Default)]
/// struct Settings {
///     writes: std::sync::atomic::AtomicU64,
/// }
///
/// let store = ContainerMap::<Settings>::new();
/// let container = ContainerId::new("C1").unwrap();
/// let state = store.get_or_create(&container);
/// state.writes.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
/// ```
#[derive(Debug)]
pub struct ContainerMap<T: Default + Send + Sync> {
    inner: DashMap<ContainerId, Arc<T>>,
}

impl<T: Default + Send + Sync> ContainerMap<T> {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: DashMap::new(),
        }
    }

    /// Get or create the state for the given container.
    ///
    /// If the state does not exist, a new default instance is created atomically.
    #[must_use]
    pub fn get_or_create(&self, container: &ContainerId) -> Arc<T> {
        self.inner
            .entry(container.clone())
            .or_insert_with(|| Arc::new(T::default()))
            .clone()
    }

    /// Get the state for the given container, if it exists.
    #[must_use]
    pub fn get(&self, container: &ContainerId) -> Option<Arc<T>> {
        self.inner.get(container).map(|v| v.clone())
    }

    /// Remove the state for the given container.
    #[must_use]
    pub fn remove(&self, container: &ContainerId) -> Option<Arc<T>> {
        self.inner.remove(container).map(|(_, v)| v)
    }

    /// Reset all state in the store.
    pub fn reset(&self) {
        self.inner.clear();
    }

    /// Number of containers with state.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<T: Default + Send + Sync> Default for ContainerMap<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};

    use super::*;

    #[derive(Debug, Default)]
    struct TestState {
        value: AtomicU64,
    }

    fn container(id: &str) -> ContainerId {
        ContainerId::new(id).unwrap()
    }

    #[test]
    fn test_should_create_state_on_first_access() {
        let store = ContainerMap::<TestState>::new();
        assert!(store.is_empty());

        let state = store.get_or_create(&container("C1"));
        assert_eq!(store.len(), 1);
        assert_eq!(state.value.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_should_return_same_state_on_subsequent_access() {
        let store = ContainerMap::<TestState>::new();

        let state1 = store.get_or_create(&container("C1"));
        state1.value.store(42, Ordering::Relaxed);

        let state2 = store.get_or_create(&container("C1"));
        assert_eq!(state2.value.load(Ordering::Relaxed), 42);
    }

    #[test]
    fn test_should_isolate_different_containers() {
        let store = ContainerMap::<TestState>::new();
        store
            .get_or_create(&container("C1"))
            .value
            .store(1, Ordering::Relaxed);

        let other = store.get_or_create(&container("C2"));
        assert_eq!(other.value.load(Ordering::Relaxed), 0);
        assert_eq!(store.len(), 2);
        assert!(store.get(&container("C3")).is_none());
    }

    #[test]
    fn test_should_remove_and_reset_state() {
        let store = ContainerMap::<TestState>::new();
        let _ = store.get_or_create(&container("C1"));
        let _ = store.get_or_create(&container("C2"));

        assert!(store.remove(&container("C1")).is_some());
        assert_eq!(store.len(), 1);
        store.reset();
        assert!(store.is_empty());
    }
}
