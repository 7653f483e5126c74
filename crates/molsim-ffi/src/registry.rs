use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// Owns engine objects on behalf of an embedding environment and hands out
/// opaque integer handles in their place.
///
/// The embedding side never sees an address: handles are dense integers
/// starting at 1 (0 is reserved as "no object"), resolved through this
/// registry on every call, so the host can cache, copy, or outlive them
/// without any lifetime coupling to the engine's own ownership rules.
pub struct HandleRegistry<T> {
    items: Mutex<HashMap<u64, T>>,
    next: AtomicU64,
}

impl<T> HandleRegistry<T> {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(HashMap::new()),
            next: AtomicU64::new(1),
        }
    }

    /// Takes ownership of `value` and returns its handle.
    pub fn insert(&self, value: T) -> u64 {
        let handle = self.next.fetch_add(1, Ordering::Relaxed);
        self.items
            .lock()
            .expect("registry mutex poisoned")
            .insert(handle, value);
        handle
    }

    /// Runs `f` over the object behind `handle`, or returns `None` for a
    /// stale or foreign handle.
    pub fn with<R>(&self, handle: u64, f: impl FnOnce(&T) -> R) -> Option<R> {
        let guard = self.items.lock().expect("registry mutex poisoned");
        guard.get(&handle).map(f)
    }

    /// Mutable variant of [`with`](Self::with).
    pub fn with_mut<R>(&self, handle: u64, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let mut guard = self.items.lock().expect("registry mutex poisoned");
        guard.get_mut(&handle).map(f)
    }

    /// Drops the object behind `handle`. Returns whether it existed.
    pub fn remove(&self, handle: u64) -> bool {
        self.items
            .lock()
            .expect("registry mutex poisoned")
            .remove(&handle)
            .is_some()
    }
}

impl<T> Default for HandleRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_returns_distinct_nonzero_handles() {
        let registry = HandleRegistry::new();
        let a = registry.insert("alpha");
        let b = registry.insert("beta");
        assert_ne!(a, 0);
        assert_ne!(b, 0);
        assert_ne!(a, b);
    }

    #[test]
    fn with_resolves_live_handles_and_rejects_stale_ones() {
        let registry = HandleRegistry::new();
        let handle = registry.insert(41);
        assert_eq!(registry.with(handle, |v| *v + 1), Some(42));
        assert_eq!(registry.with(handle + 1, |v| *v), None);
    }

    #[test]
    fn with_mut_mutates_in_place() {
        let registry = HandleRegistry::new();
        let handle = registry.insert(vec![1, 2]);
        registry.with_mut(handle, |v| v.push(3));
        assert_eq!(registry.with(handle, |v| v.len()), Some(3));
    }

    #[test]
    fn remove_invalidates_the_handle_without_reusing_it() {
        let registry = HandleRegistry::new();
        let first = registry.insert("x");
        assert!(registry.remove(first));
        assert!(!registry.remove(first));
        assert_eq!(registry.with(first, |_| ()), None);

        let second = registry.insert("y");
        assert_ne!(first, second);
    }
}
