use std::sync::{Arc, Mutex};

type Callback<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Returned by [`Listeners::add`]; pass it to [`Listeners::remove`] to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerHandle(u64);

struct Registry<E> {
    next_id: u64,
    callbacks: Vec<(ListenerHandle, Callback<E>)>,
}

/// Explicit registry of observers for events of type `E`.
pub struct Listeners<E> {
    registry: Mutex<Registry<E>>,
}

impl<E> Default for Listeners<E> {
    fn default() -> Self {
        Self {
            registry: Mutex::new(Registry {
                next_id: 0,
                callbacks: Vec::new(),
            }),
        }
    }
}

impl<E> Listeners<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<F>(&self, callback: F) -> ListenerHandle
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let mut registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
        let handle = ListenerHandle(registry.next_id);
        registry.next_id += 1;
        registry.callbacks.push((handle, Arc::new(callback)));
        handle
    }

    /// Returns false when the handle was already removed.
    pub fn remove(&self, handle: ListenerHandle) -> bool {
        let mut registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
        let before = registry.callbacks.len();
        registry.callbacks.retain(|(h, _)| *h != handle);
        registry.callbacks.len() != before
    }

    pub fn len(&self) -> usize {
        self.registry
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .callbacks
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Calls every listener registered at the time of the call. The lock is
    /// released before any callback runs, so callbacks may add or remove
    /// listeners (themselves included).
    pub fn notify(&self, event: &E) {
        let snapshot: Vec<Callback<E>> = {
            let registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
            registry.callbacks.iter().map(|(_, cb)| cb.clone()).collect()
        };
        for callback in snapshot {
            callback(event);
        }
    }
}
