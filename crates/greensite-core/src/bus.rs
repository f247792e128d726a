//! Change broadcast bus
//!
//! In-process publish/subscribe channel used to keep multiple mounted
//! views consistent without prop drilling: any component can announce
//! "settings changed" and any other component reacts. Dispatch is
//! synchronous to the listeners registered at publish time; there is no
//! queue and no replay. Scope is this process only; cross-process
//! consistency is the realtime bridge's job, not this bus's.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;

use crate::models::{ContentSettingsPatch, SiteSettingsPatch};

/// What changed
#[derive(Debug, Clone, PartialEq)]
pub enum ChangePayload {
    /// A site settings update (the applied patch)
    Site(SiteSettingsPatch),
    /// A content settings update (the applied patch)
    Content(ContentSettingsPatch),
}

/// An event delivered to bus listeners
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub payload: ChangePayload,
    /// Who published ("admin", "live-preview", ...)
    pub source: String,
    pub timestamp: DateTime<Utc>,
}

type Listener = Arc<dyn Fn(&ChangeEvent) + Send + Sync>;

#[derive(Default)]
struct Registry {
    listeners: HashMap<u64, Listener>,
    next_id: u64,
}

/// The change bus
///
/// Cheap to clone; clones share the listener registry.
#[derive(Clone, Default)]
pub struct ChangeBus {
    registry: Arc<Mutex<Registry>>,
}

impl ChangeBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Synchronously dispatch an event to all current listeners
    ///
    /// Listeners registered after this call never see the event.
    pub fn publish(&self, payload: ChangePayload, source: &str) {
        let event = ChangeEvent {
            payload,
            source: source.to_string(),
            timestamp: Utc::now(),
        };

        // Snapshot under the lock, invoke outside it so a listener may
        // subscribe or unsubscribe without deadlocking
        let listeners: Vec<Listener> = {
            let registry = self.registry.lock().unwrap();
            registry.listeners.values().cloned().collect()
        };

        for listener in listeners {
            listener(&event);
        }
    }

    /// Register a listener for all future publishes
    ///
    /// Dropping the returned [`Subscription`] unregisters it; keep it
    /// alive for as long as the listener should run.
    #[must_use]
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        let mut registry = self.registry.lock().unwrap();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.listeners.insert(id, Arc::new(callback));

        Subscription {
            registry: Arc::downgrade(&self.registry),
            id,
        }
    }

    /// Number of registered listeners
    pub fn listener_count(&self) -> usize {
        self.registry.lock().unwrap().listeners.len()
    }
}

/// Guard for a registered listener
pub struct Subscription {
    registry: Weak<Mutex<Registry>>,
    id: u64,
}

impl Subscription {
    /// Unregister now instead of at drop
    pub fn cancel(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.lock().unwrap().listeners.remove(&self.id);
        }
    }
}

/// Trailing-edge debouncer
///
/// Used by live-preview publishers to avoid flooding the bus on every
/// keystroke: only the last value within the delay window is delivered.
#[derive(Clone)]
pub struct Debounced<T> {
    inner: Arc<DebounceInner<T>>,
}

struct DebounceInner<T> {
    callback: Box<dyn Fn(T) + Send + Sync>,
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

/// Wrap `callback` so rapid calls collapse into one, fired `delay` after
/// the last call
pub fn debounce<T, F>(callback: F, delay: Duration) -> Debounced<T>
where
    T: Send + 'static,
    F: Fn(T) + Send + Sync + 'static,
{
    Debounced {
        inner: Arc::new(DebounceInner {
            callback: Box::new(callback),
            delay,
            pending: Mutex::new(None),
        }),
    }
}

impl<T: Send + 'static> Debounced<T> {
    /// Schedule the callback, cancelling any earlier pending call
    ///
    /// Must be called from within a tokio runtime.
    pub fn call(&self, value: T) {
        let mut pending = self.inner.pending.lock().unwrap();
        if let Some(previous) = pending.take() {
            previous.abort();
        }

        let inner = Arc::clone(&self.inner);
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(inner.delay).await;
            (inner.callback)(value);
        }));
    }
}
