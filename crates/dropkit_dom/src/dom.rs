//! Shared document handle and event dispatch
//!
//! [`Dom`] wraps a [`Document`] in `Arc<Mutex<..>>` so widgets and host code
//! can hold it from listeners and async tasks. Dispatch never holds the lock
//! while a listener runs, so listeners are free to read and mutate the tree
//! through their own clone of the handle.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::events::{DomEvent, EventType, ListenerId};
use crate::input::Key;
use crate::tree::{Document, NodeId};

/// Cloneable handle to a shared [`Document`]
#[derive(Clone, Default)]
pub struct Dom {
    inner: Arc<Mutex<Document>>,
}

impl std::fmt::Debug for Dom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dom")
            .field("nodes", &self.read(|doc| doc.len()))
            .finish()
    }
}

impl Dom {
    /// Create a handle to a fresh document
    pub fn new() -> Self {
        Self::from_document(Document::new())
    }

    /// Wrap an existing document
    pub fn from_document(doc: Document) -> Self {
        Self {
            inner: Arc::new(Mutex::new(doc)),
        }
    }

    /// Whether two handles share one document
    pub fn ptr_eq(&self, other: &Dom) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn lock(&self) -> MutexGuard<'_, Document> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Read the document
    ///
    /// Do not dispatch events or call into widgets from inside the closure;
    /// the document lock is held for its duration.
    pub fn read<R>(&self, f: impl FnOnce(&Document) -> R) -> R {
        f(&self.lock())
    }

    /// Mutate the document (same locking rules as [`Dom::read`])
    pub fn write<R>(&self, f: impl FnOnce(&mut Document) -> R) -> R {
        f(&mut self.lock())
    }

    /// Register a listener on a node; register on [`Document::root`] for
    /// document-level listeners
    pub fn add_listener<F>(&self, node: NodeId, event_type: EventType, callback: F) -> ListenerId
    where
        F: Fn(&DomEvent) + Send + Sync + 'static,
    {
        self.write(|doc| doc.listeners.add(node, event_type, Arc::new(callback)))
    }

    /// Unregister a listener; returns whether it was registered
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.write(|doc| doc.listeners.remove(id))
    }

    /// Number of registered listeners
    pub fn listener_count(&self) -> usize {
        self.read(|doc| doc.listeners.len())
    }

    /// Dispatch an event; returns `false` if a listener prevented the default
    pub fn dispatch(&self, event: &DomEvent) -> bool {
        let listeners = self.read(|doc| {
            if !doc.exists(event.target) {
                return Vec::new();
            }
            let mut path = vec![event.target];
            if event.bubbles {
                path.extend(doc.ancestors(event.target));
            }
            doc.listeners.collect(&path, &event.event_type)
        });

        tracing::trace!(
            event_type = ?event.event_type,
            target = ?event.target,
            listeners = listeners.len(),
            "dispatch"
        );

        for listener in listeners {
            listener(event);
        }
        !event.default_prevented()
    }

    /// Click a node
    pub fn click(&self, target: NodeId) -> bool {
        self.dispatch(&DomEvent::click(target))
    }

    /// Press a key with `target` focused
    pub fn key_down(&self, target: NodeId, key: Key) -> bool {
        self.dispatch(&DomEvent::key_down(target, key))
    }

    /// Replace a text field's value and raise `Input`, as typing would
    pub fn type_text(&self, target: NodeId, text: &str) -> bool {
        let updated = self.write(|doc| doc.set_value(target, text).is_ok());
        if !updated {
            return true;
        }
        self.dispatch(&DomEvent::input(target))
    }
}
