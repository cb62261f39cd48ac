//! Event types and listener storage
//!
//! ```text
//! Dom::dispatch(event)
//!     ↓ lock, snapshot listeners on the propagation path
//! ListenerTable (entries keyed by node + event type)
//!     ↓ unlock
//! Listener callbacks invoked in order (free to mutate the tree)
//! ```

use std::cell::Cell;
use std::sync::Arc;

use crate::input::{Key, Modifiers};
use crate::tree::NodeId;

/// Kind of event
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum EventType {
    /// Pointer activation
    Click,
    /// Key pressed
    KeyDown,
    /// Text field contents changed
    Input,
    /// Form control committed a new value
    Change,
    /// Application-defined event
    Custom(String),
}

/// An event travelling through the tree
#[derive(Clone, Debug)]
pub struct DomEvent {
    /// The type of event
    pub event_type: EventType,
    /// Node the event was dispatched at
    pub target: NodeId,
    /// Key for `KeyDown` events
    pub key: Option<Key>,
    /// Modifier state for keyboard events
    pub modifiers: Modifiers,
    /// Payload for custom events
    pub detail: serde_json::Value,
    /// Whether the event propagates to ancestors
    pub bubbles: bool,
    default_prevented: Cell<bool>,
}

impl DomEvent {
    /// Create an event of the given type
    pub fn new(event_type: EventType, target: NodeId) -> Self {
        Self {
            event_type,
            target,
            key: None,
            modifiers: Modifiers::default(),
            detail: serde_json::Value::Null,
            bubbles: false,
            default_prevented: Cell::new(false),
        }
    }

    /// A bubbling click
    pub fn click(target: NodeId) -> Self {
        Self::new(EventType::Click, target).bubbling()
    }

    /// A bubbling key press
    pub fn key_down(target: NodeId, key: Key) -> Self {
        let mut event = Self::new(EventType::KeyDown, target).bubbling();
        event.key = Some(key);
        event
    }

    /// A bubbling input notification
    pub fn input(target: NodeId) -> Self {
        Self::new(EventType::Input, target).bubbling()
    }

    /// A bubbling change notification, as raised by form controls
    pub fn change(target: NodeId) -> Self {
        Self::new(EventType::Change, target).bubbling()
    }

    /// A non-bubbling custom event with a JSON payload
    pub fn custom(name: impl Into<String>, target: NodeId, detail: serde_json::Value) -> Self {
        let mut event = Self::new(EventType::Custom(name.into()), target);
        event.detail = detail;
        event
    }

    /// Make the event bubble
    pub fn bubbling(mut self) -> Self {
        self.bubbles = true;
        self
    }

    /// Set modifier state
    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Suppress the host's default action for this event
    pub fn prevent_default(&self) {
        self.default_prevented.set(true);
    }

    /// Whether a listener called [`DomEvent::prevent_default`]
    pub fn default_prevented(&self) -> bool {
        self.default_prevented.get()
    }
}

/// Listener callback
pub type Listener = Arc<dyn Fn(&DomEvent) + Send + Sync>;

/// Handle returned when registering a listener
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Raw numeric id
    pub fn to_raw(self) -> u64 {
        self.0
    }
}

pub(crate) struct ListenerEntry {
    pub(crate) id: ListenerId,
    pub(crate) node: NodeId,
    pub(crate) event_type: EventType,
    pub(crate) callback: Listener,
}

/// Listener registrations in insertion order
#[derive(Default)]
pub(crate) struct ListenerTable {
    entries: Vec<ListenerEntry>,
    next_id: u64,
}

impl std::fmt::Debug for ListenerTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerTable")
            .field("listeners", &self.entries.len())
            .field("next_id", &self.next_id)
            .finish()
    }
}

impl ListenerTable {
    pub(crate) fn add(&mut self, node: NodeId, event_type: EventType, callback: Listener) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.entries.push(ListenerEntry {
            id,
            node,
            event_type,
            callback,
        });
        id
    }

    pub(crate) fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        before != self.entries.len()
    }

    pub(crate) fn retain(&mut self, keep: impl FnMut(&ListenerEntry) -> bool) {
        self.entries.retain(keep);
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Callbacks for `event_type` along `path`, path order then registration order
    pub(crate) fn collect(&self, path: &[NodeId], event_type: &EventType) -> Vec<Listener> {
        let mut out = Vec::new();
        for node in path {
            for entry in &self.entries {
                if entry.node == *node && entry.event_type == *event_type {
                    out.push(entry.callback.clone());
                }
            }
        }
        out
    }
}
