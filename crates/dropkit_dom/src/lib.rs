//! Dropkit DOM
//!
//! A small retained element tree that form widgets render into:
//!
//! - **Tree**: slot-map backed nodes with attributes, classes and inline style
//! - **Form controls**: live `<input>` values and `<select>`/`<option>` selectedness
//! - **Selectors**: tag, id, class and attribute matching for host lookups
//! - **Events**: click, key, input, change and custom events with bubbling
//!
//! # Example
//!
//! ```rust
//! use dropkit_dom::prelude::*;
//!
//! let dom = Dom::new();
//! let button = dom.write(|doc| {
//!     let body = doc.body();
//!     doc.append_tree(body, div().id("go").text("Go")).unwrap()
//! });
//!
//! dom.add_listener(button, EventType::Click, |event| {
//!     tracing::info!(target = ?event.target, "clicked");
//! });
//! assert!(dom.click(button));
//! ```

pub mod dom;
pub mod error;
pub mod events;
pub mod input;
pub mod markup;
pub mod selector;
pub mod tree;

pub use dom::Dom;
pub use error::{DomError, Result};
pub use events::{DomEvent, EventType, Listener, ListenerId};
pub use input::{Key, Modifiers};
pub use markup::ElementBuilder;
pub use selector::Selector;
pub use tree::{Document, Element, NodeId, NodeKind};

/// Common imports for building pages and wiring listeners
pub mod prelude {
    pub use crate::dom::Dom;
    pub use crate::events::{DomEvent, EventType};
    pub use crate::input::Key;
    pub use crate::markup::{div, element, input, optgroup, option, select, span, ElementBuilder};
    pub use crate::tree::{Document, NodeId};
}
