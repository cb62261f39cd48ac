//! Dropkit
//!
//! A searchable, keyboard-navigable dropdown that replaces a native
//! `<select>` (or fills an empty container) inside a [`dropkit_dom`] tree.
//!
//! - **Initializer**: resolves [`DropdownOptions`] against the host and
//!   extracts options from native markup
//! - **Renderer**: builds the trigger, search box and option list
//! - **Loader**: optional remote option data through a [`DataFetcher`]
//! - **Selection**: keeps the trigger, the hidden field and the native
//!   control in sync and raises change notifications
//! - **Filter**: live substring search with group label visibility
//! - **Keyboard**: arrow/enter/escape navigation with wrap-around
//!
//! # Example
//!
//! ```rust
//! use dropkit::prelude::*;
//! use dropkit_dom::prelude::*;
//!
//! let dom = Dom::new();
//! dom.write(|doc| {
//!     let body = doc.body();
//!     doc.append_tree(body, div().id("fruit")).unwrap();
//! });
//!
//! let data = OptionData::from(vec![
//!     OptionItem::new("apple", "Apple"),
//!     OptionItem::new("pear", "Pear"),
//! ]);
//! let dropdown = Dropdown::create(&dom, "fruit", Some(data), DropdownOptions::default());
//!
//! dropdown.set_value("pear");
//! assert_eq!(dropdown.value().as_deref(), Some("pear"));
//! assert_eq!(dropdown.text(), "Pear");
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod loader;
pub mod state;

mod filter;
mod init;
mod keyboard;
mod render;
mod selection;
mod widget;

#[cfg(test)]
mod tests;

pub use config::{ConfigError, DataResolver, DropdownOptions, FetchOptions, Settings};
pub use data::{DataError, OptionData, OptionGroup, OptionItem};
pub use error::{DropdownError, LoadError, Result};
#[cfg(feature = "network")]
pub use loader::HttpFetcher;
pub use loader::{DataFetcher, FetchFuture, FetchRequest};
pub use state::{dropdown_events, Phase, StateTransitions, WidgetState};
pub use widget::{ChangeCallback, Dropdown, DEFAULT_SELECTOR};

/// Name of the custom event dispatched on the widget root after every
/// selection or clear; its detail is `{"value": .., "text": ..}`
pub const CHANGE_EVENT: &str = "dropkit:change";

/// Class names used by the rendered structure
pub mod classes {
    pub const ROOT: &str = "dropkit";
    pub const TRIGGER: &str = "dropkit-trigger";
    pub const TEXT: &str = "dropkit-text";
    pub const PLACEHOLDER: &str = "dropkit-placeholder";
    pub const CLEAR: &str = "dropkit-clear";
    pub const ARROW: &str = "dropkit-arrow";
    pub const CONTENT: &str = "dropkit-content";
    pub const SHOW: &str = "dropkit-show";
    pub const SEARCH_CONTAINER: &str = "dropkit-search-container";
    pub const SEARCH: &str = "dropkit-search";
    pub const OPTIONS: &str = "dropkit-options";
    pub const OPTION: &str = "dropkit-option";
    pub const GROUP_LABEL: &str = "dropkit-group-label";
    pub const SELECTED: &str = "dropkit-selected";
    pub const DISABLED: &str = "dropkit-disabled";
    pub const HIDDEN: &str = "dropkit-hidden";
    pub const HIGHLIGHTED: &str = "dropkit-highlighted";
    pub const NO_RESULTS: &str = "dropkit-no-results";
    pub const LOADING: &str = "dropkit-loading";
    pub const ERROR: &str = "dropkit-error";
    pub const SPINNER: &str = "dropkit-spinner";
    /// Trigger while the list is open
    pub const ACTIVE: &str = "dropkit-active";
}

/// Common imports for hosts
pub mod prelude {
    pub use crate::config::{DropdownOptions, FetchOptions};
    pub use crate::data::{OptionData, OptionGroup, OptionItem};
    pub use crate::error::{DropdownError, LoadError};
    pub use crate::loader::FetchRequest;
    pub use crate::state::Phase;
    pub use crate::widget::Dropdown;
    pub use crate::CHANGE_EVENT;
}
