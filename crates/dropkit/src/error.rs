//! Error types for dropkit

use dropkit_dom::DomError;
use thiserror::Error;

/// Errors from the fallible constructors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DropdownError {
    /// No element carries the requested id
    #[error("Element with id \"{0}\" not found")]
    ElementNotFound(String),

    /// Host lookup failed inside the element tree
    #[error("Host lookup failed: {0}")]
    Selector(#[from] DomError),
}

/// Why a remote option load failed
///
/// Load failures never escape the public widget methods; they put the widget
/// into its error display state and are logged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// The endpoint answered with a non-success status
    #[error("HTTP error! status: {0}")]
    Status(u16),

    /// The request could not be sent or the body could not be read
    #[error("Transport failed: {0}")]
    Transport(String),

    /// The payload is not valid option data
    #[error("Invalid option data: {0}")]
    Decode(String),

    /// No async runtime was available to run the load on
    #[error("No async runtime available for loading")]
    NoRuntime,

    /// The widget has no way to perform the request
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

impl From<serde_json::Error> for LoadError {
    fn from(err: serde_json::Error) -> Self {
        LoadError::Decode(err.to_string())
    }
}

/// Result type for dropkit constructors
pub type Result<T> = std::result::Result<T, DropdownError>;
