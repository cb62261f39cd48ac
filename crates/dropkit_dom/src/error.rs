//! Element tree error types

use thiserror::Error;

/// Errors raised by tree mutation and lookup
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomError {
    /// The node id no longer refers to a live node
    #[error("node does not exist")]
    StaleNode,

    /// The operation needs an element but got a text or document node
    #[error("node is not an element")]
    NotAnElement,

    /// The insertion would make a node its own ancestor, or move the root
    #[error("invalid tree insertion")]
    HierarchyRequest,

    /// Selector text could not be parsed
    #[error("invalid selector `{selector}`: {reason}")]
    InvalidSelector {
        /// The selector as given
        selector: String,
        /// What the parser choked on
        reason: String,
    },
}

/// Result type for tree operations
pub type Result<T> = std::result::Result<T, DomError>;
