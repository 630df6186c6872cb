//! # UI Error Types
//!
//! All errors that can occur in the element tree.

use switchboard_bus::ResponseKind;
use thiserror::Error;

use crate::element::NodeId;

/// Errors that can occur in the element tree.
#[derive(Error, Debug)]
pub enum UiError {
    /// The id no longer resolves to a node (destroyed, or never existed).
    #[error("stale node id {0}")]
    StaleNode(NodeId),

    /// The node is being torn down.
    #[error("node {0} is disposed")]
    Disposed(NodeId),

    /// Attaching would nest deeper than the configured maximum.
    #[error("depth overflow: attaching at depth {depth} exceeds maximum {max}")]
    DepthOverflow {
        /// Depth the deepest node of the subtree would end up at.
        depth: usize,
        /// Configured maximum.
        max: usize,
    },

    /// Attaching would make a node its own ancestor.
    #[error("attaching {child} under {parent} would create a cycle")]
    CycleDetected {
        /// Intended parent.
        parent: NodeId,
        /// Intended child.
        child: NodeId,
    },

    /// A node cannot be its own child.
    #[error("node {0} cannot be attached to itself")]
    SelfAttach(NodeId),

    /// The node is not a child of the given parent.
    #[error("node {child} is not a child of {parent}")]
    NotAChild {
        /// Claimed parent.
        parent: NodeId,
        /// Claimed child.
        child: NodeId,
    },

    /// A message arrived without the payload its kind requires.
    #[error("{kind} message without the expected payload")]
    UnexpectedPayload {
        /// Kind of the offending message.
        kind: ResponseKind,
    },

    /// Invalid configuration file.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Reading a file failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The input source of the frame loop failed.
    #[error("event source failed: {0}")]
    EventSource(String),
}

/// Result type for element tree operations.
pub type UiResult<T> = Result<T, UiError>;
