use thiserror::Error;

use crate::arena::NodeKind;
use crate::key::Key;

/// Invalid observer registration options.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("options must be an object")]
    NotAnObject,
    #[error("\"{0}\" is not one of the valid options (path, pathsFrom)")]
    UnknownOption(String),
    #[error("\"pathsFrom\" option may not be specified together with \"path\" option")]
    ExclusiveOptions,
    #[error("\"{option}\" option, if provided, must be a non-empty string")]
    InvalidPath { option: &'static str },
}

/// A value that cannot become the root of an observable graph.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeConstraintError {
    #[error("observable may only be created from a record or a sequence, found {found}")]
    NotComposite { found: &'static str },
    #[error("{found} is an atomic leaf type and cannot be observed")]
    AtomicLeaf { found: &'static str },
    #[error("value is already observable")]
    AlreadyObservable,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ObserveError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    TypeConstraint(#[from] TypeConstraintError),
    /// The node was revoked, overwritten or removed.
    #[error("INVALID_STATE: handle is no longer attached to a live node")]
    InvalidState,
    /// The graph is borrowed by an operation still in progress, e.g. from
    /// inside a sort comparator.
    #[error("BUSY: graph is in use by an operation in progress")]
    Busy,
    #[error("WRONG_KIND: expected a {expected:?} node")]
    WrongKind { expected: NodeKind },
    #[error("INVALID_KEY: {0}")]
    InvalidKey(Key),
    #[error("OUT_OF_BOUNDS: index {index} for length {len}")]
    OutOfBounds { index: usize, len: usize },
}

/// Error an observer callback may return. Such errors are logged and never
/// reach the mutating call.
pub type ObserverError = Box<dyn std::error::Error>;
