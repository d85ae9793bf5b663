//! Engine error types
//!
//! Two tiers: setup-time errors ([`VmError::Load`], [`VmError::Config`],
//! [`VmError::Runtime`], [`VmError::EntryNotFound`]) are returned to the
//! embedder as values, while [`LinkError`]s raised during a guest run unwind
//! the whole run and surface as [`VmError::Link`].

use thiserror::Error;

use crate::config::ConfigError;
use crate::ffi::LoadError;

/// A guest import that cannot be bound to a host callable, or an auxiliary
/// stack primitive that cannot complete.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    #[error("unknown import resolved: {module}")]
    UnknownModule { module: String },

    #[error("{module} has no function {field}")]
    UnknownField { module: String, field: String },

    #[error("{module}.{field} global not found")]
    UnsupportedGlobal { module: String, field: String },

    #[error("{module}.{field} is neither a function nor a global import")]
    UnsupportedImport { module: String, field: String },

    #[error("auxiliary stack underflow: pop with no saved frame")]
    StackUnderflow,

    #[error("{field} called without its integer argument")]
    MissingArgument { field: String },
}

/// Result type for linkage operations.
pub type LinkResult<T> = Result<T, LinkError>;

/// Top-level engine error.
#[derive(Debug, Error)]
pub enum VmError {
    #[error("failed to load extension: {0}")]
    Load(#[from] LoadError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("host link error: {0}")]
    Link(#[from] LinkError),

    #[error("entry function not found: {0}")]
    EntryNotFound(String),

    #[error("failed to construct interpreter: {0}")]
    Runtime(String),

    #[error("guest execution fault: {0}")]
    Trap(String),
}

impl VmError {
    /// Returns the link error behind this failure, if the run was aborted by one.
    pub fn as_link_error(&self) -> Option<&LinkError> {
        match self {
            VmError::Link(e) => Some(e),
            _ => None,
        }
    }
}

/// Result type for engine operations.
pub type VmResult<T> = Result<T, VmError>;
