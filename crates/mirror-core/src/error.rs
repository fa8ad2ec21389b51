//! Error types for registration and invocation.

use thiserror::Error;

use crate::TypeKind;

/// Errors produced while looking up or invoking reflected members.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CallError {
    /// A class, field, method or constructor lookup failed.
    #[error("{kind} '{name}' not found")]
    NotFound { kind: &'static str, name: String },

    /// The caller supplied the wrong number of arguments.
    #[error("expected {expected} argument(s), got {got}")]
    ArityMismatch { expected: usize, got: usize },

    /// An argument or assigned value had the wrong kind.
    #[error("expected {expected}, got {got}")]
    TypeMismatch { expected: TypeKind, got: TypeKind },

    /// A value crossed a boundary that has no marshaling rule for it.
    #[error("no marshaling rule for type '{0}'")]
    UnsupportedType(String),

    /// A non-static member was invoked without a receiver.
    #[error("missing receiver for instance member")]
    MissingReceiver,

    /// The receiver was not an instance of the declaring class.
    #[error("receiver is not an instance of {expected}")]
    ReceiverMismatch { expected: &'static str },

    /// Native code panicked while the call was in flight; the panic was
    /// contained at the boundary.
    #[error("invocation fault: {0}")]
    BoundaryFault(String),
}

/// Errors produced while installing the process-wide registry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    /// `install` was called after a registry was already installed.
    #[error("global registry already installed")]
    AlreadyInstalled,
}
