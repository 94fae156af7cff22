//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// invariants, stock accounting, state machines). Infrastructure concerns
/// belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A domain invariant was violated.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A requested resource was not found (domain-level).
    #[error("not found: {0}")]
    NotFound(String),

    /// A conflict occurred (e.g. duplicate creation).
    #[error("conflict: {0}")]
    Conflict(String),

    /// A ledger adjustment would take a stock row negative.
    ///
    /// Recoverable: the failed operation can be retried once stock arrives.
    #[error("insufficient stock: {0}")]
    InsufficientStock(String),

    /// A movement task's endpoints do not satisfy its kind's routing rules.
    ///
    /// Fatal to the creation attempt; the caller must correct the input.
    #[error("invalid route: {0}")]
    InvalidRoute(String),

    /// A state machine was asked to perform a transition it does not allow.
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    /// A task was started while not Pending (concurrency race lost).
    #[error("task already started: {0}")]
    AlreadyStarted(String),

    /// A task was completed twice (concurrency race lost).
    #[error("task already completed: {0}")]
    AlreadyCompleted(String),

    /// A location's weight and status became inconsistent.
    #[error("invalid state: {0}")]
    InvalidState(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn insufficient_stock(msg: impl Into<String>) -> Self {
        Self::InsufficientStock(msg.into())
    }

    pub fn invalid_route(msg: impl Into<String>) -> Self {
        Self::InvalidRoute(msg.into())
    }

    pub fn invalid_transition(msg: impl Into<String>) -> Self {
        Self::InvalidTransition(msg.into())
    }

    pub fn already_started(msg: impl Into<String>) -> Self {
        Self::AlreadyStarted(msg.into())
    }

    pub fn already_completed(msg: impl Into<String>) -> Self {
        Self::AlreadyCompleted(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }
}
