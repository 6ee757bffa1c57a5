//! Error types for chronoledger.
//!
//! All errors are strongly typed using thiserror. Contract errors carry the
//! violated check and render a message starting with the canonical wording
//! ("Not authorized", "Invalid anomaly", "Insufficient balance", ...), so
//! callers can match on the variant, the [`ErrorKind`], or the text.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::contracts::anomaly::AnomalyStatus;
use crate::identity::Identity;
use crate::ids::AnomalyId;
use crate::storage::{RecordKind, StorageError};

/// Coarse error taxonomy shared by every contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Caller does not hold the required role.
    NotAuthorized,
    /// Referenced ID has no record.
    NotFound,
    /// Status value not permitted, or precondition state not met.
    InvalidStatus,
    /// Consistency score outside [0, 100].
    InvalidScore,
    /// Significance outside [0, 100].
    InvalidSignificance,
    /// Debit exceeds current balance.
    InsufficientBalance,
    /// Token amount rejected (zero mint or supply overflow).
    InvalidAmount,
    /// A serialized request was malformed before reaching any contract.
    InvalidRequest,
    /// Anything that is not a contract rule violation.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotAuthorized => "not_authorized",
            Self::NotFound => "not_found",
            Self::InvalidStatus => "invalid_status",
            Self::InvalidScore => "invalid_score",
            Self::InvalidSignificance => "invalid_significance",
            Self::InsufficientBalance => "insufficient_balance",
            Self::InvalidAmount => "invalid_amount",
            Self::InvalidRequest => "invalid_request",
            Self::Internal => "internal",
        };
        f.write_str(s)
    }
}

/// A violated contract rule. Raised before any mutation takes place.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractError {
    #[error("Not authorized: {caller} is not the {required}")]
    NotAuthorized {
        caller: Identity,
        required: String,
    },

    #[error("Invalid {kind}: {id} does not exist")]
    NotFound {
        kind: RecordKind,
        id: u64,
    },

    #[error("Invalid status: '{value}' is not a permitted target status")]
    UnpermittedStatus {
        value: String,
    },

    #[error("Invalid status: anomaly {id} is {current}, operation requires {required}")]
    StatusPrecondition {
        id: AnomalyId,
        current: AnomalyStatus,
        required: AnomalyStatus,
    },

    #[error("Invalid status: anomaly {id} cannot move from {from} to {to}")]
    IllegalTransition {
        id: AnomalyId,
        from: AnomalyStatus,
        to: AnomalyStatus,
    },

    #[error("Invalid score: {value} is outside [0, 100]")]
    InvalidScore {
        value: i64,
    },

    #[error("Invalid significance score: {value} is outside [0, 100]")]
    InvalidSignificance {
        value: i64,
    },

    #[error("Insufficient balance: {account} holds {balance}, requested {requested}")]
    InsufficientBalance {
        account: Identity,
        balance: u64,
        requested: u64,
    },

    #[error("Invalid amount: {amount} tokens cannot be minted")]
    InvalidAmount {
        amount: u64,
    },

    #[error("Supply overflow: minting {amount} on top of {supply}")]
    SupplyOverflow {
        supply: u64,
        amount: u64,
    },
}

impl ContractError {
    /// Returns the coarse kind of this violation.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotAuthorized { .. } => ErrorKind::NotAuthorized,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::UnpermittedStatus { .. }
            | Self::StatusPrecondition { .. }
            | Self::IllegalTransition { .. } => ErrorKind::InvalidStatus,
            Self::InvalidScore { .. } => ErrorKind::InvalidScore,
            Self::InvalidSignificance { .. } => ErrorKind::InvalidSignificance,
            Self::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            Self::InvalidAmount { .. } | Self::SupplyOverflow { .. } => ErrorKind::InvalidAmount,
        }
    }
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Privileged identity cannot be empty")]
    EmptyPrivilegedIdentity,

    #[error("Runtime queue capacity must be greater than zero")]
    ZeroQueueCapacity,
}

/// Errors in a serialized transition request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("Unsupported request version '{version}' (expected {expected})")]
    UnsupportedVersion {
        version: String,
        expected: &'static str,
    },

    #[error("Field '{field}' exceeds maximum length of {max_length}")]
    FieldTooLong {
        field: &'static str,
        max_length: usize,
    },

    #[error("Malformed request: {message}")]
    Malformed {
        message: String,
    },
}

/// Errors from the single-writer runtime.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    #[error("Writer queue is full (capacity {capacity})")]
    QueueFull {
        capacity: usize,
    },

    #[error("Writer thread is no longer running")]
    Disconnected,

    #[error("Transition timed out after {duration_ms}ms")]
    Timeout {
        duration_ms: u64,
    },

    #[error("Failed to spawn writer thread: {message}")]
    Spawn {
        message: String,
    },
}

/// Top-level error type for chronoledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Contract(#[from] ContractError),

    #[error("Request error: {0}")]
    Request(#[from] RequestError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl LedgerError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if a contract rule rejected the transition.
    #[must_use]
    pub const fn is_contract(&self) -> bool {
        matches!(self, Self::Contract(_))
    }

    /// Returns true if a serialized request was rejected before execution.
    #[must_use]
    pub const fn is_request(&self) -> bool {
        matches!(self, Self::Request(_))
    }

    /// Returns true if this is a storage error.
    #[must_use]
    pub const fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }

    /// Returns true if this is a configuration error.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Returns true if this is a runtime error.
    #[must_use]
    pub const fn is_runtime(&self) -> bool {
        matches!(self, Self::Runtime(_))
    }

    /// Returns the contract error, if any.
    #[must_use]
    pub const fn as_contract(&self) -> Option<&ContractError> {
        match self {
            Self::Contract(e) => Some(e),
            _ => None,
        }
    }

    /// Returns the coarse kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Contract(e) => e.kind(),
            Self::Request(_) => ErrorKind::InvalidRequest,
            _ => ErrorKind::Internal,
        }
    }

    /// Returns true if the transition was never queued, so resubmitting it
    /// cannot apply it twice.
    ///
    /// A timeout is not retryable: the writer may still commit the transition.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Runtime(RuntimeError::QueueFull { .. }))
    }

    /// Returns true if the transition may or may not have committed.
    #[must_use]
    pub const fn is_outcome_unknown(&self) -> bool {
        matches!(self, Self::Runtime(RuntimeError::Timeout { .. }))
    }
}

/// Result type alias for chronoledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
