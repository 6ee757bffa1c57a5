//! Record abstractions shared by every contract store.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The category a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// Non-fungible temporal event token.
    TemporalEvent,
    /// Reported temporal anomaly.
    Anomaly,
    /// Causal simulation.
    Simulation,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TemporalEvent => write!(f, "temporal event"),
            Self::Anomaly => write!(f, "anomaly"),
            Self::Simulation => write!(f, "simulation"),
        }
    }
}

/// A record stored under a sequential ID.
pub trait Record: Clone + Send + Sync + 'static {
    /// Typed identifier for this category.
    type Id: Copy + Ord + fmt::Debug + fmt::Display + Into<u64> + Send + Sync;

    /// Category used in lookup failures.
    const KIND: RecordKind;

    /// The ID this record is stored under.
    fn id(&self) -> Self::Id;
}

/// Errors raised by the storage layer itself, never by contract rules.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An ID was inserted twice.
    #[error("Duplicate {kind} id: {id}")]
    DuplicateKey {
        /// Category of the colliding record.
        kind: RecordKind,
        /// The colliding raw ID.
        id: u64,
    },

    /// A lock guarding contract state was poisoned by a panicking writer.
    #[error("poisoned lock: {0}")]
    Poisoned(&'static str),
}
