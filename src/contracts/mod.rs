//! The four record-keeping contracts.
//!
//! Each contract owns its state behind a single lock. A transition takes the
//! write guard, runs its existence, authorization and invariant checks, and
//! only then mutates, so a rejected transition leaves no trace.

pub mod anomaly;
pub mod event;
pub mod simulation;
pub mod token;

pub use anomaly::{AnomalySnapshot, AnomalyStatus, AnomalyWorkflow, TemporalAnomaly, TransitionRule};
pub use event::{EventSnapshot, NewTemporalEvent, TemporalEvent, TemporalEventRegistry};
pub use simulation::{CausalSimulation, SimulationSnapshot, SimulationWorkflow};
pub use token::{TokenLedger, TokenSnapshot};

use chrono::{DateTime, Utc};

use crate::error::{ContractError, LedgerError, LedgerResult};

/// Logs a rejected transition and lifts it into a [`LedgerError`].
pub(crate) fn reject(op: &'static str, err: ContractError) -> LedgerError {
    tracing::debug!(op, kind = %err.kind(), error = %err, "transition rejected");
    LedgerError::Contract(err)
}

/// Finishes a transition body: rejected checks are logged, committed ones pass through.
pub(crate) fn finish<T>(op: &'static str, result: Result<T, ContractError>) -> LedgerResult<T> {
    result.map_err(|err| reject(op, err))
}

/// Converts a unix timestamp in seconds, if chrono can represent it.
pub(crate) fn unix_to_utc(seconds: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(seconds, 0)
}
