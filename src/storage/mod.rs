//! Storage for contract state.
//!
//! Every record category gets its own [`RecordStore`]; fungible balances live
//! in a [`BalanceSheet`]. Nothing is persisted.

mod memory;
mod traits;

pub use memory::{BalanceSheet, RecordStore};
pub use traits::{Record, RecordKind, StorageError};

pub(crate) fn lock_err(context: &'static str) -> StorageError {
    StorageError::Poisoned(context)
}
