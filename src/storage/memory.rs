//! In-memory record and balance tables.
//!
//! These tables are plain owned data. Contracts wrap them in a lock together
//! with their ID allocator so that the check-then-mutate sequence of a
//! transition happens under a single write guard.

use std::collections::BTreeMap;

use crate::error::ContractError;
use crate::identity::Identity;
use crate::storage::traits::{Record, StorageError};

/// Authoritative table for one record category, ordered by ID.
#[derive(Debug, Clone)]
pub struct RecordStore<R: Record> {
    by_id: BTreeMap<R::Id, R>,
}

impl<R: Record> Default for RecordStore<R> {
    fn default() -> Self {
        Self {
            by_id: BTreeMap::new(),
        }
    }
}

impl<R: Record> RecordStore<R> {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a freshly allocated record. Fails if the ID is already taken.
    pub fn insert(&mut self, record: R) -> Result<(), StorageError> {
        let id = record.id();
        if self.by_id.contains_key(&id) {
            return Err(StorageError::DuplicateKey {
                kind: R::KIND,
                id: id.into(),
            });
        }
        self.by_id.insert(id, record);
        Ok(())
    }

    /// Get a record by ID.
    #[must_use]
    pub fn get(&self, id: R::Id) -> Option<&R> {
        self.by_id.get(&id)
    }

    /// Get a record by ID or fail with `NotFound`.
    pub fn require(&self, id: R::Id) -> Result<&R, ContractError> {
        self.by_id.get(&id).ok_or_else(|| not_found::<R>(id))
    }

    /// Mutable variant of [`RecordStore::require`].
    pub fn require_mut(&mut self, id: R::Id) -> Result<&mut R, ContractError> {
        self.by_id.get_mut(&id).ok_or_else(|| not_found::<R>(id))
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Returns true if nothing has been stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Iterate records in ascending ID order.
    pub fn values(&self) -> impl Iterator<Item = &R> {
        self.by_id.values()
    }

    /// Clone every record matching `pred`, in ascending ID order.
    pub fn collect_where(&self, mut pred: impl FnMut(&R) -> bool) -> Vec<R> {
        self.by_id.values().filter(|r| pred(r)).cloned().collect()
    }
}

fn not_found<R: Record>(id: R::Id) -> ContractError {
    ContractError::NotFound {
        kind: R::KIND,
        id: id.into(),
    }
}

/// Fungible balances keyed by account identity.
///
/// Accounts that were never credited read as zero. An account whose balance
/// drops to zero keeps its entry so that holders stay visible.
#[derive(Debug, Clone, Default)]
pub struct BalanceSheet {
    balances: BTreeMap<Identity, u64>,
}

impl BalanceSheet {
    /// Create an empty sheet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current balance of `account`.
    #[must_use]
    pub fn balance_of(&self, account: &str) -> u64 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// Fails with `InsufficientBalance` unless `account` holds at least `amount`.
    pub fn ensure_covers(&self, account: &Identity, amount: u64) -> Result<u64, ContractError> {
        let balance = self.balance_of(account.as_str());
        if balance < amount {
            return Err(ContractError::InsufficientBalance {
                account: account.clone(),
                balance,
                requested: amount,
            });
        }
        Ok(balance)
    }

    /// Add `amount` to `account`.
    ///
    /// Callers keep the sum of balances equal to a `u64` total supply, so the
    /// addition saturates only if that invariant is already broken.
    pub fn credit(&mut self, account: &Identity, amount: u64) {
        let entry = self.balances.entry(account.clone()).or_insert(0);
        *entry = entry.saturating_add(amount);
    }

    /// Remove `amount` from `account`. Call [`BalanceSheet::ensure_covers`] first.
    pub fn debit(&mut self, account: &Identity, amount: u64) -> Result<(), ContractError> {
        let balance = self.ensure_covers(account, amount)?;
        self.balances.insert(account.clone(), balance - amount);
        Ok(())
    }

    /// Sum of every balance, widened so it cannot overflow.
    #[must_use]
    pub fn sum(&self) -> u128 {
        self.balances.values().map(|&b| u128::from(b)).sum()
    }

    /// Iterate `(account, balance)` pairs in account order.
    pub fn iter(&self) -> impl Iterator<Item = (&Identity, u64)> {
        self.balances.iter().map(|(k, &v)| (k, v))
    }

    /// Number of accounts that have ever been credited.
    #[must_use]
    pub fn len(&self) -> usize {
        self.balances.len()
    }

    /// Returns true if no account was ever credited.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::ids::SimulationId;
    use crate::storage::RecordKind;

    #[derive(Debug, Clone, PartialEq)]
    struct Note {
        id: SimulationId,
        text: &'static str,
    }

    impl Record for Note {
        type Id = SimulationId;
        const KIND: RecordKind = RecordKind::Simulation;

        fn id(&self) -> SimulationId {
            self.id
        }
    }

    #[test]
    fn record_store_insert_and_require() {
        let mut store = RecordStore::<Note>::new();
        store
            .insert(Note {
                id: SimulationId::new(1),
                text: "a",
            })
            .unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.require(SimulationId::new(1)).unwrap().text, "a");

        let err = store.require(SimulationId::new(2)).unwrap_err();
        assert_eq!(
            err,
            ContractError::NotFound {
                kind: RecordKind::Simulation,
                id: 2
            }
        );
        assert!(err.to_string().starts_with("Invalid simulation"));
    }

    #[test]
    fn record_store_rejects_duplicate_ids() {
        let mut store = RecordStore::<Note>::new();
        let note = Note {
            id: SimulationId::new(1),
            text: "a",
        };
        store.insert(note.clone()).unwrap();
        let err = store.insert(note).unwrap_err();
        assert!(matches!(err, StorageError::DuplicateKey { id: 1, .. }));
    }

    #[test]
    fn record_store_iterates_in_id_order() {
        let mut store = RecordStore::<Note>::new();
        for (raw, text) in [(3, "c"), (1, "a"), (2, "b")] {
            store
                .insert(Note {
                    id: SimulationId::new(raw),
                    text,
                })
                .unwrap();
        }
        let texts: Vec<_> = store.values().map(|n| n.text).collect();
        assert_eq!(texts, vec!["a", "b", "c"]);

        let odd = store.collect_where(|n| n.id.get() % 2 == 1);
        assert_eq!(odd.len(), 2);
    }

    #[test]
    fn balance_sheet_credit_and_debit() {
        let mut sheet = BalanceSheet::new();
        let alice = Identity::from("alice");
        let bob = Identity::from("bob");

        assert_eq!(sheet.balance_of("alice"), 0);
        sheet.credit(&alice, 100);
        sheet.debit(&alice, 40).unwrap();
        sheet.credit(&bob, 40);

        assert_eq!(sheet.balance_of("alice"), 60);
        assert_eq!(sheet.balance_of("bob"), 40);
        assert_eq!(sheet.sum(), 100);
    }

    #[test]
    fn balance_sheet_debit_beyond_balance_fails_without_mutation() {
        let mut sheet = BalanceSheet::new();
        let alice = Identity::from("alice");
        sheet.credit(&alice, 10);

        let err = sheet.debit(&alice, 11).unwrap_err();
        assert!(matches!(
            err,
            ContractError::InsufficientBalance {
                balance: 10,
                requested: 11,
                ..
            }
        ));
        assert_eq!(sheet.balance_of("alice"), 10);
    }

    #[test]
    fn unknown_account_cannot_be_debited() {
        let mut sheet = BalanceSheet::new();
        let ghost = Identity::from("ghost");
        assert!(sheet.debit(&ghost, 1).is_err());
        assert!(sheet.debit(&ghost, 0).is_ok());
    }
}
