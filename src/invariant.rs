//! Field invariants checked before a transition commits.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ContractError;

/// An integer in the closed range [0, 100].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Percentage(u8);

impl Percentage {
    /// Upper bound, inclusive.
    pub const MAX: i64 = 100;

    /// Returns `None` if `raw` is outside [0, 100].
    #[must_use]
    pub fn new(raw: i64) -> Option<Self> {
        if (0..=Self::MAX).contains(&raw) {
            u8::try_from(raw).ok().map(Self)
        } else {
            None
        }
    }

    /// The stored value.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Percentage {
    type Error = String;

    fn try_from(raw: i64) -> Result<Self, Self::Error> {
        Self::new(raw).ok_or_else(|| format!("{raw} is outside [0, 100]"))
    }
}

impl From<Percentage> for i64 {
    fn from(p: Percentage) -> Self {
        i64::from(p.0)
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validates a simulation consistency score.
pub fn check_score(raw: i64) -> Result<Percentage, ContractError> {
    Percentage::new(raw).ok_or(ContractError::InvalidScore { value: raw })
}

/// Validates an event significance score.
pub fn check_significance(raw: i64) -> Result<Percentage, ContractError> {
    Percentage::new(raw).ok_or(ContractError::InvalidSignificance { value: raw })
}

/// Rejects mints that would not change supply.
pub fn check_mint_amount(amount: u64) -> Result<(), ContractError> {
    if amount == 0 {
        return Err(ContractError::InvalidAmount { amount });
    }
    Ok(())
}

/// Returns the new total supply, or `SupplyOverflow`.
pub fn check_supply_growth(supply: u64, amount: u64) -> Result<u64, ContractError> {
    supply
        .checked_add(amount)
        .ok_or(ContractError::SupplyOverflow { supply, amount })
}
