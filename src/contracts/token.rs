//! Fungible token ledger.
//!
//! Balances and total supply change together under one write guard, so
//! `total_supply == sum(balances)` holds at every observable point.

use std::collections::BTreeMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::contracts::finish;
use crate::error::{ContractError, LedgerResult};
use crate::identity::Identity;
use crate::invariant::{check_mint_amount, check_supply_growth};
use crate::policy::{AuthorizationPolicy, Requirement};
use crate::storage::{lock_err, BalanceSheet};

#[derive(Debug, Default)]
struct TokenState {
    balances: BalanceSheet,
    total_supply: u64,
}

impl TokenState {
    fn is_consistent(&self) -> bool {
        self.balances.sum() == u128::from(self.total_supply)
    }
}

/// Serializable view of the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSnapshot {
    /// Tokens in circulation.
    pub total_supply: u64,
    /// Every account that has ever held tokens.
    pub balances: BTreeMap<Identity, u64>,
}

/// Mint/transfer/burn ledger gated by the privileged role.
#[derive(Debug)]
pub struct TokenLedger {
    policy: AuthorizationPolicy,
    state: RwLock<TokenState>,
}

impl TokenLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new(policy: AuthorizationPolicy) -> Self {
        Self {
            policy,
            state: RwLock::new(TokenState::default()),
        }
    }

    /// Mint `amount` new tokens to `recipient`. Only the privileged role may mint.
    pub fn mint(
        &self,
        amount: u64,
        recipient: impl Into<Identity>,
        caller: impl Into<Identity>,
    ) -> LedgerResult<()> {
        let recipient = recipient.into();
        let caller = caller.into();
        let mut state = self.state.write().map_err(|_| lock_err("token.mint"))?;

        let supply = finish("token.mint", self.check_mint(&state, amount, &caller))?;

        state.balances.credit(&recipient, amount);
        state.total_supply = supply;
        debug_assert!(state.is_consistent());

        tracing::debug!(amount, recipient = %recipient, supply, "minted tokens");
        Ok(())
    }

    fn check_mint(&self, state: &TokenState, amount: u64, caller: &Identity) -> Result<u64, ContractError> {
        self.policy.authorize(caller, Requirement::PrivilegedRole)?;
        check_mint_amount(amount)?;
        check_supply_growth(state.total_supply, amount)
    }

    /// Move `amount` from `sender` to `recipient`. Self-transfers are net-zero.
    pub fn transfer(
        &self,
        amount: u64,
        sender: impl Into<Identity>,
        recipient: impl Into<Identity>,
    ) -> LedgerResult<()> {
        let sender = sender.into();
        let recipient = recipient.into();
        let mut state = self.state.write().map_err(|_| lock_err("token.transfer"))?;

        finish("token.transfer", state.balances.debit(&sender, amount))?;
        state.balances.credit(&recipient, amount);
        debug_assert!(state.is_consistent());

        tracing::debug!(amount, sender = %sender, recipient = %recipient, "transferred tokens");
        Ok(())
    }

    /// Destroy `amount` tokens held by `owner`.
    pub fn burn(&self, amount: u64, owner: impl Into<Identity>) -> LedgerResult<()> {
        let owner = owner.into();
        let mut state = self.state.write().map_err(|_| lock_err("token.burn"))?;

        finish("token.burn", state.balances.debit(&owner, amount))?;
        // Supply >= any single balance while the ledger is consistent.
        state.total_supply = state.total_supply.saturating_sub(amount);
        debug_assert!(state.is_consistent());

        tracing::debug!(amount, owner = %owner, supply = state.total_supply, "burned tokens");
        Ok(())
    }

    /// Balance of `account`; unseen accounts hold zero.
    pub fn balance_of(&self, account: &str) -> LedgerResult<u64> {
        let state = self.state.read().map_err(|_| lock_err("token.balance_of"))?;
        Ok(state.balances.balance_of(account))
    }

    /// Tokens currently in circulation.
    pub fn total_supply(&self) -> LedgerResult<u64> {
        let state = self.state.read().map_err(|_| lock_err("token.total_supply"))?;
        Ok(state.total_supply)
    }

    /// Accounts with a non-zero balance, in identity order.
    pub fn holders(&self) -> LedgerResult<Vec<(Identity, u64)>> {
        let state = self.state.read().map_err(|_| lock_err("token.holders"))?;
        Ok(state
            .balances
            .iter()
            .filter(|(_, balance)| *balance > 0)
            .map(|(account, balance)| (account.clone(), balance))
            .collect())
    }

    /// Recomputes the sum of balances and compares it with total supply.
    pub fn verify_supply(&self) -> LedgerResult<bool> {
        let state = self.state.read().map_err(|_| lock_err("token.verify_supply"))?;
        Ok(state.is_consistent())
    }

    /// Copy of the full ledger state.
    pub fn snapshot(&self) -> LedgerResult<TokenSnapshot> {
        let state = self.state.read().map_err(|_| lock_err("token.snapshot"))?;
        Ok(TokenSnapshot {
            total_supply: state.total_supply,
            balances: state
                .balances
                .iter()
                .map(|(account, balance)| (account.clone(), balance))
                .collect(),
        })
    }
}
