//! # Fungible Asset Ledger
//!
//! The broker never keeps balances itself: stakes are pulled into, and payouts
//! pushed out of, an escrow account held on an external token ledger. This
//! module defines the interface the broker consumes, plus an in-memory token
//! used by the CLI and by tests.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{error::LedgerError, AccountId, Amount};

/// Interface of the fungible token ledger consumed by the broker.
///
/// `transfer_from` and `transfer` must fail loudly. The broker checks balance
/// and allowance itself before pulling, so a failure here means the ledger and
/// the broker disagree.
pub trait Ledger {
    /// Spendable balance of `account`.
    fn balance_of(&self, account: &AccountId) -> Amount;

    /// Amount `spender` may still pull from `owner`.
    fn allowance(&self, owner: &AccountId, spender: &AccountId) -> Amount;

    /// Move `amount` from `owner` to `recipient` on behalf of `spender`,
    /// consuming allowance.
    fn transfer_from(
        &mut self,
        spender: &AccountId,
        owner: &AccountId,
        recipient: &AccountId,
        amount: Amount,
    ) -> Result<(), LedgerError>;

    /// Move `amount` out of `from`'s own balance.
    fn transfer(&mut self, from: &AccountId, to: &AccountId, amount: Amount)
        -> Result<(), LedgerError>;
}

/// In-memory fungible token with balances and allowances.
///
/// The whole supply is minted to `owner` at construction. An allowance of
/// `Amount::MAX` is treated as unlimited and never decremented.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct InMemoryLedger {
    owner: AccountId,
    total_supply: Amount,
    balances: BTreeMap<AccountId, Amount>,
    allowances: BTreeMap<AccountId, BTreeMap<AccountId, Amount>>,
}

impl InMemoryLedger {
    pub fn new(owner: AccountId, initial_supply: Amount) -> Self {
        let mut balances = BTreeMap::new();
        if initial_supply > 0 {
            balances.insert(owner, initial_supply);
        }
        Self {
            owner,
            total_supply: initial_supply,
            balances,
            allowances: BTreeMap::new(),
        }
    }

    pub fn owner(&self) -> &AccountId {
        &self.owner
    }

    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    /// Set the allowance of `spender` over `owner`'s balance, replacing any previous value.
    pub fn approve(
        &mut self,
        owner: &AccountId,
        spender: &AccountId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        if owner.is_zero() || spender.is_zero() {
            return Err(LedgerError::ZeroAccount);
        }
        self.allowances
            .entry(*owner)
            .or_default()
            .insert(*spender, amount);
        Ok(())
    }

    /// Accounts holding a non-zero balance, in address order.
    pub fn holders(&self) -> impl Iterator<Item = (&AccountId, &Amount)> {
        self.balances.iter().filter(|(_, amount)| **amount > 0)
    }

    fn move_balance(
        &mut self,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        if from.is_zero() || to.is_zero() {
            return Err(LedgerError::ZeroAccount);
        }
        let available = self.balance_of(from);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                required: amount,
                available,
            });
        }
        if from == to {
            return Ok(());
        }
        let credited = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;

        self.balances.insert(*from, available - amount);
        self.balances.insert(*to, credited);
        Ok(())
    }
}

impl Ledger for InMemoryLedger {
    fn balance_of(&self, account: &AccountId) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    fn allowance(&self, owner: &AccountId, spender: &AccountId) -> Amount {
        self.allowances
            .get(owner)
            .and_then(|spenders| spenders.get(spender))
            .copied()
            .unwrap_or(0)
    }

    fn transfer_from(
        &mut self,
        spender: &AccountId,
        owner: &AccountId,
        recipient: &AccountId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let allowed = self.allowance(owner, spender);
        if allowed < amount {
            return Err(LedgerError::InsufficientAllowance {
                required: amount,
                allowed,
            });
        }
        self.move_balance(owner, recipient, amount)?;
        if allowed != Amount::MAX {
            self.allowances
                .entry(*owner)
                .or_default()
                .insert(*spender, allowed - amount);
        }
        Ok(())
    }

    fn transfer(
        &mut self,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        self.move_balance(from, to, amount)
    }
}
