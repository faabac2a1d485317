//! Common test utilities for betbroker-core tests.
//!
//! Fixture accounts and broker builders shared by the unit tests of every
//! module. Amounts mirror the reference deployment: a 10^30 token supply held by
//! the arbiter, stakes of 10^9 and 20^9.

use crate::{AccountId, Amount, BetBroker, InMemoryLedger, Ledger};

/// Creator-side stake used across tests
pub const AMOUNT_1: Amount = 1_000_000_000;

/// Taker-side stake used across tests (20^9)
pub const AMOUNT_2: Amount = 512_000_000_000;

/// Token supply minted to the arbiter (10^12 * 10^18)
pub const MAX_AMOUNT: Amount = 1_000_000_000_000_000_000_000_000_000_000;

pub fn arbiter() -> AccountId {
    AccountId::from_label("arbiter")
}

pub fn escrow() -> AccountId {
    AccountId::from_label("escrow")
}

pub fn alice() -> AccountId {
    AccountId::from_label("alice")
}

pub fn bob() -> AccountId {
    AccountId::from_label("bob")
}

pub fn carol() -> AccountId {
    AccountId::from_label("carol")
}

/// Broker whose ledger holds the whole supply in the arbiter's account.
pub fn create_test_broker() -> BetBroker<InMemoryLedger> {
    let ledger = InMemoryLedger::new(arbiter(), MAX_AMOUNT);
    BetBroker::new(ledger, escrow(), arbiter()).unwrap()
}

/// Broker where alice holds `AMOUNT_1`, bob holds `AMOUNT_2`, and alice, bob and
/// carol have all approved the escrow for `MAX_AMOUNT`.
pub fn create_funded_broker() -> BetBroker<InMemoryLedger> {
    let mut broker = create_test_broker();
    fund(&mut broker, &alice(), AMOUNT_1);
    fund(&mut broker, &bob(), AMOUNT_2);
    for account in [alice(), bob(), carol()] {
        approve(&mut broker, &account);
    }
    broker
}

/// Move `amount` from the arbiter's supply to `account`.
pub fn fund(broker: &mut BetBroker<InMemoryLedger>, account: &AccountId, amount: Amount) {
    broker
        .ledger_mut()
        .transfer(&arbiter(), account, amount)
        .unwrap();
}

/// Approve the escrow to pull up to `MAX_AMOUNT` from `account`.
pub fn approve(broker: &mut BetBroker<InMemoryLedger>, account: &AccountId) {
    let escrow = *broker.escrow_account();
    broker
        .ledger_mut()
        .approve(account, &escrow, MAX_AMOUNT)
        .unwrap();
}
