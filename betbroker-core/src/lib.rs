//! # BetBroker Core
//!
//! Core Rust library for peer-to-peer wager escrow over a fungible token ledger.
//!
//! Two parties stake tokens against each other on the outcome of an external
//! event:
//! - A creator opens a wager, and their stake is pulled into escrow
//! - A taker matches it, and the taker stake joins the pool
//! - A trusted arbiter records the outcome (or closes unmatched wagers)
//! - The winner claims the full pool, exactly once
//!
//! ## Examples
//!
//! ```rust
//! use betbroker_core::{AccountId, BetBroker, InMemoryLedger, Ledger};
//!
//! let arbiter = AccountId::from_label("arbiter");
//! let escrow = AccountId::from_label("escrow");
//! let alice = AccountId::from_label("alice");
//! let bob = AccountId::from_label("bob");
//!
//! let mut ledger = InMemoryLedger::new(arbiter, 1_000);
//! ledger.transfer(&arbiter, &alice, 100)?;
//! ledger.transfer(&arbiter, &bob, 200)?;
//! ledger.approve(&alice, &escrow, 100)?;
//! ledger.approve(&bob, &escrow, 200)?;
//!
//! let mut broker = BetBroker::new(ledger, escrow, arbiter)?;
//! let id = broker.create_bet(42, 100, 200, &alice)?;
//! broker.take_bet(id, &bob)?;
//! broker.distribute_gains(id, false, &arbiter)?;
//! assert_eq!(broker.claim_gains(id, &bob)?, 300);
//! assert_eq!(broker.ledger().balance_of(&bob), 300);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod account;
pub mod broker;
pub mod error;
pub mod event;
pub mod ledger;
pub mod snapshot;
pub mod wager;

#[cfg(test)]
pub(crate) mod test_utils;

pub use account::AccountId;
pub use broker::BetBroker;
pub use error::{AccountError, BrokerError, LedgerError, Result};
pub use event::WagerEvent;
pub use ledger::{InMemoryLedger, Ledger};
pub use snapshot::{load_snapshot, save_snapshot, staging_path, Snapshot, DEFAULT_SNAPSHOT_PATH};
pub use wager::{Wager, WagerId, WagerResult, WagerStatus};

/// Token quantity. Wide enough for 18-decimal token supplies.
pub type Amount = u128;
