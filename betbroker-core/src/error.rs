//! Error types for betbroker-core

use thiserror::Error;

use crate::{Amount, WagerId};

/// Result type alias for broker operations
pub type Result<T> = std::result::Result<T, BrokerError>;

/// Error types for wager operations.
///
/// Every variant is reported before any state mutation or fund movement
/// took place.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BrokerError {
    /// A stake of zero was supplied, or the pooled stake would not fit in an `Amount`
    #[error("Bet size cannot be zero")]
    InvalidStake,

    /// Caller's ledger balance is below the required stake
    #[error("Non-sufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: Amount, available: Amount },

    /// Caller has not approved the escrow account for the required stake
    #[error("Non-sufficient allowed tokens: required {required}, allowed {allowed}")]
    InsufficientAllowance { required: Amount, allowed: Amount },

    /// The referenced wager was never created
    #[error("Bet does not exist: {0}")]
    NotFound(WagerId),

    /// The wager is already matched or was closed by the arbiter
    #[error("Bet is closed")]
    Closed,

    /// The wager already has a taker and cannot be closed
    #[error("Bet has been taken")]
    AlreadyMatched,

    /// A result cannot be recorded before the wager is matched
    #[error("Bet not taken")]
    NotMatched,

    /// A result has already been recorded for this wager
    #[error("Gains already distributed")]
    AlreadySettled,

    /// No result has been recorded yet
    #[error("Result unknown")]
    ResultUnknown,

    /// Caller is not the side favored by the recorded result
    #[error("Not the winner")]
    NotWinner,

    /// The pooled stake was already paid out
    #[error("Gains already claimed")]
    AlreadyClaimed,

    /// Caller does not hold the arbiter privilege
    #[error("Caller is not the arbiter")]
    Unauthorized,

    /// The escrow account tried to stake on a wager
    #[error("Escrow account cannot take part in a bet")]
    EscrowParty,

    /// The arbiter privilege cannot be handed to the zero or escrow account
    #[error("Invalid arbiter: {0}")]
    InvalidArbiter(String),

    /// The escrow account is the zero account or doubles as the arbiter
    #[error("Invalid escrow: {0}")]
    InvalidEscrow(String),

    /// Restored broker state breaks an invariant the operations maintain
    #[error("Inconsistent broker state: {0}")]
    InvalidState(String),

    /// The ledger rejected a transfer the broker had already validated
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

/// Errors reported by a [`crate::Ledger`] implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("transfer amount exceeds balance: required {required}, available {available}")]
    InsufficientBalance { required: Amount, available: Amount },

    #[error("insufficient allowance: required {required}, allowed {allowed}")]
    InsufficientAllowance { required: Amount, allowed: Amount },

    #[error("transfer to the zero account")]
    ZeroAccount,

    #[error("balance overflow")]
    Overflow,
}

/// Errors that might occur while parsing an [`crate::AccountId`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AccountError {
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("account must be {expected} bytes, got {actual}")]
    Length { expected: usize, actual: usize },

    #[error("cannot parse account from empty string")]
    Empty,
}
