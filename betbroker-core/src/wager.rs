//! # Wager Records
//!
//! A wager is a two-sided stake on the outcome of an external event. The
//! creator opens it with `creator_amount`, a taker matches it with
//! `taker_amount`, the arbiter records the result and the winner claims the
//! pooled stake.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{AccountId, Amount};

/// Identifier of a wager. Assigned from 1 in creation order and never reused.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct WagerId(pub u64);

impl WagerId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WagerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for WagerId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Recorded outcome of a wager.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum WagerResult {
    /// No outcome recorded yet
    #[default]
    Unknown,
    /// The creator's side won
    CreatorWon,
    /// The taker's side won
    TakerWon,
}

impl WagerResult {
    /// Numeric code carried by the `GainsDistributed` event: 0, 1 or 2.
    pub const fn code(self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::CreatorWon => 1,
            Self::TakerWon => 2,
        }
    }

    pub const fn from_creator_won(creator_won: bool) -> Self {
        if creator_won {
            Self::CreatorWon
        } else {
            Self::TakerWon
        }
    }

    pub fn is_known(self) -> bool {
        self != Self::Unknown
    }
}

impl fmt::Display for WagerResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unknown => "unknown",
            Self::CreatorWon => "creator won",
            Self::TakerWon => "taker won",
        };
        write!(f, "{s}")
    }
}

/// Lifecycle stage derived from a wager's fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WagerStatus {
    /// Waiting for a taker
    Open,
    /// Withdrawn by the arbiter before anyone matched it
    Closed,
    /// Both stakes are in escrow, no result yet
    Matched,
    /// Result recorded, payout pending
    Settled,
    /// Pool paid out to the winner
    Claimed,
}

impl fmt::Display for WagerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Matched => "matched",
            Self::Settled => "settled",
            Self::Claimed => "claimed",
        };
        write!(f, "{s}")
    }
}

/// A single escrowed wager.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Wager {
    /// Wager identifier
    pub id: WagerId,

    /// External event being wagered on (opaque)
    pub event_id: u64,

    /// Account that opened the wager
    pub creator: AccountId,

    /// Stake put up by the creator
    pub creator_amount: Amount,

    /// Account that matched the wager, if any
    pub taker: Option<AccountId>,

    /// Stake required from whoever matches
    pub taker_amount: Amount,

    /// Set when the arbiter withdraws the unmatched offer
    pub is_closed: bool,

    /// Outcome recorded by the arbiter
    pub result: WagerResult,

    /// Whether the pool has been paid out
    pub claimed: bool,
}

impl Wager {
    pub(crate) fn new(
        id: WagerId,
        event_id: u64,
        creator: AccountId,
        creator_amount: Amount,
        taker_amount: Amount,
    ) -> Self {
        Self {
            id,
            event_id,
            creator,
            creator_amount,
            taker: None,
            taker_amount,
            is_closed: false,
            result: WagerResult::Unknown,
            claimed: false,
        }
    }

    pub fn is_matched(&self) -> bool {
        self.taker.is_some()
    }

    /// Whether `account` may still match this wager from the query surface's
    /// point of view. Own offers are excluded here even though `take_bet`
    /// itself accepts a self-match.
    pub fn is_open_for(&self, event_id: u64, account: &AccountId) -> bool {
        self.event_id == event_id
            && !self.is_closed
            && self.taker.is_none()
            && self.creator != *account
    }

    pub fn involves(&self, account: &AccountId) -> bool {
        self.creator == *account || self.taker.as_ref() == Some(account)
    }

    /// Combined stake of both sides. Checked at creation to fit in an `Amount`.
    pub fn pool(&self) -> Amount {
        self.creator_amount.saturating_add(self.taker_amount)
    }

    /// Account favored by the recorded result.
    pub fn winner(&self) -> Option<AccountId> {
        match self.result {
            WagerResult::Unknown => None,
            WagerResult::CreatorWon => Some(self.creator),
            WagerResult::TakerWon => self.taker,
        }
    }

    /// Value the escrow account holds on behalf of this wager.
    pub fn custody(&self) -> Amount {
        if self.claimed {
            0
        } else if self.is_matched() {
            self.pool()
        } else {
            self.creator_amount
        }
    }

    pub fn status(&self) -> WagerStatus {
        if self.claimed {
            WagerStatus::Claimed
        } else if self.result.is_known() {
            WagerStatus::Settled
        } else if self.is_matched() {
            WagerStatus::Matched
        } else if self.is_closed {
            WagerStatus::Closed
        } else {
            WagerStatus::Open
        }
    }
}
