//! Audit trail emitted by the broker.
//!
//! Field order of each event is fixed; downstream indexers key off it.

use serde::{Deserialize, Serialize};

use crate::{AccountId, Amount, WagerId};

/// Events emitted by successful state transitions, in the order they occur.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum WagerEvent {
    WagerCreated {
        id: WagerId,
        event_id: u64,
        creator: AccountId,
        creator_amount: Amount,
        taker_amount: Amount,
    },
    WagerMatched {
        id: WagerId,
        event_id: u64,
        creator: AccountId,
        taker: AccountId,
        creator_amount: Amount,
        taker_amount: Amount,
    },
    WagerClosed {
        id: WagerId,
        event_id: u64,
        creator: AccountId,
        creator_amount: Amount,
    },
    GainsDistributed {
        id: WagerId,
        event_id: u64,
        creator: AccountId,
        taker: AccountId,
        creator_amount: Amount,
        taker_amount: Amount,
        /// 1 = creator won, 2 = taker won
        result: u8,
    },
}

impl WagerEvent {
    /// Wager the event refers to.
    pub fn wager_id(&self) -> WagerId {
        match self {
            Self::WagerCreated { id, .. }
            | Self::WagerMatched { id, .. }
            | Self::WagerClosed { id, .. }
            | Self::GainsDistributed { id, .. } => *id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::WagerCreated { .. } => "WagerCreated",
            Self::WagerMatched { .. } => "WagerMatched",
            Self::WagerClosed { .. } => "WagerClosed",
            Self::GainsDistributed { .. } => "GainsDistributed",
        }
    }
}
