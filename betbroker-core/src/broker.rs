//! # Bet Broker
//!
//! The escrow engine. It owns the wager arena, custodies stakes in a single
//! escrow account on the ledger and enforces the wager lifecycle:
//!
//! ```text
//! create_bet ──► Open ──take_bet──► Matched ──distribute_gains──► Settled ──claim_gains──► Claimed
//!                  │
//!                  └──close_bet──► Closed
//! ```
//!
//! Every operation validates all of its preconditions, including the caller's
//! balance and allowance, before touching the ledger or the arena. A ledger
//! failure aborts the call with no wager mutation.
//!
//! Closing an unmatched wager does not refund the creator; the stake stays in
//! escrow and no reclaim path exists.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    error::{BrokerError, Result},
    AccountId, Amount, Ledger, Wager, WagerEvent, WagerId, WagerResult,
};

/// Peer-to-peer wager escrow over a fungible token ledger.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct BetBroker<L> {
    /// Token ledger holding every balance, including the escrow's
    ledger: L,

    /// Account that custodies all stakes
    escrow: AccountId,

    /// Sole identity allowed to close wagers and record results
    arbiter: AccountId,

    /// Append-only arena; wager `n` lives at index `n - 1`
    wagers: Vec<Wager>,

    /// Ordered audit trail
    events: Vec<WagerEvent>,
}

impl<L: Ledger> BetBroker<L> {
    /// Creates an empty broker.
    ///
    /// # Arguments
    /// * `ledger` - Token ledger the stakes are denominated in
    /// * `escrow` - Ledger account the broker pulls stakes into
    /// * `arbiter` - Identity allowed to close wagers and record results
    pub fn new(ledger: L, escrow: AccountId, arbiter: AccountId) -> Result<Self> {
        check_roles(&escrow, &arbiter)?;

        Ok(Self {
            ledger,
            escrow,
            arbiter,
            wagers: Vec::new(),
            events: Vec::new(),
        })
    }

    /// Open a new wager on `event_id`, pulling `creator_amount` from `caller`.
    ///
    /// Returns the id of the new wager.
    pub fn create_bet(
        &mut self,
        event_id: u64,
        creator_amount: Amount,
        taker_amount: Amount,
        caller: &AccountId,
    ) -> Result<WagerId> {
        self.ensure_party(caller)?;
        if creator_amount == 0 || taker_amount == 0 {
            debug!(event_id, %caller, "rejecting wager with zero stake");
            return Err(BrokerError::InvalidStake);
        }
        if creator_amount.checked_add(taker_amount).is_none() {
            debug!(event_id, %caller, "rejecting wager whose pool overflows");
            return Err(BrokerError::InvalidStake);
        }
        self.ensure_funded(caller, creator_amount)?;

        self.pull(caller, creator_amount)?;

        let id = WagerId(self.wagers.len() as u64 + 1);
        self.wagers.push(Wager::new(
            id,
            event_id,
            *caller,
            creator_amount,
            taker_amount,
        ));
        self.events.push(WagerEvent::WagerCreated {
            id,
            event_id,
            creator: *caller,
            creator_amount,
            taker_amount,
        });

        info!(%id, event_id, creator = %caller, creator_amount, taker_amount, "wager created");
        Ok(id)
    }

    /// Match wager `id` as `caller`, pulling its `taker_amount`.
    pub fn take_bet(&mut self, id: WagerId, caller: &AccountId) -> Result<()> {
        self.ensure_party(caller)?;
        let wager = self.wager(id)?;
        if wager.is_closed || wager.is_matched() {
            debug!(%id, %caller, "wager is not open for matching");
            return Err(BrokerError::Closed);
        }
        let taker_amount = wager.taker_amount;
        self.ensure_funded(caller, taker_amount)?;

        self.pull(caller, taker_amount)?;

        let wager = self.wager_mut(id)?;
        wager.taker = Some(*caller);
        let event = WagerEvent::WagerMatched {
            id,
            event_id: wager.event_id,
            creator: wager.creator,
            taker: *caller,
            creator_amount: wager.creator_amount,
            taker_amount: wager.taker_amount,
        };
        self.events.push(event);

        info!(%id, taker = %caller, taker_amount, "wager matched");
        Ok(())
    }

    /// Withdraw unmatched wager `id` from circulation. Arbiter only.
    ///
    /// The creator's stake remains in escrow.
    pub fn close_bet(&mut self, id: WagerId, caller: &AccountId) -> Result<()> {
        self.ensure_arbiter(caller)?;
        let wager = self.wager_mut(id)?;
        if wager.is_matched() {
            debug!(%id, "cannot close a matched wager");
            return Err(BrokerError::AlreadyMatched);
        }

        wager.is_closed = true;
        let event = WagerEvent::WagerClosed {
            id,
            event_id: wager.event_id,
            creator: wager.creator,
            creator_amount: wager.creator_amount,
        };
        self.events.push(event);

        info!(%id, "wager closed");
        Ok(())
    }

    /// Record the outcome of matched wager `id`. Arbiter only, at most once.
    pub fn distribute_gains(
        &mut self,
        id: WagerId,
        creator_won: bool,
        caller: &AccountId,
    ) -> Result<()> {
        self.ensure_arbiter(caller)?;
        let wager = self.wager_mut(id)?;
        let Some(taker) = wager.taker else {
            debug!(%id, "cannot settle an unmatched wager");
            return Err(BrokerError::NotMatched);
        };
        if wager.result.is_known() {
            debug!(%id, result = %wager.result, "wager already settled");
            return Err(BrokerError::AlreadySettled);
        }

        wager.result = WagerResult::from_creator_won(creator_won);
        let event = WagerEvent::GainsDistributed {
            id,
            event_id: wager.event_id,
            creator: wager.creator,
            taker,
            creator_amount: wager.creator_amount,
            taker_amount: wager.taker_amount,
            result: wager.result.code(),
        };
        let result = wager.result;
        self.events.push(event);

        info!(%id, %result, "gains distributed");
        Ok(())
    }

    /// Pay the pooled stake of settled wager `id` to `caller`, who must be the winner.
    ///
    /// Returns the amount paid out.
    pub fn claim_gains(&mut self, id: WagerId, caller: &AccountId) -> Result<Amount> {
        let wager = self.wager(id)?;
        if !wager.result.is_known() {
            return Err(BrokerError::ResultUnknown);
        }
        if wager.winner().as_ref() != Some(caller) {
            debug!(%id, %caller, "claim by non-winner");
            return Err(BrokerError::NotWinner);
        }
        if wager.claimed {
            return Err(BrokerError::AlreadyClaimed);
        }
        let pool = wager.pool();

        if let Err(e) = self.ledger.transfer(&self.escrow, caller, pool) {
            warn!(%id, error = %e, "ledger rejected payout");
            return Err(e.into());
        }
        self.wager_mut(id)?.claimed = true;

        info!(%id, winner = %caller, pool, "gains claimed");
        Ok(pool)
    }

    /// Hand the arbiter privilege to `new_arbiter`. Current arbiter only.
    pub fn transfer_arbiter(&mut self, new_arbiter: AccountId, caller: &AccountId) -> Result<()> {
        self.ensure_arbiter(caller)?;
        if new_arbiter.is_zero() || new_arbiter == self.escrow {
            return Err(BrokerError::InvalidArbiter(format!(
                "{new_arbiter} cannot hold the arbiter privilege"
            )));
        }

        let previous = std::mem::replace(&mut self.arbiter, new_arbiter);
        info!(%previous, arbiter = %new_arbiter, "arbiter transferred");
        Ok(())
    }

    /// All wagers in creation order.
    pub fn bets(&self) -> Vec<Wager> {
        self.wagers.clone()
    }

    /// Wagers where `account` is the creator or the taker, in creation order.
    pub fn bets_by_account(&self, account: &AccountId) -> Vec<Wager> {
        self.wagers
            .iter()
            .filter(|w| w.involves(account))
            .cloned()
            .collect()
    }

    /// Wagers on `event_id` that `account` could match right now.
    pub fn open_bets(&self, event_id: u64, account: &AccountId) -> Vec<Wager> {
        self.wagers
            .iter()
            .filter(|w| w.is_open_for(event_id, account))
            .cloned()
            .collect()
    }

    pub fn bet(&self, id: WagerId) -> Option<&Wager> {
        let index = id.get().checked_sub(1)?;
        self.wagers.get(usize::try_from(index).ok()?)
    }

    pub fn bet_count(&self) -> usize {
        self.wagers.len()
    }

    pub fn arbiter(&self) -> &AccountId {
        &self.arbiter
    }

    pub fn escrow_account(&self) -> &AccountId {
        &self.escrow
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Mutable access to the ledger, for funding and approvals outside the broker.
    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }

    pub fn events(&self) -> &[WagerEvent] {
        &self.events
    }

    /// Value held in escrow on behalf of wager `id`.
    pub fn custody_of(&self, id: WagerId) -> Option<Amount> {
        self.bet(id).map(Wager::custody)
    }

    /// Value held in escrow across all wagers.
    pub fn total_custody(&self) -> Amount {
        self.wagers
            .iter()
            .fold(0, |acc: Amount, w| acc.saturating_add(w.custody()))
    }

    /// Check that state restored from storage obeys the invariants every
    /// operation maintains.
    ///
    /// The escrow balance must cover the custody of every wager.
    pub fn validate(&self) -> Result<()> {
        check_roles(&self.escrow, &self.arbiter)?;

        for (index, wager) in self.wagers.iter().enumerate() {
            let id = wager.id;
            let invalid =
                |reason: &str| BrokerError::InvalidState(format!("wager {id}: {reason}"));
            if id.get() != index as u64 + 1 {
                return Err(invalid(&format!("stored at position {}", index + 1)));
            }
            if wager.creator_amount == 0 || wager.taker_amount == 0 {
                return Err(invalid("zero stake"));
            }
            if wager.creator_amount.checked_add(wager.taker_amount).is_none() {
                return Err(invalid("pool overflows"));
            }
            if wager.creator == self.escrow || wager.taker == Some(self.escrow) {
                return Err(invalid("escrow account is a party"));
            }
            if wager.is_closed && wager.is_matched() {
                return Err(invalid("closed and matched"));
            }
            if wager.result.is_known() && !wager.is_matched() {
                return Err(invalid("result recorded before matching"));
            }
            if wager.claimed && !wager.result.is_known() {
                return Err(invalid("claimed without a result"));
            }
        }

        if let Some(event) = self.events.iter().find(|e| self.bet(e.wager_id()).is_none()) {
            return Err(BrokerError::InvalidState(format!(
                "{} event refers to missing wager {}",
                event.name(),
                event.wager_id()
            )));
        }

        let held = self.ledger.balance_of(&self.escrow);
        let owed = self.total_custody();
        if held < owed {
            return Err(BrokerError::InvalidState(format!(
                "escrow holds {held} but wagers are owed {owed}"
            )));
        }
        Ok(())
    }

    fn wager(&self, id: WagerId) -> Result<&Wager> {
        self.bet(id).ok_or(BrokerError::NotFound(id))
    }

    fn wager_mut(&mut self, id: WagerId) -> Result<&mut Wager> {
        let index = id
            .get()
            .checked_sub(1)
            .and_then(|i| usize::try_from(i).ok())
            .ok_or(BrokerError::NotFound(id))?;
        self.wagers.get_mut(index).ok_or(BrokerError::NotFound(id))
    }

    fn ensure_arbiter(&self, caller: &AccountId) -> Result<()> {
        if *caller != self.arbiter {
            debug!(%caller, "caller is not the arbiter");
            return Err(BrokerError::Unauthorized);
        }
        Ok(())
    }

    fn ensure_party(&self, caller: &AccountId) -> Result<()> {
        if *caller == self.escrow {
            debug!(%caller, "escrow account cannot stake");
            return Err(BrokerError::EscrowParty);
        }
        Ok(())
    }

    fn ensure_funded(&self, caller: &AccountId, required: Amount) -> Result<()> {
        let available = self.ledger.balance_of(caller);
        if available < required {
            debug!(%caller, required, available, "insufficient funds");
            return Err(BrokerError::InsufficientFunds {
                required,
                available,
            });
        }
        let allowed = self.ledger.allowance(caller, &self.escrow);
        if allowed < required {
            debug!(%caller, required, allowed, "insufficient allowance");
            return Err(BrokerError::InsufficientAllowance { required, allowed });
        }
        Ok(())
    }

    fn pull(&mut self, from: &AccountId, amount: Amount) -> Result<()> {
        let escrow = self.escrow;
        self.ledger
            .transfer_from(&escrow, from, &escrow, amount)
            .map_err(|e| {
                warn!(%from, amount, error = %e, "ledger rejected stake pull");
                BrokerError::from(e)
            })
    }
}

fn check_roles(escrow: &AccountId, arbiter: &AccountId) -> Result<()> {
    if arbiter.is_zero() {
        return Err(BrokerError::InvalidArbiter(
            "arbiter cannot be the zero account".to_string(),
        ));
    }
    if escrow.is_zero() {
        return Err(BrokerError::InvalidEscrow(
            "escrow cannot be the zero account".to_string(),
        ));
    }
    if escrow == arbiter {
        return Err(BrokerError::InvalidEscrow(
            "escrow cannot also be the arbiter".to_string(),
        ));
    }
    Ok(())
}
