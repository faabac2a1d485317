use betbroker_core::{
    AccountId, Amount, BetBroker, BrokerError, InMemoryLedger, Ledger, Result, WagerEvent,
    WagerId, WagerResult,
};

const AMOUNT_1: Amount = 1_000_000_000;
const AMOUNT_2: Amount = 512_000_000_000;
const MAX_AMOUNT: Amount = 1_000_000_000_000_000_000_000_000_000_000;

struct Fixture {
    broker: BetBroker<InMemoryLedger>,
    owner: AccountId,
    escrow: AccountId,
    account1: AccountId,
    account2: AccountId,
}

impl Fixture {
    fn deploy() -> Self {
        let owner = AccountId::from_label("owner");
        let escrow = AccountId::from_label("broker");
        let ledger = InMemoryLedger::new(owner, MAX_AMOUNT);
        Self {
            broker: BetBroker::new(ledger, escrow, owner).unwrap(),
            owner,
            escrow,
            account1: AccountId::from_label("account1"),
            account2: AccountId::from_label("account2"),
        }
    }

    fn fund(&mut self, account: AccountId, amount: Amount) {
        let owner = self.owner;
        self.broker
            .ledger_mut()
            .transfer(&owner, &account, amount)
            .unwrap();
    }

    fn approve(&mut self, account: AccountId) {
        let escrow = self.escrow;
        self.broker
            .ledger_mut()
            .approve(&account, &escrow, MAX_AMOUNT)
            .unwrap();
    }

    fn balance(&self, account: AccountId) -> Amount {
        self.broker.ledger().balance_of(&account)
    }

    /// Both accounts funded and approved, wager 1 created by account1.
    fn with_open_wager() -> Self {
        let mut f = Self::deploy();
        let (a1, a2) = (f.account1, f.account2);
        f.approve(a1);
        f.fund(a1, AMOUNT_1);
        f.approve(a2);
        f.fund(a2, AMOUNT_2);
        f.broker.create_bet(1, AMOUNT_1, AMOUNT_2, &a1).unwrap();
        f
    }

    /// Four wagers: 1 open, 2 matched, 3 closed, 4 settled for the creator.
    fn with_viewer_wagers() -> Self {
        let mut f = Self::deploy();
        let (a1, a2, owner) = (f.account1, f.account2, f.owner);
        f.approve(a1);
        f.fund(a1, AMOUNT_1 * 3);
        f.approve(a2);
        f.fund(a2, AMOUNT_2 * 3);
        f.broker.create_bet(1, AMOUNT_1, AMOUNT_2, &a1).unwrap();
        f.broker.create_bet(2, AMOUNT_1, AMOUNT_2, &a1).unwrap();
        f.broker.create_bet(3, AMOUNT_2, AMOUNT_1, &a2).unwrap();
        f.broker.create_bet(4, AMOUNT_2, AMOUNT_1, &a2).unwrap();

        f.broker.take_bet(WagerId(2), &a2).unwrap();
        f.broker.close_bet(WagerId(3), &owner).unwrap();
        f.broker.take_bet(WagerId(4), &a1).unwrap();
        f.broker.distribute_gains(WagerId(4), true, &owner).unwrap();
        f
    }
}

fn assert_err<T: std::fmt::Debug>(res: Result<T>, expected: BrokerError) {
    match res {
        Err(e) => assert_eq!(e, expected),
        Ok(v) => panic!("Expected error {expected:?}, got Ok({v:?})"),
    }
}

#[test]
fn deployment_sets_arbiter_and_supply() {
    let f = Fixture::deploy();
    assert_eq!(f.broker.arbiter(), &f.owner);
    assert_eq!(f.broker.escrow_account(), &f.escrow);
    assert_eq!(f.balance(f.owner), MAX_AMOUNT);
    assert_eq!(f.broker.bet_count(), 0);
}

#[test]
fn create_bet() {
    let mut f = Fixture::deploy();
    let a1 = f.account1;

    assert_err(
        f.broker.create_bet(1, AMOUNT_1, AMOUNT_2, &a1),
        BrokerError::InsufficientFunds {
            required: AMOUNT_1,
            available: 0,
        },
    );
    f.fund(a1, AMOUNT_1);
    assert_eq!(f.balance(f.escrow), 0);
    assert_eq!(f.balance(a1), AMOUNT_1);

    assert_err(
        f.broker.create_bet(1, AMOUNT_1, AMOUNT_2, &a1),
        BrokerError::InsufficientAllowance {
            required: AMOUNT_1,
            allowed: 0,
        },
    );
    f.approve(a1);

    assert_err(f.broker.create_bet(1, 0, AMOUNT_2, &a1), BrokerError::InvalidStake);
    assert_err(f.broker.create_bet(1, AMOUNT_1, 0, &a1), BrokerError::InvalidStake);
    assert_eq!(f.balance(f.escrow), 0);
    assert_eq!(f.balance(a1), AMOUNT_1);

    let id = f.broker.create_bet(1, AMOUNT_1, AMOUNT_2, &a1).unwrap();
    assert_eq!(
        f.broker.events().last(),
        Some(&WagerEvent::WagerCreated {
            id,
            event_id: 1,
            creator: a1,
            creator_amount: AMOUNT_1,
            taker_amount: AMOUNT_2,
        })
    );
    assert_eq!(f.broker.events().len(), 1);
    assert_eq!(f.balance(f.escrow), AMOUNT_1);
    assert_eq!(f.balance(a1), 0);
}

#[test]
fn take_bet() {
    let mut f = Fixture::deploy();
    let (a1, a2) = (f.account1, f.account2);
    f.approve(a1);
    f.fund(a1, AMOUNT_1);
    let id = f.broker.create_bet(1, AMOUNT_1, AMOUNT_2, &a1).unwrap();
    assert_eq!(f.balance(f.escrow), AMOUNT_1);

    assert_err(
        f.broker.take_bet(id, &a2),
        BrokerError::InsufficientFunds {
            required: AMOUNT_2,
            available: 0,
        },
    );
    f.fund(a2, AMOUNT_2);
    assert_err(
        f.broker.take_bet(id, &a2),
        BrokerError::InsufficientAllowance {
            required: AMOUNT_2,
            allowed: 0,
        },
    );
    f.approve(a2);
    assert_eq!(f.balance(f.escrow), AMOUNT_1);
    assert_eq!(f.balance(a2), AMOUNT_2);

    f.broker.take_bet(id, &a2).unwrap();
    assert_eq!(
        f.broker.events().last(),
        Some(&WagerEvent::WagerMatched {
            id,
            event_id: 1,
            creator: a1,
            taker: a2,
            creator_amount: AMOUNT_1,
            taker_amount: AMOUNT_2,
        })
    );
    assert_eq!(f.balance(f.escrow), AMOUNT_1 + AMOUNT_2);
    assert_eq!(f.balance(a2), 0);
}

#[test]
fn take_closed_bet_fails() {
    let mut f = Fixture::with_open_wager();
    let (owner, a1, a2) = (f.owner, f.account1, f.account2);

    f.broker.close_bet(WagerId(1), &owner).unwrap();
    assert_err(f.broker.take_bet(WagerId(1), &a2), BrokerError::Closed);
    assert_err(f.broker.take_bet(WagerId(1), &a1), BrokerError::Closed);

    assert_eq!(f.balance(f.escrow), AMOUNT_1);
    assert_eq!(f.balance(a1), 0);
    assert_eq!(f.balance(a2), AMOUNT_2);
}

#[test]
fn close_bet() {
    let mut f = Fixture::with_open_wager();
    let (owner, a1) = (f.owner, f.account1);

    f.broker.close_bet(WagerId(1), &owner).unwrap();
    assert_eq!(
        f.broker.events().last(),
        Some(&WagerEvent::WagerClosed {
            id: WagerId(1),
            event_id: 1,
            creator: a1,
            creator_amount: AMOUNT_1,
        })
    );

    // no refund: the creator stake stays escrowed
    assert_eq!(f.balance(f.escrow), AMOUNT_1);
    assert_eq!(f.balance(a1), 0);
    assert_eq!(f.broker.custody_of(WagerId(1)), Some(AMOUNT_1));
}

#[test]
fn close_taken_bet_fails() {
    let mut f = Fixture::with_open_wager();
    let (owner, a1, a2) = (f.owner, f.account1, f.account2);

    f.broker.take_bet(WagerId(1), &a2).unwrap();
    assert_err(
        f.broker.close_bet(WagerId(1), &owner),
        BrokerError::AlreadyMatched,
    );
    assert_eq!(f.balance(f.escrow), AMOUNT_1 + AMOUNT_2);
    assert_eq!(f.balance(a1), 0);
}

fn settle_and_claim(creator_won: bool) {
    let mut f = Fixture::with_open_wager();
    let (owner, a1, a2) = (f.owner, f.account1, f.account2);
    let id = WagerId(1);
    let (winner, loser) = if creator_won { (a1, a2) } else { (a2, a1) };

    assert_err(
        f.broker.distribute_gains(id, creator_won, &owner),
        BrokerError::NotMatched,
    );
    f.broker.take_bet(id, &a2).unwrap();

    assert_err(f.broker.claim_gains(id, &a1), BrokerError::ResultUnknown);
    assert_eq!(f.balance(f.escrow), AMOUNT_1 + AMOUNT_2);
    assert_eq!(f.balance(a1), 0);

    f.broker.distribute_gains(id, creator_won, &owner).unwrap();
    assert_eq!(
        f.broker.events().last(),
        Some(&WagerEvent::GainsDistributed {
            id,
            event_id: 1,
            creator: a1,
            taker: a2,
            creator_amount: AMOUNT_1,
            taker_amount: AMOUNT_2,
            result: if creator_won { 1 } else { 2 },
        })
    );

    assert_err(
        f.broker.distribute_gains(id, !creator_won, &owner),
        BrokerError::AlreadySettled,
    );
    assert_eq!(
        f.broker.bet(id).unwrap().result,
        WagerResult::from_creator_won(creator_won)
    );

    assert_err(f.broker.claim_gains(id, &loser), BrokerError::NotWinner);
    assert_eq!(f.balance(f.escrow), AMOUNT_1 + AMOUNT_2);
    assert_eq!(f.balance(loser), 0);

    assert_eq!(f.broker.claim_gains(id, &winner).unwrap(), AMOUNT_1 + AMOUNT_2);
    assert_err(f.broker.claim_gains(id, &winner), BrokerError::AlreadyClaimed);

    assert_eq!(f.balance(f.escrow), 0);
    assert_eq!(f.balance(winner), AMOUNT_1 + AMOUNT_2);
    assert_eq!(f.balance(loser), 0);
    assert_eq!(f.broker.custody_of(id), Some(0));
}

#[test]
fn distribute_and_claim_creator_won() {
    settle_and_claim(true);
}

#[test]
fn distribute_and_claim_taker_won() {
    settle_and_claim(false);
}

#[test]
fn missing_bet_is_reported_everywhere() {
    let mut f = Fixture::deploy();
    let (owner, a1) = (f.owner, f.account1);
    f.approve(a1);
    f.fund(a1, AMOUNT_1);
    let id = WagerId(1);

    assert_err(f.broker.take_bet(id, &a1), BrokerError::NotFound(id));
    assert_err(f.broker.claim_gains(id, &a1), BrokerError::NotFound(id));
    assert_err(f.broker.close_bet(id, &owner), BrokerError::NotFound(id));
    assert_err(
        f.broker.distribute_gains(id, true, &owner),
        BrokerError::NotFound(id),
    );
    assert_eq!(f.balance(f.escrow), 0);
    assert_eq!(f.balance(a1), AMOUNT_1);
}

#[test]
fn arbiter_only_operations() {
    let mut f = Fixture::deploy();
    let a1 = f.account1;

    assert_err(f.broker.close_bet(WagerId(1), &a1), BrokerError::Unauthorized);
    assert_err(
        f.broker.distribute_gains(WagerId(1), true, &a1),
        BrokerError::Unauthorized,
    );
    assert_err(f.broker.transfer_arbiter(a1, &a1), BrokerError::Unauthorized);
}

#[test]
fn list_all_bets() {
    let f = Fixture::with_viewer_wagers();
    let (a1, a2) = (f.account1, f.account2);
    let bets = f.broker.bets();

    assert_eq!(bets.len(), 4);
    let ids: Vec<_> = bets.iter().map(|w| w.id).collect();
    assert_eq!(ids, vec![WagerId(1), WagerId(2), WagerId(3), WagerId(4)]);

    assert_eq!(bets[0].event_id, 1);
    assert_eq!(bets[0].creator, a1);
    assert_eq!(bets[0].taker, None);
    assert_eq!(bets[0].creator_amount, AMOUNT_1);
    assert_eq!(bets[0].taker_amount, AMOUNT_2);
    assert!(!bets[0].is_closed);
    assert_eq!(bets[0].result.code(), 0);

    assert_eq!(bets[1].event_id, 2);
    assert_eq!(bets[1].taker, Some(a2));
    assert!(!bets[1].is_closed);
    assert_eq!(bets[1].result, WagerResult::Unknown);

    assert_eq!(bets[2].event_id, 3);
    assert_eq!(bets[2].creator, a2);
    assert_eq!(bets[2].taker, None);
    assert_eq!(bets[2].creator_amount, AMOUNT_2);
    assert_eq!(bets[2].taker_amount, AMOUNT_1);
    assert!(bets[2].is_closed);

    assert_eq!(bets[3].event_id, 4);
    assert_eq!(bets[3].taker, Some(a1));
    assert!(!bets[3].is_closed);
    assert_eq!(bets[3].result.code(), 1);
}

#[test]
fn list_bets_by_account() {
    let f = Fixture::with_viewer_wagers();

    let events = |account: &AccountId| -> Vec<u64> {
        f.broker
            .bets_by_account(account)
            .iter()
            .map(|w| w.event_id)
            .collect()
    };
    assert_eq!(events(&f.account1), vec![1, 2, 4]);
    assert_eq!(events(&f.account2), vec![2, 3, 4]);
    assert!(events(&AccountId::from_label("stranger")).is_empty());
}

#[test]
fn list_open_bets_for_event_and_account() {
    let mut f = Fixture::deploy();
    let (owner, a1, a2) = (f.owner, f.account1, f.account2);
    let event_id = 1;
    let other_event_id = 23;
    f.approve(a1);
    f.fund(a1, AMOUNT_1 * 3);
    f.approve(a2);
    f.fund(a2, AMOUNT_2 * 3);

    f.broker.create_bet(event_id, AMOUNT_1, AMOUNT_2, &a1).unwrap();
    assert_eq!(f.broker.open_bets(event_id, &a2).len(), 1);

    f.broker.take_bet(WagerId(1), &a2).unwrap();
    assert!(f.broker.open_bets(event_id, &a1).is_empty());

    f.broker.create_bet(event_id, AMOUNT_1, AMOUNT_2, &a1).unwrap();
    assert_eq!(f.broker.open_bets(event_id, &a2).len(), 1);
    f.broker.close_bet(WagerId(2), &owner).unwrap();
    assert!(f.broker.open_bets(event_id, &a2).is_empty());

    // own offers never show up
    f.broker.create_bet(event_id, AMOUNT_2, AMOUNT_1, &a2).unwrap();
    assert!(f.broker.open_bets(event_id, &a2).is_empty());
    assert_eq!(f.broker.open_bets(event_id, &a1).len(), 1);

    f.broker.create_bet(other_event_id, AMOUNT_1, AMOUNT_2, &a1).unwrap();
    assert!(f.broker.open_bets(event_id, &a2).is_empty());
    assert_eq!(f.broker.open_bets(other_event_id, &a2).len(), 1);
}

#[test]
fn escrow_holds_exactly_the_custody_of_every_wager() {
    let f = Fixture::with_viewer_wagers();
    // 1 open (AMOUNT_1), 2 matched (pool), 3 closed (AMOUNT_2), 4 settled unclaimed (pool)
    let expected = AMOUNT_1 + (AMOUNT_1 + AMOUNT_2) + AMOUNT_2 + (AMOUNT_2 + AMOUNT_1);
    assert_eq!(f.broker.total_custody(), expected);
    assert_eq!(f.balance(f.escrow), expected);

    for wager in f.broker.bets() {
        let custody = f.broker.custody_of(wager.id).unwrap();
        let valid = [wager.creator_amount, wager.creator_amount + wager.taker_amount, 0];
        assert!(valid.contains(&custody));
        assert!(!(wager.is_closed && wager.taker.is_some()));
        if wager.result.is_known() {
            assert!(wager.taker.is_some());
        }
    }
}

#[test]
fn event_trail_is_one_per_successful_call() {
    let f = Fixture::with_viewer_wagers();
    let names: Vec<_> = f.broker.events().iter().map(|e| e.name()).collect();
    assert_eq!(
        names,
        vec![
            "WagerCreated",
            "WagerCreated",
            "WagerCreated",
            "WagerCreated",
            "WagerMatched",
            "WagerClosed",
            "WagerMatched",
            "GainsDistributed",
        ]
    );
}

#[test]
fn escrow_account_cannot_stake_on_its_own_custody() {
    let mut f = Fixture::with_open_wager();
    let (owner, escrow, a2) = (f.owner, f.escrow, f.account2);
    f.approve(escrow);

    assert_err(
        f.broker.create_bet(2, AMOUNT_1, AMOUNT_2, &escrow),
        BrokerError::EscrowParty,
    );
    assert_err(f.broker.take_bet(WagerId(1), &escrow), BrokerError::EscrowParty);
    assert_eq!(f.broker.bet_count(), 1);

    // the honest lifecycle still balances to the last token
    f.broker.take_bet(WagerId(1), &a2).unwrap();
    f.broker.distribute_gains(WagerId(1), false, &owner).unwrap();
    assert_eq!(f.balance(escrow), f.broker.total_custody());
    f.broker.claim_gains(WagerId(1), &a2).unwrap();
    assert_eq!(f.balance(escrow), 0);
    assert_eq!(f.broker.total_custody(), 0);
    assert_eq!(f.balance(a2), AMOUNT_1 + AMOUNT_2);
}

#[test]
fn escrow_cannot_double_as_arbiter() {
    let owner = AccountId::from_label("owner");
    let ledger = InMemoryLedger::new(owner, MAX_AMOUNT);
    assert!(matches!(
        BetBroker::new(ledger, owner, owner),
        Err(BrokerError::InvalidEscrow(_))
    ));
}
