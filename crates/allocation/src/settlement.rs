//! Per participant settlement.
//!
//! Outcomes are computed lazily on the first claim of a participant, from the
//! winner set frozen at that time. The previews below evaluate the very same
//! winner set so they always agree with what a claim pays out.

use {
    crate::{
        auction::Auction,
        bid::{Bid, BidLedger},
        error::{Error, Result},
        escrow::Release,
        primitives::{Address, Allocation, U256},
        ranking::WinnerPredicate,
    },
    serde::{Deserialize, Serialize},
};

/// Outcome of a participant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRecord {
    pub has_claimed: bool,
    pub prize_count: u32,
    pub refund_amount: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimInfo {
    pub bidder: Address,
    #[serde(flatten)]
    pub record: ClaimRecord,
}

/// A bid together with what it receives at settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserBid {
    pub bid: Bid,
    pub allocation: Allocation,
}

/// Sums the allocations of all bids of `bidder`. Participants without bids
/// get an empty outcome.
fn outcome(winners: &dyn WinnerPredicate, ledger: &BidLedger, bidder: &Address) -> ClaimRecord {
    let (prize_count, cost, paid) = ledger.bids_of(bidder).fold(
        (0u32, U256::ZERO, U256::ZERO),
        |(prizes, cost, paid), bid| {
            let allocation = winners.allocation(bid);
            (
                prizes + allocation.prizes,
                cost.saturating_add(allocation.cost),
                paid.saturating_add(bid.payment),
            )
        },
    );
    ClaimRecord {
        has_claimed: false,
        prize_count,
        refund_amount: paid.saturating_sub(cost),
    }
}

impl Auction {
    /// Pays out the prizes and the refund owed to `bidder`. Succeeds at most
    /// once per participant.
    ///
    /// Prizes go out before the refund. If the refund fails after the prizes
    /// were issued, the claim stays pending and a retry only sends the
    /// refund.
    pub fn claim(&mut self, bidder: Address) -> Result<ClaimRecord> {
        self.ensure_settlement_open()?;
        if self.claims.get(&bidder).is_some_and(|record| record.has_claimed) {
            return Err(Error::AlreadyClaimed(bidder));
        }
        if self.ledger.bid_count(&bidder) == 0 {
            return Err(Error::UnknownParticipant(bidder));
        }
        self.freeze()?;
        let (mut record, prizes_issued) = match self.pending.get(&bidder) {
            Some(pending) => (*pending, true),
            None => {
                let winners = self
                    .winners
                    .as_deref()
                    .expect("winner set was frozen above");
                (outcome(winners, &self.ledger, &bidder), false)
            }
        };

        self.escrow
            .release(Release::Refund, record.refund_amount)?;
        if !prizes_issued && record.prize_count > 0 {
            if let Err(err) = self
                .collaborators
                .prizes
                .issue(bidder, record.prize_count)
            {
                self.escrow.restore(Release::Refund, record.refund_amount);
                tracing::warn!(?bidder, ?err, "issuing prizes failed");
                return Err(Error::Transfer(err));
            }
            self.settlement_started = true;
        }
        if record.refund_amount > U256::ZERO {
            if let Err(err) = self
                .collaborators
                .value
                .transfer(bidder, record.refund_amount)
            {
                self.escrow.restore(Release::Refund, record.refund_amount);
                if record.prize_count > 0 {
                    self.pending.insert(bidder, record);
                }
                tracing::warn!(?bidder, refund = %record.refund_amount, ?err, "refund failed");
                return Err(Error::Transfer(err));
            }
        }

        self.pending.remove(&bidder);
        record.has_claimed = true;
        self.claims.insert(bidder, record);
        self.settlement_started = true;
        tracing::info!(
            ?bidder,
            prizes = record.prize_count,
            refund = %record.refund_amount,
            "settled claim"
        );
        Ok(record)
    }

    /// Outcome paid to `bidder`, if they claimed already.
    pub fn claim_record(&self, bidder: &Address) -> Option<ClaimRecord> {
        self.claims.get(bidder).copied()
    }

    /// Batch preview of claims. Participants without bids get zeroes.
    pub fn get_claim_info(&self, bidders: &[Address]) -> Result<Vec<ClaimInfo>> {
        self.ensure_settlement_open()?;
        let winners = self.winner_set()?;
        Ok(bidders
            .iter()
            .map(|bidder| ClaimInfo {
                bidder: *bidder,
                record: self
                    .claim_record(bidder)
                    .unwrap_or_else(|| outcome(&*winners, &self.ledger, bidder)),
            })
            .collect())
    }

    /// Every bid of `bidder` with its individual allocation.
    pub fn get_user_bids(&self, bidder: Address) -> Result<Vec<UserBid>> {
        self.ensure_settlement_open()?;
        let winners = self.winner_set()?;
        Ok(self
            .ledger
            .bids_of(&bidder)
            .map(|bid| UserBid {
                bid: bid.clone(),
                allocation: winners.allocation(bid),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            admission::BidRequest,
            auction::{Collaborators, SharedAuction},
            config::Strategy,
            ranking::WinRule,
            testing::{self, END, OPERATOR, UNIT_COST, bidder},
            traits::{MockPrizeIssuer, MockValueTransfer},
        },
        alloy::primitives::{B256, keccak256},
        maplit::hashmap,
        mockall::predicate::eq,
        rand::{Rng, SeedableRng, rngs::StdRng},
        std::{collections::HashMap, sync::Arc, thread},
    };

    fn value(units: u32) -> U256 {
        UNIT_COST * U256::from(units)
    }

    #[test]
    fn arrival_cutoff_settlement() {
        let (mut auction, clock, payouts) = testing::auction(Strategy::ArrivalCutoff, 5);
        for i in 1..=7 {
            auction
                .submit_bid(BidRequest::new(bidder(i), 1, UNIT_COST))
                .unwrap();
        }
        clock.set(END);

        for i in 1..=5 {
            assert_eq!(
                auction.claim(bidder(i)).unwrap(),
                ClaimRecord {
                    has_claimed: true,
                    prize_count: 1,
                    refund_amount: U256::ZERO,
                }
            );
        }
        for i in 6..=7 {
            assert_eq!(
                auction.claim(bidder(i)).unwrap(),
                ClaimRecord {
                    has_claimed: true,
                    prize_count: 0,
                    refund_amount: UNIT_COST,
                }
            );
        }
        assert_eq!(payouts.prizes_of(bidder(1)), 1);
        assert_eq!(payouts.prizes_of(bidder(6)), 0);
        assert_eq!(payouts.value_to(bidder(7)), UNIT_COST);
        assert_eq!(payouts.value_to(bidder(5)), U256::ZERO);
    }

    #[test]
    fn heap_winners_pay_the_floor() {
        let (mut auction, clock, payouts) =
            testing::auction(Strategy::BoundedHeap { reserve_price: 0 }, 10);
        for price in 1..=11u32 {
            auction
                .submit_bid(BidRequest::new(bidder(price.into()), price, value(price)))
                .unwrap();
        }
        clock.set(END);
        assert_eq!(auction.floor_price(), value(2));

        let loser = auction.claim(bidder(1)).unwrap();
        assert_eq!(loser.prize_count, 0);
        assert_eq!(loser.refund_amount, value(1));

        let top = auction.claim(bidder(11)).unwrap();
        assert_eq!(top.prize_count, 1);
        assert_eq!(top.refund_amount, value(9));

        let floor = auction.claim(bidder(2)).unwrap();
        assert_eq!(floor.prize_count, 1);
        assert_eq!(floor.refund_amount, U256::ZERO);

        assert_eq!(payouts.prizes_of(bidder(11)), 1);
        assert_eq!(payouts.value_to(bidder(11)), value(9));
    }

    #[test]
    fn claims_succeed_exactly_once() {
        let (mut auction, clock, _) = testing::auction(Strategy::ArrivalCutoff, 5);
        auction
            .submit_bid(BidRequest::new(bidder(1), 1, UNIT_COST))
            .unwrap();

        assert!(matches!(
            auction.claim(bidder(1)),
            Err(Error::SettlementNotYetOpen { .. })
        ));
        clock.set(END);
        auction.claim(bidder(1)).unwrap();
        assert!(matches!(
            auction.claim(bidder(1)),
            Err(Error::AlreadyClaimed(_))
        ));
        assert!(matches!(
            auction.claim(bidder(2)),
            Err(Error::UnknownParticipant(_))
        ));
    }

    #[test]
    fn concurrent_claims_pay_once() {
        let (mut auction, clock, payouts) =
            testing::auction(Strategy::BoundedHeap { reserve_price: 0 }, 1);
        auction
            .submit_bid(BidRequest::new(bidder(1), 3, value(3)))
            .unwrap();
        auction
            .submit_bid(BidRequest::new(bidder(2), 2, value(2)))
            .unwrap();
        clock.set(END);
        let shared = SharedAuction::new(auction);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let shared = shared.clone();
                thread::spawn(move || shared.claim(bidder(1)))
            })
            .collect();
        let results: Vec<_> = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect();

        let settled: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
        assert_eq!(settled.len(), 1);
        assert_eq!(
            *settled[0],
            ClaimRecord {
                has_claimed: true,
                prize_count: 1,
                refund_amount: U256::ZERO,
            }
        );
        assert!(
            results
                .iter()
                .filter_map(|r| r.as_ref().err())
                .all(|err| matches!(err, Error::AlreadyClaimed(_)))
        );
        assert_eq!(payouts.prizes_of(bidder(1)), 1);
    }

    #[test]
    fn failed_payout_rolls_the_claim_back() {
        let config = testing::config(Strategy::ArrivalCutoff, 1);
        let clock = Arc::new(testing::ManualClock::new(config.start_time));

        let mut prizes = MockPrizeIssuer::new();
        let mut attempt = 0;
        prizes.expect_issue().times(2).returning(move |_, _| {
            attempt += 1;
            if attempt == 1 {
                anyhow::bail!("resource paused")
            }
            Ok(())
        });
        let mut value = MockValueTransfer::new();
        value.expect_transfer().never();

        let mut auction = Auction::new(
            &config,
            Collaborators {
                clock: clock.clone(),
                prizes: Arc::new(prizes),
                value: Arc::new(value),
            },
        );
        auction
            .submit_bid(BidRequest::new(bidder(1), 1, UNIT_COST))
            .unwrap();
        clock.set(END);

        assert!(matches!(auction.claim(bidder(1)), Err(Error::Transfer(_))));
        assert_eq!(auction.claim_record(&bidder(1)), None);
        assert_eq!(auction.escrow().held(), UNIT_COST);

        assert_eq!(auction.claim(bidder(1)).unwrap().prize_count, 1);
    }

    #[test]
    fn retried_claim_only_sends_the_refund() {
        let config = testing::config(Strategy::BoundedHeap { reserve_price: 0 }, 2);
        let clock = Arc::new(testing::ManualClock::new(config.start_time));

        let mut prizes = MockPrizeIssuer::new();
        prizes
            .expect_issue()
            .with(eq(bidder(1)), eq(1u32))
            .times(1)
            .returning(|_, _| Ok(()));
        let mut transfers = MockValueTransfer::new();
        let mut attempt = 0;
        transfers
            .expect_transfer()
            .with(eq(bidder(1)), eq(UNIT_COST * U256::from(2u32)))
            .times(2)
            .returning(move |_, _| {
                attempt += 1;
                if attempt == 1 {
                    anyhow::bail!("value transfer paused")
                }
                Ok(())
            });

        let mut auction = Auction::new(
            &config,
            Collaborators {
                clock: clock.clone(),
                prizes: Arc::new(prizes),
                value: Arc::new(transfers),
            },
        );
        auction
            .submit_bid(BidRequest::new(bidder(1), 5, value(5)))
            .unwrap();
        auction
            .submit_bid(BidRequest::new(bidder(2), 3, value(3)))
            .unwrap();
        clock.set(END);

        assert!(matches!(auction.claim(bidder(1)), Err(Error::Transfer(_))));
        assert_eq!(auction.claim_record(&bidder(1)), None);
        assert!(auction.settlement_started());
        assert_eq!(auction.escrow().refunded(), U256::ZERO);

        assert_eq!(
            auction.claim(bidder(1)).unwrap(),
            ClaimRecord {
                has_claimed: true,
                prize_count: 1,
                refund_amount: value(2),
            }
        );
        assert_eq!(auction.escrow().refunded(), value(2));
        assert!(matches!(
            auction.claim(bidder(1)),
            Err(Error::AlreadyClaimed(_))
        ));
    }

    #[test]
    fn lottery_winner_is_refunded_beyond_one_unit() {
        let seed = B256::repeat_byte(9);
        let (mut auction, clock, payouts) = testing::auction(
            Strategy::WeightedLottery {
                seed_commitment: keccak256(seed),
                win_rule: Default::default(),
            },
            10,
        );
        auction
            .submit_bid(BidRequest::new(bidder(1), 3, value(3)))
            .unwrap();
        clock.set(END);

        assert!(matches!(
            auction.claim(bidder(1)),
            Err(Error::SeedNotRevealed)
        ));
        auction.reveal_seed(OPERATOR, seed).unwrap();
        assert_eq!(auction.floor_price(), UNIT_COST);

        let record = auction.claim(bidder(1)).unwrap();
        assert_eq!(record.prize_count, 1);
        assert_eq!(record.refund_amount, value(2));
        assert_eq!(auction.sweep_proceeds(OPERATOR).unwrap(), UNIT_COST);
        assert_eq!(payouts.value_to(bidder(1)), value(2));
        assert_eq!(payouts.value_to(testing::RECIPIENT), UNIT_COST);
    }

    #[test]
    fn previews_match_claims() {
        let (mut auction, clock, _) =
            testing::auction(Strategy::BoundedHeap { reserve_price: 0 }, 2);
        for (i, price) in [(1, 4), (2, 6), (1, 5), (3, 2)] {
            auction
                .submit_bid(BidRequest::new(bidder(i), price, value(price)))
                .unwrap();
        }
        assert!(matches!(
            auction.get_claim_info(&[bidder(1)]),
            Err(Error::SettlementNotYetOpen { .. })
        ));
        assert!(matches!(
            auction.get_user_bids(bidder(1)),
            Err(Error::SettlementNotYetOpen { .. })
        ));
        clock.set(END);

        let bids = auction.get_user_bids(bidder(1)).unwrap();
        assert_eq!(bids.len(), 2);
        assert!(!bids[0].allocation.is_winner());
        assert_eq!(
            bids[1].allocation,
            Allocation {
                prizes: 1,
                cost: value(5)
            }
        );

        let participants = [bidder(1), bidder(2), bidder(3), bidder(9)];
        let preview: HashMap<_, _> = auction
            .get_claim_info(&participants)
            .unwrap()
            .into_iter()
            .map(|info| (info.bidder, (info.record.prize_count, info.record.refund_amount)))
            .collect();
        assert_eq!(
            preview,
            hashmap! {
                bidder(1) => (1, value(4)),
                bidder(2) => (1, value(1)),
                bidder(3) => (0, value(2)),
                bidder(9) => (0, U256::ZERO),
            }
        );

        for participant in &participants[..3] {
            let record = auction.claim(*participant).unwrap();
            assert_eq!(
                (record.prize_count, record.refund_amount),
                preview[participant]
            );
        }
        let after = auction.get_claim_info(&[bidder(2)]).unwrap();
        assert!(after[0].record.has_claimed);
    }

    #[test]
    fn value_is_conserved() {
        let mut rng = StdRng::seed_from_u64(42);
        let seed = B256::repeat_byte(0x5e);
        let strategies = [
            Strategy::BoundedHeap { reserve_price: 3 },
            Strategy::ArrivalCutoff,
            Strategy::WeightedLottery {
                seed_commitment: keccak256(seed),
                win_rule: WinRule::StartInWindow,
            },
            Strategy::WeightedLottery {
                seed_commitment: keccak256(seed),
                win_rule: WinRule::SpanOverlap,
            },
        ];
        for strategy in strategies {
            let capacity = 50;
            let (mut auction, clock, payouts) = testing::auction(strategy.clone(), capacity);
            for _ in 0..3_000 {
                let who = bidder(rng.gen_range(0..1_500));
                let weight = match strategy {
                    Strategy::ArrivalCutoff => 1,
                    _ => rng.gen_range(1..200),
                };
                // rejections (limits, reserve price) are part of the stream
                let _ = auction.submit_bid(BidRequest::new(who, weight, value(weight)));
            }
            let deposited = auction.escrow().deposited();
            auction.set_capacity(OPERATOR, capacity - 10).unwrap();
            clock.set(END);
            if let Strategy::WeightedLottery { .. } = strategy {
                auction.reveal_seed(OPERATOR, seed).unwrap();
            }

            let participants: Vec<_> = auction.ledger().participants().copied().collect();
            let mut prizes = 0;
            for (i, participant) in participants.iter().enumerate() {
                if i == participants.len() / 2 {
                    auction.sweep_proceeds(OPERATOR).unwrap();
                }
                prizes += auction.claim(*participant).unwrap().prize_count;
            }
            auction.sweep_proceeds(OPERATOR).unwrap();

            assert!(prizes <= capacity - 10);
            assert_eq!(auction.escrow().held(), U256::ZERO);
            assert_eq!(
                auction.escrow().refunded() + auction.swept(),
                deposited
            );
            assert_eq!(payouts.total_value(), deposited);
        }
    }
}
