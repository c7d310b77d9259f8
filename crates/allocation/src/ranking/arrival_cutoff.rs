//! Fixed price raffle: the first `capacity` bids win.

use {
    super::{RankingPolicy, WinnerPredicate},
    crate::{
        bid::{Bid, BidLedger},
        error::{Error, Result},
        primitives::{Allocation, BidId, U256},
    },
};

/// Every bid buys exactly one ticket at `unit_cost`.
#[derive(Debug)]
pub struct ArrivalCutoff {
    unit_cost: U256,
}

impl ArrivalCutoff {
    pub fn new(unit_cost: U256) -> Self {
        Self { unit_cost }
    }
}

impl RankingPolicy for ArrivalCutoff {
    fn name(&self) -> &'static str {
        "arrival-cutoff"
    }

    fn validate(&self, weight: u32) -> Result<()> {
        if weight != 1 {
            return Err(Error::InvalidWeight(weight));
        }
        Ok(())
    }

    fn floor_price(&self) -> U256 {
        self.unit_cost
    }

    fn compute_winners(
        &self,
        _ledger: &BidLedger,
        capacity: u32,
    ) -> Result<Box<dyn WinnerPredicate>> {
        Ok(Box::new(Cutoff {
            first_loser: BidId(capacity),
            unit_cost: self.unit_cost,
        }))
    }
}

#[derive(Debug)]
struct Cutoff {
    first_loser: BidId,
    unit_cost: U256,
}

impl WinnerPredicate for Cutoff {
    fn allocation(&self, bid: &Bid) -> Allocation {
        if bid.id < self.first_loser {
            Allocation {
                prizes: 1,
                cost: bid.payment,
            }
        } else {
            Allocation::LOST
        }
    }

    fn floor_price(&self) -> U256 {
        self.unit_cost
    }
}

#[cfg(test)]
mod tests {
    use {super::*, crate::testing::bidder};

    #[test]
    fn first_bids_win() {
        let policy = ArrivalCutoff::new(U256::from(100));
        let mut ledger = BidLedger::default();
        for i in 0..7 {
            ledger.append(bidder(i), 0, 1, U256::from(100));
        }

        let winners = policy.compute_winners(&ledger, 5).unwrap();
        let allocations: Vec<_> = ledger.iter().map(|bid| winners.allocation(bid)).collect();
        for allocation in &allocations[..5] {
            assert_eq!(
                *allocation,
                Allocation {
                    prizes: 1,
                    cost: U256::from(100)
                }
            );
        }
        for allocation in &allocations[5..] {
            assert_eq!(*allocation, Allocation::LOST);
        }
        assert_eq!(winners.proceeds(&ledger), U256::from(500));
    }

    #[test]
    fn fewer_bids_than_capacity() {
        let policy = ArrivalCutoff::new(U256::from(100));
        let mut ledger = BidLedger::default();
        ledger.append(bidder(0), 0, 1, U256::from(100));

        let winners = policy.compute_winners(&ledger, 5).unwrap();
        assert_eq!(winners.proceeds(&ledger), U256::from(100));
    }

    #[test]
    fn only_single_tickets() {
        let policy = ArrivalCutoff::new(U256::from(100));
        assert!(policy.validate(1).is_ok());
        assert!(matches!(policy.validate(0), Err(Error::InvalidWeight(0))));
        assert!(matches!(policy.validate(2), Err(Error::InvalidWeight(2))));
    }
}
