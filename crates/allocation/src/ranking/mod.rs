//! Strategies deciding which admitted bids win a prize.
//!
//! A strategy sees every admitted bid in admission order and, once the
//! admission window closed, produces a [`WinnerPredicate`] that maps each bid
//! to its [`Allocation`]. The predicate is computed once and then consulted
//! for every claim, preview and sweep so all of them agree.

use {
    crate::{
        bid::{Bid, BidLedger},
        error::{Error, Result},
        primitives::{Allocation, B256, U256},
    },
    std::fmt::Debug,
};

pub mod arrival_cutoff;
pub mod bounded_heap;
pub mod lottery;

pub use {
    arrival_cutoff::ArrivalCutoff,
    bounded_heap::BoundedHeap,
    lottery::{WeightedLottery, WinRule},
};

/// Decides the winner set of an auction.
pub trait RankingPolicy: Debug + Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Rejects bid weights the strategy cannot rank. Runs before anything
    /// gets written.
    fn validate(&self, weight: u32) -> Result<()> {
        if weight == 0 {
            return Err(Error::InvalidWeight(weight));
        }
        Ok(())
    }

    /// Observes a freshly admitted bid.
    fn admit(&mut self, _bid: &Bid) {}

    /// Observes a capacity reduction.
    fn reduce_capacity(&mut self, _capacity: u32) {}

    /// Feeds the post-admission randomness to strategies that need it.
    fn reveal_seed(&mut self, _seed: B256, _ledger: &BidLedger, _capacity: u32) -> Result<()> {
        Err(Error::NoSeedCommitted)
    }

    /// The price every winner pays per prize unit given the bids seen so
    /// far.
    fn floor_price(&self) -> U256;

    /// Freezes the current winner set.
    fn compute_winners(
        &self,
        ledger: &BidLedger,
        capacity: u32,
    ) -> Result<Box<dyn WinnerPredicate>>;
}

/// Frozen outcome of a [`RankingPolicy`].
pub trait WinnerPredicate: Debug + Send + Sync {
    /// What `bid` receives and what part of its payment is kept.
    fn allocation(&self, bid: &Bid) -> Allocation;

    /// Clearing price per prize unit.
    fn floor_price(&self) -> U256;

    /// Value collected from all winning bids.
    fn proceeds(&self, ledger: &BidLedger) -> U256 {
        ledger.iter().fold(U256::ZERO, |acc, bid| {
            acc.saturating_add(self.allocation(bid).cost)
        })
    }
}
