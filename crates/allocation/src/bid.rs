//! Append-only record of every admitted bid.

use {
    crate::primitives::{Address, BidId, Timestamp, U256},
    serde::{Deserialize, Serialize},
    std::collections::HashMap,
};

/// An admitted bid. Never mutated after admission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bid {
    pub id: BidId,
    pub bidder: Address,
    pub timestamp: Timestamp,
    /// Price per unit for price ranked auctions, share count for lotteries.
    pub weight: u32,
    /// Value escrowed with the bid.
    pub payment: U256,
}

/// Bids indexed by id and by participant.
#[derive(Debug, Default)]
pub struct BidLedger {
    bids: Vec<Bid>,
    by_participant: HashMap<Address, Vec<BidId>>,
}

impl BidLedger {
    /// Appends a bid and returns its id, which is always the previous ledger
    /// length.
    pub fn append(
        &mut self,
        bidder: Address,
        timestamp: Timestamp,
        weight: u32,
        payment: U256,
    ) -> BidId {
        let id = BidId(
            self.bids
                .len()
                .try_into()
                .expect("more than u32::MAX bids cannot be admitted"),
        );
        self.bids.push(Bid {
            id,
            bidder,
            timestamp,
            weight,
            payment,
        });
        self.by_participant.entry(bidder).or_default().push(id);
        id
    }

    pub fn get(&self, id: BidId) -> Option<&Bid> {
        self.bids.get(id.index())
    }

    pub fn len(&self) -> usize {
        self.bids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bid> {
        self.bids.iter()
    }

    /// Bids of a participant in admission order.
    pub fn bids_of(&self, bidder: &Address) -> impl Iterator<Item = &Bid> {
        self.by_participant
            .get(bidder)
            .into_iter()
            .flatten()
            .map(|id| &self.bids[id.index()])
    }

    pub fn bid_count(&self, bidder: &Address) -> usize {
        self.by_participant.get(bidder).map_or(0, Vec::len)
    }

    /// Sum of all payments a participant escrowed.
    pub fn total_paid(&self, bidder: &Address) -> U256 {
        self.bids_of(bidder)
            .fold(U256::ZERO, |acc, bid| acc.saturating_add(bid.payment))
    }

    pub fn participants(&self) -> impl Iterator<Item = &Address> {
        self.by_participant.keys()
    }
}
