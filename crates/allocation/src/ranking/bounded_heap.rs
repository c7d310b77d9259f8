//! Top-K by price, maintained online while bids arrive.
//!
//! The current winners live in a min-heap of at most `capacity` entries. A new
//! bid either fills a free slot or evicts the cheapest winner if it strictly
//! outbids it. On equal prices the incumbent stays, so earlier bids win ties.
//! Evicted bids stay in the ledger and are refunded in full at settlement.

use {
    super::{RankingPolicy, WinnerPredicate},
    crate::{
        bid::{Bid, BidLedger},
        error::{Error, Result},
        primitives::{Allocation, BidId, U256},
    },
    std::{
        cmp::{Ordering, Reverse},
        collections::{BinaryHeap, HashSet},
    },
};

/// Heap entry. Greater means more deserving of a prize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Entry {
    price: u32,
    id: BidId,
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.price
            .cmp(&other.price)
            // Earlier bids rank higher among equal prices.
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug)]
pub struct BoundedHeap {
    /// Root is the least deserving current winner.
    heap: BinaryHeap<Reverse<Entry>>,
    capacity: u32,
    reserve_price: u32,
    unit_cost: U256,
}

impl BoundedHeap {
    pub fn new(capacity: u32, reserve_price: u32, unit_cost: U256) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(capacity as usize),
            capacity,
            reserve_price,
            unit_cost,
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    fn is_full(&self) -> bool {
        self.heap.len() >= self.capacity as usize
    }

    /// Lowest winning price, or the reserve price while there are free slots.
    pub fn floor(&self) -> u32 {
        match self.heap.peek() {
            Some(Reverse(min)) if self.capacity > 0 && self.is_full() => min.price,
            _ => self.reserve_price,
        }
    }

    fn price_in_value(&self, price: u32) -> U256 {
        U256::from(price).saturating_mul(self.unit_cost)
    }
}

impl RankingPolicy for BoundedHeap {
    fn name(&self) -> &'static str {
        "bounded-heap"
    }

    fn validate(&self, weight: u32) -> Result<()> {
        if weight == 0 {
            return Err(Error::InvalidWeight(weight));
        }
        if weight < self.reserve_price {
            return Err(Error::BelowReservePrice {
                price: weight,
                reserve: self.reserve_price,
            });
        }
        Ok(())
    }

    fn admit(&mut self, bid: &Bid) {
        let entry = Entry {
            price: bid.weight,
            id: bid.id,
        };
        if !self.is_full() {
            self.heap.push(Reverse(entry));
            tracing::debug!(bid = %bid.id, price = bid.weight, "bid took a free slot");
            return;
        }
        let floor = self.floor();
        match self.heap.peek_mut() {
            Some(mut min) if entry.price > min.0.price => {
                // Dropping `min` sifts the new root down.
                let Reverse(evicted) = std::mem::replace(&mut *min, Reverse(entry));
                tracing::debug!(
                    bid = %bid.id,
                    price = bid.weight,
                    evicted = %evicted.id,
                    evicted_price = evicted.price,
                    "bid evicted the lowest winner"
                );
            }
            _ => {
                tracing::debug!(
                    bid = %bid.id,
                    price = bid.weight,
                    floor,
                    "bid does not beat the floor"
                );
            }
        }
    }

    fn reduce_capacity(&mut self, capacity: u32) {
        self.capacity = capacity;
        while self.heap.len() > capacity as usize {
            if let Some(Reverse(dropped)) = self.heap.pop() {
                tracing::debug!(bid = %dropped.id, price = dropped.price, "bid lost its slot");
            }
        }
    }

    fn floor_price(&self) -> U256 {
        self.price_in_value(self.floor())
    }

    fn compute_winners(
        &self,
        _ledger: &BidLedger,
        capacity: u32,
    ) -> Result<Box<dyn WinnerPredicate>> {
        debug_assert!(self.heap.len() <= capacity as usize);
        Ok(Box::new(HeapWinners {
            winners: self.heap.iter().map(|Reverse(entry)| entry.id).collect(),
            floor: self.floor_price(),
        }))
    }
}

#[derive(Debug)]
struct HeapWinners {
    winners: HashSet<BidId>,
    floor: U256,
}

impl WinnerPredicate for HeapWinners {
    fn allocation(&self, bid: &Bid) -> Allocation {
        if self.winners.contains(&bid.id) {
            Allocation {
                prizes: 1,
                cost: self.floor,
            }
        } else {
            Allocation::LOST
        }
    }

    fn floor_price(&self) -> U256 {
        self.floor
    }

    fn proceeds(&self, _ledger: &BidLedger) -> U256 {
        self.floor.saturating_mul(U256::from(self.winners.len()))
    }
}
