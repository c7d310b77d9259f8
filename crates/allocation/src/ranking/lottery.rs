//! Share weighted lottery.
//!
//! Every bid occupies a span of `weight` consecutive indices in one shared
//! index space, laid out in admission order. After admission closes a window
//! of `capacity` indices is placed at a random offset and the bids falling
//! into it win one prize each.
//!
//! The offset comes from a commit-reveal scheme: the operator commits to
//! `keccak256(seed)` before the auction starts and reveals `seed` after it
//! ended. Nobody can predict the window while bids are still accepted and
//! anybody can recompute it afterwards.

use {
    super::{RankingPolicy, WinnerPredicate},
    crate::{
        bid::{Bid, BidLedger},
        error::{Error, Result},
        primitives::{Allocation, B256, U256},
    },
    alloy::primitives::keccak256,
    serde::{Deserialize, Serialize},
    std::ops::Range,
};

/// How a bid's index span is matched against the winning window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WinRule {
    /// The first index of the bid lies inside the window. Weight shifts the
    /// positions of later bids but does not enlarge the bid's own chance.
    #[default]
    StartInWindow,
    /// Any index of the bid lies inside the window, so the chance to win
    /// grows with the weight.
    SpanOverlap,
}

#[derive(Debug)]
pub struct WeightedLottery {
    commitment: B256,
    unit_cost: U256,
    rule: WinRule,
    /// Cumulative weight of all earlier bids, indexed by bid id.
    bid_index: Vec<u64>,
    total_weight: u64,
    win_start: Option<u64>,
}

impl WeightedLottery {
    pub fn new(commitment: B256, unit_cost: U256, rule: WinRule) -> Self {
        Self {
            commitment,
            unit_cost,
            rule,
            bid_index: Vec::new(),
            total_weight: 0,
            win_start: None,
        }
    }

    pub fn total_weight(&self) -> u64 {
        self.total_weight
    }

    pub fn win_start(&self) -> Option<u64> {
        self.win_start
    }
}

/// Derives the window offset in `[0, total_weight - capacity]` from the
/// revealed seed and the final shape of the index space.
pub fn draw_window_start(seed: B256, total_weight: u64, bid_count: u64, capacity: u32) -> u64 {
    let range = total_weight.saturating_sub(u64::from(capacity));
    if range == 0 {
        return 0;
    }
    let digest = keccak256(
        [
            seed.as_slice(),
            &total_weight.to_be_bytes(),
            &bid_count.to_be_bytes(),
        ]
        .concat(),
    );
    let modulus = U256::from(range) + U256::from(1);
    (U256::from_be_bytes(digest.0) % modulus).saturating_to::<u64>()
}

impl RankingPolicy for WeightedLottery {
    fn name(&self) -> &'static str {
        "weighted-lottery"
    }

    fn admit(&mut self, bid: &Bid) {
        debug_assert_eq!(bid.id.index(), self.bid_index.len());
        self.bid_index.push(self.total_weight);
        self.total_weight += u64::from(bid.weight);
    }

    fn reveal_seed(&mut self, seed: B256, ledger: &BidLedger, capacity: u32) -> Result<()> {
        if self.win_start.is_some() {
            return Err(Error::SeedAlreadyRevealed);
        }
        if keccak256(seed) != self.commitment {
            return Err(Error::SeedMismatch);
        }
        let start = draw_window_start(seed, self.total_weight, ledger.len() as u64, capacity);
        tracing::info!(
            win_start = start,
            window = capacity,
            total_weight = self.total_weight,
            "drew lottery window"
        );
        self.win_start = Some(start);
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
        let start = self.win_start.ok_or(Error::SeedNotRevealed)?;
        Ok(Box::new(LotteryWinners {
            window: start..start.saturating_add(u64::from(capacity)),
            rule: self.rule,
            bid_index: self.bid_index.clone(),
            unit_cost: self.unit_cost,
        }))
    }
}

#[derive(Debug)]
struct LotteryWinners {
    window: Range<u64>,
    rule: WinRule,
    bid_index: Vec<u64>,
    unit_cost: U256,
}

impl WinnerPredicate for LotteryWinners {
    fn allocation(&self, bid: &Bid) -> Allocation {
        let Some(&start) = self.bid_index.get(bid.id.index()) else {
            return Allocation::LOST;
        };
        let wins = match self.rule {
            WinRule::StartInWindow => self.window.contains(&start),
            WinRule::SpanOverlap => {
                start < self.window.end && start + u64::from(bid.weight) > self.window.start
            }
        };
        // One prize per winning bid at the unit price. The rest of a heavier
        // bid's payment is refunded.
        if wins {
            Allocation {
                prizes: 1,
                cost: self.unit_cost,
            }
        } else {
            Allocation::LOST
        }
    }

    fn floor_price(&self) -> U256 {
        self.unit_cost
    }
}
