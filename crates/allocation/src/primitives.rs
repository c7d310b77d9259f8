//! Primitive types for allocation.

pub use alloy::primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

/// Seconds since the Unix epoch.
pub type Timestamp = u32;

/// Dense, monotonically increasing identifier of an admitted bid.
///
/// The n-th admitted bid has id `n - 1`, so an id doubles as an index into
/// the bid ledger.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::From,
    derive_more::Into,
)]
pub struct BidId(pub u32);

impl BidId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Value owed for `weight` units at `unit_cost` each.
///
/// Returns `None` on overflow.
pub fn cost_of(weight: u32, unit_cost: U256) -> Option<U256> {
    unit_cost.checked_mul(U256::from(weight))
}

/// Per-bid outcome computed by a ranking policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    /// Prize units the bid is entitled to.
    pub prizes: u32,
    /// Part of the bid's payment that is kept as proceeds. The rest is
    /// refunded.
    pub cost: U256,
}

impl Allocation {
    pub const LOST: Self = Self {
        prizes: 0,
        cost: U256::ZERO,
    };

    pub fn is_winner(&self) -> bool {
        self.prizes > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cost_detects_overflow() {
        assert_eq!(cost_of(3, U256::from(7)), Some(U256::from(21)));
        assert_eq!(cost_of(0, U256::MAX), Some(U256::ZERO));
        assert_eq!(cost_of(2, U256::MAX), None);
    }
}
