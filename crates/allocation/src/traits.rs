//! Trait definitions for external system boundaries.
//!
//! The engine never moves prizes or value itself. It asks these
//! collaborators to do so and treats an error as a refused payout.

use {
    crate::primitives::{Address, U256},
    anyhow::Result,
};

/// Hands out prize units (tickets, tokens, NFTs) to winners.
#[cfg_attr(any(test, feature = "test-util"), mockall::automock)]
pub trait PrizeIssuer: Send + Sync {
    /// Issues `units` prize units of the auctioned resource to `recipient`.
    fn issue(&self, recipient: Address, units: u32) -> Result<()>;
}

/// Moves escrowed value out of the engine.
#[cfg_attr(any(test, feature = "test-util"), mockall::automock)]
pub trait ValueTransfer: Send + Sync {
    fn transfer(&self, recipient: Address, amount: U256) -> Result<()>;
}
