//! Balance ledger of the value attached to bids.

use {
    crate::primitives::{Address, U256},
    std::collections::HashMap,
    thiserror::Error,
};

#[derive(Debug, Error, PartialEq, Eq)]
#[error("cannot release {requested}, only {available} is held")]
pub struct InsufficientEscrow {
    pub requested: U256,
    pub available: U256,
}

/// Why value left the escrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    Refund,
    Proceeds,
}

/// Tracks every deposit and every release so that
/// `deposited == held + refunded + swept` always holds.
#[derive(Debug, Default, Clone)]
pub struct Escrow {
    deposits: HashMap<Address, U256>,
    deposited: U256,
    refunded: U256,
    swept: U256,
}

impl Escrow {
    pub fn deposit(&mut self, from: Address, amount: U256) {
        let balance = self.deposits.entry(from).or_default();
        *balance = balance.saturating_add(amount);
        self.deposited = self.deposited.saturating_add(amount);
    }

    /// Total value deposited by `participant`.
    pub fn deposit_of(&self, participant: &Address) -> U256 {
        self.deposits.get(participant).copied().unwrap_or_default()
    }

    pub fn deposited(&self) -> U256 {
        self.deposited
    }

    pub fn refunded(&self) -> U256 {
        self.refunded
    }

    pub fn swept(&self) -> U256 {
        self.swept
    }

    /// Value that has not been paid out yet.
    pub fn held(&self) -> U256 {
        self.deposited - self.refunded - self.swept
    }

    pub fn release(&mut self, kind: Release, amount: U256) -> Result<(), InsufficientEscrow> {
        let available = self.held();
        if amount > available {
            return Err(InsufficientEscrow {
                requested: amount,
                available,
            });
        }
        match kind {
            Release::Refund => self.refunded += amount,
            Release::Proceeds => self.swept += amount,
        }
        Ok(())
    }

    /// Reverts a previous [`Escrow::release`] of the same kind and amount.
    pub fn restore(&mut self, kind: Release, amount: U256) {
        match kind {
            Release::Refund => self.refunded -= amount,
            Release::Proceeds => self.swept -= amount,
        }
    }
}
