//! Capacity bounded allocation of prize units.
//!
//! Participants submit bids while an auction's admission window is open.
//! A pluggable [`ranking::RankingPolicy`] decides which bids win, and after
//! the window closed every participant claims their prizes and refund exactly
//! once while the operator sweeps the winning payments to the recipient.

pub mod admission;
pub mod auction;
pub mod authorization;
pub mod bid;
pub mod clock;
pub mod config;
pub mod error;
pub mod escrow;
pub mod primitives;
pub mod ranking;
pub mod settlement;
pub mod traits;
pub mod treasury;

#[cfg(test)]
mod testing;

pub use {
    admission::BidRequest,
    auction::{Auction, AuctionState, Collaborators, Phase, SharedAuction},
    authorization::{Authority, AuthorizationToken},
    config::{Configuration, Strategy},
    error::{AuthorizationError, Error, Result},
    primitives::{Address, Allocation, B256, BidId, Timestamp, U256},
    settlement::{ClaimInfo, ClaimRecord, UserBid},
};
