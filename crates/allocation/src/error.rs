use {
    crate::{
        escrow::InsufficientEscrow,
        primitives::{Address, Timestamp},
    },
    thiserror::Error,
};

/// Reasons an operation on an auction gets rejected.
///
/// A rejected operation never leaves partial state behind: all checks run
/// before anything is written.
#[derive(Debug, Error)]
pub enum Error {
    #[error("admission opens at {start}, now is {now}")]
    AdmissionNotYetOpen { start: Timestamp, now: Timestamp },
    #[error("admission closed at {end}, now is {now}")]
    AdmissionWindowClosed { end: Timestamp, now: Timestamp },
    #[error("invalid or expired authorization: {0}")]
    InvalidOrExpiredAuthorization(#[from] AuthorizationError),
    #[error("participant already placed the maximum of {limit} bids")]
    PerParticipantLimitExceeded { limit: u32 },
    #[error("attached payment does not match the declared weight")]
    PaymentMismatch,
    #[error("bid weight {0} is not accepted by this auction")]
    InvalidWeight(u32),
    #[error("bid price {price} is below the reserve price {reserve}")]
    BelowReservePrice { price: u32, reserve: u32 },
    #[error("settlement opens at {end}, now is {now}")]
    SettlementNotYetOpen { end: Timestamp, now: Timestamp },
    #[error("settlement already started")]
    SettlementAlreadyStarted,
    #[error("{0} already claimed")]
    AlreadyClaimed(Address),
    #[error("{0} has no bids")]
    UnknownParticipant(Address),
    #[error("capacity can only decrease, current is {current}, requested {requested}")]
    CapacityIncreaseRejected { current: u32, requested: u32 },
    #[error("end time already passed")]
    EndTimeAlreadyPassed,
    #[error("end time {0} must lie in the future and after the start time")]
    InvalidEndTime(Timestamp),
    #[error("{0} is not allowed to perform this operation")]
    Unauthorized(Address),
    #[error("this auction does not use a lottery seed")]
    NoSeedCommitted,
    #[error("the lottery seed has not been revealed yet")]
    SeedNotRevealed,
    #[error("the lottery seed was already revealed")]
    SeedAlreadyRevealed,
    #[error("revealed seed does not match the commitment")]
    SeedMismatch,
    #[error(transparent)]
    InsufficientEscrow(#[from] InsufficientEscrow),
    #[error("payout failed")]
    Transfer(#[source] anyhow::Error),
}

/// Why an authorization token was refused.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthorizationError {
    #[error("missing authorization token")]
    Missing,
    #[error("unable to recover signer: {0}")]
    UnableToRecoverSigner(String),
    #[error("signed by unexpected signer {0}")]
    UnexpectedSigner(Address),
    #[error("token expired at {expiry}")]
    Expired { expiry: Timestamp },
    #[error("token was issued for a different bidder or price")]
    BidMismatch,
    #[error("bucket {bucket} allows {limit}, already used {used}")]
    BucketExceeded { bucket: u32, limit: u32, used: u32 },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
