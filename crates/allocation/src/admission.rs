//! Gatekeeping of incoming bids.
//!
//! Checks run in a fixed order and all of them finish before the ledger,
//! the ranking policy or the escrow are touched:
//! 1. the admission window is open
//! 2. the authorization token is valid and the bucket allowance suffices
//!    (only for auctions with an authority)
//! 3. the participant is below the per participant bid limit
//! 4. the attached payment matches the declared weight
//! 5. the ranking policy accepts the weight

use {
    crate::{
        auction::{Auction, AuctionState},
        authorization::{Authority, AuthorizationToken},
        bid::BidLedger,
        error::{AuthorizationError, Error, Result},
        primitives::{Address, BidId, Timestamp, U256, cost_of},
        ranking::RankingPolicy,
    },
    std::collections::HashMap,
};

/// A bid as submitted by a participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BidRequest {
    pub bidder: Address,
    /// Price for price ranked auctions, share count for lotteries and 1 for
    /// fixed price raffles.
    pub weight: u32,
    pub payment: U256,
    pub authorization: Option<AuthorizationToken>,
}

impl BidRequest {
    pub fn new(bidder: Address, weight: u32, payment: U256) -> Self {
        Self {
            bidder,
            weight,
            payment,
            authorization: None,
        }
    }

    pub fn with_authorization(mut self, token: AuthorizationToken) -> Self {
        self.authorization = Some(token);
        self
    }
}

type BucketKey = (Address, u32);

#[derive(Debug)]
pub struct AdmissionControl {
    authority: Option<Authority>,
    unit_cost: U256,
    max_bids_per_participant: u32,
    /// Weight admitted so far per participant and bucket.
    bucket_usage: HashMap<BucketKey, u32>,
}

impl AdmissionControl {
    pub fn new(authority: Option<Authority>, unit_cost: U256, max_bids_per_participant: u32) -> Self {
        Self {
            authority,
            unit_cost,
            max_bids_per_participant,
            bucket_usage: HashMap::new(),
        }
    }

    pub fn unit_cost(&self) -> U256 {
        self.unit_cost
    }

    /// Weight `bidder` already placed under `bucket`.
    pub fn bucket_usage(&self, bidder: Address, bucket: u32) -> u32 {
        self.bucket_usage
            .get(&(bidder, bucket))
            .copied()
            .unwrap_or_default()
    }

    /// Runs every check without changing anything. Returns the bucket the
    /// bid has to be charged to.
    fn check(
        &self,
        request: &BidRequest,
        state: &AuctionState,
        ledger: &BidLedger,
        policy: &dyn RankingPolicy,
        now: Timestamp,
    ) -> Result<Option<BucketKey>> {
        if now < state.start_time {
            return Err(Error::AdmissionNotYetOpen {
                start: state.start_time,
                now,
            });
        }
        if now >= state.end_time {
            return Err(Error::AdmissionWindowClosed {
                end: state.end_time,
                now,
            });
        }

        let bucket = match &self.authority {
            Some(authority) => {
                let token = request
                    .authorization
                    .as_ref()
                    .ok_or(AuthorizationError::Missing)?;
                authority.verify(token, request.bidder, request.weight, now)?;
                let key = (request.bidder, token.bucket_id);
                let used = self.bucket_usage.get(&key).copied().unwrap_or_default();
                if u64::from(used) + u64::from(request.weight) > u64::from(token.bucket_limit) {
                    return Err(AuthorizationError::BucketExceeded {
                        bucket: token.bucket_id,
                        limit: token.bucket_limit,
                        used,
                    }
                    .into());
                }
                Some(key)
            }
            None => None,
        };

        if ledger.bid_count(&request.bidder) >= self.max_bids_per_participant as usize {
            return Err(Error::PerParticipantLimitExceeded {
                limit: self.max_bids_per_participant,
            });
        }

        if cost_of(request.weight, self.unit_cost) != Some(request.payment) {
            return Err(Error::PaymentMismatch);
        }

        policy.validate(request.weight)?;

        Ok(bucket)
    }

    fn charge(&mut self, bucket: Option<BucketKey>, weight: u32) {
        if let Some(key) = bucket {
            *self.bucket_usage.entry(key).or_default() += weight;
        }
    }
}

impl Auction {
    /// Admits a bid, escrows its payment and hands it to the ranking policy.
    pub fn submit_bid(&mut self, request: BidRequest) -> Result<BidId> {
        let now = self.now();
        let bucket = self
            .admission
            .check(
                &request,
                &self.state,
                &self.ledger,
                self.policy.as_ref(),
                now,
            )
            .inspect_err(|err| {
                tracing::debug!(bidder = ?request.bidder, weight = request.weight, ?err, "rejected bid");
            })?;

        let id = self
            .ledger
            .append(request.bidder, now, request.weight, request.payment);
        let bid = self
            .ledger
            .get(id)
            .expect("bid was appended right before");
        self.policy.admit(bid);
        self.escrow.deposit(request.bidder, request.payment);
        self.admission.charge(bucket, request.weight);

        tracing::info!(
            bid = %id,
            bidder = ?request.bidder,
            weight = request.weight,
            payment = %request.payment,
            floor = %self.policy.floor_price(),
            "admitted bid"
        );
        Ok(id)
    }
}
