//! One auction instance: its configuration, its phase and the operator
//! controls.
//!
//! The auction moves through three phases driven purely by the clock:
//! `Pending` until `start_time`, `Admission` until `end_time` and
//! `Settlement` from then on. Capacity is locked as soon as the admission
//! window closed, so previews and claims always see the same winner set.
//! Settlement counts as *started* once the first claim, sweep or seed reveal
//! moved anything.

use {
    crate::{
        admission::{AdmissionControl, BidRequest},
        authorization::Authority,
        bid::BidLedger,
        clock::Clock,
        config::Configuration,
        error::{Error, Result},
        escrow::Escrow,
        primitives::{Address, B256, BidId, Timestamp, U256},
        ranking::{RankingPolicy, WinnerPredicate},
        settlement::{ClaimInfo, ClaimRecord, UserBid},
        traits::{PrizeIssuer, ValueTransfer},
    },
    std::{
        collections::HashMap,
        ops::Deref,
        sync::{Arc, Mutex},
    },
};

/// Parameters of an auction that the operator may still adjust.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuctionState {
    pub start_time: Timestamp,
    /// Can be moved to another future time until it passed.
    pub end_time: Timestamp,
    /// Number of prize units. Never increases.
    pub capacity: u32,
    /// Receives the swept proceeds.
    pub recipient: Address,
    /// The auctioned resource.
    pub resource: Address,
    /// The only account allowed to adjust the auction and sweep proceeds.
    pub operator: Address,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Pending,
    Admission,
    Settlement,
}

/// External systems an auction talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub clock: Arc<dyn Clock>,
    pub prizes: Arc<dyn PrizeIssuer>,
    pub value: Arc<dyn ValueTransfer>,
}

pub struct Auction {
    pub(crate) state: AuctionState,
    pub(crate) admission: AdmissionControl,
    pub(crate) ledger: BidLedger,
    pub(crate) policy: Box<dyn RankingPolicy>,
    /// Winner set frozen by the first settling operation.
    pub(crate) winners: Option<Box<dyn WinnerPredicate>>,
    pub(crate) claims: HashMap<Address, ClaimRecord>,
    /// Claims whose prizes went out but whose refund is still owed.
    pub(crate) pending: HashMap<Address, ClaimRecord>,
    pub(crate) escrow: Escrow,
    pub(crate) settlement_started: bool,
    pub(crate) collaborators: Collaborators,
}

impl Auction {
    pub fn new(config: &Configuration, collaborators: Collaborators) -> Self {
        let authority = config.authority.as_ref().map(|authority| {
            Authority::new(
                authority.signer,
                authority.chain_id,
                authority.verifying_contract,
            )
        });
        let policy = config.strategy.build(config.capacity, config.unit_cost);
        tracing::info!(
            strategy = policy.name(),
            start = config.start_time,
            end = config.end_time,
            capacity = config.capacity,
            gated = authority.is_some(),
            "created auction"
        );
        Self {
            state: AuctionState {
                start_time: config.start_time,
                end_time: config.end_time,
                capacity: config.capacity,
                recipient: config.recipient,
                resource: config.resource,
                operator: config.operator,
            },
            admission: AdmissionControl::new(
                authority,
                config.unit_cost,
                config.max_bids_per_participant,
            ),
            ledger: BidLedger::default(),
            policy,
            winners: None,
            claims: HashMap::new(),
            pending: HashMap::new(),
            escrow: Escrow::default(),
            settlement_started: false,
            collaborators,
        }
    }

    pub fn now(&self) -> Timestamp {
        self.collaborators.clock.now()
    }

    pub fn phase(&self) -> Phase {
        let now = self.now();
        if now < self.state.start_time {
            Phase::Pending
        } else if now < self.state.end_time {
            Phase::Admission
        } else {
            Phase::Settlement
        }
    }

    pub fn state(&self) -> &AuctionState {
        &self.state
    }

    pub fn ledger(&self) -> &BidLedger {
        &self.ledger
    }

    pub fn escrow(&self) -> &Escrow {
        &self.escrow
    }

    pub fn settlement_started(&self) -> bool {
        self.settlement_started
    }

    /// Current clearing price per prize unit.
    pub fn floor_price(&self) -> U256 {
        match &self.winners {
            Some(winners) => winners.floor_price(),
            None => self.policy.floor_price(),
        }
    }

    /// Value currently held for participants and the recipient.
    pub fn total_escrowed(&self) -> U256 {
        self.escrow.held()
    }

    /// Proceeds already sent to the recipient.
    pub fn swept(&self) -> U256 {
        self.escrow.swept()
    }

    /// Ids of the bids that would win if the auction settled now.
    pub fn winning_bids(&self) -> Result<Vec<BidId>> {
        let winners = self.winner_set()?;
        Ok(self
            .ledger
            .iter()
            .filter(|bid| winners.allocation(bid).is_winner())
            .map(|bid| bid.id)
            .collect())
    }

    /// Shrinks the number of prize units. Only possible while the admission
    /// window is open.
    pub fn set_capacity(&mut self, caller: Address, capacity: u32) -> Result<()> {
        self.ensure_operator(caller)?;
        if self.now() >= self.state.end_time {
            return Err(Error::SettlementAlreadyStarted);
        }
        if capacity > self.state.capacity {
            return Err(Error::CapacityIncreaseRejected {
                current: self.state.capacity,
                requested: capacity,
            });
        }
        tracing::info!(from = self.state.capacity, to = capacity, "reduced capacity");
        self.state.capacity = capacity;
        self.policy.reduce_capacity(capacity);
        self.winners = None;
        Ok(())
    }

    /// Moves the end of the admission window while it is still open.
    pub fn set_end_time(&mut self, caller: Address, end_time: Timestamp) -> Result<()> {
        self.ensure_operator(caller)?;
        let now = self.now();
        if now >= self.state.end_time {
            return Err(Error::EndTimeAlreadyPassed);
        }
        if end_time <= now || end_time <= self.state.start_time {
            return Err(Error::InvalidEndTime(end_time));
        }
        tracing::info!(from = self.state.end_time, to = end_time, "moved end time");
        self.state.end_time = end_time;
        Ok(())
    }

    /// Reveals the lottery seed committed to in the configuration. Fixes the
    /// winning window and starts settlement.
    pub fn reveal_seed(&mut self, caller: Address, seed: B256) -> Result<()> {
        self.ensure_operator(caller)?;
        self.ensure_settlement_open()?;
        self.policy
            .reveal_seed(seed, &self.ledger, self.state.capacity)?;
        self.winners = None;
        self.settlement_started = true;
        Ok(())
    }

    pub(crate) fn ensure_operator(&self, caller: Address) -> Result<()> {
        if caller != self.state.operator {
            return Err(Error::Unauthorized(caller));
        }
        Ok(())
    }

    pub(crate) fn ensure_settlement_open(&self) -> Result<()> {
        let now = self.now();
        if now < self.state.end_time {
            return Err(Error::SettlementNotYetOpen {
                end: self.state.end_time,
                now,
            });
        }
        Ok(())
    }

    /// Computes and caches the winner set used by all settling operations.
    pub(crate) fn freeze(&mut self) -> Result<()> {
        if self.winners.is_none() {
            let winners = self
                .policy
                .compute_winners(&self.ledger, self.state.capacity)?;
            tracing::debug!(
                strategy = self.policy.name(),
                floor = %winners.floor_price(),
                "froze winner set"
            );
            self.winners = Some(winners);
        }
        Ok(())
    }

    /// The frozen winner set if there is one, a freshly computed one
    /// otherwise.
    pub(crate) fn winner_set(&self) -> Result<Frozen<'_>> {
        match &self.winners {
            Some(winners) => Ok(Frozen::Cached(winners.as_ref())),
            None => Ok(Frozen::Fresh(
                self.policy
                    .compute_winners(&self.ledger, self.state.capacity)?,
            )),
        }
    }
}

pub(crate) enum Frozen<'a> {
    Cached(&'a (dyn WinnerPredicate + 'static)),
    Fresh(Box<dyn WinnerPredicate>),
}

impl Deref for Frozen<'_> {
    type Target = dyn WinnerPredicate;

    fn deref(&self) -> &Self::Target {
        match self {
            Frozen::Cached(winners) => *winners,
            Frozen::Fresh(winners) => winners.as_ref(),
        }
    }
}

/// Thread safe handle to an [`Auction`].
///
/// Every operation holds the lock for its whole duration, so admissions are
/// applied in a single total order and a participant's claim check and
/// claim write can never interleave with another claim.
#[derive(Clone)]
pub struct SharedAuction(Arc<Mutex<Auction>>);

impl SharedAuction {
    pub fn new(auction: Auction) -> Self {
        Self(Arc::new(Mutex::new(auction)))
    }

    /// Runs `f` with exclusive access to the auction.
    pub fn with<R>(&self, f: impl FnOnce(&mut Auction) -> R) -> R {
        f(&mut self.0.lock().unwrap())
    }

    pub fn submit_bid(&self, request: BidRequest) -> Result<BidId> {
        self.with(|auction| auction.submit_bid(request))
    }

    pub fn claim(&self, bidder: Address) -> Result<ClaimRecord> {
        self.with(|auction| auction.claim(bidder))
    }

    pub fn get_claim_info(&self, bidders: &[Address]) -> Result<Vec<ClaimInfo>> {
        self.with(|auction| auction.get_claim_info(bidders))
    }

    pub fn get_user_bids(&self, bidder: Address) -> Result<Vec<UserBid>> {
        self.with(|auction| auction.get_user_bids(bidder))
    }

    pub fn set_capacity(&self, caller: Address, capacity: u32) -> Result<()> {
        self.with(|auction| auction.set_capacity(caller, capacity))
    }

    pub fn set_end_time(&self, caller: Address, end_time: Timestamp) -> Result<()> {
        self.with(|auction| auction.set_end_time(caller, end_time))
    }

    pub fn reveal_seed(&self, caller: Address, seed: B256) -> Result<()> {
        self.with(|auction| auction.reveal_seed(caller, seed))
    }

    pub fn sweep_proceeds(&self, caller: Address) -> Result<U256> {
        self.with(|auction| auction.sweep_proceeds(caller))
    }

    pub fn floor_price(&self) -> U256 {
        self.with(|auction| auction.floor_price())
    }

    pub fn phase(&self) -> Phase {
        self.with(|auction| auction.phase())
    }
}
