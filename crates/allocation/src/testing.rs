//! Helpers shared by the unit tests of this crate.

use {
    crate::{
        auction::{Auction, Collaborators},
        clock::Clock,
        config::{Configuration, Strategy},
        primitives::{Address, Timestamp, U256},
        traits::{PrizeIssuer, ValueTransfer},
    },
    alloy::primitives::address,
    std::sync::{
        Arc,
        Mutex,
        atomic::{AtomicU32, Ordering},
    },
};

pub const START: Timestamp = 1_000;
pub const END: Timestamp = 2_000;
pub const UNIT_COST: U256 = U256::from_limbs([1_000, 0, 0, 0]);
pub const MAX_BIDS: u32 = 3;
pub const OPERATOR: Address = address!("0x00000000000000000000000000000000000000aa");
pub const RECIPIENT: Address = address!("0x00000000000000000000000000000000000000bb");
pub const RESOURCE: Address = address!("0x00000000000000000000000000000000000000cc");

/// Deterministic participant address.
pub fn bidder(i: u64) -> Address {
    let mut bytes = [0x42; 20];
    bytes[12..].copy_from_slice(&i.to_be_bytes());
    Address::from(bytes)
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock(AtomicU32);

impl ManualClock {
    pub fn new(now: Timestamp) -> Self {
        Self(AtomicU32::new(now))
    }

    pub fn set(&self, now: Timestamp) {
        self.0.store(now, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.0.load(Ordering::SeqCst)
    }
}

/// Records every payout instead of performing it.
#[derive(Debug, Default)]
pub struct Payouts {
    pub prizes: Mutex<Vec<(Address, u32)>>,
    pub transfers: Mutex<Vec<(Address, U256)>>,
}

impl Payouts {
    pub fn prizes_of(&self, recipient: Address) -> u32 {
        self.prizes
            .lock()
            .unwrap()
            .iter()
            .filter(|(to, _)| *to == recipient)
            .map(|(_, units)| units)
            .sum()
    }

    pub fn value_to(&self, recipient: Address) -> U256 {
        self.transfers
            .lock()
            .unwrap()
            .iter()
            .filter(|(to, _)| *to == recipient)
            .fold(U256::ZERO, |acc, (_, amount)| acc + *amount)
    }

    pub fn total_value(&self) -> U256 {
        self.transfers
            .lock()
            .unwrap()
            .iter()
            .fold(U256::ZERO, |acc, (_, amount)| acc + *amount)
    }
}

impl PrizeIssuer for Payouts {
    fn issue(&self, recipient: Address, units: u32) -> anyhow::Result<()> {
        self.prizes.lock().unwrap().push((recipient, units));
        Ok(())
    }
}

impl ValueTransfer for Payouts {
    fn transfer(&self, recipient: Address, amount: U256) -> anyhow::Result<()> {
        self.transfers.lock().unwrap().push((recipient, amount));
        Ok(())
    }
}

pub fn config(strategy: Strategy, capacity: u32) -> Configuration {
    Configuration {
        start_time: START,
        end_time: END,
        capacity,
        unit_cost: UNIT_COST,
        max_bids_per_participant: MAX_BIDS,
        recipient: RECIPIENT,
        resource: RESOURCE,
        operator: OPERATOR,
        authority: None,
        strategy,
    }
}

/// An auction in its admission window with recording collaborators.
pub fn auction(strategy: Strategy, capacity: u32) -> (Auction, Arc<ManualClock>, Arc<Payouts>) {
    build(config(strategy, capacity))
}

pub fn build(config: Configuration) -> (Auction, Arc<ManualClock>, Arc<Payouts>) {
    observe::tracing::initialize_reentrant("allocation=debug");
    let clock = Arc::new(ManualClock::new(config.start_time));
    let payouts = Arc::new(Payouts::default());
    let auction = Auction::new(
        &config,
        Collaborators {
            clock: clock.clone(),
            prizes: payouts.clone(),
            value: payouts.clone(),
        },
    );
    (auction, clock, payouts)
}
