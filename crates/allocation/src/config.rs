use {
    crate::{
        primitives::{Address, B256, Timestamp, U256},
        ranking::{ArrivalCutoff, BoundedHeap, RankingPolicy, WeightedLottery, WinRule},
    },
    anyhow::{anyhow, ensure},
    serde::{Deserialize, Serialize},
    std::path::Path,
};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Configuration {
    /// First second at which bids are admitted.
    pub start_time: Timestamp,
    /// First second at which bids are no longer admitted and settlement
    /// opens.
    pub end_time: Timestamp,
    /// Number of prize units on offer.
    pub capacity: u32,
    /// Value owed per unit of bid weight.
    pub unit_cost: U256,
    pub max_bids_per_participant: u32,
    /// Receives the proceeds.
    pub recipient: Address,
    /// The auctioned resource.
    pub resource: Address,
    pub operator: Address,
    /// Makes every bid require a token signed by this authority.
    #[serde(default)]
    pub authority: Option<AuthorityConfig>,
    pub strategy: Strategy,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct AuthorityConfig {
    pub signer: Address,
    /// Chain the tokens are issued for.
    pub chain_id: u64,
    /// Instance the tokens are issued for.
    pub verifying_contract: Address,
}

/// How winners are chosen.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// The highest priced bids win and all pay the lowest winning price.
    #[serde(rename_all = "kebab-case")]
    BoundedHeap {
        /// Minimum bid price.
        #[serde(default)]
        reserve_price: u32,
    },
    /// The earliest bids win at a fixed price.
    ArrivalCutoff,
    /// Share weighted random draw.
    #[serde(rename_all = "kebab-case")]
    WeightedLottery {
        /// `keccak256` of the seed revealed after admission closed.
        seed_commitment: B256,
        #[serde(default)]
        win_rule: WinRule,
    },
}

impl Strategy {
    pub fn build(&self, capacity: u32, unit_cost: U256) -> Box<dyn RankingPolicy> {
        match self {
            Self::BoundedHeap { reserve_price } => {
                Box::new(BoundedHeap::new(capacity, *reserve_price, unit_cost))
            }
            Self::ArrivalCutoff => Box::new(ArrivalCutoff::new(unit_cost)),
            Self::WeightedLottery {
                seed_commitment,
                win_rule,
            } => Box::new(WeightedLottery::new(*seed_commitment, unit_cost, *win_rule)),
        }
    }
}

impl Configuration {
    pub async fn from_path<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        match toml::from_str(&tokio::fs::read_to_string(&path).await?) {
            Ok(self_) => Ok(self_),
            Err(err) if std::env::var("TOML_TRACE_ERROR").is_ok_and(|v| v == "1") => Err(anyhow!(
                "failed to parse TOML config at {}: {err:#?}",
                path.as_ref().display()
            )),
            Err(_) => Err(anyhow!(
                "failed to parse TOML config at: {}. Set TOML_TRACE_ERROR=1 to print parsing \
                 error but this may leak secrets.",
                path.as_ref().display()
            )),
        }
    }

    pub fn validate(self) -> anyhow::Result<Self> {
        ensure!(
            self.start_time < self.end_time,
            "start-time must lie before end-time"
        );
        ensure!(
            self.max_bids_per_participant > 0,
            "max-bids-per-participant must be positive"
        );
        ensure!(!self.unit_cost.is_zero(), "unit-cost must be positive");
        Ok(self)
    }
}
