//! Off-chain issued permissions to place a bid.
//!
//! An authority signs an EIP-712 struct binding the bidder, the bid price and
//! a bucket allowance. The domain separator binds the token to one chain and
//! one auction instance so it cannot be replayed elsewhere.

use {
    crate::{
        error::AuthorizationError,
        primitives::{Address, B256, Timestamp, U256},
    },
    alloy::{
        primitives::Signature,
        sol,
        sol_types::{Eip712Domain, SolStruct},
    },
    std::borrow::Cow,
};

sol! {
    /// The struct that gets signed by the authority.
    struct BidAuthorization {
        address bidder;
        uint32 price;
        uint32 bucketId;
        uint32 bucketLimit;
        uint32 expiry;
    }
}

const DOMAIN_NAME: &str = "AllocationAuction";
const DOMAIN_VERSION: &str = "1";

/// A signed permission admitting a specific bid under a bucket allowance.
///
/// Tokens are never stored. Reuse is bounded by the expiry and by the bucket
/// allowance every admitted bid consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationToken {
    pub bidder: Address,
    pub price: u32,
    pub bucket_id: u32,
    /// Maximum cumulative weight the bidder may place under `bucket_id`.
    pub bucket_limit: u32,
    pub expiry: Timestamp,
    pub signature: Signature,
}

impl AuthorizationToken {
    fn signed_struct(&self) -> BidAuthorization {
        BidAuthorization {
            bidder: self.bidder,
            price: self.price,
            bucketId: self.bucket_id,
            bucketLimit: self.bucket_limit,
            expiry: self.expiry,
        }
    }
}

/// The key whose signatures admit bids, plus the domain it signs for.
#[derive(Debug, Clone)]
pub struct Authority {
    signer: Address,
    domain: Eip712Domain,
}

impl Authority {
    pub fn new(signer: Address, chain_id: u64, verifying_contract: Address) -> Self {
        Self {
            signer,
            domain: Eip712Domain::new(
                Some(Cow::Borrowed(DOMAIN_NAME)),
                Some(Cow::Borrowed(DOMAIN_VERSION)),
                Some(U256::from(chain_id)),
                Some(verifying_contract),
                None,
            ),
        }
    }

    pub fn signer(&self) -> Address {
        self.signer
    }

    /// The digest the authority has to sign for `token`. The signature field
    /// of `token` is ignored.
    pub fn signing_hash(&self, token: &AuthorizationToken) -> B256 {
        token.signed_struct().eip712_signing_hash(&self.domain)
    }

    /// Checks that `token` was issued by this authority for exactly this bid
    /// and is still valid at `now`. Bucket allowances are tracked by the
    /// caller.
    pub fn verify(
        &self,
        token: &AuthorizationToken,
        bidder: Address,
        price: u32,
        now: Timestamp,
    ) -> Result<(), AuthorizationError> {
        let recovered = token
            .signature
            .recover_address_from_prehash(&self.signing_hash(token))
            .map_err(|err| AuthorizationError::UnableToRecoverSigner(err.to_string()))?;
        if recovered != self.signer {
            return Err(AuthorizationError::UnexpectedSigner(recovered));
        }
        if now > token.expiry {
            return Err(AuthorizationError::Expired {
                expiry: token.expiry,
            });
        }
        if token.bidder != bidder || token.price != price {
            return Err(AuthorizationError::BidMismatch);
        }
        Ok(())
    }
}
