//! Withdrawal of the winning proceeds to the configured recipient.

use {
    crate::{
        auction::Auction,
        error::{Error, Result},
        escrow::Release,
        primitives::{Address, U256},
    },
};

impl Auction {
    /// Sends the proceeds not swept yet to the recipient and returns the
    /// amount sent. Repeated calls only send what accrued in between, which
    /// is nothing once the winner set is frozen.
    pub fn sweep_proceeds(&mut self, caller: Address) -> Result<U256> {
        self.ensure_operator(caller)?;
        self.ensure_settlement_open()?;
        self.freeze()?;
        let proceeds = self
            .winners
            .as_deref()
            .expect("winner set was frozen above")
            .proceeds(&self.ledger);
        self.settlement_started = true;

        let amount = proceeds.saturating_sub(self.escrow.swept());
        if amount.is_zero() {
            tracing::debug!(%proceeds, "nothing left to sweep");
            return Ok(U256::ZERO);
        }

        self.escrow.release(Release::Proceeds, amount)?;
        let recipient = self.state.recipient;
        if let Err(err) = self.collaborators.value.transfer(recipient, amount) {
            self.escrow.restore(Release::Proceeds, amount);
            tracing::warn!(?recipient, %amount, ?err, "sweep failed");
            return Err(Error::Transfer(err));
        }
        tracing::info!(?recipient, %amount, total = %self.escrow.swept(), "swept proceeds");
        Ok(amount)
    }
}
