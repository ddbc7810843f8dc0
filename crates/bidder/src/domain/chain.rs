//! The contracts a bid cycle talks to, as seen from the domain.

use super::{
    bid,
    eth::{Address, B256, Bytes, ChainId, Receipt, Timestamp, TxHash, U256},
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The node failed to answer. Retrying later may succeed.
    #[error("node error: {0}")]
    Node(String),
    /// The contract rejected the call or the transaction reverted.
    #[error("rejected by contract: {0}")]
    Revert(String),
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl Error {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Node(_))
    }
}

/// Arguments of `placeBidWithExpiration`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub topic: bid::Topic,
    pub chain_id: ChainId,
    pub amount: U256,
    pub details: Bytes,
    pub max_collateral: U256,
    pub max_protocol_fee: U256,
    pub expiry: Timestamp,
}

/// A bid as stored by the auction house.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnchainBid {
    pub status: bid::ChainStatus,
    pub bidder: Address,
    pub amount: U256,
    pub signed_data_cutoff: Timestamp,
    pub chain_id: ChainId,
    pub collateral: U256,
    pub protocol_fee: U256,
}

/// An `AwardedBid` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Award {
    /// Signature of the auctioneer that the feed updater verifies.
    pub signature: Bytes,
    pub bidder_balance: U256,
    pub tx_hash: TxHash,
    pub block: u64,
}

/// A `ConfirmedFulfillment` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub payload: Bytes,
    pub timestamp: Timestamp,
    pub tx_hash: TxHash,
    pub block: u64,
}

/// The auction house contract on the auction chain, operated by the bidder
/// account.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait AuctionHouse: Send + Sync {
    /// Account that places the bids.
    fn bidder(&self) -> Address;

    /// Places a bid and waits for the transaction to be mined.
    async fn place_bid(&self, placement: &Placement) -> Result<Receipt, Error>;

    async fn bid(&self, id: bid::Id) -> Result<OnchainBid, Error>;

    /// Looks for the award of a bid in the most recent `lookback` blocks.
    async fn find_award(
        &self,
        topic: bid::Topic,
        id: bid::Id,
        lookback: u64,
    ) -> Result<Option<Award>, Error>;

    /// Reports the transaction that used an award and waits for the report
    /// to be mined.
    async fn report_fulfillment(
        &self,
        topic: bid::Topic,
        details_hash: B256,
        update: TxHash,
    ) -> Result<Receipt, Error>;

    /// Looks for the confirmation of a reported fulfillment in the most
    /// recent `lookback` blocks.
    async fn find_confirmation(
        &self,
        topic: bid::Topic,
        id: bid::Id,
        lookback: u64,
    ) -> Result<Option<Confirmation>, Error>;
}

/// Arguments of `payBidAndUpdateFeed`. The bid amount is also the value sent
/// with the transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update {
    pub signed_data_cutoff: Timestamp,
    pub signature: Bytes,
    pub amount: U256,
    pub signed_data: Vec<Bytes>,
}

/// The OEV feed updater contract on the target chain.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait FeedUpdater: Send + Sync {
    /// Pays the bid and updates the feed, waiting for the transaction to be
    /// mined.
    async fn pay_bid_and_update(&self, update: &Update) -> Result<Receipt, Error>;
}
