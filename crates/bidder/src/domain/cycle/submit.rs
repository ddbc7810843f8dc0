use {
    super::Kind,
    crate::{
        domain::{
            bid::{Bid, Status},
            chain::{AuctionHouse, Placement},
            eth::{ChainId, Receipt, U256},
        },
        infra::observe,
    },
    std::sync::Arc,
};

/// Ceilings on what the auction house may lock or charge for a bid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
    pub max_collateral: U256,
    pub max_protocol_fee: U256,
}

pub struct BidSubmitter {
    house: Arc<dyn AuctionHouse>,
    policy: Policy,
}

impl BidSubmitter {
    pub fn new(house: Arc<dyn AuctionHouse>, policy: Policy) -> Self {
        Self { house, policy }
    }

    /// Places the bid for an update on `target_chain`. A bid is placed at
    /// most once; a rejection is final since the same bid id would collide.
    pub async fn submit(&self, bid: &mut Bid, target_chain: ChainId) -> Result<Receipt, Kind> {
        if bid.amount.is_zero() {
            return Err(Kind::InvalidBid("amount must be positive"));
        }
        if bid.status() != Status::Unannounced {
            return Err(Kind::InvalidBid("bid was already placed"));
        }
        let placement = Placement {
            topic: bid.topic,
            chain_id: target_chain,
            amount: bid.amount,
            details: bid.details.encoded().clone(),
            max_collateral: self.policy.max_collateral,
            max_protocol_fee: self.policy.max_protocol_fee,
            expiry: bid.expiry(),
        };
        let receipt = self.house.place_bid(&placement).await?;
        bid.mark_placed();
        observe::bid_placed(bid, &receipt);
        Ok(receipt)
    }
}
