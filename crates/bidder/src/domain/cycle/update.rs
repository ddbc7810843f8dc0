use {
    super::{Kind, clock::Clock},
    crate::{
        domain::{
            bid::Bid,
            chain::{FeedUpdater, Update},
            eth::Receipt,
            quote::Bundle,
        },
        infra::observe,
    },
    std::sync::Arc,
};

/// Uses an award on the target chain: pays the bid and pushes the signed data
/// the award was given for. Whether the signature and data are acceptable is
/// for the feed updater contract to decide.
pub struct UpdateSubmitter {
    updater: Arc<dyn FeedUpdater>,
}

impl UpdateSubmitter {
    pub fn new(updater: Arc<dyn FeedUpdater>) -> Self {
        Self { updater }
    }

    pub async fn submit(
        &self,
        bid: &mut Bid,
        quotes: &Bundle,
        clock: &Clock,
    ) -> Result<Receipt, Kind> {
        let Some(signature) = bid.award().cloned() else {
            return Err(Kind::InvalidBid("bid has no award"));
        };
        let now = clock.now();
        if now >= bid.expiry() {
            bid.mark_lost();
            return Err(Kind::TimingMiss {
                expiry: bid.expiry(),
                now,
            });
        }
        let update = Update {
            signed_data_cutoff: bid.window.signed_data_cutoff,
            signature,
            amount: bid.amount,
            signed_data: quotes.encoded().to_vec(),
        };
        let receipt = self.updater.pay_bid_and_update(&update).await?;
        observe::feed_updated(bid, &receipt);
        Ok(receipt)
    }
}
