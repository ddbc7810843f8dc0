use {
    super::{Network, contracts::OevFeedUpdater, mined},
    crate::domain::{
        chain::{self, Update},
        eth::{Address, Receipt},
    },
    alloy::providers::DynProvider,
    tracing::instrument,
};

/// The OEV feed updater on the target network.
pub struct FeedUpdater {
    contract: OevFeedUpdater::OevFeedUpdaterInstance<DynProvider>,
}

impl FeedUpdater {
    pub fn new(network: &Network, address: Address) -> Self {
        Self {
            contract: OevFeedUpdater::new(address, network.provider.clone()),
        }
    }
}

#[async_trait::async_trait]
impl chain::FeedUpdater for FeedUpdater {
    #[instrument(skip_all, fields(cutoff = update.signed_data_cutoff))]
    async fn pay_bid_and_update(&self, update: &Update) -> Result<Receipt, chain::Error> {
        let params = OevFeedUpdater::PayBidAndUpdateFeeds {
            signedDataTimestampCutoff: update.signed_data_cutoff,
            signature: update.signature.clone(),
            bidAmount: update.amount,
            payOevBidCallbackData: OevFeedUpdater::PayOevBidCallbackData {
                signedDataArray: update.signed_data.clone(),
            },
        };
        let receipt = self
            .contract
            .payBidAndUpdateFeed(params)
            .value(update.amount)
            .send()
            .await?
            .get_receipt()
            .await?;
        mined(receipt)
    }
}
