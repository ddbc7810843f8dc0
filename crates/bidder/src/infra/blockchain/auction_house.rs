use {
    super::{Network, contracts::OevAuctionHouse, mined},
    crate::domain::{
        bid::{self, ChainStatus},
        chain::{self, Award, Confirmation, OnchainBid, Placement},
        eth::{Address, B256, Bytes, Receipt, TxHash, U256},
    },
    alloy::{
        providers::{DynProvider, Provider},
        rpc::types::{Filter, Log},
        sol_types::SolEvent,
    },
    tracing::instrument,
};

/// The auction house contract on the auction network.
pub struct AuctionHouse {
    network: Network,
    contract: OevAuctionHouse::OevAuctionHouseInstance<DynProvider>,
}

impl AuctionHouse {
    pub fn new(network: Network, address: Address) -> Self {
        let contract = OevAuctionHouse::new(address, network.provider.clone());
        Self { network, contract }
    }

    /// Logs of `E` for the bid emitted in the most recent `lookback` blocks.
    async fn logs<E: SolEvent>(
        &self,
        topic: bid::Topic,
        id: bid::Id,
        lookback: u64,
    ) -> Result<Vec<(E, Log)>, chain::Error> {
        let filter = Filter::new()
            .address(*self.contract.address())
            .event_signature(E::SIGNATURE_HASH)
            .topic2(topic.0)
            .topic3(id.0)
            .from_block(self.network.recent_blocks(lookback).await?);
        self.network
            .provider
            .get_logs(&filter)
            .await?
            .into_iter()
            .map(|log| {
                let event = E::decode_log(&log.inner)
                    .map_err(|err| chain::Error::Decode(err.to_string()))?;
                Ok((event.data, log))
            })
            .collect()
    }
}

fn location(log: &Log) -> Result<(TxHash, u64), chain::Error> {
    match (log.transaction_hash, log.block_number) {
        (Some(tx_hash), Some(block)) => Ok((tx_hash, block)),
        _ => Err(chain::Error::Decode("log of a pending block".to_string())),
    }
}

#[async_trait::async_trait]
impl chain::AuctionHouse for AuctionHouse {
    fn bidder(&self) -> Address {
        self.network.account
    }

    #[instrument(skip_all, fields(topic = %placement.topic))]
    async fn place_bid(&self, placement: &Placement) -> Result<Receipt, chain::Error> {
        let receipt = self
            .contract
            .placeBidWithExpiration(
                placement.topic.0,
                U256::from(placement.chain_id),
                placement.amount,
                placement.details.clone(),
                placement.max_collateral,
                placement.max_protocol_fee,
                placement.expiry,
            )
            .send()
            .await?
            .get_receipt()
            .await?;
        mined(receipt)
    }

    async fn bid(&self, id: bid::Id) -> Result<OnchainBid, chain::Error> {
        let bid = self.contract.bids(id.0).call().await?;
        let status = ChainStatus::from_code(bid.status)
            .ok_or_else(|| chain::Error::Decode(format!("unknown bid status {}", bid.status)))?;
        let chain_id = u64::try_from(bid.chainId)
            .map_err(|_| chain::Error::Decode(format!("chain id {} out of range", bid.chainId)))?;
        Ok(OnchainBid {
            status,
            bidder: bid.bidder,
            amount: bid.bidAmount,
            signed_data_cutoff: bid.signedDataTimestampCutoff,
            chain_id,
            collateral: bid.collateralAmount,
            protocol_fee: bid.protocolFeeAmount,
        })
    }

    async fn find_award(
        &self,
        topic: bid::Topic,
        id: bid::Id,
        lookback: u64,
    ) -> Result<Option<Award>, chain::Error> {
        let Some((event, log)) = self
            .logs::<OevAuctionHouse::AwardedBid>(topic, id, lookback)
            .await?
            .pop()
        else {
            return Ok(None);
        };
        let (tx_hash, block) = location(&log)?;
        Ok(Some(Award {
            signature: event.awardDetails,
            bidder_balance: event.bidderBalance,
            tx_hash,
            block,
        }))
    }

    #[instrument(skip_all, fields(%topic, %update))]
    async fn report_fulfillment(
        &self,
        topic: bid::Topic,
        details_hash: B256,
        update: TxHash,
    ) -> Result<Receipt, chain::Error> {
        let receipt = self
            .contract
            .reportFulfillment(topic.0, details_hash, Bytes::copy_from_slice(update.as_slice()))
            .send()
            .await?
            .get_receipt()
            .await?;
        mined(receipt)
    }

    async fn find_confirmation(
        &self,
        topic: bid::Topic,
        id: bid::Id,
        lookback: u64,
    ) -> Result<Option<Confirmation>, chain::Error> {
        let Some((event, log)) = self
            .logs::<OevAuctionHouse::ConfirmedFulfillment>(topic, id, lookback)
            .await?
            .pop()
        else {
            return Ok(None);
        };
        let (tx_hash, block) = location(&log)?;
        Ok(Some(Confirmation {
            payload: event.payload,
            timestamp: event.timestamp,
            tx_hash,
            block,
        }))
    }
}
