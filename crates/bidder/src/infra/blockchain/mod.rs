//! Access to the auction and the target network.

use {
    crate::domain::{
        chain,
        eth::{Address, ChainId, Receipt},
    },
    alloy::{
        network::{EthereumWallet, ReceiptResponse},
        providers::{DynProvider, Provider, ProviderBuilder},
        rpc::types::TransactionReceipt,
        signers::local::PrivateKeySigner,
    },
    url::Url,
};

mod auction_house;
pub mod contracts;
mod errors;
mod feed_updater;

pub use {auction_house::AuctionHouse, feed_updater::FeedUpdater};

/// A connection to one network, signing transactions with the bidder key.
#[derive(Clone)]
pub struct Network {
    pub provider: DynProvider,
    pub chain_id: ChainId,
    pub account: Address,
}

impl Network {
    pub async fn connect(url: &Url, signer: PrivateKeySigner) -> Result<Self, chain::Error> {
        let account = signer.address();
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(url.clone())
            .erased();
        let chain_id = provider.get_chain_id().await?;
        Ok(Self {
            provider,
            chain_id,
            account,
        })
    }

    /// Block range of the most recent `lookback` blocks.
    async fn recent_blocks(&self, lookback: u64) -> Result<u64, chain::Error> {
        let latest = self.provider.get_block_number().await?;
        Ok(latest.saturating_sub(lookback))
    }
}

/// Turns a mined transaction into a [`Receipt`]. Mined but failed
/// transactions are reverts.
fn mined(receipt: TransactionReceipt) -> Result<Receipt, chain::Error> {
    if !receipt.status() {
        return Err(chain::Error::Revert(format!(
            "transaction {} reverted",
            receipt.transaction_hash
        )));
    }
    let block = receipt.block_number.ok_or_else(|| {
        chain::Error::Decode(format!(
            "receipt of {} has no block number",
            receipt.transaction_hash
        ))
    })?;
    Ok(Receipt {
        tx_hash: receipt.transaction_hash,
        block,
    })
}
