//! Quotes from the signed APIs of the data feed's sources.
//!
//! Sources and their templates are looked up in the on-chain registries of
//! the target network. Every source signs an OEV variant of its template
//! whose id is the hash of the regular template id.

use {
    crate::{
        domain::{
            chain,
            eth::{Address, B256, keccak256},
            quote::{self, Bundle, Observation},
        },
        infra::{
            blockchain::{
                Network,
                contracts::{AirseekerRegistry, Api3ServerV1},
            },
            observe,
        },
    },
    alloy::sol_types::SolValue,
    reqwest::Client,
    std::time::Duration,
    url::Url,
};

mod dto;

pub struct Config {
    pub base_url: Url,
    pub dapi_name: String,
    pub api3_server: Address,
    pub airseeker_registry: Address,
    pub timeout: Duration,
}

pub struct SignedApi {
    client: Client,
    base_url: Url,
    dapi_name: String,
    api3_server: Api3ServerV1::Api3ServerV1Instance<alloy::providers::DynProvider>,
    registry: AirseekerRegistry::AirseekerRegistryInstance<alloy::providers::DynProvider>,
}

impl SignedApi {
    pub fn new(config: Config, target: &Network) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            base_url: config.base_url,
            dapi_name: config.dapi_name,
            api3_server: Api3ServerV1::new(config.api3_server, target.provider.clone()),
            registry: AirseekerRegistry::new(config.airseeker_registry, target.provider.clone()),
        })
    }

    /// The sources of the feed and the template each of them signs.
    async fn sources(&self) -> Result<Vec<(Address, B256)>, quote::Error> {
        let name = dapi_name(&self.dapi_name)?;
        let feed = self
            .api3_server
            .dapiNameHashToDataFeedId(keccak256(name))
            .call()
            .await
            .map_err(chain::Error::from)?;
        if feed.is_zero() {
            return Err(quote::Error::UnknownFeed(self.dapi_name.clone()));
        }
        let details = self
            .registry
            .dataFeedIdToDetails(feed)
            .call()
            .await
            .map_err(chain::Error::from)?;
        decode_details(&details)
    }

    /// The latest OEV signed data of `airnode` for `template_id`, if any.
    async fn observe(
        &self,
        airnode: Address,
        template_id: B256,
    ) -> anyhow::Result<Option<Observation>> {
        let url = self.base_url.join(&airnode.to_string())?;
        let response: dto::Response = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(latest(airnode, template_id, response))
    }
}

#[async_trait::async_trait]
impl quote::QuoteProvider for SignedApi {
    async fn fetch(&self) -> Result<Bundle, quote::Error> {
        let sources = self.sources().await?;
        let observations = futures::future::join_all(
            sources
                .iter()
                .map(|(airnode, template_id)| self.observe(*airnode, *template_id)),
        )
        .await;
        let observations = sources
            .iter()
            .zip(observations)
            .filter_map(|((airnode, _), result)| {
                result
                    .inspect_err(|err| observe::source_failed(airnode, err))
                    .ok()
                    .flatten()
            })
            .collect();
        Ok(Bundle::new(observations))
    }
}

/// The name right padded to 32 bytes.
fn dapi_name(name: &str) -> Result<B256, quote::Error> {
    if name.len() > 32 {
        return Err(quote::Error::FeedName(name.to_string()));
    }
    let mut padded = B256::ZERO;
    padded[..name.len()].copy_from_slice(name.as_bytes());
    Ok(padded)
}

/// Feed details are `abi.encode(address, bytes32)` for a feed with a single
/// source and `abi.encode(address[], bytes32[])` otherwise.
fn decode_details(details: &[u8]) -> Result<Vec<(Address, B256)>, quote::Error> {
    let malformed = |err: alloy::sol_types::Error| quote::Error::FeedDetails(err.to_string());
    if details.len() == 64 {
        let source = <(Address, B256)>::abi_decode_params(details).map_err(malformed)?;
        return Ok(vec![source]);
    }
    let (airnodes, templates) =
        <(Vec<Address>, Vec<B256>)>::abi_decode_params(details).map_err(malformed)?;
    if airnodes.len() != templates.len() {
        return Err(quote::Error::FeedDetails(format!(
            "{} sources but {} templates",
            airnodes.len(),
            templates.len()
        )));
    }
    Ok(airnodes.into_iter().zip(templates).collect())
}

/// Picks the newest entry signed for the OEV variant of `template_id`.
fn latest(airnode: Address, template_id: B256, response: dto::Response) -> Option<Observation> {
    let oev_template_id = keccak256(template_id);
    let signed = response
        .data
        .into_values()
        .filter(|signed| signed.template_id.parse::<B256>().ok() == Some(oev_template_id))
        .max_by_key(|signed| signed.timestamp.parse::<u64>().ok())?;
    Some(Observation {
        airnode,
        template_id,
        timestamp: signed.timestamp,
        encoded_value: signed.encoded_value,
        signature: signed.signature,
    })
}
