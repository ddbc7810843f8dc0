//! Signed price data that goes into a feed update.

use {
    super::{
        chain,
        eth::{Address, B256, Bytes, U256},
    },
    alloy::sol_types::SolValue,
};

/// Fixed point scale of feed values.
const DECIMALS: f64 = 1e18;

/// The latest data point of one source, as served by its signed API. Nothing
/// about it has been checked yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub airnode: Address,
    pub template_id: B256,
    pub timestamp: String,
    pub encoded_value: String,
    pub signature: String,
}

/// An observation that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedUpdate {
    pub airnode: Address,
    pub template_id: B256,
    pub timestamp: u64,
    pub encoded_value: Bytes,
    pub signature: Bytes,
    /// The encoded value as a decimal number.
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Invalid {
    #[error("timestamp {0:?} is not an integer")]
    Timestamp(String),
    #[error("encoded value {0:?} is not a 0x prefixed 32 byte word")]
    Value(String),
    #[error("value {0} exceeds the supported range")]
    Range(U256),
    #[error("signature {0:?} is not 0x prefixed hex")]
    Signature(String),
}

impl TryFrom<Observation> for SignedUpdate {
    type Error = Invalid;

    fn try_from(observation: Observation) -> Result<Self, Invalid> {
        let timestamp = observation
            .timestamp
            .parse::<u64>()
            .map_err(|_| Invalid::Timestamp(observation.timestamp.clone()))?;
        let encoded_value = prefixed_hex(&observation.encoded_value)
            .filter(|value| value.len() == 32)
            .ok_or_else(|| Invalid::Value(observation.encoded_value.clone()))?;
        let signature = prefixed_hex(&observation.signature)
            .ok_or_else(|| Invalid::Signature(observation.signature.clone()))?;
        let raw = U256::from_be_slice(&encoded_value);
        let value = u128::try_from(raw).map_err(|_| Invalid::Range(raw))? as f64 / DECIMALS;
        Ok(Self {
            airnode: observation.airnode,
            template_id: observation.template_id,
            timestamp,
            encoded_value,
            signature,
            value,
        })
    }
}

fn prefixed_hex(value: &str) -> Option<Bytes> {
    let digits = value.strip_prefix("0x")?;
    const_hex::decode(digits).ok().map(Bytes::from)
}

impl SignedUpdate {
    /// `abi.encode(address airnode, bytes32 templateId, uint256 timestamp,
    /// bytes data, bytes signature)`
    pub fn encode(&self) -> Bytes {
        (
            self.airnode,
            self.template_id,
            U256::from(self.timestamp),
            self.encoded_value.clone(),
            self.signature.clone(),
        )
            .abi_encode_params()
            .into()
    }
}

/// The signed data a feed update is submitted with. Frozen once built, so
/// every later phase of a cycle sees exactly the same data.
#[derive(Debug, Clone, PartialEq)]
pub struct Bundle {
    updates: Vec<SignedUpdate>,
    encoded: Vec<Bytes>,
    reference_price: f64,
}

impl Bundle {
    /// Validates the observations, dropping the ones that fail, and computes
    /// the reference price over the rest. Order is preserved.
    pub fn new(observations: Vec<Observation>) -> Self {
        let updates = observations
            .into_iter()
            .filter_map(|observation| {
                let airnode = observation.airnode;
                SignedUpdate::try_from(observation)
                    .inspect_err(|err| {
                        tracing::warn!(%airnode, %err, "dropping invalid signed data");
                    })
                    .ok()
            })
            .collect::<Vec<_>>();
        let values = updates.iter().map(|update| update.value).collect::<Vec<_>>();
        Self {
            encoded: updates.iter().map(SignedUpdate::encode).collect(),
            reference_price: median(&values),
            updates,
        }
    }

    pub fn updates(&self) -> &[SignedUpdate] {
        &self.updates
    }

    /// The updates in their on-chain encoding.
    pub fn encoded(&self) -> &[Bytes] {
        &self.encoded
    }

    /// Median of the update values. Informational only, the bid amount does
    /// not depend on it.
    pub fn reference_price(&self) -> f64 {
        self.reference_price
    }

    pub fn len(&self) -> usize {
        self.updates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }
}

/// Median with the mean of the middle pair for even counts. `0` for no values.
pub fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    match sorted.len() {
        0 => 0.,
        len if len % 2 == 0 => (sorted[mid - 1] + sorted[mid]) / 2.,
        _ => sorted[mid],
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("feed name {0:?} is longer than 32 bytes")]
    FeedName(String),
    #[error("feed {0:?} has no registered data sources")]
    UnknownFeed(String),
    #[error("malformed feed details: {0}")]
    FeedDetails(String),
    #[error(transparent)]
    Chain(#[from] chain::Error),
}

/// Source of the signed data for the configured feed.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait QuoteProvider: Send + Sync {
    async fn fetch(&self) -> Result<Bundle, Error>;
}
