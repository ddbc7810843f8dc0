use {
    super::{
        eth::{Address, B256, Bytes, Timestamp, U256, keccak256},
        window::{Timing, Window},
    },
    alloy::sol_types::SolValue,
    rand::{RngCore, rngs::OsRng},
};

/// Identifies the competitive auction lane of one dApp in one window.
///
/// `keccak256(abi.encodePacked(uint256 version, uint256 dappId, uint32
/// auctionLength, uint32 signedDataTimestampCutoff))`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Topic(pub B256);

impl Topic {
    pub fn new(timing: &Timing, window: &Window) -> Self {
        let packed = (
            timing.protocol_version(),
            timing.dapp_id(),
            timing.auction_length(),
            window.signed_data_cutoff,
        )
            .abi_encode_packed();
        Self(keccak256(packed))
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

/// The opaque part of a bid that tells the auctioneer who profits from the
/// update. The random nonce makes every bid unique.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Details {
    beneficiary: Address,
    nonce: B256,
    encoded: Bytes,
}

impl Details {
    pub fn new(beneficiary: Address, nonce: B256) -> Self {
        let encoded = (beneficiary, nonce).abi_encode_params().into();
        Self {
            beneficiary,
            nonce,
            encoded,
        }
    }

    /// Details with a fresh nonce from the OS random number generator.
    pub fn random(beneficiary: Address) -> Self {
        let mut nonce = B256::ZERO;
        OsRng.fill_bytes(nonce.as_mut_slice());
        Self::new(beneficiary, nonce)
    }

    pub fn beneficiary(&self) -> Address {
        self.beneficiary
    }

    pub fn nonce(&self) -> B256 {
        self.nonce
    }

    /// `abi.encode(address beneficiary, bytes32 nonce)`
    pub fn encoded(&self) -> &Bytes {
        &self.encoded
    }

    pub fn hash(&self) -> B256 {
        keccak256(&self.encoded)
    }
}

/// `keccak256(abi.encodePacked(address bidder, bytes32 bidTopic, bytes32
/// keccak256(bidDetails)))`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Id(pub B256);

impl Id {
    pub fn new(bidder: Address, topic: &Topic, details: &Details) -> Self {
        Self(keccak256(
            (bidder, topic.0, details.hash()).abi_encode_packed(),
        ))
    }
}

impl std::fmt::Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

/// Where a bid is in its life from the bidder's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Built locally, not yet on chain.
    Unannounced,
    Placed,
    Awarded,
    /// Not awarded, or awarded too late to be of use.
    Lost,
}

/// Bid status as stored by the auction house contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainStatus {
    None,
    Placed,
    Awarded,
    FulfillmentReported,
    FulfillmentConfirmed,
    FulfillmentContradicted,
}

impl ChainStatus {
    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0 => Self::None,
            1 => Self::Placed,
            2 => Self::Awarded,
            3 => Self::FulfillmentReported,
            4 => Self::FulfillmentConfirmed,
            5 => Self::FulfillmentContradicted,
            _ => return None,
        })
    }

    /// Every status past `Placed` can only be reached through an award.
    pub fn is_awarded(self) -> bool {
        !matches!(self, Self::None | Self::Placed)
    }
}

/// A bid of this agent. It is created once per cycle and afterwards only
/// moves forward through its [`Status`].
#[derive(Debug, Clone)]
pub struct Bid {
    pub id: Id,
    pub topic: Topic,
    pub details: Details,
    pub bidder: Address,
    pub amount: U256,
    pub window: Window,
    status: Status,
    award: Option<Bytes>,
}

impl Bid {
    pub fn new(
        timing: &Timing,
        window: Window,
        bidder: Address,
        beneficiary: Address,
        amount: U256,
    ) -> Self {
        Self::with_details(timing, window, bidder, Details::random(beneficiary), amount)
    }

    pub fn with_details(
        timing: &Timing,
        window: Window,
        bidder: Address,
        details: Details,
        amount: U256,
    ) -> Self {
        let topic = Topic::new(timing, &window);
        Self {
            id: Id::new(bidder, &topic, &details),
            topic,
            details,
            bidder,
            amount,
            window,
            status: Status::Unannounced,
            award: None,
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// Signature of the auctioneer, available once the award was retrieved.
    pub fn award(&self) -> Option<&Bytes> {
        self.award.as_ref()
    }

    pub fn expiry(&self) -> Timestamp {
        self.window.bid_expiry()
    }

    pub fn mark_placed(&mut self) {
        if self.status == Status::Unannounced {
            self.status = Status::Placed;
        }
    }

    pub fn mark_awarded(&mut self) {
        if self.status == Status::Placed {
            self.status = Status::Awarded;
        }
    }

    pub fn set_award(&mut self, signature: Bytes) {
        if self.status == Status::Awarded {
            self.award = Some(signature);
        }
    }

    pub fn mark_lost(&mut self) {
        if matches!(self.status, Status::Placed | Status::Awarded) {
            self.status = Status::Lost;
        }
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        alloy::primitives::{address, b256},
        std::{collections::HashSet, time::Duration},
    };

    fn timing() -> Timing {
        Timing::new(
            U256::from(1),
            U256::from(1),
            Duration::from_secs(30),
            Duration::from_secs(25),
            Duration::from_secs(3),
        )
        .unwrap()
    }

    fn details() -> Details {
        Details::new(
            address!("2222222222222222222222222222222222222222"),
            b256!("3333333333333333333333333333333333333333333333333333333333333333"),
        )
    }

    #[test]
    fn topic_matches_contract_derivation() {
        let timing = timing();
        let window = timing.window(1000);
        assert_eq!(window.signed_data_cutoff, 1003);
        assert_eq!(
            Topic::new(&timing, &window).0,
            b256!("89a1e3558a67fdbaf846bf8e8b6cd9b9a64fd02f8de8e8ca10cbcb09aa64cee2"),
        );
    }

    #[test]
    fn details_encoding() {
        let details = details();
        assert_eq!(details.encoded().len(), 64);
        assert_eq!(
            &details.encoded()[12..32],
            address!("2222222222222222222222222222222222222222").as_slice()
        );
        assert_eq!(
            details.hash(),
            b256!("b46d842f632dc5321a4932c48ac1bdde3cab6f16817756baad98e26c2ccd4b81"),
        );
    }

    #[test]
    fn id_matches_contract_derivation() {
        let timing = timing();
        let bid = Bid::with_details(
            &timing,
            timing.window(1000),
            address!("1111111111111111111111111111111111111111"),
            details(),
            U256::from(1),
        );
        assert_eq!(
            bid.id.0,
            b256!("6a4cf950136c33eb665fe88d47700743c980cb78ce16be381bad237ad477a5a6"),
        );
        assert_eq!(bid.expiry(), 1033);
    }

    #[test]
    fn random_details_never_repeat() {
        let beneficiary = Address::repeat_byte(2);
        let nonces = (0..10_000)
            .map(|_| {
                let details = Details::random(beneficiary);
                assert_eq!(details.beneficiary(), beneficiary);
                details.nonce()
            })
            .collect::<HashSet<_>>();
        assert_eq!(nonces.len(), 10_000);
    }

    #[test]
    fn status_only_moves_forward() {
        let timing = timing();
        let mut bid = Bid::new(
            &timing,
            timing.window(1000),
            Address::repeat_byte(1),
            Address::repeat_byte(2),
            U256::from(1),
        );
        assert_eq!(bid.status(), Status::Unannounced);
        bid.mark_awarded();
        assert_eq!(bid.status(), Status::Unannounced);
        bid.mark_placed();
        bid.set_award(Bytes::from_static(b"sig"));
        assert!(bid.award().is_none());
        bid.mark_awarded();
        bid.set_award(Bytes::from_static(b"sig"));
        assert_eq!(bid.status(), Status::Awarded);
        assert_eq!(bid.award().map(|s| s.as_ref()), Some(&b"sig"[..]));

        bid.mark_lost();
        bid.mark_placed();
        bid.mark_awarded();
        assert_eq!(bid.status(), Status::Lost);
    }

    #[test]
    fn chain_status_codes() {
        assert_eq!(ChainStatus::from_code(1), Some(ChainStatus::Placed));
        assert_eq!(ChainStatus::from_code(6), None);
        assert!(!ChainStatus::Placed.is_awarded());
        assert!(!ChainStatus::None.is_awarded());
        for code in 2..=5 {
            assert!(ChainStatus::from_code(code).unwrap().is_awarded());
        }
    }
}
