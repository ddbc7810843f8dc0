use {
    super::{
        Kind,
        poll::{Interrupted, Poller},
    },
    crate::{
        domain::{
            bid::{Bid, ChainStatus, Status},
            chain::{self, AuctionHouse, Award},
        },
        infra::observe,
    },
    std::sync::Arc,
    tokio::time::Instant,
};

/// Follows a placed bid until the auction resolved it.
///
/// The bid status is read until it shows an award. From then on only the
/// `AwardedBid` event is looked up, because the node that serves logs may lag
/// behind the one that served the status.
pub struct AwardWatcher {
    house: Arc<dyn AuctionHouse>,
    lookback: u64,
}

enum Probe {
    /// The bid is not awarded (yet).
    Status(ChainStatus),
    /// Awarded, but the event is not visible yet.
    Pending,
    Found(Award),
}

impl AwardWatcher {
    pub fn new(house: Arc<dyn AuctionHouse>, lookback: u64) -> Self {
        Self { house, lookback }
    }

    /// Polls until the award was retrieved or the poller gives up. When time
    /// runs out while the chain reported the bid as merely placed after the
    /// award phase `closed`, the bid lost the auction. Reads from before that
    /// are not conclusive.
    pub async fn watch(
        &self,
        bid: &mut Bid,
        closed: Instant,
        poller: &mut Poller,
    ) -> Result<Award, Kind> {
        let mut settled = None;
        loop {
            if let Err(interrupted) = poller.check() {
                return Err(self.give_up(bid, settled, interrupted));
            }
            let waited = match self.probe(bid).await {
                Ok(Probe::Status(status)) => {
                    if Instant::now() >= closed {
                        settled = Some(status);
                    }
                    poller.idle().await
                }
                Ok(Probe::Pending) => poller.idle().await,
                Ok(Probe::Found(award)) => {
                    bid.set_award(award.signature.clone());
                    observe::award_retrieved(bid, &award);
                    return Ok(award);
                }
                Err(err) if err.is_transient() => poller.retry(&err).await,
                Err(err) => return Err(err.into()),
            };
            if let Err(interrupted) = waited {
                return Err(self.give_up(bid, settled, interrupted));
            }
        }
    }

    async fn probe(&self, bid: &mut Bid) -> Result<Probe, chain::Error> {
        if bid.status() == Status::Placed {
            let onchain = self.house.bid(bid.id).await?;
            observe::bid_status(bid, onchain.status);
            if !onchain.status.is_awarded() {
                return Ok(Probe::Status(onchain.status));
            }
            bid.mark_awarded();
            observe::bid_awarded(bid);
        }
        let award = self
            .house
            .find_award(bid.topic, bid.id, self.lookback)
            .await?;
        match award {
            Some(award) => Ok(Probe::Found(award)),
            None => {
                observe::award_event_pending(bid, self.lookback);
                Ok(Probe::Pending)
            }
        }
    }

    fn give_up(
        &self,
        bid: &mut Bid,
        settled: Option<ChainStatus>,
        interrupted: Interrupted,
    ) -> Kind {
        match (interrupted, settled) {
            (Interrupted::Cancelled, _) => Kind::Cancelled,
            (Interrupted::Deadline, Some(status)) if !status.is_awarded() => {
                bid.mark_lost();
                Kind::NotAwarded
            }
            (Interrupted::Deadline, _) => Kind::TimedOut,
        }
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::domain::{
            chain::{MockAuctionHouse, OnchainBid},
            cycle::poll,
            eth::{Address, Bytes, TxHash, U256},
            window::{self, Timing},
        },
        std::time::Duration,
        tokio_util::sync::CancellationToken,
    };

    fn placed_bid() -> Bid {
        let timing = Timing::new(
            U256::from(1),
            window::protocol_version(),
            Duration::from_secs(30),
            Duration::from_secs(25),
            Duration::from_secs(3),
        )
        .unwrap();
        let mut bid = Bid::new(
            &timing,
            timing.window(1000),
            Address::repeat_byte(1),
            Address::repeat_byte(2),
            U256::from(100),
        );
        bid.mark_placed();
        bid
    }

    fn onchain(status: ChainStatus) -> OnchainBid {
        OnchainBid {
            status,
            bidder: Address::repeat_byte(1),
            amount: U256::from(100),
            signed_data_cutoff: 1003,
            chain_id: 1,
            collateral: U256::ZERO,
            protocol_fee: U256::ZERO,
        }
    }

    fn award() -> Award {
        Award {
            signature: Bytes::from_static(&[0xab; 65]),
            bidder_balance: U256::from(1000),
            tx_hash: TxHash::repeat_byte(3),
            block: 42,
        }
    }

    fn poller(deadline: Duration, cancel: CancellationToken) -> Poller {
        Poller::new(
            "award",
            poll::Config {
                interval: Duration::from_millis(100),
                max_backoff: Duration::from_secs(1),
            },
            Instant::now() + deadline,
            cancel,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn waits_for_award_event_after_status_flips() {
        let bid_ = placed_bid();
        let (topic, id) = (bid_.topic, bid_.id);
        let mut house = MockAuctionHouse::new();
        let mut reads = 0;
        house
            .expect_bid()
            .times(3)
            .withf(move |requested| *requested == id)
            .returning(move |_| {
                reads += 1;
                Ok(onchain(if reads < 3 {
                    ChainStatus::Placed
                } else {
                    ChainStatus::Awarded
                }))
            });
        let mut lookups = 0;
        house
            .expect_find_award()
            .times(2)
            .withf(move |t, i, lookback| *t == topic && *i == id && *lookback == 10)
            .returning(move |_, _, _| {
                lookups += 1;
                Ok((lookups == 2).then(award))
            });

        let mut bid = bid_;
        let watcher = AwardWatcher::new(Arc::new(house), 10);
        let retrieved = watcher
            .watch(
                &mut bid,
                Instant::now(),
                &mut poller(Duration::from_secs(30), CancellationToken::new()),
            )
            .await
            .unwrap();
        assert_eq!(retrieved, award());
        assert_eq!(bid.status(), Status::Awarded);
        assert_eq!(bid.award(), Some(&award().signature));
    }

    #[tokio::test(start_paused = true)]
    async fn retries_node_errors() {
        let mut house = MockAuctionHouse::new();
        let mut reads = 0;
        house.expect_bid().times(3).returning(move |_| {
            reads += 1;
            match reads {
                1 | 2 => Err(chain::Error::Node("timeout".to_string())),
                _ => Ok(onchain(ChainStatus::FulfillmentReported)),
            }
        });
        house
            .expect_find_award()
            .times(1)
            .returning(|_, _, _| Ok(Some(award())));

        let mut bid = placed_bid();
        let started = Instant::now();
        let watcher = AwardWatcher::new(Arc::new(house), 10);
        watcher
            .watch(
                &mut bid,
                Instant::now(),
                &mut poller(Duration::from_secs(30), CancellationToken::new()),
            )
            .await
            .unwrap();
        // 100ms and 200ms of backoff.
        assert_eq!(Instant::now() - started, Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn not_awarded_when_deadline_passes() {
        let mut house = MockAuctionHouse::new();
        house
            .expect_bid()
            .returning(|_| Ok(onchain(ChainStatus::Placed)));
        house.expect_find_award().never();

        let mut bid = placed_bid();
        let watcher = AwardWatcher::new(Arc::new(house), 10);
        let result = watcher
            .watch(
                &mut bid,
                Instant::now(),
                &mut poller(Duration::from_secs(2), CancellationToken::new()),
            )
            .await;
        assert!(matches!(result, Err(Kind::NotAwarded)));
        assert_eq!(bid.status(), Status::Lost);
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_when_award_event_never_shows() {
        let mut house = MockAuctionHouse::new();
        house
            .expect_bid()
            .times(1)
            .returning(|_| Ok(onchain(ChainStatus::Awarded)));
        house.expect_find_award().returning(|_, _, _| Ok(None));

        let mut bid = placed_bid();
        let watcher = AwardWatcher::new(Arc::new(house), 10);
        let result = watcher
            .watch(
                &mut bid,
                Instant::now(),
                &mut poller(Duration::from_secs(2), CancellationToken::new()),
            )
            .await;
        assert!(matches!(result, Err(Kind::TimedOut)));
        assert_eq!(bid.status(), Status::Awarded);
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_without_any_successful_read() {
        let mut house = MockAuctionHouse::new();
        house
            .expect_bid()
            .returning(|_| Err(chain::Error::Node("connection refused".to_string())));

        let mut bid = placed_bid();
        let watcher = AwardWatcher::new(Arc::new(house), 10);
        let result = watcher
            .watch(
                &mut bid,
                Instant::now(),
                &mut poller(Duration::from_secs(5), CancellationToken::new()),
            )
            .await;
        assert!(matches!(result, Err(Kind::TimedOut)));
        assert_eq!(bid.status(), Status::Placed);
    }

    #[tokio::test(start_paused = true)]
    async fn decode_errors_are_fatal() {
        let mut house = MockAuctionHouse::new();
        house
            .expect_bid()
            .times(1)
            .returning(|_| Err(chain::Error::Decode("unknown bid status 9".to_string())));

        let mut bid = placed_bid();
        let watcher = AwardWatcher::new(Arc::new(house), 10);
        let result = watcher
            .watch(
                &mut bid,
                Instant::now(),
                &mut poller(Duration::from_secs(5), CancellationToken::new()),
            )
            .await;
        assert!(matches!(result, Err(Kind::Malformed(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn stops_when_cancelled() {
        let cancel = CancellationToken::new();
        let mut house = MockAuctionHouse::new();
        let mut reads = 0;
        let trigger = cancel.clone();
        house.expect_bid().times(2).returning(move |_| {
            reads += 1;
            if reads == 2 {
                trigger.cancel();
            }
            Ok(onchain(ChainStatus::Placed))
        });

        let mut bid = placed_bid();
        let watcher = AwardWatcher::new(Arc::new(house), 10);
        let result = watcher
            .watch(
                &mut bid,
                Instant::now(),
                &mut poller(Duration::from_secs(30), cancel),
            )
            .await;
        assert!(matches!(result, Err(Kind::Cancelled)));
        assert_eq!(bid.status(), Status::Placed);
    }

    #[tokio::test(start_paused = true)]
    async fn outage_after_early_read_is_not_a_loss() {
        let mut house = MockAuctionHouse::new();
        let mut reads = 0;
        house.expect_bid().returning(move |_| {
            reads += 1;
            match reads {
                1 => Ok(onchain(ChainStatus::Placed)),
                _ => Err(chain::Error::Node("connection refused".to_string())),
            }
        });

        let mut bid = placed_bid();
        let watcher = AwardWatcher::new(Arc::new(house), 10);
        let closed = Instant::now() + Duration::from_secs(8);
        let result = watcher
            .watch(
                &mut bid,
                closed,
                &mut poller(Duration::from_secs(18), CancellationToken::new()),
            )
            .await;
        assert!(matches!(result, Err(Kind::TimedOut)));
        assert_eq!(bid.status(), Status::Placed);
    }

    #[tokio::test(start_paused = true)]
    async fn placed_after_close_then_outage_is_a_loss() {
        let mut house = MockAuctionHouse::new();
        let started = Instant::now();
        house.expect_bid().returning(move |_| {
            if Instant::now() - started < Duration::from_secs(9) {
                Ok(onchain(ChainStatus::Placed))
            } else {
                Err(chain::Error::Node("connection refused".to_string()))
            }
        });

        let mut bid = placed_bid();
        let watcher = AwardWatcher::new(Arc::new(house), 10);
        let result = watcher
            .watch(
                &mut bid,
                started + Duration::from_secs(8),
                &mut poller(Duration::from_secs(18), CancellationToken::new()),
            )
            .await;
        assert!(matches!(result, Err(Kind::NotAwarded)));
        assert_eq!(bid.status(), Status::Lost);
    }
}
