use {
    super::{Kind, poll::Poller},
    crate::{
        domain::{
            bid::Bid,
            chain::{AuctionHouse, Confirmation},
            eth::Receipt,
        },
        infra::observe,
    },
    std::sync::Arc,
};

/// Proves on the auction chain that an award was used, then waits until the
/// auctioneer confirmed the proof.
pub struct FulfillmentReporter {
    house: Arc<dyn AuctionHouse>,
    lookback: u64,
}

impl FulfillmentReporter {
    pub fn new(house: Arc<dyn AuctionHouse>, lookback: u64) -> Self {
        Self { house, lookback }
    }

    /// Reports `update` as the transaction that fulfilled the bid.
    pub async fn report(&self, bid: &Bid, update: &Receipt) -> Result<Receipt, Kind> {
        let receipt = self
            .house
            .report_fulfillment(bid.topic, bid.details.hash(), update.tx_hash)
            .await?;
        observe::fulfillment_reported(bid, update, &receipt);
        Ok(receipt)
    }

    pub async fn await_confirmation(
        &self,
        bid: &Bid,
        poller: &mut Poller,
    ) -> Result<Confirmation, Kind> {
        loop {
            poller.check()?;
            let waited = match self
                .house
                .find_confirmation(bid.topic, bid.id, self.lookback)
                .await
            {
                Ok(Some(confirmation)) => {
                    observe::fulfillment_confirmed(bid, &confirmation);
                    return Ok(confirmation);
                }
                Ok(None) => poller.idle().await,
                Err(err) if err.is_transient() => poller.retry(&err).await,
                Err(err) => return Err(err.into()),
            };
            waited?;
        }
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::domain::{
            chain::{self, MockAuctionHouse},
            cycle::poll,
            eth::{Address, Bytes, TxHash, U256},
            window::{self, Timing},
        },
        std::time::Duration,
        tokio::time::Instant,
        tokio_util::sync::CancellationToken,
    };

    fn bid() -> Bid {
        let timing = Timing::new(
            U256::from(1),
            window::protocol_version(),
            Duration::from_secs(30),
            Duration::from_secs(25),
            Duration::from_secs(3),
        )
        .unwrap();
        Bid::new(
            &timing,
            timing.window(1000),
            Address::repeat_byte(1),
            Address::repeat_byte(2),
            U256::from(100),
        )
    }

    fn poller(deadline: Duration) -> Poller {
        Poller::new(
            "confirmation",
            poll::Config {
                interval: Duration::from_millis(100),
                max_backoff: Duration::from_secs(1),
            },
            Instant::now() + deadline,
            CancellationToken::new(),
        )
    }

    fn confirmation() -> Confirmation {
        Confirmation {
            payload: Bytes::from_static(&[0xee; 32]),
            timestamp: 1050,
            tx_hash: TxHash::repeat_byte(0xcc),
            block: 99,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn reports_update_hash_then_waits_for_confirmation() {
        let bid = bid();
        let (topic, id, details_hash) = (bid.topic, bid.id, bid.details.hash());
        let update = Receipt {
            tx_hash: TxHash::repeat_byte(0xee),
            block: 12,
        };

        let mut house = MockAuctionHouse::new();
        house
            .expect_report_fulfillment()
            .times(1)
            .withf(move |t, hash, tx| {
                *t == topic && *hash == details_hash && *tx == TxHash::repeat_byte(0xee)
            })
            .returning(|_, _, _| {
                Ok(Receipt {
                    tx_hash: TxHash::repeat_byte(0xdd),
                    block: 20,
                })
            });
        let mut lookups = 0;
        house
            .expect_find_confirmation()
            .times(3)
            .withf(move |t, i, lookback| *t == topic && *i == id && *lookback == 10)
            .returning(move |_, _, _| {
                lookups += 1;
                Ok((lookups == 3).then(confirmation))
            });

        let reporter = FulfillmentReporter::new(Arc::new(house), 10);
        let report = reporter.report(&bid, &update).await.unwrap();
        assert_eq!(report.tx_hash, TxHash::repeat_byte(0xdd));
        let confirmed = reporter
            .await_confirmation(&bid, &mut poller(Duration::from_secs(60)))
            .await
            .unwrap();
        assert_eq!(confirmed, confirmation());
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_report_is_final() {
        let mut house = MockAuctionHouse::new();
        house
            .expect_report_fulfillment()
            .times(1)
            .returning(|_, _, _| Err(chain::Error::Revert("Bid not awarded".to_string())));
        house.expect_find_confirmation().never();

        let update = Receipt {
            tx_hash: TxHash::ZERO,
            block: 1,
        };
        let reporter = FulfillmentReporter::new(Arc::new(house), 10);
        assert!(matches!(
            reporter.report(&bid(), &update).await,
            Err(Kind::Rejected(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_timeout() {
        let mut house = MockAuctionHouse::new();
        house
            .expect_find_confirmation()
            .returning(|_, _, _| Ok(None));

        let started = Instant::now();
        let reporter = FulfillmentReporter::new(Arc::new(house), 10);
        let result = reporter
            .await_confirmation(&bid(), &mut poller(Duration::from_secs(3)))
            .await;
        assert!(matches!(result, Err(Kind::TimedOut)));
        assert_eq!(Instant::now() - started, Duration::from_secs(3));
    }
}
