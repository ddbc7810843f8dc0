//! One bid cycle: bid for the update rights of one auction window, use them
//! on the target chain and prove it on the auction chain.
//!
//! The phases run strictly one after another and the first failure ends the
//! cycle. Nothing is retried across phases since every state-changing
//! transaction commits to parameters that cannot be reused.

use {
    crate::{
        domain::{
            bid::{self, Bid},
            chain::{self, AuctionHouse, Award, Confirmation, FeedUpdater},
            eth::{Address, ChainId, Receipt, Timestamp, TxHash, U256},
            quote::{self, Bundle, QuoteProvider},
            window::Timing,
        },
        infra::observe,
    },
    std::{future::Future, sync::Arc, time::Duration},
    tokio::time::Instant,
    tokio_util::sync::CancellationToken,
};

pub mod award;
pub mod clock;
pub mod fulfillment;
pub mod poll;
pub mod submit;
pub mod update;

pub use {
    award::AwardWatcher,
    clock::Clock,
    fulfillment::FulfillmentReporter,
    poll::Poller,
    submit::{BidSubmitter, Policy},
    update::UpdateSubmitter,
};

#[derive(Debug, Clone)]
pub struct Config {
    pub timing: Timing,
    /// Receives the proceeds of the update.
    pub beneficiary: Address,
    pub amount: U256,
    pub target_chain: ChainId,
    pub policy: Policy,
    pub poll: poll::Config,
    /// How many recent blocks are searched for events.
    pub event_lookback: u64,
    /// How long after the award phase closed the award is still waited for.
    pub award_grace: Duration,
    /// How long after the report was mined its confirmation is waited for.
    pub confirmation_timeout: Duration,
}

pub struct Cycle {
    config: Config,
    house: Arc<dyn AuctionHouse>,
    quotes: Arc<dyn QuoteProvider>,
    submitter: BidSubmitter,
    watcher: AwardWatcher,
    updater: UpdateSubmitter,
    reporter: FulfillmentReporter,
}

/// Everything a successful cycle produced.
#[derive(Debug, Clone)]
pub struct Fulfilled {
    pub bid: Bid,
    pub quotes: Bundle,
    pub placement: Receipt,
    pub award: Award,
    pub update: Receipt,
    pub report: Receipt,
    pub confirmation: Confirmation,
}

impl Cycle {
    pub fn new(
        config: Config,
        house: Arc<dyn AuctionHouse>,
        updater: Arc<dyn FeedUpdater>,
        quotes: Arc<dyn QuoteProvider>,
    ) -> Self {
        Self {
            submitter: BidSubmitter::new(house.clone(), config.policy),
            watcher: AwardWatcher::new(house.clone(), config.event_lookback),
            updater: UpdateSubmitter::new(updater),
            reporter: FulfillmentReporter::new(house.clone(), config.event_lookback),
            config,
            house,
            quotes,
        }
    }

    /// Runs one complete cycle for the window that is open for bidding at
    /// `now`. Cancelling `cancel` stops the cycle at its next wait.
    pub async fn run(
        &self,
        now: Timestamp,
        cancel: CancellationToken,
    ) -> Result<Fulfilled, Error> {
        let clock = Clock::new(now);
        let window = self.config.timing.window(now);
        observe::window(&self.config.timing, &window, now);
        let mut bid = Bid::new(
            &self.config.timing,
            window,
            self.house.bidder(),
            self.config.beneficiary,
            self.config.amount,
        );
        observe::bid_created(&bid);

        let mut progress = Progress::new(&bid);
        let result = self
            .phases(&mut bid, &clock, &cancel, &mut progress)
            .await
            .map_err(|(phase, kind)| {
                progress.status = bid.status();
                Error {
                    phase,
                    progress,
                    kind,
                }
            });
        observe::cycle_finished(&result);
        result
    }

    async fn phases(
        &self,
        bid: &mut Bid,
        clock: &Clock,
        cancel: &CancellationToken,
        progress: &mut Progress,
    ) -> Result<Fulfilled, (Phase, Kind)> {
        let quotes = phase(Phase::Quote, cancel, async {
            let quotes = self.quotes.fetch().await?;
            observe::quotes_fetched(&quotes);
            Ok::<_, Kind>(quotes)
        })
        .await?;

        let placement = phase(
            Phase::Placement,
            cancel,
            self.submitter.submit(bid, self.config.target_chain),
        )
        .await?;
        progress.placement = Some(placement.tx_hash);

        let closed = clock.instant(bid.window.next_window_start);
        let deadline = closed + self.config.award_grace;
        let mut poller = Poller::new("award", self.config.poll, deadline, cancel.clone());
        let award = phase(
            Phase::Award,
            cancel,
            self.watcher.watch(bid, closed, &mut poller),
        )
        .await?;
        progress.award = Some(award.tx_hash);

        let update = phase(
            Phase::Update,
            cancel,
            self.updater.submit(bid, &quotes, clock),
        )
        .await?;
        progress.update = Some(update.tx_hash);

        let (report, confirmation) = phase(Phase::Fulfillment, cancel, async {
            let report = self.reporter.report(bid, &update).await?;
            progress.report = Some(report.tx_hash);
            let deadline = Instant::now() + self.config.confirmation_timeout;
            let mut poller =
                Poller::new("confirmation", self.config.poll, deadline, cancel.clone());
            let confirmation = self.reporter.await_confirmation(bid, &mut poller).await?;
            Ok::<_, Kind>((report, confirmation))
        })
        .await?;

        Ok(Fulfilled {
            bid: bid.clone(),
            quotes,
            placement,
            award,
            update,
            report,
            confirmation,
        })
    }
}

/// Runs one phase unless the cycle was cancelled already.
async fn phase<T>(
    phase: Phase,
    cancel: &CancellationToken,
    work: impl Future<Output = Result<T, Kind>>,
) -> Result<T, (Phase, Kind)> {
    if cancel.is_cancelled() {
        return Err((phase, Kind::Cancelled));
    }
    let _timer = observe::phase_timer(phase);
    work.await.map_err(|kind| (phase, kind))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Quote,
    Placement,
    Award,
    Update,
    Fulfillment,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Quote => "quote",
            Self::Placement => "placement",
            Self::Award => "award",
            Self::Update => "update",
            Self::Fulfillment => "fulfillment",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How far a cycle got. Placed bids lock funds, so this is reported even when
/// the cycle fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    pub bid: bid::Id,
    pub topic: bid::Topic,
    pub status: bid::Status,
    pub placement: Option<TxHash>,
    pub award: Option<TxHash>,
    pub update: Option<TxHash>,
    pub report: Option<TxHash>,
}

impl Progress {
    fn new(bid: &Bid) -> Self {
        Self {
            bid: bid.id,
            topic: bid.topic,
            status: bid.status(),
            placement: None,
            award: None,
            update: None,
            report: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("bid cycle failed during {phase}: {kind}")]
pub struct Error {
    pub phase: Phase,
    pub progress: Progress,
    #[source]
    pub kind: Kind,
}

#[derive(Debug, thiserror::Error)]
pub enum Kind {
    #[error("rejected by contract: {0}")]
    Rejected(String),
    #[error("node unavailable: {0}")]
    Unavailable(String),
    #[error("unexpected response: {0}")]
    Malformed(String),
    #[error("invalid bid: {0}")]
    InvalidBid(&'static str),
    #[error("bid was not awarded")]
    NotAwarded,
    #[error("timed out")]
    TimedOut,
    #[error("award can only be used before {expiry}, it is {now}")]
    TimingMiss { expiry: Timestamp, now: Timestamp },
    #[error("cancelled")]
    Cancelled,
    #[error("no quotes: {0}")]
    Quote(#[from] quote::Error),
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rejected(_) => "rejected",
            Self::Unavailable(_) => "unavailable",
            Self::Malformed(_) => "malformed",
            Self::InvalidBid(_) => "invalid_bid",
            Self::NotAwarded => "not_awarded",
            Self::TimedOut => "timed_out",
            Self::TimingMiss { .. } => "timing_miss",
            Self::Cancelled => "cancelled",
            Self::Quote(_) => "quote",
        }
    }
}

impl From<chain::Error> for Kind {
    fn from(err: chain::Error) -> Self {
        match err {
            chain::Error::Node(err) => Self::Unavailable(err),
            chain::Error::Revert(err) => Self::Rejected(err),
            chain::Error::Decode(err) => Self::Malformed(err),
        }
    }
}

impl From<poll::Interrupted> for Kind {
    fn from(interrupted: poll::Interrupted) -> Self {
        match interrupted {
            poll::Interrupted::Cancelled => Self::Cancelled,
            poll::Interrupted::Deadline => Self::TimedOut,
        }
    }
}
