//! This module implements the observability for the bidder. It exposes
//! functions which represent events that are meaningful to a bid cycle. They
//! log the event and update the metrics, if the event is worth measuring.

use {
    crate::domain::{
        bid::{Bid, ChainStatus},
        chain::{self, Award, Confirmation},
        cycle::{self, Fulfilled, Phase},
        eth::{Address, Receipt, Timestamp},
        quote::Bundle,
        window::{Timing, Window},
    },
    std::time::Duration,
};

mod metrics;

/// Setup the observability. The log argument configures the tracing
/// subscriber.
pub fn init(log: &str, stderr_threshold: Option<tracing::Level>, use_json: bool) {
    observe::tracing::initialize(&observe::Config::new(log, stderr_threshold, use_json));
    observe::metrics::setup_registry("oev");
}

/// Observe the window a new bid targets.
pub fn window(timing: &Timing, window: &Window, now: Timestamp) {
    tracing::info!(
        dapp_id = %timing.dapp_id(),
        offset = timing.phase_offset(),
        now,
        %window,
        "computed auction window"
    );
}

pub fn bid_created(bid: &Bid) {
    tracing::debug!(
        id = %bid.id,
        topic = %bid.topic,
        beneficiary = %bid.details.beneficiary(),
        nonce = %bid.details.nonce(),
        amount = %bid.amount,
        expiry = bid.expiry(),
        "created bid"
    );
}

/// Observe the signed data the cycle will use.
pub fn quotes_fetched(quotes: &Bundle) {
    if quotes.is_empty() {
        tracing::warn!("no usable signed data for the feed");
        return;
    }
    tracing::info!(
        sources = quotes.len(),
        reference_price = quotes.reference_price(),
        "fetched signed data"
    );
}

/// Observe that a signed API source could not be used.
pub fn source_failed(airnode: &Address, err: &anyhow::Error) {
    tracing::warn!(%airnode, ?err, "skipping signed api source");
    metrics::get().failed_sources.inc();
}

pub fn bid_placed(bid: &Bid, receipt: &Receipt) {
    tracing::info!(
        id = %bid.id,
        tx = %receipt.tx_hash,
        block = receipt.block,
        "bid placed"
    );
}

pub fn bid_status(bid: &Bid, status: ChainStatus) {
    tracing::trace!(id = %bid.id, ?status, "bid status");
}

pub fn bid_awarded(bid: &Bid) {
    tracing::info!(id = %bid.id, "bid awarded, looking up award");
}

/// Observe that the award event is not visible yet although the status says
/// the bid was awarded.
pub fn award_event_pending(bid: &Bid, lookback: u64) {
    tracing::debug!(id = %bid.id, lookback, "award event not found yet");
}

pub fn award_retrieved(bid: &Bid, award: &Award) {
    tracing::info!(
        id = %bid.id,
        tx = %award.tx_hash,
        block = award.block,
        bidder_balance = %award.bidder_balance,
        "retrieved award"
    );
}

pub fn feed_updated(bid: &Bid, receipt: &Receipt) {
    tracing::info!(
        id = %bid.id,
        tx = %receipt.tx_hash,
        block = receipt.block,
        "paid bid and updated feed"
    );
}

pub fn fulfillment_reported(bid: &Bid, update: &Receipt, report: &Receipt) {
    tracing::info!(
        id = %bid.id,
        update = %update.tx_hash,
        tx = %report.tx_hash,
        "reported fulfillment"
    );
}

pub fn fulfillment_confirmed(bid: &Bid, confirmation: &Confirmation) {
    tracing::info!(
        id = %bid.id,
        tx = %confirmation.tx_hash,
        timestamp = confirmation.timestamp,
        "fulfillment confirmed"
    );
}

/// Observe that a poll loop backs off after a transient error.
pub fn retrying(probe: &'static str, err: &chain::Error, delay: Duration) {
    tracing::warn!(probe, ?err, ?delay, "retrying after node error");
    metrics::get().retries.with_label_values(&[probe]).inc();
}

/// Measures the duration of a phase until the returned timer is dropped.
pub fn phase_timer(phase: Phase) -> prometheus::HistogramTimer {
    tracing::debug!(%phase, "starting phase");
    metrics::get()
        .phase_seconds
        .with_label_values(&[phase.as_str()])
        .start_timer()
}

pub fn cycle_finished(result: &Result<Fulfilled, cycle::Error>) {
    match result {
        Ok(fulfilled) => {
            tracing::info!(
                id = %fulfilled.bid.id,
                update = %fulfilled.update.tx_hash,
                confirmation = %fulfilled.confirmation.tx_hash,
                "bid cycle completed"
            );
            metrics::get()
                .cycles
                .with_label_values(&["success", "done"])
                .inc();
        }
        Err(err) => {
            tracing::warn!(
                phase = %err.phase,
                kind = %err.kind,
                progress = ?err.progress,
                "bid cycle failed"
            );
            metrics::get()
                .cycles
                .with_label_values(&[err.kind.as_str(), err.phase.as_str()])
                .inc();
        }
    }
}
