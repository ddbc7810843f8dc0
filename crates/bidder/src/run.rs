use {
    crate::{
        domain::{
            cycle::{self, Cycle},
            window::Timing,
        },
        infra::{
            self,
            blockchain::{self, Network},
            cli,
            observe,
            signed_api::{self, SignedApi},
        },
    },
    alloy::signers::local::PrivateKeySigner,
    anyhow::Context,
    clap::Parser,
    std::sync::Arc,
    tokio_util::sync::CancellationToken,
};

/// Runs one bid cycle with the given command line and exits the process with
/// a non-zero status if it fails.
pub async fn start(args: impl Iterator<Item = String>) {
    let args = cli::Args::parse_from(args);
    observe::init(&args.log, args.stderr_threshold, args.use_json_logs);
    tracing::info!("running bidder with validated arguments:\n{}", args);
    if let Err(err) = run(args).await {
        tracing::error!(?err, "bidder failed");
        std::process::exit(1);
    }
}

pub async fn run(args: cli::Args) -> anyhow::Result<()> {
    let timing = Timing::new(
        args.dapp_id,
        args.protocol_version,
        args.auction_length,
        args.bidding_phase_length,
        args.bidding_phase_buffer,
    )
    .context("invalid auction timing")?;
    let signer: PrivateKeySigner = args.private_key.parse().context("invalid private key")?;

    let auction = Network::connect(&args.auction_node_url, signer.clone())
        .await
        .context("failed to connect to the auction network")?;
    let target = Network::connect(&args.target_node_url, signer)
        .await
        .context("failed to connect to the target network")?;
    tracing::info!(
        bidder = %auction.account,
        auction_chain = auction.chain_id,
        target_chain = target.chain_id,
        "connected"
    );

    let quotes = SignedApi::new(
        signed_api::Config {
            base_url: args.signed_api_url,
            dapi_name: args.dapi_name,
            api3_server: args.api3_server,
            airseeker_registry: args.airseeker_registry,
            timeout: args.http_timeout,
        },
        &target,
    )
    .context("failed to build the signed api client")?;
    let config = cycle::Config {
        timing,
        beneficiary: args.feed_updater,
        amount: args.bid_amount,
        target_chain: target.chain_id,
        policy: cycle::Policy {
            max_collateral: args.max_collateral,
            max_protocol_fee: args.max_protocol_fee,
        },
        poll: cycle::poll::Config {
            interval: args.poll_interval,
            max_backoff: args.retry_backoff_max,
        },
        event_lookback: args.event_lookback_blocks,
        award_grace: args.award_grace,
        confirmation_timeout: args.confirmation_timeout,
    };
    let cycle = Cycle::new(
        config,
        Arc::new(blockchain::AuctionHouse::new(auction, args.auction_house)),
        Arc::new(blockchain::FeedUpdater::new(&target, args.feed_updater)),
        Arc::new(quotes),
    );

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            shutdown_signal().await;
            tracing::info!("received shutdown signal");
            cancel.cancel();
        }
    });

    let result = cycle.run(infra::time::now(), cancel).await;
    if let Ok(metrics) = ::observe::metrics::encode() {
        tracing::debug!(%metrics, "final metrics");
    }
    let fulfilled = result?;
    tracing::info!(
        bid = %fulfilled.bid.id,
        placement = %fulfilled.placement.tx_hash,
        update = %fulfilled.update.tx_hash,
        report = %fulfilled.report.tx_hash,
        "bid fulfilled"
    );
    Ok(())
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Ctrl-C sends sigint, container runtimes sigterm.
    let (Ok(mut sigterm), Ok(mut sigint)) =
        (signal(SignalKind::terminate()), signal(SignalKind::interrupt()))
    else {
        tracing::warn!("cannot listen for shutdown signals");
        return std::future::pending().await;
    };
    tokio::select! {
        _ = sigterm.recv() => {}
        _ = sigint.recv() => {}
    }
}

#[cfg(windows)]
async fn shutdown_signal() {
    // No support for signal handling on Windows.
    std::future::pending().await
}
