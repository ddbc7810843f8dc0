use {
    crate::domain::{
        eth::{Address, U256},
        window,
    },
    alloy::primitives::utils::{UnitsError, parse_ether},
    std::{
        fmt::{self, Display, Formatter},
        time::Duration,
    },
    url::Url,
};

#[derive(clap::Parser)]
pub struct Args {
    /// The log filter.
    #[clap(long, env, default_value = "warn,bidder=debug,observe=info")]
    pub log: String,

    /// At which log level logs should be printed to stderr instead of stdout.
    #[clap(long, env)]
    pub stderr_threshold: Option<tracing::Level>,

    /// Whether to use JSON format for the logs.
    #[clap(long, env, default_value = "false")]
    pub use_json_logs: bool,

    /// RPC endpoint of the network the auctions take place on.
    #[clap(long, env)]
    pub auction_node_url: Url,

    /// RPC endpoint of the network whose feed gets updated.
    #[clap(long, env)]
    pub target_node_url: Url,

    /// Private key of the bidder account, used on both networks.
    #[clap(long, env)]
    pub private_key: String,

    /// The auction house contract on the auction network.
    #[clap(long, env)]
    pub auction_house: Address,

    /// The OEV feed updater on the target network. It also receives the
    /// proceeds of the bid.
    #[clap(long, env)]
    pub feed_updater: Address,

    /// Registry mapping dAPI names to data feeds on the target network.
    #[clap(long, env)]
    pub api3_server: Address,

    /// Registry of the data sources of every feed on the target network.
    #[clap(long, env)]
    pub airseeker_registry: Address,

    /// Base URL of the signed APIs serving OEV signed data.
    #[clap(long, env, default_value = "https://signed-api.api3.org/public-oev/")]
    pub signed_api_url: Url,

    /// Timeout for requests to the signed APIs.
    #[clap(long, env, default_value = "10s", value_parser = humantime::parse_duration)]
    pub http_timeout: Duration,

    /// The bid in ether.
    #[clap(long, env, default_value = "0.0001", value_parser = ether)]
    pub bid_amount: U256,

    /// Name of the dAPI to update.
    #[clap(long, env, default_value = "ETH/USD")]
    pub dapi_name: String,

    /// Identifier of the dApp whose OEV is auctioned.
    #[clap(long, env, default_value = "1")]
    pub dapp_id: U256,

    /// Major version of the auction protocol.
    #[clap(long, env, default_value_t = window::protocol_version())]
    pub protocol_version: U256,

    /// Length of one auction window.
    #[clap(long, env, default_value = "30s", value_parser = humantime::parse_duration)]
    pub auction_length: Duration,

    /// Length of the bidding phase at the start of every window.
    #[clap(long, env, default_value = "25s", value_parser = humantime::parse_duration)]
    pub bidding_phase_length: Duration,

    /// Bids are not placed for a window whose bidding phase ends sooner than
    /// this.
    #[clap(long, env, default_value = "3s", value_parser = humantime::parse_duration)]
    pub bidding_phase_buffer: Duration,

    /// Most collateral the auction house may lock for the bid, in wei.
    #[clap(long, env, default_value_t = U256::MAX)]
    pub max_collateral: U256,

    /// Highest protocol fee the auction house may charge for the bid, in wei.
    #[clap(long, env, default_value_t = U256::MAX)]
    pub max_protocol_fee: U256,

    /// Pause between two status or event lookups.
    #[clap(long, env, default_value = "100ms", value_parser = humantime::parse_duration)]
    pub poll_interval: Duration,

    /// Longest pause after consecutive node errors.
    #[clap(long, env, default_value = "2s", value_parser = humantime::parse_duration)]
    pub retry_backoff_max: Duration,

    /// How many recent blocks are searched for auction house events.
    #[clap(long, env, default_value = "10")]
    pub event_lookback_blocks: u64,

    /// How long after its window closed the award of a bid is waited for.
    #[clap(long, env, default_value = "10s", value_parser = humantime::parse_duration)]
    pub award_grace: Duration,

    /// How long after reporting a fulfillment its confirmation is waited for.
    #[clap(long, env, default_value = "60s", value_parser = humantime::parse_duration)]
    pub confirmation_timeout: Duration,
}

fn ether(value: &str) -> Result<U256, UnitsError> {
    parse_ether(value)
}

// We have a custom Display implementation so that we can log the arguments on
// start up without leaking the private key.
impl Display for Args {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let Self {
            log,
            stderr_threshold,
            use_json_logs,
            auction_node_url,
            target_node_url,
            private_key: _,
            auction_house,
            feed_updater,
            api3_server,
            airseeker_registry,
            signed_api_url,
            http_timeout,
            bid_amount,
            dapi_name,
            dapp_id,
            protocol_version,
            auction_length,
            bidding_phase_length,
            bidding_phase_buffer,
            max_collateral,
            max_protocol_fee,
            poll_interval,
            retry_backoff_max,
            event_lookback_blocks,
            award_grace,
            confirmation_timeout,
        } = self;

        writeln!(f, "log: {log}")?;
        writeln!(f, "stderr_threshold: {stderr_threshold:?}")?;
        writeln!(f, "use_json_logs: {use_json_logs}")?;
        writeln!(f, "auction_node_url: {auction_node_url}")?;
        writeln!(f, "target_node_url: {target_node_url}")?;
        writeln!(f, "private_key: SECRET")?;
        writeln!(f, "auction_house: {auction_house}")?;
        writeln!(f, "feed_updater: {feed_updater}")?;
        writeln!(f, "api3_server: {api3_server}")?;
        writeln!(f, "airseeker_registry: {airseeker_registry}")?;
        writeln!(f, "signed_api_url: {signed_api_url}")?;
        writeln!(f, "http_timeout: {http_timeout:?}")?;
        writeln!(f, "bid_amount: {bid_amount} wei")?;
        writeln!(f, "dapi_name: {dapi_name}")?;
        writeln!(f, "dapp_id: {dapp_id}")?;
        writeln!(f, "protocol_version: {protocol_version}")?;
        writeln!(f, "auction_length: {auction_length:?}")?;
        writeln!(f, "bidding_phase_length: {bidding_phase_length:?}")?;
        writeln!(f, "bidding_phase_buffer: {bidding_phase_buffer:?}")?;
        writeln!(f, "max_collateral: {max_collateral}")?;
        writeln!(f, "max_protocol_fee: {max_protocol_fee}")?;
        writeln!(f, "poll_interval: {poll_interval:?}")?;
        writeln!(f, "retry_backoff_max: {retry_backoff_max:?}")?;
        writeln!(f, "event_lookback_blocks: {event_lookback_blocks}")?;
        writeln!(f, "award_grace: {award_grace:?}")?;
        writeln!(f, "confirmation_timeout: {confirmation_timeout:?}")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use {super::*, clap::Parser};

    const REQUIRED: [&str; 15] = [
        "bidder",
        "--auction-node-url",
        "http://localhost:8545",
        "--target-node-url",
        "http://localhost:8546",
        "--private-key",
        "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
        "--auction-house",
        "0x1111111111111111111111111111111111111111",
        "--feed-updater",
        "0x2222222222222222222222222222222222222222",
        "--api3-server",
        "0x3333333333333333333333333333333333333333",
        "--airseeker-registry",
        "0x4444444444444444444444444444444444444444",
    ];

    #[test]
    fn defaults() {
        let args = Args::try_parse_from(REQUIRED).unwrap();
        assert_eq!(args.bid_amount, U256::from(100_000_000_000_000u64));
        assert_eq!(args.auction_length, Duration::from_secs(30));
        assert_eq!(args.bidding_phase_length, Duration::from_secs(25));
        assert_eq!(args.bidding_phase_buffer, Duration::from_secs(3));
        assert_eq!(args.poll_interval, Duration::from_millis(100));
        assert_eq!(args.max_collateral, U256::MAX);
        assert_eq!(args.dapp_id, U256::from(1));
        assert_eq!(args.protocol_version, window::protocol_version());
        assert_eq!(args.dapi_name, "ETH/USD");
        assert_eq!(args.event_lookback_blocks, 10);
    }

    #[test]
    fn display_hides_private_key() {
        let args = Args::try_parse_from(REQUIRED).unwrap();
        let shown = args.to_string();
        assert!(shown.contains("private_key: SECRET"));
        assert!(!shown.contains("ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"));
    }

    #[test]
    fn parses_amounts_and_durations() {
        let args = Args::try_parse_from(
            REQUIRED
                .into_iter()
                .chain(["--bid-amount", "1.5", "--award-grace", "1m 30s"]),
        )
        .unwrap();
        assert_eq!(args.bid_amount, U256::from(1_500_000_000_000_000_000u128));
        assert_eq!(args.award_grace, Duration::from_secs(90));
    }
}
