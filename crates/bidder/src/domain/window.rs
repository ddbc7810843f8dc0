//! Auction window arithmetic.
//!
//! Every dApp auctions its update rights in fixed, back-to-back windows of
//! `auction_length` seconds. Each window opens with a bidding phase of
//! `bidding_phase_length` seconds followed by the award phase. Windows of
//! different dApps are shifted against each other by a phase offset derived
//! from the dApp id, so that the auctioneer does not have to serve all of
//! them at the same instant.

use {
    super::eth::{Timestamp, U256, keccak256},
    std::time::Duration,
};

/// Timing of an auction lane. Only valid combinations can be
/// constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timing {
    dapp_id: U256,
    protocol_version: U256,
    auction_length: u32,
    bidding_phase_length: u32,
    bidding_phase_buffer: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidTiming {
    #[error("{name} of {value:?} is not a whole number of seconds that fits into 32 bits")]
    Seconds { name: &'static str, value: Duration },
    #[error(
        "bidding phase buffer ({buffer}s) must be shorter than the bidding phase ({bidding_phase}s)"
    )]
    BufferTooLong { buffer: u32, bidding_phase: u32 },
    #[error("bidding phase ({bidding_phase}s) must be shorter than the auction ({auction}s)")]
    BiddingPhaseTooLong { bidding_phase: u32, auction: u32 },
}

impl Timing {
    pub fn new(
        dapp_id: U256,
        protocol_version: U256,
        auction_length: Duration,
        bidding_phase_length: Duration,
        bidding_phase_buffer: Duration,
    ) -> Result<Self, InvalidTiming> {
        let auction_length = seconds("auction length", auction_length)?;
        let bidding_phase_length = seconds("bidding phase length", bidding_phase_length)?;
        let bidding_phase_buffer = seconds("bidding phase buffer", bidding_phase_buffer)?;
        if bidding_phase_buffer >= bidding_phase_length {
            return Err(InvalidTiming::BufferTooLong {
                buffer: bidding_phase_buffer,
                bidding_phase: bidding_phase_length,
            });
        }
        if bidding_phase_length >= auction_length {
            return Err(InvalidTiming::BiddingPhaseTooLong {
                bidding_phase: bidding_phase_length,
                auction: auction_length,
            });
        }
        Ok(Self {
            dapp_id,
            protocol_version,
            auction_length,
            bidding_phase_length,
            bidding_phase_buffer,
        })
    }

    pub fn dapp_id(&self) -> U256 {
        self.dapp_id
    }

    pub fn protocol_version(&self) -> U256 {
        self.protocol_version
    }

    /// Auction length in seconds.
    pub fn auction_length(&self) -> u32 {
        self.auction_length
    }

    /// Offset of this dApp's windows against the epoch, in `[0, auction_length)`.
    ///
    /// `keccak256(abi.encode(uint256 dappId)) % auctionLength`
    pub fn phase_offset(&self) -> u32 {
        let hash = keccak256(self.dapp_id.to_be_bytes::<32>());
        let offset = U256::from_be_bytes(hash.0) % U256::from(self.auction_length);
        offset.to::<u32>()
    }

    /// The window a bid created at `now` should target.
    ///
    /// This is the window currently in progress unless less than the bidding
    /// phase buffer remains of its bidding phase (or the bidding phase is
    /// already over), in which case it is the next one.
    pub fn window(&self, now: Timestamp) -> Window {
        let length = self.auction_length;
        let elapsed = (now + length - self.phase_offset()) % length;
        let mut start = now - elapsed;
        let remaining = (start + self.bidding_phase_length).checked_sub(now);
        if remaining.is_none_or(|remaining| remaining < self.bidding_phase_buffer) {
            start += length;
        }
        Window {
            auction_start: start,
            bidding_phase_end: start + self.bidding_phase_length,
            signed_data_cutoff: start + self.bidding_phase_length,
            next_window_start: start + length,
        }
    }
}

fn seconds(name: &'static str, value: Duration) -> Result<u32, InvalidTiming> {
    if value.subsec_nanos() != 0 {
        return Err(InvalidTiming::Seconds { name, value });
    }
    u32::try_from(value.as_secs()).map_err(|_| InvalidTiming::Seconds { name, value })
}

/// One auction window of a dApp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub auction_start: Timestamp,
    pub bidding_phase_end: Timestamp,
    /// Signed data used in the update must not be newer than this.
    pub signed_data_cutoff: Timestamp,
    pub next_window_start: Timestamp,
}

impl Window {
    /// Bids for this window expire at the end of the window following the
    /// cutoff. An award that shows up later is worthless.
    pub fn bid_expiry(&self) -> Timestamp {
        self.signed_data_cutoff + (self.next_window_start - self.auction_start)
    }
}

impl std::fmt::Display for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}, {}) cutoff {}",
            self.auction_start, self.next_window_start, self.signed_data_cutoff
        )
    }
}

/// Current protocol major version.
pub fn protocol_version() -> U256 {
    U256::from(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timing(dapp_id: u64) -> Timing {
        Timing::new(
            U256::from(dapp_id),
            protocol_version(),
            Duration::from_secs(30),
            Duration::from_secs(25),
            Duration::from_secs(3),
        )
        .unwrap()
    }

    #[test]
    fn phase_offsets() {
        assert_eq!(timing(0).phase_offset(), 27);
        assert_eq!(timing(1).phase_offset(), 18);
        assert_eq!(timing(2).phase_offset(), 2);
        assert_eq!(timing(3).phase_offset(), 23);
        assert_eq!(timing(5).phase_offset(), 0);
        assert_eq!(timing(8).phase_offset(), 17);
    }

    #[test]
    fn targets_current_window_while_bidding_is_open() {
        let window = timing(1).window(1000);
        assert_eq!(
            window,
            Window {
                auction_start: 978,
                bidding_phase_end: 1003,
                signed_data_cutoff: 1003,
                next_window_start: 1008,
            }
        );
        assert_eq!(window.bid_expiry(), 1033);
    }

    #[test]
    fn rolls_over_inside_buffer() {
        // 2 seconds left of the bidding phase, buffer is 3.
        let window = timing(8).window(1000);
        assert_eq!(window.auction_start, 1007);
        assert_eq!(window.signed_data_cutoff, 1032);
        assert_eq!(window.next_window_start, 1037);
        assert_eq!(window.bid_expiry(), 1062);

        let window = timing(1).window(1001);
        assert_eq!(window.auction_start, 1008);
        assert_eq!(window.signed_data_cutoff, 1033);
    }

    #[test]
    fn rolls_over_during_award_phase() {
        let window = timing(1).window(1005);
        assert_eq!(window.auction_start, 1008);
        assert_eq!(window.signed_data_cutoff, 1033);
    }

    #[test]
    fn rolls_over_after_bidding_ends_without_buffer() {
        let timing = Timing::new(
            U256::from(1),
            protocol_version(),
            Duration::from_secs(30),
            Duration::from_secs(25),
            Duration::ZERO,
        )
        .unwrap();
        assert_eq!(timing.window(1003).signed_data_cutoff, 1003);
        assert_eq!(timing.window(1004).signed_data_cutoff, 1033);
    }

    #[test]
    fn same_window_for_every_instant_of_a_bidding_phase() {
        let timing = timing(1);
        for now in 971..=1000 {
            assert_eq!(timing.window(now).signed_data_cutoff, 1003, "now = {now}");
        }
        assert_eq!(timing.window(970).signed_data_cutoff, 973);
    }

    #[test]
    fn window_invariants() {
        let timing = timing(3);
        for now in 1_700_000_000..1_700_000_090 {
            let window = timing.window(now);
            assert_eq!(window.bidding_phase_end, window.auction_start + 25);
            assert_eq!(window.signed_data_cutoff, window.bidding_phase_end);
            assert_eq!(window.next_window_start, window.auction_start + 30);
            assert!(window.bidding_phase_end >= now + 3);
        }
    }

    #[test]
    fn rejects_invalid_timing() {
        let make = |l, b, s| {
            Timing::new(
                U256::from(1),
                protocol_version(),
                Duration::from_secs(l),
                Duration::from_secs(b),
                Duration::from_secs(s),
            )
        };
        assert_eq!(
            make(30, 25, 25),
            Err(InvalidTiming::BufferTooLong {
                buffer: 25,
                bidding_phase: 25
            })
        );
        assert_eq!(
            make(30, 30, 3),
            Err(InvalidTiming::BiddingPhaseTooLong {
                bidding_phase: 30,
                auction: 30
            })
        );
        assert!(matches!(
            make(1 << 33, 25, 3),
            Err(InvalidTiming::Seconds { .. })
        ));
        assert!(matches!(
            Timing::new(
                U256::from(1),
                protocol_version(),
                Duration::from_millis(30_500),
                Duration::from_secs(25),
                Duration::from_secs(3),
            ),
            Err(InvalidTiming::Seconds { .. })
        ));
    }
}
