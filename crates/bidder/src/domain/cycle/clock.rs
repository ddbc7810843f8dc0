use {
    crate::domain::eth::Timestamp,
    std::time::Duration,
    tokio::time::Instant,
};

/// Pins a Unix timestamp to a monotonic instant so that the chain's notion of
/// time and local timeouts agree for the length of a cycle.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    unix: Timestamp,
    instant: Instant,
}

impl Clock {
    pub fn new(now: Timestamp) -> Self {
        Self {
            unix: now,
            instant: Instant::now(),
        }
    }

    pub fn now(&self) -> Timestamp {
        let elapsed = u32::try_from(self.instant.elapsed().as_secs()).unwrap_or(u32::MAX);
        self.unix.saturating_add(elapsed)
    }

    /// The instant at which the Unix clock reaches `at`.
    pub fn instant(&self, at: Timestamp) -> Instant {
        self.instant + Duration::from_secs(at.saturating_sub(self.unix).into())
    }
}
