use {
    crate::{domain::chain, infra::observe},
    std::time::Duration,
    tokio::time::Instant,
    tokio_util::sync::CancellationToken,
};

#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// Pause between probes that found nothing yet.
    pub interval: Duration,
    /// Upper bound of the backoff after failed probes.
    pub max_backoff: Duration,
}

/// Why a poll loop stopped before finding what it was looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupted {
    Cancelled,
    Deadline,
}

/// Paces a poll loop. The loop itself belongs to the caller:
///
/// ```text
/// loop {
///     poller.check()?;
///     match probe().await {
///         Ok(Some(found)) => return Ok(found),
///         Ok(None) => poller.idle().await?,
///         Err(err) if err.is_transient() => poller.retry(&err).await?,
///         Err(err) => return Err(err),
///     }
/// }
/// ```
#[derive(Debug)]
pub struct Poller {
    probe: &'static str,
    config: Config,
    deadline: Instant,
    cancel: CancellationToken,
    backoff: Duration,
}

impl Poller {
    pub fn new(
        probe: &'static str,
        config: Config,
        deadline: Instant,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            probe,
            config,
            deadline,
            cancel,
            backoff: config.interval,
        }
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Fails once the loop was cancelled or ran past its deadline.
    pub fn check(&self) -> Result<(), Interrupted> {
        if self.cancel.is_cancelled() {
            return Err(Interrupted::Cancelled);
        }
        if Instant::now() >= self.deadline {
            return Err(Interrupted::Deadline);
        }
        Ok(())
    }

    /// Waits one interval after a probe that found nothing.
    pub async fn idle(&mut self) -> Result<(), Interrupted> {
        self.backoff = self.config.interval;
        self.sleep(self.config.interval).await
    }

    /// Waits after a transient failure. Every consecutive failure doubles the
    /// wait up to the configured maximum.
    pub async fn retry(&mut self, err: &chain::Error) -> Result<(), Interrupted> {
        let delay = self.backoff;
        self.backoff = (self.backoff * 2).min(self.config.max_backoff);
        observe::retrying(self.probe, err, delay);
        self.sleep(delay).await
    }

    async fn sleep(&self, duration: Duration) -> Result<(), Interrupted> {
        let wake = (Instant::now() + duration).min(self.deadline);
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Interrupted::Cancelled),
            _ = tokio::time::sleep_until(wake) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn poller(deadline: Duration, cancel: CancellationToken) -> Poller {
        Poller::new(
            "test",
            Config {
                interval: Duration::from_millis(100),
                max_backoff: Duration::from_millis(350),
            },
            Instant::now() + deadline,
            cancel,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn backs_off_exponentially_up_to_maximum() {
        let mut poller = poller(Duration::from_secs(10), CancellationToken::new());
        let err = chain::Error::Node("connection reset".to_string());
        let mut delays = vec![];
        for _ in 0..4 {
            let before = Instant::now();
            poller.retry(&err).await.unwrap();
            delays.push(Instant::now() - before);
        }
        assert_eq!(
            delays,
            [100, 200, 350, 350].map(Duration::from_millis).to_vec()
        );

        // A successful probe resets the backoff.
        poller.idle().await.unwrap();
        let before = Instant::now();
        poller.retry(&err).await.unwrap();
        assert_eq!(Instant::now() - before, Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn stops_at_deadline() {
        let mut poller = poller(Duration::from_millis(250), CancellationToken::new());
        let mut probes = 0;
        let interrupted = loop {
            if let Err(interrupted) = poller.check() {
                break interrupted;
            }
            probes += 1;
            poller.idle().await.unwrap();
        };
        assert_eq!(interrupted, Interrupted::Deadline);
        assert_eq!(probes, 3);
        assert_eq!(Instant::now(), poller.deadline());
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_sleep() {
        let cancel = CancellationToken::new();
        let mut poller = poller(Duration::from_secs(10), cancel.clone());
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            cancel.cancel();
        });
        let started = Instant::now();
        assert_eq!(poller.idle().await, Err(Interrupted::Cancelled));
        assert_eq!(Instant::now() - started, Duration::from_millis(50));
        assert_eq!(poller.check(), Err(Interrupted::Cancelled));
    }
}
