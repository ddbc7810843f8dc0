/// Metrics of the bidder.
#[derive(Debug, Clone, prometheus_metric_storage::MetricStorage)]
pub struct Metrics {
    /// Finished bid cycles by result and the phase they ended in.
    #[metric(labels("result", "phase"))]
    pub cycles: prometheus::IntCounterVec,
    /// Time spent in each phase of a bid cycle.
    #[metric(
        labels("phase"),
        buckets(0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 30.0, 45.0, 60.0, 90.0)
    )]
    pub phase_seconds: prometheus::HistogramVec,
    /// Transient node errors that were retried, by poll loop.
    #[metric(labels("probe"))]
    pub retries: prometheus::IntCounterVec,
    /// Signed API sources that could not be used.
    pub failed_sources: prometheus::IntCounter,
}

/// Get the metrics instance.
pub fn get() -> &'static Metrics {
    Metrics::instance(observe::metrics::get_storage_registry())
        .expect("unexpected error getting metrics instance")
}
