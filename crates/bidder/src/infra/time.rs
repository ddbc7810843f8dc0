use {crate::domain::eth::Timestamp, std::time::SystemTime};

/// Current Unix time in whole seconds.
pub fn now() -> Timestamp {
    let seconds = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default();
    Timestamp::try_from(seconds).unwrap_or(Timestamp::MAX)
}
