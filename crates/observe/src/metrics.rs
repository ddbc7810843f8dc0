//! Process wide prometheus registry. Components register their metric
//! storages with it, binaries decide whether and how to render it.

use {prometheus_metric_storage::StorageRegistry, std::sync::OnceLock};

static REGISTRY: OnceLock<StorageRegistry> = OnceLock::new();

/// Installs a registry that prefixes every metric name with `prefix`.
///
/// Returns `false` if the registry was already in use, in which case the
/// prefix is not applied. Call it first thing in `main`.
pub fn setup_registry(prefix: &str) -> bool {
    let Ok(registry) = prometheus::Registry::new_custom(Some(prefix.to_owned()), None) else {
        return false;
    };
    REGISTRY.set(StorageRegistry::new(registry)).is_ok()
}

/// The metric storage registry. Falls back to an unprefixed registry if
/// [`setup_registry`] was never called, which is what unit tests rely on.
pub fn get_storage_registry() -> &'static StorageRegistry {
    REGISTRY.get_or_init(StorageRegistry::default)
}

pub fn get_registry() -> &'static prometheus::Registry {
    get_storage_registry().registry()
}

/// Renders every registered metric in the prometheus text format.
pub fn encode() -> Result<String, prometheus::Error> {
    use prometheus::Encoder;

    let mut buffer = Vec::new();
    prometheus::TextEncoder::new().encode(&get_registry().gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|err| prometheus::Error::Msg(err.to_string()))
}
