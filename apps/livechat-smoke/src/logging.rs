//! Tracing bootstrap for the smoke harness.

use std::env;

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,livechat_smoke=debug,livechat_runtime=debug";

/// Filter sources, highest precedence first.
const FILTER_KEYS: [&str; 3] = ["RUST_LOG", "LIVECHAT_SMOKE_LOG", "LIVECHAT_LOG"];

/// Install the global subscriber.
///
/// Blank or unparsable values fall through to the next key, then to the
/// internal default filter.
pub fn init() {
    let env_filter = filter_from_lookup(|key| env::var(key).ok());
    let _ = tracing_subscriber::fmt()
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_env_filter(env_filter)
        .try_init();
}

fn filter_from_lookup<F>(mut lookup: F) -> EnvFilter
where
    F: FnMut(&str) -> Option<String>,
{
    FILTER_KEYS
        .into_iter()
        .filter_map(|key| lookup(key).filter(|value| !value.trim().is_empty()))
        .find_map(|value| EnvFilter::try_new(value).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}
