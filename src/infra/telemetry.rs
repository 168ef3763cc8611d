use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "agora_cache_hit_total",
            Unit::Count,
            "Responses served from the response cache."
        );
        describe_counter!(
            "agora_cache_miss_total",
            Unit::Count,
            "Cacheable requests that ran the handler."
        );
        describe_counter!(
            "agora_cache_bypass_total",
            Unit::Count,
            "Requests passed through because the store was unavailable."
        );
        describe_counter!(
            "agora_cache_store_error_total",
            Unit::Count,
            "Failed key-value store operations on the request path."
        );
        describe_counter!(
            "agora_cache_purged_keys_total",
            Unit::Count,
            "Cached responses removed by invalidation."
        );
        describe_histogram!(
            "agora_cache_purge_ms",
            Unit::Milliseconds,
            "Invalidation latency per scope in milliseconds."
        );
    });
}
