use std::{env, sync::Once};

use metrics::{Unit, describe_counter};
use tracing::level_filters::LevelFilter;
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::application::cache::{
    METRIC_CACHE_DECODE_FAILED, METRIC_CACHE_HIT, METRIC_CACHE_INVALIDATE_FAILED,
    METRIC_CACHE_MISS, METRIC_CACHE_POPULATE_FAILED,
};
use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Driver crates that are chatty at `info`; capped at `warn` unless `RUST_LOG` names them.
const QUIET_TARGETS: &[&str] = &["mongodb=warn", "sqlx=warn", "redis=warn", "hyper=warn"];

/// Install the global subscriber: env filter, error spans, then JSON or compact output.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let output = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter(
            logging.level,
            env::var(EnvFilter::DEFAULT_ENV).ok().as_deref(),
        ))
        .with(ErrorLayer::default())
        .with(output)
        .try_init()
        .map_err(|err| InfraError::telemetry(format!("subscriber already installed: {err}")))
}

/// Build the filter from `logging.level` and the operator's `RUST_LOG`.
///
/// A quiet default applies only to driver targets `RUST_LOG` does not name.
fn env_filter(level: LevelFilter, rust_log: Option<&str>) -> EnvFilter {
    let rust_log = rust_log.unwrap_or_default();
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .parse_lossy(rust_log);

    let named: Vec<&str> = rust_log
        .split(',')
        .filter_map(|directive| {
            let target = directive.split(['=', '[']).next()?.trim();
            (!target.is_empty()).then_some(target)
        })
        .collect();

    QUIET_TARGETS
        .iter()
        .filter(|directive| {
            let target = directive.split('=').next().unwrap_or_default();
            !named.iter().any(|name| name.starts_with(target))
        })
        .filter_map(|directive| directive.parse().ok())
        .fold(filter, EnvFilter::add_directive)
}

/// Register descriptions for the cache counters with the installed recorder.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            METRIC_CACHE_HIT,
            Unit::Count,
            "Total number of reads served from the cache."
        );
        describe_counter!(
            METRIC_CACHE_MISS,
            Unit::Count,
            "Total number of reads that fell through to the backing store."
        );
        describe_counter!(
            METRIC_CACHE_DECODE_FAILED,
            Unit::Count,
            "Total number of cache entries discarded because they failed to decode."
        );
        describe_counter!(
            METRIC_CACHE_POPULATE_FAILED,
            Unit::Count,
            "Total number of failed best-effort cache writes."
        );
        describe_counter!(
            METRIC_CACHE_INVALIDATE_FAILED,
            Unit::Count,
            "Total number of failed best-effort cache deletes."
        );
    });
}
