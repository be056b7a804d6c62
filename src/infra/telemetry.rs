use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::{
    application::{
        fetcher::METRIC_BRANCH_FETCH_FAILURES,
        posts::{METRIC_POST_CACHE_HIT, METRIC_POST_CACHE_MISS},
    },
    config::{LogFormat, LoggingSettings},
};

use super::{
    error::InfraError,
    notion::{METRIC_NOTION_REQUEST_FAILURES, METRIC_NOTION_REQUEST_MS, METRIC_NOTION_REQUESTS},
};

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
            METRIC_NOTION_REQUESTS,
            Unit::Count,
            "Total number of requests sent to the Notion API."
        );
        describe_counter!(
            METRIC_NOTION_REQUEST_FAILURES,
            Unit::Count,
            "Total number of Notion API requests that failed or returned an error status."
        );
        describe_histogram!(
            METRIC_NOTION_REQUEST_MS,
            Unit::Milliseconds,
            "Notion API request latency in milliseconds."
        );
        describe_counter!(
            METRIC_BRANCH_FETCH_FAILURES,
            Unit::Count,
            "Total number of container blocks whose children could not be fetched."
        );
        describe_counter!(
            METRIC_POST_CACHE_HIT,
            Unit::Count,
            "Total number of post lookups served from the cache."
        );
        describe_counter!(
            METRIC_POST_CACHE_MISS,
            Unit::Count,
            "Total number of post lookups that went to Notion."
        );
    });
}
