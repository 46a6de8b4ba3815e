use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::config::ObservabilityConfig;

/// Installs the global subscriber. Logs go to stderr so stdout carries only the report.
pub fn init_tracing(environment: &str, config: &ObservabilityConfig) {
    let json = config.json_logs || environment == "production";

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_lowercase()));

    let result = if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_span_list(true)
                    .with_current_span(true)
                    .with_target(true)
                    .with_thread_ids(true),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .pretty()
                    .with_writer(std::io::stderr)
                    .with_span_events(FmtSpan::CLOSE)
                    .with_target(true),
            )
            .try_init()
    };

    if let Err(e) = result {
        eprintln!("Warning: Failed to set tracing subscriber: {}", e);
        return;
    }

    tracing::info!("Tracing initialized for environment: {}", environment);
}

pub fn stage_span(stage: &str) -> tracing::Span {
    tracing::debug_span!("sales_performance_stage", stage = stage)
}
