//! Process-wide tracing setup shared by neuroscan services.

use anyhow::Result;
use once_cell::sync::OnceCell;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static TRACING_INIT: OnceCell<()> = OnceCell::new();

/// Env switch selecting flattened JSON log lines instead of the human format.
pub const JSON_LOG_ENV: &str = "NEUROSCAN_JSON_LOG";

fn json_logs_enabled() -> bool {
    std::env::var(JSON_LOG_ENV)
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Install the global subscriber. Safe to call more than once; later calls are no-ops.
pub fn init_tracing(service: &str) -> Result<()> {
    TRACING_INIT.get_or_try_init(|| -> Result<()> {
        let fmt_layer = if json_logs_enabled() {
            fmt::layer()
                .json()
                .flatten_event(true)
                .with_current_span(true)
                .with_span_list(false)
                .boxed()
        } else {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_line_number(true)
                .boxed()
        };
        let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        tracing_subscriber::registry().with(fmt_layer).with(env_filter).try_init()?;
        Ok(())
    })?;
    info!(service, "tracing initialized");
    Ok(())
}
