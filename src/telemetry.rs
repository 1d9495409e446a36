//! Structured logging setup.
//!
//! Diagnostics go to stderr through `tracing`; stdout stays reserved for
//! machine-readable output. `LABBOX_LAUNCHER_LOG` takes an env-filter directive
//! and wins over `--verbose`.

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;

static INIT: OnceCell<()> = OnceCell::new();

pub const LOG_ENV: &str = "LABBOX_LAUNCHER_LOG";

fn filter_for(verbose: bool) -> EnvFilter {
    let fallback = if verbose { "labbox_launcher=debug" } else { "warn" };
    match std::env::var(LOG_ENV) {
        Ok(v) if !v.trim().is_empty() => {
            EnvFilter::try_new(v.trim()).unwrap_or_else(|_| EnvFilter::new(fallback))
        }
        _ => EnvFilter::new(fallback),
    }
}

/// Install the global subscriber once; later calls are no-ops.
pub fn telemetry_init(verbose: bool) {
    INIT.get_or_init(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter_for(verbose))
            .with_writer(std::io::stderr)
            .with_target(false)
            .without_time()
            .with_ansi(crate::color_enabled_stderr())
            .try_init();
    });
}
