use std::sync::Once;

/// Filter used when neither the config nor `RUST_LOG` provides one.
///
/// wgpu and naga are chatty at `info`; keep them at `warn`.
pub const DEFAULT_FILTER: &str = "info,wgpu_core=warn,wgpu_hal=warn,naga=warn";

/// Logger configuration.
///
/// `env_filter` follows the `env_logger` filter syntax (e.g. "info", "warn",
/// "quadgrid_engine=debug,wgpu=warn").
///
/// `write_style` controls ANSI coloring behavior.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub write_style: env_logger::WriteStyle,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            write_style: env_logger::WriteStyle::Auto,
        }
    }
}

/// Picks the filter string: explicit config first, then `RUST_LOG`, then
/// [`DEFAULT_FILTER`].
fn resolve_filter(config: Option<String>, env: Option<String>) -> String {
    let usable = |f: &String| !f.trim().is_empty();
    config
        .filter(usable)
        .or_else(|| env.filter(usable))
        .unwrap_or_else(|| DEFAULT_FILTER.to_string())
}

static INIT: Once = Once::new();

/// Initializes the global logger once.
///
/// This function is idempotent; subsequent calls are ignored.
/// Intended usage is early in `main`.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let filter = resolve_filter(config.env_filter, std::env::var("RUST_LOG").ok());

        let mut builder = env_logger::Builder::new();
        builder.parse_filters(&filter);
        builder.write_style(config.write_style);
        builder.format_timestamp_millis();

        // Another logger may already be installed (tests, embedding).
        if builder.try_init().is_err() {
            return;
        }

        log::debug!("logging initialized with filter {filter:?}");
    });
}
