//! # Structured Logging
//!
//! One subscriber for every subcommand. The format comes from
//! `--log-format` / `SPEND_ATTEST_LOG_FORMAT`; the filter from `RUST_LOG`,
//! falling back to [`DEFAULT_FILTER`].
//!
//! Logs go to stderr. `attest`, `verify`, `summary` and `typed-data` print
//! their JSON on stdout, and piping that into another tool must not pick
//! up log lines.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset: our two crates at info, and the
/// per-request spans from the HTTP trace layer.
pub const DEFAULT_FILTER: &str = "spend_attest_node=info,spend_attest=info,tower_http=debug";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines with source locations, for a terminal.
    Pretty,
    /// One JSON object per event, for `serve` behind a log shipper.
    Json,
}

impl LogFormat {
    /// `"json"` in any case selects [`LogFormat::Json`]; anything else is
    /// [`LogFormat::Pretty`], so a typo never stops the binary from starting.
    pub fn from_str_lossy(s: &str) -> Self {
        if s.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }
}

/// Install the global subscriber. Call once, first thing in `main()`; a
/// second call panics.
///
/// `RUST_LOG` wins over `default_filter` when set, e.g.
/// `RUST_LOG=spend_attest=debug` to see every derived commitment root.
pub fn init_logging(default_filter: &str, format: LogFormat) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let registry = tracing_subscriber::registry().with(env_filter);

    match format {
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_file(true)
                    .with_line_number(true),
            )
            .init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }

    tracing::debug!(?format, "logging initialized");
}
