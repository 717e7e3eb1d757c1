//! # Structured Logging
//!
//! Initializes the `tracing` subscriber with a pretty or JSON formatter and
//! `RUST_LOG` filtering. Output goes to stderr; stdout carries command
//! results so they can be piped.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::LogFormatArg;

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "algocred=info,algocred_protocol=info,tower_http=info";

/// Initialize the global tracing subscriber. Call once, early in `main()`.
///
/// `RUST_LOG` overrides `default_filter`, e.g.
///
/// ```text
/// RUST_LOG=algocred_protocol=debug,tower_http=debug
/// ```
pub fn init_logging(default_filter: &str, format: LogFormatArg) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    match format {
        LogFormatArg::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(true)
                        .with_file(true)
                        .with_line_number(true),
                )
                .init();
        }
        LogFormatArg::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr).with_target(true))
                .init();
        }
    }

    tracing::debug!(?format, "logging initialized");
}
