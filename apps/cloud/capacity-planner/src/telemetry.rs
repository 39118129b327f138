use crate::config::Environment;
use tracing::debug;
use tracing_subscriber::{EnvFilter, prelude::*};

/// Install color-eyre; repeated calls are ignored.
pub fn install_color_eyre() {
    let _ = color_eyre::config::HookBuilder::default()
        .display_location_section(true)
        .display_env_section(false)
        .install();
}

/// Initialize tracing with an ErrorLayer for span traces in error reports.
///
/// - Production (`APP_ENV=production`): JSON events, `warn` by default
/// - Development: pretty output, `info` by default
///
/// Logs go to stderr so stdout carries only the JSON report. `RUST_LOG`
/// overrides the default filter. Safe to call more than once.
pub fn init_tracing(environment: &Environment) {
    let is_production = environment.is_production();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if is_production {
            EnvFilter::new("warn")
        } else {
            EnvFilter::new("info,domain_sizing=debug")
        }
    });

    let result = if is_production {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .flatten_event(true),
            )
            .with(tracing_error::ErrorLayer::default())
            .with(filter)
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .pretty(),
            )
            .with(tracing_error::ErrorLayer::default())
            .with(filter)
            .try_init()
    };

    if result.is_err() {
        debug!("Tracing already initialized, skipping re-initialization");
    }
}
