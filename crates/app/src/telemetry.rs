use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LogSettings;

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
///
/// Logs go to stderr so they never interleave with the exam screen.
pub(crate) fn init_tracing(settings: &LogSettings) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.level.clone()));

    let builder = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if settings.json {
        builder
            .json()
            .try_init()
            .map_err(|err| err.to_string())?;
    } else {
        builder.try_init().map_err(|err| err.to_string())?;
    }

    Ok(())
}
