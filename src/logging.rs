use anyhow::{Result, anyhow};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

/// Install the global subscriber. `RUST_LOG` wins over `--verbose`, which
/// wins over the configured level.
pub fn init(config: &Config) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter_directive(config)))
        .map_err(|e| anyhow!("Invalid log level `{}`: {e}", config.log_level))?;

    let fmt_layer = fmt::layer()
        .compact()
        .with_target(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "logging ready");
    Ok(())
}

fn filter_directive(config: &Config) -> &str {
    if config.verbose { "debug" } else { config.log_level.as_str() }
}

/// Log the settings a run ended up with, and anything odd about them.
pub fn log_config(config: &Config) {
    for warning in config.warnings() {
        tracing::warn!("{warning}");
    }
    tracing::debug!(
        javac = %config.javac.display(),
        jar = %config.jar.display(),
        catalog = ?config.catalog,
        library = ?config.library,
        keep_java = config.keep_java,
        keep_classes = config.keep_classes,
        "configuration resolved"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_directive() {
        let mut config = Config::default();
        assert_eq!(filter_directive(&config), "warn");
        config.verbose = true;
        assert_eq!(filter_directive(&config), "debug");
    }
}
