//! Tracing subscriber setup.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::GroupConfig;
use crate::error::{CausalError, Result};

/// Install a global fmt subscriber filtered by `filter`.
///
/// Returns `Ok(false)` if a global subscriber was already installed.
pub fn init_tracing(filter: &str) -> Result<bool> {
    let filter = EnvFilter::try_new(filter).map_err(|e| CausalError::Telemetry(e.to_string()))?;

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init()
        .is_ok();
    Ok(installed)
}

/// Install the subscriber described by `config`.
pub fn init_from_config(config: &GroupConfig) -> Result<bool> {
    init_tracing(&config.log_filter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_not_an_error() {
        let _ = init_tracing("warn").unwrap();
        assert!(!init_tracing("debug").unwrap());
    }

    #[test]
    fn invalid_filter_is_rejected() {
        let err = init_tracing("causal_group=loud").unwrap_err();
        assert!(matches!(err, CausalError::Telemetry(_)));
    }

    #[test]
    fn init_from_config_uses_the_configured_filter() {
        let config = GroupConfig {
            log_filter: "causal_group=loud".into(),
            ..GroupConfig::default()
        };
        let err = init_from_config(&config).unwrap_err();
        assert!(matches!(err, CausalError::Telemetry(_)));

        let config = GroupConfig {
            log_filter: "causal_group=debug".into(),
            ..GroupConfig::default()
        };
        assert!(init_from_config(&config).is_ok());
    }
}
