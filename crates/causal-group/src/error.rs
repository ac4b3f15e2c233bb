use thiserror::Error;

/// Errors from the configuration and telemetry surfaces.
///
/// Coordination operations never return these: contention and protocol
/// violations are reported through `bool` results and log records.
#[derive(Error, Debug)]
pub enum CausalError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("telemetry setup failed: {0}")]
    Telemetry(String),
}

impl From<toml::de::Error> for CausalError {
    fn from(e: toml::de::Error) -> Self {
        CausalError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CausalError>;
