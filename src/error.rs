use thiserror::Error;

/// Why one exchange produced no data this cycle. Never escapes `ExchangeAdapter::poll`.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {0}")]
    Status(reqwest::StatusCode),

    #[error("malformed payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("exchange reported an error: {0}")]
    Exchange(String),
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error(transparent)]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
