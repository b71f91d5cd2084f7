use thiserror::Error;

/// Everything that can go wrong while resolving rain data.
///
/// None of these cross the [`RainSource`](crate::provider::RainSource) boundary:
/// providers log them and report "no data" so the resolver can fall back.
#[derive(Debug, Error)]
pub enum RainError {
    #[error("request to {url} failed with status {status}")]
    Transport { url: String, status: u16 },

    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("empty response body from {url}")]
    EmptyBody { url: String },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("unexpected response shape: {0}")]
    Schema(String),

    #[error("no '{0}' cookie in session portal response")]
    MissingSessionCookie(String),

    #[error("rain tier '{0}' has no legend entry")]
    LegendLookup(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl From<serde_json::Error> for RainError {
    fn from(err: serde_json::Error) -> Self {
        RainError::Parse(err.to_string())
    }
}

pub type Result<T, E = RainError> = std::result::Result<T, E>;
