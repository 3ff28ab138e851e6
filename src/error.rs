use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while mapping a track link.
/// The mapper collapses these into user-facing notices; nothing here
/// ever reaches a chat as a raw message.
#[derive(Debug, Error)]
pub enum Error {
    #[error("input is not a valid URL")]
    InvalidInput,

    #[error("URL matches no known track link format")]
    UnrecognizedSource,

    #[error("spotify authorization failed: {0}")]
    AuthFailure(String),

    #[error("lookup failed: {0}")]
    LookupFailure(String),

    #[error("rate limited by an upstream API")]
    RateLimited,

    #[error("upstream error: {0}")]
    Upstream(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        // 429 gets its own variant so the mapper can show a dedicated
        // notice, for both platforms alike.
        if err.status() == Some(StatusCode::TOO_MANY_REQUESTS) {
            Error::RateLimited
        } else {
            Error::Upstream(err.to_string())
        }
    }
}
