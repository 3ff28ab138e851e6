pub mod spotify;
pub mod yandex;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};
use crate::models::TrackInfo;

/// Streaming platform lookup/search API.
/// Spotify and Yandex Music both sit behind this trait; the mapper picks
/// one as the metadata source and the other as the search target.
#[async_trait]
pub trait MediaClient: Send + Sync {
    /// Fetch artist and title for a platform-specific track id.
    async fn get_track_info(&self, track_id: &str) -> Result<TrackInfo>;

    /// Search the platform for the given track and return a canonical
    /// track URL.
    async fn get_uri(&self, info: &TrackInfo) -> Result<String>;
}

/// Decode a success response body. A body that does not match the
/// expected shape is a lookup failure, not an upstream fault.
pub(crate) async fn decode<T: DeserializeOwned>(
    resp: reqwest::Response,
    what: &'static str,
) -> Result<T> {
    resp.json()
        .await
        .map_err(|e| Error::LookupFailure(format!("malformed {what} payload: {e}")))
}
