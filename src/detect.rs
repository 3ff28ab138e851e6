use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::error::{Error, Result};
use crate::models::{SourceInfo, SourcePlatform};

static SPOTIFY_TRACK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"open\.spotify\.com/track/([A-Za-z0-9]+)").unwrap());

static YANDEX_TRACK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"music\.yandex\.ru/album/(\d+)/track/(\d+)").unwrap());

/// Classify a raw query string as a Spotify or Yandex Music track link.
///
/// The input must parse as an absolute URL, but the track pattern may sit
/// anywhere inside it. Spotify is tried first; first match wins.
pub fn classify(input: &str) -> Result<SourceInfo> {
    Url::parse(input).map_err(|_| Error::InvalidInput)?;

    if let Some(caps) = SPOTIFY_TRACK_RE.captures(input) {
        return Ok(SourceInfo {
            platform: SourcePlatform::Spotify,
            id: caps[1].to_string(),
        });
    }

    if let Some(caps) = YANDEX_TRACK_RE.captures(input) {
        let album_id = &caps[1];
        let track_id = &caps[2];
        return Ok(SourceInfo {
            platform: SourcePlatform::YandexMusic,
            id: format!("{track_id}:{album_id}"),
        });
    }

    Err(Error::UnrecognizedSource)
}
