use std::fmt;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::models::TrackInfo;
use crate::sources::{decode, MediaClient};

const API_BASE: &str = "https://api.music.yandex.net";

/// Yandex Music public API client. No auth step.
pub struct YandexClient {
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct TrackResponse {
    result: Vec<TrackResult>,
}

#[derive(Deserialize)]
struct TrackResult {
    title: String,
    artists: Vec<YandexArtist>,
}

#[derive(Deserialize)]
struct YandexArtist {
    name: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    result: SearchResult,
}

#[derive(Deserialize)]
struct SearchResult {
    // Absent entirely when the query matches no tracks.
    tracks: Option<TrackMatches>,
}

#[derive(Deserialize)]
struct TrackMatches {
    results: Vec<SearchTrack>,
}

#[derive(Deserialize)]
struct SearchTrack {
    id: YandexId,
    albums: Vec<AlbumRef>,
}

#[derive(Deserialize)]
struct AlbumRef {
    id: YandexId,
}

/// Yandex serves ids as numbers for regular tracks and as strings for
/// user-uploaded ones.
#[derive(Deserialize)]
#[serde(untagged)]
enum YandexId {
    Number(u64),
    Text(String),
}

impl fmt::Display for YandexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            YandexId::Number(n) => write!(f, "{n}"),
            YandexId::Text(s) => write!(f, "{s}"),
        }
    }
}

impl YandexClient {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn track_info_from_payload(payload: TrackResponse) -> Result<TrackInfo> {
    let track = payload
        .result
        .into_iter()
        .next()
        .ok_or_else(|| Error::LookupFailure("yandex returned no track".to_string()))?;

    let artist = track
        .artists
        .into_iter()
        .next()
        .ok_or_else(|| Error::LookupFailure("yandex track has no artists".to_string()))?;

    Ok(TrackInfo {
        artist: artist.name,
        title: track.title,
    })
}

fn first_track_url(payload: SearchResponse, info: &TrackInfo) -> Result<String> {
    let track = payload
        .result
        .tracks
        .map(|t| t.results)
        .unwrap_or_default()
        .into_iter()
        .next()
        .ok_or_else(|| Error::LookupFailure(format!("no yandex match for {}", info.summary())))?;

    let album = track
        .albums
        .into_iter()
        .next()
        .ok_or_else(|| Error::LookupFailure("yandex match has no album".to_string()))?;

    Ok(format!(
        "https://music.yandex.ru/album/{}/track/{}",
        album.id, track.id
    ))
}

#[async_trait]
impl MediaClient for YandexClient {
    async fn get_track_info(&self, track_id: &str) -> Result<TrackInfo> {
        // The detector packs the id as "trackId:albumId"; the lookup path
        // only needs the track part.
        let track_part = track_id.split(':').next().unwrap_or(track_id);

        let url = format!("{API_BASE}/tracks/{track_part}");
        let resp = self.client.get(&url).send().await?.error_for_status()?;
        let payload: TrackResponse = decode(resp, "yandex track").await?;

        track_info_from_payload(payload)
    }

    async fn get_uri(&self, info: &TrackInfo) -> Result<String> {
        let text = format!("{} {}", info.title, info.artist);
        let url = format!("{API_BASE}/search");
        let resp = self
            .client
            .get(&url)
            .query(&[("text", text.as_str()), ("type", "track"), ("page", "0")])
            .send()
            .await?
            .error_for_status()?;
        let payload: SearchResponse = decode(resp, "yandex search").await?;

        first_track_url(payload, info)
    }
}
