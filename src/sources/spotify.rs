use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::auth::SpotifyAuthorization;
use crate::error::{Error, Result};
use crate::models::TrackInfo;
use crate::sources::{decode, MediaClient};

const API_BASE: &str = "https://api.spotify.com/v1";

pub struct SpotifyClient {
    client: reqwest::Client,
    authorization: Box<dyn SpotifyAuthorization>,
    // Lazily filled, dropped on 401. The mutex also serializes refreshes
    // between concurrent in-flight queries.
    token: Mutex<Option<String>>,
}

#[derive(Deserialize)]
struct TrackResponse {
    name: String,
    artists: Vec<SpotifyArtist>,
}

#[derive(Deserialize)]
struct SpotifyArtist {
    name: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    tracks: TracksResult,
}

#[derive(Deserialize)]
struct TracksResult {
    items: Vec<SearchTrack>,
}

#[derive(Deserialize)]
struct SearchTrack {
    external_urls: ExternalUrls,
}

#[derive(Deserialize)]
struct ExternalUrls {
    spotify: String,
}

impl SpotifyClient {
    pub fn new(client: reqwest::Client, authorization: Box<dyn SpotifyAuthorization>) -> Self {
        Self {
            client,
            authorization,
            token: Mutex::new(None),
        }
    }

    async fn bearer(&self) -> Result<String> {
        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_ref() {
            return Ok(token.clone());
        }
        let token = self.authorization.get_token().await?;
        *guard = Some(token.clone());
        Ok(token)
    }

    async fn refresh(&self) -> Result<String> {
        let mut guard = self.token.lock().await;
        let token = self.authorization.get_token().await?;
        *guard = Some(token.clone());
        Ok(token)
    }

    /// Authorized GET with the single-retry-on-401 policy: a 401 discards
    /// the cached token, fetches a fresh one and retries exactly once; a
    /// second 401 propagates like any other upstream status.
    async fn get_authorized(&self, url: &str, query: &[(&str, &str)]) -> Result<reqwest::Response> {
        let token = self.bearer().await?;
        let resp = self
            .client
            .get(url)
            .query(query)
            .bearer_auth(&token)
            .send()
            .await?;

        if resp.status() != StatusCode::UNAUTHORIZED {
            return Ok(resp.error_for_status()?);
        }

        log::debug!("spotify returned 401, refreshing token");
        let token = self.refresh().await?;
        let resp = self
            .client
            .get(url)
            .query(query)
            .bearer_auth(&token)
            .send()
            .await?;

        Ok(resp.error_for_status()?)
    }
}

fn track_info_from_payload(payload: TrackResponse) -> Result<TrackInfo> {
    let artist = payload
        .artists
        .into_iter()
        .next()
        .ok_or_else(|| Error::LookupFailure("spotify track has no artists".to_string()))?;

    Ok(TrackInfo {
        artist: artist.name,
        title: payload.name,
    })
}

fn first_track_url(payload: SearchResponse, info: &TrackInfo) -> Result<String> {
    payload
        .tracks
        .items
        .into_iter()
        .next()
        .map(|track| track.external_urls.spotify)
        .ok_or_else(|| Error::LookupFailure(format!("no spotify match for {}", info.summary())))
}

#[async_trait]
impl MediaClient for SpotifyClient {
    async fn get_track_info(&self, track_id: &str) -> Result<TrackInfo> {
        let url = format!("{API_BASE}/tracks/{track_id}");
        let resp = self.get_authorized(&url, &[]).await?;
        let payload: TrackResponse = decode(resp, "spotify track").await?;
        track_info_from_payload(payload)
    }

    async fn get_uri(&self, info: &TrackInfo) -> Result<String> {
        let q = format!("track:{} artist:{}", info.title, info.artist);
        let url = format!("{API_BASE}/search");
        let resp = self
            .get_authorized(&url, &[("q", q.as_str()), ("type", "track"), ("limit", "1")])
            .await?;
        let payload: SearchResponse = decode(resp, "spotify search").await?;

        first_track_url(payload, info)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::sources::testing::serve_responses;

    /// Hands out a fresh token per call and counts how often it was asked.
    struct CountingAuth {
        issued: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl SpotifyAuthorization for CountingAuth {
        async fn get_token(&self) -> Result<String> {
            let n = self.issued.fetch_add(1, Ordering::SeqCst);
            Ok(format!("token-{n}"))
        }
    }

    fn counting_client(issued: &Arc<AtomicUsize>) -> SpotifyClient {
        SpotifyClient::new(
            reqwest::Client::new(),
            Box::new(CountingAuth {
                issued: issued.clone(),
            }),
        )
    }

    const TRACK_BODY: &str = r#"{"name":"One More Time","artists":[{"name":"Daft Punk"}]}"#;

    #[tokio::test]
    async fn test_401_refreshes_token_and_retries_exactly_once() {
        let (addr, served) =
            serve_responses(vec![("401 Unauthorized", "{}"), ("200 OK", TRACK_BODY)]).await;

        let issued = Arc::new(AtomicUsize::new(0));
        let client = counting_client(&issued);

        let url = format!("http://{addr}/tracks/abc");
        let resp = client
            .get_authorized(&url, &[])
            .await
            .expect("retried request should succeed");
        assert!(resp.status().is_success());

        // One lazy initial token plus one refresh, two requests on the wire.
        assert_eq!(issued.load(Ordering::SeqCst), 2);
        assert_eq!(served.load(Ordering::SeqCst), 2);

        let payload: TrackResponse = decode(resp, "spotify track").await.unwrap();
        let info = track_info_from_payload(payload).unwrap();
        assert_eq!(info.artist, "Daft Punk");
    }

    #[tokio::test]
    async fn test_second_consecutive_401_propagates_without_retry() {
        let (addr, served) =
            serve_responses(vec![("401 Unauthorized", "{}"), ("401 Unauthorized", "{}")]).await;

        let issued = Arc::new(AtomicUsize::new(0));
        let client = counting_client(&issued);

        let url = format!("http://{addr}/tracks/abc");
        let err = client
            .get_authorized(&url, &[])
            .await
            .expect_err("second 401 must fail");
        assert!(matches!(err, Error::Upstream(_)));

        // No refresh beyond the single retry.
        assert_eq!(issued.load(Ordering::SeqCst), 2);
        assert_eq!(served.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_success_without_401_keeps_cached_token() {
        let (addr, served) = serve_responses(vec![("200 OK", TRACK_BODY)]).await;

        let issued = Arc::new(AtomicUsize::new(0));
        let client = counting_client(&issued);

        let url = format!("http://{addr}/tracks/abc");
        client.get_authorized(&url, &[]).await.expect("request failed");

        assert_eq!(issued.load(Ordering::SeqCst), 1);
        assert_eq!(served.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_track_info_from_payload() {
        let payload: TrackResponse = serde_json::from_str(
            r#"{
                "name": "One More Time",
                "artists": [{"name": "Daft Punk"}, {"name": "Romanthony"}]
            }"#,
        )
        .unwrap();

        let info = track_info_from_payload(payload).unwrap();
        assert_eq!(info.artist, "Daft Punk");
        assert_eq!(info.title, "One More Time");
    }

    #[test]
    fn test_track_info_without_artists_is_lookup_failure() {
        let payload: TrackResponse =
            serde_json::from_str(r#"{"name": "Orphan", "artists": []}"#).unwrap();
        assert!(matches!(
            track_info_from_payload(payload),
            Err(Error::LookupFailure(_))
        ));
    }

    #[test]
    fn test_first_track_url() {
        let payload: SearchResponse = serde_json::from_str(
            r#"{
                "tracks": {
                    "items": [
                        {"external_urls": {"spotify": "https://open.spotify.com/track/abc"}},
                        {"external_urls": {"spotify": "https://open.spotify.com/track/def"}}
                    ]
                }
            }"#,
        )
        .unwrap();

        let info = TrackInfo {
            artist: "Daft Punk".to_string(),
            title: "One More Time".to_string(),
        };
        assert_eq!(
            first_track_url(payload, &info).unwrap(),
            "https://open.spotify.com/track/abc"
        );
    }

    #[test]
    fn test_empty_search_is_lookup_failure() {
        let payload: SearchResponse =
            serde_json::from_str(r#"{"tracks": {"items": []}}"#).unwrap();
        let info = TrackInfo {
            artist: "Nobody".to_string(),
            title: "Nothing".to_string(),
        };
        assert!(matches!(
            first_track_url(payload, &info),
            Err(Error::LookupFailure(_))
        ));
    }

    /// Full metadata lookup against the live API via the anonymous token.
    /// Needs network access; run with: cargo test spotify -- --ignored
    #[tokio::test]
    #[ignore]
    async fn test_get_track_info_live() {
        let http = reqwest::Client::new();
        let auth = Box::new(crate::auth::AnonymousAuth::new(http.clone()));
        let client = SpotifyClient::new(http, auth);

        let info = client
            .get_track_info("3n3Ppam7vgaVa1iaRUc9Lp")
            .await
            .expect("lookup failed");
        assert_eq!(info.artist, "The Killers");
        assert_eq!(info.title, "Mr. Brightside");
    }
}
