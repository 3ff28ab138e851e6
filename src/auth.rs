use async_trait::async_trait;
use base64::Engine;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::error::{Error, Result};

/// Supplies a bearer token for Spotify API calls.
///
/// Two interchangeable strategies exist: scraping the public embed page
/// (no credentials) and the OAuth client-credentials flow. Which one is
/// wired in depends on whether the config carries a client id and secret.
#[async_trait]
pub trait SpotifyAuthorization: Send + Sync {
    async fn get_token(&self) -> Result<String>;
}

/// Any public embed page works; the HTML ships a short-lived token.
const EMBED_URL: &str = "https://open.spotify.com/embed/track/3n3Ppam7vgaVa1iaRUc9Lp";

const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

static ACCESS_TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""accessToken"\s*:\s*"([^"\\]*(?:\\.[^"\\]*)*)""#).unwrap()
});

/// Token scraped from the Spotify embed page, no credentials required.
pub struct AnonymousAuth {
    client: reqwest::Client,
}

impl AnonymousAuth {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn scan_access_token(html: &str) -> Option<&str> {
    ACCESS_TOKEN_RE
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

#[async_trait]
impl SpotifyAuthorization for AnonymousAuth {
    async fn get_token(&self) -> Result<String> {
        let resp = self.client.get(EMBED_URL).send().await?;
        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::RateLimited);
        }
        if !status.is_success() {
            return Err(Error::AuthFailure(format!(
                "embed page returned HTTP {status}"
            )));
        }

        let html = resp.text().await?;
        scan_access_token(&html)
            .map(str::to_string)
            .ok_or_else(|| Error::AuthFailure("no accessToken in embed page".to_string()))
    }
}

/// Standard OAuth client-credentials flow.
pub struct ClientCredentialsAuth {
    client: reqwest::Client,
    client_id: String,
    client_secret: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl ClientCredentialsAuth {
    pub fn new(client: reqwest::Client, client_id: String, client_secret: String) -> Self {
        Self {
            client,
            client_id,
            client_secret,
        }
    }
}

#[async_trait]
impl SpotifyAuthorization for ClientCredentialsAuth {
    async fn get_token(&self) -> Result<String> {
        let credentials = format!("{}:{}", self.client_id, self.client_secret);
        let encoded = base64::engine::general_purpose::STANDARD.encode(credentials);

        let resp = self
            .client
            .post(TOKEN_URL)
            .header("Authorization", format!("Basic {encoded}"))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::RateLimited);
        }
        if !status.is_success() {
            return Err(Error::AuthFailure(format!(
                "token endpoint returned HTTP {status}, check client_id and client_secret"
            )));
        }

        let payload: TokenResponse = resp
            .json()
            .await
            .map_err(|e| Error::AuthFailure(format!("bad token response: {e}")))?;

        Ok(payload.access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_access_token_plain() {
        let html = r#"<script>{"accessToken":"BQDe3kX","isAnonymous":true}</script>"#;
        assert_eq!(scan_access_token(html), Some("BQDe3kX"));
    }

    #[test]
    fn test_scan_access_token_with_spaces() {
        let html = r#""accessToken" : "tok-123""#;
        assert_eq!(scan_access_token(html), Some("tok-123"));
    }

    #[test]
    fn test_scan_access_token_with_escapes() {
        let html = r#""accessToken":"ab\"cd\\ef""#;
        assert_eq!(scan_access_token(html), Some(r#"ab\"cd\\ef"#));
    }

    #[test]
    fn test_scan_access_token_absent() {
        assert_eq!(scan_access_token("<html>no token here</html>"), None);
    }

    /// Fetches a real token from the embed page. Needs network access.
    /// Run with: cargo test anonymous -- --ignored
    #[tokio::test]
    #[ignore]
    async fn test_anonymous_token_fetch() {
        let auth = AnonymousAuth::new(reqwest::Client::new());
        let token = auth.get_token().await.expect("token fetch failed");
        assert!(!token.is_empty());
    }
}
