// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::Mutex;
use url::Url;

use crate::config::SpotifyCredentials;
use crate::error::{AuthError, ShapeError};
use crate::http::{BasicCredentials, HttpClient};

const GRANT_CLIENT_CREDENTIALS: &str = "grant_type=client_credentials";

/// Tokens are refreshed this long before upstream says they expire
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Source of bearer tokens for the Web API
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String, AuthError>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<u64>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    refresh_at: Instant,
}

/// Client-credentials flow against the accounts service, with token caching
pub struct ClientCredentialsProvider<C: HttpClient> {
    client: C,
    credentials: SpotifyCredentials,
    token_url: Url,
    cached: Mutex<Option<CachedToken>>,
}

impl<C: HttpClient> ClientCredentialsProvider<C> {
    pub fn new(client: C, credentials: SpotifyCredentials, token_url: Url) -> Self {
        Self {
            client,
            credentials,
            token_url,
            cached: Mutex::new(None),
        }
    }

    async fn request_token(&self) -> Result<CachedToken, AuthError> {
        let basic = BasicCredentials {
            username: self.credentials.client_id.clone(),
            password: self.credentials.client_secret.clone(),
        };

        log::debug!("Requesting access token from {}", self.token_url);

        let response = self
            .client
            .post_form(&self.token_url, &basic, GRANT_CLIENT_CREDENTIALS)
            .await
            .map_err(|e| AuthError::RequestFailed {
                url: self.token_url.to_string(),
                source: e,
            })?;

        if !response.is_success() {
            return Err(AuthError::HttpStatus {
                url: self.token_url.to_string(),
                status: response.status,
            });
        }

        let parsed: TokenResponse =
            serde_json::from_slice(&response.body).map_err(ShapeError::from)?;
        let value = parsed
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or(ShapeError::MissingField("access_token"))?;

        let lifetime = Duration::from_secs(parsed.expires_in.unwrap_or(0));
        Ok(CachedToken {
            value,
            refresh_at: Instant::now() + lifetime.saturating_sub(EXPIRY_MARGIN),
        })
    }
}

#[async_trait]
impl<C: HttpClient> TokenProvider for ClientCredentialsProvider<C> {
    async fn access_token(&self) -> Result<String, AuthError> {
        if !self.credentials.is_complete() {
            return Err(AuthError::MissingCredentials);
        }

        // Held across the request so concurrent callers share one token fetch
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref()
            && Instant::now() < token.refresh_at
        {
            return Ok(token.value.clone());
        }

        *cached = None;
        let token = self.request_token().await.inspect_err(|e| {
            log::error!("Failed to fetch Spotify access token: {e}");
        })?;
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::http::HttpResponse;
    use bytes::Bytes;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone)]
    struct MockTokenClient {
        status: u16,
        body: &'static str,
        calls: Arc<AtomicUsize>,
        seen_auth: Arc<std::sync::Mutex<Vec<(String, String, String)>>>,
    }

    impl MockTokenClient {
        fn new(status: u16, body: &'static str) -> Self {
            Self {
                status,
                body,
                calls: Arc::new(AtomicUsize::new(0)),
                seen_auth: Arc::new(std::sync::Mutex::new(Vec::new())),
            }
        }
    }

    #[async_trait]
    impl HttpClient for MockTokenClient {
        async fn get_bearer(&self, _url: &Url, _token: &str) -> Result<HttpResponse, reqwest::Error> {
            unreachable!("token provider only posts")
        }

        async fn post_form(
            &self,
            _url: &Url,
            credentials: &BasicCredentials,
            form_body: &str,
        ) -> Result<HttpResponse, reqwest::Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen_auth.lock().unwrap().push((
                credentials.username.clone(),
                credentials.password.clone(),
                form_body.to_string(),
            ));
            Ok(HttpResponse {
                status: self.status,
                body: Bytes::from_static(self.body.as_bytes()),
            })
        }
    }

    fn credentials() -> SpotifyCredentials {
        SpotifyCredentials {
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
        }
    }

    fn token_url() -> Url {
        Url::parse("https://accounts.example.com/api/token").unwrap()
    }

    #[tokio::test]
    async fn fetches_token_with_basic_auth() {
        let client = MockTokenClient::new(200, r#"{"access_token":"tok-1","expires_in":3600}"#);
        let provider = ClientCredentialsProvider::new(client.clone(), credentials(), token_url());

        assert_eq!(provider.access_token().await.unwrap(), "tok-1");

        let seen = client.seen_auth.lock().unwrap();
        assert_eq!(
            seen[0],
            (
                "client".to_string(),
                "secret".to_string(),
                "grant_type=client_credentials".to_string()
            )
        );
    }

    #[tokio::test]
    async fn caches_token_until_expiry() {
        let client = MockTokenClient::new(200, r#"{"access_token":"tok-1","expires_in":3600}"#);
        let provider = ClientCredentialsProvider::new(client.clone(), credentials(), token_url());

        provider.access_token().await.unwrap();
        provider.access_token().await.unwrap();

        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn short_lived_tokens_are_refetched() {
        let client = MockTokenClient::new(200, r#"{"access_token":"tok-1","expires_in":30}"#);
        let provider = ClientCredentialsProvider::new(client.clone(), credentials(), token_url());

        provider.access_token().await.unwrap();
        provider.access_token().await.unwrap();

        assert_eq!(client.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn missing_access_token_is_a_shape_error() {
        let client = MockTokenClient::new(200, r#"{"token_type":"Bearer"}"#);
        let provider = ClientCredentialsProvider::new(client, credentials(), token_url());

        assert!(matches!(
            provider.access_token().await,
            Err(AuthError::Shape(ShapeError::MissingField("access_token")))
        ));
    }

    #[tokio::test]
    async fn http_error_status_is_reported() {
        let client = MockTokenClient::new(401, r#"{"error":"invalid_client"}"#);
        let provider = ClientCredentialsProvider::new(client, credentials(), token_url());

        assert!(matches!(
            provider.access_token().await,
            Err(AuthError::HttpStatus { status: 401, .. })
        ));
    }

    #[tokio::test]
    async fn incomplete_credentials_skip_the_request() {
        let client = MockTokenClient::new(200, r#"{"access_token":"tok-1"}"#);
        let provider = ClientCredentialsProvider::new(
            client.clone(),
            SpotifyCredentials::default(),
            token_url(),
        );

        assert!(matches!(
            provider.access_token().await,
            Err(AuthError::MissingCredentials)
        ));
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }
}
