// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use url::Url;

/// HTTP response with status and the fully buffered body
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body
    pub body: Bytes,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Username/password pair sent as HTTP Basic authorization
#[derive(Debug, Clone)]
pub struct BasicCredentials {
    pub username: String,
    pub password: String,
}

/// HTTP client abstraction for testability
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// GET a URL with `Authorization: Bearer {token}`
    async fn get_bearer(&self, url: &Url, token: &str) -> Result<HttpResponse, reqwest::Error>;

    /// POST an url-encoded form body with Basic authorization
    async fn post_form(
        &self,
        url: &Url,
        credentials: &BasicCredentials,
        form_body: &str,
    ) -> Result<HttpResponse, reqwest::Error>;
}

/// Default HTTP client implementation using reqwest
#[derive(Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Create a new ReqwestClient with default settings
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Create a new ReqwestClient with a custom reqwest::Client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn bearer_request(&self, url: &Url, token: &str) -> reqwest::RequestBuilder {
        self.client
            .get(url.clone())
            .header(AUTHORIZATION, format!("Bearer {token}"))
    }

    fn form_request(
        &self,
        url: &Url,
        credentials: &BasicCredentials,
        form_body: &str,
    ) -> reqwest::RequestBuilder {
        self.client
            .post(url.clone())
            .basic_auth(&credentials.username, Some(&credentials.password))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(form_body.to_string())
    }

    async fn buffer(response: reqwest::Response) -> Result<HttpResponse, reqwest::Error> {
        let status = response.status().as_u16();
        let body = response.bytes().await?;
        Ok(HttpResponse { status, body })
    }
}

impl Default for ReqwestClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get_bearer(&self, url: &Url, token: &str) -> Result<HttpResponse, reqwest::Error> {
        let response = self.bearer_request(url, token).send().await?;
        Self::buffer(response).await
    }

    async fn post_form(
        &self,
        url: &Url,
        credentials: &BasicCredentials,
        form_body: &str,
    ) -> Result<HttpResponse, reqwest::Error> {
        let response = self
            .form_request(url, credentials, form_body)
            .send()
            .await?;
        Self::buffer(response).await
    }
}
