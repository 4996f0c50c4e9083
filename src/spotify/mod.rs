// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

mod auth;
mod episodes;
mod search;

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use crate::config::Environment;
use crate::error::{EpisodeFetchError, SearchError};
use crate::http::HttpClient;
use crate::model::PodcastDescriptor;

pub use auth::{ClientCredentialsProvider, TokenProvider};
pub use episodes::{
    EPISODE_PAGE_LIMIT, EpisodeItem, EpisodePage, ExternalUrls, fetch_episode_page,
    parse_episode_page,
};
pub use search::{SEARCH_RESULT_LIMIT, ShowItem, parse_search_response, search_podcasts};

#[derive(Debug, Clone, Deserialize)]
pub struct ImageObject {
    pub url: String,
}

/// Podcast search and episode listing, the two upstream calls the core needs
#[async_trait]
pub trait PodcastCatalog: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<PodcastDescriptor>, SearchError>;

    async fn episode_page(
        &self,
        podcast_id: &str,
        offset: usize,
    ) -> Result<EpisodePage, EpisodeFetchError>;
}

/// Web API catalog backed by an HTTP client and a token provider
pub struct SpotifyClient<C: HttpClient, T: TokenProvider> {
    client: C,
    tokens: T,
    api_base: Url,
}

impl<C: HttpClient, T: TokenProvider> SpotifyClient<C, T> {
    pub fn new(client: C, tokens: T, api_base: Url) -> Self {
        Self {
            client,
            tokens,
            api_base,
        }
    }
}

impl<C: HttpClient + Clone> SpotifyClient<C, ClientCredentialsProvider<C>> {
    /// Build a client using the client-credentials flow from the environment
    pub fn from_environment(client: C, env: &Environment) -> Self {
        let tokens = ClientCredentialsProvider::new(
            client.clone(),
            env.credentials.clone(),
            env.endpoints.token_url.clone(),
        );
        Self::new(client, tokens, env.endpoints.api_base.clone())
    }
}

#[async_trait]
impl<C: HttpClient, T: TokenProvider> PodcastCatalog for SpotifyClient<C, T> {
    async fn search(&self, query: &str) -> Result<Vec<PodcastDescriptor>, SearchError> {
        search_podcasts(&self.client, &self.tokens, &self.api_base, query).await
    }

    async fn episode_page(
        &self,
        podcast_id: &str,
        offset: usize,
    ) -> Result<EpisodePage, EpisodeFetchError> {
        fetch_episode_page(&self.client, &self.tokens, &self.api_base, podcast_id, offset).await
    }
}
