// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use serde::Deserialize;
use url::Url;

use crate::error::{EpisodeFetchError, ShapeError};
use crate::http::HttpClient;

use super::ImageObject;
use super::auth::TokenProvider;

/// Page size requested from the show-episodes endpoint (upstream maximum)
pub const EPISODE_PAGE_LIMIT: usize = 50;

#[derive(Debug, Deserialize)]
struct EpisodesResponse {
    items: Option<Vec<Option<EpisodeItem>>>,
    next: Option<String>,
    total: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExternalUrls {
    pub spotify: Option<String>,
}

/// An episode as returned by the show-episodes endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct EpisodeItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub html_description: String,
    pub release_date: String,
    pub release_date_precision: String,
    #[serde(default)]
    pub duration_ms: u64,
    pub audio_preview_url: Option<String>,
    pub uri: Option<String>,
    #[serde(default)]
    pub external_urls: ExternalUrls,
    #[serde(default)]
    pub images: Vec<ImageObject>,
}

/// One page of episodes plus continuation metadata
#[derive(Debug, Clone)]
pub struct EpisodePage {
    pub items: Vec<EpisodeItem>,
    /// Number of slots in the page, including null entries
    pub page_len: usize,
    pub has_more: bool,
    pub total: Option<u32>,
}

impl EpisodePage {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            page_len: 0,
            has_more: false,
            total: Some(0),
        }
    }
}

pub(crate) fn episodes_url(
    api_base: &Url,
    podcast_id: &str,
    offset: usize,
    limit: usize,
) -> Result<Url, url::ParseError> {
    let mut url = api_base.clone();
    url.path_segments_mut()
        .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
        .pop_if_empty()
        .extend(["shows", podcast_id, "episodes"]);
    url.query_pairs_mut()
        .append_pair("limit", &limit.min(EPISODE_PAGE_LIMIT).to_string())
        .append_pair("offset", &offset.to_string());
    Ok(url)
}

/// Parse a show-episodes response body
pub fn parse_episode_page(body: &[u8]) -> Result<EpisodePage, ShapeError> {
    let response: EpisodesResponse = serde_json::from_slice(body)?;
    let slots = response.items.ok_or(ShapeError::MissingField("items"))?;
    let page_len = slots.len();

    Ok(EpisodePage {
        items: slots.into_iter().flatten().collect(),
        page_len,
        has_more: response.next.is_some(),
        total: response.total,
    })
}

/// Fetch one page of a show's episodes, newest first
pub async fn fetch_episode_page<C, T>(
    client: &C,
    tokens: &T,
    api_base: &Url,
    podcast_id: &str,
    offset: usize,
) -> Result<EpisodePage, EpisodeFetchError>
where
    C: HttpClient + ?Sized,
    T: TokenProvider + ?Sized,
{
    let token = tokens.access_token().await?;
    let url = episodes_url(api_base, podcast_id, offset, EPISODE_PAGE_LIMIT)?;

    log::debug!("GET {url}");

    let response = client
        .get_bearer(&url, &token)
        .await
        .map_err(|e| EpisodeFetchError::RequestFailed {
            podcast_id: podcast_id.to_string(),
            source: e,
        })?;

    if !response.is_success() {
        return Err(EpisodeFetchError::HttpStatus {
            podcast_id: podcast_id.to_string(),
            status: response.status,
        });
    }

    Ok(parse_episode_page(&response.body)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_PAGE: &str = r#"{
      "href": "https://api.spotify.com/v1/shows/abc/episodes?offset=0&limit=50",
      "limit": 50,
      "next": "https://api.spotify.com/v1/shows/abc/episodes?offset=50&limit=50",
      "offset": 0,
      "previous": null,
      "total": 120,
      "items": [
        {
          "id": "ep-1",
          "name": "Pilot",
          "description": "The first one",
          "html_description": "<p>The first one</p>",
          "release_date": "2024-03-01",
          "release_date_precision": "day",
          "duration_ms": 3600000,
          "audio_preview_url": "https://p.example.com/ep-1.mp3",
          "uri": "spotify:episode:ep-1",
          "external_urls": {"spotify": "https://open.spotify.com/episode/ep-1"},
          "images": [{"url": "https://i.example.com/ep-1.jpg", "height": 64, "width": 64}]
        },
        null
      ]
    }"#;

    #[test]
    fn episodes_url_has_show_path_and_paging() {
        let base = Url::parse("https://api.spotify.com/v1/").unwrap();
        let url = episodes_url(&base, "abc", 100, 80).unwrap();

        assert_eq!(url.path(), "/v1/shows/abc/episodes");
        assert_eq!(url.query(), Some("limit=50&offset=100"));
    }

    #[test]
    fn parse_page_reads_items_and_continuation() {
        let page = parse_episode_page(SAMPLE_PAGE.as_bytes()).unwrap();

        assert_eq!(page.items.len(), 1);
        assert_eq!(page.page_len, 2);
        assert!(page.has_more);
        assert_eq!(page.total, Some(120));

        let item = &page.items[0];
        assert_eq!(item.id, "ep-1");
        assert_eq!(item.duration_ms, 3_600_000);
        assert_eq!(
            item.external_urls.spotify.as_deref(),
            Some("https://open.spotify.com/episode/ep-1")
        );
    }

    #[test]
    fn last_page_has_no_more() {
        let page = parse_episode_page(br#"{"items": [], "next": null, "total": 0}"#).unwrap();
        assert!(!page.has_more);
        assert_eq!(page.page_len, 0);
    }

    #[test]
    fn missing_items_is_a_shape_error() {
        let result = parse_episode_page(br#"{"next": null}"#);
        assert!(matches!(result, Err(ShapeError::MissingField("items"))));
    }
}
