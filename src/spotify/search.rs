// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use serde::Deserialize;
use url::Url;

use crate::error::{SearchError, ShapeError};
use crate::http::HttpClient;
use crate::model::PodcastDescriptor;

use super::ImageObject;
use super::auth::TokenProvider;

/// Maximum number of shows requested per search
pub const SEARCH_RESULT_LIMIT: u32 = 20;

#[derive(Debug, Deserialize)]
struct ShowSearchResponse {
    shows: Option<ShowPage>,
}

#[derive(Debug, Deserialize)]
struct ShowPage {
    items: Option<Vec<Option<ShowItem>>>,
}

/// A show as returned by the search endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ShowItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub publisher: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub images: Vec<ImageObject>,
    #[serde(default)]
    pub total_episodes: u32,
    pub uri: Option<String>,
}

impl From<ShowItem> for PodcastDescriptor {
    fn from(show: ShowItem) -> Self {
        Self {
            image_url: show.images.into_iter().next().map(|img| img.url),
            id: show.id,
            name: show.name,
            publisher: show.publisher,
            description: show.description,
            uri: show.uri,
            total_episodes: show.total_episodes,
        }
    }
}

pub(crate) fn search_url(api_base: &Url, query: &str) -> Result<Url, url::ParseError> {
    let mut url = api_base.join("search")?;
    url.query_pairs_mut()
        .append_pair("q", query)
        .append_pair("type", "show")
        .append_pair("limit", &SEARCH_RESULT_LIMIT.to_string());
    Ok(url)
}

/// Parse a search response body into podcast descriptors
pub fn parse_search_response(body: &[u8]) -> Result<Vec<PodcastDescriptor>, ShapeError> {
    let response: ShowSearchResponse = serde_json::from_slice(body)?;
    let items = response
        .shows
        .and_then(|page| page.items)
        .ok_or(ShapeError::MissingField("shows.items"))?;

    Ok(items.into_iter().flatten().map(Into::into).collect())
}

/// Search shows matching a free-text query
pub async fn search_podcasts<C, T>(
    client: &C,
    tokens: &T,
    api_base: &Url,
    query: &str,
) -> Result<Vec<PodcastDescriptor>, SearchError>
where
    C: HttpClient + ?Sized,
    T: TokenProvider + ?Sized,
{
    let token = tokens.access_token().await?;
    let url = search_url(api_base, query)?;

    log::debug!("GET {url}");

    let response = client
        .get_bearer(&url, &token)
        .await
        .map_err(|e| SearchError::RequestFailed {
            query: query.to_string(),
            source: e,
        })?;

    if !response.is_success() {
        return Err(SearchError::HttpStatus {
            query: query.to_string(),
            status: response.status,
        });
    }

    let podcasts = parse_search_response(&response.body)?;
    log::debug!("Search for '{query}' returned {} podcasts", podcasts.len());
    Ok(podcasts)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RESPONSE: &str = r#"{
      "shows": {
        "href": "https://api.spotify.com/v1/search?query=rust&type=show",
        "limit": 20,
        "next": null,
        "offset": 0,
        "total": 2,
        "items": [
          {
            "id": "show-1",
            "name": "Rustacean Station",
            "publisher": "Rustacean Station",
            "description": "Rust news and interviews",
            "images": [{"url": "https://i.example.com/640.jpg", "height": 640, "width": 640}],
            "total_episodes": 150,
            "uri": "spotify:show:show-1",
            "type": "show"
          },
          null,
          {
            "id": "show-2",
            "name": "New Rustacean",
            "images": []
          }
        ]
      }
    }"#;

    #[test]
    fn search_url_encodes_query() {
        let base = Url::parse("https://api.spotify.com/v1/").unwrap();
        let url = search_url(&base, "rust & friends").unwrap();

        assert_eq!(url.path(), "/v1/search");
        let pairs: Vec<_> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("q".to_string(), "rust & friends".to_string()),
                ("type".to_string(), "show".to_string()),
                ("limit".to_string(), "20".to_string()),
            ]
        );
    }

    #[test]
    fn parse_extracts_descriptors_and_skips_nulls() {
        let podcasts = parse_search_response(SAMPLE_RESPONSE.as_bytes()).unwrap();

        assert_eq!(podcasts.len(), 2);
        assert_eq!(podcasts[0].id, "show-1");
        assert_eq!(podcasts[0].publisher, "Rustacean Station");
        assert_eq!(podcasts[0].total_episodes, 150);
        assert_eq!(
            podcasts[0].image_url.as_deref(),
            Some("https://i.example.com/640.jpg")
        );

        assert_eq!(podcasts[1].name, "New Rustacean");
        assert!(podcasts[1].image_url.is_none());
        assert_eq!(podcasts[1].total_episodes, 0);
    }

    #[test]
    fn parse_requires_show_items() {
        let result = parse_search_response(br#"{"episodes": {"items": []}}"#);
        assert!(matches!(result, Err(ShapeError::MissingField("shows.items"))));
    }
}
