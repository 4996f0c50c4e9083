// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised when an upstream response does not have the expected shape
#[derive(Error, Debug)]
pub enum ShapeError {
    #[error("Failed to parse response JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Response is missing expected field `{0}`")]
    MissingField(&'static str),

    #[error("Failed to parse release date '{value}' with precision {precision}")]
    InvalidReleaseDate { value: String, precision: String },
}

/// Errors that can occur while obtaining an access token
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Spotify client id or secret is not configured")]
    MissingCredentials,

    #[error("Token request to {url} failed: {source}")]
    RequestFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Token request to {url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("Invalid token response: {0}")]
    Shape(#[from] ShapeError),
}

/// Errors that can occur when searching for podcasts
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("Search request for '{query}' failed: {source}")]
    RequestFailed {
        query: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Search request for '{query}' returned HTTP {status}")]
    HttpStatus { query: String, status: u16 },

    #[error("Invalid search response: {0}")]
    Shape(#[from] ShapeError),

    #[error("Invalid search URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Errors that can occur when fetching a page of episodes for one podcast
#[derive(Error, Debug)]
pub enum EpisodeFetchError {
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("Episode request for podcast {podcast_id} failed: {source}")]
    RequestFailed {
        podcast_id: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Episode request for podcast {podcast_id} returned HTTP {status}")]
    HttpStatus { podcast_id: String, status: u16 },

    #[error("Invalid episode response: {0}")]
    Shape(#[from] ShapeError),

    #[error("Invalid episode URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Errors raised while resolving configuration at startup
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing configuration value {0}")]
    MissingValue(&'static str),

    #[error("Unknown app environment '{0}' (expected development, production or local)")]
    InvalidAppEnv(String),

    #[error("Failed to read runtime config {path}: {source}")]
    RuntimeConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse runtime config {path}: {source}")]
    RuntimeConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Selection cap {cap} exceeds palette size {palette}")]
    PaletteTooSmall { cap: usize, palette: usize },

    #[error("Palette contains color {0} more than once")]
    DuplicatePaletteColor(String),
}
