// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::fmt;

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::ShapeError;
use crate::zone::CalendarZone;

/// A podcast returned by search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodcastDescriptor {
    pub id: String,
    pub name: String,
    pub publisher: String,
    pub description: String,
    pub image_url: Option<String>,
    pub uri: Option<String>,
    pub total_episodes: u32,
}

/// How precisely upstream knows an episode's release date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatePrecision {
    Day,
    Month,
    Year,
}

impl DatePrecision {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "day" => Some(Self::Day),
            "month" => Some(Self::Month),
            "year" => Some(Self::Year),
            _ => None,
        }
    }
}

impl fmt::Display for DatePrecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Day => "day",
            Self::Month => "month",
            Self::Year => "year",
        };
        f.write_str(s)
    }
}

/// Calendar day an episode was released on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReleaseDate {
    pub date: NaiveDate,
    pub precision: DatePrecision,
}

impl ReleaseDate {
    /// Parse an upstream release date.
    ///
    /// Accepts `YYYY-MM-DD`, `YYYY-MM`, `YYYY` and full RFC 3339 timestamps.
    /// Timestamps are converted to `zone` before the time of day is dropped,
    /// so the date is the one a reader in that zone would see.
    pub fn parse(
        value: &str,
        precision: &str,
        zone: &dyn CalendarZone,
    ) -> Result<Self, ShapeError> {
        let invalid = || ShapeError::InvalidReleaseDate {
            value: value.to_string(),
            precision: precision.to_string(),
        };

        let precision = DatePrecision::parse(precision).ok_or_else(invalid)?;
        let value = value.trim();

        if let Ok(instant) = DateTime::parse_from_rfc3339(value) {
            return Ok(Self {
                date: zone.day_of(instant),
                precision,
            });
        }

        let date = match value.len() {
            10 => NaiveDate::parse_from_str(value, "%Y-%m-%d").ok(),
            7 => NaiveDate::parse_from_str(&format!("{value}-01"), "%Y-%m-%d").ok(),
            4 => value
                .parse::<i32>()
                .ok()
                .and_then(|year| NaiveDate::from_ymd_opt(year, 1, 1)),
            _ => None,
        }
        .ok_or_else(invalid)?;

        Ok(Self { date, precision })
    }

    /// Index key in `YYYY-MM-DD` form
    pub fn day_key(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }
}

/// A normalized episode belonging to exactly one podcast
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeRecord {
    pub id: String,
    pub podcast_id: String,
    pub podcast_name: String,
    pub title: String,
    pub description: String,
    pub html_description: Option<String>,
    pub release_date: ReleaseDate,
    pub duration_ms: u64,
    pub audio_preview_url: Option<String>,
    pub external_uri: Option<String>,
    pub external_url: Option<String>,
    pub image_url: Option<String>,
}
