// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared fixtures for unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{FixedOffset, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use tokio::sync::Notify;

use crate::error::{EpisodeFetchError, SearchError};
use crate::model::PodcastDescriptor;
use crate::spotify::{EpisodeItem, EpisodePage, ExternalUrls, PodcastCatalog};

pub fn podcast(id: &str, name: &str) -> PodcastDescriptor {
    PodcastDescriptor {
        id: id.to_string(),
        name: name.to_string(),
        publisher: format!("{name} Media"),
        description: String::new(),
        image_url: None,
        uri: Some(format!("spotify:show:{id}")),
        total_episodes: 100,
    }
}

pub fn item(id: &str, release_date: &str) -> EpisodeItem {
    EpisodeItem {
        id: id.to_string(),
        name: format!("Episode {id}"),
        description: format!("About {id}"),
        html_description: String::new(),
        release_date: release_date.to_string(),
        release_date_precision: "day".to_string(),
        duration_ms: 1_800_000,
        audio_preview_url: None,
        uri: Some(format!("spotify:episode:{id}")),
        external_urls: ExternalUrls::default(),
        images: Vec::new(),
    }
}

pub fn page(items: Vec<EpisodeItem>, has_more: bool) -> EpisodePage {
    EpisodePage {
        page_len: items.len(),
        items,
        has_more,
        total: None,
    }
}

/// Zone that moves from `before` to `after` at a fixed UTC instant
#[derive(Debug, Clone, Copy)]
pub struct ShiftingZone {
    pub switch_at: NaiveDateTime,
    pub before: FixedOffset,
    pub after: FixedOffset,
}

impl ShiftingZone {
    /// EST until 2024-03-10 07:00 UTC, EDT afterwards
    pub fn new_york_2024() -> Self {
        Self {
            switch_at: NaiveDate::from_ymd_opt(2024, 3, 10)
                .and_then(|d| d.and_hms_opt(7, 0, 0))
                .unwrap(),
            before: FixedOffset::west_opt(5 * 3600).unwrap(),
            after: FixedOffset::west_opt(4 * 3600).unwrap(),
        }
    }
}

impl TimeZone for ShiftingZone {
    type Offset = FixedOffset;

    fn from_offset(offset: &FixedOffset) -> Self {
        Self {
            switch_at: NaiveDateTime::MIN,
            before: *offset,
            after: *offset,
        }
    }

    fn offset_from_local_date(&self, local: &NaiveDate) -> LocalResult<FixedOffset> {
        self.offset_from_local_datetime(&local.and_time(NaiveTime::MIN))
    }

    fn offset_from_local_datetime(&self, local: &NaiveDateTime) -> LocalResult<FixedOffset> {
        let fits = |offset: FixedOffset| self.offset_from_utc_datetime(&(*local - offset)) == offset;
        match (fits(self.before), fits(self.after)) {
            (true, true) if self.before != self.after => {
                LocalResult::Ambiguous(self.before, self.after)
            }
            (true, _) => LocalResult::Single(self.before),
            (false, true) => LocalResult::Single(self.after),
            (false, false) => LocalResult::None,
        }
    }

    fn offset_from_utc_date(&self, utc: &NaiveDate) -> FixedOffset {
        self.offset_from_utc_datetime(&utc.and_time(NaiveTime::MIN))
    }

    fn offset_from_utc_datetime(&self, utc: &NaiveDateTime) -> FixedOffset {
        if *utc < self.switch_at {
            self.before
        } else {
            self.after
        }
    }
}

/// In-memory catalog with canned pages and failures
#[derive(Default)]
pub struct MockCatalog {
    pages: HashMap<(String, usize), EpisodePage>,
    failing: HashSet<String>,
    shows: Vec<PodcastDescriptor>,
    query_shows: HashMap<String, Vec<PodcastDescriptor>>,
    search_fails: bool,
    /// When set, every request with a non-zero offset waits for a notification
    backfill_gate: Option<Arc<Notify>>,
    calls: Mutex<Vec<(String, usize)>>,
}

impl MockCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, podcast_id: &str, offset: usize, page: EpisodePage) -> Self {
        self.pages.insert((podcast_id.to_string(), offset), page);
        self
    }

    pub fn with_failure(mut self, podcast_id: &str) -> Self {
        self.failing.insert(podcast_id.to_string());
        self
    }

    pub fn with_shows(mut self, shows: Vec<PodcastDescriptor>) -> Self {
        self.shows = shows;
        self
    }

    /// Results for one query; other queries get the default shows
    pub fn with_query_shows(mut self, query: &str, shows: Vec<PodcastDescriptor>) -> Self {
        self.query_shows.insert(query.to_string(), shows);
        self
    }

    pub fn with_failing_search(mut self) -> Self {
        self.search_fails = true;
        self
    }

    pub fn with_backfill_gate(mut self, gate: Arc<Notify>) -> Self {
        self.backfill_gate = Some(gate);
        self
    }

    pub fn calls(&self) -> Vec<(String, usize)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, podcast_id: &str) -> Vec<usize> {
        self.calls()
            .into_iter()
            .filter(|(id, _)| id == podcast_id)
            .map(|(_, offset)| offset)
            .collect()
    }
}

#[async_trait]
impl PodcastCatalog for MockCatalog {
    async fn search(&self, query: &str) -> Result<Vec<PodcastDescriptor>, SearchError> {
        if self.search_fails {
            return Err(SearchError::HttpStatus {
                query: query.to_string(),
                status: 500,
            });
        }
        Ok(self
            .query_shows
            .get(query)
            .unwrap_or(&self.shows)
            .clone())
    }

    async fn episode_page(
        &self,
        podcast_id: &str,
        offset: usize,
    ) -> Result<EpisodePage, EpisodeFetchError> {
        self.calls
            .lock()
            .unwrap()
            .push((podcast_id.to_string(), offset));

        if offset > 0
            && let Some(gate) = &self.backfill_gate
        {
            gate.notified().await;
        }

        if self.failing.contains(podcast_id) {
            return Err(EpisodeFetchError::HttpStatus {
                podcast_id: podcast_id.to_string(),
                status: 503,
            });
        }

        Ok(self
            .pages
            .get(&(podcast_id.to_string(), offset))
            .cloned()
            .unwrap_or_else(EpisodePage::empty))
    }
}
