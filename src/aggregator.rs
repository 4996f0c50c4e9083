// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{Days, NaiveDate};
use futures::future::join_all;

use crate::error::{EpisodeFetchError, ShapeError};
use crate::model::{EpisodeRecord, PodcastDescriptor, ReleaseDate};
use crate::progress::{FetchEvent, NoopReporter, SharedProgressReporter};
use crate::spotify::{EpisodeItem, EpisodePage, PodcastCatalog};
use crate::zone::{CalendarZone, SharedZone};

/// Older pages are requested once the visible range starts this many days
/// before the oldest loaded episode
pub const BACKFILL_LOOKAHEAD_DAYS: u64 = 21;

/// Message stored when an episode fetch fails
pub const EPISODE_FETCH_FAILED: &str = "Unable to fetch episodes from Spotify.";

/// Per-podcast paging state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationCursor {
    pub next_offset: usize,
    pub has_more: bool,
    /// Oldest release date held for the podcast; `None` until an episode is loaded
    pub earliest_known_date: Option<NaiveDate>,
    pub is_fetching_more: bool,
}

/// Whether a visible range starting at `visible_start` warrants loading older
/// episodes for a podcast whose oldest loaded episode is `earliest_known`
pub fn needs_backfill(earliest_known: Option<NaiveDate>, visible_start: NaiveDate) -> bool {
    match earliest_known {
        None => true,
        Some(earliest) => earliest
            .checked_sub_days(Days::new(BACKFILL_LOOKAHEAD_DAYS))
            .is_some_and(|threshold| visible_start <= threshold),
    }
}

/// Convert an upstream episode into a record owned by `podcast_id`
pub fn normalize_episode(
    item: EpisodeItem,
    podcast_id: &str,
    podcast_name: &str,
    zone: &dyn CalendarZone,
) -> Result<EpisodeRecord, ShapeError> {
    let release_date =
        ReleaseDate::parse(&item.release_date, &item.release_date_precision, zone)?;

    Ok(EpisodeRecord {
        id: item.id,
        podcast_id: podcast_id.to_string(),
        podcast_name: podcast_name.to_string(),
        title: item.name,
        description: item.description,
        html_description: Some(item.html_description).filter(|h| !h.is_empty()),
        release_date,
        duration_ms: item.duration_ms,
        audio_preview_url: item.audio_preview_url.filter(|u| !u.is_empty()),
        external_uri: item.uri,
        external_url: item.external_urls.spotify,
        image_url: item.images.into_iter().next().map(|img| img.url),
    })
}

#[derive(Debug, Default)]
struct AggregatorState {
    /// Canonical collection; the indexes below hold positions into it
    episodes: Vec<EpisodeRecord>,
    ids: HashSet<String>,
    by_date: BTreeMap<NaiveDate, Vec<usize>>,
    by_podcast: HashMap<String, Vec<usize>>,
    cursors: HashMap<String, PaginationCursor>,
    error: Option<String>,
    in_flight: usize,
    /// Bumped whenever the canonical collection changes
    revision: u64,
    /// Bumped on clear; fetches started under an older generation are dropped
    generation: u64,
}

impl AggregatorState {
    /// Insert the episodes whose ids are not known yet.
    ///
    /// Returns the inserted episodes and the number of duplicates dropped.
    fn merge(&mut self, batch: Vec<EpisodeRecord>) -> (Vec<EpisodeRecord>, usize) {
        let mut added = Vec::new();
        let mut duplicates = 0;

        for episode in batch {
            if !self.ids.insert(episode.id.clone()) {
                duplicates += 1;
                continue;
            }

            let position = self.episodes.len();
            self.by_date
                .entry(episode.release_date.date)
                .or_default()
                .push(position);
            self.by_podcast
                .entry(episode.podcast_id.clone())
                .or_default()
                .push(position);
            added.push(episode.clone());
            self.episodes.push(episode);
        }

        if !added.is_empty() {
            self.revision += 1;
        }
        (added, duplicates)
    }

    fn collect(&self, positions: Option<&Vec<usize>>) -> Vec<EpisodeRecord> {
        positions
            .map(|p| p.iter().map(|&i| self.episodes[i].clone()).collect())
            .unwrap_or_default()
    }
}

/// A backfill request that passed the cursor checks
struct PendingPage {
    podcast_id: String,
    podcast_name: String,
    offset: usize,
    generation: u64,
}

/// Deduplicated, date- and podcast-indexed episode collection for the
/// selected podcasts, fetched lazily and extended as the calendar moves back
/// in time.
///
/// All methods take `&self` and never hold the state lock across a request,
/// so independent fetches interleave freely.
pub struct EpisodeAggregator<K: PodcastCatalog> {
    catalog: Arc<K>,
    zone: SharedZone,
    reporter: SharedProgressReporter,
    state: Mutex<AggregatorState>,
}

impl<K: PodcastCatalog> EpisodeAggregator<K> {
    pub fn new(catalog: Arc<K>, zone: SharedZone) -> Self {
        Self {
            catalog,
            zone,
            reporter: NoopReporter::shared(),
            state: Mutex::new(AggregatorState::default()),
        }
    }

    pub fn with_reporter(mut self, reporter: SharedProgressReporter) -> Self {
        self.reporter = reporter;
        self
    }

    /// Zone release timestamps are mapped to calendar days in
    pub fn zone(&self) -> &dyn CalendarZone {
        self.zone.as_ref()
    }

    fn state(&self) -> MutexGuard<'_, AggregatorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fetch the first page of one podcast and merge it.
    ///
    /// Failures are recorded in [`error`](Self::error) and yield an empty list.
    pub async fn fetch_first_page(
        &self,
        podcast_id: &str,
        podcast_name: &str,
    ) -> Vec<EpisodeRecord> {
        self.state().error = None;
        self.first_page(podcast_id, podcast_name).await
    }

    /// Fetch the first page of every given podcast in parallel
    pub async fn fetch_first_pages(&self, podcasts: &[PodcastDescriptor]) -> Vec<EpisodeRecord> {
        self.state().error = None;

        let fetches = podcasts
            .iter()
            .map(|podcast| self.first_page(&podcast.id, &podcast.name));

        join_all(fetches).await.into_iter().flatten().collect()
    }

    async fn first_page(&self, podcast_id: &str, podcast_name: &str) -> Vec<EpisodeRecord> {
        let generation = self.begin_request();
        let result = self.request(podcast_id, podcast_name, 0).await;

        let mut state = self.state();
        state.in_flight -= 1;
        if state.generation != generation {
            log::debug!("Dropping first page of {podcast_id} fetched before a reset");
            return Vec::new();
        }

        let page = match result {
            Ok(page) => page,
            Err(e) => {
                drop(state);
                self.record_failure(podcast_id, podcast_name, &e);
                return Vec::new();
            }
        };

        let earliest = earliest_date(&page.records);
        let (added, duplicates) = state.merge(page.records);

        let cursor = state
            .cursors
            .entry(podcast_id.to_string())
            .or_insert(PaginationCursor {
                next_offset: page.page_len,
                has_more: page.has_more,
                earliest_known_date: None,
                is_fetching_more: false,
            });
        cursor.earliest_known_date = min_date(cursor.earliest_known_date, earliest);
        drop(state);

        self.report_merged(podcast_id, podcast_name, &added, duplicates, page.has_more);
        added
    }

    /// Fetch the next page of one podcast.
    ///
    /// Does nothing unless the podcast has a cursor with more pages and no
    /// backfill already running.
    pub async fn fetch_next_page(&self, podcast_id: &str, podcast_name: &str) -> Vec<EpisodeRecord> {
        let pending = {
            let mut state = self.state();
            let pending = Self::claim_backfill(&mut state, podcast_id, podcast_name);
            if pending.is_some() {
                state.error = None;
            }
            pending
        };

        match pending {
            Some(pending) => self.next_page(pending).await,
            None => Vec::new(),
        }
    }

    /// Start backfills for every selected podcast whose oldest loaded episode
    /// is within the lookahead of `visible_start`.
    ///
    /// Returns whether any new episodes were loaded.
    pub async fn check_and_backfill(
        &self,
        visible_start: NaiveDate,
        selected: &[PodcastDescriptor],
    ) -> bool {
        let due: Vec<PendingPage> = {
            let mut state = self.state();
            let due: Vec<_> = selected
                .iter()
                .filter(|podcast| {
                    state.cursors.get(&podcast.id).is_some_and(|cursor| {
                        needs_backfill(cursor.earliest_known_date, visible_start)
                    })
                })
                .collect();

            let claimed: Vec<_> = due
                .into_iter()
                .filter_map(|p| Self::claim_backfill(&mut state, &p.id, &p.name))
                .collect();
            if !claimed.is_empty() {
                state.error = None;
            }
            claimed
        };

        if due.is_empty() {
            return false;
        }

        for pending in &due {
            let earliest_known = self
                .cursor(&pending.podcast_id)
                .and_then(|c| c.earliest_known_date);
            log::info!(
                "Backfilling {} from offset {} (visible range starts {visible_start})",
                pending.podcast_name,
                pending.offset
            );
            self.reporter.report(FetchEvent::BackfillTriggered {
                podcast_id: pending.podcast_id.clone(),
                podcast_name: pending.podcast_name.clone(),
                earliest_known,
                visible_start,
            });
        }

        let fetches = due.into_iter().map(|pending| self.next_page(pending));
        join_all(fetches)
            .await
            .iter()
            .any(|added| !added.is_empty())
    }

    /// Check a cursor and mark it as fetching if a backfill may start
    fn claim_backfill(
        state: &mut AggregatorState,
        podcast_id: &str,
        podcast_name: &str,
    ) -> Option<PendingPage> {
        let generation = state.generation;
        let cursor = state.cursors.get_mut(podcast_id)?;
        if !cursor.has_more || cursor.is_fetching_more {
            return None;
        }

        cursor.is_fetching_more = true;
        let offset = cursor.next_offset;
        state.in_flight += 1;

        Some(PendingPage {
            podcast_id: podcast_id.to_string(),
            podcast_name: podcast_name.to_string(),
            offset,
            generation,
        })
    }

    async fn next_page(&self, pending: PendingPage) -> Vec<EpisodeRecord> {
        let PendingPage {
            podcast_id,
            podcast_name,
            offset,
            generation,
        } = pending;

        let result = self.request(&podcast_id, &podcast_name, offset).await;

        let mut state = self.state();
        state.in_flight -= 1;
        if state.generation != generation {
            log::debug!("Dropping page {offset} of {podcast_id} fetched before a reset");
            return Vec::new();
        }

        let page = match result {
            Ok(page) => page,
            Err(e) => {
                if let Some(cursor) = state.cursors.get_mut(&podcast_id) {
                    cursor.is_fetching_more = false;
                }
                drop(state);
                self.record_failure(&podcast_id, &podcast_name, &e);
                return Vec::new();
            }
        };

        let earliest = earliest_date(&page.records);
        let (added, duplicates) = state.merge(page.records);

        if let Some(cursor) = state.cursors.get_mut(&podcast_id) {
            cursor.next_offset = offset + page.page_len;
            cursor.has_more = page.has_more;
            cursor.earliest_known_date = min_date(cursor.earliest_known_date, earliest);
            cursor.is_fetching_more = false;
        }
        drop(state);

        self.report_merged(&podcast_id, &podcast_name, &added, duplicates, page.has_more);
        added
    }

    fn begin_request(&self) -> u64 {
        let mut state = self.state();
        state.in_flight += 1;
        state.generation
    }

    /// Fetch and normalize one page; items that fail to normalize are skipped
    async fn request(
        &self,
        podcast_id: &str,
        podcast_name: &str,
        offset: usize,
    ) -> Result<NormalizedPage, EpisodeFetchError> {
        self.reporter.report(FetchEvent::FetchingPage {
            podcast_id: podcast_id.to_string(),
            podcast_name: podcast_name.to_string(),
            offset,
        });

        let page: EpisodePage = self.catalog.episode_page(podcast_id, offset).await?;

        let records = page
            .items
            .into_iter()
            .filter_map(|item| {
                let id = item.id.clone();
                normalize_episode(item, podcast_id, podcast_name, self.zone.as_ref())
                    .inspect_err(|e| log::warn!("Skipping episode {id} of {podcast_id}: {e}"))
                    .ok()
            })
            .collect();

        Ok(NormalizedPage {
            records,
            page_len: page.page_len,
            has_more: page.has_more,
        })
    }

    fn record_failure(&self, podcast_id: &str, podcast_name: &str, error: &EpisodeFetchError) {
        log::error!("Fetching episodes for {podcast_name} ({podcast_id}) failed: {error}");
        self.state().error = Some(EPISODE_FETCH_FAILED.to_string());
        self.reporter.report(FetchEvent::FetchFailed {
            podcast_id: podcast_id.to_string(),
            podcast_name: podcast_name.to_string(),
            error: error.to_string(),
        });
    }

    fn report_merged(
        &self,
        podcast_id: &str,
        podcast_name: &str,
        added: &[EpisodeRecord],
        duplicates: usize,
        has_more: bool,
    ) {
        log::debug!(
            "Merged {} episodes of {podcast_name} ({duplicates} duplicates, has_more={has_more})",
            added.len()
        );
        self.reporter.report(FetchEvent::PageMerged {
            podcast_id: podcast_id.to_string(),
            podcast_name: podcast_name.to_string(),
            new_episodes: added.len(),
            duplicates,
            has_more,
        });
    }

    /// Drop every episode, index entry and cursor in one step
    pub fn clear(&self) {
        let mut state = self.state();
        let generation = state.generation + 1;
        let revision = state.revision + 1;
        let in_flight = state.in_flight;
        *state = AggregatorState {
            generation,
            revision,
            in_flight,
            ..AggregatorState::default()
        };
    }

    /// Run `f` over the canonical collection without copying it
    pub fn with_episodes<R>(&self, f: impl FnOnce(&[EpisodeRecord]) -> R) -> R {
        f(&self.state().episodes)
    }

    pub fn episodes(&self) -> Vec<EpisodeRecord> {
        self.with_episodes(|episodes| episodes.to_vec())
    }

    pub fn len(&self) -> usize {
        self.state().episodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn find_episode(&self, episode_id: &str) -> Option<EpisodeRecord> {
        self.state()
            .episodes
            .iter()
            .find(|e| e.id == episode_id)
            .cloned()
    }

    pub fn episodes_on(&self, date: NaiveDate) -> Vec<EpisodeRecord> {
        let state = self.state();
        state.collect(state.by_date.get(&date))
    }

    /// Episodes released within `start..=end`, oldest first
    pub fn episodes_between(&self, start: NaiveDate, end: NaiveDate) -> Vec<EpisodeRecord> {
        if end < start {
            return Vec::new();
        }
        let state = self.state();
        state
            .by_date
            .range(start..=end)
            .flat_map(|(_, positions)| positions.iter().map(|&i| state.episodes[i].clone()))
            .collect()
    }

    pub fn episodes_for(&self, podcast_id: &str) -> Vec<EpisodeRecord> {
        let state = self.state();
        state.collect(state.by_podcast.get(podcast_id))
    }

    pub fn dates_with_episodes(&self) -> Vec<NaiveDate> {
        self.state().by_date.keys().copied().collect()
    }

    pub fn cursor(&self, podcast_id: &str) -> Option<PaginationCursor> {
        self.state().cursors.get(podcast_id).cloned()
    }

    /// Last fetch error message, if the latest batch had a failure
    pub fn error(&self) -> Option<String> {
        self.state().error.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state().in_flight > 0
    }

    pub fn revision(&self) -> u64 {
        self.state().revision
    }
}

struct NormalizedPage {
    records: Vec<EpisodeRecord>,
    page_len: usize,
    has_more: bool,
}

fn earliest_date(records: &[EpisodeRecord]) -> Option<NaiveDate> {
    records.iter().map(|e| e.release_date.date).min()
}

fn min_date(a: Option<NaiveDate>, b: Option<NaiveDate>) -> Option<NaiveDate> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}
