// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::aggregator::EpisodeAggregator;
use crate::calendar::{CalendarEvent, CalendarProjector};
use crate::color::{Color, ColorAllocator, DEFAULT_PALETTE};
use crate::error::ConfigError;
use crate::model::{EpisodeRecord, PodcastDescriptor};
use crate::progress::{NoopReporter, SharedProgressReporter};
use crate::selection::{MAX_SELECTED_PODCASTS, SelectionRegistry};
use crate::spotify::PodcastCatalog;
use crate::zone::{SharedZone, local_zone};

/// Message stored when a search fails
pub const SEARCH_FAILED: &str = "Unable to search podcasts on Spotify.";

/// Options for a calendar session
#[derive(Clone)]
pub struct SessionOptions {
    pub palette: Vec<Color>,
    /// Maximum number of podcasts selected at once
    pub max_selected: usize,
    /// Zone the calendar days and event start times are computed in
    pub zone: SharedZone,
    pub reporter: SharedProgressReporter,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            palette: DEFAULT_PALETTE.to_vec(),
            max_selected: MAX_SELECTED_PODCASTS,
            zone: local_zone(),
            reporter: NoopReporter::shared(),
        }
    }
}

/// Application context tying search, selection, colors and episodes together.
///
/// One session exists per user session; consumers hold it (or a handle to
/// its aggregator) instead of reaching for global state.
pub struct Session<K: PodcastCatalog> {
    catalog: Arc<K>,
    aggregator: Arc<EpisodeAggregator<K>>,
    registry: SelectionRegistry,
    colors: ColorAllocator,
    projector: CalendarProjector,
    search_error: Option<String>,
}

impl<K: PodcastCatalog> Session<K> {
    /// Create a session, checking that the palette can color a full selection
    pub fn new(catalog: Arc<K>, options: SessionOptions) -> Result<Self, ConfigError> {
        let colors = ColorAllocator::new(&options.palette, options.max_selected)?;
        let aggregator = EpisodeAggregator::new(catalog.clone(), options.zone)
            .with_reporter(options.reporter);

        Ok(Self {
            catalog,
            aggregator: Arc::new(aggregator),
            registry: SelectionRegistry::new(options.max_selected),
            colors,
            projector: CalendarProjector::new(),
            search_error: None,
        })
    }

    /// Search podcasts; failures yield an empty list and set [`search_error`](Self::search_error)
    pub async fn search(&mut self, query: &str) -> Vec<PodcastDescriptor> {
        let query = query.trim();
        self.search_error = None;

        if query.is_empty() {
            self.registry.reset_search();
            return Vec::new();
        }

        match self.catalog.search(query).await {
            Ok(results) => {
                log::info!("Search for '{query}' found {} podcasts", results.len());
                self.registry.set_results(query, results.clone());
                results
            }
            Err(e) => {
                log::error!("Spotify search failed for '{query}': {e}");
                self.search_error = Some(SEARCH_FAILED.to_string());
                self.registry.set_results(query, Vec::new());
                Vec::new()
            }
        }
    }

    /// Select a podcast from the latest search results and load its first
    /// page unless episodes were already fetched for it
    pub async fn select(&mut self, podcast_id: &str) -> bool {
        let Some(podcast) = self.registry.select(podcast_id).cloned() else {
            return false;
        };
        log::info!("Selected {} ({})", podcast.name, podcast.id);

        if self.aggregator.cursor(&podcast.id).is_none() {
            self.aggregator
                .fetch_first_page(&podcast.id, &podcast.name)
                .await;
        }
        true
    }

    /// Select several podcasts and load their first pages in parallel.
    ///
    /// Returns how many were newly selected.
    pub async fn select_many(&mut self, podcast_ids: &[&str]) -> usize {
        let newly_selected: Vec<PodcastDescriptor> = podcast_ids
            .iter()
            .filter_map(|id| self.registry.select(id).cloned())
            .collect();

        self.fetch_missing_first_pages(&newly_selected).await;
        newly_selected.len()
    }

    /// Select podcasts gathered from several searches and load their first
    /// pages in parallel.
    ///
    /// Returns how many were newly selected.
    pub async fn select_podcasts(&mut self, podcasts: Vec<PodcastDescriptor>) -> usize {
        let newly_selected: Vec<PodcastDescriptor> = podcasts
            .into_iter()
            .filter(|podcast| self.registry.select_podcast(podcast.clone()))
            .collect();

        for podcast in &newly_selected {
            log::info!("Selected {} ({})", podcast.name, podcast.id);
        }
        self.fetch_missing_first_pages(&newly_selected).await;
        newly_selected.len()
    }

    async fn fetch_missing_first_pages(&self, podcasts: &[PodcastDescriptor]) {
        let to_fetch: Vec<PodcastDescriptor> = podcasts
            .iter()
            .filter(|p| self.aggregator.cursor(&p.id).is_none())
            .cloned()
            .collect();

        if !to_fetch.is_empty() {
            self.aggregator.fetch_first_pages(&to_fetch).await;
        }
    }

    /// Deselect a podcast and free its color; its episodes stay cached
    pub fn deselect(&mut self, podcast_id: &str) -> bool {
        if !self.registry.deselect(podcast_id) {
            return false;
        }
        self.colors.release(podcast_id);
        log::info!("Deselected {podcast_id}");
        true
    }

    /// Drop the selection, every loaded episode and all color assignments
    pub fn clear_selection(&mut self) {
        self.registry.clear();
        self.aggregator.clear();
        self.colors.reset();
        self.projector.invalidate();
    }

    /// Calendar events for the current selection, recomputed when stale
    pub fn calendar_events(&mut self) -> &[CalendarEvent] {
        self.projector.events(
            self.registry.selected(),
            &self.aggregator,
            &mut self.colors,
        )
    }

    /// React to calendar navigation by backfilling older episodes.
    ///
    /// Returns whether new episodes were loaded.
    pub async fn on_view_range_change(&self, start: NaiveDate, end: NaiveDate) -> bool {
        if end < start {
            log::warn!("Ignoring inverted view range {start}..{end}");
            return false;
        }
        self.aggregator
            .check_and_backfill(start, self.registry.selected())
            .await
    }

    pub fn find_episode(&self, episode_id: &str) -> Option<EpisodeRecord> {
        self.aggregator.find_episode(episode_id)
    }

    pub fn selected(&self) -> &[PodcastDescriptor] {
        self.registry.selected()
    }

    pub fn search_results(&self) -> &[PodcastDescriptor] {
        self.registry.results()
    }

    pub fn color_of(&self, podcast_id: &str) -> Option<Color> {
        self.colors.peek(podcast_id)
    }

    pub fn search_error(&self) -> Option<&str> {
        self.search_error.as_deref()
    }

    pub fn episode_error(&self) -> Option<String> {
        self.aggregator.error()
    }

    /// Shared handle to the episode store, e.g. for backfills driven elsewhere
    pub fn aggregator(&self) -> &Arc<EpisodeAggregator<K>> {
        &self.aggregator
    }
}
