// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::model::PodcastDescriptor;

/// Maximum number of podcasts shown on the calendar at once
pub const MAX_SELECTED_PODCASTS: usize = 5;

/// Latest search results and the ordered set of selected podcasts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionRegistry {
    query: String,
    results: Vec<PodcastDescriptor>,
    selected: Vec<PodcastDescriptor>,
    cap: usize,
}

impl SelectionRegistry {
    pub fn new(cap: usize) -> Self {
        Self {
            query: String::new(),
            results: Vec::new(),
            selected: Vec::new(),
            cap,
        }
    }

    pub fn set_results(&mut self, query: &str, results: Vec<PodcastDescriptor>) {
        self.query = query.to_string();
        self.results = results;
    }

    /// Forget the query and results; the selection stays
    pub fn reset_search(&mut self) {
        self.query.clear();
        self.results.clear();
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn results(&self) -> &[PodcastDescriptor] {
        &self.results
    }

    /// Select a podcast from the current results.
    ///
    /// Returns the descriptor if it was newly selected, `None` if it is
    /// unknown, already selected or the cap is reached.
    pub fn select(&mut self, podcast_id: &str) -> Option<&PodcastDescriptor> {
        let podcast = self.results.iter().find(|p| p.id == podcast_id)?.clone();
        if !self.select_podcast(podcast) {
            return None;
        }
        self.selected.last()
    }

    /// Select a podcast that may come from an earlier search.
    ///
    /// Returns `false` if it is already selected or the cap is reached.
    pub fn select_podcast(&mut self, podcast: PodcastDescriptor) -> bool {
        if self.is_selected(&podcast.id) || self.is_full() {
            return false;
        }
        self.selected.push(podcast);
        true
    }

    pub fn deselect(&mut self, podcast_id: &str) -> bool {
        let before = self.selected.len();
        self.selected.retain(|p| p.id != podcast_id);
        self.selected.len() != before
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    pub fn is_selected(&self, podcast_id: &str) -> bool {
        self.selected.iter().any(|p| p.id == podcast_id)
    }

    pub fn is_full(&self) -> bool {
        self.selected.len() >= self.cap
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn selected(&self) -> &[PodcastDescriptor] {
        &self.selected
    }

    pub fn selected_ids(&self) -> Vec<String> {
        self.selected.iter().map(|p| p.id.clone()).collect()
    }
}

impl Default for SelectionRegistry {
    fn default() -> Self {
        Self::new(MAX_SELECTED_PODCASTS)
    }
}
