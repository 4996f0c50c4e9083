// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::HashSet;

use chrono::{DateTime, FixedOffset};
use serde::Serialize;

use crate::aggregator::EpisodeAggregator;
use crate::color::{Color, ColorAllocator};
use crate::model::{EpisodeRecord, PodcastDescriptor};
use crate::spotify::PodcastCatalog;
use crate::zone::CalendarZone;

/// A render-ready episode on the calendar
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarEvent {
    /// Same as the episode id
    pub id: String,
    pub title: String,
    pub start: DateTime<FixedOffset>,
    pub background_color: Color,
    pub border_color: Color,
    pub podcast_id: String,
    pub podcast_name: String,
    pub episode: EpisodeRecord,
}

/// Derive calendar events for the selected podcasts.
///
/// Colors of podcasts that are no longer selected are released before any
/// color is looked up, so a color freed here can go to a newly selected
/// podcast in the same pass.
pub fn project_events(
    selected: &[PodcastDescriptor],
    episodes: &[EpisodeRecord],
    colors: &mut ColorAllocator,
    zone: &dyn CalendarZone,
) -> Vec<CalendarEvent> {
    let selected_ids: HashSet<&str> = selected.iter().map(|p| p.id.as_str()).collect();
    colors.retain_selected(&selected_ids);

    if selected.is_empty() {
        return Vec::new();
    }

    for podcast in selected {
        colors.get_color(&podcast.id);
    }

    episodes
        .iter()
        .filter(|episode| selected_ids.contains(episode.podcast_id.as_str()))
        .map(|episode| {
            let color = colors.get_color(&episode.podcast_id);
            CalendarEvent {
                id: episode.id.clone(),
                title: format!("{}: {}", episode.podcast_name, episode.title),
                start: zone.start_of_day(episode.release_date.date),
                background_color: color,
                border_color: color,
                podcast_id: episode.podcast_id.clone(),
                podcast_name: episode.podcast_name.clone(),
                episode: episode.clone(),
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ProjectionInputs {
    selected_ids: Vec<String>,
    revision: u64,
}

impl ProjectionInputs {
    fn capture(selected: &[PodcastDescriptor], revision: u64) -> Self {
        let mut selected_ids: Vec<_> = selected.iter().map(|p| p.id.clone()).collect();
        selected_ids.sort();
        Self {
            selected_ids,
            revision,
        }
    }
}

/// Caches the last projection and recomputes only when the selected ids or
/// the aggregator's episode collection changed
#[derive(Debug, Default)]
pub struct CalendarProjector {
    inputs: Option<ProjectionInputs>,
    events: Vec<CalendarEvent>,
}

impl CalendarProjector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_stale<K: PodcastCatalog>(
        &self,
        selected: &[PodcastDescriptor],
        aggregator: &EpisodeAggregator<K>,
    ) -> bool {
        self.inputs.as_ref()
            != Some(&ProjectionInputs::capture(selected, aggregator.revision()))
    }

    pub fn events<K: PodcastCatalog>(
        &mut self,
        selected: &[PodcastDescriptor],
        aggregator: &EpisodeAggregator<K>,
        colors: &mut ColorAllocator,
    ) -> &[CalendarEvent] {
        let inputs = ProjectionInputs::capture(selected, aggregator.revision());

        if self.inputs.as_ref() != Some(&inputs) {
            log::debug!(
                "Recomputing calendar events for {} podcasts",
                inputs.selected_ids.len()
            );
            self.events = aggregator.with_episodes(|episodes| {
                project_events(selected, episodes, colors, aggregator.zone())
            });
            self.inputs = Some(inputs);
        }

        &self.events
    }

    pub fn invalidate(&mut self) {
        self.inputs = None;
        self.events.clear();
    }
}
