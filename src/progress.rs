// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::sync::Arc;

use chrono::NaiveDate;

/// Events emitted while episodes are fetched and merged
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchEvent {
    /// A page request is about to be sent
    FetchingPage {
        podcast_id: String,
        podcast_name: String,
        offset: usize,
    },

    /// A page was merged into the episode collection
    PageMerged {
        podcast_id: String,
        podcast_name: String,
        /// Episodes that were not known before
        new_episodes: usize,
        /// Episodes dropped because their id was already present
        duplicates: usize,
        has_more: bool,
    },

    /// A page request or its parsing failed
    FetchFailed {
        podcast_id: String,
        podcast_name: String,
        error: String,
    },

    /// Calendar navigation came close enough to the oldest loaded episode
    BackfillTriggered {
        podcast_id: String,
        podcast_name: String,
        earliest_known: Option<NaiveDate>,
        visible_start: NaiveDate,
    },
}

/// Trait for reporting fetch progress.
///
/// Implementations can use this to display spinners, log messages,
/// or collect statistics.
pub trait ProgressReporter: Send + Sync {
    /// Report a progress event
    fn report(&self, event: FetchEvent);
}

/// A shared reference to a progress reporter
pub type SharedProgressReporter = Arc<dyn ProgressReporter>;

/// A no-op progress reporter that silently ignores all events.
/// Useful for tests or quiet mode.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn report(&self, _event: FetchEvent) {}
}

impl NoopReporter {
    /// Create a new NoopReporter wrapped in an Arc
    pub fn shared() -> SharedProgressReporter {
        Arc::new(Self)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Reporter that records every event for later assertions
    #[derive(Default)]
    pub struct RecordingReporter {
        events: Mutex<Vec<FetchEvent>>,
    }

    impl RecordingReporter {
        pub fn events(&self) -> Vec<FetchEvent> {
            self.events.lock().unwrap().clone()
        }
    }

    impl ProgressReporter for RecordingReporter {
        fn report(&self, event: FetchEvent) {
            self.events.lock().unwrap().push(event);
        }
    }
}
