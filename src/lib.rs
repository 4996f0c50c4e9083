pub mod aggregator;
pub mod calendar;
pub mod color;
pub mod config;
pub mod error;
pub mod format;
pub mod http;
pub mod model;
pub mod progress;
pub mod selection;
pub mod session;
pub mod spotify;
pub mod zone;

#[cfg(test)]
pub(crate) mod testing;

// Re-export main types for convenience
pub use aggregator::{EpisodeAggregator, PaginationCursor};
pub use calendar::{CalendarEvent, CalendarProjector, project_events};
pub use color::{Color, ColorAllocator, DEFAULT_PALETTE};
pub use config::Environment;
pub use error::{AuthError, ConfigError, EpisodeFetchError, SearchError, ShapeError};
pub use http::{HttpClient, HttpResponse, ReqwestClient};
pub use model::{DatePrecision, EpisodeRecord, PodcastDescriptor, ReleaseDate};
pub use progress::{FetchEvent, NoopReporter, ProgressReporter, SharedProgressReporter};
pub use selection::{MAX_SELECTED_PODCASTS, SelectionRegistry};
pub use session::{Session, SessionOptions};
pub use spotify::{PodcastCatalog, SpotifyClient};
pub use zone::{CalendarZone, SharedZone, local_zone};
