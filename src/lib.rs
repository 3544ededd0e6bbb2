pub mod config;
pub mod dedup;
pub mod error;
pub mod feed;
pub mod format;
pub mod http;
pub mod progress;
pub mod publish;
pub mod run;
pub mod store;

// Re-export main types for convenience
pub use config::{FeedProfile, MastodonSettings, load_feeds_file};
pub use dedup::{DedupPlan, FilterOptions, NewEpisode, SeenEpisodes, filter_new_episodes, plan_new_episodes};
pub use error::{
    ConfigError, FeedError, PublishError, RunError, StoreError, TemplateError, TransferError,
};
pub use feed::{FetchedEpisode, fetch_episodes, parse_feed};
pub use format::{PostFormatter, PostTemplate, html_to_text};
pub use http::{HttpClient, ReqwestClient, USER_AGENT};
pub use progress::{
    NoopReporter, ProgressEvent, ProgressReporter, SharedProgressReporter, TracingReporter,
};
pub use publish::{MastodonClient, Publisher, resolve_access_token};
pub use run::{FeedFailure, FeedOutcome, FeedRunSummary, FeedStage, RunOptions, run_feed, run_feeds};
pub use store::{EpisodeRecord, EpisodeStore, TransferEntry, export_entries, import_entries};
