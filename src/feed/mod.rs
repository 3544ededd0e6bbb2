mod fetch;
mod parse;

pub use fetch::{fetch_episodes, fetch_feed_bytes};
pub use parse::{FetchedEpisode, parse_duration, parse_feed};
