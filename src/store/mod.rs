mod episodes;
mod schema;
mod transfer;
mod types;

pub use schema::EpisodeStore;
pub use transfer::{TransferEntry, export_entries, import_entries};
pub use types::{EpisodeRecord, format_timestamp, parse_timestamp};
