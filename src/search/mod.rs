//! Search over the scan database
//!
//! Keyword queries are ranked by summed `frequency * total_occurrences`
//! over active hosts; domain queries are plain substring matches. Response
//! types are serializable for whatever serves them.

mod engine;
mod types;

pub use engine::SearchEngine;
pub use types::{HostDetails, KeywordFrequency, SearchAnalytics, SearchHit, SearchResponse};
