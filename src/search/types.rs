use crate::storage::{HostRecord, PageRecord, ScoredHost, SearchHistoryEntry, SearchStatistics};
use serde::Serialize;

/// One ranked host
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub address: String,
    pub domain: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub score: f64,
    pub response_time: Option<f64>,
    pub last_crawled: Option<String>,
    /// Pages of this host matching the query; not computed for domain searches
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u64>,
}

impl SearchHit {
    /// A domain match, which carries no ranking
    pub fn unranked(host: HostRecord) -> Self {
        Self {
            address: host.address,
            domain: host.domain,
            title: host.title,
            description: host.description,
            score: 1.0,
            response_time: host.response_time,
            last_crawled: Some(host.last_crawled),
            page_count: None,
        }
    }
}

impl From<ScoredHost> for SearchHit {
    fn from(scored: ScoredHost) -> Self {
        Self {
            score: scored.score,
            page_count: Some(scored.page_count),
            ..Self::unranked(scored.host)
        }
    }
}

/// Result page of a keyword or domain search
#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchHit>,
    /// Matches ignoring pagination
    pub total_count: u64,
    pub query: String,
    /// Seconds spent answering
    pub execution_time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SearchResponse {
    pub fn empty(query: impl Into<String>) -> Self {
        Self {
            results: Vec::new(),
            total_count: 0,
            query: query.into(),
            execution_time: 0.0,
            error: None,
        }
    }
}

/// A keyword's weight on one host
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeywordFrequency {
    pub keyword: String,
    pub frequency: u64,
}

/// Everything stored about one host
#[derive(Debug, Clone, Serialize)]
pub struct HostDetails {
    pub host: HostRecord,
    /// Newest first
    pub pages: Vec<PageRecord>,
    pub top_keywords: Vec<KeywordFrequency>,
}

/// Recent searches plus aggregates over the last 24 hours
#[derive(Debug, Clone, Serialize)]
pub struct SearchAnalytics {
    pub recent_searches: Vec<SearchHistoryEntry>,
    pub statistics: SearchStatistics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
