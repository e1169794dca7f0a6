//! Query engine over the scan database
//!
//! Keyword queries are tokenized, ranked in SQL and logged to the search
//! history. Domain queries, keyword popularity, host details and search
//! analytics are plain reads. Store faults become an `error` field or an
//! empty answer, never a panic or an `Err`.

use crate::config::{Config, SearchConfig};
use crate::search::types::{
    HostDetails, KeywordFrequency, SearchAnalytics, SearchHit, SearchResponse,
};
use crate::storage::{timestamp_before, KeywordStat, SearchStatistics, SqliteStorage, Storage};
use crate::text::tokenize_query;
use crate::SiftError;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Keywords listed per host in `host_details`
const HOST_TOP_KEYWORDS: usize = 10;

/// Window covered by the aggregate search statistics
const ANALYTICS_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

/// Answers keyword and domain queries over the scan database
///
/// Holds no state of its own, so it can run alongside a crawl on the same
/// store. Store faults never propagate: they are logged and reported in the
/// response's `error` field.
pub struct SearchEngine {
    storage: Arc<Mutex<SqliteStorage>>,
    config: SearchConfig,
    min_keyword_length: usize,
}

impl SearchEngine {
    pub fn new(
        storage: Arc<Mutex<SqliteStorage>>,
        config: SearchConfig,
        min_keyword_length: usize,
    ) -> Self {
        Self {
            storage,
            config,
            min_keyword_length,
        }
    }

    pub fn from_config(config: &Config, storage: Arc<Mutex<SqliteStorage>>) -> Self {
        Self::new(
            storage,
            config.search.clone(),
            config.extraction.min_keyword_length,
        )
    }

    fn lock_storage(&self) -> Result<MutexGuard<'_, SqliteStorage>, SiftError> {
        self.storage.lock().map_err(|_| SiftError::LockPoisoned)
    }

    /// Clamps a requested page size to `1..=max_results`
    fn page_size(&self, limit: Option<usize>) -> usize {
        limit
            .unwrap_or(self.config.default_limit)
            .clamp(1, self.config.max_results.max(1))
    }

    /// Ranks active hosts by how strongly their pages match `query`
    ///
    /// A host's score is the sum, over its page keywords matching a query
    /// term, of the keyword's frequency on the page times its global
    /// occurrence count. Ties go to the host with more matching pages.
    /// A query with no usable terms returns nothing without querying the
    /// index. Every call is logged to the search history.
    ///
    /// # Arguments
    ///
    /// * `query` - Free text query
    /// * `limit` - Page size, `None` for the configured default
    /// * `offset` - Number of ranked hosts to skip
    pub fn search(&self, query: &str, limit: Option<usize>, offset: usize) -> SearchResponse {
        let started = Instant::now();
        let terms = tokenize_query(query, self.min_keyword_length);
        let limit = self.page_size(limit);

        let outcome = if terms.is_empty() {
            Ok((Vec::new(), 0))
        } else {
            self.ranked_hosts(&terms, limit, offset)
        };

        let mut response = SearchResponse::empty(query);
        match outcome {
            Ok((results, total_count)) => {
                response.results = results;
                response.total_count = total_count;
            }
            Err(e) => {
                tracing::error!("Search for '{}' failed: {}", query, e);
                response.error = Some(e.to_string());
            }
        }

        self.log_search(query, response.total_count);
        response.execution_time = started.elapsed().as_secs_f64();
        response
    }

    fn ranked_hosts(
        &self,
        terms: &[String],
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<SearchHit>, u64), SiftError> {
        let storage = self.lock_storage()?;
        let hits = storage
            .search_by_terms(terms, limit, offset)?
            .into_iter()
            .map(SearchHit::from)
            .collect();
        let total = storage.count_hosts_by_terms(terms)?;
        Ok((hits, total))
    }

    fn log_search(&self, query: &str, result_count: u64) {
        let logged = self
            .lock_storage()
            .and_then(|mut storage| Ok(storage.log_search(query, result_count)?));
        if let Err(e) = logged {
            tracing::warn!("Failed to log search '{}': {}", query, e);
        }
    }

    /// Lists active hosts whose domain contains `fragment`
    ///
    /// Matching is case-sensitive. Results are most recently crawled first
    /// and all carry a score of 1.0. Domain searches are not logged.
    pub fn search_by_domain(
        &self,
        fragment: &str,
        limit: Option<usize>,
        offset: usize,
    ) -> SearchResponse {
        let started = Instant::now();
        let fragment = fragment.trim();
        let mut response = SearchResponse::empty(format!("domain:{}", fragment));
        if fragment.is_empty() {
            return response;
        }

        let limit = self.page_size(limit);
        let outcome = self.lock_storage().and_then(|storage| {
            let hosts = storage.search_by_domain(fragment, limit, offset)?;
            let total = storage.count_hosts_by_domain(fragment)?;
            Ok((hosts, total))
        });

        match outcome {
            Ok((hosts, total)) => {
                response.results = hosts.into_iter().map(SearchHit::unranked).collect();
                response.total_count = total;
            }
            Err(e) => {
                tracing::error!("Domain search for '{}' failed: {}", fragment, e);
                response.error = Some(e.to_string());
            }
        }

        response.execution_time = started.elapsed().as_secs_f64();
        response
    }

    /// Keywords by global occurrence count, then by number of pages
    pub fn popular_keywords(&self, limit: Option<usize>) -> Vec<KeywordStat> {
        let limit = self.page_size(limit);
        match self
            .lock_storage()
            .and_then(|storage| Ok(storage.popular_keywords(limit)?))
        {
            Ok(keywords) => keywords,
            Err(e) => {
                tracing::error!("Failed to load popular keywords: {}", e);
                Vec::new()
            }
        }
    }

    /// The host row, its pages and its top keywords
    ///
    /// Returns `None` for an unknown address or on a store fault.
    pub fn host_details(&self, address: &str) -> Option<HostDetails> {
        let outcome = self.lock_storage().and_then(|storage| {
            let Some(host) = storage.get_host(address)? else {
                return Ok(None);
            };
            let pages = storage.get_pages_for_host(host.id)?;
            let top_keywords = storage
                .get_host_top_keywords(host.id, HOST_TOP_KEYWORDS)?
                .into_iter()
                .map(|(keyword, frequency)| KeywordFrequency { keyword, frequency })
                .collect();
            Ok(Some(HostDetails {
                host,
                pages,
                top_keywords,
            }))
        });

        outcome.unwrap_or_else(|e| {
            tracing::error!("Failed to load host {}: {}", address, e);
            None
        })
    }

    /// Recent searches plus count, mean result count and distinct queries
    /// over the last 24 hours
    pub fn search_analytics(&self, limit: Option<usize>) -> SearchAnalytics {
        let limit = self.page_size(limit);
        let since = timestamp_before(ANALYTICS_WINDOW).unwrap_or_default();

        let outcome = self.lock_storage().and_then(|storage| {
            let recent = storage.recent_searches(limit)?;
            let statistics = storage.search_statistics_since(&since)?;
            Ok((recent, statistics))
        });

        match outcome {
            Ok((recent_searches, statistics)) => SearchAnalytics {
                recent_searches,
                statistics,
                error: None,
            },
            Err(e) => {
                tracing::error!("Failed to load search analytics: {}", e);
                SearchAnalytics {
                    recent_searches: Vec::new(),
                    statistics: SearchStatistics::default(),
                    error: Some(e.to_string()),
                }
            }
        }
    }
}
