use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Netsift
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub extraction: ExtractionConfig,
    pub search: SearchConfig,
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Number of concurrent probe workers
    pub worker_count: u32,

    /// Candidates seeded by `start` when no explicit count is given
    pub max_addresses_per_run: u32,

    /// Addresses claimed from the queue per dispatch round
    pub batch_size: u32,

    /// Whole-request timeout for a probe (seconds)
    pub request_timeout: u64,

    /// Delay a worker sleeps after each probe (milliseconds)
    pub politeness_delay: u64,

    /// Wait before reseeding when the queue runs dry (milliseconds)
    pub idle_wait: u64,

    /// Age after which an in_progress queue entry is considered abandoned (seconds)
    pub reclaim_after: u64,

    /// TCP port probed on each candidate
    pub probe_port: u16,

    /// Maximum number of body bytes read per probe
    pub max_body_size: usize,

    /// Capacity of the recent-event ring buffer
    pub event_capacity: usize,

    /// User-Agent header sent with every probe
    pub user_agent: String,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            worker_count: 50,
            max_addresses_per_run: 10_000,
            batch_size: 100,
            request_timeout: 5,
            politeness_delay: 1_000,
            idle_wait: 10_000,
            reclaim_after: 600,
            probe_port: 80,
            max_body_size: 2 * 1024 * 1024,
            event_capacity: 500,
            user_agent: "Mozilla/5.0 (compatible; WebCrawler/1.0)".to_string(),
        }
    }
}

impl CrawlerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    pub fn politeness_delay(&self) -> Duration {
        Duration::from_millis(self.politeness_delay)
    }

    pub fn idle_wait(&self) -> Duration {
        Duration::from_millis(self.idle_wait)
    }

    pub fn reclaim_after(&self) -> Duration {
        Duration::from_secs(self.reclaim_after)
    }
}

/// Keyword extraction configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ExtractionConfig {
    /// Maximum number of keywords kept per page
    pub max_keywords_per_page: usize,

    /// Tokens shorter than this are dropped (also applies to query terms)
    pub min_keyword_length: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_keywords_per_page: 20,
            min_keyword_length: 3,
        }
    }
}

/// Search configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SearchConfig {
    /// Limit used when a caller does not specify one
    pub default_limit: usize,

    /// Upper bound for any requested limit
    pub max_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_results: 100,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Path to the SQLite database file
    pub database_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            database_path: "netsift.db".to_string(),
        }
    }
}
